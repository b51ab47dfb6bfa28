use crossbeam::channel::Receiver;
use log::{debug, info, trace};

use crate::{
    devices::{DisplayError, DisplaySurface, DisplaySurfaceType, SurfaceEvent},
    effect::host::EffectHost,
    frame::FrameTimeKeeper,
    pixel_buffer::PixelBuffer,
    simulation,
    state::SimulationState,
    watcher::ReloadRequest,
    world::layout::Layout,
};

/// Fixed-rate loop running the simulation and handing frames to a surface.
///
/// Reload requests are only applied in `BeforeFrame`, so the effect host
/// never changes while a tick is running.
pub struct TickDriver {
    state: TickDriverState,
    command_queue: Vec<TickDriverCommand>,
    layout: Layout,
    host: EffectHost,
    simulation: SimulationState,
    surface: DisplaySurfaceType,
    reload_requests: Receiver<ReloadRequest>,
    frame_time_keeper: FrameTimeKeeper,
    frame: Option<PixelBuffer>,
    summary: RunSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickDriverState {
    BeforeFrame,
    Compute,
    OutputData,
    FrameEnd,
}

#[derive(Debug, PartialEq)]
pub enum TickDriverCommand {
    Exit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub reloads_applied: u64,
    pub reloads_failed: u64,
}

impl TickDriver {
    pub fn new(
        layout: Layout,
        host: EffectHost,
        simulation: SimulationState,
        surface: DisplaySurfaceType,
        reload_requests: Receiver<ReloadRequest>,
        tick_interval_ms: u64,
    ) -> TickDriver {
        TickDriver {
            state: TickDriverState::BeforeFrame,
            command_queue: vec![],
            layout,
            host,
            simulation,
            surface,
            reload_requests,
            frame_time_keeper: FrameTimeKeeper::new(tick_interval_ms),
            frame: None,
            summary: RunSummary::default(),
        }
    }

    /// Runs until the surface asks to quit. Only display failures end the
    /// loop early.
    pub async fn run(&mut self) -> Result<RunSummary, DisplayError> {
        self.state = TickDriverState::BeforeFrame;
        self.command_queue.clear();
        self.frame_time_keeper.tick().await;

        'eventloop: loop {
            match self.state {
                TickDriverState::BeforeFrame => self.loop_step_before_frame()?,
                TickDriverState::Compute => self.loop_step_compute(),
                TickDriverState::OutputData => self.loop_step_output_data()?,
                TickDriverState::FrameEnd => self.loop_step_frame_end().await,
            }

            if self.command_queue.contains(&TickDriverCommand::Exit) {
                break 'eventloop;
            }
        }

        info!(
            "Stopped after {} ticks ({} reloads applied, {} failed, {}ms behind schedule)",
            self.summary.ticks,
            self.summary.reloads_applied,
            self.summary.reloads_failed,
            self.frame_time_keeper.late_time_ms()
        );

        Ok(self.summary)
    }

    pub fn exit(&mut self) {
        self.command_queue.push(TickDriverCommand::Exit);
    }

    pub fn host(&self) -> &EffectHost {
        &self.host
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.simulation
    }

    pub fn surface(&self) -> &DisplaySurfaceType {
        &self.surface
    }

    /// Unscaled buffer from the most recent tick.
    pub fn last_frame(&self) -> Option<&PixelBuffer> {
        self.frame.as_ref()
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    fn loop_step_before_frame(&mut self) -> Result<(), DisplayError> {
        self.apply_reload_requests();

        for event in self.surface.poll_events()? {
            match event {
                SurfaceEvent::Quit => {
                    info!("Quit requested");
                    self.exit();
                }
                SurfaceEvent::Resized { width, height } => {
                    debug!("Surface resized to {}x{}", width, height);
                }
            }
        }

        self.next_state();
        Ok(())
    }

    fn loop_step_compute(&mut self) {
        self.frame = Some(simulation::tick(
            &self.layout,
            &mut self.host,
            &self.simulation,
        ));
        self.summary.ticks += 1;

        self.next_state();
    }

    fn loop_step_output_data(&mut self) -> Result<(), DisplayError> {
        if let Some(frame) = &self.frame {
            self.surface.present(frame)?;
        }

        self.next_state();
        Ok(())
    }

    async fn loop_step_frame_end(&mut self) {
        let frame_data = self.frame_time_keeper.tick().await;
        trace!("Frame {} done", frame_data.frame);

        self.next_state();
    }

    /// Several requests for the same file collapse into one reload.
    fn apply_reload_requests(&mut self) {
        let mut pending: Vec<ReloadRequest> = vec![];
        for request in self.reload_requests.try_iter() {
            if !pending.contains(&request) {
                pending.push(request);
            }
        }

        for request in pending {
            if self.host.reload_from_path(&request.path) {
                self.summary.reloads_applied += 1;
            } else {
                self.summary.reloads_failed += 1;
            }
        }
    }

    fn next_state(&mut self) {
        self.state = match self.state {
            TickDriverState::BeforeFrame => TickDriverState::Compute,
            TickDriverState::Compute => TickDriverState::OutputData,
            TickDriverState::OutputData => TickDriverState::FrameEnd,
            TickDriverState::FrameEnd => TickDriverState::BeforeFrame,
        }
    }
}

#[cfg(test)]
mod tests {
    use crossbeam::channel;

    use super::*;
    use crate::{
        devices::{headless::HeadlessSurface, Viewport},
        effect::factory::ScriptCompiler,
        led::Color,
        pixel_buffer::ScaleMode,
    };

    fn driver(canvas: &str, ticks: u64) -> (TickDriver, channel::Sender<ReloadRequest>) {
        let layout = Layout::parse(canvas).unwrap();
        let simulation = SimulationState::new(layout.led_count());
        let host = EffectHost::new(Box::new(ScriptCompiler::default()));
        let surface = HeadlessSurface::new(Viewport::new(8, 8, ScaleMode::Nearest), Some(ticks));
        let (sender, receiver) = channel::unbounded();

        (
            TickDriver::new(layout, host, simulation, surface.into(), receiver, 1),
            sender,
        )
    }

    #[tokio::test]
    async fn runs_until_surface_quits() {
        let (mut driver, _sender) = driver("0 1", 3);
        let summary = driver.run().await.unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(driver.summary(), summary);
        assert_eq!(driver.simulation().colors().snapshot(), vec![Color::WHITE; 2]);
        assert_eq!(driver.last_frame().unwrap().pixels(), &[0xFFFFFFu32, 0, 0xFFFFFF]);
        match driver.surface() {
            DisplaySurfaceType::Headless(surface) => assert_eq!(surface.frames_presented(), 3),
            DisplaySurfaceType::Terminal(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn duplicate_requests_are_coalesced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effect.rhai");
        std::fs::write(&path, "fn effect_fn(leds, c) { leds.set(Color(1, 2, 3)); }").unwrap();

        let (mut driver, sender) = driver("0", 1);
        for _ in 0..3 {
            sender.send(ReloadRequest { path: path.clone() }).unwrap();
        }

        let summary = driver.run().await.unwrap();
        assert_eq!(summary.reloads_applied, 1);
        assert_eq!(driver.last_frame().unwrap().pixels(), &[0x010203u32]);
        assert_eq!(driver.simulation().colors().get(0), Some(Color::new(1, 2, 3)));
    }

    #[tokio::test]
    async fn failed_reload_keeps_running() {
        let (mut driver, sender) = driver("0", 2);
        sender
            .send(ReloadRequest {
                path: "/nonexistent/effect.rhai".into(),
            })
            .unwrap();

        let summary = driver.run().await.unwrap();
        assert_eq!(summary.reloads_failed, 1);
        assert_eq!(summary.ticks, 2);
        assert_eq!(driver.host().routine_name(), "default");
    }
}
