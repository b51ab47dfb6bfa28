use std::{fs, thread, time::Duration};

use crossbeam::channel;
use ledsim::{
    devices::{headless::HeadlessSurface, DisplaySurfaceType, Viewport},
    effect::{factory::ScriptCompiler, host::EffectHost},
    event_loop::TickDriver,
    pixel_buffer::ScaleMode,
    state::SimulationState,
    watcher::{EffectWatcher, ReloadRequest},
    world::layout::Layout,
};

const RED: &str = "fn effect_fn(leds, current_color, state) { leds.set(Color(255, 0, 0)); }";
const GREEN: &str = "fn effect_fn(leds, current_color, state) { leds.set(Color(0, 255, 0)); }";

#[test]
fn watcher_requests_reload_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("effect.rhai");
    fs::write(&path, RED).unwrap();

    let (sender, receiver) = channel::unbounded::<ReloadRequest>();
    let mut watcher = EffectWatcher::start(&path, sender).unwrap();

    fs::write(dir.path().join("unrelated.rhai"), GREEN).unwrap();
    fs::write(&path, GREEN).unwrap();

    let request = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(request.path.file_name().unwrap(), "effect.rhai");

    watcher.stop();
}

#[tokio::test]
async fn driver_picks_up_edits_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("effect.rhai");
    fs::write(&path, RED).unwrap();

    let layout = Layout::parse("0 1\n2 3").unwrap();
    let simulation = SimulationState::new(layout.led_count());
    let mut host = EffectHost::new(Box::new(ScriptCompiler::default()));
    assert!(host.reload_from_path(&path));

    let (sender, receiver) = channel::unbounded();
    let mut watcher = EffectWatcher::start(&path, sender).unwrap();

    let surface = HeadlessSurface::new(Viewport::new(6, 4, ScaleMode::Nearest), Some(300));
    let mut driver = TickDriver::new(layout, host, simulation, surface.into(), receiver, 5);

    let editor = {
        let path = path.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            fs::write(path, GREEN).unwrap();
        })
    };

    let summary = driver.run().await.unwrap();
    editor.join().unwrap();
    watcher.stop();

    assert_eq!(summary.ticks, 300);
    assert!(summary.reloads_applied >= 1);
    assert_eq!(driver.last_frame().unwrap().get(1, 2), Some(0x00FF00));

    match driver.surface() {
        DisplaySurfaceType::Headless(surface) => {
            let shown = surface.last_frame().unwrap();
            assert_eq!((shown.width(), shown.height()), (6, 4));
            assert_eq!(shown.get(0, 0), Some(0x00FF00));
        }
        DisplaySurfaceType::Terminal(_) => unreachable!(),
    }
}
