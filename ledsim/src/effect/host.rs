use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    path::Path,
};

use log::{error, info, trace};

use crate::state::SimulationState;

use super::{
    DefaultRoutine, EffectCompiler, EffectLoadError, EffectRoutine, EffectRuntimeError,
    EffectSource, PersistentState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    /// Still running the built-in white routine.
    Idle,
    Active,
}

/// Owns the active effect routine and the persistent state handed to it.
///
/// The routine is only ever replaced wholesale by a successful reload. Nothing
/// a routine does while running can stop the host from running the next tick.
pub struct EffectHost {
    compiler: Box<dyn EffectCompiler>,
    routine: Box<dyn EffectRoutine>,
    state: PersistentState,
    phase: HostPhase,
    last_load_error: Option<EffectLoadError>,
    last_runtime_error: Option<EffectRuntimeError>,
    failed_ticks: u64,
}

impl EffectHost {
    pub fn new(compiler: Box<dyn EffectCompiler>) -> EffectHost {
        EffectHost {
            compiler,
            routine: Box::new(DefaultRoutine),
            state: PersistentState::default(),
            phase: HostPhase::Idle,
            last_load_error: None,
            last_runtime_error: None,
            failed_ticks: 0,
        }
    }

    pub fn reload(&mut self, source: &EffectSource) -> bool {
        info!("Loading effect {}", source.name);

        match self.compiler.compile(source) {
            Ok(routine) => {
                self.replace_routine(routine);
                self.last_load_error = None;
                info!("Effect {} is now active", source.name);
                true
            }
            Err(err) => {
                error!("Failed to load effect, keeping {}: {}", self.routine.name(), err);
                self.last_load_error = Some(err);
                false
            }
        }
    }

    pub fn reload_from_path(&mut self, path: &Path) -> bool {
        match EffectSource::read(path) {
            Ok(source) => self.reload(&source),
            Err(err) => {
                error!("Failed to load effect, keeping {}: {}", self.routine.name(), err);
                self.last_load_error = Some(err);
                false
            }
        }
    }

    /// Swaps in an already built routine with fresh state.
    pub fn replace_routine(&mut self, routine: Box<dyn EffectRoutine>) {
        self.routine = routine;
        self.state = PersistentState::default();
        self.phase = HostPhase::Active;
        self.last_runtime_error = None;
    }

    /// Runs the active routine over every LED. Failures are logged and
    /// swallowed; whatever the routine wrote before failing stays.
    pub fn run_tick(&mut self, state: &SimulationState) {
        let leds = state.colors().all();
        let current_color = state.current_color();
        let routine = &mut self.routine;
        let persistent = &self.state;

        let result = catch_unwind(AssertUnwindSafe(|| {
            routine.run(&leds, current_color, persistent)
        }))
        .unwrap_or_else(|payload| Err(EffectRuntimeError::Panic(panic_message(payload))));

        match result {
            Ok(()) => {
                if self.last_runtime_error.take().is_some() {
                    info!(
                        "Effect {} recovered after {} failed ticks",
                        self.routine.name(),
                        self.failed_ticks
                    );
                }
                self.failed_ticks = 0;
            }
            Err(err) => {
                self.failed_ticks += 1;
                if self.last_runtime_error.as_ref() != Some(&err) {
                    error!("Effect {} failed: {}", self.routine.name(), err);
                } else {
                    trace!("Effect {} failed again: {}", self.routine.name(), err);
                }
                self.last_runtime_error = Some(err);
            }
        }
    }

    pub fn persistent_state(&self) -> &PersistentState {
        &self.state
    }

    pub fn routine_name(&self) -> &str {
        self.routine.name()
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == HostPhase::Active
    }

    pub fn last_load_error(&self) -> Option<&EffectLoadError> {
        self.last_load_error.as_ref()
    }

    pub fn last_runtime_error(&self) -> Option<&EffectRuntimeError> {
        self.last_runtime_error.as_ref()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
