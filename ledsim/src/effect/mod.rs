use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use rhai::{Dynamic, Map};
use thiserror::Error;

use crate::{
    led::{Color, ColorError},
    strip::StripView,
};

pub mod factory;
pub mod host;
pub mod script_api;

/// Name of the routine an effect source has to define.
pub const ENTRY_POINT: &str = "effect_fn";

/// Per-tick logic computing LED colors.
pub trait EffectRoutine {
    fn name(&self) -> &str;

    /// Mutates `leds` in place. Writes made before an error are kept.
    fn run(
        &mut self,
        leds: &StripView,
        current_color: Color,
        state: &PersistentState,
    ) -> Result<(), EffectRuntimeError>;
}

/// Turns an effect source into a runnable routine.
pub trait EffectCompiler {
    fn compile(&self, source: &EffectSource) -> Result<Box<dyn EffectRoutine>, EffectLoadError>;
}

#[derive(Debug, Clone)]
pub struct EffectSource {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum EffectLoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{name}: {message}")]
    Parse { name: String, message: String },
    #[error("{name}: top-level statements failed: {message}")]
    Init { name: String, message: String },
    #[error(
        "{name}: no `effect_fn` taking (leds, current_color) or (leds, current_color, state)"
    )]
    MissingRoutine { name: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EffectRuntimeError {
    #[error("{0}")]
    Script(String),
    #[error("effect panicked: {0}")]
    Panic(String),
    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Values an effect keeps between ticks, the equivalent of a C `static`.
///
/// Cloning shares the map; the host hands a clone to the routine every tick
/// and drops it on reload.
#[derive(Debug, Clone, Default)]
pub struct PersistentState {
    values: Arc<RwLock<Map>>,
}

/// Fallback routine used until an effect is loaded: every LED white.
pub struct DefaultRoutine;

impl EffectSource {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> EffectSource {
        EffectSource {
            name: name.into(),
            code: code.into(),
        }
    }

    pub fn read(path: &Path) -> Result<EffectSource, EffectLoadError> {
        let code = fs::read_to_string(path).map_err(|source| EffectLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(EffectSource::new(path.display().to_string(), code))
    }
}

impl PersistentState {
    pub fn get(&self, key: &str) -> Option<Dynamic> {
        self.values.read().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: Dynamic) {
        self.values.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Dynamic> {
        self.values.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub fn clear(&self) {
        self.values.write().clear();
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|value| value.as_int().ok())
    }
}

impl EffectRoutine for DefaultRoutine {
    fn name(&self) -> &str {
        "default"
    }

    fn run(
        &mut self,
        leds: &StripView,
        _current_color: Color,
        _state: &PersistentState,
    ) -> Result<(), EffectRuntimeError> {
        leds.set(Color::WHITE);
        Ok(())
    }
}
