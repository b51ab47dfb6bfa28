use std::rc::Rc;

use log::{debug, info, warn};
use rhai::{CallFnOptions, Dynamic, Engine, Scope, AST};

use crate::{led::Color, strip::StripView};

use super::{
    script_api, EffectCompiler, EffectLoadError, EffectRoutine, EffectRuntimeError, EffectSource,
    PersistentState, ENTRY_POINT,
};

const SCRIPT_LOG_TARGET: &str = "ledsim::effect::script";

/// Bounds applied to every call into a script.
#[derive(Debug, Clone, Copy)]
pub struct ScriptLimits {
    /// 0 means unlimited.
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        ScriptLimits {
            max_operations: 5_000_000,
            max_call_levels: 64,
            max_expr_depth: 64,
        }
    }
}

/// Compiles Rhai effect scripts. Every script gets its own scope; only the
/// `effect_fn` routine is taken out of it.
pub struct ScriptCompiler {
    engine: Rc<Engine>,
}

pub struct ScriptRoutine {
    name: String,
    engine: Rc<Engine>,
    ast: AST,
    scope: Scope<'static>,
    takes_state: bool,
}

impl ScriptCompiler {
    pub fn new(limits: ScriptLimits) -> ScriptCompiler {
        let mut engine = Engine::new();

        engine.set_max_operations(limits.max_operations);
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);

        engine.on_print(|text| info!(target: SCRIPT_LOG_TARGET, "{}", text));
        engine.on_debug(|text, source, position| match source {
            Some(source) => debug!(target: SCRIPT_LOG_TARGET, "{} @ {:?}: {}", source, position, text),
            None => debug!(target: SCRIPT_LOG_TARGET, "{:?}: {}", position, text),
        });

        script_api::register(&mut engine);

        ScriptCompiler {
            engine: Rc::new(engine),
        }
    }
}

impl Default for ScriptCompiler {
    fn default() -> Self {
        ScriptCompiler::new(ScriptLimits::default())
    }
}

impl EffectCompiler for ScriptCompiler {
    fn compile(&self, source: &EffectSource) -> Result<Box<dyn EffectRoutine>, EffectLoadError> {
        let ast = self
            .engine
            .compile(&source.code)
            .map_err(|err| EffectLoadError::Parse {
                name: source.name.clone(),
                message: err.to_string(),
            })?;

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|err| EffectLoadError::Init {
                name: source.name.clone(),
                message: err.to_string(),
            })?;

        let arities: Vec<usize> = ast
            .iter_functions()
            .filter(|f| f.name == ENTRY_POINT)
            .map(|f| f.params.len())
            .collect();

        let takes_state = if arities.contains(&3) {
            true
        } else if arities.contains(&2) {
            false
        } else {
            if !arities.is_empty() {
                warn!(
                    "{}: `{}` takes {:?} parameters",
                    source.name, ENTRY_POINT, arities
                );
            }
            return Err(EffectLoadError::MissingRoutine {
                name: source.name.clone(),
            });
        };

        Ok(Box::new(ScriptRoutine {
            name: source.name.clone(),
            engine: Rc::clone(&self.engine),
            ast,
            scope,
            takes_state,
        }))
    }
}

impl EffectRoutine for ScriptRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &mut self,
        leds: &StripView,
        current_color: Color,
        state: &PersistentState,
    ) -> Result<(), EffectRuntimeError> {
        // Top-level statements already ran once at load time.
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);

        let result = if self.takes_state {
            self.engine.call_fn_with_options::<Dynamic>(
                options,
                &mut self.scope,
                &self.ast,
                ENTRY_POINT,
                (leds.clone(), current_color, state.clone()),
            )
        } else {
            self.engine.call_fn_with_options::<Dynamic>(
                options,
                &mut self.scope,
                &self.ast,
                ENTRY_POINT,
                (leds.clone(), current_color),
            )
        };

        result
            .map(|_| ())
            .map_err(|err| EffectRuntimeError::Script(err.to_string()))
    }
}
