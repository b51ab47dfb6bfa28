//! Types and functions visible to effect scripts.
//!
//! - `Color`: value type with `r`, `g`, `b`, `gradient`, `fade_to_black`,
//!   `fade_to_white`, `to_rgb`, `from_color`. Built with `Color(r, g, b)`,
//!   `Color::rgb(r, g, b)`, `Color::from_rgb(0xRRGGBB)`, `Color::BLACK` and
//!   `Color::WHITE`.
//! - `Leds`: the strip (or a range of it). `size()`, `all()`, `range(a, b)`,
//!   `set(color)`, `set_red/green/blue(v)`, `fade_to_black(n)`,
//!   `fade_to_white(n)`, `leds[i]`, `leds[i] = color`, `for led in leds`.
//! - `Led`: one slot. Same channel properties as `Color`, writes go straight
//!   to the strip.
//! - `State`: values kept between ticks. `state["key"]`, `state.key`,
//!   `get(key, default)`, `contains`, `remove`, `clear`, `len`.
//!
//! Blend amounts must be integers in 0..=255; floats raise an error instead
//! of being rounded.

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Module, Position, FLOAT, INT};

use crate::{
    led::{checked_amount, reject_float_amount, Color, ColorError},
    strip::{Led, StripView},
};

use super::PersistentState;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

pub fn register(engine: &mut Engine) {
    register_color(engine);
    register_leds(engine);
    register_led(engine);
    register_state(engine);
    register_helpers(engine);
}

fn contract_error(err: ColorError) -> Box<EvalAltResult> {
    err.to_string().into()
}

fn amount_arg(amount: INT) -> RhaiResult<u8> {
    checked_amount(amount).map_err(contract_error)
}

fn float_amount<T>(amount: FLOAT) -> RhaiResult<T> {
    Err(contract_error(reject_float_amount(amount)))
}

/// Accepts a `Color`, a `Led` (its current color) or a packed `0xRRGGBB`.
fn color_arg(value: Dynamic) -> RhaiResult<Color> {
    if let Some(color) = value.clone().try_cast::<Color>() {
        return Ok(color);
    }
    if let Some(led) = value.clone().try_cast::<Led>() {
        return Ok(led.color());
    }
    if let Ok(packed) = value.as_int() {
        return Ok(Color::from_rgb((packed & 0xFF_FFFF) as u32));
    }

    Err(format!("expected a Color, got {}", value.type_name()).into())
}

fn bound_arg(value: INT) -> RhaiResult<usize> {
    usize::try_from(value).map_err(|_| format!("range bound {} is negative", value).into())
}

/// Negative indices count from the end, like Rhai arrays.
fn index_arg(len: usize, index: INT) -> RhaiResult<usize> {
    let resolved = if index < 0 {
        len as INT + index
    } else {
        index
    };

    if resolved < 0 || resolved >= len as INT {
        return Err(Box::new(EvalAltResult::ErrorArrayBounds(
            len,
            index,
            Position::NONE,
        )));
    }

    Ok(resolved as usize)
}

fn register_color(engine: &mut Engine) {
    engine
        .register_type_with_name::<Color>("Color")
        .register_fn("Color", |r: INT, g: INT, b: INT| Color::wrapping(r, g, b))
        .register_fn("Color", |packed: INT| {
            Color::from_rgb((packed & 0xFF_FFFF) as u32)
        })
        .register_get_set(
            "r",
            |c: &mut Color| INT::from(c.r),
            |c: &mut Color, v: INT| c.set_r(v),
        )
        .register_get_set(
            "g",
            |c: &mut Color| INT::from(c.g),
            |c: &mut Color, v: INT| c.set_g(v),
        )
        .register_get_set(
            "b",
            |c: &mut Color| INT::from(c.b),
            |c: &mut Color, v: INT| c.set_b(v),
        )
        .register_fn("to_rgb", |c: Color| INT::from(c.to_rgb()))
        .register_fn("from_color", |c: &mut Color, other: Dynamic| -> RhaiResult<()> {
            c.from_color(&color_arg(other)?);
            Ok(())
        })
        .register_fn(
            "gradient",
            |c: Color, other: Dynamic, amount: INT| -> RhaiResult<Color> {
                Ok(c.gradient(&color_arg(other)?, amount_arg(amount)?))
            },
        )
        .register_fn(
            "gradient",
            |_: Color, _: Dynamic, amount: FLOAT| -> RhaiResult<Color> {
                float_amount(amount)
            },
        )
        .register_fn("fade_to_black", |c: Color, amount: INT| -> RhaiResult<Color> {
            Ok(c.fade_to_black(amount_arg(amount)?))
        })
        .register_fn("fade_to_black", |_: Color, amount: FLOAT| -> RhaiResult<Color> {
            float_amount(amount)
        })
        .register_fn("fade_to_white", |c: Color, amount: INT| -> RhaiResult<Color> {
            Ok(c.fade_to_white(amount_arg(amount)?))
        })
        .register_fn("fade_to_white", |_: Color, amount: FLOAT| -> RhaiResult<Color> {
            float_amount(amount)
        })
        .register_fn("==", |a: Color, b: Color| a == b)
        .register_fn("!=", |a: Color, b: Color| a != b)
        .register_fn("to_string", |c: &mut Color| c.to_string())
        .register_fn("to_debug", |c: &mut Color| c.to_string());

    let mut module = Module::new();
    module.set_var("BLACK", Color::BLACK);
    module.set_var("WHITE", Color::WHITE);
    // `new` is a reserved word in Rhai.
    module.set_native_fn(
        "rgb",
        |r: INT, g: INT, b: INT| -> RhaiResult<Color> { Ok(Color::wrapping(r, g, b)) },
    );
    module.set_native_fn("from_rgb", |packed: INT| -> RhaiResult<Color> {
        Ok(Color::from_rgb((packed & 0xFF_FFFF) as u32))
    });
    engine.register_static_module("Color", module.into());
}

fn register_leds(engine: &mut Engine) {
    engine
        .register_type_with_name::<StripView>("Leds")
        .register_iterator::<StripView>()
        .register_fn("size", |v: &mut StripView| v.size() as INT)
        .register_fn("len", |v: &mut StripView| v.size() as INT)
        .register_get("len", |v: &mut StripView| v.size() as INT)
        .register_fn("is_empty", |v: &mut StripView| v.is_empty())
        .register_fn("all", |v: &mut StripView| v.all())
        .register_fn(
            "range",
            |v: &mut StripView, start: INT, end: INT| -> RhaiResult<StripView> {
                Ok(v.range(bound_arg(start)?, bound_arg(end)?))
            },
        )
        .register_fn("set", |v: &mut StripView, color: Dynamic| -> RhaiResult<()> {
            v.set(color_arg(color)?);
            Ok(())
        })
        .register_fn("set_red", |v: &mut StripView, value: INT| v.set_red(value))
        .register_fn("set_green", |v: &mut StripView, value: INT| v.set_green(value))
        .register_fn("set_blue", |v: &mut StripView, value: INT| v.set_blue(value))
        .register_fn("fade_to_black", |v: &mut StripView, amount: INT| -> RhaiResult<()> {
            v.fade_to_black(amount_arg(amount)?);
            Ok(())
        })
        .register_fn("fade_to_black", |_: &mut StripView, amount: FLOAT| -> RhaiResult<()> {
            float_amount(amount)
        })
        .register_fn("fade_to_white", |v: &mut StripView, amount: INT| -> RhaiResult<()> {
            v.fade_to_white(amount_arg(amount)?);
            Ok(())
        })
        .register_fn("fade_to_white", |_: &mut StripView, amount: FLOAT| -> RhaiResult<()> {
            float_amount(amount)
        })
        .register_indexer_get(|v: &mut StripView, index: INT| -> RhaiResult<Led> {
            let index = index_arg(v.size(), index)?;
            v.led(index)
                .ok_or_else(|| format!("LED {} is not on the strip", index).into())
        })
        .register_indexer_set(
            |v: &mut StripView, index: INT, color: Dynamic| -> RhaiResult<()> {
                let index = index_arg(v.size(), index)?;
                v.set_led(index, color_arg(color)?);
                Ok(())
            },
        )
        .register_fn("to_string", |v: &mut StripView| {
            format!("Leds[{}..{}]", v.bounds().start, v.bounds().end)
        })
        .register_fn("to_debug", |v: &mut StripView| {
            let colors: Vec<String> = v.colors().iter().map(Color::to_string).collect();
            format!("[{}]", colors.join(", "))
        });
}

fn register_led(engine: &mut Engine) {
    engine
        .register_type_with_name::<Led>("Led")
        .register_get_set(
            "r",
            |l: &mut Led| INT::from(l.color().r),
            |l: &mut Led, v: INT| l.set_r(v),
        )
        .register_get_set(
            "g",
            |l: &mut Led| INT::from(l.color().g),
            |l: &mut Led, v: INT| l.set_g(v),
        )
        .register_get_set(
            "b",
            |l: &mut Led| INT::from(l.color().b),
            |l: &mut Led, v: INT| l.set_b(v),
        )
        .register_get("index", |l: &mut Led| l.index() as INT)
        .register_fn("color", |l: &mut Led| l.color())
        .register_fn("to_rgb", |l: &mut Led| INT::from(l.color().to_rgb()))
        .register_fn("set", |l: &mut Led, color: Dynamic| -> RhaiResult<()> {
            l.set(color_arg(color)?);
            Ok(())
        })
        .register_fn("from_color", |l: &mut Led, color: Dynamic| -> RhaiResult<()> {
            l.set(color_arg(color)?);
            Ok(())
        })
        .register_fn(
            "gradient",
            |l: &mut Led, other: Dynamic, amount: INT| -> RhaiResult<Color> {
                Ok(l.color().gradient(&color_arg(other)?, amount_arg(amount)?))
            },
        )
        .register_fn(
            "gradient",
            |_: &mut Led, _: Dynamic, amount: FLOAT| -> RhaiResult<Color> { float_amount(amount) },
        )
        .register_fn("fade_to_black", |l: &mut Led, amount: INT| -> RhaiResult<Color> {
            Ok(l.color().fade_to_black(amount_arg(amount)?))
        })
        .register_fn("fade_to_black", |_: &mut Led, amount: FLOAT| -> RhaiResult<Color> {
            float_amount(amount)
        })
        .register_fn("fade_to_white", |l: &mut Led, amount: INT| -> RhaiResult<Color> {
            Ok(l.color().fade_to_white(amount_arg(amount)?))
        })
        .register_fn("fade_to_white", |_: &mut Led, amount: FLOAT| -> RhaiResult<Color> {
            float_amount(amount)
        })
        .register_fn("to_string", |l: &mut Led| l.color().to_string())
        .register_fn("to_debug", |l: &mut Led| {
            format!("Led({}, {})", l.index(), l.color())
        });
}

fn register_state(engine: &mut Engine) {
    engine
        .register_type_with_name::<PersistentState>("State")
        .register_indexer_get(|s: &mut PersistentState, key: ImmutableString| {
            s.get(&key).unwrap_or(Dynamic::UNIT)
        })
        .register_indexer_set(
            |s: &mut PersistentState, key: ImmutableString, value: Dynamic| {
                s.insert(&key, value)
            },
        )
        .register_fn(
            "get",
            |s: &mut PersistentState, key: ImmutableString, default: Dynamic| {
                s.get(&key).unwrap_or(default)
            },
        )
        .register_fn("contains", |s: &mut PersistentState, key: ImmutableString| {
            s.contains(&key)
        })
        .register_fn("remove", |s: &mut PersistentState, key: ImmutableString| {
            s.remove(&key).unwrap_or(Dynamic::UNIT)
        })
        .register_fn("clear", |s: &mut PersistentState| s.clear())
        .register_get("len", |s: &mut PersistentState| s.len() as INT)
        .register_fn("len", |s: &mut PersistentState| s.len() as INT);
}

fn register_helpers(engine: &mut Engine) {
    engine
        .register_fn("random_uint32", || INT::from(rand::random::<u32>()))
        .register_fn("random_float", rand::random::<FLOAT>);
}
