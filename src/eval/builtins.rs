//! Built-in functions bound in the root scope.

use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::env::Env;
use super::error::RuntimeError;
use super::ops::{midi_byte, DEFAULT_DURATION, DEFAULT_VOLUME};
use super::spread::{spread, MAX_BEATS};
use super::value::{BuiltIn, NoteValue, Value};
use crate::instrument::InstrumentRegistry;
use crate::log::Logger;
use crate::midi::{MidiBackend, MAX_CHANNEL};

/// Collaborators the built-ins reach into.
#[derive(Clone)]
pub struct BuiltinContext {
    pub logger: Rc<dyn Logger>,
    pub instruments: Rc<InstrumentRegistry>,
    /// `None` when MIDI is unavailable on this host.
    pub midi: Option<Rc<dyn MidiBackend>>,
    pub rng: Rc<RefCell<ChaCha8Rng>>,
    pub default_instrument: String,
}

fn check_arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), RuntimeError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min} to {max}")
        };
        return Err(RuntimeError::Arity {
            name: name.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn define(
    env: &Env,
    name: &'static str,
    arity: (usize, usize),
    func: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
) {
    let (min, max) = arity;
    env.define(
        name,
        Value::BuiltIn(BuiltIn::new(name, move |args| {
            check_arity(name, args, min, max)?;
            func(args)
        })),
    );
}

/// Bind every built-in in `env`.
pub fn install(env: &Env, ctx: &BuiltinContext) {
    define(env, "len", (1, 1), |args| match &args[0] {
        Value::Array(items) => Ok(Value::Number(items.len() as f64)),
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(RuntimeError::type_mismatch(
            "len",
            "array or string",
            other.type_name(),
        )),
    });

    let rng = ctx.rng.clone();
    define(env, "rand", (0, 0), move |_| {
        Ok(Value::Number(rng.borrow_mut().gen::<f64>()))
    });

    define(env, "floor", (1, 1), |args| {
        Ok(Value::Number(args[0].as_number("floor")?.floor()))
    });
    define(env, "ceil", (1, 1), |args| {
        Ok(Value::Number(args[0].as_number("ceil")?.ceil()))
    });

    let logger = ctx.logger.clone();
    define(env, "print", (1, 1), move |args| {
        logger.info(&args[0].to_string());
        Ok(Value::Nil)
    });

    define(env, "str", (1, 1), |args| Ok(Value::String(args[0].to_string())));

    define(env, "spread", (2, 2), |args| {
        let accents = args[0].as_integer_in("spread", 0.0, MAX_BEATS as f64)? as usize;
        let beats = args[1].as_integer_in("spread", 0.0, MAX_BEATS as f64)? as usize;
        let pattern = spread(accents, beats)?;
        Ok(Value::Array(pattern.into_iter().map(Value::Boolean).collect()))
    });

    define(env, "instrument", (1, 1), |args| match &args[0] {
        Value::String(name) => Ok(Value::Instrument(name.clone())),
        other => Err(RuntimeError::type_mismatch(
            "instrument",
            "string",
            other.type_name(),
        )),
    });

    define(env, "note", (2, 4), |args| {
        let instrument = match &args[0] {
            Value::Instrument(name) | Value::String(name) => name.clone(),
            other => {
                return Err(RuntimeError::type_mismatch(
                    "note",
                    "instrument",
                    other.type_name(),
                ))
            }
        };
        let pitch = midi_byte(&args[1], "note pitch")?;
        let volume = match args.get(2) {
            Some(v) => midi_byte(v, "note volume")?,
            None => DEFAULT_VOLUME,
        };
        let duration = match args.get(3) {
            Some(v) => {
                let d = v.as_number("note duration")?;
                if !d.is_finite() || d < 0.0 {
                    return Err(RuntimeError::invalid(format!(
                        "note duration must be a non-negative number, got {d}"
                    )));
                }
                d
            }
            None => DEFAULT_DURATION,
        };
        Ok(Value::Note(NoteValue {
            instrument,
            pitch,
            volume,
            duration,
        }))
    });

    let midi = ctx.midi.clone();
    define(env, "list_midi_outputs", (0, 0), move |_| {
        let backend = midi.as_ref().ok_or_else(midi_unavailable)?;
        let outputs = backend
            .outputs()
            .map_err(|e| RuntimeError::Device(e.to_string()))?;
        Ok(Value::Array(
            outputs
                .into_iter()
                .map(|o| Value::Array(vec![Value::String(o.id), Value::String(o.name)]))
                .collect(),
        ))
    });

    let midi = ctx.midi.clone();
    let instruments = ctx.instruments.clone();
    define(env, "create_midi_instrument", (2, 2), move |args| {
        let backend = midi.as_ref().ok_or_else(midi_unavailable)?;
        let output = match &args[0] {
            Value::String(s) => s.clone(),
            Value::Number(_) => args[0].to_string(),
            other => {
                return Err(RuntimeError::type_mismatch(
                    "create_midi_instrument",
                    "output id or name",
                    other.type_name(),
                ))
            }
        };
        let channel = args[1].as_integer_in(
            "create_midi_instrument channel",
            0.0,
            f64::from(MAX_CHANNEL),
        )? as u8;
        let instrument = backend
            .connect(&output, channel)
            .map_err(|e| RuntimeError::Device(e.to_string()))?;
        let name = instrument.name().to_string();
        instruments.register(name.as_str(), instrument);
        Ok(Value::Instrument(name))
    });
}

fn midi_unavailable() -> RuntimeError {
    RuntimeError::Device("MIDI is not available".to_string())
}
