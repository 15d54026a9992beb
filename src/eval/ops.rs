//! Operator semantics and step-sequence materialization.
//!
//! Operands are checked dynamically; there is no implicit conversion between
//! numbers, booleans and strings.

use super::error::RuntimeError;
use super::value::Value;
use crate::dsl::ast::{BinaryOperator, Step, StepSequence, UnaryOperator};
use crate::event::types::{self, MusicalEvent, Sequence};

/// Grid spacing of step sequences, in beats.
pub const STEP_LENGTH: f64 = 0.25;
/// Velocity used when none is given.
pub const DEFAULT_VOLUME: u8 = 64;
/// Duration used when none is given, in beats.
pub const DEFAULT_DURATION: f64 = 0.25;

pub fn unary(op: UnaryOperator, operand: Value) -> Result<Value, RuntimeError> {
    let name = format!("operator '{}'", op.as_str());
    match op {
        UnaryOperator::Not => Ok(Value::Boolean(!operand.as_bool(&name)?)),
        UnaryOperator::Negate => Ok(Value::Number(-operand.as_number(&name)?)),
    }
}

pub fn binary(op: BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use BinaryOperator::*;

    let name = format!("operator '{}'", op.as_str());
    let numbers = |left: &Value, right: &Value| -> Result<(f64, f64), RuntimeError> {
        Ok((left.as_number(&name)?, right.as_number(&name)?))
    };

    let value = match op {
        Stack | Concat => {
            let (left, right) = match (left, right) {
                (Value::Sequence(l), Value::Sequence(r)) => (l, r),
                (Value::Sequence(_), other) | (other, _) => {
                    return Err(RuntimeError::type_mismatch(
                        name.as_str(),
                        "sequence",
                        other.type_name(),
                    ));
                }
            };
            if op == Stack {
                Value::Sequence(types::stack(left, right))
            } else {
                Value::Sequence(types::concatenate(left, right))
            }
        }
        Add => match (left, right) {
            (Value::String(mut a), Value::String(b)) => {
                a.push_str(&b);
                Value::String(a)
            }
            (left, right) => {
                let (a, b) = numbers(&left, &right)?;
                Value::Number(a + b)
            }
        },
        Subtract => {
            let (a, b) = numbers(&left, &right)?;
            Value::Number(a - b)
        }
        Multiply => {
            let (a, b) = numbers(&left, &right)?;
            Value::Number(a * b)
        }
        Divide => {
            let (a, b) = numbers(&left, &right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Value::Number(a / b)
        }
        Greater | GreaterEqual | Less | LessEqual => {
            let (a, b) = numbers(&left, &right)?;
            Value::Boolean(match op {
                Greater => a > b,
                GreaterEqual => a >= b,
                Less => a < b,
                _ => a <= b,
            })
        }
        Equal => Value::Boolean(left.equals(&right, &name)?),
        NotEqual => Value::Boolean(!left.equals(&right, &name)?),
        And => Value::Boolean(left.as_bool(&name)? && right.as_bool(&name)?),
        Or => Value::Boolean(left.as_bool(&name)? || right.as_bool(&name)?),
    };
    Ok(value)
}

/// Validate a MIDI pitch or velocity.
pub fn midi_byte(value: &Value, what: &str) -> Result<u8, RuntimeError> {
    Ok(value.as_integer_in(what, 0.0, 127.0)? as u8)
}

/// Expand a step pattern into notes on a 0.25-beat grid.
pub fn step_sequence(seq: &StepSequence, instrument: &str) -> Result<Sequence, RuntimeError> {
    let mut events = Sequence::new();
    for (i, step) in seq.pattern.iter().enumerate() {
        let pitch = match step {
            Step::Rest => continue,
            Step::Pitch(p) => *p,
            Step::Name(name) => seq.attribute(name).ok_or_else(|| {
                RuntimeError::invalid(format!("unknown step attribute: {name}"))
            })?,
        };
        let pitch = midi_byte(&Value::Number(pitch), "step pitch")?;
        events.push(MusicalEvent::note(
            i as f64 * STEP_LENGTH,
            pitch,
            DEFAULT_VOLUME,
            DEFAULT_DURATION,
            instrument,
        ));
    }
    Ok(events)
}
