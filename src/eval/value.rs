//! Runtime values.

use std::fmt;
use std::rc::Rc;

use super::error::RuntimeError;
use super::procedure::Procedure;
use crate::dsl::ast::FunctionDefinition;
use crate::event::types::Sequence;

/// Signature of a native built-in function.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, RuntimeError>;

/// A named native function bound in the root scope.
#[derive(Clone)]
pub struct BuiltIn {
    pub name: &'static str,
    func: Rc<NativeFn>,
}

impl BuiltIn {
    pub fn new(
        name: &'static str,
        func: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        Self {
            name,
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.func)(args)
    }
}

impl fmt::Debug for BuiltIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltIn({})", self.name)
    }
}

/// A note not yet placed in time: what `note(...)` returns and `play` accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteValue {
    pub instrument: String,
    pub pitch: u8,
    pub volume: u8,
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    /// Arrays have value semantics: assignment copies.
    Array(Vec<Value>),
    Sequence(Sequence),
    Procedure(Rc<Procedure>),
    Function(Rc<FunctionDefinition>),
    BuiltIn(BuiltIn),
    /// Name of an instrument in the registry.
    Instrument(String),
    Note(NoteValue),
    Nil,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Sequence(_) => "sequence",
            Value::Procedure(_) => "procedure",
            Value::Function(_) => "function",
            Value::BuiltIn(_) => "built-in function",
            Value::Instrument(_) => "instrument",
            Value::Note(_) => "note",
            Value::Nil => "nil",
        }
    }

    pub fn as_number(&self, operation: &str) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::type_mismatch(
                operation,
                "number",
                other.type_name(),
            )),
        }
    }

    pub fn as_bool(&self, operation: &str) -> Result<bool, RuntimeError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(RuntimeError::type_mismatch(
                operation,
                "boolean",
                other.type_name(),
            )),
        }
    }

    /// An integral number in `min..=max`.
    pub fn as_integer_in(
        &self,
        operation: &str,
        min: f64,
        max: f64,
    ) -> Result<f64, RuntimeError> {
        let n = self.as_number(operation)?;
        if n.fract() != 0.0 || n < min || n > max {
            return Err(RuntimeError::invalid(format!(
                "{operation} expects an integer between {min} and {max}, got {n}"
            )));
        }
        Ok(n)
    }

    /// Structural equality for `==`/`!=`.
    ///
    /// Values of different types are an error, except `nil`, which is only
    /// equal to itself.
    pub fn equals(&self, other: &Value, operation: &str) -> Result<bool, RuntimeError> {
        match (self, other) {
            (Value::Nil, Value::Nil) => Ok(true),
            (Value::Nil, _) | (_, Value::Nil) => Ok(false),
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Instrument(a), Value::Instrument(b)) => Ok(a == b),
            (Value::Note(a), Value::Note(b)) => Ok(a == b),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b) {
                    if !x.equals(y, operation)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (a, b) if a.type_name() == b.type_name() => Err(RuntimeError::invalid(format!(
                "{operation} cannot compare values of type {}",
                a.type_name()
            ))),
            (a, b) => Err(RuntimeError::type_mismatch(
                operation,
                a.type_name(),
                b.type_name(),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::String(s) => write!(f, "\"{s}\"")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
            Value::Sequence(seq) => write!(f, "<sequence of {} events>", seq.len()),
            Value::Procedure(_) => write!(f, "<seq>"),
            Value::Function(def) => write!(f, "<fun({})>", def.params.join(", ")),
            Value::BuiltIn(b) => write!(f, "<built-in {}>", b.name),
            Value::Instrument(name) => write!(f, "<instrument {name}>"),
            Value::Note(n) => write!(f, "<note {} on {}>", n.pitch, n.instrument),
            Value::Nil => write!(f, "nil"),
        }
    }
}
