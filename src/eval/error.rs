//! Evaluation errors.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    UndefinedVariable(String),
    /// An operator or command received an operand of the wrong type.
    TypeMismatch {
        operation: String,
        expected: &'static str,
        found: &'static str,
    },
    Arity {
        name: String,
        expected: String,
        found: usize,
    },
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },
    InvalidIndex(f64),
    DivisionByZero,
    NotCallable(&'static str),
    BuiltInReassignment(String),
    ReturnOutsideFunction,
    /// A value was the right type but outside the accepted range.
    InvalidArgument(String),
    /// A device collaborator (e.g. MIDI) failed or is missing.
    Device(String),
}

impl RuntimeError {
    pub fn type_mismatch(
        operation: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        RuntimeError::TypeMismatch {
            operation: operation.into(),
            expected,
            found,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        RuntimeError::InvalidArgument(message.into())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable(name) => write!(f, "undefined variable: {name}"),
            RuntimeError::TypeMismatch {
                operation,
                expected,
                found,
            } => write!(f, "{operation} expects {expected}, got {found}"),
            RuntimeError::Arity {
                name,
                expected,
                found,
            } => write!(
                f,
                "{name} expects {expected} argument(s), {found} provided"
            ),
            RuntimeError::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for array of length {len}")
            }
            RuntimeError::InvalidIndex(index) => {
                write!(f, "array index must be a non-negative integer, got {index}")
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::NotCallable(found) => write!(f, "cannot call a value of type {found}"),
            RuntimeError::BuiltInReassignment(name) => {
                write!(f, "cannot reassign built-in function '{name}'")
            }
            RuntimeError::ReturnOutsideFunction => write!(f, "return outside of a function"),
            RuntimeError::InvalidArgument(msg) => write!(f, "{msg}"),
            RuntimeError::Device(msg) => write!(f, "device error: {msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let err = RuntimeError::type_mismatch("operator '+'", "number", "boolean");
        assert_eq!(err.to_string(), "operator '+' expects number, got boolean");
        assert_eq!(
            RuntimeError::UndefinedVariable("x".to_string()).to_string(),
            "undefined variable: x"
        );
        assert_eq!(
            RuntimeError::BuiltInReassignment("len".to_string()).to_string(),
            "cannot reassign built-in function 'len'"
        );
    }
}
