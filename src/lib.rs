//! Cadenza: a live-coding music language.
//!
//! Source text is tokenized and parsed ([`dsl`]), run by a tree-walking
//! evaluator ([`eval`]) whose `seq` procedures can suspend at `sleep`, and
//! played by a lookahead scheduler ([`event`]) on pluggable instruments.

pub mod config;
pub mod dsl;
pub mod eval;
pub mod event;
pub mod instrument;
pub mod interpreter;
pub mod log;
pub mod midi;

pub use interpreter::{Error, Interpreter};
