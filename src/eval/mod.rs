//! Tree-walking evaluator.
//!
//! Programs run on a [`Machine`](machine::Machine) against a root scope that
//! holds the built-ins. Requests for the scheduler (`loop`, `tempo`, start of
//! playback) go out through a [`ControlQueue`].

pub mod builtins;
pub mod env;
pub mod error;
pub mod machine;
pub mod ops;
pub mod procedure;
pub mod spread;
pub mod value;

pub use builtins::BuiltinContext;
pub use env::Env;
pub use error::RuntimeError;
pub use machine::{Host, Machine, Status};
pub use procedure::{Procedure, ProcedureSource};
pub use value::Value;

use std::rc::Rc;

use crate::dsl::Program;
use crate::event::control::{Control, ControlQueue};

/// Runs programs against one long-lived root scope, so definitions survive
/// from one evaluation to the next.
pub struct Evaluator {
    root: Env,
    host: Host,
}

impl Evaluator {
    pub fn new(ctx: &BuiltinContext, controls: ControlQueue) -> Self {
        let root = Env::new();
        builtins::install(&root, ctx);
        Self {
            root,
            host: Host {
                controls,
                default_instrument: ctx.default_instrument.clone(),
            },
        }
    }

    pub fn root(&self) -> &Env {
        &self.root
    }

    pub fn controls(&self) -> &ControlQueue {
        &self.host.controls
    }

    /// Execute the top-level statements in order, then request playback.
    ///
    /// The first error stops the pass. Controls queued by statements that
    /// already ran stay queued.
    pub fn evaluate(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let statements = Rc::new(program.statements.clone());
        let mut machine = Machine::top_level(statements, self.root.clone(), self.host.clone());
        machine.run(f64::INFINITY)?;
        self.host.controls.push(Control::Play);
        Ok(())
    }
}
