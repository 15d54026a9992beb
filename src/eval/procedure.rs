//! `seq { ... }` values and the event source that drives them.

use std::fmt;
use std::rc::Rc;

use super::env::Env;
use super::error::RuntimeError;
use super::machine::{Host, Machine, Status};
use crate::dsl::ast::Block;
use crate::event::types::{EventSource, EventSourceSequence};

/// A musical procedure: a body plus the scope it was created in.
pub struct Procedure {
    pub body: Block,
    pub env: Env,
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("statements", &self.body.len())
            .finish()
    }
}

/// Pulls events out of a [`Procedure`], suspending at `sleep`.
///
/// Each restart runs the body from the top in a fresh child of the
/// captured scope, so variables assigned inside the body start over while
/// outer variables keep their values across cycles.
pub struct ProcedureSource {
    procedure: Rc<Procedure>,
    host: Host,
    machine: Machine,
    done: bool,
}

impl ProcedureSource {
    pub fn new(procedure: Rc<Procedure>, host: Host) -> Self {
        let machine = Self::fresh_machine(&procedure, &host);
        Self {
            procedure,
            host,
            machine,
            done: false,
        }
    }

    fn fresh_machine(procedure: &Procedure, host: &Host) -> Machine {
        Machine::procedure(
            procedure.body.clone(),
            procedure.env.extend(),
            host.clone(),
        )
    }
}

impl EventSource for ProcedureSource {
    fn restart(&mut self) {
        self.machine = Self::fresh_machine(&self.procedure, &self.host);
        self.done = false;
    }

    fn events_until(&mut self, playhead: f64) -> Result<EventSourceSequence, RuntimeError> {
        if self.done {
            return Ok(EventSourceSequence {
                events: Vec::new(),
                playhead: self.machine.playhead(),
                done: true,
            });
        }

        let status = self.machine.run(playhead);
        let events = self.machine.take_events();
        self.done = !matches!(status, Ok(Status::Suspended));
        status?;
        Ok(EventSourceSequence {
            events,
            playhead: self.machine.playhead(),
            done: self.done,
        })
    }
}
