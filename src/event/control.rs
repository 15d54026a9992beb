//! Requests from running code to the scheduler.
//!
//! Procedures may issue `loop` and `tempo` while the scheduler is in the
//! middle of pulling them. Those requests are queued here and applied at the
//! start of the next tick.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::types::EventSource;

pub enum Control {
    SetLoop {
        id: String,
        source: Box<dyn EventSource>,
    },
    SetTempo(f64),
    Play,
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::SetLoop { id, .. } => write!(f, "SetLoop({id})"),
            Control::SetTempo(bpm) => write!(f, "SetTempo({bpm})"),
            Control::Play => write!(f, "Play"),
        }
    }
}

/// Shared FIFO of [`Control`] messages. Cloning shares the same queue.
#[derive(Clone, Default)]
pub struct ControlQueue {
    inner: Rc<RefCell<VecDeque<Control>>>,
}

impl ControlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, control: Control) {
        self.inner.borrow_mut().push_back(control);
    }

    /// Take every queued message, oldest first.
    pub fn drain(&self) -> Vec<Control> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}
