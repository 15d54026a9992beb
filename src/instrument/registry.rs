//! Instrument registry: resolves instrument names carried by events.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{Instrument, NopInstrument};

/// Name → instrument lookup shared by the evaluator and the scheduler.
///
/// Unknown names resolve to a [`NopInstrument`], never an error.
pub struct InstrumentRegistry {
    instruments: RefCell<HashMap<String, Rc<dyn Instrument>>>,
    fallback: Rc<dyn Instrument>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self {
            instruments: RefCell::new(HashMap::new()),
            fallback: Rc::new(NopInstrument),
        }
    }

    /// Register (or replace) an instrument under `name`.
    pub fn register(&self, name: impl Into<String>, instrument: Rc<dyn Instrument>) {
        self.instruments.borrow_mut().insert(name.into(), instrument);
    }

    pub fn remove(&self, name: &str) -> Option<Rc<dyn Instrument>> {
        self.instruments.borrow_mut().remove(name)
    }

    /// Look up an instrument by name.
    pub fn get(&self, name: &str) -> Rc<dyn Instrument> {
        self.instruments
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instruments.borrow().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instruments.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for InstrumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
