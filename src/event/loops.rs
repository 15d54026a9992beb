//! Loop storage: the set of currently looping event sources.
//!
//! Each loop maps its source's local time onto the scheduler's global
//! playhead through a start offset. When a source finishes a cycle the offset
//! moves forward by the cycle length and the source restarts, so a single
//! pull may wrap a loop several times.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::types::{EventSource, Sequence};
use crate::eval::error::RuntimeError;
use crate::log::Logger;

/// Shortest cycle, in beats, that is looped. Shorter non-empty cycles play once.
pub const MIN_CYCLE: f64 = 1e-3;

struct Loop {
    /// Global playhead position of the current cycle's local time zero.
    start: f64,
    source: Box<dyn EventSource>,
    /// Replacement installed at the next cycle boundary.
    pending: Option<Box<dyn EventSource>>,
    /// Finished a cycle that cannot advance `start`; nothing more to pull.
    idle: bool,
}

impl Loop {
    fn new(start: f64, source: Box<dyn EventSource>) -> Self {
        Self {
            start,
            source,
            pending: None,
            idle: false,
        }
    }

    fn events_until(
        &mut self,
        id: &str,
        playhead: f64,
        logger: &dyn Logger,
    ) -> Result<Sequence, RuntimeError> {
        let mut events = Sequence::new();
        loop {
            if self.idle {
                return Ok(events);
            }
            let local = playhead - self.start;
            if local < 0.0 {
                return Ok(events);
            }

            let pulled = self.source.events_until(local)?;
            let offset = self.start;
            events.extend(pulled.events.into_iter().map(|e| e.shifted(offset)));

            if !pulled.done {
                return Ok(events);
            }

            if pulled.playhead <= 0.0 {
                match self.pending.take() {
                    Some(next) => self.source = next,
                    None => self.idle = true,
                }
                continue;
            }

            let next_start = self.start + pulled.playhead;
            if pulled.playhead < MIN_CYCLE || next_start <= self.start {
                logger.error(&format!(
                    "loop '{id}': cycle of {} beats is too short to repeat at beat {}",
                    pulled.playhead, self.start
                ));
                match self.pending.take() {
                    Some(next) => self.source = next,
                    None => self.idle = true,
                }
                continue;
            }

            self.start = next_start;
            if let Some(next) = self.pending.take() {
                self.source = next;
            }
            self.source.restart();
        }
    }
}

/// Active loops keyed by id. Iteration (and so dispatch) order is by id.
pub struct LoopStorage {
    loops: BTreeMap<String, Loop>,
    logger: Rc<dyn Logger>,
}

impl LoopStorage {
    pub fn new(logger: Rc<dyn Logger>) -> Self {
        Self {
            loops: BTreeMap::new(),
            logger,
        }
    }

    /// Register `source` under `id`, starting at global position `start`.
    ///
    /// With `defer` set, an existing running loop keeps playing and the new
    /// source takes over at its next cycle boundary.
    pub fn set_loop(&mut self, id: &str, source: Box<dyn EventSource>, start: f64, defer: bool) {
        match self.loops.get_mut(id) {
            Some(existing) if defer && !existing.idle => {
                existing.pending = Some(source);
            }
            _ => {
                self.loops.insert(id.to_string(), Loop::new(start, source));
            }
        }
    }

    pub fn unset_loop(&mut self, id: &str) {
        self.loops.remove(id);
    }

    pub fn unset_all(&mut self) {
        self.loops.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.loops.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.loops.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Pull every loop up to the global `playhead`.
    ///
    /// A loop that fails is logged and removed; the others are unaffected.
    pub fn events_until(&mut self, playhead: f64) -> Sequence {
        let mut events = Sequence::new();
        let mut failed = Vec::new();

        for (id, lp) in self.loops.iter_mut() {
            match lp.events_until(id, playhead, self.logger.as_ref()) {
                Ok(pulled) => events.extend(pulled),
                Err(e) => {
                    self.logger.error(&format!("loop '{id}' stopped: {e}"));
                    failed.push(id.clone());
                }
            }
        }

        for id in failed {
            self.loops.remove(&id);
        }
        events
    }
}
