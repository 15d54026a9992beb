//! The full pipeline: source text → tokens → AST → evaluation → scheduler.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::EngineConfig;
use crate::dsl::{self, SyntaxError};
use crate::eval::{BuiltinContext, Evaluator, RuntimeError};
use crate::event::{AudioClock, Scheduler};
use crate::instrument::InstrumentRegistry;
use crate::log::Logger;
use crate::midi::MidiBackend;

/// Anything `execute` can fail with.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Syntax(SyntaxError),
    Runtime(RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "{e}"),
            Error::Runtime(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Syntax(e) => Some(e),
            Error::Runtime(e) => Some(e),
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Self {
        Error::Syntax(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Error::Runtime(e)
    }
}

/// Owns an evaluator and the scheduler it feeds.
pub struct Interpreter {
    evaluator: Evaluator,
    scheduler: Scheduler,
    instruments: Rc<InstrumentRegistry>,
    logger: Rc<dyn Logger>,
}

impl Interpreter {
    pub fn new(
        clock: Rc<dyn AudioClock>,
        instruments: Rc<InstrumentRegistry>,
        logger: Rc<dyn Logger>,
        midi: Option<Rc<dyn MidiBackend>>,
        config: &EngineConfig,
    ) -> Self {
        let scheduler = Scheduler::new(clock, instruments.clone(), logger.clone(), config);
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let ctx = BuiltinContext {
            logger: logger.clone(),
            instruments: instruments.clone(),
            midi,
            rng: Rc::new(RefCell::new(rng)),
            default_instrument: config.default_instrument.clone(),
        };
        let evaluator = Evaluator::new(&ctx, scheduler.controls());
        Self {
            evaluator,
            scheduler,
            instruments,
            logger,
        }
    }

    /// Parse and run `source`, then hand its loops and tempo to the scheduler.
    ///
    /// Errors are logged and returned. Loops already playing keep playing;
    /// `loop`/`tempo` statements that ran before the error still take effect.
    pub fn execute(&mut self, source: &str) -> Result<(), Error> {
        let result = match dsl::parse(source) {
            Ok(program) => self.evaluator.evaluate(&program).map_err(Error::from),
            Err(e) => Err(Error::from(e)),
        };
        self.scheduler.apply_controls();
        if let Err(e) = &result {
            self.logger.error(&e.to_string());
        }
        result
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn instruments(&self) -> &Rc<InstrumentRegistry> {
        &self.instruments
    }

    pub fn tick(&mut self) {
        self.scheduler.tick();
    }
}
