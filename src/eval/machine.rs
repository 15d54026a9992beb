//! The resumable statement/expression machine.
//!
//! Execution state lives in two explicit stacks instead of the Rust call
//! stack: `frames` holds the work still to do and `values` holds the operands
//! produced so far. A `sleep` that would move past the caller's horizon
//! leaves its frame on top of the stack and returns, so the same machine can
//! be resumed later from exactly that point.

use std::mem;
use std::rc::Rc;

use super::env::Env;
use super::error::RuntimeError;
use super::ops::{self, DEFAULT_DURATION, DEFAULT_VOLUME};
use super::procedure::{Procedure, ProcedureSource};
use super::value::{NoteValue, Value};
use crate::dsl::ast::{
    AssignTarget, BinaryOperator, Block, Command, Expr, Expression, Statement, Stmt,
    UnaryOperator,
};
use crate::event::control::{Control, ControlQueue};
use crate::event::source::StaticSource;
use crate::event::types::{EventSource, MusicalEvent, Sequence};

/// What running code may reach outside itself.
#[derive(Clone)]
pub struct Host {
    pub controls: ControlQueue,
    /// Instrument used by `play <pitch>` and step sequences.
    pub default_instrument: String,
}

/// Why [`Machine::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Stopped at a `sleep` reaching past the horizon; call `run` again.
    Suspended,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    TopLevel,
    Procedure,
}

enum Frame {
    Exec(Stmt),
    Block { stmts: Block, index: usize },
    Eval(Expr),
    Discard,
    Command(Command),
    Loop(String),
    Return,
    Branch { then: Stmt, otherwise: Option<Stmt> },
    WhileCheck { looping: Stmt, body: Stmt },
    Unary(UnaryOperator),
    BinaryRight { op: BinaryOperator, right: Expr },
    BinaryApply(BinaryOperator),
    Assign(String),
    AssignIndex { rebind: Option<String> },
    Collect(usize),
    Index,
    Invoke(usize),
    CallReturn { env: Env, depth: usize },
    Sleep { until: f64 },
}

pub struct Machine {
    frames: Vec<Frame>,
    values: Vec<Value>,
    env: Env,
    host: Host,
    mode: Mode,
    /// Local time in beats.
    playhead: f64,
    events: Sequence,
}

impl Machine {
    /// A machine running program statements. `play`, `sleep` and `return`
    /// are errors here.
    pub fn top_level(stmts: Block, env: Env, host: Host) -> Self {
        Self::new(stmts, env, host, Mode::TopLevel)
    }

    /// A machine running the body of a `seq`.
    pub fn procedure(body: Block, env: Env, host: Host) -> Self {
        Self::new(body, env, host, Mode::Procedure)
    }

    fn new(stmts: Block, env: Env, host: Host, mode: Mode) -> Self {
        Self {
            frames: vec![Frame::Block { stmts, index: 0 }],
            values: Vec::new(),
            env,
            host,
            mode,
            playhead: 0.0,
            events: Sequence::new(),
        }
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    /// Events played since the last call.
    pub fn take_events(&mut self) -> Sequence {
        mem::take(&mut self.events)
    }

    /// Run until the body completes or a `sleep` would pass `horizon`.
    ///
    /// An error abandons the rest of the computation.
    pub fn run(&mut self, horizon: f64) -> Result<Status, RuntimeError> {
        while let Some(frame) = self.frames.pop() {
            match self.step(frame, horizon) {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    self.frames.clear();
                    self.values.clear();
                    return Err(e);
                }
            }
        }
        Ok(Status::Finished)
    }

    fn pop(&mut self) -> Value {
        self.values.pop().unwrap_or(Value::Nil)
    }

    fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let at = self.values.len().saturating_sub(n);
        self.values.split_off(at)
    }

    fn step(&mut self, frame: Frame, horizon: f64) -> Result<Option<Status>, RuntimeError> {
        match frame {
            Frame::Exec(stmt) => self.exec(stmt)?,
            Frame::Block { stmts, index } => {
                if let Some(stmt) = stmts.get(index).cloned() {
                    if index + 1 < stmts.len() {
                        self.frames.push(Frame::Block {
                            stmts,
                            index: index + 1,
                        });
                    }
                    self.frames.push(Frame::Exec(stmt));
                }
            }
            Frame::Eval(expr) => self.eval(&expr)?,
            Frame::Discard => {
                self.pop();
            }
            Frame::Command(command) => {
                let value = self.pop();
                self.command(command, value)?;
            }
            Frame::Loop(id) => {
                let value = self.pop();
                let source: Box<dyn EventSource> = match value {
                    Value::Sequence(seq) => Box::new(StaticSource::new(seq)),
                    Value::Procedure(procedure) => {
                        Box::new(ProcedureSource::new(procedure, self.host.clone()))
                    }
                    other => {
                        return Err(RuntimeError::type_mismatch(
                            "loop",
                            "sequence or seq",
                            other.type_name(),
                        ))
                    }
                };
                self.host.controls.push(Control::SetLoop { id, source });
            }
            Frame::Return => {
                let value = self.pop();
                self.unwind(value)?;
            }
            Frame::Branch { then, otherwise } => {
                if self.pop().as_bool("if")? {
                    self.frames.push(Frame::Exec(then));
                } else if let Some(otherwise) = otherwise {
                    self.frames.push(Frame::Exec(otherwise));
                }
            }
            Frame::WhileCheck { looping, body } => {
                if self.pop().as_bool("while")? {
                    self.frames.push(Frame::Exec(looping));
                    self.frames.push(Frame::Exec(body));
                }
            }
            Frame::Unary(op) => {
                let operand = self.pop();
                self.values.push(ops::unary(op, operand)?);
            }
            Frame::BinaryRight { op, right } => {
                let short_circuit = matches!(
                    (op, self.values.last()),
                    (BinaryOperator::And, Some(Value::Boolean(false)))
                        | (BinaryOperator::Or, Some(Value::Boolean(true)))
                );
                if !short_circuit {
                    self.frames.push(Frame::BinaryApply(op));
                    self.frames.push(Frame::Eval(right));
                }
            }
            Frame::BinaryApply(op) => {
                let right = self.pop();
                let left = self.pop();
                self.values.push(ops::binary(op, left, right)?);
            }
            Frame::Assign(name) => {
                let value = self.values.last().cloned().unwrap_or(Value::Nil);
                self.env.set(&name, value)?;
            }
            Frame::AssignIndex { rebind } => {
                let value = self.pop();
                let index = self.pop();
                let mut items = match self.pop() {
                    Value::Array(items) => items,
                    other => {
                        return Err(RuntimeError::type_mismatch(
                            "index assignment",
                            "array",
                            other.type_name(),
                        ))
                    }
                };
                let i = array_index(&index, items.len())?;
                items[i] = value.clone();
                if let Some(name) = rebind {
                    self.env.set(&name, Value::Array(items))?;
                }
                self.values.push(value);
            }
            Frame::Collect(n) => {
                let items = self.pop_n(n);
                self.values.push(Value::Array(items));
            }
            Frame::Index => {
                let index = self.pop();
                let value = match self.pop() {
                    Value::Array(mut items) => {
                        let i = array_index(&index, items.len())?;
                        items.swap_remove(i)
                    }
                    other => {
                        return Err(RuntimeError::type_mismatch(
                            "indexing",
                            "array",
                            other.type_name(),
                        ))
                    }
                };
                self.values.push(value);
            }
            Frame::Invoke(argc) => {
                let args = self.pop_n(argc);
                let callee = self.pop();
                self.invoke(callee, args)?;
            }
            Frame::CallReturn { env, depth } => {
                // Fell off the end of the body without `return`.
                self.env = env;
                self.values.truncate(depth);
                self.values.push(Value::Nil);
            }
            Frame::Sleep { until } => {
                if until > horizon {
                    self.frames.push(Frame::Sleep { until });
                    return Ok(Some(Status::Suspended));
                }
                self.playhead = until;
            }
        }
        Ok(None)
    }

    fn exec(&mut self, stmt: Stmt) -> Result<(), RuntimeError> {
        match &*stmt {
            Statement::Command {
                command: Command::Loop,
                arg,
            } => match &**arg {
                Expression::Identifier(id) => {
                    self.frames.push(Frame::Loop(id.clone()));
                    self.frames.push(Frame::Eval(arg.clone()));
                }
                _ => return Err(RuntimeError::invalid("loop expects an identifier")),
            },
            Statement::Command { command, arg } => {
                self.frames.push(Frame::Command(*command));
                self.frames.push(Frame::Eval(arg.clone()));
            }
            Statement::Expression(expr) => {
                self.frames.push(Frame::Discard);
                self.frames.push(Frame::Eval(expr.clone()));
            }
            Statement::Return(expr) => {
                self.frames.push(Frame::Return);
                self.frames.push(Frame::Eval(expr.clone()));
            }
            Statement::If {
                condition,
                then,
                otherwise,
            } => {
                self.frames.push(Frame::Branch {
                    then: then.clone(),
                    otherwise: otherwise.clone(),
                });
                self.frames.push(Frame::Eval(condition.clone()));
            }
            Statement::While { condition, body } => {
                self.frames.push(Frame::WhileCheck {
                    looping: stmt.clone(),
                    body: body.clone(),
                });
                self.frames.push(Frame::Eval(condition.clone()));
            }
            Statement::Block(stmts) => {
                self.frames.push(Frame::Block {
                    stmts: stmts.clone(),
                    index: 0,
                });
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<(), RuntimeError> {
        let value = match &**expr {
            Expression::Identifier(name) => self
                .env
                .get(name)
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?,
            Expression::Integer(n) | Expression::Float(n) => Value::Number(*n),
            Expression::Boolean(b) => Value::Boolean(*b),
            Expression::String(s) => Value::String(s.clone()),
            Expression::Nil => Value::Nil,
            Expression::Function(def) => Value::Function(def.clone()),
            Expression::StepSequence(seq) => {
                Value::Sequence(ops::step_sequence(seq, &self.host.default_instrument)?)
            }
            Expression::Procedure(body) => Value::Procedure(Rc::new(Procedure {
                body: body.clone(),
                env: self.env.clone(),
            })),
            Expression::Unary { op, operand } => {
                self.frames.push(Frame::Unary(*op));
                self.frames.push(Frame::Eval(operand.clone()));
                return Ok(());
            }
            Expression::Binary { op, left, right } => {
                self.frames.push(Frame::BinaryRight {
                    op: *op,
                    right: right.clone(),
                });
                self.frames.push(Frame::Eval(left.clone()));
                return Ok(());
            }
            Expression::Assignment { target, value } => {
                match target {
                    AssignTarget::Identifier(name) => {
                        self.frames.push(Frame::Assign(name.clone()));
                        self.frames.push(Frame::Eval(value.clone()));
                    }
                    AssignTarget::Index { array, index } => {
                        let rebind = match &**array {
                            Expression::Identifier(name) => Some(name.clone()),
                            _ => None,
                        };
                        self.frames.push(Frame::AssignIndex { rebind });
                        self.frames.push(Frame::Eval(value.clone()));
                        self.frames.push(Frame::Eval(index.clone()));
                        self.frames.push(Frame::Eval(array.clone()));
                    }
                }
                return Ok(());
            }
            Expression::Call { callee, args } => {
                self.frames.push(Frame::Invoke(args.len()));
                for arg in args.iter().rev() {
                    self.frames.push(Frame::Eval(arg.clone()));
                }
                self.frames.push(Frame::Eval(callee.clone()));
                return Ok(());
            }
            Expression::Array(items) => {
                self.frames.push(Frame::Collect(items.len()));
                for item in items.iter().rev() {
                    self.frames.push(Frame::Eval(item.clone()));
                }
                return Ok(());
            }
            Expression::Index { array, index } => {
                self.frames.push(Frame::Index);
                self.frames.push(Frame::Eval(index.clone()));
                self.frames.push(Frame::Eval(array.clone()));
                return Ok(());
            }
        };
        self.values.push(value);
        Ok(())
    }

    fn invoke(&mut self, callee: Value, args: Vec<Value>) -> Result<(), RuntimeError> {
        match callee {
            Value::BuiltIn(builtin) => {
                let result = builtin.call(&args)?;
                self.values.push(result);
            }
            Value::Function(def) => {
                if def.params.len() != args.len() {
                    return Err(RuntimeError::Arity {
                        name: "function".to_string(),
                        expected: def.params.len().to_string(),
                        found: args.len(),
                    });
                }
                // Parameters live in a child of the caller's scope.
                let scope = self.env.extend();
                for (param, arg) in def.params.iter().zip(args) {
                    scope.define(param.as_str(), arg);
                }
                let caller = mem::replace(&mut self.env, scope);
                self.frames.push(Frame::CallReturn {
                    env: caller,
                    depth: self.values.len(),
                });
                self.frames.push(Frame::Block {
                    stmts: def.body.clone(),
                    index: 0,
                });
            }
            other => return Err(RuntimeError::NotCallable(other.type_name())),
        }
        Ok(())
    }

    /// Pop frames up to the nearest call and hand it `value`.
    fn unwind(&mut self, value: Value) -> Result<(), RuntimeError> {
        while let Some(frame) = self.frames.pop() {
            if let Frame::CallReturn { env, depth } = frame {
                self.env = env;
                self.values.truncate(depth);
                self.values.push(value);
                return Ok(());
            }
        }
        self.values.clear();
        match self.mode {
            // Ends the seq body.
            Mode::Procedure => Ok(()),
            Mode::TopLevel => Err(RuntimeError::ReturnOutsideFunction),
        }
    }

    fn command(&mut self, command: Command, value: Value) -> Result<(), RuntimeError> {
        let name = command.as_str();
        match command {
            Command::Play => {
                self.require_procedure(name)?;
                for note in self.notes(value)? {
                    self.events.push(MusicalEvent::note(
                        self.playhead,
                        note.pitch,
                        note.volume,
                        note.duration,
                        &note.instrument,
                    ));
                }
            }
            Command::Sleep => {
                self.require_procedure(name)?;
                let beats = value.as_number(name)?;
                if !beats.is_finite() || beats < 0.0 {
                    return Err(RuntimeError::invalid(format!(
                        "sleep expects a non-negative number of beats, got {beats}"
                    )));
                }
                self.frames.push(Frame::Sleep {
                    until: self.playhead + beats,
                });
            }
            Command::Tempo => {
                let bpm = value.as_number(name)?;
                if !bpm.is_finite() || bpm <= 0.0 {
                    return Err(RuntimeError::invalid(format!(
                        "tempo expects a positive number, got {bpm}"
                    )));
                }
                self.host.controls.push(Control::SetTempo(bpm));
            }
            Command::Loop => {
                return Err(RuntimeError::invalid("loop expects an identifier"));
            }
        }
        Ok(())
    }

    fn require_procedure(&self, command: &str) -> Result<(), RuntimeError> {
        match self.mode {
            Mode::Procedure => Ok(()),
            Mode::TopLevel => Err(RuntimeError::invalid(format!(
                "{command} can only be used inside a seq"
            ))),
        }
    }

    /// The notes `play` should emit for `value`: one, or a chord.
    fn notes(&self, value: Value) -> Result<Vec<NoteValue>, RuntimeError> {
        match value {
            Value::Array(items) => items.into_iter().map(|v| self.note(v)).collect(),
            other => Ok(vec![self.note(other)?]),
        }
    }

    fn note(&self, value: Value) -> Result<NoteValue, RuntimeError> {
        match value {
            Value::Number(_) => Ok(NoteValue {
                instrument: self.host.default_instrument.clone(),
                pitch: ops::midi_byte(&value, "play")?,
                volume: DEFAULT_VOLUME,
                duration: DEFAULT_DURATION,
            }),
            Value::Note(note) => Ok(note),
            other => Err(RuntimeError::type_mismatch(
                "play",
                "number, note or array",
                other.type_name(),
            )),
        }
    }
}

/// Validate `index` against an array of `len` items.
fn array_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let n = index.as_number("array index")?;
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
        return Err(RuntimeError::InvalidIndex(n));
    }
    let i = n as usize;
    if i >= len {
        return Err(RuntimeError::IndexOutOfBounds { index: i, len });
    }
    Ok(i)
}
