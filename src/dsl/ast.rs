//! Abstract Syntax Tree for the cadenza language.
//!
//! Child nodes are reference counted: a `fun` or `seq` value keeps its body
//! alive after the program that defined it has been dropped, and the
//! evaluator can hold on to statements while a procedure is suspended.

use std::rc::Rc;

pub type Expr = Rc<Expression>;
pub type Stmt = Rc<Statement>;
pub type Block = Rc<Vec<Stmt>>;

/// A parsed program: top-level statements in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    Integer(f64),
    Float(f64),
    Boolean(bool),
    String(String),
    Nil,
    Unary {
        op: UnaryOperator,
        operand: Expr,
    },
    Binary {
        op: BinaryOperator,
        left: Expr,
        right: Expr,
    },
    Assignment {
        target: AssignTarget,
        value: Expr,
    },
    Function(Rc<FunctionDefinition>),
    Call {
        callee: Expr,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Index {
        array: Expr,
        index: Expr,
    },
    StepSequence(StepSequence),
    /// `seq { ... }`: a musical procedure body.
    Procedure(Block),
}

/// Left-hand side of `=`.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Identifier(String),
    Index { array: Expr, index: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub params: Vec<String>,
    pub body: Block,
}

/// `step { pattern | attr = value, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StepSequence {
    pub pattern: Vec<Step>,
    pub attributes: Vec<(String, f64)>,
}

impl StepSequence {
    pub fn attribute(&self, name: &str) -> Option<f64> {
        // Last assignment wins.
        self.attributes
            .iter()
            .rev()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| *value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Pitch(f64),
    Name(String),
    Rest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Command { command: Command, arg: Expr },
    Expression(Expr),
    Return(Expr),
    If {
        condition: Expr,
        then: Stmt,
        otherwise: Option<Stmt>,
    },
    While { condition: Expr, body: Stmt },
    Block(Block),
}

/// Built-in commands: `loop`, `tempo`, `play`, `sleep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Loop,
    Tempo,
    Play,
    Sleep,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Loop => "loop",
            Command::Tempo => "tempo",
            Command::Play => "play",
            Command::Sleep => "sleep",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `:=:`
    Stack,
    /// `:+:`
    Concat,
    Divide,
    Multiply,
    Add,
    Subtract,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    NotEqual,
    Equal,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Stack => ":=:",
            BinaryOperator::Concat => ":+:",
            BinaryOperator::Divide => "/",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Equal => "==",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
        }
    }
}
