//! Parser for the cadenza language.
//!
//! Statements are parsed by recursive descent; expressions use operator
//! precedence (Pratt) parsing with a (left, right) binding power per operator.
//! The first malformed construct aborts the parse.

use std::rc::Rc;

use super::ast::*;
use super::error::SyntaxError;
use super::lexer::Tokenizer;
use super::token::{Keyword, Operator, Punctuation, Token};

/// Right binding power of the prefix operators `!` and `-`.
const PREFIX_POWER: u8 = 16;
/// Left binding power of the postfix call `(` and index `[` operators.
const POSTFIX_POWER: u8 = 17;

/// Infix binding powers. `:=:` binds tighter than `:+:`, and `=` is the only
/// right-associative operator.
fn infix_binding_power(op: Operator) -> Option<(u8, u8)> {
    let bp = match op {
        Operator::Concat => (1, 2),
        Operator::Assign => (2, 1),
        Operator::Stack | Operator::Or => (3, 4),
        Operator::And => (5, 6),
        Operator::Equal | Operator::NotEqual => (7, 8),
        Operator::Greater | Operator::GreaterEqual | Operator::Less | Operator::LessEqual => {
            (9, 10)
        }
        Operator::Plus | Operator::Minus => (11, 12),
        Operator::Multiply | Operator::Divide => (13, 14),
        Operator::Not => return None,
    };
    Some(bp)
}

fn binary_operator(op: Operator) -> Option<BinaryOperator> {
    let op = match op {
        Operator::Stack => BinaryOperator::Stack,
        Operator::Concat => BinaryOperator::Concat,
        Operator::Divide => BinaryOperator::Divide,
        Operator::Multiply => BinaryOperator::Multiply,
        Operator::Plus => BinaryOperator::Add,
        Operator::Minus => BinaryOperator::Subtract,
        Operator::Greater => BinaryOperator::Greater,
        Operator::GreaterEqual => BinaryOperator::GreaterEqual,
        Operator::Less => BinaryOperator::Less,
        Operator::LessEqual => BinaryOperator::LessEqual,
        Operator::NotEqual => BinaryOperator::NotEqual,
        Operator::Equal => BinaryOperator::Equal,
        Operator::And => BinaryOperator::And,
        Operator::Or => BinaryOperator::Or,
        Operator::Assign | Operator::Not => return None,
    };
    Some(op)
}

pub struct Parser {
    tokens: Tokenizer,
}

impl Parser {
    pub fn new(tokens: Tokenizer) -> Self {
        Self { tokens }
    }

    pub fn parse(&mut self) -> Result<Program, SyntaxError> {
        let statements = self.parse_statements_until(|t| *t == Token::Eof)?;
        Ok(Program { statements })
    }

    fn parse_statements_until(
        &mut self,
        stop: impl Fn(&Token) -> bool,
    ) -> Result<Vec<Stmt>, SyntaxError> {
        let mut statements = Vec::new();
        while !stop(self.peek()?) {
            if *self.peek()? == Token::Eof {
                return Err(self.error("unexpected end of input"));
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let statement = match self.peek()?.clone() {
            Token::Keyword(Keyword::Loop) => self.parse_command(Command::Loop)?,
            Token::Keyword(Keyword::Tempo) => self.parse_command(Command::Tempo)?,
            Token::Keyword(Keyword::Play) => self.parse_command(Command::Play)?,
            Token::Keyword(Keyword::Sleep) => self.parse_command(Command::Sleep)?,
            Token::Keyword(Keyword::Return) => {
                self.advance()?;
                let value = self.parse_expression()?;
                self.expect_punc(Punctuation::Semicolon)?;
                Statement::Return(value)
            }
            Token::Keyword(Keyword::If) => self.parse_if()?,
            Token::Keyword(Keyword::While) => self.parse_while()?,
            Token::Keyword(kw @ (Keyword::For | Keyword::Let | Keyword::Else)) => {
                return Err(self.error(format!("unexpected keyword '{}'", kw.as_str())));
            }
            Token::Punctuation(Punctuation::LBrace) => Statement::Block(self.parse_block()?),
            _ => {
                let expr = self.parse_expression()?;
                self.expect_punc(Punctuation::Semicolon)?;
                Statement::Expression(expr)
            }
        };
        Ok(Rc::new(statement))
    }

    fn parse_command(&mut self, command: Command) -> Result<Statement, SyntaxError> {
        self.advance()?;
        let arg = self.parse_expression()?;
        self.expect_punc(Punctuation::Semicolon)?;
        Ok(Statement::Command { command, arg })
    }

    fn parse_if(&mut self) -> Result<Statement, SyntaxError> {
        self.advance()?; // if
        let condition = self.parse_condition()?;
        let then = self.parse_statement()?;
        let otherwise = if *self.peek()? == Token::Keyword(Keyword::Else) {
            self.advance()?;
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then,
            otherwise,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, SyntaxError> {
        self.advance()?; // while
        let condition = self.parse_condition()?;
        let body = self.parse_statement()?;
        Ok(Statement::While { condition, body })
    }

    fn parse_condition(&mut self) -> Result<Expr, SyntaxError> {
        self.expect_punc(Punctuation::LParen)?;
        let condition = self.parse_expression()?;
        self.expect_punc(Punctuation::RParen)?;
        Ok(condition)
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        self.expect_punc(Punctuation::LBrace)?;
        let statements =
            self.parse_statements_until(|t| *t == Token::Punctuation(Punctuation::RBrace))?;
        self.expect_punc(Punctuation::RBrace)?;
        Ok(Rc::new(statements))
    }

    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_expression_bp(0)
    }

    fn parse_expression_bp(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            match self.peek()?.clone() {
                Token::Punctuation(Punctuation::LParen) => {
                    if POSTFIX_POWER < min_bp {
                        break;
                    }
                    let args = self.parse_delimited(
                        Punctuation::LParen,
                        Punctuation::RParen,
                        Punctuation::Comma,
                        Self::parse_expression,
                    )?;
                    lhs = Rc::new(Expression::Call { callee: lhs, args });
                }
                Token::Punctuation(Punctuation::LBracket) => {
                    if POSTFIX_POWER < min_bp {
                        break;
                    }
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.expect_punc(Punctuation::RBracket)?;
                    lhs = Rc::new(Expression::Index { array: lhs, index });
                }
                Token::Operator(op) => {
                    let Some((left_bp, right_bp)) = infix_binding_power(op) else {
                        break;
                    };
                    if left_bp < min_bp {
                        break;
                    }
                    self.advance()?;
                    let rhs = self.parse_expression_bp(right_bp)?;
                    lhs = self.combine(op, lhs, rhs)?;
                }
                _ => break,
            }
        }

        Ok(lhs)
    }

    fn combine(&self, op: Operator, left: Expr, right: Expr) -> Result<Expr, SyntaxError> {
        if op == Operator::Assign {
            let target = match &*left {
                Expression::Identifier(name) => AssignTarget::Identifier(name.clone()),
                Expression::Index { array, index } => AssignTarget::Index {
                    array: array.clone(),
                    index: index.clone(),
                },
                _ => return Err(self.error("invalid assignment target")),
            };
            return Ok(Rc::new(Expression::Assignment {
                target,
                value: right,
            }));
        }
        match binary_operator(op) {
            Some(op) => Ok(Rc::new(Expression::Binary { op, left, right })),
            None => Err(self.error(format!("unexpected operator '{}'", op.as_str()))),
        }
    }

    fn parse_prefix(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek()?.clone();
        let expr = match token {
            Token::Identifier(name) => {
                self.advance()?;
                Expression::Identifier(name)
            }
            Token::Integer(v) => {
                self.advance()?;
                Expression::Integer(v)
            }
            Token::Float(v) => {
                self.advance()?;
                Expression::Float(v)
            }
            Token::Boolean(b) => {
                self.advance()?;
                Expression::Boolean(b)
            }
            Token::String(s) => {
                self.advance()?;
                Expression::String(s)
            }
            Token::Keyword(Keyword::Nil) => {
                self.advance()?;
                Expression::Nil
            }
            Token::Keyword(Keyword::Step) => Expression::StepSequence(self.parse_step_sequence()?),
            Token::Keyword(Keyword::Fun) => self.parse_function()?,
            Token::Keyword(Keyword::Seq) => {
                self.advance()?;
                Expression::Procedure(self.parse_block()?)
            }
            Token::Punctuation(Punctuation::LParen) => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect_punc(Punctuation::RParen)?;
                return Ok(inner);
            }
            Token::Punctuation(Punctuation::LBracket) => {
                let items = self.parse_delimited(
                    Punctuation::LBracket,
                    Punctuation::RBracket,
                    Punctuation::Comma,
                    Self::parse_expression,
                )?;
                Expression::Array(items)
            }
            Token::Operator(op @ (Operator::Not | Operator::Minus)) => {
                self.advance()?;
                let operand = self.parse_expression_bp(PREFIX_POWER)?;
                let op = if op == Operator::Not {
                    UnaryOperator::Not
                } else {
                    UnaryOperator::Negate
                };
                Expression::Unary { op, operand }
            }
            other => return Err(self.error(format!("unexpected {other}"))),
        };
        Ok(Rc::new(expr))
    }

    fn parse_function(&mut self) -> Result<Expression, SyntaxError> {
        self.advance()?; // fun
        let params = self.parse_delimited(
            Punctuation::LParen,
            Punctuation::RParen,
            Punctuation::Comma,
            Self::expect_identifier,
        )?;
        let body = self.parse_block()?;
        Ok(Expression::Function(Rc::new(FunctionDefinition {
            params,
            body,
        })))
    }

    fn parse_step_sequence(&mut self) -> Result<StepSequence, SyntaxError> {
        self.advance()?; // step
        self.expect_punc(Punctuation::LBrace)?;

        let mut pattern = Vec::new();
        loop {
            match self.peek()?.clone() {
                Token::Identifier(name) => {
                    self.advance()?;
                    pattern.push(Step::Name(name));
                }
                Token::Integer(pitch) => {
                    self.advance()?;
                    pattern.push(Step::Pitch(pitch));
                }
                Token::Operator(Operator::Minus) => {
                    self.advance()?;
                    pattern.push(Step::Rest);
                }
                Token::Punctuation(Punctuation::Pipe | Punctuation::RBrace) => break,
                other => {
                    return Err(self.error(format!("unexpected {other} in step pattern")));
                }
            }
        }

        let mut attributes = Vec::new();
        if self.check_punc(Punctuation::Pipe)? {
            self.advance()?;
            loop {
                let name = self.expect_identifier()?;
                self.expect_operator(Operator::Assign)?;
                let value = match self.advance()? {
                    Token::Integer(v) => v,
                    other => {
                        return Err(self.error(format!(
                            "step attribute '{name}' must be an integer, found {other}"
                        )));
                    }
                };
                attributes.push((name, value));
                if !self.check_punc(Punctuation::Comma)? {
                    break;
                }
                self.advance()?;
            }
        }

        self.expect_punc(Punctuation::RBrace)?;
        Ok(StepSequence {
            pattern,
            attributes,
        })
    }

    /// `start item (sep item)* stop`, allowing an empty list.
    fn parse_delimited<T>(
        &mut self,
        start: Punctuation,
        stop: Punctuation,
        separator: Punctuation,
        mut item: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        self.expect_punc(start)?;
        let mut items = Vec::new();
        let mut first = true;
        while !self.check_punc(stop)? {
            if first {
                first = false;
            } else {
                self.expect_punc(separator)?;
                if self.check_punc(stop)? {
                    break;
                }
            }
            items.push(item(self)?);
        }
        self.expect_punc(stop)?;
        Ok(items)
    }

    fn peek(&mut self) -> Result<&Token, SyntaxError> {
        self.tokens.peek()
    }

    fn advance(&mut self) -> Result<Token, SyntaxError> {
        self.tokens.next()
    }

    fn check_punc(&mut self, punctuation: Punctuation) -> Result<bool, SyntaxError> {
        Ok(*self.peek()? == Token::Punctuation(punctuation))
    }

    fn expect_punc(&mut self, punctuation: Punctuation) -> Result<(), SyntaxError> {
        let token = self.peek()?.clone();
        if token == Token::Punctuation(punctuation) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {token}",
                punctuation.as_char()
            )))
        }
    }

    fn expect_operator(&mut self, op: Operator) -> Result<(), SyntaxError> {
        let token = self.peek()?.clone();
        if token == Token::Operator(op) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}', found {token}", op.as_str())))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, SyntaxError> {
        match self.peek()?.clone() {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, found {other}"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let (line, col) = self.tokens.token_position();
        SyntaxError::parse(message, line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::error::ErrorKind;

    fn parse(src: &str) -> Result<Program, SyntaxError> {
        Parser::new(Tokenizer::new(src)).parse()
    }

    fn expr(src: &str) -> Expr {
        let program = parse(&format!("{src};")).unwrap();
        match &*program.statements[0] {
            Statement::Expression(e) => e.clone(),
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn ident(name: &str) -> Expr {
        Rc::new(Expression::Identifier(name.to_string()))
    }

    fn int(v: f64) -> Expr {
        Rc::new(Expression::Integer(v))
    }

    fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
        Rc::new(Expression::Binary { op, left, right })
    }

    #[test]
    fn parse_empty_program() {
        assert!(parse("").unwrap().statements.is_empty());
        assert!(parse("# nothing here\n").unwrap().statements.is_empty());
    }

    #[test]
    fn stack_binds_tighter_than_concat() {
        use BinaryOperator::*;
        assert_eq!(
            expr("a :=: b :+: c :=: d"),
            binary(
                Concat,
                binary(Stack, ident("a"), ident("b")),
                binary(Stack, ident("c"), ident("d")),
            )
        );
    }

    #[test]
    fn musical_operators_are_left_associative() {
        use BinaryOperator::*;
        assert_eq!(
            expr("a :+: b :+: c"),
            binary(Concat, binary(Concat, ident("a"), ident("b")), ident("c"))
        );
    }

    #[test]
    fn arithmetic_precedence() {
        use BinaryOperator::*;
        assert_eq!(
            expr("1 + 2 * 3 - 4"),
            binary(
                Subtract,
                binary(Add, int(1.0), binary(Multiply, int(2.0), int(3.0))),
                int(4.0),
            )
        );
    }

    #[test]
    fn logical_and_comparison_precedence() {
        use BinaryOperator::*;
        assert_eq!(
            expr("a < 1 || b == 2 && c"),
            binary(
                Or,
                binary(Less, ident("a"), int(1.0)),
                binary(And, binary(Equal, ident("b"), int(2.0)), ident("c")),
            )
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let e = expr("a = b = 1");
        let Expression::Assignment { target, value } = &*e else {
            panic!("expected assignment");
        };
        assert_eq!(*target, AssignTarget::Identifier("a".to_string()));
        let Expression::Assignment { target, value } = &**value else {
            panic!("expected nested assignment");
        };
        assert_eq!(*target, AssignTarget::Identifier("b".to_string()));
        assert_eq!(*value, int(1.0));
    }

    #[test]
    fn assignment_takes_whole_pattern_expression() {
        use BinaryOperator::*;
        let e = expr("x = a :+: b");
        let Expression::Assignment { value, .. } = &*e else {
            panic!("expected assignment");
        };
        assert_eq!(*value, binary(Concat, ident("a"), ident("b")));
    }

    #[test]
    fn assign_to_index() {
        let e = expr("xs[1] = 5");
        let Expression::Assignment { target, .. } = &*e else {
            panic!("expected assignment");
        };
        assert_eq!(
            *target,
            AssignTarget::Index {
                array: ident("xs"),
                index: int(1.0),
            }
        );
    }

    #[test]
    fn invalid_assignment_target() {
        let err = parse("a + b = 3;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert!(err.message.contains("assignment"));
    }

    #[test]
    fn prefix_operators() {
        assert_eq!(
            expr("-a * b"),
            binary(
                BinaryOperator::Multiply,
                Rc::new(Expression::Unary {
                    op: UnaryOperator::Negate,
                    operand: ident("a"),
                }),
                ident("b"),
            )
        );
        assert_eq!(
            expr("!true"),
            Rc::new(Expression::Unary {
                op: UnaryOperator::Not,
                operand: Rc::new(Expression::Boolean(true)),
            })
        );
    }

    #[test]
    fn grouping_overrides_precedence() {
        use BinaryOperator::*;
        assert_eq!(
            expr("(1 + 2) * 3"),
            binary(Multiply, binary(Add, int(1.0), int(2.0)), int(3.0))
        );
    }

    #[test]
    fn calls_and_indexing_bind_tightest() {
        let e = expr("f(1, 2)[0] + 1");
        let Expression::Binary { left, .. } = &*e else {
            panic!("expected binary");
        };
        let Expression::Index { array, index } = &**left else {
            panic!("expected index");
        };
        assert_eq!(*index, int(0.0));
        assert_eq!(
            *array,
            Rc::new(Expression::Call {
                callee: ident("f"),
                args: vec![int(1.0), int(2.0)],
            })
        );
    }

    #[test]
    fn inline_function_call() {
        let e = expr("fun (x) { return x; }(3)");
        let Expression::Call { callee, args } = &*e else {
            panic!("expected call");
        };
        assert!(matches!(**callee, Expression::Function(_)));
        assert_eq!(*args, vec![int(3.0)]);
    }

    #[test]
    fn empty_argument_list() {
        let e = expr("rand()");
        assert_eq!(
            e,
            Rc::new(Expression::Call {
                callee: ident("rand"),
                args: vec![],
            })
        );
    }

    #[test]
    fn array_literal() {
        assert_eq!(
            expr("[1, 2.5, \"a\"]"),
            Rc::new(Expression::Array(vec![
                int(1.0),
                Rc::new(Expression::Float(2.5)),
                Rc::new(Expression::String("a".to_string())),
            ]))
        );
        assert_eq!(expr("[]"), Rc::new(Expression::Array(vec![])));
    }

    #[test]
    fn step_sequence_with_attributes() {
        let e = expr("step { x - 60 | x = 88, y = 1 }");
        let Expression::StepSequence(seq) = &*e else {
            panic!("expected step sequence");
        };
        assert_eq!(
            seq.pattern,
            vec![Step::Name("x".to_string()), Step::Rest, Step::Pitch(60.0)]
        );
        assert_eq!(seq.attribute("x"), Some(88.0));
        assert_eq!(seq.attribute("y"), Some(1.0));
        assert_eq!(seq.attribute("z"), None);
    }

    #[test]
    fn step_sequence_without_attributes() {
        let e = expr("step { 60 62 - 64 }");
        let Expression::StepSequence(seq) = &*e else {
            panic!("expected step sequence");
        };
        assert_eq!(seq.pattern.len(), 4);
        assert!(seq.attributes.is_empty());
    }

    #[test]
    fn step_attribute_must_be_integer() {
        let err = parse("s = step { x | x = 1.5 };").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert!(err.message.contains("integer"));
    }

    #[test]
    fn step_pattern_rejects_floats() {
        assert!(parse("s = step { 1.5 };").is_err());
    }

    #[test]
    fn musical_procedure() {
        let program = parse("p = seq { play 60; sleep 0.5; };").unwrap();
        let Statement::Expression(e) = &*program.statements[0] else {
            panic!("expected expression");
        };
        let Expression::Assignment { value, .. } = &**e else {
            panic!("expected assignment");
        };
        let Expression::Procedure(body) = &**value else {
            panic!("expected procedure");
        };
        assert_eq!(body.len(), 2);
        assert!(matches!(
            &*body[0],
            Statement::Command {
                command: Command::Play,
                ..
            }
        ));
    }

    #[test]
    fn commands() {
        let program = parse("tempo 90; loop drums;").unwrap();
        assert_eq!(
            *program.statements[0],
            Statement::Command {
                command: Command::Tempo,
                arg: int(90.0),
            }
        );
        assert_eq!(
            *program.statements[1],
            Statement::Command {
                command: Command::Loop,
                arg: ident("drums"),
            }
        );
    }

    #[test]
    fn if_else_and_while() {
        let program = parse(
            "if (a > 1) { play 1; } else play 2;\n\
             while (i < 4) { i = i + 1; }",
        )
        .unwrap();
        let Statement::If {
            then, otherwise, ..
        } = &*program.statements[0]
        else {
            panic!("expected if");
        };
        assert!(matches!(**then, Statement::Block(_)));
        assert!(matches!(
            otherwise.as_deref(),
            Some(Statement::Command {
                command: Command::Play,
                ..
            })
        ));
        assert!(matches!(
            &*program.statements[1],
            Statement::While { .. }
        ));
    }

    #[test]
    fn nested_blocks() {
        let program = parse("{ { x = 1; } }").unwrap();
        let Statement::Block(outer) = &*program.statements[0] else {
            panic!("expected block");
        };
        assert!(matches!(&*outer[0], Statement::Block(_)));
    }

    #[test]
    fn function_definition_params() {
        let e = expr("fun (a, b) { return a + b; }");
        let Expression::Function(def) = &*e else {
            panic!("expected function");
        };
        assert_eq!(def.params, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(def.body.len(), 1);
    }

    #[test]
    fn reserved_keywords_are_rejected() {
        assert!(parse("for (x) {}").is_err());
        assert!(parse("let x = 1;").is_err());
    }

    #[test]
    fn missing_semicolon() {
        let err = parse("play 60").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert!(err.message.contains("';'"));
    }

    #[test]
    fn unclosed_block() {
        let err = parse("p = seq { play 1;").unwrap_err();
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn error_reports_position() {
        let err = parse("x = 1;\ny = ];").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert_eq!((err.line, err.col), (2, 5));
    }

    #[test]
    fn lexer_errors_propagate() {
        let err = parse("x = 1 =- 2;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::LexError);
    }
}
