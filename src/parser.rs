//! Parser for the ES5 source subset.
//!
//! Recursive descent with precedence climbing for expressions. Produces the
//! shared-node AST from `ast.rs`. Automatic semicolon insertion is honored,
//! including the restricted productions (`return`/`throw`/`break`/
//! `continue` and postfix `++`/`--`).

use std::rc::Rc;

use crate::ast::*;
use crate::error::EngineError;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::value::{number_to_string, JsStr};

/// Parser over a source string.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous_span: Span,
    /// When true, every produced node gets `span: None`. Used for polyfills
    /// and `eval` bodies so their frames never surface as user code.
    strip_spans: bool,
    /// `in` is not an operator directly inside a `for (...)` head.
    no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, EngineError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            previous_span: Span::default(),
            strip_spans: false,
            no_in: false,
        })
    }

    /// Drop source positions from every node this parser produces.
    pub fn without_locations(mut self) -> Self {
        self.strip_spans = true;
        self
    }

    /// Parse a complete program.
    pub fn parse_program(&mut self) -> Result<Vec<NodeRef>, EngineError> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    // ============ TOKEN HELPERS ============

    fn advance(&mut self) -> Result<Token, EngineError> {
        let next = self.lexer.next_token()?;
        self.previous_span = self.current.span;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool, EngineError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), EngineError> {
        if self.eat(kind)? {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {what}, found {}",
                describe(&self.current.kind)
            )))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<JsStr, EngineError> {
        match self.current.kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(self.error(format!("expected {what}, found {}", describe(&other)))),
        }
    }

    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::Syntax {
            message: message.into(),
            line: self.current.span.line,
            column: self.current.span.column,
        }
    }

    fn span_from(&self, start: Span) -> Option<Span> {
        if self.strip_spans {
            None
        } else {
            Some(Span::new(
                start.start,
                self.previous_span.end,
                start.line,
                start.column,
            ))
        }
    }

    fn node(&self, kind: NodeKind, start: Span) -> NodeRef {
        Node::new(kind, self.span_from(start))
    }

    /// Automatic semicolon insertion: a real `;`, a closing brace, end of
    /// input, or a preceding line terminator all end a statement.
    fn end_statement(&mut self) -> Result<(), EngineError> {
        if self.eat(&TokenKind::Semicolon)? {
            return Ok(());
        }
        if self.check(&TokenKind::RightBrace)
            || self.check(&TokenKind::Eof)
            || self.current.newline_before
        {
            return Ok(());
        }
        Err(self.error(format!(
            "expected ';', found {}",
            describe(&self.current.kind)
        )))
    }

    // ============ STATEMENTS ============

    fn parse_statement(&mut self) -> Result<NodeRef, EngineError> {
        // Labeled statement: identifier followed by a colon.
        if let TokenKind::Identifier(_) = &self.current.kind {
            if self.peek_is_colon() {
                return self.parse_labeled_statement();
            }
        }

        match &self.current.kind {
            TokenKind::LeftBrace => self.parse_block(),
            TokenKind::Var => self.parse_variable_statement(),
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_break_continue(true),
            TokenKind::Continue => self.parse_break_continue(false),
            TokenKind::With => self.parse_with(),
            TokenKind::Debugger => {
                let start = self.current.span;
                self.advance()?;
                self.end_statement()?;
                Ok(self.node(NodeKind::DebuggerStatement, start))
            }
            TokenKind::Semicolon => {
                let start = self.current.span;
                self.advance()?;
                Ok(self.node(NodeKind::EmptyStatement, start))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn peek_is_colon(&self) -> bool {
        let mut lexer_clone = self.lexer_clone();
        matches!(
            lexer_clone.next_token(),
            Ok(Token {
                kind: TokenKind::Colon,
                ..
            })
        )
    }

    fn lexer_clone(&self) -> Lexer<'a> {
        // CharIndices is Clone; rebuilding from the same state is cheap.
        self.lexer.clone()
    }

    fn parse_block(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.expect(&TokenKind::LeftBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(self.node(NodeKind::BlockStatement { body }, start))
    }

    fn parse_variable_statement(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // var
        let declarations = self.parse_declarator_list()?;
        self.end_statement()?;
        Ok(self.node(NodeKind::VariableDeclaration { declarations }, start))
    }

    fn parse_declarator_list(&mut self) -> Result<Vec<Declarator>, EngineError> {
        let mut declarations = Vec::new();
        loop {
            let name = self.expect_identifier("variable name")?;
            let init = if self.eat(&TokenKind::Eq)? {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(Declarator { name, init });
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(declarations)
    }

    fn parse_function_declaration(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let function = self.parse_function(true)?;
        Ok(self.node(NodeKind::FunctionDeclaration { function }, start))
    }

    fn parse_function(&mut self, require_name: bool) -> Result<Rc<FunctionNode>, EngineError> {
        let start = self.current.span;
        self.expect(&TokenKind::Function, "'function'")?;
        let id = match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Some(name)
            }
            _ if require_name => return Err(self.error("expected function name")),
            _ => None,
        };
        self.expect(&TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier("parameter name")?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "')'")?;
        self.expect(&TokenKind::LeftBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(Rc::new(FunctionNode {
            id,
            params,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_if(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // if
        self.expect(&TokenKind::LeftParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat(&TokenKind::Else)? {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(self.node(
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn parse_while(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // while
        self.expect(&TokenKind::LeftParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = self.parse_statement()?;
        Ok(self.node(NodeKind::WhileStatement { test, body }, start))
    }

    fn parse_do_while(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // do
        let body = self.parse_statement()?;
        self.expect(&TokenKind::While, "'while'")?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        // The trailing semicolon of do-while is always optional.
        self.eat(&TokenKind::Semicolon)?;
        Ok(self.node(NodeKind::DoWhileStatement { body, test }, start))
    }

    fn parse_for(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // for
        self.expect(&TokenKind::LeftParen, "'('")?;

        // Empty init.
        if self.eat(&TokenKind::Semicolon)? {
            return self.parse_for_tail(start, None);
        }

        if self.check(&TokenKind::Var) {
            let var_start = self.current.span;
            self.advance()?;
            self.no_in = true;
            let declarations = self.parse_declarator_list()?;
            self.no_in = false;
            if self.eat(&TokenKind::In)? {
                if declarations.len() != 1 {
                    return Err(self.error("only one declaration allowed in a for-in head"));
                }
                let left = self.node(NodeKind::VariableDeclaration { declarations }, var_start);
                return self.parse_for_in_tail(start, left);
            }
            let init = self.node(NodeKind::VariableDeclaration { declarations }, var_start);
            self.expect(&TokenKind::Semicolon, "';'")?;
            return self.parse_for_tail(start, Some(init));
        }

        self.no_in = true;
        let init = self.parse_expression()?;
        self.no_in = false;
        if self.eat(&TokenKind::In)? {
            if !is_reference(&init) {
                return Err(self.error("invalid left-hand side in for-in"));
            }
            return self.parse_for_in_tail(start, init);
        }
        self.expect(&TokenKind::Semicolon, "';'")?;
        let init_stmt = {
            let span = init.span;
            Node::new(NodeKind::ExpressionStatement { expression: init }, span)
        };
        self.parse_for_tail(start, Some(init_stmt))
    }

    fn parse_for_tail(&mut self, start: Span, init: Option<NodeRef>) -> Result<NodeRef, EngineError> {
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "';'")?;
        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = self.parse_statement()?;
        Ok(self.node(
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    fn parse_for_in_tail(&mut self, start: Span, left: NodeRef) -> Result<NodeRef, EngineError> {
        let right = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = self.parse_statement()?;
        Ok(self.node(NodeKind::ForInStatement { left, right, body }, start))
    }

    fn parse_switch(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // switch
        self.expect(&TokenKind::LeftParen, "'('")?;
        let discriminant = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        self.expect(&TokenKind::LeftBrace, "'{'")?;
        let mut cases = Vec::new();
        let mut saw_default = false;
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let test = if self.eat(&TokenKind::Case)? {
                Some(self.parse_expression()?)
            } else if self.eat(&TokenKind::Default)? {
                if saw_default {
                    return Err(self.error("more than one default clause in switch"));
                }
                saw_default = true;
                None
            } else {
                return Err(self.error("expected 'case' or 'default'"));
            };
            self.expect(&TokenKind::Colon, "':'")?;
            let mut consequent = Vec::new();
            while !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
                && !self.check(&TokenKind::RightBrace)
                && !self.check(&TokenKind::Eof)
            {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, consequent });
        }
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(self.node(
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            },
            start,
        ))
    }

    fn parse_try(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // try
        let block = self.parse_block()?;
        let handler = if self.eat(&TokenKind::Catch)? {
            self.expect(&TokenKind::LeftParen, "'('")?;
            let param = self.expect_identifier("catch parameter")?;
            self.expect(&TokenKind::RightParen, "')'")?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.eat(&TokenKind::Finally)? {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("missing catch or finally after try"));
        }
        Ok(self.node(
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            },
            start,
        ))
    }

    fn parse_throw(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // throw
        if self.current.newline_before {
            return Err(self.error("illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.end_statement()?;
        Ok(self.node(NodeKind::ThrowStatement { argument }, start))
    }

    fn parse_return(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // return
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.check(&TokenKind::Eof)
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.end_statement()?;
        Ok(self.node(NodeKind::ReturnStatement { argument }, start))
    }

    fn parse_break_continue(&mut self, is_break: bool) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?;
        let label = match &self.current.kind {
            TokenKind::Identifier(name) if !self.current.newline_before => {
                let name = name.clone();
                self.advance()?;
                Some(name)
            }
            _ => None,
        };
        self.end_statement()?;
        let kind = if is_break {
            NodeKind::BreakStatement { label }
        } else {
            NodeKind::ContinueStatement { label }
        };
        Ok(self.node(kind, start))
    }

    fn parse_with(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // with
        self.expect(&TokenKind::LeftParen, "'('")?;
        let object = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = self.parse_statement()?;
        Ok(self.node(NodeKind::WithStatement { object, body }, start))
    }

    fn parse_labeled_statement(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let label = self.expect_identifier("label")?;
        self.expect(&TokenKind::Colon, "':'")?;
        let body = self.parse_statement()?;
        Ok(self.node(NodeKind::LabeledStatement { label, body }, start))
    }

    fn parse_expression_statement(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let expression = self.parse_expression()?;
        self.end_statement()?;
        Ok(self.node(NodeKind::ExpressionStatement { expression }, start))
    }

    // ============ EXPRESSIONS ============

    fn parse_expression(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat(&TokenKind::Comma)? {
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.node(NodeKind::SequenceExpression { expressions }, start))
    }

    fn parse_assignment(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let left = self.parse_conditional()?;
        let operator = match &self.current.kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PercentEq => AssignOp::Mod,
            TokenKind::ShlEq => AssignOp::Shl,
            TokenKind::ShrEq => AssignOp::Shr,
            TokenKind::UShrEq => AssignOp::UShr,
            TokenKind::AmpEq => AssignOp::BitAnd,
            TokenKind::PipeEq => AssignOp::BitOr,
            TokenKind::CaretEq => AssignOp::BitXor,
            _ => return Ok(left),
        };
        if !is_reference(&left) {
            return Err(self.error("invalid assignment target"));
        }
        self.advance()?;
        let right = self.parse_assignment()?;
        Ok(self.node(
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            },
            start,
        ))
    }

    fn parse_conditional(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let test = self.parse_binary(0)?;
        if !self.eat(&TokenKind::Question)? {
            return Ok(test);
        }
        // The branches of ?: may contain `in` even inside a for head.
        let saved_no_in = std::mem::take(&mut self.no_in);
        let consequent = self.parse_assignment()?;
        self.expect(&TokenKind::Colon, "':'")?;
        self.no_in = false;
        let alternate = self.parse_assignment()?;
        self.no_in = saved_no_in;
        Ok(self.node(
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    /// Precedence climbing over both binary and logical operators.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let mut left = self.parse_unary()?;
        loop {
            let Some((precedence, op)) = self.binary_precedence() else {
                return Ok(left);
            };
            if precedence < min_precedence {
                return Ok(left);
            }
            self.advance()?;
            let right = self.parse_binary(precedence + 1)?;
            left = match op {
                BinaryOrLogical::Binary(operator) => self.node(
                    NodeKind::BinaryExpression {
                        operator,
                        left,
                        right,
                    },
                    start,
                ),
                BinaryOrLogical::Logical(operator) => self.node(
                    NodeKind::LogicalExpression {
                        operator,
                        left,
                        right,
                    },
                    start,
                ),
            };
        }
    }

    fn binary_precedence(&self) -> Option<(u8, BinaryOrLogical)> {
        use BinaryOrLogical::{Binary, Logical};
        let entry = match &self.current.kind {
            TokenKind::OrOr => (1, Logical(LogicalOp::Or)),
            TokenKind::AndAnd => (2, Logical(LogicalOp::And)),
            TokenKind::Pipe => (3, Binary(BinaryOp::BitOr)),
            TokenKind::Caret => (4, Binary(BinaryOp::BitXor)),
            TokenKind::Amp => (5, Binary(BinaryOp::BitAnd)),
            TokenKind::EqEq => (6, Binary(BinaryOp::Eq)),
            TokenKind::NotEq => (6, Binary(BinaryOp::NotEq)),
            TokenKind::EqEqEq => (6, Binary(BinaryOp::StrictEq)),
            TokenKind::NotEqEq => (6, Binary(BinaryOp::StrictNotEq)),
            TokenKind::Lt => (7, Binary(BinaryOp::Lt)),
            TokenKind::Gt => (7, Binary(BinaryOp::Gt)),
            TokenKind::LtEq => (7, Binary(BinaryOp::Le)),
            TokenKind::GtEq => (7, Binary(BinaryOp::Ge)),
            TokenKind::Instanceof => (7, Binary(BinaryOp::Instanceof)),
            TokenKind::In if !self.no_in => (7, Binary(BinaryOp::In)),
            TokenKind::Shl => (8, Binary(BinaryOp::Shl)),
            TokenKind::Shr => (8, Binary(BinaryOp::Shr)),
            TokenKind::UShr => (8, Binary(BinaryOp::UShr)),
            TokenKind::Plus => (9, Binary(BinaryOp::Add)),
            TokenKind::Minus => (9, Binary(BinaryOp::Sub)),
            TokenKind::Star => (10, Binary(BinaryOp::Mul)),
            TokenKind::Slash => (10, Binary(BinaryOp::Div)),
            TokenKind::Percent => (10, Binary(BinaryOp::Mod)),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_unary(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let operator = match &self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance()?;
            let argument = self.parse_unary()?;
            return Ok(self.node(NodeKind::UnaryExpression { operator, argument }, start));
        }
        if self.check(&TokenKind::PlusPlus) || self.check(&TokenKind::MinusMinus) {
            let operator = if self.check(&TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance()?;
            let argument = self.parse_unary()?;
            if !is_reference(&argument) {
                return Err(self.error("invalid increment/decrement target"));
            }
            return Ok(self.node(
                NodeKind::UpdateExpression {
                    operator,
                    argument,
                    prefix: true,
                },
                start,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let argument = self.parse_call_or_member()?;
        // Postfix ++/-- must be on the same line as its operand.
        if (self.check(&TokenKind::PlusPlus) || self.check(&TokenKind::MinusMinus))
            && !self.current.newline_before
        {
            let operator = if self.check(&TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            if !is_reference(&argument) {
                return Err(self.error("invalid increment/decrement target"));
            }
            self.advance()?;
            return Ok(self.node(
                NodeKind::UpdateExpression {
                    operator,
                    argument,
                    prefix: false,
                },
                start,
            ));
        }
        Ok(argument)
    }

    fn parse_call_or_member(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat(&TokenKind::Dot)? {
                let name = self.parse_property_name()?;
                let property = self.node(NodeKind::Identifier { name }, self.previous_span);
                expr = self.node(
                    NodeKind::MemberExpression {
                        object: expr,
                        property,
                        computed: false,
                    },
                    start,
                );
            } else if self.eat(&TokenKind::LeftBracket)? {
                let property = self.parse_expression()?;
                self.expect(&TokenKind::RightBracket, "']'")?;
                expr = self.node(
                    NodeKind::MemberExpression {
                        object: expr,
                        property,
                        computed: true,
                    },
                    start,
                );
            } else if self.check(&TokenKind::LeftParen) {
                let arguments = self.parse_arguments()?;
                expr = self.node(
                    NodeKind::CallExpression {
                        callee: expr,
                        arguments,
                    },
                    start,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_new(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // new
        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        // Member accesses bind tighter than the `new` call itself.
        loop {
            if self.eat(&TokenKind::Dot)? {
                let name = self.parse_property_name()?;
                let property = self.node(NodeKind::Identifier { name }, self.previous_span);
                callee = self.node(
                    NodeKind::MemberExpression {
                        object: callee,
                        property,
                        computed: false,
                    },
                    start,
                );
            } else if self.eat(&TokenKind::LeftBracket)? {
                let property = self.parse_expression()?;
                self.expect(&TokenKind::RightBracket, "']'")?;
                callee = self.node(
                    NodeKind::MemberExpression {
                        object: callee,
                        property,
                        computed: true,
                    },
                    start,
                );
            } else {
                break;
            }
        }
        let arguments = if self.check(&TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(self.node(NodeKind::NewExpression { callee, arguments }, start))
    }

    fn parse_arguments(&mut self) -> Result<Vec<NodeRef>, EngineError> {
        self.expect(&TokenKind::LeftParen, "'('")?;
        let mut arguments = Vec::new();
        // Argument lists may contain `in` even inside a for head.
        let saved_no_in = std::mem::take(&mut self.no_in);
        if !self.check(&TokenKind::RightParen) {
            loop {
                arguments.push(self.parse_assignment()?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.no_in = saved_no_in;
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(arguments)
    }

    /// Property names after `.` admit reserved words (`obj.delete` is fine).
    fn parse_property_name(&mut self) -> Result<JsStr, EngineError> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            other => match keyword_text(other) {
                Some(text) => JsStr::from(text),
                None => return Err(self.error("expected property name")),
            },
        };
        self.advance()?;
        Ok(name)
    }

    fn parse_primary(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        match self.current.kind.clone() {
            TokenKind::Number(n) => {
                self.advance()?;
                Ok(self.node(
                    NodeKind::Literal {
                        value: LiteralValue::Number(n),
                    },
                    start,
                ))
            }
            TokenKind::String(s) => {
                self.advance()?;
                Ok(self.node(
                    NodeKind::Literal {
                        value: LiteralValue::String(s),
                    },
                    start,
                ))
            }
            TokenKind::RegExp(pattern, flags) => {
                self.advance()?;
                for (i, c) in flags.as_str().char_indices() {
                    if !matches!(c, 'g' | 'i' | 'm') || flags.as_str()[..i].contains(c) {
                        return Err(self.error(format!("invalid regular expression flags '{flags}'")));
                    }
                }
                Ok(self.node(
                    NodeKind::Literal {
                        value: LiteralValue::RegExp { pattern, flags },
                    },
                    start,
                ))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(self.node(
                    NodeKind::Literal {
                        value: LiteralValue::Boolean(true),
                    },
                    start,
                ))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(self.node(
                    NodeKind::Literal {
                        value: LiteralValue::Boolean(false),
                    },
                    start,
                ))
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(self.node(
                    NodeKind::Literal {
                        value: LiteralValue::Null,
                    },
                    start,
                ))
            }
            TokenKind::This => {
                self.advance()?;
                Ok(self.node(NodeKind::ThisExpression, start))
            }
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(self.node(NodeKind::Identifier { name }, start))
            }
            TokenKind::Function => {
                let function = self.parse_function(false)?;
                Ok(self.node(NodeKind::FunctionExpression { function }, start))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let saved_no_in = std::mem::take(&mut self.no_in);
                let expr = self.parse_expression()?;
                self.no_in = saved_no_in;
                self.expect(&TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            other => Err(self.error(format!("unexpected {}", describe(&other)))),
        }
    }

    fn parse_array_literal(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // [
        let saved_no_in = std::mem::take(&mut self.no_in);
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            if self.eat(&TokenKind::Comma)? {
                elements.push(None); // elision
                continue;
            }
            elements.push(Some(self.parse_assignment()?));
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma, "','")?;
            }
        }
        self.no_in = saved_no_in;
        self.expect(&TokenKind::RightBracket, "']'")?;
        // A single trailing comma is not an element.
        if matches!(elements.last(), Some(None)) {
            elements.pop();
        }
        Ok(self.node(NodeKind::ArrayExpression { elements }, start))
    }

    fn parse_object_literal(&mut self) -> Result<NodeRef, EngineError> {
        let start = self.current.span;
        self.advance()?; // {
        let saved_no_in = std::mem::take(&mut self.no_in);
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            properties.push(self.parse_object_property()?);
            if !self.check(&TokenKind::RightBrace) {
                self.expect(&TokenKind::Comma, "','")?;
            }
        }
        self.no_in = saved_no_in;
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(self.node(NodeKind::ObjectExpression { properties }, start))
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, EngineError> {
        // get/set accessors, unless `get`/`set` is itself a plain key.
        if let TokenKind::Identifier(name) = &self.current.kind {
            let accessor = match name.as_str() {
                "get" => Some(PropertyKind::Get),
                "set" => Some(PropertyKind::Set),
                _ => None,
            };
            if let Some(kind) = accessor {
                if !self.peek_is_colon() && !self.peek_is_comma_or_brace() {
                    self.advance()?;
                    let key = self.parse_object_key()?;
                    let fn_start = self.current.span;
                    self.expect(&TokenKind::LeftParen, "'('")?;
                    let mut params = Vec::new();
                    if !self.check(&TokenKind::RightParen) {
                        loop {
                            params.push(self.expect_identifier("parameter name")?);
                            if !self.eat(&TokenKind::Comma)? {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RightParen, "')'")?;
                    self.expect(&TokenKind::LeftBrace, "'{'")?;
                    let mut body = Vec::new();
                    while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                        body.push(self.parse_statement()?);
                    }
                    self.expect(&TokenKind::RightBrace, "'}'")?;
                    let function = Rc::new(FunctionNode {
                        id: None,
                        params,
                        body,
                        span: self.span_from(fn_start),
                    });
                    let value = self.node(NodeKind::FunctionExpression { function }, fn_start);
                    return Ok(ObjectProperty { key, kind, value });
                }
            }
        }
        let key = self.parse_object_key()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let value = self.parse_assignment()?;
        Ok(ObjectProperty {
            key,
            kind: PropertyKind::Init,
            value,
        })
    }

    fn peek_is_comma_or_brace(&self) -> bool {
        let mut lexer_clone = self.lexer_clone();
        matches!(
            lexer_clone.next_token().map(|t| t.kind),
            Ok(TokenKind::Comma | TokenKind::RightBrace)
        )
    }

    fn parse_object_key(&mut self) -> Result<JsStr, EngineError> {
        let key = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::String(s) => s.clone(),
            TokenKind::Number(n) => JsStr::from(number_to_string(*n)),
            other => match keyword_text(other) {
                Some(text) => JsStr::from(text),
                None => return Err(self.error("expected property key")),
            },
        };
        self.advance()?;
        Ok(key)
    }
}

enum BinaryOrLogical {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Is this node a valid assignment/for-in/update target?
fn is_reference(node: &NodeRef) -> bool {
    matches!(
        node.kind,
        NodeKind::Identifier { .. } | NodeKind::MemberExpression { .. }
    )
}

fn keyword_text(kind: &TokenKind) -> Option<&'static str> {
    Some(match kind {
        TokenKind::Var => "var",
        TokenKind::Function => "function",
        TokenKind::Return => "return",
        TokenKind::If => "if",
        TokenKind::Else => "else",
        TokenKind::For => "for",
        TokenKind::While => "while",
        TokenKind::Do => "do",
        TokenKind::Break => "break",
        TokenKind::Continue => "continue",
        TokenKind::Switch => "switch",
        TokenKind::Case => "case",
        TokenKind::Default => "default",
        TokenKind::Try => "try",
        TokenKind::Catch => "catch",
        TokenKind::Finally => "finally",
        TokenKind::Throw => "throw",
        TokenKind::New => "new",
        TokenKind::This => "this",
        TokenKind::Typeof => "typeof",
        TokenKind::Instanceof => "instanceof",
        TokenKind::In => "in",
        TokenKind::Void => "void",
        TokenKind::Delete => "delete",
        TokenKind::Debugger => "debugger",
        TokenKind::With => "with",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Null => "null",
        _ => return None,
    })
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {}", number_to_string(*n)),
        TokenKind::String(_) => "string literal".to_string(),
        TokenKind::RegExp(..) => "regular expression".to_string(),
        TokenKind::Identifier(name) => format!("identifier '{name}'"),
        TokenKind::Eof => "end of input".to_string(),
        other => match keyword_text(other) {
            Some(text) => format!("keyword '{text}'"),
            None => format!("{other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<NodeRef> {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    #[test]
    fn test_precedence() {
        let body = parse("1 + 2 * 3;");
        let NodeKind::ExpressionStatement { expression } = &body[0].kind else {
            panic!("expected expression statement");
        };
        let NodeKind::BinaryExpression { operator, right, .. } = &expression.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(*operator, BinaryOp::Add);
        assert!(matches!(
            right.kind,
            NodeKind::BinaryExpression {
                operator: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_semicolon_insertion() {
        let body = parse("var a = 1\nvar b = 2");
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_return_restriction() {
        let body = parse("function f() { return\n42; }");
        let NodeKind::FunctionDeclaration { function } = &body[0].kind else {
            panic!("expected function declaration");
        };
        assert!(matches!(
            function.body[0].kind,
            NodeKind::ReturnStatement { argument: None }
        ));
    }

    #[test]
    fn test_for_in_heads() {
        assert!(matches!(
            parse("for (var k in o) {}")[0].kind,
            NodeKind::ForInStatement { .. }
        ));
        assert!(matches!(
            parse("for (k in o) {}")[0].kind,
            NodeKind::ForInStatement { .. }
        ));
        assert!(matches!(
            parse("for (var i = 0; i < 10; i++) {}")[0].kind,
            NodeKind::ForStatement { .. }
        ));
    }

    #[test]
    fn test_object_accessors() {
        let body = parse("var o = { get x() { return 1; }, set x(v) {}, get: 3 };");
        let NodeKind::VariableDeclaration { declarations } = &body[0].kind else {
            panic!("expected var");
        };
        let init = declarations[0].init.as_ref().unwrap();
        let NodeKind::ObjectExpression { properties } = &init.kind else {
            panic!("expected object literal");
        };
        assert_eq!(properties.len(), 3);
        assert_eq!(properties[0].kind, PropertyKind::Get);
        assert_eq!(properties[1].kind, PropertyKind::Set);
        assert_eq!(properties[2].kind, PropertyKind::Init);
        assert_eq!(properties[2].key, "get");
    }

    #[test]
    fn test_new_member_binding() {
        // `new a.b()` constructs `a.b`, not `a`.
        let body = parse("new a.b();");
        let NodeKind::ExpressionStatement { expression } = &body[0].kind else {
            panic!();
        };
        let NodeKind::NewExpression { callee, .. } = &expression.kind else {
            panic!("expected new expression");
        };
        assert!(matches!(callee.kind, NodeKind::MemberExpression { .. }));
    }

    #[test]
    fn test_stripped_spans() {
        let mut parser = Parser::new("var a = 1;").unwrap().without_locations();
        let body = parser.parse_program().unwrap();
        assert!(body[0].span.is_none());
    }

    #[test]
    fn test_rejects_es6() {
        // `let` lexes as an identifier; `let x` then fails to parse as an
        // expression statement.
        assert!(Parser::new("let x = 1;").unwrap().parse_program().is_err());
        assert!(Parser::new("var f = () => 1;").unwrap().parse_program().is_err());
    }
}
