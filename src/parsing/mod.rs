//! The parser: builds a [`crate::ast::Program`] from the lexer's token
//! stream (`spec.md` §4.2). It understands the canonical call-based form
//! that the text-filter pipeline is expected to have already produced;
//! leftover infix-operator or brace-literal tokens are reported as
//! ordinary "unexpected token" syntax errors rather than parsed, since by
//! this stage in the pipeline they only appear when filters were disabled.

use std::fmt;

use crate::ast::{Call, Definition, Execution, Expr, Import, Program, TopLevelItem, Transform, TransformArg, TransformPhase, Width};
use crate::common::peekable_buffer::PeekableBuffer;
use crate::common::reserved;
use crate::common::Position;
use crate::lexing::token::{LexedToken, StringToken, Token};
use crate::registries;

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDescription {
    Described(String),
    Expected(Token),
    Unexpected(Token),
    PrematureEof,
}

impl fmt::Display for ErrorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDescription::Described(s) => write!(f, "{}", s),
            ErrorDescription::Expected(t) => write!(f, "expected {:?}", t),
            ErrorDescription::Unexpected(t) => write!(f, "unexpected token {:?}", t),
            ErrorDescription::PrematureEof => write!(f, "unexpected end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub position: Position,
    pub description: ErrorDescription,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.description, self.position)
    }
}

impl std::error::Error for Error {}

type Result<T> = std::result::Result<T, Error>;

/// True for transforms the parser should treat as introducing a type,
/// per the resolution of `spec.md` §9's "type-like" open question:
/// known primitive/templated type names, plus anything that is not one
/// of the other well-known meta-transforms (treated as a user-defined
/// struct path).
fn transforms_are_type_like(transforms: &[Transform]) -> bool {
    match transforms.first() {
        None => false,
        Some(t) => {
            registries::is_primitive_type(&t.name)
                || registries::is_templated_type_family(&t.name)
                || !registries::is_known_semantic_transform(&t.name)
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn render_string_token(token: &StringToken) -> String {
    let prefix = if token.is_raw { "r" } else { "" };
    let suffix = token.suffix.as_deref().unwrap_or("");
    format!("{}{}{}{}{}", prefix, token.quote, token.raw, token.quote, suffix)
}

/// The two's-complement bit pattern for a lexed integer's text; `u64`
/// literals above `i64::MAX` read back negative through this `i64` and
/// must be reinterpreted with `as u64` at the point of use.
fn literal_bits(text: &str, is_hex: bool) -> i64 {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude: u64 = if is_hex {
        u64::from_str_radix(digits.trim_start_matches("0x"), 16).unwrap_or(0)
    } else {
        digits.parse().unwrap_or(0)
    };
    let bits = if negative { magnitude.wrapping_neg() } else { magnitude };
    bits as i64
}

pub struct Parser {
    tokens: PeekableBuffer<LexedToken>,
    namespace_stack: Vec<String>,
    last_position: Position,
}

impl Parser {
    pub fn new(tokens: Vec<LexedToken>) -> Self {
        let last_position = tokens.first().map(|t| t.position).unwrap_or_else(Position::start);
        Self {
            tokens: PeekableBuffer::new(tokens),
            namespace_stack: Vec::new(),
            last_position,
        }
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut items = Vec::new();
        while !self.next_is(&Token::Eof) {
            self.parse_top_level_item(&mut items)?;
        }
        Ok(Program { items })
    }

    // --- token-stream primitives -------------------------------------

    fn peek_token(&self) -> Token {
        self.tokens.peek().map(|t| t.token.clone()).unwrap_or(Token::Eof)
    }

    fn peek_position(&self) -> Position {
        self.tokens.peek().map(|t| t.position).unwrap_or(self.last_position)
    }

    fn discard(&mut self) {
        if let Some(t) = self.tokens.read() {
            self.last_position = t.position;
        }
    }

    fn next_is(&self, expected: &Token) -> bool {
        self.tokens.match_next(|lexed| lexed.token == *expected)
    }

    fn nth_is(&self, n: usize, expected: &Token) -> bool {
        self.tokens.match_nth(n, |lexed| lexed.token == *expected)
    }

    fn nth_is_identifier(&self, n: usize) -> bool {
        self.tokens.match_nth(n, |lexed| matches!(lexed.token, Token::Identifier(_)))
    }

    fn next_is_keyword(&self, keyword: &str) -> bool {
        self.tokens
            .match_next(|lexed| matches!(&lexed.token, Token::Identifier(s) if s == keyword))
    }

    fn expect_and_discard(&mut self, expected: Token) -> Result<()> {
        if self.next_is(&expected) {
            self.discard();
            Ok(())
        } else if self.tokens.is_exhausted() {
            self.premature_eof()
        } else {
            self.expected(expected)
        }
    }

    fn fail<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(Error {
            position: self.peek_position(),
            description: ErrorDescription::Described(message.into()),
        })
    }

    fn expected<T>(&self, expected: Token) -> Result<T> {
        Err(Error {
            position: self.peek_position(),
            description: ErrorDescription::Expected(expected),
        })
    }

    fn unexpected<T>(&self, token: Token) -> Result<T> {
        Err(Error {
            position: self.peek_position(),
            description: ErrorDescription::Unexpected(token),
        })
    }

    fn premature_eof<T>(&self) -> Result<T> {
        Err(Error {
            position: self.last_position,
            description: ErrorDescription::PrematureEof,
        })
    }

    // --- name readers, each matching one row of the reserved-keyword
    // discipline from `spec.md` §9 Design Notes ------------------------

    /// A call or reference name: any identifier or slash path, unchecked
    /// against the reserved set, since builtin call names like `return`
    /// and `if` are themselves reserved words.
    fn read_name_token(&mut self) -> Result<String> {
        match self.peek_token() {
            Token::Identifier(s) => {
                self.discard();
                Ok(s)
            }
            Token::SlashPath(s) => {
                self.discard();
                Ok(s)
            }
            other => self.unexpected(other),
        }
    }

    /// A declared name (parameter, namespace segment, named-argument
    /// label, transform identifier): a single identifier, reserved words
    /// forbidden.
    fn read_declared_name(&mut self) -> Result<String> {
        match self.peek_token() {
            Token::Identifier(s) => {
                self.discard();
                if reserved::is_reserved(&s) {
                    self.fail(format!("'{}' is a reserved keyword and cannot be used here", s))
                } else {
                    Ok(s)
                }
            }
            other => self.unexpected(other),
        }
    }

    /// A definition/execution/transform name: an identifier or absolute
    /// slash path, each segment checked against the reserved set.
    fn read_path_or_declared_name(&mut self) -> Result<String> {
        match self.peek_token() {
            Token::Identifier(s) => {
                self.discard();
                if reserved::is_reserved(&s) {
                    self.fail(format!("'{}' is a reserved keyword and cannot be used here", s))
                } else {
                    Ok(s)
                }
            }
            Token::SlashPath(s) => {
                self.discard();
                for segment in s.split('/').filter(|seg| !seg.is_empty()) {
                    if reserved::is_reserved(segment) {
                        return self.fail(format!(
                            "'{}' is a reserved keyword and cannot be used as a path segment",
                            segment
                        ));
                    }
                }
                Ok(s)
            }
            other => self.unexpected(other),
        }
    }

    fn full_path_for(&self, name: &str) -> String {
        if name.starts_with('/') {
            name.to_owned()
        } else if self.namespace_stack.is_empty() {
            format!("/{}", name)
        } else {
            format!("/{}/{}", self.namespace_stack.join("/"), name)
        }
    }

    fn current_namespace_prefix(&self) -> Option<String> {
        if self.namespace_stack.is_empty() {
            None
        } else {
            Some(format!("/{}", self.namespace_stack.join("/")))
        }
    }

    // --- top level ------------------------------------------------------

    fn parse_top_level_item(&mut self, items: &mut Vec<TopLevelItem>) -> Result<()> {
        if self.next_is_keyword("import") {
            self.parse_import(items)
        } else if self.next_is_keyword("namespace") {
            self.discard();
            let segment = self.read_declared_name()?;
            self.namespace_stack.push(segment);
            let result = self.parse_namespace_body(items);
            self.namespace_stack.pop();
            result
        } else if self.next_is(&Token::OpenBracket) {
            let transforms = self.parse_transform_list()?;
            self.parse_definition_or_execution(transforms, items)
        } else {
            self.parse_definition_or_execution(Vec::new(), items)
        }
    }

    fn parse_namespace_body(&mut self, items: &mut Vec<TopLevelItem>) -> Result<()> {
        self.expect_and_discard(Token::OpenBrace)?;
        while !self.next_is(&Token::CloseBrace) {
            if self.tokens.is_exhausted() {
                return self.premature_eof();
            }
            self.parse_top_level_item(items)?;
        }
        self.expect_and_discard(Token::CloseBrace)
    }

    fn parse_import(&mut self, items: &mut Vec<TopLevelItem>) -> Result<()> {
        let position = self.peek_position();
        self.discard();
        let mut path = match self.peek_token() {
            Token::SlashPath(s) => {
                self.discard();
                s
            }
            other => return self.unexpected(other),
        };

        let mut wildcard = false;
        if self.next_is(&Token::Slash) && self.nth_is(1, &Token::Star) {
            self.discard();
            self.discard();
            path.push_str("/*");
            wildcard = true;
            if self.next_is(&Token::Star) {
                self.discard();
                path.push('*');
            }
        }

        if path.matches('/').count() <= 1 && !wildcard {
            return self.fail(format!(
                "'{}' is a bare top-level import; use a wildcard form such as '{}/*'",
                path, path
            ));
        }

        if self.next_is(&Token::Semicolon) {
            self.discard();
        }

        items.push(TopLevelItem::Import(Import { path, position }));
        Ok(())
    }

    /// Scans forward from the current `(` token (already peeked, not yet
    /// consumed) past its matching close, and reports whether a `{`
    /// follows — the lookahead the state machine in `spec.md` §4.2 uses
    /// to distinguish a definition body from a bodyless execution.
    fn scan_is_followed_by_open_brace_after_matching_parens(&self) -> bool {
        let mut depth: i32 = 0;
        let mut idx = 0;
        loop {
            let token = match self.tokens.peek_nth(idx) {
                Some(lexed) => &lexed.token,
                None => return false,
            };
            match token {
                Token::OpenParen | Token::OpenBrace | Token::OpenBracket => depth += 1,
                Token::CloseParen | Token::CloseBrace | Token::CloseBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return self.nth_is(idx + 1, &Token::OpenBrace);
                    }
                }
                Token::Eof => return false,
                _ => {}
            }
            idx += 1;
        }
    }

    fn parse_definition_or_execution(&mut self, transforms: Vec<Transform>, items: &mut Vec<TopLevelItem>) -> Result<()> {
        let position = self.peek_position();
        let name = self.read_path_or_declared_name()?;
        let template_args = self.try_parse_template_args()?;

        if !self.next_is(&Token::OpenParen) {
            return self.expected(Token::OpenParen);
        }
        let is_definition = self.scan_is_followed_by_open_brace_after_matching_parens();
        self.discard();

        if is_definition {
            let mut parameters = Vec::new();
            if !self.next_is(&Token::CloseParen) {
                loop {
                    parameters.push(self.parse_parameter()?);
                    if self.next_is(&Token::Comma) {
                        self.discard();
                    } else {
                        break;
                    }
                }
            }
            self.expect_and_discard(Token::CloseParen)?;
            let _ = template_args;
            let statements = self.parse_block_statements()?;
            let full_path = self.full_path_for(&name);
            items.push(TopLevelItem::Definition(Definition {
                full_path: full_path.clone(),
                name: last_segment(&full_path).to_owned(),
                namespace_prefix: self.current_namespace_prefix().unwrap_or_default(),
                transforms,
                parameters,
                statements,
                position,
            }));
        } else {
            let mut args = Vec::new();
            let mut arg_names = Vec::new();
            if !self.next_is(&Token::CloseParen) {
                loop {
                    let (expr, arg_name) = self.parse_call_argument()?;
                    args.push(expr);
                    arg_names.push(arg_name);
                    if self.next_is(&Token::Comma) {
                        self.discard();
                    } else {
                        break;
                    }
                }
            }
            self.expect_and_discard(Token::CloseParen)?;
            let body = if self.next_is(&Token::OpenBrace) {
                Some(self.parse_block_statements()?)
            } else {
                None
            };
            items.push(TopLevelItem::Execution(Execution {
                full_path: self.full_path_for(&name),
                args,
                arg_names,
                transforms,
                body,
                position,
            }));
        }
        Ok(())
    }

    // --- parameters, bindings, statements -------------------------------

    fn parse_parameter(&mut self) -> Result<Call> {
        let position = self.peek_position();
        let transforms = if self.next_is(&Token::OpenBracket) {
            self.parse_transform_list()?
        } else {
            Vec::new()
        };
        let name = self.read_declared_name()?;

        let (args, arg_names) = if self.next_is(&Token::OpenBrace) {
            self.discard();
            let initializer = self.parse_expression()?;
            self.expect_and_discard(Token::CloseBrace)?;
            (vec![initializer], vec![None])
        } else if self.next_is(&Token::OpenParen) && transforms_are_type_like(&transforms) {
            self.discard();
            let initializer = self.parse_expression()?;
            self.expect_and_discard(Token::CloseParen)?;
            (vec![initializer], vec![None])
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Call {
            name,
            namespace_prefix: None,
            template_args: Vec::new(),
            args,
            arg_names,
            is_method_call: false,
            is_binding: true,
            transforms,
            has_body_arguments: false,
            body_arguments: Vec::new(),
            position,
        })
    }

    fn parse_block_statements(&mut self) -> Result<Vec<Expr>> {
        self.expect_and_discard(Token::OpenBrace)?;
        let mut statements = Vec::new();
        while !self.next_is(&Token::CloseBrace) {
            if self.tokens.is_exhausted() {
                return self.premature_eof();
            }
            statements.push(self.parse_statement()?);
        }
        self.expect_and_discard(Token::CloseBrace)?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Expr> {
        if !self.next_is(&Token::OpenBracket) {
            return self.parse_expression();
        }

        let position = self.peek_position();
        let transforms = self.parse_transform_list()?;
        let name = self.read_name_token()?;
        let template_args = self.try_parse_template_args()?;
        let namespace_prefix = self.current_namespace_prefix();

        if self.next_is(&Token::OpenBrace) {
            self.discard();
            let initializer = self.parse_expression()?;
            self.expect_and_discard(Token::CloseBrace)?;
            return Ok(Expr::Call(Call {
                name,
                namespace_prefix,
                template_args,
                args: vec![initializer],
                arg_names: vec![None],
                is_method_call: false,
                is_binding: true,
                transforms,
                has_body_arguments: false,
                body_arguments: Vec::new(),
                position,
            }));
        }

        if self.next_is(&Token::OpenParen) && transforms_are_type_like(&transforms) {
            self.discard();
            let initializer = self.parse_expression()?;
            self.expect_and_discard(Token::CloseParen)?;
            return Ok(Expr::Call(Call {
                name,
                namespace_prefix,
                template_args,
                args: vec![initializer],
                arg_names: vec![None],
                is_method_call: false,
                is_binding: true,
                transforms,
                has_body_arguments: false,
                body_arguments: Vec::new(),
                position,
            }));
        }

        if self.next_is(&Token::OpenParen) {
            let (args, arg_names) = self.parse_arg_list()?;
            let mut call = Call {
                name,
                namespace_prefix,
                template_args,
                args,
                arg_names,
                is_method_call: false,
                is_binding: false,
                transforms,
                has_body_arguments: false,
                body_arguments: Vec::new(),
                position,
            };
            if self.next_is(&Token::OpenBrace) {
                call.has_body_arguments = true;
                call.body_arguments = self.parse_block_statements()?;
            }
            return Ok(Expr::Call(call));
        }

        Ok(Expr::Call(Call {
            name,
            namespace_prefix,
            template_args,
            args: Vec::new(),
            arg_names: Vec::new(),
            is_method_call: false,
            is_binding: true,
            transforms,
            has_body_arguments: false,
            body_arguments: Vec::new(),
            position,
        }))
    }

    // --- expressions ------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr> {
        match self.peek_token() {
            Token::Integer(lit) => {
                self.discard();
                let width = match lit.suffix {
                    Some(crate::lexing::token::IntegerSuffix::I32) => Width::W32,
                    Some(crate::lexing::token::IntegerSuffix::I64) | Some(crate::lexing::token::IntegerSuffix::U64) => Width::W64,
                    None => Width::W32,
                };
                let unsigned = matches!(lit.suffix, Some(crate::lexing::token::IntegerSuffix::U64));
                Ok(Expr::Literal {
                    value: literal_bits(&lit.text, lit.is_hex),
                    width,
                    unsigned,
                })
            }
            Token::Float(lit) => {
                self.discard();
                let width = match lit.suffix {
                    Some(crate::lexing::token::FloatSuffix::F32) => Width::W32,
                    Some(crate::lexing::token::FloatSuffix::F64) | None => Width::W64,
                };
                Ok(Expr::FloatLiteral { text: lit.text, width })
            }
            Token::Bool(b) => {
                self.discard();
                Ok(Expr::BoolLiteral(b))
            }
            Token::String(tok) => {
                self.discard();
                Ok(Expr::StringLiteral(render_string_token(&tok)))
            }
            Token::Identifier(_) | Token::SlashPath(_) => self.parse_call_or_name(),
            other => self.unexpected(other),
        }
    }

    fn parse_call_or_name(&mut self) -> Result<Expr> {
        let position = self.peek_position();
        let name = self.read_name_token()?;
        let namespace_prefix = self.current_namespace_prefix();
        let template_args = self.try_parse_template_args()?;

        let mut expr = if self.next_is(&Token::OpenParen) {
            let (args, arg_names) = self.parse_arg_list()?;
            Expr::Call(Call {
                name,
                namespace_prefix: namespace_prefix.clone(),
                template_args,
                args,
                arg_names,
                is_method_call: false,
                is_binding: false,
                transforms: Vec::new(),
                has_body_arguments: false,
                body_arguments: Vec::new(),
                position,
            })
        } else if self.next_is(&Token::OpenBrace) {
            // A bare name directly followed by a block, e.g. `then{ ... }`
            // or `else{ ... }`: a zero-argument call carrying only body
            // arguments.
            let body_arguments = self.parse_block_statements()?;
            Expr::Call(Call {
                name,
                namespace_prefix: namespace_prefix.clone(),
                template_args,
                args: Vec::new(),
                arg_names: Vec::new(),
                is_method_call: false,
                is_binding: false,
                transforms: Vec::new(),
                has_body_arguments: true,
                body_arguments,
                position,
            })
        } else {
            if !template_args.is_empty() {
                return self.expected(Token::OpenParen);
            }
            Expr::Name(name)
        };

        while self.next_is(&Token::Dot) {
            self.discard();
            let method_position = self.peek_position();
            let method_name = match self.peek_token() {
                Token::Identifier(s) => {
                    self.discard();
                    s
                }
                other => return self.unexpected(other),
            };
            let (mut args, mut arg_names) = self.parse_arg_list()?;
            let mut full_args = vec![expr];
            full_args.append(&mut args);
            let mut full_names = vec![None];
            full_names.append(&mut arg_names);
            expr = Expr::Call(Call {
                name: method_name,
                namespace_prefix: None,
                template_args: Vec::new(),
                args: full_args,
                arg_names: full_names,
                is_method_call: true,
                is_binding: false,
                transforms: Vec::new(),
                has_body_arguments: false,
                body_arguments: Vec::new(),
                position: method_position,
            });
        }

        if let Expr::Call(ref mut call) = expr {
            if self.next_is(&Token::OpenBrace) {
                call.has_body_arguments = true;
                call.body_arguments = self.parse_block_statements()?;
            }
        }

        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> Result<(Vec<Expr>, Vec<Option<String>>)> {
        self.expect_and_discard(Token::OpenParen)?;
        let mut args = Vec::new();
        let mut arg_names = Vec::new();
        if !self.next_is(&Token::CloseParen) {
            loop {
                let (expr, name) = self.parse_call_argument()?;
                args.push(expr);
                arg_names.push(name);
                if self.next_is(&Token::Comma) {
                    self.discard();
                } else {
                    break;
                }
            }
        }
        self.expect_and_discard(Token::CloseParen)?;
        Ok((args, arg_names))
    }

    /// A call argument is either `[name] expr` (named) or a bare `expr`
    /// (positional). `[name]` is recognized only by the exact
    /// identifier-then-close-bracket shape; any other bracket
    /// content belongs to a transform list on a parameter, not a call
    /// argument (`spec.md` §9's named-argument bracket ambiguity,
    /// resolved here in favor of call-argument position never carrying a
    /// nested transform list of its own).
    fn parse_call_argument(&mut self) -> Result<(Expr, Option<String>)> {
        if self.next_is(&Token::OpenBracket) && self.nth_is_identifier(1) && self.nth_is(2, &Token::CloseBracket) {
            self.discard();
            let name = self.read_declared_name()?;
            self.expect_and_discard(Token::CloseBracket)?;
            let expr = self.parse_expression()?;
            Ok((expr, Some(name)))
        } else {
            let expr = self.parse_expression()?;
            Ok((expr, None))
        }
    }

    // --- transforms -------------------------------------------------------

    fn parse_transform_list(&mut self) -> Result<Vec<Transform>> {
        self.expect_and_discard(Token::OpenBracket)?;
        if self.next_is(&Token::CloseBracket) {
            return self.fail("empty transform list");
        }
        let mut transforms = Vec::new();
        loop {
            transforms.push(self.parse_transform()?);
            if self.next_is(&Token::Comma) {
                self.discard();
            } else {
                break;
            }
        }
        self.expect_and_discard(Token::CloseBracket)?;
        Ok(transforms)
    }

    fn parse_transform(&mut self) -> Result<Transform> {
        let position = self.peek_position();
        let name = self.read_path_or_declared_name()?;
        let template_args = self.try_parse_template_args()?;

        let value_args = if self.next_is(&Token::OpenParen) {
            self.discard();
            let mut values = Vec::new();
            if !self.next_is(&Token::CloseParen) {
                loop {
                    values.push(self.parse_transform_value_arg()?);
                    if self.next_is(&Token::Comma) {
                        self.discard();
                    } else {
                        break;
                    }
                }
            }
            self.expect_and_discard(Token::CloseParen)?;
            values
        } else {
            Vec::new()
        };

        Ok(Transform {
            name,
            template_args,
            value_args,
            phase: TransformPhase::Semantic,
            position,
        })
    }

    fn parse_transform_value_arg(&mut self) -> Result<TransformArg> {
        if let Token::Identifier(s) = self.peek_token() {
            if self.nth_is(1, &Token::Comma) || self.nth_is(1, &Token::CloseParen) {
                self.discard();
                return Ok(TransformArg::Identifier(s));
            }
        }
        let expr = self.parse_literal_expr()?;
        Ok(TransformArg::Literal(expr))
    }

    fn parse_literal_expr(&mut self) -> Result<Expr> {
        match self.peek_token() {
            Token::Integer(_) | Token::Float(_) | Token::Bool(_) | Token::String(_) => self.parse_expression(),
            other => self.unexpected(other),
        }
    }

    fn try_parse_template_args(&mut self) -> Result<Vec<String>> {
        if !self.next_is(&Token::LeftAngle) {
            return Ok(Vec::new());
        }
        self.discard();
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type_text()?);
            if self.next_is(&Token::Comma) {
                self.discard();
            } else {
                break;
            }
        }
        self.expect_and_discard(Token::RightAngle)?;
        Ok(args)
    }

    fn parse_type_text(&mut self) -> Result<String> {
        let name = self.read_path_or_declared_name()?;
        if self.next_is(&Token::LeftAngle) {
            self.discard();
            let mut inner = Vec::new();
            loop {
                inner.push(self.parse_type_text()?);
                if self.next_is(&Token::Comma) {
                    self.discard();
                } else {
                    break;
                }
            }
            self.expect_and_discard(Token::RightAngle)?;
            Ok(format!("{}<{}>", name, inner.join(", ")))
        } else {
            Ok(name)
        }
    }
}

/// Parses a lexed token stream into a `Program`.
pub fn parse(tokens: Vec<LexedToken>) -> Result<Program> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexing::lex_all;

    fn parse_source(source: &str) -> Program {
        let tokens = lex_all(source).expect("lex");
        parse(tokens).expect("parse")
    }

    #[test]
    fn parses_a_minimal_definition_with_return_transform() {
        let program = parse_source("[return<int>]\nmain() { return(1i32) }\n");
        let def = program.find_definition("/main").expect("definition");
        assert_eq!(def.transforms.len(), 1);
        assert_eq!(def.transforms[0].name, "return");
        assert_eq!(def.transforms[0].template_args, vec!["int".to_string()]);
        assert_eq!(def.statements.len(), 1);
        match &def.statements[0] {
            Expr::Call(c) => assert_eq!(c.name, "return"),
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn parses_namespaced_definitions() {
        let program = parse_source("namespace demo { widget() { } }");
        assert!(program.find_definition("/demo/widget").is_some());
    }

    #[test]
    fn parses_bindings_with_type_transform_and_initializer() {
        let program = parse_source("main() { [i32] x{1i32} }");
        let def = program.find_definition("/main").unwrap();
        match &def.statements[0] {
            Expr::Call(c) => {
                assert!(c.is_binding);
                assert_eq!(c.name, "x");
                assert_eq!(c.args.len(), 1);
            }
            other => panic!("expected a binding call, got {:?}", other),
        }
    }

    #[test]
    fn parses_execution_with_named_and_positional_arguments() {
        let program = parse_source("/demo/widget(1i32, [label] 2i32)");
        let exec = program.executions().next().expect("execution");
        assert_eq!(exec.full_path, "/demo/widget");
        assert_eq!(exec.arg_names, vec![None, Some("label".to_string())]);
    }

    #[test]
    fn rejects_bare_top_level_import() {
        let tokens = lex_all("import /math\n").unwrap();
        let err = parse(tokens).unwrap_err();
        assert!(matches!(err.description, ErrorDescription::Described(_)));
    }

    #[test]
    fn accepts_wildcard_import() {
        let program = parse_source("import /math/*\nmain() { }\n");
        assert_eq!(program.imports().next().unwrap().path, "/math/*");
    }

    #[test]
    fn parses_if_then_else_as_nested_calls() {
        let program = parse_source("main() { if(true, then{ return(1i32) }, else{ return(2i32) }) }");
        let def = program.find_definition("/main").unwrap();
        match &def.statements[0] {
            Expr::Call(c) => {
                assert_eq!(c.name, "if");
                assert_eq!(c.args.len(), 3);
            }
            other => panic!("expected an if call, got {:?}", other),
        }
    }

    #[test]
    fn parses_method_call_chains() {
        let program = parse_source("main() { a.b(1i32).c() }");
        let def = program.find_definition("/main").unwrap();
        match &def.statements[0] {
            Expr::Call(c) => {
                assert_eq!(c.name, "c");
                assert!(c.is_method_call);
            }
            other => panic!("expected a method call, got {:?}", other),
        }
    }

    #[test]
    fn rejects_reserved_word_as_parameter_name() {
        let tokens = lex_all("widget(mut) { }").unwrap();
        let err = parse(tokens).unwrap_err();
        assert!(matches!(err.description, ErrorDescription::Described(_)));
    }
}
