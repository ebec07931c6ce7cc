//! Hand-written recursive descent parser with inline macro expansion.

use crate::parser::lexer::{SpannedToken, Token};
use crate::parser::macros::{MacroContext, MacroExpansion, MacroRegistry};
use crate::parser::ParseError;
use crate::types::{BinaryOp, Expr, MapEntry, Span, Spanned, SpannedExpr, UnaryOp};

/// Deepest tree the parser will build. Parenthesized, unary and chained
/// operator levels all count.
pub const MAX_DEPTH: usize = 64;

pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Node ids restart at 1 for every parse.
    next_id: i64,
    macros: &'a MacroRegistry,
    depth: usize,
    /// Errors that did not abort the parse: macro misuse and list items
    /// skipped during recovery.
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [SpannedToken], macros: &'a MacroRegistry) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: 1,
            macros,
            depth: 0,
            errors: Vec::new(),
        }
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // === Token cursor ===

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        let matched = self.check(token);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.unexpected(&format!("expected '{}'", token)))
        }
    }

    fn unexpected(&self, expectation: &str) -> ParseError {
        let found = match self.peek() {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        };
        ParseError {
            message: format!("{}, found {}", expectation, found),
            span: self.peek_span(),
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Goes one level deeper, failing past [`MAX_DEPTH`].
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError {
                message: format!("expression nested too deeply (limit {})", MAX_DEPTH),
                span: self.peek_span(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Runs `parse` one level deeper. On error the depth is left for the
    /// recovery point to reset.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.descend()?;
        let parsed = parse(self)?;
        self.depth -= 1;
        Ok(parsed)
    }

    /// Records an error and skips to the next `,` or closing bracket at
    /// the current bracket level.
    fn recover(&mut self, error: ParseError) {
        let duplicate = self
            .errors
            .last()
            .is_some_and(|last| last.span.start == error.span.start);
        if !duplicate {
            self.errors.push(error);
        }

        let mut open = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen | Token::LBracket | Token::LBrace => open += 1,
                Token::RParen | Token::RBracket | Token::RBrace if open == 0 => return,
                Token::RParen | Token::RBracket | Token::RBrace => open -= 1,
                Token::Comma if open == 0 => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn binary(&mut self, op: BinaryOp, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        let span = left.span.start..right.span.end;
        Spanned::new(
            self.next_id(),
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    // === Grammar ===

    pub fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.nested(Self::parse_ternary)
    }

    fn parse_ternary(&mut self) -> Result<SpannedExpr, ParseError> {
        let cond = self.parse_coalesce()?;

        if !self.match_token(&Token::Question) {
            return Ok(cond);
        }
        let then_expr = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let else_expr = self.parse_expr()?;
        let span = cond.span.start..else_expr.span.end;

        Ok(Spanned::new(
            self.next_id(),
            Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// `a ?? b ?? c` groups as `a ?? (b ?? c)`.
    fn parse_coalesce(&mut self) -> Result<SpannedExpr, ParseError> {
        let left = self.parse_or()?;
        if self.match_token(&Token::QuestionQuestion) {
            let right = self.nested(Self::parse_coalesce)?;
            return Ok(self.binary(BinaryOp::Coalesce, left, right));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<SpannedExpr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_and()?;
        while self.match_token(&Token::Or) {
            self.descend()?;
            let right = self.parse_and()?;
            left = self.binary(BinaryOp::Or, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<SpannedExpr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_relation()?;
        while self.match_token(&Token::And) {
            self.descend()?;
            let right = self.parse_relation()?;
            left = self.binary(BinaryOp::And, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_relation(&mut self) -> Result<SpannedExpr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_addition()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::In) => BinaryOp::In,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_addition()?;
            left = self.binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_addition(&mut self) -> Result<SpannedExpr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_mult()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_mult()?;
            left = self.binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_mult(&mut self) -> Result<SpannedExpr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_unary()?;
            left = self.binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Not) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;

        if op == UnaryOp::Neg && self.check(&Token::IntMinMagnitude) {
            let span = start..self.peek_span().end;
            self.pos += 1;
            let literal = Spanned::new(self.next_id(), Expr::Int(i64::MIN), span);
            return self.parse_selectors(literal);
        }

        let expr = self.nested(Self::parse_unary)?;
        let span = start..expr.span.end;
        Ok(Spanned::new(
            self.next_id(),
            Expr::Unary {
                op,
                expr: Box::new(expr),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> Result<SpannedExpr, ParseError> {
        let atom = self.parse_atom()?;
        self.parse_selectors(atom)
    }

    /// Applies any `.field`, `.method()` or `[index]` suffixes to `expr`.
    fn parse_selectors(&mut self, mut expr: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let depth = self.depth;
        loop {
            expr = match self.peek() {
                Some(Token::Dot) => self.parse_member(expr)?,
                Some(Token::LBracket) => self.parse_index(expr)?,
                _ => break,
            };
            self.descend()?;
        }
        self.depth = depth;
        Ok(expr)
    }

    /// `.field`, `.?field` or `.method(args)`.
    fn parse_member(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::Dot)?;
        let optional = self.match_token(&Token::Question);

        let (field, field_span) = match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                let span = self.peek_span();
                self.pos += 1;
                (name, span)
            }
            _ => return Err(self.unexpected("expected field name after '.'")),
        };

        if !optional && self.check(&Token::LParen) {
            let (args, end) = self.parse_args()?;
            return Ok(self.finish_call(field, Some(base), args, start..end));
        }

        Ok(Spanned::new(
            self.next_id(),
            Expr::Member {
                expr: Box::new(base),
                field,
                optional,
            },
            start..field_span.end,
        ))
    }

    fn parse_index(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::LBracket)?;
        let index = self.parse_expr()?;
        let end = self.expect(&Token::RBracket)?;

        Ok(Spanned::new(
            self.next_id(),
            Expr::Index {
                expr: Box::new(base),
                index: Box::new(index),
            },
            start..end.end,
        ))
    }

    /// Parses `(a, b, ...)`, returning the arguments and the closing offset.
    fn parse_args(&mut self) -> Result<(Vec<SpannedExpr>, usize), ParseError> {
        self.expect(&Token::LParen)?;
        let args = self.parse_comma_separated(&Token::RParen, Self::parse_expr)?;
        let end = self.expect(&Token::RParen)?;
        Ok((args, end.end))
    }

    fn parse_comma_separated<T>(
        &mut self,
        close: &Token,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        if self.check(close) {
            return Ok(items);
        }
        loop {
            let depth = self.depth;
            match item(self) {
                Ok(parsed) => items.push(parsed),
                Err(error) => {
                    self.depth = depth;
                    self.recover(error);
                }
            }
            if !self.match_token(&Token::Comma) || self.check(close) {
                break;
            }
        }
        Ok(items)
    }

    /// Builds a call node, expanding it first if it names a macro.
    fn finish_call(
        &mut self,
        function: String,
        target: Option<SpannedExpr>,
        args: Vec<SpannedExpr>,
        span: Span,
    ) -> SpannedExpr {
        let expander = self
            .macros
            .lookup(&function, args.len(), target.is_some())
            .map(|m| m.expander);
        if let Some(expander) = expander {
            let mut ctx = MacroContext::new(&mut self.next_id);
            match expander(&mut ctx, span.clone(), target, args) {
                MacroExpansion::Expanded(expr) => return expr,
                MacroExpansion::Error(message, error_span) => {
                    self.errors.push(ParseError {
                        message,
                        span: error_span,
                    });
                    // Placeholder so parsing can continue to find later errors.
                    return Spanned::new(self.next_id(), Expr::Null, span);
                }
            }
        }

        Spanned::new(
            self.next_id(),
            Expr::Call {
                function,
                target: target.map(Box::new),
                args,
            },
            span,
        )
    }

    fn parse_atom(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();
        let node = match self.peek() {
            Some(Token::Int(n)) => Expr::Int(*n),
            Some(Token::Double(n)) => Expr::Double(*n),
            Some(Token::String(s)) => Expr::String(s.clone()),
            Some(Token::Bytes(b)) => Expr::Bytes(b.clone()),
            Some(Token::True) => Expr::Bool(true),
            Some(Token::False) => Expr::Bool(false),
            Some(Token::Null) => Expr::Null,
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                if self.check(&Token::LParen) {
                    let (args, end) = self.parse_args()?;
                    return Ok(self.finish_call(name, None, args, span.start..end));
                }
                return Ok(Spanned::new(self.next_id(), Expr::Ident(name), span));
            }
            Some(Token::IntMinMagnitude) => {
                return Err(ParseError {
                    message: "integer literal out of range".to_string(),
                    span,
                });
            }
            Some(Token::Reserved(word)) => {
                return Err(ParseError {
                    message: format!("'{}' is a reserved word and cannot be used as an identifier", word),
                    span,
                });
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(expr);
            }
            Some(Token::LBracket) => return self.parse_list(),
            Some(Token::LBrace) => return self.parse_map(),
            Some(_) => return Err(self.unexpected("expected an expression")),
            None => {
                return Err(ParseError {
                    message: "unexpected end of input".to_string(),
                    span: self.eof_span(),
                })
            }
        };
        self.pos += 1;
        Ok(Spanned::new(self.next_id(), node, span))
    }

    fn parse_list(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.expect(&Token::LBracket)?.start;
        let items = self.parse_comma_separated(&Token::RBracket, Self::parse_expr)?;
        let end = self.expect(&Token::RBracket)?;
        Ok(Spanned::new(self.next_id(), Expr::List(items), start..end.end))
    }

    fn parse_map(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.expect(&Token::LBrace)?.start;
        let entries = self.parse_comma_separated(&Token::RBrace, |p| {
            let key = p.parse_expr()?;
            p.expect(&Token::Colon)?;
            let value = p.parse_expr()?;
            Ok(MapEntry { key, value })
        })?;
        let end = self.expect(&Token::RBrace)?;
        Ok(Spanned::new(self.next_id(), Expr::Map(entries), start..end.end))
    }
}

/// Parses a token stream, returning the tree when there were no errors.
pub fn parse_tokens(
    tokens: &[SpannedToken],
    macros: &MacroRegistry,
) -> (Option<SpannedExpr>, Vec<ParseError>) {
    if tokens.is_empty() {
        return (
            None,
            vec![ParseError {
                message: "empty expression".to_string(),
                span: 0..0,
            }],
        );
    }

    let mut parser = Parser::new(tokens, macros);
    let result = parser.parse_expr();
    let mut errors = std::mem::take(&mut parser.errors);

    match result {
        Ok(ast) if parser.at_end() && errors.is_empty() => (Some(ast), errors),
        Ok(_) => {
            if !parser.at_end() {
                errors.push(parser.unexpected("expected end of expression"));
            }
            (None, errors)
        }
        Err(e) => {
            errors.push(e);
            (None, errors)
        }
    }
}
