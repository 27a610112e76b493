use std::{collections::HashSet, fmt::Display, iter::Peekable};

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    lex::{Token, TokenKind},
    mbf::Mbf32,
};

/// Highest line number the ROM's BASIC accepts.
pub const MAX_LINE_NUMBER: u16 = 65529;

#[derive(Error, Debug, Diagnostic)]
#[error("Syntax error in line {line}: {message}")]
#[diagnostic(code(bascompile::syntax))]
pub struct SyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// 1-based physical line of the source.
    pub line: usize,
    /// BASIC line number of the offending line, once it has been read.
    pub line_number: Option<u16>,
    pub message: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("line {number} comes after line {previous}")]
#[diagnostic(
    code(bascompile::line_order),
    severity(Warning),
    help("lines are compiled in the order they appear in the file, not sorted")
)]
pub struct LineOrderWarning {
    #[source_code]
    src: NamedSource<String>,

    #[label("out of order")]
    span: SourceSpan,

    pub number: u16,
    pub previous: u16,
}

/// A named floating-point cell. Names are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: &str) -> Self {
        Variable(name.to_ascii_uppercase())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Assembler label of the variable's storage cell.
    pub fn label(&self) -> String {
        format!("v{}", self.0)
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Number(f64),
    Str(String),
    Var(Variable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    Sin,
    Cos,
    Tan,
    Atn,
    Log,
    Exp,
    Rnd,
    Sqr,
    Abs,
    Sgn,
    Int,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Atom(Atom),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Atom(Atom::Number(value))
    }

    pub fn var(name: &str) -> Self {
        Expr::Atom(Atom::Var(Variable::new(name)))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let { target: Variable, value: Expr },
    Goto(u16),
    Print(Vec<Expr>),
    End,
    Rem(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: u16,
    /// 1-based physical line the BASIC line starts on.
    pub source_line: usize,
    pub span: SourceSpan,
    pub statements: Vec<Statement>,
}

/// Lines in source order plus every variable in the order it was first seen.
#[derive(Debug)]
pub struct Program<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    pub lines: Vec<Line>,
    pub variables: Vec<Variable>,
    pub warnings: Vec<LineOrderWarning>,
}

impl<'de> Program<'de> {
    pub fn source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    pub fn line(&self, number: u16) -> Option<&Line> {
        self.lines.iter().find(|line| line.number == number)
    }
}

pub struct Parser<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    tokens: Peekable<std::vec::IntoIter<Token<'de>>>,
    variables: Vec<Variable>,
    line_number: Option<u16>,
    last_line: usize,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str, tokens: Vec<Token<'de>>) -> Self {
        Parser {
            filename,
            whole,
            tokens: tokens.into_iter().peekable(),
            variables: Vec::new(),
            line_number: None,
            last_line: 1,
        }
    }

    pub fn parse(mut self) -> Result<Program<'de>, Error> {
        let mut lines: Vec<Line> = Vec::new();
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        while self.peek().kind != TokenKind::Eof {
            let line = self.parse_line()?;
            if !seen.insert(line.number) {
                return Err(SyntaxError {
                    src: self.source(),
                    span: line.span,
                    help: Some("every line number may appear only once".to_string()),
                    line: line.source_line,
                    line_number: Some(line.number),
                    message: format!("duplicate line number {}", line.number),
                }
                .into());
            }
            if let Some(previous) = lines.last() {
                if line.number < previous.number {
                    warnings.push(LineOrderWarning {
                        src: self.source(),
                        span: line.span,
                        number: line.number,
                        previous: previous.number,
                    });
                }
            }
            lines.push(line);
        }

        Ok(Program {
            filename: self.filename,
            whole: self.whole,
            lines,
            variables: self.variables,
            warnings,
        })
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    fn eof(&self) -> Token<'de> {
        Token {
            kind: TokenKind::Eof,
            literal: "",
            line: self.last_line,
            offset: self.whole.len(),
        }
    }

    fn peek(&mut self) -> Token<'de> {
        self.tokens.peek().copied().unwrap_or_else(|| self.eof())
    }

    fn next(&mut self) -> Token<'de> {
        match self.tokens.next() {
            Some(token) => {
                self.last_line = token.line;
                token
            }
            None => self.eof(),
        }
    }

    fn error(&self, token: &Token<'de>, message: impl Into<String>, help: Option<&str>) -> Error {
        SyntaxError {
            src: self.source(),
            span: token.span(),
            help: help.map(str::to_string),
            line: token.line,
            line_number: self.line_number,
            message: message.into(),
        }
        .into()
    }

    fn expect(&mut self, expected: TokenKind, error: &str) -> Result<Token<'de>, Error> {
        let token = self.next();
        if token.kind == expected {
            Ok(token)
        } else {
            let help = format!("use {expected} here instead of {}", token.kind);
            Err(self.error(&token, error, Some(&help)))
        }
    }

    fn register(&mut self, name: &str) -> Variable {
        let variable = Variable::new(name);
        if !self.variables.contains(&variable) {
            self.variables.push(variable.clone());
        }
        variable
    }

    /// Line numbers and GOTO targets: plain digits within the ROM's range.
    fn parse_line_number(&self, token: &Token<'de>) -> Result<u16, Error> {
        let TokenKind::Number(value) = token.kind else {
            return Err(self.error(
                token,
                format!("expected a line number, found {}", token.kind),
                None,
            ));
        };
        if !token.literal.bytes().all(|b| b.is_ascii_digit()) || value > MAX_LINE_NUMBER as f64 {
            return Err(self.error(
                token,
                format!("malformed line number `{}`", token.literal),
                Some(&format!(
                    "line numbers are whole numbers from 0 to {MAX_LINE_NUMBER}"
                )),
            ));
        }
        Ok(value as u16)
    }

    fn parse_line(&mut self) -> Result<Line, Error> {
        self.line_number = None;
        let first = self.next();
        if !matches!(first.kind, TokenKind::Number(_)) {
            return Err(self.error(
                &first,
                "missing line number",
                Some("every line must start with a line number"),
            ));
        }
        let number = self.parse_line_number(&first)?;
        self.line_number = Some(number);

        let mut statements = Vec::new();
        let end = loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eol => break self.next(),
                TokenKind::Eof => break token,
                TokenKind::Colon => {
                    self.next();
                    continue;
                }
                _ => {}
            }

            statements.push(self.parse_statement()?);

            let token = self.peek();
            if !matches!(
                token.kind,
                TokenKind::Colon | TokenKind::Eol | TokenKind::Eof
            ) {
                return Err(self.error(
                    &token,
                    format!("unexpected {}", token.kind),
                    Some("separate statements with `:`"),
                ));
            }
        };

        Ok(Line {
            number,
            source_line: first.line,
            span: SourceSpan::from(first.offset..end.offset),
            statements,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, Error> {
        let token = self.next();
        match token.kind {
            TokenKind::Let => {
                let target = self.expect(TokenKind::Ident, "expected a variable after `LET`")?;
                self.parse_assignment(target)
            }
            TokenKind::Ident if self.peek().kind == TokenKind::Equal => {
                self.parse_assignment(token)
            }
            TokenKind::Ident => Err(self.error(
                &token,
                format!(
                    "unknown statement keyword `{}`",
                    token.literal.to_ascii_uppercase()
                ),
                Some("statements are LET, GOTO, PRINT, END and REM"),
            )),
            TokenKind::Goto => {
                let target = self.next();
                Ok(Statement::Goto(self.parse_line_number(&target)?))
            }
            TokenKind::Print => self.parse_print(),
            TokenKind::End => Ok(Statement::End),
            TokenKind::Rem => Ok(Statement::Rem(token.literal.to_string())),
            kind if kind.is_keyword() => Err(self.error(
                &token,
                format!("{kind} is not a statement"),
                Some("statements are LET, GOTO, PRINT, END and REM"),
            )),
            kind => Err(self.error(&token, format!("expected a statement, found {kind}"), None)),
        }
    }

    fn parse_assignment(&mut self, target: Token<'de>) -> Result<Statement, Error> {
        let target = self.register(target.literal);
        self.expect(TokenKind::Equal, "expected `=` after the variable")?;
        let value = self.parse_expression()?;
        Ok(Statement::Let { target, value })
    }

    fn parse_print(&mut self) -> Result<Statement, Error> {
        let mut items = Vec::new();
        if matches!(
            self.peek().kind,
            TokenKind::Colon | TokenKind::Eol | TokenKind::Eof
        ) {
            return Ok(Statement::Print(items));
        }
        loop {
            items.push(self.parse_expression()?);
            match self.peek().kind {
                TokenKind::Comma | TokenKind::Semicolon => {
                    self.next();
                }
                _ => return Ok(Statement::Print(items)),
            }
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_and()?;
        while self.peek().kind == TokenKind::Or {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_not()?;
        while self.peek().kind == TokenKind::And {
            self.next();
            let rhs = self.parse_not()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, Error> {
        if self.peek().kind == TokenKind::Not {
            self.next();
            return Ok(Expr::unary(UnaryOp::Not, self.parse_not()?));
        }
        self.parse_relation()
    }

    /// Left-associative: `1<2<3` compares the result of `1<2` with 3.
    fn parse_relation(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Equal => BinaryOp::Eq,
                TokenKind::NotEqual => BinaryOp::Ne,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_additive()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    /// Negation binds looser than `^`, so `-2^2` is `-(2^2)`.
    fn parse_unary(&mut self) -> Result<Expr, Error> {
        match self.peek().kind {
            TokenKind::Minus => {
                self.next();
                Ok(Expr::unary(UnaryOp::Negate, self.parse_unary()?))
            }
            TokenKind::Plus => {
                self.next();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    /// Right-associative: `2^3^2` is `2^(3^2)`.
    fn parse_power(&mut self) -> Result<Expr, Error> {
        let base = self.parse_primary()?;
        if self.peek().kind != TokenKind::Caret {
            return Ok(base);
        }
        self.next();
        let exponent = self.parse_unary()?;
        Ok(Expr::binary(BinaryOp::Pow, base, exponent))
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let token = self.next();
        let function = match token.kind {
            TokenKind::Number(value) => {
                if let Err(e) = Mbf32::try_from(value) {
                    return Err(self.error(
                        &token,
                        format!("malformed numeric literal: {e}"),
                        Some("ROM floats hold magnitudes below 1.7E+38"),
                    ));
                }
                return Ok(Expr::number(value));
            }
            TokenKind::String => return Ok(Expr::Atom(Atom::Str(token.literal.to_string()))),
            TokenKind::Ident => return Ok(Expr::Atom(Atom::Var(self.register(token.literal)))),
            TokenKind::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "unmatched `(`")?;
                return Ok(expr);
            }
            TokenKind::Sin => UnaryOp::Sin,
            TokenKind::Cos => UnaryOp::Cos,
            TokenKind::Tan => UnaryOp::Tan,
            TokenKind::Atn => UnaryOp::Atn,
            TokenKind::Log => UnaryOp::Log,
            TokenKind::Exp => UnaryOp::Exp,
            TokenKind::Rnd => UnaryOp::Rnd,
            TokenKind::Sqr => UnaryOp::Sqr,
            TokenKind::Abs => UnaryOp::Abs,
            TokenKind::Sgn => UnaryOp::Sgn,
            TokenKind::Int => UnaryOp::Int,
            kind => {
                return Err(self.error(
                    &token,
                    format!("expected an expression, found {kind}"),
                    None,
                ));
            }
        };
        self.expect(TokenKind::LeftParen, "expected `(` after the function name")?;
        let argument = self.parse_expression()?;
        self.expect(TokenKind::RightParen, "unmatched `(`")?;
        Ok(Expr::unary(function, argument))
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "NOT"),
            UnaryOp::Sin => write!(f, "SIN"),
            UnaryOp::Cos => write!(f, "COS"),
            UnaryOp::Tan => write!(f, "TAN"),
            UnaryOp::Atn => write!(f, "ATN"),
            UnaryOp::Log => write!(f, "LOG"),
            UnaryOp::Exp => write!(f, "EXP"),
            UnaryOp::Rnd => write!(f, "RND"),
            UnaryOp::Sqr => write!(f, "SQR"),
            UnaryOp::Abs => write!(f, "ABS"),
            UnaryOp::Sgn => write!(f, "SGN"),
            UnaryOp::Int => write!(f, "INT"),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Pow => write!(f, "^"),
            BinaryOp::Eq => write!(f, "="),
            BinaryOp::Ne => write!(f, "<>"),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
            BinaryOp::And => write!(f, "AND"),
            BinaryOp::Or => write!(f, "OR"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Atom(Atom::Number(n)) => write!(f, "{n}"),
            Expr::Atom(Atom::Str(s)) => write!(f, "\"{s}\""),
            Expr::Atom(Atom::Var(v)) => write!(f, "{v}"),
            Expr::Unary(UnaryOp::Negate, operand) => write!(f, "-{operand}"),
            Expr::Unary(UnaryOp::Not, operand) => write!(f, "NOT {operand}"),
            Expr::Unary(op, operand) => write!(f, "{op}({operand})"),
            Expr::Binary(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Let { target, value } => write!(f, "LET {target} = {value}"),
            Statement::Goto(line) => write!(f, "GOTO {line}"),
            Statement::Print(items) => {
                write!(f, "PRINT")?;
                for (i, item) in items.iter().enumerate() {
                    let separator = if i == 0 { " " } else { "; " };
                    write!(f, "{separator}{item}")?;
                }
                Ok(())
            }
            Statement::End => write!(f, "END"),
            Statement::Rem(text) => write!(f, "REM {text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::tokenize;

    fn expr(source: &str) -> Expr {
        let line = format!("10 A = {source}");
        let tokens = tokenize(None, &line).unwrap();
        let program = Parser::new(None, &line, tokens).parse().unwrap();
        match &program.lines[0].statements[0] {
            Statement::Let { value, .. } => value.clone(),
            other => panic!("expected LET, got {other}"),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(
            expr("1+2*3"),
            Expr::binary(
                BinaryOp::Add,
                Expr::number(1.0),
                Expr::binary(BinaryOp::Mul, Expr::number(2.0), Expr::number(3.0))
            )
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        assert_eq!(expr("8-4-2").to_string(), "((8 - 4) - 2)");
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(expr("2^3^2").to_string(), "(2 ^ (3 ^ 2))");
    }

    #[test]
    fn test_negation_is_looser_than_power() {
        assert_eq!(
            expr("-2^2"),
            Expr::unary(
                UnaryOp::Negate,
                Expr::binary(BinaryOp::Pow, Expr::number(2.0), Expr::number(2.0))
            )
        );
        assert_eq!(expr("2^-1").to_string(), "(2 ^ -1)");
    }

    #[test]
    fn test_logical_precedence() {
        assert_eq!(
            expr("NOT A=1 OR B AND C").to_string(),
            "(NOT (A = 1) OR (B AND C))"
        );
    }

    #[test]
    fn test_functions_and_parentheses() {
        assert_eq!(expr("SIN((X+1)*2)").to_string(), "SIN(((X + 1) * 2))");
    }

    #[test]
    fn test_unary_plus_is_dropped() {
        assert_eq!(expr("+X"), Expr::var("x"));
    }
}
