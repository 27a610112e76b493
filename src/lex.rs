use std::fmt::Display;

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected character '{token}'")]
#[diagnostic(help("remove or correct the character: `{token}`"))]
pub struct SingleTokenError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
    line: usize,
}

impl SingleTokenError {
    pub fn line(&self) -> usize {
        self.line
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("unterminated string literal")]
#[diagnostic(help("string literals must be closed with `\"` on the same line"))]
pub struct StringTerminationError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this string is never closed")]
    bad_line: SourceSpan,

    line: usize,
}

impl StringTerminationError {
    pub fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    /// 1-based physical line of the source.
    pub line: usize,
    /// Byte offset of `literal` in the source.
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.literal.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    String,
    Ident,
    Number(f64),
    Let,
    Goto,
    Print,
    End,
    Rem,
    And,
    Or,
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
    Eol,
    Eof,
}

impl TokenKind {
    /// Looks a word up in the reserved-word table. `word` must already be upper case.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word {
            "LET" => TokenKind::Let,
            "GOTO" => TokenKind::Goto,
            "PRINT" => TokenKind::Print,
            "END" => TokenKind::End,
            "REM" => TokenKind::Rem,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "SIN" => TokenKind::Sin,
            "COS" => TokenKind::Cos,
            "TAN" => TokenKind::Tan,
            "ATN" => TokenKind::Atn,
            "LOG" => TokenKind::Log,
            "EXP" => TokenKind::Exp,
            "RND" => TokenKind::Rnd,
            "SQR" => TokenKind::Sqr,
            "ABS" => TokenKind::Abs,
            "SGN" => TokenKind::Sgn,
            "INT" => TokenKind::Int,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::Goto
                | TokenKind::Print
                | TokenKind::End
                | TokenKind::Rem
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::Sin
                | TokenKind::Cos
                | TokenKind::Tan
                | TokenKind::Atn
                | TokenKind::Log
                | TokenKind::Exp
                | TokenKind::Rnd
                | TokenKind::Sqr
                | TokenKind::Abs
                | TokenKind::Sgn
                | TokenKind::Int
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::LeftParen => write!(f, "`(`"),
            TokenKind::RightParen => write!(f, "`)`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Semicolon => write!(f, "`;`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::Plus => write!(f, "`+`"),
            TokenKind::Minus => write!(f, "`-`"),
            TokenKind::Star => write!(f, "`*`"),
            TokenKind::Slash => write!(f, "`/`"),
            TokenKind::Caret => write!(f, "`^`"),
            TokenKind::Equal => write!(f, "`=`"),
            TokenKind::NotEqual => write!(f, "`<>`"),
            TokenKind::Less => write!(f, "`<`"),
            TokenKind::LessEqual => write!(f, "`<=`"),
            TokenKind::Greater => write!(f, "`>`"),
            TokenKind::GreaterEqual => write!(f, "`>=`"),
            TokenKind::String => write!(f, "string literal"),
            TokenKind::Ident => write!(f, "identifier"),
            TokenKind::Number(_) => write!(f, "number"),
            TokenKind::Let => write!(f, "`LET`"),
            TokenKind::Goto => write!(f, "`GOTO`"),
            TokenKind::Print => write!(f, "`PRINT`"),
            TokenKind::End => write!(f, "`END`"),
            TokenKind::Rem => write!(f, "`REM`"),
            TokenKind::And => write!(f, "`AND`"),
            TokenKind::Or => write!(f, "`OR`"),
            TokenKind::Not => write!(f, "`NOT`"),
            TokenKind::Sin => write!(f, "`SIN`"),
            TokenKind::Cos => write!(f, "`COS`"),
            TokenKind::Tan => write!(f, "`TAN`"),
            TokenKind::Atn => write!(f, "`ATN`"),
            TokenKind::Log => write!(f, "`LOG`"),
            TokenKind::Exp => write!(f, "`EXP`"),
            TokenKind::Rnd => write!(f, "`RND`"),
            TokenKind::Sqr => write!(f, "`SQR`"),
            TokenKind::Abs => write!(f, "`ABS`"),
            TokenKind::Sgn => write!(f, "`SGN`"),
            TokenKind::Int => write!(f, "`INT`"),
            TokenKind::Eol => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::String => write!(f, "STRING \"{lit}\""),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit}"),
            TokenKind::Number(n) => write!(f, "NUMBER {lit} {n}"),
            TokenKind::Rem => write!(f, "REM {lit}"),
            TokenKind::Eol => write!(f, "EOL"),
            TokenKind::Eof => write!(f, "EOF"),
            kind if kind.is_keyword() => write!(f, "KEYWORD {}", lit.to_ascii_uppercase()),
            _ => write!(f, "OPERATOR {lit}"),
        }
    }
}

pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    pub byte: usize,
    line: usize,
    line_has_tokens: bool,
    done: bool,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            line: 1,
            line_has_tokens: false,
            done: false,
        }
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    fn token(&mut self, kind: TokenKind, literal: &'de str, offset: usize) -> Token<'de> {
        self.line_has_tokens = true;
        Token {
            kind,
            literal,
            line: self.line,
            offset,
        }
    }
}

/// Lexes the whole input, stopping at the first error.
pub fn tokenize<'de>(filename: Option<&'de str>, input: &'de str) -> Result<Vec<Token<'de>>, Error> {
    Lexer::new(filename, input).collect()
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut chars = self.rest.chars();
            let Some(c) = chars.next() else {
                if self.line_has_tokens {
                    self.line_has_tokens = false;
                    return Some(Ok(Token {
                        kind: TokenKind::Eol,
                        literal: "",
                        line: self.line,
                        offset: self.byte,
                    }));
                }
                self.done = true;
                return Some(Ok(Token {
                    kind: TokenKind::Eof,
                    literal: "",
                    line: self.line,
                    offset: self.byte,
                }));
            };
            let start = self.byte;
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                String,
                Ident,
                Number,
                Less,
                Greater,
            }

            let started = match c {
                '(' => return Some(Ok(self.token(TokenKind::LeftParen, literal, start))),
                ')' => return Some(Ok(self.token(TokenKind::RightParen, literal, start))),
                ',' => return Some(Ok(self.token(TokenKind::Comma, literal, start))),
                ';' => return Some(Ok(self.token(TokenKind::Semicolon, literal, start))),
                ':' => return Some(Ok(self.token(TokenKind::Colon, literal, start))),
                '+' => return Some(Ok(self.token(TokenKind::Plus, literal, start))),
                '-' => return Some(Ok(self.token(TokenKind::Minus, literal, start))),
                '*' => return Some(Ok(self.token(TokenKind::Star, literal, start))),
                '/' => return Some(Ok(self.token(TokenKind::Slash, literal, start))),
                '^' => return Some(Ok(self.token(TokenKind::Caret, literal, start))),
                '=' => return Some(Ok(self.token(TokenKind::Equal, literal, start))),
                '<' => Start::Less,
                '>' => Start::Greater,
                'a'..='z' | 'A'..='Z' => Start::Ident,
                '0'..='9' => Start::Number,
                '.' if self.rest.starts_with(|c: char| c.is_ascii_digit()) => Start::Number,
                '"' => Start::String,
                '\n' => {
                    let line = self.line;
                    self.line += 1;
                    if self.line_has_tokens {
                        self.line_has_tokens = false;
                        return Some(Ok(Token {
                            kind: TokenKind::Eol,
                            literal,
                            line,
                            offset: start,
                        }));
                    }
                    continue;
                }
                ' ' | '\r' | '\t' => continue,
                c => {
                    self.done = true;
                    return Some(Err(SingleTokenError {
                        src: self.source(),
                        bad_bit: SourceSpan::from(start..self.byte),
                        token: c,
                        line: self.line,
                    }
                    .into()));
                }
            };

            match started {
                Start::String => {
                    let end = self.rest.find(['"', '\n']);
                    match end {
                        Some(end) if self.rest[end..].starts_with('"') => {
                            let literal = &self.rest[..end];
                            self.byte += end + 1;
                            self.rest = &self.rest[end + 1..];
                            return Some(Ok(self.token(TokenKind::String, literal, start + 1)));
                        }
                        _ => {
                            self.done = true;
                            let end = end.map_or(self.whole.len(), |end| self.byte + end);
                            return Some(Err(StringTerminationError {
                                src: self.source(),
                                bad_line: SourceSpan::from(start..end),
                                line: self.line,
                            }
                            .into()));
                        }
                    }
                }
                Start::Ident => {
                    let first_non_ident = cur
                        .find(|c: char| !c.is_ascii_alphanumeric())
                        .unwrap_or(cur.len());

                    let literal = &cur[..first_non_ident];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    let kind = TokenKind::keyword(&literal.to_ascii_uppercase())
                        .unwrap_or(TokenKind::Ident);

                    if kind == TokenKind::Rem {
                        // the remark runs to the end of the physical line
                        let end = self.rest.find('\n').unwrap_or(self.rest.len());
                        let remark = &self.rest[..end];
                        let trimmed = remark.trim();
                        let offset = self.byte + (remark.len() - remark.trim_start().len());
                        self.byte += end;
                        self.rest = &self.rest[end..];
                        return Some(Ok(self.token(TokenKind::Rem, trimmed, offset)));
                    }

                    return Some(Ok(self.token(kind, literal, start)));
                }
                Start::Number => {
                    let int_len = cur
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(cur.len());
                    let mut len = int_len;
                    let after = &cur[int_len..];
                    if after.starts_with('.') {
                        let frac_len = after[1..]
                            .find(|c: char| !c.is_ascii_digit())
                            .unwrap_or(after.len() - 1);
                        len += 1 + frac_len;
                    }

                    let literal = &cur[..len];
                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    // "1." and ".5" are both accepted by `f64::from_str`
                    let n = literal.parse().unwrap_or(f64::NAN);

                    return Some(Ok(self.token(TokenKind::Number(n), literal, start)));
                }
                Start::Less => {
                    let kind = if self.rest.starts_with('=') {
                        TokenKind::LessEqual
                    } else if self.rest.starts_with('>') {
                        TokenKind::NotEqual
                    } else {
                        return Some(Ok(self.token(TokenKind::Less, literal, start)));
                    };
                    self.rest = &self.rest[1..];
                    self.byte += 1;
                    return Some(Ok(self.token(kind, &cur[..2], start)));
                }
                Start::Greater => {
                    if self.rest.starts_with('=') {
                        self.rest = &self.rest[1..];
                        self.byte += 1;
                        return Some(Ok(self.token(TokenKind::GreaterEqual, &cur[..2], start)));
                    }
                    return Some(Ok(self.token(TokenKind::Greater, literal, start)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(None, input)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_relational_operators_are_greedy() {
        assert_eq!(
            kinds("<= >= <> < >"),
            vec![
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::NotEqual,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eol,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(
            kinds("let Goto pRiNt"),
            vec![
                TokenKind::Let,
                TokenKind::Goto,
                TokenKind::Print,
                TokenKind::Eol,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_sign_is_not_part_of_number() {
        assert_eq!(
            kinds("-1.5"),
            vec![
                TokenKind::Minus,
                TokenKind::Number(1.5),
                TokenKind::Eol,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_leading_dot_number() {
        assert_eq!(
            kinds(".25"),
            vec![TokenKind::Number(0.25), TokenKind::Eol, TokenKind::Eof]
        );
    }

    #[test]
    fn test_remark_swallows_line() {
        let tokens = tokenize(None, "10 REM a \"comment\": PRINT\n20 END").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Rem);
        assert_eq!(tokens[1].literal, "a \"comment\": PRINT");
        assert_eq!(tokens[2].kind, TokenKind::Eol);
        assert_eq!(tokens[3].line, 2);
    }

    #[test]
    fn test_unterminated_string_stops_at_newline() {
        let err = tokenize(None, "10 PRINT \"ABC\n20 PRINT \"X\"").unwrap_err();
        let err = err.downcast_ref::<StringTerminationError>().unwrap();
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize(None, "10 LET A = 1\n20 LET B = #").unwrap_err();
        let err = err.downcast_ref::<SingleTokenError>().unwrap();
        assert_eq!(err.token, '#');
        assert_eq!(err.line(), 2);
    }
}
