//! Tokenizer built on logos.

use logos::Logos;

use crate::types::Span;

pub type SpannedToken = (Token, Span);

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[regex(r"0[xX][0-9a-fA-F]+", lex_hex_int, priority = 3)]
    #[regex(r"[0-9]+", lex_decimal_int, priority = 1)]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", lex_double, priority = 5)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_double, priority = 2)]
    Double(f64),

    #[regex(r#"""""#, |lex| lex_triple_quoted(lex, "\"\"\""))]
    #[regex(r"'''", |lex| lex_triple_quoted(lex, "'''"))]
    #[regex(r#"[rR]""#, |lex| lex_raw(lex, '"'))]
    #[regex(r"[rR]'", |lex| lex_raw(lex, '\''))]
    #[regex(r#"""#, |lex| lex_quoted(lex, '"'))]
    #[regex(r"'", |lex| lex_quoted(lex, '\''))]
    String(String),

    #[regex(r#"[bB]""#, |lex| lex_bytes(lex, '"'))]
    #[regex(r"[bB]'", |lex| lex_bytes(lex, '\''))]
    Bytes(Vec<u8>),

    /// `9223372036854775808`, only valid directly after a unary minus.
    #[token("9223372036854775808", priority = 4)]
    IntMinMagnitude,

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("in")]
    In,

    // Reserved for future language use; never valid identifiers.
    #[regex(
        "as|break|const|continue|else|for|function|if|import|let|loop|package|namespace|return|var|void|while",
        |lex| lex.slice().to_string()
    )]
    Reserved(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 0)]
    Ident(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("??")]
    QuestionQuestion,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Token::Int(n) => return write!(f, "{}", n),
            Token::Double(n) => return write!(f, "{}", n),
            Token::String(s) => return write!(f, "\"{}\"", s),
            Token::Bytes(b) => return write!(f, "b\"{}\"", String::from_utf8_lossy(b)),
            Token::Reserved(s) | Token::Ident(s) => return f.write_str(s),
            Token::IntMinMagnitude => "9223372036854775808",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::In => "in",
            Token::EqEq => "==",
            Token::Ne => "!=",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::QuestionQuestion => "??",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Not => "!",
            Token::Question => "?",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Dot => ".",
            Token::Comma => ",",
        };
        f.write_str(symbol)
    }
}

fn lex_decimal_int(lex: &mut logos::Lexer<Token>) -> Option<i64> {
    lex.slice().parse().ok()
}

fn lex_hex_int(lex: &mut logos::Lexer<Token>) -> Option<i64> {
    i64::from_str_radix(&lex.slice()[2..], 16).ok()
}

fn lex_double(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

/// Consumes a single-line quoted literal, decoding escapes.
fn lex_quoted(lex: &mut logos::Lexer<Token>, quote: char) -> Option<String> {
    let mut chars = lex.remainder().char_indices();
    let mut out = String::new();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c == quote => {
                lex.bump(offset + c.len_utf8());
                return Some(out);
            }
            '\\' => {
                let (_, escape) = chars.next()?;
                out.push(unescape(escape, &mut chars)?);
            }
            '\n' => return None,
            c => out.push(c),
        }
    }
    None
}

/// Consumes a quoted bytes literal. `\x` and octal escapes name single
/// octets; everything else is UTF-8 encoded.
fn lex_bytes(lex: &mut logos::Lexer<Token>, quote: char) -> Option<Vec<u8>> {
    let mut chars = lex.remainder().char_indices();
    let mut out = Vec::new();
    let mut utf8 = [0u8; 4];

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c == quote => {
                lex.bump(offset + c.len_utf8());
                return Some(out);
            }
            '\\' => {
                let (_, escape) = chars.next()?;
                match escape {
                    'x' => out.push(take_octet(&mut chars, 2, 16)?),
                    '0'..='3' => {
                        let low = take_octet(&mut chars, 2, 8)?;
                        out.push(escape.to_digit(8)? as u8 * 64 + low);
                    }
                    _ => {
                        let decoded = unescape(escape, &mut chars)?;
                        out.extend_from_slice(decoded.encode_utf8(&mut utf8).as_bytes());
                    }
                }
            }
            '\n' => return None,
            c => out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes()),
        }
    }
    None
}

fn take_octet(rest: &mut std::str::CharIndices<'_>, n: usize, radix: u32) -> Option<u8> {
    let digits: String = rest.by_ref().take(n).map(|(_, c)| c).collect();
    if digits.chars().count() != n || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u8::from_str_radix(&digits, radix).ok()
}

/// Decodes the escape introduced by `\` followed by `escape`.
fn unescape(escape: char, rest: &mut std::str::CharIndices<'_>) -> Option<char> {
    let mut take_digits = |n: usize, radix: u32| -> Option<u32> {
        let digits: String = rest.by_ref().take(n).map(|(_, c)| c).collect();
        if digits.chars().count() != n {
            return None;
        }
        u32::from_str_radix(&digits, radix).ok()
    };

    let decoded = match escape {
        '\\' | '/' | '"' | '\'' | '`' | '?' => escape,
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0C',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0B',
        'x' => char::from_u32(take_digits(2, 16)?)?,
        'u' => char::from_u32(take_digits(4, 16)?)?,
        'U' => char::from_u32(take_digits(8, 16)?)?,
        '0'..='3' => {
            let low = take_digits(2, 8)?;
            char::from_u32(escape.to_digit(8)? * 64 + low)?
        }
        _ => return None,
    };
    Some(decoded)
}

fn lex_raw(lex: &mut logos::Lexer<Token>, quote: char) -> Option<String> {
    let end = lex.remainder().find(quote)?;
    let content = lex.remainder()[..end].to_string();
    if content.contains('\n') {
        return None;
    }
    lex.bump(end + quote.len_utf8());
    Some(content)
}

fn lex_triple_quoted(lex: &mut logos::Lexer<Token>, end_quote: &str) -> Option<String> {
    let end = lex.remainder().find(end_quote)?;
    let content = lex.remainder()[..end].to_string();
    lex.bump(end + end_quote.len());
    Some(content)
}

/// Tokenizes the whole input, collecting every lexical error.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, Vec<LexError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(describe_error(input, span)),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn describe_error(input: &str, span: Span) -> LexError {
    let text = &input[span.clone()];
    let message = match text.chars().next() {
        Some('"') | Some('\'') => "unterminated or malformed string literal".to_string(),
        Some(c) if text.len() > 1 && (c == 'r' || c == 'R' || c == 'b' || c == 'B') => {
            "unterminated or malformed string literal".to_string()
        }
        Some(c) if c.is_ascii_digit() => format!("invalid numeric literal '{}'", text),
        _ => format!("unexpected character '{}'", text),
    };
    LexError { message, span }
}
