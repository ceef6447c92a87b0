use std::fmt;

use crate::error::{ExprError, ExprResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    /// `**`
    Power,
    /// `^`, bitwise xor in the expression language.
    Caret,
    /// `~`
    Tilde,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Ident(name) => write!(f, "{name}"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Power => write!(f, "**"),
            Self::Caret => write!(f, "^"),
            Self::Tilde => write!(f, "~"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
        }
    }
}

/// A token and the character offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub fn tokenize(input: &str) -> ExprResult<Vec<Spanned>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let token = if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i)) {
            i = scan_number(&chars, i);
            number_token(&chars[start..i])?
        } else if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            Token::Ident(chars[start..i].iter().collect())
        } else {
            i += 1;
            match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' if chars.get(i) == Some(&'*') => {
                    i += 1;
                    Token::Power
                }
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '~' => Token::Tilde,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                other => {
                    return Err(ExprError::InvalidCharacter {
                        ch: other,
                        position: start,
                    })
                }
            }
        };
        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).is_some_and(char::is_ascii_digit)
}

/// Digits, an optional fraction and an optional exponent.
fn scan_number(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+' | '-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(char::is_ascii_digit) {
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

fn number_token(chars: &[char]) -> ExprResult<Token> {
    let text: String = chars.iter().collect();
    let is_float = text.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
    if !is_float {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Token::Int(i));
        }
    }
    text.parse::<f64>()
        .map(Token::Float)
        .map_err(|_| ExprError::InvalidNumber(text))
}
