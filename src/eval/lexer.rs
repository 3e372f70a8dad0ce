// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Tokenise a single console input line.
// Author: Lukas Bower

use crate::error::EvalError;

use super::ast::BinOp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tok {
    Int(i128),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Assign,
    AugAssign(BinOp),
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) tok: Tok,
    /// One-based column of the first character.
    pub(crate) column: usize,
}

pub(crate) fn tokenize(line: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let column = pos + 1;
        if ch.is_whitespace() {
            pos += 1;
            continue;
        }
        if ch == '#' {
            break;
        }
        if ch.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Token {
                tok: Tok::Int(parse_int(&word, column)?),
                column,
            });
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token {
                tok: Tok::Ident(chars[start..pos].iter().collect()),
                column,
            });
            continue;
        }
        if ch == '\'' || ch == '"' {
            let (text, next) = lex_string(&chars, pos)?;
            tokens.push(Token {
                tok: Tok::Str(text),
                column,
            });
            pos = next;
            continue;
        }

        let rest = &chars[pos..];
        let (tok, width) = match rest {
            ['<', '<', '=', ..] => (Tok::AugAssign(BinOp::Shl), 3),
            ['>', '>', '=', ..] => (Tok::AugAssign(BinOp::Shr), 3),
            ['/', '/', '=', ..] => (Tok::AugAssign(BinOp::FloorDiv), 3),
            ['<', '<', ..] => (Tok::Shl, 2),
            ['>', '>', ..] => (Tok::Shr, 2),
            ['/', '/', ..] => (Tok::SlashSlash, 2),
            ['=', '=', ..] => (Tok::EqEq, 2),
            ['!', '=', ..] => (Tok::NotEq, 2),
            ['<', '=', ..] => (Tok::Le, 2),
            ['>', '=', ..] => (Tok::Ge, 2),
            ['+', '=', ..] => (Tok::AugAssign(BinOp::Add), 2),
            ['-', '=', ..] => (Tok::AugAssign(BinOp::Sub), 2),
            ['*', '=', ..] => (Tok::AugAssign(BinOp::Mul), 2),
            ['/', '=', ..] => (Tok::AugAssign(BinOp::Div), 2),
            ['%', '=', ..] => (Tok::AugAssign(BinOp::Mod), 2),
            ['&', '=', ..] => (Tok::AugAssign(BinOp::And), 2),
            ['|', '=', ..] => (Tok::AugAssign(BinOp::Or), 2),
            ['^', '=', ..] => (Tok::AugAssign(BinOp::Xor), 2),
            ['(', ..] => (Tok::LParen, 1),
            [')', ..] => (Tok::RParen, 1),
            ['[', ..] => (Tok::LBracket, 1),
            [']', ..] => (Tok::RBracket, 1),
            [',', ..] => (Tok::Comma, 1),
            ['.', ..] => (Tok::Dot, 1),
            ['=', ..] => (Tok::Assign, 1),
            ['+', ..] => (Tok::Plus, 1),
            ['-', ..] => (Tok::Minus, 1),
            ['*', ..] => (Tok::Star, 1),
            ['/', ..] => (Tok::Slash, 1),
            ['%', ..] => (Tok::Percent, 1),
            ['&', ..] => (Tok::Amp, 1),
            ['|', ..] => (Tok::Pipe, 1),
            ['^', ..] => (Tok::Caret, 1),
            ['~', ..] => (Tok::Tilde, 1),
            ['<', ..] => (Tok::Lt, 1),
            ['>', ..] => (Tok::Gt, 1),
            _ => {
                return Err(EvalError::syntax(
                    column,
                    format!("unexpected character '{ch}'"),
                ))
            }
        };
        tokens.push(Token { tok, column });
        pos += width;
    }

    Ok(tokens)
}

fn parse_int(word: &str, column: usize) -> Result<i128, EvalError> {
    if word.ends_with('_') || word.contains("__") {
        return Err(EvalError::syntax(column, format!("invalid integer literal '{word}'")));
    }
    let digits: String = word.chars().filter(|c| *c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(body) = lower.strip_prefix("0x") {
        (16, body)
    } else if let Some(body) = lower.strip_prefix("0o") {
        (8, body)
    } else if let Some(body) = lower.strip_prefix("0b") {
        (2, body)
    } else {
        (10, lower.as_str())
    };
    if body.is_empty() {
        return Err(EvalError::syntax(column, format!("invalid integer literal '{word}'")));
    }
    let magnitude = u128::from_str_radix(body, radix)
        .map_err(|_| EvalError::syntax(column, format!("invalid integer literal '{word}'")))?;
    i128::try_from(magnitude)
        .map_err(|_| EvalError::syntax(column, format!("integer literal '{word}' is too large")))
}

fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), EvalError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        let ch = chars[pos];
        if ch == quote {
            return Ok((text, pos + 1));
        }
        if ch != '\\' {
            text.push(ch);
            pos += 1;
            continue;
        }
        let Some(&escape) = chars.get(pos + 1) else {
            break;
        };
        match escape {
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '0' => text.push('\0'),
            '\\' | '\'' | '"' => text.push(escape),
            'x' => {
                let hex: String = chars.iter().skip(pos + 2).take(2).collect();
                let code = u8::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 2)
                    .ok_or_else(|| EvalError::syntax(pos + 1, "invalid \\x escape"))?;
                text.push(char::from(code));
                pos += 2;
            }
            other => {
                text.push('\\');
                text.push(other);
            }
        }
        pos += 2;
    }
    Err(EvalError::syntax(start + 1, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<Tok> {
        tokenize(line)
            .unwrap()
            .into_iter()
            .map(|token| token.tok)
            .collect()
    }

    #[test]
    fn integer_literals_in_all_radixes() {
        assert_eq!(
            kinds("0x1F 0o17 0b101 1_000"),
            vec![Tok::Int(31), Tok::Int(15), Tok::Int(5), Tok::Int(1000)]
        );
    }

    #[test]
    fn operators_prefer_longest_match() {
        assert_eq!(
            kinds("a <<= 2 >> 1 // 3"),
            vec![
                Tok::Ident("a".into()),
                Tok::AugAssign(BinOp::Shl),
                Tok::Int(2),
                Tok::Shr,
                Tok::Int(1),
                Tok::SlashSlash,
                Tok::Int(3),
            ]
        );
    }

    #[test]
    fn comments_end_the_line() {
        assert_eq!(kinds("nop() # poke"), kinds("nop()"));
        assert!(kinds("# only a comment").is_empty());
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"'a\x41\n' "it's""#),
            vec![Tok::Str("aA\n".into()), Tok::Str("it's".into())]
        );
    }

    #[test]
    fn lexer_errors_carry_columns() {
        assert_eq!(
            tokenize("1 + $").unwrap_err(),
            EvalError::syntax(5, "unexpected character '$'")
        );
        assert!(tokenize("'open").is_err());
        assert!(tokenize("0x").is_err());
        assert!(tokenize("0xfffffffffffffffffffffffffffffffff").is_err());
    }
}
