//! Tokenizer for the inline expression language.

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Text(String),
    /// Bare identifier, possibly dotted (`levels.Fighter`)
    Ident(String),
    /// Back-quoted attribute name (`` `features.Two Weapon` ``)
    QuotedIdent(String),
    Capture(u8),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
}

const OPERATORS: [&str; 13] = [
    "<=", ">=", "==", "!=", "&&", "||", "<", ">", "!", "+", "-", "*", "/",
];

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '\'' | '"' => {
                let (text, next) = read_quoted(&chars, i, c)?;
                tokens.push(Token::Text(text));
                i = next;
            }
            '`' => {
                let (name, next) = read_quoted(&chars, i, '`')?;
                if name.is_empty() {
                    return Err(CompileError::structural(format!(
                        "empty attribute name in '{}'",
                        input
                    )));
                }
                tokens.push(Token::QuotedIdent(name));
                i = next;
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                let digits: String = chars[start..end].iter().collect();
                let index = digits.parse::<u8>().map_err(|_| {
                    CompileError::structural(format!("invalid capture '${}' in '{}'", digits, input))
                })?;
                tokens.push(Token::Capture(index));
                i = end;
            }
            c if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i)) => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal.parse::<f64>().map_err(|_| {
                    CompileError::structural(format!("invalid number '{}' in '{}'", literal, input))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident));
            }
            _ => {
                let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| {
                        let hint = if c == '=' { " (use '==')" } else { "" };
                        CompileError::structural(format!(
                            "unexpected character '{}' in '{}'{}",
                            c, input, hint
                        ))
                    })?;
                tokens.push(Token::Op(op));
                i += op.chars().count();
            }
        }
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).map_or(false, |c| c.is_ascii_digit())
}

/// Reads a quoted run starting at `start`, returning its unescaped content
/// and the index just past the closing quote.
fn read_quoted(chars: &[char], start: usize, quote: char) -> Result<(String, usize), CompileError> {
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(CompileError::structural(format!(
        "unterminated {} in expression",
        if quote == '`' { "attribute quote" } else { "quote" }
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_comparison_with_dotted_name() {
        let tokens = tokenize("levels.Fighter >= 7 ? 3 : 2").expect("tokenizes");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("levels.Fighter".to_string()),
                Token::Op(">="),
                Token::Number(7.0),
                Token::Question,
                Token::Number(3.0),
                Token::Colon,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn tokenizes_quotes_and_captures() {
        let tokens = tokenize("$1 || 'it\\'s' + `a b`").expect("tokenizes");
        assert_eq!(
            tokens,
            vec![
                Token::Capture(1),
                Token::Op("||"),
                Token::Text("it's".to_string()),
                Token::Op("+"),
                Token::QuotedIdent("a b".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_single_equals_and_open_quote() {
        let err = tokenize("race = 'Elf'").expect_err("single '=' is not an operator");
        assert!(err.to_string().contains("use '=='"));

        let err = tokenize("'open").expect_err("unterminated");
        assert!(matches!(err, CompileError::StructuralParse(_)));
    }
}
