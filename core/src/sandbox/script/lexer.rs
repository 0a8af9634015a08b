use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    Ident(String),
    If,
    Else,
    For,
    In,
    Break,
    Continue,
    Fail,
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    /// Statement separator: newline or `;`.
    Sep,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, ScriptError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                out.push(Token { tok: Tok::Sep, line });
                line += 1;
                i += 1;
            }
            ';' => {
                out.push(Token { tok: Tok::Sep, line });
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' | '\'' => {
                let (s, next, lines) = lex_string(&chars, i, line)?;
                out.push(Token {
                    tok: Tok::Str(s),
                    line,
                });
                line += lines;
                i = next;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                    i += 1;
                }
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                let n = text.parse::<f64>().map_err(|_| ScriptError::Syntax {
                    line,
                    message: format!("invalid number literal `{text}`"),
                })?;
                out.push(Token {
                    tok: Tok::Num(n),
                    line,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push(Token {
                    tok: keyword(&word).unwrap_or(Tok::Ident(word)),
                    line,
                });
            }
            _ => {
                let next = chars.get(i + 1).copied();
                let (tok, width) = match (c, next) {
                    ('=', Some('=')) => (Tok::EqEq, 2),
                    ('!', Some('=')) => (Tok::NotEq, 2),
                    ('<', Some('=')) => (Tok::Le, 2),
                    ('>', Some('=')) => (Tok::Ge, 2),
                    ('&', Some('&')) => (Tok::And, 2),
                    ('|', Some('|')) => (Tok::Or, 2),
                    ('=', _) => (Tok::Assign, 1),
                    ('<', _) => (Tok::Lt, 1),
                    ('>', _) => (Tok::Gt, 1),
                    ('!', _) => (Tok::Not, 1),
                    ('+', _) => (Tok::Plus, 1),
                    ('-', _) => (Tok::Minus, 1),
                    ('*', _) => (Tok::Star, 1),
                    ('/', _) => (Tok::Slash, 1),
                    ('%', _) => (Tok::Percent, 1),
                    ('(', _) => (Tok::LParen, 1),
                    (')', _) => (Tok::RParen, 1),
                    ('[', _) => (Tok::LBracket, 1),
                    (']', _) => (Tok::RBracket, 1),
                    ('{', _) => (Tok::LBrace, 1),
                    ('}', _) => (Tok::RBrace, 1),
                    (',', _) => (Tok::Comma, 1),
                    (':', _) => (Tok::Colon, 1),
                    ('.', _) => (Tok::Dot, 1),
                    _ => {
                        return Err(ScriptError::Syntax {
                            line,
                            message: format!("unexpected character `{c}`"),
                        })
                    }
                };
                out.push(Token { tok, line });
                i += width;
            }
        }
    }

    out.push(Token {
        tok: Tok::Eof,
        line,
    });
    Ok(out)
}

fn keyword(word: &str) -> Option<Tok> {
    Some(match word {
        "if" => Tok::If,
        "else" => Tok::Else,
        "for" => Tok::For,
        "in" => Tok::In,
        "break" => Tok::Break,
        "continue" => Tok::Continue,
        "fail" => Tok::Fail,
        "true" => Tok::True,
        "false" => Tok::False,
        "null" => Tok::Null,
        "and" => Tok::And,
        "or" => Tok::Or,
        "not" => Tok::Not,
        _ => return None,
    })
}

/// Returns the decoded string, the index after the closing quote, and the
/// number of newlines consumed.
fn lex_string(
    chars: &[char],
    start: usize,
    line: usize,
) -> Result<(String, usize, usize), ScriptError> {
    let quote = chars[start];
    let mut s = String::new();
    let mut i = start + 1;
    let mut lines = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return Ok((s, i + 1, lines));
        }
        if c == '\\' {
            let esc = chars.get(i + 1).copied().ok_or(ScriptError::Syntax {
                line,
                message: "unterminated escape".into(),
            })?;
            s.push(match esc {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                '\\' => '\\',
                '"' => '"',
                '\'' => '\'',
                other => {
                    return Err(ScriptError::Syntax {
                        line,
                        message: format!("unknown escape `\\{other}`"),
                    })
                }
            });
            i += 2;
            continue;
        }
        if c == '\n' {
            lines += 1;
        }
        s.push(c);
        i += 1;
    }

    Err(ScriptError::Syntax {
        line,
        message: "unterminated string literal".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn lexes_operators_and_keywords() {
        assert_eq!(
            toks("if a >= 1.5 and not b { x = \"hi\" }"),
            vec![
                Tok::If,
                Tok::Ident("a".into()),
                Tok::Ge,
                Tok::Num(1.5),
                Tok::And,
                Tok::Not,
                Tok::Ident("b".into()),
                Tok::LBrace,
                Tok::Ident("x".into()),
                Tok::Assign,
                Tok::Str("hi".into()),
                Tok::RBrace,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_separators() {
        assert_eq!(
            toks("a = 1 # note\nb = 2; c = 1_000"),
            vec![
                Tok::Ident("a".into()),
                Tok::Assign,
                Tok::Num(1.0),
                Tok::Sep,
                Tok::Ident("b".into()),
                Tok::Assign,
                Tok::Num(2.0),
                Tok::Sep,
                Tok::Ident("c".into()),
                Tok::Assign,
                Tok::Num(1000.0),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_line() {
        let err = tokenize("a = 1\nb = \"open").unwrap_err();
        match err {
            ScriptError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(tokenize("a = `rm -rf`").is_err());
    }
}
