//! PGN movetext reader.
//!
//! Extracts tag pairs and the ply list from a single PGN game. Comments,
//! variations, move numbers, NAGs and the result token are skipped; the plies
//! come back as raw notation for the game tree to replay.

use thiserror::Error;

/// Errors in the structure of PGN text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PgnError {
    #[error("unterminated tag pair starting at byte {0}")]
    UnterminatedTag(usize),

    #[error("malformed tag pair starting at byte {0}")]
    MalformedTag(usize),

    #[error("unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),

    #[error("unbalanced variation at byte {0}")]
    UnbalancedVariation(usize),
}

/// One game read from PGN text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pgn {
    /// Tag pairs in the order they appear.
    pub tags: Vec<(String, String)>,
    /// Plies in playing order.
    pub moves: Vec<String>,
}

impl Pgn {
    /// Reads a single game.
    pub fn parse(text: &str) -> Result<Self, PgnError> {
        let mut pgn = Pgn::default();
        let mut depth = 0usize;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '[' if depth == 0 => {
                    let mut body = String::new();
                    let mut closed = false;
                    let mut quoted = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '"' => quoted = !quoted,
                            ']' if !quoted => {
                                closed = true;
                                break;
                            }
                            _ => {}
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(PgnError::UnterminatedTag(i));
                    }
                    pgn.tags.push(parse_tag(&body).ok_or(PgnError::MalformedTag(i))?);
                }
                '{' => {
                    if !chars.by_ref().any(|(_, c)| c == '}') {
                        return Err(PgnError::UnterminatedComment(i));
                    }
                }
                ';' => {
                    for (_, c) in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '(' => depth += 1,
                ')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(PgnError::UnbalancedVariation(i))?;
                }
                c if c.is_whitespace() => {}
                _ => {
                    let mut token = String::from(c);
                    while let Some(&(_, next)) = chars.peek() {
                        if next.is_whitespace() || matches!(next, '{' | '(' | ')' | ';' | '[') {
                            break;
                        }
                        token.push(next);
                        chars.next();
                    }
                    if depth == 0 {
                        if let Some(ply) = ply_text(&token) {
                            pgn.moves.push(ply.to_string());
                        }
                    }
                }
            }
        }

        if depth != 0 {
            return Err(PgnError::UnbalancedVariation(text.len()));
        }
        Ok(pgn)
    }

    /// Returns the value of the first tag called `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Splits `Name "value"` into its parts.
fn parse_tag(body: &str) -> Option<(String, String)> {
    let body = body.trim();
    let (name, rest) = body.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((name.to_string(), value.replace("\\\"", "\"")))
}

/// Strips a move-number prefix and drops tokens that are not plies.
fn ply_text(token: &str) -> Option<&str> {
    if matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*") || token.starts_with('$') {
        return None;
    }
    // Only the digits before the first dot are a move number; `4.0-0` keeps `0-0`.
    let ply = match token.split_once('.') {
        Some((number, rest)) if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
            rest.trim_start_matches('.')
        }
        _ => token,
    };
    if ply.is_empty() {
        None
    } else {
        Some(ply)
    }
}
