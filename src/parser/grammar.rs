//! The nginx log-line grammar:
//!
//! ```text
//! item   := IDENT (":" NUMBER | "=" (IDENT | NUMBER | STRING))
//! stream := item (WS item)*
//! ```

use crate::core::{LabelSet, Observation};

use super::lexer::{LexError, Lexer, Position, Token};

/// A parse failure, carrying the scanner position it occurred at.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("identifier expected at {0}, got {1:?}")]
    IdentExpected(Position, Token),
    #[error("number expected at {0}, got {1:?}")]
    NumberExpected(Position, Token),
    #[error("value expected at {0}, got {1:?}")]
    ValueExpected(Position, Token),
    #[error("separator (':' or '=') expected at {0}, got {1:?}")]
    SeparatorExpected(Position, Token),
    #[error("failed to unquote string at {0}: {1}")]
    UnquoteFailed(Position, LexError),
    #[error("invalid numeric literal {0:?} at {1}")]
    InvalidNumber(String, Position),
}

/// Parse one nginx log-line payload into its metrics and labels.
///
/// On the first grammar error the parser stops and returns the error;
/// callers are expected to drop the whole message (§4.1/§4.5), so no
/// partial result is returned.
pub fn parse_message(src: &str) -> Result<(Vec<Observation>, LabelSet), ParseError> {
    let mut lexer = Lexer::new(src);
    let mut metrics = Vec::new();
    let mut labels = LabelSet::new();

    loop {
        let pos = lexer.position();
        let tok = scan(&mut lexer, pos)?;
        let name = match tok {
            Token::Eof => return Ok((metrics, labels)),
            Token::Ident(name) => name,
            other => return Err(ParseError::IdentExpected(pos, other)),
        };

        let sep_pos = lexer.position();
        match scan(&mut lexer, sep_pos)? {
            Token::Colon => {
                let value_pos = lexer.position();
                match scan(&mut lexer, value_pos)? {
                    Token::Number(text) => {
                        let value = text
                            .parse::<f64>()
                            .map_err(|_| ParseError::InvalidNumber(text.clone(), value_pos))?;
                        metrics.push(Observation::new(name, value));
                    }
                    other => return Err(ParseError::NumberExpected(value_pos, other)),
                }
            }
            Token::Equals => {
                let value_pos = lexer.position();
                let value = match scan(&mut lexer, value_pos)? {
                    Token::Ident(text) => text,
                    Token::Number(text) => text,
                    Token::Str(text) => text,
                    other => return Err(ParseError::ValueExpected(value_pos, other)),
                };
                labels.set(name, value);
            }
            other => return Err(ParseError::SeparatorExpected(sep_pos, other)),
        }
    }
}

fn scan(lexer: &mut Lexer<'_>, pos: Position) -> Result<Token, ParseError> {
    lexer
        .scan()
        .map_err(|e| ParseError::UnquoteFailed(pos, e))
}
