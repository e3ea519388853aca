//! Request Line Parser
//!
//! Turns one decoded request line (terminator already stripped) into a
//! [`Request`]. Tokens are separated by single spaces, exactly as the
//! clients emit them.
//!
//! Arity is checked strictly. A secret containing a space would show up
//! here as an extra token, and silently treating the surplus token as a
//! timeout would cache a truncated secret, so `SET` with more than four
//! tokens is rejected outright, as is a ttl token that is not an integer.
//! A negative ttl parses fine; the store rejects it as an invalid entry,
//! which keeps "bad value" and "bad syntax" distinguishable on the wire.

use crate::protocol::types::Request;
use thiserror::Error;

/// Errors from decoding a request line. All of them surface on the wire as
/// `InvalidCommand`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line was empty
    #[error("empty request line")]
    EmptyLine,

    /// First token is not a known verb
    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    /// Known verb with the wrong number of arguments
    #[error("wrong argument count for {verb}: got {got}")]
    WrongArity { verb: &'static str, got: usize },

    /// The ttl token is not an integer
    #[error("invalid ttl: {0:?}")]
    InvalidTtl(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a single request line.
///
/// # Returns
///
/// The decoded [`Request`], or a [`ParseError`] describing why the line is
/// not a valid command.
///
/// # Example
///
/// ```
/// use credcache::protocol::{parse_request, Request};
///
/// let request = parse_request("GET alice@git").unwrap();
/// assert_eq!(request, Request::Get { service: "alice@git".to_string() });
/// ```
pub fn parse_request(line: &str) -> ParseResult<Request> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let tokens: Vec<&str> = line.split(' ').collect();

    match tokens.as_slice() {
        ["GET", service] => Ok(Request::Get {
            service: service.to_string(),
        }),
        ["SET", service, secret] => Ok(Request::Set {
            service: service.to_string(),
            secret: secret.to_string(),
            ttl_secs: None,
        }),
        ["SET", service, secret, ttl] => {
            let ttl_secs = ttl
                .parse::<i64>()
                .map_err(|_| ParseError::InvalidTtl(ttl.to_string()))?;
            Ok(Request::Set {
                service: service.to_string(),
                secret: secret.to_string(),
                ttl_secs: Some(ttl_secs),
            })
        }
        ["GET", ..] => Err(ParseError::WrongArity {
            verb: "GET",
            got: tokens.len() - 1,
        }),
        ["SET", ..] => Err(ParseError::WrongArity {
            verb: "SET",
            got: tokens.len() - 1,
        }),
        [verb, ..] => Err(ParseError::UnknownVerb(verb.to_string())),
        [] => Err(ParseError::EmptyLine),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        assert_eq!(
            parse_request("GET mercurial").unwrap(),
            Request::Get {
                service: "mercurial".to_string()
            }
        );
    }

    #[test]
    fn test_parse_set_without_ttl() {
        assert_eq!(
            parse_request("SET mercurial fooobar").unwrap(),
            Request::Set {
                service: "mercurial".to_string(),
                secret: "fooobar".to_string(),
                ttl_secs: None,
            }
        );
    }

    #[test]
    fn test_parse_set_with_ttl() {
        assert_eq!(
            parse_request("SET mercurial stuff 1").unwrap(),
            Request::Set {
                service: "mercurial".to_string(),
                secret: "stuff".to_string(),
                ttl_secs: Some(1),
            }
        );
    }

    #[test]
    fn test_parse_set_negative_ttl_is_syntactically_valid() {
        // value-level rejection belongs to the store
        assert_eq!(
            parse_request("SET svc secret -3").unwrap(),
            Request::Set {
                service: "svc".to_string(),
                secret: "secret".to_string(),
                ttl_secs: Some(-3),
            }
        );
    }

    #[test]
    fn test_parse_trims_terminator_whitespace() {
        assert_eq!(
            parse_request("GET svc \r\n").unwrap(),
            Request::Get {
                service: "svc".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(
            parse_request("PING x"),
            Err(ParseError::UnknownVerb("PING".to_string()))
        );
        // verbs are case-sensitive
        assert_eq!(
            parse_request("get svc"),
            Err(ParseError::UnknownVerb("get".to_string()))
        );
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_request(""), Err(ParseError::EmptyLine));
        assert_eq!(parse_request("   "), Err(ParseError::EmptyLine));
    }

    #[test]
    fn test_wrong_arity() {
        assert_eq!(
            parse_request("GET"),
            Err(ParseError::WrongArity { verb: "GET", got: 0 })
        );
        assert_eq!(
            parse_request("GET a b"),
            Err(ParseError::WrongArity { verb: "GET", got: 2 })
        );
        assert_eq!(
            parse_request("SET svc"),
            Err(ParseError::WrongArity { verb: "SET", got: 1 })
        );
        // a secret containing a space is indistinguishable from surplus
        // tokens and must not be silently reinterpreted
        assert_eq!(
            parse_request("SET svc two words 5"),
            Err(ParseError::WrongArity { verb: "SET", got: 4 })
        );
    }

    #[test]
    fn test_non_numeric_ttl() {
        assert_eq!(
            parse_request("SET svc secret soon"),
            Err(ParseError::InvalidTtl("soon".to_string()))
        );
    }
}
