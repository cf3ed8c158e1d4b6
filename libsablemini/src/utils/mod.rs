pub mod request_parser;
pub mod resp_builder;

pub use crate::server::{ParserError, SableError};
pub use request_parser::*;
pub use resp_builder::RespBuilder;

use bytes::BytesMut;
use std::str::FromStr;

pub struct StringUtils {}
pub struct BytesMutUtils {}
pub struct TimeUtils {}

/// Tokenizer state used while splitting an inline request
#[derive(Copy, Clone, PartialEq, Eq)]
enum Quoting {
    None,
    Double,
    Single,
}

impl StringUtils {
    /// Find `what` in `buffer`
    pub fn find_subsequence(buffer: &[u8], what: &[u8]) -> Option<usize> {
        buffer.windows(what.len()).position(|window| window == what)
    }

    /// Split an inline command line into words. Words are separated by spaces or tabs,
    /// quoted words may contain whitespace, and a backslash escapes the next character
    /// (`\n`, `\r` and `\t` are translated)
    pub fn split(buffer: &[u8]) -> Result<Vec<BytesMut>, ParserError> {
        let mut words = Vec::<BytesMut>::new();
        let mut word = BytesMut::new();
        let mut quoting = Quoting::None;
        let mut escaped = false;

        let flush = |word: &mut BytesMut, words: &mut Vec<BytesMut>| {
            if !word.is_empty() {
                words.push(word.split());
            }
        };

        for ch in buffer.iter().copied() {
            if escaped {
                let translated = match ch {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    other => other,
                };
                word.extend_from_slice(&[translated]);
                escaped = false;
                continue;
            }

            match (quoting, ch) {
                (_, b'\\') => escaped = true,
                (Quoting::None, b' ' | b'\t') => flush(&mut word, &mut words),
                (Quoting::None, b'"') => {
                    flush(&mut word, &mut words);
                    quoting = Quoting::Double;
                }
                (Quoting::None, b'\'') => {
                    flush(&mut word, &mut words);
                    quoting = Quoting::Single;
                }
                (Quoting::Double, b'"') | (Quoting::Single, b'\'') => {
                    flush(&mut word, &mut words);
                    quoting = Quoting::None;
                }
                (_, other) => word.extend_from_slice(&[other]),
            }
        }

        if escaped {
            return Err(ParserError::InvalidInput(
                "trailing escape character".to_string(),
            ));
        }

        match quoting {
            Quoting::Double => Err(ParserError::InvalidInput(
                "unclosed double quotes".to_string(),
            )),
            Quoting::Single => Err(ParserError::InvalidInput(
                "unclosed single quotes".to_string(),
            )),
            Quoting::None => {
                flush(&mut word, &mut words);
                Ok(words)
            }
        }
    }
}

impl TimeUtils {
    /// Return seconds elapsed since EPOCH
    pub fn epoch_seconds() -> Result<u64, SableError> {
        let Ok(elapsed) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)
        else {
            return Err(SableError::OtherError(
                "failed to retrieve std::time::UNIX_EPOCH".to_string(),
            ));
        };
        Ok(elapsed.as_secs())
    }
}

impl BytesMutUtils {
    /// Convert `value` into `F`
    pub fn parse<F: FromStr>(value: &[u8]) -> Option<F> {
        let as_str = std::str::from_utf8(value).ok()?;
        F::from_str(as_str).ok()
    }

    pub fn to_string(value: &[u8]) -> String {
        String::from_utf8_lossy(value).to_string()
    }

    /// Parse a sorted set score. `inf`, `+inf` and `-inf` (any case) are accepted,
    /// `nan` is not
    pub fn parse_score(value: &[u8]) -> Option<f64> {
        let score = Self::parse::<f64>(value)?;
        if score.is_nan() {
            None
        } else {
            Some(score)
        }
    }

    /// Format a score the way it is sent to clients: `inf`, `-inf` or the shortest
    /// decimal representation that parses back to the same value
    pub fn from_score(score: f64) -> BytesMut {
        let as_str = if score == f64::INFINITY {
            "inf".to_string()
        } else if score == f64::NEG_INFINITY {
            "-inf".to_string()
        } else {
            format!("{}", score)
        };
        BytesMut::from(as_str.as_str())
    }
}

//  _    _ _   _ _____ _______      _______ ______  _____ _______ _____ _   _  _____
// | |  | | \ | |_   _|__   __|    |__   __|  ____|/ ____|__   __|_   _| \ | |/ ____|
// | |  | |  \| | | |    | |    _     | |  | |__  | (___    | |    | | |  \| | |  __|
// | |  | | . ` | | |    | |   / \    | |  |  __|  \___ \   | |    | | | . ` | | |_ |
// | |__| | |\  |_| |_   | |   \_/    | |  | |____ ____) |  | |   _| |_| |\  | |__| |
//  \____/|_| \_|_____|  |_|          |_|  |______|_____/   |_|  |_____|_| \_|\_____|
//
#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("zadd z 1 a", vec!["zadd", "z", "1", "a"]; "plain words")]
    #[test_case("  zadd\tz  1 a  ", vec!["zadd", "z", "1", "a"]; "extra whitespace")]
    #[test_case("set k \"hello world\"", vec!["set", "k", "hello world"]; "double quotes")]
    #[test_case("set k 'hello world'", vec!["set", "k", "hello world"]; "single quotes")]
    #[test_case("set k \"a\\\"b\"", vec!["set", "k", "a\"b"]; "escaped quote")]
    #[test_case("echo a\\nb", vec!["echo", "a\nb"]; "escaped newline")]
    fn test_split(input: &str, expected: Vec<&str>) {
        let words = StringUtils::split(input.as_bytes()).unwrap();
        let words: Vec<String> = words.iter().map(|w| BytesMutUtils::to_string(w)).collect();
        assert_eq!(words, expected);
    }

    #[test_case("set k \"open"; "unclosed double")]
    #[test_case("set k 'open"; "unclosed single")]
    #[test_case("set k v\\"; "trailing escape")]
    fn test_split_errors(input: &str) {
        assert!(StringUtils::split(input.as_bytes()).is_err());
    }

    #[test_case("1", Some(1.0); "integer")]
    #[test_case("-2.5", Some(-2.5); "negative")]
    #[test_case("+inf", Some(f64::INFINITY); "plus inf")]
    #[test_case("-INF", Some(f64::NEG_INFINITY); "minus inf upper")]
    #[test_case("1e3", Some(1000.0); "exponent")]
    #[test_case("nan", None; "nan rejected")]
    #[test_case("abc", None; "garbage")]
    #[test_case("", None; "empty")]
    fn test_parse_score(input: &str, expected: Option<f64>) {
        assert_eq!(BytesMutUtils::parse_score(input.as_bytes()), expected);
    }

    #[test_case(1.0, "1"; "whole number")]
    #[test_case(1.5, "1.5"; "fraction")]
    #[test_case(0.1, "0.1"; "shortest repr")]
    #[test_case(-3.0, "-3"; "negative")]
    #[test_case(f64::INFINITY, "inf"; "inf")]
    #[test_case(f64::NEG_INFINITY, "-inf"; "neg inf")]
    fn test_format_score(score: f64, expected: &str) {
        assert_eq!(BytesMutUtils::from_score(score), expected);
    }
}
