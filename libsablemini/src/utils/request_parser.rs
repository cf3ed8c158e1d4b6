use crate::{ParserError, RedisCommand, SableError, StringUtils};
use bytes::BytesMut;
use std::rc::Rc;

/// Largest bulk string (and largest request) accepted from a client
const MAX_REQUEST_SIZE: usize = 512 << 20;
/// A length token longer than this can not be a valid `usize`
const MAX_LEN_DIGITS: usize = 20;

#[derive(Default)]
pub struct RequestParser {}

#[derive(Default, Debug)]
pub struct ParseResult {
    pub command: Rc<RedisCommand>,
    pub bytes_consumed: usize,
}

macro_rules! need_more_data {
    () => {
        return Err(SableError::Parser(ParserError::NeedMoreData))
    };
}

impl RequestParser {
    /// Parse the first complete request found in `buffer`.
    ///
    /// A request is either an inline command terminated by `\r\n` or a RESP array of
    /// bulk strings. Empty requests (a blank inline line or `*0\r\n`) are consumed and
    /// skipped. If `buffer` does not hold a complete request yet,
    /// `ParserError::NeedMoreData` is returned and nothing is consumed.
    pub fn parse(&self, buffer: &[u8]) -> Result<ParseResult, SableError> {
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(SableError::Parser(ParserError::BufferTooBig));
        }

        let mut offset = 0usize;
        loop {
            let remainder = &buffer[offset..];
            if remainder.is_empty() {
                need_more_data!();
            }

            let (args, consumed) = if remainder[0] == b'*' {
                Self::parse_array_of_bulk_strings(remainder)?
            } else {
                Self::parse_inline_string(remainder)?
            };

            let Some(next_offset) = offset.checked_add(consumed) else {
                return Err(SableError::Parser(ParserError::Overflow));
            };
            offset = next_offset;

            if args.is_empty() {
                continue;
            }

            return Ok(ParseResult {
                command: Rc::new(RedisCommand::new(args)?),
                bytes_consumed: offset,
            });
        }
    }

    /// Read a decimal length terminated by `\r\n`. Return the length and the number of
    /// bytes used by the token including the terminator
    fn read_len(buffer: &[u8]) -> Result<(usize, usize), SableError> {
        let Some(pos) = StringUtils::find_subsequence(buffer, b"\r\n") else {
            if buffer.len() > MAX_LEN_DIGITS {
                return Err(SableError::Parser(ParserError::BufferTooBig));
            }
            need_more_data!();
        };

        if pos > MAX_LEN_DIGITS {
            return Err(SableError::Parser(ParserError::BufferTooBig));
        }

        let len_as_str = String::from_utf8_lossy(&buffer[..pos]);
        let Ok(length) = len_as_str.parse::<usize>() else {
            return Err(SableError::Parser(ParserError::ProtocolError(format!(
                "invalid length `{}`",
                len_as_str
            ))));
        };

        if length > MAX_REQUEST_SIZE {
            return Err(SableError::Parser(ParserError::BufferTooBig));
        }
        Ok((length, pos + 2))
    }

    fn parse_inline_string(buffer: &[u8]) -> Result<(Vec<BytesMut>, usize), SableError> {
        let Some(pos) = StringUtils::find_subsequence(buffer, b"\r\n") else {
            need_more_data!();
        };
        let args = StringUtils::split(&buffer[..pos])?;
        Ok((args, pos + 2))
    }

    fn parse_array_of_bulk_strings(
        buffer: &[u8],
    ) -> Result<(Vec<BytesMut>, usize), SableError> {
        // skip the `*`
        let (items, len_bytes) = Self::read_len(&buffer[1..])?;
        let mut curpos = 1 + len_bytes;
        let mut args = Vec::<BytesMut>::with_capacity(items.min(1024));

        for _ in 0..items {
            let Some(marker) = buffer.get(curpos) else {
                need_more_data!();
            };

            if *marker != b'$' {
                return Err(SableError::Parser(ParserError::ProtocolError(format!(
                    "bulk string must start with '$'. Found {}",
                    *marker as char
                ))));
            }
            curpos += 1;

            let (str_len, len_bytes) = Self::read_len(&buffer[curpos..])?;
            curpos += len_bytes;

            // the string and its trailing `\r\n` must be fully available
            let Some(end) = curpos.checked_add(str_len) else {
                return Err(SableError::Parser(ParserError::Overflow));
            };
            if end + 2 > buffer.len() {
                need_more_data!();
            }

            if &buffer[end..end + 2] != b"\r\n" {
                return Err(SableError::Parser(ParserError::ProtocolError(
                    "bulk string is not terminated with CRLF".to_string(),
                )));
            }

            args.push(BytesMut::from(&buffer[curpos..end]));
            curpos = end + 2;
        }
        Ok((args, curpos))
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
    use crate::ParserError;
    use bytes::BytesMut;

    fn assert_need_more_data(result: Result<ParseResult, SableError>) {
        assert!(result
            .unwrap_err()
            .eq_parser_error(&ParserError::NeedMoreData));
    }

    #[test]
    fn test_inline_string_arrives_in_pieces() {
        let parser = RequestParser::default();
        let mut buffer = BytesMut::from("zcard");
        assert_need_more_data(parser.parse(&buffer));

        buffer.extend_from_slice(b" myset\r");
        assert_need_more_data(parser.parse(&buffer));

        buffer.extend_from_slice(b"\nping");
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, 13); // "zcard myset\r\n"
        assert_eq!(result.command.arg_count(), 2);
        assert_eq!(result.command.arg(1).unwrap(), "myset");

        let _ = buffer.split_to(result.bytes_consumed);
        assert_need_more_data(parser.parse(&buffer));

        buffer.extend_from_slice(b"\r\n");
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, 6);
        assert_eq!(result.command.arg(0).unwrap(), "ping");
    }

    #[test]
    fn test_two_inline_messages_in_one_buffer() {
        let parser = RequestParser::default();
        let mut buffer = BytesMut::from("ZADD z 1 a\r\nZCARD z\r\n");
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, 12);
        assert_eq!(result.command.arg_count(), 4);
        assert_eq!(result.command.main_command(), "zadd");

        let _ = buffer.split_to(result.bytes_consumed);
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, 9);
        assert_eq!(result.command.main_command(), "zcard");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let parser = RequestParser::default();
        let buffer = BytesMut::from("\r\n   \r\n*0\r\nPING\r\n");
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, buffer.len());
        assert_eq!(result.command.main_command(), "ping");
    }

    #[test]
    fn test_empty_buffer() {
        let parser = RequestParser::default();
        assert_need_more_data(parser.parse(&BytesMut::new()));
    }

    #[test]
    fn test_inline_message_with_quotes() {
        let parser = RequestParser::default();
        let buffer = BytesMut::from("ZADD z 1 \"member with space\"\r\n");
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, buffer.len());
        assert_eq!(result.command.arg_count(), 4);
        assert_eq!(result.command.arg(3).unwrap(), "member with space");
    }

    #[test]
    fn test_array_of_bulk_strings() {
        let parser = RequestParser::default();
        let buffer = BytesMut::from("*3\r\n$5\r\nZCARD\r\n$0\r\n\r\n$3\r\nx y\r\n");
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, buffer.len());
        assert_eq!(result.command.arg_count(), 3);
        assert_eq!(result.command.arg(1).unwrap(), "");
        assert_eq!(result.command.arg(2).unwrap(), "x y");
    }

    #[test]
    fn test_array_arrives_in_chunks() {
        let parser = RequestParser::default();
        let mut buffer = BytesMut::from("*4\r\n$4\r\nZADD\r\n$1\r\nz\r\n$1");
        assert_need_more_data(parser.parse(&buffer));

        buffer.extend_from_slice(b"\r\n1\r\n$1\r");
        assert_need_more_data(parser.parse(&buffer));

        buffer.extend_from_slice(b"\na\r\nPING\r\n");
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.bytes_consumed, 35);
        assert_eq!(result.command.arg_count(), 4);
        assert_eq!(result.command.arg(3).unwrap(), "a");

        let _ = buffer.split_to(result.bytes_consumed);
        let result = parser.parse(&buffer).unwrap();
        assert_eq!(result.command.main_command(), "ping");
    }

    #[test]
    fn test_protocol_errors() {
        let parser = RequestParser::default();
        let buffer = BytesMut::from("*1\r\n:5\r\n");
        assert!(parser.parse(&buffer).is_err());

        let buffer = BytesMut::from("*x\r\n");
        assert!(parser.parse(&buffer).is_err());

        let buffer = BytesMut::from("*1\r\n$2\r\nabcd\r\n");
        assert!(parser.parse(&buffer).is_err());

        let buffer = BytesMut::from("*1\r\n$123456789012345678901234567890");
        assert!(parser
            .parse(&buffer)
            .unwrap_err()
            .eq_parser_error(&ParserError::BufferTooBig));
    }
}
