use bytes::BytesMut;

const CRLF: &[u8] = b"\r\n";
const OK: &[u8] = b"+OK\r\n";
const NULL_STRING: &[u8] = b"$-1\r\n";
const EMPTY_ARRAY: &[u8] = b"*0\r\n";
const NULL_ARRAY: &[u8] = b"*-1\r\n";

/// Build RESP2 replies into a `BytesMut`.
///
/// Methods without the `add_` prefix clear the buffer first and produce a complete
/// reply. The `add_` methods append, and are used to build arrays piece by piece.
#[derive(Default, Clone)]
pub struct RespBuilder {}

impl RespBuilder {
    fn add_prefixed_line(&self, buffer: &mut BytesMut, prefix: u8, line: &[u8]) {
        buffer.reserve(1 + line.len() + CRLF.len());
        buffer.extend_from_slice(&[prefix]);
        buffer.extend_from_slice(line);
        buffer.extend_from_slice(CRLF);
    }

    /// Clears the buffer and create an `OK` RESP response
    pub fn ok(&self, buffer: &mut BytesMut) {
        buffer.clear();
        buffer.extend_from_slice(OK);
    }

    /// Clears the buffer and create a status string message
    pub fn status_string(&self, buffer: &mut BytesMut, msg: &str) {
        buffer.clear();
        self.add_prefixed_line(buffer, b'+', msg.as_bytes());
    }

    /// Clears the buffer and create an error string RESP response
    pub fn error_string(&self, buffer: &mut BytesMut, msg: &str) {
        buffer.clear();
        self.add_prefixed_line(buffer, b'-', msg.as_bytes());
    }

    /// Clears the buffer and create a bulk string RESP response
    pub fn bulk_string(&self, buffer: &mut BytesMut, content: &[u8]) {
        buffer.clear();
        self.add_bulk_string(buffer, content);
    }

    /// Clears the buffer and create a null string RESP response
    pub fn null_string(&self, buffer: &mut BytesMut) {
        buffer.clear();
        buffer.extend_from_slice(NULL_STRING);
    }

    /// Clears the buffer and create a null array RESP response
    pub fn null_array(&self, buffer: &mut BytesMut) {
        buffer.clear();
        buffer.extend_from_slice(NULL_ARRAY);
    }

    /// Clears the buffer and create an empty array RESP response
    pub fn empty_array(&self, buffer: &mut BytesMut) {
        buffer.clear();
        buffer.extend_from_slice(EMPTY_ARRAY);
    }

    /// Clears the buffer and create a RESP number response
    pub fn number_usize(&self, buffer: &mut BytesMut, num: usize) {
        buffer.clear();
        self.add_number(buffer, num);
    }

    /// Clears the buffer and create a RESP number response
    pub fn number_i64(&self, buffer: &mut BytesMut, num: i64) {
        buffer.clear();
        self.add_number(buffer, num);
    }

    /// Append array len to the buffer
    pub fn add_array_len(&self, buffer: &mut BytesMut, len: usize) {
        self.add_prefixed_line(buffer, b'*', len.to_string().as_bytes());
    }

    /// Append bulk string to the buffer
    pub fn add_bulk_string(&self, buffer: &mut BytesMut, content: &[u8]) {
        let len = content.len().to_string();
        buffer.reserve(1 + len.len() + content.len() + 2 * CRLF.len());
        self.add_prefixed_line(buffer, b'$', len.as_bytes());
        buffer.extend_from_slice(content);
        buffer.extend_from_slice(CRLF);
    }

    /// Append an array of bulk strings
    pub fn add_strings(&self, buffer: &mut BytesMut, strings: &[&str]) {
        self.add_array_len(buffer, strings.len());
        for s in strings {
            self.add_bulk_string(buffer, s.as_bytes());
        }
    }

    /// Append a RESP integer
    pub fn add_number<NumberT: std::fmt::Display>(&self, buffer: &mut BytesMut, num: NumberT) {
        self.add_prefixed_line(buffer, b':', num.to_string().as_bytes());
    }

    /// Append null string to the buffer
    pub fn add_null_string(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(NULL_STRING);
    }

    /// Append an empty array
    pub fn add_empty_array(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(EMPTY_ARRAY);
    }

    /// Append an already encoded RESP fragment
    pub fn add_resp_string(&self, buffer: &mut BytesMut, resp: &[u8]) {
        buffer.extend_from_slice(resp);
    }
}
