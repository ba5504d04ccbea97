//! Byte layout of the shared debug buffer.
//!
//! ```text
//! offset 0..4     producer PID, 32-bit little-endian
//! offset 4..4096  message bytes, NUL-terminated when shorter than the field
//! ```

/// Size of the shared section in bytes.
pub const BUFFER_SIZE: usize = 4096;
/// Size of the leading PID field.
pub const PID_SIZE: usize = 4;
/// Bytes available for message text.
pub const MESSAGE_SIZE: usize = BUFFER_SIZE - PID_SIZE;

/// A non-empty message pulled out of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub pid: i32,
    pub text: String,
}

/// Decodes a signalled buffer.
///
/// Anything beyond [`BUFFER_SIZE`] is ignored, a missing terminator ends the
/// text at the buffer end and invalid UTF-8 is replaced. Returns `None` when
/// the buffer is too short for a PID or the text is empty once trailing
/// CR/LF are trimmed.
pub fn decode_buffer(buf: &[u8]) -> Option<DecodedMessage> {
    let buf = &buf[..buf.len().min(BUFFER_SIZE)];
    if buf.len() < PID_SIZE {
        return None;
    }

    let mut pid_bytes = [0u8; PID_SIZE];
    pid_bytes.copy_from_slice(&buf[..PID_SIZE]);
    let pid = i32::from_le_bytes(pid_bytes);

    let body = &buf[PID_SIZE..];
    let len = body.iter().position(|&b| b == 0).unwrap_or(body.len());
    let text = String::from_utf8_lossy(&body[..len]);
    let text = text.trim_end_matches(['\r', '\n']);

    if text.is_empty() {
        return None;
    }

    Some(DecodedMessage {
        pid,
        text: text.to_string(),
    })
}

/// Builds a buffer the way a producer writes it.
///
/// The text is cut on a character boundary so that a terminator always fits.
pub fn encode_buffer(pid: i32, message: &str) -> Vec<u8> {
    let mut end = message.len().min(MESSAGE_SIZE - 1);
    while !message.is_char_boundary(end) {
        end -= 1;
    }

    let mut buf = vec![0u8; BUFFER_SIZE];
    buf[..PID_SIZE].copy_from_slice(&pid.to_le_bytes());
    buf[PID_SIZE..PID_SIZE + end].copy_from_slice(&message.as_bytes()[..end]);
    buf
}
