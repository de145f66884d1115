//! PostgreSQL wire-protocol v3 message framing.
pub mod auth;
pub mod backend;
pub mod frontend;

use std::ops::ControlFlow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Failures in message framing or field decoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    #[error("unsupported backend message type {0:#04x}")]
    UnsupportedMessage(u8),
    #[error("{0}")]
    Malformed(String),
    #[error("unexpected message in {context}: {message}")]
    Unexpected { context: &'static str, message: String },
}

/// A type that can be encoded as a PostgreSQL frontend message.
pub trait FrontendProtocol {
    /// The message type tag. `None` for the startup message, which has none.
    const MSGTYPE: Option<u8>;

    fn encode(&self, buf: &mut BytesMut);
}

/// A type that can be decoded from a complete PostgreSQL backend message body.
pub trait BackendProtocol: Sized {
    /// Attempt to decode the next complete message out of `buf`.
    ///
    /// Returns `Continue(n)` when fewer than `n` additional bytes are needed to make
    /// progress (the caller should read more and retry); `Break(message)` once a full
    /// message has been consumed from the front of `buf`.
    fn decode(buf: &mut BytesMut) -> Result<ControlFlow<Self, usize>, ProtocolError>;
}

/// Write a length-prefixed, type-tagged frontend message body.
///
/// `body` receives a fresh scratch buffer and writes the message payload (excluding
/// the type byte and length); this function then prepends `msgtype` (if any) and the
/// computed big-endian length (which includes itself).
pub(crate) fn write_message(buf: &mut BytesMut, msgtype: Option<u8>, body: impl FnOnce(&mut BytesMut)) {
    if let Some(msgtype) = msgtype {
        buf.put_u8(msgtype);
    }
    let len_pos = buf.len();
    buf.put_i32(0);
    body(buf);
    let len = (buf.len() - len_pos) as i32;
    buf[len_pos..len_pos + 4].copy_from_slice(&len.to_be_bytes());
}

/// Split the next length-prefixed message body (backend framing: 1-byte tag already
/// consumed by the caller, 4-byte length including itself, then payload).
pub(crate) fn split_body(buf: &mut BytesMut, header_len: usize) -> Result<ControlFlow<Bytes, usize>, ProtocolError> {
    let Some(header) = buf.get(..header_len) else {
        return Ok(ControlFlow::Continue(header_len));
    };
    let body_len = i32::from_be_bytes(header[header_len - 4..header_len].try_into().unwrap()) as usize;
    if body_len < 4 {
        return Err(ProtocolError::Malformed(format!("message length {body_len} smaller than itself")));
    }
    let total = header_len - 4 + body_len;
    if buf.len() < total {
        return Ok(ControlFlow::Continue(total - buf.len()));
    }
    let mut frame = buf.split_to(total);
    frame.advance(header_len);
    Ok(ControlFlow::Break(frame.freeze()))
}

pub(crate) fn read_cstr(buf: &mut Bytes) -> Result<String, ProtocolError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ProtocolError::Malformed("missing NUL terminator".into()))?;
    let raw = buf.split_to(end);
    buf.advance(1);
    String::from_utf8(raw.to_vec()).map_err(|e| ProtocolError::Malformed(format!("non-UTF-8 string: {e}")))
}

pub(crate) fn put_cstr(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
}
