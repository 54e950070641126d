use bytes::{BufMut, BytesMut};

use crate::proto::frame::Frame;

/// A RESP encoder that converts [`Frame`] types to bytes.
///
/// The encoder accumulates data in an internal buffer and can be used
/// to encode multiple frames sequentially, e.g. an `ASKING` prefix followed
/// by the command it unlocks.
///
/// # Example
///
/// ```
/// use slotgate::proto::codec::Encoder;
/// use slotgate::proto::frame::Frame;
///
/// let mut encoder = Encoder::new();
/// encoder.encode(&Frame::Error(b"ERR unknown command".to_vec()));
/// assert_eq!(encoder.take().as_ref(), b"-ERR unknown command\r\n");
/// ```
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Creates a new encoder with an empty buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Encodes a frame into the internal buffer using RESP protocol.
    ///
    /// # Arguments
    ///
    /// * `frame` - The frame to encode
    pub fn encode(&mut self, frame: &Frame) {
        match frame {
            Frame::Error(e) => self.put_line(b'-', e),
            Frame::BulkString(data) => self.put_bulk(data),
            Frame::Array(a) => {
                self.put_line(b'*', a.len().to_string().as_bytes());
                for item in a {
                    self.encode(item);
                }
            }
        }
    }

    /// Takes the encoded data from the buffer, leaving it empty.
    ///
    /// # Returns
    ///
    /// The accumulated bytes
    pub fn take(&mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }

    fn put_line(&mut self, marker: u8, line: &[u8]) {
        self.buf.put_u8(marker);
        self.buf.extend_from_slice(line);
        self.buf.extend_from_slice(b"\r\n");
    }

    fn put_bulk(&mut self, data: &[u8]) {
        self.put_line(b'$', data.len().to_string().as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
    }
}
