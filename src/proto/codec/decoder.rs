use std::ops::Range;

use bytes::{Bytes, BytesMut};

use crate::proto::error::{Error, Result};
use crate::proto::frame::{FrameKind, RawFrame};

/// Default ceiling for a single frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024; // 512 MB default

/// Smallest possible encoded array element (`:0\r\n`).
const MIN_ELEMENT_LEN: usize = 4;

/// Reply arrays nest (SCAN, EXEC); requests never do.
const MAX_DEPTH: usize = 128;

/// Checks whether `buf` starts with one complete RESP frame.
///
/// Returns `Ok(Some(frame))` when the whole frame is buffered, `Ok(None)`
/// when more bytes are needed, and [`Error::InvalidFrame`] when the bytes
/// cannot be a frame at all. Nothing is copied: the returned [`RawFrame`]
/// holds spans into `buf`.
///
/// # Example
///
/// ```
/// use slotgate::proto::codec::decode_frame;
///
/// assert!(decode_frame(b"$5\r\nmyva").unwrap().is_none());
///
/// let buf = b"$5\r\nmyval\r\n";
/// let frame = decode_frame(buf).unwrap().unwrap();
/// assert_eq!(frame.len(), 11);
/// assert_eq!(frame.payload(buf), Some(&b"myval"[..]));
/// ```
pub fn decode_frame(buf: &[u8]) -> Result<Option<RawFrame>> {
    decode_frame_with_limit(buf, DEFAULT_MAX_FRAME_SIZE)
}

/// Like [`decode_frame`], rejecting frames larger than `max_frame_size`.
///
/// The limit covers the whole frame: a declared bulk length, the running
/// offset while scanning array elements, and an incomplete frame that has
/// already buffered more than the limit.
pub fn decode_frame_with_limit(buf: &[u8], max_frame_size: usize) -> Result<Option<RawFrame>> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    let kind = FrameKind::from_byte(first)
        .ok_or_else(|| Error::invalid_frame(format!("unknown frame type byte 0x{:02x}", first)))?;

    let scanner = Scanner {
        buf,
        max_frame_size,
    };

    let mut elements = Vec::new();
    let mut all_bulk = true;
    let scanned = if kind == FrameKind::Array {
        scanner.scan_array(0, 0, Some((&mut elements, &mut all_bulk)))?
    } else {
        all_bulk = false;
        scanner.scan(0, 0)?
    };

    let Some(s) = scanned else {
        // Everything buffered belongs to the first frame.
        if buf.len() > max_frame_size {
            return Err(Error::invalid_frame("frame exceeds maximum frame size"));
        }
        return Ok(None);
    };
    scanner.check_size(s.end)?;

    Ok(Some(RawFrame {
        kind,
        len: s.end,
        payload: s.payload,
        elements,
        all_bulk,
        null: s.null,
    }))
}

/// Result of scanning one frame starting at some offset.
struct Scanned {
    kind: FrameKind,
    end: usize,
    payload: Option<Range<usize>>,
    null: bool,
}

type ElementSink<'e> = Option<(&'e mut Vec<Option<Range<usize>>>, &'e mut bool)>;

struct Scanner<'a> {
    buf: &'a [u8],
    max_frame_size: usize,
}

impl Scanner<'_> {
    fn check_size(&self, end: usize) -> Result<()> {
        if end > self.max_frame_size {
            return Err(Error::invalid_frame("frame exceeds maximum frame size"));
        }
        Ok(())
    }

    fn scan(&self, at: usize, depth: usize) -> Result<Option<Scanned>> {
        let Some(&first) = self.buf.get(at) else {
            return Ok(None);
        };
        match FrameKind::from_byte(first) {
            Some(kind @ (FrameKind::Status | FrameKind::Error | FrameKind::Integer)) => {
                Ok(self.scan_line(at, kind))
            }
            Some(FrameKind::Bulk) => self.scan_bulk(at),
            Some(FrameKind::Array) => self.scan_array(at, depth, None),
            None => Err(Error::invalid_frame(format!(
                "unknown frame type byte 0x{:02x} at offset {}",
                first, at
            ))),
        }
    }

    fn scan_line(&self, at: usize, kind: FrameKind) -> Option<Scanned> {
        let end = find_crlf(self.buf, at + 1)?;
        Some(Scanned {
            kind,
            end: end + 2,
            payload: Some(at + 1..end),
            null: false,
        })
    }

    /// `$<len>\r\n<len bytes>\r\n`, total `1 + digits(len) + 2 + len + 2`.
    fn scan_bulk(&self, at: usize) -> Result<Option<Scanned>> {
        let Some((len, body)) = self.read_header(at)? else {
            return Ok(None);
        };

        if len == -1 {
            return Ok(Some(Scanned {
                kind: FrameKind::Bulk,
                end: body,
                payload: None,
                null: true,
            }));
        }

        let len = usize::try_from(len)
            .map_err(|_| Error::invalid_frame(format!("negative bulk length {}", len)))?;
        if len > self.max_frame_size {
            return Err(Error::invalid_frame(
                "bulk string length exceeds maximum frame size",
            ));
        }

        let end = body + len + 2;
        self.check_size(end)?;
        if self.buf.len() < end {
            return Ok(None);
        }
        if &self.buf[body + len..end] != b"\r\n" {
            return Err(Error::invalid_frame("bulk string not terminated by CRLF"));
        }

        Ok(Some(Scanned {
            kind: FrameKind::Bulk,
            end,
            payload: Some(body..body + len),
            null: false,
        }))
    }

    fn scan_array(
        &self,
        at: usize,
        depth: usize,
        mut sink: ElementSink<'_>,
    ) -> Result<Option<Scanned>> {
        if depth >= MAX_DEPTH {
            return Err(Error::invalid_frame("array nesting too deep"));
        }

        let Some((count, mut cursor)) = self.read_header(at)? else {
            return Ok(None);
        };

        if count == -1 {
            return Ok(Some(Scanned {
                kind: FrameKind::Array,
                end: cursor,
                payload: None,
                null: true,
            }));
        }

        let count = usize::try_from(count)
            .map_err(|_| Error::invalid_frame(format!("negative array length {}", count)))?;
        if count > self.max_frame_size / MIN_ELEMENT_LEN {
            return Err(Error::invalid_frame("array length exceeds reasonable maximum"));
        }

        if let Some((elements, _)) = sink.as_mut() {
            elements.reserve(count.min(1024));
        }

        for _ in 0..count {
            let Some(element) = self.scan(cursor, depth + 1)? else {
                return Ok(None);
            };
            if let Some((elements, all_bulk)) = sink.as_mut() {
                if element.kind != FrameKind::Bulk {
                    **all_bulk = false;
                }
                elements.push(element.payload.filter(|_| element.kind == FrameKind::Bulk));
            }
            cursor = element.end;
            self.check_size(cursor)?;
        }

        Ok(Some(Scanned {
            kind: FrameKind::Array,
            end: cursor,
            payload: None,
            null: false,
        }))
    }

    /// Reads `<type><decimal>\r\n` at `at`.
    ///
    /// Returns the number and the offset just past the CRLF.
    fn read_header(&self, at: usize) -> Result<Option<(i64, usize)>> {
        let buf = self.buf;
        let mut pos = at + 1;
        let negative = buf.get(pos) == Some(&b'-');
        if negative {
            pos += 1;
        }

        let digits_start = pos;
        let mut value: i64 = 0;
        while let Some(&b) = buf.get(pos) {
            if !b.is_ascii_digit() {
                break;
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(b - b'0')))
                .ok_or_else(|| Error::invalid_frame("length overflows"))?;
            pos += 1;
        }

        if pos == buf.len() {
            // The number may still be growing.
            return Ok(None);
        }
        if pos == digits_start {
            return Err(Error::invalid_frame(format!(
                "expected length digits at offset {}",
                pos
            )));
        }
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        if &buf[pos..pos + 2] != b"\r\n" {
            return Err(Error::invalid_frame(format!(
                "length not terminated by CRLF at offset {}",
                pos
            )));
        }

        let value = if negative { -value } else { value };
        if value < -1 {
            return Err(Error::invalid_frame(format!("invalid length {}", value)));
        }

        Ok(Some((value, pos + 2)))
    }
}

/// Searches for the next CRLF at or after `from`.
///
/// Returns the index of the `\r`.
fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    if buf.len() < from + 2 {
        return None;
    }
    buf[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

/// A complete frame split off a [`Decoder`] buffer.
///
/// `bytes` holds exactly the frame; the spans in `frame` index into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The frame's bytes, terminators included.
    pub bytes: Bytes,
    /// Structure of the frame.
    pub frame: RawFrame,
}

impl Decoded {
    /// Returns the line text or bulk body without copying.
    pub fn payload(&self) -> Option<Bytes> {
        self.frame.payload_span().map(|r| self.bytes.slice(r))
    }

    /// Returns the body of the `index`-th bulk element without copying.
    pub fn element(&self, index: usize) -> Option<Bytes> {
        self.frame
            .elements()
            .get(index)
            .and_then(|e| e.clone())
            .map(|r| self.bytes.slice(r))
    }
}

/// A streaming RESP decoder.
///
/// Call [`append`](Decoder::append) as bytes arrive, then
/// [`decode`](Decoder::decode) to split complete frames off the front of the
/// buffer. Returns `Ok(None)` when more data is needed.
///
/// # Example
///
/// ```
/// use slotgate::proto::codec::Decoder;
///
/// let mut decoder = Decoder::new();
/// decoder.append(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo");
/// assert!(decoder.decode().unwrap().is_none());
/// decoder.append(b"\r\n");
/// let decoded = decoder.decode().unwrap().unwrap();
/// assert_eq!(decoded.element(1).unwrap().as_ref(), b"foo");
/// ```
#[derive(Debug)]
pub struct Decoder {
    buf: BytesMut,
    max_frame_size: usize,
}

impl Decoder {
    /// Creates a new decoder with an empty buffer.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a new decoder with a custom maximum frame size.
    ///
    /// # Arguments
    ///
    /// * `max_frame_size` - Maximum size in bytes for a single frame
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_size,
        }
    }

    /// Appends raw bytes to the internal buffer.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Returns the number of buffered bytes not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Attempts to split one complete frame off the buffer.
    ///
    /// On error the buffer is left untouched; the connection should be
    /// closed since the stream cannot be resynchronized.
    pub fn decode(&mut self) -> Result<Option<Decoded>> {
        let Some(frame) = decode_frame_with_limit(&self.buf, self.max_frame_size)? else {
            return Ok(None);
        };
        let bytes = self.buf.split_to(frame.len()).freeze();
        Ok(Some(Decoded { bytes, frame }))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(buf: &[u8]) -> RawFrame {
        decode_frame(buf).unwrap().unwrap()
    }

    #[test]
    fn test_status_error_integer() {
        let frame = complete(b"+OK\r\n");
        assert_eq!(frame.kind(), FrameKind::Status);
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.payload(b"+OK\r\n"), Some(&b"OK"[..]));

        let buf = b"-MOVED 1 127.0.0.1:7000\r\n";
        let frame = complete(buf);
        assert_eq!(frame.kind(), FrameKind::Error);
        assert_eq!(frame.payload(buf), Some(&b"MOVED 1 127.0.0.1:7000"[..]));

        let frame = complete(b":42\r\n");
        assert_eq!(frame.kind(), FrameKind::Integer);
        assert_eq!(frame.len(), 5);
    }

    #[test]
    fn test_line_waits_for_crlf() {
        assert!(decode_frame(b"+OK").unwrap().is_none());
        assert!(decode_frame(b"+OK\r").unwrap().is_none());
        assert!(decode_frame(b"-").unwrap().is_none());
    }

    #[test]
    fn test_bulk_incomplete_then_complete() {
        assert!(decode_frame(b"$5\r\nmyva").unwrap().is_none());

        let buf = b"$5\r\nmyval\r\n";
        let frame = complete(buf);
        assert_eq!(frame.kind(), FrameKind::Bulk);
        assert_eq!(frame.len(), 11);
        assert_eq!(frame.payload(buf), Some(&b"myval"[..]));
    }

    #[test]
    fn test_bulk_length_still_arriving() {
        assert!(decode_frame(b"$").unwrap().is_none());
        assert!(decode_frame(b"$1").unwrap().is_none());
        assert!(decode_frame(b"$12\r").unwrap().is_none());
    }

    #[test]
    fn test_bulk_null() {
        let frame = complete(b"$-1\r\n");
        assert!(frame.is_null());
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.payload_span(), None);
    }

    #[test]
    fn test_bulk_empty() {
        let frame = complete(b"$0\r\n\r\n");
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.payload(b"$0\r\n\r\n"), Some(&b""[..]));
    }

    #[test]
    fn test_bulk_binary_body_with_crlf() {
        let buf = b"$4\r\na\r\nb\r\n";
        let frame = complete(buf);
        assert_eq!(frame.payload(buf), Some(&b"a\r\nb"[..]));
    }

    #[test]
    fn test_bulk_missing_terminator_is_invalid() {
        let err = decode_frame(b"$3\r\nfooXY").unwrap_err();
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn test_bulk_bad_length() {
        assert!(decode_frame(b"$abc\r\n").is_err());
        assert!(decode_frame(b"$-2\r\n").is_err());
        assert!(decode_frame(b"$3x\r\nfoo\r\n").is_err());
    }

    #[test]
    fn test_bulk_exceeds_max_size() {
        let result = decode_frame_with_limit(b"$100\r\n", 10);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("exceeds maximum frame size"));
    }

    #[test]
    fn test_unterminated_line_exceeds_max_size() {
        let mut decoder = Decoder::with_max_frame_size(16);
        decoder.append(b"+");
        decoder.append(&vec![b'a'; 100_000]);

        match decoder.decode() {
            Err(Error::InvalidFrame { .. }) => {}
            _ => panic!("Expected InvalidFrame for an oversized line"),
        }
        assert_eq!(decoder.buffered(), 100_001);

        // Short partial lines still wait for more.
        assert!(decode_frame_with_limit(b"+abc", 16).unwrap().is_none());
    }

    #[test]
    fn test_array_total_exceeds_max_size() {
        let mut data = b"*16\r\n".to_vec();
        for _ in 0..16 {
            data.extend_from_slice(b"$60\r\n");
            data.extend_from_slice(&[b'x'; 60]);
            data.extend_from_slice(b"\r\n");
        }

        match decode_frame_with_limit(&data, 64) {
            Err(Error::InvalidFrame { reason }) => {
                assert!(reason.contains("exceeds maximum frame size"));
            }
            _ => panic!("Expected InvalidFrame for an oversized array"),
        }
        // Each element alone fits; the first two already do not.
        assert!(decode_frame_with_limit(&data[..70], 64).is_err());
        assert!(decode_frame_with_limit(&data, data.len()).unwrap().is_some());
    }

    #[test]
    fn test_frame_at_exact_limit() {
        let buf = b"$5\r\nmyval\r\n";
        assert!(decode_frame_with_limit(buf, buf.len()).unwrap().is_some());
        assert!(decode_frame_with_limit(buf, buf.len() - 1).is_err());
    }

    #[test]
    fn test_unknown_type_byte_is_invalid() {
        let err = decode_frame(b"PING\r\n").unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { .. }));
    }

    #[test]
    fn test_empty_buffer_needs_more() {
        assert!(decode_frame(b"").unwrap().is_none());
    }

    #[test]
    fn test_array_of_bulks() {
        let buf = b"*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n";
        let frame = complete(buf);
        assert_eq!(frame.kind(), FrameKind::Array);
        assert_eq!(frame.len(), buf.len());
        assert!(frame.is_bulk_array());

        let names: Vec<&[u8]> = frame
            .elements()
            .iter()
            .map(|e| &buf[e.clone().unwrap()])
            .collect();
        assert_eq!(names, vec![&b"SET"[..], b"mykey", b"myvalue"]);
    }

    #[test]
    fn test_array_incomplete_at_every_cut() {
        let buf = b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
        for cut in 0..buf.len() {
            assert!(
                decode_frame(&buf[..cut]).unwrap().is_none(),
                "prefix of {} bytes should be incomplete",
                cut
            );
        }
        assert!(decode_frame(buf).unwrap().is_some());
    }

    #[test]
    fn test_array_with_null_element() {
        let buf = b"*3\r\n$3\r\nfoo\r\n$-1\r\n$3\r\nbar\r\n";
        let frame = complete(buf);
        assert_eq!(frame.len(), buf.len());
        assert_eq!(frame.elements().len(), 3);
        assert!(frame.elements()[1].is_none());
        assert!(frame.is_bulk_array());
    }

    #[test]
    fn test_array_null_and_empty() {
        let frame = complete(b"*-1\r\n");
        assert!(frame.is_null());
        assert_eq!(frame.len(), 5);

        let frame = complete(b"*0\r\n");
        assert!(frame.elements().is_empty());
        assert_eq!(frame.len(), 4);
    }

    #[test]
    fn test_nested_reply_array() {
        // HSCAN reply: cursor plus a nested array of fields.
        let buf = b"*2\r\n$1\r\n0\r\n*2\r\n$1\r\nf\r\n:1\r\n";
        let frame = complete(buf);
        assert_eq!(frame.len(), buf.len());
        assert!(!frame.is_bulk_array());
        assert_eq!(frame.elements().len(), 2);
        assert!(frame.elements()[1].is_none());
    }

    #[test]
    fn test_array_exceeds_reasonable_max() {
        let data = format!("*{}\r\n", 1024);
        let err = decode_frame_with_limit(data.as_bytes(), 1024).unwrap_err();
        assert!(err.to_string().contains("array length exceeds reasonable maximum"));
    }

    #[test]
    fn test_array_nesting_limit() {
        let data = "*1\r\n".repeat(MAX_DEPTH + 1);
        assert!(decode_frame(data.as_bytes()).is_err());
    }

    #[test]
    fn test_decoder_streams_pipelined_frames() {
        let mut decoder = Decoder::new();
        decoder.append(b"+OK\r\n:7\r\n$3\r\nab");

        let first = decoder.decode().unwrap().unwrap();
        assert_eq!(first.bytes.as_ref(), b"+OK\r\n");
        assert_eq!(first.payload().unwrap().as_ref(), b"OK");

        let second = decoder.decode().unwrap().unwrap();
        assert_eq!(second.frame.kind(), FrameKind::Integer);

        assert!(decoder.decode().unwrap().is_none());
        assert_eq!(decoder.buffered(), 6);
        decoder.append(b"c\r\n");
        let third = decoder.decode().unwrap().unwrap();
        assert_eq!(third.payload().unwrap().as_ref(), b"abc");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_error_keeps_buffer() {
        let mut decoder = Decoder::with_max_frame_size(1024);
        decoder.append(b"?bogus\r\n");
        assert!(decoder.decode().is_err());
        assert_eq!(decoder.buffered(), 8);
    }
}
