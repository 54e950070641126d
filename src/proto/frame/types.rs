use std::ops::Range;

use bytes::Bytes;

/// A RESP (Redis Serialization Protocol) frame built by the proxy.
///
/// Used for data the core produces itself: bootstrap and ASKING commands,
/// per-slot sub-requests and error replies to clients. Frames arriving from
/// the wire are never materialized into this tree; see [`RawFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Error (-ERR).
    Error(Vec<u8>),
    /// Bulk string ($6\r\nfoobar).
    BulkString(Bytes),
    /// Array (*2\r\n...).
    Array(Vec<Frame>),
}

/// Outer type of a wire frame, taken from its leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// `+` status line.
    Status,
    /// `-` error line.
    Error,
    /// `:` integer line.
    Integer,
    /// `$` bulk string.
    Bulk,
    /// `*` array.
    Array,
}

impl FrameKind {
    /// Maps a leading type byte to its kind.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'+' => Some(FrameKind::Status),
            b'-' => Some(FrameKind::Error),
            b':' => Some(FrameKind::Integer),
            b'$' => Some(FrameKind::Bulk),
            b'*' => Some(FrameKind::Array),
            _ => None,
        }
    }
}

/// A complete frame located inside a caller-owned buffer.
///
/// Holds byte spans rather than copies; resolve them against the buffer the
/// frame was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub(crate) kind: FrameKind,
    pub(crate) len: usize,
    pub(crate) payload: Option<Range<usize>>,
    pub(crate) elements: Vec<Option<Range<usize>>>,
    pub(crate) all_bulk: bool,
    pub(crate) null: bool,
}

impl RawFrame {
    /// Returns the outer type of the frame.
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Returns the total number of bytes the frame occupies, terminators included.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the frame occupies no bytes (never the case for a decoded frame).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true for `$-1` and `*-1`.
    pub fn is_null(&self) -> bool {
        self.null
    }

    /// Returns the span of the line text or bulk body.
    ///
    /// `None` for arrays and null bulks.
    pub fn payload_span(&self) -> Option<Range<usize>> {
        self.payload.clone()
    }

    /// Resolves the line text or bulk body against `buf`.
    pub fn payload<'a>(&self, buf: &'a [u8]) -> Option<&'a [u8]> {
        self.payload.clone().map(|r| &buf[r])
    }

    /// Returns one entry per top-level array element.
    ///
    /// Bulk elements carry the span of their body; null bulks and non-bulk
    /// elements are `None`.
    pub fn elements(&self) -> &[Option<Range<usize>>] {
        &self.elements
    }

    /// Returns true if every top-level element is a bulk string (or null bulk).
    ///
    /// Client commands must satisfy this.
    pub fn is_bulk_array(&self) -> bool {
        self.kind == FrameKind::Array && self.all_bulk
    }
}
