//! RESP codec.
//!
//! The decoder only answers "is a whole frame buffered, and where are its
//! parts"; it never builds an owned reply tree. The encoder serializes the
//! few frames the proxy produces itself.

mod decoder;
mod encoder;

pub use decoder::{
    decode_frame, decode_frame_with_limit, Decoded, Decoder, DEFAULT_MAX_FRAME_SIZE,
};
pub use encoder::Encoder;
