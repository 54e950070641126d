use bytes::Bytes;
use thiserror::Error;

use crate::proto::codec::Encoder;
use crate::proto::frame::Frame;

/// Result type alias for slotgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the proxy core.
///
/// Needing more bytes is not an error: decoders report it as `Ok(None)`.
/// Only [`Error::InvalidFrame`] is fatal to a client connection; every other
/// variant fails a single in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The buffer does not hold a parseable RESP frame.
    #[error("invalid frame: {reason}")]
    InvalidFrame {
        /// What was wrong with the frame.
        reason: String,
    },

    /// The command name is not in the supported command table.
    #[error("unknown command '{name}'")]
    UnknownCommand {
        /// The command name as sent by the client.
        name: String,
    },

    /// The request array had no elements.
    #[error("empty command")]
    EmptyCommand,

    /// The command's shape requires a key the request does not carry.
    #[error("wrong number of arguments for '{command}' command")]
    MissingKey {
        /// The command name.
        command: String,
    },

    /// A line of a CLUSTER NODES dump could not be parsed.
    #[error("malformed topology line '{line}': {reason}")]
    MalformedTopologyLine {
        /// The offending line.
        line: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A CLUSTER NODES dump did not contain a single node.
    #[error("topology dump for cluster '{cluster}' contains no nodes")]
    EmptyTopology {
        /// The cluster the dump was fetched for.
        cluster: String,
    },

    /// A MOVED/ASK reply was missing its slot or address.
    #[error("malformed redirect: {message}")]
    RedirectParse {
        /// The redirect payload.
        message: String,
    },

    /// The request was redirected more times than allowed.
    #[error("too many redirections ({attempts})")]
    RetryExhausted {
        /// Number of dispatches made for the request.
        attempts: u32,
    },

    /// Multi-key request whose keys hash to different slots.
    #[error("CROSSSLOT keys in request don't hash to the same slot ({slots} slots)")]
    CrossSlot {
        /// Number of distinct slots touched.
        slots: usize,
    },

    /// No node owns the slot, even after refreshing the topology.
    #[error("CLUSTERDOWN hash slot {slot} not served")]
    SlotNotCovered {
        /// The slot without an owner.
        slot: u16,
    },

    /// The cluster has no topology and no seed node to fetch it from.
    #[error("no node known for cluster '{cluster}'")]
    NoSeedNode {
        /// The cluster name.
        cluster: String,
    },

    /// A protocol-level violation not covered by a more specific variant.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of invalid argument.
        message: String,
    },
}

impl Error {
    pub(crate) fn invalid_frame(reason: impl Into<String>) -> Self {
        Error::InvalidFrame {
            reason: reason.into(),
        }
    }

    /// Returns true if the client connection cannot be parsed any further.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Error::InvalidFrame { .. })
    }

    /// Encodes this error as a RESP error reply for the client.
    ///
    /// Messages that already carry a Redis error code (`CROSSSLOT`,
    /// `CLUSTERDOWN`) keep it; everything else is prefixed with `ERR`.
    pub fn to_reply(&self) -> Bytes {
        let message = self.to_string();
        let line = match self {
            Error::CrossSlot { .. } | Error::SlotNotCovered { .. } => message,
            _ => format!("ERR {}", message),
        };
        // Error lines must stay on one line.
        let line = line.replace(['\r', '\n'], " ");

        let mut encoder = Encoder::new();
        encoder.encode(&Frame::Error(line.into_bytes()));
        encoder.take().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_frame() {
        let error = Error::invalid_frame("unknown type byte '!'");
        assert_eq!(error.to_string(), "invalid frame: unknown type byte '!'");
    }

    #[test]
    fn test_error_display_unknown_command() {
        let error = Error::UnknownCommand {
            name: "FOO".to_string(),
        };
        assert_eq!(error.to_string(), "unknown command 'FOO'");
    }

    #[test]
    fn test_error_display_retry_exhausted() {
        let error = Error::RetryExhausted { attempts: 6 };
        assert_eq!(error.to_string(), "too many redirections (6)");
    }

    #[test]
    fn test_only_invalid_frame_is_fatal() {
        assert!(Error::invalid_frame("x").is_connection_fatal());
        assert!(!Error::EmptyCommand.is_connection_fatal());
        assert!(!Error::MissingKey {
            command: "GET".to_string()
        }
        .is_connection_fatal());
        assert!(!Error::RetryExhausted { attempts: 1 }.is_connection_fatal());
    }

    #[test]
    fn test_to_reply_prefixes_err() {
        let reply = Error::UnknownCommand {
            name: "FOO".to_string(),
        }
        .to_reply();
        assert_eq!(reply.as_ref(), b"-ERR unknown command 'FOO'\r\n");
    }

    #[test]
    fn test_to_reply_keeps_cluster_codes() {
        let reply = Error::CrossSlot { slots: 2 }.to_reply();
        assert!(reply.starts_with(b"-CROSSSLOT "));

        let reply = Error::SlotNotCovered { slot: 12 }.to_reply();
        assert_eq!(
            reply.as_ref(),
            b"-CLUSTERDOWN hash slot 12 not served\r\n"
        );
    }

    #[test]
    fn test_to_reply_strips_line_breaks() {
        let reply = Error::UnknownCommand {
            name: "A\r\nB".to_string(),
        }
        .to_reply();
        assert_eq!(reply.as_ref(), b"-ERR unknown command 'A  B'\r\n");
    }
}
