//! Interpretation of backend error replies.
//!
//! Redis Cluster uses special error responses for redirects:
//! - `MOVED <slot> <host>:<port>` - Permanent redirect, the slot has a new owner
//! - `ASK <slot> <host>:<port>` - Temporary redirect during migration
//! - `TRYAGAIN` - Transient condition, retry the same node later
//!
//! Everything else is terminal for the request and forwarded to the client.

use tracing::debug;

use crate::cluster::slot::SLOT_COUNT;
use crate::cluster::topology::TopologyStore;
use crate::core::{Error, Result};
use crate::proto::frame::{FrameKind, RawFrame};

/// Error code of a terminal backend error.
///
/// Kept for logging; the router treats all of them alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// `ERR`
    Err,
    /// `OOM`
    Oom,
    /// `BUSY`
    Busy,
    /// `NOAUTH`
    NoAuth,
    /// `LOADING`
    Loading,
    /// `BUSYKEY`
    BusyKey,
    /// `MISCONF`
    Misconf,
    /// `WRONGTYPE`
    WrongType,
    /// `EXECABORT`
    ExecAbort,
    /// `MASTERDOWN`
    MasterDown,
    /// `NOREPLICAS`
    NoReplicas,
    /// `READONLY`
    ReadOnly,
    /// `CLUSTERDOWN`
    ClusterDown,
    /// `CROSSSLOT`
    CrossSlot,
    /// Any other code.
    Other,
}

impl ErrorKind {
    /// Maps the first word of an error line to its kind.
    pub fn from_code(code: &[u8]) -> Self {
        match code {
            b"ERR" => ErrorKind::Err,
            b"OOM" => ErrorKind::Oom,
            b"BUSY" => ErrorKind::Busy,
            b"NOAUTH" => ErrorKind::NoAuth,
            b"LOADING" => ErrorKind::Loading,
            b"BUSYKEY" => ErrorKind::BusyKey,
            b"MISCONF" => ErrorKind::Misconf,
            b"WRONGTYPE" => ErrorKind::WrongType,
            b"EXECABORT" => ErrorKind::ExecAbort,
            b"MASTERDOWN" => ErrorKind::MasterDown,
            b"NOREPLICAS" => ErrorKind::NoReplicas,
            b"READONLY" => ErrorKind::ReadOnly,
            b"CLUSTERDOWN" => ErrorKind::ClusterDown,
            b"CROSSSLOT" => ErrorKind::CrossSlot,
            _ => ErrorKind::Other,
        }
    }
}

/// What a backend reply means for the request that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirection {
    /// Not an error reply.
    Ok,
    /// The slot moved for good; the store has been patched.
    Moved {
        /// The slot that moved.
        slot: u16,
        /// Its new owner.
        address: String,
    },
    /// Resend this one request, prefixed by `ASKING`, to `address`.
    Ask {
        /// The slot being migrated.
        slot: u16,
        /// Node importing the slot.
        address: String,
    },
    /// Resend to the same node after a delay.
    TryAgain,
    /// `NOSCRIPT`: the node lacks the script; passed to the client.
    NoScript,
    /// Any other error reply.
    Terminal(ErrorKind),
}

impl Redirection {
    /// Returns true if the request should be sent again.
    pub fn is_retry(&self) -> bool {
        matches!(
            self,
            Redirection::Moved { .. } | Redirection::Ask { .. } | Redirection::TryAgain
        )
    }
}

/// Parses an error reply payload (the text after `-`).
///
/// Anything from the first CR or LF on is ignored.
///
/// # Errors
///
/// Returns [`Error::RedirectParse`] for a `MOVED` or `ASK` whose slot is
/// missing, non-numeric or out of range, or whose address is missing.
///
/// # Examples
///
/// ```
/// use slotgate::cluster::{parse_redis_error, Redirection};
///
/// let redirect = parse_redis_error(b"MOVED 3999 127.0.0.1:7000").unwrap();
/// assert_eq!(
///     redirect,
///     Redirection::Moved { slot: 3999, address: "127.0.0.1:7000".to_string() }
/// );
/// assert!(parse_redis_error(b"MOVED 3999").is_err());
/// ```
pub fn parse_redis_error(payload: &[u8]) -> Result<Redirection> {
    let end = payload
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(payload.len());
    let line = &payload[..end];
    let code = line.split(|&b| b == b' ').next().unwrap_or_default();

    match code {
        b"MOVED" => {
            let (slot, address) = parse_redirect(line)?;
            Ok(Redirection::Moved { slot, address })
        }
        b"ASK" => {
            let (slot, address) = parse_redirect(line)?;
            Ok(Redirection::Ask { slot, address })
        }
        b"TRYAGAIN" => Ok(Redirection::TryAgain),
        b"NOSCRIPT" => Ok(Redirection::NoScript),
        _ => Ok(Redirection::Terminal(ErrorKind::from_code(code))),
    }
}

/// Parses `<CODE> <slot> <host>:<port>`.
fn parse_redirect(line: &[u8]) -> Result<(u16, String)> {
    let malformed = || Error::RedirectParse {
        message: String::from_utf8_lossy(line).into_owned(),
    };

    let mut tokens = line.split(|&b| b == b' ').filter(|t| !t.is_empty()).skip(1);
    let slot = tokens
        .next()
        .and_then(|t| std::str::from_utf8(t).ok())
        .and_then(|t| t.parse::<u16>().ok())
        .filter(|&slot| slot < SLOT_COUNT)
        .ok_or_else(malformed)?;
    let address = tokens
        .next()
        .and_then(|t| std::str::from_utf8(t).ok())
        .ok_or_else(malformed)?;

    Ok((slot, address.to_string()))
}

/// Interprets a complete backend reply held in `buf`.
///
/// Non-error replies are [`Redirection::Ok`]. A `MOVED` patches `store`; an
/// `ASK` leaves it untouched.
///
/// # Errors
///
/// See [`parse_redis_error`]. On error the store is not modified.
pub fn interpret_reply(
    store: &TopologyStore,
    cluster: &str,
    buf: &[u8],
    frame: &RawFrame,
) -> Result<Redirection> {
    if frame.kind() != FrameKind::Error {
        return Ok(Redirection::Ok);
    }
    let redirection = parse_redis_error(frame.payload(buf).unwrap_or_default())?;

    if let Redirection::Moved { slot, address } = &redirection {
        store.patch_one(cluster, *slot, address);
    }
    debug!(cluster, ?redirection, "backend error reply");
    Ok(redirection)
}
