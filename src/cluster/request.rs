//! Request interpretation.
//!
//! Turns one complete client request into a [`Request`]: the command, its
//! shape and the slots its keys hash to, grouped so that every
//! [`SlotGroup`] can be served by a single node.

use bytes::Bytes;
use tracing::debug;

use crate::cluster::slot::key_slot;
use crate::command::{classify, shape_of, CommandId, CommandShape};
use crate::core::command::Cmd;
use crate::core::{Error, Result};
use crate::proto::codec::Decoded;

/// Keys of one request that hash to the same slot.
///
/// For key/value commands the values travel with their keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGroup {
    slot: u16,
    args: Vec<Bytes>,
    stride: usize,
}

impl SlotGroup {
    /// Returns the slot shared by every key of the group.
    pub fn slot(&self) -> u16 {
        self.slot
    }

    /// Iterates over the keys, in request order.
    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.args.iter().step_by(self.stride)
    }

    /// Returns the keys (and values, for key/value commands) in request order.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Serializes `command` followed by this group's arguments.
    ///
    /// Only meaningful for [`CommandShape::MultiKey`] and
    /// [`CommandShape::MultiKeyValue`] commands, where any subset of the
    /// arguments forms a valid request.
    ///
    /// # Example
    ///
    /// ```
    /// use slotgate::cluster::interpret;
    /// use slotgate::core::command::Cmd;
    /// use slotgate::proto::codec::Decoder;
    ///
    /// let mut decoder = Decoder::new();
    /// decoder.append(&Cmd::new("MGET").args(["{a}1", "{b}2", "{a}3"]).encode());
    /// let request = interpret(decoder.decode().unwrap().unwrap()).unwrap();
    ///
    /// let first = &request.groups()[0];
    /// assert_eq!(
    ///     first.to_request("MGET"),
    ///     Cmd::new("MGET").args(["{a}1", "{a}3"]).encode(),
    /// );
    /// ```
    pub fn to_request(&self, command: &str) -> Bytes {
        Cmd::new(command.to_string())
            .args(self.args.iter().cloned())
            .encode()
    }
}

/// A classified client request.
#[derive(Debug, Clone)]
pub struct Request {
    decoded: Decoded,
    id: CommandId,
    shape: CommandShape,
    groups: Vec<SlotGroup>,
}

impl Request {
    /// Returns the command identifier.
    pub fn command(&self) -> CommandId {
        self.id
    }

    /// Returns the command's key layout.
    pub fn shape(&self) -> CommandShape {
        self.shape
    }

    /// Returns the request exactly as the client sent it.
    pub fn bytes(&self) -> &Bytes {
        &self.decoded.bytes
    }

    /// Returns the slot groups, in order of first appearance.
    ///
    /// Empty when the request carries no key.
    pub fn groups(&self) -> &[SlotGroup] {
        &self.groups
    }

    /// Returns true if no slot is needed to route the request.
    pub fn is_keyless(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the single slot the request must be sent to.
    ///
    /// `Ok(None)` for keyless requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrossSlot`] if the keys span several slots.
    pub fn target_slot(&self) -> Result<Option<u16>> {
        match self.groups.as_slice() {
            [] => Ok(None),
            [group] => Ok(Some(group.slot)),
            groups => Err(Error::CrossSlot {
                slots: groups.len(),
            }),
        }
    }
}

/// Classifies a complete client request and computes the slots it touches.
///
/// # Errors
///
/// - [`Error::Protocol`] if the frame is not an array of bulk strings
/// - [`Error::EmptyCommand`] if the array has no elements
/// - [`Error::UnknownCommand`] if the name is not supported; no key is hashed
/// - [`Error::MissingKey`] if the shape needs keys the request lacks
/// - [`Error::InvalidArgument`] if an `EVAL`-style key count is not a number
pub fn interpret(decoded: Decoded) -> Result<Request> {
    if !decoded.frame.is_bulk_array() {
        return Err(Error::Protocol {
            message: "expected an array of bulk strings".to_string(),
        });
    }

    let name = decoded.element(0).ok_or(Error::EmptyCommand)?;
    let id = classify(&name);
    let Some(shape) = shape_of(id) else {
        return Err(Error::UnknownCommand {
            name: String::from_utf8_lossy(&name).into_owned(),
        });
    };

    let missing_key = || Error::MissingKey {
        command: id.name().unwrap_or_default().to_ascii_lowercase(),
    };
    let count = decoded.frame.elements().len();

    let groups = match shape {
        CommandShape::NoKey => Vec::new(),
        CommandShape::NoArgs
        | CommandShape::OneExtraArg
        | CommandShape::TwoExtraArgs
        | CommandShape::ThreeExtraArgs
        | CommandShape::VariableArgs => {
            let key = decoded.element(1).ok_or_else(missing_key)?;
            partition(vec![key], 1)
        }
        CommandShape::MultiKey => {
            if count < 2 {
                return Err(missing_key());
            }
            partition(bulk_range(&decoded, 1, count).ok_or_else(missing_key)?, 1)
        }
        CommandShape::MultiKeyValue => {
            if count < 3 || (count - 1) % 2 != 0 {
                return Err(missing_key());
            }
            partition(bulk_range(&decoded, 1, count).ok_or_else(missing_key)?, 2)
        }
        CommandShape::EvalShape => {
            let numkeys = decoded.element(2).ok_or_else(missing_key)?;
            let numkeys = std::str::from_utf8(&numkeys)
                .ok()
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| Error::InvalidArgument {
                    message: "number of keys is not an integer or out of range".to_string(),
                })?;
            if numkeys > count - 3 {
                return Err(missing_key());
            }
            partition(
                bulk_range(&decoded, 3, 3 + numkeys).ok_or_else(missing_key)?,
                1,
            )
        }
    };

    debug!(command = ?id, ?shape, groups = groups.len(), "request classified");
    Ok(Request {
        decoded,
        id,
        shape,
        groups,
    })
}

/// Collects elements `start..end`; `None` if any of them is a null bulk.
fn bulk_range(decoded: &Decoded, start: usize, end: usize) -> Option<Vec<Bytes>> {
    (start..end).map(|i| decoded.element(i)).collect()
}

/// Groups `args` by the slot of every `stride`-th element, keeping the order
/// in which slots first appear.
fn partition(args: Vec<Bytes>, stride: usize) -> Vec<SlotGroup> {
    let mut groups: Vec<SlotGroup> = Vec::new();
    for chunk in args.chunks(stride) {
        let slot = key_slot(&chunk[0]);
        match groups.iter_mut().find(|group| group.slot == slot) {
            Some(group) => group.args.extend_from_slice(chunk),
            None => groups.push(SlotGroup {
                slot,
                args: chunk.to_vec(),
                stride,
            }),
        }
    }
    groups
}
