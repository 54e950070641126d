use bytes::Bytes;

use crate::proto::codec::Encoder;
use crate::proto::frame::Frame;

/// A command the proxy sends on its own behalf.
///
/// Client requests are forwarded as the bytes they arrived in; `Cmd` is used
/// for what the core writes itself: topology bootstrap, `ASKING` prefixes and
/// per-slot sub-requests.
///
/// # Example
///
/// ```
/// use slotgate::core::command::Cmd;
///
/// let cmd = Cmd::new("MGET").arg("a").arg("c");
/// assert_eq!(cmd.encode().as_ref(), b"*3\r\n$4\r\nMGET\r\n$1\r\na\r\n$1\r\nc\r\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    args: Vec<Bytes>,
}

impl Cmd {
    /// Creates a new command with the given name.
    ///
    /// # Arguments
    ///
    /// * `name` - The command name (e.g., "CLUSTER", "ASKING", "MGET")
    #[inline]
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            args: vec![name.into()],
        }
    }

    /// Appends an argument to the command.
    ///
    /// # Arguments
    ///
    /// * `arg` - The argument value
    #[inline]
    pub fn arg<T: Into<Bytes>>(mut self, arg: T) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends every item of `args`.
    #[inline]
    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns the number of elements, name included.
    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Always false: a command has at least its name.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Serializes the command as an array of bulk strings.
    pub fn encode(&self) -> Bytes {
        let mut encoder = Encoder::new();
        encoder.encode(&self.to_frame());
        encoder.take().freeze()
    }

    fn to_frame(&self) -> Frame {
        Frame::Array(self.args.iter().cloned().map(Frame::BulkString).collect())
    }
}
