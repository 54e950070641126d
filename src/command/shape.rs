/// Where a command keeps its keys.
///
/// Every supported command has exactly one shape. The names count the
/// arguments that follow the key, so `GET key` is [`NoArgs`](CommandShape::NoArgs)
/// and `HSET key field value` is [`TwoExtraArgs`](CommandShape::TwoExtraArgs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandShape {
    /// Takes no key at all (`PING`); routed by connection affinity.
    NoKey,
    /// Key only (`GET key`).
    NoArgs,
    /// Key plus one argument (`EXPIRE key seconds`).
    OneExtraArg,
    /// Key plus two arguments (`SETEX key seconds value`).
    TwoExtraArgs,
    /// Key plus three arguments (`LINSERT key BEFORE pivot value`).
    ThreeExtraArgs,
    /// Key plus any number of arguments (`SADD key member...`).
    VariableArgs,
    /// One or more keys and nothing else (`MGET`, `DEL`).
    MultiKey,
    /// Interleaved key/value pairs (`MSET`).
    MultiKeyValue,
    /// `script numkeys key... arg...` (`EVAL`, `EVALSHA`, `FCALL`).
    EvalShape,
}

impl CommandShape {
    /// Returns true if the request must carry at least one key.
    pub fn requires_key(self) -> bool {
        !matches!(self, CommandShape::NoKey | CommandShape::EvalShape)
    }

    /// Returns true if the key is always the first argument.
    pub fn is_single_key(self) -> bool {
        matches!(
            self,
            CommandShape::NoArgs
                | CommandShape::OneExtraArg
                | CommandShape::TwoExtraArgs
                | CommandShape::ThreeExtraArgs
                | CommandShape::VariableArgs
        )
    }
}
