use super::shape::CommandShape;

/// One row of the command table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
    pub(crate) id: CommandId,
    pub(crate) name: &'static str,
    pub(crate) shape: CommandShape,
}

macro_rules! command_table {
    ($($variant:ident => $name:literal, $shape:ident;)+) => {
        /// Identifier of a supported command.
        ///
        /// Discriminants index the command table; [`CommandId::Unknown`]
        /// sits past the end and has no shape.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum CommandId {
            $($variant,)+
            /// Name not found in the table. Never routed.
            Unknown,
        }

        /// Supported commands, ordered by name length.
        pub(crate) static TABLE: &[Entry] = &[
            $(Entry {
                id: CommandId::$variant,
                name: $name,
                shape: CommandShape::$shape,
            },)+
        ];
    };
}

command_table! {
    // 3
    Get => "GET", NoArgs;
    Set => "SET", VariableArgs;
    Ttl => "TTL", NoArgs;
    Del => "DEL", MultiKey;
    // 4
    Auth => "AUTH", NoKey;
    Copy => "COPY", VariableArgs;
    Decr => "DECR", NoArgs;
    Dump => "DUMP", NoArgs;
    Echo => "ECHO", NoKey;
    Eval => "EVAL", EvalShape;
    Hdel => "HDEL", VariableArgs;
    Hget => "HGET", OneExtraArg;
    Hlen => "HLEN", NoArgs;
    Hset => "HSET", TwoExtraArgs;
    Incr => "INCR", NoArgs;
    Llen => "LLEN", NoArgs;
    Lpop => "LPOP", NoArgs;
    Lpos => "LPOS", VariableArgs;
    Lrem => "LREM", TwoExtraArgs;
    Lset => "LSET", TwoExtraArgs;
    Mget => "MGET", MultiKey;
    Mset => "MSET", MultiKeyValue;
    Ping => "PING", NoKey;
    Pttl => "PTTL", NoArgs;
    Quit => "QUIT", NoKey;
    Rpop => "RPOP", NoArgs;
    Sadd => "SADD", VariableArgs;
    Sort => "SORT", VariableArgs;
    Spop => "SPOP", NoArgs;
    Srem => "SREM", VariableArgs;
    Time => "TIME", NoKey;
    Type => "TYPE", NoArgs;
    Xack => "XACK", VariableArgs;
    Xadd => "XADD", VariableArgs;
    Xdel => "XDEL", VariableArgs;
    Xlen => "XLEN", NoArgs;
    Zadd => "ZADD", VariableArgs;
    Zrem => "ZREM", VariableArgs;
    // 5
    Fcall => "FCALL", EvalShape;
    GetEx => "GETEX", VariableArgs;
    Hkeys => "HKEYS", NoArgs;
    Hmget => "HMGET", VariableArgs;
    Hmset => "HMSET", VariableArgs;
    Hscan => "HSCAN", VariableArgs;
    Hvals => "HVALS", NoArgs;
    Lmove => "LMOVE", ThreeExtraArgs;
    Lpush => "LPUSH", VariableArgs;
    Ltrim => "LTRIM", TwoExtraArgs;
    PfAdd => "PFADD", VariableArgs;
    Rpush => "RPUSH", VariableArgs;
    Scard => "SCARD", NoArgs;
    Sdiff => "SDIFF", VariableArgs;
    SetEx => "SETEX", TwoExtraArgs;
    SetNx => "SETNX", OneExtraArg;
    Smove => "SMOVE", TwoExtraArgs;
    Sscan => "SSCAN", VariableArgs;
    Touch => "TOUCH", MultiKey;
    Xtrim => "XTRIM", VariableArgs;
    Zcard => "ZCARD", NoArgs;
    Zrank => "ZRANK", OneExtraArg;
    Zscan => "ZSCAN", VariableArgs;
    // 6
    Append => "APPEND", OneExtraArg;
    BitPos => "BITPOS", VariableArgs;
    Blmove => "BLMOVE", VariableArgs;
    DbSize => "DBSIZE", NoKey;
    DecrBy => "DECRBY", OneExtraArg;
    Exists => "EXISTS", NoArgs;
    Expire => "EXPIRE", OneExtraArg;
    GeoAdd => "GEOADD", VariableArgs;
    GeoPos => "GEOPOS", VariableArgs;
    GetBit => "GETBIT", OneExtraArg;
    GetDel => "GETDEL", NoArgs;
    GetSet => "GETSET", OneExtraArg;
    HsetNx => "HSETNX", TwoExtraArgs;
    IncrBy => "INCRBY", OneExtraArg;
    Lindex => "LINDEX", OneExtraArg;
    LpushX => "LPUSHX", OneExtraArg;
    Lrange => "LRANGE", TwoExtraArgs;
    MsetNx => "MSETNX", MultiKeyValue;
    PsetEx => "PSETEX", TwoExtraArgs;
    Rename => "RENAME", OneExtraArg;
    RpushX => "RPUSHX", OneExtraArg;
    SetBit => "SETBIT", TwoExtraArgs;
    Sinter => "SINTER", VariableArgs;
    Strlen => "STRLEN", NoArgs;
    Substr => "SUBSTR", TwoExtraArgs;
    Sunion => "SUNION", VariableArgs;
    Unlink => "UNLINK", MultiKey;
    Xclaim => "XCLAIM", VariableArgs;
    Xrange => "XRANGE", VariableArgs;
    Zcount => "ZCOUNT", TwoExtraArgs;
    Zrange => "ZRANGE", VariableArgs;
    Zscore => "ZSCORE", OneExtraArg;
    // 7
    EvalRo => "EVAL_RO", EvalShape;
    EvalSha => "EVALSHA", EvalShape;
    GeoDist => "GEODIST", VariableArgs;
    GeoHash => "GEOHASH", VariableArgs;
    Hexists => "HEXISTS", OneExtraArg;
    HgetAll => "HGETALL", NoArgs;
    HincrBy => "HINCRBY", TwoExtraArgs;
    Hstrlen => "HSTRLEN", OneExtraArg;
    Linsert => "LINSERT", ThreeExtraArgs;
    Persist => "PERSIST", NoArgs;
    Pexpire => "PEXPIRE", OneExtraArg;
    PfCount => "PFCOUNT", NoArgs;
    PfMerge => "PFMERGE", VariableArgs;
    Restore => "RESTORE", TwoExtraArgs;
    SortRo => "SORT_RO", VariableArgs;
    ZincrBy => "ZINCRBY", TwoExtraArgs;
    ZmScore => "ZMSCORE", VariableArgs;
    ZpopMax => "ZPOPMAX", VariableArgs;
    ZpopMin => "ZPOPMIN", VariableArgs;
    // 8
    BitCount => "BITCOUNT", VariableArgs;
    BitField => "BITFIELD", VariableArgs;
    ExpireAt => "EXPIREAT", OneExtraArg;
    FcallRo => "FCALL_RO", EvalShape;
    GetRange => "GETRANGE", TwoExtraArgs;
    LastSave => "LASTSAVE", NoKey;
    ReadOnly => "READONLY", NoKey;
    RenameNx => "RENAMENX", OneExtraArg;
    SetRange => "SETRANGE", TwoExtraArgs;
    Smembers => "SMEMBERS", NoArgs;
    Xpending => "XPENDING", VariableArgs;
    ZrevRank => "ZREVRANK", OneExtraArg;
    // 9
    GeoRadius => "GEORADIUS", VariableArgs;
    GeoSearch => "GEOSEARCH", VariableArgs;
    PexpireAt => "PEXPIREAT", OneExtraArg;
    RandomKey => "RANDOMKEY", NoKey;
    ReadWrite => "READWRITE", NoKey;
    RpopLpush => "RPOPLPUSH", OneExtraArg;
    SisMember => "SISMEMBER", OneExtraArg;
    XrevRange => "XREVRANGE", VariableArgs;
    ZlexCount => "ZLEXCOUNT", TwoExtraArgs;
    ZrevRange => "ZREVRANGE", VariableArgs;
    // 10
    BrpopLpush => "BRPOPLPUSH", TwoExtraArgs;
    EvalShaRo => "EVALSHA_RO", EvalShape;
    ExpireTime => "EXPIRETIME", NoArgs;
    HrandField => "HRANDFIELD", VariableArgs;
    SdiffStore => "SDIFFSTORE", VariableArgs;
    SmisMember => "SMISMEMBER", VariableArgs;
    XautoClaim => "XAUTOCLAIM", VariableArgs;
    ZdiffStore => "ZDIFFSTORE", VariableArgs;
    // 11
    BitFieldRo => "BITFIELD_RO", VariableArgs;
    IncrByFloat => "INCRBYFLOAT", OneExtraArg;
    PexpireTime => "PEXPIRETIME", NoArgs;
    SinterStore => "SINTERSTORE", VariableArgs;
    SrandMember => "SRANDMEMBER", VariableArgs;
    SunionStore => "SUNIONSTORE", VariableArgs;
    ZinterStore => "ZINTERSTORE", VariableArgs;
    ZrandMember => "ZRANDMEMBER", VariableArgs;
    ZrangeByLex => "ZRANGEBYLEX", VariableArgs;
    ZrangeStore => "ZRANGESTORE", VariableArgs;
    ZunionStore => "ZUNIONSTORE", VariableArgs;
    // 12
    HincrByFloat => "HINCRBYFLOAT", TwoExtraArgs;
    // 13
    ZrangeByScore => "ZRANGEBYSCORE", VariableArgs;
    // 14
    GeoSearchStore => "GEOSEARCHSTORE", VariableArgs;
    ZremRangeByLex => "ZREMRANGEBYLEX", TwoExtraArgs;
    ZrevRangeByLex => "ZREVRANGEBYLEX", VariableArgs;
    // 15
    ZremRangeByRank => "ZREMRANGEBYRANK", TwoExtraArgs;
    // 16
    ZremRangeByScore => "ZREMRANGEBYSCORE", TwoExtraArgs;
    ZrevRangeByScore => "ZREVRANGEBYSCORE", VariableArgs;
    // 17
    GeoRadiusByMember => "GEORADIUSBYMEMBER", VariableArgs;
}

impl CommandId {
    /// Returns the canonical upper-case name, or `None` for
    /// [`CommandId::Unknown`].
    pub fn name(self) -> Option<&'static str> {
        TABLE.get(self as usize).map(|entry| entry.name)
    }
}

/// Looks up `name` case-insensitively.
///
/// Only entries of the same length are compared.
pub fn classify(name: &[u8]) -> CommandId {
    let start = TABLE.partition_point(|entry| entry.name.len() < name.len());
    TABLE[start..]
        .iter()
        .take_while(|entry| entry.name.len() == name.len())
        .find(|entry| entry.name.as_bytes().eq_ignore_ascii_case(name))
        .map_or(CommandId::Unknown, |entry| entry.id)
}

/// Returns the key layout of `id`, or `None` for [`CommandId::Unknown`].
pub fn shape_of(id: CommandId) -> Option<CommandShape> {
    TABLE.get(id as usize).map(|entry| entry.shape)
}
