use thiserror::Error;

/// Failures surfaced by the codec.
///
/// Every variant is terminal: a failed decode or encode produces no partial
/// output.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("truncated header: file is only {len} bytes")]
    TruncatedHeader { len: usize },

    #[error("unknown script type: {0}")]
    UnknownContainerType(u32),

    #[error("expected 0x70, got 0x{byte:02X} at offset 0x{offset:X}")]
    UnexpectedByte { offset: usize, byte: u8 },

    #[error("text id {id} out of range ({count} entries)")]
    TextIdOutOfRange { id: u32, count: u32 },

    #[error("malformed token: {0:?}")]
    MalformedToken(String),

    #[error("script type does not match the script data")]
    InvalidContainerType,

    #[error("unexpected end of file at offset 0x{offset:X}")]
    UnexpectedEof { offset: usize },
}
