use crate::error::ScriptError;
use crate::opcode::TEXT_OPCODE;

/// Container flavor, as stored in the first header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Instruction stream only; the header carries just a file size.
    Textless = 1,
    /// Instruction stream plus a trailing text block.
    Text = 2,
}

impl ScriptKind {
    pub fn from_tag(tag: u32) -> Result<Self, ScriptError> {
        match tag {
            1 => Ok(ScriptKind::Textless),
            2 => Ok(ScriptKind::Text),
            other => Err(ScriptError::UnknownContainerType(other)),
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Header size the serializer emits for this flavor.
    pub fn header_size(self) -> u32 {
        match self {
            ScriptKind::Textless => 12,
            ScriptKind::Text => 16,
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub opcode: u8,
    /// Argument bytes, exactly as they appear on the wire. For the text
    /// opcode these hold the (stale) text id; the serializer assigns fresh
    /// ids and ignores them.
    pub args: Vec<u8>,
    /// Only ever present on text-opcode entries.
    pub text: Option<String>,
}

impl ScriptEntry {
    pub fn is_text(&self) -> bool {
        self.opcode == TEXT_OPCODE
    }
}

/// A fully decoded script.
///
/// Built in one pass by `from_compiled` or `from_source` and then treated as
/// read-only: serializing never mutates it. The header fields mirror
/// whatever the decoder saw; `to_compiled` recomputes all of them.
#[derive(Debug, Clone)]
pub struct Script {
    pub kind: ScriptKind,
    pub header_size: u32,
    pub file_size: u32,
    /// Offset of the text block, relative to the start of the file. For
    /// textless scripts this equals the file size.
    pub text_block_offset: u32,
    pub entries: Vec<ScriptEntry>,
    /// Number of distinct text-table entries.
    pub text_entry_count: u32,
}
