use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::error::ScriptError;

/// Byte that prefixes every instruction in the compiled stream.
pub const MARKER: u8 = 0x70;

/// The one opcode whose two argument bytes are a big-endian text-table id
/// instead of opaque data.
pub const TEXT_OPCODE: u8 = 0x02;

/// Game revision an opcode table is resolved against.
///
/// Danganronpa 2 redefines a subset of the base table; everything it does not
/// redefine falls through to the base entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Game {
    #[default]
    Base = 0,
    Danganronpa2 = 1,
}

impl FromStr for Game {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dr1" | "base" | "danganronpa1" => Ok(Game::Base),
            "dr2" | "danganronpa2" => Ok(Game::Danganronpa2),
            _ => Err(anyhow::anyhow!("unknown game revision")),
        }
    }
}

/// How many argument bytes an opcode consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCount {
    Fixed(u8),
    /// Arguments run up to the next marker byte.
    Variable,
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDef {
    pub opcode: u8,
    pub name: Option<&'static str>,
    pub args: ArgCount,
}

const fn op(opcode: u8, name: Option<&'static str>, args: ArgCount) -> OpcodeDef {
    OpcodeDef { opcode, name, args }
}

use ArgCount::{Fixed, Variable};

/// Opcode layout of the base revision (Danganronpa 1).
static BASE_DEFS: &[OpcodeDef] = &[
    op(0x00, None, Fixed(2)),
    op(0x01, None, Fixed(3)),
    op(0x02, Some("Text"), Fixed(2)),
    op(0x03, None, Fixed(1)),
    op(0x04, None, Fixed(4)),
    op(0x05, Some("Movie"), Fixed(2)),
    op(0x06, None, Fixed(8)),
    op(0x08, Some("Voice"), Fixed(5)),
    op(0x09, Some("Music"), Fixed(3)),
    op(0x0A, Some("Sound"), Fixed(3)),
    op(0x0B, None, Fixed(2)),
    op(0x0C, None, Fixed(2)),
    op(0x0D, None, Fixed(3)),
    op(0x0E, None, Fixed(2)),
    op(0x0F, None, Fixed(3)),
    op(0x10, None, Fixed(3)),
    op(0x11, None, Fixed(4)),
    op(0x14, None, Fixed(3)),
    op(0x15, None, Fixed(3)),
    op(0x19, Some("LoadScript"), Fixed(3)),
    op(0x1A, None, Fixed(0)),
    op(0x1B, None, Fixed(3)),
    op(0x1C, None, Fixed(0)),
    op(0x1E, Some("Sprite"), Fixed(5)),
    op(0x1F, None, Fixed(7)),
    op(0x20, None, Fixed(5)),
    op(0x21, Some("Speaker"), Fixed(1)),
    op(0x22, None, Fixed(3)),
    op(0x23, None, Fixed(5)),
    op(0x25, None, Fixed(2)),
    op(0x26, None, Fixed(3)),
    op(0x27, None, Fixed(1)),
    op(0x29, None, Fixed(1)),
    op(0x2A, None, Fixed(2)),
    op(0x2B, None, Fixed(1)),
    op(0x2C, None, Fixed(2)),
    op(0x2E, None, Fixed(2)),
    op(0x2F, None, Fixed(10)),
    op(0x30, None, Fixed(3)),
    op(0x32, None, Fixed(1)),
    op(0x33, None, Fixed(4)),
    op(0x34, None, Fixed(2)),
    op(0x38, None, Fixed(5)),
    op(0x39, None, Fixed(5)),
    op(0x3A, Some("WaitInput"), Fixed(0)),
    op(0x3B, Some("WaitFrame"), Fixed(0)),
    op(0x3C, None, Fixed(0)),
    // recognized by name everywhere, but only DR2 defines its layout
    op(0x4B, Some("WaitInputDR2"), Variable),
    op(0x4C, Some("WaitFrameDR2"), Fixed(0)),
    op(0x4D, None, Fixed(0)),
];

/// Danganronpa 2 overrides. Unnamed entries keep the base name (if any); note
/// that 0x3A/0x3B and 0x4B/0x4C swap roles, so the same symbolic name does
/// not map to the same byte in both revisions.
static DR2_DEFS: &[OpcodeDef] = &[
    op(0x01, None, Fixed(4)),
    op(0x14, None, Fixed(6)),
    op(0x15, None, Fixed(4)),
    op(0x19, None, Fixed(5)),
    op(0x1B, None, Fixed(5)),
    op(0x29, None, Fixed(13)),
    op(0x2A, None, Fixed(12)),
    op(0x2E, None, Fixed(5)),
    op(0x30, None, Fixed(2)),
    op(0x34, None, Fixed(1)),
    op(0x3A, Some("WaitInputDR2"), Fixed(4)),
    op(0x3B, Some("WaitFrameDR2"), Fixed(2)),
    op(0x4B, Some("WaitInput"), Fixed(0)),
    op(0x4C, Some("WaitFrame"), Fixed(0)),
];

struct OpcodeTable {
    by_opcode: HashMap<u8, &'static OpcodeDef>,
    by_name: HashMap<&'static str, u8>,
}

impl OpcodeTable {
    fn build(defs: &'static [OpcodeDef]) -> Self {
        let mut by_opcode = HashMap::new();
        let mut by_name = HashMap::new();
        for def in defs {
            by_opcode.insert(def.opcode, def);
            if let Some(name) = def.name {
                by_name.insert(name, def.opcode);
            }
        }
        Self { by_opcode, by_name }
    }
}

static BASE_TABLE: Lazy<OpcodeTable> = Lazy::new(|| OpcodeTable::build(BASE_DEFS));
static DR2_TABLE: Lazy<OpcodeTable> = Lazy::new(|| OpcodeTable::build(DR2_DEFS));

impl Game {
    fn overrides(self) -> Option<&'static OpcodeTable> {
        match self {
            Game::Base => None,
            Game::Danganronpa2 => Some(&DR2_TABLE),
        }
    }
}

/// Symbolic name of an opcode under the given revision, falling back to the
/// base table and finally to the `0xXX` literal form. Never fails.
pub fn get_op_name(opcode: u8, game: Game) -> String {
    if let Some(table) = game.overrides() {
        if let Some(name) = table.by_opcode.get(&opcode).and_then(|def| def.name) {
            return name.to_string();
        }
    }
    match BASE_TABLE.by_opcode.get(&opcode).and_then(|def| def.name) {
        Some(name) => name.to_string(),
        None => format!("0x{opcode:02X}"),
    }
}

/// Inverse of [`get_op_name`]: the revision's name table wins over the base
/// one, and anything else must be a `0xXX` hex literal.
pub fn get_opcode(name: &str, game: Game) -> Result<u8, ScriptError> {
    if let Some(table) = game.overrides() {
        if let Some(&opcode) = table.by_name.get(name) {
            return Ok(opcode);
        }
    }
    if let Some(&opcode) = BASE_TABLE.by_name.get(name) {
        return Ok(opcode);
    }
    let digits = name
        .strip_prefix("0x")
        .or_else(|| name.strip_prefix("0X"))
        .ok_or_else(|| ScriptError::MalformedToken(name.to_string()))?;
    u8::from_str_radix(digits, 16).map_err(|_| ScriptError::MalformedToken(name.to_string()))
}

/// Argument byte count for an opcode, revision table first, then base.
/// `None` means the opcode is unknown to both; the decoder treats that the
/// same as [`ArgCount::Variable`].
pub fn get_arg_count(opcode: u8, game: Game) -> Option<ArgCount> {
    if let Some(table) = game.overrides() {
        if let Some(def) = table.by_opcode.get(&opcode) {
            return Some(def.args);
        }
    }
    BASE_TABLE.by_opcode.get(&opcode).map(|def| def.args)
}
