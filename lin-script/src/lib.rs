//! lin-script
//!
//! Codec for the LIN script container used by the Danganronpa games:
//! a compiled script is a header, a marker-delimited instruction stream and
//! (for dialogue scripts) a trailing UTF-16 text block. This crate converts
//! between the compiled form and an editable source form, for both game
//! revisions.
//!
//! File I/O and argument parsing live in the `lin-compiler` tool; this crate
//! only ever sees in-memory buffers.

pub mod error;
pub mod opcode;
pub mod script;

mod read;
mod write;

pub use error::ScriptError;
pub use opcode::{ArgCount, Game};
pub use script::{Script, ScriptEntry, ScriptKind};
