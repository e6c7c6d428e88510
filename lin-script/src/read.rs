//! Decoders: compiled container -> [`Script`], source text -> [`Script`].

use crate::error::ScriptError;
use crate::opcode::{self, ArgCount, Game, MARKER, TEXT_OPCODE};
use crate::script::{Script, ScriptEntry, ScriptKind};

/// safely read a u8 from the buffer
fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, ScriptError> {
    bytes
        .get(offset)
        .copied()
        .ok_or(ScriptError::UnexpectedEof { offset })
}

/// safely read a little-endian u32 from the buffer
fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ScriptError> {
    if offset + 4 > bytes.len() {
        return Err(ScriptError::UnexpectedEof { offset });
    }
    Ok(u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]))
}

impl Script {
    /// Parse a compiled script buffer.
    ///
    /// Layout (all little-endian u32 unless noted):
    /// - 0x00: container type (1 = textless, 2 = text)
    /// - 0x04: header size
    /// - textless: 0x08 file size (doubles as the end of the stream)
    /// - text:     0x08 text block offset, 0x0C file size (0 tolerated)
    /// - headerSize..textBlock: instructions (0x70, opcode, args)
    /// - text only: entry count, count+1 offsets, UTF-16LE blobs
    pub fn from_compiled(bytes: &[u8], game: Game) -> Result<Self, ScriptError> {
        if bytes.len() < 12 {
            return Err(ScriptError::TruncatedHeader { len: bytes.len() });
        }
        let kind = ScriptKind::from_tag(read_u32(bytes, 0x0)?)?;
        let header_size = read_u32(bytes, 0x4)?;

        let (text_block_offset, file_size) = match kind {
            ScriptKind::Textless => {
                let size = read_u32(bytes, 0x8)?;
                (size, size)
            }
            ScriptKind::Text => {
                if bytes.len() < 16 {
                    return Err(ScriptError::TruncatedHeader { len: bytes.len() });
                }
                let offset = read_u32(bytes, 0x8)?;
                let mut size = read_u32(bytes, 0xC)?;
                if size == 0 {
                    // some producers never fill in the trailing size field
                    log::debug!("stored file size is zero, using the buffer length");
                    size = bytes.len() as u32;
                }
                (offset, size)
            }
        };

        let mut script = Script {
            kind,
            header_size,
            file_size,
            text_block_offset,
            entries: Vec::new(),
            text_entry_count: 0,
        };

        log::debug!("reading script data...");
        script.entries = read_script_data(bytes, header_size, text_block_offset, game)?;

        if kind == ScriptKind::Text {
            script.text_entry_count = read_u32(bytes, text_block_offset as usize)?;
            log::debug!("reading {} text entries...", script.text_entry_count);
            read_text_entries(bytes, &mut script)?;
        }

        Ok(script)
    }

    /// Parse the editable source form.
    ///
    /// Entries look like `Name(1, 2, 3)`; whatever sits between the
    /// parentheses of a `Text(...)` entry is taken verbatim, quotes and
    /// escapes included.
    pub fn from_source(source: &str, game: Game) -> Result<Self, ScriptError> {
        let mut kind = ScriptKind::Textless;
        let mut entries = Vec::new();
        let mut text_entry_count = 0u32;

        let mut chars = source.chars().peekable();
        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if chars.peek().is_none() {
                break;
            }

            let mut name = String::new();
            let mut saw_open = false;
            for c in chars.by_ref() {
                if c == '(' {
                    saw_open = true;
                    break;
                }
                name.push(c);
            }
            let opcode = opcode::get_opcode(name.trim(), game)?;
            if !saw_open {
                break;
            }

            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let mut payload = String::new();
            for c in chars.by_ref() {
                if c == ')' {
                    break;
                }
                payload.push(c);
            }

            if opcode == TEXT_OPCODE {
                kind = ScriptKind::Text;
                text_entry_count += 1;
                entries.push(ScriptEntry {
                    opcode,
                    args: vec![0, 0],
                    text: Some(payload),
                });
            } else {
                let mut args = Vec::new();
                let trimmed = payload.trim();
                if !trimmed.is_empty() {
                    for token in trimmed.split(',') {
                        let token = token.trim();
                        let value = token
                            .parse::<u8>()
                            .map_err(|_| ScriptError::MalformedToken(token.to_string()))?;
                        args.push(value);
                    }
                }
                entries.push(ScriptEntry {
                    opcode,
                    args,
                    text: None,
                });
            }
        }

        Ok(Script {
            kind,
            header_size: 0,
            file_size: 0,
            text_block_offset: 0,
            entries,
            text_entry_count,
        })
    }
}

fn read_script_data(
    bytes: &[u8],
    header_size: u32,
    text_block_offset: u32,
    game: Game,
) -> Result<Vec<ScriptEntry>, ScriptError> {
    let end = text_block_offset as usize;
    if end > bytes.len() {
        return Err(ScriptError::UnexpectedEof { offset: end });
    }

    let mut entries = Vec::new();
    let mut offset = header_size as usize;
    while offset < end {
        if bytes[offset] != MARKER {
            // the stream may stop short of the text block; whatever is left
            // must be alignment padding
            while offset < end {
                if bytes[offset] != 0x00 {
                    return Err(ScriptError::UnexpectedByte {
                        offset,
                        byte: bytes[offset],
                    });
                }
                offset += 1;
            }
            break;
        }
        offset += 1;

        let op = read_u8(bytes, offset)?;
        offset += 1;

        let args = match opcode::get_arg_count(op, game) {
            Some(ArgCount::Fixed(count)) => {
                let arg_end = offset + count as usize;
                if arg_end > bytes.len() {
                    return Err(ScriptError::UnexpectedEof { offset: bytes.len() });
                }
                let args = bytes[offset..arg_end].to_vec();
                offset = arg_end;
                args
            }
            // Unknown opcodes get the same treatment as variable-length
            // ones. The scan stops at the first 0x70 even when that byte is
            // argument data; shipped scripts depend on this exact behavior.
            Some(ArgCount::Variable) | None => {
                let start = offset;
                while offset < end && bytes[offset] != MARKER {
                    offset += 1;
                }
                bytes[start..offset].to_vec()
            }
        };

        entries.push(ScriptEntry {
            opcode: op,
            args,
            text: None,
        });
    }

    Ok(entries)
}

fn read_text_entries(bytes: &[u8], script: &mut Script) -> Result<(), ScriptError> {
    let base = script.text_block_offset as usize;
    let count = script.text_entry_count;

    // entry count, then count + 1 offsets (all relative to the block start)
    let table_end = base + 4 + (count as usize + 1) * 4;
    if table_end > bytes.len() {
        return Err(ScriptError::UnexpectedEof { offset: table_end });
    }
    let mut offsets = Vec::with_capacity(count as usize + 1);
    for i in 0..=count as usize {
        offsets.push(read_u32(bytes, base + 4 + i * 4)?);
    }

    for entry in &mut script.entries {
        if entry.opcode != TEXT_OPCODE {
            continue;
        }
        let id = u16::from_be_bytes([entry.args[0], entry.args[1]]) as u32;
        if id >= count {
            return Err(ScriptError::TextIdOutOfRange { id, count });
        }

        let start = offsets[id as usize] as usize;
        // the table's final offset is ignored for the last entry; its text
        // runs to the declared end of file, padding included
        let end = if id + 1 == count {
            (script.file_size as usize).saturating_sub(base)
        } else {
            offsets[id as usize + 1] as usize
        };

        let lo = base + start;
        let hi = base + end;
        if lo > hi || hi > bytes.len() {
            return Err(ScriptError::UnexpectedEof { offset: hi });
        }

        entry.text = Some(decode_utf16le(&bytes[lo..hi]));
    }

    Ok(())
}

/// BOM and NUL terminators are kept; the serializer relies on seeing them.
fn decode_utf16le(raw: &[u8]) -> String {
    let (text, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(raw);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_whitespace_is_forgiving() {
        let script = Script::from_source("  Sprite ( 1 , 2 , 3 , 4 , 5 )\n\nWaitInput()", Game::Base)
            .unwrap();
        assert_eq!(script.entries.len(), 2);
        assert_eq!(script.entries[0].opcode, 0x1E);
        assert_eq!(script.entries[0].args, vec![1, 2, 3, 4, 5]);
        assert_eq!(script.entries[1].opcode, 0x3A);
        assert!(script.entries[1].args.is_empty());
    }

    #[test]
    fn source_text_payload_is_taken_verbatim() {
        let script = Script::from_source("Text(\"Hi\\n\")", Game::Base).unwrap();
        assert_eq!(script.kind, ScriptKind::Text);
        assert_eq!(script.text_entry_count, 1);
        // quotes and escapes pass straight through
        assert_eq!(script.entries[0].text.as_deref(), Some("\"Hi\\n\""));
        assert_eq!(script.entries[0].args, vec![0, 0]);
    }

    #[test]
    fn source_rejects_bad_tokens() {
        assert!(matches!(
            Script::from_source("Bogus(1)", Game::Base),
            Err(ScriptError::MalformedToken(_))
        ));
        assert!(matches!(
            Script::from_source("Sprite(1, x, 3, 4, 5)", Game::Base),
            Err(ScriptError::MalformedToken(_))
        ));
        assert!(matches!(
            Script::from_source("Speaker(256)", Game::Base),
            Err(ScriptError::MalformedToken(_))
        ));
    }
}
