//! Serializers: [`Script`] -> compiled container, [`Script`] -> source text.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ScriptError;
use crate::opcode::{self, Game, MARKER, TEXT_OPCODE};
use crate::script::{Script, ScriptKind};

impl Script {
    /// Render the editable source form, one `Name(payload)` entry per line.
    ///
    /// Text payloads are stripped of trailing NULs, escaped (`\`, `"`, CR,
    /// LF) and wrapped in quotes; all other payloads are the argument bytes
    /// as decimal values.
    pub fn to_source(&self, game: Game) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&opcode::get_op_name(entry.opcode, game));
            if entry.opcode == TEXT_OPCODE {
                let mut text = entry.text.as_deref().unwrap_or("");
                while let Some(stripped) = text.strip_suffix('\0') {
                    text = stripped;
                }
                out.push_str("(\"");
                for c in text.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        '\r' => out.push_str("\\r"),
                        '\n' => out.push_str("\\n"),
                        c => out.push(c),
                    }
                }
                out.push_str("\")");
            } else {
                let args: Vec<String> = entry.args.iter().map(u8::to_string).collect();
                out.push('(');
                out.push_str(&args.join(", "));
                out.push(')');
            }
            out.push('\n');
        }
        out
    }

    /// Serialize back into the compiled container.
    ///
    /// Header sizes, offsets, text ids and the file size are all recomputed;
    /// nothing decoded from a previous container survives except the entry
    /// order, argument bytes and text content. The model itself is not
    /// touched: fresh text ids live in a side table for the duration of the
    /// call.
    pub fn to_compiled(&self) -> Result<Bytes, ScriptError> {
        if self.kind == ScriptKind::Textless
            && self.entries.iter().any(|e| e.is_text() || e.text.is_some())
        {
            return Err(ScriptError::InvalidContainerType);
        }

        let mut file = BytesMut::new();
        file.put_u32_le(self.kind.tag());
        file.put_u32_le(self.kind.header_size());
        // size fields, patched once the stream and text block are laid out
        file.put_u32_le(0);
        if self.kind == ScriptKind::Text {
            file.put_u32_le(0);
        }

        // phase 1: fresh ids in encounter order; stale ids in the argument
        // bytes are ignored
        let mut text_data: BTreeMap<u32, &str> = BTreeMap::new();
        let mut assigned: Vec<Option<u32>> = vec![None; self.entries.len()];
        let mut next_id = 0u32;
        if self.kind == ScriptKind::Text {
            for (index, entry) in self.entries.iter().enumerate() {
                if !entry.is_text() {
                    continue;
                }
                text_data.insert(next_id, entry.text.as_deref().unwrap_or(""));
                assigned[index] = Some(next_id);
                next_id += 1;
            }
        }
        let text_entry_count = text_data
            .keys()
            .next_back()
            .map(|&id| id + 1)
            .unwrap_or(0)
            .max(next_id);

        // phase 2: the instruction stream
        for (index, entry) in self.entries.iter().enumerate() {
            file.put_u8(MARKER);
            file.put_u8(entry.opcode);
            match assigned[index] {
                // text ids are the one big-endian field in the format
                Some(id) => file.put_u16(id as u16),
                None => file.put_slice(&entry.args),
            }
        }
        while file.len() % 4 != 0 {
            file.put_u8(0);
        }

        let text_block_offset = file.len() as u32;
        file[0x8..0xC].copy_from_slice(&text_block_offset.to_le_bytes());

        if self.kind == ScriptKind::Text {
            log::debug!("writing {} text entries...", text_entry_count);
            file.put_u32_le(text_entry_count);

            let mut blobs = Vec::with_capacity(text_entry_count as usize);
            let mut total = 8 + text_entry_count * 4;
            for id in 0..text_entry_count {
                let blob = encode_text(text_data.get(&id).copied().unwrap_or(""));
                file.put_u32_le(total);
                total += blob.len() as u32;
                blobs.push(blob);
            }
            file.put_u32_le(total);
            for blob in &blobs {
                file.put_slice(blob);
            }

            while file.len() % 4 != 0 {
                file.put_u8(0);
            }
            let file_size = file.len() as u32;
            file[0xC..0x10].copy_from_slice(&file_size.to_le_bytes());
        }

        // the target runtime reads whole 1024-byte sectors
        while file.len() % 1024 != 0 {
            file.put_u8(0);
        }

        Ok(file.freeze())
    }
}

/// UTF-16LE bytes of one text-table entry: NUL-terminated, BOM-prefixed
/// unless the text already carries them.
fn encode_text(text: &str) -> Vec<u8> {
    let mut raw = Vec::with_capacity(text.len() * 2 + 4);
    if !text.starts_with('\u{FEFF}') {
        raw.extend_from_slice(&[0xFF, 0xFE]);
    }
    for unit in text.encode_utf16() {
        raw.extend_from_slice(&unit.to_le_bytes());
    }
    if !text.ends_with('\0') {
        raw.extend_from_slice(&[0x00, 0x00]);
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptEntry;

    #[test]
    fn text_blob_gets_bom_and_terminator() {
        assert_eq!(encode_text("Hi"), [0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00, 0x00, 0x00]);
        // already terminated and BOM-prefixed: passes through untouched
        assert_eq!(
            encode_text("\u{FEFF}Hi\0"),
            [0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00, 0x00, 0x00]
        );
        assert_eq!(encode_text(""), [0xFF, 0xFE, 0x00, 0x00]);
    }

    #[test]
    fn source_escapes_text_payloads() {
        let script = Script {
            kind: ScriptKind::Text,
            header_size: 0,
            file_size: 0,
            text_block_offset: 0,
            entries: vec![ScriptEntry {
                opcode: TEXT_OPCODE,
                args: vec![0, 0],
                text: Some("A\"B\\C\r\n\0\0".into()),
            }],
            text_entry_count: 1,
        };
        assert_eq!(script.to_source(Game::Base), "Text(\"A\\\"B\\\\C\\r\\n\")\n");
    }

    #[test]
    fn textless_kind_refuses_text_entries() {
        let script = Script {
            kind: ScriptKind::Textless,
            header_size: 0,
            file_size: 0,
            text_block_offset: 0,
            entries: vec![ScriptEntry {
                opcode: TEXT_OPCODE,
                args: vec![0, 0],
                text: Some("oops".into()),
            }],
            text_entry_count: 1,
        };
        assert!(matches!(
            script.to_compiled(),
            Err(ScriptError::InvalidContainerType)
        ));
    }
}
