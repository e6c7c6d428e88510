use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lin_script::{Game, Script};

/// danganronpa script (de)compiler
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// decompile the input file (default is compile)
    #[arg(short, long)]
    decompile: bool,

    /// game revision the opcode table is resolved against
    #[arg(short, long, default_value = "dr1")]
    game: Game,

    /// compiled .lin script, or decompiled source when compiling
    input: PathBuf,

    /// defaults to the input path with .txt (decompile) or .lin appended
    output: Option<PathBuf>,
}

fn decompile(input: &Path, output: &Path, game: Game) -> Result<()> {
    log::info!("reading compiled file...");
    let bytes = fs::read(input).with_context(|| format!("read {}", input.display()))?;
    let script = Script::from_compiled(&bytes, game)?;

    log::info!("writing decompiled file...");
    let source = script.to_source(game);
    fs::write(output, encode_source(&source))
        .with_context(|| format!("write {}", output.display()))?;

    Ok(())
}

fn compile(input: &Path, output: &Path, game: Game) -> Result<()> {
    log::info!("reading source file...");
    let raw = fs::read(input).with_context(|| format!("read {}", input.display()))?;
    let script = Script::from_source(&decode_source(&raw), game)?;

    log::info!("writing compiled file...");
    let data = script.to_compiled()?;
    fs::write(output, &data).with_context(|| format!("write {}", output.display()))?;

    Ok(())
}

/// Source files live on disk as UTF-16. A BOM switches the decoder; without
/// one, little-endian is assumed.
fn decode_source(raw: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_16LE.decode(raw);
    if had_errors {
        log::warn!("source file contains invalid UTF-16");
    }
    text.into_owned()
}

fn encode_source(text: &str) -> Vec<u8> {
    let mut raw = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        raw.extend_from_slice(&unit.to_le_bytes());
    }
    raw
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let output = args.output.clone().unwrap_or_else(|| {
        let mut name = args.input.clone().into_os_string();
        name.push(if args.decompile { ".txt" } else { ".lin" });
        PathBuf::from(name)
    });

    if args.decompile {
        decompile(&args.input, &output, args.game)
    } else {
        compile(&args.input, &output, args.game)
    }
}
