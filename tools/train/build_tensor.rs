//! `skipper-train`: builds a tensor file from two labeled descriptor
//! corpora (class A = music, class B = talk).

use std::fs;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use log::info;

use skipper::logging::{self, Verbosity};
use skipper::trainer::{build_tensor, load_descriptors, TrainerConfig};

struct Args {
    music_path: String,
    talk_path: String,
    out_path: String,
    dimensions: u8,
    alternate: bool,
}

const USAGE: &str = "\
Usage: skipper-train MUSIC_DESCRIPTORS TALK_DESCRIPTORS -o OUT_TENSOR [options]

  -o PATH     output tensor path (required)
  -d N        dimensions to train, 1-4 (default 4)
  -x          alternate mode: only every other window per file is used for training
  -h, --help  print this message and exit
";

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<Option<Args>> {
    let _argv0 = argv.next();

    let mut positionals = Vec::new();
    let mut out_path = None;
    let mut dimensions = 4u8;
    let mut alternate = false;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{USAGE}");
                return Ok(None);
            }
            "-o" => out_path = Some(argv.next().ok_or_else(|| anyhow!("-o requires a path"))?),
            "-d" => {
                dimensions = argv
                    .next()
                    .ok_or_else(|| anyhow!("-d requires a value"))?
                    .parse()?;
            }
            "-x" => alternate = true,
            other => positionals.push(other.to_string()),
        }
    }

    if positionals.len() != 2 {
        return Err(anyhow!(
            "expected exactly two descriptor file arguments, got {}",
            positionals.len()
        ));
    }
    let out_path = out_path.ok_or_else(|| anyhow!("-o OUT_TENSOR is required"))?;

    Ok(Some(Args {
        music_path: positionals[0].clone(),
        talk_path: positionals[1].clone(),
        out_path,
        dimensions,
        alternate,
    }))
}

fn main() -> ExitCode {
    logging::init(Verbosity::Normal);
    match run() {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<()> {
    let Some(args) = parse_args(std::env::args())? else {
        return Ok(());
    };

    let music_bytes = fs::read(&args.music_path)?;
    let talk_bytes = fs::read(&args.talk_path)?;

    let music = load_descriptors(&music_bytes)?;
    let talk = load_descriptors(&talk_bytes)?;

    info!(
        "loaded {} music windows, {} talk windows",
        music.len(),
        talk.len()
    );

    let cfg = TrainerConfig {
        dimensions: args.dimensions,
        alternate: args.alternate,
    };
    let tensor = build_tensor(&music, &talk, &cfg)?;

    fs::write(&args.out_path, tensor.encode())?;
    info!("wrote tensor to {}", args.out_path);

    Ok(())
}
