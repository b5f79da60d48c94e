//! Command-line configuration.
//!
//! Flags are parsed by hand in a single pass over `std::env::args()`,
//! matching how small single-purpose audio CLIs in this codebase's
//! lineage avoid pulling in a parsing framework for a dozen flags.

use anyhow::{bail, Result};

use crate::dsp::SkipMode;
use crate::logging::Verbosity;
use crate::pcm::DebugChannel;

pub struct Config {
    pub analysis_path: Option<String>,
    pub channels: u16,
    pub tensor_path: String,
    pub keep_alive: bool,
    pub left_override: DebugChannel,
    pub right_override: DebugChannel,
    pub skip_mode: SkipMode,
    pub threshold: i32,
    pub rate: u32,
    pub verbosity: Verbosity,
}

const DEFAULT_THRESHOLD: i32 = 0;
const DEFAULT_RATE: u32 = 44100;
const MIN_RATE: u32 = 11025;
const MAX_RATE: u32 = 96000;

const USAGE: &str = "\
Usage: skipper -d TENSOR [options]

  -a PATH       write descriptor stream to PATH
  -c N          channel count override (1 or 2)
  -d PATH       tensor file to load (required)
  -k            keep-alive crossfades during long skips
  -l N, -r N    left/right debug channel override (1=mono, 2=filtered, 3=level, 4=tensor)
  -m[+-N]       skip MUSIC, optional threshold
  -t[+-N]       skip TALK, optional threshold (sign inverted relative to -m)
  -n            skip everything
  -p            pass all (default)
  -q            quiet
  -s N          sample rate override
  -v[N]         verbose; optional progress period in seconds
  -h, --help    print this message and exit
";

/// Returns `Ok(None)` when `-h`/`--help` was requested (caller should
/// print usage and exit 0 without doing anything else).
pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Config>> {
    let _argv0 = args.next();

    let mut analysis_path = None;
    let mut channels: u16 = 2;
    let mut tensor_path: Option<String> = None;
    let mut keep_alive = false;
    let mut left_override = DebugChannel::Normal;
    let mut right_override = DebugChannel::Normal;
    let mut skip_mode = SkipMode::PassAll;
    let mut threshold = DEFAULT_THRESHOLD;
    let mut rate = DEFAULT_RATE;
    let mut quiet = false;
    let mut verbose = false;
    let mut progress_period: u64 = 0;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{USAGE}");
                return Ok(None);
            }
            "-a" => analysis_path = Some(require_value(&mut args, "-a")?),
            "-c" => {
                let n: u16 = require_value(&mut args, "-c")?.parse()?;
                if n != 1 && n != 2 {
                    bail!("-c expects 1 or 2, got {n}");
                }
                channels = n;
            }
            "-d" => tensor_path = Some(require_value(&mut args, "-d")?),
            "-k" => keep_alive = true,
            "-l" => {
                let n: i32 = require_value(&mut args, "-l")?.parse()?;
                left_override = DebugChannel::from_flag(n)?;
            }
            "-r" => {
                let n: i32 = require_value(&mut args, "-r")?.parse()?;
                right_override = DebugChannel::from_flag(n)?;
            }
            "-n" => skip_mode = SkipMode::SkipAll,
            "-p" => skip_mode = SkipMode::PassAll,
            "-q" => quiet = true,
            "-s" => {
                let n: u32 = require_value(&mut args, "-s")?.parse()?;
                if !(MIN_RATE..=MAX_RATE).contains(&n) {
                    bail!("-s expects a rate in [{MIN_RATE}, {MAX_RATE}], got {n}");
                }
                rate = n;
            }
            flag if flag.starts_with("-m") => {
                skip_mode = SkipMode::SkipMusic;
                if flag.len() > 2 {
                    threshold = flag[2..].parse()?;
                }
            }
            flag if flag.starts_with("-t") => {
                skip_mode = SkipMode::SkipTalk;
                if flag.len() > 2 {
                    threshold = -flag[2..].parse::<i32>()?;
                }
            }
            flag if flag.starts_with("-v") => {
                verbose = true;
                if flag.len() > 2 {
                    progress_period = flag[2..].parse()?;
                }
            }
            other => bail!("unrecognized flag {other}"),
        }
    }

    let Some(tensor_path) = tensor_path else {
        bail!("-d TENSOR is required");
    };

    let verbosity = if quiet {
        Verbosity::Quiet
    } else if verbose {
        Verbosity::Verbose {
            progress_period_secs: progress_period,
        }
    } else {
        Verbosity::Normal
    };

    Ok(Some(Config {
        analysis_path,
        channels,
        tensor_path,
        keep_alive,
        left_override,
        right_override,
        skip_mode,
        threshold,
        rate,
        verbosity,
    }))
}

fn require_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> impl Iterator<Item = String> + use<'_> {
        std::iter::once("skipper".to_string()).chain(s.split_whitespace().map(String::from))
    }

    #[test]
    fn requires_tensor_path() {
        let result = parse(argv(""));
        assert!(result.is_err());
    }

    #[test]
    fn parses_minimal_config() {
        let cfg = parse(argv("-d tensor.bin")).unwrap().unwrap();
        assert_eq!(cfg.tensor_path, "tensor.bin");
        assert_eq!(cfg.rate, DEFAULT_RATE);
    }

    #[test]
    fn parses_music_skip_with_threshold() {
        let cfg = parse(argv("-d t.bin -m+15")).unwrap().unwrap();
        assert!(matches!(cfg.skip_mode, SkipMode::SkipMusic));
        assert_eq!(cfg.threshold, 15);
    }

    #[test]
    fn parses_talk_skip_inverts_sign() {
        let cfg = parse(argv("-d t.bin -t15")).unwrap().unwrap();
        assert!(matches!(cfg.skip_mode, SkipMode::SkipTalk));
        assert_eq!(cfg.threshold, -15);
    }

    #[test]
    fn help_short_circuits() {
        let cfg = parse(argv("-h")).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn rejects_out_of_range_rate() {
        assert!(parse(argv("-d t.bin -s 500")).is_err());
    }

    #[test]
    fn parses_debug_channel_overrides() {
        let cfg = parse(argv("-d t.bin -l 2 -r 4")).unwrap().unwrap();
        assert!(matches!(cfg.left_override, DebugChannel::Filtered));
        assert!(matches!(cfg.right_override, DebugChannel::Tensor));
    }

    #[test]
    fn rejects_out_of_range_debug_channel() {
        assert!(parse(argv("-d t.bin -l 9")).is_err());
    }
}
