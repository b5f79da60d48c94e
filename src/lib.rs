//! MUSIC/TALK streaming classifier and splicer.
//!
//! The crate exposes the DSP pipeline, CLI parsing, PCM framing, offline
//! tensor trainer, and logging setup shared by the `skipper` and
//! `skipper-train` binaries.

pub mod cli;
pub mod dsp;
pub mod logging;
pub mod pcm;
pub mod trainer;
