//! Raw PCM framing: reading interleaved 16-bit input blocks and writing
//! the always-stereo 16-bit output.

use std::io::{Read, Write};

use anyhow::{bail, Result};

/// Per-channel debug override selector, evaluated at sample enqueue time
/// so the splicer and crossfade logic never need to know a channel was
/// substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugChannel {
    Normal,
    Mono,
    Filtered,
    Level,
    Tensor,
}

impl DebugChannel {
    pub fn from_flag(n: i32) -> Result<Self> {
        Ok(match n {
            1 => DebugChannel::Mono,
            2 => DebugChannel::Filtered,
            3 => DebugChannel::Level,
            4 => DebugChannel::Tensor,
            other => bail!("invalid debug channel override {other} (expected 1-4)"),
        })
    }
}

/// One second of audio per read, matching the input stage's documented
/// block size.
pub fn block_frames(rate: u32) -> usize {
    rate as usize
}

/// Reads up to `max_frames` interleaved frames of `channels` samples each.
/// Returns fewer than `max_frames` only at EOF.
pub fn read_block<R: Read>(
    reader: &mut R,
    channels: u16,
    max_frames: usize,
) -> Result<Vec<i16>> {
    let mut buf = vec![0u8; max_frames * channels as usize * 2];
    let mut total_read = 0usize;

    loop {
        match reader.read(&mut buf[total_read..]) {
            Ok(0) => break,
            Ok(n) => {
                total_read += n;
                if total_read == buf.len() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if total_read % 2 != 0 {
        bail!("truncated PCM input: odd byte count {total_read}");
    }

    let samples = total_read / 2;
    let mut out = Vec::with_capacity(samples);
    for chunk in buf[..total_read].chunks_exact(2).take(samples) {
        out.push(i16::from_le_bytes([chunk[0], chunk[1]]));
    }
    Ok(out)
}

/// Downmixes one interleaved frame to mono: stereo is summed then halved,
/// mono passes through unchanged.
#[inline]
pub fn downmix(frame: &[i16]) -> f32 {
    match frame.len() {
        1 => frame[0] as f32,
        2 => (frame[0] as f32 + frame[1] as f32) / 2.0,
        n => panic!("unsupported channel count {n}"),
    }
}

/// Picks the normal stereo output frame: left = input channel 0,
/// right = input's last channel (duplicated for mono input).
#[inline]
pub fn normal_stereo_frame(frame: &[i16]) -> (i16, i16) {
    let left = frame[0];
    let right = frame[frame.len() - 1];
    (left, right)
}

/// Applies a debug channel override, replacing the selected side with a
/// diagnostic signal instead of the normal PCM passthrough value.
pub fn debug_override(
    channel: DebugChannel,
    normal: i16,
    mono: f32,
    filtered: f32,
    energy: f32,
    tensor_score: i32,
) -> i16 {
    use crate::dsp::utils::saturate_i16;
    match channel {
        DebugChannel::Normal => normal,
        DebugChannel::Mono => saturate_i16(mono),
        DebugChannel::Filtered => saturate_i16(filtered),
        DebugChannel::Level => saturate_i16(energy.sqrt()),
        DebugChannel::Tensor => saturate_i16(tensor_score as f32 * 300.0),
    }
}

pub fn write_stereo<W: Write>(writer: &mut W, samples: &[i16]) -> Result<()> {
    let mut buf = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }
    writer.write_all(&buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo() {
        assert_eq!(downmix(&[100, 200]), 150.0);
    }

    #[test]
    fn downmix_passes_mono() {
        assert_eq!(downmix(&[42]), 42.0);
    }

    #[test]
    fn normal_frame_duplicates_mono() {
        assert_eq!(normal_stereo_frame(&[7]), (7, 7));
    }

    #[test]
    fn normal_frame_keeps_stereo_sides() {
        assert_eq!(normal_stereo_frame(&[1, 2]), (1, 2));
    }

    #[test]
    fn read_block_handles_short_eof_read() {
        let data: Vec<u8> = (0..20u8).collect();
        let mut cursor = std::io::Cursor::new(data);
        let frames = read_block(&mut cursor, 2, 100).unwrap();
        assert_eq!(frames.len(), 10);
    }
}
