//! Per-sample wiring: input conditioning, the window analyzer, the
//! tensor-backed scorer, the hysteresis classifier, and the segment
//! splicer, driven one sample at a time from [`crate::pcm`].

use anyhow::Result;
use log::{debug, info};

use crate::pcm::{self, DebugChannel};

use super::biquad::Biquad;
use super::classifier::{Classifier, Mode as ClassMode};
use super::dither::Dither;
use super::envelope_ring::EnvelopeRing;
use super::splicer::Splicer;
use super::tensor::Tensor;
use super::window::WindowAnalyzer;

const WINDOW_SECONDS: f64 = 5.0;
const AVERAGE_SECONDS: f64 = 5.0; // AVERAGE_COUNT * STEP_SECONDS
const CROSSFADE_SECONDS: f64 = 2.0;
const OUTPUT_SECONDS: f64 = 120.0;
const BACKLOG_LIMIT_SECS: f64 = 60.0;
const PREWARM_SECONDS: f64 = 6.0;

/// Which class(es) get elided from the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipMode {
    PassAll,
    SkipMusic,
    SkipTalk,
    SkipAll,
}

pub struct PipelineConfig {
    pub rate: u32,
    pub threshold: i32,
    pub skip_mode: SkipMode,
    pub keep_alive: bool,
    pub left_override: DebugChannel,
    pub right_override: DebugChannel,
}

pub struct Pipeline {
    rate: u32,
    skip_mode: SkipMode,
    left_override: DebugChannel,
    right_override: DebugChannel,

    dither: Dither,
    hpf: Biquad,
    lpf: Biquad,
    envelope: EnvelopeRing,
    window: WindowAnalyzer,
    tensor: Tensor,
    classifier: Classifier,
    splicer: Splicer,

    num_samples: u64,
    confirmed_sample: u64,
    since_flush: u64,
    last_score: i32,

    analysis_records: Vec<super::descriptor::Descriptor>,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig, tensor: Tensor) -> Self {
        let mut hpf = Biquad::new();
        hpf.update_hpf(250.0, 0.707, cfg.rate as f32);
        let mut lpf = Biquad::new();
        lpf.update_lpf(2000.0, 0.707, cfg.rate as f32);

        let envelope_len = ((cfg.rate as f64) * 0.050).round().max(1.0) as usize;

        let mut pipeline = Self {
            rate: cfg.rate,
            skip_mode: cfg.skip_mode,
            left_override: cfg.left_override,
            right_override: cfg.right_override,
            dither: Dither::new(),
            hpf,
            lpf,
            envelope: EnvelopeRing::new(envelope_len),
            window: WindowAnalyzer::new(cfg.rate),
            tensor,
            classifier: Classifier::new(cfg.rate, cfg.threshold, WINDOW_SECONDS, AVERAGE_SECONDS),
            splicer: Splicer::new(cfg.rate, OUTPUT_SECONDS, CROSSFADE_SECONDS, cfg.keep_alive),
            num_samples: 0,
            confirmed_sample: 0,
            since_flush: 0,
            last_score: 0,
            analysis_records: Vec::new(),
        };

        pipeline.prewarm();
        pipeline
    }

    /// Feeds six seconds of filtered dither noise through the envelope
    /// ring before any real sample arrives, so the first real window's
    /// envelope isn't contaminated by a run of zeros.
    fn prewarm(&mut self) {
        let n = (self.rate as f64 * PREWARM_SECONDS).round() as usize;
        for _ in 0..n {
            let noise = self.dither.next_sample();
            let filtered = self.lpf.process(self.hpf.process(noise));
            self.envelope.push(filtered);
        }
    }

    fn is_skipped(&self, mode: ClassMode) -> bool {
        matches!(
            (self.skip_mode, mode),
            (SkipMode::SkipAll, _)
                | (SkipMode::SkipMusic, ClassMode::Music)
                | (SkipMode::SkipTalk, ClassMode::Talk)
        )
    }

    /// Processes one mono (already downmixed) input sample alongside its
    /// stereo output frame candidate, returning any PCM this step produced.
    pub fn process_sample(
        &mut self,
        mono: f32,
        stereo_frame: (i16, i16),
        out: &mut Vec<i16>,
    ) -> Result<()> {
        self.num_samples += 1;

        let dithered = mono + self.dither.next_sample();
        let filtered = self.lpf.process(self.hpf.process(dithered));
        let energy = self.envelope.push(filtered);

        let left = pcm::debug_override(
            self.left_override,
            stereo_frame.0,
            mono,
            filtered,
            energy,
            self.last_score,
        );
        let right = pcm::debug_override(
            self.right_override,
            stereo_frame.1,
            mono,
            filtered,
            energy,
            self.last_score,
        );
        self.splicer.push_frame((left, right));
        self.splicer.set_skipping(self.is_skipped(self.classifier.mode()));

        if let Some(descriptor) = self.window.push(energy) {
            self.analysis_records.push(descriptor);
            let score = self.tensor.score(&descriptor);
            self.last_score = score;
            debug!("window score {score} at sample {}", self.num_samples);

            // A transition is only a splice boundary when it actually
            // crosses into or out of a skipped class; NONE->kept,
            // kept->kept, and every transition in pass-all mode must
            // leave the output ring untouched.
            let prev_skipped = self.is_skipped(self.classifier.mode());
            if let Some(transition) = self.classifier.push_score(score, self.num_samples) {
                info!(
                    "confirmed transition to {:?} at sample {}",
                    transition.new_mode, transition.transition_sample
                );
                let new_skipped = self.is_skipped(transition.new_mode);
                if prev_skipped != new_skipped {
                    let output_index = self.splicer.len() as i64;
                    let audio_offset = transition.transition_sample as i64
                        - self.num_samples as i64
                        + output_index;
                    self.splicer.on_transition(audio_offset, new_skipped, out)?;
                }
                self.splicer.set_skipping(new_skipped);
            }
        }

        if !self.classifier.has_pending() {
            let offset = ((WINDOW_SECONDS + AVERAGE_SECONDS) * self.rate as f64 / 2.0
                + 0.1 * self.rate as f64
                + CROSSFADE_SECONDS * self.rate as f64 / 2.0) as u64;
            self.confirmed_sample = self.num_samples.saturating_sub(offset);
        }

        self.since_flush += 1;
        let backlog_limit = (BACKLOG_LIMIT_SECS * self.rate as f64) as u64;
        let should_flush = self.splicer.is_full()
            || self.confirmed_sample + backlog_limit <= self.num_samples;

        if should_flush {
            let step_len = self.window.step_len() as u64;
            let available = self
                .confirmed_sample
                .saturating_sub(self.num_samples - self.splicer.len() as u64)
                .saturating_add(step_len / 2) as usize;
            if available > 0 {
                self.splicer.flush(available, out);
            }
            self.since_flush = 0;
        }

        Ok(())
    }

    /// Drains whatever remains in the splicer on EOF.
    pub fn drain(&mut self, out: &mut Vec<i16>) {
        let remaining = self.splicer.len();
        self.splicer.flush(remaining, out);
    }

    pub fn analysis_records(&self) -> &[super::descriptor::Descriptor] {
        &self.analysis_records
    }

    pub fn samples_written(&self) -> u64 {
        self.splicer.samples_written
    }

    pub fn samples_discarded(&self) -> u64 {
        self.splicer.samples_discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_passes_through() {
        let tensor = Tensor::zeroed();
        let cfg = PipelineConfig {
            rate: 1000,
            threshold: 10,
            skip_mode: SkipMode::PassAll,
            keep_alive: false,
            left_override: DebugChannel::Normal,
            right_override: DebugChannel::Normal,
        };
        let mut p = Pipeline::new(cfg, tensor);
        let mut out = Vec::new();
        for _ in 0..2000 {
            p.process_sample(0.0, (0, 0), &mut out).unwrap();
        }
        p.drain(&mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn left_override_replaces_channel_at_enqueue() {
        let tensor = Tensor::zeroed();
        let cfg = PipelineConfig {
            rate: 1000,
            threshold: 10,
            skip_mode: SkipMode::PassAll,
            keep_alive: false,
            left_override: DebugChannel::Mono,
            right_override: DebugChannel::Normal,
        };
        let mut p = Pipeline::new(cfg, tensor);
        let mut out = Vec::new();
        for _ in 0..2000 {
            // Stereo input disagrees with its mono downmix so the override
            // is distinguishable from an unmodified pass-through.
            p.process_sample(1234.0, (-1, 9999), &mut out).unwrap();
        }
        p.drain(&mut out);

        assert!(!out.is_empty());
        for pair in out.chunks_exact(2) {
            assert_eq!(pair[0], 1234, "left channel should carry the mono override");
            assert_eq!(pair[1], 9999, "right channel is untouched by the override");
        }
    }

    #[test]
    fn pass_all_never_mutates_output_across_a_forced_transition() {
        let mut tensor = Tensor::zeroed();
        for h in 0..48 {
            for i in 0..24 {
                for j in 0..16 {
                    for k in 0..16 {
                        tensor.set(h, i, j, k, 90);
                    }
                }
            }
        }
        let cfg = PipelineConfig {
            rate: 1000,
            threshold: 10,
            skip_mode: SkipMode::PassAll,
            keep_alive: false,
            left_override: DebugChannel::Normal,
            right_override: DebugChannel::Normal,
        };
        let mut p = Pipeline::new(cfg, tensor);
        let mut out = Vec::new();
        let mut input = Vec::new();
        // 125 steps of 200ms-at-1kHz evidence comfortably clears the
        // 20s MIN_MUSIC_SECS dwell, so a transition is guaranteed here.
        for i in 0..30_000 {
            let s = ((i as f32 * 0.1).sin() * 5000.0) as i16;
            input.push(s);
            input.push(s);
            p.process_sample(s as f32, (s, s), &mut out).unwrap();
        }
        p.drain(&mut out);

        assert_eq!(out, input);
        assert_eq!(p.samples_discarded(), 0);
    }
}
