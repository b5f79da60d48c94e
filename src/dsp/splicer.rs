//! Segment splicer and output pipeline.
//!
//! Holds a bounded ring of recent stereo output samples and, on a
//! confirmed classifier transition, either fades the about-to-be-skipped
//! material out (saving the tail for later) or fades the kept material in
//! and mixes it with whatever was saved from the matching fade-out. A
//! keep-alive mode synthesizes crossfades during long skips so downstream
//! consumers never see a gap larger than one crossfade.

use std::collections::VecDeque;

use anyhow::{bail, Result};

use super::utils::{fade_in_gain, fade_out_gain, saturate_i16};

pub struct Splicer {
    rate: u32,
    ring: VecDeque<(i16, i16)>,
    capacity: usize,
    crossfade_len: usize,
    saved_crossfade: Vec<(f32, f32)>,
    keep_alive: bool,
    skipping: bool,
    pub samples_written: u64,
    pub samples_discarded: u64,
}

impl Splicer {
    pub fn new(rate: u32, output_seconds: f64, crossfade_secs: f64, keep_alive: bool) -> Self {
        let capacity = (rate as f64 * output_seconds).round() as usize;
        let crossfade_len = (rate as f64 * crossfade_secs).round() as usize;
        Self {
            rate,
            ring: VecDeque::with_capacity(capacity),
            capacity,
            crossfade_len,
            saved_crossfade: vec![(0.0, 0.0); crossfade_len],
            keep_alive,
            skipping: false,
            samples_written: 0,
            samples_discarded: 0,
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn crossfade_len(&self) -> usize {
        self.crossfade_len
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_full(&self) -> bool {
        self.ring.len() >= self.capacity
    }

    pub fn set_skipping(&mut self, skipping: bool) {
        self.skipping = skipping;
    }

    pub fn push_frame(&mut self, frame: (i16, i16)) {
        self.ring.push_back(frame);
    }

    fn drain_write(&mut self, n: usize, out: &mut Vec<i16>) {
        for _ in 0..n {
            if let Some((l, r)) = self.ring.pop_front() {
                out.push(l);
                out.push(r);
                self.samples_written += 1;
            }
        }
    }

    fn drain_discard(&mut self, n: usize) {
        for _ in 0..n {
            if self.ring.pop_front().is_some() {
                self.samples_discarded += 1;
            }
        }
    }

    /// Handles a confirmed transition. `audio_offset` is the transition
    /// point expressed as an index into the current ring; `new_mode_skipped`
    /// tells us whether the class the run is now entering is the one being
    /// skipped (fade-out) or kept (fade-in).
    pub fn on_transition(
        &mut self,
        audio_offset: i64,
        new_mode_skipped: bool,
        out: &mut Vec<i16>,
    ) -> Result<()> {
        let crossfade_start = audio_offset - (self.crossfade_len as i64) / 2;
        if crossfade_start < 0 {
            bail!("pipeline invariant violation: transition anchor outside output ring");
        }
        let crossfade_start = crossfade_start as usize;

        if new_mode_skipped {
            self.drain_write(crossfade_start, out);

            let n = self.crossfade_len.min(self.ring.len());
            for i in 0..n {
                let (l, r) = self.ring.pop_front().unwrap();
                let g = fade_out_gain(i, self.crossfade_len);
                self.saved_crossfade[i] = (l as f32 * g, r as f32 * g);
            }
        } else {
            self.drain_discard(crossfade_start);

            let n = self.crossfade_len.min(self.ring.len());
            let mut mixed = Vec::with_capacity(n);
            for i in 0..n {
                let (l, r) = self.ring.pop_front().unwrap();
                let g = fade_in_gain(i, self.crossfade_len);
                let (sl, sr) = self.saved_crossfade.get(i).copied().unwrap_or((0.0, 0.0));
                mixed.push((
                    saturate_i16(l as f32 * g + sl),
                    saturate_i16(r as f32 * g + sr),
                ));
            }
            for (l, r) in mixed {
                out.push(l);
                out.push(r);
                self.samples_written += 1;
            }
        }

        Ok(())
    }

    /// Flushes `available` samples outside of a transition: written if the
    /// current mode is not being skipped, discarded otherwise.
    pub fn flush(&mut self, available: usize, out: &mut Vec<i16>) {
        let available = available.min(self.ring.len());
        if self.skipping {
            if self.keep_alive && available > 2 * self.crossfade_len {
                self.keep_alive_splice(available, out);
            } else {
                self.drain_discard(available);
            }
        } else {
            self.drain_write(available, out);
        }
    }

    /// Synthesizes a crossfade mid-skip so a downstream consumer never
    /// sees more than one crossfade's worth of silence at a time.
    fn keep_alive_splice(&mut self, available: usize, out: &mut Vec<i16>) {
        let mid = available / 2 - self.crossfade_len;
        self.drain_discard(mid);

        let span = 2 * self.crossfade_len;
        let n = span.min(self.ring.len());
        let half = n / 2;

        let mut segment = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some((l, r)) = self.ring.pop_front() {
                self.samples_discarded += 1;
                segment.push((l as f32 / 4.0, r as f32 / 4.0));
            }
        }

        for i in 0..half.min(segment.len()) {
            let g = fade_in_gain(i, half.max(1));
            let (sl, sr) = self.saved_crossfade.get(i).copied().unwrap_or((0.0, 0.0));
            let (l, r) = segment[i];
            out.push(saturate_i16(l * g + sl));
            out.push(saturate_i16(r * g + sr));
            self.samples_written += 1;
        }

        let mut new_saved = vec![(0.0, 0.0); self.crossfade_len];
        for i in half..segment.len() {
            let k = i - half;
            let g = fade_out_gain(k, (segment.len() - half).max(1));
            let (l, r) = segment[i];
            if k < new_saved.len() {
                new_saved[k] = (l * g, r * g);
            }
        }
        self.saved_crossfade = new_saved;
    }
}
