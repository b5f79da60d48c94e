//! Sliding window analyzer.
//!
//! Accumulates per-sample envelope energy into a 5-second ring and, every
//! 200 ms, derives one [`Descriptor`](super::descriptor::Descriptor) from
//! it: dynamic range, cycle count via alternating peak/trough picking,
//! three-zone energy occupancy, attack ratio, and peak-position jitter.

use super::descriptor::{rescale_zone_fraction, Descriptor};
use super::utils::quantize_unit;

const MAX_CYCLES: usize = 128;

pub struct WindowAnalyzer {
    window_len: usize,
    step_len: usize,
    buf: Vec<f32>,
    write_idx: usize,
    filled: usize,
    since_step: usize,
}

impl WindowAnalyzer {
    pub fn new(rate: u32) -> Self {
        let window_len = (rate as f64 * 5.0).round() as usize;
        let step_len = (rate as f64 * 0.2).round() as usize;
        Self {
            window_len,
            step_len,
            buf: vec![0.0; window_len],
            write_idx: 0,
            filled: 0,
            since_step: 0,
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn step_len(&self) -> usize {
        self.step_len
    }

    /// Push one envelope sample. Returns a descriptor whenever a full step
    /// has elapsed since the last one and the window has filled at least
    /// once.
    pub fn push(&mut self, energy: f32) -> Option<Descriptor> {
        self.buf[self.write_idx] = energy;
        self.write_idx = (self.write_idx + 1) % self.window_len;
        self.filled = (self.filled + 1).min(self.window_len);
        self.since_step += 1;

        if self.filled == self.window_len && self.since_step >= self.step_len {
            self.since_step = 0;
            Some(self.analyze())
        } else {
            None
        }
    }

    /// Returns the window contents in chronological order, oldest first.
    fn ordered(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.window_len);
        out.extend_from_slice(&self.buf[self.write_idx..]);
        out.extend_from_slice(&self.buf[..self.write_idx]);
        out
    }

    fn analyze(&self) -> Descriptor {
        let energies = self.ordered();

        let peak = energies.iter().cloned().fold(f32::MIN, f32::max).max(1e-12);
        let trough = energies.iter().cloned().fold(f32::MAX, f32::min).max(1e-12);

        let range_db = (10.0 * (peak / trough).log10()).round().clamp(0.0, 95.0) as u8;

        let mut triggers = find_triggers(&energies, peak, trough);
        if triggers.len() % 2 != 0 {
            triggers.pop();
        }
        let cycles = triggers.len().min(254) as u8;

        let (zone_low, zone_mid, zone_high) = zone_fractions(&energies, peak, trough);

        let attack_ratio = attack_ratio(&triggers);
        let peak_jitter = peak_jitter(&triggers);

        Descriptor {
            range_db,
            cycles,
            zone_low,
            zone_mid,
            zone_high,
            attack_ratio,
            peak_jitter,
            spare: 0,
        }
    }
}

/// Alternate trough-then-peak extremum picking with a geometric
/// confirmation threshold derived from the window's own peak/trough ratio.
fn find_triggers(energies: &[f32], peak: f32, trough: f32) -> Vec<usize> {
    let ratio = (peak / trough).max(1.0).sqrt();
    let mut triggers = Vec::new();

    // true: searching for a trough; false: searching for a peak.
    let mut seeking_trough = true;
    let mut candidate_val = energies[0];
    let mut candidate_idx = 0usize;

    for (i, &e) in energies.iter().enumerate().skip(1) {
        if seeking_trough {
            if e < candidate_val {
                candidate_val = e;
                candidate_idx = i;
            } else if e > candidate_val * ratio {
                triggers.push(candidate_idx);
                seeking_trough = false;
                candidate_val = e;
                candidate_idx = i;
                if triggers.len() > MAX_CYCLES {
                    let new_len = triggers.len() - 2;
                    triggers.truncate(new_len);
                }
            }
        } else if e > candidate_val {
            candidate_val = e;
            candidate_idx = i;
        } else if e < candidate_val / ratio {
            triggers.push(candidate_idx);
            seeking_trough = true;
            candidate_val = e;
            candidate_idx = i;
            if triggers.len() > MAX_CYCLES {
                let new_len = triggers.len() - 2;
                triggers.truncate(new_len);
            }
        }
    }

    triggers
}

fn zone_fractions(energies: &[f32], peak: f32, trough: f32) -> (u8, u8, u8) {
    let cr = (peak / trough).max(1.0).cbrt();
    let lo_hi = trough * cr;
    let hi_lo = peak / cr;

    let mut low = 0usize;
    let mut mid = 0usize;
    let mut high = 0usize;

    for &e in energies {
        if e < lo_hi {
            low += 1;
        } else if e <= hi_lo {
            mid += 1;
        } else {
            high += 1;
        }
    }

    let total = energies.len().max(1) as f32;
    (
        rescale_zone_fraction(low as f32 / total),
        rescale_zone_fraction(mid as f32 / total),
        rescale_zone_fraction(high as f32 / total),
    )
}

fn attack_ratio(triggers: &[usize]) -> u8 {
    if triggers.len() < 4 {
        return quantize_unit(0.5);
    }

    let mut attack = 0i64;
    let mut decay = 0i64;
    let mut attack_count = 0u32;
    let mut decay_count = 0u32;

    for (i, pair) in triggers.windows(2).enumerate() {
        let interval = (pair[1] - pair[0]) as i64;
        if i % 2 == 0 {
            decay += interval;
            decay_count += 1;
        } else {
            attack += interval;
            attack_count += 1;
        }
    }

    if attack_count == 0 || decay_count == 0 {
        return quantize_unit(0.5);
    }

    let total = (attack + decay) as f32;
    let mut ratio = attack as f32 / total;
    if attack_count != decay_count {
        ratio *= (attack_count + decay_count) as f32 / (2 * attack_count) as f32;
    }

    quantize_unit(ratio.clamp(0.0, 1.0))
}

fn peak_jitter(triggers: &[usize]) -> u8 {
    if triggers.len() < 6 {
        return quantize_unit(1.0);
    }

    let peaks: Vec<f64> = triggers
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, &p)| p as f64)
        .collect();

    if peaks.len() < 2 {
        return quantize_unit(1.0);
    }

    let first = peaks[0];
    let last = *peaks.last().unwrap();
    let period = (last - first) / (peaks.len() - 1) as f64;
    if period <= 0.0 {
        return quantize_unit(1.0);
    }

    let mean_abs_residual: f64 = peaks
        .iter()
        .enumerate()
        .map(|(k, &p)| (p - (first + k as f64 * period)).abs())
        .sum::<f64>()
        / peaks.len() as f64;

    let jitter = (mean_abs_residual / period).clamp(0.0, 1.0) as f32;
    quantize_unit(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_yields_zero_range() {
        let mut w = WindowAnalyzer::new(1000);
        let mut last = None;
        for _ in 0..(w.window_len() + w.step_len() * 3) {
            last = w.push(0.0).or(last);
        }
        let d = last.expect("expected a descriptor to be emitted");
        assert_eq!(d.range_db, 0);
    }

    #[test]
    fn emits_on_step_boundary() {
        let mut w = WindowAnalyzer::new(1000);
        let mut emissions = 0;
        for i in 0..(w.window_len() + w.step_len() * 5) {
            let e = (i as f32 * 0.1).sin().abs() + 0.01;
            if w.push(e).is_some() {
                emissions += 1;
            }
        }
        assert!(emissions >= 4);
    }

    #[test]
    fn oscillating_signal_produces_cycles() {
        let mut w = WindowAnalyzer::new(1000);
        let mut last = None;
        for i in 0..(w.window_len() + w.step_len()) {
            let e = 1.0 + (i as f32 * 0.2).sin() * 0.9;
            last = w.push(e * e).or(last);
        }
        let d = last.unwrap();
        assert!(d.cycles > 0);
    }
}
