//! Window descriptor record.
//!
//! Eight bytes summarizing one 5-second energy window: dynamic range,
//! cycle count, three energy-zone occupancy fractions, attack ratio, peak
//! jitter, and a spare byte reserved for format alignment. This is the
//! exact record written to the analysis file and looked up in the tensor.

use crate::dsp::utils::quantize_unit;

pub const DESCRIPTOR_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub range_db: u8,
    pub cycles: u8,
    pub zone_low: u8,
    pub zone_mid: u8,
    pub zone_high: u8,
    pub attack_ratio: u8,
    pub peak_jitter: u8,
    pub spare: u8,
}

impl Descriptor {
    pub fn to_bytes(self) -> [u8; DESCRIPTOR_LEN] {
        [
            self.range_db,
            self.cycles,
            self.zone_low,
            self.zone_mid,
            self.zone_high,
            self.attack_ratio,
            self.peak_jitter,
            self.spare,
        ]
    }

    pub fn from_bytes(b: [u8; DESCRIPTOR_LEN]) -> Self {
        Self {
            range_db: b[0],
            cycles: b[1],
            zone_low: b[2],
            zone_mid: b[3],
            zone_high: b[4],
            attack_ratio: b[5],
            peak_jitter: b[6],
            spare: b[7],
        }
    }

    /// Saturating index derivation into the 48x24x16x16 tensor.
    pub fn tensor_index(&self) -> (usize, usize, usize, usize) {
        let h = (self.range_db as usize).min(47);
        let i = (self.cycles as usize >> 1).min(23);
        let j = (self.zone_low as usize >> 4).min(15);
        let k = (self.zone_mid as usize >> 4).min(15);
        (h, i, j, k)
    }
}

/// Applies the nonlinear rescale used for zone fractions: concentrates
/// typical values around 0.5 before quantizing to 8 bits.
#[inline]
pub fn rescale_zone_fraction(f: f32) -> u8 {
    let f = f.clamp(0.0, 1.0);
    let rescaled = f * ((1.0 - f) * 0.75 + 1.0);
    quantize_unit(rescaled)
}
