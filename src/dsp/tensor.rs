//! The 4-D lookup tensor mapping a window descriptor to a music/talk score.
//!
//! The tensor is built offline by [`crate::trainer`] and loaded read-only
//! by the streaming pipeline. Values saturate to `[-99, 99]`; `0` means
//! "no evidence either way" and is the value empty, undilated cells start
//! at.

use anyhow::{bail, Context, Result};

use super::coder;
use super::descriptor::Descriptor;

pub const DIM_H: usize = 48;
pub const DIM_I: usize = 24;
pub const DIM_J: usize = 16;
pub const DIM_K: usize = 16;
pub const CELL_COUNT: usize = DIM_H * DIM_I * DIM_J * DIM_K;

const HEADER_LEN: usize = 12;
const FORMAT_VERSION: u32 = 1;

/// Read-only signed-8 lookup tensor, stored h-major (h outermost, k
/// innermost) to match the on-disk payload order.
#[derive(Clone, Debug)]
pub struct Tensor {
    cells: Vec<i8>,
}

impl Tensor {
    pub fn zeroed() -> Self {
        Self {
            cells: vec![0i8; CELL_COUNT],
        }
    }

    pub fn from_cells(cells: Vec<i8>) -> Result<Self> {
        if cells.len() != CELL_COUNT {
            bail!(
                "tensor cell count mismatch: expected {CELL_COUNT}, got {}",
                cells.len()
            );
        }
        Ok(Self { cells })
    }

    #[inline]
    fn flat_index(h: usize, i: usize, j: usize, k: usize) -> usize {
        ((h * DIM_I + i) * DIM_J + j) * DIM_K + k
    }

    pub fn get(&self, h: usize, i: usize, j: usize, k: usize) -> i8 {
        self.cells[Self::flat_index(h, i, j, k)]
    }

    pub fn set(&mut self, h: usize, i: usize, j: usize, k: usize, v: i8) {
        self.cells[Self::flat_index(h, i, j, k)] = v;
    }

    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// Looks up the score for a descriptor's saturating tensor index.
    pub fn score(&self, d: &Descriptor) -> i32 {
        let (h, i, j, k) = d.tensor_index();
        self.get(h, i, j, k) as i32
    }

    fn checksum(bytes: &[u8]) -> u32 {
        bytes
            .iter()
            .fold(0u32, |acc, &b| acc.wrapping_add(b as u32))
    }

    pub fn encode(&self) -> Vec<u8> {
        let raw: Vec<u8> = self.cells.iter().map(|&v| v as u8).collect();
        let checksum = Self::checksum(&raw);
        let payload = coder::compress_best(&raw);

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&checksum.to_le_bytes());
        out.push(DIM_H as u8);
        out.push(DIM_I as u8);
        out.push(DIM_J as u8);
        out.push(DIM_K as u8);
        out.extend_from_slice(&payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            bail!("invalid tensor: truncated header");
        }

        let version = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if version != FORMAT_VERSION {
            bail!("invalid tensor: unsupported version {version}");
        }

        let checksum = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let dims = [bytes[8], bytes[9], bytes[10], bytes[11]];
        if dims != [DIM_H as u8, DIM_I as u8, DIM_J as u8, DIM_K as u8] {
            bail!("invalid tensor: dimension mismatch {dims:?}");
        }

        let raw = coder::decompress(&bytes[HEADER_LEN..])
            .context("invalid tensor: decoder error")?;

        if raw.len() != CELL_COUNT {
            bail!(
                "invalid tensor: payload decoded to {} bytes, expected {CELL_COUNT}",
                raw.len()
            );
        }

        if Self::checksum(&raw) != checksum {
            bail!("invalid tensor: checksum mismatch");
        }

        let cells = raw.into_iter().map(|b| b as i8).collect();
        Self::from_cells(cells)
    }
}
