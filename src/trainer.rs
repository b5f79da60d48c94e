//! Offline tensor construction.
//!
//! Reads two labeled descriptor streams (class A = music, class B =
//! talk), tallies per-cell histograms, scores each cell, and dilates the
//! result into empty neighborhoods until the tensor stops changing.

use anyhow::{bail, Context, Result};
use log::info;

use crate::dsp::descriptor::{Descriptor, DESCRIPTOR_LEN};
use crate::dsp::tensor::{Tensor, CELL_COUNT, DIM_H, DIM_I, DIM_J, DIM_K};

pub struct TrainerConfig {
    /// Reduce to this many leading dimensions (1-4); trailing axes
    /// collapse to index 0 during accumulation and get replicated back
    /// out after dilation.
    pub dimensions: u8,
    /// When true, only every other window from each input file is used
    /// to build the tensor, reserving the rest for held-out evaluation.
    pub alternate: bool,
}

struct Histograms {
    dist_a: Vec<u32>,
    dist_b: Vec<u32>,
    count_a: u32,
    count_b: u32,
}

pub fn load_descriptors(bytes: &[u8]) -> Result<Vec<Descriptor>> {
    if bytes.len() % DESCRIPTOR_LEN != 0 {
        bail!(
            "descriptor file length {} is not a multiple of {DESCRIPTOR_LEN}",
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(DESCRIPTOR_LEN)
        .map(|c| Descriptor::from_bytes(c.try_into().unwrap()))
        .collect())
}

fn reduced_index(d: &Descriptor, dims: u8) -> usize {
    let (h, i, j, k) = d.tensor_index();
    let h = h;
    let i = if dims >= 2 { i } else { 0 };
    let j = if dims >= 3 { j } else { 0 };
    let k = if dims >= 4 { k } else { 0 };
    ((h * DIM_I + i) * DIM_J + j) * DIM_K + k
}

fn accumulate(descriptors: &[Descriptor], alternate: bool, dims: u8, hist: &mut [u32], count: &mut u32) {
    for (n, d) in descriptors.iter().enumerate() {
        if alternate && n % 2 == 1 {
            continue;
        }
        hist[reduced_index(d, dims)] += 1;
        *count += 1;
    }
}

fn score_cells(hist: &Histograms) -> Vec<i8> {
    let mut cells = vec![0i8; CELL_COUNT];
    for c in 0..CELL_COUNT {
        let a = hist.dist_a[c];
        let b = hist.dist_b[c];
        cells[c] = if a > 0 && b == 0 {
            99
        } else if b > 0 && a == 0 {
            -99
        } else if a > 0 && b > 0 {
            let wa = a as f64 / hist.count_a.max(1) as f64;
            let wb = b as f64 / hist.count_b.max(1) as f64;
            let (lo, hi) = if wa < wb { (wa, wb) } else { (wb, wa) };
            let ratio = if hi > 0.0 { lo / hi } else { 0.0 };
            let (small_side_is_a, small) = if wa < wb { (true, wa) } else { (false, wb) };
            let _ = small;
            let normalized_a = if small_side_is_a { ratio } else { 1.0 };
            let normalized_b = if small_side_is_a { 1.0 } else { ratio };
            (normalized_a * 99.0 - normalized_b * 99.0).round().clamp(-99.0, 99.0) as i8
        } else {
            0
        };
    }
    cells
}

fn cell_coords(flat: usize) -> (usize, usize, usize, usize) {
    let k = flat % DIM_K;
    let rest = flat / DIM_K;
    let j = rest % DIM_J;
    let rest = rest / DIM_J;
    let i = rest % DIM_I;
    let h = rest / DIM_I;
    (h, i, j, k)
}

fn neighborhood_mean(cells: &[i8], h: usize, i: usize, j: usize, k: usize) -> Option<i8> {
    let mut sum = 0i64;
    let mut n = 0i64;
    for dh in -1i64..=1 {
        for di in -1i64..=1 {
            for dj in -1i64..=1 {
                for dk in -1i64..=1 {
                    if dh == 0 && di == 0 && dj == 0 && dk == 0 {
                        continue;
                    }
                    let (Some(nh), Some(ni), Some(nj), Some(nk)) = (
                        offset(h, dh, DIM_H),
                        offset(i, di, DIM_I),
                        offset(j, dj, DIM_J),
                        offset(k, dk, DIM_K),
                    ) else {
                        continue;
                    };
                    let flat = ((nh * DIM_I + ni) * DIM_J + nj) * DIM_K + nk;
                    let v = cells[flat];
                    if v != 0 {
                        sum += v as i64;
                        n += 1;
                    }
                }
            }
        }
    }
    if n == 0 {
        None
    } else {
        Some((sum as f64 / n as f64).round() as i8)
    }
}

fn offset(v: usize, d: i64, dim: usize) -> Option<usize> {
    let nv = v as i64 + d;
    if nv < 0 || nv >= dim as i64 {
        None
    } else {
        Some(nv as usize)
    }
}

fn dilate(mut cells: Vec<i8>) -> Vec<i8> {
    loop {
        let mut shadow = cells.clone();
        let mut changed = false;
        for flat in 0..CELL_COUNT {
            if cells[flat] != 0 {
                continue;
            }
            let (h, i, j, k) = cell_coords(flat);
            if let Some(v) = neighborhood_mean(&cells, h, i, j, k) {
                shadow[flat] = v;
                changed = true;
            }
        }
        cells = shadow;
        if !changed {
            break;
        }
    }
    cells
}

/// Replicates the reduced tensor's collapsed plane across any axis
/// beyond `dims`, so the runtime lookup always sees the fixed shape.
fn expand_dims(reduced: &[i8], dims: u8) -> Vec<i8> {
    let mut out = vec![0i8; CELL_COUNT];
    for h in 0..DIM_H {
        for i in 0..DIM_I {
            for j in 0..DIM_J {
                for k in 0..DIM_K {
                    let ri = if dims >= 2 { i } else { 0 };
                    let rj = if dims >= 3 { j } else { 0 };
                    let rk = if dims >= 4 { k } else { 0 };
                    let src = ((h * DIM_I + ri) * DIM_J + rj) * DIM_K + rk;
                    let dst = ((h * DIM_I + i) * DIM_J + j) * DIM_K + k;
                    out[dst] = reduced[src];
                }
            }
        }
    }
    out
}

pub fn build_tensor(
    music: &[Descriptor],
    talk: &[Descriptor],
    cfg: &TrainerConfig,
) -> Result<Tensor> {
    if cfg.dimensions == 0 || cfg.dimensions > 4 {
        bail!("dimensions must be in 1..=4, got {}", cfg.dimensions);
    }

    let mut hist = Histograms {
        dist_a: vec![0u32; CELL_COUNT],
        dist_b: vec![0u32; CELL_COUNT],
        count_a: 0,
        count_b: 0,
    };

    accumulate(music, cfg.alternate, cfg.dimensions, &mut hist.dist_a, &mut hist.count_a);
    accumulate(talk, cfg.alternate, cfg.dimensions, &mut hist.dist_b, &mut hist.count_b);

    info!(
        "accumulated {} music windows, {} talk windows",
        hist.count_a, hist.count_b
    );

    let scored = score_cells(&hist);
    let dilated = dilate(scored);
    let expanded = expand_dims(&dilated, cfg.dimensions);

    Tensor::from_cells(expanded).context("building tensor from scored cells")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_for_cell(range_db: u8, cycles: u8) -> Descriptor {
        Descriptor {
            range_db,
            cycles,
            ..Default::default()
        }
    }

    #[test]
    fn unique_cells_saturate() {
        let music = vec![descriptor_for_cell(10, 2)];
        let talk = vec![descriptor_for_cell(40, 10)];
        let cfg = TrainerConfig {
            dimensions: 4,
            alternate: false,
        };
        let t = build_tensor(&music, &talk, &cfg).unwrap();
        assert_eq!(t.score(&descriptor_for_cell(10, 2)), 99);
        assert_eq!(t.score(&descriptor_for_cell(40, 10)), -99);
    }

    #[test]
    fn dilation_fills_empty_neighbors() {
        let music = vec![descriptor_for_cell(10, 2), descriptor_for_cell(10, 4)];
        let talk = vec![descriptor_for_cell(40, 20)];
        let cfg = TrainerConfig {
            dimensions: 4,
            alternate: false,
        };
        let t = build_tensor(&music, &talk, &cfg).unwrap();
        // The cell between two music-saturated cells should pick up a
        // nonzero value from dilation.
        assert_ne!(t.score(&descriptor_for_cell(10, 3)), 0);
    }

    #[test]
    fn rejects_bad_dimension_count() {
        let cfg = TrainerConfig {
            dimensions: 5,
            alternate: false,
        };
        assert!(build_tensor(&[], &[], &cfg).is_err());
    }
}
