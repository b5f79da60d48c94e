//! Variable-width LZW dictionary coder used to compress tensor payloads.
//!
//! [`compress_best`] tries every code width from 9 to 16 bits and keeps
//! whichever produced the smallest output; the chosen width is stored as
//! a one-byte prefix so [`decompress`] needs no side channel.

use anyhow::{bail, Result};
use std::collections::HashMap;

const CLEAR_CODE: u16 = 256;
const FIRST_CODE: u16 = 257;
const MIN_BITS: u8 = 9;
const MAX_BITS: u8 = 16;

struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    nbits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            acc: 0,
            nbits: 0,
        }
    }

    fn write(&mut self, code: u16, width: u8) {
        self.acc = (self.acc << width) | code as u32;
        self.nbits += width;
        while self.nbits >= 8 {
            self.nbits -= 8;
            self.bytes.push(((self.acc >> self.nbits) & 0xFF) as u8);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            let pad = 8 - self.nbits;
            self.bytes.push(((self.acc << pad) & 0xFF) as u8);
        }
        self.bytes
    }
}

struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    acc: u32,
    nbits: u8,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            acc: 0,
            nbits: 0,
        }
    }

    fn read(&mut self, width: u8) -> Option<u16> {
        while self.nbits < width {
            if self.pos >= self.bytes.len() {
                return None;
            }
            self.acc = (self.acc << 8) | self.bytes[self.pos] as u32;
            self.pos += 1;
            self.nbits += 8;
        }
        self.nbits -= width;
        Some(((self.acc >> self.nbits) & ((1u32 << width) - 1)) as u16)
    }
}

fn initial_dict() -> HashMap<Vec<u8>, u16> {
    (0u16..256).map(|i| (vec![i as u8], i)).collect()
}

fn compress(data: &[u8], maxbits: u8) -> Vec<u8> {
    let mut dict = initial_dict();
    let mut next_code = FIRST_CODE;
    let mut bits = MIN_BITS;
    let mut writer = BitWriter::new();
    let mut w: Vec<u8> = Vec::new();

    for &byte in data {
        let mut candidate = w.clone();
        candidate.push(byte);

        if dict.contains_key(&candidate) {
            w = candidate;
            continue;
        }

        writer.write(*dict.get(&w).unwrap(), bits);

        if next_code < (1u16 << maxbits) {
            dict.insert(candidate, next_code);
            next_code += 1;
            if next_code > (1u16 << bits) && bits < maxbits {
                bits += 1;
            }
        } else {
            writer.write(CLEAR_CODE, bits);
            dict = initial_dict();
            next_code = FIRST_CODE;
            bits = MIN_BITS;
        }

        w = vec![byte];
    }

    if !w.is_empty() {
        writer.write(*dict.get(&w).unwrap(), bits);
    }

    writer.finish()
}

fn decode_body(body: &[u8], maxbits: u8) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(body);
    let mut dict: Vec<Vec<u8>> = (0u16..256).map(|i| vec![i as u8]).collect();
    dict.push(Vec::new()); // placeholder for clear code slot (256)
    let mut bits = MIN_BITS;
    let mut out = Vec::new();
    let mut prev: Option<Vec<u8>> = None;

    loop {
        let Some(code) = reader.read(bits) else { break };

        if code == CLEAR_CODE {
            dict = (0u16..256).map(|i| vec![i as u8]).collect();
            dict.push(Vec::new());
            bits = MIN_BITS;
            prev = None;
            continue;
        }

        let entry = if (code as usize) < dict.len() {
            dict[code as usize].clone()
        } else if let Some(p) = &prev {
            let mut e = p.clone();
            e.push(p[0]);
            e
        } else {
            bail!("corrupt coder stream: unknown code {code}");
        };

        out.extend_from_slice(&entry);

        if let Some(p) = prev {
            let mut new_entry = p;
            new_entry.push(entry[0]);
            if (dict.len() as u16) < (1u16 << maxbits) {
                dict.push(new_entry);
                if dict.len() as u16 > (1u16 << bits) && bits < maxbits {
                    bits += 1;
                }
            }
        }

        prev = Some(entry);
    }

    Ok(out)
}

/// Compresses `data` with every width in `[9, 16]` and returns the
/// smallest result, prefixed with the chosen width.
pub fn compress_best(data: &[u8]) -> Vec<u8> {
    let mut best: Option<Vec<u8>> = None;
    let mut best_bits = MIN_BITS;

    for bits in MIN_BITS..=MAX_BITS {
        let candidate = compress(data, bits);
        if best.as_ref().map(|b| candidate.len() < b.len()).unwrap_or(true) {
            best_bits = bits;
            best = Some(candidate);
        }
    }

    let mut out = vec![best_bits];
    out.extend(best.unwrap_or_default());
    out
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        bail!("corrupt coder stream: empty payload");
    }
    let maxbits = bytes[0];
    if !(MIN_BITS..=MAX_BITS).contains(&maxbits) {
        bail!("corrupt coder stream: invalid width {maxbits}");
    }
    decode_body(&bytes[1..], maxbits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let data: Vec<u8> = (0..4096).map(|i| ((i * 37) % 251) as u8).collect();
        let encoded = compress_best(&data);
        let decoded = decompress(&encoded).expect("decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_repetitive_bytes() {
        let data = vec![7u8; 10_000];
        let encoded = compress_best(&data);
        let decoded = decompress(&encoded).expect("decode");
        assert_eq!(decoded, data);
        assert!(encoded.len() < data.len());
    }

    #[test]
    fn round_trips_empty_input() {
        let data: Vec<u8> = Vec::new();
        let encoded = compress_best(&data);
        let decoded = decompress(&encoded).expect("decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn rejects_truncated_stream() {
        assert!(decompress(&[]).is_err());
    }
}
