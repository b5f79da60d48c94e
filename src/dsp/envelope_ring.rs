//! Rolling sum-of-squares envelope.
//!
//! Tracks mean-square energy of the band-limited mono signal over a short
//! (≈50 ms) ring. The sum is recomputed from scratch whenever the ring
//! wraps back to index 0, which bounds the float accumulation drift that
//! would otherwise build up indefinitely in a long-running stream; between
//! wraps the running sum is updated incrementally by subtracting the
//! sample being evicted and adding the one being written.

pub struct EnvelopeRing {
    buf: Vec<f32>,
    idx: usize,
    sum: f64,
}

impl EnvelopeRing {
    /// `len` is the ring size in samples (≈50 ms at the configured rate).
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "envelope ring length must be positive");
        Self {
            buf: vec![0.0; len],
            idx: 0,
            sum: 0.0,
        }
    }

    /// Push one filtered sample and return the current mean-square energy.
    pub fn push(&mut self, sample: f32) -> f32 {
        let sq = (sample as f64) * (sample as f64);

        if self.idx == 0 {
            self.buf[0] = sample;
            self.sum = self.buf.iter().map(|&s| (s as f64) * (s as f64)).sum();
        } else {
            let old = self.buf[self.idx];
            self.sum -= (old as f64) * (old as f64);
            self.sum += sq;
            self.buf[self.idx] = sample;
        }

        self.idx = (self.idx + 1) % self.buf.len();
        (self.sum / self.buf.len() as f64) as f32
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}
