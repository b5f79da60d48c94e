//! DSP processing modules.
//!
//! The pipeline is a straight producer/consumer chain, each stage owning
//! its own fixed-size buffers:
//!
//! - [`dither`] / [`biquad`] / [`envelope_ring`] — input conditioning:
//!   deterministic dither, band-limiting IIR filters, rolling energy.
//! - [`window`] / [`descriptor`] — sliding-window feature extraction.
//! - [`tensor`] / [`coder`] — the 4-D discriminator lookup table and the
//!   dictionary coder used to persist it.
//! - [`classifier`] — hysteresis MUSIC/TALK state machine.
//! - [`splicer`] — crossfaded output assembly.
//! - [`pipeline`] — wires the above into one per-sample step function.
//! - [`utils`] — small numeric helpers shared by the stages above.

pub mod biquad;
pub mod classifier;
pub mod coder;
pub mod descriptor;
pub mod dither;
pub mod envelope_ring;
pub mod pipeline;
pub mod splicer;
pub mod tensor;
pub mod utils;
pub mod window;

pub use biquad::Biquad;
pub use classifier::{Classifier, Mode as ClassifierMode, Transition};
pub use descriptor::Descriptor;
pub use pipeline::{Pipeline, PipelineConfig, SkipMode};
pub use splicer::Splicer;
pub use tensor::Tensor;
pub use window::WindowAnalyzer;
