//! S2 pure-tone scenario, using `hound` to synthesize the fixture the
//! same way the corpus's own validation tools load WAV test audio.

use hound::{SampleFormat, WavSpec, WavWriter};
use skipper::dsp::pipeline::{Pipeline, PipelineConfig, SkipMode};
use skipper::dsp::tensor::Tensor;
use skipper::pcm::DebugChannel;

const RATE: u32 = 44100;

fn synth_tone_wav() -> Vec<i16> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        let amplitude = 32768.0 * 10f32.powf(-20.0 / 20.0); // -20 dBFS
        for n in 0..(RATE as usize * 30) {
            let t = n as f32 / RATE as f32;
            let s = (amplitude * (2.0 * std::f32::consts::PI * 1000.0 * t).sin()) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    let bytes = cursor.into_inner();
    let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
    reader.samples::<i16>().map(|s| s.unwrap()).collect()
}

#[test]
fn s2_pure_tone_produces_high_cycle_descriptors() {
    let samples = synth_tone_wav();

    let cfg = PipelineConfig {
        rate: RATE,
        threshold: 10,
        skip_mode: SkipMode::PassAll,
        keep_alive: false,
        left_override: DebugChannel::Normal,
        right_override: DebugChannel::Normal,
    };
    let mut pipeline = Pipeline::new(cfg, Tensor::zeroed());
    let mut out = Vec::new();

    for frame in samples.chunks_exact(2) {
        let mono = (frame[0] as f32 + frame[1] as f32) / 2.0;
        pipeline
            .process_sample(mono, (frame[0], frame[1]), &mut out)
            .unwrap();
    }
    pipeline.drain(&mut out);

    let records = pipeline.analysis_records();
    assert!(!records.is_empty());
    for d in records {
        assert!(d.cycles >= 6, "expected a fast-cycling descriptor, got {}", d.cycles);
    }
}
