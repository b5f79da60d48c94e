use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use log::info;

use skipper::cli;
use skipper::dsp::pipeline::{Pipeline, PipelineConfig};
use skipper::dsp::tensor::Tensor;
use skipper::logging;
use skipper::pcm;

/// One-word tags prefixed onto error messages so `main` can classify an
/// `anyhow::Error` into the exit code its kind specifies, without a
/// parallel error-type hierarchy for what are otherwise plain strings.
const TAG_CONFIG: &str = "config error";
const TAG_RESOURCE: &str = "resource error";
const TAG_TENSOR: &str = "invalid tensor";
const TAG_INVARIANT: &str = "pipeline invariant violation";

fn exit_code_for(err: &anyhow::Error) -> u8 {
    let msg = format!("{err:#}");
    if msg.contains(TAG_TENSOR) {
        4
    } else if msg.contains(TAG_INVARIANT) {
        1
    } else if msg.contains(TAG_CONFIG) {
        2
    } else if msg.contains(TAG_RESOURCE) {
        3
    } else {
        3
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run() -> Result<()> {
    let config = match cli::parse(std::env::args()).map_err(|e| anyhow!("{TAG_CONFIG}: {e:#}"))? {
        Some(c) => c,
        None => return Ok(()), // -h/--help already printed usage
    };

    logging::init(config.verbosity);

    let tensor_bytes = fs::read(&config.tensor_path)
        .map_err(|e| anyhow!("{TAG_RESOURCE}: reading tensor file {}: {e}", config.tensor_path))?;
    let tensor = Tensor::decode(&tensor_bytes).map_err(|e| anyhow!("{TAG_TENSOR}: {e:#}"))?;

    info!("loaded tensor from {}", config.tensor_path);

    let mut analysis_file = config
        .analysis_path
        .as_ref()
        .map(|p| {
            fs::File::create(p).map_err(|e| anyhow!("{TAG_RESOURCE}: creating analysis file {p}: {e}"))
        })
        .transpose()?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let pipeline_cfg = PipelineConfig {
        rate: config.rate,
        threshold: config.threshold,
        skip_mode: config.skip_mode,
        keep_alive: config.keep_alive,
        left_override: config.left_override,
        right_override: config.right_override,
    };
    let mut pipeline = Pipeline::new(pipeline_cfg, tensor);

    let block_frames = pcm::block_frames(config.rate);
    let mut out_buf: Vec<i16> = Vec::new();
    let mut prev_descriptor_count = 0usize;

    loop {
        let samples = pcm::read_block(&mut reader, config.channels, block_frames)
            .map_err(|e| anyhow!("{TAG_RESOURCE}: reading PCM input: {e:#}"))?;
        if samples.is_empty() {
            break;
        }

        for frame in samples.chunks_exact(config.channels as usize) {
            let mono = pcm::downmix(frame);
            let stereo = pcm::normal_stereo_frame(frame);
            out_buf.clear();
            pipeline
                .process_sample(mono, stereo, &mut out_buf)
                .map_err(|e| anyhow!("{TAG_INVARIANT}: {e:#}"))?;
            if !out_buf.is_empty() {
                pcm::write_stereo(&mut writer, &out_buf)
                    .map_err(|e| anyhow!("{TAG_RESOURCE}: writing PCM output: {e}"))?;
            }
        }

        flush_analysis(&mut analysis_file, &pipeline, &mut prev_descriptor_count)?;

        if logging::progress_due() {
            info!(
                "written {} discarded {}",
                pipeline.samples_written(),
                pipeline.samples_discarded()
            );
        }
    }

    out_buf.clear();
    pipeline.drain(&mut out_buf);
    if !out_buf.is_empty() {
        pcm::write_stereo(&mut writer, &out_buf)
            .map_err(|e| anyhow!("{TAG_RESOURCE}: writing PCM output: {e}"))?;
    }
    flush_analysis(&mut analysis_file, &pipeline, &mut prev_descriptor_count)?;

    writer
        .flush()
        .map_err(|e| anyhow!("{TAG_RESOURCE}: flushing PCM output: {e}"))?;

    Ok(())
}

fn flush_analysis(
    analysis_file: &mut Option<fs::File>,
    pipeline: &Pipeline,
    prev_count: &mut usize,
) -> Result<()> {
    let Some(f) = analysis_file.as_mut() else {
        return Ok(());
    };
    let records = pipeline.analysis_records();
    for d in &records[*prev_count..] {
        f.write_all(&d.to_bytes())
            .with_context(|| format!("{TAG_RESOURCE}: writing analysis file"))?;
    }
    *prev_count = records.len();
    Ok(())
}
