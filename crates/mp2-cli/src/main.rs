//! Command-line MP2 encoder: reads raw interleaved 16-bit PCM from a file,
//! encodes it frame by frame, and writes the resulting MPEG-1/2 Layer II
//! bitstream to another file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{info, warn};
use mp2_encoder::{EncoderConfig, Mp2Encoder, MAX_CODED_FRAME_SIZE, SAMPLES_PER_FRAME};

#[derive(Parser)]
#[command(name = "mp2enc", about = "Encode raw PCM to MPEG-1/2 Layer II")]
struct Cli {
    /// Raw interleaved 16-bit little-endian PCM input file.
    input: PathBuf,
    /// Destination for the encoded Layer II bitstream.
    output: PathBuf,
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,
    #[arg(long, default_value_t = 192_000)]
    bit_rate: u32,
    #[arg(long, default_value_t = 2)]
    channels: u8,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(frames) => {
            info!("encoded {frames} frame(s)");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("mp2enc: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<usize, Box<dyn std::error::Error>> {
    let config = EncoderConfig::resolve(cli.sample_rate, cli.bit_rate, cli.channels)?;
    let mut encoder = Mp2Encoder::new(config);

    let mut reader = BufReader::new(File::open(&cli.input)?);
    let mut writer = BufWriter::new(File::create(&cli.output)?);

    let samples_per_frame = SAMPLES_PER_FRAME * cli.channels as usize;
    let mut pcm = vec![0i16; samples_per_frame];
    let mut raw = vec![0u8; samples_per_frame * 2];
    let mut output = [0u8; MAX_CODED_FRAME_SIZE];

    let mut frames = 0usize;
    loop {
        let read = read_fully(&mut reader, &mut raw)?;
        if read < raw.len() {
            let dropped_samples = read / 2;
            if dropped_samples > 0 {
                warn!(
                    "dropping {dropped_samples} trailing PCM sample(s): short of a full frame"
                );
            }
            break;
        }

        for (sample, bytes) in pcm.iter_mut().zip(raw.chunks_exact(2)) {
            *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        }

        let size = encoder.encode_frame(&pcm, &mut output)?;
        writer.write_all(&output[..size])?;
        frames += 1;
    }

    writer.flush()?;
    Ok(frames)
}

/// Fill `buf` from `reader`, returning the number of bytes actually read
/// before hitting EOF (which may be less than `buf.len()`).
fn read_fully(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}
