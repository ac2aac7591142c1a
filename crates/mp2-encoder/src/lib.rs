//! Pure Rust MPEG-1/2 Audio Layer II (MP2) encoder
//!
//! This crate provides a no_std compatible MP2 encoder implementing the
//! fixed-point polyphase analysis filterbank, greedy bit allocator, and
//! Layer II bitstream syntax of the reference MPEG audio encoder.
//!
//! # Features
//! - Mono and stereo, all standard MPEG-1/2 sample rates and Layer II
//!   bitrates
//! - Fixed-point arithmetic throughout, matching the reference encoder
//!   bit-for-bit
//! - No heap allocation (all buffers pre-allocated)

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(feature = "std")]
extern crate std;

mod analysis;
mod bitalloc;
mod config;
mod frame;
mod quantizer;
mod tables;

pub use config::{ConfigError, EncoderConfig};

use analysis::AnalysisFilter;

const MAX_CHANNELS: usize = 2;
const SBLIMIT: usize = 32;

/// Maximum size of an encoded Layer II frame in bytes.
pub const MAX_CODED_FRAME_SIZE: usize = EncoderConfig::MAX_CODED_FRAME_SIZE;

/// PCM samples consumed per channel per call to [`Mp2Encoder::encode_frame`].
pub const SAMPLES_PER_FRAME: usize = EncoderConfig::SAMPLES_PER_FRAME;

/// Errors encoding a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum Mp2Error {
    /// `pcm` was shorter than one frame's worth of interleaved samples.
    #[cfg_attr(feature = "std", error("pcm input slice is shorter than one frame"))]
    InputTooSmall,
    /// `output` cannot hold one encoded frame.
    #[cfg_attr(feature = "std", error("output buffer cannot hold one encoded frame"))]
    OutputTooSmall,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for Mp2Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::InputTooSmall => "pcm input slice is shorter than one frame",
            Self::OutputTooSmall => "output buffer cannot hold one encoded frame",
        };
        f.write_str(msg)
    }
}

/// MP2 encoder state.
///
/// Pre-allocates all buffers at construction; `encode_frame` does no
/// runtime allocation.
pub struct Mp2Encoder {
    config: EncoderConfig,
    analysis: AnalysisFilter,
}

impl Mp2Encoder {
    /// Create a new encoder from a resolved configuration.
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            analysis: AnalysisFilter::new(),
        }
    }

    /// The configuration this encoder was built with.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Upper bound on the size, in bytes, of one encoded frame.
    pub fn max_frame_size(&self) -> usize {
        (self.config.frame_size_bits as usize + 7) / 8 + 1
    }

    /// Encode one frame (1152 samples per channel) of interleaved PCM.
    pub fn encode_frame(&mut self, pcm: &[i16], output: &mut [u8]) -> Result<usize, Mp2Error> {
        let channels = self.config.channels as usize;
        let samples_needed = SAMPLES_PER_FRAME * channels;
        if pcm.len() < samples_needed {
            return Err(Mp2Error::InputTooSmall);
        }
        if output.len() < self.max_frame_size() {
            return Err(Mp2Error::OutputTooSmall);
        }

        let mut sb_samples = [[[0i32; 32]; analysis::FRAME_BLOCKS]; MAX_CHANNELS];
        for ch in 0..channels {
            sb_samples[ch] = self.analysis.process(ch, &pcm[ch..], channels);
        }

        let mut scale_code = [[0u8; SBLIMIT]; MAX_CHANNELS];
        let mut scale_factors = [[[0u8; 3]; SBLIMIT]; MAX_CHANNELS];
        for ch in 0..channels {
            let (code, sf) = quantizer::compute_scale_factors(&sb_samples[ch], self.config.sblimit);
            scale_code[ch] = code;
            scale_factors[ch] = sf;
        }

        let mut smr = [[0i32; SBLIMIT]; MAX_CHANNELS];
        for ch in 0..channels {
            for sb in 0..self.config.sblimit {
                smr[ch][sb] = (tables::FIXED_SMR[sb] * 10.0) as i32;
            }
        }

        let (bit_alloc, padding_bits) = bitalloc::compute_bit_allocation(
            &smr,
            &scale_code,
            channels,
            self.config.sblimit,
            self.config.alloc_table(),
            self.config.frame_size_bits,
        );

        let size = frame::encode_frame(
            output,
            self.config.lsf,
            self.config.bitrate_index,
            self.config.freq_index,
            channels,
            self.config.sblimit,
            self.config.alloc_table(),
            &bit_alloc,
            &scale_code,
            &scale_factors,
            &sb_samples,
            padding_bits,
        );

        debug_assert!(size <= MAX_CODED_FRAME_SIZE);
        Ok(size)
    }

    /// Reset filter history (e.g. after a discontinuity in the input).
    pub fn reset(&mut self) {
        self.analysis.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_1k_stereo_tone(num_frames: usize) -> std::vec::Vec<i16> {
        let samples_needed = SAMPLES_PER_FRAME * 2 * num_frames;
        (0..samples_needed)
            .map(|i| {
                let t = (i / 2) as f32 / 44100.0;
                let sample = (2.0 * core::f32::consts::PI * 1000.0 * t).sin();
                (sample * 16000.0) as i16
            })
            .collect()
    }

    #[test]
    fn encoder_creation_reports_correct_samples_per_frame() {
        let cfg = EncoderConfig::resolve(44100, 192_000, 2).unwrap();
        let encoder = Mp2Encoder::new(cfg);
        assert_eq!(SAMPLES_PER_FRAME, 1152);
        let _ = encoder;
    }

    #[test]
    fn encode_silence_produces_a_valid_header() {
        let cfg = EncoderConfig::resolve(44100, 192_000, 2).unwrap();
        let mut encoder = Mp2Encoder::new(cfg);

        let pcm = std::vec![0i16; SAMPLES_PER_FRAME * 2];
        let mut output = [0u8; MAX_CODED_FRAME_SIZE];

        let size = encoder.encode_frame(&pcm, &mut output).unwrap();
        assert!(size > 0);
        assert_eq!(output[0], 0xff);
        assert_eq!(output[1] >> 4, 0xf);
    }

    #[test]
    fn encode_1khz_tone_100_frames() {
        let cfg = EncoderConfig::resolve(44100, 192_000, 2).unwrap();
        let mut encoder = Mp2Encoder::new(cfg);

        let pcm = pcm_1k_stereo_tone(100);
        let mut output = [0u8; MAX_CODED_FRAME_SIZE];

        for frame in 0..100 {
            let start = frame * SAMPLES_PER_FRAME * 2;
            let end = start + SAMPLES_PER_FRAME * 2;
            let size = encoder.encode_frame(&pcm[start..end], &mut output).unwrap();
            assert!(size > 0 && size <= MAX_CODED_FRAME_SIZE);
        }
    }

    #[test]
    fn encode_input_too_small() {
        let cfg = EncoderConfig::resolve(44100, 192_000, 2).unwrap();
        let mut encoder = Mp2Encoder::new(cfg);

        let pcm = [0i16; 10];
        let mut output = [0u8; MAX_CODED_FRAME_SIZE];

        let result = encoder.encode_frame(&pcm, &mut output);
        assert_eq!(result, Err(Mp2Error::InputTooSmall));
    }

    #[test]
    fn encode_output_too_small() {
        let cfg = EncoderConfig::resolve(44100, 192_000, 2).unwrap();
        let mut encoder = Mp2Encoder::new(cfg);

        let pcm = std::vec![0i16; SAMPLES_PER_FRAME * 2];
        let mut output = [0u8; 4];

        let result = encoder.encode_frame(&pcm, &mut output);
        assert_eq!(result, Err(Mp2Error::OutputTooSmall));
    }

    #[test]
    fn mono_32khz_encodes_without_panicking() {
        let cfg = EncoderConfig::resolve(32000, 64_000, 1).unwrap();
        let mut encoder = Mp2Encoder::new(cfg);

        let pcm = std::vec![1000i16; SAMPLES_PER_FRAME];
        let mut output = [0u8; MAX_CODED_FRAME_SIZE];

        for _ in 0..10 {
            let size = encoder.encode_frame(&pcm, &mut output).unwrap();
            assert!(size > 0);
        }
    }

    #[test]
    fn reset_clears_filter_history() {
        let cfg = EncoderConfig::resolve(44100, 192_000, 2).unwrap();
        let mut encoder = Mp2Encoder::new(cfg);

        let pcm = std::vec![1000i16; SAMPLES_PER_FRAME * 2];
        let mut output1 = [0u8; MAX_CODED_FRAME_SIZE];
        let mut output2 = [0u8; MAX_CODED_FRAME_SIZE];

        let _ = encoder.encode_frame(&pcm, &mut output1);
        encoder.reset();
        let _ = encoder.encode_frame(&pcm, &mut output2);

        assert_eq!(output1, output2);
    }
}
