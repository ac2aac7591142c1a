//! MP2 encoder configuration resolution

use crate::tables::{ALLOC_TABLES, BITRATE_TAB, BITRATE_TAB_LSF, FREQ_TAB, SBLIMIT_TAB};

/// Errors rejecting an encoder configuration at `init` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ConfigError {
    /// `channels` was not 1 or 2.
    #[cfg_attr(feature = "std", error("channel count must be 1 or 2"))]
    InvalidChannels,
    /// `sample_rate` did not match one of {32000, 44100, 48000} or their halves.
    #[cfg_attr(
        feature = "std",
        error("sample rate is not a supported MPEG-1/2 rate or half-rate")
    )]
    InvalidSampleRate,
    /// `bit_rate` is not in the Layer II bitrate table for the resolved
    /// LSF state.
    #[cfg_attr(
        feature = "std",
        error("bitrate is not in the Layer II table for this sample rate")
    )]
    InvalidBitrate,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::InvalidChannels => "channel count must be 1 or 2",
            Self::InvalidSampleRate => "sample rate is not a supported MPEG-1/2 rate or half-rate",
            Self::InvalidBitrate => "bitrate is not in the Layer II table for this sample rate",
        };
        f.write_str(msg)
    }
}

/// A resolved, immutable MP2 encoder configuration. Produced by
/// [`EncoderConfig::resolve`] from the caller-facing (sample_rate, bit_rate,
/// channels) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    pub channels: u8,
    pub lsf: bool,
    pub freq_index: usize,
    pub bitrate_index: usize,
    pub sblimit: usize,
    pub table: usize,
    pub frame_size_bits: u32,
}

impl EncoderConfig {
    /// Samples consumed per channel per call to `encode_frame`.
    pub const SAMPLES_PER_FRAME: usize = 1152;

    /// Maximum encoded frame size in bytes a caller must provide as output
    /// buffer capacity (`MPA_MAX_CODED_FRAME_SIZE` in the reference encoder).
    pub const MAX_CODED_FRAME_SIZE: usize = 1792;

    /// Advisory decoder-side alignment value (`512 - 32 + 1`); the core
    /// encoder does not act on this, see Design Notes open question 2.
    pub const INITIAL_PADDING: usize = 512 - 32 + 1;

    /// Resolve a caller-facing configuration per the 7-step algorithm:
    /// reject invalid channel counts, match the sample rate (possibly as a
    /// half-rate LSF frequency), match the bitrate against the Layer II
    /// table, compute the base frame size, and select the allocation table.
    pub fn resolve(sample_rate: u32, bit_rate: u32, channels: u8) -> Result<Self, ConfigError> {
        if channels == 0 || channels > 2 {
            return Err(ConfigError::InvalidChannels);
        }

        let mut lsf = false;
        let mut freq_index = None;
        for (i, &f) in FREQ_TAB.iter().enumerate() {
            if f == sample_rate {
                freq_index = Some(i);
                break;
            }
            if f / 2 == sample_rate {
                lsf = true;
                freq_index = Some(i);
                break;
            }
        }
        let freq_index = freq_index.ok_or(ConfigError::InvalidSampleRate)?;

        let mut bitrate_kbps = bit_rate / 1000;
        let row = if lsf { &BITRATE_TAB_LSF } else { &BITRATE_TAB };

        let mut bitrate_index = None;
        for i in 1..15 {
            if row[i] as u32 == bitrate_kbps {
                bitrate_index = Some(i);
                break;
            }
        }
        let bitrate_index = match bitrate_index {
            Some(i) => i,
            None if bit_rate == 0 => {
                bitrate_kbps = row[14] as u32;
                14
            }
            None => return Err(ConfigError::InvalidBitrate),
        };

        let frame_size_bits = ((bitrate_kbps * 1000 / 8 * Self::SAMPLES_PER_FRAME as u32
            / sample_rate)
            * 8) as u32;

        let table_index = select_table(bitrate_kbps, channels as u32, sample_rate, lsf);
        let sblimit = SBLIMIT_TAB[table_index];

        Ok(Self {
            channels,
            lsf,
            freq_index,
            bitrate_index,
            sblimit,
            table: table_index,
            frame_size_bits,
        })
    }

    /// The flat allocation-table row data for this configuration, see
    /// [`crate::tables::ALLOC_TABLES`].
    pub fn alloc_table(&self) -> &'static [u8] {
        ALLOC_TABLES[self.table]
    }
}

/// Select an allocation-table index from bitrate, channel count, sample
/// rate, and LSF flag. Mirrors the reference encoder's
/// `ff_mpa_l2_select_table`.
pub const fn select_table(bitrate_kbps: u32, nb_channels: u32, freq: u32, lsf: bool) -> usize {
    if lsf {
        return 4;
    }
    let ch_bitrate = bitrate_kbps / nb_channels;
    if (freq == 48000 && ch_bitrate >= 56) || (ch_bitrate >= 56 && ch_bitrate <= 80) {
        0
    } else if freq != 48000 && ch_bitrate >= 96 {
        1
    } else if freq != 32000 && ch_bitrate <= 48 {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_a_config() {
        let cfg = EncoderConfig::resolve(44100, 192_000, 2).unwrap();
        assert_eq!(cfg.bitrate_index, 10);
        assert_eq!(cfg.lsf, false);
        assert_eq!(cfg.frame_size_bits, 5016);
    }

    #[test]
    fn scenario_c_mono_32khz_32kbps() {
        let cfg = EncoderConfig::resolve(32000, 32_000, 1).unwrap();
        assert_eq!(cfg.lsf, false);
        assert_eq!(cfg.table, 3);
        assert_eq!(cfg.sblimit, 12);
    }

    #[test]
    fn scenario_d_stereo_22050hz_64kbps() {
        let cfg = EncoderConfig::resolve(22050, 64_000, 2).unwrap();
        assert_eq!(cfg.lsf, true);
        assert_eq!(cfg.table, 4);
        assert_eq!(cfg.sblimit, 30);
    }

    #[test]
    fn scenario_e_invalid_channels() {
        assert_eq!(
            EncoderConfig::resolve(44100, 192_000, 3),
            Err(ConfigError::InvalidChannels)
        );
    }

    #[test]
    fn scenario_f_invalid_sample_rate() {
        assert_eq!(
            EncoderConfig::resolve(11025, 192_000, 2),
            Err(ConfigError::InvalidSampleRate)
        );
    }

    #[test]
    fn invalid_bitrate_rejected() {
        assert_eq!(
            EncoderConfig::resolve(44100, 1_000, 2),
            Err(ConfigError::InvalidBitrate)
        );
    }

    #[test]
    fn zero_bitrate_selects_top_index() {
        let cfg = EncoderConfig::resolve(44100, 0, 2).unwrap();
        assert_eq!(cfg.bitrate_index, 14);
    }

    #[test]
    fn initial_padding_is_481() {
        assert_eq!(EncoderConfig::INITIAL_PADDING, 481);
    }

    use proptest::prelude::*;

    proptest! {
        /// `resolve` never panics for any (sample_rate, bit_rate, channels)
        /// triple, and on success always reports a frame size that fits the
        /// encoder's own maximum output buffer allowance.
        #[test]
        fn resolve_never_panics_and_frame_size_is_sane(
            sample_rate in 0u32..100_000,
            bit_rate in 0u32..1_000_000,
            channels in 0u8..5,
        ) {
            if let Ok(cfg) = EncoderConfig::resolve(sample_rate, bit_rate, channels) {
                prop_assert!(cfg.frame_size_bits / 8 + 1 <= EncoderConfig::MAX_CODED_FRAME_SIZE as u32);
            }
        }
    }
}
