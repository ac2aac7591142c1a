//! Greedy, SMR-driven bit allocator.

use crate::tables::{NB_SCALE_FACTORS, QUANT_SNR, TOTAL_QUANT_BITS};

const MAX_CHANNELS: usize = 2;
const SBLIMIT: usize = 32;

const SB_NOTALLOCATED: u8 = 0;
const SB_ALLOCATED: u8 = 1;
const SB_NOMORE: u8 = 2;

/// Walk the flat allocation table to find where subband `sb`'s row begins.
fn row_offset(alloc_table: &[u8], sb: usize) -> usize {
    let mut j = 0usize;
    for _ in 0..sb {
        j += 1usize << alloc_table[j];
    }
    j
}

/// Distribute bits across channels/subbands to maximize signal-to-mask
/// ratio coverage without exceeding `frame_size_bits`. Mirrors the reference
/// encoder's greedy `compute_bit_allocation`: repeatedly grants one more
/// quantization step to the (channel, subband) with the largest remaining
/// SMR, in channel-then-subband scan order on ties, until no candidate fits
/// in the remaining budget.
///
/// `smr1` is in 0.1 dB units, one row per channel. `scale_code` is the
/// per-subband transmission code from [`crate::quantizer::group_scale_factors`].
/// Returns `(bit_alloc, padding_bits)` where `bit_alloc[ch][sb]` is an index
/// into that subband's allocation-table row (0 = unallocated).
pub fn compute_bit_allocation(
    smr1: &[[i32; SBLIMIT]; MAX_CHANNELS],
    scale_code: &[[u8; SBLIMIT]; MAX_CHANNELS],
    nb_channels: usize,
    sblimit: usize,
    alloc_table: &[u8],
    frame_size_bits: u32,
) -> ([[u8; SBLIMIT]; MAX_CHANNELS], u32) {
    let mut smr = *smr1;
    let mut subband_status = [[SB_NOTALLOCATED; SBLIMIT]; MAX_CHANNELS];
    let mut bit_alloc = [[0u8; SBLIMIT]; MAX_CHANNELS];

    let max_frame_size = frame_size_bits as i64;

    let mut current_frame_size: i64 = 32;
    {
        let mut j = 0usize;
        for _ in 0..sblimit {
            let incr = alloc_table[j] as i64;
            current_frame_size += incr * nb_channels as i64;
            j += 1usize << alloc_table[j];
        }
    }

    loop {
        let mut max_sb: isize = -1;
        let mut max_ch: isize = -1;
        let mut max_smr = i32::MIN;
        for ch in 0..nb_channels {
            for sb in 0..sblimit {
                if smr[ch][sb] > max_smr && subband_status[ch][sb] != SB_NOMORE {
                    max_smr = smr[ch][sb];
                    max_sb = sb as isize;
                    max_ch = ch as isize;
                }
            }
        }
        if max_sb < 0 {
            break;
        }
        let max_sb = max_sb as usize;
        let max_ch = max_ch as usize;

        // Not optimal: re-walks the table from the start on every pick.
        let row = row_offset(alloc_table, max_sb);
        let width = alloc_table[row] as u32;

        let incr: i64 = if subband_status[max_ch][max_sb] == SB_NOTALLOCATED {
            let mut v = 2 + NB_SCALE_FACTORS[scale_code[max_ch][max_sb] as usize] as i64 * 6;
            let qindex = alloc_table[row + 1] as usize;
            v += TOTAL_QUANT_BITS[qindex] as i64;
            v
        } else {
            let b = bit_alloc[max_ch][max_sb] as usize;
            let qindex_hi = alloc_table[row + b + 1] as usize;
            let qindex_lo = alloc_table[row + b] as usize;
            TOTAL_QUANT_BITS[qindex_hi] as i64 - TOTAL_QUANT_BITS[qindex_lo] as i64
        };

        if current_frame_size + incr <= max_frame_size {
            bit_alloc[max_ch][max_sb] += 1;
            let b = bit_alloc[max_ch][max_sb] as usize;
            current_frame_size += incr;
            let qindex = alloc_table[row + b] as usize;
            smr[max_ch][max_sb] = smr1[max_ch][max_sb] - QUANT_SNR[qindex] as i32;
            subband_status[max_ch][max_sb] = if b as u32 == (1 << width) - 1 {
                SB_NOMORE
            } else {
                SB_ALLOCATED
            };
        } else {
            subband_status[max_ch][max_sb] = SB_NOMORE;
        }
    }

    let padding = max_frame_size - current_frame_size;
    debug_assert!(padding >= 0);
    (bit_alloc, padding.max(0) as u32)
}
