//! Scale-factor extraction, grouping, and sample quantization.

use crate::tables::{SCALE_DIFF_TABLE, SCALE_FACTOR_MULT, SCALE_FACTOR_SHIFT, SCALE_FACTOR_TABLE};

const P: i32 = 15;

fn av_log2(v: i32) -> i32 {
    debug_assert!(v > 0);
    31 - v.leading_zeros() as i32
}

/// Map a granule's peak absolute sample value to one of the 64 scale-factor
/// table indices via a bounded log2 search (at most two compares once the
/// MSB position is known).
fn scale_factor_index(vmax: i32) -> u8 {
    if vmax <= 1 {
        return 62;
    }
    let n = av_log2(vmax);
    let mut index = (21 - n) * 3 - 3;
    if index >= 0 {
        while SCALE_FACTOR_TABLE.get((index + 1) as usize).is_some_and(|&t| vmax <= t) {
            index += 1;
        }
    } else {
        index = 0;
    }
    debug_assert!((0..=63).contains(&index));
    index as u8
}

/// Classify three per-granule scale-factor indices into a transmission code
/// {0,1,2,3} and the (possibly rewritten) scale factors actually sent, per
/// the reference encoder's 25-case `d1*5+d2` table.
pub fn group_scale_factors(mut sf: [u8; 3]) -> (u8, [u8; 3]) {
    let d1 = SCALE_DIFF_TABLE[(sf[0] as i32 - sf[1] as i32 + 64) as usize];
    let d2 = SCALE_DIFF_TABLE[(sf[1] as i32 - sf[2] as i32 + 64) as usize];

    let code = match d1 * 5 + d2 {
        0 | 4 | 19 | 20 | 24 => 0,
        1 | 2 | 21 | 22 => {
            sf[2] = sf[1];
            3
        }
        3 | 23 => {
            sf[1] = sf[2];
            3
        }
        5 | 9 | 14 => {
            sf[1] = sf[0];
            1
        }
        6 | 7 | 10 | 11 | 12 => {
            sf[1] = sf[0];
            sf[2] = sf[0];
            2
        }
        13 | 18 => {
            let v = sf[2];
            sf[0] = v;
            sf[1] = v;
            2
        }
        15 | 16 | 17 => {
            let v = sf[1];
            sf[0] = v;
            sf[2] = v;
            2
        }
        8 => {
            if sf[0] > sf[2] {
                sf[0] = sf[2];
            }
            sf[1] = sf[0];
            sf[2] = sf[0];
            2
        }
        _ => unreachable!("d1, d2 are both in 0..5, so d1*5+d2 is in 0..25"),
    };

    (code, sf)
}

/// For every subband up to `sblimit`, find the peak magnitude in each of the
/// 3 granules, derive a scale-factor index per granule, and collapse the
/// three via [`group_scale_factors`].
///
/// Returns `(scale_code[sblimit], scale_factors[sblimit][3])`.
pub fn compute_scale_factors(
    sb_samples: &[[i32; 32]; crate::analysis::FRAME_BLOCKS],
    sblimit: usize,
) -> ([u8; 32], [[u8; 3]; 32]) {
    let mut scale_code = [0u8; 32];
    let mut scale_factors = [[0u8; 3]; 32];

    for sb in 0..sblimit {
        let mut sf = [0u8; 3];
        for (granule, slot) in sf.iter_mut().enumerate() {
            let mut vmax = 0i32;
            for block in 0..12 {
                let v = sb_samples[granule * 12 + block][sb].abs();
                if v > vmax {
                    vmax = v;
                }
            }
            *slot = scale_factor_index(vmax);
        }
        let (code, sf) = group_scale_factors(sf);
        scale_code[sb] = code;
        scale_factors[sb] = sf;
    }

    (scale_code, scale_factors)
}

/// Quantize one sample against a scale factor index and a step count,
/// producing a value in `0..steps`.
pub fn quantize_sample(sample: i32, scale_factor_index: u8, steps: i32) -> i32 {
    let shift = SCALE_FACTOR_SHIFT[scale_factor_index as usize] as i32;
    let mult = SCALE_FACTOR_MULT[scale_factor_index as usize] as i64;

    let mut q1: i64 = if shift < 0 {
        (sample as i64) << (-shift)
    } else {
        (sample as i64) >> shift
    };
    q1 = (q1 * mult) >> P;
    q1 += 1i64 << P;
    if q1 < 0 {
        q1 = 0;
    }
    let mut q = ((q1 * steps as i64) >> (P + 1)) as i32;
    if q >= steps {
        q = steps - 1;
    }
    debug_assert!((0..steps).contains(&q));
    q
}
