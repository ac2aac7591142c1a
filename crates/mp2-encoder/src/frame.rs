//! Bit writer and Layer II frame packer.

use crate::analysis::FRAME_BLOCKS;
use crate::quantizer::quantize_sample;
use crate::tables::{QUANT_BITS, QUANT_STEPS};

const MAX_CHANNELS: usize = 2;
const SBLIMIT: usize = 32;

const MPA_STEREO: u32 = 0;
const MPA_MONO: u32 = 3;

/// MSB-first bit writer over a caller-owned output slice.
///
/// Mirrors the reference encoder's `PutBitContext`: bits accumulate until a
/// full byte is ready, then it's written out big-endian. Writing past the
/// end of `output` is a programmer error (a malformed `frame_size_bits`
/// computation), not a recoverable condition, so it's a hard assertion.
pub struct BitWriter<'a> {
    output: &'a mut [u8],
    pos: usize,
    bit_buf: u32,
    bits_in_buf: u32,
}

impl<'a> BitWriter<'a> {
    pub fn new(output: &'a mut [u8]) -> Self {
        Self {
            output,
            pos: 0,
            bit_buf: 0,
            bits_in_buf: 0,
        }
    }

    /// Total bits written so far, including any bits still buffered.
    pub fn bit_count(&self) -> usize {
        self.pos * 8 + self.bits_in_buf as usize
    }

    /// Write the low `num_bits` bits of `value`, MSB first.
    pub fn put(&mut self, value: u32, num_bits: u32) {
        debug_assert!(num_bits <= 31);
        debug_assert!(value < (1u32 << num_bits));

        self.bit_buf = (self.bit_buf << num_bits) | value;
        self.bits_in_buf += num_bits;

        while self.bits_in_buf >= 8 {
            self.bits_in_buf -= 8;
            let byte = ((self.bit_buf >> self.bits_in_buf) & 0xff) as u8;
            assert!(self.pos < self.output.len(), "bit writer overran output buffer");
            self.output[self.pos] = byte;
            self.pos += 1;
        }
    }

    /// Pad the last partial byte with zeros and write it out.
    pub fn flush(&mut self) -> usize {
        if self.bits_in_buf > 0 {
            let pad = 8 - self.bits_in_buf;
            let byte = ((self.bit_buf << pad) & 0xff) as u8;
            assert!(self.pos < self.output.len(), "bit writer overran output buffer");
            self.output[self.pos] = byte;
            self.pos += 1;
        }
        self.bit_buf = 0;
        self.bits_in_buf = 0;
        self.pos
    }
}

/// Emit one complete Layer II frame: header, bit-allocation table, scale
/// codes, scale factors, quantized samples, and zero padding. Returns the
/// number of bytes written.
#[allow(clippy::too_many_arguments)]
pub fn encode_frame(
    output: &mut [u8],
    lsf: bool,
    bitrate_index: usize,
    freq_index: usize,
    nb_channels: usize,
    sblimit: usize,
    alloc_table: &[u8],
    bit_alloc: &[[u8; SBLIMIT]; MAX_CHANNELS],
    scale_code: &[[u8; SBLIMIT]; MAX_CHANNELS],
    scale_factors: &[[[u8; 3]; SBLIMIT]; MAX_CHANNELS],
    sb_samples: &[[[i32; 32]; FRAME_BLOCKS]; MAX_CHANNELS],
    padding_bits: u32,
) -> usize {
    let mut w = BitWriter::new(output);

    w.put(0xfff, 12);
    w.put(if lsf { 0 } else { 1 }, 1);
    w.put(4 - 2, 2);
    w.put(1, 1);
    w.put(bitrate_index as u32, 4);
    w.put(freq_index as u32, 2);
    w.put(0, 1); // padding bit: fractional-padding accumulator not implemented
    w.put(0, 1); // private bit
    w.put(if nb_channels == 2 { MPA_STEREO } else { MPA_MONO }, 2);
    w.put(0, 2); // mode_ext
    w.put(0, 1); // no copyright
    w.put(1, 1); // original
    w.put(0, 2); // no emphasis

    {
        let mut j = 0usize;
        for sb in 0..sblimit {
            let bit_alloc_bits = alloc_table[j] as u32;
            for ch in 0..nb_channels {
                w.put(bit_alloc[ch][sb] as u32, bit_alloc_bits);
            }
            j += 1usize << bit_alloc_bits;
        }
    }

    for sb in 0..sblimit {
        for ch in 0..nb_channels {
            if bit_alloc[ch][sb] != 0 {
                w.put(scale_code[ch][sb] as u32, 2);
            }
        }
    }

    for sb in 0..sblimit {
        for ch in 0..nb_channels {
            if bit_alloc[ch][sb] != 0 {
                let sf = &scale_factors[ch][sb];
                match scale_code[ch][sb] {
                    0 => {
                        w.put(sf[0] as u32, 6);
                        w.put(sf[1] as u32, 6);
                        w.put(sf[2] as u32, 6);
                    }
                    3 | 1 => {
                        w.put(sf[0] as u32, 6);
                        w.put(sf[2] as u32, 6);
                    }
                    2 => {
                        w.put(sf[0] as u32, 6);
                    }
                    _ => unreachable!("scale_code is always in 0..4"),
                }
            }
        }
    }

    for k in 0..3usize {
        let mut l = 0usize;
        while l < 12 {
            let mut j = 0usize;
            for sb in 0..sblimit {
                let bit_alloc_bits = alloc_table[j] as u32;
                for ch in 0..nb_channels {
                    let b = bit_alloc[ch][sb] as usize;
                    if b != 0 {
                        let qindex = alloc_table[j + b] as usize;
                        let steps = QUANT_STEPS[qindex];
                        let mut q = [0i32; 3];
                        for m in 0..3 {
                            let sample = sb_samples[ch][k * 12 + l + m][sb];
                            q[m] = quantize_sample(sample, scale_factors[ch][sb][k], steps);
                        }
                        let bits = QUANT_BITS[qindex];
                        if bits < 0 {
                            let packed = q[0] + steps * (q[1] + steps * q[2]);
                            w.put(packed as u32, (-bits) as u32);
                        } else {
                            w.put(q[0] as u32, bits as u32);
                            w.put(q[1] as u32, bits as u32);
                            w.put(q[2] as u32, bits as u32);
                        }
                    }
                }
                j += 1usize << bit_alloc_bits;
            }
            l += 3;
        }
    }

    for _ in 0..padding_bits {
        w.put(0, 1);
    }

    w.flush()
}
