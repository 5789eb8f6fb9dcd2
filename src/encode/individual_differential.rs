// ETC1-core color sub-encoder: Individual and Differential modes. See
// spec.md section 4.2.1. Grounded on the crate's own `decode.rs` bit
// layout (the encoder and decoder must agree on it exactly) and, for the
// "average, then search the closest intensity table" strategy, the kind
// of mean-reduction pass `txfm.rs` runs before a real DCT search in the
// teacher.

use crate::block::{Block, Orientation, Rgba16};
use crate::codeword::BitWriter;
use crate::decode::{expand_4_to_8, expand_5_to_8};
use crate::encode::ColorCandidate;
use crate::format::Format;
use crate::metric::pixel_rgb_loss;
use crate::tables::{self, MODIFIER_TABLE, SCRAMBLE};

/// The chosen table and per-pixel search-order codes (`0..4`, natural
/// order `+a,+b,-b,-a`) for one half of a block, plus the summed loss of
/// that choice against the source pixels (transparent pixels excluded).
struct HalfFit {
  table: u8,
  codes: [u8; 8],
  loss: i64,
}

/// Quantize an 8-bit-domain mean to `bits` bits, rounding to nearest.
/// Shared with `encode::th` and `encode::planar`, which quantize cluster
/// centroids and plane coefficients the same way.
pub(crate) fn quantize(mean: f64, bits: u32) -> u8 {
  let max = (1u32 << bits) - 1;
  crate::util::clamp((mean / 255.0 * max as f64).round() as i32, 0, max as i32) as u8
}

fn mean_rgb(pixels: &[Rgba16; 8], transparent: &[bool; 8]) -> (f64, f64, f64) {
  let mut sum = (0.0f64, 0.0f64, 0.0f64);
  let mut count = 0u32;
  for i in 0..8 {
    if transparent[i] {
      continue;
    }
    sum.0 += (pixels[i].r >> 8) as f64;
    sum.1 += (pixels[i].g >> 8) as f64;
    sum.2 += (pixels[i].b >> 8) as f64;
    count += 1;
  }
  if count == 0 {
    return (0.0, 0.0, 0.0);
  }
  (sum.0 / count as f64, sum.1 / count as f64, sum.2 / count as f64)
}

/// Search all 8 intensity tables for the one that best reproduces this
/// half's pixels given a fixed expanded-to-8-bit `base` color. Transparent
/// pixels don't contribute to the loss and get a placeholder code (it's
/// overwritten with the reserved punch-through index afterward).
fn fit_half(pixels: &[Rgba16; 8], transparent: &[bool; 8], base: (u8, u8, u8)) -> HalfFit {
  let mut best: Option<HalfFit> = None;
  for table in 0..8u8 {
    let mut codes = [0u8; 8];
    let mut loss = 0i64;
    for i in 0..8 {
      if transparent[i] {
        continue;
      }
      let mut best_code = 0u8;
      let mut best_pixel_loss = i64::MAX;
      for search_index in 0..4u8 {
        let modifier = MODIFIER_TABLE[table as usize][search_index as usize];
        let candidate = Rgba16::new(
          tables::clamp_add(base.0 as i32, modifier) as u16 * 257,
          tables::clamp_add(base.1 as i32, modifier) as u16 * 257,
          tables::clamp_add(base.2 as i32, modifier) as u16 * 257,
          0xFFFF,
        );
        let pixel_loss = pixel_rgb_loss(pixels[i], candidate);
        if pixel_loss < best_pixel_loss {
          best_pixel_loss = pixel_loss;
          best_code = search_index;
        }
      }
      codes[i] = best_code;
      loss += best_pixel_loss;
    }
    if best.as_ref().map(|b| loss < b.loss).unwrap_or(true) {
      best = Some(HalfFit { table, codes, loss });
    }
  }
  best.expect("8 tables searched")
}

/// Encode `block` as a single 8-byte color codeword, choosing between
/// Individual and Differential modes and between the two half
/// orientations, whichever combination minimizes total RGB loss.
/// `reserve_transparent_index` forces Individual mode and reserves the
/// stored 2-bit code `2` for any pixel with zero alpha (spec.md section
/// 4.6, rule 4; this crate's convention only supports the reservation in
/// Individual mode, documented in `decode.rs`).
pub fn encode(_format: Format, block: &Block, reserve_transparent_index: bool) -> ColorCandidate {
  let transparent_mask: [bool; 16] = {
    let mut mask = [false; 16];
    if reserve_transparent_index {
      for (i, p) in block.pixels().iter().enumerate() {
        mask[i] = p.a == 0;
      }
    }
    mask
  };

  let mut best: Option<(Orientation, bool, (u8, u8, u8), (u8, u8, u8), HalfFit, HalfFit)> = None;

  for orientation in Orientation::ALL {
    let half_pixels = [block.half(orientation, 0), block.half(orientation, 1)];
    let half_numbers = [orientation.pixel_numbers(0), orientation.pixel_numbers(1)];
    let half_transparent: [[bool; 8]; 2] = [
      std::array::from_fn(|i| transparent_mask[half_numbers[0][i]]),
      std::array::from_fn(|i| transparent_mask[half_numbers[1][i]]),
    ];

    let mean0 = mean_rgb(&half_pixels[0], &half_transparent[0]);
    let mean1 = mean_rgb(&half_pixels[1], &half_transparent[1]);

    // Individual: each half gets its own 4-bit base.
    let base0_4 = (quantize(mean0.0, 4), quantize(mean0.1, 4), quantize(mean0.2, 4));
    let base1_4 = (quantize(mean1.0, 4), quantize(mean1.1, 4), quantize(mean1.2, 4));
    let expanded0_4 = (expand_4_to_8(base0_4.0), expand_4_to_8(base0_4.1), expand_4_to_8(base0_4.2));
    let expanded1_4 = (expand_4_to_8(base1_4.0), expand_4_to_8(base1_4.1), expand_4_to_8(base1_4.2));
    let fit0_individual = fit_half(&half_pixels[0], &half_transparent[0], expanded0_4);
    let fit1_individual = fit_half(&half_pixels[1], &half_transparent[1], expanded1_4);
    let individual_loss = fit0_individual.loss + fit1_individual.loss;
    consider(&mut best, orientation, false, base0_4, base1_4, fit0_individual, fit1_individual, individual_loss);

    if reserve_transparent_index {
      // Differential can't represent the punch-through reservation in
      // this crate's convention; only Individual is considered.
      continue;
    }

    // Differential: a shared 5-bit base0 plus a per-channel delta in
    // [-4, 3] giving base1. Only viable when every channel's delta fits.
    let base0_5 = (quantize(mean0.0, 5), quantize(mean0.1, 5), quantize(mean0.2, 5));
    let base1_5 = (quantize(mean1.0, 5), quantize(mean1.1, 5), quantize(mean1.2, 5));
    let delta = (
      base1_5.0 as i16 - base0_5.0 as i16,
      base1_5.1 as i16 - base0_5.1 as i16,
      base1_5.2 as i16 - base0_5.2 as i16,
    );
    let in_range = |d: i16| (-4..=3).contains(&d);
    if in_range(delta.0) && in_range(delta.1) && in_range(delta.2) {
      let expanded0_5 = (expand_5_to_8(base0_5.0), expand_5_to_8(base0_5.1), expand_5_to_8(base0_5.2));
      let expanded1_5 = (expand_5_to_8(base1_5.0), expand_5_to_8(base1_5.1), expand_5_to_8(base1_5.2));
      let fit0_diff = fit_half(&half_pixels[0], &half_transparent[0], expanded0_5);
      let fit1_diff = fit_half(&half_pixels[1], &half_transparent[1], expanded1_5);
      let diff_loss = fit0_diff.loss + fit1_diff.loss;
      consider(&mut best, orientation, true, base0_5, base1_5, fit0_diff, fit1_diff, diff_loss);
    }
  }

  let (orientation, differential, base0, base1, fit0, fit1) = best.expect("at least one candidate");
  ColorCandidate { bytes: pack(orientation, differential, base0, base1, &fit0, &fit1, &transparent_mask) }
}

#[allow(clippy::too_many_arguments)]
fn consider(
  best: &mut Option<(Orientation, bool, (u8, u8, u8), (u8, u8, u8), HalfFit, HalfFit)>,
  orientation: Orientation,
  differential: bool,
  base0: (u8, u8, u8),
  base1: (u8, u8, u8),
  fit0: HalfFit,
  fit1: HalfFit,
  loss: i64,
) {
  let better = match best {
    None => true,
    Some((_, _, _, _, b0, b1)) => loss < b0.loss + b1.loss,
  };
  if better {
    *best = Some((orientation, differential, base0, base1, fit0, fit1));
  }
}

fn pack(
  orientation: Orientation,
  differential: bool,
  base0: (u8, u8, u8),
  base1: (u8, u8, u8),
  fit0: &HalfFit,
  fit1: &HalfFit,
  transparent_mask: &[bool; 16],
) -> [u8; 8] {
  let mut writer: BitWriter<8> = BitWriter::new();

  let write_channel = |writer: &mut BitWriter<8>, c0: u8, c1: u8| {
    if differential {
      let delta = c1 as i16 - c0 as i16;
      writer.write_bits(c0 as u32, 5);
      writer.write_bits((delta as i8 as u8 & 0x7) as u32, 3);
    } else {
      writer.write_bits(((c0 << 4) | c1) as u32, 8);
    }
  };
  write_channel(&mut writer, base0.0, base1.0);
  write_channel(&mut writer, base0.1, base1.1);
  write_channel(&mut writer, base0.2, base1.2);

  writer.write_bits(fit0.table as u32, 3);
  writer.write_bits(fit1.table as u32, 3);
  writer.write_bits(differential as u32, 1);
  writer.write_bits(orientation.flip_bit() as u32, 1);

  let half_numbers = [orientation.pixel_numbers(0), orientation.pixel_numbers(1)];
  let mut stored_codes = [0u8; 16];
  for i in 0..8 {
    stored_codes[half_numbers[0][i]] = SCRAMBLE[fit0.codes[i] as usize];
  }
  for i in 0..8 {
    stored_codes[half_numbers[1][i]] = SCRAMBLE[fit1.codes[i] as usize];
  }
  for (pixel, &transparent) in transparent_mask.iter().enumerate() {
    if transparent {
      stored_codes[pixel] = 2;
    }
  }
  for &code in stored_codes.iter() {
    writer.write_bits(code as u32, 2);
  }

  writer.finish()
}
