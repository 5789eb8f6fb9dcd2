// EAC 8-bit alpha sub-encoder. See spec.md section 4.3. A coarse-to-fine
// search in the same spirit as `th.rs`'s distance search: start from the
// block's mean alpha, then sweep the (table, multiplier) space and a
// small neighborhood of candidate bases, keeping whichever minimizes
// squared error.

use crate::block::Block;
use crate::codeword::BitWriter;
use crate::encode::EacCandidate;
use crate::tables::EAC_MODIFIER_TABLE;
use crate::util::clamp;

/// The column-major, bit-reversed index ordering spec.md section 4.3
/// assigns each pixel's 3-bit code within the 48-bit index field.
fn index_shift(pixel: usize) -> u32 {
  let x = (pixel & 3) as u32;
  let y = (pixel >> 2) as u32;
  (((x ^ 3) * 4) | (y ^ 3)) * 3
}

/// Total squared error and the per-pixel 3-bit codes for a given
/// `(base, multiplier, table)` triple against `targets` (8-bit domain).
///
/// Each table row (`tables::EAC_MODIFIER_TABLE`) is two monotone-magnitude
/// halves: codes 0-3 are increasingly negative, codes 4-7 increasingly
/// positive. For a given pixel the best code always lies in the half
/// matching the sign of `target - base` (spec.md section 4.3), and within
/// that half the per-pixel error is unimodal in code index, so rather
/// than scoring all 8 codes this walks outward from the smallest-magnitude
/// code of the matching half and stops the instant error stops improving.
fn score(base: i32, multiplier: i32, table: usize, targets: &[i32; 16]) -> (i64, [u8; 16]) {
  let effective_multiplier = multiplier.max(1);
  let row = &EAC_MODIFIER_TABLE[table];
  let mut codes = [0u8; 16];
  let mut loss = 0i64;
  for (i, &target) in targets.iter().enumerate() {
    let half = if target >= base { 4..8 } else { 0..4 };
    let mut best_code = half.start as u8;
    let mut best_loss = i64::MAX;
    for code in half {
      let value = clamp(base + row[code] * effective_multiplier, 0, 255);
      let d = (value - target) as i64;
      let pixel_loss = d * d;
      if pixel_loss >= best_loss {
        break;
      }
      best_loss = pixel_loss;
      best_code = code as u8;
    }
    codes[i] = best_code;
    loss += best_loss;
  }
  (loss, codes)
}

/// Narrow a `(loss, base, multiplier, table, codes)` search over every
/// `step`-spaced base in `[lo, hi]`, keeping whichever improves on `best`.
fn search_bases(
  lo: i32,
  hi: i32,
  step: i32,
  targets: &[i32; 16],
  mut best: (i64, u8, u8, usize, [u8; 16]),
) -> (i64, u8, u8, usize, [u8; 16]) {
  let mut base = lo;
  while base <= hi {
    for table in 0..16 {
      for multiplier in 0..16 {
        let (loss, codes) = score(base, multiplier, table, targets);
        if loss < best.0 {
          best = (loss, base as u8, multiplier as u8, table, codes);
        }
      }
    }
    base += step;
  }
  best
}

/// Encode `block`'s alpha channel (`Rgba16::a`, scaled down to 8 bits) as
/// an EAC codeword. The base search starts from a bracket sized to the
/// block's actual spread (`mean +- max deviation`, not a fixed +-4), then
/// refines coarse-to-fine (step 16, then 4, then 1) around the best base
/// found at each step, rather than exhaustively scoring every base in a
/// narrow fixed window (spec.md section 4.3).
pub fn encode(block: &Block) -> EacCandidate {
  let targets: [i32; 16] = std::array::from_fn(|i| (block.pixels()[i].a >> 8) as i32);
  let mean = targets.iter().sum::<i32>() / 16;
  let max_dev = targets.iter().map(|&t| (t - mean).abs()).max().unwrap_or(0).max(1);

  let mut best = (i64::MAX, 0u8, 0u8, 0usize, [0u8; 16]);
  best = search_bases(clamp(mean - max_dev, 0, 255), clamp(mean + max_dev, 0, 255), 16, &targets, best);
  let coarse_center = best.1 as i32;
  best = search_bases(clamp(coarse_center - 16, 0, 255), clamp(coarse_center + 16, 0, 255), 4, &targets, best);
  let fine_center = best.1 as i32;
  best = search_bases(clamp(fine_center - 4, 0, 255), clamp(fine_center + 4, 0, 255), 1, &targets, best);

  let (_, base, multiplier, table, codes) = best;
  EacCandidate { bytes: pack(base, multiplier, table as u8, &codes) }
}

fn pack(base: u8, multiplier: u8, table: u8, codes: &[u8; 16]) -> [u8; 8] {
  let mut writer: BitWriter<8> = BitWriter::new();
  writer.write_bits(base as u32, 8);
  writer.write_bits(multiplier as u32, 4);
  writer.write_bits(table as u32, 4);

  let mut index_bits = 0u64;
  for (pixel, &code) in codes.iter().enumerate() {
    index_bits |= (code as u64) << index_shift(pixel);
  }
  for byte in index_bits.to_be_bytes()[2..8].iter() {
    writer.write_bits(*byte as u32, 8);
  }
  writer.finish()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::Rgba16;
  use crate::decode::decode_eac_alpha;

  #[test]
  fn flat_alpha_round_trips_closely() {
    let block = Block::filled(Rgba16::new(0, 0, 0, 0x8080));
    let candidate = encode(&block);
    let decoded = decode_eac_alpha(&candidate.bytes);
    for &a in decoded.iter() {
      assert!((a as i32 - 0x8080).abs() < 0x0800, "got {a:#06x}");
    }
  }

  #[test]
  fn fully_opaque_block_round_trips_to_max_alpha() {
    let block = Block::filled(Rgba16::new(0, 0, 0, 0xFFFF));
    let candidate = encode(&block);
    let decoded = decode_eac_alpha(&candidate.bytes);
    for &a in decoded.iter() {
      assert!(a > 0xF000, "got {a:#06x}");
    }
  }
}
