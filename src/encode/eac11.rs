// EAC 11-bit sub-encoder, shared by R11/RG11 (signed and unsigned). See
// spec.md section 4.4. Same search shape as `alpha.rs`; the domain and
// base encoding differ (11-bit magnitude, signed bases offset by 1023 to
// match `decode.rs`'s `decode_eac_11bit` convention).

use crate::block::Block;
use crate::codeword::BitWriter;
use crate::encode::EacCandidate;
use crate::tables::EAC_MODIFIER_TABLE;
use crate::util::clamp;

/// Which 11-bit channel (stored in `Rgba16::r` or `Rgba16::g` by
/// `extractor::extract_block`) this call encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
  R,
  G,
}

fn index_shift(pixel: usize) -> u32 {
  let x = (pixel & 3) as u32;
  let y = (pixel >> 2) as u32;
  (((x ^ 3) * 4) | (y ^ 3)) * 3
}

fn score(base: i32, multiplier: i32, table: usize, targets: &[i32; 16], lo: i32, hi: i32) -> (i64, [u8; 16]) {
  let mut codes = [0u8; 16];
  let mut loss = 0i64;
  for (i, &target) in targets.iter().enumerate() {
    let mut best_code = 0u8;
    let mut best_loss = i64::MAX;
    for (code, &modifier) in EAC_MODIFIER_TABLE[table].iter().enumerate() {
      let value = clamp(base + modifier * multiplier, lo, hi);
      let d = (value - target) as i64;
      let pixel_loss = d * d;
      if pixel_loss < best_loss {
        best_loss = pixel_loss;
        best_code = code as u8;
      }
    }
    codes[i] = best_code;
    loss += best_loss;
  }
  (loss, codes)
}

/// Encode one 11-bit channel of `block` as an EAC codeword. `signed`
/// selects the `[-1023, 1023]` domain (spec.md section 4.4); the crate's
/// working representation always stores the channel as an unsigned
/// 0..=2047 value (per `extractor.rs`), so a signed encode first remaps
/// it to the `[-1023, 1023]` domain `decode_eac_11bit` expects back.
pub fn encode(block: &Block, channel: Channel, signed: bool) -> EacCandidate {
  let raw: [i32; 16] = std::array::from_fn(|i| {
    let p = block.pixels()[i];
    (if channel == Channel::R { p.r } else { p.g }) as i32
  });
  let (lo, hi) = if signed { (-1023, 1023) } else { (0, 2047) };
  let targets: [i32; 16] = if signed {
    std::array::from_fn(|i| raw[i] - 1023)
  } else {
    raw
  };
  let mean = targets.iter().sum::<i32>() / 16;

  let mut best = (i64::MAX, 0i32, 0u8, 0usize, [0u8; 16]);
  for base_delta in -16..=16 {
    let base_unscaled = clamp((mean + base_delta) / 8, lo / 8, hi / 8);
    let base = base_unscaled * 8;
    for table in 0..16 {
      for multiplier in 1..16 {
        let (loss, codes) = score(base, multiplier, table, &targets, lo, hi);
        if loss < best.0 {
          best = (loss, base_unscaled, multiplier as u8, table, codes);
        }
      }
    }
  }
  let (_, base_unscaled, multiplier, table, codes) = best;

  EacCandidate { bytes: pack(base_unscaled, multiplier, table as u8, &codes, signed) }
}

fn pack(base_unscaled: i32, multiplier: u8, table: u8, codes: &[u8; 16], signed: bool) -> [u8; 8] {
  let mut writer: BitWriter<8> = BitWriter::new();
  let base_byte = if signed { (base_unscaled as i8) as u8 } else { base_unscaled as u8 };
  writer.write_bits(base_byte as u32, 8);
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
  use crate::decode::decode_eac_11bit;

  #[test]
  fn flat_unsigned_channel_round_trips_closely() {
    let block = Block::filled(Rgba16::new(1500, 0, 0, 0xFFFF));
    let candidate = encode(&block, Channel::R, false);
    let decoded = decode_eac_11bit(&candidate.bytes, false);
    for &v in decoded.iter() {
      assert!((v as i32 - 1500).abs() < 64, "got {v}");
    }
  }

  #[test]
  fn flat_signed_channel_round_trips_closely() {
    let block = Block::filled(Rgba16::new(200, 0, 0, 0xFFFF));
    let candidate = encode(&block, Channel::R, true);
    let decoded = decode_eac_11bit(&candidate.bytes, true);
    for &v in decoded.iter() {
      assert!((v as i32 - 200).abs() < 64, "got {v}");
    }
  }
}
