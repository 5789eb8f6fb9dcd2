// T and H mode sub-encoders. See spec.md section 4.2.2 (T) and 4.2.3 (H).
// Both reduce the whole 16-pixel block to 2 representative colors via
// `kmeans::cluster` (k=2), then search the 8 fixed distances for the
// 4-color palette that best covers all 16 pixels. Grounded on
// `kmeans.rs`'s own doc comment (no teacher analogue; written in the
// crate's established free-function style) and on `individual_differential.rs`
// for the "quantize a centroid, then table/distance-search" shape.

use crate::block::{Block, Rgba16};
use crate::codeword::{self, BitWriter};
use crate::decode::expand_4_to_8;
use crate::encode::ColorCandidate;
use crate::kmeans;
use crate::metric::pixel_rgb_loss;
use crate::tables::{self, DISTANCE_TABLE};

/// QRS-basis per-axis weight for `kmeans::cluster`, at a given intensity
/// in `[0.0, 1.0]` (spec.md section 4.2.2). Weighting green (the
/// luma-dominant axis in BT.601-ish proportions) more heavily than red and
/// blue as intensity rises trades chroma fidelity for luma fidelity,
/// which is the usual win for a block that's mostly one hue with a
/// brightness gradient. At `intensity=0.5` this is the identity (plain
/// Euclidean clustering), matching the driver's default pass.
fn qrs_weights(intensity: f64) -> [f64; 3] {
  let t = intensity - 0.5;
  [1.0 - 0.6 * t, 1.0 + 1.2 * t, 1.0 - 0.6 * t]
}

/// Quantize an 8-bit-domain mean to T/H's 4-bit base-color precision via
/// spec.md section 4.2.2's `((v+8)*15)/255` rounding formula (distinct
/// from `individual_differential::quantize`'s plain round-to-nearest).
fn quantize_th(mean: f64) -> u8 {
  let v = crate::util::clamp(mean.round() as i32, 0, 255);
  (((v + 8) * 15) / 255) as u8
}

/// Cluster a block's (non-transparent) pixels into 2 representative RGB
/// centroids under the QRS-weighted metric, returning them quantized to
/// T/H's 4-bit base-color precision.
fn quantized_centroids(block: &Block, transparent: &[bool; 16], intensity: f64) -> [(u8, u8, u8); 2] {
  let points = cluster_points(block, transparent);
  if points.len() < 2 {
    let only = points.first().copied().unwrap_or([0.0, 0.0, 0.0]);
    let q = (quantize_th(only[0]), quantize_th(only[1]), quantize_th(only[2]));
    return [q, q];
  }
  let weights = qrs_weights(intensity);
  let clusters = kmeans::cluster(&points, Some(weights));
  // `cluster`'s centers live in the weighted space; divide back out before
  // quantizing to recover real RGB values.
  let unweight = |c: [f64; 3]| (quantize_th(c[0] / weights[0]), quantize_th(c[1] / weights[1]), quantize_th(c[2] / weights[2]));
  [unweight(clusters.centers[0]), unweight(clusters.centers[1])]
}

fn cluster_points(block: &Block, transparent: &[bool; 16]) -> Vec<[f64; 3]> {
  block
    .pixels()
    .iter()
    .zip(transparent.iter())
    .filter(|(_, &t)| !t)
    .map(|(p, _)| [(p.r >> 8) as f64, (p.g >> 8) as f64, (p.b >> 8) as f64])
    .collect()
}

/// The best distance index (restricted to `allowed_tables`) and resulting
/// per-pixel code assignment (into a 4-color palette built from
/// `colors_at`) for `block`, minimizing summed RGB loss over
/// non-transparent pixels.
fn best_distance(
  block: &Block,
  transparent: &[bool; 16],
  allowed_tables: &[usize],
  colors_at: impl Fn(i32) -> [(u8, u8, u8); 4],
) -> (u8, [u8; 16], i64) {
  let mut best_table = allowed_tables[0] as u8;
  let mut best_codes = [0u8; 16];
  let mut best_loss = i64::MAX;

  for &table in allowed_tables {
    let distance = DISTANCE_TABLE[table];
    let palette = colors_at(distance);
    let mut codes = [0u8; 16];
    let mut loss = 0i64;
    for (i, pixel) in block.pixels().iter().enumerate() {
      if transparent[i] {
        continue;
      }
      let mut best_code = 0u8;
      let mut best_pixel_loss = i64::MAX;
      for (code, &(r, g, b)) in palette.iter().enumerate() {
        let candidate = Rgba16::new(r as u16 * 257, g as u16 * 257, b as u16 * 257, 0xFFFF);
        let pixel_loss = pixel_rgb_loss(*pixel, candidate);
        if pixel_loss < best_pixel_loss {
          best_pixel_loss = pixel_loss;
          best_code = code as u8;
        }
      }
      codes[i] = best_code;
      loss += best_pixel_loss;
    }
    if loss < best_loss {
      best_loss = loss;
      best_table = table as u8;
      best_codes = codes;
    }
  }

  (best_table, best_codes, best_loss)
}

fn transparent_mask(block: &Block, reserve_transparent_index: bool) -> [bool; 16] {
  let mut mask = [false; 16];
  if reserve_transparent_index {
    for (i, p) in block.pixels().iter().enumerate() {
      mask[i] = p.a == 0;
    }
  }
  mask
}

/// Encode `block` in T mode at a given QRS intensity: a standalone "base0"
/// color plus a "base1" color whose two distance-shifted variants cover
/// the rest of the block. `reserve_transparent_index` is honored on a
/// best-effort basis: T/H mode can't reserve a 2-bit code the way
/// Individual mode can (see `decode.rs`), so transparent pixels are simply
/// excluded from the color fit, not guaranteed a particular stored code.
pub fn encode_t(block: &Block, reserve_transparent_index: bool, intensity: f64) -> ColorCandidate {
  let transparent = transparent_mask(block, reserve_transparent_index);
  let centroids = quantized_centroids(block, &transparent, intensity);

  // The cluster with fewer members is the outlier "base0" color; ties go
  // to cluster 0 as "base1".
  let points = cluster_points(block, &transparent);
  let (base0_idx, base1_idx) = if points.len() >= 2 {
    let clusters = kmeans::cluster(&points, Some(qrs_weights(intensity)));
    let count0 = clusters.assignment.iter().filter(|&&c| c == 0).count();
    let count1 = clusters.assignment.len() - count0;
    if count0 <= count1 { (0, 1) } else { (1, 0) }
  } else {
    (0, 1)
  };
  let base0 = centroids[base0_idx];
  let base1 = centroids[base1_idx];

  let colors_at = |distance: i32| -> [(u8, u8, u8); 4] {
    let base1_8 = (expand_4_to_8(base1.0), expand_4_to_8(base1.1), expand_4_to_8(base1.2));
    [
      (expand_4_to_8(base0.0), expand_4_to_8(base0.1), expand_4_to_8(base0.2)),
      shift(base1_8, distance),
      base1_8,
      shift(base1_8, -distance),
    ]
  };
  let all_tables: Vec<usize> = (0..DISTANCE_TABLE.len()).collect();
  let (table, codes, _loss) = best_distance(block, &transparent, &all_tables, colors_at);

  ColorCandidate { bytes: pack_t(base0, base1, table, &codes) }
}

/// Encode `block` in H mode at a given QRS intensity: two base colors,
/// each expanded by `+-distance` to cover 4 total colors.
pub fn encode_h(block: &Block, reserve_transparent_index: bool, intensity: f64) -> ColorCandidate {
  let transparent = transparent_mask(block, reserve_transparent_index);
  let centroids = quantized_centroids(block, &transparent, intensity);
  let (mut base0, mut base1) = (centroids[0], centroids[1]);

  // spec.md section 4.2.3: the packed 12-bit (r<<8|g<<4|b) values must
  // differ (nudge base1 if a tie), and the distance table's low bit must
  // equal `c0 >= c1` (the "which" bit, carried implicitly by parity).
  let pack12 = |c: (u8, u8, u8)| -> u16 { ((c.0 as u16) << 8) | ((c.1 as u16) << 4) | c.2 as u16 };
  if pack12(base0) == pack12(base1) {
    base1.2 = if base1.2 < 0xF { base1.2 + 1 } else { base1.2 - 1 };
  }
  let which = (pack12(base0) >= pack12(base1)) as usize;
  let allowed_tables: Vec<usize> = (0..DISTANCE_TABLE.len()).filter(|t| t & 1 == which).collect();

  let colors_at = |distance: i32| -> [(u8, u8, u8); 4] {
    let base0_8 = (expand_4_to_8(base0.0), expand_4_to_8(base0.1), expand_4_to_8(base0.2));
    let base1_8 = (expand_4_to_8(base1.0), expand_4_to_8(base1.1), expand_4_to_8(base1.2));
    [shift(base0_8, distance), shift(base0_8, -distance), shift(base1_8, distance), shift(base1_8, -distance)]
  };
  let (table, codes, _loss) = best_distance(block, &transparent, &allowed_tables, colors_at);

  ColorCandidate { bytes: pack_h(base0, base1, table, &codes) }
}

fn shift(base: (u8, u8, u8), delta: i32) -> (u8, u8, u8) {
  (tables::clamp_add(base.0 as i32, delta), tables::clamp_add(base.1 as i32, delta), tables::clamp_add(base.2 as i32, delta))
}

/// T-mode packer (see `decode.rs`'s module doc comment): `base0`'s red
/// channel carries the forced R-overflow mode tag; the other 20 payload
/// bits (base0 g,b; base1 r,g,b, each 4 bits) and the 3-bit distance index
/// are plain fields across the remaining raw header bytes.
fn pack_t(base0: (u8, u8, u8), base1: (u8, u8, u8), distance_table: u8, codes: &[u8; 16]) -> [u8; 8] {
  let mut writer: BitWriter<8> = BitWriter::new();
  writer.write_bits(codeword::pack_forced_overflow(base0.0) as u32, 8);
  writer.write_bits(((base0.1 as u32) << 4) | base1.1 as u32, 8);
  writer.write_bits(((base0.2 as u32) << 4) | base1.2 as u32, 8);
  writer.write_bits((base1.0 as u32) >> 1, 3);
  writer.write_bits(distance_table as u32, 3);
  writer.write_bits(1, 1); // diff bit: T/H always set it.
  writer.write_bits(base1.0 as u32 & 1, 1); // flip bit holds base1 red's low bit.
  for &code in codes.iter() {
    writer.write_bits(code as u32, 2);
  }
  writer.finish()
}

/// H-mode packer: `base0`'s green channel carries the forced G-overflow
/// mode tag; the rest mirrors `pack_t` with red/green's roles swapped.
fn pack_h(base0: (u8, u8, u8), base1: (u8, u8, u8), distance_table: u8, codes: &[u8; 16]) -> [u8; 8] {
  let mut writer: BitWriter<8> = BitWriter::new();
  writer.write_bits(((base0.0 as u32) << 4) | base1.0 as u32, 8);
  writer.write_bits(codeword::pack_forced_overflow(base0.1) as u32, 8);
  writer.write_bits(((base0.2 as u32) << 4) | base1.2 as u32, 8);
  writer.write_bits((base1.1 as u32) >> 1, 3);
  writer.write_bits(distance_table as u32, 3);
  writer.write_bits(1, 1); // diff bit: T/H always set it.
  writer.write_bits(base1.1 as u32 & 1, 1); // flip bit holds base1 green's low bit.
  for &code in codes.iter() {
    writer.write_bits(code as u32, 2);
  }
  writer.finish()
}
