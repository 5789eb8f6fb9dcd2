// Planar mode sub-encoder. See spec.md section 4.2.4. Fits the three
// base colors (Origin, Horizontal, Vertical) by least squares against
// `tables::PLANAR_WEIGHTS`, the same fixed per-pixel geometry
// `decode.rs`'s `plane_reconstruct` consumes — see `tables.rs`'s doc
// comment on why solving directly replaces transcribing the spec's
// literal Z/C matrices.

use crate::block::Block;
use crate::codeword::{self, BitWriter};
use crate::encode::individual_differential::quantize;
use crate::encode::ColorCandidate;
use crate::tables::PLANAR_WEIGHTS;

/// Solve the 3x3 normal-equations system `lhs * x = rhs` by Cramer's rule.
/// `lhs` is symmetric positive-definite for any non-degenerate design
/// matrix, which `PLANAR_WEIGHTS`'s 16 distinct `(x, y)` rows guarantee.
fn solve3x3(lhs: [[f64; 3]; 3], rhs: [f64; 3]) -> [f64; 3] {
  let det3 = |m: [[f64; 3]; 3]| -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
      - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
      + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
  };
  let d = det3(lhs);
  if d.abs() < 1e-9 {
    return [rhs[0], rhs[1], rhs[2]];
  }
  let mut solution = [0.0f64; 3];
  for col in 0..3 {
    let mut m = lhs;
    for row in 0..3 {
      m[row][col] = rhs[row];
    }
    solution[col] = det3(m) / d;
  }
  solution
}

/// The fixed Gram matrix `A^T A` of the planar design matrix, built once
/// per call from `PLANAR_WEIGHTS` (cheap: 16 terms, no allocation).
fn gram_matrix() -> [[f64; 3]; 3] {
  let mut m = [[0.0f64; 3]; 3];
  for weights in PLANAR_WEIGHTS.iter() {
    for i in 0..3 {
      for j in 0..3 {
        m[i][j] += weights[i] as f64 * weights[j] as f64;
      }
    }
  }
  m
}

/// Least-squares fit of `(O, H, V)` for one channel, given per-pixel
/// target values in `tables::pixel_number` order.
fn fit_channel(lhs: [[f64; 3]; 3], targets: &[f64; 16]) -> (f64, f64, f64) {
  let mut rhs = [0.0f64; 3];
  for (i, weights) in PLANAR_WEIGHTS.iter().enumerate() {
    for k in 0..3 {
      rhs[k] += weights[k] as f64 * targets[i];
    }
  }
  let solution = solve3x3(lhs, rhs);
  (solution[0], solution[1], solution[2])
}

/// Encode `block` in Planar mode. Origin is quantized to spec.md section
/// 4.2.4's 6/7/6-bit (R/G/B) precision; Horizontal and Vertical share that
/// precision but carry no overflow constraint of their own.
pub fn encode(block: &Block) -> ColorCandidate {
  let lhs = gram_matrix();
  let mut targets = [[0.0f64; 16]; 3];
  for (i, pixel) in block.pixels().iter().enumerate() {
    targets[0][i] = (pixel.r >> 8) as f64;
    targets[1][i] = (pixel.g >> 8) as f64;
    targets[2][i] = (pixel.b >> 8) as f64;
  }

  let (or, hr, vr) = fit_channel(lhs, &targets[0]);
  let (og, hg, vg) = fit_channel(lhs, &targets[1]);
  let (ob, hb, vb) = fit_channel(lhs, &targets[2]);

  let q = |v: f64, bits: u32| quantize(crate::util::clamp(v, 0.0, 255.0), bits);
  ColorCandidate {
    bytes: pack(
      (q(or, 6), q(og, 7), q(ob, 6)),
      (q(hr, 6), q(hg, 7), q(hb, 6)),
      (q(vr, 6), q(vg, 7), q(vb, 6)),
    ),
  }
}

/// Pack Origin/Horizontal/Vertical (6/7/6 bits per R/G/B) into the layout
/// `decode.rs`'s `decode_planar` expects: Origin-R and Origin-G go through
/// `codeword::pack_safe_component` (never overflow, regardless of value);
/// Origin-B is the forced-overflow tag channel, split as its top 4 bits
/// (through `codeword::pack_forced_overflow`) plus one spare bit tucked
/// into Origin-R's safe-component byte (which has 7 bits of carrying
/// capacity for a 6-bit value) and one more in the otherwise-unused flip
/// bit. Horizontal and Vertical have no overflow constraint and are
/// packed as plain fields across `table1`, `table2`, and the 32-bit index
/// field, which Planar mode repurposes entirely (it needs no per-pixel
/// 2-bit indices of its own).
fn pack(origin: (u8, u8, u8), horizontal: (u8, u8, u8), vertical: (u8, u8, u8)) -> [u8; 8] {
  let mut writer: BitWriter<8> = BitWriter::new();

  let ob_bit0 = origin.2 & 1;
  let ob_bit1 = (origin.2 >> 1) & 1;
  let ob_hi4 = origin.2 >> 2;

  let ob_r_byte = (ob_bit0 << 6) | origin.0;
  writer.write_bits(codeword::pack_safe_component(ob_r_byte) as u32, 8);
  writer.write_bits(codeword::pack_safe_component(origin.1) as u32, 8);
  writer.write_bits(codeword::pack_forced_overflow(ob_hi4) as u32, 8);
  writer.write_bits(0, 3); // table1: overwritten below by pack_planar_fields
  writer.write_bits(0, 3); // table2: likewise
  writer.write_bits(1, 1); // diff bit: Planar always sets it
  writer.write_bits(ob_bit1 as u32, 1);
  writer.write_bits(0, 32); // indices: overwritten below by pack_planar_fields

  let mut bytes = writer.finish();
  let mut field_writer = PlanarFieldWriter::new();
  field_writer.push(horizontal.0, 6);
  field_writer.push(horizontal.1, 7);
  field_writer.push(horizontal.2, 6);
  field_writer.push(vertical.0, 6);
  field_writer.push(vertical.1, 7);
  field_writer.push(vertical.2, 6);
  let (table1, table2, indices) = field_writer.finish();
  pack_planar_fields(&mut bytes, table1, table2, indices);
  bytes
}

/// Builds the 38-bit `table1 || table2 || indices` payload Horizontal and
/// Vertical share (mirror of `decode.rs`'s `PlanarFieldReader`).
struct PlanarFieldWriter {
  combined: u64,
  pos: u32,
}

impl PlanarFieldWriter {
  fn new() -> Self {
    Self { combined: 0, pos: 0 }
  }

  /// Append the low `n` (<= 19) bits of `value`, most significant bit
  /// first.
  fn push(&mut self, value: u8, n: u32) {
    let shift = 38 - self.pos - n;
    self.combined |= (value as u64 & ((1u64 << n) - 1)) << shift;
    self.pos += n;
  }

  fn finish(self) -> (u8, u8, u32) {
    debug_assert_eq!(self.pos, 38);
    let table1 = ((self.combined >> 35) & 0x7) as u8;
    let table2 = ((self.combined >> 32) & 0x7) as u8;
    let indices = (self.combined & 0xFFFF_FFFF) as u32;
    (table1, table2, indices)
  }
}

/// Overwrite the fixed header's `table1`/`table2`/`flip_bit`-adjacent
/// region of `bytes` with the bit-exact `table1`/`table2`/`indices`
/// triple `read_raw_header` will later split back out. Rewriting these
/// three fields directly (rather than threading them through
/// `BitWriter`, which has already committed the earlier fields) keeps
/// `pack`'s header layout and this payload layout visibly separate.
fn pack_planar_fields(bytes: &mut [u8; 8], table1: u8, table2: u8, indices: u32) {
  let diff_bit = (bytes[3] >> 1) & 1;
  let flip_bit = bytes[3] & 1;
  bytes[3] = (table1 << 5) | (table2 << 2) | (diff_bit << 1) | flip_bit;
  bytes[4..8].copy_from_slice(&indices.to_be_bytes());
}
