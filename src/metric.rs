// Candidate scoring. See spec.md section 3 ("Error metric") and section
// 4.5 (candidate comparison across sub-encoders).

use crate::block::{Block, Rgba16};
use crate::format::{ChannelLayout, Format};

/// Integer BT.601 luma weights (sum 1000), applied per channel before
/// squaring. This is the RGB scoring metric; it is unrelated to the
/// BT.709 weights `extractor::luma_11bit` uses to derive an 11-bit
/// channel from RGB (see the note there) — the two are independent by
/// spec and must not be unified.
const WEIGHT_R: i64 = 299;
const WEIGHT_G: i64 = 587;
const WEIGHT_B: i64 = 114;

/// A candidate whose reconstruction could not be scored at all (e.g. a
/// sub-encoder that can't represent the block) sorts last.
pub const REJECTED: i64 = i64::MAX;

/// Weighted squared RGB error between two pixels, ignoring alpha. Shared
/// with the color sub-encoders' table search (`encode::individual_differential`,
/// `encode::th`), which needs the same per-pixel metric to rank candidate
/// intensity-table choices before a full block is ever assembled.
pub(crate) fn pixel_rgb_loss(a: Rgba16, b: Rgba16) -> i64 {
  let dr = a.r as i64 - b.r as i64;
  let dg = a.g as i64 - b.g as i64;
  let db = a.b as i64 - b.b as i64;
  WEIGHT_R * dr * dr + WEIGHT_G * dg * dg + WEIGHT_B * db * db
}

/// Squared error of a single 11-bit-domain channel (passed already
/// extracted into `Rgba16::r`/`g`).
fn channel_loss(a: u16, b: u16) -> i64 {
  let d = a as i64 - b as i64;
  d * d
}

/// Total reconstruction loss of `candidate` against `source`, for
/// `format`. RGBA1's transparent pixels never contribute color error
/// (spec.md section 3: a transparent texel's color bits are free, since a
/// decoder is not required to display them), so they're skipped rather
/// than scored against whatever filler color the encoder chose.
pub fn block_loss(format: Format, source: &Block, candidate: &Block) -> i64 {
  let mut total: i64 = 0;
  for i in 0..16 {
    let s = source.pixels()[i];
    let c = candidate.pixels()[i];
    match format.channel_layout() {
      ChannelLayout::Rgb1BitAlpha if s.a == 0 => {
        // Transparent: color is a don't-care, only continue if alpha
        // itself mismatches (the 1-bit alpha plane is still scored).
        total += channel_loss(s.a, c.a);
      }
      ChannelLayout::Rgb | ChannelLayout::Rgb1BitAlpha => {
        total += pixel_rgb_loss(s, c);
        total += channel_loss(s.a, c.a);
      }
      ChannelLayout::Rgba8 => {
        total += pixel_rgb_loss(s, c);
        total += channel_loss(s.a, c.a);
      }
      ChannelLayout::R11 => {
        total += channel_loss(s.r, c.r);
      }
      ChannelLayout::Rg11 => {
        total += channel_loss(s.r, c.r);
        total += channel_loss(s.g, c.g);
      }
    }
  }
  total
}
