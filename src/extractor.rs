// Block extraction: turning a `PixelSource` plus a `(Format, bx, by)`
// block coordinate into a `Block` ready for the sub-encoders. See
// spec.md section 4.1.

use crate::block::{Block, Rgba16};
use crate::format::{ChannelLayout, Format};
use crate::pixel_source::PixelSource;

/// BT.709 luma weights, used ONLY to derive the single 11-bit channel for
/// `R11`/`RG11` formats from an RGB source. This is deliberately different
/// from the BT.601 weights `metric.rs` uses to score RGB candidates: the
/// two serve different purposes (one extracts a scalar signal, the other
/// scores a reconstruction) and spec.md section 4.1 specifies them
/// independently. Do not "fix" this into a single shared weight set.
const LUMA_R: f64 = 0.212656;
const LUMA_G: f64 = 0.715158;
const LUMA_B: f64 = 0.072186;

/// Extract the 4x4 block at block coordinates `(bx, by)` (i.e. covering
/// source pixels `[bx*4, bx*4+4) x [by*4, by*4+4)`) from `source`, for
/// encoding as `format`. Pixels past the source's edge are filled by
/// replicating the nearest in-bounds pixel (edge clamp), since the source
/// dimensions need not be a multiple of 4.
pub fn extract_block<S: PixelSource + ?Sized>(source: &S, format: Format, bx: u32, by: u32) -> Block {
  let width = source.width();
  let height = source.height();
  let premultiplied = source.premultiplied();
  let mut block = Block::filled(Rgba16::OPAQUE_BLACK);

  for y in 0..4u32 {
    for x in 0..4u32 {
      let sx = (bx * 4 + x).min(width.saturating_sub(1));
      let sy = (by * 4 + y).min(height.saturating_sub(1));
      let mut pixel = source.sample(sx, sy);
      if premultiplied {
        pixel = un_premultiply(pixel);
      }
      let stored = match format.channel_layout() {
        ChannelLayout::R11 => {
          let luma = luma_11bit(pixel);
          Rgba16::new(luma, 0, 0, 0xFFFF)
        }
        ChannelLayout::Rg11 => {
          let r11 = scale_8_to_11(pixel.r >> 8);
          let g11 = scale_8_to_11(pixel.g >> 8);
          Rgba16::new(r11, g11, 0, 0xFFFF)
        }
        _ => pixel,
      };
      block.set(x as usize, y as usize, stored);
    }
  }

  block
}

/// Undo straight-alpha premultiplication: `color' = color * 0xFFFF / alpha`
/// clamped to `0xFFFF`. Leaves fully transparent pixels at `(0,0,0)`, which
/// is the spec's documented behavior for the RGBA1 transparent-pixel skip
/// rule (metric.rs never scores these channels in that case).
fn un_premultiply(pixel: Rgba16) -> Rgba16 {
  if pixel.a == 0 {
    return Rgba16::new(0, 0, 0, 0);
  }
  let unscale = |c: u16| -> u16 {
    let value = (c as u64) * (u16::MAX as u64) / (pixel.a as u64);
    value.min(u16::MAX as u64) as u16
  };
  Rgba16::new(unscale(pixel.r), unscale(pixel.g), unscale(pixel.b), pixel.a)
}

/// BT.709 luma of a 16-bit-per-channel pixel, quantized to 11 bits.
fn luma_11bit(pixel: Rgba16) -> u16 {
  let r = pixel.r as f64;
  let g = pixel.g as f64;
  let b = pixel.b as f64;
  let luma16 = LUMA_R * r + LUMA_G * g + LUMA_B * b;
  scale_16_to_11(luma16.round().clamp(0.0, u16::MAX as f64) as u16)
}

fn scale_16_to_11(value: u16) -> u16 {
  ((value as u32) * 2047 / (u16::MAX as u32)) as u16
}

fn scale_8_to_11(value: u16) -> u16 {
  ((value as u32) * 2047 / 255) as u16
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pixel_source::RawImage;

  #[test]
  fn edge_blocks_replicate_nearest_pixel() {
    let pixels = vec![Rgba16::new(5, 5, 5, 0xFFFF); 2 * 2];
    let source = RawImage::new(2, 2, pixels);
    // Block (0,0) covers a 4x4 area but the source is only 2x2; every
    // sampled pixel should still come from the in-bounds 2x2 region.
    let block = extract_block(&source, Format::Etc2Rgb, 0, 0);
    for y in 0..4 {
      for x in 0..4 {
        assert_eq!(block.get(x, y).r, 5);
      }
    }
  }

  #[test]
  fn un_premultiply_recovers_straight_color() {
    // Half-alpha red: premultiplied r should be half of straight r.
    let straight = Rgba16::new(0xFFFF, 0, 0, 0x8000);
    let premultiplied = Rgba16::new(0x7FFF, 0, 0, 0x8000);
    let recovered = un_premultiply(premultiplied);
    assert!(recovered.r > 0xFF00, "expected near-full red, got {:#06x}", recovered.r);
    let _ = straight;
  }

  #[test]
  fn transparent_premultiplied_pixel_becomes_zero_color() {
    let pixel = Rgba16::new(123, 45, 67, 0);
    assert_eq!(un_premultiply(pixel), Rgba16::new(0, 0, 0, 0));
  }

  #[test]
  fn r11_extraction_stores_luma_in_red_channel() {
    let pixels = vec![Rgba16::new(0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF); 4 * 4];
    let source = RawImage::new(4, 4, pixels);
    let block = extract_block(&source, Format::Etc2R11U, 0, 0);
    assert_eq!(block.get(0, 0).r, 2047);
    assert_eq!(block.get(0, 0).g, 0);
  }
}
