// The 4x4 pixel unit the whole codec operates on. See spec.md section 3
// ("Block") and section 4.1 (block extraction).

use crate::tables::{self, ORIENTATION_PIXELS};

/// A single pixel sample at internal working precision: 16 bits per
/// channel, straight (non-premultiplied) alpha. `extractor::extract_block`
/// is the only place that produces these from a `PixelSource`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub struct Rgba16 {
  pub r: u16,
  pub g: u16,
  pub b: u16,
  pub a: u16,
}

impl Rgba16 {
  pub const fn new(r: u16, g: u16, b: u16, a: u16) -> Self {
    Self { r, g, b, a }
  }

  pub const OPAQUE_BLACK: Rgba16 = Rgba16::new(0, 0, 0, u16::MAX);
}

/// One 4x4 block's worth of pixels, indexed by `tables::pixel_number(x, y)`.
#[derive(Debug, Clone, Copy)]
pub struct Block {
  pixels: [Rgba16; 16],
}

impl Block {
  pub const fn filled(value: Rgba16) -> Self {
    Self { pixels: [value; 16] }
  }

  pub fn get(&self, x: usize, y: usize) -> Rgba16 {
    self.pixels[tables::pixel_number(x, y)]
  }

  pub fn set(&mut self, x: usize, y: usize, value: Rgba16) {
    self.pixels[tables::pixel_number(x, y)] = value;
  }

  /// All 16 pixels in `pixel_number` order.
  pub fn pixels(&self) -> &[Rgba16; 16] {
    &self.pixels
  }

  /// Pixels belonging to one half of the block under a given orientation.
  /// `half` is 0 or 1 (left/top vs. right/bottom).
  pub fn half(&self, orientation: Orientation, half: usize) -> [Rgba16; 8] {
    let offsets = orientation.pixel_numbers(half);
    let mut out = [Rgba16::default(); 8];
    for (i, &p) in offsets.iter().enumerate() {
      out[i] = self.pixels[p];
    }
    out
  }
}

/// Which way a block's two sub-blocks are split: `Vertical` gives a left
/// 2x4 half and a right 2x4 half (ETC1/2's flip bit 0); `Horizontal` gives
/// a top 4x2 half and a bottom 4x2 half (flip bit 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
  Vertical,
  Horizontal,
}

impl Orientation {
  pub fn flip_bit(self) -> bool {
    matches!(self, Orientation::Horizontal)
  }

  /// The 8 pixel numbers making up `half` (0 or 1) of this orientation.
  pub fn pixel_numbers(self, half: usize) -> [usize; 8] {
    debug_assert!(half < 2);
    let base = match self {
      Orientation::Vertical => 0,
      Orientation::Horizontal => 2,
    };
    ORIENTATION_PIXELS[base + half]
  }

  pub const ALL: [Orientation; 2] = [Orientation::Vertical, Orientation::Horizontal];
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn half_split_covers_all_pixels_without_overlap() {
    for orientation in Orientation::ALL {
      let mut seen = [false; 16];
      for half in 0..2 {
        for p in orientation.pixel_numbers(half) {
          assert!(!seen[p], "pixel {p} seen twice under {orientation:?}");
          seen[p] = true;
        }
      }
      assert!(seen.iter().all(|&s| s));
    }
  }

  #[test]
  fn get_set_round_trips() {
    let mut block = Block::filled(Rgba16::OPAQUE_BLACK);
    block.set(2, 3, Rgba16::new(10, 20, 30, 40));
    assert_eq!(block.get(2, 3), Rgba16::new(10, 20, 30, 40));
    assert_eq!(block.get(0, 0), Rgba16::OPAQUE_BLACK);
  }

  #[test]
  fn flip_bit_matches_orientation() {
    assert!(!Orientation::Vertical.flip_bit());
    assert!(Orientation::Horizontal.flip_bit());
  }
}
