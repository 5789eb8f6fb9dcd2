// End-to-end scenarios from spec.md section 8 (S1-S6), exercised through
// the public API. S3 and S4 are checked as properties ("every pixel comes
// back near the source value") rather than literal codeword bytes: see
// DESIGN.md's open question on the T/H/Planar/EAC bit layout not being
// verified against a retrievable reference implementation.

use tinyetc::block::Rgba16;
use tinyetc::driver::EncodeOptions;
use tinyetc::pixel_source::{PixelSource, RawImage};
use tinyetc::{Format, Image};

fn flat_source(width: u32, height: u32, pixel: Rgba16) -> RawImage {
  RawImage::new(width, height, vec![pixel; (width * height) as usize])
}

#[test]
fn s1_21x32_rgb_encodes_to_etc2_rgb_with_48_blocks() {
  let source = flat_source(21, 32, Rgba16::new(0x4040, 0x8080, 0xC0C0, 0xFFFF));
  let image = Image::encode(&source, Format::Etc2Rgb, &EncodeOptions::default()).unwrap();

  // 21 pads to 24 (6 blocks wide), 32 needs no padding (8 blocks high).
  assert_eq!(image.bytes().len(), 6 * 8 * 8);

  let mut bytes = Vec::new();
  image.write_pkm(&mut bytes).unwrap();
  assert_eq!(
    &bytes[0..16],
    &[0x50, 0x4B, 0x4D, 0x20, 0x32, 0x30, 0x00, 0x01, 0x00, 0x18, 0x00, 0x20, 0x00, 0x15, 0x00, 0x20]
  );

  let parsed = Image::read_pkm(&mut &bytes[..]).unwrap();
  assert_eq!(parsed.width(), 21);
  assert_eq!(parsed.height(), 32);
  let decoded = parsed.decode();
  assert_eq!(decoded.width(), 21);
  assert_eq!(decoded.height(), 32);
}

#[test]
fn s2_24x32_rgb_encodes_to_etc1_with_no_padding() {
  let source = flat_source(24, 32, Rgba16::new(0x2020, 0x6060, 0xA0A0, 0xFFFF));
  let image = Image::encode(&source, Format::Etc1, &EncodeOptions::default()).unwrap();
  assert_eq!(image.bytes().len(), 6 * 8 * 8);

  let mut bytes = Vec::new();
  image.write_pkm(&mut bytes).unwrap();
  assert_eq!(bytes[4], 0x31, "ETC1 writes version byte '1'");
  assert_eq!(bytes[7], 0x00, "ETC1 format byte");
  assert_eq!(&bytes[8..12], &[0x00, 0x18, 0x00, 0x20], "no padding needed at 24x32");
  assert_eq!(&bytes[12..16], &[0x00, 0x18, 0x00, 0x20]);
}

#[test]
fn s3_opaque_rgba_image_decodes_back_to_near_opaque_alpha() {
  // 16x16, every pixel (R,G,B,0xFF) straight alpha.
  let source = flat_source(16, 16, Rgba16::new(0x1234, 0x5678, 0x9ABC, 0xFFFF));
  let image = Image::encode(&source, Format::Etc2Rgba8, &EncodeOptions::default()).unwrap();
  assert_eq!(image.bytes().len(), 4 * 4 * 16);

  let decoded = image.decode();
  for y in 0..16 {
    for x in 0..16 {
      let p = decoded.sample(x, y);
      assert!(p.a > 0xF000, "pixel ({x},{y}) decoded alpha {:#06x} should be near-opaque", p.a);
    }
  }
}

#[test]
fn s4_grayscale_ramp_round_trips_within_tolerance_as_r11() {
  // 16x16 horizontal ramp used as a single 11-bit luma channel.
  let width = 16u32;
  let height = 16u32;
  let mut pixels = Vec::with_capacity((width * height) as usize);
  for _y in 0..height {
    for x in 0..width {
      let v = ((x * 0xFFFF) / (width - 1)) as u16;
      pixels.push(Rgba16::new(v, v, v, 0xFFFF));
    }
  }
  let source = RawImage::new(width, height, pixels);
  let image = Image::encode(&source, Format::Etc2R11U, &EncodeOptions::default()).unwrap();
  let decoded = image.decode();

  for y in 0..height {
    for x in 0..width {
      let expected = (x * 0xFFFF / (width - 1)) as i32;
      let got = decoded.sample(x, y).r as i32;
      assert!((got - expected).abs() < 0x1000, "ramp pixel ({x},{y}): expected ~{expected:#06x}, got {got:#06x}");
    }
  }
}

#[test]
fn s5_fully_transparent_rgba1_block_decodes_to_transparent_black() {
  let source = flat_source(4, 4, Rgba16::new(0, 0, 0, 0));
  let image = Image::encode(&source, Format::Etc2Rgba1, &EncodeOptions::default()).unwrap();
  let decoded = image.decode();
  for y in 0..4 {
    for x in 0..4 {
      let p = decoded.sample(x, y);
      assert_eq!(p.a, 0, "pixel ({x},{y}) should stay transparent");
      assert_eq!((p.r, p.g, p.b), (0, 0, 0), "pixel ({x},{y}) should stay black");
    }
  }
}

#[test]
fn s6_monotone_gradient_prefers_planar_over_individual() {
  use tinyetc::decode::decode_color_codeword;
  use tinyetc::driver::encode_block;
  use tinyetc::encode::individual_differential;
  use tinyetc::extractor::extract_block;
  use tinyetc::metric::block_loss;

  let width = 4u32;
  let height = 4u32;
  let mut pixels = Vec::with_capacity(16);
  for y in 0..height {
    for x in 0..width {
      let v = ((x + y) as u16) * 0x1000;
      pixels.push(Rgba16::new(v, v, v, 0xFFFF));
    }
  }
  let source = RawImage::new(width, height, pixels);
  let options = EncodeOptions::default();
  let block = extract_block(&source, Format::Etc2Rgb, 0, 0);

  let individual_only = individual_differential::encode(Format::Etc2Rgb, &block, false).bytes;
  let individual_loss = {
    let decoded = decode_color_codeword(Format::Etc2Rgb, &individual_only);
    block_loss(Format::Etc2Rgb, &block, &decoded)
  };

  let chosen = encode_block(Format::Etc2Rgb, &block, &options);
  let chosen_loss = {
    let bytes: [u8; 8] = chosen.try_into().unwrap();
    let decoded = decode_color_codeword(Format::Etc2Rgb, &bytes);
    block_loss(Format::Etc2Rgb, &block, &decoded)
  };

  assert!(
    chosen_loss <= individual_loss,
    "driver's chosen candidate ({chosen_loss}) should be at least as good as Individual/Differential alone ({individual_loss})"
  );
}
