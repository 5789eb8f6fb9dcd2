// `Image`: a convenience wrapper bundling width/height/Format/bytes so the
// CLI and tests don't hand-roll container math. Orchestrates the
// extractor and the driver over every block of a source in raster order,
// and the block decoder over every block of an encoded stream. Modeled on
// `tinyavif::frame::Frame`, an owning wrapper over per-plane pixel
// buffers, generalized here to an owning wrapper over an encoded byte
// buffer instead of raw planes. See spec.md section 5 (data flow) and
// SPEC_FULL.md section F.

use std::io::{Read, Write};

use crate::array2d::Array2D;
use crate::block::Rgba16;
use crate::container::{round_up_to_4, PkmHeader};
use crate::driver::{self, EncodeOptions};
use crate::error::{Error, Result};
use crate::extractor::extract_block;
use crate::format::Format;
use crate::pixel_source::{PixelSource, RawImage};

/// Sink writes happen in chunks this large (spec.md section 5: "writing to
/// a caller-supplied byte sink in 4-KiB-sized chunks").
const SINK_CHUNK_BYTES: usize = 4096;

/// An encoded ETC1/ETC2 image: a Format, the original (unpadded)
/// dimensions, and the raw block stream in raster order (spec.md section
/// 6.2).
#[derive(Debug, Clone)]
pub struct Image {
  format: Format,
  width: u32,
  height: u32,
  bytes: Vec<u8>,
}

impl Image {
  pub fn format(&self) -> Format {
    self.format
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  fn blocks_wide(&self) -> u32 {
    round_up_to_4(self.width) / 4
  }

  fn blocks_high(&self) -> u32 {
    round_up_to_4(self.height) / 4
  }

  /// Encode `source` as `format`, iterating blocks in raster order
  /// (block-rows top-to-bottom, left-to-right within a row; spec.md
  /// section 6.2).
  pub fn encode<S: PixelSource>(source: &S, format: Format, options: &EncodeOptions) -> Result<Image> {
    let width = source.width();
    let height = source.height();
    if width == 0 || height == 0 {
      return Err(Error::BadArgument("source has zero width or height".into()));
    }
    if width > 65532 || height > 65532 {
      return Err(Error::ImageTooLarge { width, height });
    }

    let blocks_wide = round_up_to_4(width) / 4;
    let blocks_high = round_up_to_4(height) / 4;
    let bytes_per_block = format.bytes_per_block();
    let mut bytes = Vec::with_capacity((blocks_wide * blocks_high) as usize * bytes_per_block);

    for by in 0..blocks_high {
      for bx in 0..blocks_wide {
        let block = extract_block(source, format, bx, by);
        let encoded = driver::encode_block(format, &block, options);
        debug_assert_eq!(encoded.len(), bytes_per_block);
        bytes.extend_from_slice(&encoded);
      }
    }

    Ok(Image { format, width, height, bytes })
  }

  /// Decode every block back into a cropped, row-major `RawImage` at the
  /// original (unpadded) dimensions.
  pub fn decode(&self) -> RawImage {
    let blocks_wide = self.blocks_wide();
    let blocks_high = self.blocks_high();
    let bytes_per_block = self.format.bytes_per_block();

    let mut padded = Array2D::<Rgba16>::zeroed((blocks_high * 4) as usize, (blocks_wide * 4) as usize);
    for by in 0..blocks_high {
      for bx in 0..blocks_wide {
        let offset = ((by * blocks_wide + bx) as usize) * bytes_per_block;
        let codeword = &self.bytes[offset..offset + bytes_per_block];
        let block = crate::decode::decode_block(self.format, codeword);
        for y in 0..4usize {
          for x in 0..4usize {
            let row = (by as usize) * 4 + y;
            let col = (bx as usize) * 4 + x;
            padded[row][col] = block.get(x, y);
          }
        }
      }
    }

    let mut pixels = Vec::with_capacity((self.width * self.height) as usize);
    for row in 0..self.height as usize {
      for col in 0..self.width as usize {
        pixels.push(padded[row][col]);
      }
    }
    RawImage::new(self.width, self.height, pixels)
  }

  /// Write this image as a PKM file: 16-byte header followed by the block
  /// stream, in `SINK_CHUNK_BYTES`-sized writes (spec.md section 5).
  pub fn write_pkm<W: Write>(&self, w: &mut W) -> Result<()> {
    let header = PkmHeader::for_image(self.format, self.width, self.height)?;
    header.write(w)?;
    for chunk in self.bytes.chunks(SINK_CHUNK_BYTES) {
      w.write_all(chunk)?;
    }
    Ok(())
  }

  /// Read a PKM file: header, then exactly `blocks_wide * blocks_high *
  /// bytes_per_block` bytes of block stream.
  pub fn read_pkm<R: Read>(r: &mut R) -> Result<Image> {
    let header = PkmHeader::read(r)?;
    let blocks_wide = (header.padded_width as u32) / 4;
    let blocks_high = (header.padded_height as u32) / 4;
    let bytes_per_block = header.format.bytes_per_block();
    let expected_len = (blocks_wide * blocks_high) as usize * bytes_per_block;

    let mut bytes = vec![0u8; expected_len];
    r.read_exact(&mut bytes)?;

    Ok(Image {
      format: header.format,
      width: header.original_width as u32,
      height: header.original_height as u32,
      bytes,
    })
  }
}
