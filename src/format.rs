// Sub-format catalogue. See spec.md section 3 ("Format") and section 6.3
// (the PKM format-byte table), which this module implements directly.

use crate::error::Error;

/// Which generation of the codec a Format belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtcVersion {
  V1,
  V2,
}

/// The channel layout a Format's blocks hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
  /// RGB only (opaque).
  Rgb,
  /// RGB plus a 1-bit punch-through alpha, folded into the color codeword.
  Rgb1BitAlpha,
  /// RGB plus a full 8-bit alpha, encoded as a separate EAC codeword.
  Rgba8,
  /// A single 11-bit channel (luma, derived via BT.709 from RGB sources).
  R11,
  /// Two independent 11-bit channels.
  Rg11,
}

/// One of the eleven sub-formats this codec supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Format {
  Etc1,
  Etc2Rgb,
  Etc2Rgba8,
  Etc2Rgba1,
  Etc2R11U,
  Etc2Rg11U,
  Etc2R11S,
  Etc2Rg11S,
  Etc2Srgb,
  Etc2SrgbA8,
  Etc2SrgbA1,
}

impl Format {
  pub fn version(self) -> EtcVersion {
    match self {
      Format::Etc1 => EtcVersion::V1,
      _ => EtcVersion::V2,
    }
  }

  pub fn channel_layout(self) -> ChannelLayout {
    match self {
      Format::Etc1 | Format::Etc2Rgb | Format::Etc2Srgb => ChannelLayout::Rgb,
      Format::Etc2Rgba1 | Format::Etc2SrgbA1 => ChannelLayout::Rgb1BitAlpha,
      Format::Etc2Rgba8 | Format::Etc2SrgbA8 => ChannelLayout::Rgba8,
      Format::Etc2R11U | Format::Etc2R11S => ChannelLayout::R11,
      Format::Etc2Rg11U | Format::Etc2Rg11S => ChannelLayout::Rg11,
    }
  }

  /// Whether the 11-bit channel(s), if any, are signed.
  pub fn is_signed_11bit(self) -> bool {
    matches!(self, Format::Etc2R11S | Format::Etc2Rg11S)
  }

  /// Whether sRGB decode semantics apply. The encoder treats this
  /// identically to the linear variant (spec.md section 3); it only affects
  /// how a consumer interprets the decoded bytes.
  pub fn is_srgb(self) -> bool {
    matches!(self, Format::Etc2Srgb | Format::Etc2SrgbA8 | Format::Etc2SrgbA1)
  }

  /// Bytes per 4x4 block. Formats with 8-bit alpha or two 11-bit channels use
  /// 16 bytes (an EAC/second codeword precedes or follows the color
  /// codeword); everything else uses 8.
  pub fn bytes_per_block(self) -> usize {
    match self.channel_layout() {
      ChannelLayout::Rgba8 | ChannelLayout::Rg11 => 16,
      _ => 8,
    }
  }

  /// The byte written at PKM header offset 7.
  pub fn pkm_format_byte(self) -> u8 {
    match self {
      Format::Etc1 => 0x00,
      Format::Etc2Rgb => 0x01,
      Format::Etc2Rgba8 => 0x03,
      Format::Etc2Rgba1 => 0x04,
      Format::Etc2R11U => 0x05,
      Format::Etc2Rg11U => 0x06,
      Format::Etc2R11S => 0x07,
      Format::Etc2Rg11S => 0x08,
      Format::Etc2Srgb => 0x09,
      Format::Etc2SrgbA8 => 0x0A,
      Format::Etc2SrgbA1 => 0x0B,
    }
  }

  pub fn from_pkm_format_byte(byte: u8) -> Result<Format, Error> {
    match byte {
      0x00 => Ok(Format::Etc1),
      0x01 => Ok(Format::Etc2Rgb),
      0x03 => Ok(Format::Etc2Rgba8),
      0x04 => Ok(Format::Etc2Rgba1),
      0x05 => Ok(Format::Etc2R11U),
      0x06 => Ok(Format::Etc2Rg11U),
      0x07 => Ok(Format::Etc2R11S),
      0x08 => Ok(Format::Etc2Rg11S),
      0x09 => Ok(Format::Etc2Srgb),
      0x0A => Ok(Format::Etc2SrgbA8),
      0x0B => Ok(Format::Etc2SrgbA1),
      other => Err(Error::NotAContainer(format!("unknown PKM format byte 0x{:02X}", other))),
    }
  }

  /// The ASCII version byte PKM writes at offset 4 ('1' or '2').
  pub fn pkm_version_ascii(self) -> u8 {
    match self.version() {
      EtcVersion::V1 => b'1',
      EtcVersion::V2 => b'2',
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bytes_per_block_matches_spec_invariant() {
    assert_eq!(Format::Etc1.bytes_per_block(), 8);
    assert_eq!(Format::Etc2Rgb.bytes_per_block(), 8);
    assert_eq!(Format::Etc2Rgba1.bytes_per_block(), 8);
    assert_eq!(Format::Etc2R11U.bytes_per_block(), 8);
    assert_eq!(Format::Etc2Rgba8.bytes_per_block(), 16);
    assert_eq!(Format::Etc2Rg11U.bytes_per_block(), 16);
    assert_eq!(Format::Etc2Rg11S.bytes_per_block(), 16);
  }

  #[test]
  fn format_byte_round_trips() {
    for format in [
      Format::Etc1, Format::Etc2Rgb, Format::Etc2Rgba8, Format::Etc2Rgba1,
      Format::Etc2R11U, Format::Etc2Rg11U, Format::Etc2R11S, Format::Etc2Rg11S,
      Format::Etc2Srgb, Format::Etc2SrgbA8, Format::Etc2SrgbA1,
    ] {
      let byte = format.pkm_format_byte();
      assert_eq!(Format::from_pkm_format_byte(byte).unwrap(), format);
    }
  }

  #[test]
  fn unknown_format_byte_is_not_a_container() {
    assert!(Format::from_pkm_format_byte(0x02).is_err());
  }

  #[test]
  fn version_matches_etc1_vs_etc2() {
    assert_eq!(Format::Etc1.version(), EtcVersion::V1);
    assert_eq!(Format::Etc2Rgb.version(), EtcVersion::V2);
  }
}
