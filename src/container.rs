// The PKM container: a 16-byte header naming the sub-format and
// dimensions, followed by the raw block stream. See spec.md section 6.3.
// Shaped like `isobmff.rs`'s `ISOBMFFWriter`/`ISOBMFFBox` (a single writer
// type box producers funnel through), simplified here since PKM's header
// is flat with no nested boxes and no size-patch-on-drop.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::format::Format;

const MAGIC: [u8; 4] = *b"PKM ";
const HEADER_LEN: usize = 16;

/// Round `value` up to the next multiple of 4 (spec.md section 3: width
/// and height are padded to block alignment).
pub fn round_up_to_4(value: u32) -> u32 {
  (value + 3) & !3
}

/// The parsed 16-byte PKM header (spec.md section 6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkmHeader {
  pub format: Format,
  pub padded_width: u16,
  pub padded_height: u16,
  pub original_width: u16,
  pub original_height: u16,
}

impl PkmHeader {
  /// Build the header for encoding a `original_width x original_height`
  /// image as `format`.
  pub fn for_image(format: Format, original_width: u32, original_height: u32) -> Result<Self> {
    if original_width == 0 || original_height == 0 || original_width > 65532 || original_height > 65532 {
      return Err(Error::ImageTooLarge { width: original_width, height: original_height });
    }
    let padded_width = round_up_to_4(original_width);
    let padded_height = round_up_to_4(original_height);
    Ok(PkmHeader {
      format,
      padded_width: padded_width as u16,
      padded_height: padded_height as u16,
      original_width: original_width as u16,
      original_height: original_height as u16,
    })
  }

  pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
    w.write_all(&MAGIC)?;
    w.write_u8(self.format.pkm_version_ascii())?;
    w.write_u8(0x30)?;
    w.write_u8(0x00)?;
    w.write_u8(self.format.pkm_format_byte())?;
    w.write_u16::<BigEndian>(self.padded_width)?;
    w.write_u16::<BigEndian>(self.padded_height)?;
    w.write_u16::<BigEndian>(self.original_width)?;
    w.write_u16::<BigEndian>(self.original_height)?;
    Ok(())
  }

  pub fn read<R: Read>(r: &mut R) -> Result<Self> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
      log::debug!("rejecting container: bad magic {magic:?}");
      return Err(Error::NotAContainer("bad magic".into()));
    }
    let version = r.read_u8()?;
    if version != b'1' && version != b'2' {
      log::debug!("rejecting container: bad version byte {version:#04x}");
      return Err(Error::NotAContainer(format!("bad version byte 0x{version:02X}")));
    }
    let reserved1 = r.read_u8()?;
    if reserved1 != 0x30 {
      log::debug!("rejecting container: bad reserved byte at offset 5: {reserved1:#04x}");
      return Err(Error::NotAContainer(format!("bad reserved byte 0x{reserved1:02X} at offset 5")));
    }
    let reserved2 = r.read_u8()?;
    if reserved2 != 0x00 {
      log::debug!("rejecting container: bad reserved byte at offset 6: {reserved2:#04x}");
      return Err(Error::NotAContainer(format!("bad reserved byte 0x{reserved2:02X} at offset 6")));
    }
    let format_byte = r.read_u8()?;
    let format = Format::from_pkm_format_byte(format_byte)?;
    let expected_version = if version == b'1' { crate::format::EtcVersion::V1 } else { crate::format::EtcVersion::V2 };
    if format.version() != expected_version {
      log::debug!("rejecting container: version byte disagrees with format byte");
      return Err(Error::NotAContainer("ETC version byte disagrees with format byte".into()));
    }

    let padded_width = r.read_u16::<BigEndian>()?;
    let padded_height = r.read_u16::<BigEndian>()?;
    let original_width = r.read_u16::<BigEndian>()?;
    let original_height = r.read_u16::<BigEndian>()?;
    if padded_width as u32 != round_up_to_4(original_width as u32) || padded_height as u32 != round_up_to_4(original_height as u32) {
      log::debug!("rejecting container: padded dimensions don't match round4(original)");
      return Err(Error::NotAContainer("padded dimensions inconsistent with original dimensions".into()));
    }

    Ok(PkmHeader { format, padded_width, padded_height, original_width, original_height })
  }

  pub const LEN: usize = HEADER_LEN;
}

/// Identifier/header constants for the KTX container, kept only so a KTX
/// file fed to `PkmHeader::read` is rejected with a clear message instead
/// of a confusing magic mismatch (spec.md section 1 keeps KTX's full
/// layout out of scope; see SPEC_FULL.md section F).
pub mod ktx {
  pub const KTX1_IDENTIFIER: [u8; 12] = [0xAB, b'K', b'T', b'X', b' ', b'1', b'1', 0xBB, b'\r', b'\n', 0x1A, b'\n'];
  pub const KTX2_IDENTIFIER: [u8; 12] = [0xAB, b'K', b'T', b'X', b' ', b'2', b'0', 0xBB, b'\r', b'\n', 0x1A, b'\n'];

  pub fn looks_like_ktx(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && (bytes[..12] == KTX1_IDENTIFIER || bytes[..12] == KTX2_IDENTIFIER)
  }
}

/// Peek at `bytes` and, if it looks like a KTX file, return a clearer
/// `NotAContainer` error than a bare magic mismatch would.
pub fn reject_if_ktx(bytes: &[u8]) -> io::Result<()> {
  if ktx::looks_like_ktx(bytes) {
    return Err(io::Error::new(io::ErrorKind::InvalidData, "KTX container is not supported; expected PKM"));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn s1_header_matches_the_documented_bytes() {
    // spec.md section 8, scenario S1: 21x32 RGB as ETC2-RGB.
    let header = PkmHeader::for_image(Format::Etc2Rgb, 21, 32).unwrap();
    let mut bytes = Vec::new();
    header.write(&mut bytes).unwrap();
    assert_eq!(
      bytes,
      vec![0x50, 0x4B, 0x4D, 0x20, 0x32, 0x30, 0x00, 0x01, 0x00, 0x18, 0x00, 0x20, 0x00, 0x15, 0x00, 0x20]
    );
  }

  #[test]
  fn s2_header_matches_the_documented_bytes() {
    // spec.md section 8, scenario S2: 24x32 RGB as ETC1.
    let header = PkmHeader::for_image(Format::Etc1, 24, 32).unwrap();
    let mut bytes = Vec::new();
    header.write(&mut bytes).unwrap();
    assert_eq!(bytes[4], 0x31);
    assert_eq!(bytes[7], 0x00);
  }

  #[test]
  fn header_round_trips_through_write_then_read() {
    let header = PkmHeader::for_image(Format::Etc2Rgba8, 17, 9).unwrap();
    let mut bytes = Vec::new();
    header.write(&mut bytes).unwrap();
    let parsed = PkmHeader::read(&mut &bytes[..]).unwrap();
    assert_eq!(parsed, header);
  }

  #[test]
  fn bad_magic_is_rejected() {
    let bytes = [0u8; 16];
    assert!(PkmHeader::read(&mut &bytes[..]).is_err());
  }

  #[test]
  fn version_format_mismatch_is_rejected() {
    // Version byte says ETC1 ('1') but format byte says ETC2-RGBA8 (0x03).
    let mut bytes = vec![0x50, 0x4B, 0x4D, 0x20, 0x31, 0x30, 0x00, 0x03, 0x00, 0x10, 0x00, 0x10, 0x00, 0x10, 0x00, 0x10];
    assert!(PkmHeader::read(&mut &bytes[..]).is_err());
    bytes[4] = b'2';
    assert!(PkmHeader::read(&mut &bytes[..]).is_ok());
  }

  #[test]
  fn inconsistent_padded_dimensions_are_rejected() {
    let bytes = vec![0x50, 0x4B, 0x4D, 0x20, 0x32, 0x30, 0x00, 0x01, 0x00, 0x18, 0x00, 0x20, 0x00, 0x14, 0x00, 0x20];
    assert!(PkmHeader::read(&mut &bytes[..]).is_err());
  }

  #[test]
  fn ktx_identifier_is_detected() {
    assert!(ktx::looks_like_ktx(&ktx::KTX1_IDENTIFIER));
    assert!(ktx::looks_like_ktx(&ktx::KTX2_IDENTIFIER));
    assert!(!ktx::looks_like_ktx(&MAGIC));
  }
}
