use thiserror::Error;

/// Errors surfaced at the driver boundary (image-level encode/decode and
/// container parse/emit). Sub-encoders and the block decoder never return
/// `Result` themselves: they operate on already-validated, fixed-size
/// buffers, so their failure modes are programmer errors (`assert!`/`panic!`),
/// not caller errors. See SPEC_FULL.md section B.
#[derive(Error, Debug)]
pub enum Error {
  /// Null/zero-sized source, unknown Format, invalid dimensions, or an
  /// unsupported source pixel type.
  #[error("bad argument: {0}")]
  BadArgument(String),

  /// Width or height exceeds the block-aligned maximum of 65532.
  #[error("image too large: {width}x{height} exceeds the 65532x65532 limit")]
  ImageTooLarge { width: u32, height: u32 },

  /// The byte stream is not a recognizable container: magic/version/reserved
  /// byte mismatch, ETC-version/format-byte disagreement, or inconsistent
  /// padded-vs-original dimensions.
  #[error("not a container: {0}")]
  NotAContainer(String),

  /// Propagated unmodified from a sink write or source read.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
