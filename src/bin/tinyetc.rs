// Thin CLI: `encode`/`decode` subcommands over headerless raw RGBA8
// pixel dumps and PKM files (spec.md section 1's "naive" fixture format;
// general image I/O is out of scope). Modeled on `tinyavif::main.rs`'s
// `fn main()` (hardcoded parameters, direct calls into the library, no
// config file) restructured through `clap::Parser`, which the teacher's
// own `main.rs` declares as a dependency but never actually uses.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tinyetc::driver::EncodeOptions;
use tinyetc::image::Image;
use tinyetc::pixel_source::RawImage;
use tinyetc::{block::Rgba16, Error, Format, PixelSource, Result};

#[derive(Parser)]
#[command(name = "tinyetc", about = "A software ETC1/ETC2 texture encoder/decoder")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Encode a headerless raw RGBA8 pixel dump into a PKM file.
  Encode {
    #[arg(long, value_enum)]
    format: Format,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
    input: PathBuf,
    output: PathBuf,
  },
  /// Decode a PKM file back into a headerless raw RGBA8 pixel dump.
  Decode { input: PathBuf, output: PathBuf },
}

fn main() -> Result<()> {
  env_logger::init();
  let cli = Cli::parse();

  match cli.command {
    Command::Encode { format, width, height, input, output } => {
      let raw = std::fs::read(&input)?;
      let expected_len = (width as usize) * (height as usize) * 4;
      if raw.len() != expected_len {
        return Err(Error::BadArgument(format!(
          "input is {} bytes, expected {} for a {}x{} RGBA8 dump",
          raw.len(),
          expected_len,
          width,
          height
        )));
      }
      let pixels: Vec<Rgba16> = raw
        .chunks_exact(4)
        .map(|p| Rgba16::new(scale_8_to_16(p[0]), scale_8_to_16(p[1]), scale_8_to_16(p[2]), scale_8_to_16(p[3])))
        .collect();
      let source = RawImage::new(width, height, pixels);

      let image = Image::encode(&source, format, &EncodeOptions::default())?;
      let mut writer = BufWriter::new(File::create(&output)?);
      image.write_pkm(&mut writer)?;
    }
    Command::Decode { input, output } => {
      let mut reader = BufReader::new(File::open(&input)?);
      let image = Image::read_pkm(&mut reader)?;
      let decoded = image.decode();

      let mut raw = Vec::with_capacity((decoded.width() * decoded.height()) as usize * 4);
      for y in 0..decoded.height() {
        for x in 0..decoded.width() {
          let p = decoded.sample(x, y);
          raw.push(scale_16_to_8(p.r));
          raw.push(scale_16_to_8(p.g));
          raw.push(scale_16_to_8(p.b));
          raw.push(scale_16_to_8(p.a));
        }
      }
      std::fs::write(&output, raw)?;
    }
  }

  Ok(())
}

fn scale_8_to_16(v: u8) -> u16 {
  (v as u16) * 257
}

fn scale_16_to_8(v: u16) -> u8 {
  (v >> 8) as u8
}
