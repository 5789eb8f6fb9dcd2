// Block Encoder Driver: per-Format decision tree over the color and
// alpha/11-bit sub-encoders, decode-and-rescore oracle, best-of
// selection. See spec.md section 4.5.

use crate::block::Block;
use crate::decode;
use crate::encode::eac11::{self, Channel};
use crate::encode::{alpha, individual_differential, planar, th};
use crate::format::{ChannelLayout, Format};
use crate::metric::{block_loss, REJECTED};

/// Search-depth knob (spec.md section 4.5's "driver MAY trade search depth
/// for speed"). `Full` runs Planar and both QRS re-runs of whichever of
/// T/H wins at the default intensity; `Fast` skips Planar entirely and
/// keeps only the single default-intensity T/H pass, trading the rarer
/// wins Planar and QRS re-runs find for roughly a third of the candidate
/// count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effort {
  #[default]
  Full,
  Fast,
}

/// Knobs controlling how a block is encoded, passed through from the
/// image-level entry point (see `image.rs`) down to the driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
  pub effort: Effort,
}

/// The QRS clustering intensity `th.rs` defaults to; re-runs only happen
/// at `Effort::Full` and only for whichever of T/H already wins here.
const DEFAULT_INTENSITY: f64 = 0.5;

/// A scored candidate codeword: the encoded bytes plus the oracle-decoded
/// loss against the source block (spec.md section 4.5: "the driver MUST
/// decode it with the same Block Decoder used in production and recompute
/// the loss on the decoded pixels").
struct Scored {
  bytes: Vec<u8>,
  loss: i64,
}

fn score_color(format: Format, source: &Block, bytes: [u8; 8]) -> Scored {
  let decoded = decode::decode_color_codeword(format, &bytes);
  let loss = block_loss(format, source, &decoded);
  Scored { bytes: bytes.to_vec(), loss }
}

fn best(candidates: Vec<Scored>) -> Scored {
  candidates
    .into_iter()
    .min_by_key(|c| c.loss)
    .unwrap_or(Scored { bytes: vec![0u8; 8], loss: REJECTED })
}

/// Encode `source` (a single 4x4 block already extracted by
/// `extractor::extract_block`) as `format`'s codeword: 8 bytes for every
/// format except RGBA8 and RG11, which are 16.
pub fn encode_block(format: Format, source: &Block, options: &EncodeOptions) -> Vec<u8> {
  match format.channel_layout() {
    ChannelLayout::Rgb => encode_rgb_block(format, source, options),
    ChannelLayout::Rgb1BitAlpha => encode_rgba1_block(format, source, options),
    ChannelLayout::Rgba8 => {
      let alpha_candidate = alpha::encode(source);
      let color = encode_rgb_block(format, source, options);
      let mut out = alpha_candidate.bytes.to_vec();
      out.extend_from_slice(&color);
      out
    }
    ChannelLayout::R11 => eac11::encode(source, Channel::R, format.is_signed_11bit()).bytes.to_vec(),
    ChannelLayout::Rg11 => {
      let signed = format.is_signed_11bit();
      let r = eac11::encode(source, Channel::R, signed);
      let g = eac11::encode(source, Channel::G, signed);
      let mut out = r.bytes.to_vec();
      out.extend_from_slice(&g.bytes);
      out
    }
  }
}

/// Which T/H candidate (if any) a `Scored` in `encode_rgb_block`/
/// `encode_rgba1_block`'s candidate list came from, so the winner can be
/// re-run at the other two QRS intensities (spec.md sections 4.2.2/4.5).
#[derive(Clone, Copy, PartialEq, Eq)]
enum ThKind {
  T,
  H,
}

type ThTag = Option<(ThKind, bool)>;

fn best_tagged(candidates: Vec<(Scored, ThTag)>) -> (Scored, ThTag) {
  candidates
    .into_iter()
    .min_by_key(|(c, _)| c.loss)
    .unwrap_or((Scored { bytes: vec![0u8; 8], loss: REJECTED }, None))
}

/// Re-run whichever of T/H `winner_tag` names, at its same transparency
/// setting, at QRS intensities 0.0 and 1.0. `Effort::Fast` skips this
/// entirely, keeping only the default-intensity pass already scored.
fn qrs_reruns(format: Format, source: &Block, winner_tag: ThTag, options: &EncodeOptions) -> Vec<Scored> {
  if options.effort == Effort::Fast {
    return Vec::new();
  }
  let Some((kind, reserve_transparent_index)) = winner_tag else { return Vec::new() };
  [0.0, 1.0]
    .iter()
    .map(|&intensity| {
      let bytes = match kind {
        ThKind::T => th::encode_t(source, reserve_transparent_index, intensity).bytes,
        ThKind::H => th::encode_h(source, reserve_transparent_index, intensity).bytes,
      };
      score_color(format, source, bytes)
    })
    .collect()
}

fn encode_rgb_block(format: Format, source: &Block, options: &EncodeOptions) -> Vec<u8> {
  let mut candidates: Vec<(Scored, ThTag)> = Vec::new();
  candidates.push((score_color(format, source, individual_differential::encode(format, source, false).bytes), None));

  if format.version() == crate::format::EtcVersion::V2 {
    if options.effort == Effort::Full {
      candidates.push((score_color(format, source, planar::encode(source).bytes), None));
    }
    candidates.push((score_color(format, source, th::encode_t(source, false, DEFAULT_INTENSITY).bytes), Some((ThKind::T, false))));
    candidates.push((score_color(format, source, th::encode_h(source, false, DEFAULT_INTENSITY).bytes), Some((ThKind::H, false))));
  }

  let (winner, winner_tag) = best_tagged(candidates);
  let reruns = qrs_reruns(format, source, winner_tag, options);
  let winner = best(std::iter::once(winner).chain(reruns).collect());

  log::trace!("rgb block: chose codeword with loss {}", winner.loss);
  winner.bytes
}

fn encode_rgba1_block(format: Format, source: &Block, options: &EncodeOptions) -> Vec<u8> {
  let has_transparent = source.pixels().iter().any(|p| p.a == 0);

  let mut candidates: Vec<(Scored, ThTag)> = Vec::new();
  candidates.push((score_color(format, source, individual_differential::encode(format, source, true).bytes), None));
  candidates.push((score_color(format, source, th::encode_t(source, true, DEFAULT_INTENSITY).bytes), Some((ThKind::T, true))));
  candidates.push((score_color(format, source, th::encode_h(source, true, DEFAULT_INTENSITY).bytes), Some((ThKind::H, true))));

  if !has_transparent {
    candidates.push((score_color(format, source, individual_differential::encode(format, source, false).bytes), None));
    candidates.push((score_color(format, source, th::encode_t(source, false, DEFAULT_INTENSITY).bytes), Some((ThKind::T, false))));
    candidates.push((score_color(format, source, th::encode_h(source, false, DEFAULT_INTENSITY).bytes), Some((ThKind::H, false))));
  }

  let (winner, winner_tag) = best_tagged(candidates);
  let reruns = qrs_reruns(format, source, winner_tag, options);
  let winner = best(std::iter::once(winner).chain(reruns).collect());

  log::trace!("rgba1 block: chose codeword with loss {}", winner.loss);
  winner.bytes
}
