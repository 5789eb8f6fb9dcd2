// Sub-encoders: one module per color/alpha sub-mode, each producing a
// self-scored `ColorCandidate`/`AlphaCandidate` that `driver.rs` compares
// across modes via the shared block-loss oracle (spec.md section 4.5).
// Small, focused producers; `driver.rs` is the only place that picks
// among them.

pub mod alpha;
pub mod eac11;
pub mod individual_differential;
pub mod planar;
pub mod th;

/// An 8-byte color codeword candidate, ready to be written as a block's
/// first 8 bytes (or the only 8, for formats without a second codeword).
#[derive(Debug, Clone, Copy)]
pub struct ColorCandidate {
  pub bytes: [u8; 8],
}

/// An 8-byte alpha/11-bit codeword candidate (EAC 8-bit alpha, or EAC
/// 11-bit R/G), ready to be written as a block's second codeword (or, for
/// `R11`, its only one).
#[derive(Debug, Clone, Copy)]
pub struct EacCandidate {
  pub bytes: [u8; 8],
}
