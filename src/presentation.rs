//! Blind left/right presentation of the two hidden variants.
//!
//! Each round draws one boolean. `swapped == false` shows variant A on the
//! "A" side; `swapped == true` shows variant B there. The evaluator's click is
//! mapped back to the true variant before anything is recorded.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::{DisplayedSide, QuestionPair, QuestionRecord, Variant};

/// Source of the per-round swap draw.
pub trait SwapSource: Send {
  fn draw_swapped(&mut self) -> bool;
}

/// Uniform 50/50 draw backed by a `StdRng`.
pub struct RandomSwap {
  rng: StdRng,
}

impl RandomSwap {
  pub fn from_entropy() -> Self {
    Self { rng: StdRng::from_entropy() }
  }

  #[allow(dead_code)]
  pub fn seeded(seed: u64) -> Self {
    Self { rng: StdRng::seed_from_u64(seed) }
  }
}

impl SwapSource for RandomSwap {
  fn draw_swapped(&mut self) -> bool {
    self.rng.gen_bool(0.5)
  }
}

/// Per-round mapping between displayed sides and true variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentationMapping {
  pub swapped: bool,
}

impl PresentationMapping {
  pub fn draw(source: &mut dyn SwapSource) -> Self {
    Self { swapped: source.draw_swapped() }
  }

  /// True variant behind a displayed side.
  pub fn resolve(self, choice: DisplayedSide) -> Variant {
    resolve(choice, self.swapped)
  }

  pub fn displayed<'a>(self, pair: &'a QuestionPair, side: DisplayedSide) -> &'a QuestionRecord {
    pair.variant(self.resolve(side))
  }
}

/// Maps a displayed-side choice to the generator that produced it.
pub fn resolve(choice: DisplayedSide, swapped: bool) -> Variant {
  match (choice, swapped) {
    (DisplayedSide::A, false) | (DisplayedSide::B, true) => Variant::VariantA,
    (DisplayedSide::A, true) | (DisplayedSide::B, false) => Variant::VariantB,
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::collections::VecDeque;

  use super::*;
  use crate::domain::QuestionIndex;

  /// Replays scripted draws, then falls back to `false`.
  pub(crate) struct ScriptedSwaps(pub VecDeque<bool>);

  impl ScriptedSwaps {
    pub(crate) fn new(draws: &[bool]) -> Self {
      Self(draws.iter().copied().collect())
    }
  }

  impl SwapSource for ScriptedSwaps {
    fn draw_swapped(&mut self) -> bool {
      self.0.pop_front().unwrap_or(false)
    }
  }

  fn record(q: &str) -> QuestionRecord {
    QuestionRecord { question: q.into(), choices: vec![], answer: "1".into(), explanation: String::new() }
  }

  #[test]
  fn resolve_is_exhaustive_over_side_and_swap() {
    for side in [DisplayedSide::A, DisplayedSide::B] {
      for swapped in [false, true] {
        let expected = if (side == DisplayedSide::A) != swapped { Variant::VariantA } else { Variant::VariantB };
        assert_eq!(resolve(side, swapped), expected, "side={side} swapped={swapped}");
      }
    }
  }

  #[test]
  fn displayed_records_follow_mapping() {
    let pair = QuestionPair { question_index: QuestionIndex(0), variant_a: record("a"), variant_b: record("b") };
    let straight = PresentationMapping { swapped: false };
    let crossed = PresentationMapping { swapped: true };
    assert_eq!(straight.displayed(&pair, DisplayedSide::A).question, "a");
    assert_eq!(straight.displayed(&pair, DisplayedSide::B).question, "b");
    assert_eq!(crossed.displayed(&pair, DisplayedSide::A).question, "b");
    assert_eq!(crossed.displayed(&pair, DisplayedSide::B).question, "a");
  }

  #[test]
  fn random_swap_rate_is_near_half() {
    let mut src = RandomSwap::seeded(42);
    let n = 20_000;
    let swaps = (0..n).filter(|_| src.draw_swapped()).count();
    let rate = swaps as f64 / n as f64;
    assert!((rate - 0.5).abs() < 0.02, "swap rate {rate}");
  }

  #[test]
  fn consecutive_draws_are_not_forced() {
    let mut src = RandomSwap::seeded(7);
    let draws: Vec<bool> = (0..2_000).map(|_| src.draw_swapped()).collect();
    let agree = draws.windows(2).filter(|w| w[0] == w[1]).count();
    let rate = agree as f64 / (draws.len() - 1) as f64;
    assert!(rate > 0.4 && rate < 0.6, "consecutive agreement rate {rate}");
  }
}
