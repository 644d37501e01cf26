//! Progress through a session's target number of questions.

/// What the tracker decided on "advance".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
  /// Fetch the next pair; `completed` has already been bumped.
  Next,
  /// Target reached; no further fetch.
  Complete,
}

/// `completed` counts fetched rounds and never exceeds `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressTracker {
  target: u32,
  completed: u32,
}

impl ProgressTracker {
  /// The first fetch already consumes one question.
  pub fn start(target: u32) -> Self {
    Self { target, completed: 1.min(target) }
  }

  pub fn target(&self) -> u32 { self.target }
  pub fn completed(&self) -> u32 { self.completed }

  pub fn advance(&mut self) -> Step {
    if self.completed + 1 > self.target {
      Step::Complete
    } else {
      self.completed += 1;
      Step::Next
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_at_one() {
    let p = ProgressTracker::start(5);
    assert_eq!(p.completed(), 1);
    assert_eq!(p.target(), 5);
  }

  #[test]
  fn never_exceeds_target() {
    let mut p = ProgressTracker::start(5);
    let mut nexts = 0;
    for _ in 0..20 {
      if p.advance() == Step::Next { nexts += 1; }
      assert!(p.completed() <= p.target());
    }
    assert_eq!(nexts, 4);
    assert_eq!(p.completed(), 5);
    assert_eq!(p.advance(), Step::Complete);
  }

  #[test]
  fn single_question_session_completes_on_first_advance() {
    let mut p = ProgressTracker::start(1);
    assert_eq!(p.advance(), Step::Complete);
    assert_eq!(p.completed(), 1);
  }
}
