//! Domain models: subjects, the two hidden generator variants, displayed sides,
//! and the question records that make up one comparison round.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Course names offered when no TOML override is configured.
pub const DEFAULT_SUBJECTS: &[&str] = &[
  "객체지향프로그래밍",
  "디지털논리회로",
  "디지털시스템설계",
  "멀티미디어",
  "자료구조론",
  "컴퓨터네트워크",
  "회로이론1",
  "기계학습개론",
  "데이터베이스설계",
  "신호및시스템",
  "알고리즘설계",
  "전자기학1",
  "정보보호론",
  "확률변수",
];

/// Session question counts offered when no TOML override is configured.
pub const DEFAULT_QUESTION_COUNTS: &[u32] = &[5, 10];

/// True identity of a generator. Never shown to the evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
  VariantA,
  VariantB,
}

impl Variant {
  pub fn as_str(self) -> &'static str {
    match self {
      Variant::VariantA => "variant_a",
      Variant::VariantB => "variant_b",
    }
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The "A"/"B" label the evaluator sees and clicks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayedSide {
  A,
  B,
}

impl fmt::Display for DisplayedSide {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DisplayedSide::A => f.write_str("A"),
      DisplayedSide::B => f.write_str("B"),
    }
  }
}

/// Opaque handle issued by the generation service for one fetched pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Index into the subject's question pool, echoed back on commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionIndex(pub u64);

impl fmt::Display for QuestionIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One generated multiple-choice question. Text fields may carry math markup
/// and are passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
  pub question: String,
  /// Displayed numbering follows this order.
  #[serde(default)]
  pub choices: Vec<String>,
  pub answer: String,
  #[serde(default)]
  pub explanation: String,
}

/// The unit of comparison for one round. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPair {
  pub question_index: QuestionIndex,
  pub variant_a: QuestionRecord,
  pub variant_b: QuestionRecord,
}

impl QuestionPair {
  pub fn variant(&self, v: Variant) -> &QuestionRecord {
    match v {
      Variant::VariantA => &self.variant_a,
      Variant::VariantB => &self.variant_b,
    }
  }
}

/// Successful fetch-pair result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedPair {
  pub session_id: SessionId,
  pub pair: QuestionPair,
}

/// Payload of the commit-selection call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectionCommit {
  pub session_id: SessionId,
  pub subject: String,
  pub question_index: QuestionIndex,
  #[serde(rename = "selected_variant")]
  pub true_variant: Variant,
}

/// Payload of the submit-feedback call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeedbackSubmission {
  pub session_id: SessionId,
  pub feedback: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn variant_serializes_as_snake_case_label() {
    assert_eq!(serde_json::to_string(&Variant::VariantA).unwrap(), "\"variant_a\"");
    assert_eq!(serde_json::to_string(&Variant::VariantB).unwrap(), "\"variant_b\"");
    assert_eq!(Variant::VariantB.to_string(), "variant_b");
  }

  #[test]
  fn displayed_side_rejects_unknown_labels() {
    assert_eq!(serde_json::from_str::<DisplayedSide>("\"A\"").unwrap(), DisplayedSide::A);
    assert!(serde_json::from_str::<DisplayedSide>("\"C\"").is_err());
  }

  #[test]
  fn commit_payload_uses_wire_field_name() {
    let commit = SelectionCommit {
      session_id: SessionId("s-1".into()),
      subject: "확률변수".into(),
      question_index: QuestionIndex(7),
      true_variant: Variant::VariantB,
    };
    let v = serde_json::to_value(&commit).unwrap();
    assert_eq!(v["selected_variant"], "variant_b");
    assert_eq!(v["question_index"], 7);
    assert_eq!(v["session_id"], "s-1");
  }
}
