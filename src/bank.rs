//! Local question bank used when no upstream generation service is configured.
//!
//! Each subject has a finite pool; every fetch consumes one pair and issues a
//! fresh session id. Once the pool is used up the subject reports exhaustion.
//! Selections and feedback are kept in memory and exported as the preference
//! dataset.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::EvaluationBackend;
use crate::domain::{
    FeedbackSubmission, FetchedPair, QuestionIndex, QuestionPair, QuestionRecord, SelectionCommit,
    SessionId, Variant,
};
use crate::error::ServiceError;

/// One recorded preference: which generator won a given pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PreferenceRecord {
    pub session_id: SessionId,
    pub subject: String,
    pub question_index: QuestionIndex,
    pub selected_variant: Variant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeedbackRecord {
    pub session_id: SessionId,
    pub feedback: String,
}

#[derive(Default)]
struct BankInner {
    served: HashMap<String, u64>,
    issued: HashMap<SessionId, (String, QuestionIndex)>,
    selections: Vec<PreferenceRecord>,
    feedback: Vec<FeedbackRecord>,
}

pub struct LocalBank {
    subjects: Vec<String>,
    pool_size: u64,
    inner: RwLock<BankInner>,
}

impl LocalBank {
    pub fn new(subjects: Vec<String>, pool_size: u64) -> Self {
        Self { subjects, pool_size, inner: RwLock::new(BankInner::default()) }
    }

    /// Questions still unserved for `subject`.
    #[allow(dead_code)]
    pub async fn remaining(&self, subject: &str) -> u64 {
        let served = self.inner.read().await.served.get(subject).copied().unwrap_or(0);
        self.pool_size.saturating_sub(served)
    }
}

fn sample_pair(subject: &str, index: u64) -> QuestionPair {
    let n = index + 1;
    QuestionPair {
        question_index: QuestionIndex(index),
        variant_a: QuestionRecord {
            question: format!("문제 {n}: {subject} 예시 문제?"),
            choices: vec!["보기 A".into(), "보기 B".into(), "보기 C".into(), "보기 D".into()],
            answer: "1)".into(),
            explanation: format!("{subject} 예시 해설입니다."),
        },
        variant_b: QuestionRecord {
            question: format!("문제 {n}: {subject}에 관한 다음 설명 중 옳은 것은?"),
            choices: vec!["설명 1".into(), "설명 2".into(), "설명 3".into(), "설명 4".into()],
            answer: "3)".into(),
            explanation: format!("{subject}의 핵심 개념을 확인하는 문제입니다."),
        },
    }
}

#[async_trait]
impl EvaluationBackend for LocalBank {
    fn name(&self) -> &'static str {
        "local_bank"
    }

    #[instrument(level = "info", skip(self), fields(%subject))]
    async fn fetch_pair(&self, subject: &str) -> Result<FetchedPair, ServiceError> {
        if !self.subjects.iter().any(|s| s == subject) {
            warn!(target: "upstream", %subject, "Local bank has no such subject");
            return Err(ServiceError::Generic(format!("unknown subject '{subject}'")));
        }
        let mut inner = self.inner.write().await;
        let served = inner.served.entry(subject.to_string()).or_insert(0);
        if *served >= self.pool_size {
            info!(target: "upstream", %subject, pool = self.pool_size, "Local pool exhausted");
            return Err(ServiceError::Exhausted { subject: subject.to_string() });
        }
        let index = *served;
        *served += 1;

        let session_id = SessionId(Uuid::new_v4().to_string());
        let pair = sample_pair(subject, index);
        inner.issued.insert(session_id.clone(), (subject.to_string(), pair.question_index));
        debug!(target: "upstream", %subject, %session_id, index, "Local pair served");
        Ok(FetchedPair { session_id, pair })
    }

    #[instrument(level = "info", skip(self, commit), fields(session_id = %commit.session_id))]
    async fn commit_selection(&self, commit: &SelectionCommit) -> Result<(), ServiceError> {
        let mut inner = self.inner.write().await;
        match inner.issued.get(&commit.session_id) {
            Some((subject, index)) if *subject == commit.subject && *index == commit.question_index => {}
            _ => {
                return Err(ServiceError::Generic(format!(
                    "no pair {} was issued for session {}",
                    commit.question_index, commit.session_id
                )))
            }
        }
        inner.selections.push(PreferenceRecord {
            session_id: commit.session_id.clone(),
            subject: commit.subject.clone(),
            question_index: commit.question_index,
            selected_variant: commit.true_variant,
        });
        info!(target: "upstream", subject = %commit.subject, winner = %commit.true_variant, "Preference stored");
        Ok(())
    }

    #[instrument(level = "info", skip(self, feedback), fields(session_id = %feedback.session_id, feedback_len = feedback.feedback.len()))]
    async fn submit_feedback(&self, feedback: &FeedbackSubmission) -> Result<(), ServiceError> {
        let mut inner = self.inner.write().await;
        if !inner.issued.contains_key(&feedback.session_id) {
            return Err(ServiceError::Generic(format!("unknown session {}", feedback.session_id)));
        }
        inner.feedback.push(FeedbackRecord {
            session_id: feedback.session_id.clone(),
            feedback: feedback.feedback.clone(),
        });
        Ok(())
    }

    async fn export(&self) -> (Vec<PreferenceRecord>, Vec<FeedbackRecord>) {
        let inner = self.inner.read().await;
        (inner.selections.clone(), inner.feedback.clone())
    }
}
