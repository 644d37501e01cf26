//! Evaluation session controller.
//!
//! One controller per evaluator. The controller never performs I/O itself:
//! every action that needs a collaborator returns a ticket describing the
//! request, and the caller feeds the collaborator's answer back through the
//! matching `apply_*` method. A ticket whose token is no longer the pending
//! one is stale and its result is dropped, so at most one fetch is ever
//! applied per session and results that arrive after the evaluator navigated
//! away are discarded.
//!
//! States:
//!   SubjectSelection -> CountSelection -> Comparing -> Resolved
//!                                  ^                      |
//!                                  +---- advance ---------+
//!   any fetch may land in Exhausted; `back_to_subjects` resets from anywhere.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Catalog;
use crate::domain::{
    DisplayedSide, FeedbackSubmission, FetchedPair, QuestionPair, SelectionCommit, SessionId,
    Variant,
};
use crate::error::{ServiceError, SessionError};
use crate::presentation::{PresentationMapping, SwapSource};
use crate::progress::{ProgressTracker, Step};
use crate::protocol::SessionView;

/// Why the pending fetch was issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOrigin {
    FirstRound,
    NextRound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountSelection {
    pub subject: String,
    /// Set once the evaluator picked a count.
    pub progress: Option<ProgressTracker>,
    pub origin: FetchOrigin,
}

/// A fetched pair on screen, with its blind mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub session_id: SessionId,
    pub subject: String,
    pub progress: ProgressTracker,
    pub pair: QuestionPair,
    pub mapping: PresentationMapping,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRound {
    pub round: Round,
    pub chosen: DisplayedSide,
    pub winner: Variant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    SubjectSelection,
    CountSelection(CountSelection),
    Comparing(Round),
    Resolved(ResolvedRound),
    Exhausted,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::SubjectSelection => "subject_selection",
            SessionState::CountSelection(_) => "count_selection",
            SessionState::Comparing(_) => "comparing",
            SessionState::Resolved(_) => "resolved",
            SessionState::Exhausted => "exhausted",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub token: u64,
    pub subject: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitTicket {
    pub token: u64,
    pub side: DisplayedSide,
    pub commit: SelectionCommit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackTicket {
    pub submission: FeedbackSubmission,
}

/// Outcome of "advance".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    Fetch(FetchTicket),
    Complete { subject: String, target: u32 },
}

/// Whether a collaborator result was applied or dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

pub struct SessionController {
    catalog: Arc<Catalog>,
    swaps: Box<dyn SwapSource>,
    state: SessionState,
    next_token: u64,
    pending_fetch: Option<u64>,
    pending_commit: Option<u64>,
    last_error: Option<String>,
    notice: Option<String>,
}

impl SessionController {
    pub fn new(catalog: Arc<Catalog>, swaps: Box<dyn SwapSource>) -> Self {
        Self {
            catalog,
            swaps,
            state: SessionState::SubjectSelection,
            next_token: 0,
            pending_fetch: None,
            pending_commit: None,
            last_error: None,
            notice: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn fetch_pending(&self) -> bool {
        self.pending_fetch.is_some()
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition { action, state: self.state.name() }
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn issue_fetch(&mut self, subject: String) -> FetchTicket {
        let token = self.issue_token();
        self.pending_fetch = Some(token);
        self.last_error = None;
        debug!(target: "arena", token, %subject, "Fetch issued");
        FetchTicket { token, subject }
    }

    /// SubjectSelection -> CountSelection.
    pub fn pick_subject(&mut self, subject: &str) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::SubjectSelection) {
            return Err(self.invalid("pick a subject"));
        }
        if !self.catalog.has_subject(subject) {
            return Err(SessionError::UnknownSubject(subject.to_string()));
        }
        self.pending_fetch = None;
        self.pending_commit = None;
        self.last_error = None;
        self.notice = None;
        self.state = SessionState::CountSelection(CountSelection {
            subject: subject.to_string(),
            progress: None,
            origin: FetchOrigin::FirstRound,
        });
        info!(target: "arena", %subject, "Subject picked");
        Ok(())
    }

    /// Sets the target and issues the first fetch. May be re-invoked after a
    /// failed first fetch.
    pub fn pick_count(&mut self, count: u32) -> Result<FetchTicket, SessionError> {
        if self.pending_fetch.is_some() {
            return Err(SessionError::FetchInFlight);
        }
        let subject = match &self.state {
            SessionState::CountSelection(cs) if cs.origin == FetchOrigin::FirstRound => cs.subject.clone(),
            _ => return Err(self.invalid("pick a question count")),
        };
        if !self.catalog.allows_count(count) {
            return Err(SessionError::InvalidCount {
                count,
                allowed: self.catalog.question_counts.clone(),
            });
        }
        self.state = SessionState::CountSelection(CountSelection {
            subject: subject.clone(),
            progress: Some(ProgressTracker::start(count)),
            origin: FetchOrigin::FirstRound,
        });
        info!(target: "arena", %subject, target = count, "Question count picked");
        Ok(self.issue_fetch(subject))
    }

    /// Re-issues the fetch that last failed, without touching progress.
    pub fn retry(&mut self) -> Result<FetchTicket, SessionError> {
        if self.pending_fetch.is_some() {
            return Err(SessionError::FetchInFlight);
        }
        match &self.state {
            SessionState::CountSelection(CountSelection { subject, progress: Some(_), .. }) => {
                let subject = subject.clone();
                Ok(self.issue_fetch(subject))
            }
            _ => Err(self.invalid("retry a fetch")),
        }
    }

    /// Feeds back the result of a fetch-pair call.
    pub fn apply_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<FetchedPair, ServiceError>,
    ) -> Applied {
        if self.pending_fetch != Some(ticket.token) {
            debug!(target: "arena", token = ticket.token, "Dropping stale fetch result");
            return Applied::Stale;
        }
        self.pending_fetch = None;

        let (subject, progress) = match &self.state {
            SessionState::CountSelection(CountSelection { subject, progress: Some(p), .. }) => {
                (subject.clone(), *p)
            }
            _ => {
                warn!(target: "arena", state = self.state.name(), "Fetch result without a waiting session");
                return Applied::Stale;
            }
        };

        match result {
            Ok(fetched) => {
                let mapping = PresentationMapping::draw(self.swaps.as_mut());
                info!(
                    target: "arena",
                    %subject,
                    session_id = %fetched.session_id,
                    question_index = %fetched.pair.question_index,
                    completed = progress.completed(),
                    target = progress.target(),
                    "Pair ready"
                );
                debug!(target: "arena", swapped = mapping.swapped, "Presentation drawn");
                self.last_error = None;
                self.state = SessionState::Comparing(Round {
                    session_id: fetched.session_id,
                    subject,
                    progress,
                    pair: fetched.pair,
                    mapping,
                });
            }
            Err(ServiceError::Exhausted { .. }) => {
                info!(target: "arena", %subject, "Question pool exhausted");
                self.last_error = None;
                self.notice = Some(format!("No more questions are available for {subject}."));
                self.state = SessionState::Exhausted;
            }
            Err(ServiceError::Generic(msg)) => {
                warn!(target: "arena", %subject, error = %msg, "Fetch failed; holding for retry");
                self.last_error = Some(format!("Failed to load questions: {msg}"));
            }
        }
        Applied::Applied
    }

    /// Resolves the displayed choice to the true variant and prepares the
    /// commit. State is untouched until the commit result is applied, and the
    /// mapping is kept so a retry produces the identical commit.
    pub fn select(&mut self, side: DisplayedSide) -> Result<CommitTicket, SessionError> {
        if self.pending_commit.is_some() {
            return Err(SessionError::CommitInFlight);
        }
        let commit = match &self.state {
            SessionState::Comparing(round) => SelectionCommit {
                session_id: round.session_id.clone(),
                subject: round.subject.clone(),
                question_index: round.pair.question_index,
                true_variant: round.mapping.resolve(side),
            },
            _ => return Err(self.invalid("select a side")),
        };
        let token = self.issue_token();
        self.pending_commit = Some(token);
        debug!(target: "arena", token, %side, winner = %commit.true_variant, "Selection resolved");
        Ok(CommitTicket { token, side, commit })
    }

    /// Feeds back the result of a commit-selection call.
    pub fn apply_commit(&mut self, ticket: &CommitTicket, result: Result<(), ServiceError>) -> Applied {
        if self.pending_commit != Some(ticket.token) {
            debug!(target: "arena", token = ticket.token, "Dropping stale commit result");
            return Applied::Stale;
        }
        self.pending_commit = None;

        let same_round = matches!(
            &self.state,
            SessionState::Comparing(round) if round.session_id == ticket.commit.session_id
        );
        if !same_round {
            return Applied::Stale;
        }

        match result {
            Ok(()) => {
                let state = std::mem::replace(&mut self.state, SessionState::SubjectSelection);
                if let SessionState::Comparing(round) = state {
                    info!(
                        target: "arena",
                        subject = %round.subject,
                        session_id = %round.session_id,
                        side = %ticket.side,
                        "Selection recorded"
                    );
                    self.last_error = None;
                    self.state = SessionState::Resolved(ResolvedRound {
                        round,
                        chosen: ticket.side,
                        winner: ticket.commit.true_variant,
                    });
                }
            }
            Err(e) => {
                warn!(target: "arena", error = %e, "Commit failed; selection may be retried");
                self.last_error = Some(format!("Failed to record selection: {e}"));
            }
        }
        Applied::Applied
    }

    /// Prepares a feedback submission for the resolved round.
    pub fn submit_feedback(&mut self, text: &str) -> Result<FeedbackTicket, SessionError> {
        let session_id = match &self.state {
            SessionState::Resolved(r) => r.round.session_id.clone(),
            _ => return Err(self.invalid("submit feedback")),
        };
        let feedback = text.trim();
        if feedback.is_empty() {
            return Err(SessionError::EmptyFeedback);
        }
        Ok(FeedbackTicket {
            submission: FeedbackSubmission { session_id, feedback: feedback.to_string() },
        })
    }

    /// Reports the feedback outcome. Never changes state.
    pub fn apply_feedback(&mut self, ticket: &FeedbackTicket, result: Result<(), ServiceError>) -> Applied {
        let same_round = matches!(
            &self.state,
            SessionState::Resolved(r) if r.round.session_id == ticket.submission.session_id
        );
        if !same_round {
            return Applied::Stale;
        }
        match result {
            Ok(()) => {
                self.last_error = None;
                self.notice = Some("Feedback submitted.".into());
            }
            Err(e) => {
                warn!(target: "arena", error = %e, "Feedback submission failed");
                self.last_error = Some(format!("Failed to submit feedback: {e}"));
            }
        }
        Applied::Applied
    }

    /// Moves past a resolved round: either completes the session or issues
    /// the next fetch. Re-invoking after a failed next-round fetch retries it.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        if self.pending_fetch.is_some() {
            return Err(SessionError::FetchInFlight);
        }
        if let SessionState::CountSelection(cs) = &self.state {
            if cs.origin == FetchOrigin::NextRound {
                let subject = cs.subject.clone();
                return Ok(Advance::Fetch(self.issue_fetch(subject)));
            }
        }
        let mut resolved = match &self.state {
            SessionState::Resolved(r) => r.clone(),
            _ => return Err(self.invalid("advance")),
        };

        match resolved.round.progress.advance() {
            Step::Complete => {
                let subject = resolved.round.subject;
                let target = resolved.round.progress.target();
                info!(target: "arena", %subject, target, "Session complete");
                self.reset();
                self.notice = Some(format!(
                    "Session complete: {target} of {target} questions evaluated for {subject}."
                ));
                Ok(Advance::Complete { subject, target })
            }
            Step::Next => {
                let subject = resolved.round.subject;
                debug!(
                    target: "arena",
                    %subject,
                    completed = resolved.round.progress.completed(),
                    previous_winner = %resolved.winner,
                    "Advancing to next round"
                );
                self.notice = None;
                self.state = SessionState::CountSelection(CountSelection {
                    subject: subject.clone(),
                    progress: Some(resolved.round.progress),
                    origin: FetchOrigin::NextRound,
                });
                Ok(Advance::Fetch(self.issue_fetch(subject)))
            }
        }
    }

    /// Discards all session-scoped state. Any in-flight result becomes stale.
    pub fn back_to_subjects(&mut self) {
        info!(target: "arena", from = self.state.name(), "Returning to subject selection");
        self.reset();
    }

    fn reset(&mut self) {
        self.state = SessionState::SubjectSelection;
        self.pending_fetch = None;
        self.pending_commit = None;
        self.last_error = None;
        self.notice = None;
    }

    /// Evaluator-facing snapshot. Never exposes variant identity.
    pub fn view(&self) -> SessionView {
        let mut view = SessionView {
            state: self.state.name(),
            subject: None,
            target: None,
            completed: None,
            question_a: None,
            question_b: None,
            chosen: None,
            fetch_pending: self.pending_fetch.is_some(),
            commit_pending: self.pending_commit.is_some(),
            last_error: self.last_error.clone(),
            notice: self.notice.clone(),
        };
        let round = match &self.state {
            SessionState::SubjectSelection | SessionState::Exhausted => None,
            SessionState::CountSelection(cs) => {
                view.subject = Some(cs.subject.clone());
                view.target = cs.progress.map(|p| p.target());
                view.completed = cs.progress.map(|p| p.completed());
                None
            }
            SessionState::Comparing(round) => Some(round),
            SessionState::Resolved(r) => {
                view.chosen = Some(r.chosen);
                Some(&r.round)
            }
        };
        if let Some(round) = round {
            view.subject = Some(round.subject.clone());
            view.target = Some(round.progress.target());
            view.completed = Some(round.progress.completed());
            view.question_a = Some(round.mapping.displayed(&round.pair, DisplayedSide::A).clone());
            view.question_b = Some(round.mapping.displayed(&round.pair, DisplayedSide::B).clone());
        }
        view
    }
}
