//! Moderator — runs the full pipeline for one submission.
//!
//! Stage order is fixed on every submission: operating hours →
//! eligibility → ledger quota/duplicate → attachment format → content
//! policy → publish → ledger commit. The whole sequence for one sender
//! runs under that sender's lock, so two concurrent submissions from
//! the same user can never both pass the quota check before either
//! commits. Different senders never serialize against each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::GateConfig;
use crate::gateway::{ChannelPublisher, MembershipOracle};
use crate::moderation::eligibility::EligibilityGate;
use crate::moderation::hours::OperatingHours;
use crate::moderation::ledger::SubmissionLedger;
use crate::moderation::policy::ContentPolicy;
use crate::moderation::types::{Attachment, AttachmentKind, Submission};
use crate::moderation::verdict::{Rejection, RejectionKind, Verdict};

/// Terminal outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Relayed to the channel and committed to the ledger.
    Published,
    /// A gate rejected the submission. Quota NOT consumed.
    Rejected(Rejection),
    /// All gates passed but the publish call failed. Quota NOT
    /// consumed; the sender may resubmit, re-running the pipeline.
    PublishFailed,
}

pub struct Moderator {
    hours: OperatingHours,
    eligibility: EligibilityGate,
    ledger: SubmissionLedger,
    policy: ContentPolicy,
    publisher: Arc<dyn ChannelPublisher>,
    allowed_extensions: Vec<String>,
    /// Lazily created per-sender locks serializing check-then-commit.
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl Moderator {
    pub fn new(
        config: &GateConfig,
        oracle: Arc<dyn MembershipOracle>,
        publisher: Arc<dyn ChannelPublisher>,
    ) -> Self {
        Self {
            hours: config.hours,
            eligibility: EligibilityGate::new(oracle, config.required_groups.clone()),
            ledger: SubmissionLedger::new(config.daily_cap, config.hours.offset()),
            policy: ContentPolicy::new(config.policy.clone()),
            publisher,
            allowed_extensions: config.allowed_extensions.clone(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run the gates only — no publish, no commit. Used for the
    /// confirm-mode draft check; safe to repeat (idempotent).
    pub async fn check(&self, submission: &Submission, now: DateTime<Utc>) -> Verdict {
        let lock = self.user_lock(submission.sender.user_id).await;
        let _guard = lock.lock().await;
        self.run_gates(submission, now).await
    }

    /// Run the gates, publish on pass, and commit only if the publish
    /// succeeded.
    pub async fn submit(&self, submission: &Submission, now: DateTime<Utc>) -> SubmitOutcome {
        let user_id = submission.sender.user_id;
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        if let Verdict::Reject(rejection) = self.run_gates(submission, now).await {
            info!(user_id, kind = ?rejection.kind, "submission rejected");
            return SubmitOutcome::Rejected(rejection);
        }

        match self.publisher.publish(submission).await {
            Ok(()) => {
                self.ledger.commit(user_id, &submission.text, now);
                info!(user_id, "submission published");
                SubmitOutcome::Published
            }
            Err(e) => {
                warn!(user_id, error = %e, "publish failed, not committing");
                SubmitOutcome::PublishFailed
            }
        }
    }

    /// Re-run the eligibility gate alone — the retry affordance after
    /// an `Unverifiable` or `NotSubscribed` deny.
    pub async fn recheck_eligibility(&self, user_id: i64) -> Verdict {
        self.eligibility.check(user_id).await
    }

    async fn run_gates(&self, submission: &Submission, now: DateTime<Utc>) -> Verdict {
        if !self.hours.is_open(now) {
            return Verdict::reject(
                RejectionKind::Closed,
                "Submissions are closed right now — come back during open hours.",
            );
        }

        let verdict = self.eligibility.check(submission.sender.user_id).await;
        if !verdict.is_accept() {
            return verdict;
        }

        let verdict = self
            .ledger
            .check_limit(submission.sender.user_id, &submission.text, now);
        if !verdict.is_accept() {
            return verdict;
        }

        if let Some(attachment) = &submission.attachment {
            let verdict = self.check_attachment(attachment);
            if !verdict.is_accept() {
                return verdict;
            }
        }

        self.policy
            .evaluate(&submission.text, submission.sender.handle.as_deref())
    }

    /// File-extension whitelist. Photos carry no filename and always
    /// pass; documents must have a whitelisted extension.
    fn check_attachment(&self, attachment: &Attachment) -> Verdict {
        if attachment.kind == AttachmentKind::Photo {
            return Verdict::Accept;
        }
        let ok = attachment
            .extension
            .as_deref()
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false);
        if ok {
            Verdict::Accept
        } else {
            Verdict::reject(
                RejectionKind::BadAttachment,
                format!(
                    "Unsupported file type — allowed: {}.",
                    self.allowed_extensions.join(", ")
                ),
            )
        }
    }

    async fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(user_id).or_default())
    }
}
