//! Conversational workflow — sequences menu navigation and submission
//! collection per user.
//!
//! Menu events force a deterministic state from any current state;
//! raw text/media while `AwaitingSubmission` is a submission attempt;
//! raw text/media while `Idle` just shows the menu. Every event
//! produces exactly one reply.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::moderation::service::{Moderator, SubmitOutcome};
use crate::moderation::types::Submission;
use crate::moderation::verdict::Verdict;

/// Per-user conversational state. Owned by the workflow; the transport
/// only triggers transitions via events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingSubmission,
    /// Holds a draft that passed the gates, pending confirm/cancel.
    Reviewing(Submission),
}

/// An inbound user action, already decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// `/start` or any unsolicited message while idle.
    ShowMenu,
    /// "Post an ad" button.
    BeginSubmission,
    /// "Publish" button while reviewing a draft.
    Confirm,
    /// "Cancel" button.
    Cancel,
    /// "Check access" button — re-runs the eligibility gate alone.
    RecheckEligibility,
    /// Raw text or media.
    Content(Submission),
}

/// Which keyboard the transport should attach to a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMenu {
    Main,
    Confirm,
    None,
}

/// The single reply produced for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub menu: ReplyMenu,
}

impl Reply {
    fn new(text: impl Into<String>, menu: ReplyMenu) -> Self {
        Self {
            text: text.into(),
            menu,
        }
    }
}

const MENU_TEXT: &str = "What would you like to do?";
const PROMPT_TEXT: &str = "Send your post — text, or a photo with a caption.";
const PUBLISHED_TEXT: &str = "Posted to the channel.";
const PUBLISH_FAILED_TEXT: &str =
    "Could not reach the channel — nothing was counted. Please try again later.";
const CANCELLED_TEXT: &str = "Draft discarded.";
const CONFIRM_PROMPT_TEXT: &str = "Looks good. Publish it?";
const ELIGIBLE_TEXT: &str = "You're all set — tap \"Post an ad\" to submit.";
const NOTHING_TO_CONFIRM_TEXT: &str = "There is no draft to publish. Tap \"Post an ad\" first.";

pub struct Workflow {
    moderator: Arc<Moderator>,
    require_confirmation: bool,
    states: Mutex<HashMap<i64, ConversationState>>,
}

impl Workflow {
    pub fn new(moderator: Arc<Moderator>, require_confirmation: bool) -> Self {
        Self {
            moderator,
            require_confirmation,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one event for one user and produce the single reply.
    pub async fn handle(&self, user_id: i64, event: UserEvent, now: DateTime<Utc>) -> Reply {
        debug!(user_id, ?event, "workflow event");
        match event {
            UserEvent::ShowMenu => {
                self.set_state(user_id, ConversationState::Idle).await;
                Reply::new(MENU_TEXT, ReplyMenu::Main)
            }
            UserEvent::BeginSubmission => {
                self.set_state(user_id, ConversationState::AwaitingSubmission)
                    .await;
                Reply::new(PROMPT_TEXT, ReplyMenu::None)
            }
            UserEvent::Cancel => {
                self.set_state(user_id, ConversationState::Idle).await;
                Reply::new(CANCELLED_TEXT, ReplyMenu::Main)
            }
            UserEvent::RecheckEligibility => match self.moderator.recheck_eligibility(user_id).await
            {
                Verdict::Accept => Reply::new(ELIGIBLE_TEXT, ReplyMenu::Main),
                Verdict::Reject(r) => Reply::new(r.message, ReplyMenu::Main),
            },
            UserEvent::Confirm => {
                let draft = match self.state_of(user_id).await {
                    ConversationState::Reviewing(draft) => draft,
                    _ => return Reply::new(NOTHING_TO_CONFIRM_TEXT, ReplyMenu::Main),
                };
                self.set_state(user_id, ConversationState::Idle).await;
                // Re-run the full pipeline: the draft may have gone
                // stale (quota, hours) since the initial check.
                self.publish(&draft, now).await
            }
            UserEvent::Content(submission) => match self.state_of(user_id).await {
                ConversationState::Idle => Reply::new(MENU_TEXT, ReplyMenu::Main),
                // A new payload while reviewing replaces the draft.
                ConversationState::AwaitingSubmission | ConversationState::Reviewing(_) => {
                    self.attempt(user_id, submission, now).await
                }
            },
        }
    }

    /// Current state for a user (test/introspection hook).
    pub async fn state_of(&self, user_id: i64) -> ConversationState {
        self.states
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or(ConversationState::Idle)
    }

    async fn attempt(&self, user_id: i64, submission: Submission, now: DateTime<Utc>) -> Reply {
        if self.require_confirmation {
            match self.moderator.check(&submission, now).await {
                Verdict::Accept => {
                    self.set_state(user_id, ConversationState::Reviewing(submission))
                        .await;
                    Reply::new(CONFIRM_PROMPT_TEXT, ReplyMenu::Confirm)
                }
                Verdict::Reject(r) => {
                    self.set_state(user_id, ConversationState::Idle).await;
                    Reply::new(r.message, ReplyMenu::Main)
                }
            }
        } else {
            self.set_state(user_id, ConversationState::Idle).await;
            self.publish(&submission, now).await
        }
    }

    async fn publish(&self, submission: &Submission, now: DateTime<Utc>) -> Reply {
        match self.moderator.submit(submission, now).await {
            SubmitOutcome::Published => Reply::new(PUBLISHED_TEXT, ReplyMenu::Main),
            SubmitOutcome::Rejected(r) => Reply::new(r.message, ReplyMenu::Main),
            SubmitOutcome::PublishFailed => Reply::new(PUBLISH_FAILED_TEXT, ReplyMenu::Main),
        }
    }

    async fn set_state(&self, user_id: i64, state: ConversationState) {
        self.states.lock().await.insert(user_id, state);
    }
}
