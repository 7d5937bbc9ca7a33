//! The submission-moderation pipeline.
//!
//! Every submission flows through the same fixed sequence:
//! 1. `OperatingHours::is_open` — time-of-day gate
//! 2. `EligibilityGate::check` — membership oracle lookups
//! 3. `SubmissionLedger::check_limit` — daily quota + duplicate window
//! 4. `ContentPolicy::evaluate` — ordered content rules
//!
//! The first failing stage's message is returned to the sender. Only a
//! submission that passes all four stages *and* publishes successfully
//! is committed to the ledger.

pub mod eligibility;
pub mod hours;
pub mod ledger;
pub mod policy;
pub mod service;
pub mod types;
pub mod verdict;
pub mod workflow;

pub use eligibility::EligibilityGate;
pub use hours::OperatingHours;
pub use ledger::SubmissionLedger;
pub use policy::{ContentPolicy, PolicyConfig};
pub use service::{Moderator, SubmitOutcome};
pub use types::{Attachment, AttachmentKind, SenderProfile, Submission};
pub use verdict::{Rejection, RejectionKind, Verdict};
pub use workflow::{ConversationState, Reply, ReplyMenu, UserEvent, Workflow};
