//! Transport seam — the traits the pipeline needs from the outside
//! world, plus the Telegram implementation of both.
//!
//! The core never talks to the Bot API directly: it publishes through
//! [`ChannelPublisher`] and checks membership through
//! [`MembershipOracle`]. Tests substitute stubs for both.

pub mod telegram;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::moderation::types::Submission;

pub use telegram::TelegramGateway;

/// Membership status of a user in a group/channel, as reported by the
/// external directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Left,
    Kicked,
    Unknown,
}

impl MemberStatus {
    /// Map a Bot API `status` string onto the enum. Anything the API
    /// grows in the future lands on `Unknown`, which the eligibility
    /// gate treats as "not subscribed".
    pub fn from_api(status: &str) -> Self {
        match status {
            "creator" => Self::Creator,
            "administrator" => Self::Administrator,
            "member" => Self::Member,
            "left" => Self::Left,
            "kicked" => Self::Kicked,
            _ => Self::Unknown,
        }
    }

    /// Statuses that satisfy a required-group check.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

/// External directory answering "is this user a member of that group?".
///
/// Calls may fail or time out; the eligibility gate converts failures
/// into a retryable soft deny, never a crash.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn member_status(&self, group_id: i64, user_id: i64)
        -> Result<MemberStatus, GatewayError>;
}

/// Relays an accepted submission to the destination channel.
///
/// Invoked exactly once per accepted submission. A failure is surfaced
/// to the sender as a transient error and is never retried
/// automatically by the core.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    async fn publish(&self, submission: &Submission) -> Result<(), GatewayError>;
}
