//! Eligibility gate — is this sender allowed to post at all?
//!
//! Consults the membership oracle for every required group, in the
//! declared order, and returns the first failing group's reason.
//! A "kicked" status is a hard deny and stops the scan immediately;
//! an oracle failure is a *soft* deny the sender may simply retry.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::RequiredGroup;
use crate::gateway::MembershipOracle;
use crate::moderation::verdict::{RejectionKind, Verdict};

pub struct EligibilityGate {
    oracle: Arc<dyn MembershipOracle>,
    required: Vec<RequiredGroup>,
}

impl EligibilityGate {
    pub fn new(oracle: Arc<dyn MembershipOracle>, required: Vec<RequiredGroup>) -> Self {
        Self { oracle, required }
    }

    /// Check every required group in order. All must pass.
    pub async fn check(&self, user_id: i64) -> Verdict {
        for group in &self.required {
            let status = match self.oracle.member_status(group.id, user_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(user_id, group_id = group.id, error = %e, "membership query failed");
                    return Verdict::reject(
                        RejectionKind::Unverifiable,
                        "Could not verify your membership right now. \
                         Tap \"Check access\" to try again.",
                    );
                }
            };

            if status == crate::gateway::MemberStatus::Kicked {
                debug!(user_id, group_id = group.id, "sender is banned");
                return Verdict::reject(
                    RejectionKind::Blocked,
                    "You are blocked from posting to this channel.",
                );
            }

            if !status.is_subscribed() {
                debug!(user_id, group_id = group.id, ?status, "sender not subscribed");
                return Verdict::reject(
                    RejectionKind::NotSubscribed,
                    format!(
                        "Subscribe to {} first, then tap \"Check access\".",
                        group.title
                    ),
                );
            }
        }
        Verdict::Accept
    }
}
