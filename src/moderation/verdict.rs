//! Verdicts — the result every pipeline stage returns.

/// Why a submission was rejected.
///
/// `Unverifiable` is the one *soft* rejection: the membership oracle
/// could not be reached, so the sender may simply retry. Everything
/// else is a definitive answer for this attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Outside the configured operating window.
    Closed,
    /// Sender was kicked/banned from a required group. Hard deny.
    Blocked,
    /// Sender is not a member of a required group.
    NotSubscribed,
    /// Membership could not be verified (oracle failure). Retryable.
    Unverifiable,
    /// Daily post cap reached.
    QuotaExceeded,
    /// Same text already posted within the duplicate window.
    Duplicate,
    /// A content-policy rule failed.
    Content,
    /// Attachment extension is not whitelisted.
    BadAttachment,
}

impl RejectionKind {
    /// Whether the sender can retry without changing anything
    /// (transient failure, not counted against quota).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unverifiable)
    }
}

/// A rejection with its user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

/// Result of a single gate stage. The first `Reject` short-circuits
/// the pipeline and its message is relayed to the sender verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

impl Verdict {
    /// Build a rejection verdict.
    pub fn reject(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self::Reject(Rejection {
            kind,
            message: message.into(),
        })
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// The rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accept => None,
            Self::Reject(r) => Some(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unverifiable_is_retryable() {
        let kinds = [
            RejectionKind::Closed,
            RejectionKind::Blocked,
            RejectionKind::NotSubscribed,
            RejectionKind::QuotaExceeded,
            RejectionKind::Duplicate,
            RejectionKind::Content,
            RejectionKind::BadAttachment,
        ];
        for kind in kinds {
            assert!(!kind.is_retryable(), "{kind:?} should not be retryable");
        }
        assert!(RejectionKind::Unverifiable.is_retryable());
    }

    #[test]
    fn reject_carries_message() {
        let v = Verdict::reject(RejectionKind::Content, "no contact info");
        assert!(!v.is_accept());
        assert_eq!(v.rejection().unwrap().message, "no contact info");
    }

    #[test]
    fn accept_has_no_rejection() {
        assert!(Verdict::Accept.is_accept());
        assert!(Verdict::Accept.rejection().is_none());
    }
}
