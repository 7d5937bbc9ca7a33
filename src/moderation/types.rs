//! Shared types for the moderation pipeline.
//!
//! The transport adapter converts its native update format into these
//! structs; the pipeline never sees transport-specific payloads.

use serde::{Deserialize, Serialize};

/// Who sent a submission. Immutable per submission; supplied by the
/// transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    /// Transport-level numeric user id.
    pub user_id: i64,
    /// Public handle, if the sender has one.
    pub handle: Option<String>,
}

/// Kind of media attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Photo,
    Document,
}

/// A media attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    /// Opaque transport handle for re-sending the media (Telegram file_id).
    pub file_ref: String,
    /// Lower-cased file extension, when the transport exposes a filename.
    pub extension: Option<String>,
}

/// One user-authored candidate post awaiting moderation.
///
/// Transient — exists only for the duration of one pipeline pass
/// (or, in confirm mode, while held as a `Reviewing` draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub sender: SenderProfile,
    /// Post text or media caption. May be empty for captionless media.
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Submission {
    /// Text-only submission.
    pub fn text_only(sender: SenderProfile, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            attachment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_only_has_no_attachment() {
        let sub = Submission::text_only(
            SenderProfile {
                user_id: 7,
                handle: Some("alice".into()),
            },
            "hello",
        );
        assert!(sub.attachment.is_none());
        assert_eq!(sub.text, "hello");
    }

    #[test]
    fn submission_serde_roundtrip() {
        let sub = Submission {
            sender: SenderProfile {
                user_id: 42,
                handle: None,
            },
            text: "caption".into(),
            attachment: Some(Attachment {
                kind: AttachmentKind::Document,
                file_ref: "BAAD".into(),
                extension: Some("png".into()),
            }),
        };
        let json = serde_json::to_string(&sub).unwrap();
        let parsed: Submission = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sub);
    }
}
