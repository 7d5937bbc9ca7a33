//! Content policy evaluator — ordered, deterministic text rules.
//!
//! Pure function from (text, sender handle) to a verdict. Rule order is
//! fixed and the first failing rule's message wins:
//! 1. a contact tag (`@` + 5+ word chars) must be present
//! 2. unless off-topic-tagged: an intent keyword and a disclosure
//!    keyword must both be present
//! 3. caps ratio ≤ 0.7 for texts longer than 10 chars
//! 4. no forbidden words (case-insensitive substring)
//! 5. no links, except the allow-listed channel link
//! 6. no `@...bot` mentions
//! 7. every non-bot contact tag must be the sender's own handle or an
//!    admin handle
//!
//! All matching happens on the lower-cased text except the caps-ratio
//! rule, which needs the raw casing.

use regex::Regex;
use tracing::debug;

use crate::moderation::verdict::{RejectionKind, Verdict};

/// Texts this short are exempt from the caps-ratio rule.
const CAPS_MIN_LENGTH: usize = 10;

/// Rule parameters. Deployment variants are profiles of this struct,
/// not code forks.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// At least one must appear unless the post is off-topic-tagged.
    pub intent_keywords: Vec<String>,
    /// Shipping/handover terms; same exemption as intent keywords.
    pub disclosure_keywords: Vec<String>,
    /// Tags that exempt a post from intent/disclosure checks.
    pub offtopic_tags: Vec<String>,
    /// Case-insensitive substrings that reject outright.
    pub forbidden_words: Vec<String>,
    /// The one link (e.g. the channel's own invite) that is allowed.
    pub allowed_link: Option<String>,
    /// Handles exempt from the foreign-handle rule.
    pub admin_handles: Vec<String>,
    /// Maximum share of uppercase letters.
    pub max_caps_ratio: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            intent_keywords: strings(&["продам", "куплю", "обмен", "sell", "buy", "trade"]),
            disclosure_keywords: strings(&[
                "почта",
                "почтой",
                "самовывоз",
                "доставка",
                "встреча",
                "shipping",
                "pickup",
            ]),
            offtopic_tags: strings(&["#оффтоп", "#offtopic"]),
            forbidden_words: strings(&["блядь", "сука", "хуй", "пизд", "ебан", "fuck"]),
            allowed_link: None,
            admin_handles: Vec::new(),
            max_caps_ratio: 0.7,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub struct ContentPolicy {
    config: PolicyConfig,
    contact_re: Regex,
    url_re: Regex,
    bot_mention_re: Regex,
}

impl ContentPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            contact_re: Regex::new(r"@([A-Za-z0-9_]{5,})").unwrap(),
            url_re: Regex::new(
                r"(?i)(?:https?://\S+|www\.\S+|t\.me/\w+|\b[a-z0-9-]+\.(?:com|ru|net|org|io)\b)",
            )
            .unwrap(),
            bot_mention_re: Regex::new(r"(?i)@\w*bot\b").unwrap(),
        }
    }

    /// Evaluate `text` against every rule in order. Pure — same inputs
    /// always produce the same verdict.
    pub fn evaluate(&self, text: &str, sender_handle: Option<&str>) -> Verdict {
        let lower = text.to_lowercase();

        // 1. Contact tag present
        let tags: Vec<&str> = self
            .contact_re
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        if tags.is_empty() {
            return self.fail("Add a contact: mention your @username in the post.");
        }

        // 2. Off-topic posts skip intent/disclosure requirements
        let off_topic = self
            .config
            .offtopic_tags
            .iter()
            .any(|tag| lower.contains(&tag.to_lowercase()));
        if !off_topic {
            if !contains_any(&lower, &self.config.intent_keywords) {
                return self.fail("Say what you want to do: sell, buy, or trade.");
            }
            if !contains_any(&lower, &self.config.disclosure_keywords) {
                return self.fail("Mention the delivery terms (shipping, pickup, ...).");
            }
        }

        // 3. Caps ratio — the one rule that needs raw casing
        let total = text.chars().count();
        if total > CAPS_MIN_LENGTH {
            let upper = text.chars().filter(|c| c.is_uppercase()).count();
            if upper as f32 / total as f32 > self.config.max_caps_ratio {
                return self.fail("Too much capitalization — rewrite without caps lock.");
            }
        }

        // 4. Profanity
        if contains_any(&lower, &self.config.forbidden_words) {
            return self.fail("The post contains forbidden language.");
        }

        // 5. Links — only the allow-listed channel link may appear
        for m in self.url_re.find_iter(&lower) {
            let allowed = match &self.config.allowed_link {
                Some(link) => {
                    let link = link.to_lowercase();
                    m.as_str().contains(&link) || link.contains(m.as_str())
                }
                None => false,
            };
            if !allowed {
                return self.fail("Links are not allowed in posts.");
            }
        }

        // 6. Bot mentions
        if self.bot_mention_re.is_match(&lower) {
            return self.fail("Do not advertise bots in posts.");
        }

        // 7. Foreign handles — every non-bot tag must be the sender or an admin
        let sender = sender_handle.map(str::to_lowercase);
        for tag in &tags {
            let tag_lower = tag.to_lowercase();
            if tag_lower.ends_with("bot") {
                continue;
            }
            let own = sender.as_deref() == Some(tag_lower.as_str());
            let admin = self
                .config
                .admin_handles
                .iter()
                .any(|a| a.to_lowercase() == tag_lower);
            if !own && !admin {
                return self.fail(format!(
                    "Mention your own contact — @{tag} is not your handle."
                ));
            }
        }

        Verdict::Accept
    }

    fn fail(&self, message: impl Into<String>) -> Verdict {
        let message = message.into();
        debug!(%message, "content rule failed");
        Verdict::reject(RejectionKind::Content, message)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| haystack.contains(n.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ContentPolicy {
        ContentPolicy::new(PolicyConfig::default())
    }

    fn policy_with(f: impl FnOnce(&mut PolicyConfig)) -> ContentPolicy {
        let mut config = PolicyConfig::default();
        f(&mut config);
        ContentPolicy::new(config)
    }

    fn reason(v: &Verdict) -> String {
        v.rejection().expect("expected rejection").message.clone()
    }

    #[test]
    fn valid_sale_post_is_accepted() {
        let v = policy().evaluate("Продам за 100, почта моя, @ivan12345", Some("ivan12345"));
        assert_eq!(v, Verdict::Accept);
    }

    #[test]
    fn missing_contact_tag_rejects_first() {
        let v = policy().evaluate("Продам марки, почта", Some("ivan12345"));
        assert!(reason(&v).contains("contact"));
    }

    #[test]
    fn short_tags_do_not_count_as_contact() {
        // 4 word chars — below the 5-char minimum
        let v = policy().evaluate("Продам, почта, @ivan", Some("ivan"));
        assert!(reason(&v).contains("contact"));
    }

    #[test]
    fn missing_intent_keyword_rejects() {
        let v = policy().evaluate("Отдам даром, почта, @ivan12345", Some("ivan12345"));
        assert!(reason(&v).contains("sell, buy, or trade"));
    }

    #[test]
    fn missing_disclosure_rejects() {
        let v = policy().evaluate("Продам марки, @ivan12345", Some("ivan12345"));
        assert!(reason(&v).contains("delivery"));
    }

    #[test]
    fn offtopic_tag_exempts_intent_and_disclosure() {
        let v = policy().evaluate("#оффтоп ищу единомышленников, @ivan12345", Some("ivan12345"));
        assert_eq!(v, Verdict::Accept);
    }

    #[test]
    fn caps_ratio_rejects_regardless_of_valid_tags() {
        // Intent, disclosure, and contact rules all satisfied — caps still rejects.
        let v = policy().evaluate("ПРОДАМ СРОЧНО ВСЁ КАПСОМ ПОЧТА @IVAN12345", Some("ivan12345"));
        assert!(reason(&v).contains("capitalization"));
    }

    #[test]
    fn lowercase_heavy_text_passes_caps_rule() {
        let p = policy_with(|c| {
            c.intent_keywords = vec!["куплю".into()];
            c.disclosure_keywords = vec!["почта".into()];
        });
        // ≤10 chars total would be exempt; prove the threshold with a
        // borderline lowercase-heavy long text instead.
        let v = p.evaluate("КУПЛЮ марки недорого, почта, пишите @ivan12345", Some("ivan12345"));
        assert_eq!(v, Verdict::Accept);
    }

    #[test]
    fn profanity_rejects() {
        let v = policy().evaluate("Продам нахуй марки, почта, @ivan12345", Some("ivan12345"));
        assert!(reason(&v).contains("forbidden language"));
    }

    #[test]
    fn links_reject() {
        for text in [
            "Продам, почта, @ivan12345, подробнее https://example.com/lot",
            "Продам, почта, @ivan12345, сайт www.stamps.example",
            "Продам, почта, @ivan12345, пишите в t.me/someone",
            "Продам, почта, @ivan12345, магазин stamps.ru",
        ] {
            let v = policy().evaluate(text, Some("ivan12345"));
            assert!(reason(&v).contains("Links"), "should reject: {text}");
        }
    }

    #[test]
    fn allow_listed_channel_link_passes() {
        let p = policy_with(|c| c.allowed_link = Some("t.me/stampboard".into()));
        let v = p.evaluate(
            "Продам, почта, @ivan12345, наш канал t.me/stampboard",
            Some("ivan12345"),
        );
        assert_eq!(v, Verdict::Accept);
    }

    #[test]
    fn other_link_rejects_even_with_allow_list() {
        let p = policy_with(|c| c.allowed_link = Some("t.me/stampboard".into()));
        let v = p.evaluate(
            "Продам, почта, @ivan12345, ещё t.me/competitor",
            Some("ivan12345"),
        );
        assert!(reason(&v).contains("Links"));
    }

    #[test]
    fn bot_mention_rejects_before_foreign_handle_check() {
        // Bot-suffixed handles pass the foreign-handle rule but fail
        // the bot-mention rule, which runs first.
        let v = policy().evaluate(
            "Продам, почта, @ivan12345 и @someoneelsesbot",
            Some("ivan12345"),
        );
        assert!(reason(&v).contains("bots"));
    }

    #[test]
    fn foreign_handle_rejects() {
        let v = policy().evaluate("Продам, почта, пишите @other_person1", Some("ivan12345"));
        assert!(reason(&v).contains("@other_person1"));
    }

    #[test]
    fn own_handle_matches_case_insensitively() {
        let v = policy().evaluate("Продам, почта, @Ivan12345", Some("IVAN12345"));
        assert_eq!(v, Verdict::Accept);
    }

    #[test]
    fn admin_handle_is_exempt_from_foreign_rule() {
        let p = policy_with(|c| c.admin_handles = vec!["board_admin".into()]);
        let v = p.evaluate(
            "Продам, почта, вопросы к @board_admin",
            Some("ivan12345"),
        );
        assert_eq!(v, Verdict::Accept);
    }

    #[test]
    fn handleless_sender_cannot_claim_a_contact() {
        let v = policy().evaluate("Продам, почта, @ivan12345", None);
        assert!(reason(&v).contains("@ivan12345"));
    }

    #[test]
    fn evaluation_is_pure() {
        let p = policy();
        let text = "Продам за 100, почта моя, @ivan12345";
        let first = p.evaluate(text, Some("ivan12345"));
        for _ in 0..5 {
            assert_eq!(p.evaluate(text, Some("ivan12345")), first);
        }
    }

    #[test]
    fn empty_text_rejects_on_contact() {
        let v = policy().evaluate("", Some("ivan12345"));
        assert!(reason(&v).contains("contact"));
    }
}
