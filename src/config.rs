//! Configuration — everything a deployment can tune, read once at startup.

use chrono::FixedOffset;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::moderation::hours::OperatingHours;
use crate::moderation::policy::PolicyConfig;

/// A group/channel the sender must belong to before posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredGroup {
    /// Transport-level chat id (negative for Telegram groups/channels).
    pub id: i64,
    /// Human-readable name used in "subscribe to X" replies.
    pub title: String,
}

/// Full gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Bot API token. Never logged.
    pub bot_token: SecretString,
    /// Destination channel for accepted posts.
    pub channel_id: i64,
    /// Groups checked by the eligibility gate, in declared order.
    pub required_groups: Vec<RequiredGroup>,
    /// Posts allowed per sender per calendar day.
    pub daily_cap: u32,
    /// Time-of-day window during which submissions are accepted.
    pub hours: OperatingHours,
    /// Whitelisted document extensions (lower-case, no dot).
    pub allowed_extensions: Vec<String>,
    /// Whether accepted drafts require an explicit confirm tap.
    pub require_confirmation: bool,
    /// Content-policy rule parameters.
    pub policy: PolicyConfig,
}

impl GateConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing required values and unparseable values are fatal — the
    /// process must not start polling with a broken config.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("ADGATE_BOT_TOKEN")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("ADGATE_BOT_TOKEN".into()))?;

        let channel_id = require_parsed::<i64>("ADGATE_CHANNEL_ID")?;

        let required_groups = match std::env::var("ADGATE_REQUIRED_GROUPS") {
            Ok(raw) => parse_groups(&raw)?,
            // Default: senders must be subscribed to the channel itself.
            Err(_) => vec![RequiredGroup {
                id: channel_id,
                title: "the channel".into(),
            }],
        };

        let daily_cap = parsed_or("ADGATE_DAILY_CAP", 3)?;

        let offset: FixedOffset = optional("ADGATE_UTC_OFFSET")
            .unwrap_or_else(|| "+00:00".into())
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "ADGATE_UTC_OFFSET".into(),
                message: format!("expected an offset like +03:00: {e}"),
            })?;

        let hours = match optional("ADGATE_OPEN_HOURS") {
            Some(raw) => {
                let (start, end) = parse_window(&raw)?;
                OperatingHours::new(start, end, offset)?
            }
            None => OperatingHours::always_open(offset),
        };

        let allowed_extensions = optional("ADGATE_ALLOWED_EXTENSIONS")
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|| vec!["jpg".into(), "jpeg".into(), "png".into()]);

        let require_confirmation = optional("ADGATE_REQUIRE_CONFIRMATION")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut policy = PolicyConfig::default();
        if let Some(link) = optional("ADGATE_ALLOWED_LINK") {
            policy.allowed_link = Some(link.to_lowercase());
        }
        if let Some(admins) = optional("ADGATE_ADMIN_HANDLES") {
            policy.admin_handles = split_list(&admins);
        }

        Ok(Self {
            bot_token,
            channel_id,
            required_groups,
            daily_cap,
            hours,
            allowed_extensions,
            require_confirmation,
            policy,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn require_parsed<T: std::str::FromStr>(key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.into()))?;
    raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("{e}"),
    })
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("{e}"),
        }),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `"-1001234:Stamp Chat,-1005678"` into required groups.
/// A missing title falls back to the id itself.
fn parse_groups(raw: &str) -> Result<Vec<RequiredGroup>, ConfigError> {
    let mut groups = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id_part, title) = match entry.split_once(':') {
            Some((id, title)) => (id.trim(), title.trim().to_string()),
            None => (entry, entry.to_string()),
        };
        let id: i64 = id_part.parse().map_err(|e| ConfigError::InvalidValue {
            key: "ADGATE_REQUIRED_GROUPS".into(),
            message: format!("bad group id {id_part:?}: {e}"),
        })?;
        groups.push(RequiredGroup { id, title });
    }
    if groups.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "ADGATE_REQUIRED_GROUPS".into(),
            message: "no groups listed".into(),
        });
    }
    Ok(groups)
}

/// Parse `"9-21"` / `"9.5-17.75"` into fractional window bounds.
fn parse_window(raw: &str) -> Result<(f32, f32), ConfigError> {
    let bad = |message: String| ConfigError::InvalidValue {
        key: "ADGATE_OPEN_HOURS".into(),
        message,
    };
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| bad(format!("expected START-END, got {raw:?}")))?;
    let start: f32 = start
        .trim()
        .parse()
        .map_err(|e| bad(format!("bad start hour: {e}")))?;
    let end: f32 = end
        .trim()
        .parse()
        .map_err(|e| bad(format!("bad end hour: {e}")))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_groups_with_titles() {
        let groups = parse_groups("-100123:Stamp Chat, -100456").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, -100123);
        assert_eq!(groups[0].title, "Stamp Chat");
        assert_eq!(groups[1].title, "-100456");
    }

    #[test]
    fn parse_groups_rejects_garbage() {
        assert!(parse_groups("abc").is_err());
        assert!(parse_groups("").is_err());
    }

    #[test]
    fn parse_window_integer_and_fractional() {
        assert_eq!(parse_window("9-21").unwrap(), (9.0, 21.0));
        assert_eq!(parse_window("9.5-17.75").unwrap(), (9.5, 17.75));
        assert!(parse_window("nine to five").is_err());
    }

    #[test]
    fn split_list_trims_and_lowercases() {
        assert_eq!(
            split_list("JPG, png , ,gif"),
            vec!["jpg".to_string(), "png".into(), "gif".into()]
        );
    }
}
