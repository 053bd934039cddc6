//! API credential resolution.
//!
//! An unset key and a placeholder key are the same thing: not configured.

use std::fmt;
use zeroize::Zeroizing;

/// Environment variable carrying the cantonese.ai API key
pub const API_KEY_ENV: &str = "CANTONESE_AI_API_KEY";

const PLACEHOLDERS: &[&str] = &[
    "your_api_key_here",
    "your-api-key",
    "your_api_key",
    "api_key_here",
    "changeme",
    "replace_me",
    "todo",
    "none",
    "null",
];

/// The cantonese.ai API key. Zeroized on drop, redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    /// Accept a raw credential, rejecting blanks and template placeholders.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if is_placeholder(trimmed) {
            return None;
        }
        Some(Self(Zeroizing::new(trimmed.to_string())))
    }

    /// Resolve from `CANTONESE_AI_API_KEY`. Never fails; absence is `None`.
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV)
            .ok()
            .and_then(|raw| Self::parse(&raw))
    }

    /// Environment first, then the config file value.
    pub fn resolve(configured: Option<&str>) -> Option<Self> {
        Self::from_env().or_else(|| configured.and_then(Self::parse))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

fn is_placeholder(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    if value.starts_with('<') && value.ends_with('>') {
        return true;
    }
    let lower = value.to_ascii_lowercase();
    if lower.chars().all(|c| c == 'x' || c == '*') {
        return true;
    }
    PLACEHOLDERS.contains(&lower.as_str())
}
