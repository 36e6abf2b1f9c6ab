//! Authentication utility functions.

use std::sync::LazyLock;

use rand::prelude::RngExt;
use rand::rng;
use regex::Regex;

pub const USERNAME_MIN_LENGTH: usize = 4;
pub const USERNAME_MAX_LENGTH: usize = 50;
pub const EMAIL_MIN_LENGTH: usize = 3;
pub const EMAIL_MAX_LENGTH: usize = 100;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("username pattern is valid"));

/// Trim and lowercase an email address before validation and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    (EMAIL_MIN_LENGTH..=EMAIL_MAX_LENGTH).contains(&email.chars().count()) && EMAIL_RE.is_match(email)
}

pub fn is_valid_username(username: &str) -> bool {
    (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&username.chars().count()) && USERNAME_RE.is_match(username)
}

/// Generate a username candidate from an email address.
/// Format: "{sanitized local part}{4-digit number}"
/// Example: "ada.lovelace4729"
pub fn generate_username(email: &str) -> String {
    const STEM_MAX: usize = USERNAME_MAX_LENGTH - 4;

    let local = email.split('@').next().unwrap_or_default();
    let mut stem: String = local
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .take(STEM_MAX)
        .collect();
    if stem.is_empty() {
        stem.push_str("user");
    }

    let number = rng().random_range(1000..10000);
    format!("{stem}{number}")
}
