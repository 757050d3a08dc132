//! Coarse page-identity keys
//!
//! A signature identifies "the same logical page" across planning rounds. It
//! is deliberately coarser than markup hashing: timers, ads and other DOM
//! churn must not look like forward progress, while a route change or a
//! multi-step form advancing its title must.

use url::Url;

/// Stable identity for one observed page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a signature from the page address and title.
///
/// The address is normalized by dropping the query string and fragment;
/// the title is trimmed. Deterministic and pure.
pub fn signature(address: &str, title: &str) -> Signature {
    Signature(format!("{}::{}", normalize_address(address), title.trim()))
}

fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();

    if let Ok(mut url) = Url::parse(trimmed) {
        url.set_query(None);
        url.set_fragment(None);
        return url.to_string();
    }

    // Not a parseable URL; fall back to a plain query-string strip
    match trimmed.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_is_ignored() {
        assert_eq!(
            signature("https://jobs.example.com/apply?utm=email&ref=42", "Apply"),
            signature("https://jobs.example.com/apply", "Apply"),
        );
    }

    #[test]
    fn title_whitespace_is_ignored() {
        assert_eq!(
            signature("https://jobs.example.com/apply", "  Apply \n"),
            signature("https://jobs.example.com/apply", "Apply"),
        );
    }

    #[test]
    fn path_change_is_a_different_page() {
        assert_ne!(
            signature("https://jobs.example.com/apply/step1", "Apply"),
            signature("https://jobs.example.com/apply/step2", "Apply"),
        );
    }

    #[test]
    fn title_change_is_a_different_page() {
        assert_ne!(
            signature("https://jobs.example.com/apply", "Step 1 of 3"),
            signature("https://jobs.example.com/apply", "Step 2 of 3"),
        );
    }

    #[test]
    fn non_url_locators_still_normalize() {
        assert_eq!(
            signature("about:blank?x=1", "t"),
            signature("about:blank", "t"),
        );
    }
}
