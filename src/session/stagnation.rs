//! Per-link stagnation tracking
//!
//! Counts consecutive planning rounds that observed the same page signature.
//! Signature equality is the authoritative signal: a planner can vary its
//! wording (and its selectors) while making no real progress, so comparing
//! plans alone is not enough. The last plan fingerprint is kept as a
//! secondary cross-check and only ever logged.

use tracing::debug;

use super::signature::Signature;

/// What one round of observation told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// True when the page changed since the previous round
    pub progressed: bool,
    /// 1-based count of consecutive rounds on the current signature
    pub attempt: u32,
}

/// Tracks consecutive same-signature rounds for one job link.
///
/// Scoped to exactly one link; the session loop creates a fresh detector per
/// link so state never leaks between links.
#[derive(Debug, Default)]
pub struct StagnationDetector {
    last_signature: Option<Signature>,
    consecutive: u32,
    last_fingerprint: Option<String>,
}

impl StagnationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this round's signature and report progress.
    pub fn observe(&mut self, signature: &Signature) -> Progress {
        if self.last_signature.as_ref() == Some(signature) {
            self.consecutive += 1;
            Progress {
                progressed: false,
                attempt: self.consecutive,
            }
        } else {
            self.last_signature = Some(signature.clone());
            self.consecutive = 1;
            Progress {
                progressed: true,
                attempt: 1,
            }
        }
    }

    /// Secondary cross-check: remember the plan fingerprint and report
    /// whether it repeated the previous round's. Informational only.
    pub fn note_fingerprint(&mut self, fingerprint: String) -> bool {
        let repeated = self.last_fingerprint.as_deref() == Some(fingerprint.as_str());
        if repeated {
            debug!("Planner repeated an identical action list");
        }
        self.last_fingerprint = Some(fingerprint);
        repeated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::signature::signature;

    #[test]
    fn same_signature_counts_up() {
        let mut detector = StagnationDetector::new();
        let sig = signature("https://jobs.example.com/apply", "Apply");

        let p1 = detector.observe(&sig);
        assert_eq!((p1.progressed, p1.attempt), (true, 1));

        let p2 = detector.observe(&sig);
        assert_eq!((p2.progressed, p2.attempt), (false, 2));

        let p3 = detector.observe(&sig);
        assert_eq!((p3.progressed, p3.attempt), (false, 3));
    }

    #[test]
    fn new_signature_resets_the_count() {
        let mut detector = StagnationDetector::new();
        let step1 = signature("https://jobs.example.com/apply", "Step 1");
        let step2 = signature("https://jobs.example.com/apply", "Step 2");

        detector.observe(&step1);
        detector.observe(&step1);
        let p = detector.observe(&step2);
        assert_eq!((p.progressed, p.attempt), (true, 1));

        // And going back still counts from one
        let p = detector.observe(&step1);
        assert_eq!((p.progressed, p.attempt), (true, 1));
    }

    #[test]
    fn fingerprint_repeats_are_reported() {
        let mut detector = StagnationDetector::new();
        assert!(!detector.note_fingerprint("abc".into()));
        assert!(detector.note_fingerprint("abc".into()));
        assert!(!detector.note_fingerprint("def".into()));
    }
}
