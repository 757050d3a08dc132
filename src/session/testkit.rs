//! Scripted collaborator doubles shared by the session tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::browser::{DriverError, DriverResult, Locator, PageDriver, PageObservation};
use crate::planner::{Plan, PlanRequest, Planner, PlannerError};
use crate::recorder::{RecorderError, ResultRecorder};
use crate::scribe::{DocumentGenerator, ScribeError};
use crate::session::Outcome;

pub fn observation(address: &str, title: &str, content: &str) -> PageObservation {
    PageObservation {
        content: content.to_string(),
        address: address.to_string(),
        title: title.to_string(),
    }
}

/// A [`PageDriver`] that replays scripted observations and records every
/// interaction as a readable call string.
pub struct MockDriver {
    observations: Mutex<VecDeque<PageObservation>>,
    last_observation: Mutex<PageObservation>,
    marker_hits: Mutex<VecDeque<bool>>,
    tab_counts: Mutex<VecDeque<usize>>,
    fail_selectors: Mutex<HashSet<String>>,
    fail_navigation: Mutex<bool>,
    checked: Mutex<HashMap<String, bool>>,
    calls: Mutex<Vec<String>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            observations: Mutex::new(VecDeque::new()),
            last_observation: Mutex::new(observation("about:blank", "", "")),
            marker_hits: Mutex::new(VecDeque::new()),
            tab_counts: Mutex::new(VecDeque::new()),
            fail_selectors: Mutex::new(HashSet::new()),
            fail_navigation: Mutex::new(false),
            checked: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script_observations(&self, observations: Vec<PageObservation>) {
        self.observations.lock().unwrap().extend(observations);
    }

    /// Responses for successive `element_present` probes; defaults to false
    /// once the script runs out.
    pub fn script_marker(&self, hits: Vec<bool>) {
        self.marker_hits.lock().unwrap().extend(hits);
    }

    /// Responses for successive `tab_count` calls; defaults to 1.
    pub fn script_tab_counts(&self, counts: Vec<usize>) {
        self.tab_counts.lock().unwrap().extend(counts);
    }

    pub fn fail_navigation(&self) {
        *self.fail_navigation.lock().unwrap() = true;
    }

    pub fn fail_selector(&self, selector: &str) {
        self.fail_selectors.lock().unwrap().insert(selector.to_string());
    }

    pub fn set_checked(&self, selector: &str, value: bool) {
        self.checked.lock().unwrap().insert(selector.to_string(), value);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn note(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_failure(&self, locator: &Locator) -> DriverResult<()> {
        if self.fail_selectors.lock().unwrap().contains(&locator.selector) {
            return Err(DriverError::NotFound(locator.selector.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn observe(&self) -> DriverResult<PageObservation> {
        self.note("observe".into());
        let next = self.observations.lock().unwrap().pop_front();
        let mut last = self.last_observation.lock().unwrap();
        if let Some(obs) = next {
            *last = obs;
        }
        Ok(last.clone())
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        if *self.fail_navigation.lock().unwrap() {
            return Err(DriverError::Timeout(format!("navigation to {url}")));
        }
        self.note(format!("navigate {url}"));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> DriverResult<()> {
        self.check_failure(locator)?;
        self.note(format!("click {locator}"));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> DriverResult<()> {
        self.check_failure(locator)?;
        self.note(format!("fill {locator} = {text}"));
        Ok(())
    }

    async fn select_option(&self, locator: &Locator, option_text: &str) -> DriverResult<()> {
        self.check_failure(locator)?;
        self.note(format!("select {locator} = {option_text}"));
        Ok(())
    }

    async fn press_keys(&self, keys: &[&str]) -> DriverResult<()> {
        self.note(format!("press {}", keys.join("+")));
        Ok(())
    }

    async fn is_checked(&self, locator: &Locator) -> DriverResult<bool> {
        self.check_failure(locator)?;
        self.note(format!("is_checked {locator}"));
        Ok(*self
            .checked
            .lock()
            .unwrap()
            .get(&locator.selector)
            .unwrap_or(&false))
    }

    async fn upload_file(&self, locator: &Locator, path: &Path) -> DriverResult<()> {
        self.check_failure(locator)?;
        self.note(format!("upload {locator} = {}", path.display()));
        Ok(())
    }

    async fn element_present(&self, _locator: &Locator) -> bool {
        self.marker_hits.lock().unwrap().pop_front().unwrap_or(false)
    }

    async fn dismiss_overlay(&self) -> DriverResult<bool> {
        self.note("dismiss_overlay".into());
        Ok(false)
    }

    async fn tab_count(&self) -> DriverResult<usize> {
        Ok(self.tab_counts.lock().unwrap().pop_front().unwrap_or(1))
    }

    async fn focus_latest_tab(&self) -> DriverResult<()> {
        self.note("focus_latest_tab".into());
        Ok(())
    }

    async fn reset_tabs(&self) -> DriverResult<()> {
        self.note("reset_tabs".into());
        Ok(())
    }
}

/// Replays a scripted sequence of plan results and counts how many rounds
/// actually reached the planner.
pub struct MockPlanner {
    plans: Mutex<VecDeque<Result<Plan, PlannerError>>>,
    pub requests: Mutex<usize>,
}

impl MockPlanner {
    pub fn new(plans: Vec<Result<Plan, PlannerError>>) -> Self {
        Self {
            plans: Mutex::new(plans.into_iter().collect()),
            requests: Mutex::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait]
impl Planner for MockPlanner {
    async fn next_plan(&self, _request: PlanRequest<'_>) -> Result<Plan, PlannerError> {
        *self.requests.lock().unwrap() += 1;
        self.plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PlannerError::Transport("script exhausted".into())))
    }
}

/// Captures every recorded outcome in memory.
pub struct CapturingRecorder {
    pub outcomes: Mutex<Vec<Outcome>>,
}

impl CapturingRecorder {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<Outcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultRecorder for CapturingRecorder {
    async fn record(&self, outcome: &Outcome) -> Result<(), RecorderError> {
        self.outcomes.lock().unwrap().push(outcome.clone());
        Ok(())
    }
}

/// Document generator double. Optionally fails every request to exercise the
/// non-fatal path.
pub struct StubScribe {
    pub fail: bool,
    pub letters: Mutex<Vec<String>>,
}

impl StubScribe {
    pub fn new() -> Self {
        Self {
            fail: false,
            letters: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            letters: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentGenerator for StubScribe {
    async fn generate(&self, text: &str) -> Result<PathBuf, ScribeError> {
        if self.fail {
            return Err(ScribeError::Io(std::io::Error::other("disk full")));
        }
        self.letters.lock().unwrap().push(text.to_string());
        Ok(PathBuf::from("cover_letter.txt"))
    }
}
