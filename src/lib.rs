//! Unattended job-application driver
//!
//! Walks a list of job links in one long-lived browser session, asking a
//! planning model what to do on each page and carrying out the planned form
//! interactions until every link reaches a terminal outcome.

pub mod browser;
pub mod browser_setup;
pub mod inputs;
pub mod planner;
pub mod recorder;
pub mod scribe;
pub mod session;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

/// Timing and retry knobs for the per-link control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Settle delay after loading a job link
    #[serde(default = "default_settle_after_navigation_ms")]
    pub settle_after_navigation_ms: u64,

    /// Settle delay after an action batch before re-observing
    #[serde(default = "default_settle_after_actions_ms")]
    pub settle_after_actions_ms: u64,

    /// Pause granted to async dropdown suggestion lists
    #[serde(default = "default_suggestion_settle_ms")]
    pub suggestion_settle_ms: u64,

    /// Consecutive identical page signatures before giving up on a link
    #[serde(default = "default_stagnation_bound")]
    pub stagnation_bound: u32,

    /// Hard ceiling on observe/plan/act rounds per link
    #[serde(default = "default_max_rounds_per_link")]
    pub max_rounds_per_link: u32,
}

/// Planning model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Browser security and launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// Where the run's inputs and outputs live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_job_links")]
    pub job_links: PathBuf,

    #[serde(default = "default_candidate_memory")]
    pub candidate_memory: PathBuf,

    #[serde(default = "default_resume")]
    pub resume: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_settle_after_navigation_ms() -> u64 {
    3000
}
fn default_settle_after_actions_ms() -> u64 {
    2000
}
fn default_suggestion_settle_ms() -> u64 {
    1500
}
fn default_stagnation_bound() -> u32 {
    3
}
fn default_max_rounds_per_link() -> u32 {
    20
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_output_tokens() -> u64 {
    4096
}
fn default_request_timeout_secs() -> u64 {
    120
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false  // SECURE BY DEFAULT
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_job_links() -> PathBuf {
    PathBuf::from("input/job_links.csv")
}
fn default_candidate_memory() -> PathBuf {
    PathBuf::from("memory/faq_memory.json")
}
fn default_resume() -> PathBuf {
    PathBuf::from("memory/resume.pdf")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_after_navigation_ms: default_settle_after_navigation_ms(),
            settle_after_actions_ms: default_settle_after_actions_ms(),
            suggestion_settle_ms: default_suggestion_settle_ms(),
            stagnation_bound: default_stagnation_bound(),
            max_rounds_per_link: default_max_rounds_per_link(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: default_disable_security(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            job_links: default_job_links(),
            candidate_memory: default_candidate_memory(),
            resume: default_resume(),
            output_dir: default_output_dir(),
        }
    }
}

/// Load config from config.yaml in the working directory, falling back to
/// defaults when the file is absent.
pub fn load_yaml_config() -> anyhow::Result<Config> {
    let config_path = PathBuf::from("config.yaml");

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub use browser::{
    BrowserWrapper, CdpDriver, DriverError, DriverResult, Locator, LocatorScheme, PageDriver,
    PageObservation,
};
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use session::{Outcome, OutcomeStatus, SessionRunner};
