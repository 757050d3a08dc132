//! Executes one round's worth of planned actions against a page driver.
//!
//! Actions are isolated from each other: a failing action is logged and the
//! batch continues, since later actions frequently target elements unrelated
//! to the broken one. The only thing that aborts a batch early is the page
//! flipping into its submitted state mid-round.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::{DriverError, Locator, PageDriver};
use crate::planner::{Action, ActionKind};

/// Marker the target job boards render once an application is submitted.
/// Probed before every action so a successful submit mid-batch stops the
/// remaining actions from mangling the confirmation page.
pub const SUCCESS_MARKER: &str = "//div[contains(text(), 'Thank you for applying')]";

/// What happened while running a batch of actions.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// The submitted-confirmation marker appeared, aborting the batch
    pub success_marker_seen: bool,
    pub executed: usize,
    pub failed: usize,
}

/// Run every action in order. `settle` is the pause granted to pages that
/// populate dropdown suggestions asynchronously.
pub async fn perform_all<D: PageDriver + ?Sized>(
    driver: &D,
    actions: &[Action],
    settle: Duration,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();

    // Consent overlays swallow clicks on everything underneath them.
    if driver.dismiss_overlay().await.unwrap_or(false) {
        info!("dismissed consent overlay before running actions");
    }

    let marker = Locator::infer(SUCCESS_MARKER);
    for action in actions {
        if driver.element_present(&marker).await {
            info!("submission confirmation appeared, stopping remaining actions");
            report.success_marker_seen = true;
            break;
        }

        match perform(driver, action, settle).await {
            Ok(marker_seen) => {
                report.executed += 1;
                if marker_seen {
                    report.success_marker_seen = true;
                    break;
                }
            }
            Err(e) => {
                warn!(
                    kind = ?action.kind,
                    selector = %action.selector,
                    error = %e,
                    "action failed, continuing with the rest of the batch"
                );
                report.failed += 1;
            }
        }
    }

    report
}

/// Run a single action. Returns `Ok(true)` when the submitted marker showed
/// up partway through a composite action.
async fn perform<D: PageDriver + ?Sized>(
    driver: &D,
    action: &Action,
    settle: Duration,
) -> Result<bool, DriverError> {
    let locator = Locator::infer(&action.selector);
    debug!(kind = ?action.kind, locator = %locator, "performing action");

    match action.kind {
        ActionKind::Click => driver.click(&locator).await?,
        ActionKind::Type => {
            let text = require(action.text.as_deref(), "text")?;
            driver.fill(&locator, text).await?;
        }
        ActionKind::Select => {
            let option = require(action.option_text.as_deref(), "option_text")?;
            driver.select_option(&locator, option).await?;
        }
        ActionKind::DynamicSelect => {
            let option = require(action.option_text.as_deref(), "option_text")?;
            driver.click(&locator).await?;
            driver.fill(&locator, option).await?;
            // Suggestion lists populate from the network after typing.
            tokio::time::sleep(settle).await;
            let marker = Locator::infer(SUCCESS_MARKER);
            if driver.element_present(&marker).await {
                return Ok(true);
            }
            driver.press_keys(&["ArrowDown", "Enter"]).await?;
        }
        ActionKind::Check => {
            if !driver.is_checked(&locator).await? {
                driver.click(&locator).await?;
            }
        }
        ActionKind::Upload => {
            let path = require(action.file_path.as_deref(), "file_path")?;
            driver.upload_file(&locator, Path::new(path)).await?;
        }
    }

    Ok(false)
}

fn require<'a>(field: Option<&'a str>, name: &str) -> Result<&'a str, DriverError> {
    field.ok_or_else(|| DriverError::Other(format!("action is missing its {name} payload")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testkit::MockDriver;

    fn click(selector: &str) -> Action {
        Action {
            kind: ActionKind::Click,
            selector: selector.into(),
            text: None,
            option_text: None,
            file_path: None,
        }
    }

    fn type_into(selector: &str, text: &str) -> Action {
        Action {
            kind: ActionKind::Type,
            selector: selector.into(),
            text: Some(text.into()),
            option_text: None,
            file_path: None,
        }
    }

    #[tokio::test]
    async fn a_failing_action_does_not_stop_the_batch() {
        let driver = MockDriver::new();
        driver.fail_selector("#broken");

        let actions = vec![click("#broken"), type_into("#name", "Ada")];
        let report = perform_all(&driver, &actions, Duration::ZERO).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.executed, 1);
        assert!(driver.calls().iter().any(|c| c.contains("fill css:#name")));
    }

    #[tokio::test]
    async fn success_marker_short_circuits_the_batch() {
        let driver = MockDriver::new();
        // visible before the second action
        driver.script_marker(vec![false, true]);

        let actions = vec![click("#first"), click("#second"), click("#third")];
        let report = perform_all(&driver, &actions, Duration::ZERO).await;

        assert!(report.success_marker_seen);
        assert_eq!(report.executed, 1);
        let calls = driver.calls();
        assert!(calls.iter().any(|c| c.contains("#first")));
        assert!(!calls.iter().any(|c| c.contains("#second")));
    }

    #[tokio::test]
    async fn check_only_clicks_unchecked_boxes() {
        let driver = MockDriver::new();
        driver.set_checked("#agree", true);

        let mut already = click("#agree");
        already.kind = ActionKind::Check;
        let mut fresh = click("#subscribe");
        fresh.kind = ActionKind::Check;

        perform_all(&driver, &[already, fresh], Duration::ZERO).await;

        let calls = driver.calls();
        assert!(!calls.iter().any(|c| c.starts_with("click") && c.contains("#agree")));
        assert!(calls.iter().any(|c| c.starts_with("click") && c.contains("#subscribe")));
    }

    #[tokio::test]
    async fn dynamic_select_walks_the_suggestion_list() {
        let driver = MockDriver::new();
        let action = Action {
            kind: ActionKind::DynamicSelect,
            selector: "//input[@placeholder='Country']".into(),
            text: None,
            option_text: Some("Norway".into()),
            file_path: None,
        };

        let report = perform_all(&driver, &[action], Duration::ZERO).await;
        assert_eq!(report.executed, 1);

        let calls = driver.calls();
        let click_idx = calls.iter().position(|c| c.starts_with("click")).unwrap();
        let fill_idx = calls.iter().position(|c| c.starts_with("fill")).unwrap();
        let keys_idx = calls
            .iter()
            .position(|c| c.starts_with("press ArrowDown+Enter"))
            .unwrap();
        assert!(click_idx < fill_idx && fill_idx < keys_idx);
    }

    #[tokio::test]
    async fn missing_payload_counts_as_a_failed_action() {
        let driver = MockDriver::new();
        let mut bad = click("#email");
        bad.kind = ActionKind::Type; // no text payload

        let report = perform_all(&driver, &[bad], Duration::ZERO).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.executed, 0);
    }
}
