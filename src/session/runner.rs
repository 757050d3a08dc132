//! The per-link control loop.
//!
//! Each job link runs the same cycle: navigate, observe, plan, evaluate,
//! act, until a terminal outcome is reached. A fault anywhere inside one
//! link is caught at the link boundary and recorded as a failure; the run
//! always continues to the next link. Tab cleanup happens on every exit
//! path so the shared browser returns to a single-tab state between links.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::browser::{DriverError, PageDriver};
use crate::planner::{PlanRequest, Planner, PlanStatus};
use crate::recorder::ResultRecorder;
use crate::scribe::DocumentGenerator;
use crate::session::{
    fingerprint, perform_all, signature, JobContext, Outcome, OutcomeStatus, StagnationDetector,
};
use crate::SessionConfig;

pub struct SessionRunner<D: PageDriver> {
    driver: Arc<D>,
    planner: Arc<dyn Planner>,
    recorder: Arc<dyn ResultRecorder>,
    scribe: Arc<dyn DocumentGenerator>,
    memory: Map<String, Value>,
    config: SessionConfig,
}

impl<D: PageDriver> SessionRunner<D> {
    pub fn new(
        driver: Arc<D>,
        planner: Arc<dyn Planner>,
        recorder: Arc<dyn ResultRecorder>,
        scribe: Arc<dyn DocumentGenerator>,
        memory: Map<String, Value>,
        config: SessionConfig,
    ) -> Self {
        Self {
            driver,
            planner,
            recorder,
            scribe,
            memory,
            config,
        }
    }

    /// Process every link in order. Individual link outcomes are recorded as
    /// they terminate; no link can abort the run.
    pub async fn run(&self, links: &[String]) {
        info!(total = links.len(), "starting application session");
        let mut succeeded = 0usize;
        for (index, link) in links.iter().enumerate() {
            info!(n = index + 1, total = links.len(), link = %link, "processing link");
            let outcome = self.run_link(link).await;
            if outcome.status == OutcomeStatus::Success {
                succeeded += 1;
            }
        }
        info!(succeeded, total = links.len(), "session finished");
    }

    /// One link, start to terminal outcome. Faults are converted to Failed
    /// here; tab cleanup and recording are unconditional.
    async fn run_link(&self, link: &str) -> Outcome {
        let mut context = JobContext::new();

        let outcome = match self.process_link(link, &mut context).await {
            Ok(outcome) => outcome,
            Err(fault) => {
                warn!(link = %link, error = %fault, "link processing faulted");
                Outcome {
                    link: link.to_string(),
                    status: OutcomeStatus::Failed,
                    reason: Some(fault.to_string()),
                    summary: context,
                }
            }
        };

        if let Err(e) = self.driver.reset_tabs().await {
            warn!(error = %e, "tab cleanup failed");
        }

        info!(
            link = %outcome.link,
            status = outcome.status.as_str(),
            reason = outcome.reason.as_deref().unwrap_or(""),
            "link terminated"
        );
        if let Err(e) = self.recorder.record(&outcome).await {
            warn!(error = %e, "failed to record outcome");
        }

        outcome
    }

    async fn process_link(
        &self,
        link: &str,
        context: &mut JobContext,
    ) -> Result<Outcome, DriverError> {
        self.driver.navigate(link).await?;
        self.settle(self.config.settle_after_navigation_ms).await;

        let mut detector = StagnationDetector::new();

        for round in 1..=self.config.max_rounds_per_link {
            let observation = self.driver.observe().await?;
            let sig = signature(&observation.address, &observation.title);
            debug!(round, signature = %sig, "observed page");

            let plan = match self
                .planner
                .next_plan(PlanRequest {
                    markup: &observation.content,
                    memory: &self.memory,
                    context,
                })
                .await
            {
                Ok(plan) => plan,
                Err(e) => {
                    warn!(round, error = %e, "planner produced no usable plan");
                    return Ok(self.terminate(
                        link,
                        OutcomeStatus::Failed,
                        Some("no usable plan".into()),
                        context,
                    ));
                }
            };

            context.merge(&plan.job_summary);

            if let Some(text) = plan.cover_letter_text.as_deref() {
                match self.scribe.generate(text).await {
                    Ok(path) => info!(path = %path.display(), "cover letter generated"),
                    Err(e) => warn!(error = %e, "cover letter generation failed, continuing"),
                }
            }

            match plan.status {
                PlanStatus::Success => {
                    return Ok(self.terminate(link, OutcomeStatus::Success, None, context));
                }
                PlanStatus::Failed => {
                    return Ok(self.terminate(
                        link,
                        OutcomeStatus::Failed,
                        plan.reason.clone(),
                        context,
                    ));
                }
                PlanStatus::HumanInterventionRequired => {
                    return Ok(self.terminate(
                        link,
                        OutcomeStatus::HumanIntervention,
                        plan.reason.clone(),
                        context,
                    ));
                }
                PlanStatus::ActionRequired | PlanStatus::Unknown => {}
            }

            let progress = detector.observe(&sig);
            if progress.attempt >= self.config.stagnation_bound {
                warn!(round, attempt = progress.attempt, "page stopped progressing");
                return Ok(self.terminate(
                    link,
                    OutcomeStatus::Failed,
                    Some(format!(
                        "no page progress after {} rounds",
                        progress.attempt
                    )),
                    context,
                ));
            }

            if plan.status == PlanStatus::ActionRequired && !plan.actions.is_empty() {
                detector.note_fingerprint(fingerprint(&plan.actions));

                let report = perform_all(
                    &*self.driver,
                    &plan.actions,
                    Duration::from_millis(self.config.suggestion_settle_ms),
                )
                .await;
                debug!(
                    executed = report.executed,
                    failed = report.failed,
                    confirmed = report.success_marker_seen,
                    "action batch finished"
                );

                // Forms that open their next step in a new tab leave the
                // original tab focused on stale content.
                if self.driver.tab_count().await.unwrap_or(1) > 1 {
                    self.driver.focus_latest_tab().await?;
                }

                self.settle(self.config.settle_after_actions_ms).await;
                continue;
            }

            return Ok(self.terminate(
                link,
                OutcomeStatus::Failed,
                Some("plan offered no way forward".into()),
                context,
            ));
        }

        warn!(
            link = %link,
            rounds = self.config.max_rounds_per_link,
            "round ceiling reached"
        );
        Ok(self.terminate(
            link,
            OutcomeStatus::Failed,
            Some("round ceiling reached".into()),
            context,
        ))
    }

    fn terminate(
        &self,
        link: &str,
        status: OutcomeStatus,
        reason: Option<String>,
        context: &JobContext,
    ) -> Outcome {
        Outcome {
            link: link.to_string(),
            status,
            reason,
            summary: context.clone(),
        }
    }

    async fn settle(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}
