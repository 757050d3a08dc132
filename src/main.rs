// Unattended job-application session driver.
//
// Loads job links and candidate memory, launches one browser session, then
// walks every link through the observe/plan/act loop until each reaches a
// terminal outcome. Results accumulate in a per-run CSV under the output
// directory.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autoapply::inputs::{load_candidate_memory_or_empty, load_job_links_or_empty};
use autoapply::planner::GeminiPlanner;
use autoapply::recorder::CsvRecorder;
use autoapply::scribe::FileScribe;
use autoapply::{launch_browser, load_yaml_config, CdpDriver, SessionRunner};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_yaml_config().context("Failed to load config.yaml")?;

    let links = load_job_links_or_empty(&config.paths.job_links);
    let memory = load_candidate_memory_or_empty(&config.paths.candidate_memory);
    if links.is_empty() {
        warn!("no job links to process, nothing to do");
        return Ok(());
    }

    let planner = Arc::new(
        GeminiPlanner::new(
            config.planner.clone(),
            config.paths.resume.display().to_string(),
        )
        .context("Failed to construct planner")?,
    );
    let recorder = Arc::new(
        CsvRecorder::new(&config.paths.output_dir).context("Failed to open results file")?,
    );
    info!(path = %recorder.path().display(), "recording results");
    let scribe = Arc::new(FileScribe::new(&config.paths.output_dir));

    let wrapper = launch_browser(&config.browser)
        .await
        .context("Failed to launch browser")?;
    let driver = Arc::new(CdpDriver::new(wrapper));

    let runner = SessionRunner::new(
        driver.clone(),
        planner,
        recorder,
        scribe,
        memory,
        config.session.clone(),
    );
    runner.run(&links).await;
    drop(runner);

    match Arc::try_unwrap(driver) {
        Ok(driver) => driver.shutdown().await.context("Browser shutdown failed")?,
        Err(_) => warn!("browser still referenced at shutdown, leaving it to the OS"),
    }

    info!("all job links processed and browser closed");
    Ok(())
}
