//! One module per subcommand. Every command prints through [`Context::out`].

pub mod build;
pub mod diagnose;
pub mod failed;
pub mod latest;
pub mod monitor;
pub mod open;
pub mod push;
pub mod stage_log;
pub mod stages;
pub mod status;
pub mod timing;

#[cfg(test)]
mod tests;

use log::{debug, trace};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ProductsConfig, Settings};
use crate::error::{JenkinsError, Result};
use crate::jenkins::{summarize, Job, JenkinsClient, WorkflowRun};
use crate::monitor::{monitor_args, ProcessLauncher, DEFAULT_MONITOR_INTERVAL};
use crate::output::{info, result_badge, Render, Spinner};
use crate::queue::{queue_location, wait_for_build_number, DEFAULT_POLL_INTERVAL};
use crate::stages::{fetch_tree, StageSource, StageVisit, Strategy};

/// Everything a command needs, built once from the resolved settings.
pub struct Context {
    pub client: JenkinsClient,
    pub products: ProductsConfig,
    pub deployment_domain: String,
    pub out: Box<dyn Render>,
    pub launcher: Box<dyn ProcessLauncher>,
    /// Number of `-v` flags, handed on to re-executed children
    pub verbosity: u8,
    pub poll_interval: Duration,
    pub monitor_interval: Duration,
    pub strategy: Strategy,
    /// Config file given with `--config`, passed on to re-executed children
    pub config_path: Option<PathBuf>,
    /// Whether `stages` may take over the terminal
    pub interactive: bool,
}

impl Context {
    pub fn new(
        settings: &Settings,
        out: Box<dyn Render>,
        launcher: Box<dyn ProcessLauncher>,
        verbosity: u8,
    ) -> Result<Self> {
        Ok(Self {
            client: JenkinsClient::new(settings)?,
            products: settings.products.clone(),
            deployment_domain: settings.deployment_domain.clone(),
            out,
            launcher,
            verbosity,
            poll_interval: DEFAULT_POLL_INTERVAL,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            strategy: Strategy::default(),
            config_path: None,
            interactive: false,
        })
    }

    pub fn pipeline(&self) -> &str {
        self.client.pipeline()
    }

    /// Trigger `job` and return the queue location from the response.
    pub async fn trigger(&self, job: &str, params: &[(&str, &str)]) -> Result<String> {
        let response = self.client.trigger_build(job, params).await?;
        let url = response.url().to_string();
        let status = response.status();
        let location = queue_location(&response);

        let body = response.text().await?;
        trace!("Response body [{body}]");
        if !status.is_success() {
            return Err(JenkinsError::Api {
                url,
                status: status.as_u16(),
                message: summarize(&body),
            });
        }
        location
    }

    /// Poll a queue location until the build it turns into has a number.
    pub async fn wait_for_build(&self, location: &str) -> Result<u64> {
        let spinner = Spinner::start("Waiting for an executor");
        let number = wait_for_build_number(&self.client, location, self.poll_interval).await;
        match &number {
            Ok(number) => spinner.finish(&format!("Build #{number} started")),
            Err(_) => spinner.clear(),
        }
        number
    }

    /// Hand monitoring of `build_ids` to a child process and wait for it.
    pub async fn spawn_monitor(&self, pipeline: &str, build_ids: &[String]) -> Result<()> {
        let args = monitor_args(
            pipeline,
            build_ids,
            self.verbosity,
            self.config_path.as_deref(),
        );
        debug!("Spawning monitor with args [{args:?}]");
        self.launcher.run_self(&args).await
    }

    /// A build's run description with every stage hydrated.
    pub async fn stage_tree(&self, build_id: &str) -> Result<(Job, Vec<StageVisit>)> {
        let job = self.client.job_details(build_id).await?;
        let spinner = Spinner::start("Fetching stages");
        let source: Arc<dyn StageSource> = Arc::new(self.client.clone());
        let visits = fetch_tree(source, &job.stages, self.strategy).await;
        spinner.clear();
        Ok((job, visits))
    }
}

/// `origin/<branch>`, unless the prefix is already there.
pub fn origin_branch(branch: &str) -> String {
    if branch.starts_with("origin/") {
        branch.to_string()
    } else {
        format!("origin/{branch}")
    }
}

/// `<id>: The <what> for [<name>] on branch [<pipeline>] is [<result>]`
pub fn build_status_line(run: &WorkflowRun, what: &str, pipeline: &str) -> String {
    format!(
        "{}: The {what} for [{}] on branch [{}] is [{}]",
        info(&run.id),
        info(&run.display_name),
        info(pipeline),
        result_badge(run.result_label())
    )
}
