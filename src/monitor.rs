//! Waiting for builds to finish.
//!
//! The foreground command hands the wait to a copy of this program started through a
//! [`ProcessLauncher`] with the hidden `--bg` flag; that child runs [`MonitorLoop`].

use async_trait::async_trait;
use indexmap::IndexSet;
use log::{debug, trace};
use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{self, MissedTickBehavior};

use crate::error::{JenkinsError, Result};
use crate::jenkins::{JenkinsClient, WorkflowRun};

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);

/// Set in the environment of a re-executed child.
pub const CHILD_ENV: &str = "__IS_CHILD";

#[async_trait]
pub trait BuildSource: Send + Sync {
    async fn build_info(&self, build_id: &str) -> Result<WorkflowRun>;
}

#[async_trait]
impl BuildSource for JenkinsClient {
    async fn build_info(&self, build_id: &str) -> Result<WorkflowRun> {
        JenkinsClient::build_info(self, build_id).await
    }
}

/// Polls a set of builds until every one of them has stopped building.
///
/// Each build is reported exactly once, on the first tick that sees it finished. Builds
/// already reported are not fetched again. The first tick fires immediately.
pub struct MonitorLoop<'a> {
    source: &'a dyn BuildSource,
    build_ids: IndexSet<String>,
    interval: Duration,
}

impl<'a> MonitorLoop<'a> {
    pub fn new(source: &'a dyn BuildSource, build_ids: &[String], interval: Duration) -> Self {
        Self {
            source,
            build_ids: build_ids.iter().cloned().collect(),
            interval,
        }
    }

    /// Run until all builds finished. The first fetch error ends the loop.
    pub async fn run<F>(&self, mut on_finished: F) -> Result<()>
    where
        F: FnMut(&WorkflowRun) + Send,
    {
        let mut finished: HashSet<&str> = HashSet::with_capacity(self.build_ids.len());
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            for build_id in &self.build_ids {
                if finished.contains(build_id.as_str()) {
                    continue;
                }
                let build = self.source.build_info(build_id).await?;
                trace!("build [{}] is building? [{}]", build_id, build.building);
                if !build.building {
                    on_finished(&build);
                    finished.insert(build_id.as_str());
                }
            }

            trace!("Looping [{}] == [{}]", finished.len(), self.build_ids.len());
            if finished.len() == self.build_ids.len() {
                return Ok(());
            }
        }
    }
}

/// Arguments that make a copy of this program run the monitor loop in the foreground.
///
/// `config` is the file the parent was pointed at with `--config`, if any.
pub fn monitor_args(
    pipeline: &str,
    build_ids: &[String],
    verbosity: u8,
    config: Option<&Path>,
) -> Vec<String> {
    let mut args = vec![
        "monitor".to_string(),
        "--bg".to_string(),
        "--pipeline".to_string(),
        pipeline.to_string(),
    ];
    if let Some(config) = config {
        args.push("--config".to_string());
        args.push(config.display().to_string());
    }
    for build_id in build_ids {
        args.push("-b".to_string());
        args.push(build_id.clone());
    }
    args.extend(std::iter::repeat("-v".to_string()).take(usize::from(verbosity)));
    args
}

/// Child processes the commands start.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run a copy of this program with `args` and wait for it.
    async fn run_self(&self, args: &[String]) -> Result<()>;

    /// Hand `url` to the desktop's opener.
    async fn open_url(&self, url: &str) -> Result<()>;
}

/// Launches real processes with inherited stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct OsLauncher {
    env: Vec<(String, String)>,
}

impl OsLauncher {
    /// Extra environment for the child, on top of the inherited one.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    async fn wait(&self, mut command: Command, display: String) -> Result<()> {
        debug!("spawning command [{display}]");
        let mut child = command
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(CHILD_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| JenkinsError::Spawn {
                command: display.clone(),
                source,
            })?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(JenkinsError::ChildFailed {
                command: display,
                status,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessLauncher for OsLauncher {
    async fn run_self(&self, args: &[String]) -> Result<()> {
        let exe = std::env::current_exe()?;
        let display = format!("{} {}", exe.display(), args.join(" "));
        let mut command = Command::new(&exe);
        command.args(args);
        self.wait(command, display).await
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        let (program, leading): (&str, &[&str]) = if cfg!(target_os = "windows") {
            ("cmd", &["/C", "start", ""])
        } else if cfg!(target_os = "macos") {
            ("open", &[])
        } else {
            ("xdg-open", &[])
        };
        let mut command = Command::new(program);
        command.args(leading).arg(url);
        self.wait(command, format!("{program} {url}")).await
    }
}
