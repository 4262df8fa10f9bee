mod client;
mod types;

pub use client::{decode, summarize, JenkinsClient};
pub use types::{Job, QueueItem, Stage, StageLog, Status, WorkflowRun, BRANCH_PARAM, PRODUCT_PARAM};

#[cfg(test)]
pub(crate) use client::tests::{client_for, settings_for};
#[cfg(test)]
pub(crate) use types::Link;
