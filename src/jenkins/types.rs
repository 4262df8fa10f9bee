use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Execution status shared by runs and stages.
///
/// Statuses this client does not distinguish (e.g. `UNSTABLE`, `PAUSED_PENDING_INPUT`)
/// decode as [`Status::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Failed,
    Aborted,
    InProgress,
    NotExecuted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
            Self::InProgress => "IN_PROGRESS",
            Self::NotExecuted => "NOT_EXECUTED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// FAILED or ABORTED.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
}

/// Navigation links attached to runs and stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default)]
    pub self_link: Option<Link>,
    #[serde(default)]
    pub log: Option<Link>,
}

impl Links {
    pub fn self_href(&self) -> Option<&str> {
        self.self_link
            .as_ref()
            .map(|link| link.href.as_str())
            .filter(|href| !href.is_empty())
    }

    pub fn log_href(&self) -> Option<&str> {
        self.log
            .as_ref()
            .map(|link| link.href.as_str())
            .filter(|href| !href.is_empty())
    }
}

/// One pipeline step.
///
/// `children` is only populated by a detail fetch through the stage's self link;
/// stages embedded in a run description are shallow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(rename = "_links", default)]
    pub links: Links,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(
        rename = "startTimeMillis",
        default,
        with = "chrono::serde::ts_milliseconds"
    )]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "durationMillis", default)]
    pub duration_millis: u64,
    #[serde(rename = "pauseDurationMillis", default)]
    pub pause_duration_millis: u64,
    #[serde(rename = "execNode", default)]
    pub exec_node: String,
    #[serde(rename = "parentNodes", default)]
    pub parent_node_ids: Vec<String>,
    #[serde(rename = "stageFlowNodes", default)]
    pub children: Vec<Stage>,
}

impl Stage {
    pub fn has_failed_child(&self) -> bool {
        self.children.iter().any(|child| child.status.is_failure())
    }
}

/// A run as described by the pipeline (`wfapi`) endpoints, carrying the stage list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_links", default)]
    pub links: Links,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(
        rename = "startTimeMillis",
        default,
        with = "chrono::serde::ts_milliseconds"
    )]
    pub start_time: DateTime<Utc>,
    #[serde(
        rename = "endTimeMillis",
        default,
        with = "chrono::serde::ts_milliseconds"
    )]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "durationMillis", default)]
    pub duration_millis: u64,
    #[serde(rename = "queueDurationMillis", default)]
    pub queue_duration_millis: u64,
    #[serde(rename = "pauseDurationMillis", default)]
    pub pause_duration_millis: u64,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// Build metadata from the classic `api/json` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    #[serde(rename = "_class", default)]
    pub class: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub full_display_name: String,
    /// `None` until the build finishes
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub duration: u64,
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub actions: Vec<WorkflowAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAction {
    #[serde(rename = "_class", default)]
    pub class: String,
    #[serde(default)]
    pub parameters: Vec<WorkflowParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowParameter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl WorkflowParameter {
    fn value_is(&self, expected: &str) -> bool {
        self.value.as_str() == Some(expected)
    }
}

pub const PRODUCT_PARAM: &str = "PRODUCT";
pub const BRANCH_PARAM: &str = "TRYMAX_BRANCH";

impl WorkflowRun {
    /// All trigger parameters across actions, in response order.
    pub fn parameters(&self) -> impl Iterator<Item = &WorkflowParameter> {
        self.actions.iter().flat_map(|action| action.parameters.iter())
    }

    /// First parameter named `name`.
    pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
        self.parameters()
            .find(|param| param.name == name)
            .map(|param| &param.value)
    }

    /// True when one parameter action carries both the product and the branch.
    pub fn matches_product_branch(&self, product: &str, branch: &str) -> bool {
        self.actions.iter().any(|action| {
            let find = |name: &str| action.parameters.iter().find(|p| p.name == name);
            match (find(PRODUCT_PARAM), find(BRANCH_PARAM)) {
                (Some(p), Some(b)) => p.value_is(product) && b.value_is(branch),
                _ => false,
            }
        })
    }

    pub fn result_label(&self) -> &str {
        match self.result.as_deref() {
            Some(result) => result,
            None if self.building => "BUILDING",
            None => "UNKNOWN",
        }
    }
}

/// Build list returned by `job/{pipeline}/api/json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowJob {
    #[serde(rename = "_class", default)]
    pub class: String,
    #[serde(default)]
    pub builds: Vec<WorkflowRun>,
}

/// Console output of a single stage node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageLog {
    #[serde(rename = "nodeId", default)]
    pub id: String,
    #[serde(rename = "nodeStatus", default)]
    pub status: Status,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub console_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Executable {
    #[serde(rename = "_class", default)]
    pub class: String,
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
}

/// A triggered build waiting for an executor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueueItem {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Present once the build has started
    #[serde(default)]
    pub executable: Option<Executable>,
}

impl QueueItem {
    pub fn build_number(&self) -> Option<u64> {
        self.executable.as_ref().map(|exec| exec.number)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        None => String::new(),
    })
}
