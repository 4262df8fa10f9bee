use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JenkinsError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error for {field}='{value}': {message}")]
    Validation {
        field: String,
        value: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("API error [{url}] (status {status}): {message}")]
    Api {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Build {build_id} not found in pipeline {pipeline}")]
    BuildNotFound { build_id: String, pipeline: String },

    #[error("Stage {stage_id} not found in build {build_id}")]
    StageNotFound { stage_id: String, build_id: String },

    #[error("No build found for product {product} on branch {branch}")]
    NoMatchingBuild { product: String, branch: String },

    #[error("No matching, successful jobs found")]
    NoTimingData,

    #[error("No queue location in response")]
    MissingQueueLocation,

    #[error("Queue item {0} has not started a build yet")]
    QueuePending(String),

    #[error("No log available for stage {stage_id}")]
    MissingLog { stage_id: String },

    #[error("Failed to read console output: {0}")]
    ConsoleMarkup(String),

    #[error("Failed to spawn command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} exited with {status}")]
    ChildFailed { command: String, status: ExitStatus },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JenkinsError {
    /// Builds an [`JenkinsError::Auth`] carrying a hint on where credentials come from.
    pub fn auth(message: &str) -> Self {
        Self::Auth(format!(
            "{message}\n\nPlease ensure you have set the following environment variables:\n  \
             JENKINS_HOST - Your Jenkins server URL\n  \
             JENKINS_USER - Your Jenkins username\n  \
             JENKINS_KEY  - Your Jenkins API key\n\n\
             Or configure them in ~/.jenkins.yaml"
        ))
    }

    pub fn validation(field: &str, value: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JenkinsError>;
