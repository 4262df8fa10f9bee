//! Stage tree traversal.
//!
//! A run description only lists its top-level stages, and each of those only lists its
//! direct children once fetched through its self link. [`fetch_tree`] hydrates the whole
//! tree and [`select`] picks the stages worth reporting.

mod classify;
mod fetch;

use async_trait::async_trait;

use crate::error::Result;
use crate::jenkins::{JenkinsClient, Stage};

pub use classify::{select, Selection};
pub use fetch::{fetch_tree, find_stage, Strategy};

/// Where full stage details come from.
#[async_trait]
pub trait StageSource: Send + Sync {
    /// Fetch a stage's full detail from its self link.
    async fn fetch_stage(&self, self_href: &str) -> Result<Stage>;
}

#[async_trait]
impl StageSource for JenkinsClient {
    async fn fetch_stage(&self, self_href: &str) -> Result<Stage> {
        self.stage(self_href).await
    }
}

/// A hydrated stage and where it sits in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct StageVisit {
    pub stage: Stage,
    /// Ancestor names, root first, excluding the stage itself
    pub path: Vec<String>,
    /// Child indices from the root, used to restore pre-order
    pub position: Vec<usize>,
}

impl StageVisit {
    pub fn is_leaf(&self) -> bool {
        self.stage.children.is_empty()
    }

    /// `Parent > Child > Stage`
    pub fn full_path(&self) -> String {
        self.path
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.stage.name.as_str()))
            .collect::<Vec<_>>()
            .join(" > ")
    }
}
