use futures::future::{join_all, BoxFuture, FutureExt};
use log::{debug, trace, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::jenkins::Stage;

use super::{StageSource, StageVisit};

pub const DEFAULT_WORKERS: usize = 10;

/// Children below this many levels are not fetched.
pub const MAX_STAGE_DEPTH: usize = 32;

/// How the stage tree is walked.
///
/// Both strategies return the same visits in the same (pre-order) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Concurrent { workers: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Concurrent {
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone)]
struct FetchJob {
    stage: Stage,
    path: Vec<String>,
    position: Vec<usize>,
}

/// Hydrate every stage reachable from `roots`.
///
/// A branch whose detail fetch fails is logged and left out together with its subtree;
/// siblings are unaffected.
pub async fn fetch_tree(
    source: Arc<dyn StageSource>,
    roots: &[Stage],
    strategy: Strategy,
) -> Vec<StageVisit> {
    let jobs: Vec<FetchJob> = roots
        .iter()
        .enumerate()
        .map(|(index, stage)| FetchJob {
            stage: stage.clone(),
            path: Vec::new(),
            position: vec![index],
        })
        .collect();

    let mut visits = match strategy {
        Strategy::Sequential => {
            let mut visits = Vec::new();
            for job in jobs {
                visits.extend(walk(source.as_ref(), job).await);
            }
            visits
        }
        Strategy::Concurrent { workers } => fetch_concurrent(source, jobs, workers).await,
    };

    visits.sort_by(|a, b| a.position.cmp(&b.position));
    debug!("Fetched {} stages", visits.len());
    visits
}

fn walk(source: &dyn StageSource, job: FetchJob) -> BoxFuture<'_, Vec<StageVisit>> {
    async move {
        let Some(visit) = hydrate(source, job).await else {
            return Vec::new();
        };
        let children = child_jobs(&visit);
        let mut visits = vec![visit];
        for child in children {
            visits.extend(walk(source, child).await);
        }
        visits
    }
    .boxed()
}

async fn fetch_concurrent(
    source: Arc<dyn StageSource>,
    roots: Vec<FetchJob>,
    workers: usize,
) -> Vec<StageVisit> {
    let (job_tx, job_rx) = mpsc::unbounded_channel::<FetchJob>();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<Option<StageVisit>>();
    let job_rx = Arc::new(Mutex::new(job_rx));

    let mut expected = roots.len();
    for job in roots {
        let _ = job_tx.send(job);
    }

    let handles: Vec<_> = (0..workers.max(1))
        .map(|worker| {
            let source = Arc::clone(&source);
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            tokio::spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(job) = next else {
                        break;
                    };
                    trace!("worker {worker} fetching stage {}", job.stage.id);
                    if results.send(hydrate(source.as_ref(), job).await).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(result_tx);

    let mut processed = 0;
    let mut visits = Vec::new();
    while processed < expected {
        let Some(result) = result_rx.recv().await else {
            break;
        };
        processed += 1;
        if let Some(visit) = result {
            let children = child_jobs(&visit);
            expected += children.len();
            for child in children {
                let _ = job_tx.send(child);
            }
            visits.push(visit);
        }
    }

    // Closing the queue lets idle workers exit.
    drop(job_tx);
    for outcome in join_all(handles).await {
        if let Err(e) = outcome {
            warn!("Stage fetch worker stopped unexpectedly: {e}");
        }
    }

    visits
}

async fn hydrate(source: &dyn StageSource, job: FetchJob) -> Option<StageVisit> {
    let href = job.stage.links.self_href().map(str::to_string);
    let stage = match href {
        Some(href) => match source.fetch_stage(&href).await {
            Ok(stage) => stage,
            Err(e) => {
                warn!(
                    "Skipping stage '{}' ({}): {e}",
                    job.stage.name, job.stage.id
                );
                return None;
            }
        },
        None => {
            debug!("Stage {} has no self link, using summary", job.stage.id);
            job.stage
        }
    };

    Some(StageVisit {
        stage,
        path: job.path,
        position: job.position,
    })
}

fn child_jobs(visit: &StageVisit) -> Vec<FetchJob> {
    if visit.stage.children.is_empty() {
        return Vec::new();
    }
    if visit.position.len() >= MAX_STAGE_DEPTH {
        warn!(
            "Not descending into '{}': stage tree deeper than {MAX_STAGE_DEPTH} levels",
            visit.full_path()
        );
        return Vec::new();
    }

    let mut path = visit.path.clone();
    path.push(visit.stage.name.clone());

    visit
        .stage
        .children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let mut position = visit.position.clone();
            position.push(index);
            FetchJob {
                stage: child.clone(),
                path: path.clone(),
                position,
            }
        })
        .collect()
}

/// Depth-first search for stage `id`, hydrating stages along the way.
pub async fn find_stage(source: &dyn StageSource, stages: &[Stage], id: &str) -> Option<Stage> {
    search(source, stages.to_vec(), id, 1).await
}

fn search<'a>(
    source: &'a dyn StageSource,
    stages: Vec<Stage>,
    id: &'a str,
    depth: usize,
) -> BoxFuture<'a, Option<Stage>> {
    async move {
        for shallow in stages {
            let job = FetchJob {
                stage: shallow,
                path: Vec::new(),
                position: Vec::new(),
            };
            let Some(visit) = hydrate(source, job).await else {
                continue;
            };
            if visit.stage.id == id {
                return Some(visit.stage);
            }
            if depth < MAX_STAGE_DEPTH && !visit.stage.children.is_empty() {
                if let Some(found) = search(source, visit.stage.children, id, depth + 1).await {
                    return Some(found);
                }
            }
        }
        None
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jenkins::Status;
    use crate::stages::testing::{sample_tree, shallow, FakeSource};

    fn ids(visits: &[StageVisit]) -> Vec<&str> {
        visits.iter().map(|v| v.stage.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_sequential_walk_is_pre_order() {
        let (roots, source) = sample_tree();
        let visits = fetch_tree(Arc::new(source), &roots, Strategy::Sequential).await;

        assert_eq!(ids(&visits), vec!["1", "2", "3", "4", "5", "8", "9"]);
        let integration = visits.iter().find(|v| v.stage.id == "5").unwrap();
        assert_eq!(integration.path, vec!["Build", "Tests"]);
        assert_eq!(integration.position, vec![0, 1, 1]);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let (roots, source) = sample_tree();
        let source: Arc<dyn StageSource> = Arc::new(source);

        let sequential = fetch_tree(Arc::clone(&source), &roots, Strategy::Sequential).await;
        let concurrent = fetch_tree(Arc::clone(&source), &roots, Strategy::default()).await;
        let single = fetch_tree(source, &roots, Strategy::Concurrent { workers: 1 }).await;

        assert_eq!(sequential, concurrent, "concurrent walk should equal sequential");
        assert_eq!(sequential, single, "one worker should still drain the tree");
    }

    #[tokio::test]
    async fn test_hydrated_composites_carry_children() {
        let (roots, source) = sample_tree();
        let visits = fetch_tree(Arc::new(source), &roots, Strategy::default()).await;

        let leaves: Vec<&str> = visits
            .iter()
            .filter(|v| v.is_leaf())
            .map(|v| v.stage.id.as_str())
            .collect();
        assert_eq!(leaves, vec!["2", "4", "5", "8", "9"]);
    }

    #[tokio::test]
    async fn test_failing_branch_is_skipped_not_fatal() {
        let (roots, source) = sample_tree();
        let source = Arc::new(source.failing("3"));

        for strategy in [Strategy::Sequential, Strategy::default()] {
            let visits = fetch_tree(source.clone(), &roots, strategy).await;
            assert_eq!(
                ids(&visits),
                vec!["1", "2", "8", "9"],
                "subtree of failed stage should be absent ({strategy:?})"
            );
        }
    }

    #[tokio::test]
    async fn test_stage_without_self_link_is_used_as_is() {
        let mut orphan = shallow("7", "Orphan", Status::Failed);
        orphan.links.self_link = None;
        let source = Arc::new(FakeSource::default());

        let visits = fetch_tree(source.clone(), &[orphan], Strategy::default()).await;

        assert_eq!(ids(&visits), vec!["7"]);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_depth_is_capped() {
        let mut source = FakeSource::default();
        for level in 0..40 {
            let id = level.to_string();
            let child = shallow(&(level + 1).to_string(), "nested", Status::Success);
            source = source.with_detail(&id, "nested", Status::Success, vec![child]);
        }
        let roots = vec![shallow("0", "nested", Status::Success)];
        let source = Arc::new(source);

        let sequential = fetch_tree(source.clone(), &roots, Strategy::Sequential).await;
        let concurrent = fetch_tree(source, &roots, Strategy::default()).await;

        assert_eq!(sequential.len(), MAX_STAGE_DEPTH);
        assert_eq!(concurrent.len(), MAX_STAGE_DEPTH);
    }

    #[tokio::test]
    async fn test_empty_roots_yield_nothing() {
        let source = Arc::new(FakeSource::default());
        assert!(fetch_tree(source.clone(), &[], Strategy::default()).await.is_empty());
        assert!(fetch_tree(source, &[], Strategy::Sequential).await.is_empty());
    }

    #[tokio::test]
    async fn test_find_stage_searches_depth_first() {
        let (roots, source) = sample_tree();

        let found = find_stage(&source, &roots, "5").await.unwrap();
        assert_eq!(found.name, "integration");

        let composite = find_stage(&source, &roots, "3").await.unwrap();
        assert_eq!(composite.children.len(), 2, "found stage should be hydrated");

        assert!(find_stage(&source, &roots, "99").await.is_none());
    }

    #[tokio::test]
    async fn test_find_stage_skips_unreachable_branches() {
        let (roots, source) = sample_tree();
        let source = source.failing("1");

        assert!(find_stage(&source, &roots, "5").await.is_none());
        assert_eq!(find_stage(&source, &roots, "9").await.unwrap().name, "Lint");
    }
}
