use indexmap::IndexMap;
use log::{debug, trace};

use crate::jenkins::{Job, Status};

/// Arithmetic mean; `0.0` for no samples.
pub fn average(samples: &[u64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&v| v as f64).sum::<f64>() / samples.len() as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub name: String,
    pub avg_millis: f64,
    pub min_millis: u64,
    pub max_millis: u64,
    pub samples: usize,
}

impl StageTiming {
    fn from_samples(name: String, durations: &[u64]) -> Self {
        Self {
            avg_millis: average(durations),
            min_millis: durations.iter().copied().min().unwrap_or(0),
            max_millis: durations.iter().copied().max().unwrap_or(0),
            samples: durations.len(),
            name,
        }
    }
}

/// Top-level stage durations across successful runs, slowest average first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingSummary {
    pub stages: Vec<StageTiming>,
    pub successful_jobs: usize,
}

/// Group stage durations of SUCCESS runs by stage name.
///
/// With `filters`, only stages whose name contains one of them (case-insensitively) count.
pub fn summarize_timing(jobs: &[Job], filters: &[String]) -> TimingSummary {
    let filters: Vec<String> = filters.iter().map(|f| f.to_lowercase()).collect();
    let mut durations: IndexMap<&str, Vec<u64>> = IndexMap::new();
    let mut successful_jobs = 0;

    for job in jobs {
        if job.status != Status::Success {
            debug!("Job has a status other than SUCCESS [{}][{}]", job.id, job.status);
            continue;
        }
        successful_jobs += 1;

        for stage in &job.stages {
            let name = stage.name.to_lowercase();
            if !filters.is_empty() && !filters.iter().any(|f| name.contains(f.as_str())) {
                trace!("Stage did not match any filter [{}]", stage.name);
                continue;
            }
            durations
                .entry(stage.name.as_str())
                .or_default()
                .push(stage.duration_millis);
        }
    }

    let mut stages: Vec<StageTiming> = durations
        .into_iter()
        .map(|(name, samples)| StageTiming::from_samples(name.to_string(), &samples))
        .collect();
    stages.sort_by(|a, b| b.avg_millis.total_cmp(&a.avg_millis));
    debug!("Ended with [{}] stages to print", stages.len());

    TimingSummary {
        stages,
        successful_jobs,
    }
}
