use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::trace;
use std::cmp::Ordering;

use crate::error::{JenkinsError, Result};
use crate::jenkins::{Job, Stage, Status};
use crate::output::{create_table, dim, duration_cell, header_cell, info, status_cell};
use crate::stages::find_stage;
use crate::tui::{self, Browser};
use comfy_table::Cell;

use super::Context;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    Name,
    Status,
    Duration,
    #[default]
    Start,
}

/// How the table is ordered and narrowed.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub sort: SortKey,
    pub ascending: bool,
    /// Case-insensitive match on name or status
    pub filter: Option<String>,
}

/// One line of the table, whether it shows a run or a stage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Row {
    pub(crate) name: String,
    pub(crate) status: Status,
    pub(crate) duration_millis: u64,
    pub(crate) id: String,
    pub(crate) start: DateTime<Utc>,
}

impl From<&Job> for Row {
    fn from(job: &Job) -> Self {
        Self {
            name: job.name.clone(),
            status: job.status,
            duration_millis: job.duration_millis,
            id: job.id.clone(),
            start: job.start_time,
        }
    }
}

impl From<&Stage> for Row {
    fn from(stage: &Stage) -> Self {
        Self {
            name: stage.name.clone(),
            status: stage.status,
            duration_millis: stage.duration_millis,
            id: stage.id.clone(),
            start: stage.start_time,
        }
    }
}

/// Tabulate recent runs, a build's stages, or a composite stage's children.
///
/// On a terminal this opens the interactive browser at the same place. Otherwise,
/// naming a stage without children prints its log.
pub async fn run(
    ctx: &Context,
    build_id: Option<&str>,
    stage_id: Option<&str>,
    view: &View,
) -> Result<()> {
    if ctx.interactive {
        return browse(ctx, build_id, stage_id, view).await;
    }

    let Some(build_id) = build_id else {
        let jobs = ctx.client.jobs().await?;
        let title = format!("Recent runs of {}", ctx.pipeline());
        render(ctx, &title, jobs.iter().map(Row::from).collect(), view);
        return Ok(());
    };

    let job = ctx.client.job_details(build_id).await?;
    let Some(stage_id) = stage_id else {
        let title = format!("{} #{build_id} [{}]", ctx.pipeline(), job.status);
        render(ctx, &title, job.stages.iter().map(Row::from).collect(), view);
        return Ok(());
    };

    let stage = lookup_stage(ctx, &job, build_id, stage_id).await?;

    if !stage.children.is_empty() {
        let title = format!("#{build_id} > {} [{}]", stage.name, stage.status);
        render(
            ctx,
            &title,
            stage.children.iter().map(Row::from).collect(),
            view,
        );
        return Ok(());
    }

    let href = stage.links.log_href().ok_or_else(|| JenkinsError::MissingLog {
        stage_id: stage_id.to_string(),
    })?;
    let log = ctx.client.stage_log(href).await?;
    ctx.out
        .line(&info(format!("#{build_id} > {} [{}]", stage.name, log.status)).to_string());
    for line in log.text.lines() {
        ctx.out.line(line);
    }
    if log.has_more {
        ctx.out.line(
            &dim(format!(
                "(log truncated, use 'jenkins stage-log -f {build_id} {stage_id}' for all of it)"
            ))
            .to_string(),
        );
    }
    Ok(())
}

/// Open the browser on the runs, descending into `build_id` and `stage_id` when given.
async fn browse(
    ctx: &Context,
    build_id: Option<&str>,
    stage_id: Option<&str>,
    view: &View,
) -> Result<()> {
    let jobs = ctx.client.jobs().await?;
    let mut browser = Browser::new(ctx.pipeline(), jobs, view);

    if let Some(build_id) = build_id {
        let job = ctx.client.job_details(build_id).await?;
        let stage = match stage_id {
            Some(stage_id) => Some(lookup_stage(ctx, &job, build_id, stage_id).await?),
            None => None,
        };
        browser.show_job(job);
        if let Some(stage) = stage {
            let opened = tui::open_stage(&ctx.client, stage).await?;
            browser.show(opened);
        }
    }

    tui::run(&ctx.client, browser).await
}

async fn lookup_stage(ctx: &Context, job: &Job, build_id: &str, stage_id: &str) -> Result<Stage> {
    find_stage(&ctx.client, &job.stages, stage_id)
        .await
        .ok_or_else(|| JenkinsError::StageNotFound {
            stage_id: stage_id.to_string(),
            build_id: build_id.to_string(),
        })
}

/// Column header text, with an arrow on the sorted column.
///
/// Start order is the unsorted default and gets no arrow.
pub(crate) fn column_title(view: &View, key: SortKey, text: &str) -> String {
    if view.sort != key || key == SortKey::Start {
        return text.to_string();
    }
    let arrow = if view.ascending { "↑" } else { "↓" };
    format!("{text} {arrow}")
}

fn render(ctx: &Context, title: &str, rows: Vec<Row>, view: &View) {
    let rows = arrange(rows, view);
    let title_for = |key: SortKey, text: &str| header_cell(&column_title(view, key, text));

    let mut table = create_table();
    table.set_header(vec![
        title_for(SortKey::Name, "Name"),
        title_for(SortKey::Status, "Status"),
        title_for(SortKey::Duration, "Duration"),
        header_cell("ID"),
    ]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.name),
            status_cell(row.status),
            duration_cell(row.duration_millis),
            Cell::new(&row.id),
        ]);
    }

    ctx.out.line(&info(title).to_string());
    ctx.out.table(&table);
    ctx.out
        .line(&dim(format!("{} rows", rows.len())).to_string());
}

pub(crate) fn arrange(mut rows: Vec<Row>, view: &View) -> Vec<Row> {
    if let Some(filter) = view.filter.as_deref().map(str::to_lowercase) {
        rows.retain(|row| {
            let keep = row.name.to_lowercase().contains(&filter)
                || row.status.as_str().to_lowercase().contains(&filter);
            trace!("Row [{}][{}] kept by filter [{filter}]? {keep}", row.name, row.status);
            keep
        });
    }

    rows.sort_by(|a, b| {
        let order = compare(a, b, view.sort);
        if view.ascending {
            order
        } else {
            order.reverse()
        }
    });
    rows
}

fn compare(a: &Row, b: &Row, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        SortKey::Duration => a.duration_millis.cmp(&b.duration_millis),
        SortKey::Start => a.start.cmp(&b.start),
    }
}
