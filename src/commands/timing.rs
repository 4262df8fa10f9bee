use crate::error::{JenkinsError, Result};
use crate::output::{create_table, format_millis, format_millis_f64, header_cell, info};
use crate::stats::summarize_timing;
use comfy_table::{Cell, CellAlignment};

use super::Context;

/// Average, fastest and slowest time of each top-level stage over recent successful runs.
pub async fn run(ctx: &Context, filters: &[String]) -> Result<()> {
    let jobs = ctx.client.jobs().await?;
    let summary = summarize_timing(&jobs, filters);

    if summary.stages.is_empty() {
        return Err(JenkinsError::NoTimingData);
    }

    let mut table = create_table();
    table.set_header(vec![
        header_cell("STAGE"),
        header_cell("AVG"),
        header_cell("MIN"),
        header_cell("MAX"),
    ]);
    for stage in &summary.stages {
        table.add_row(vec![
            Cell::new(&stage.name),
            Cell::new(format_millis_f64(stage.avg_millis)).set_alignment(CellAlignment::Right),
            Cell::new(format_millis(stage.min_millis)).set_alignment(CellAlignment::Right),
            Cell::new(format_millis(stage.max_millis)).set_alignment(CellAlignment::Right),
        ]);
    }

    ctx.out.table(&table);
    ctx.out.line(
        &info(format!(
            "Times for {} stages across {} successful jobs",
            summary.stages.len(),
            summary.successful_jobs
        ))
        .to_string(),
    );
    Ok(())
}
