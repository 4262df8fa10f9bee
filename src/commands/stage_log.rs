use crate::error::{JenkinsError, Result};
use crate::logs::{extract_console_text, LineLimit};
use crate::output::{dim, info, rule};
use crate::stages::find_stage;

use super::Context;

/// Print one stage's console log.
///
/// `full` fetches the untruncated HTML console page instead of the JSON log, which the
/// server caps in size; line limits only apply to the JSON log.
pub async fn run(
    ctx: &Context,
    build_id: &str,
    stage_id: &str,
    limit: LineLimit,
    full: bool,
) -> Result<()> {
    let job = ctx.client.job_details(build_id).await?;
    let stage = find_stage(&ctx.client, &job.stages, stage_id)
        .await
        .ok_or_else(|| JenkinsError::StageNotFound {
            stage_id: stage_id.to_string(),
            build_id: build_id.to_string(),
        })?;

    ctx.out
        .line(&info(format!("Stage: {}", stage.name)).to_string());
    ctx.out.line(
        &dim(format!(
            "Build: {build_id} | Stage ID: {stage_id} | Status: {}",
            stage.status
        ))
        .to_string(),
    );
    ctx.out.line(&rule().to_string());
    ctx.out.blank();

    let log_href = stage
        .links
        .log_href()
        .ok_or_else(|| JenkinsError::MissingLog {
            stage_id: stage_id.to_string(),
        })?;

    if full {
        let html = ctx.client.console_html(build_id, stage_id).await?;
        for line in extract_console_text(&html)?.lines() {
            ctx.out.line(line);
        }
        return Ok(());
    }

    let log = ctx.client.stage_log(log_href).await?;
    let (lines, truncated) = limit.apply(&log.text);
    if truncated {
        let note = match limit {
            LineLimit::Tail(n) => format!("(showing last {n} lines)"),
            LineLimit::Head(n) => format!("(showing first {n} lines)"),
            LineLimit::All => String::new(),
        };
        ctx.out.line(&dim(note).to_string());
    }
    for line in lines {
        ctx.out.line(line);
    }
    Ok(())
}
