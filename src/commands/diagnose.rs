use log::debug;

use crate::error::Result;
use crate::jenkins::{Status, BRANCH_PARAM, PRODUCT_PARAM};
use crate::logs::excerpt;
use crate::output::{bright_green, dim, format_millis, info, result_badge};
use crate::stages::{select, Selection, StageVisit};

use super::Context;

const WIDTH: usize = 80;

/// Build summary, failed stages and their logs, in a form easy to paste elsewhere.
///
/// `all_stages` shows the logs of every leaf instead of only the failed ones.
/// `max_log_lines` of zero prints whole logs.
pub async fn run(
    ctx: &Context,
    build_id: &str,
    all_stages: bool,
    max_log_lines: usize,
) -> Result<()> {
    let build = ctx.client.build_info(build_id).await?;
    let (_, visits) = ctx.stage_tree(build_id).await?;

    let banner = "═".repeat(WIDTH);
    ctx.out.line(&banner);
    ctx.out.line(
        &info(format!(
            "  BUILD DIAGNOSIS: {} #{build_id}",
            ctx.pipeline()
        ))
        .to_string(),
    );
    ctx.out.line(&banner);
    ctx.out.blank();

    ctx.out
        .line(&format!("Status:   {}", result_badge(build.result_label())));
    ctx.out
        .line(&format!("Duration: {}", format_millis(build.duration)));
    ctx.out.line(&format!("URL:      {}", build.url));
    for (label, name) in [("Product", PRODUCT_PARAM), ("Branch", BRANCH_PARAM)] {
        if let Some(value) = build.parameter(name).and_then(|v| v.as_str()) {
            ctx.out.line(&format!("{:<10}{value}", format!("{label}:")));
        }
    }
    ctx.out.blank();

    let failed = select(&visits, Selection::FailedLeaves);
    let shown = if all_stages {
        select(&visits, Selection::AllLeaves)
    } else {
        failed.clone()
    };

    if shown.is_empty() {
        ctx.out.line(
            &bright_green("✓ No failed stages found - build passed!").to_string(),
        );
        return Ok(());
    }

    ctx.out.line(&info("FAILED STAGES:").to_string());
    for (index, visit) in failed.iter().enumerate() {
        ctx.out.line(&format!(
            "  {}. {} (Duration: {})",
            index + 1,
            visit.full_path(),
            format_millis(visit.stage.duration_millis)
        ));
    }
    ctx.out.blank();

    ctx.out.line(&info("STAGE LOGS:").to_string());
    ctx.out.blank();
    for (index, visit) in shown.iter().enumerate() {
        stage_header(ctx, index + 1, visit, all_stages);
        print_log(ctx, visit, max_log_lines).await;
        ctx.out.blank();
    }

    ctx.out.line(&banner);
    ctx.out.line(&info("SUMMARY FOR ANALYSIS:").to_string());
    ctx.out.line(&format!(
        "  Build {build_id} had {} failed stage(s)",
        failed.len()
    ));
    if !failed.is_empty() {
        ctx.out.line("  Failed stages:");
        for visit in &failed {
            ctx.out.line(&format!(
                "    - {} ({})",
                visit.full_path(),
                visit.stage.status
            ));
        }
    }
    ctx.out.line(&banner);
    Ok(())
}

fn stage_header(ctx: &Context, index: usize, visit: &StageVisit, with_status: bool) {
    let stage = &visit.stage;
    let title = if with_status {
        let marker = match stage.status {
            Status::Success => "✓ SUCCESS",
            Status::Aborted => "⊘ ABORTED",
            _ => "✗ FAILED",
        };
        format!("─── {index}. {} {marker} ───", visit.full_path())
    } else {
        format!("─── {index}. {} ───", visit.full_path())
    };
    ctx.out.line(&info(title).to_string());
    ctx.out.line(
        &dim(format!(
            "Stage ID: {} | Duration: {} | Node: {}",
            stage.id,
            format_millis(stage.duration_millis),
            stage.exec_node
        ))
        .to_string(),
    );
    ctx.out.blank();
}

// A missing or unreadable log is noted in the output; the remaining stages still print.
async fn print_log(ctx: &Context, visit: &StageVisit, max_lines: usize) {
    let Some(href) = visit.stage.links.log_href() else {
        ctx.out.line(&dim("  (no log available)").to_string());
        return;
    };

    let log = match ctx.client.stage_log(href).await {
        Ok(log) => log,
        Err(e) => {
            debug!("Log fetch failed for stage {}: {e}", visit.stage.id);
            ctx.out
                .line(&dim(format!("  (failed to fetch log: {e})")).to_string());
            return;
        }
    };

    let cut = excerpt(&log.text, max_lines);
    for line in &cut.head {
        ctx.out.line(line);
    }
    if cut.omitted > 0 {
        ctx.out.line(
            &dim(format!("\n  ... ({} lines omitted) ...\n", cut.omitted)).to_string(),
        );
        for line in &cut.tail {
            ctx.out.line(line);
        }
    }
}
