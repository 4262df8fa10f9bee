use crate::error::Result;
use crate::output::{bright_green, bright_red, cyan, dim, format_millis, info};
use crate::stages::{select, Selection};

use super::Context;

/// List the deepest failed stages of a build.
pub async fn run(ctx: &Context, build_id: &str) -> Result<()> {
    let (_, visits) = ctx.stage_tree(build_id).await?;
    let failed = select(&visits, Selection::FailedLeaves);

    if failed.is_empty() {
        ctx.out
            .line(&bright_green("✓ No failed stages found").to_string());
        return Ok(());
    }

    ctx.out
        .line(&info(format!("Failed stages in build {build_id}:")).to_string());
    ctx.out.blank();

    for visit in &failed {
        let stage = &visit.stage;
        ctx.out
            .line(&format!("  {} {}", bright_red("✗"), info(visit.full_path())));
        ctx.out.line(&format!("    ID:       {}", stage.id));
        ctx.out.line(&format!("    Status:   {}", stage.status));
        ctx.out.line(&format!(
            "    Duration: {}",
            format_millis(stage.duration_millis)
        ));
        ctx.out.line(&format!("    Node:     {}", stage.exec_node));
        ctx.out.line(&format!(
            "    Log URL:  {}",
            cyan(stage.links.log_href().unwrap_or(""))
        ));
        ctx.out.blank();
    }

    ctx.out
        .line(&dim(format!("Total failed stages: {}", failed.len())).to_string());
    ctx.out.line(
        &dim(format!(
            "Use 'jenkins stage-log {build_id} <stage_id>' to view logs"
        ))
        .to_string(),
    );
    Ok(())
}
