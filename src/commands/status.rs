use crate::error::Result;

use super::{build_status_line, Context};

/// One status line per build, ordered by build id.
pub async fn run(ctx: &Context, build_ids: &[String]) -> Result<()> {
    let mut builds = Vec::with_capacity(build_ids.len());
    for build_id in build_ids {
        builds.push(ctx.client.build_info(build_id).await?);
    }
    builds.sort_by(|a, b| a.id.cmp(&b.id));

    for build in &builds {
        ctx.out
            .line(&build_status_line(build, "status", ctx.pipeline()));
    }
    Ok(())
}
