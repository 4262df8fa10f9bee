use crate::error::Result;
use crate::monitor::MonitorLoop;

use super::{build_status_line, Context};

/// Wait for builds to finish.
///
/// Without `in_background` the wait is handed to a re-executed copy of this program;
/// with it (the hidden `--bg` flag) this process runs the loop itself.
pub async fn run(ctx: &Context, build_ids: &[String], in_background: bool) -> Result<()> {
    if !in_background {
        return ctx.spawn_monitor(ctx.pipeline(), build_ids).await;
    }

    let pipeline = ctx.pipeline();
    MonitorLoop::new(&ctx.client, build_ids, ctx.monitor_interval)
        .run(|build| {
            ctx.out
                .line(&build_status_line(build, "monitor", pipeline));
        })
        .await
}
