use crate::error::Result;
use crate::output::bold;

use super::Context;

/// Print a build's flow graph URL and open it in the browser.
pub async fn run(ctx: &Context, build_id: &str) -> Result<()> {
    let url = ctx.client.flow_graph_url(build_id);
    ctx.out.line(&bold(&url).to_string());
    ctx.launcher.open_url(&url).await
}
