use log::debug;

use crate::error::Result;
use crate::jenkins::{BRANCH_PARAM, PRODUCT_PARAM};
use crate::output::{bright_green, dim, info};

use super::{origin_branch, Context};

/// Trigger a build of `branch` for `product`, wait for its number, then monitor it.
pub async fn run(ctx: &Context, product: &str, branch: &str) -> Result<()> {
    let product = ctx.products.resolve(product)?.search_name.clone();
    let branch = origin_branch(branch);
    let pipeline = ctx.pipeline().to_string();

    debug!("Triggering build for product [{product}] branch [{branch}]");
    let params = [
        (PRODUCT_PARAM, product.as_str()),
        (BRANCH_PARAM, branch.as_str()),
    ];
    let location = ctx.trigger(&pipeline, &params).await?;

    ctx.out.line(&bright_green("Build queued successfully!").to_string());
    ctx.out.line(&format!("Product: {product}"));
    ctx.out.line(&format!("Branch:  {branch}"));
    ctx.out.line(&format!("Queue:   {location}"));
    ctx.out.blank();

    let number = ctx.wait_for_build(&location).await?;
    ctx.out.line(&info(format!("Build started: #{number}")).to_string());
    ctx.out
        .line(&dim(format!("Monitor with: jenkins monitor -b {number}")).to_string());
    ctx.out
        .line(&dim(format!("Diagnose with: jenkins diagnose {number}")).to_string());

    ctx.spawn_monitor(&pipeline, &[number.to_string()]).await
}
