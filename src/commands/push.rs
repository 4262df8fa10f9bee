use log::debug;

use crate::error::{JenkinsError, Result};
use crate::output::{bright_green, info};

use super::Context;

/// Pipeline that deploys a build to a subdomain.
pub const DEPLOY_JOB: &str = "build-site";

const DEPLOY_BRANCH: &str = "origin/master";

/// Deploy `target` (a build number, or `rs`/`pra` for that product's latest master
/// build) to `<subdomain>.<deployment domain>`, then monitor the deployment.
pub async fn run(ctx: &Context, target: &str, subdomain: &str) -> Result<()> {
    let build_number = resolve_target(ctx, target).await?;
    let pipeline = ctx.pipeline().to_string();

    debug!(
        "Pushing [{build_number}] to [{subdomain}.{}]",
        ctx.deployment_domain
    );
    let params = [
        ("PROJECT_NAME", pipeline.as_str()),
        ("BUILD_NUMBER", build_number.as_str()),
        ("SUBDOMAIN", subdomain),
    ];
    let location = ctx.trigger(DEPLOY_JOB, &params).await?;

    ctx.out.line(
        &bright_green(format!(
            "Pushing {pipeline} #{build_number} to {subdomain}.{}",
            ctx.deployment_domain
        ))
        .to_string(),
    );
    ctx.out.line(&format!("Queue:   {location}"));

    let number = ctx.wait_for_build(&location).await?;
    ctx.out
        .line(&info(format!("{DEPLOY_JOB} started: #{number}")).to_string());

    ctx.spawn_monitor(DEPLOY_JOB, &[number.to_string()]).await
}

async fn resolve_target(ctx: &Context, target: &str) -> Result<String> {
    let lower = target.to_lowercase();
    if lower != "rs" && lower != "pra" {
        return Ok(target.to_string());
    }

    let product = ctx.products.resolve(&lower)?;
    let latest = ctx
        .client
        .latest_build(&product.search_name, DEPLOY_BRANCH)
        .await?
        .ok_or_else(|| JenkinsError::NoMatchingBuild {
            product: product.display_name.clone(),
            branch: DEPLOY_BRANCH.to_string(),
        })?;

    debug!(
        "Latest {} build on {DEPLOY_BRANCH} is [{}]",
        product.display_name, latest.id
    );
    Ok(latest.id)
}
