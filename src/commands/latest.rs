use crate::error::Result;
use crate::output::{bright_red, info};

use super::{origin_branch, Context};

/// Print the newest build of `product` on `branch`.
///
/// Finding none is reported, not treated as a failure.
pub async fn run(ctx: &Context, product: &str, branch: &str) -> Result<()> {
    let product = ctx.products.resolve(product)?;
    let branch = origin_branch(branch);

    match ctx
        .client
        .latest_build(&product.search_name, &branch)
        .await?
    {
        Some(build) => ctx.out.line(
            &info(format!(
                "Latest build for {} on branch [{branch}] is {}",
                product.display_name, build.id
            ))
            .to_string(),
        ),
        None => ctx.out.line(
            &bright_red(format!(
                "No builds found for {} on branch [{branch}]",
                product.display_name
            ))
            .to_string(),
        ),
    }
    Ok(())
}
