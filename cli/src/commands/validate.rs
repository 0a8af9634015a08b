use anyhow::Context;
use trustd_core::api as core_api;

use super::cli::ValidateArgs;
use super::{print_json, read_input};

/// Exit code 0 when the package is allowed or passed, 1 when it failed, 2 on error.
pub async fn handle_validate(args: ValidateArgs, ctx: &core_api::AppContext) -> anyhow::Result<i32> {
    let raw = read_input(&args.request)?;
    let req: core_api::ValidationRequest =
        serde_json::from_str(&raw).context("validation request is not valid JSON")?;

    let result = ctx.validation().validate(req).await;
    print_json(&result, args.pretty)?;

    Ok(match result.status {
        core_api::Verdict::Allowed | core_api::Verdict::Passed => 0,
        core_api::Verdict::Failed => 1,
        core_api::Verdict::Error => 2,
    })
}
