use trustd_core::api as core_api;
use uuid::Uuid;

use crate::http::{server, AppState};

use super::cli::ServeArgs;

/// CLI flags win over the configuration file.
pub async fn handle_serve(args: ServeArgs, ctx: core_api::AppContext) -> anyhow::Result<i32> {
    let session_id = args
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut http = ctx.cfg().http_server.clone();
    if let Some(host) = args.host {
        http.host = host;
    }
    if let Some(port) = args.port {
        http.port = port;
    }

    let state = AppState::new(session_id, ctx);
    server::start_server(&http, state).await?;
    Ok(0)
}
