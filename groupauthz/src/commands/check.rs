use groupauthz::api::request_path::canonical_path;
use groupauthz::app_state::SharedAppState;
use groupauthz_core::{AuthzRequest, Method};
use serde_json::json;

use crate::cli::CheckCommand;

pub fn check_access(state: &SharedAppState, cmd: &CheckCommand) -> anyhow::Result<()> {
    let method = Method::from_request_method(&cmd.method.to_uppercase());
    let Some(path) = canonical_path(&cmd.path) else {
        anyhow::bail!("Invalid request path {}", cmd.path);
    };

    let Some(resource) = state.find_resource(&path) else {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "path": path,
                "user": cmd.user,
                "method": method.as_str(),
                "resource": null,
                "outcome": { "outcome": "unrestricted" },
            }))?
        );
        return Ok(());
    };

    let outcome = state.chain.evaluate(&AuthzRequest {
        user: &cmd.user,
        method,
        resource: &path,
        rules: &resource.rules,
        config: &resource.config,
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "path": path,
            "user": cmd.user,
            "method": method.as_str(),
            "resource": resource.path,
            "outcome": outcome,
        }))?
    );
    Ok(())
}
