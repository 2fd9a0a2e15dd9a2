use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use groupauthz_core::{AuthzRequest, Method};
use tracing::{debug, error, info, warn};

use crate::api::error::AppError;
use crate::api::request_path::canonical_path;
use crate::app_state::SharedAppState;
use crate::chain::ChainOutcome;

/// Middleware that runs protected requests through the authorization chain.
///
/// Resources are matched against the decoded and normalized request path, the
/// same path the file service resolves. Requests outside every configured
/// resource, and requests whose method is not covered by any rule of their
/// resource, are passed on unchecked.
pub async fn authorize_request(
    State(state): State<SharedAppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(path) = canonical_path(req.uri().path()) else {
        warn!("Refusing request path {}", req.uri().path());
        let error = AppError::BadRequest("invalid request path".to_string());
        return error.into_response();
    };
    let Some(index) = state.find_resource_index(&path) else {
        return next.run(req).await;
    };

    let method = Method::from_request_method(req.method().as_str());
    let resource = &state.resources[index];
    if !resource.rules.iter().any(|rule| rule.applies_to(method)) {
        debug!("No rule covers {} {}, not checking", method, path);
        return next.run(req).await;
    }

    let user = req
        .headers()
        .get(state.settings.api.user_header.as_str())
        .and_then(|header| header.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let Some(user) = user else {
        warn!("Missing authenticated user for protected resource {}", path);
        return unauthorized(&state);
    };

    let outcome = {
        let state = state.clone();
        let user = user.clone();
        let path = path.clone();
        tokio::task::spawn_blocking(move || {
            let resource = &state.resources[index];
            state.chain.evaluate(&AuthzRequest {
                user: &user,
                method,
                resource: &path,
                rules: &resource.rules,
                config: &resource.config,
            })
        })
        .await
    };

    match outcome {
        Ok(ChainOutcome::Unrestricted) => next.run(req).await,
        Ok(ChainOutcome::Allowed { mechanism }) => {
            debug!("{} allowed {} access to {}", mechanism, user, path);
            next.run(req).await
        }
        Ok(ChainOutcome::Unauthorized { mechanism, reason }) => {
            info!(
                "{} denied {} access to {}: {:?}",
                mechanism, user, path, reason
            );
            unauthorized(&state)
        }
        Ok(ChainOutcome::Failed { mechanism, detail }) => {
            let detail = format!("{mechanism}: {detail}");
            AppError::InternalServerError(detail).into_response()
        }
        Ok(ChainOutcome::Undecided) => {
            let detail = format!("could not check access to {path}");
            AppError::InternalServerError(detail).into_response()
        }
        Err(e) => {
            error!("Authorization task for {} failed: {}", path, e);
            let detail = format!("authorization task failed: {e}");
            AppError::InternalServerError(detail).into_response()
        }
    }
}

fn unauthorized(state: &SharedAppState) -> Response {
    AppError::Unauthorized {
        realm: state.settings.api.realm.clone(),
    }
    .into_response()
}
