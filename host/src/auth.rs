use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use texcompile_lib::Task;

use crate::error::HostError;

/// The caller's identity for one request, extracted from the bearer token.
/// Token validation itself is out of scope (spec.md §1); this only
/// extracts the token for passthrough to the Source Client and, where the
/// source service reports it, the caller's own user id.
///
/// Grounded on `raiko-host::server::auth::api_key_auth_middleware`, cut
/// down from a locally-validated API-key store to opaque passthrough.
#[derive(Clone, Debug, Default)]
pub struct AuthContext {
    pub token: String,
    pub user_id: Option<String>,
    pub scopes: Vec<String>,
}

impl AuthContext {
    fn from_header(value: &str) -> Self {
        let token = value
            .strip_prefix("Bearer ")
            .unwrap_or(value)
            .trim()
            .to_string();
        Self {
            token,
            user_id: None,
            scopes: Vec::new(),
        }
    }
}

/// Extracts `Authorization` and inserts an `AuthContext` extension. Missing
/// header yields an empty-token context rather than rejecting outright —
/// `GET /status` and `GET /metrics` have no owner to check against, and
/// per-task authorization is enforced by `is_authorized` at each handler.
pub async fn extract_auth(mut request: Request, next: Next) -> Response {
    let ctx = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(AuthContext::from_header)
        .unwrap_or_default();
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// spec.md §4.6 item 2: a task with no owner is public. Otherwise the
/// caller is authorized iff they hold a task-scoped capability or their
/// user id equals the task's owner.
pub fn is_authorized(ctx: &AuthContext, task: &Task) -> bool {
    match &task.owner {
        None => true,
        Some(owner) => {
            ctx.user_id.as_deref() == Some(owner.as_str())
                || ctx.scopes.iter().any(|s| s == &task.task_id())
        }
    }
}

pub fn require_authorized(ctx: &AuthContext, task: &Task) -> Result<(), HostError> {
    if is_authorized(ctx, task) {
        Ok(())
    } else {
        Err(HostError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texcompile_lib::Format;

    fn task(owner: Option<&str>) -> Task {
        Task::in_progress("54", "chk", Format::Pdf, owner.map(str::to_string))
    }

    #[test]
    fn public_task_is_always_authorized() {
        let ctx = AuthContext::default();
        assert!(is_authorized(&ctx, &task(None)));
    }

    #[test]
    fn owner_match_is_authorized() {
        let ctx = AuthContext {
            user_id: Some("84843".to_string()),
            ..Default::default()
        };
        assert!(is_authorized(&ctx, &task(Some("84843"))));
    }

    #[test]
    fn scope_match_is_authorized() {
        let ctx = AuthContext {
            scopes: vec!["54/chk/pdf".to_string()],
            ..Default::default()
        };
        assert!(is_authorized(&ctx, &task(Some("84843"))));
    }

    #[test]
    fn mismatched_caller_is_forbidden() {
        let ctx = AuthContext {
            user_id: Some("123".to_string()),
            ..Default::default()
        };
        assert!(!is_authorized(&ctx, &task(Some("84843"))));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let ctx = AuthContext::from_header("Bearer abc123");
        assert_eq!(ctx.token, "abc123");
    }
}
