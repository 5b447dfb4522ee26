use super::handlers::{auth, health};
use utoipa::openapi::{InfoBuilder, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both
/// served and included in the generated spec. Routes added outside (like
/// `/` or `OPTIONS /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::reset::reset_request))
        .routes(routes!(auth::reset::reset_password))
        .routes(routes!(auth::force_change::force_change))
        .routes(routes!(auth::authorize::route_decision));

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum defaults.
    let info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    let mut custos_tag = Tag::new("custos");
    custos_tag.description = Some("Account security and session integrity API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description =
        Some("Login, sessions, password reset, and route authorization".to_string());

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![custos_tag, auth_tag]))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_auth_route() {
        let spec = openapi();
        let paths = &spec.paths.paths;
        for path in [
            "/health",
            "/v1/auth/login",
            "/v1/auth/session",
            "/v1/auth/logout",
            "/v1/auth/password/reset-request",
            "/v1/auth/password/reset",
            "/v1/auth/password/force-change",
            "/v1/auth/authorize",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn openapi_carries_cargo_metadata() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }
}
