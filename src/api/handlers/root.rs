use axum::response::IntoResponse;

/// Service banner for `/`; undocumented on purpose.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn root_answers_ok() {
        let response = root().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
