use crate::{api, api::handlers::auth::SecurityConfig, cli::telemetry};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub session_secret: String,
    pub session_ttl_seconds: i64,
    pub lockout_threshold: i32,
    pub lockout_duration_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub idle_timeout_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let security_config = SecurityConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_lockout_threshold(args.lockout_threshold)
        .with_lockout_duration_seconds(args.lockout_duration_seconds)
        .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds)
        .with_idle_timeout_seconds(args.idle_timeout_seconds);

    let session_secret = SecretString::from(args.session_secret);

    let result = api::serve(args.port, args.dsn, security_config, session_secret).await;

    telemetry::shutdown_tracer();

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_debug_does_not_panic() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost/custos".to_string(),
            frontend_base_url: "https://portal.example.edu".to_string(),
            session_secret: "secret".to_string(),
            session_ttl_seconds: 43200,
            lockout_threshold: 5,
            lockout_duration_seconds: 900,
            reset_token_ttl_seconds: 3600,
            idle_timeout_seconds: 900,
        };
        assert!(format!("{args:?}").contains("8080"));
    }
}
