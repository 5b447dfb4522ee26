//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! security configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::security;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let security_opts = security::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: security_opts.frontend_base_url,
        session_secret: security_opts.session_secret,
        session_ttl_seconds: security_opts.session_ttl_seconds,
        lockout_threshold: security_opts.lockout_threshold,
        lockout_duration_seconds: security_opts.lockout_duration_seconds,
        reset_token_ttl_seconds: security_opts.reset_token_ttl_seconds,
        idle_timeout_seconds: security_opts.idle_timeout_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn handler_builds_server_args() {
        temp_env::with_vars(
            [
                ("CUSTOS_DSN", Some("postgres://user@localhost:5432/custos")),
                ("CUSTOS_SESSION_SECRET", Some("env-session-secret")),
                ("CUSTOS_LOCKOUT_DURATION_SECONDS", Some("120")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["custos"]);
                let action = handler(&matches).expect("dispatch");
                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/custos");
                assert_eq!(args.session_secret, "env-session-secret");
                assert_eq!(args.lockout_duration_seconds, 120);
                assert_eq!(args.lockout_threshold, 5);
            },
        );
    }
}
