use clap::{Arg, Command};

pub const ARG_SESSION_SECRET: &str = "session-secret";

/// Parsed security options, pulled out of clap matches by dispatch.
#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_secret: String,
    pub session_ttl_seconds: i64,
    pub lockout_threshold: i32,
    pub lockout_duration_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub idle_timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> anyhow::Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .unwrap_or_else(|| "https://portal.example.edu".to_string()),
            session_secret: matches
                .get_one::<String>(ARG_SESSION_SECRET)
                .cloned()
                .ok_or_else(|| {
                    anyhow::anyhow!("missing required argument: --{ARG_SESSION_SECRET}")
                })?,
            session_ttl_seconds: matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .unwrap_or(43200),
            lockout_threshold: matches
                .get_one::<i32>("lockout-threshold")
                .copied()
                .unwrap_or(5),
            lockout_duration_seconds: matches
                .get_one::<i64>("lockout-duration-seconds")
                .copied()
                .unwrap_or(900),
            reset_token_ttl_seconds: matches
                .get_one::<i64>("reset-token-ttl-seconds")
                .copied()
                .unwrap_or(3600),
            idle_timeout_seconds: matches
                .get_one::<u64>("idle-timeout-seconds")
                .copied()
                .unwrap_or(900),
        })
    }
}

pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_lockout_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Dashboard base URL, used for CORS and cookie security")
                .env("CUSTOS_FRONTEND_BASE_URL")
                .default_value("https://portal.example.edu"),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("HS256 secret for session credentials")
                .env("CUSTOS_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session credential TTL in seconds")
                .env("CUSTOS_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("idle-timeout-seconds")
                .long("idle-timeout-seconds")
                .help("Inactivity window before the dashboard signs a session out")
                .env("CUSTOS_IDLE_TIMEOUT_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn with_lockout_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("lockout-threshold")
                .long("lockout-threshold")
                .help("Consecutive failed logins before an account locks")
                .env("CUSTOS_LOCKOUT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("lockout-duration-seconds")
                .long("lockout-duration-seconds")
                .help("How long a lockout lasts")
                .env("CUSTOS_LOCKOUT_DURATION_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("CUSTOS_RESET_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
}
