use clap::{Arg, Command};

fn u64_arg(name: &'static str, help: &'static str, default: &'static str, env: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .default_value(default)
        .env(env)
        .value_parser(clap::value_parser!(u64))
}

fn i64_arg(name: &'static str, help: &'static str, default: &'static str, env: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .default_value(default)
        .env(env)
        .value_parser(clap::value_parser!(i64))
}

pub fn augment(command: Command) -> Command {
    command
        .arg(u64_arg(
            "rate-limit-window",
            "General rate-limit window in seconds",
            "900",
            "TASCA_RATE_LIMIT_WINDOW",
        ))
        .arg(i64_arg(
            "rate-limit-max",
            "Requests allowed per IP per general window",
            "100",
            "TASCA_RATE_LIMIT_MAX",
        ))
        .arg(u64_arg(
            "auth-rate-limit-window",
            "Auth rate-limit window in seconds",
            "900",
            "TASCA_AUTH_RATE_LIMIT_WINDOW",
        ))
        .arg(i64_arg(
            "auth-rate-limit-max",
            "Auth requests allowed per IP per auth window",
            "5",
            "TASCA_AUTH_RATE_LIMIT_MAX",
        ))
        .arg(i64_arg(
            "slow-down-after",
            "Requests per window before progressive delays start",
            "50",
            "TASCA_SLOW_DOWN_AFTER",
        ))
        .arg(u64_arg(
            "slow-down-step-ms",
            "Delay added per request past the slow-down threshold, in milliseconds",
            "500",
            "TASCA_SLOW_DOWN_STEP_MS",
        ))
        .arg(u64_arg(
            "slow-down-cap-ms",
            "Maximum slow-down delay in milliseconds",
            "20000",
            "TASCA_SLOW_DOWN_CAP_MS",
        ))
        .arg(i64_arg(
            "lockout-free-retries",
            "Failed attempts tolerated before a lockout trips",
            "5",
            "TASCA_LOCKOUT_FREE_RETRIES",
        ))
        .arg(u64_arg(
            "lockout-min-wait",
            "First lockout wait in seconds",
            "300",
            "TASCA_LOCKOUT_MIN_WAIT",
        ))
        .arg(u64_arg(
            "lockout-max-wait",
            "Maximum lockout wait in seconds",
            "3600",
            "TASCA_LOCKOUT_MAX_WAIT",
        ))
        .arg(u64_arg(
            "lockout-lifetime",
            "How long failure history is remembered, in seconds",
            "86400",
            "TASCA_LOCKOUT_LIFETIME",
        ))
}
