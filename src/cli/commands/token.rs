use clap::{Arg, Command};

pub fn augment(command: Command) -> Command {
    command
        .arg(
            Arg::new("access-secret")
                .long("access-secret")
                .help("Signing secret for access tokens")
                .env("TASCA_ACCESS_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("refresh-secret")
                .long("refresh-secret")
                .help("Signing secret for refresh tokens; must differ from the access secret")
                .env("TASCA_REFRESH_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("access-ttl")
                .long("access-ttl")
                .help("Access token lifetime in seconds")
                .default_value("900")
                .env("TASCA_ACCESS_TOKEN_TTL")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-ttl")
                .long("refresh-ttl")
                .help("Refresh token lifetime in seconds")
                .default_value("604800")
                .env("TASCA_REFRESH_TOKEN_TTL")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("issuer")
                .long("issuer")
                .help("JWT issuer claim")
                .default_value("tasca")
                .env("TASCA_TOKEN_ISSUER"),
        )
        .arg(
            Arg::new("audience")
                .long("audience")
                .help("JWT audience claim")
                .default_value("tasca-users")
                .env("TASCA_TOKEN_AUDIENCE"),
        )
}
