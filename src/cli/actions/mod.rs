pub mod server;

use secrecy::SecretString;

use crate::admission::AdmissionConfig;

/// Arguments for the server action, assembled by `cli::dispatch`.
#[derive(Debug)]
pub struct ServerArgs {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub issuer: String,
    pub audience: String,
    pub limits: AdmissionConfig,
}

#[derive(Debug)]
pub enum Action {
    Server(ServerArgs),
}
