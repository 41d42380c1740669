pub mod health;
pub use self::health::health;

pub mod root;
pub use self::root::root;

pub mod register;
pub use self::register::register;

pub mod login;
pub use self::login::login;

pub mod refresh;
pub use self::refresh::refresh;

pub mod logout;
pub use self::logout::logout;

pub mod profile;
pub use self::profile::profile;

// common functions for the handlers
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn valid_password(password: &str) -> bool {
    password.len() >= 8
}
