use axum::{Extension, response::IntoResponse};

use crate::session::CurrentUser;

// axum handler for the root path; authenticated callers get a personalized
// banner via the optional session layer, everyone else the plain one.
pub async fn root(current: Option<Extension<CurrentUser>>) -> impl IntoResponse {
    let banner = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));
    match current {
        Some(Extension(current)) => format!("{banner} ({})", current.principal.username),
        None => banner.to_string(),
    }
}
