//! Identity of the signed-in user
//!
//! Authentication itself happens upstream; this module only reads who the
//! fronting identity proxy says the caller is.

use axum::http::HeaderMap;
use serde::Serialize;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_IMAGE_HEADER: &str = "x-user-image";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub first_name: String,
    pub image_url: String,
}

pub trait IdentityProvider: Send + Sync {
    /// `None` when the request is not authenticated
    fn current_user(&self, headers: &HeaderMap) -> Option<CurrentUser>;
}

/// Trusts identity headers injected by the proxy in front of the server
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderIdentityProvider;

impl IdentityProvider for HeaderIdentityProvider {
    fn current_user(&self, headers: &HeaderMap) -> Option<CurrentUser> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let id = header(USER_ID_HEADER)?;
        Some(CurrentUser {
            first_name: header(USER_NAME_HEADER).unwrap_or_else(|| "You".to_string()),
            image_url: header(USER_IMAGE_HEADER).unwrap_or_default(),
            id,
        })
    }
}
