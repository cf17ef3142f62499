//! Who is using the app.
//!
//! Inside Telegram the host injects the launch user; anywhere else a fixed
//! development identity stands in so the rest of the session behaves the same.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{UserId, UserIdentity};

pub const FALLBACK_USER_ID: i64 = 123_456_789;
pub const FALLBACK_DISPLAY_NAME: &str = "Test User";

/// The slice of `Telegram.WebApp` the shell forwards at launch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct HostContext {
    #[serde(rename = "initDataUnsafe", alias = "init_data_unsafe", default)]
    pub init_data_unsafe: Option<InitDataUnsafe>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct InitDataUnsafe {
    #[serde(default)]
    pub user: Option<HostUser>,
}

/// Telegram `WebAppUser`. Field names follow the host payload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HostUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl HostUser {
    /// First and last name, else the username, else `User {id}`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [Some(self.first_name.as_str()), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full.is_empty() {
            return full;
        }

        self.username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map_or_else(|| format!("User {}", self.id), str::to_string)
    }

    fn to_identity(&self) -> UserIdentity {
        UserIdentity {
            id: UserId(self.id),
            display_name: self.display_name(),
            username: non_blank(self.username.as_deref()),
            photo_url: non_blank(self.photo_url.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub trait IdentityProvider {
    fn resolve(&self) -> Option<UserIdentity>;

    /// Whether the identity came from a real host session.
    fn is_host_backed(&self) -> bool;
}

pub struct HostIdentityProvider<'a> {
    context: &'a HostContext,
}

impl<'a> HostIdentityProvider<'a> {
    #[must_use]
    pub const fn new(context: &'a HostContext) -> Self {
        Self { context }
    }

    fn user(&self) -> Option<&HostUser> {
        self.context
            .init_data_unsafe
            .as_ref()
            .and_then(|data| data.user.as_ref())
    }
}

impl IdentityProvider for HostIdentityProvider<'_> {
    fn resolve(&self) -> Option<UserIdentity> {
        self.user().map(HostUser::to_identity)
    }

    fn is_host_backed(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackIdentityProvider;

impl FallbackIdentityProvider {
    #[must_use]
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: UserId(FALLBACK_USER_ID),
            display_name: FALLBACK_DISPLAY_NAME.to_string(),
            username: None,
            photo_url: None,
        }
    }
}

impl IdentityProvider for FallbackIdentityProvider {
    fn resolve(&self) -> Option<UserIdentity> {
        Some(self.identity())
    }

    fn is_host_backed(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: UserIdentity,
    pub host_backed: bool,
}

/// Picks the host identity when the launch context carries a user and the
/// development identity otherwise. Always yields exactly one identity.
#[must_use]
pub fn resolve_identity(host: Option<&HostContext>) -> ResolvedIdentity {
    if let Some(context) = host {
        let provider = HostIdentityProvider::new(context);
        if let Some(identity) = provider.resolve() {
            info!(user_id = %identity.id, "resolved identity from host");
            return ResolvedIdentity {
                identity,
                host_backed: provider.is_host_backed(),
            };
        }
        warn!("host context present but carries no user; using development identity");
    }

    let provider = FallbackIdentityProvider;
    let identity = provider.identity();
    info!(user_id = %identity.id, "using development identity");
    ResolvedIdentity {
        identity,
        host_backed: provider.is_host_backed(),
    }
}
