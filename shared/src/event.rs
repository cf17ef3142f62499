use serde::{Deserialize, Serialize};

use crate::identity::HostContext;
use crate::interest::ContactRecord;
use crate::model::ListingKey;
use crate::navigation::ActiveView;
use crate::profile::{ProfilePatch, ProfileRecord};

pub type ApiResult<T> = crux_http::Result<crux_http::Response<T>>;

/// List responses stay raw until each element is decoded on its own.
pub type RawList = Vec<serde_json::Value>;

/// What the shell hands over at startup.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchContext {
    /// `Telegram.WebApp`, when running inside Telegram.
    #[serde(default)]
    pub host: Option<HostContext>,
    /// Overrides the configured API base URL.
    #[serde(default)]
    pub api_base_url: Option<String>,
}

/// Acknowledgement body of the write endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ApiAck {
    #[serde(default = "ack_default")]
    pub success: bool,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn ack_default() -> bool {
    true
}

// --- Event enum: shell events first, capability responses boxed and skipped ---

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub enum Event {
    #[default]
    Noop,

    // Session
    Launched(Box<LaunchContext>),
    NavigateTo {
        view: ActiveView,
    },
    DismissError,

    // Profile
    ProfileEdited(Box<ProfilePatch>),
    ProfileSubmitted,

    // Map & search
    StationSelected {
        station_id: String,
    },
    StationDeselected,
    RadiusChanged {
        km: f64,
    },

    // Interest
    ListingLiked {
        listing_key: ListingKey,
    },
    DismissContact,

    // Capability responses
    #[serde(skip)]
    StationsLoaded(Box<ApiResult<RawList>>),
    #[serde(skip)]
    ProfileLoaded(Box<ApiResult<ProfileRecord>>),
    #[serde(skip)]
    ProfileSaved(Box<ApiResult<ApiAck>>),
    #[serde(skip)]
    ListingsLoaded {
        generation: u64,
        result: Box<ApiResult<RawList>>,
    },
    #[serde(skip)]
    LikeRecorded {
        listing_key: ListingKey,
        result: Box<ApiResult<ApiAck>>,
    },
    #[serde(skip)]
    ContactRevealed {
        listing_key: ListingKey,
        result: Box<ApiResult<ContactRecord>>,
    },
}

impl Event {
    /// Stable name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Launched(_) => "launched",
            Self::NavigateTo { .. } => "navigate_to",
            Self::DismissError => "dismiss_error",
            Self::ProfileEdited(_) => "profile_edited",
            Self::ProfileSubmitted => "profile_submitted",
            Self::StationSelected { .. } => "station_selected",
            Self::StationDeselected => "station_deselected",
            Self::RadiusChanged { .. } => "radius_changed",
            Self::ListingLiked { .. } => "listing_liked",
            Self::DismissContact => "dismiss_contact",
            Self::StationsLoaded(_) => "stations_loaded",
            Self::ProfileLoaded(_) => "profile_loaded",
            Self::ProfileSaved(_) => "profile_saved",
            Self::ListingsLoaded { .. } => "listings_loaded",
            Self::LikeRecorded { .. } => "like_recorded",
            Self::ContactRevealed { .. } => "contact_revealed",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::NavigateTo { .. }
                | Self::DismissError
                | Self::ProfileEdited(_)
                | Self::ProfileSubmitted
                | Self::StationSelected { .. }
                | Self::StationDeselected
                | Self::RadiusChanged { .. }
                | Self::ListingLiked { .. }
                | Self::DismissContact
        )
    }
}
