//! Profile draft editing and the saved-profile round trip.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{Gender, ProfileDraft, SavedProfile, SearchRadius, UserId, UserIdentity};
use crate::{ValidationError, DEFAULT_RADIUS_KM, MAX_AGE, MIN_AGE};

/// Partial update of the profile form. `None` leaves a field untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Raw form text; an empty string clears the age.
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    #[serde(default)]
    pub search_radius_km: Option<f64>,
}

impl ProfilePatch {
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn age(text: impl Into<String>) -> Self {
        Self {
            age: Some(text.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn radius(km: f64) -> Self {
        Self {
            search_radius_km: Some(km),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produces the patched draft, or the first validation failure. The
    /// input draft is never modified.
    pub fn apply_to(&self, draft: &ProfileDraft) -> Result<ProfileDraft, ValidationError> {
        let mut next = draft.clone();

        if let Some(name) = &self.name {
            next.name.clone_from(name);
        }
        if let Some(gender) = self.gender {
            next.gender = gender;
        }
        if let Some(text) = &self.age {
            next.age = parse_age(text)?;
        }
        if let Some(about) = &self.about {
            next.about = non_blank(Some(about));
        }
        if let Some(location) = &self.preferred_location {
            next.preferred_location = non_blank(Some(location));
        }
        if let Some(km) = self.search_radius_km {
            next.search_radius_km = SearchRadius::new(km)?;
        }

        Ok(next)
    }
}

pub fn parse_age(text: &str) -> Result<Option<u8>, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let age: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::AgeNotANumber(trimmed.to_string()))?;
    validate_age(age).map(Some)
}

pub fn validate_age(age: i64) -> Result<u8, ValidationError> {
    u8::try_from(age)
        .ok()
        .filter(|a| (MIN_AGE..=MAX_AGE).contains(a))
        .ok_or(ValidationError::AgeOutOfRange(age))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

/// Profile as stored by the housing API.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileRecord {
    pub telegram_id: i64,
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    #[serde(default = "default_radius_km")]
    pub search_radius_km: f64,
}

impl ProfileRecord {
    #[must_use]
    pub fn compose(identity: &UserIdentity, draft: &ProfileDraft) -> Self {
        Self {
            telegram_id: identity.id.get(),
            name: draft.name.trim().to_string(),
            photo_url: identity.photo_url.clone(),
            gender: draft.gender.as_wire().map(str::to_string),
            age: draft.age.map(i64::from),
            about: draft.about.clone(),
            preferred_location: draft.preferred_location.clone(),
            search_radius_km: draft.search_radius_km.km(),
        }
    }

    /// Reads a stored profile leniently: stored values that no longer pass
    /// form validation are dropped or clamped rather than rejected.
    #[must_use]
    pub fn into_saved(self) -> SavedProfile {
        let age = self.age.and_then(|age| match validate_age(age) {
            Ok(age) => Some(age),
            Err(error) => {
                warn!(%error, "ignoring stored age");
                None
            }
        });

        let search_radius_km = SearchRadius::clamped(self.search_radius_km).unwrap_or_else(|| {
            warn!(
                stored = self.search_radius_km,
                "stored search radius is not finite; using default"
            );
            SearchRadius::default()
        });

        SavedProfile {
            telegram_id: UserId(self.telegram_id),
            photo_url: non_blank(self.photo_url.as_deref()),
            profile: ProfileDraft {
                name: self.name,
                gender: Gender::from_wire(self.gender.as_deref()),
                age,
                about: non_blank(self.about.as_deref()),
                preferred_location: non_blank(self.preferred_location.as_deref()),
                search_radius_km,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProfileLoadState {
    #[default]
    NotStarted,
    Loading,
    Loaded,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveBlocked {
    InFlight,
    Invalid(ValidationError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileStore {
    draft: ProfileDraft,
    saved: Option<SavedProfile>,
    in_flight: Option<SavedProfile>,
    load_state: ProfileLoadState,
    dirty: bool,
}

impl ProfileStore {
    #[must_use]
    pub const fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    #[must_use]
    pub const fn saved(&self) -> Option<&SavedProfile> {
        self.saved.as_ref()
    }

    #[must_use]
    pub const fn load_state(&self) -> ProfileLoadState {
        self.load_state
    }

    #[must_use]
    pub const fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the user has edited the draft since it was last loaded or saved.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Prefills the form with the resolved display name.
    pub fn seed(&mut self, identity: &UserIdentity) {
        if self.draft.name.trim().is_empty() {
            self.draft.name.clone_from(&identity.display_name);
        }
    }

    /// The only way the form changes. Rejected patches leave the draft as is.
    pub fn apply_patch(&mut self, patch: &ProfilePatch) -> Result<(), ValidationError> {
        if patch.is_empty() {
            return Ok(());
        }
        self.draft = patch.apply_to(&self.draft)?;
        self.dirty = true;
        Ok(())
    }

    pub fn begin_load(&mut self) {
        self.load_state = ProfileLoadState::Loading;
    }

    /// Records the stored profile and returns its radius for the live search.
    /// Edits made while the load was in flight are kept. A load that lands
    /// after a save was started or confirmed is stale and changes nothing
    /// but the load state.
    pub fn apply_loaded(&mut self, record: ProfileRecord) -> Option<SearchRadius> {
        if self.is_saving() || self.saved.is_some() {
            warn!("discarding profile load that arrived after a save");
            self.load_state = ProfileLoadState::Loaded;
            return None;
        }

        let saved = record.into_saved();
        if !self.dirty {
            self.draft = saved.profile.clone();
        }
        let radius = saved.profile.search_radius_km;
        self.saved = Some(saved);
        self.load_state = ProfileLoadState::Loaded;
        Some(radius)
    }

    pub fn mark_not_found(&mut self) {
        self.load_state = ProfileLoadState::NotFound;
    }

    /// Validates the draft and marks a save as in flight.
    pub fn begin_save(&mut self, identity: &UserIdentity) -> Result<ProfileRecord, SaveBlocked> {
        if self.is_saving() {
            return Err(SaveBlocked::InFlight);
        }
        if self.draft.name.trim().is_empty() {
            return Err(SaveBlocked::Invalid(ValidationError::EmptyName));
        }

        let record = ProfileRecord::compose(identity, &self.draft);
        let mut submitted = self.draft.clone();
        submitted.name.clone_from(&record.name);
        self.in_flight = Some(SavedProfile {
            telegram_id: identity.id,
            photo_url: identity.photo_url.clone(),
            profile: submitted,
        });
        Ok(record)
    }

    /// The server accepted the in-flight save.
    pub fn finish_save(&mut self) -> Option<&SavedProfile> {
        let submitted = self.in_flight.take()?;
        self.dirty = false;
        self.saved = Some(submitted);
        self.saved.as_ref()
    }

    /// The save failed; the draft stays as the user left it.
    pub fn fail_save(&mut self) {
        self.in_flight = None;
    }
}
