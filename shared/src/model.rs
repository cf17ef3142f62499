use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::catalogue::Catalogue;
use crate::config::AppConfig;
use crate::interest::InterestTracker;
use crate::navigation::Navigator;
use crate::profile::ProfileStore;
use crate::search::SearchController;
use crate::{
    AppError, ValidatedCoordinate, ValidationError, DEFAULT_RADIUS_KM, MAX_RADIUS_KM,
    MIN_RADIUS_KM, RADIUS_STEP_KM,
};

// --- Typed IDs ---

/// Telegram user id as issued by the host platform.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl UserId {
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StationId(pub String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a listing. The server id wins; the source URL is only used
/// when the listing carries no id. Built exclusively by [`ListingKey::from_parts`]
/// so liked-state lookups never disagree about which key a listing has.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListingKey {
    Id(String),
    SourceUrl(String),
}

impl ListingKey {
    #[must_use]
    pub fn from_parts(id: Option<&str>, source_url: Option<&str>) -> Option<Self> {
        let non_blank = |s: &&str| !s.trim().is_empty();
        id.filter(non_blank)
            .map(|id| Self::Id(id.to_string()))
            .or_else(|| {
                source_url
                    .filter(non_blank)
                    .map(|url| Self::SourceUrl(url.to_string()))
            })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Id(s) | Self::SourceUrl(s) => s,
        }
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Identity ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub display_name: String,
    pub username: Option<String>,
    pub photo_url: Option<String>,
}

// --- Search radius: validated, on the 0.5 km grid ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, PartialOrd)]
#[serde(try_from = "f64", into = "f64")]
pub struct SearchRadius(f64);

impl SearchRadius {
    /// Strict constructor for form input: rejects non-finite and out-of-range
    /// values, snaps the rest onto the step grid.
    pub fn new(km: f64) -> Result<Self, ValidationError> {
        if !km.is_finite() {
            return Err(ValidationError::RadiusNotFinite);
        }
        if !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&km) {
            return Err(ValidationError::RadiusOutOfRange(km));
        }
        Ok(Self::snap(km))
    }

    /// Lenient constructor for slider input and stored values: clamps into
    /// range. `None` only for NaN/infinite input.
    #[must_use]
    pub fn clamped(km: f64) -> Option<Self> {
        km.is_finite()
            .then(|| Self::snap(km.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM)))
    }

    fn snap(km: f64) -> Self {
        let snapped = (km / RADIUS_STEP_KM).round() * RADIUS_STEP_KM;
        Self(snapped.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM))
    }

    #[must_use]
    pub const fn km(self) -> f64 {
        self.0
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn meters(self) -> u32 {
        (self.0 * 1000.0).round() as u32
    }

    /// Wire form of the `radius_km` query parameter.
    #[must_use]
    pub fn query_value(self) -> String {
        format!("{:.1}", self.0)
    }

    /// Every selectable radius, smallest first.
    pub fn all() -> impl Iterator<Item = Self> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = ((MAX_RADIUS_KM - MIN_RADIUS_KM) / RADIUS_STEP_KM).round() as u32;
        (0..=steps).map(|i| Self(MIN_RADIUS_KM + f64::from(i) * RADIUS_STEP_KM))
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(DEFAULT_RADIUS_KM)
    }
}

impl TryFrom<f64> for SearchRadius {
    type Error = ValidationError;

    fn try_from(km: f64) -> Result<Self, Self::Error> {
        Self::new(km)
    }
}

impl From<SearchRadius> for f64 {
    fn from(radius: SearchRadius) -> Self {
        radius.0
    }
}

impl fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} km", self.0)
    }
}

// --- Profile ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unset,
}

impl Gender {
    #[must_use]
    pub const fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::Male => Some("male"),
            Self::Female => Some("female"),
            Self::Unset => None,
        }
    }

    #[must_use]
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("male") => Self::Male,
            Some(v) if v.eq_ignore_ascii_case("female") => Self::Female,
            _ => Self::Unset,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub gender: Gender,
    pub age: Option<u8>,
    pub about: Option<String>,
    pub preferred_location: Option<String>,
    pub search_radius_km: SearchRadius,
}

/// The last profile the server accepted (or returned on load).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavedProfile {
    pub telegram_id: UserId,
    pub photo_url: Option<String>,
    pub profile: ProfileDraft,
}

// --- Stations & listings ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub name_en: Option<String>,
    pub line: String,
    pub line_color: String,
    pub coordinates: ValidatedCoordinate,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Listing {
    pub key: ListingKey,
    pub title: String,
    pub price: Option<f64>,
    pub address: String,
    pub area: Option<f64>,
    pub rooms: Option<u32>,
    pub distance_to_center_km: Option<f64>,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub coordinates: ValidatedCoordinate,
}

/// Listings liked during this session. Grows only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct LikedSet {
    keys: HashSet<ListingKey>,
}

impl LikedSet {
    #[must_use]
    pub fn contains(&self, key: &ListingKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns `false` when the key was already present.
    pub fn insert(&mut self, key: ListingKey) -> bool {
        self.keys.insert(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RevealedContact {
    pub listing_key: ListingKey,
    pub contact_info: Option<String>,
    pub source_url: Option<String>,
}

// --- Application state ---

/// Session state shared by every screen. Components own their slice and
/// expose the only operations allowed to change it.
#[derive(Debug, Default)]
pub struct Model {
    pub config: AppConfig,
    pub launched: bool,
    pub identity: Option<UserIdentity>,
    pub host_backed: bool,
    pub profile: ProfileStore,
    pub catalogue: Catalogue,
    pub search: SearchController,
    pub interest: InterestTracker,
    pub navigator: Navigator,
    pub active_error: Option<AppError>,
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    #[must_use]
    pub fn selected_station(&self) -> Option<&Station> {
        self.search
            .selected()
            .and_then(|id| self.catalogue.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod radius_tests {
        use super::*;

        #[test]
        fn test_strict_radius_bounds() {
            assert_eq!(SearchRadius::new(0.5).unwrap().km(), 0.5);
            assert_eq!(SearchRadius::new(10.0).unwrap().km(), 10.0);
            assert!(matches!(
                SearchRadius::new(0.4),
                Err(ValidationError::RadiusOutOfRange(_))
            ));
            assert!(matches!(
                SearchRadius::new(10.5),
                Err(ValidationError::RadiusOutOfRange(_))
            ));
            assert!(matches!(
                SearchRadius::new(f64::NAN),
                Err(ValidationError::RadiusNotFinite)
            ));
        }

        #[test]
        fn test_radius_snaps_to_grid() {
            assert_eq!(SearchRadius::new(2.3).unwrap().km(), 2.5);
            assert_eq!(SearchRadius::new(2.2).unwrap().km(), 2.0);
            assert_eq!(SearchRadius::new(9.9).unwrap().km(), 10.0);
        }

        #[test]
        fn test_clamped_radius() {
            assert_eq!(SearchRadius::clamped(0.0).unwrap().km(), 0.5);
            assert_eq!(SearchRadius::clamped(42.0).unwrap().km(), 10.0);
            assert!(SearchRadius::clamped(f64::INFINITY).is_none());
        }

        #[test]
        fn test_all_radius_values() {
            let all: Vec<f64> = SearchRadius::all().map(SearchRadius::km).collect();
            assert_eq!(all.len(), 20);
            assert_eq!(all.first(), Some(&0.5));
            assert_eq!(all.last(), Some(&10.0));
        }

        #[test]
        fn test_radius_wire_forms() {
            let r = SearchRadius::new(2.0).unwrap();
            assert_eq!(r.query_value(), "2.0");
            assert_eq!(r.meters(), 2000);
            assert_eq!(serde_json::to_string(&r).unwrap(), "2.0");
            assert!(serde_json::from_str::<SearchRadius>("11.0").is_err());
        }
    }

    mod listing_key_tests {
        use super::*;

        #[test]
        fn test_id_takes_precedence() {
            let key = ListingKey::from_parts(Some("p1"), Some("https://cian.ru/rent/flat/1/"));
            assert_eq!(key, Some(ListingKey::Id("p1".into())));
        }

        #[test]
        fn test_source_url_fallback() {
            let key = ListingKey::from_parts(None, Some("https://cian.ru/rent/flat/1/"));
            assert_eq!(
                key,
                Some(ListingKey::SourceUrl("https://cian.ru/rent/flat/1/".into()))
            );

            let blank_id = ListingKey::from_parts(Some("  "), Some("https://cian.ru/x/"));
            assert_eq!(blank_id, Some(ListingKey::SourceUrl("https://cian.ru/x/".into())));
        }

        #[test]
        fn test_no_key() {
            assert_eq!(ListingKey::from_parts(None, None), None);
            assert_eq!(ListingKey::from_parts(Some(""), Some("")), None);
        }

        #[test]
        fn test_id_and_url_keys_never_collide() {
            let by_id = ListingKey::Id("same".into());
            let by_url = ListingKey::SourceUrl("same".into());
            let mut liked = LikedSet::default();
            liked.insert(by_id.clone());
            assert!(liked.contains(&by_id));
            assert!(!liked.contains(&by_url));
        }
    }

    #[test]
    fn test_liked_set_is_monotonic_and_deduplicated() {
        let mut liked = LikedSet::default();
        assert!(liked.insert(ListingKey::Id("p1".into())));
        assert!(!liked.insert(ListingKey::Id("p1".into())));
        assert_eq!(liked.len(), 1);
    }

    #[test]
    fn test_gender_wire_mapping() {
        assert_eq!(Gender::from_wire(Some("male")), Gender::Male);
        assert_eq!(Gender::from_wire(Some("Female")), Gender::Female);
        assert_eq!(Gender::from_wire(Some("other")), Gender::Unset);
        assert_eq!(Gender::from_wire(None), Gender::Unset);
        assert_eq!(Gender::Unset.as_wire(), None);
        assert_eq!(Gender::Male.as_wire(), Some("male"));
    }
}
