//! Station selection and the listing search it drives.
//!
//! Searches may overlap. Each one is stamped with a generation number and only
//! the response for the newest generation is allowed to touch state.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{Listing, ListingKey, SearchRadius, StationId};
use crate::{
    lenient_f64, lenient_opt_text, lenient_text, lenient_u32, RecordError, ValidatedCoordinate,
};

/// Listing document as returned by `GET /api/properties/near-metro`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ListingRecord {
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub source_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    /// Text such as "договорная" reads as no price.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub area: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub rooms: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub description: Option<String>,
    /// Kilometres from the searched station, computed server-side.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_to_center: Option<f64>,
    #[serde(default)]
    pub location: Option<geojson::Geometry>,
}

impl ListingRecord {
    /// Decodes one element of the search results on its own.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RecordError> {
        serde_json::from_value(value).map_err(|e| RecordError::Malformed(e.to_string()))
    }
}

impl TryFrom<ListingRecord> for Listing {
    type Error = RecordError;

    fn try_from(record: ListingRecord) -> Result<Self, Self::Error> {
        let key = ListingKey::from_parts(record.id.as_deref(), record.source_url.as_deref())
            .ok_or(RecordError::MissingId)?;
        let geometry = record.location.as_ref().ok_or(RecordError::MissingLocation)?;
        let coordinates = ValidatedCoordinate::from_geometry(geometry)?;

        Ok(Self {
            key,
            title: record.title,
            price: record.price.filter(|p| p.is_finite() && *p >= 0.0),
            address: record.address,
            area: record.area.filter(|a| a.is_finite() && *a > 0.0),
            rooms: record.rooms,
            distance_to_center_km: record
                .distance_to_center
                .filter(|d| d.is_finite() && *d >= 0.0),
            description: record.description.filter(|d| !d.trim().is_empty()),
            source_url: record.source_url.filter(|u| !u.trim().is_empty()),
            coordinates,
        })
    }
}

/// Issued when a search starts; the response must present it back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchTicket {
    pub generation: u64,
    pub radius: SearchRadius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Applied { kept: usize, dropped: usize },
    Failed,
    /// A newer search was issued after this one; nothing changed.
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchController {
    selected: Option<StationId>,
    radius: SearchRadius,
    radius_touched: bool,
    listings: Vec<Listing>,
    is_loading: bool,
    generation: u64,
}

impl SearchController {
    #[must_use]
    pub const fn selected(&self) -> Option<&StationId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub const fn radius(&self) -> SearchRadius {
        self.radius
    }

    #[must_use]
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    #[must_use]
    pub fn find(&self, key: &ListingKey) -> Option<&Listing> {
        self.listings.iter().find(|l| &l.key == key)
    }

    /// Selects a station and starts a new search generation.
    pub fn select(&mut self, station: StationId) -> SearchTicket {
        self.generation += 1;
        self.selected = Some(station);
        self.is_loading = true;
        SearchTicket {
            generation: self.generation,
            radius: self.radius,
        }
    }

    /// Clears the selection and orphans any search still in flight.
    pub fn deselect(&mut self) {
        self.generation += 1;
        self.selected = None;
        self.listings.clear();
        self.is_loading = false;
    }

    /// User-driven radius change. Applies to the next search only.
    pub fn set_radius(&mut self, radius: SearchRadius) {
        self.radius = radius;
        self.radius_touched = true;
    }

    /// Adopts the stored preference unless the user already moved the slider.
    pub fn seed_radius(&mut self, radius: SearchRadius) {
        if !self.radius_touched {
            self.radius = radius;
        }
    }

    /// A saved profile always wins.
    pub fn mirror_radius(&mut self, radius: SearchRadius) {
        self.radius = radius;
    }

    /// Applies the raw result list of `generation`. Elements that do not
    /// decode into a usable listing are dropped one by one.
    pub fn apply_results(
        &mut self,
        generation: u64,
        records: Vec<serde_json::Value>,
    ) -> SearchOutcome {
        if !self.is_current(generation) {
            return SearchOutcome::Stale;
        }

        let total = records.len();
        self.listings = records
            .into_iter()
            .filter_map(|value| {
                let record = ListingRecord::from_value(value)
                    .map_err(|error| warn!(%error, "malformed listing dropped"))
                    .ok()?;
                let title = record.title.clone();
                Listing::try_from(record)
                    .map_err(|error| warn!(%error, listing = %title, "malformed listing dropped"))
                    .ok()
            })
            .collect();
        self.is_loading = false;

        SearchOutcome::Applied {
            kept: self.listings.len(),
            dropped: total - self.listings.len(),
        }
    }

    pub fn apply_failure(&mut self, generation: u64) -> SearchOutcome {
        if !self.is_current(generation) {
            return SearchOutcome::Stale;
        }
        self.listings.clear();
        self.is_loading = false;
        SearchOutcome::Failed
    }
}
