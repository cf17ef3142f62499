// lib.rs - Metro housing search session core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod catalogue;
pub mod config;
pub mod event;
pub mod identity;
pub mod interest;
pub mod model;
pub mod navigation;
pub mod profile;
pub mod search;
pub mod view;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::AppConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::{Event, LaunchContext};
pub use model::Model;
pub use navigation::ActiveView;
pub use view::ViewModel;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8001";
pub const API_BASE_URL_ENV: &str = "HOUSING_API_BASE_URL";

pub const DEFAULT_RADIUS_KM: f64 = 2.0;
pub const MIN_RADIUS_KM: f64 = 0.5;
pub const MAX_RADIUS_KM: f64 = 10.0;
pub const RADIUS_STEP_KM: f64 = 0.5;
pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 100;

/// Moscow city centre, used to frame the map before a station is picked.
pub const DEFAULT_MAP_CENTER_LAT: f64 = 55.7558;
pub const DEFAULT_MAP_CENTER_LON: f64 = 37.6176;
pub const DEFAULT_MAP_ZOOM: f64 = 11.0;
pub const FALLBACK_ZOOM: f64 = 12.0;
pub const DESCRIPTION_PREVIEW_LENGTH: usize = 80;
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const RADIUS_ZOOM_MAP: &[(u32, f64)] = &[
    (500, 16.0),
    (1000, 15.0),
    (2000, 14.0),
    (5000, 13.0),
    (10000, 12.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Validation,
    NotFound,
    Forbidden,
    Server,
    Deserialization,
    Configuration,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Server => "SERVER_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Failures that come from the transport or the remote service rather
    /// than from user input.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::Server)
    }

    #[must_use]
    pub const fn http_status_hint(self) -> Option<u16> {
        match self {
            Self::Validation => Some(400),
            Self::Forbidden => Some(403),
            Self::NotFound => Some(404),
            Self::Timeout => Some(408),
            Self::Server => Some(500),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Forbidden => "You don't have permission to perform this action.".into(),
            ErrorKind::Server => {
                "The server is unavailable right now. Please try again later.".into()
            }
            ErrorKind::Deserialization => {
                "The server sent an unexpected response. Please try again later.".into()
            }
            ErrorKind::Configuration => {
                "The app is misconfigured. Please contact support.".into()
            }
            ErrorKind::Unknown => "Something went wrong. Please try again.".into(),
        }
    }

    /// Maps a failed `crux_http` request onto the error taxonomy.
    #[must_use]
    pub fn from_http_error(error: &crux_http::HttpError) -> Self {
        match error {
            crux_http::HttpError::Http { code, .. } => {
                Self::from_http_status(u16::from(*code), &error.to_string())
            }
            crux_http::HttpError::Json(msg) => {
                Self::new(ErrorKind::Deserialization, "Malformed response").with_internal(msg)
            }
            other => Self::new(ErrorKind::Network, "Network error").with_internal(other.to_string()),
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, message: &str) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        };

        Self::new(kind, format!("HTTP error: {status}"))
            .with_internal(message)
            .with_context("http_status", status.to_string())
    }

    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        self.context.get("http_status").and_then(|s| s.parse().ok())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Please enter your name")]
    EmptyName,
    #[error("Age must be a whole number, got '{0}'")]
    AgeNotANumber(String),
    #[error("Age must be between {} and {}, got {0}", MIN_AGE, MAX_AGE)]
    AgeOutOfRange(i64),
    #[error("Search radius must be a finite number")]
    RadiusNotFinite,
    #[error("Search radius must be between {} and {} km, got {0}", MIN_RADIUS_KM, MAX_RADIUS_KM)]
    RadiusOutOfRange(f64),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, "Invalid configuration").with_internal(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
    #[error("Expected a GeoJSON Point with [lon, lat], got {0}")]
    NotAPoint(String),
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// Why a station or listing from the API was left out.
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    #[error("record is not a valid document: {0}")]
    Malformed(String),
    #[error("record has no id")]
    MissingId,
    #[error("record has no name")]
    MissingName,
    #[error("record has no location")]
    MissingLocation,
    #[error(transparent)]
    Location(#[from] CoordinateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatedCoordinate {
    lat: f64,
    lon: f64,
}

impl ValidatedCoordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Reads a GeoJSON point, whose positions are ordered `[lon, lat]`.
    pub fn from_geometry(geometry: &geojson::Geometry) -> Result<Self, CoordinateError> {
        match &geometry.value {
            geojson::Value::Point(position) if position.len() >= 2 => {
                Self::new(position[1], position[0])
            }
            geojson::Value::Point(_) => Err(CoordinateError::NotAPoint("short Point".into())),
            geojson::Value::MultiPoint(_) => Err(CoordinateError::NotAPoint("MultiPoint".into())),
            geojson::Value::LineString(_) => Err(CoordinateError::NotAPoint("LineString".into())),
            geojson::Value::MultiLineString(_) => {
                Err(CoordinateError::NotAPoint("MultiLineString".into()))
            }
            geojson::Value::Polygon(_) => Err(CoordinateError::NotAPoint("Polygon".into())),
            geojson::Value::MultiPolygon(_) => Err(CoordinateError::NotAPoint("MultiPolygon".into())),
            geojson::Value::GeometryCollection(_) => {
                Err(CoordinateError::NotAPoint("GeometryCollection".into()))
            }
        }
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    /// `(lon, lat)`, the order stations and listings are exchanged in.
    #[must_use]
    pub const fn lon_lat(self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        haversine_distance(self, other)
    }
}

impl Default for ValidatedCoordinate {
    fn default() -> Self {
        Self {
            lat: DEFAULT_MAP_CENTER_LAT,
            lon: DEFAULT_MAP_CENTER_LON,
        }
    }
}

// --- Lenient wire decoding ---
//
// Server documents are loosely typed. A field of the wrong type reads as
// absent so it costs only that field, never the record or the list.

pub(crate) fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

pub(crate) fn lenient_opt_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(value.filter(|v: &f64| v.is_finite()))
}

pub(crate) fn lenient_u32<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[must_use]
pub fn haversine_distance(p1: ValidatedCoordinate, p2: ValidatedCoordinate) -> f64 {
    const EPSILON: f64 = 1e-10;

    if (p1.lat - p2.lat).abs() < EPSILON && (p1.lon - p2.lon).abs() < EPSILON {
        return 0.0;
    }

    let lat1_rad = p1.lat.to_radians();
    let lat2_rad = p2.lat.to_radians();
    let delta_lat = (p2.lat - p1.lat).to_radians();
    let delta_lon = (p2.lon - p1.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);

    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().asin();

    let result = EARTH_RADIUS_M * c;

    if result.is_finite() {
        result
    } else {
        f64::MAX
    }
}

#[must_use]
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters < 0.0 {
        return "Unknown".to_string();
    }

    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else if meters < 10_000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{:.0} km", meters / 1000.0)
    }
}

/// Monthly rent in roubles grouped by thousands, e.g. `85 000 ₽/мес`.
#[must_use]
pub fn format_price(price: f64) -> String {
    if !price.is_finite() || price < 0.0 {
        return "Price on request".to_string();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = price.round() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    format!("{grouped} ₽/мес")
}

#[must_use]
pub fn zoom_for_radius(radius_m: u32) -> f64 {
    RADIUS_ZOOM_MAP
        .iter()
        .find(|(r, _)| *r >= radius_m)
        .map_or(FALLBACK_ZOOM, |(_, z)| *z)
}

/// Cuts `text` at a char boundary and appends an ellipsis when it was longer.
#[must_use]
pub fn preview_text(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_len).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod coordinate_tests {
        use super::*;

        #[test]
        fn test_valid_coordinates() {
            assert!(ValidatedCoordinate::new(0.0, 0.0).is_ok());
            assert!(ValidatedCoordinate::new(90.0, 180.0).is_ok());
            assert!(ValidatedCoordinate::new(55.75, 37.60).is_ok());
        }

        #[test]
        fn test_invalid_coordinates() {
            assert!(matches!(
                ValidatedCoordinate::new(91.0, 0.0),
                Err(CoordinateError::LatitudeOutOfRange(_))
            ));
            assert!(matches!(
                ValidatedCoordinate::new(0.0, -181.0),
                Err(CoordinateError::LongitudeOutOfRange(_))
            ));
            assert!(matches!(
                ValidatedCoordinate::new(f64::NAN, 0.0),
                Err(CoordinateError::NonFinite)
            ));
        }

        #[test]
        fn test_geojson_point_is_lon_lat() {
            let geometry = geojson::Geometry::new(geojson::Value::Point(vec![37.60, 55.75]));
            let coord = ValidatedCoordinate::from_geometry(&geometry).unwrap();
            assert_eq!(coord.lat(), 55.75);
            assert_eq!(coord.lon(), 37.60);
            assert_eq!(coord.lon_lat(), (37.60, 55.75));
        }

        #[test]
        fn test_geojson_non_point_rejected() {
            let geometry = geojson::Geometry::new(geojson::Value::LineString(vec![
                vec![37.0, 55.0],
                vec![37.1, 55.1],
            ]));
            assert!(matches!(
                ValidatedCoordinate::from_geometry(&geometry),
                Err(CoordinateError::NotAPoint(_))
            ));
        }
    }

    mod distance_tests {
        use super::*;

        #[test]
        fn test_same_point_distance() {
            let p = ValidatedCoordinate::new(55.75, 37.60).unwrap();
            assert_eq!(haversine_distance(p, p), 0.0);
        }

        #[test]
        fn test_adjacent_stations_distance() {
            // Okhotny Ryad -> Teatralnaya, roughly 300 m apart.
            let a = ValidatedCoordinate::new(55.7573, 37.6155).unwrap();
            let b = ValidatedCoordinate::new(55.7581, 37.6201).unwrap();
            let d = haversine_distance(a, b);
            assert!((200.0..400.0).contains(&d), "got {d}");
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_format_distance() {
            assert_eq!(format_distance(0.0), "0 m");
            assert_eq!(format_distance(999.0), "999 m");
            assert_eq!(format_distance(1500.0), "1.5 km");
            assert_eq!(format_distance(15000.0), "15 km");
            assert_eq!(format_distance(f64::NAN), "Unknown");
            assert_eq!(format_distance(-1.0), "Unknown");
        }

        #[test]
        fn test_format_price() {
            assert_eq!(format_price(50000.0), "50 000 ₽/мес");
            assert_eq!(format_price(120_000.0), "120 000 ₽/мес");
            assert_eq!(format_price(999.0), "999 ₽/мес");
            assert_eq!(format_price(1_500_000.0), "1 500 000 ₽/мес");
            assert_eq!(format_price(f64::NAN), "Price on request");
        }

        #[test]
        fn test_zoom_for_radius() {
            assert_eq!(zoom_for_radius(500), 16.0);
            assert_eq!(zoom_for_radius(2000), 14.0);
            assert_eq!(zoom_for_radius(2500), 13.0);
            assert_eq!(zoom_for_radius(10000), 12.0);
            assert_eq!(zoom_for_radius(50000), FALLBACK_ZOOM);
        }

        #[test]
        fn test_preview_text() {
            assert_eq!(preview_text("  short  ", 10), "short");
            assert_eq!(preview_text("Уютная квартира в центре", 6), "Уютная…");
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_status_mapping() {
            assert_eq!(AppError::from_http_status(404, "").kind, ErrorKind::NotFound);
            assert_eq!(AppError::from_http_status(403, "").kind, ErrorKind::Forbidden);
            assert_eq!(AppError::from_http_status(503, "").kind, ErrorKind::Server);
            assert_eq!(AppError::from_http_status(418, "").kind, ErrorKind::Unknown);
            assert_eq!(AppError::from_http_status(500, "").http_status(), Some(500));
        }

        #[test]
        fn test_validation_message_is_user_facing() {
            let error: AppError = ValidationError::EmptyName.into();
            assert_eq!(error.kind, ErrorKind::Validation);
            assert_eq!(error.user_facing_message(), "Please enter your name");
        }

        #[test]
        fn test_display_includes_internal() {
            let error = AppError::new(ErrorKind::Network, "Network error").with_internal("refused");
            assert_eq!(error.to_string(), "[NETWORK_ERROR] Network error (internal: refused)");
        }

        #[test]
        fn test_transient_kinds() {
            assert!(ErrorKind::Network.is_transient());
            assert!(ErrorKind::Server.is_transient());
            assert!(!ErrorKind::Validation.is_transient());
            assert_eq!(ErrorKind::NotFound.http_status_hint(), Some(404));
        }
    }
}
