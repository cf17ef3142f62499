use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::model::{Station, StationId};
use crate::{lenient_opt_text, lenient_text, RecordError, ValidatedCoordinate};

pub const DEFAULT_LINE_COLOR: &str = "#888888";

/// Station document as returned by `GET /api/metro-stations`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StationRecord {
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "lenient_opt_text")]
    pub object_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub name_en: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub line: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub line_color: String,
    #[serde(default)]
    pub location: Option<geojson::Geometry>,
}

impl StationRecord {
    /// Decodes one element of the station list on its own.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RecordError> {
        serde_json::from_value(value).map_err(|e| RecordError::Malformed(e.to_string()))
    }
}

impl TryFrom<StationRecord> for Station {
    type Error = RecordError;

    fn try_from(record: StationRecord) -> Result<Self, Self::Error> {
        let id = [record.id.as_deref(), record.object_id.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|id| !id.is_empty())
            .map(StationId::new)
            .ok_or(RecordError::MissingId)?;

        if record.name.trim().is_empty() {
            return Err(RecordError::MissingName);
        }

        let geometry = record.location.as_ref().ok_or(RecordError::MissingLocation)?;
        let coordinates = ValidatedCoordinate::from_geometry(geometry)?;

        let line_color = if record.line_color.trim().is_empty() {
            DEFAULT_LINE_COLOR.to_string()
        } else {
            record.line_color
        };

        Ok(Self {
            id,
            name: record.name,
            name_en: record.name_en.filter(|n| !n.trim().is_empty()),
            line: record.line,
            line_color,
            coordinates,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CatalogueState {
    #[default]
    NotRequested,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueLoad {
    pub kept: usize,
    pub dropped: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LineSummary {
    pub name: String,
    pub color: String,
    pub station_count: usize,
}

/// The metro station list, fetched once per session and read-only after.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    stations: Vec<Station>,
    state: CatalogueState,
}

impl Catalogue {
    #[must_use]
    pub const fn state(&self) -> CatalogueState {
        self.state
    }

    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &StationId) -> Option<&Station> {
        self.stations.iter().find(|s| &s.id == id)
    }

    /// Claims the single load for this session. `false` means a load was
    /// already requested and nothing should be fetched.
    pub fn begin_load(&mut self) -> bool {
        if self.state != CatalogueState::NotRequested {
            return false;
        }
        self.state = CatalogueState::Loading;
        true
    }

    /// Replaces the catalogue with the valid, de-duplicated elements of the
    /// raw station list.
    pub fn load(&mut self, records: Vec<serde_json::Value>) -> CatalogueLoad {
        let total = records.len();
        let mut seen = HashSet::with_capacity(total);
        let mut stations = Vec::with_capacity(total);

        for value in records {
            let record = match StationRecord::from_value(value) {
                Ok(record) => record,
                Err(error) => {
                    warn!(%error, "malformed station dropped");
                    continue;
                }
            };
            let name = record.name.clone();
            match Station::try_from(record) {
                Ok(station) if seen.insert(station.id.clone()) => stations.push(station),
                Ok(station) => warn!(station_id = %station.id, "duplicate station dropped"),
                Err(error) => warn!(%error, station = %name, "malformed station dropped"),
            }
        }

        self.stations = stations;
        self.state = CatalogueState::Loaded;
        CatalogueLoad {
            kept: self.stations.len(),
            dropped: total - self.stations.len(),
        }
    }

    pub fn fail(&mut self) {
        self.stations.clear();
        self.state = CatalogueState::Failed;
    }

    /// Lines in first-seen order with their colour and station count.
    #[must_use]
    pub fn lines(&self) -> Vec<LineSummary> {
        let mut lines: Vec<LineSummary> = Vec::new();
        for station in &self.stations {
            match lines.iter_mut().find(|l| l.name == station.line) {
                Some(line) => line.station_count += 1,
                None => lines.push(LineSummary {
                    name: station.line.clone(),
                    color: station.line_color.clone(),
                    station_count: 1,
                }),
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn records(json: &str) -> Vec<serde_json::Value> {
        serde_json::from_str(json).unwrap()
    }

    const STATIONS: &str = r##"[
        {
            "_id": "65f000000000000000000001",
            "id": "s1",
            "name": "Арбатская",
            "name_en": "Arbatskaya",
            "line": "Арбатско-Покровская",
            "line_color": "#0072BA",
            "location": {"type": "Point", "coordinates": [37.6048, 55.7520]}
        },
        {
            "id": "s2",
            "name": "Смоленская",
            "line": "Арбатско-Покровская",
            "line_color": "#0072BA",
            "location": {"type": "Point", "coordinates": [37.5838, 55.7477]}
        },
        {
            "id": "s3",
            "name": "Охотный Ряд",
            "line": "Сокольническая",
            "line_color": "#E42313",
            "location": {"type": "Point", "coordinates": [37.6156, 55.7570]}
        }
    ]"##;

    #[test]
    fn test_load_reads_geojson_as_lon_lat() {
        let mut catalogue = Catalogue::default();
        assert!(catalogue.begin_load());
        let load = catalogue.load(records(STATIONS));

        assert_eq!(load, CatalogueLoad { kept: 3, dropped: 0 });
        let arbat = catalogue.get(&StationId::new("s1")).unwrap();
        assert!((arbat.coordinates.lat() - 55.7520).abs() < 1e-9);
        assert!((arbat.coordinates.lon() - 37.6048).abs() < 1e-9);
        assert_eq!(arbat.name_en.as_deref(), Some("Arbatskaya"));
    }

    #[test]
    fn test_begin_load_only_once() {
        let mut catalogue = Catalogue::default();
        assert!(catalogue.begin_load());
        assert!(!catalogue.begin_load());
        catalogue.fail();
        assert!(!catalogue.begin_load());
        assert_eq!(catalogue.state(), CatalogueState::Failed);
    }

    #[test]
    fn test_falls_back_to_object_id() {
        let station = Station::try_from(StationRecord {
            id: None,
            object_id: Some("abc".into()),
            name: "Тверская".into(),
            name_en: None,
            line: "Замоскворецкая".into(),
            line_color: String::new(),
            location: Some(geojson::Geometry::new(geojson::Value::Point(vec![37.6, 55.76]))),
        })
        .unwrap();
        assert_eq!(station.id, StationId::new("abc"));
        assert_eq!(station.line_color, DEFAULT_LINE_COLOR);
    }

    #[test]
    fn test_malformed_and_duplicate_stations_dropped() {
        let json = r##"[
            {"id": "s1", "name": "A", "line": "L", "line_color": "#000",
             "location": {"type": "Point", "coordinates": [37.6, 55.7]}},
            {"id": "s1", "name": "A again", "line": "L", "line_color": "#000",
             "location": {"type": "Point", "coordinates": [37.6, 55.7]}},
            {"name": "No id", "line": "L", "line_color": "#000",
             "location": {"type": "Point", "coordinates": [37.6, 55.7]}},
            {"id": "s4", "name": "Bad lat", "line": "L", "line_color": "#000",
             "location": {"type": "Point", "coordinates": [37.6, 155.7]}},
            {"id": "s5", "name": "No location", "line": "L", "line_color": "#000"}
        ]"##;
        let mut catalogue = Catalogue::default();
        let load = catalogue.load(records(json));

        assert_eq!(load, CatalogueLoad { kept: 1, dropped: 4 });
        assert_eq!(catalogue.stations()[0].name, "A");
    }

    #[test]
    fn test_odd_elements_cost_only_themselves() {
        let json = r##"[
            {"id": 7, "name": "Числовой id", "line": null, "line_color": 42,
             "location": {"type": "Point", "coordinates": [37.6, 55.7]}},
            {"id": "s2", "name": null,
             "location": {"type": "Point", "coordinates": [37.6, 55.7]}},
            {"id": "s3", "name": "Broken geometry", "location": {"type": "Point", "coordinates": "x"}},
            "not an object",
            {"id": "s5", "name": "Киевская", "line": "Филёвская", "line_color": "#0099CC",
             "location": {"type": "Point", "coordinates": [37.5656, 55.7433]}}
        ]"##;
        let mut catalogue = Catalogue::default();
        let load = catalogue.load(records(json));

        assert_eq!(load, CatalogueLoad { kept: 2, dropped: 3 });
        let numeric = catalogue.get(&StationId::new("7")).unwrap();
        assert_eq!(numeric.line, "");
        assert_eq!(numeric.line_color, "42");
        assert!(catalogue.get(&StationId::new("s5")).is_some());
    }

    #[test]
    fn test_station_without_name_is_rejected() {
        let record = StationRecord {
            id: Some("s9".into()),
            object_id: None,
            name: "  ".into(),
            name_en: None,
            line: "L".into(),
            line_color: String::new(),
            location: Some(geojson::Geometry::new(geojson::Value::Point(vec![37.6, 55.7]))),
        };
        assert_matches!(Station::try_from(record), Err(RecordError::MissingName));
    }

    #[test]
    fn test_record_errors() {
        let record = StationRecord {
            id: Some("s9".into()),
            object_id: None,
            name: "Line".into(),
            name_en: None,
            line: "L".into(),
            line_color: "#000".into(),
            location: Some(geojson::Geometry::new(geojson::Value::LineString(vec![
                vec![37.6, 55.7],
                vec![37.7, 55.8],
            ]))),
        };
        assert_matches!(Station::try_from(record), Err(RecordError::Location(_)));
    }

    #[test]
    fn test_lines_grouped_in_first_seen_order() {
        let mut catalogue = Catalogue::default();
        catalogue.load(records(STATIONS));
        let lines = catalogue.lines();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "Арбатско-Покровская");
        assert_eq!(lines[0].station_count, 2);
        assert_eq!(lines[1].color, "#E42313");
    }
}
