use serde::{Deserialize, Serialize};

use crate::catalogue::{CatalogueState, LineSummary};
use crate::model::{Gender, Listing, ListingKey, Model, ProfileDraft, SearchRadius, Station};
use crate::navigation::ActiveView;
use crate::profile::ProfileLoadState;
use crate::{
    format_distance, format_price, preview_text, zoom_for_radius, AppError,
    ValidatedCoordinate, DEFAULT_MAP_ZOOM, DESCRIPTION_PREVIEW_LENGTH, MAX_RADIUS_KM,
    MIN_RADIUS_KM, RADIUS_STEP_KM,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewState {
    Loading {
        message: Option<String>,
    },
    Profile {
        form: ProfileForm,
        is_saving: bool,
        can_submit: bool,
        is_loading_profile: bool,
        has_saved_profile: bool,
    },
    Map {
        stations: Vec<StationPin>,
        lines: Vec<LineSummary>,
        selected_station: Option<StationPin>,
        listings: Vec<ListingCard>,
        map_center_lat: f64,
        map_center_lon: f64,
        map_zoom: f64,
        radius_km: f64,
        radius_label: String,
        is_searching: bool,
        catalogue_unavailable: bool,
    },
    Settings {
        radius_km: f64,
        radius_label: String,
        min_radius_km: f64,
        max_radius_km: f64,
        step_km: f64,
        saved_radius_km: Option<f64>,
        liked_count: usize,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileForm {
    pub name: String,
    pub gender: Gender,
    pub age_text: String,
    pub about: String,
    pub preferred_location: String,
    pub search_radius_km: f64,
    pub photo_url: Option<String>,
}

impl ProfileForm {
    #[must_use]
    pub fn from_draft(draft: &ProfileDraft, photo_url: Option<String>) -> Self {
        Self {
            name: draft.name.clone(),
            gender: draft.gender,
            age_text: draft.age.map(|a| a.to_string()).unwrap_or_default(),
            about: draft.about.clone().unwrap_or_default(),
            preferred_location: draft.preferred_location.clone().unwrap_or_default(),
            search_radius_km: draft.search_radius_km.km(),
            photo_url,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StationPin {
    pub id: String,
    pub name: String,
    pub name_en: Option<String>,
    pub line: String,
    pub line_color: String,
    pub lat: f64,
    pub lon: f64,
    pub is_selected: bool,
}

impl StationPin {
    #[must_use]
    pub fn new(station: &Station, is_selected: bool) -> Self {
        Self {
            id: station.id.to_string(),
            name: station.name.clone(),
            name_en: station.name_en.clone(),
            line: station.line.clone(),
            line_color: station.line_color.clone(),
            lat: station.coordinates.lat(),
            lon: station.coordinates.lon(),
            is_selected,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ListingCard {
    pub key: ListingKey,
    pub title: String,
    pub price_label: String,
    pub address: String,
    pub area_label: Option<String>,
    pub rooms: Option<u32>,
    pub distance_label: Option<String>,
    pub description_preview: Option<String>,
    pub source_url: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub is_liked: bool,
    pub is_like_pending: bool,
    pub contact_info: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContactView {
    pub listing_key: ListingKey,
    pub listing_title: Option<String>,
    pub contact_info: Option<String>,
    pub source_url: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    pub id: i64,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub is_host_session: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.kind.is_transient(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub active_view: ActiveView,
    pub state: ViewState,
    pub user: Option<UserView>,
    pub error: Option<UserFacingError>,
    pub contact: Option<ContactView>,
}

// --- Projections ---

#[must_use]
pub fn profile_state(model: &Model) -> ViewState {
    let profile = &model.profile;
    let photo_url = model.identity.as_ref().and_then(|i| i.photo_url.clone());
    ViewState::Profile {
        form: ProfileForm::from_draft(profile.draft(), photo_url),
        is_saving: profile.is_saving(),
        can_submit: !profile.is_saving() && !profile.draft().name.trim().is_empty(),
        is_loading_profile: profile.load_state() == ProfileLoadState::Loading,
        has_saved_profile: profile.saved().is_some(),
    }
}

#[must_use]
pub fn map_state(model: &Model) -> ViewState {
    let selected = model.selected_station();
    let radius = model.search.radius();

    let stations = model
        .catalogue
        .stations()
        .iter()
        .map(|s| StationPin::new(s, selected.is_some_and(|sel| sel.id == s.id)))
        .collect();

    let listings = model
        .search
        .listings()
        .iter()
        .map(|l| listing_card(model, l, selected))
        .collect();

    let (center, zoom) = map_framing(selected, radius);

    ViewState::Map {
        stations,
        lines: model.catalogue.lines(),
        selected_station: selected.map(|s| StationPin::new(s, true)),
        listings,
        map_center_lat: center.lat(),
        map_center_lon: center.lon(),
        map_zoom: zoom,
        radius_km: radius.km(),
        radius_label: radius.to_string(),
        is_searching: model.search.is_loading(),
        catalogue_unavailable: model.catalogue.state() == CatalogueState::Failed,
    }
}

#[must_use]
pub fn settings_state(model: &Model) -> ViewState {
    let radius = model.search.radius();
    ViewState::Settings {
        radius_km: radius.km(),
        radius_label: radius.to_string(),
        min_radius_km: MIN_RADIUS_KM,
        max_radius_km: MAX_RADIUS_KM,
        step_km: RADIUS_STEP_KM,
        saved_radius_km: model
            .profile
            .saved()
            .map(|s| s.profile.search_radius_km.km()),
        liked_count: model.interest.liked().len(),
    }
}

/// Centre on the selected station at a zoom that fits the radius, or show
/// the whole city.
#[must_use]
pub fn map_framing(selected: Option<&Station>, radius: SearchRadius) -> (ValidatedCoordinate, f64) {
    match selected {
        Some(station) => (station.coordinates, zoom_for_radius(radius.meters())),
        None => (ValidatedCoordinate::default(), DEFAULT_MAP_ZOOM),
    }
}

#[must_use]
pub fn listing_card(model: &Model, listing: &Listing, selected: Option<&Station>) -> ListingCard {
    let distance_m = listing
        .distance_to_center_km
        .map(|km| km * 1000.0)
        .or_else(|| selected.map(|s| s.coordinates.distance_to(listing.coordinates)));

    ListingCard {
        key: listing.key.clone(),
        title: listing.title.clone(),
        price_label: listing
            .price
            .map_or_else(|| format_price(f64::NAN), format_price),
        address: listing.address.clone(),
        area_label: listing.area.map(|a| format!("{a:.0} м²")),
        rooms: listing.rooms,
        distance_label: distance_m.map(format_distance),
        description_preview: listing
            .description
            .as_deref()
            .map(|d| preview_text(d, DESCRIPTION_PREVIEW_LENGTH)),
        source_url: listing.source_url.clone(),
        lat: listing.coordinates.lat(),
        lon: listing.coordinates.lon(),
        is_liked: model.interest.is_liked(&listing.key),
        is_like_pending: model.interest.is_pending(&listing.key),
        contact_info: model
            .interest
            .contact_for(&listing.key)
            .and_then(|c| c.contact_info.clone()),
    }
}

#[must_use]
pub fn contact_view(model: &Model) -> Option<ContactView> {
    let contact = model.interest.notice()?;
    let message = match (&contact.contact_info, &contact.source_url) {
        (Some(info), _) => format!("Contact: {info}"),
        (None, Some(_)) => "Contact details are on the original listing page".to_string(),
        (None, None) => "The landlord has not shared contact details".to_string(),
    };
    Some(ContactView {
        listing_key: contact.listing_key.clone(),
        listing_title: model
            .search
            .find(&contact.listing_key)
            .map(|l| l.title.clone()),
        contact_info: contact.contact_info.clone(),
        source_url: contact.source_url.clone(),
        message,
    })
}

#[must_use]
pub fn user_view(model: &Model) -> Option<UserView> {
    model.identity.as_ref().map(|identity| UserView {
        id: identity.id.get(),
        display_name: identity.display_name.clone(),
        photo_url: identity.photo_url.clone(),
        is_host_session: model.host_backed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StationId;

    fn station() -> Station {
        Station {
            id: StationId::new("s1"),
            name: "Арбатская".into(),
            name_en: None,
            line: "Арбатско-Покровская".into(),
            line_color: "#0072BA".into(),
            coordinates: ValidatedCoordinate::new(55.7520, 37.6048).unwrap(),
        }
    }

    #[test]
    fn test_framing_without_selection_shows_city() {
        let (center, zoom) = map_framing(None, SearchRadius::default());
        assert_eq!(center, ValidatedCoordinate::default());
        assert_eq!(zoom, DEFAULT_MAP_ZOOM);
    }

    #[test]
    fn test_framing_follows_station_and_radius() {
        let s = station();
        let (center, zoom) = map_framing(Some(&s), SearchRadius::new(2.0).unwrap());
        assert_eq!(center, s.coordinates);
        assert_eq!(zoom, 14.0);

        let (_, wide) = map_framing(Some(&s), SearchRadius::new(10.0).unwrap());
        assert!(wide < zoom);
    }

    #[test]
    fn test_card_distance_falls_back_to_station() {
        let s = station();
        let mut listing = Listing {
            key: ListingKey::Id("p1".into()),
            title: "Студия".into(),
            price: None,
            address: "ул. Арбат, 1".into(),
            area: None,
            rooms: None,
            distance_to_center_km: None,
            description: None,
            source_url: None,
            coordinates: ValidatedCoordinate::new(55.7520, 37.6148).unwrap(),
        };
        let model = Model::default();

        let card = listing_card(&model, &listing, Some(&s));
        assert_eq!(card.distance_label.as_deref(), Some("626 m"));
        assert_eq!(card.price_label, "Price on request");

        listing.distance_to_center_km = Some(1.5);
        let card = listing_card(&model, &listing, Some(&s));
        assert_eq!(card.distance_label.as_deref(), Some("1.5 km"));

        listing.distance_to_center_km = None;
        assert_eq!(listing_card(&model, &listing, None).distance_label, None);
    }

    #[test]
    fn test_profile_form_renders_empty_optionals_as_blank() {
        let form = ProfileForm::from_draft(&ProfileDraft::default(), None);
        assert_eq!(form.age_text, "");
        assert_eq!(form.about, "");
        assert_eq!(form.search_radius_km, 2.0);
    }

    #[test]
    fn test_view_state_is_tagged() {
        let state = ViewState::Loading { message: None };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "loading");
    }
}
