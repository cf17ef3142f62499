use tracing::{debug, error, info, trace, warn};

use crate::capabilities::{Capabilities, RequestId, REQUEST_ID_HEADER};
use crate::config::AppConfig;
use crate::event::{ApiAck, ApiResult, Event, LaunchContext, RawList};
use crate::identity::resolve_identity;
use crate::interest::{ContactRecord, LikeDecision, LikeRequest};
use crate::model::{ListingKey, Model, SearchRadius, StationId, UserIdentity};
use crate::navigation::ActiveView;
use crate::profile::{ProfilePatch, ProfileRecord, SaveBlocked};
use crate::search::SearchOutcome;
use crate::view::{self, UserFacingError, ViewModel, ViewState};
use crate::{AppError, ErrorKind};

#[derive(Default)]
pub struct App;

impl App {
    // --- Session ---

    fn handle_launch(context: LaunchContext, model: &mut Model, caps: &Capabilities) {
        if model.launched {
            warn!("session already launched; ignoring repeated launch");
            return;
        }
        model.launched = true;

        model.config = AppConfig::from_env();
        if let Err(error) = model.config.apply_override(context.api_base_url.as_deref()) {
            let error = AppError::from(error);
            error!(%error, "ignoring API base URL override");
        }
        info!(api_base_url = %model.config.api_base_url, "session starting");

        let resolved = resolve_identity(context.host.as_ref());
        model.profile.seed(&resolved.identity);
        model.host_backed = resolved.host_backed;
        model.identity = Some(resolved.identity.clone());

        if model.catalogue.begin_load() {
            Self::send_stations_request(model, caps);
        }

        model.profile.begin_load();
        Self::send_profile_load(&resolved.identity, model, caps);
    }

    /// Collapses a write acknowledgement into success or a user-facing error.
    fn ack(result: ApiResult<ApiAck>) -> Result<(), AppError> {
        let mut response = result.map_err(|e| AppError::from_http_error(&e))?;
        match response.take_body() {
            Some(ApiAck {
                success: false,
                message,
                ..
            }) => Err(AppError::new(ErrorKind::Server, "Request was not accepted")
                .with_internal(message.unwrap_or_default())),
            _ => Ok(()),
        }
    }

    // --- Catalogue ---

    fn send_stations_request(model: &Model, caps: &Capabilities) {
        let url = model.config.api_base_url.metro_stations();
        let request_id = RequestId::new();
        debug!(%request_id, %url, "loading station catalogue");

        caps.http
            .get(url)
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .expect_json::<RawList>()
            .send(|result| Event::StationsLoaded(Box::new(result)));
    }

    fn handle_stations_loaded(result: ApiResult<RawList>, model: &mut Model) {
        match result {
            Ok(mut response) => {
                let records = response.take_body().unwrap_or_default();
                let load = model.catalogue.load(records);
                info!(kept = load.kept, dropped = load.dropped, "station catalogue loaded");
            }
            Err(e) => {
                let error = AppError::from_http_error(&e);
                warn!(%error, "station catalogue unavailable");
                model.catalogue.fail();
            }
        }
    }

    // --- Profile ---

    fn send_profile_load(identity: &UserIdentity, model: &Model, caps: &Capabilities) {
        let url = model.config.api_base_url.profile(identity.id);
        let request_id = RequestId::new();
        debug!(%request_id, user_id = %identity.id, "loading saved profile");

        caps.http
            .get(url)
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .expect_json::<ProfileRecord>()
            .send(|result| Event::ProfileLoaded(Box::new(result)));
    }

    fn handle_profile_loaded(result: ApiResult<ProfileRecord>, model: &mut Model) {
        match result {
            Ok(mut response) => match response.take_body() {
                Some(record) => {
                    let Some(radius) = model.profile.apply_loaded(record) else {
                        return;
                    };
                    model.search.seed_radius(radius);
                    info!(radius_km = radius.km(), "saved profile loaded");
                    if model.navigator.on_existing_profile() {
                        debug!("returning user; showing map");
                    }
                }
                None => {
                    warn!("profile response had no body");
                    model.profile.mark_not_found();
                }
            },
            Err(e) => {
                let error = AppError::from_http_error(&e);
                if error.is_not_found() {
                    info!("no saved profile yet");
                } else {
                    warn!(%error, "profile load failed; starting with a fresh draft");
                }
                model.profile.mark_not_found();
            }
        }
    }

    fn handle_profile_edited(patch: &ProfilePatch, model: &mut Model) {
        if let Err(error) = model.profile.apply_patch(patch) {
            debug!(%error, "profile edit rejected");
            model.set_error(error.into());
        }
    }

    fn handle_profile_submitted(model: &mut Model, caps: &Capabilities) {
        let Some(identity) = model.identity.clone() else {
            warn!("profile submitted before identity was resolved");
            return;
        };

        let record = match model.profile.begin_save(&identity) {
            Ok(record) => record,
            Err(SaveBlocked::InFlight) => {
                debug!("profile save already in flight");
                return;
            }
            Err(SaveBlocked::Invalid(error)) => {
                info!(%error, "profile save blocked");
                model.set_error(error.into());
                return;
            }
        };

        let url = model.config.api_base_url.save_profile();
        let request_id = RequestId::new();
        let request = caps
            .http
            .post(url)
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .body_json(&record);

        match request {
            Ok(request) => {
                info!(%request_id, user_id = %identity.id, "saving profile");
                request
                    .expect_json::<ApiAck>()
                    .send(|result| Event::ProfileSaved(Box::new(result)));
            }
            Err(e) => {
                model.profile.fail_save();
                let error = AppError::from_http_error(&e);
                error!(%error, "could not encode profile");
                model.set_error(error);
            }
        }
    }

    fn handle_profile_saved(result: ApiResult<ApiAck>, model: &mut Model) {
        match Self::ack(result) {
            Ok(()) => {
                let radius = model
                    .profile
                    .finish_save()
                    .map(|saved| saved.profile.search_radius_km);
                if let Some(radius) = radius {
                    model.search.mirror_radius(radius);
                }
                model.navigator.show(ActiveView::Map);
                model.clear_error();
                info!("profile saved");
            }
            Err(error) => {
                model.profile.fail_save();
                error!(%error, "profile save failed");
                model.set_error(error.with_context("operation", "save_profile"));
            }
        }
    }

    // --- Search ---

    fn handle_station_selected(station_id: String, model: &mut Model, caps: &Capabilities) {
        let id = StationId::new(station_id);
        let Some(station) = model.catalogue.get(&id).cloned() else {
            warn!(station_id = %id, "unknown station selected");
            return;
        };

        let ticket = model.search.select(id);
        let generation = ticket.generation;
        let url = model
            .config
            .api_base_url
            .near_metro(&station.name, ticket.radius);
        let request_id = RequestId::new();
        info!(
            %request_id,
            station = %station.name,
            radius_km = ticket.radius.km(),
            generation,
            "searching listings"
        );

        caps.http
            .get(url)
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .expect_json::<RawList>()
            .send(move |result| Event::ListingsLoaded {
                generation,
                result: Box::new(result),
            });
    }

    fn handle_listings_loaded(
        generation: u64,
        result: ApiResult<RawList>,
        model: &mut Model,
    ) {
        let outcome = match result {
            Ok(mut response) => {
                let records = response.take_body().unwrap_or_default();
                model.search.apply_results(generation, records)
            }
            Err(e) => {
                let outcome = model.search.apply_failure(generation);
                if outcome == SearchOutcome::Failed {
                    let error = AppError::from_http_error(&e);
                    warn!(%error, generation, "listing search failed");
                }
                outcome
            }
        };

        match outcome {
            SearchOutcome::Applied { kept, dropped } => {
                info!(generation, kept, dropped, "listings updated");
            }
            SearchOutcome::Failed => {}
            SearchOutcome::Stale => debug!(
                generation,
                current = model.search.generation(),
                "discarding stale search response"
            ),
        }
    }

    fn handle_radius_changed(km: f64, model: &mut Model) {
        match SearchRadius::clamped(km) {
            Some(radius) => {
                model.search.set_radius(radius);
                debug!(radius_km = radius.km(), "search radius changed");
            }
            None => warn!(km, "ignoring non-finite search radius"),
        }
    }

    // --- Interest ---

    fn handle_listing_liked(key: ListingKey, model: &mut Model, caps: &Capabilities) {
        let Some(identity) = model.identity.clone() else {
            warn!(listing = %key, "like before identity was resolved; ignoring");
            return;
        };
        if model.search.find(&key).is_none() && !model.interest.is_liked(&key) {
            warn!(listing = %key, "like for a listing outside the current results; ignoring");
            return;
        }

        match model.interest.request_like(&key) {
            LikeDecision::Send => Self::send_like(key, &identity, model, caps),
            LikeDecision::RevealOnly => {
                debug!(listing = %key, "already liked; revealing contact again");
                Self::send_contact_request(key, &identity, model, caps);
            }
            LikeDecision::InFlight => debug!(listing = %key, "like already in flight"),
        }
    }

    fn send_like(key: ListingKey, identity: &UserIdentity, model: &mut Model, caps: &Capabilities) {
        let url = model.config.api_base_url.like(&key);
        let body = LikeRequest::new(&key, identity.id);
        let request_id = RequestId::new();
        let request = caps
            .http
            .post(url)
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .body_json(&body);

        match request {
            Ok(request) => {
                info!(%request_id, listing = %key, "liking listing");
                request
                    .expect_json::<ApiAck>()
                    .send(move |result| Event::LikeRecorded {
                        listing_key: key.clone(),
                        result: Box::new(result),
                    });
            }
            Err(e) => {
                model.interest.like_failed(&key);
                let error = AppError::from_http_error(&e);
                error!(%error, listing = %key, "could not encode like");
                model.set_error(error);
            }
        }
    }

    fn handle_like_recorded(
        key: ListingKey,
        result: ApiResult<ApiAck>,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if let Err(error) = Self::ack(result) {
            model.interest.like_failed(&key);
            error!(%error, listing = %key, "like failed");
            model.set_error(error.with_context("listing", key.as_str()));
            return;
        }

        model.interest.like_succeeded(&key);
        info!(listing = %key, liked = model.interest.liked().len(), "listing liked");

        match model.identity.clone() {
            Some(identity) => Self::send_contact_request(key, &identity, model, caps),
            None => warn!(listing = %key, "no identity for contact reveal"),
        }
    }

    fn send_contact_request(
        key: ListingKey,
        identity: &UserIdentity,
        model: &Model,
        caps: &Capabilities,
    ) {
        let url = model.config.api_base_url.contact(&key, identity.id);
        let request_id = RequestId::new();
        debug!(%request_id, listing = %key, "revealing contact");

        caps.http
            .get(url)
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .expect_json::<ContactRecord>()
            .send(move |result| Event::ContactRevealed {
                listing_key: key.clone(),
                result: Box::new(result),
            });
    }

    fn handle_contact_revealed(key: &ListingKey, result: ApiResult<ContactRecord>, model: &mut Model) {
        match result {
            Ok(mut response) => {
                let record = response.take_body().unwrap_or_default();
                model.interest.contact_revealed(key, record);
                info!(listing = %key, "contact revealed");
            }
            Err(e) => {
                let error = AppError::from_http_error(&e).with_context("listing", key.as_str());
                error!(%error, "contact reveal failed");
                model.set_error(error);
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_user_initiated() {
            debug!(event = event_name, "user action");
        } else {
            trace!(event = event_name, "event");
        }

        match event {
            Event::Noop => return,

            Event::Launched(context) => Self::handle_launch(*context, model, caps),

            Event::NavigateTo { view } => {
                if model.navigator.navigate(view) {
                    debug!(view = view.name(), "navigated");
                }
            }

            Event::DismissError => model.clear_error(),

            Event::ProfileEdited(patch) => Self::handle_profile_edited(&patch, model),

            Event::ProfileSubmitted => Self::handle_profile_submitted(model, caps),

            Event::StationSelected { station_id } => {
                Self::handle_station_selected(station_id, model, caps);
            }

            Event::StationDeselected => {
                model.search.deselect();
                debug!("station deselected");
            }

            Event::RadiusChanged { km } => Self::handle_radius_changed(km, model),

            Event::ListingLiked { listing_key } => {
                Self::handle_listing_liked(listing_key, model, caps);
            }

            Event::DismissContact => model.interest.dismiss_notice(),

            Event::StationsLoaded(result) => Self::handle_stations_loaded(*result, model),

            Event::ProfileLoaded(result) => Self::handle_profile_loaded(*result, model),

            Event::ProfileSaved(result) => Self::handle_profile_saved(*result, model),

            Event::ListingsLoaded { generation, result } => {
                Self::handle_listings_loaded(generation, *result, model);
            }

            Event::LikeRecorded {
                listing_key,
                result,
            } => Self::handle_like_recorded(listing_key, *result, model, caps),

            Event::ContactRevealed {
                listing_key,
                result,
            } => Self::handle_contact_revealed(&listing_key, *result, model),
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        let active_view = model.navigator.active();

        let state = if model.launched {
            match active_view {
                ActiveView::Profile => view::profile_state(model),
                ActiveView::Map => view::map_state(model),
                ActiveView::Settings => view::settings_state(model),
            }
        } else {
            ViewState::Loading {
                message: Some("Starting…".into()),
            }
        };

        ViewModel {
            active_view,
            state,
            user: view::user_view(model),
            error: model.active_error.as_ref().map(UserFacingError::from),
            contact: view::contact_view(model),
        }
    }
}
