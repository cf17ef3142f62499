mod http;

pub use self::http::{ApiBaseUrl, RequestId, MAX_URL_LENGTH, REQUEST_ID_HEADER};

pub use crux_core::render::Render;
pub use crux_http::Http;

// The Effect derive expands to code that names the app type.
#[allow(unused_imports)]
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
