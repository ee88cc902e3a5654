pub mod http;
pub mod kv;
pub mod timer;

pub use self::http::{HttpCapability, HttpError, HttpRequest, HttpResponse, HttpResult};
pub use self::kv::{KvCapability, KvError, KvOperation, KvOutput, KvResult};
pub use self::timer::{Timer, TimerError, TimerId, TimerOperation, TimerOutput};

// Render comes from Crux as is; HTTP and key/value storage from the
// crux_http and crux_kv crates, fronted by the validation in `http`/`kv`.
pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Storage error: {0}")]
    Kv(#[from] KvError),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),
}

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub timer: Timer<Event>,
    pub render: Render<Event>,
}
