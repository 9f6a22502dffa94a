pub mod navigate;
pub mod realtime;

pub use self::navigate::{Navigate, NavigateOperation};
pub use self::realtime::{
    ChangeFilter, ChangeKind, ChannelSpec, Realtime, RealtimeError, RealtimeMessage,
    RealtimeOperation,
};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::event::Event;
// The Effect derive refers to `App` by name.
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub navigate: Navigate<Event>,
    pub realtime: Realtime<Event>,
    pub render: Render<Event>,
}
