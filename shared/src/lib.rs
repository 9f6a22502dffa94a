// lib.rs - Report list screen core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;
pub mod config;
pub mod event;
pub mod model;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{Backend, BackendConfig, ConfigError};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::{Event, LocalClock, ReportId, SessionToken};
pub use model::{FetchState, Greeting, Model, Report, Theme, User};
pub use view::ViewModel;

pub const REPORTS_TABLE: &str = "Reports";
pub const REPORTS_CHANNEL: &str = "reports_channel";
pub const REALTIME_SCHEMA: &str = "public";
pub const PLACEHOLDER_REPORT_TITLE: &str = "Untitled Report";
pub const REPORT_ROUTE_PREFIX: &str = "/report/";
pub const REPORT_PREVIEW_LINES: u8 = 3;
pub const REPORT_TIMESTAMP_FORMAT: &str = "%d %B, %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Serialization,
    Deserialization,
    Configuration,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Conflict | Self::RateLimited => {
                ErrorSeverity::Transient
            }

            Self::Serialization | Self::Deserialization | Self::Configuration | Self::Internal => {
                ErrorSeverity::Fatal
            }

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }
}

/// Diagnostic error carried into the logs. Users never see these messages;
/// see [`ScreenError`] for what the screen shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
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
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            408 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        // PostgREST and GoTrue both put the human readable part in `message`.
        let message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(kind, message).with_context("http_status", status.to_string())
    }

    #[must_use]
    pub fn from_http(error: &crux_http::Error) -> Self {
        match error {
            crux_http::Error::Http(e) => {
                Self::from_http_status(u16::from(e.code), e.body.as_deref())
            }
            crux_http::Error::Json(msg) => {
                Self::new(ErrorKind::Deserialization, "Malformed response body").with_internal(msg)
            }
            crux_http::Error::Url(msg) => {
                Self::new(ErrorKind::Configuration, "Invalid request URL").with_internal(msg)
            }
            crux_http::Error::Io(msg) => {
                Self::new(ErrorKind::Network, "Network error").with_internal(msg)
            }
            crux_http::Error::Timeout => Self::new(ErrorKind::Timeout, "Request timed out"),
        }
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

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::Configuration, e.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default, alias = "msg", alias = "error_description")]
    message: String,
}

/// The inline error line shown on the screen. Every backend failure of an
/// operation collapses into that operation's single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ScreenError {
    #[error("Raporlar yüklenirken bir hata oluştu.")]
    ReportsLoadFailed,
    #[error("Rapor oluşturulurken bir hata oluştu")]
    ReportCreateFailed,
    #[error("Lütfen rapor içeriği giriniz")]
    EmptyDraft,
}

impl ScreenError {
    #[must_use]
    pub fn message(self) -> String {
        self.to_string()
    }
}

pub mod app {
    use super::*;
    use crate::capabilities::realtime::{ChannelSpec, RealtimeMessage};
    use crate::capabilities::Capabilities;
    use crate::model::{NewReport, SubscriptionState};
    use crux_http::http::Method;
    use secrecy::ExposeSecret;

    #[derive(Default)]
    pub struct App;

    impl App {
        fn bearer(model: &Model, backend: &Backend) -> String {
            let token = model
                .session
                .as_ref()
                .map_or_else(|| backend.anon_key.expose_secret(), |s| s.expose_secret());
            format!("Bearer {token}")
        }

        fn authorized(
            model: &Model,
            backend: &Backend,
            builder: crux_http::RequestBuilder<Event>,
        ) -> crux_http::RequestBuilder<Event> {
            builder
                .header("apikey", backend.anon_key.expose_secret().as_str())
                .header("Authorization", Self::bearer(model, backend))
        }

        /// Always leaves the screen out of any loading state once the
        /// response lands, whatever triggered the fetch.
        fn fetch_reports(model: &mut Model, caps: &Capabilities) {
            let Some(backend) = model.backend.as_ref() else {
                tracing::error!("reports fetch requested without a backend");
                model.error = Some(ScreenError::ReportsLoadFailed);
                model.fetch_state = FetchState::Idle;
                return;
            };

            let generation = model.generation;
            let builder = caps.http.request(Method::Get, backend.reports_url.clone());

            Self::authorized(model, backend, builder)
                .expect_json::<Vec<Report>>()
                .send(move |result| Event::ReportsFetched {
                    generation,
                    result: Box::new(result),
                });
        }

        fn fetch_user(model: &Model, caps: &Capabilities) {
            let Some(backend) = model.backend.as_ref() else {
                return;
            };

            let generation = model.generation;
            let builder = caps.http.request(Method::Get, backend.user_url.clone());

            Self::authorized(model, backend, builder)
                .expect_json::<User>()
                .send(move |result| Event::UserFetched {
                    generation,
                    result: Box::new(result),
                });
        }

        fn send_create_report(model: &mut Model, caps: &Capabilities, content: String) {
            let Some(backend) = model.backend.as_ref() else {
                tracing::error!("report creation requested without a backend");
                model.creating = false;
                model.error = Some(ScreenError::ReportCreateFailed);
                return;
            };

            let payload = NewReport {
                title: PLACEHOLDER_REPORT_TITLE.to_string(),
                report: content,
            };

            let generation = model.generation;
            let builder = caps
                .http
                .request(Method::Post, backend.reports_url_for_insert.clone())
                .header("Prefer", "return=representation");

            match Self::authorized(model, backend, builder).body_json(&payload) {
                // The inserted row is not read back; the list is re-fetched.
                Ok(builder) => builder.send(move |result| Event::ReportCreated {
                    generation,
                    result: Box::new(result),
                }),
                Err(e) => {
                    let err = AppError::from_http(&e);
                    tracing::error!(code = err.code(), %err, "failed to encode new report");
                    model.creating = false;
                    model.error = Some(ScreenError::ReportCreateFailed);
                }
            }
        }

        fn open_subscription(model: &mut Model, caps: &Capabilities) {
            Self::close_subscription(model, caps);

            let generation = model.generation;
            let spec = ChannelSpec::all_changes(REPORTS_CHANNEL, REALTIME_SCHEMA, REPORTS_TABLE);
            model.subscription = SubscriptionState::Pending {
                channel: spec.channel.clone(),
            };

            caps.realtime.subscribe(spec, move |message| Event::ReportsChanged {
                generation,
                message,
            });
        }

        fn close_subscription(model: &mut Model, caps: &Capabilities) {
            match std::mem::take(&mut model.subscription) {
                SubscriptionState::Open { channel }
                | SubscriptionState::Pending { channel }
                | SubscriptionState::Ended { channel } => {
                    tracing::info!(%channel, "closing change subscription");
                    caps.realtime.unsubscribe(channel);
                }
                SubscriptionState::Closed => {}
            }
        }

        fn is_stale(model: &Model, generation: u64) -> bool {
            !model.mounted || generation != model.generation
        }

        fn handle_reports_fetched(
            model: &mut Model,
            result: crux_http::Result<crux_http::Response<Vec<Report>>>,
        ) {
            match result {
                Ok(mut response) => {
                    model.reports = response.take_body().unwrap_or_default();
                    model.error = None;
                    tracing::debug!(count = model.reports.len(), "reports fetched");
                }
                Err(e) => {
                    let err = AppError::from_http(&e);
                    tracing::error!(code = err.code(), %err, "error fetching reports");
                    model.error = Some(ScreenError::ReportsLoadFailed);
                }
            }

            model.fetch_state = FetchState::Idle;
        }

        fn handle_report_created(
            model: &mut Model,
            caps: &Capabilities,
            result: &crux_http::Result<crux_http::Response<Vec<u8>>>,
        ) {
            model.creating = false;

            match result {
                Ok(_) => {
                    tracing::info!("report created");
                    model.draft.clear();
                    model.form_visible = false;
                    Self::fetch_reports(model, caps);
                }
                Err(e) => {
                    let err = AppError::from_http(e);
                    tracing::error!(code = err.code(), %err, "error creating report");
                    model.error = Some(ScreenError::ReportCreateFailed);
                }
            }
        }

        fn handle_realtime_message(model: &mut Model, caps: &Capabilities, message: RealtimeMessage) {
            match message {
                RealtimeMessage::Subscribed => {
                    if let SubscriptionState::Pending { channel } = &model.subscription {
                        tracing::info!(%channel, "change subscription open");
                        model.subscription = SubscriptionState::Open {
                            channel: channel.clone(),
                        };
                    }
                }
                RealtimeMessage::Change(kind) => {
                    tracing::debug!(?kind, "reports changed, refetching");
                    Self::fetch_reports(model, caps);
                }
                RealtimeMessage::Closed => {
                    tracing::info!("change subscription closed by backend");
                    // Still torn down on unmount; the shell may hold channel state.
                    if let SubscriptionState::Open { channel } | SubscriptionState::Pending { channel } =
                        std::mem::take(&mut model.subscription)
                    {
                        model.subscription = SubscriptionState::Ended { channel };
                    }
                }
                RealtimeMessage::Error(e) => {
                    tracing::warn!(error = %e, "change subscription error");
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
                tracing::debug!(event = event_name, "user action");
            } else {
                tracing::trace!(event = event_name, "update");
            }

            match event {
                Event::ScreenMounted {
                    config,
                    session,
                    clock,
                    theme,
                } => {
                    // Each mount starts from a fresh screen; only the
                    // generation carries over so earlier responses stay stale.
                    Self::close_subscription(model, caps);
                    *model = Model {
                        generation: model.generation + 1,
                        mounted: true,
                        greeting: Some(Greeting::for_hour(
                            clock.map_or_else(|| LocalClock::now().hour, |c| c.hour),
                        )),
                        utc_offset_secs: clock.map(|c| c.utc_offset_secs),
                        theme,
                        session: session.map(SessionToken::into_secret),
                        fetch_state: FetchState::LoadingInitial,
                        ..Model::default()
                    };

                    match config.validate() {
                        Ok(backend) => {
                            tracing::info!(host = backend.host(), "report screen mounted");
                            model.backend = Some(backend);
                            Self::fetch_user(model, caps);
                            Self::fetch_reports(model, caps);
                            Self::open_subscription(model, caps);
                        }
                        Err(e) => {
                            let err = AppError::from(e);
                            tracing::error!(code = err.code(), %err, "invalid backend configuration");
                            model.error = Some(ScreenError::ReportsLoadFailed);
                            model.fetch_state = FetchState::Idle;
                        }
                    }

                    caps.render.render();
                }

                Event::ScreenUnmounted => {
                    Self::close_subscription(model, caps);
                    if model.mounted {
                        model.mounted = false;
                        model.generation += 1;
                    }
                }

                Event::SessionChanged { session } => {
                    model.session = session.map(SessionToken::into_secret);
                }

                Event::PullToRefresh => {
                    model.fetch_state = FetchState::LoadingPull;
                    model.error = None;
                    Self::fetch_reports(model, caps);
                    caps.render.render();
                }

                Event::MenuOpened => {
                    model.menu_visible = true;
                    caps.render.render();
                }

                Event::MenuDismissed => {
                    model.menu_visible = false;
                    caps.render.render();
                }

                Event::ManualRefreshRequested => {
                    if model.fetch_state == FetchState::LoadingManual {
                        return;
                    }
                    model.fetch_state = FetchState::LoadingManual;
                    model.menu_visible = false;
                    Self::fetch_reports(model, caps);
                    caps.render.render();
                }

                Event::ThemeToggled => {
                    model.theme = model.theme.toggled();
                    model.menu_visible = false;
                    caps.render.render();
                }

                Event::NewReportFormOpened => {
                    model.form_visible = true;
                    caps.render.render();
                }

                Event::NewReportFormClosed => {
                    model.form_visible = false;
                    caps.render.render();
                }

                Event::DraftChanged(text) => {
                    model.draft = text;
                    caps.render.render();
                }

                Event::CreateReportSubmitted => {
                    if model.creating {
                        return;
                    }

                    let content = model.draft.trim();
                    if content.is_empty() {
                        model.error = Some(ScreenError::EmptyDraft);
                        caps.render.render();
                        return;
                    }

                    let content = content.to_string();
                    model.creating = true;
                    model.error = None;
                    Self::send_create_report(model, caps, content);
                    caps.render.render();
                }

                Event::ReportPressed { id } => {
                    caps.navigate.push(format!("{REPORT_ROUTE_PREFIX}{id}"));
                }

                Event::UserFetched { generation, result } => {
                    if Self::is_stale(model, generation) {
                        tracing::debug!(generation, "dropping stale user response");
                        return;
                    }

                    match *result {
                        Ok(mut response) => {
                            if let Some(user) = response.take_body() {
                                model.user = Some(user);
                            }
                        }
                        Err(e) => {
                            let err = AppError::from_http(&e);
                            tracing::warn!(code = err.code(), %err, "error fetching user");
                        }
                    }

                    caps.render.render();
                }

                Event::ReportsFetched { generation, result } => {
                    if Self::is_stale(model, generation) {
                        tracing::debug!(generation, "dropping stale reports response");
                        return;
                    }

                    Self::handle_reports_fetched(model, *result);
                    caps.render.render();
                }

                Event::ReportCreated { generation, result } => {
                    if Self::is_stale(model, generation) {
                        tracing::debug!(generation, "dropping stale create response");
                        return;
                    }

                    Self::handle_report_created(model, caps, &result);
                    caps.render.render();
                }

                Event::ReportsChanged {
                    generation,
                    message,
                } => {
                    if Self::is_stale(model, generation) {
                        return;
                    }

                    Self::handle_realtime_message(model, caps, message);
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            view::build(model)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod error_tests {
        use super::*;

        #[test]
        fn test_app_error_new() {
            let error = AppError::new(ErrorKind::Network, "offline");

            assert_eq!(error.kind, ErrorKind::Network);
            assert_eq!(error.severity, ErrorSeverity::Transient);
            assert_eq!(error.code(), "NETWORK_ERROR");
            assert!(error.internal_message.is_none());
        }

        #[test]
        fn test_app_error_display_includes_internal() {
            let error = AppError::new(ErrorKind::Timeout, "slow").with_internal("after 30s");
            assert_eq!(error.to_string(), "[TIMEOUT] slow (internal: after 30s)");
        }

        #[test]
        fn test_app_error_from_http_status() {
            let error = AppError::from_http_status(401, None);
            assert_eq!(error.kind, ErrorKind::Authentication);
            assert_eq!(error.message, "HTTP error: 401");
            assert_eq!(error.context.get("http_status").map(String::as_str), Some("401"));

            let error = AppError::from_http_status(503, None);
            assert_eq!(error.kind, ErrorKind::Internal);
            assert_eq!(error.severity, ErrorSeverity::Fatal);

            let error = AppError::from_http_status(418, None);
            assert_eq!(error.kind, ErrorKind::Unknown);
        }

        #[test]
        fn test_app_error_reads_backend_message() {
            let body = br#"{"code":"42501","message":"permission denied for table Reports"}"#;
            let error = AppError::from_http_status(403, Some(body));

            assert_eq!(error.kind, ErrorKind::Authorization);
            assert_eq!(error.message, "permission denied for table Reports");

            let body = br#"{"msg":"invalid JWT"}"#;
            let error = AppError::from_http_status(401, Some(body));
            assert_eq!(error.message, "invalid JWT");
        }

        #[test]
        fn test_app_error_from_crux_http() {
            let error = AppError::from_http(&crux_http::Error::Io("connection reset".into()));
            assert_eq!(error.kind, ErrorKind::Network);
            assert_eq!(error.internal_message.as_deref(), Some("connection reset"));

            let error = AppError::from_http(&crux_http::Error::Timeout);
            assert_eq!(error.kind, ErrorKind::Timeout);

            let error = AppError::from_http(&crux_http::Error::Json("expected `[`".into()));
            assert_eq!(error.kind, ErrorKind::Deserialization);
        }

        #[test]
        fn test_config_error_is_fatal() {
            let error = AppError::from(ConfigError::MissingAnonKey);
            assert_eq!(error.kind, ErrorKind::Configuration);
            assert_eq!(error.severity, ErrorSeverity::Fatal);
        }
    }

    mod screen_error_tests {
        use super::*;

        #[test]
        fn test_screen_error_messages() {
            assert_eq!(
                ScreenError::ReportsLoadFailed.message(),
                "Raporlar yüklenirken bir hata oluştu."
            );
            assert_eq!(
                ScreenError::ReportCreateFailed.message(),
                "Rapor oluşturulurken bir hata oluştu"
            );
            assert_eq!(ScreenError::EmptyDraft.message(), "Lütfen rapor içeriği giriniz");
        }
    }
}
