use chrono::{Local, Offset, Timelike};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::capabilities::realtime::RealtimeMessage;
use crate::config::BackendConfig;
use crate::model::{Report, Theme, User};

// --- Session token: redacts Debug, only ever exposed as a bearer header ---

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn into_secret(self) -> SecretString {
        SecretString::new(self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(ReportId);
typed_id!(UserId);

// Table primary keys come back as either bigint or uuid depending on the schema.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Uint(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::Uint(n) => n.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ReportId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
    }
}

// --- Local clock reading supplied by the shell ---

/// Wall-clock reading taken on the device. When the shell sends none the core
/// reads the hour itself and formats timestamps with the device zone rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalClock {
    pub hour: u32,
    pub utc_offset_secs: i32,
}

impl LocalClock {
    #[must_use]
    pub fn new(hour: u32, utc_offset_secs: i32) -> Self {
        Self {
            hour,
            utc_offset_secs,
        }
    }

    #[must_use]
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            hour: now.hour(),
            utc_offset_secs: now.offset().fix().local_minus_utc(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum Event {
    // Lifecycle
    ScreenMounted {
        config: BackendConfig,
        session: Option<SessionToken>,
        clock: Option<LocalClock>,
        #[serde(default)]
        theme: Theme,
    },
    ScreenUnmounted,
    SessionChanged {
        session: Option<SessionToken>,
    },

    // List
    PullToRefresh,
    ReportPressed {
        id: ReportId,
    },

    // Settings menu
    MenuOpened,
    MenuDismissed,
    ManualRefreshRequested,
    ThemeToggled,

    // New report form
    NewReportFormOpened,
    NewReportFormClosed,
    DraftChanged(String),
    CreateReportSubmitted,

    // Capability responses, never sent by the shell
    #[serde(skip)]
    UserFetched {
        generation: u64,
        result: Box<crux_http::Result<crux_http::Response<User>>>,
    },
    #[serde(skip)]
    ReportsFetched {
        generation: u64,
        result: Box<crux_http::Result<crux_http::Response<Vec<Report>>>>,
    },
    #[serde(skip)]
    ReportCreated {
        generation: u64,
        result: Box<crux_http::Result<crux_http::Response<Vec<u8>>>>,
    },
    #[serde(skip)]
    ReportsChanged {
        generation: u64,
        message: RealtimeMessage,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ScreenMounted { .. } => "screen_mounted",
            Self::ScreenUnmounted => "screen_unmounted",
            Self::SessionChanged { .. } => "session_changed",
            Self::PullToRefresh => "pull_to_refresh",
            Self::ReportPressed { .. } => "report_pressed",
            Self::MenuOpened => "menu_opened",
            Self::MenuDismissed => "menu_dismissed",
            Self::ManualRefreshRequested => "manual_refresh_requested",
            Self::ThemeToggled => "theme_toggled",
            Self::NewReportFormOpened => "new_report_form_opened",
            Self::NewReportFormClosed => "new_report_form_closed",
            Self::DraftChanged(_) => "draft_changed",
            Self::CreateReportSubmitted => "create_report_submitted",
            Self::UserFetched { .. } => "user_fetched",
            Self::ReportsFetched { .. } => "reports_fetched",
            Self::ReportCreated { .. } => "report_created",
            Self::ReportsChanged { .. } => "reports_changed",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::PullToRefresh
                | Self::ReportPressed { .. }
                | Self::MenuOpened
                | Self::MenuDismissed
                | Self::ManualRefreshRequested
                | Self::ThemeToggled
                | Self::NewReportFormOpened
                | Self::NewReportFormClosed
                | Self::CreateReportSubmitted
        )
    }
}
