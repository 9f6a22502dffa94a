use chrono::{DateTime, FixedOffset, Local, Locale, Offset, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Backend;
use crate::event::{ReportId, UserId};
use crate::{ScreenError, REPORT_TIMESTAMP_FORMAT};

/// A row of the `Reports` table.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: ReportId,
    pub report: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
}

// Report bodies are user content; keep them out of logs.
impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("id", &self.id)
            .field("report_len", &self.report.len())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Insert payload for a new report.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NewReport {
    pub title: String,
    pub report: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserMetadata {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// The signed-in identity. Only the display name is shown.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl User {
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}

/// Which fetch, if any, the screen is waiting on. The last trigger owns the
/// state; any completion returns it to `Idle`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    #[default]
    LoadingInitial,
    LoadingPull,
    LoadingManual,
}

impl FetchState {
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::LoadingInitial)
    }

    #[must_use]
    pub const fn is_pull_refreshing(self) -> bool {
        matches!(self, Self::LoadingPull)
    }

    #[must_use]
    pub const fn is_manual_refreshing(self) -> bool {
        matches!(self, Self::LoadingManual)
    }

    #[must_use]
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Greeting {
    Morning,
    Afternoon,
    Evening,
}

impl Greeting {
    /// `[5, 12)` morning, `[12, 18)` afternoon, everything else evening.
    #[must_use]
    pub const fn for_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Morning => "Günaydın",
            Self::Afternoon => "İyi Günler",
            Self::Evening => "İyi Akşamlar",
        }
    }

    #[must_use]
    pub fn headline(self) -> String {
        format!("{},", self.label())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubscriptionState {
    #[default]
    Closed,
    Pending {
        channel: String,
    },
    Open {
        channel: String,
    },
    /// The backend closed the channel but this mount has not torn it down yet.
    Ended {
        channel: String,
    },
}

impl SubscriptionState {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending { .. } | Self::Open { .. })
    }
}

/// Screen state. Runtime only, never persisted: it holds the session token.
#[derive(Default)]
pub struct Model {
    pub backend: Option<Backend>,
    pub session: Option<SecretString>,

    // List
    pub reports: Vec<Report>,
    pub fetch_state: FetchState,
    pub error: Option<ScreenError>,

    // Overlays
    pub menu_visible: bool,
    pub form_visible: bool,
    pub draft: String,
    pub creating: bool,

    // Header
    pub greeting: Option<Greeting>,
    pub user: Option<User>,
    pub theme: Theme,
    /// Fixed offset reported by the shell. `None` means device zone rules.
    pub utc_offset_secs: Option<i32>,

    // Lifecycle
    pub subscription: SubscriptionState,
    pub generation: u64,
    pub mounted: bool,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("backend", &self.backend.as_ref().map(Backend::host))
            .field("session_present", &self.session.is_some())
            .field("reports", &self.reports.len())
            .field("fetch_state", &self.fetch_state)
            .field("error", &self.error)
            .field("menu_visible", &self.menu_visible)
            .field("form_visible", &self.form_visible)
            .field("creating", &self.creating)
            .field("theme", &self.theme)
            .field("subscription", &self.subscription)
            .field("generation", &self.generation)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

/// `dd MMMM, HH:mm` in Turkish. Without a fixed offset each timestamp is
/// converted with the device zone rules at its own instant, so DST shifts
/// between reports are honoured.
#[must_use]
pub fn format_report_timestamp(
    created_at: &DateTime<Utc>,
    utc_offset_secs: Option<i32>,
) -> String {
    match utc_offset_secs {
        Some(secs) => {
            let offset = FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix());
            created_at
                .with_timezone(&offset)
                .format_localized(REPORT_TIMESTAMP_FORMAT, Locale::tr_TR)
                .to_string()
        }
        None => created_at
            .with_timezone(&Local)
            .format_localized(REPORT_TIMESTAMP_FORMAT, Locale::tr_TR)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_greeting_examples() {
        assert_eq!(Greeting::for_hour(9).headline(), "Günaydın,");
        assert_eq!(Greeting::for_hour(14).headline(), "İyi Günler,");
        assert_eq!(Greeting::for_hour(20).headline(), "İyi Akşamlar,");
    }

    #[test]
    fn test_greeting_band_edges() {
        assert_eq!(Greeting::for_hour(4), Greeting::Evening);
        assert_eq!(Greeting::for_hour(5), Greeting::Morning);
        assert_eq!(Greeting::for_hour(11), Greeting::Morning);
        assert_eq!(Greeting::for_hour(12), Greeting::Afternoon);
        assert_eq!(Greeting::for_hour(17), Greeting::Afternoon);
        assert_eq!(Greeting::for_hour(18), Greeting::Evening);
        assert_eq!(Greeting::for_hour(0), Greeting::Evening);
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }

    #[test]
    fn test_fetch_state_flags() {
        assert!(FetchState::LoadingInitial.is_loading());
        assert!(FetchState::LoadingPull.is_pull_refreshing());
        assert!(FetchState::LoadingManual.is_manual_refreshing());

        let idle = FetchState::Idle;
        assert!(!idle.is_loading() && !idle.is_pull_refreshing() && !idle.is_manual_refreshing());
        assert!(!idle.is_busy());
    }

    #[test]
    fn test_report_from_backend_row() {
        let json = r#"{
            "id": 7,
            "report": "Gece vardiyası özeti",
            "created_at": "2024-03-05T11:07:00.123456+00:00",
            "title": "Untitled Report",
            "user_id": "ignored"
        }"#;

        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.id, ReportId::new("7"));
        assert_eq!(report.title.as_deref(), Some("Untitled Report"));
        assert!(!format!("{report:?}").contains("vardiya"));
    }

    #[test]
    fn test_user_display_name() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","email":"a@b.c","user_metadata":{"display_name":"Ayşe"}}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), Some("Ayşe"));

        let user: User = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert_eq!(user.display_name(), None);

        let user: User =
            serde_json::from_str(r#"{"id":"u1","user_metadata":{"display_name":"  "}}"#).unwrap();
        assert_eq!(user.display_name(), None);
    }

    #[test]
    fn test_format_report_timestamp() {
        let created = at("2024-03-05T11:07:00Z");

        assert_eq!(format_report_timestamp(&created, Some(3 * 3600)), "05 Mart, 14:07");
        assert_eq!(format_report_timestamp(&created, Some(0)), "05 Mart, 11:07");
    }

    #[test]
    fn test_format_report_timestamp_crosses_day() {
        let created = at("2024-08-31T22:30:00Z");
        assert_eq!(format_report_timestamp(&created, Some(3 * 3600)), "01 Eylül, 01:30");
    }

    #[test]
    fn test_format_report_timestamp_bad_offset_falls_back_to_utc() {
        let created = at("2024-01-15T08:00:00Z");
        assert_eq!(format_report_timestamp(&created, Some(200_000)), "15 Ocak, 08:00");
    }

    #[test]
    fn test_format_report_timestamp_uses_device_rules_per_instant() {
        for created in [at("2024-01-15T08:00:00Z"), at("2024-07-15T08:00:00Z")] {
            let expected = created
                .with_timezone(&Local)
                .format_localized(REPORT_TIMESTAMP_FORMAT, Locale::tr_TR)
                .to_string();
            assert_eq!(format_report_timestamp(&created, None), expected);
        }
    }

    #[test]
    fn test_subscription_ended_is_not_active() {
        let ended = SubscriptionState::Ended {
            channel: "reports_channel".into(),
        };
        assert!(!ended.is_active());
        assert!(SubscriptionState::Pending {
            channel: "reports_channel".into()
        }
        .is_active());
    }

    proptest! {
        #[test]
        fn greeting_partition_covers_every_hour(hour in 0u32..24) {
            let expected = if (5..12).contains(&hour) {
                Greeting::Morning
            } else if (12..18).contains(&hour) {
                Greeting::Afternoon
            } else {
                Greeting::Evening
            };
            prop_assert_eq!(Greeting::for_hour(hour), expected);
            prop_assert!(Greeting::for_hour(hour).headline().ends_with(','));
        }
    }
}
