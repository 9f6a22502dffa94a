use serde::{Deserialize, Serialize};

use crate::event::ReportId;
use crate::model::{format_report_timestamp, Model, Report, Theme};
use crate::REPORT_PREVIEW_LINES;

pub const LOADING_MESSAGE: &str = "Raporlar yükleniyor...";
pub const DEFAULT_DISPLAY_NAME: &str = "Kullanıcı";
pub const HEADER_SUBTITLE: &str = "Yapay Zeka Raporlarınız Hazır";
pub const REFRESH_LABEL: &str = "Raporları Yenile";
pub const LIGHT_THEME_LABEL: &str = "Açık Tema";
pub const DARK_THEME_LABEL: &str = "Koyu Tema";
pub const DRAFT_PLACEHOLDER: &str = "Rapor İçeriği";
pub const SUBMIT_LABEL: &str = "Rapor Oluştur";
pub const EMPTY_TITLE: &str = "Henüz Rapor Yok";
pub const EMPTY_ICON_SIZE: u8 = 48;
pub const EMPTY_DESCRIPTION: &str = "Yeni raporunuz geldiğinde ana sayfada görüntülenecektir";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    More,
    Refreshing,
    Sun,
    Moon,
    FileText,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderView {
    pub greeting: String,
    pub display_name: String,
    pub subtitle: String,
    pub settings_icon: Icon,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuView {
    pub visible: bool,
    pub refresh_label: String,
    pub is_manual_refreshing: bool,
    pub refresh_enabled: bool,
    pub theme_label: String,
    pub theme_icon: Icon,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormView {
    pub draft: String,
    pub placeholder: String,
    pub submit_label: String,
    pub is_creating: bool,
    pub submit_enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportCard {
    pub id: ReportId,
    pub icon: Icon,
    pub content: String,
    pub max_lines: u8,
    pub timestamp: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmptyStateView {
    pub icon: Icon,
    pub icon_size: u8,
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReportListView {
    Empty(EmptyStateView),
    Items(Vec<ReportCard>),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadyView {
    pub header: HeaderView,
    pub menu: MenuView,
    /// `None` while the form is hidden.
    pub form: Option<FormView>,
    pub list: ReportListView,
    pub is_pull_refreshing: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreenView {
    Loading { message: String },
    Ready(ReadyView),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub theme: Theme,
    pub screen: ScreenView,
    pub error: Option<String>,
}

fn header(model: &Model) -> HeaderView {
    let display_name = model
        .user
        .as_ref()
        .and_then(|u| u.display_name())
        .unwrap_or(DEFAULT_DISPLAY_NAME);

    HeaderView {
        greeting: model.greeting.map(|g| g.headline()).unwrap_or_default(),
        display_name: display_name.to_string(),
        subtitle: HEADER_SUBTITLE.to_string(),
        settings_icon: if model.fetch_state.is_manual_refreshing() {
            Icon::Refreshing
        } else {
            Icon::More
        },
    }
}

fn menu(model: &Model) -> MenuView {
    let manual = model.fetch_state.is_manual_refreshing();
    // The item offers the theme you'd switch to.
    let (theme_label, theme_icon) = if model.theme.is_dark() {
        (LIGHT_THEME_LABEL, Icon::Sun)
    } else {
        (DARK_THEME_LABEL, Icon::Moon)
    };

    MenuView {
        visible: model.menu_visible,
        refresh_label: REFRESH_LABEL.to_string(),
        is_manual_refreshing: manual,
        refresh_enabled: !manual,
        theme_label: theme_label.to_string(),
        theme_icon,
    }
}

fn form(model: &Model) -> Option<FormView> {
    model.form_visible.then(|| FormView {
        draft: model.draft.clone(),
        placeholder: DRAFT_PLACEHOLDER.to_string(),
        submit_label: SUBMIT_LABEL.to_string(),
        is_creating: model.creating,
        submit_enabled: !model.creating,
    })
}

fn card(report: &Report, utc_offset_secs: Option<i32>) -> ReportCard {
    ReportCard {
        id: report.id.clone(),
        icon: Icon::FileText,
        content: report.report.clone(),
        max_lines: REPORT_PREVIEW_LINES,
        timestamp: format_report_timestamp(&report.created_at, utc_offset_secs),
    }
}

fn list(model: &Model) -> ReportListView {
    if model.reports.is_empty() {
        return ReportListView::Empty(EmptyStateView {
            icon: Icon::FileText,
            icon_size: EMPTY_ICON_SIZE,
            title: EMPTY_TITLE.to_string(),
            description: EMPTY_DESCRIPTION.to_string(),
        });
    }

    ReportListView::Items(
        model
            .reports
            .iter()
            .map(|r| card(r, model.utc_offset_secs))
            .collect(),
    )
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    let screen = if model.fetch_state.is_loading() {
        ScreenView::Loading {
            message: LOADING_MESSAGE.to_string(),
        }
    } else {
        ScreenView::Ready(ReadyView {
            header: header(model),
            menu: menu(model),
            form: form(model),
            list: list(model),
            is_pull_refreshing: model.fetch_state.is_pull_refreshing(),
        })
    };

    ViewModel {
        theme: model.theme,
        screen,
        error: model.error.map(crate::ScreenError::message),
    }
}
