//! JSON view models: one per page of the site.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::SessionUser,
    forms::HeroForm,
    models::{BlogPost, Documentary, Notice, Podcast},
};

// --- Public ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HomeView {
    pub hero: HeroForm,
    pub recent_podcasts: Vec<Podcast>,
    /// First documentary flagged as coming soon, if any.
    pub featured_documentary: Option<Documentary>,
    pub recent_posts: Vec<BlogPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageSection {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AboutView {
    pub title: String,
    pub sections: Vec<PageSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContactView {
    pub title: String,
    pub address: Vec<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub office_hours: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PodcastsView {
    pub podcasts: Vec<Podcast>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DocumentariesView {
    pub coming_soon: Vec<Documentary>,
    pub released: Vec<Documentary>,
    /// Every tag in use, sorted and unique.
    pub all_tags: Vec<String>,
    pub selected_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BlogView {
    pub posts: Vec<BlogPost>,
    pub categories: Vec<String>,
    pub selected_category: Option<String>,
    pub search: Option<String>,
}

/// NotFoundView
///
/// Rendered for unknown paths and for detail pages whose record does not
/// exist. Never an error state: it always offers a way back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NotFoundView {
    pub title: String,
    pub message: String,
    pub back_to: String,
}

impl NotFoundView {
    pub fn page() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you are looking for might have been removed, had its name \
                      changed, or is temporarily unavailable."
                .to_string(),
            back_to: "/".to_string(),
        }
    }

    pub fn record(label: &str, back_to: &str) -> Self {
        Self {
            title: format!("{label} not found"),
            message: format!("The {} you're looking for doesn't exist.", label.to_lowercase()),
            back_to: back_to.to_string(),
        }
    }
}

// --- Auth ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginView {
    pub email: String,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetupView {
    pub email: String,
    pub message: Option<Notice>,
}

// --- Admin ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub user: SessionUser,
    pub podcasts: i64,
    pub documentaries: i64,
    pub blog_posts: i64,
    pub notices: Vec<Notice>,
}

/// Panel
///
/// The side panel of a list page. The create and edit panels share one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Panel<F> {
    Closed,
    Create { form: F },
    Edit { id: Uuid, form: F },
    ConfirmDelete { id: Uuid, title: String },
}

/// AdminPage
///
/// A list page of the admin area: every record of one kind plus the panel state.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminPage<T, F> {
    pub items: Vec<T>,
    pub panel: Panel<F>,
    /// True while a save from this visitor is in flight; the submit control is disabled.
    pub submitting: bool,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HomepageEditorView {
    pub form: HeroForm,
    /// False until the section has been saved once; the form then shows the default copy.
    pub saved: bool,
    pub submitting: bool,
    pub notices: Vec<Notice>,
}
