//! Admin area: dashboard, one list page per content kind, and the homepage
//! editor. Everything here runs behind `require_admin`.

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    forms::{
        BlogPostForm, DocumentaryForm, FormFields, HERO_SECTION_ID, HeroForm, PodcastForm,
        Submission,
    },
    guard::AdminUser,
    models::{BlogPost, Documentary, Entity, Notice, Podcast},
    mutations::{ContentMutations, ImageUpload, MutationError},
    query::ContentQueries,
    session::CurrentSession,
    views::{AdminPage, DashboardView, HomepageEditorView, Panel},
};

/// dashboard
///
/// [Admin Route] Record counts per kind. The three counts are independent and
/// fetched concurrently.
#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 303, description = "Not signed in, redirect to login")
    )
)]
pub async fn dashboard(
    State(queries): State<ContentQueries>,
    CurrentSession(session): CurrentSession,
    AdminUser(user): AdminUser,
) -> Json<DashboardView> {
    let (podcasts, documentaries, blog_posts) = tokio::join!(
        queries.podcasts_count(),
        queries.documentaries_count(),
        queries.blog_posts_count(),
    );

    Json(DashboardView {
        user,
        podcasts,
        documentaries,
        blog_posts,
        notices: session.take_notices(),
    })
}

/// ContentResource
///
/// What the generic list-page handlers need to know about one content kind:
/// where it lives, how its form maps to records, and which query and mutation
/// calls serve it.
#[async_trait]
pub trait ContentResource: Send + Sync + 'static {
    type Record: Serialize + Send + Sync + 'static;
    type Form: Serialize + Send + Sync + 'static;

    const ENTITY: Entity;
    /// Path of the list page; submissions redirect back here.
    const PATH: &'static str;

    fn blank_form() -> Self::Form;
    fn form_from_record(record: &Self::Record) -> Self::Form;
    fn form_from_fields(fields: &FormFields) -> Self::Form;
    fn title(record: &Self::Record) -> &str;

    async fn list(queries: &ContentQueries) -> Vec<Self::Record>;
    async fn get(queries: &ContentQueries, id: Uuid) -> Option<Self::Record>;
    async fn create(
        mutations: &ContentMutations,
        form: &Self::Form,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError>;
    async fn update(
        mutations: &ContentMutations,
        id: Uuid,
        form: &Self::Form,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError>;
    async fn delete(mutations: &ContentMutations, id: Uuid) -> Result<(), MutationError>;
}

pub struct BlogAdmin;

#[async_trait]
impl ContentResource for BlogAdmin {
    type Record = BlogPost;
    type Form = BlogPostForm;

    const ENTITY: Entity = Entity::BlogPost;
    const PATH: &'static str = "/admin/blog";

    fn blank_form() -> BlogPostForm {
        BlogPostForm::blank()
    }
    fn form_from_record(record: &BlogPost) -> BlogPostForm {
        BlogPostForm::from_record(record)
    }
    fn form_from_fields(fields: &FormFields) -> BlogPostForm {
        BlogPostForm::from_fields(fields)
    }
    fn title(record: &BlogPost) -> &str {
        &record.title
    }

    async fn list(queries: &ContentQueries) -> Vec<BlogPost> {
        queries.blog_posts().await
    }
    async fn get(queries: &ContentQueries, id: Uuid) -> Option<BlogPost> {
        queries.blog_post(id).await
    }
    async fn create(
        mutations: &ContentMutations,
        form: &BlogPostForm,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError> {
        mutations.create_blog_post(form.to_input(), image).await.map(drop)
    }
    async fn update(
        mutations: &ContentMutations,
        id: Uuid,
        form: &BlogPostForm,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError> {
        mutations
            .update_blog_post(id, form.to_input(), image)
            .await
            .map(drop)
    }
    async fn delete(mutations: &ContentMutations, id: Uuid) -> Result<(), MutationError> {
        mutations.delete_blog_post(id).await
    }
}

pub struct PodcastAdmin;

#[async_trait]
impl ContentResource for PodcastAdmin {
    type Record = Podcast;
    type Form = PodcastForm;

    const ENTITY: Entity = Entity::Podcast;
    const PATH: &'static str = "/admin/podcasts";

    fn blank_form() -> PodcastForm {
        PodcastForm::blank()
    }
    fn form_from_record(record: &Podcast) -> PodcastForm {
        PodcastForm::from_record(record)
    }
    fn form_from_fields(fields: &FormFields) -> PodcastForm {
        PodcastForm::from_fields(fields)
    }
    fn title(record: &Podcast) -> &str {
        &record.title
    }

    async fn list(queries: &ContentQueries) -> Vec<Podcast> {
        queries.podcasts().await
    }
    async fn get(queries: &ContentQueries, id: Uuid) -> Option<Podcast> {
        queries.podcast(id).await
    }
    async fn create(
        mutations: &ContentMutations,
        form: &PodcastForm,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError> {
        mutations.create_podcast(form.to_input(), image).await.map(drop)
    }
    async fn update(
        mutations: &ContentMutations,
        id: Uuid,
        form: &PodcastForm,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError> {
        mutations
            .update_podcast(id, form.to_input(), image)
            .await
            .map(drop)
    }
    async fn delete(mutations: &ContentMutations, id: Uuid) -> Result<(), MutationError> {
        mutations.delete_podcast(id).await
    }
}

pub struct DocumentaryAdmin;

#[async_trait]
impl ContentResource for DocumentaryAdmin {
    type Record = Documentary;
    type Form = DocumentaryForm;

    const ENTITY: Entity = Entity::Documentary;
    const PATH: &'static str = "/admin/documentaries";

    fn blank_form() -> DocumentaryForm {
        DocumentaryForm::blank()
    }
    fn form_from_record(record: &Documentary) -> DocumentaryForm {
        DocumentaryForm::from_record(record)
    }
    fn form_from_fields(fields: &FormFields) -> DocumentaryForm {
        DocumentaryForm::from_fields(fields)
    }
    fn title(record: &Documentary) -> &str {
        &record.title
    }

    async fn list(queries: &ContentQueries) -> Vec<Documentary> {
        queries.documentaries().await
    }
    async fn get(queries: &ContentQueries, id: Uuid) -> Option<Documentary> {
        queries.documentary(id).await
    }
    async fn create(
        mutations: &ContentMutations,
        form: &DocumentaryForm,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError> {
        mutations
            .create_documentary(form.to_input(), image)
            .await
            .map(drop)
    }
    async fn update(
        mutations: &ContentMutations,
        id: Uuid,
        form: &DocumentaryForm,
        image: Option<ImageUpload>,
    ) -> Result<(), MutationError> {
        mutations
            .update_documentary(id, form.to_input(), image)
            .await
            .map(drop)
    }
    async fn delete(mutations: &ContentMutations, id: Uuid) -> Result<(), MutationError> {
        mutations.delete_documentary(id).await
    }
}

// --- Generic list-page handlers ---

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PanelQuery {
    /// `create`, `edit` or `delete`; anything else leaves the panel closed.
    pub panel: Option<String>,
    /// Record the edit or delete panel opens on. A malformed id matches nothing.
    pub id: Option<String>,
}

/// Malformed ids are treated like ids that match no record.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn lowercase_label(entity: Entity) -> String {
    entity.label().to_lowercase()
}

fn not_found_notice(entity: Entity) -> Notice {
    Notice::error(
        "Error",
        format!("That {} no longer exists.", lowercase_label(entity)),
    )
}

fn failure_status(error: &MutationError) -> StatusCode {
    match error {
        MutationError::Busy => StatusCode::CONFLICT,
        MutationError::NotFound => StatusCode::NOT_FOUND,
        MutationError::MissingField(_)
        | MutationError::Upload(_)
        | MutationError::Backend(_)
        | MutationError::Submission(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn render_page<R: ContentResource>(
    state: &AppState,
    status: StatusCode,
    panel: Panel<R::Form>,
    notice: Notice,
    submitting: bool,
) -> Response {
    let page = AdminPage {
        items: R::list(&state.queries).await,
        panel,
        submitting,
        notices: vec![notice],
    };
    (status, Json(page)).into_response()
}

/// Renders the list page again after a failed submission, keeping the panel
/// open with what was submitted.
async fn rejected<R: ContentResource>(
    state: &AppState,
    panel: Panel<R::Form>,
    error: MutationError,
    submitting: bool,
) -> Response {
    let notice = Notice::error("Error", error.to_string());
    render_page::<R>(state, failure_status(&error), panel, notice, submitting).await
}

/// The list page with the panel closed and a "no longer exists" notice.
async fn missing_record<R: ContentResource>(state: &AppState) -> Response {
    render_page::<R>(
        state,
        StatusCode::NOT_FOUND,
        Panel::Closed,
        not_found_notice(R::ENTITY),
        false,
    )
    .await
}

/// list_page
///
/// [Admin Route] Every record of one kind plus the side panel chosen by
/// `?panel=create|edit|delete&id=`. Opening "create" starts from defaults;
/// opening "edit" loads the record into the form. `/admin/documentaries` and
/// `/admin/blog` answer with the same shape for their own records.
#[utoipa::path(
    get,
    path = "/admin/podcasts",
    params(PanelQuery),
    responses(
        (status = 200, description = "Podcast list page", body = AdminPage<Podcast, PodcastForm>),
        (status = 303, description = "Not signed in, redirect to login")
    )
)]
pub async fn list_page<R: ContentResource>(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    _admin: AdminUser,
    Query(query): Query<PanelQuery>,
) -> Json<AdminPage<R::Record, R::Form>> {
    let items = R::list(&state.queries).await;
    let mut notices = session.take_notices();

    let id = query.id.as_deref().map(parse_id);
    let panel = match (query.panel.as_deref(), id) {
        (Some("create"), _) => Panel::Create {
            form: R::blank_form(),
        },
        (Some(kind @ ("edit" | "delete")), Some(id)) => {
            let record = match id {
                Some(id) => R::get(&state.queries, id).await.map(|r| (id, r)),
                None => None,
            };
            match record {
                Some((id, record)) if kind == "edit" => Panel::Edit {
                    id,
                    form: R::form_from_record(&record),
                },
                Some((id, record)) => Panel::ConfirmDelete {
                    id,
                    title: R::title(&record).to_string(),
                },
                None => {
                    notices.push(not_found_notice(R::ENTITY));
                    Panel::Closed
                }
            }
        }
        _ => Panel::Closed,
    };

    Json(AdminPage {
        items,
        panel,
        submitting: session.is_saving(),
        notices,
    })
}

/// create
///
/// [Admin Route] `multipart/form-data` submission of the create panel. A
/// failed save answers with the list page, the panel still holding what was
/// submitted.
#[utoipa::path(
    post,
    path = "/admin/podcasts",
    request_body(content = PodcastForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Created, redirect to the list page"),
        (status = 409, description = "Another save in flight", body = AdminPage<Podcast, PodcastForm>),
        (status = 422, description = "Save failed", body = AdminPage<Podcast, PodcastForm>)
    )
)]
pub async fn create<R: ContentResource>(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    _admin: AdminUser,
    multipart: Multipart,
) -> Response {
    let submission = match Submission::read(multipart, state.config.max_upload_bytes).await {
        Ok(submission) => submission,
        Err(rejected_submission) => {
            let form = R::form_from_fields(&rejected_submission.fields);
            let error = MutationError::from(rejected_submission.reason);
            return rejected::<R>(&state, Panel::Create { form }, error, false).await;
        }
    };
    let form = R::form_from_fields(&submission.fields);

    let Some(saving) = session.begin_save() else {
        return rejected::<R>(&state, Panel::Create { form }, MutationError::Busy, true).await;
    };
    let result = R::create(&state.mutations, &form, submission.image).await;
    drop(saving);

    match result {
        Ok(()) => {
            let label = lowercase_label(R::ENTITY);
            session.push_notice(Notice::success(
                format!("{} created", R::ENTITY.label()),
                format!("The {label} has been created successfully."),
            ));
            Redirect::to(R::PATH).into_response()
        }
        Err(e) => rejected::<R>(&state, Panel::Create { form }, e, false).await,
    }
}

/// update
///
/// [Admin Route] Submission of the edit panel. Last write wins.
#[utoipa::path(
    post,
    path = "/admin/podcasts/{id}",
    params(("id" = String, Path, description = "Podcast id")),
    request_body(content = PodcastForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Updated, redirect to the list page"),
        (status = 404, description = "No such podcast", body = AdminPage<Podcast, PodcastForm>),
        (status = 409, description = "Another save in flight", body = AdminPage<Podcast, PodcastForm>),
        (status = 422, description = "Save failed", body = AdminPage<Podcast, PodcastForm>)
    )
)]
pub async fn update<R: ContentResource>(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    _admin: AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return missing_record::<R>(&state).await;
    };
    let submission = match Submission::read(multipart, state.config.max_upload_bytes).await {
        Ok(submission) => submission,
        Err(rejected_submission) => {
            let form = R::form_from_fields(&rejected_submission.fields);
            let error = MutationError::from(rejected_submission.reason);
            return rejected::<R>(&state, Panel::Edit { id, form }, error, false).await;
        }
    };
    let form = R::form_from_fields(&submission.fields);

    let Some(saving) = session.begin_save() else {
        return rejected::<R>(&state, Panel::Edit { id, form }, MutationError::Busy, true).await;
    };
    let result = R::update(&state.mutations, id, &form, submission.image).await;
    drop(saving);

    match result {
        Ok(()) => {
            let label = lowercase_label(R::ENTITY);
            session.push_notice(Notice::success(
                format!("{} updated", R::ENTITY.label()),
                format!("The {label} has been updated successfully."),
            ));
            Redirect::to(R::PATH).into_response()
        }
        Err(e) => rejected::<R>(&state, Panel::Edit { id, form }, e, false).await,
    }
}

/// delete
///
/// [Admin Route] Confirmed delete. Irreversible.
#[utoipa::path(
    post,
    path = "/admin/podcasts/{id}/delete",
    params(("id" = String, Path, description = "Podcast id")),
    responses(
        (status = 303, description = "Deleted, redirect to the list page"),
        (status = 404, description = "No such podcast", body = AdminPage<Podcast, PodcastForm>),
        (status = 409, description = "Another save in flight", body = AdminPage<Podcast, PodcastForm>)
    )
)]
pub async fn delete<R: ContentResource>(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return missing_record::<R>(&state).await;
    };
    let confirm_panel = |title: Option<String>| match title {
        Some(title) => Panel::ConfirmDelete { id, title },
        None => Panel::Closed,
    };

    let Some(saving) = session.begin_save() else {
        let title = R::get(&state.queries, id)
            .await
            .map(|r| R::title(&r).to_string());
        return rejected::<R>(&state, confirm_panel(title), MutationError::Busy, true).await;
    };
    let result = R::delete(&state.mutations, id).await;
    drop(saving);

    match result {
        Ok(()) => {
            let label = lowercase_label(R::ENTITY);
            session.push_notice(Notice::success(
                format!("{} deleted", R::ENTITY.label()),
                format!("The {label} has been deleted successfully."),
            ));
            Redirect::to(R::PATH).into_response()
        }
        Err(e) => {
            let title = R::get(&state.queries, id)
                .await
                .map(|r| R::title(&r).to_string());
            rejected::<R>(&state, confirm_panel(title), e, false).await
        }
    }
}

// --- Homepage editor ---

#[utoipa::path(
    get,
    path = "/admin/homepage",
    responses((status = 200, description = "Hero editor", body = HomepageEditorView))
)]
pub async fn homepage_editor(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    _admin: AdminUser,
) -> Json<HomepageEditorView> {
    let stored = state.queries.homepage_section(HERO_SECTION_ID).await;
    Json(HomepageEditorView {
        saved: stored.is_some(),
        form: stored.as_ref().map(HeroForm::from_record).unwrap_or_default(),
        submitting: session.is_saving(),
        notices: session.take_notices(),
    })
}

/// save_homepage
///
/// [Admin Route] Upserts the hero section (`id = "hero"`).
#[utoipa::path(
    post,
    path = "/admin/homepage",
    responses(
        (status = 303, description = "Saved, redirect to the editor"),
        (status = 409, description = "Another save in flight", body = HomepageEditorView),
        (status = 422, description = "Save failed", body = HomepageEditorView)
    )
)]
pub async fn save_homepage(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    _admin: AdminUser,
    multipart: Multipart,
) -> Response {
    let submission = match Submission::read(multipart, state.config.max_upload_bytes).await {
        Ok(submission) => submission,
        Err(rejected_submission) => {
            let form = HeroForm::from_fields(&rejected_submission.fields);
            let error = MutationError::from(rejected_submission.reason);
            return editor_rejected(&state, form, error, false).await;
        }
    };
    let form = HeroForm::from_fields(&submission.fields);

    let Some(saving) = session.begin_save() else {
        return editor_rejected(&state, form, MutationError::Busy, true).await;
    };
    let result = state
        .mutations
        .save_homepage_section(form.to_input(), submission.image)
        .await;
    drop(saving);

    match result {
        Ok(_) => {
            session.push_notice(Notice::success(
                "Success",
                "Hero content updated successfully",
            ));
            Redirect::to("/admin/homepage").into_response()
        }
        Err(e) => editor_rejected(&state, form, e, false).await,
    }
}

async fn editor_rejected(
    state: &AppState,
    form: HeroForm,
    error: MutationError,
    submitting: bool,
) -> Response {
    let saved = state
        .queries
        .homepage_section(HERO_SECTION_ID)
        .await
        .is_some();
    let view = HomepageEditorView {
        form,
        saved,
        submitting,
        notices: vec![Notice::error(
            "Error",
            format!("Failed to update hero content: {error}"),
        )],
    };
    (failure_status(&error), Json(view)).into_response()
}
