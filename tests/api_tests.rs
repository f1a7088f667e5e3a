use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use serde_json::Value;
use sister_stories::{
    AppConfig, AppState, Backend, create_router,
    auth::{AuthProvider, MockAuthProvider},
    config::Env,
    models::{BlogPostInput, DocumentaryInput, PodcastInput},
    repository::{MemoryRepository, Repository},
    storage::MockStorageService,
};
use std::{sync::Arc, time::Duration};
use tower::util::ServiceExt;
use uuid::Uuid;

const ADMIN_EMAIL: &str = "admin@sisterstories.org";
const ADMIN_PASSWORD: &str = "correct-horse-battery";
const BOUNDARY: &str = "sister-stories-test-boundary";

// --- Test Setup ---

struct TestApp {
    router: Router,
    repo: Arc<MemoryRepository>,
    auth: Arc<MockAuthProvider>,
    storage: Arc<MockStorageService>,
}

fn test_app_with(config: AppConfig) -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let auth = Arc::new(MockAuthProvider::new().with_user(ADMIN_EMAIL, ADMIN_PASSWORD));
    let storage = Arc::new(MockStorageService::new());

    let backend = Backend {
        repo: repo.clone(),
        auth: auth.clone(),
        storage: storage.clone(),
    };

    TestApp {
        router: create_router(AppState::new(backend, config)),
        repo,
        auth,
        storage,
    }
}

fn test_app() -> TestApp {
    test_app_with(AppConfig {
        session_check_timeout_ms: 200,
        ..AppConfig::default()
    })
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookies: &str) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, cookies: &str, body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn post_multipart(
        &self,
        uri: &str,
        cookies: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookies)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        self.send(request).await
    }

    /// Signs the seeded admin in and returns the cookies to send afterwards.
    /// The welcome notice is consumed by visiting the dashboard once.
    async fn sign_in(&self) -> String {
        let response = self
            .post_form(
                "/admin/login",
                "",
                &format!("email={ADMIN_EMAIL}&password={ADMIN_PASSWORD}"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookies = cookie_header(&response);

        let dashboard = self.get("/admin", &cookies).await;
        assert_eq!(dashboard.status(), StatusCode::OK);
        cookies
    }
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
                 filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `name=value` pairs of every `Set-Cookie` header, joined for a `Cookie` header.
fn cookie_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn notice_titles(view: &Value) -> Vec<String> {
    view["notices"]
        .as_array()
        .map(|notices| {
            notices
                .iter()
                .filter_map(|n| n["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn podcast_input(title: &str, date: &str) -> PodcastInput {
    PodcastInput {
        title: title.to_string(),
        host: "Zara".to_string(),
        duration: "40 min".to_string(),
        description: "An episode".to_string(),
        date: date.to_string(),
        ..PodcastInput::default()
    }
}

fn blog_input(title: &str, excerpt: &str, category: &str, date: &str) -> BlogPostInput {
    BlogPostInput {
        title: title.to_string(),
        excerpt: excerpt.to_string(),
        content: "Body".to_string(),
        image_url: None,
        category: category.to_string(),
        author: "Amina".to_string(),
        date: date.to_string(),
    }
}

/// Raw `Set-Cookie` header for `name`.
fn set_cookie<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{name}=")))
}

fn podcast_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("title", "Rising Voices"),
        ("host", "Zara"),
        ("duration", "52 min"),
        ("description", "A conversation"),
        ("date", "2024-07-01T09:00:00Z"),
    ]
}

fn documentary_input(title: &str, tags: &[&str], coming_soon: bool) -> DocumentaryInput {
    DocumentaryInput {
        title: title.to_string(),
        director: "Leila".to_string(),
        duration: "90 min".to_string(),
        release_date: "2025".to_string(),
        description: "A film".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        coming_soon,
        ..DocumentaryInput::default()
    }
}

// --- Public pages ---

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let response = app.get("/health", "").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_static_pages_on_in_memory_backend() {
    let router = create_router(AppState::new(Backend::in_memory(), AppConfig::default()));

    let about = router
        .clone()
        .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(about.status(), StatusCode::OK);
    assert_eq!(json_body(about).await["title"], "About Sister Stories");

    let contact = router
        .oneshot(Request::builder().uri("/contact").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(contact.status(), StatusCode::OK);
    let view = json_body(contact).await;
    assert_eq!(view["title"], "Contact Us");
    assert_eq!(view["emails"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_path_renders_not_found_view() {
    let app = test_app();
    let response = app.get("/no/such/page", "").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let view = json_body(response).await;
    assert_eq!(view["title"], "Page Not Found");
    assert_eq!(view["back_to"], "/");
}

#[tokio::test]
async fn test_missing_blog_post_renders_not_found_view() {
    let app = test_app();

    for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
        let response = app.get(&format!("/blog/{id}"), "").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let view = json_body(response).await;
        assert_eq!(view["title"], "Blog post not found");
        assert_eq!(view["back_to"], "/blog");
    }
}

#[tokio::test]
async fn test_podcast_detail() {
    let app = test_app();
    let podcast = app
        .repo
        .insert_podcast(podcast_input("Breaking Barriers", "2024-06-01"))
        .await
        .unwrap();

    let response = app.get(&format!("/podcasts/{}", podcast.id), "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["title"], "Breaking Barriers");
    assert_eq!(body["host"], "Zara");
}

#[tokio::test]
async fn test_home_uses_default_hero_and_features_upcoming_documentary() {
    let app = test_app();
    for (title, date) in [
        ("Ep 1", "2024-01-01"),
        ("Ep 2", "2024-02-01"),
        ("Ep 3", "2024-03-01"),
        ("Ep 4", "2024-04-01"),
    ] {
        app.repo
            .insert_podcast(podcast_input(title, date))
            .await
            .unwrap();
    }
    app.repo
        .insert_documentary(documentary_input("Released", &[], false))
        .await
        .unwrap();
    app.repo
        .insert_documentary(documentary_input("Upcoming", &[], true))
        .await
        .unwrap();

    let view = json_body(app.get("/", "").await).await;

    assert_eq!(view["hero"]["title"], "Empowering Women Through Stories");
    assert_eq!(view["recent_podcasts"].as_array().unwrap().len(), 3);
    assert_eq!(view["recent_podcasts"][0]["title"], "Ep 4");
    assert_eq!(view["featured_documentary"]["title"], "Upcoming");
    assert_eq!(view["recent_posts"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_home_degrades_when_backend_is_down() {
    let app = test_app();
    app.repo.set_failing(true);

    let response = app.get("/", "").await;

    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await;
    assert_eq!(view["hero"]["title"], "Empowering Women Through Stories");
    assert_eq!(view["recent_podcasts"], Value::Array(vec![]));
    assert!(view["featured_documentary"].is_null());
}

#[tokio::test]
async fn test_documentaries_tag_filter() {
    let app = test_app();
    app.repo
        .insert_documentary(documentary_input("Voices", &["Activism", "Global"], false))
        .await
        .unwrap();
    app.repo
        .insert_documentary(documentary_input("Healers", &["Health"], true))
        .await
        .unwrap();

    let all = json_body(app.get("/documentaries", "").await).await;
    assert_eq!(all["all_tags"], serde_json::json!(["Activism", "Global", "Health"]));
    assert_eq!(all["coming_soon"][0]["title"], "Healers");
    assert_eq!(all["released"][0]["title"], "Voices");

    let filtered = json_body(app.get("/documentaries?tag=Activism", "").await).await;
    assert_eq!(filtered["selected_tag"], "Activism");
    assert_eq!(filtered["released"].as_array().unwrap().len(), 1);
    assert_eq!(filtered["coming_soon"], Value::Array(vec![]));
    // The tag bar still lists every tag.
    assert_eq!(filtered["all_tags"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_blog_category_and_search_filters() {
    let app = test_app();
    for (title, excerpt, category, date) in [
        ("Finding My Voice", "How it started", "Empowerment", "2024-01-01"),
        ("Healing Together", "Community care", "Health", "2024-02-01"),
        ("Voices of Change", "A new chapter", "Empowerment", "2024-03-01"),
    ] {
        app.repo
            .insert_blog_post(blog_input(title, excerpt, category, date))
            .await
            .unwrap();
    }

    let all = json_body(app.get("/blog", "").await).await;
    assert_eq!(all["posts"].as_array().unwrap().len(), 3);
    assert_eq!(all["categories"], serde_json::json!(["Empowerment", "Health"]));

    let category = json_body(app.get("/blog?category=Empowerment", "").await).await;
    assert_eq!(category["selected_category"], "Empowerment");
    let titles: Vec<&str> = category["posts"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["title"].as_str())
        .collect();
    assert_eq!(titles, ["Voices of Change", "Finding My Voice"]);
    assert_eq!(category["categories"].as_array().unwrap().len(), 2);

    // Case-insensitive, matching the title or the excerpt.
    let by_title = json_body(app.get("/blog?search=VOICE", "").await).await;
    assert_eq!(by_title["posts"].as_array().unwrap().len(), 2);
    let by_excerpt = json_body(app.get("/blog?search=community", "").await).await;
    assert_eq!(by_excerpt["posts"][0]["title"], "Healing Together");
    assert_eq!(by_excerpt["posts"].as_array().unwrap().len(), 1);

    let both = json_body(
        app.get("/blog?category=Health&search=voice", "")
            .await,
    )
    .await;
    assert_eq!(both["posts"], Value::Array(vec![]));

    // Blank parameters filter nothing.
    let blank = json_body(app.get("/blog?category=&search=%20%20", "").await).await;
    assert_eq!(blank["posts"].as_array().unwrap().len(), 3);
    assert!(blank["selected_category"].is_null());
    assert!(blank["search"].is_null());
}

// --- Admin guard ---

#[tokio::test]
async fn test_guard_redirects_anonymous_visitor_to_login() {
    let app = test_app();
    let response = app.get("/admin/podcasts", "").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert!(cookie_header(&response).starts_with("sid="));
}

#[tokio::test]
async fn test_guard_shows_checking_while_session_restores() {
    let app = test_app_with(AppConfig {
        session_check_timeout_ms: 50,
        ..AppConfig::default()
    });
    app.auth.set_refresh_delay(Duration::from_secs(5));

    let response = app.get("/admin", "sb-refresh-token=left-over").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["refresh"], "1");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(json_body(response).await["state"], "checking");
}

#[tokio::test]
async fn test_refresh_cookie_restores_session_for_new_visitor() {
    let app = test_app();
    let issued = app
        .auth
        .sign_in_with_password(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    let response = app
        .get(
            "/admin",
            &format!("sb-refresh-token={}", issued.refresh_token),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await;
    assert_eq!(view["user"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_guard_ends_session_revoked_elsewhere() {
    let app = test_app();
    let cookies = app.sign_in().await;

    app.auth.revoke_all(ADMIN_EMAIL);
    let response = app.get("/admin", &cookies).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert!(set_cookie(&response, "sb-refresh-token").is_some());

    // Stays signed out once the service is reachable again.
    let again = app.get("/admin/podcasts", &cookies).await;
    assert_eq!(again.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_guard_keeps_session_when_auth_service_unreachable() {
    let app = test_app();
    let cookies = app.sign_in().await;

    app.auth.set_offline(true);
    let response = app.get("/admin", &cookies).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_session_cookies_are_secure_in_production() {
    let production = test_app_with(AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    });
    let response = production.get("/admin/login", "").await;
    let sid = set_cookie(&response, "sid").unwrap();
    assert!(sid.contains("Secure"));
    assert!(sid.contains("HttpOnly"));

    let login = production
        .post_form(
            "/admin/login",
            "",
            &format!("email={ADMIN_EMAIL}&password={ADMIN_PASSWORD}"),
        )
        .await;
    assert!(set_cookie(&login, "sb-refresh-token").unwrap().contains("Secure"));

    let local = test_app();
    let response = local.get("/admin/login", "").await;
    assert!(!set_cookie(&response, "sid").unwrap().contains("Secure"));
}

// --- Login / logout ---

#[tokio::test]
async fn test_login_flow_reaches_dashboard() {
    let app = test_app();

    let response = app
        .post_form(
            "/admin/login",
            "",
            &format!("email={ADMIN_EMAIL}&password={ADMIN_PASSWORD}"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");

    let cookies = cookie_header(&response);
    assert!(cookies.contains("sid="));
    assert!(cookies.contains("sb-refresh-token="));

    let dashboard = app.get("/admin", &cookies).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let view = json_body(dashboard).await;
    assert_eq!(view["user"]["email"], ADMIN_EMAIL);
    assert_eq!(view["podcasts"], 0);
    assert_eq!(notice_titles(&view), ["Login Successful"]);

    // Notices are shown once.
    let again = json_body(app.get("/admin", &cookies).await).await;
    assert!(notice_titles(&again).is_empty());
}

#[tokio::test]
async fn test_login_with_invalid_credentials() {
    let app = test_app();

    let response = app
        .post_form(
            "/admin/login",
            "",
            &format!("email={ADMIN_EMAIL}&password=wrong"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let view = json_body(response).await;
    assert_eq!(view["email"], ADMIN_EMAIL);
    assert_eq!(view["notices"][0]["title"], "Login Failed");
    assert_eq!(view["notices"][0]["description"], "Invalid login credentials");
}

#[tokio::test]
async fn test_login_with_empty_fields() {
    let app = test_app();
    let response = app.post_form("/admin/login", "", "email=&password=").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let view = json_body(response).await;
    assert_eq!(
        view["notices"][0]["description"],
        "Please enter both email and password"
    );
}

#[tokio::test]
async fn test_login_when_auth_service_unreachable() {
    let app = test_app();
    app.auth.set_offline(true);

    let response = app
        .post_form(
            "/admin/login",
            "",
            &format!("email={ADMIN_EMAIL}&password={ADMIN_PASSWORD}"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["notices"][0]["title"], "Login Error");
}

#[tokio::test]
async fn test_logout_ends_admin_access() {
    let app = test_app();
    let cookies = app.sign_in().await;

    let response = app.post_form("/admin/logout", &cookies, "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert!(
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap_or_default().starts_with("sb-refresh-token="))
    );

    let guarded = app.get("/admin", &cookies).await;
    assert_eq!(guarded.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&guarded), "/admin/login");

    let login_page = json_body(app.get("/admin/login", &cookies).await).await;
    assert_eq!(notice_titles(&login_page), ["Signed out"]);
}

// --- Admin setup ---

#[tokio::test]
async fn test_setup_creates_unconfirmed_account() {
    let app = test_app();

    let response = app
        .post_form(
            "/admin/setup",
            "",
            "email=new%40sisterstories.org&password=longenough&confirm_password=longenough",
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(app.auth.has_account("new@sisterstories.org"));
    let view = json_body(response).await;
    assert_eq!(view["message"]["kind"], "success");
}

#[tokio::test]
async fn test_setup_validation() {
    let app = test_app();

    let mismatch = app
        .post_form(
            "/admin/setup",
            "",
            "email=a%40b.org&password=longenough&confirm_password=different",
        )
        .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(mismatch).await["message"]["description"],
        "Passwords do not match"
    );

    let short = app
        .post_form(
            "/admin/setup",
            "",
            "email=a%40b.org&password=short&confirm_password=short",
        )
        .await;
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(short).await["message"]["description"],
        "Password must be at least 8 characters long"
    );
}

#[tokio::test]
async fn test_setup_disabled_is_not_found() {
    let app = test_app_with(AppConfig {
        setup_enabled: false,
        ..AppConfig::default()
    });

    let response = app.get("/admin/setup", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- Admin content management ---

#[tokio::test]
async fn test_create_podcast_via_multipart() {
    let app = test_app();
    let cookies = app.sign_in().await;

    let response = app
        .post_multipart(
            "/admin/podcasts",
            &cookies,
            &[
                ("title", "Rising Voices"),
                ("host", "Zara"),
                ("guest", "Nadia"),
                ("duration", "52 min"),
                ("description", "A conversation"),
                ("date", "2024-07-01T09:00:00Z"),
            ],
            Some(("episode cover.png", b"\x89PNG data")),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/podcasts");

    let public = json_body(app.get("/podcasts", "").await).await;
    let podcast = &public["podcasts"][0];
    assert_eq!(podcast["title"], "Rising Voices");
    assert_eq!(podcast["guest"], "Nadia");
    assert!(
        podcast["image_url"]
            .as_str()
            .unwrap()
            .ends_with("-episode-cover.png")
    );
    assert_eq!(app.storage.stored_keys().len(), 1);

    let admin = json_body(app.get("/admin/podcasts", &cookies).await).await;
    assert_eq!(admin["items"].as_array().unwrap().len(), 1);
    assert_eq!(notice_titles(&admin), ["Podcast created"]);
    assert_eq!(admin["panel"]["kind"], "closed");
}

#[tokio::test]
async fn test_failed_create_keeps_panel_open_with_input() {
    let app = test_app();
    let cookies = app.sign_in().await;

    let response = app
        .post_multipart(
            "/admin/podcasts",
            &cookies,
            &[("title", ""), ("host", "Zara"), ("duration", "52 min")],
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = json_body(response).await;
    assert_eq!(page["panel"]["kind"], "create");
    assert_eq!(page["panel"]["form"]["host"], "Zara");
    assert_eq!(page["notices"][0]["description"], "title is required");
    assert_eq!(page["submitting"], false);
    assert_eq!(app.repo.count_podcasts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cover_image_over_two_megabytes_is_accepted() {
    let app = test_app();
    let cookies = app.sign_in().await;
    let image = vec![0x42; 3 * 1024 * 1024];

    let response = app
        .post_multipart(
            "/admin/podcasts",
            &cookies,
            &podcast_fields(),
            Some(("cover.png", &image)),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.storage.stored_keys().len(), 1);
    assert_eq!(app.repo.count_podcasts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_oversized_image_keeps_panel_open_with_input() {
    let app = test_app_with(AppConfig {
        max_upload_bytes: 1024 * 1024,
        ..AppConfig::default()
    });
    let cookies = app.sign_in().await;
    let image = vec![0x42; 1536 * 1024];

    let response = app
        .post_multipart(
            "/admin/podcasts",
            &cookies,
            &podcast_fields(),
            Some(("cover.png", &image)),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = json_body(response).await;
    assert_eq!(page["panel"]["kind"], "create");
    assert_eq!(page["panel"]["form"]["title"], "Rising Voices");
    assert_eq!(page["panel"]["form"]["host"], "Zara");
    assert_eq!(
        page["notices"][0]["description"],
        "Image is larger than the 1 MB upload limit"
    );
    assert!(app.storage.stored_keys().is_empty());
    assert_eq!(app.repo.count_podcasts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_hero_image_keeps_editor_input() {
    let app = test_app_with(AppConfig {
        max_upload_bytes: 1024 * 1024,
        ..AppConfig::default()
    });
    let cookies = app.sign_in().await;
    let image = vec![0x42; 1536 * 1024];

    let response = app
        .post_multipart(
            "/admin/homepage",
            &cookies,
            &[("title", "Stories That Move Us")],
            Some(("hero.png", &image)),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let view = json_body(response).await;
    assert_eq!(view["form"]["title"], "Stories That Move Us");
    assert_eq!(view["saved"], false);
    assert_eq!(notice_titles(&view), ["Error"]);
}

#[tokio::test]
async fn test_malformed_admin_ids_read_as_missing_records() {
    let app = test_app();
    let cookies = app.sign_in().await;

    let update = app
        .post_multipart("/admin/podcasts/not-a-uuid", &cookies, &podcast_fields(), None)
        .await;
    assert_eq!(update.status(), StatusCode::NOT_FOUND);
    let page = json_body(update).await;
    assert_eq!(page["panel"]["kind"], "closed");
    assert_eq!(
        page["notices"][0]["description"],
        "That podcast no longer exists."
    );

    let delete = app
        .post_form("/admin/blog/not-a-uuid/delete", &cookies, "")
        .await;
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(delete).await["notices"][0]["description"],
        "That blog post no longer exists."
    );

    let panel = app
        .get("/admin/documentaries?panel=edit&id=not-a-uuid", &cookies)
        .await;
    assert_eq!(panel.status(), StatusCode::OK);
    let page = json_body(panel).await;
    assert_eq!(page["panel"]["kind"], "closed");
    assert_eq!(
        page["notices"][0]["description"],
        "That documentary no longer exists."
    );
    assert_eq!(app.repo.count_podcasts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_openapi_documents_admin_collection_routes() {
    let app = test_app();

    let response = app.get("/api-docs/openapi.json", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = json_body(response).await;
    let paths = &doc["paths"];

    assert!(paths["/admin/podcasts"]["get"].is_object());
    assert!(paths["/admin/podcasts"]["post"].is_object());
    assert!(paths["/admin/podcasts/{id}"]["post"].is_object());
    assert!(paths["/admin/podcasts/{id}/delete"]["post"].is_object());
    assert!(paths["/admin/homepage"].is_object());
}

#[tokio::test]
async fn test_edit_panel_loads_record_into_form() {
    let app = test_app();
    let cookies = app.sign_in().await;
    let doc = app
        .repo
        .insert_documentary(documentary_input("Voices", &["Activism", "Global"], true))
        .await
        .unwrap();

    let page = json_body(
        app.get(
            &format!("/admin/documentaries?panel=edit&id={}", doc.id),
            &cookies,
        )
        .await,
    )
    .await;

    assert_eq!(page["panel"]["kind"], "edit");
    assert_eq!(page["panel"]["id"], doc.id.to_string());
    assert_eq!(page["panel"]["form"]["tags"], "Activism, Global");
    assert_eq!(page["panel"]["form"]["coming_soon"], true);

    let missing = json_body(
        app.get(
            &format!("/admin/documentaries?panel=delete&id={}", Uuid::new_v4()),
            &cookies,
        )
        .await,
    )
    .await;
    assert_eq!(missing["panel"]["kind"], "closed");
    assert_eq!(
        missing["notices"][0]["description"],
        "That documentary no longer exists."
    );
}

#[tokio::test]
async fn test_update_documentary_tags() {
    let app = test_app();
    let cookies = app.sign_in().await;
    let doc = app
        .repo
        .insert_documentary(documentary_input("Voices", &["Activism"], false))
        .await
        .unwrap();

    let response = app
        .post_multipart(
            &format!("/admin/documentaries/{}", doc.id),
            &cookies,
            &[
                ("title", "Voices Unheard"),
                ("director", "Leila"),
                ("duration", "95 min"),
                ("release_date", "2025"),
                ("description", "A film"),
                ("tags", "Activism, Global"),
            ],
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = app.repo.get_documentary(doc.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Voices Unheard");
    assert_eq!(stored.tags, vec!["Activism", "Global"]);
    assert!(!stored.coming_soon);
}

#[tokio::test]
async fn test_delete_blog_post_removes_public_page() {
    let app = test_app();
    let cookies = app.sign_in().await;

    let created = app
        .post_multipart(
            "/admin/blog",
            &cookies,
            &[
                ("title", "Finding My Voice"),
                ("excerpt", "How it started"),
                ("content", "Long form"),
                ("category", "Empowerment"),
                ("author", "Amina"),
                ("date", "2024-05-01T00:00:00Z"),
            ],
            None,
        )
        .await;
    assert_eq!(created.status(), StatusCode::SEE_OTHER);

    let blog = json_body(app.get("/blog", "").await).await;
    let id = blog["posts"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(
        app.get(&format!("/blog/{id}"), "").await.status(),
        StatusCode::OK
    );

    let deleted = app
        .post_form(&format!("/admin/blog/{id}/delete"), &cookies, "")
        .await;
    assert_eq!(deleted.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&deleted), "/admin/blog");

    assert_eq!(
        app.get(&format!("/blog/{id}"), "").await.status(),
        StatusCode::NOT_FOUND
    );
    let dashboard = json_body(app.get("/admin", &cookies).await).await;
    assert_eq!(dashboard["blog_posts"], 0);
}

#[tokio::test]
async fn test_homepage_editor_saves_hero() {
    let app = test_app();
    let cookies = app.sign_in().await;

    let before = json_body(app.get("/admin/homepage", &cookies).await).await;
    assert_eq!(before["saved"], false);
    assert_eq!(before["form"]["title"], "Empowering Women Through Stories");

    let response = app
        .post_multipart(
            "/admin/homepage",
            &cookies,
            &[
                ("title", "Stories That Move Us"),
                ("subtitle", "New season out now"),
                ("learn_more_url", "/about"),
                ("listen_now_url", "/podcasts"),
            ],
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/homepage");

    let after = json_body(app.get("/admin/homepage", &cookies).await).await;
    assert_eq!(after["saved"], true);
    assert_eq!(after["form"]["title"], "Stories That Move Us");
    assert_eq!(notice_titles(&after), ["Success"]);

    let home = json_body(app.get("/", "").await).await;
    assert_eq!(home["hero"]["title"], "Stories That Move Us");
}

#[tokio::test]
async fn test_admin_write_requires_sign_in() {
    let app = test_app();

    let response = app
        .post_multipart("/admin/podcasts", "", &[("title", "Sneaky")], None)
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert_eq!(app.repo.count_podcasts().await.unwrap(), 0);
}
