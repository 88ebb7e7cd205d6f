use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use chrono::Utc;
use revenue_portal::{
    AppConfig, AppState, InMemoryRepository, MediaService, MockAuthProvider, MockCdnClient,
    create_router,
    media::CdnState,
    models::{ACTIVITY_TABLE, Profile, Resource},
    repository::Repository,
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use uuid::Uuid;

// --- Harness ---

struct TestApp {
    router: Router,
    repo: Arc<InMemoryRepository>,
    auth: Arc<MockAuthProvider>,
    cdn: Arc<MockCdnClient>,
}

impl TestApp {
    fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let auth = Arc::new(MockAuthProvider::new());
        let cdn = Arc::new(MockCdnClient::new());
        let state = AppState::new(
            repo.clone(),
            auth.clone(),
            MediaService::new(Some(cdn.clone() as CdnState)),
            AppConfig::default(),
        );
        TestApp {
            router: create_router(state),
            repo,
            auth,
            cdn,
        }
    }

    /// Inserts a profile and registers the matching auth account.
    async fn staff(&self, email: &str, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.repo
            .insert(
                Profile::TABLE,
                json!({
                    "id": id,
                    "email": email,
                    "role": role,
                    "created_at": now,
                    "updated_at": now,
                }),
            )
            .await
            .unwrap();
        self.auth.add_user(id, email, "motdepasse");
        id
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self, email: &str, redirect: Option<&str>) -> Response<Body> {
        let body = json!({ "email": email, "password": "motdepasse", "redirect": redirect });
        self.send(json_request(Method::POST, "/admin/login", None, &body)).await
    }

    /// Session cookie of a successful login.
    async fn cookie_for(&self, email: &str) -> String {
        let response = self.login(email, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets the session cookie")
    }
}

enum Auth<'a> {
    Cookie(&'a str),
    UserId(Uuid),
}

fn request(method: Method, uri: &str, auth: Option<Auth>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match auth {
        Some(Auth::Cookie(cookie)) => builder.header(header::COOKIE, cookie),
        Some(Auth::UserId(id)) => builder.header("x-user-id", id.to_string()),
        None => builder,
    }
}

fn get(uri: &str, auth: Option<Auth>) -> Request<Body> {
    request(Method::GET, uri, auth).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, auth: Option<Auth>, body: &Value) -> Request<Body> {
    request(method, uri, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart body with one part per `(field, file name, content type, bytes)`.
fn multipart(uri: &str, auth: Auth, parts: &[(&str, &str, &str, &[u8])]) -> Request<Body> {
    let boundary = "portal-test-boundary";
    let mut body = Vec::new();
    for (field, file_name, content_type, data) in parts {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    request(Method::POST, uri, Some(auth))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

fn upload(
    uri: &str,
    auth: Auth,
    file_name: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    multipart(uri, auth, &[("file", file_name, content_type, data)])
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("sb-access-token="))
        .map(|value| value.split(';').next().unwrap_or_default().to_string())
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Lets the spawned activity writes land.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// --- Public surface ---

#[tokio::test]
async fn health_check() {
    let app = TestApp::new();
    let response = app.send(get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Role gate ---

#[tokio::test]
async fn anonymous_admin_request_is_sent_to_login_with_its_path() {
    let app = TestApp::new();

    let response = app.send(get("/admin/api/news?q=taxe", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login?redirect=%2Fadmin%2Fapi%2Fnews%3Fq%3Dtaxe");
}

#[tokio::test]
async fn unknown_admin_paths_are_gated_too() {
    let app = TestApp::new();
    let response = app.send(get("/admin/inexistant", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let editor = app.staff("editeur@regie.example", "editor").await;
    let response = app.send(get("/admin/inexistant", Some(Auth::UserId(editor)))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reader_and_unknown_roles_are_redirected() {
    let app = TestApp::new();
    let reader = app.staff("lecteur@regie.example", "reader").await;
    let odd = app.staff("bizarre@regie.example", "superadmin").await;

    for id in [reader, odd, Uuid::new_v4()] {
        let response = app.send(get("/admin/api/dashboard", Some(Auth::UserId(id)))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin/login?redirect=%2Fadmin%2Fapi%2Fdashboard");
    }
}

#[tokio::test]
async fn gate_fails_closed_when_profiles_are_unreachable() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;
    app.repo.fail_on(Profile::TABLE);

    let response = app.send(get("/admin/api/dashboard", Some(Auth::UserId(editor)))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

// --- Login / logout ---

#[tokio::test]
async fn reader_login_is_refused_without_a_cookie() {
    let app = TestApp::new();
    app.staff("lecteur@regie.example", "reader").await;

    let response = app.login("lecteur@regie.example", None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn first_login_provisions_a_reader_profile() {
    let app = TestApp::new();
    let id = Uuid::new_v4();
    app.auth.add_user(id, "nouveau@regie.example", "motdepasse");

    let response = app.login("nouveau@regie.example", None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let profiles = app.repo.rows(Profile::TABLE);
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["id"], json!(id));
    assert_eq!(profiles[0]["role"], json!("reader"));
}

#[tokio::test]
async fn wrong_password_and_missing_fields() {
    let app = TestApp::new();
    app.staff("editeur@regie.example", "editor").await;

    let body = json!({ "email": "editeur@regie.example", "password": "faux" });
    let response = app.send(json_request(Method::POST, "/admin/login", None, &body)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], json!("INVALID_CREDENTIALS"));

    let body = json!({ "email": "", "password": "" });
    let response = app.send(json_request(Method::POST, "/admin/login", None, &body)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = body_json(response).await;
    assert!(error["error"]["fields"]["email"].is_string());
    assert!(error["error"]["fields"]["password"].is_string());
}

#[tokio::test]
async fn editor_login_sets_cookie_and_honours_safe_redirects() {
    let app = TestApp::new();
    app.staff("editeur@regie.example", "editor").await;

    let response = app.login("editeur@regie.example", Some("/admin/actualites?page=2")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let raw_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(raw_cookie.contains("HttpOnly"));
    let body = body_json(response).await;
    assert_eq!(body["redirect"], json!("/admin/actualites?page=2"));
    assert_eq!(body["user"]["role"], json!("editor"));

    let response = app.login("editeur@regie.example", Some("https://evil.example/admin")).await;
    assert_eq!(body_json(response).await["redirect"], json!("/admin"));

    let response = app.login("editeur@regie.example", Some("//evil.example")).await;
    assert_eq!(body_json(response).await["redirect"], json!("/admin"));
}

#[tokio::test]
async fn session_navigation_depends_on_role() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;
    let admin = app.staff("admin@regie.example", "admin").await;

    let paths = |body: Value| -> Vec<String> {
        body["navigation"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["path"].as_str().unwrap().to_string())
            .collect()
    };

    let response = app.send(get("/admin/session", Some(Auth::UserId(editor)))).await;
    let editor_paths = paths(body_json(response).await);
    assert!(editor_paths.contains(&"/admin/actualites".to_string()));
    assert!(!editor_paths.contains(&"/admin/utilisateurs".to_string()));

    let response = app.send(get("/admin/session", Some(Auth::UserId(admin)))).await;
    let admin_paths = paths(body_json(response).await);
    assert!(admin_paths.contains(&"/admin/utilisateurs".to_string()));
    assert!(admin_paths.contains(&"/admin/journal".to_string()));
}

#[tokio::test]
async fn logout_revokes_the_token_and_clears_the_cookie() {
    let app = TestApp::new();
    app.staff("editeur@regie.example", "editor").await;
    let cookie = app.cookie_for("editeur@regie.example").await;
    let token = cookie.trim_start_matches("sb-access-token=").to_string();
    assert!(app.auth.is_token_active(&token));

    let logout = request(Method::POST, "/admin/logout", Some(Auth::Cookie(&cookie)))
        .body(Body::empty())
        .unwrap();
    let response = app.send(logout).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    assert!(!app.auth.is_token_active(&token));

    let response = app.send(get("/admin/api/dashboard", Some(Auth::Cookie(&cookie)))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    settle().await;
    let actions: Vec<Value> = app
        .repo
        .rows(ACTIVITY_TABLE)
        .iter()
        .map(|r| r["action"].clone())
        .collect();
    assert!(actions.contains(&json!("LOGIN")));
    assert!(actions.contains(&json!("LOGOUT")));
}

// --- Content workflow ---

#[tokio::test]
async fn editor_publishes_news_through_the_toggle() {
    let app = TestApp::new();
    app.staff("editeur@regie.example", "editor").await;
    let cookie = app.cookie_for("editeur@regie.example").await;

    // Created unpublished.
    let draft = json!({
        "titre": "Fermeture exceptionnelle des guichets",
        "contenu": "Les guichets seront fermés le 30 juin.",
        "categorie": "communique",
    });
    let response = app
        .send(json_request(Method::POST, "/admin/api/news", Some(Auth::Cookie(&cookie)), &draft))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(location(&response), "/admin/actualites");
    let created = body_json(response).await;
    let id = created["item"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["item"]["slug"], json!("fermeture-exceptionnelle-des-guichets"));

    let response = app.send(get("/api/news", None)).await;
    assert_eq!(body_json(response).await, json!([]));
    let response = app.send(get("/api/news/fermeture-exceptionnelle-des-guichets", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // An older article, published straight away.
    let older = json!({
        "titre": "Campagne 2025",
        "contenu": "Bilan de la campagne.",
        "categorie": "actualite",
        "publie": true,
        "date_publication": "2025-01-10T08:00:00Z",
    });
    let response = app
        .send(json_request(Method::POST, "/admin/api/news", Some(Auth::Cookie(&cookie)), &older))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(
            request(
                Method::POST,
                &format!("/admin/api/news/{id}/toggle/publie"),
                Some(Auth::Cookie(&cookie)),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["publie"], json!(true));

    let response = app.send(get("/api/news", None)).await;
    let list = body_json(response).await;
    let slugs: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["fermeture-exceptionnelle-des-guichets", "campagne-2025"]);

    let response = app.send(get("/api/news/fermeture-exceptionnelle-des-guichets", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["category_label"], json!("Communiqué"));

    settle().await;
    let entries = app.repo.rows(ACTIVITY_TABLE);
    assert!(entries.iter().any(|e| e["action"] == json!("CREATE") && e["entity_id"] == json!(id)));
    assert!(
        entries
            .iter()
            .any(|e| e["action"] == json!("UPDATE") && e["details"]["toggle"] == json!("publie"))
    );
}

#[tokio::test]
async fn invalid_drafts_and_unconfirmed_deletes() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/admin/api/services",
            Some(Auth::UserId(editor)),
            &json!({ "titre": "Vignette automobile" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_json(response).await["error"]["fields"]["description"].is_string());

    let response = app
        .send(json_request(
            Method::POST,
            "/admin/api/services",
            Some(Auth::UserId(editor)),
            &json!({ "titre": "Vignette automobile", "description": "Paiement annuel." }),
        ))
        .await;
    let id = body_json(response).await["item"]["id"].as_str().unwrap().to_string();

    let uri = format!("/admin/api/services/{id}");
    let delete = request(Method::DELETE, &uri, Some(Auth::UserId(editor)))
        .body(Body::empty())
        .unwrap();
    let response = app.send(delete).await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_REQUIRED);

    let response = app
        .send(
            request(Method::DELETE, &format!("{uri}?confirm=true"), Some(Auth::UserId(editor)))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.repo.rows("services").is_empty());
}

#[tokio::test]
async fn admin_list_supports_search() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;
    for title in ["Impôt foncier", "Vignette"] {
        let draft = json!({ "titre": title, "description": "Service fiscal." });
        let auth = Some(Auth::UserId(editor));
        app.send(json_request(Method::POST, "/admin/api/services", auth, &draft))
            .await;
    }

    let response = app.send(get("/admin/api/services?q=impot", Some(Auth::UserId(editor)))).await;
    let body = body_json(response).await;
    assert_eq!(body["total"], json!(2));
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["slug"], json!("impot-foncier"));
}

// --- Admin-only screens ---

#[tokio::test]
async fn editors_cannot_manage_users_or_read_the_journal() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;

    for uri in ["/admin/api/users", "/admin/api/activity"] {
        let response = app.send(get(uri, Some(Auth::UserId(editor)))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }

    let response = app.send(get("/admin/api/dashboard", Some(Auth::UserId(editor)))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["recent_activity"].is_null());
}

#[tokio::test]
async fn admin_creates_a_staff_account_that_can_sign_in() {
    let app = TestApp::new();
    let admin = app.staff("admin@regie.example", "admin").await;

    let invalid = json!({
        "email": "x@regie.example",
        "password": "motdepasse",
        "role": "superadmin",
    });
    let response = app
        .send(json_request(Method::POST, "/admin/api/users", Some(Auth::UserId(admin)), &invalid))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.repo.rows(Profile::TABLE).len(), 1);

    let payload = json!({
        "email": "Agent@Regie.example",
        "password": "motdepasse",
        "nom_complet": "Agent Kabila",
        "role": "editor",
    });
    let response = app
        .send(json_request(Method::POST, "/admin/api/users", Some(Auth::UserId(admin)), &payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile = body_json(response).await;
    assert_eq!(profile["email"], json!("agent@regie.example"));
    assert_eq!(profile["role"], json!("editor"));

    let response = app.login("agent@regie.example", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admins_cannot_demote_or_delete_themselves() {
    let app = TestApp::new();
    let admin = app.staff("admin@regie.example", "admin").await;
    let uri = format!("/admin/api/users/{admin}");

    let response = app
        .send(json_request(
            Method::PUT,
            &uri,
            Some(Auth::UserId(admin)),
            &json!({ "role": "editor" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .send(
            request(Method::DELETE, &format!("{uri}?confirm=true"), Some(Auth::UserId(admin)))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.repo.rows(Profile::TABLE).len(), 1);
}

#[tokio::test]
async fn admin_reads_the_activity_journal() {
    let app = TestApp::new();
    app.staff("admin@regie.example", "admin").await;
    let cookie = app.cookie_for("admin@regie.example").await;
    settle().await;

    let response = app
        .send(get("/admin/api/activity?action=LOGIN", Some(Auth::Cookie(&cookie))))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["user_email"], json!("admin@regie.example"));
}

// --- Uploads ---

#[tokio::test]
async fn uploads_are_validated_before_the_cdn() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;

    let big = vec![0u8; 15 * 1024 * 1024];
    let response = app
        .send(upload(
            "/admin/api/uploads/image",
            Auth::UserId(editor),
            "photo.jpg",
            "image/jpeg",
            &big,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], json!("INVALID_MEDIA"));
    assert_eq!(app.cdn.calls(), 0);

    let response = app
        .send(upload(
            "/admin/api/uploads/image",
            Auth::UserId(editor),
            "logo.png",
            "image/png",
            b"png",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["url"],
        json!("https://res.cloudinary.com/mock/image/upload/site/logo.png")
    );
    assert_eq!(app.cdn.calls(), 1);
}

#[tokio::test]
async fn full_gallery_batches_fit_the_request_limit() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;

    // Seven 9 MB images: above the single-upload ceiling, within the gallery one.
    let image = vec![0u8; 9 * 1024 * 1024];
    let names: Vec<String> = (0..7).map(|i| format!("photo-{i}.jpg")).collect();
    let parts: Vec<(&str, &str, &str, &[u8])> = names
        .iter()
        .map(|name| ("files", name.as_str(), "image/jpeg", image.as_slice()))
        .collect();
    let response = app
        .send(multipart("/admin/api/uploads/gallery", Auth::UserId(editor), &parts))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["added"], json!(7));
    assert_eq!(body["gallery"].as_array().map(Vec::len), Some(7));
    assert_eq!(app.cdn.calls(), 7);
}

#[tokio::test]
async fn oversized_request_bodies_are_payload_too_large() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;

    let huge = vec![0u8; 61 * 1024 * 1024];
    let response = app
        .send(upload(
            "/admin/api/uploads/document",
            Auth::UserId(editor),
            "archive.pdf",
            "application/pdf",
            &huge,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"]["code"], json!("PAYLOAD_TOO_LARGE"));
    assert_eq!(app.cdn.calls(), 0);
}

#[tokio::test]
async fn youtube_links_are_checked_against_the_article() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;

    let body = json!({
        "url": "https://youtu.be/dQw4w9WgXcQ",
        "existing": ["https://www.youtube.com/watch?v=dQw4w9WgXcQ"],
    });
    let response = app
        .send(json_request(
            Method::POST,
            "/admin/api/videos/youtube",
            Some(Auth::UserId(editor)),
            &body,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!({ "url": "https://youtu.be/dQw4w9WgXcQ" });
    let response = app
        .send(json_request(
            Method::POST,
            "/admin/api/videos/youtube",
            Some(Auth::UserId(editor)),
            &body,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["videos"],
        json!(["https://www.youtube.com/watch?v=dQw4w9WgXcQ"])
    );
}

// --- Public pages ---

#[tokio::test]
async fn public_revenue_and_structure() {
    let app = TestApp::new();
    let editor = app.staff("editeur@regie.example", "editor").await;

    for row in [
        json!({
            "annee": 2026,
            "mois": 1,
            "type_recette": "vignette",
            "montant": 40.0,
            "devise": "usd",
        }),
        json!({
            "annee": 2026,
            "mois": 1,
            "type_recette": "impot_foncier",
            "montant": 900.0,
            "devise": "CDF",
        }),
    ] {
        let response = app
            .send(json_request(
                Method::POST,
                "/admin/api/revenue",
                Some(Auth::UserId(editor)),
                &row,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    for (name, active) in [("Mbuyi", true), ("Ancien agent", false)] {
        let member = json!({
            "nom": name,
            "poste": "Agent",
            "equipe": "Recouvrement",
            "actif": active,
        });
        let auth = Some(Auth::UserId(editor));
        app.send(json_request(Method::POST, "/admin/api/personnel", auth, &member))
            .await;
    }

    let revenue = body_json(app.send(get("/api/revenue", None)).await).await;
    assert_eq!(revenue["latest_year"], json!(2026));
    assert_eq!(revenue["totals"].as_array().unwrap().len(), 2);

    let structure = body_json(app.send(get("/api/structure", None)).await).await;
    assert_eq!(structure.as_array().unwrap().len(), 1);
    assert_eq!(structure[0]["members"].as_array().unwrap().len(), 1);
    assert_eq!(structure[0]["members"][0]["name"], json!("Mbuyi"));
}
