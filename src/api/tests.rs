//! Router tests driven through `tower::ServiceExt::oneshot`

use super::*;
use crate::db::{create_test_pool, migrations};
use crate::models::{ArticleInput, CreateUserInput, EbookInput, LeadFilter, TestimonialInput, TrainingInput};
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "motdepasse-solide-42";

struct TestApp {
    app: NormalizePath<Router>,
    state: AppState,
    _media: TempDir,
}

async fn setup() -> TestApp {
    let media = TempDir::new().unwrap();
    let mut config = Config::default();
    config.media.path = media.path().to_path_buf();
    config.site.base_url = "https://immoshift.fr".to_string();

    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState::new(&config, pool).unwrap();
    TestApp {
        app: build_app(state.clone(), &config),
        state,
        _media: media,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn send_json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn login(&self) -> String {
        self.state
            .user_service
            .create_user(CreateUserInput {
                username: "admin".to_string(),
                email: "admin@immoshift.fr".to_string(),
                password: ADMIN_PASSWORD.to_string(),
            })
            .await
            .unwrap();

        let (status, body) = self
            .send_json(
                "POST",
                "/api/admin/auth/login",
                None,
                json!({ "username": "admin", "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn seed_ebook(&self) -> i64 {
        self.state
            .ebooks
            .create(EbookInput {
                title: "Guide de l'investisseur".to_string(),
                slug: None,
                description: "Tout pour bien démarrer".to_string(),
                cover_image: "ebooks/covers/guide.jpg".to_string(),
                file: "ebooks/files/guide.pdf".to_string(),
                is_active: true,
                position: 0,
            })
            .await
            .unwrap()
            .id
    }
}

fn article(title: &str, published: bool) -> ArticleInput {
    ArticleInput {
        title: title.to_string(),
        excerpt: "Résumé".to_string(),
        is_published: published,
        ..Default::default()
    }
}

fn training(title: &str, active: bool) -> TrainingInput {
    TrainingInput {
        title: title.to_string(),
        slug: None,
        short_description: "Formation".to_string(),
        duration: None,
        price: None,
        show_price: true,
        image: "trainings/t.jpg".to_string(),
        video_url: None,
        is_active: active,
        position: 0,
    }
}

#[tokio::test]
async fn test_home_shows_only_visible_content() {
    let app = setup().await;
    app.state.articles.create(article("Article publié", true)).await.unwrap();
    app.state.articles.create(article("Brouillon", false)).await.unwrap();
    app.state.trainings.create(training("Formation active", true)).await.unwrap();
    app.state.trainings.create(training("Formation archivée", false)).await.unwrap();
    app.seed_ebook().await;

    let (status, body) = app.get_json("/api/home/").await;

    assert_eq!(status, StatusCode::OK);
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Article publié");
    assert_eq!(body["trainings"].as_array().unwrap().len(), 1);
    assert_eq!(body["ebooks"].as_array().unwrap().len(), 1);
    assert!(body["testimonials"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_detail_by_slug() {
    let app = setup().await;
    app.state.articles.create(article("Investir à Lyon", true)).await.unwrap();

    let (status, body) = app.get_json("/api/article/investir-a-lyon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "investir-a-lyon");
    assert!(body["paragraphs"].is_array());

    let (status, body) = app.get_json("/api/article/inconnu").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_download_ebook_records_lead() {
    let app = setup().await;
    let ebook_id = app.seed_ebook().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/download-ebook/")
        .header("host", "immoshift.test")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::from(
            json!({
                "ebook": ebook_id,
                "first_name": "Léa",
                "last_name": "Moreau",
                "email": "lea@example.fr",
                "consent_mailing": true
            })
            .to_string(),
        ))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["ebook_id"], ebook_id);
    assert_eq!(body["ebook_title"], "Guide de l'investisseur");
    assert_eq!(body["download_url"], "http://immoshift.test/media/ebooks/files/guide.pdf");

    let leads = app.state.leads.list(&LeadFilter::default()).await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].lead.ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn test_download_ebook_field_errors() {
    let app = setup().await;
    let ebook_id = app.seed_ebook().await;

    let (status, body) = app
        .send_json(
            "POST",
            "/api/download-ebook",
            None,
            json!({ "ebook": ebook_id, "first_name": "Léa", "last_name": "Moreau", "email": "pas-un-email" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "email": ["Enter a valid email address."] }));
    assert!(app.state.leads.list(&LeadFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_ebook_null_differs_from_missing() {
    let app = setup().await;
    let ebook_id = app.seed_ebook().await;

    let (status, body) = app
        .send_json(
            "POST",
            "/api/download-ebook",
            None,
            json!({ "ebook": ebook_id, "first_name": "Léa", "email": null }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "email": ["This field may not be null."],
            "last_name": ["This field is required."]
        })
    );
}

#[tokio::test]
async fn test_sitemaps() {
    let app = setup().await;
    app.state.articles.create(article("Investir à Lyon", true)).await.unwrap();

    let request = Request::builder().uri("/api/sitemap.xml").body(Body::empty()).unwrap();
    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers["content-type"].to_str().unwrap().starts_with("application/xml"));
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("<loc>https://immoshift.fr/articles/investir-a-lyon/</loc>"));

    let request = Request::builder().uri("/api/sitemaps/static.xml").body(Body::empty()).unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get_json("/api/sitemaps/pages").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_requires_session() {
    let app = setup().await;

    let (status, body) = app.get_json("/api/admin/authors").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app
        .send_json("GET", "/api/admin/authors", Some("not-a-session"), Value::Null)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_sets_cookie_and_logout_ends_session() {
    let app = setup().await;
    app.state
        .user_service
        .create_user(CreateUserInput {
            username: "admin".to_string(),
            email: "admin@immoshift.fr".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "email": "admin@immoshift.fr", "password": ADMIN_PASSWORD }).to_string()))
        .unwrap();
    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    let token = serde_json::from_slice::<Value>(&body).unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();
    let cookie = headers["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with(&format!("session={}", token)));
    assert!(cookie.contains("HttpOnly"));

    let request = Request::builder()
        .uri("/api/admin/auth/me")
        .header("cookie", format!("session={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["username"], "admin");

    let (status, _) = app.send_json("POST", "/api/admin/auth/logout", Some(&token), Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send_json("GET", "/api/admin/auth/me", Some(&token), Value::Null).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = setup().await;
    app.login().await;

    let (status, body) = app
        .send_json(
            "POST",
            "/api/admin/auth/login",
            None,
            json!({ "username": "admin", "password": "mauvais" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_admin_article_crud() {
    let app = setup().await;
    let token = app.login().await;

    let (status, author) = app
        .send_json("POST", "/api/admin/authors", Some(&token), json!({ "name": "Marc Dupont" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let payload = json!({
        "title": "Investir à Lyon",
        "excerpt": "Les quartiers à suivre",
        "author_id": author["id"]
    });
    let (status, created) = app.send_json("POST", "/api/admin/articles", Some(&token), payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "investir-a-lyon");

    let (status, body) = app.send_json("POST", "/api/admin/articles", Some(&token), payload).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let uri = format!("/api/admin/articles/{}", created["id"]);
    let (status, fetched) = app.send_json("GET", &uri, Some(&token), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["author"]["name"], "Marc Dupont");

    let (status, _) = app.send_json("DELETE", &uri, Some(&token), Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send_json("GET", &uri, Some(&token), Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_list_filters() {
    let app = setup().await;
    let token = app.login().await;

    let mut priceless = training("Formation sans prix", true);
    priceless.show_price = false;
    app.state.trainings.create(priceless).await.unwrap();
    app.state.trainings.create(training("Formation archivée", false)).await.unwrap();
    let active = app.state.trainings.create(training("Formation active", true)).await.unwrap();

    let (status, body) = app
        .send_json("GET", "/api/admin/trainings?is_active=true&show_price=true", Some(&token), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body.as_array().unwrap().iter().filter_map(|t| t["title"].as_str()).collect();
    assert_eq!(titles, vec!["Formation active"]);

    app.seed_ebook().await;
    let (_, body) = app
        .send_json("GET", "/api/admin/ebooks?is_active=false", Some(&token), Value::Null)
        .await;
    assert!(body.as_array().unwrap().is_empty());

    for (name, rating) in [("Paul", 5), ("Anne", 3)] {
        app.state
            .testimonials
            .create(TestimonialInput {
                name: name.to_string(),
                role: "Investisseur".to_string(),
                avatar: "testimonials/a.jpg".to_string(),
                quote: "Très utile".to_string(),
                rating,
            })
            .await
            .unwrap();
    }
    let (_, body) = app
        .send_json("GET", "/api/admin/testimonials?rating=3", Some(&token), Value::Null)
        .await;
    let names: Vec<&str> = body.as_array().unwrap().iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, vec!["Anne"]);

    let paragraphs = [
        json!({ "title": "Fiscalité", "content": "Texte", "training_id": active.id }),
        json!({ "title": "Galerie", "media_type": "image", "image": "paragraphs/a.jpg", "training_id": active.id }),
    ];
    for payload in paragraphs {
        let (status, _) = app.send_json("POST", "/api/admin/paragraphs", Some(&token), payload).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let uri = format!("/api/admin/paragraphs?training_id={}&media_type=image", active.id);
    let (_, body) = app.send_json("GET", &uri, Some(&token), Value::Null).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Galerie");

    let (_, body) = app
        .send_json("GET", "/api/admin/paragraphs?search=fisca", Some(&token), Value::Null)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Fiscalité");
}

#[tokio::test]
async fn test_paragraph_needs_exactly_one_parent() {
    let app = setup().await;
    let token = app.login().await;

    let (status, body) = app
        .send_json("POST", "/api/admin/paragraphs", Some(&token), json!({ "content": "Texte" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_lead_export_csv() {
    let app = setup().await;
    let token = app.login().await;
    let ebook_id = app.seed_ebook().await;

    for (email, consent) in [("oui@example.fr", true), ("non@example.fr", false)] {
        let (status, _) = app
            .send_json(
                "POST",
                "/api/download-ebook",
                None,
                json!({
                    "ebook": ebook_id,
                    "first_name": "Léa",
                    "last_name": "Moreau",
                    "email": email,
                    "consent_mailing": consent
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let request = Request::builder()
        .uri("/api/admin/leads/export?consented=true")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/csv"));
    let disposition = headers["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"email_list_consented_"));
    let csv = String::from_utf8(body).unwrap();
    assert!(csv.starts_with("Email,Prénom,Nom,Consentement,Date\r\n"));
    assert!(csv.contains("oui@example.fr"));
    assert!(!csv.contains("non@example.fr"));
}

#[tokio::test]
async fn test_import_rejects_non_linkedin_url() {
    let app = setup().await;
    let token = app.login().await;

    let (status, body) = app
        .send_json(
            "POST",
            "/api/admin/import/linkedin",
            Some(&token),
            json!({ "linkedin_url": "https://example.com/blog/post" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["linkedin_url"].is_array());
}

#[tokio::test]
async fn test_media_upload() {
    let app = setup().await;
    let token = app.login().await;

    let boundary = "immoshift-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cover.png\"\r\n\
         Content-Type: image/png\r\n\r\nnot really a png\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/media/ebook_covers")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::CREATED);
    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("ebooks/covers/") && path.ends_with(".png"));
    assert_eq!(body["url"], format!("/media/{}", path));
    assert_eq!(body["filename"], "cover.png");
    assert!(app.state.media.root().join(path).exists());

    let request = Request::builder().uri(format!("/media/{}", path)).body(Body::empty()).unwrap();
    let (status, _, served) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, b"not really a png");
}
