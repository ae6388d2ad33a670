use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE},
};
use council_core::auth::grant_admin;
use council_core::config::AppConfig;
use council_core::db;
use council_core::identity::{ensure_user, issue_session};
use council_core::schema::AdminRole;
use council_web::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    admin_token: String,
    citizen_token: String,
}

fn test_app() -> TestApp {
    let conn = db::open_in_memory().expect("open db");
    let admin = ensure_user(&conn, "admin@city.example.jp", None).expect("admin");
    grant_admin(&conn, &admin.email, AdminRole::SuperAdmin, None).expect("grant");
    let citizen = ensure_user(&conn, "citizen@example.jp", None).expect("citizen");
    let admin_token = issue_session(&conn, &admin.id, 1).expect("admin session");
    let citizen_token = issue_session(&conn, &citizen.id, 1).expect("citizen session");

    let state = AppState::new(conn, AppConfig::default());
    TestApp {
        app: router(state),
        admin_token,
        citizen_token,
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(body) => {
                request = request.header(CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_member(&self, name: &str) -> String {
        let (status, body) = self
            .send("POST", "/members", Some(&self.admin_token), Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("id").to_string()
    }

    async fn create_question(&self, member_id: &str, title: &str, session_date: i64) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/questions",
                Some(&self.admin_token),
                Some(json!({
                    "title": title,
                    "content": "本文",
                    "category": "福祉",
                    "councilMemberId": member_id,
                    "sessionDate": session_date,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("id").to_string()
    }
}

#[tokio::test]
async fn health_responds() {
    let app = test_app();
    let (status, _) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn writes_map_guard_failures_to_status_codes() {
    let app = test_app();
    let news = json!({ "title": "お知らせ", "content": "本文", "category": "議会" });

    let (status, _) = app.send("POST", "/news", None, Some(news.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .send("POST", "/news", Some(&app.citizen_token), Some(news.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("POST", "/news", Some("not-a-session"), Some(news)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send("GET", "/admin/news", Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn question_listing_and_paging() {
    let app = test_app();
    let member = app.create_member("山田太郎").await;
    for day in 1..=5 {
        app.create_question(&member, &format!("質問{day}"), day * 1000).await;
    }

    let (status, body) = app.send("GET", "/questions?category=%E7%A6%8F%E7%A5%89", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["title"], "質問5");
    assert_eq!(rows[0]["memberName"], "山田太郎");

    let (status, body) = app
        .send("GET", "/questions/search?page=2&pageSize=2&sortBy=oldest", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["questions"][0]["title"], "質問3");

    let (status, _) = app.send("GET", "/questions/search?page=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send("GET", "/questions/paginated?numItems=3", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"].as_array().expect("page").len(), 3);
    assert_eq!(body["isDone"], false);
    let cursor = body["continueCursor"].as_str().expect("cursor").to_string();

    let (_, body) = app
        .send("GET", &format!("/questions/paginated?numItems=3&cursor={cursor}"), None, None)
        .await;
    assert_eq!(body["page"].as_array().expect("page").len(), 2);
    assert_eq!(body["isDone"], true);
}

#[tokio::test]
async fn like_toggle_reports_state_and_requires_a_session() {
    let app = test_app();
    let member = app.create_member("佐藤花子").await;
    let question = app.create_question(&member, "公園", 1).await;
    let like_uri = format!("/questions/{question}/like");

    let (status, _) = app.send("POST", &like_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send("POST", &like_uri, Some(&app.citizen_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "liked": true, "likeCount": 1 }));

    let (_, detail) = app
        .send("GET", &format!("/questions/{question}"), Some(&app.citizen_token), None)
        .await;
    assert_eq!(detail["question"]["isLiked"], true);
    let (_, detail) = app.send("GET", &format!("/questions/{question}"), None, None).await;
    assert_eq!(detail["question"]["isLiked"], false);

    let (_, body) = app.send("POST", &like_uri, Some(&app.citizen_token), None).await;
    assert_eq!(body, json!({ "liked": false, "likeCount": 0 }));

    let (status, _) = app
        .send("POST", "/questions/missing/like", Some(&app.citizen_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unpublished_news_is_not_found() {
    let app = test_app();
    let (_, body) = app
        .send(
            "POST",
            "/news",
            Some(&app.admin_token),
            Some(json!({ "title": "下書き", "content": "本文", "category": "議会" })),
        )
        .await;
    let id = body["id"].as_str().expect("id").to_string();

    let (status, _) = app.send("GET", &format!("/news/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = app.send("GET", "/news", None, None).await;
    assert_eq!(list.as_array().expect("array").len(), 0);

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/news/{id}"),
            Some(&app.admin_token),
            Some(json!({ "isPublished": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.send("GET", &format!("/news/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "下書き");
}

#[tokio::test]
async fn contact_form_rejects_empty_message_and_reaches_the_inbox() {
    let app = test_app();
    let form = |message: &str| {
        json!({
            "name": "市民",
            "email": "citizen@example.jp",
            "message": message,
            "category": "general",
        })
    };

    let (status, _) = app.send("POST", "/contact", None, Some(form(""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.send("POST", "/contact", None, Some(form("街灯が暗い"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.send("GET", "/admin/contact", Some(&app.citizen_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, inbox) = app
        .send("GET", "/admin/contact?status=unread", Some(&app.admin_token), None)
        .await;
    assert_eq!(inbox.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn rankings_and_upload_targets() {
    let app = test_app();
    let chair = app.create_member("議長候補").await;
    let (status, _) = app
        .send(
            "PATCH",
            &format!("/members/{chair}"),
            Some(&app.admin_token),
            Some(json!({ "position": "議長" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.create_question(&chair, "議事運営", 1).await;

    let (status, body) = app.send("GET", "/rankings", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalQuestions"], 1);
    assert_eq!(body["chairpersons"][0]["memberId"], chair.as_str());
    assert_eq!(body["regular"].as_array().expect("regular").len(), 0);

    let (status, body) = app.send("POST", "/uploads", Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["uploadUrl"].as_str().expect("url").contains("/upload/"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_share_the_connection() {
    let app = test_app();
    let member = app.create_member("高橋三郎").await;
    let question = app.create_question(&member, "図書館", 1).await;
    let like_uri = format!("/questions/{question}/like");

    let (first, second, health) = tokio::join!(
        app.send("POST", &like_uri, Some(&app.admin_token), None),
        app.send("POST", &like_uri, Some(&app.citizen_token), None),
        app.send("GET", "/health", None, None),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(health.0, StatusCode::OK);

    let (_, detail) = app.send("GET", &format!("/questions/{question}"), None, None).await;
    assert_eq!(detail["question"]["likeCount"], 2);
}

#[tokio::test]
async fn patch_null_clears_a_member_field() {
    let app = test_app();
    let member = app.create_member("小林").await;
    let uri = format!("/members/{member}");

    let (_, body) = app
        .send("PATCH", &uri, Some(&app.admin_token), Some(json!({ "position": "副議長", "party": "市民の会" })))
        .await;
    assert_eq!(body["position"], "副議長");

    let (status, body) = app
        .send("PATCH", &uri, Some(&app.admin_token), Some(json!({ "position": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["position"].is_null());
    assert_eq!(body["party"], "市民の会");
}
