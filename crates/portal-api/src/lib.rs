pub mod categories;
pub mod compensation;
pub mod contacts;
pub mod error;
pub mod state;
pub mod templates;
pub mod transfer;
pub mod user_emails;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, patch, post},
};
use tower_http::cors::{Any, CorsLayer};

pub use error::ApiError;
pub use state::AppState;

/// Headers browser clients of the transfer endpoints are allowed to send.
const TRANSFER_HEADERS: [HeaderName; 4] = [
    AUTHORIZATION,
    HeaderName::from_static("x-client-info"),
    HeaderName::from_static("apikey"),
    CONTENT_TYPE,
];

fn transfer_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(TRANSFER_HEADERS)
}

fn portal_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Bare OPTIONS without CORS request headers.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    let transfer_routes = Router::new()
        .route("/export-data", post(transfer::export_data).options(preflight))
        .route("/import-data", post(transfer::import_data).options(preflight))
        .layer(DefaultBodyLimit::max(state.max_import_bytes))
        .layer(transfer_cors());

    let portal_routes = Router::new()
        .route("/categories", get(categories::list_categories).post(categories::create_category))
        .route(
            "/categories/{category_id}/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/categories/{category_id}/contacts/partition", get(contacts::contacts_partition))
        .route("/contacts/{id}", patch(contacts::update_contact).delete(contacts::delete_contact))
        .route("/contacts/{id}/interactions", post(contacts::record_interaction))
        .route("/email-templates", get(templates::list_email_templates))
        .route("/user-emails", get(user_emails::list_user_emails).post(user_emails::add_user_email))
        .route("/user-emails/bases", get(user_emails::list_bases))
        .route("/user-emails/reset-countdown", get(user_emails::reset_countdown))
        .route("/user-emails/{id}/status", patch(user_emails::update_status))
        .route("/user-emails/{id}/copy", post(user_emails::record_copy))
        .route("/compensation/report", post(compensation::report))
        .layer(portal_cors());

    Router::new()
        .merge(transfer_routes)
        .merge(portal_routes)
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use portal_db::Database;

    use super::*;

    struct TestApp {
        router: Router,
        _dir: TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let db = Database::open_with_readers(&dir.path().join("portal.db"), 2).unwrap();
            Self {
                router: router(AppState::new(db)),
                _dir: dir,
            }
        }

        async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            let body = match body {
                Some(json) => {
                    req = req.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            let res = self.router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
            let status = res.status();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn category(&self, name: &str) -> String {
            let (status, body) = self
                .send(Method::POST, "/categories", Some(json!({ "name": name })))
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body["id"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = TestApp::new();
        let res = app
            .router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn categories_listed_by_name() {
        let app = TestApp::new();
        app.category("Gyms").await;
        app.category("Cafes").await;

        let (status, body) = app.send(Method::GET, "/categories", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body.as_array().unwrap().iter().map(|c| c["name"].clone()).collect();
        assert_eq!(names, [json!("Cafes"), json!("Gyms")]);

        let (status, body) = app
            .send(Method::POST, "/categories", Some(json!({ "name": "  " })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn contact_edit_lifecycle() {
        let app = TestApp::new();
        let cat = app.category("Cafes").await;

        let (status, contact) = app
            .send(
                Method::POST,
                &format!("/categories/{cat}/contacts"),
                Some(json!({ "business_name": "  Tartine ", "email": "" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(contact["business_name"], "Tartine");
        assert_eq!(contact["email"], Value::Null);
        assert_eq!(contact["status"], "Lead");
        let id = contact["id"].as_str().unwrap().to_string();

        let (status, updated) = app
            .send(
                Method::PATCH,
                &format!("/contacts/{id}"),
                Some(json!({ "field": "status", "value": "Closed Won" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "Closed Won");

        let (status, updated) = app
            .send(
                Method::PATCH,
                &format!("/contacts/{id}"),
                Some(json!({ "field": "business_name", "value": "   " })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["business_name"], Value::Null);

        let (status, body) = app
            .send(
                Method::PATCH,
                &format!("/contacts/{id}"),
                Some(json!({ "field": "status", "value": "closed won" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("closed won"));

        for expected in 1..=2 {
            let (status, body) = app
                .send(Method::POST, &format!("/contacts/{id}/interactions"), None)
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["contact_count"], expected);
            assert!(body["last_contacted_at"].is_string());
        }

        let (status, _) = app.send(Method::DELETE, &format!("/contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = app.send(Method::DELETE, &format!("/contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn contact_in_missing_category_is_not_found() {
        let app = TestApp::new();
        let (status, _) = app
            .send(
                Method::POST,
                &format!("/categories/{}/contacts", uuid::Uuid::new_v4()),
                Some(json!({})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn partition_splits_completed() {
        let app = TestApp::new();
        let cat = app.category("Cafes").await;
        for status in ["Lead", "Completed", "Closed Won"] {
            app.send(
                Method::POST,
                &format!("/categories/{cat}/contacts"),
                Some(json!({ "business_name": status, "status": status })),
            )
            .await;
        }

        let (status, body) = app
            .send(Method::GET, &format!("/categories/{cat}/contacts/partition"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let active: Vec<_> = body["active"].as_array().unwrap().iter().map(|c| c["status"].clone()).collect();
        assert_eq!(active, [json!("Closed Won"), json!("Lead")]);
        assert_eq!(body["completed"][0]["status"], "Completed");
    }

    #[tokio::test]
    async fn user_email_variations_and_copy() {
        let app = TestApp::new();

        let (status, rows) = app
            .send(Method::POST, "/user-emails", Some(json!({ "email": " abc@x.com " })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let emails: Vec<_> = rows.as_array().unwrap().iter().map(|r| r["email"].clone()).collect();
        assert_eq!(emails, [json!("abc@x.com"), json!("ab.c@x.com"), json!("a.b.c@x.com")]);
        assert_eq!(rows[0]["credits"], 5);
        assert_eq!(rows[0]["max_monthly_credits"], 30);
        assert_eq!(rows[0]["copy_window_active"], false);

        // Adding again inserts nothing new.
        let (_, again) = app
            .send(Method::POST, "/user-emails", Some(json!({ "email": "abc@x.com" })))
            .await;
        assert_eq!(again.as_array().unwrap().len(), 3);

        let (_, bases) = app.send(Method::GET, "/user-emails/bases", None).await;
        assert_eq!(bases, json!(["abc@x.com"]));

        let id = rows[1]["id"].as_str().unwrap().to_string();
        let (status, copied) = app.send(Method::POST, &format!("/user-emails/{id}/copy"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(copied["monthly_credits"], 5);
        assert_eq!(copied["copy_window_active"], true);

        let (_, listed) = app.send(Method::GET, "/user-emails?base=abc@x.com", None).await;
        assert_eq!(listed[1]["monthly_credits"], 5);
        assert_eq!(listed[1]["copy_window_active"], true);

        let (status, updated) = app
            .send(
                Method::PATCH,
                &format!("/user-emails/{id}/status"),
                Some(json!({ "status": "Errors" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "Errors");

        let (status, countdown) = app.send(Method::GET, "/user-emails/reset-countdown", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(countdown["total_ms"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn compensation_report_validates_rates() {
        let app = TestApp::new();
        let body = json!({
            "employees": [
                { "id": 1, "name": "Dev", "role": "Web Developer" },
                { "id": 3, "name": "Closer", "role": "Sales Agent" }
            ],
            "sales": [{
                "id": 1, "date": "2024-01-05", "project_name": "Site",
                "amount": 1000, "developer_id": 1, "sales_agent_id": 3
            }]
        });

        let (status, report) = app.send(Method::POST, "/compensation/report", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["employees"][0]["total_earnings"], "400");
        assert_eq!(report["totals"]["company_profit"], "300");

        let mut bad = body;
        bad["rates"] = json!({ "developer": 0.5, "sales": 0.5, "company": 0.3 });
        let (status, err) = app.send(Method::POST, "/compensation/report", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err["error"].is_string());
    }

    #[tokio::test]
    async fn transfer_round_trip_over_http() {
        let app = TestApp::new();
        app.category("Cafes").await;

        let (status, envelope) = app.send(Method::POST, "/export-data", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope["version"], "1.0");
        assert!(envelope["exportedAt"].is_string());
        assert_eq!(envelope["tables"]["contact_categories"].as_array().unwrap().len(), 1);

        let (status, result) = app.send(Method::POST, "/import-data", Some(envelope)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["success"], true);
        assert_eq!(result["results"]["contact_categories"], json!({ "inserted": 1, "errors": 0 }));
        assert_eq!(result["results"]["user_emails"], json!({ "inserted": 0, "errors": 0 }));
    }

    #[tokio::test]
    async fn import_without_tables_is_a_server_error() {
        let app = TestApp::new();
        let (status, body) = app
            .send(Method::POST, "/import-data", Some(json!({ "version": "1.0" })))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("tables"));

        let req = Request::post("/import-data").body(Body::from("{not json")).unwrap();
        let res = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn transfer_preflight_allows_client_headers() {
        let app = TestApp::new();
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/import-data")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "apikey, x-client-info")
            .body(Body::empty())
            .unwrap();
        let res = app.router.clone().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let headers = res.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap();
        assert!(allowed.contains("apikey"));
        assert!(allowed.contains("x-client-info"));
    }
}
