//! Router assembly

use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use std::path::PathBuf;
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers::{catalog, health, live, projects, systems};
use crate::middleware::track_requests;
use crate::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = PathBuf::from(&state.config.server.static_dir);
    let timeout = state.config.request_timeout();
    let max_concurrent = state.config.server.max_concurrent_requests;

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics))
        // Systems
        .route(
            "/systems",
            get(systems::list_systems).post(systems::create_system),
        )
        .route("/systems/{id}/aggregate", get(systems::system_aggregate))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route("/project_progress/{id}", put(projects::update_progress))
        // Station requirement catalog
        .route("/station_requirements", get(catalog::lookup))
        .route("/station_requirements/levels", get(catalog::resolve_level))
        .route("/update_station_requirements", post(catalog::refresh))
        .route_layer(from_fn(track_requests));

    Router::new()
        .merge(api_routes)
        .route("/ws", get(live::websocket))
        // Dashboard shell and its assets
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .layer(TimeoutLayer::new(timeout))
                .layer(ConcurrencyLimitLayer::new(max_concurrent)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    };
    use colonia_common::{
        config::AppConfig,
        db::DbPool,
        live::Observer,
    };
    use sea_orm::{ConnectOptions, Database};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const SHEET: &str = "\
Tier,Location,Category,Listed Type,Building Type,Layout,Steel,Titanium
T1,Orbital,Starport,Outpost,Civilian,Vulture,500,0
T1,Orbital,Starport,Outpost,Military,Plutus,200,100
T1,Surface,Settlement,Agricultural,Small,Consus,40,
";

    async fn test_state(config: AppConfig) -> AppState {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = DbPool::from_connection(Database::connect(opts).await.unwrap());
        db.ensure_schema().await.unwrap();
        AppState::new(Arc::new(config), db, None)
    }

    /// Temporary catalog sheet, removed on drop
    struct SheetFile(std::path::PathBuf);

    impl Drop for SheetFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn sheet_config(name: &str, contents: &str) -> (AppConfig, SheetFile) {
        let path = std::env::temp_dir().join(format!(
            "colonia-{}-{}.csv",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();

        let mut config = AppConfig::default();
        config.catalog.source_path = Some(path.to_string_lossy().into_owned());
        (config, SheetFile(path))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Observer for Recorder {
        async fn send(&self, payload: &str) -> anyhow::Result<()> {
            self.frames.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state(AppConfig::default()).await);

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["database"]["status"], "up");
    }

    #[tokio::test]
    async fn test_metrics_disabled_without_recorder() {
        let app = create_router(test_state(AppConfig::default()).await);
        let (status, _) = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_system_is_bad_request() {
        let app = create_router(test_state(AppConfig::default()).await);

        let (status, body) =
            send(&app, Method::POST, "/systems", Some(json!({"name": "HIP 100"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "HIP 100");

        let (status, body) =
            send(&app, Method::POST, "/systems", Some(json!({"name": "HIP 100"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "DUPLICATE_SYSTEM");

        let (_, body) = send(&app, Method::GET, "/systems", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_fields_are_rejected() {
        let app = create_router(test_state(AppConfig::default()).await);

        let (status, body) = send(
            &app,
            Method::POST,
            "/systems",
            Some(json!({"name": "Sol", "owner": "me"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) =
            send(&app, Method::POST, "/systems", Some(json!({"name": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "name");

        let (status, _) = send(&app, Method::GET, "/projects/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_catalog_browsing() {
        let (config, _sheet) = sheet_config("browse", SHEET);
        let app = create_router(test_state(config).await);

        let (status, summary) =
            send(&app, Method::POST, "/update_station_requirements", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["inserted"], 3);

        let (status, body) =
            send(&app, Method::GET, "/station_requirements/levels?level=2&tier=T1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Orbital", "Surface"]));

        let (status, body) = send(
            &app,
            Method::GET,
            "/station_requirements/levels?level=3&tier=T1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "location");

        let (status, _) =
            send(&app, Method::GET, "/station_requirements/levels?level=7", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::GET,
            "/station_requirements?tier=T1&location=Orbital&category=Starport\
             &listedType=Outpost&buildingType=Civilian&layout=Vulture",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commodities"], json!({"Steel": 500}));

        let (status, _) = send(
            &app,
            Method::GET,
            "/station_requirements?tier=T9&location=Orbital&category=Starport\
             &listedType=Outpost&buildingType=Civilian&layout=Vulture",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_narrow_sheet_fails_refresh() {
        let (config, sheet) = sheet_config("narrow", "Tier,Location,Category\nT1,X,Y\n");
        let app = create_router(test_state(config).await);

        let (status, body) =
            send(&app, Method::POST, "/update_station_requirements", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("expected at least 7 columns, found 3"));

        let path = sheet.0.clone();
        drop(sheet);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_project_lifecycle_broadcasts_updates() {
        let (config, _sheet) = sheet_config("lifecycle", SHEET);
        let state = test_state(config).await;
        let recorder = Arc::new(Recorder::default());
        state.bus.connect(recorder.clone()).await;
        let app = create_router(state);

        send(&app, Method::POST, "/update_station_requirements", None).await;
        let (_, system) =
            send(&app, Method::POST, "/systems", Some(json!({"name": "Col 285"}))).await;
        let (_, requirement) = send(
            &app,
            Method::GET,
            "/station_requirements?tier=T1&location=Orbital&category=Starport\
             &listedType=Outpost&buildingType=Military&layout=Plutus",
            None,
        )
        .await;

        let (status, project) = send(
            &app,
            Method::POST,
            "/projects",
            Some(json!({
                "name": "Plutus hub",
                "systemId": system["id"],
                "requirementProfileId": requirement["id"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(project["progress"], json!({"Steel": 200, "Titanium": 100}));
        assert_eq!(project["completion"], 0);
        let id = project["id"].as_i64().unwrap();

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/project_progress/{}", id),
            Some(json!({"commodity": "Steel", "remaining": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["progress"], json!({"Steel": 0, "Titanium": 100}));
        assert_eq!(updated["completion"], 67);

        let (status, totals) = send(
            &app,
            Method::GET,
            &format!("/systems/{}/aggregate", system["id"]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(totals, json!({"Titanium": 100}));

        let (status, _) =
            send(&app, Method::DELETE, &format!("/projects/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::GET, &format!("/projects/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "PROJECT_NOT_FOUND");

        let expected = format!(r#"{{"type":"update","projectId":{}}}"#, id);
        let frames = recorder.frames.lock().unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|frame| *frame == expected));
    }

    #[tokio::test]
    async fn test_dashboard_is_served_without_html_injection() {
        let mut config = AppConfig::default();
        config.server.static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static").to_string();
        let app = create_router(test_state(config).await);

        let response = app
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("heading.append(project.name"));
        assert!(!page.contains("innerHTML"));
    }

    #[tokio::test]
    async fn test_missing_resources_are_not_found() {
        let app = create_router(test_state(AppConfig::default()).await);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/project_progress/41",
            Some(json!({"commodity": "Steel", "remaining": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/projects/41", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::POST,
            "/projects",
            Some(json!({"name": "Orphan", "systemId": 41})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "SYSTEM_NOT_FOUND");

        let (status, _) = send(&app, Method::GET, "/systems/41/aggregate", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
