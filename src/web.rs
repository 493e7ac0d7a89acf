use crate::aggregate::collect;
use crate::fetch::StatusClient;
use crate::render::{render_page, PageOptions};
use crate::settings::MonitorConfig;
use axum::{
    extract::{Query, State},
    http::Uri,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    config: Arc<MonitorConfig>,
    client: StatusClient,
}

impl AppState {
    pub fn new(config: Arc<MonitorConfig>, client: StatusClient) -> Self {
        Self { config, client }
    }
}

pub fn router(state: AppState, assets_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/status", get(status_handler))
        .layer(cors);

    Router::new()
        .route("/", get(dashboard_handler))
        .merge(api)
        .nest_service("/static", ServeDir::new(assets_dir))
        .with_state(state)
}

pub async fn start_web_server(
    state: AppState,
    bind: &str,
    port: u16,
    assets_dir: PathBuf,
) -> anyhow::Result<()> {
    let app = router(state, &assets_dir);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, port)).await?;
    info!("Web server listening on {}:{}", bind, port);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    refresh: Option<String>,
    details: Option<String>,
}

impl DashboardQuery {
    /// Refresh seconds; missing, empty or unparsable values use the default.
    fn refresh(&self, default: u64) -> u64 {
        self.refresh
            .as_deref()
            .and_then(|r| r.trim().parse::<u64>().ok())
            .filter(|r| *r > 0)
            .unwrap_or(default)
    }

    fn details(&self) -> bool {
        matches!(self.details.as_deref(), Some(d) if !d.is_empty() && d != "0")
    }
}

async fn dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
    uri: Uri,
) -> impl IntoResponse {
    let opts = PageOptions {
        refresh: params.refresh(state.config.refresh_secs),
        details: params.details(),
        request_uri: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string()),
    };

    let report = collect(&state.client, &state.config).await;
    Html(render_page(&report, &opts))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let report = collect(&state.client, &state.config).await;
    Json(serde_json::json!({
        "success": true,
        "data": report
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::instance;
    use crate::status::tests::FIXTURE;
    use crate::xpath::TagScanner;
    use std::time::Duration;

    #[test]
    fn test_query_parsing() {
        let q = DashboardQuery::default();
        assert_eq!(q.refresh(60), 60);
        assert!(!q.details());

        let q = DashboardQuery {
            refresh: Some("15".to_string()),
            details: Some("1".to_string()),
        };
        assert_eq!(q.refresh(60), 15);
        assert!(q.details());

        let q = DashboardQuery {
            refresh: Some("".to_string()),
            details: Some("0".to_string()),
        };
        assert_eq!(q.refresh(60), 60);
        assert!(!q.details());

        let q = DashboardQuery {
            refresh: Some("0".to_string()),
            details: None,
        };
        assert_eq!(q.refresh(45), 45);
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_dashboard_and_api_routes() {
        let gateway = spawn(Router::new().route("/status.xml", get(|| async { FIXTURE }))).await;

        let config = Arc::new(MonitorConfig {
            instances: vec![instance("Kannel 1", &gateway)],
            ..MonitorConfig::default()
        });
        let client = StatusClient::new(Duration::from_secs(5), TagScanner::default()).unwrap();
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join("kannel.css"), "body {}").unwrap();
        let monitor = spawn(router(AppState::new(config, client), assets.path())).await;

        let page = reqwest::get(format!("{}/?refresh=20&details=1", monitor))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("content=\"20; URL=/?refresh=20&amp;details=1\""));
        assert!(page.contains("SMSC connection details</h4>"));
        assert!(page.contains("(all) <b>1.500</b> msgs"));

        let api: serde_json::Value = reqwest::get(format!("{}/api/status", monitor))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(api["success"], true);
        assert_eq!(api["data"]["totals"]["received_total"], 1500);
        assert_eq!(api["data"]["instances"][0]["reachable"], true);

        let css = reqwest::get(format!("{}/static/kannel.css", monitor))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(css, "body {}");
    }

    #[tokio::test]
    async fn test_details_link_can_be_followed() {
        let gateway = spawn(Router::new().route("/status.xml", get(|| async { FIXTURE }))).await;

        let config = Arc::new(MonitorConfig {
            instances: vec![instance("Kannel 1", &gateway)],
            ..MonitorConfig::default()
        });
        let client = StatusClient::new(Duration::from_secs(5), TagScanner::default()).unwrap();
        let assets = tempfile::tempdir().unwrap();
        let monitor = spawn(router(AppState::new(config, client), assets.path())).await;

        let page = reqwest::get(format!("{}/?details=0", monitor))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let marker = "\">SMSC connection details</a>";
        let end = page.find(marker).unwrap();
        let start = page[..end].rfind("href=\"").unwrap() + "href=\"".len();
        let link = page[start..end].replace("&amp;", "&");
        assert_eq!(link, "/?details=1");

        let response = reqwest::get(format!("{}{}", monitor, link)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("SMSC connection details</h4>"));
    }
}
