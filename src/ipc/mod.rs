//! IPC HTTP 서버
//!
//! GUI가 쓰는 유일한 진입점. 모든 연산은 POST + JSON 본문으로 받고,
//! 결과는 `{"success": true, ...}` 또는 `{"success": false, "error":
//! {"kind", "message"}}` 봉투로 돌려줍니다. 작업 실패는 200으로 내려가고
//! HTTP 상태 코드는 전송 계층 문제에만 쓰입니다.

use anyhow::Result;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::trace::TraceLayer;

use crate::config::GlobalConfig;
use crate::error::{CoreError, ErrorBody, ErrorKind};
use crate::github::{GitHubClient, SearchCategory};
use crate::install::InstallMethod;
use crate::profile::Expansion;
use crate::update::UpdateEvent;
use crate::{git, install, profile, scan, update};

/// 핸들러들이 공유하는 상태
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GlobalConfig>,
    /// 배치 업데이트 이벤트 (SSE 구독자에게 중계)
    pub events: broadcast::Sender<UpdateEvent>,
    pub github: GitHubClient,
    /// 아카이브 다운로드용
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GlobalConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        let github = GitHubClient::with_base_url(config.github_api_base.as_deref());
        Self {
            config: Arc::new(config),
            events,
            github,
            http: reqwest::Client::new(),
        }
    }
}

/// IPC Server
pub struct IpcServer {
    pub state: AppState,
    pub listen_addr: String,
}

impl IpcServer {
    pub fn new(state: AppState, listen_addr: &str) -> Self {
        Self {
            state,
            listen_addr: listen_addr.to_string(),
        }
    }

    pub async fn start(self) -> Result<()> {
        tracing::info!("IPC HTTP server starting on {}", self.listen_addr);

        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("IPC listening on http://{}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

/// Router 생성 (통합 테스트에서 직접 사용)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/addons/scan", post(scan_addons))
        .route("/api/addons/install", post(install_addon))
        .route("/api/addons/install-file", post(install_addon_file))
        .route("/api/addons/toggle", post(toggle_addon))
        .route("/api/addons/update-all", post(update_all_addons))
        .route("/api/addons/delete", post(delete_addon))
        .route("/api/git/clone", post(git_clone))
        .route("/api/git/pull", post(git_pull))
        .route("/api/git/checkout", post(git_checkout))
        .route("/api/git/branches", post(git_branches))
        .route("/api/git/check-updates", post(git_check_updates))
        .route("/api/search", post(search_github))
        .route("/api/profile/locales", post(profile_locales))
        .route("/api/profile/connection-files", post(profile_connection_files))
        .route("/api/profile/detect-patcher", post(profile_detect_patcher))
        .route("/api/profile/inject", post(profile_inject))
        .route("/api/wow/validate", post(validate_wow_path))
        .route("/api/wow/auto-detect", post(auto_detect_wow))
        .route("/api/events", get(event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 성공 봉투: 결과 객체에 success:true를 얹음
fn ok(mut value: Value) -> Json<Value> {
    if let Value::Object(ref mut map) = value {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Json(value)
}

fn fail(err: &CoreError) -> Json<Value> {
    Json(json!({ "success": false, "error": ErrorBody::from(err) }))
}

fn fail_with(kind: ErrorKind, message: &str) -> Json<Value> {
    Json(json!({
        "success": false,
        "error": { "kind": kind, "message": message }
    }))
}

// ── 요청 본문 ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanRequest {
    addons_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallRequest {
    url: String,
    addons_folder: PathBuf,
    method: InstallMethod,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallFileRequest {
    file_path: PathBuf,
    addons_folder: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRequest {
    addon_path: PathBuf,
    enable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAllRequest {
    addons_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest {
    addon_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloneRequest {
    url: String,
    target_path: PathBuf,
    #[serde(default)]
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoRequest {
    repo_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest {
    repo_path: PathBuf,
    branch: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    query: String,
    #[serde(default)]
    category: SearchCategory,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WowPathRequest {
    wow_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionFilesRequest {
    wow_path: PathBuf,
    expansion: Expansion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InjectRequest {
    wow_path: PathBuf,
    expansion: Expansion,
    connection_string: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    path: PathBuf,
}

// ── 애드온 ──

/// POST /api/addons/scan - AddOns 폴더 스캔
async fn scan_addons(Json(req): Json<ScanRequest>) -> Json<Value> {
    match scan::scan(&req.addons_path).await {
        Ok(addons) => ok(json!({ "addons": addons })),
        Err(e) => fail(&e),
    }
}

/// POST /api/addons/install - URL에서 설치 (git 또는 zip)
async fn install_addon(
    State(state): State<AppState>,
    Json(req): Json<InstallRequest>,
) -> Json<Value> {
    match install::install_from_url(&state.http, &req.url, &req.addons_folder, req.method).await {
        Ok(outcome) => match serde_json::to_value(&outcome) {
            Ok(value) => ok(value),
            Err(e) => fail(&CoreError::Io(std::io::Error::other(e))),
        },
        Err(e) => {
            tracing::warn!("Install from {} failed: {}", req.url, e);
            fail(&e)
        }
    }
}

/// POST /api/addons/install-file - 로컬 ZIP에서 설치
async fn install_addon_file(Json(req): Json<InstallFileRequest>) -> Json<Value> {
    match install::install_from_file(&req.file_path, &req.addons_folder).await {
        Ok(outcome) => match serde_json::to_value(&outcome) {
            Ok(value) => ok(value),
            Err(e) => fail(&CoreError::Io(std::io::Error::other(e))),
        },
        Err(e) => fail(&e),
    }
}

/// POST /api/addons/toggle - 디스크립터 확장자 전환
async fn toggle_addon(Json(req): Json<ToggleRequest>) -> Json<Value> {
    match scan::set_addon_status(&req.addon_path, req.enable).await {
        Ok(status) => ok(json!({ "status": status })),
        Err(e) => fail(&e),
    }
}

/// POST /api/addons/update-all - git 애드온 일괄 pull
async fn update_all_addons(
    State(state): State<AppState>,
    Json(req): Json<UpdateAllRequest>,
) -> Json<Value> {
    match update::update_all(&req.addons_path, &state.events, state.config.update_concurrency)
        .await
    {
        Ok(summary) => ok(json!({
            "updated": summary.updated,
            "failed": summary.failed,
            "errors": summary.errors,
        })),
        Err(e) => fail(&e),
    }
}

/// POST /api/addons/delete - 애드온 폴더 삭제
async fn delete_addon(Json(req): Json<DeleteRequest>) -> Json<Value> {
    match scan::delete_addon(&req.addon_path).await {
        Ok(()) => ok(json!({})),
        Err(e) => fail(&e),
    }
}

// ── git ──

/// POST /api/git/clone
async fn git_clone(Json(req): Json<CloneRequest>) -> Json<Value> {
    let resolved = crate::repo_url::parse_github_url(&req.url);
    let branch = req.branch.as_deref().or(resolved.branch.as_deref());
    match git::clone(&resolved.repo_url, &req.target_path, branch).await {
        Ok(()) => ok(json!({})),
        Err(e) => fail(&e),
    }
}

/// POST /api/git/pull
async fn git_pull(Json(req): Json<RepoRequest>) -> Json<Value> {
    match git::pull(&req.repo_path).await {
        Ok(()) => ok(json!({})),
        Err(e) => fail(&e),
    }
}

/// POST /api/git/checkout
async fn git_checkout(Json(req): Json<CheckoutRequest>) -> Json<Value> {
    match git::checkout(&req.repo_path, &req.branch).await {
        Ok(()) => ok(json!({})),
        Err(e) => fail(&e),
    }
}

/// POST /api/git/branches
async fn git_branches(Json(req): Json<RepoRequest>) -> Json<Value> {
    match git::branches(&req.repo_path).await {
        Ok(list) => ok(json!({ "branches": list.all, "current": list.current })),
        Err(e) => fail(&e),
    }
}

/// POST /api/git/check-updates - fetch 후 upstream 대비 뒤처진 커밋 수
async fn git_check_updates(Json(req): Json<RepoRequest>) -> Json<Value> {
    match git::check_updates(&req.repo_path).await {
        Ok(check) => ok(json!({ "hasUpdates": check.has_updates, "behind": check.behind })),
        Err(e) => fail(&e),
    }
}

// ── 검색 ──

/// POST /api/search - GitHub 저장소 검색
async fn search_github(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Json<Value> {
    let results = state.github.search(&req.query, req.category).await;
    ok(json!({ "results": results }))
}

// ── 서버 프로필 ──

/// POST /api/profile/locales
async fn profile_locales(Json(req): Json<WowPathRequest>) -> Json<Value> {
    match profile::get_locale_folders(&req.wow_path).await {
        Ok(locales) => ok(json!({ "locales": locales })),
        Err(e) => fail(&e),
    }
}

/// POST /api/profile/connection-files
async fn profile_connection_files(Json(req): Json<ConnectionFilesRequest>) -> Json<Value> {
    match profile::detect_connection_files(&req.wow_path, req.expansion).await {
        Ok(files) => ok(json!({ "files": files })),
        Err(e) => fail(&e),
    }
}

/// POST /api/profile/detect-patcher
async fn profile_detect_patcher(Json(req): Json<WowPathRequest>) -> Json<Value> {
    match profile::detect_custom_patcher(&req.wow_path).await {
        Some(patcher) => ok(json!({ "found": true, "path": patcher.path, "type": patcher.kind })),
        None => ok(json!({ "found": false })),
    }
}

/// POST /api/profile/inject - 접속 문자열 주입
async fn profile_inject(Json(req): Json<InjectRequest>) -> Json<Value> {
    match profile::inject_server_profile(&req.wow_path, req.expansion, &req.connection_string)
        .await
    {
        Ok(report) => ok(json!({
            "modifiedFiles": report.modified_files,
            "warnings": report.warnings,
        })),
        Err(e) => fail(&e),
    }
}

// ── 클라이언트 경로 ──

/// POST /api/wow/validate
async fn validate_wow_path(Json(req): Json<ValidateRequest>) -> Json<Value> {
    match profile::validate_wow_path(&req.path).await {
        Some(install) => ok(json!(install)),
        None => fail_with(ErrorKind::NotFound, "No WoW executable found in this folder"),
    }
}

/// POST /api/wow/auto-detect - 흔한 설치 위치 탐색
async fn auto_detect_wow(Json(_req): Json<Value>) -> Json<Value> {
    match profile::auto_detect_wow_folder().await {
        Some(install) => {
            let mut body = json!({ "path": install.addons_path });
            if let Some(exe) = install.executable_path {
                body["executablePath"] = json!(exe);
            }
            ok(body)
        }
        None => fail_with(ErrorKind::NotFound, "WoW installation not found"),
    }
}

// ── 이벤트 스트림 ──

/// GET /api/events - 배치 업데이트 이벤트 SSE
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|event| match event {
        Ok(event) => Event::default()
            .json_data(&event)
            .ok()
            .map(Ok::<_, Infallible>),
        // 밀린 수신자는 놓친 이벤트를 건너뜀
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_merges_flag() {
        let Json(value) = ok(json!({ "updated": 3 }));
        assert_eq!(value["success"], true);
        assert_eq!(value["updated"], 3);
    }

    #[test]
    fn failure_envelope_carries_kind() {
        let err = CoreError::AlreadyInstalled("pfUI".to_string());
        let Json(value) = fail(&err);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["kind"], "conflict");
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("pfUI"));
    }

    #[test]
    fn install_request_accepts_camel_case() {
        let req: InstallRequest = serde_json::from_str(
            r#"{"url":"https://github.com/shagu/pfUI","addonsFolder":"/wow/Interface/AddOns","method":"git"}"#,
        )
        .unwrap();
        assert_eq!(req.method, InstallMethod::Git);
        assert!(req.addons_folder.ends_with("AddOns"));
    }
}
