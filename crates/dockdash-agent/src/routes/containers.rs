//! Container endpoints

use super::AppState;
use crate::docker::network::resolve_container_mode;
use crate::docker::{ContainerStats, ContainerSummary, PruneReport};
use crate::error::{replace_status, AgentError, Result};
use crate::replace::{original_name, ReplaceOutcome};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dockdash_core::{ContainerDescriptor, ContainerStatus, CreationSpec, NetworkPlan};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

const DEFAULT_LOG_TAIL: usize = 200;
const MAX_LOG_TAIL: usize = 2000;

const MASKED: &str = "********";
const SENSITIVE_ENV_KEYS: [&str; 6] = ["password", "secret", "key", "token", "api_key", "apikey"];

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_ENV_KEYS.iter().any(|s| key.contains(s))
}

/// Hide values of credential-looking environment variables
fn mask_env(descriptor: &mut ContainerDescriptor) {
    for (key, value) in descriptor.env.iter_mut() {
        if value.is_some() && is_sensitive(key) {
            *value = Some(MASKED.to_string());
        }
    }
}

/// Same masking for a create body's `KEY=value` list
fn mask_env_list(env: &mut Value) {
    let Some(entries) = env.as_array_mut() else {
        return;
    };
    for entry in entries {
        let masked = match entry.as_str().and_then(|e| e.split_once('=')) {
            Some((key, _)) if is_sensitive(key) => format!("{}={}", key, MASKED),
            _ => continue,
        };
        *entry = Value::String(masked);
    }
}

/// Refuse lifecycle changes while the container is being replaced
///
/// The guard is keyed on canonical names, so IDs are resolved first. A
/// container parked under its rollback name belongs to the replacement of
/// its original name.
async fn ensure_idle(state: &AppState, container: &str) -> Result<()> {
    let descriptor = state.engine.inspect_container(container).await?;
    let name = original_name(&descriptor.name).unwrap_or(&descriptor.name);
    if state.guards.is_busy(name) {
        return Err(AgentError::ReplaceConflict(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub tail: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecreateRequest {
    #[serde(alias = "pull_latest")]
    pub pull_latest: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRecreateRequest {
    /// Names or IDs, replaced one after another in this order
    #[serde(alias = "container_ids", alias = "containerIds")]
    pub containers: Vec<String>,
    #[serde(alias = "pull_latest")]
    pub pull_latest: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ContainerResponse {
    pub success: bool,
    pub container: ContainerDescriptor,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub name: String,
    pub image: String,
    pub config: Value,
    pub status: ContainerStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    fn done(container: &str, action: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: format!("Container {} {}", container, action),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub container: String,
    pub stats: ContainerStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: PruneReport,
}

#[derive(Debug, Serialize)]
pub struct BulkRecreateItem {
    pub container: String,
    #[serde(flatten)]
    pub outcome: ReplaceOutcome,
}

#[derive(Debug, Serialize)]
pub struct BulkRecreateResponse {
    pub success: bool,
    pub updated: usize,
    pub errors: usize,
    pub results: Vec<BulkRecreateItem>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub success: bool,
    pub container: String,
    pub logs: String,
}

/// GET /v1/containers
pub async fn list_containers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContainerSummary>>> {
    Ok(Json(state.engine.list_containers(query.all).await?))
}

/// GET /v1/containers/{container}
pub async fn get_container(
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<ContainerResponse>> {
    let mut descriptor = state.engine.inspect_container(&container).await?;
    mask_env(&mut descriptor);

    Ok(Json(ContainerResponse {
        success: true,
        container: descriptor,
    }))
}

/// GET /v1/containers/{container}/config
///
/// The create body a replacement of this container would be built from.
pub async fn get_config(
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<ConfigResponse>> {
    let descriptor = state.engine.inspect_container(&container).await?;

    let mut plan = NetworkPlan::from_descriptor(&descriptor);
    let mut warnings = Vec::new();
    if let Err(e) = resolve_container_mode(state.engine.as_ref(), &mut plan).await {
        warnings.push(format!(
            "Could not resolve network mode {}: {}",
            plan.mode.as_deref().unwrap_or_default(),
            e
        ));
    }

    let spec = CreationSpec::from_descriptor(&descriptor, &plan).ok_or_else(|| {
        AgentError::BadRequest(format!(
            "Cannot determine image for container {}",
            descriptor.name
        ))
    })?;
    let mut config = spec.to_body().map_err(|_| AgentError::Unknown)?;
    if let Some(env) = config.get_mut("Env") {
        mask_env_list(env);
    }

    Ok(Json(ConfigResponse {
        success: true,
        name: descriptor.name.clone(),
        image: spec.image.clone(),
        config,
        status: descriptor.status(),
        warnings,
    }))
}

/// POST /v1/containers/{container}/start
pub async fn start_container(
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<ActionResponse>> {
    ensure_idle(&state, &container).await?;
    state.engine.start_container(&container).await?;
    info!("Started container {}", container);
    Ok(ActionResponse::done(&container, "started"))
}

/// POST /v1/containers/{container}/stop
pub async fn stop_container(
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<ActionResponse>> {
    ensure_idle(&state, &container).await?;
    let timeout = state.config.replace.stop_timeout_secs();
    state.engine.stop_container(&container, timeout).await?;
    info!("Stopped container {}", container);
    Ok(ActionResponse::done(&container, "stopped"))
}

/// POST /v1/containers/{container}/restart
pub async fn restart_container(
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<ActionResponse>> {
    ensure_idle(&state, &container).await?;
    let timeout = state.config.replace.stop_timeout_secs();
    state.engine.restart_container(&container, timeout).await?;
    info!("Restarted container {}", container);
    Ok(ActionResponse::done(&container, "restarted"))
}

/// DELETE /v1/containers/{container}
pub async fn remove_container(
    State(state): State<AppState>,
    Path(container): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> Result<Json<ActionResponse>> {
    ensure_idle(&state, &container).await?;
    state.engine.remove_container(&container, query.force).await?;
    info!("Removed container {} (force: {})", container, query.force);
    Ok(ActionResponse::done(&container, "removed"))
}

/// GET /v1/containers/{container}/logs
pub async fn logs(
    State(state): State<AppState>,
    Path(container): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>> {
    let tail = query
        .tail
        .unwrap_or(DEFAULT_LOG_TAIL)
        .clamp(1, MAX_LOG_TAIL);
    let lines = state.engine.logs(&container, tail).await?;

    Ok(Json(LogsResponse {
        success: true,
        container,
        logs: lines.join("\n"),
    }))
}

/// GET /v1/containers/{container}/stats
pub async fn stats(
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<StatsResponse>> {
    let stats = state.engine.container_stats(&container).await?;

    Ok(Json(StatsResponse {
        success: true,
        container,
        stats,
    }))
}

/// POST /v1/containers/prune
///
/// Refused while a replacement is in flight: its original sits stopped under
/// a rollback name and would be pruned with the rest.
pub async fn prune(State(state): State<AppState>) -> Result<Json<PruneResponse>> {
    if !state.guards.is_empty() {
        return Err(AgentError::ContainerConflict(format!(
            "Cannot prune while {} replacement(s) are in progress",
            state.guards.len()
        )));
    }

    let report = state.engine.prune_containers().await?;
    info!(
        "Pruned {} stopped containers, reclaimed {} bytes",
        report.containers_deleted.len(),
        report.space_reclaimed
    );

    Ok(Json(PruneResponse {
        success: true,
        report,
    }))
}

/// Replace one container under its name guard
async fn replace_guarded(
    state: &AppState,
    container: &str,
    pull_latest: bool,
) -> Result<(StatusCode, ReplaceOutcome)> {
    // Guard on the canonical name so an ID and a name cannot race
    let current = state.engine.inspect_container(container).await?;
    let _guard = state
        .guards
        .try_acquire(&current.name)
        .ok_or_else(|| AgentError::ReplaceConflict(current.name.clone()))?;

    let result = state.replacer.run(&current.name, pull_latest).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => replace_status(e),
    };

    Ok((status, ReplaceOutcome::from(&result)))
}

/// POST /v1/containers/recreate
///
/// Replaces the listed containers one at a time; a failure does not stop the
/// rest.
pub async fn recreate_many(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BulkRecreateResponse>> {
    let request: BulkRecreateRequest = serde_json::from_slice(&body)?;
    if request.containers.is_empty() {
        return Err(AgentError::BadRequest(
            "No containers given to recreate".to_string(),
        ));
    }
    let pull_latest = request.pull_latest.unwrap_or(state.config.pull_latest);

    let mut results = Vec::with_capacity(request.containers.len());
    for container in request.containers {
        let outcome = match replace_guarded(&state, &container, pull_latest).await {
            Ok((_, outcome)) => outcome,
            Err(e) => ReplaceOutcome::failed(e.to_string()),
        };
        results.push(BulkRecreateItem { container, outcome });
    }

    let updated = results.iter().filter(|r| r.outcome.success).count();
    let errors = results.len() - updated;
    info!("Bulk recreate: {} updated, {} failed", updated, errors);

    Ok(Json(BulkRecreateResponse {
        success: errors == 0,
        updated,
        errors,
        results,
    }))
}

/// POST /v1/containers/{container}/recreate
///
/// The body is optional; without `pullLatest` the configured default applies.
pub async fn recreate_container(
    State(state): State<AppState>,
    Path(container): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ReplaceOutcome>)> {
    let request: RecreateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RecreateRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let pull_latest = request.pull_latest.unwrap_or(state.config.pull_latest);

    let (status, outcome) = replace_guarded(&state, &container, pull_latest).await?;
    Ok((status, Json(outcome)))
}

#[cfg(test)]
mod tests {
    use super::super::{create_router, test_support::*};
    use super::*;
    use crate::docker::fake::{web_inspect, FakeEngine, Op, StartBehavior};
    use crate::docker::ContainerEngine;
    use serde_json::json;
    use std::sync::Arc;

    /// `web` plus a stopped `db` with credentials in its environment
    fn engine() -> Arc<FakeEngine> {
        let engine = Arc::new(FakeEngine::new());
        engine.insert(web_inspect());

        let mut db = web_inspect();
        db.as_object_mut().unwrap().remove("Id");
        db["Name"] = json!("/db");
        db["State"] = json!({"Status": "exited", "Running": false, "ExitCode": 0});
        db["Config"]["Image"] = json!("postgres:16");
        db["Config"]["Env"] = json!(["POSTGRES_PASSWORD=hunter2", "PGDATA=/data", "API_TOKEN=abc"]);
        db["HostConfig"]["PortBindings"] = json!({});
        db["NetworkSettings"]["Networks"] = json!({});
        engine.insert(db);

        engine
    }

    async fn call(engine: &Arc<FakeEngine>, method: &str, uri: &str) -> (StatusCode, Value) {
        send(create_router(state(engine.clone())), method, uri, None).await
    }

    #[test]
    fn test_is_sensitive() {
        assert!(is_sensitive("POSTGRES_PASSWORD"));
        assert!(is_sensitive("AWS_SECRET_ACCESS_KEY"));
        assert!(is_sensitive("ApiKey"));
        assert!(!is_sensitive("PGDATA"));
    }

    #[tokio::test]
    async fn test_list_running_and_all() {
        let engine = engine();

        let (status, body) = call(&engine, "GET", "/v1/containers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "web");

        let (_, body) = call(&engine, "GET", "/v1/containers?all=true").await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_detail_masks_credentials() {
        let app = create_router(state(engine()));
        let (status, body) = send(app, "GET", "/v1/containers/db", None).await;

        assert_eq!(status, StatusCode::OK);
        let env = &body["container"]["env"];
        assert_eq!(env["POSTGRES_PASSWORD"], MASKED);
        assert_eq!(env["API_TOKEN"], MASKED);
        assert_eq!(env["PGDATA"], "/data");
    }

    #[tokio::test]
    async fn test_detail_not_found() {
        let app = create_router(state(engine()));
        let (status, body) = send(app, "GET", "/v1/containers/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "container_not_found");
    }

    #[tokio::test]
    async fn test_config_is_create_body() {
        let app = create_router(state(engine()));
        let (status, body) = send(app, "GET", "/v1/containers/web/config", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["image"], "nginx:1.27");
        assert_eq!(body["status"], "running");
        assert_eq!(body["config"]["Image"], "nginx:1.27");
        assert_eq!(
            body["config"]["HostConfig"]["PortBindings"]["80/tcp"][0]["HostPort"],
            "8080"
        );
    }

    #[tokio::test]
    async fn test_config_masks_credentials() {
        let app = create_router(state(engine()));
        let (status, body) = send(app, "GET", "/v1/containers/db/config", None).await;

        assert_eq!(status, StatusCode::OK);
        let env: Vec<&str> = body["config"]["Env"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e.as_str().unwrap())
            .collect();
        assert!(env.contains(&"POSTGRES_PASSWORD=********"));
        assert!(env.contains(&"API_TOKEN=********"));
        assert!(env.contains(&"PGDATA=/data"));
        assert!(!env.iter().any(|e| e.contains("hunter2")));
    }

    #[tokio::test]
    async fn test_lifecycle_actions() {
        let engine = engine();

        let (status, body) = call(&engine, "POST", "/v1/containers/web/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Container web stopped");
        assert!(!engine.descriptor("web").unwrap().is_running());

        let (status, _) = call(&engine, "POST", "/v1/containers/web/start").await;
        assert_eq!(status, StatusCode::OK);
        assert!(engine.descriptor("web").unwrap().is_running());

        let (status, _) = call(&engine, "POST", "/v1/containers/web/restart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(engine.calls(Op::Restart), 1);
    }

    #[tokio::test]
    async fn test_remove_running_needs_force() {
        let engine = engine();

        let (status, body) = call(&engine, "DELETE", "/v1/containers/web").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "container_conflict");

        let (status, _) = call(&engine, "DELETE", "/v1/containers/web?force=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(engine.names(), vec!["db".to_string()]);
    }

    #[tokio::test]
    async fn test_logs_tail_is_clamped() {
        let engine = engine();
        engine.push_logs("web", &["one", "two", "three"]);

        let (status, body) = call(&engine, "GET", "/v1/containers/web/logs?tail=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["container"], "web");
        assert_eq!(body["logs"], "two\nthree");

        let (_, body) = call(&engine, "GET", "/v1/containers/web/logs?tail=0").await;
        assert_eq!(body["logs"], "three");
    }

    #[tokio::test]
    async fn test_recreate() {
        let engine = engine();
        let app = create_router(state(engine.clone()));

        let (status, body) = send(
            app,
            "POST",
            "/v1/containers/web/recreate",
            Some(json!({"pullLatest": false})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Container web recreated successfully");
        assert_eq!(body["containerId"].as_str().unwrap().len(), 12);
        assert_eq!(engine.calls(Op::Pull), 0);
        assert_eq!(engine.names(), vec!["db".to_string(), "web".to_string()]);
    }

    #[tokio::test]
    async fn test_recreate_uses_configured_pull_default() {
        let engine = engine();
        let app = create_router(state(engine.clone()));

        let (status, _) = send(app, "POST", "/v1/containers/web/recreate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(engine.calls(Op::Pull), 1);
    }

    #[tokio::test]
    async fn test_recreate_crash_rolls_back() {
        let engine = engine();
        engine.on_start(StartBehavior::Crash {
            exit_code: 1,
            logs: vec!["fatal: missing config".to_string()],
        });
        let app = create_router(state(engine.clone()));

        let (status, body) = send(
            app,
            "POST",
            "/v1/containers/web/recreate",
            Some(json!({"pull_latest": false})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["manualInterventionRequired"], false);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("exit code 1"));
        assert!(error.contains("fatal: missing config"));
        assert!(engine.descriptor("web").unwrap().is_running());
    }

    #[tokio::test]
    async fn test_recreate_in_flight_conflict() {
        let engine = engine();
        let state = state(engine.clone());
        let _busy = state.guards.try_acquire("web").unwrap();

        let app = create_router(state.clone());
        let (status, body) = send(app, "POST", "/v1/containers/web/recreate", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "replace_conflict");

        let app = create_router(state);
        let (status, _) = send(app, "POST", "/v1/containers/web/stop", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(engine.calls(Op::Create), 0);
    }

    #[tokio::test]
    async fn test_busy_container_addressed_by_id() {
        let engine = engine();
        let id = engine.descriptor("web").unwrap().id;
        let state = state(engine.clone());
        let _busy = state.guards.try_acquire("web").unwrap();

        let uri = format!("/v1/containers/{}/stop", id);
        let (status, body) = send(create_router(state.clone()), "POST", &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "replace_conflict");

        let uri = format!("/v1/containers/{}?force=true", &id[..12]);
        let (status, _) = send(create_router(state), "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        assert_eq!(engine.calls(Op::Stop), 0);
        assert_eq!(engine.calls(Op::Remove), 0);
        assert!(engine.descriptor("web").unwrap().is_running());
    }

    #[tokio::test]
    async fn test_parked_original_belongs_to_its_replacement() {
        let engine = engine();
        engine
            .rename_container("web", "web__rollback_1760000000")
            .await
            .unwrap();
        let state = state(engine.clone());
        let _busy = state.guards.try_acquire("web").unwrap();

        let (status, _) = send(
            create_router(state),
            "DELETE",
            "/v1/containers/web__rollback_1760000000?force=true",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(engine.names(), vec!["db".to_string(), "web__rollback_1760000000".to_string()]);
    }

    #[tokio::test]
    async fn test_stats() {
        let engine = engine();

        let (status, body) = call(&engine, "GET", "/v1/containers/web/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["container"], "web");
        assert_eq!(body["stats"]["memoryPercent"], 12.5);
        assert_eq!(body["stats"]["cpuPercent"], 2.5);

        let (_, body) = call(&engine, "GET", "/v1/containers/db/stats").await;
        assert_eq!(body["stats"]["memoryUsage"], 0);

        let (status, _) = call(&engine, "GET", "/v1/containers/missing/stats").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prune_removes_stopped_containers() {
        let engine = engine();
        let db_id = engine.descriptor("db").unwrap().id;

        let (status, body) = call(&engine, "POST", "/v1/containers/prune").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["containersDeleted"], json!([db_id]));
        assert_eq!(engine.names(), vec!["web".to_string()]);
    }

    #[tokio::test]
    async fn test_prune_refused_during_replacement() {
        let engine = engine();
        let state = state(engine.clone());
        let _busy = state.guards.try_acquire("web").unwrap();

        let (status, body) = send(create_router(state), "POST", "/v1/containers/prune", None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "container_conflict");
        assert_eq!(engine.calls(Op::Prune), 0);
        assert_eq!(engine.names().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_recreate() {
        let engine = engine();
        let old_web = engine.descriptor("web").unwrap().id;
        let app = create_router(state(engine.clone()));

        let (status, body) = send(
            app,
            "POST",
            "/v1/containers/recreate",
            Some(json!({"container_ids": ["web", "ghost", "db"], "pullLatest": false})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["updated"], 2);
        assert_eq!(body["errors"], 1);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results[0]["container"], "web");
        assert_eq!(results[0]["success"], true);
        assert_eq!(results[1]["container"], "ghost");
        assert!(results[1]["error"].as_str().unwrap().contains("ghost"));
        assert_eq!(results[2]["success"], true);
        assert_ne!(engine.descriptor("web").unwrap().id, old_web);
        assert_eq!(engine.calls(Op::Pull), 0);
    }

    #[tokio::test]
    async fn test_bulk_recreate_skips_busy_and_rejects_empty() {
        let engine = engine();
        let state = state(engine.clone());
        let _busy = state.guards.try_acquire("web").unwrap();

        let (status, body) = send(
            create_router(state.clone()),
            "POST",
            "/v1/containers/recreate",
            Some(json!({"containers": ["web"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["errors"], 1);
        assert!(body["results"][0]["error"]
            .as_str()
            .unwrap()
            .contains("already in progress"));
        assert_eq!(engine.calls(Op::Create), 0);

        let (status, _) = send(
            create_router(state),
            "POST",
            "/v1/containers/recreate",
            Some(json!({"containers": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_recreate_missing_and_bad_body() {
        let engine = engine();

        let (status, _) = call(&engine, "POST", "/v1/containers/missing/recreate").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            create_router(state(engine)),
            "POST",
            "/v1/containers/web/recreate",
            Some(json!({"pullLatest": "yes"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "general_bad_request");
    }
}
