//! HTTP API over the task catalog and the evaluation orchestrator

use std::convert::Infallible;
use std::net::SocketAddr;

use anyhow::Context;
use patchbench_core::catalog::CatalogHandle;
use patchbench_core::config::AppConfig;
use patchbench_core::error::{BenchError, UnifiedError};
use patchbench_eval::runner::validate_task_id;
use patchbench_eval::{EvalErrorKind, EvalOrchestrator, EvaluationOutcome, EvaluationRequest};
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::api_types::{
    ErrorBody, EvaluationBatchRequest, HealthResponse, RootResponse, TaskBatchRequest,
};

/// Largest accepted request body (16 MiB)
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    catalog: CatalogHandle,
    orchestrator: EvalOrchestrator,
    batch_concurrency: usize,
}

impl AppState {
    pub fn new(catalog: CatalogHandle, orchestrator: EvalOrchestrator, batch_concurrency: usize) -> Self {
        Self {
            catalog,
            orchestrator,
            batch_concurrency,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            CatalogHandle::from_config(&config.catalog),
            EvalOrchestrator::new(config.harness.clone()),
            config.server.batch_concurrency,
        )
    }
}

/// All routes with CORS and rejection handling applied
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let root = warp::path::end().and(warp::get()).map(|| {
        warp::reply::json(&RootResponse {
            message: "Welcome to SWE-bench API".to_string(),
        })
    });

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: AppState| {
            warp::reply::json(&HealthResponse {
                status: "ok".to_string(),
                catalog: state.catalog.status().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
        });

    let get_task = warp::path!("api" / "v1" / "tasks" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_get_task);

    let tasks_batch = warp::path!("api" / "v1" / "tasks" / "batch")
        .and(warp::post())
        .and(json_body::<TaskBatchRequest>())
        .and(with_state(state.clone()))
        .and_then(handle_tasks_batch);

    let evaluate = warp::path!("api" / "v1" / "evaluate")
        .and(warp::post())
        .and(json_body::<EvaluationRequest>())
        .and(with_state(state.clone()))
        .and_then(handle_evaluate);

    let evaluate_batch = warp::path!("api" / "v1" / "evaluate" / "batch")
        .and(warp::post())
        .and(json_body::<EvaluationBatchRequest>())
        .and(with_state(state))
        .and_then(handle_evaluate_batch);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["POST", "GET"]);

    root.or(health)
        .or(get_task)
        .or(tasks_batch)
        .or(evaluate)
        .or(evaluate_batch)
        .recover(handle_rejection)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Bind and serve until Ctrl-C
pub async fn start_http_server(config: AppConfig) -> anyhow::Result<()> {
    let addr = resolve(&config.server.host, config.server.port).await?;
    let state = AppState::from_config(&config);

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(address = %bound, "HTTP server listening");
    server.await;
    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {}:{}", host, port))?
        .next()
        .with_context(|| format!("no address for {}:{}", host, port))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn json_response<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_response(error: &BenchError) -> Response {
    let status = match error {
        BenchError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        BenchError::NotFound { .. } => StatusCode::NOT_FOUND,
        BenchError::CatalogUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let detail = match error {
        BenchError::NotFound { message, .. } | BenchError::InvalidInput { message, .. } => {
            message.clone()
        }
        BenchError::CatalogUnavailable { reason } => reason.clone(),
        other => other.to_string(),
    };
    if error.is_input_error() {
        tracing::debug!(code = error.error_code(), error = %error, "Request rejected");
    } else {
        tracing::error!(code = error.error_code(), error = %error, "Request failed");
    }
    json_response(&ErrorBody::new(detail), status)
}

async fn handle_get_task(task_id: String, state: AppState) -> Result<Response, Rejection> {
    let response = match state.catalog.get().and_then(|catalog| catalog.lookup(&task_id)) {
        Ok(task) => json_response(&task, StatusCode::OK),
        Err(e) => error_response(&e),
    };
    Ok(response)
}

async fn handle_tasks_batch(
    request: TaskBatchRequest,
    state: AppState,
) -> Result<Response, Rejection> {
    let response = match state
        .catalog
        .get()
        .and_then(|catalog| catalog.lookup_many(&request.task_ids))
    {
        Ok(tasks) => json_response(&tasks, StatusCode::OK),
        Err(e) => error_response(&e),
    };
    Ok(response)
}

async fn handle_evaluate(
    request: EvaluationRequest,
    state: AppState,
) -> Result<Response, Rejection> {
    if let Err(e) = validate_task_id(&request.task_id) {
        return Ok(error_response(&e));
    }

    // Unknown tasks are refused only when the catalog can answer
    if let Ok(catalog) = state.catalog.get() {
        if let Err(e) = catalog.lookup(&request.task_id) {
            return Ok(error_response(&e));
        }
    }

    let response = match state
        .orchestrator
        .try_evaluate(&request.task_id, &request.prediction)
        .await
    {
        Ok(outcome) => json_response(&outcome, StatusCode::OK),
        Err(e) => error_response(&e),
    };
    Ok(response)
}

async fn handle_evaluate_batch(
    request: EvaluationBatchRequest,
    state: AppState,
) -> Result<Response, Rejection> {
    let catalog = state.catalog.clone();
    let precheck = move |request: &EvaluationRequest| {
        let catalog = catalog.get().ok()?;
        if catalog.contains(&request.task_id) {
            return None;
        }
        Some(EvaluationOutcome::failed(
            &request.task_id,
            None,
            EvalErrorKind::UnknownTask,
            format!("Task {} not found in dataset", request.task_id),
        ))
    };

    let outcomes = state
        .orchestrator
        .evaluate_batch_with(request.predictions, state.batch_concurrency, precheck)
        .await;
    Ok(json_response(&outcomes, StatusCode::OK))
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json".to_string(),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if let Some(e) = err.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        tracing::error!(rejection = ?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };
    Ok(json_response(&ErrorBody::new(detail), status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbench_core::catalog::{DatasetEntry, LocalTaskCatalog};
    use patchbench_core::config::{HarnessConfig, SettleConfig};
    use serde_json::{Value, json};
    use std::path::Path;

    fn catalog() -> CatalogHandle {
        CatalogHandle::ready(LocalTaskCatalog::from_entries(vec![
            DatasetEntry {
                instance_id: "django__django-11099".to_string(),
                repo: "django/django".to_string(),
                base_commit: "d26b242".to_string(),
                problem_statement: "UsernameValidator allows trailing newline".to_string(),
                ..Default::default()
            },
            DatasetEntry {
                instance_id: "sympy__sympy-24562".to_string(),
                ..Default::default()
            },
        ]))
    }

    /// Orchestrator whose harness writes `{"resolved": true}` for every run
    fn orchestrator(dir: &Path) -> EvalOrchestrator {
        let script = dir.join("harness.sh");
        std::fs::write(
            &script,
            r#"while [ $# -gt 0 ]; do
  case "$1" in
    --run_id) RUN_ID="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo '{"resolved": true}' > "$RUN_ID.json"
"#,
        )
        .unwrap();

        EvalOrchestrator::new(
            HarnessConfig::new("sh", vec![script.to_string_lossy().into_owned()])
                .with_working_dir(dir)
                .with_logs_dir(dir.join("logs"))
                .with_prediction_dir(dir.join("predictions"))
                .with_settle(SettleConfig::immediate()),
        )
    }

    fn state(dir: &Path, catalog: CatalogHandle) -> AppState {
        AppState::new(catalog, orchestrator(dir), 2)
    }

    fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), CatalogHandle::unavailable("no dataset")));

        let root = warp::test::request().path("/").reply(&api).await;
        assert_eq!(root.status(), StatusCode::OK);
        assert_eq!(body(&root), json!({"message": "Welcome to SWE-bench API"}));

        let health = warp::test::request().path("/health").reply(&api).await;
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(body(&health)["catalog"], json!("unavailable"));
    }

    #[tokio::test]
    async fn test_get_task() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), catalog()));

        let found = warp::test::request()
            .path("/api/v1/tasks/django__django-11099")
            .reply(&api)
            .await;
        assert_eq!(found.status(), StatusCode::OK);
        let task = body(&found);
        assert_eq!(task["task_id"], json!("django__django-11099"));
        assert_eq!(task["base_commit"], json!("d26b242"));

        let missing = warp::test::request()
            .path("/api/v1/tasks/nope__nope-1")
            .reply(&api)
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body(&missing),
            json!({"detail": "Task nope__nope-1 not found in dataset"})
        );
    }

    #[tokio::test]
    async fn test_unavailable_catalog_is_503() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), CatalogHandle::unavailable("no dataset configured")));

        let response = warp::test::request()
            .path("/api/v1/tasks/django__django-11099")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(
            body(&response)["detail"]
                .as_str()
                .unwrap()
                .contains("Dataset not properly initialized")
        );
    }

    #[tokio::test]
    async fn test_tasks_batch() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), catalog()));

        let ok = warp::test::request()
            .method("POST")
            .path("/api/v1/tasks/batch")
            .json(&json!({"task_ids": ["sympy__sympy-24562", "django__django-11099"]}))
            .reply(&api)
            .await;
        assert_eq!(ok.status(), StatusCode::OK);
        let tasks = body(&ok);
        assert_eq!(tasks[0]["task_id"], json!("sympy__sympy-24562"));
        assert_eq!(tasks[1]["task_id"], json!("django__django-11099"));

        let missing = warp::test::request()
            .method("POST")
            .path("/api/v1/tasks/batch")
            .json(&json!({"task_ids": ["sympy__sympy-24562", "nope"]}))
            .reply(&api)
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_evaluate_rejects_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), catalog()));

        let invalid = warp::test::request()
            .method("POST")
            .path("/api/v1/evaluate")
            .json(&json!({"task_id": "../etc/passwd", "prediction": ""}))
            .reply(&api)
            .await;
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let unknown = warp::test::request()
            .method("POST")
            .path("/api/v1/evaluate")
            .json(&json!({"task_id": "nope__nope-1", "prediction": ""}))
            .reply(&api)
            .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let malformed = warp::test::request()
            .method("POST")
            .path("/api/v1/evaluate")
            .header("content-type", "application/json")
            .body("{\"task_id\": 3}")
            .reply(&api)
            .await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert!(body(&malformed)["detail"].is_string());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_evaluate_runs_harness() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), catalog()));

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/evaluate")
            .json(&json!({"task_id": "django__django-11099", "prediction": "diff"}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let outcome = body(&response);
        assert_eq!(outcome["task_id"], json!("django__django-11099"));
        assert_eq!(outcome["is_resolved"], json!(true));
        assert_eq!(outcome["test_results"], json!({"resolved": true}));
        assert_eq!(outcome["error_message"], Value::Null);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_evaluate_batch_marks_unknown_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), catalog()));

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/evaluate/batch")
            .json(&json!({"predictions": [
                {"task_id": "django__django-11099", "prediction": "a"},
                {"task_id": "nope__nope-1", "prediction": "b"},
                {"task_id": "sympy__sympy-24562", "prediction": "c"}
            ]}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let outcomes = body(&response);
        let outcomes = outcomes.as_array().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0]["is_resolved"], json!(true));
        assert_eq!(outcomes[1]["task_id"], json!("nope__nope-1"));
        assert_eq!(outcomes[1]["is_resolved"], json!(false));
        assert_eq!(outcomes[1]["error_kind"], json!("unknown_task"));
        assert_eq!(outcomes[2]["is_resolved"], json!(true));
    }

    #[tokio::test]
    async fn test_evaluate_resource_error_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let orchestrator = EvalOrchestrator::new(
            HarnessConfig::default()
                .with_logs_dir(blocker.join("logs"))
                .with_prediction_dir(dir.path().join("predictions")),
        );
        let api = routes(AppState::new(catalog(), orchestrator, 1));

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/evaluate")
            .json(&json!({"task_id": "django__django-11099", "prediction": "diff"}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body(&response)["detail"]
                .as_str()
                .unwrap()
                .contains("Failed to create logs directory")
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), catalog()));

        let response = warp::test::request()
            .method("OPTIONS")
            .path("/api/v1/evaluate")
            .header("origin", "http://example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let dir = tempfile::tempdir().unwrap();
        let api = routes(state(dir.path(), catalog()));

        let response = warp::test::request().path("/nowhere").reply(&api).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"detail": "Not Found"}));
    }
}
