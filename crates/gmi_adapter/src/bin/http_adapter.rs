#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use gmi_adapter::{AdapterRuntime, ApiReply};
use gmi_engines::collection::CollectionEndpointConfig;
use serde_json::{json, Value};

type SharedRuntime = Arc<Mutex<AdapterRuntime>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("GMI_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let runtime = Arc::new(Mutex::new(AdapterRuntime::default_from_env()?));
    let backend = match runtime.lock() {
        Ok(runtime) => runtime.backend_name(),
        Err(_) => "unknown",
    };

    let app = Router::new()
        .route("/healthz", any(healthz))
        .route("/api/comparisons", any(comparisons))
        .route("/api/activity-logs", any(activity_logs))
        .route("/api/custom-companies", any(custom_companies))
        .route("/api/tob-plans", any(tob_plans))
        .route("/api/tob-templates", any(tob_templates))
        .route("/api/auth", any(auth))
        .route("/api/extract-tob", any(extract_tob))
        .with_state(runtime);

    println!("gmi_adapter_http listening on http://{addr} (backend={backend})");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

const ALLOW_GET_POST: &str = "GET, POST, OPTIONS";
const ALLOW_GET_POST_DELETE: &str = "GET, POST, DELETE, OPTIONS";
const ALLOW_POST: &str = "POST, OPTIONS";
const ALLOW_GET: &str = "GET, OPTIONS";

/// The browser client is served from a different origin, so every reply
/// carries the open CORS headers, refusals and failures included.
fn cors_headers(allow_methods: &'static str) -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, allow_methods),
    ]
}

fn json_reply(allow_methods: &'static str, reply: ApiReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, cors_headers(allow_methods), Json(reply.body)).into_response()
}

fn preflight_reply(allow_methods: &'static str) -> Response {
    (StatusCode::NO_CONTENT, cors_headers(allow_methods)).into_response()
}

fn method_not_allowed(allow_methods: &'static str) -> Response {
    json_reply(
        allow_methods,
        ApiReply {
            status: 405,
            body: json!({"error": "Method not allowed"}),
        },
    )
}

fn lock_poisoned(allow_methods: &'static str) -> Response {
    json_reply(
        allow_methods,
        ApiReply {
            status: 500,
            body: json!({"error": "adapter runtime lock poisoned"}),
        },
    )
}

/// An empty body reads as `{}` so a bare DELETE still reaches the id
/// check rather than failing JSON parsing.
fn parse_body(body: &Bytes, allow_methods: &'static str) -> Result<Value, Response> {
    if body.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|_| {
        json_reply(
            allow_methods,
            ApiReply {
                status: 400,
                body: json!({"error": "Invalid JSON body"}),
            },
        )
    })
}

async fn collection_route(
    runtime: SharedRuntime,
    method: Method,
    body: Bytes,
    config: CollectionEndpointConfig,
    allow_methods: &'static str,
) -> Response {
    match method {
        Method::OPTIONS => preflight_reply(allow_methods),
        Method::GET => {
            let runtime = match runtime.lock() {
                Ok(runtime) => runtime,
                Err(_) => return lock_poisoned(allow_methods),
            };
            json_reply(allow_methods, runtime.collection_get(config))
        }
        Method::POST | Method::DELETE => {
            let parsed = match parse_body(&body, allow_methods) {
                Ok(parsed) => parsed,
                Err(response) => return response,
            };
            let mut runtime = match runtime.lock() {
                Ok(runtime) => runtime,
                Err(_) => return lock_poisoned(allow_methods),
            };
            let reply = if method == Method::POST {
                runtime.collection_post(config, parsed)
            } else {
                runtime.collection_delete(config, parsed)
            };
            json_reply(allow_methods, reply)
        }
        _ => method_not_allowed(allow_methods),
    }
}

async fn comparisons(
    State(runtime): State<SharedRuntime>,
    method: Method,
    body: Bytes,
) -> Response {
    collection_route(
        runtime,
        method,
        body,
        CollectionEndpointConfig::comparisons(),
        ALLOW_GET_POST,
    )
    .await
}

async fn activity_logs(
    State(runtime): State<SharedRuntime>,
    method: Method,
    body: Bytes,
) -> Response {
    collection_route(
        runtime,
        method,
        body,
        CollectionEndpointConfig::activity_logs(),
        ALLOW_GET_POST,
    )
    .await
}

async fn custom_companies(
    State(runtime): State<SharedRuntime>,
    method: Method,
    body: Bytes,
) -> Response {
    collection_route(
        runtime,
        method,
        body,
        CollectionEndpointConfig::custom_companies(),
        ALLOW_GET_POST,
    )
    .await
}

async fn tob_plans(State(runtime): State<SharedRuntime>, method: Method, body: Bytes) -> Response {
    collection_route(
        runtime,
        method,
        body,
        CollectionEndpointConfig::tob_plans(),
        ALLOW_GET_POST,
    )
    .await
}

async fn tob_templates(
    State(runtime): State<SharedRuntime>,
    method: Method,
    body: Bytes,
) -> Response {
    collection_route(
        runtime,
        method,
        body,
        CollectionEndpointConfig::tob_templates(),
        ALLOW_GET_POST_DELETE,
    )
    .await
}

async fn auth(State(runtime): State<SharedRuntime>, method: Method, body: Bytes) -> Response {
    match method {
        Method::OPTIONS => preflight_reply(ALLOW_POST),
        Method::POST => {
            let parsed = match parse_body(&body, ALLOW_POST) {
                Ok(parsed) => parsed,
                Err(response) => return response,
            };
            let mut runtime = match runtime.lock() {
                Ok(runtime) => runtime,
                Err(_) => return lock_poisoned(ALLOW_POST),
            };
            json_reply(ALLOW_POST, runtime.auth_post(parsed))
        }
        _ => method_not_allowed(ALLOW_POST),
    }
}

async fn extract_tob(State(runtime): State<SharedRuntime>, method: Method, body: Bytes) -> Response {
    match method {
        Method::OPTIONS => preflight_reply(ALLOW_POST),
        Method::POST => {
            let parsed = match parse_body(&body, ALLOW_POST) {
                Ok(parsed) => parsed,
                Err(response) => return response,
            };
            // The provider call blocks for up to the configured timeout,
            // so it runs on the blocking pool with a snapshot of the
            // extraction runtime instead of holding the adapter lock.
            let extract = match runtime.lock() {
                Ok(runtime) => runtime.extract_snapshot(),
                Err(_) => return lock_poisoned(ALLOW_POST),
            };
            let reply =
                tokio::task::spawn_blocking(move || gmi_adapter::run_extract(&extract, parsed))
                    .await
                    .unwrap_or_else(|_| ApiReply {
                        status: 500,
                        body: json!({"error": "Internal server error", "details": "extract task failed"}),
                    });
            json_reply(ALLOW_POST, reply)
        }
        _ => method_not_allowed(ALLOW_POST),
    }
}


async fn healthz(State(runtime): State<SharedRuntime>, method: Method) -> Response {
    match method {
        Method::OPTIONS => preflight_reply(ALLOW_GET),
        Method::GET => {
            let runtime = match runtime.lock() {
                Ok(runtime) => runtime,
                Err(_) => return lock_poisoned(ALLOW_GET),
            };
            json_reply(ALLOW_GET, runtime.health_report())
        }
        _ => method_not_allowed(ALLOW_GET),
    }
}
