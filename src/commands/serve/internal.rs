//! Internal implementation of the serve command

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use symptom_rag::agents::Profile;
use symptom_rag::dialogue::{AgentSet, SessionError, SessionLimits, SessionStore};
use symptom_rag::retrieval::{RetrievalResult, Retriever};

use super::microserver::{self, Request, Response};
use super::ServeOptions;

/// Maximum results per retrieve call
const MAX_TOP_K: usize = 100;

/// Parse the JSON body, treating an empty body as `{}`
fn json_body<T: for<'de> Deserialize<'de>>(request: &Request) -> Result<T, Response> {
    let body: &[u8] = if request.body.is_empty() { b"{}" } else { &request.body };
    serde_json::from_slice(body).map_err(|e| json_error(400, &format!("Invalid JSON: {}", e)))
}

// === Server state ===

/// Server state shared across request handlers
pub(crate) struct ServerState {
    start_time: Instant,
    version: String,
    /// Bearer token; `None` disables auth (loopback without a configured token)
    token: Option<String>,
    retriever: Arc<Retriever>,
    sessions: SessionStore,
    default_top_k: usize,
}

impl ServerState {
    pub(crate) fn new(
        retriever: Arc<Retriever>,
        max_followups: Option<usize>,
        limits: SessionLimits,
        default_top_k: usize,
        token: Option<String>,
    ) -> Self {
        let agents = AgentSet::new(Arc::clone(&retriever));
        Self {
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            token,
            sessions: SessionStore::new(agents, max_followups).with_limits(limits),
            retriever,
            default_top_k,
        }
    }

    fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// === API types ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_secs: u64,
    model: String,
    symptoms: usize,
    sessions: usize,
}

#[derive(Deserialize)]
struct RetrieveRequest {
    query: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct RetrieveResponse {
    results: Vec<RetrievalResult>,
    count: usize,
}

/// Body of `POST /api/sessions`; all fields optional
#[derive(Deserialize, Default)]
struct CreateSessionRequest {
    max_followups: Option<usize>,
    #[serde(default)]
    unbounded: bool,
}

#[derive(Serialize)]
struct CreateSessionResponse {
    session_id: Uuid,
    max_followups: Option<usize>,
}

#[derive(Deserialize)]
struct TurnRequest {
    text: String,
    profile: Option<Profile>,
}

// === Helpers ===

/// Generate a random 32-byte hex token
fn generate_token() -> String {
    (0..32)
        .map(|_| format!("{:02x}", fastrand::u8(..)))
        .collect()
}

/// Check bearer token authorization
fn check_auth(request: &Request, token: Option<&str>) -> bool {
    let Some(token) = token else {
        return true;
    };
    request
        .header("Authorization")
        .map(|h| h == format!("Bearer {}", token))
        .unwrap_or(false)
}

/// Add security headers to response
fn with_security_headers(response: Response) -> Response {
    response
        .with_header("X-Content-Type-Options", "nosniff")
        .with_header("X-Frame-Options", "DENY")
}

/// Consistent JSON error response
fn json_error(status: u16, message: &str) -> Response {
    Response::json(status, &serde_json::json!({"error": message}))
}

fn session_error(e: SessionError) -> Response {
    match e {
        SessionError::NotFound(_) => json_error(404, &e.to_string()),
        SessionError::Full { .. } => {
            warn!(error = %e, "Refused new session");
            json_error(503, &e.to_string())
        }
        SessionError::Retrieval(_) => {
            error!(error = %e, "Dialogue turn failed");
            json_error(500, &e.to_string())
        }
    }
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "localhost" | "::1")
}

// === Transport-free handlers ===

/// Route request to handler
pub(crate) fn route_request(request: &Request, state: &ServerState) -> Response {
    let response = if request.path == "/health" {
        match request.method.as_str() {
            "GET" => handle_health(state),
            _ => json_error(405, "Method not allowed"),
        }
    } else if !check_auth(request, state.token.as_deref()) {
        json_error(401, "Unauthorized")
    } else {
        route_api(request, state)
    };
    with_security_headers(response)
}

fn route_api(request: &Request, state: &ServerState) -> Response {
    let segments: Vec<&str> = request
        .path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("POST", ["api", "retrieve"]) => handle_retrieve(request, state),
        ("POST", ["api", "sessions"]) => handle_create_session(request, state),
        (method, ["api", "sessions", id, rest @ ..]) => {
            let Ok(id) = Uuid::parse_str(id) else {
                return json_error(404, "Not found");
            };
            match (method, rest) {
                ("POST", ["turn"]) => handle_turn(request, state, id),
                ("GET", []) => handle_get_session(state, id),
                ("DELETE", []) => handle_delete_session(state, id),
                _ => json_error(404, "Not found"),
            }
        }
        _ => json_error(404, "Not found"),
    }
}

/// Handle GET /health
fn handle_health(state: &ServerState) -> Response {
    Response::json(
        200,
        &HealthResponse {
            status: "ok",
            version: state.version.clone(),
            uptime_secs: state.uptime_secs(),
            model: state.retriever.model_name(),
            symptoms: state.retriever.len(),
            sessions: state.sessions.len(),
        },
    )
}

/// Handle POST /api/retrieve
fn handle_retrieve(request: &Request, state: &ServerState) -> Response {
    if request.body.is_empty() {
        return json_error(400, "Missing request body");
    }
    let body: RetrieveRequest = match json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let top_k = body.top_k.unwrap_or(state.default_top_k).min(MAX_TOP_K);
    match state.retriever.retrieve(&body.query, top_k) {
        Ok(results) => Response::json(
            200,
            &RetrieveResponse {
                count: results.len(),
                results,
            },
        ),
        Err(e) => {
            error!(error = %e, "Retrieve failed");
            json_error(500, &format!("Retrieve failed: {}", e))
        }
    }
}

/// Handle POST /api/sessions
fn handle_create_session(request: &Request, state: &ServerState) -> Response {
    let body: CreateSessionRequest = match json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let max_followups = if body.unbounded {
        None
    } else {
        body.max_followups.or(state.sessions.default_max_followups())
    };
    let session_id = match state.sessions.create_with_bound(max_followups) {
        Ok(id) => id,
        Err(e) => return session_error(e),
    };

    Response::json(
        201,
        &CreateSessionResponse {
            session_id,
            max_followups,
        },
    )
}

/// Handle POST /api/sessions/{id}/turn
fn handle_turn(request: &Request, state: &ServerState, id: Uuid) -> Response {
    if request.body.is_empty() {
        return json_error(400, "Missing request body");
    }
    let body: TurnRequest = match json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    match state.sessions.advance(id, &body.text, body.profile) {
        Ok(result) => Response::json(200, &result),
        Err(e) => session_error(e),
    }
}

/// Handle GET /api/sessions/{id}
fn handle_get_session(state: &ServerState, id: Uuid) -> Response {
    match state.sessions.snapshot(id) {
        Ok(snapshot) => Response::json(200, &snapshot),
        Err(e) => session_error(e),
    }
}

/// Handle DELETE /api/sessions/{id}
fn handle_delete_session(state: &ServerState, id: Uuid) -> Response {
    if state.sessions.remove(id) {
        Response::json(200, &serde_json::json!({"removed": id}))
    } else {
        session_error(SessionError::NotFound(id))
    }
}

// === Transport ===
// One request per connection, one thread per connection.

/// Serve one request on any Read + Write stream.
///
/// Takes `&mut` so the caller can `shutdown(Write)` the concrete stream
/// afterwards.
fn handle_connection(stream: &mut (impl Read + Write), state: &ServerState) {
    let response = match microserver::read_request(stream) {
        Ok(Some(request)) => {
            let response = route_request(&request, state);
            debug!(
                method = %request.method,
                path = %request.path,
                status = response.status,
                "Handled request"
            );
            response
        }
        Ok(None) => return,
        Err(e) => {
            debug!(error = %e, "Rejected malformed request");
            with_security_headers(json_error(e.status(), &e.to_string()))
        }
    };
    if let Err(e) = microserver::write_response(stream, &response) {
        debug!(error = %e, "Client went away before the response was written");
    }
}

/// Run the server until the process is killed
pub(crate) fn run_server(
    root: &Path,
    options: &ServeOptions,
    retriever: Arc<Retriever>,
    max_followups: Option<usize>,
    default_top_k: usize,
) -> Result<()> {
    let host = options.host.as_str();
    let token = match std::env::var(super::TOKEN_ENV) {
        Ok(token) if !token.is_empty() => Some(token),
        _ if !is_loopback(host) => Some(generate_token()),
        _ => None,
    };

    if !is_loopback(host) {
        warn!(host, "Binding to a non-loopback address exposes the server to the network");
        eprintln!(
            "WARNING: Binding to {} exposes the server to the network.",
            host
        );
        eprintln!(
            "  The server has no encryption (HTTP only). Use a reverse proxy for production."
        );
    }

    if let Some(token) = &token {
        let token_path = symptom_rag::paths::serve_token_path(root);
        super::write_token(&token_path, token)?;
        eprintln!("Auth token written to {}", token_path.display());
    }

    let state = Arc::new(ServerState::new(
        retriever,
        max_followups,
        options.limits,
        default_top_k,
        token,
    ));

    let addr = format!("{}:{}", host, options.port);
    let listener =
        TcpListener::bind(&addr).with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Server listening");

    println!("Symptom server starting...");
    println!("   Listening on http://{}", addr);
    println!("   Indexed symptoms: {}", state.retriever.len());
    println!("   Press Ctrl+C to stop\n");

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    handle_connection(&mut stream, &state);
                    let _ = stream.shutdown(Shutdown::Write);
                });
            }
            Err(e) => warn!(error = %e, "TCP accept error"),
        }
    }
    Ok(())
}
