//! Site server with on-demand post rendering
//!
//! Generated files are served as they are. A post that was not pre-rendered is
//! answered with the loading placeholder while it is fetched and written in the
//! background; the placeholder listens on `/__livereload` and reloads once the
//! server announces its slug.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::SourceError;
use crate::generator::{DetailView, Generator};
use crate::helpers;
use crate::listing;
use crate::Spacetraveling;

/// Most listing pages `/api/posts` will merge in one request
const MAX_API_PAGES: usize = 50;

/// Reload script injected into the loading placeholder
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var slug = "__SLUG__";
    var ws = new WebSocket('ws://' + location.host + '/__livereload?slug=' + encodeURIComponent(slug));
    ws.onmessage = function(msg) {
        if (msg.data === slug) {
            location.reload();
        }
    };
    ws.onclose = function() {
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// How long a failed fetch is remembered for the reload that follows it
const FAILED_TTL: Duration = Duration::from_secs(60);

/// Most failed fetches remembered at once
const MAX_FAILED: usize = 128;

/// Posts being fetched, and the outcome of failed fetches not yet reported
#[derive(Default)]
struct Resolving {
    pending: HashSet<String>,
    failed: HashMap<String, (StatusCode, Instant)>,
}

impl Resolving {
    /// Remember a failure, dropping expired entries and then the oldest
    fn record_failure(&mut self, slug: String, status: StatusCode, now: Instant) {
        self.failed
            .retain(|_, (_, at)| now.saturating_duration_since(*at) < FAILED_TTL);

        while self.failed.len() >= MAX_FAILED {
            let oldest = self
                .failed
                .iter()
                .min_by_key(|(_, (_, at))| *at)
                .map(|(slug, _)| slug.clone());
            match oldest {
                Some(oldest) => self.failed.remove(&oldest),
                None => break,
            };
        }

        self.failed.insert(slug, (status, now));
    }

    /// Report a remembered failure once, unless it has expired
    fn take_failure(&mut self, slug: &str, now: Instant) -> Option<StatusCode> {
        let (status, at) = self.failed.remove(slug)?;
        (now.saturating_duration_since(at) < FAILED_TTL).then_some(status)
    }
}

/// Server state
struct ServerState {
    generator: Arc<Generator>,
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<String>,
    resolving: Mutex<Resolving>,
}

impl ServerState {
    fn resolving(&self) -> MutexGuard<'_, Resolving> {
        self.resolving.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_pending(&self, slug: &str) -> bool {
        self.resolving().pending.contains(slug)
    }
}

/// Start the server
pub async fn start(
    app: &Spacetraveling,
    generator: Arc<Generator>,
    ip: &str,
    port: u16,
    open: bool,
) -> Result<()> {
    let (reload_tx, _) = broadcast::channel::<String>(16);

    let state = Arc::new(ServerState {
        generator,
        public_dir: app.public_dir.clone(),
        reload_tx,
        resolving: Mutex::new(Resolving::default()),
    });

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_handler))
        .route("/api/posts", get(api_posts_handler))
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LiveReloadQuery {
    slug: Option<String>,
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    Query(query): Query<LiveReloadQuery>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    // Resolved between serving the placeholder and this subscription
    let already_done = query
        .slug
        .filter(|slug| !state.is_pending(slug));
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx, already_done))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(
    mut socket: WebSocket,
    mut reload_rx: broadcast::Receiver<String>,
    already_done: Option<String>,
) {
    tracing::debug!("Live reload client connected");

    if let Some(slug) = already_done {
        if socket.send(Message::Text(slug)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(slug) => {
                        if socket.send(Message::Text(slug)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Post pages: the generated file, or the placeholder while it is resolved
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    let path = match state.generator.post_output_path(&slug) {
        Ok(path) => path,
        Err(_) => return error_page(&state, StatusCode::NOT_FOUND),
    };

    if let Ok(content) = tokio::fs::read_to_string(&path).await {
        return Html(content).into_response();
    }

    {
        let mut resolving = state.resolving();
        if let Some(status) = resolving.take_failure(&slug, Instant::now()) {
            return error_page(&state, status);
        }
        if resolving.pending.insert(slug.clone()) {
            tokio::spawn(resolve_post(state.clone(), slug.clone()));
        }
    }

    match state.generator.render_detail(&DetailView::Loading) {
        Ok(html) => Html(inject_live_reload(&html, &slug)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render placeholder: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Fetch and write a post, then tell waiting clients
async fn resolve_post(state: Arc<ServerState>, slug: String) {
    let result = state.generator.generate_post(&slug).await;

    {
        let mut resolving = state.resolving();
        resolving.pending.remove(&slug);
        match result {
            Ok(path) => tracing::info!("Rendered post on demand: {:?}", path),
            Err(e) => {
                let status = match e.downcast_ref::<SourceError>() {
                    Some(err) if err.is_not_found() => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                tracing::warn!("Failed to resolve post {}: {}", slug, e);
                resolving.record_failure(slug.clone(), status, Instant::now());
            }
        }
    }

    // No receivers is fine
    let _ = state.reload_tx.send(slug);
}

#[derive(Debug, Deserialize)]
struct ListingQuery {
    pages: Option<usize>,
}

/// JSON listing after `pages` pages have been merged
async fn api_posts_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ListingQuery>,
) -> Response {
    let pages = query.pages.unwrap_or(1).clamp(1, MAX_API_PAGES);
    let generator = &state.generator;

    match listing::load_pages(
        generator.source(),
        &generator.config().prismic,
        generator.dates(),
        pages,
    )
    .await
    {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => source_error_response(&e),
    }
}

fn source_error_response(err: &SourceError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        tracing::error!("Content source error: {}", err);
        StatusCode::BAD_GATEWAY
    };
    (status, err.to_string()).into_response()
}

fn error_page(state: &ServerState, status: StatusCode) -> Response {
    match state.generator.render_not_found() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, "Not found").into_response(),
    }
}

/// Everything else comes straight from the public directory
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Inject the reload script for `slug` into HTML content
fn inject_live_reload(html: &str, slug: &str) -> String {
    let script = LIVE_RELOAD_SCRIPT.replace("__SLUG__", &helpers::html_escape(slug));
    if html.contains("</body>") {
        html.replace("</body>", &script)
    } else {
        // If no </body> tag, append to end
        format!("{}{}", html, script)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
