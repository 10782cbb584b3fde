use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Request, Response};
use axum::middleware;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::AppConfig;
use crate::middleware as app_middleware;
use crate::routes;
use crate::state::AppState;

pub struct EphraServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    routes::router()
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &Request<_>| {
                            let req_id = req
                                .extensions()
                                .get::<HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = tracing::field::Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                            span.record("http.status_code", res.status().as_u16());
                            tracing::info!(
                                http.status = %res.status().as_u16(),
                                elapsed_ms = %latency.as_millis(),
                                "request handled"
                            );
                        }),
                )
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes)),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self, state: AppState) -> EphraServer {
        EphraServer {
            addr: self.addr,
            app: build_app(state, &self.config),
        }
    }
}

impl EphraServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
