//! warp server for invoice routing and operational endpoints

use super::query::{DecisionFilter, DecisionQuery, DecisionSummary};
use crate::error::{ErrorCode, ErrorResponse, PipelineError};
use crate::health::{HealthCheckManager, HealthCheckResult};
use crate::observability::metrics::metrics;
use crate::processing::RoutingPipeline;
use bytes::{Buf, BufMut};
use futures::TryStreamExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::{Filter, Rejection, Reply};

/// Multipart field carrying the document
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind HTTP server: {0}")]
    Bind(#[from] warp::Error),
}

/// HTTP server state shared by every handler
pub struct ApiServer {
    service_id: String,
    pipeline: RoutingPipeline,
    health: HealthCheckManager,
    max_upload_bytes: u64,
}

impl ApiServer {
    pub fn new(
        service_id: String,
        pipeline: RoutingPipeline,
        health: HealthCheckManager,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            service_id,
            pipeline,
            health,
            max_upload_bytes,
        }
    }

    /// All routes with rejection handling and CORS applied
    pub fn routes(self: &Arc<Self>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        let state = {
            let server = Arc::clone(self);
            warp::any().map(move || Arc::clone(&server))
        };

        // POST /route-invoice
        let route_invoice = warp::path("route-invoice")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::multipart::form().max_length(self.max_upload_bytes))
            .and(state.clone())
            .and_then(handle_route_invoice);

        // GET /decisions
        let decisions = warp::path!("decisions")
            .and(warp::get())
            .and(warp::query::<DecisionQuery>())
            .and(state.clone())
            .and_then(handle_list_decisions);

        // GET /decisions/summary
        let summary = warp::path!("decisions" / "summary")
            .and(warp::get())
            .and(warp::query::<DecisionQuery>())
            .and(state.clone())
            .and_then(handle_summary);

        // GET /health
        let health = warp::path!("health")
            .and(warp::get())
            .and(state.clone())
            .and_then(handle_health);

        // GET /ready
        let ready = warp::path!("ready")
            .and(warp::get())
            .and(state.clone())
            .and_then(handle_ready);

        // GET /live
        let live = warp::path!("live").and(warp::get()).map(|| {
            warp::reply::json(&LivenessResponse {
                alive: true,
                timestamp: current_timestamp(),
            })
        });

        // GET /metrics
        let metrics_route = warp::path!("metrics")
            .and(warp::get())
            .map(|| warp::reply::json(&metrics().get_metrics()));

        // GET /
        let root = warp::path::end()
            .and(warp::get())
            .map(|| warp::reply::json(&ApiDocumentationResponse::new()));

        route_invoice
            .or(summary)
            .or(decisions)
            .or(health)
            .or(ready)
            .or(live)
            .or(metrics_route)
            .or(root)
            .with(
                warp::cors()
                    .allow_any_origin()
                    .allow_methods(vec!["GET", "POST"])
                    .allow_headers(vec!["content-type"]),
            )
            .recover(handle_rejection)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn run<F>(self: Arc<Self>, addr: SocketAddr, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let routes = self.routes();
        let (bound, server) = warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown)?;

        info!(
            service_id = %self.service_id,
            address = %bound,
            "Invoice router listening"
        );
        server.await;
        info!("HTTP server stopped");

        Ok(())
    }

    async fn health_results(&self) -> Vec<HealthCheckResult> {
        let results = self.health.run_health_checks().await;
        metrics().update_health_status(HealthCheckManager::overall_health(&results));
        results
    }
}

async fn handle_route_invoice(
    form: FormData,
    server: Arc<ApiServer>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let outcome = async {
        let (document, filename) = read_upload(form, server.max_upload_bytes).await?;
        server.pipeline.submit(&document, filename.as_deref()).await
    }
    .await;

    Ok(match outcome {
        Ok(record) => warp::reply::with_status(warp::reply::json(&record), StatusCode::OK),
        Err(e) => pipeline_error_reply(&e),
    })
}

/// Read the `file` part of a multipart form, enforcing the upload limit
async fn read_upload(
    form: FormData,
    max_upload_bytes: u64,
) -> Result<(Vec<u8>, Option<String>), PipelineError> {
    futures::pin_mut!(form);

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| PipelineError::invalid_input(format!("malformed multipart form: {e}")))?
    {
        if part.name() != UPLOAD_FIELD {
            continue;
        }

        let filename = part.filename().map(str::to_string);
        let mut document = Vec::new();
        let chunks = part.stream();
        futures::pin_mut!(chunks);

        while let Some(chunk) = chunks
            .try_next()
            .await
            .map_err(|e| PipelineError::invalid_input(format!("failed to read upload: {e}")))?
        {
            if (document.len() + chunk.remaining()) as u64 > max_upload_bytes {
                return Err(PipelineError::PayloadTooLarge {
                    limit: max_upload_bytes,
                });
            }
            document.put(chunk);
        }

        return Ok((document, filename));
    }

    Err(PipelineError::invalid_input(format!(
        "multipart form has no `{UPLOAD_FIELD}` part"
    )))
}

async fn filtered_decisions(
    query: &DecisionQuery,
    server: &ApiServer,
) -> Result<crate::store::DecisionListing, PipelineError> {
    let filter = DecisionFilter::from_query(query)?;
    let mut listing = server.pipeline.list_decisions().await?;
    if !filter.is_empty() {
        listing.retain(|decision| filter.matches(decision));
    }
    Ok(listing)
}

async fn handle_list_decisions(
    query: DecisionQuery,
    server: Arc<ApiServer>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    Ok(match filtered_decisions(&query, &server).await {
        Ok(listing) => warp::reply::with_status(warp::reply::json(&listing), StatusCode::OK),
        Err(e) => pipeline_error_reply(&e),
    })
}

async fn handle_summary(
    query: DecisionQuery,
    server: Arc<ApiServer>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    Ok(match filtered_decisions(&query, &server).await {
        Ok(listing) => warp::reply::with_status(
            warp::reply::json(&DecisionSummary::from_decisions(&listing.decisions)),
            StatusCode::OK,
        ),
        Err(e) => pipeline_error_reply(&e),
    })
}

async fn handle_health(
    server: Arc<ApiServer>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let results = server.health_results().await;
    let healthy = HealthCheckManager::overall_health(&results);

    let checks = results
        .into_iter()
        .map(|result| (result.component.clone(), result))
        .collect();

    let status = HealthStatus {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: current_timestamp(),
        service_id: server.service_id.clone(),
        classifier_backend: server.pipeline.classifier().backend_name().to_string(),
        store_source: server.pipeline.store().source().to_string(),
        uptime_seconds: metrics().get_metrics().lifecycle.uptime_seconds,
        checks,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&status),
        status_for(healthy),
    ))
}

async fn handle_ready(
    server: Arc<ApiServer>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let ready = HealthCheckManager::overall_health(&server.health_results().await);
    Ok(warp::reply::with_status(
        warp::reply::json(&ReadinessResponse {
            ready,
            timestamp: current_timestamp(),
        }),
        status_for(ready),
    ))
}

fn status_for(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

fn pipeline_error_reply(err: &PipelineError) -> warp::reply::WithStatus<warp::reply::Json> {
    if err.status_code() >= 500 {
        error!(error = %err, "Request failed");
    }
    error_reply(err.error_code(), &err.to_error_response())
}

fn error_reply(code: ErrorCode, body: &ErrorResponse) -> warp::reply::WithStatus<warp::reply::Json> {
    let status =
        StatusCode::from_u16(code.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(warp::reply::json(body), status)
}

/// Map warp rejections onto the JSON error body
async fn handle_rejection(
    rejection: Rejection,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let (code, message) = if rejection.is_not_found() {
        (ErrorCode::NotFound, "no such endpoint".to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (ErrorCode::PayloadTooLarge, "upload exceeds the size limit".to_string())
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (ErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = rejection.find::<warp::reject::InvalidHeader>() {
        (ErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = rejection.find::<warp::reject::MissingHeader>() {
        (ErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = rejection.find::<warp::reject::LengthRequired>() {
        (ErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = rejection.find::<warp::reject::UnsupportedMediaType>() {
        (ErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = rejection.find::<warp::cors::CorsForbidden>() {
        (ErrorCode::InvalidInput, e.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (ErrorCode::MethodNotAllowed, "method not allowed".to_string())
    } else {
        error!(?rejection, "Unhandled rejection");
        (ErrorCode::InternalError, "unhandled request".to_string())
    };

    Ok(error_reply(code, &ErrorResponse::new(code, &message)))
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
    timestamp: u64,
    service_id: String,
    classifier_backend: String,
    store_source: String,
    uptime_seconds: u64,
    checks: BTreeMap<String, HealthCheckResult>,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct ApiDocumentationResponse {
    endpoints: BTreeMap<&'static str, &'static str>,
}

impl ApiDocumentationResponse {
    fn new() -> Self {
        let endpoints = BTreeMap::from([
            ("POST /route-invoice", "Classify and route an invoice (multipart field `file`)"),
            ("GET /decisions", "Persisted decisions; filters: country, region, primary_transport, confidence_band"),
            ("GET /decisions/summary", "Decision counts by region, country, transport, routing code and confidence band"),
            ("GET /health", "Overall health status with component checks"),
            ("GET /ready", "Readiness probe"),
            ("GET /live", "Liveness probe"),
            ("GET /metrics", "Submission, store and lifecycle metrics"),
        ]);
        Self { endpoints }
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
