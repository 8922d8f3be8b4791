use actix_web::{web, HttpResponse, Responder};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use validator::Validate;

use crate::core::{MatchError, Matcher};
use crate::models::{
    AdvancedMatchesResponse, ErrorResponse, FindMatchesRequest, HealthResponse, MatchesResponse,
};
use crate::services::SkillRepository;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn SkillRepository>,
    pub matcher: Arc<Matcher>,
    /// Deadline for a single matching run
    pub request_timeout: Duration,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches))
        .route("/matches/advanced", web::post().to(advanced_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.repository.health_check().await.unwrap_or(false);

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint (legacy format)
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "userId": 42,
///   "limit": 20
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> HttpResponse {
    if let Err(response) = validate(&req) {
        return response;
    }

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("find_matches", %request_id, user_id = req.user_id);

    let run = state.matcher.compute_matches(state.repository.as_ref(), req.user_id);
    match with_deadline(state.request_timeout, run).instrument(span.clone()).await {
        Ok(mut matches) => {
            if let Some(limit) = req.limit {
                matches.truncate(limit);
            }
            span.in_scope(|| tracing::info!("Returning {} matches", matches.len()));
            HttpResponse::Ok().json(MatchesResponse { matches })
        }
        Err(response) => response,
    }
}

/// Find matches endpoint with every sub-score
///
/// POST /api/v1/matches/advanced
async fn advanced_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> HttpResponse {
    if let Err(response) = validate(&req) {
        return response;
    }

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("advanced_matches", %request_id, user_id = req.user_id);

    let run = state
        .matcher
        .compute_advanced_matches(state.repository.as_ref(), req.user_id);
    match with_deadline(state.request_timeout, run).instrument(span.clone()).await {
        Ok(mut matches) => {
            if let Some(limit) = req.limit {
                matches.truncate(limit);
            }
            span.in_scope(|| tracing::info!("Returning {} advanced matches", matches.len()));
            HttpResponse::Ok().json(AdvancedMatchesResponse { matches })
        }
        Err(response) => response,
    }
}

fn validate(req: &FindMatchesRequest) -> Result<(), HttpResponse> {
    req.validate().map_err(|errors| {
        tracing::info!("Validation failed for matches request: {:?}", errors);
        HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        })
    })
}

async fn with_deadline<T, F>(deadline: Duration, run: F) -> Result<T, HttpResponse>
where
    F: Future<Output = Result<T, MatchError>>,
{
    match tokio::time::timeout(deadline, run).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(_) => {
            tracing::warn!("Matching run exceeded {:?}", deadline);
            Err(HttpResponse::GatewayTimeout().json(ErrorResponse {
                error: "Matching timed out".to_string(),
                message: format!("No result within {} ms", deadline.as_millis()),
                status_code: 504,
            }))
        }
    }
}

fn error_response(err: &MatchError) -> HttpResponse {
    match err {
        MatchError::NotFound(_) => HttpResponse::NotFound().json(ErrorResponse {
            error: "User not found".to_string(),
            message: err.to_string(),
            status_code: 404,
        }),
        MatchError::RepositoryUnavailable(_) => {
            tracing::error!("Matching failed: {}", err);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "Repository unavailable".to_string(),
                message: err.to_string(),
                status_code: 503,
            })
        }
    }
}
