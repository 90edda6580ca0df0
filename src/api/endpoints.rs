use std::collections::HashMap;

use actix_web::{
    HttpRequest, HttpResponse, delete, get,
    http::header,
    post, put,
    web::{self, Path},
};
use serde_json::Value;
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{DeleteResponse, ForestFireElement, MessageResponse, SeedResponse, to_elements},
        state::AppState,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{ForestFireListInputType, SingleKey},
    },
};

/**
 * Registers the forest fire endpoints. Fixed paths come before `{param}` so they are matched first.
 */
pub fn configure_forest_fires(cfg: &mut web::ServiceConfig) {
    cfg.service(load_initial_data)
        .service(load_alvaro_data)
        .service(docs)
        .service(forest_fires_list)
        .service(forest_fires_by_param)
        .service(forest_fire_get)
        .service(forest_fire_add)
        .service(forest_fire_add_rejected)
        .service(forest_fire_update)
        .service(forest_fires_update_rejected)
        .service(forest_fires_delete)
        .service(forest_fires_delete_by_param)
        .service(forest_fire_delete)
        .service(forest_fire_delete_rejected);
}

/**
 * Seeds the initial dataset into an empty store.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "loadInitialData", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/forest-fires/loadInitialData")]
pub async fn load_initial_data(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let output = app_state.forest_fires_service.load_initial_data().instrument(span).await?;
    Ok(HttpResponse::Ok().json(SeedResponse::new("Initial data loaded", output)))
}

/**
 * Appends the second dataset.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "loadAlvaroData", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/forest-fires/loadAlvaroData")]
pub async fn load_alvaro_data(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let output = app_state.forest_fires_service.load_alvaro_data().instrument(span).await?;
    Ok(HttpResponse::Ok().json(SeedResponse::new("Additional data loaded", output)))
}

/**
 * Redirects to the external API documentation.
 */
#[get("/api/v1/forest-fires/docs")]
pub async fn docs(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Found().insert_header((header::LOCATION, app_state.docs_url.as_str())).finish()
}

/**
 * Lists records with field filters, a year range and pagination.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listForestFires", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/forest-fires")]
pub async fn forest_fires_list(http_request: HttpRequest, query: web::Query<HashMap<String, String>>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let list_input = ForestFireListInputType::from_query(&query)?;
    let records = app_state.forest_fires_service.get_forest_fires(list_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(to_elements(records)))
}

/**
 * Lists all records of a year or of an autonomous community.
 */
#[instrument(skip(http_request, app_state), fields(service = "getForestFiresByParam", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/forest-fires/{param}")]
pub async fn forest_fires_by_param(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let key = SingleKey::parse(&path.into_inner());
    let records = app_state.forest_fires_service.get_forest_fires_by_single_key(key).instrument(span).await?;
    Ok(HttpResponse::Ok().json(to_elements(records)))
}

#[instrument(skip(http_request, app_state), fields(service = "getForestFire", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/forest-fires/{year}/{community}")]
pub async fn forest_fire_get(path: Path<(String, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (year, community) = path.into_inner();
    let record = app_state.forest_fires_service.get_forest_fire(&year, &community).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ForestFireElement::from(record)))
}

/**
 * Creates a record.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "addForestFire", trace_id = get_trace_id(&http_request)))]
#[post("/api/v1/forest-fires")]
pub async fn forest_fire_add(http_request: HttpRequest, request_body: web::Json<Value>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.forest_fires_service.add_forest_fire(&request_body).instrument(span).await?;
    Ok(HttpResponse::Created().json(MessageResponse::new("Record created")))
}

#[post("/api/v1/forest-fires/{param}")]
pub async fn forest_fire_add_rejected() -> Result<HttpResponse, ApplicationError> {
    Err(ApplicationError::new(ErrorType::MethodNotAllowed, "Records can only be created on the collection".to_string()))
}

/**
 * Replaces the values of a record. The key itself cannot change.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "updateForestFire", trace_id = get_trace_id(&http_request)))]
#[put("/api/v1/forest-fires/{year}/{community}")]
pub async fn forest_fire_update(path: Path<(String, String)>, http_request: HttpRequest, request_body: web::Json<Value>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (year, community) = path.into_inner();
    app_state.forest_fires_service.update_forest_fire(&year, &community, &request_body).instrument(span).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Record updated")))
}

#[put("/api/v1/forest-fires")]
pub async fn forest_fires_update_rejected() -> Result<HttpResponse, ApplicationError> {
    Err(ApplicationError::new(ErrorType::MethodNotAllowed, "Updating the whole collection is not allowed".to_string()))
}

/**
 * Deletes every record.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteForestFires", trace_id = get_trace_id(&http_request)))]
#[delete("/api/v1/forest-fires")]
pub async fn forest_fires_delete(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let deleted = app_state.forest_fires_service.delete_forest_fires().instrument(span).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse::new(deleted)))
}

#[instrument(skip(http_request, app_state), fields(service = "deleteForestFiresByParam", trace_id = get_trace_id(&http_request)))]
#[delete("/api/v1/forest-fires/{param}")]
pub async fn forest_fires_delete_by_param(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let key = SingleKey::parse(&path.into_inner());
    let deleted = app_state.forest_fires_service.delete_forest_fires_by_single_key(key).instrument(span).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse::new(deleted)))
}

#[instrument(skip(http_request, app_state), fields(service = "deleteForestFire", trace_id = get_trace_id(&http_request)))]
#[delete("/api/v1/forest-fires/{year}/{community}")]
pub async fn forest_fire_delete(path: Path<(String, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (year, community) = path.into_inner();
    app_state.forest_fires_service.delete_forest_fire(&year, &community).instrument(span).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse::new(1)))
}

/**
 * Delete paths with more than two key segments.
 */
#[delete("/api/v1/forest-fires/{year}/{community}/{extra:.+}")]
pub async fn forest_fire_delete_rejected() -> Result<HttpResponse, ApplicationError> {
    Err(ApplicationError::new(ErrorType::Validation, "Too many path parameters".to_string()))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
pub fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
