use actix_web::{
    HttpRequest, HttpResponse, get,
    http::StatusCode,
    web::{self, Bytes},
};
use futures_util::TryStreamExt;
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{CovidStatsQuery, DailyValueElement},
        state::AppState,
    },
    model::apperror::{ApplicationError, ErrorType},
    service::proxy::{DEFAULT_COUNTRY, DEFAULT_LAST_DAYS},
};

/**
 * Common prefix of every proxy route.
 */
const PROXY_PREFIX: &str = "/api/v1/proxy/";

/**
 * Registers the proxy endpoints. The typed proxies shadow passthrough names of the same value.
 */
pub fn configure_proxy(cfg: &mut web::ServiceConfig) {
    cfg.service(bitcoin_stats)
        .service(covid_stats)
        .service(cocktail_stats)
        .service(web::resource("/api/v1/proxy/{upstream}").to(passthrough))
        .service(web::resource("/api/v1/proxy/{upstream}/{tail:.*}").to(passthrough));
}

/**
 * Bitcoin market chart, query forwarded as is.
 */
#[instrument(skip(http_request, app_state), fields(service = "bitcoinStats", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/proxy/bitcoin-stats")]
pub async fn bitcoin_stats(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let data = app_state.proxy_service.get_bitcoin_stats(http_request.query_string()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(data))
}

/**
 * Daily covid-19 cases of a country as an ordered list of `{date, value}`.
 */
#[instrument(skip(http_request, app_state), fields(service = "covidStats", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/proxy/covid-stats")]
pub async fn covid_stats(http_request: HttpRequest, query: web::Query<CovidStatsQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let CovidStatsQuery { country, lastdays } = query.into_inner();
    let country = country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
    let values = app_state.proxy_service.get_covid_stats(&country, lastdays.unwrap_or(DEFAULT_LAST_DAYS)).instrument(span).await?;
    Ok(HttpResponse::Ok().json(values.into_iter().map(DailyValueElement::from).collect::<Vec<_>>()))
}

/**
 * Cocktail search, query forwarded as is.
 */
#[instrument(skip(http_request, app_state), fields(service = "cocktailStats", trace_id = get_trace_id(&http_request)))]
#[get("/api/v1/proxy/cocktail-stats")]
pub async fn cocktail_stats(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let data = app_state.proxy_service.get_cocktail_stats(http_request.query_string()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(data))
}

/**
 * Raw reverse proxy. Method, path suffix, query, body and content type go upstream;
 * status, content type and body stream come back unchanged.
 */
#[instrument(skip(http_request, body, app_state), fields(service = "passthrough", trace_id = get_trace_id(&http_request)))]
pub async fn passthrough(http_request: HttpRequest, body: Bytes, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let rest = http_request.path().strip_prefix(PROXY_PREFIX).unwrap_or_default();
    let (upstream, suffix) = match rest.find('/') {
        Some(index) => rest.split_at(index),
        None => (rest, ""),
    };
    let url = app_state.proxy_service.passthrough_url(upstream, suffix, http_request.query_string())?;
    let content_type = http_request.headers().get(actix_web::http::header::CONTENT_TYPE).and_then(|value| value.to_str().ok());
    let response = app_state.proxy_service.forward(http_request.method().as_str(), &url, content_type, body).instrument(span).await?;

    let status = StatusCode::from_u16(response.status().as_u16()).map_err(|err| ApplicationError::new(ErrorType::Upstream, format!("Invalid upstream status: {err}")))?;
    let mut builder = HttpResponse::build(status);
    if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE).and_then(|value| value.to_str().ok()) {
        builder.content_type(content_type.to_string());
    }
    Ok(builder.streaming(response.bytes_stream().inspect_err(move |err| tracing::warn!("Upstream stream from {} failed: {}", url, err))))
}
