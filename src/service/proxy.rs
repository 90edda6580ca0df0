use std::time::Duration;

use actix_web::web::Bytes;
use chrono::NaiveDate;
use reqwest::{Client, Method, Response, Url};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    config::ProxyConfig,
    models::DailyValueType,
};

/**
 * Date format of the keys in the covid-19 timeline.
 */
const TIMELINE_DATE_FORMAT: &str = "%m/%d/%y";

/**
 * Default country and window for the covid-19 series.
 */
pub const DEFAULT_COUNTRY: &str = "spain";
pub const DEFAULT_LAST_DAYS: u32 = 30;

/**
 * Forwards requests to the configured upstream statistics APIs.
 */
pub struct ProxyService {
    /**
     * Shared HTTP client.
     */
    client: Client,
    /**
     * Upstream URLs.
     */
    proxy_config: ProxyConfig,
}

impl ProxyService {
    /**
     * Creates a new instance of `ProxyService`.
     *
     * # Arguments
     * `proxy_config`: Upstream URLs and client settings.
     *
     * # Returns
     * The service, or an `Initialization` error if the HTTP client cannot be built.
     */
    pub fn new(proxy_config: ProxyConfig) -> Result<Self, ApplicationError> {
        let builder = Client::builder();
        let builder = match proxy_config.timeout_secs {
            Some(timeout_secs) => builder.timeout(Duration::from_secs(timeout_secs)),
            None => builder,
        };
        let client = builder.build().map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create HTTP client: {err}")))?;
        Ok(ProxyService { client, proxy_config })
    }

    /**
     * Resolves the target of a raw passthrough request.
     *
     * # Arguments
     * `upstream`: Route name below `/proxy/`.
     * `suffix`: Remaining request path after the route name, starting with `/` or empty.
     * `query`: Raw query string without `?`.
     *
     * # Returns
     * The full upstream URL, or `NotFound` for an unknown route name.
     */
    pub fn passthrough_url(&self, upstream: &str, suffix: &str, query: &str) -> Result<String, ApplicationError> {
        let Some(base_url) = self.proxy_config.passthrough.get(upstream) else {
            return Err(ApplicationError::new(ErrorType::NotFound, format!("Unknown proxy {upstream}")));
        };
        Ok(with_query(format!("{}{suffix}", base_url.trim_end_matches('/')), query))
    }

    /**
     * Sends a request to an upstream and returns its response as is. Only transport failures are errors.
     */
    #[instrument(skip(self, body))]
    pub async fn forward(&self, method: &str, url: &str, content_type: Option<&str>, body: Bytes) -> Result<Response, ApplicationError> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ApplicationError::new(ErrorType::MethodNotAllowed, format!("Unsupported method {method}")))?;
        tracing::info!("Proxy request to: {}", url);
        let mut request = self.client.request(method, url);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            request = request.body(body);
        }
        request.send().await.map_err(|err| {
            tracing::warn!("Upstream {} unreachable: {}", url, err);
            upstream_failure()
        })
    }

    /**
     * Bitcoin market chart. The query string is forwarded verbatim.
     */
    #[instrument(skip(self))]
    pub async fn get_bitcoin_stats(&self, query: &str) -> Result<Value, ApplicationError> {
        let url = with_query(self.proxy_config.bitcoin_stats_url.clone(), query);
        self.fetch_json(&url).await
    }

    /**
     * Cocktail search. The query string is forwarded verbatim.
     */
    #[instrument(skip(self))]
    pub async fn get_cocktail_stats(&self, query: &str) -> Result<Value, ApplicationError> {
        let url = with_query(self.proxy_config.cocktail_stats_url.clone(), query);
        self.fetch_json(&url).await
    }

    /**
     * Daily covid-19 case counts for a country, oldest first.
     *
     * # Arguments
     * `country`: Country name, appended as a path segment.
     * `last_days`: Number of days to request.
     */
    #[instrument(skip(self))]
    pub async fn get_covid_stats(&self, country: &str, last_days: u32) -> Result<Vec<DailyValueType>, ApplicationError> {
        let mut url = Url::parse(&self.proxy_config.covid_stats_url).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid covid stats url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| ApplicationError::new(ErrorType::Initialization, "Covid stats url cannot have path segments".to_string()))?
            .pop_if_empty()
            .push(country);
        url.query_pairs_mut().append_pair("lastdays", &last_days.to_string());
        let data = self.fetch_json(url.as_str()).await?;
        let Some(cases) = data.get("timeline").and_then(|timeline| timeline.get("cases")).and_then(Value::as_object) else {
            tracing::warn!("Covid stats response without timeline cases");
            return Err(upstream_failure());
        };
        Ok(reshape_timeline(cases))
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, ApplicationError> {
        tracing::info!("Proxying request to: {}", url);
        let response = self.client.get(url).send().await.map_err(|err| {
            tracing::error!("Error proxying request to {}: {}", url, err);
            upstream_failure()
        })?;
        if !response.status().is_success() {
            tracing::error!("Upstream {} answered {}", url, response.status());
            return Err(upstream_failure());
        }
        response.json::<Value>().await.map_err(|err| {
            tracing::error!("Upstream {} returned invalid JSON: {}", url, err);
            upstream_failure()
        })
    }
}

/**
 * Turns a date-keyed mapping into a chronologically ordered sequence.
 * Keys that are not `m/d/yy` dates keep their relative order and come first.
 */
pub fn reshape_timeline(timeline: &Map<String, Value>) -> Vec<DailyValueType> {
    let mut values: Vec<DailyValueType> = timeline.iter().map(|(date, value)| DailyValueType { date: date.clone(), value: value.clone() }).collect();
    values.sort_by_key(|daily| NaiveDate::parse_from_str(&daily.date, TIMELINE_DATE_FORMAT).ok());
    values
}

fn with_query(url: String, query: &str) -> String {
    if query.is_empty() { url } else { format!("{url}?{query}") }
}

fn upstream_failure() -> ApplicationError {
    ApplicationError::new(ErrorType::Upstream, "Failed to fetch data from upstream API".to_string())
}
