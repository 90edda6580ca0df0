use actix_web::{
    HttpRequest, HttpResponse, ResponseError,
    error::{JsonPayloadError, QueryPayloadError},
    http::StatusCode,
};
use serde::{Deserialize, Serialize, Serializer};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{DailyValueType, ForestFireDetailType, SeedOutputType},
};

/***************** Forest fire models *********************/

/**
 * A forest fire record as returned to clients. The storage identifier is never part of it.
 */
#[derive(Debug, Serialize)]
pub struct ForestFireElement {
    /**
     * Calendar year of the statistic.
     */
    year: i64,
    /**
     * Lowercase autonomous community name.
     */
    autonomous_community: String,
    /**
     * Number of accidents. Whole counts are written as integers.
     */
    #[serde(serialize_with = "serialize_count")]
    number_of_accidents: f64,
    /**
     * Share of large fires.
     */
    percentage_of_large_fires: f64,
}

impl From<ForestFireDetailType> for ForestFireElement {
    fn from(record: ForestFireDetailType) -> Self {
        ForestFireElement {
            year: record.year,
            autonomous_community: record.autonomous_community,
            number_of_accidents: record.number_of_accidents,
            percentage_of_large_fires: record.percentage_of_large_fires,
        }
    }
}

fn serialize_count<S: Serializer>(count: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if count.fract() == 0.0 && count.abs() < 9.0e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = *count as i64;
        return serializer.serialize_i64(whole);
    }
    serializer.serialize_f64(*count)
}

/**
 * Converts records into response elements.
 */
pub fn to_elements(records: Vec<ForestFireDetailType>) -> Vec<ForestFireElement> {
    records.into_iter().map(ForestFireElement::from).collect()
}

/**
 * Plain confirmation message.
 */
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        MessageResponse { message: message.to_string() }
    }
}

/**
 * Response of the delete operations.
 */
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted: u64,
}

impl DeleteResponse {
    pub fn new(deleted: u64) -> Self {
        DeleteResponse { message: format!("Deleted {deleted} record(s)"), deleted }
    }
}

/**
 * Response of the seed operations.
 */
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub data: Vec<ForestFireElement>,
}

impl SeedResponse {
    pub fn new(message: &str, output: SeedOutputType) -> Self {
        SeedResponse { message: message.to_string(), data: to_elements(output.records) }
    }
}

/***************** Proxy models *********************/

/**
 * Query parameters of the covid-19 proxy.
 */
#[derive(Debug, Deserialize)]
pub struct CovidStatsQuery {
    /**
     * Country to fetch, `spain` when absent.
     */
    pub country: Option<String>,
    /**
     * Number of days to fetch, 30 when absent.
     */
    pub lastdays: Option<u32>,
}

/**
 * One day of a reshaped upstream series.
 */
#[derive(Debug, Serialize)]
pub struct DailyValueElement {
    pub date: String,
    pub value: serde_json::Value,
}

impl From<DailyValueType> for DailyValueElement {
    fn from(daily: DailyValueType) -> Self {
        DailyValueElement { date: daily.date, value: daily.value }
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(get_statuscode(&self.error_type)).json(&error_response)
    }
}

/**
 * Reports unreadable JSON bodies as validation errors.
 */
pub fn json_error_handler(err: JsonPayloadError, _http_request: &HttpRequest) -> actix_web::Error {
    ApplicationError::new(ErrorType::Validation, format!("Invalid JSON body: {err}")).into()
}

/**
 * Reports unreadable query strings as validation errors.
 */
pub fn query_error_handler(err: QueryPayloadError, _http_request: &HttpRequest) -> actix_web::Error {
    ApplicationError::new(ErrorType::Validation, format!("Invalid query parameters: {err}")).into()
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Initialization | ErrorType::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound | ErrorType::NoDataLoaded => StatusCode::NOT_FOUND,
        ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorType::Upstream => StatusCode::BAD_GATEWAY,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::NoDataLoaded => 1005,
        ErrorType::ConstraintViolation => 1006,
        ErrorType::MethodNotAllowed => 1007,
        ErrorType::Upstream => 1008,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApplicationError::new(ErrorType::Validation, String::new()).error_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApplicationError::new(ErrorType::NoDataLoaded, String::new()).error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApplicationError::new(ErrorType::ConstraintViolation, String::new()).error_response().status(), StatusCode::CONFLICT);
        assert_eq!(ApplicationError::new(ErrorType::MethodNotAllowed, String::new()).error_response().status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApplicationError::new(ErrorType::Upstream, String::new()).error_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApplicationError::new(ErrorType::DatabaseError, String::new()).error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_forest_fire_element_serialization() {
        let element = ForestFireElement::from(ForestFireDetailType::new(2024, "andalucia".to_string(), 10034.0, 0.39));
        let json = serde_json::to_value(element).unwrap();
        assert_eq!(json, serde_json::json!({"year": 2024, "autonomous_community": "andalucia", "number_of_accidents": 10034, "percentage_of_large_fires": 0.39}));
        let element = ForestFireElement::from(ForestFireDetailType::new(2024, "aragon".to_string(), 10.5, 0.1));
        assert_eq!(serde_json::to_value(element).unwrap()["number_of_accidents"], serde_json::json!(10.5));
    }
}
