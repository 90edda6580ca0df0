use std::fmt;

use serde_json::{Map, Value};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::ForestFireInputType,
};

pub const YEAR: &str = "year";
pub const AUTONOMOUS_COMMUNITY: &str = "autonomous_community";
pub const NUMBER_OF_ACCIDENTS: &str = "number_of_accidents";
pub const PERCENTAGE_OF_LARGE_FIRES: &str = "percentage_of_large_fires";

/**
 * Reasons a record payload is rejected before it reaches the store.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NotAnObject,
    MissingField(&'static str),
    InvalidType { field: &'static str, expected: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::NotAnObject => write!(f, "Request body must be a JSON object"),
            ValidationError::MissingField(field) => write!(f, "Missing required field {field}"),
            ValidationError::InvalidType { field, expected } => write!(f, "Field {field} must be {expected}"),
        }
    }
}

impl From<ValidationError> for ApplicationError {
    fn from(error: ValidationError) -> Self {
        ApplicationError::new(ErrorType::Validation, error.to_string())
    }
}

/**
 * Validates a create/update payload.
 *
 * All four fields must be present before any type is checked. On success the community is
 * returned in lowercase.
 *
 * # Arguments
 * `payload`: The JSON request body.
 *
 * # Returns
 * The validated input or the first violated rule.
 */
pub fn validate_record(payload: &Value) -> Result<ForestFireInputType, ValidationError> {
    let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;
    let year = require(object, YEAR)?;
    let autonomous_community = require(object, AUTONOMOUS_COMMUNITY)?;
    let number_of_accidents = require(object, NUMBER_OF_ACCIDENTS)?;
    let percentage_of_large_fires = require(object, PERCENTAGE_OF_LARGE_FIRES)?;

    let autonomous_community = autonomous_community.as_str().ok_or(ValidationError::InvalidType { field: AUTONOMOUS_COMMUNITY, expected: "a string" })?;
    Ok(ForestFireInputType {
        year: as_integer(year).ok_or(ValidationError::InvalidType { field: YEAR, expected: "an integer" })?,
        autonomous_community: autonomous_community.to_lowercase(),
        number_of_accidents: number_of_accidents.as_f64().ok_or(ValidationError::InvalidType { field: NUMBER_OF_ACCIDENTS, expected: "a number" })?,
        percentage_of_large_fires: percentage_of_large_fires.as_f64().ok_or(ValidationError::InvalidType { field: PERCENTAGE_OF_LARGE_FIRES, expected: "a number" })?,
    })
}

/**
 * Whether the payload tries to change the key of the record at `path_year`/`path_community`.
 *
 * Each key field is compared on its own, as soon as it is present and well typed. The other
 * fields are not looked at.
 */
pub fn changes_key(payload: &Value, path_year: Option<i64>, path_community: &str) -> bool {
    let Some(object) = payload.as_object() else {
        return false;
    };
    let year_changed = object.get(YEAR).and_then(as_integer).is_some_and(|year| Some(year) != path_year);
    let community_changed = object.get(AUTONOMOUS_COMMUNITY).and_then(Value::as_str).is_some_and(|community| community.to_lowercase() != path_community.to_lowercase());
    year_changed || community_changed
}

fn require<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ValidationError> {
    match object.get(field) {
        Some(Value::Null) | None => Err(ValidationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

/**
 * Integers written as whole floats (`2024.0`) are accepted.
 */
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(integer) = value.as_i64() {
        return Some(integer);
    }
    let float = value.as_f64()?;
    if float.fract() != 0.0 || float.abs() >= 9.0e15 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let integer = float as i64;
    Some(integer)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validate_record_success_lowercases_community() {
        let input = validate_record(&json!({"year": 2024, "autonomous_community": "Andalucia", "number_of_accidents": 10034, "percentage_of_large_fires": 0.39})).unwrap();
        assert_eq!(input, ForestFireInputType { year: 2024, autonomous_community: "andalucia".to_string(), number_of_accidents: 10034.0, percentage_of_large_fires: 0.39 });
    }

    #[test]
    fn test_validate_record_missing_field() {
        let result = validate_record(&json!({"year": 2024, "autonomous_community": "aragon", "number_of_accidents": 1}));
        assert_eq!(result, Err(ValidationError::MissingField(PERCENTAGE_OF_LARGE_FIRES)));
        let result = validate_record(&json!({"year": null, "autonomous_community": "aragon", "number_of_accidents": 1, "percentage_of_large_fires": 0.1}));
        assert_eq!(result, Err(ValidationError::MissingField(YEAR)));
    }

    #[test]
    fn test_validate_record_missing_checked_before_types() {
        let result = validate_record(&json!({"year": "2024", "autonomous_community": 7}));
        assert_eq!(result, Err(ValidationError::MissingField(NUMBER_OF_ACCIDENTS)));
    }

    #[test]
    fn test_validate_record_invalid_types() {
        let result = validate_record(&json!({"year": 2024, "autonomous_community": 5, "number_of_accidents": 1, "percentage_of_large_fires": 0.1}));
        assert!(matches!(result, Err(ValidationError::InvalidType { field: AUTONOMOUS_COMMUNITY, .. })));
        let result = validate_record(&json!({"year": "2024", "autonomous_community": "aragon", "number_of_accidents": 1, "percentage_of_large_fires": 0.1}));
        assert!(matches!(result, Err(ValidationError::InvalidType { field: YEAR, .. })));
        let result = validate_record(&json!({"year": 2024, "autonomous_community": "aragon", "number_of_accidents": true, "percentage_of_large_fires": 0.1}));
        assert!(matches!(result, Err(ValidationError::InvalidType { field: NUMBER_OF_ACCIDENTS, .. })));
        let result = validate_record(&json!({"year": 2024, "autonomous_community": "aragon", "number_of_accidents": 1, "percentage_of_large_fires": "high"}));
        assert!(matches!(result, Err(ValidationError::InvalidType { field: PERCENTAGE_OF_LARGE_FIRES, .. })));
    }

    #[test]
    fn test_validate_record_not_an_object() {
        assert_eq!(validate_record(&json!([1, 2, 3])), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn test_as_integer_accepts_whole_floats() {
        assert_eq!(as_integer(&json!(2024.0)), Some(2024));
        assert_eq!(as_integer(&json!(2024.5)), None);
    }

    #[test]
    fn test_validate_record_accepts_fractional_accidents() {
        let input = validate_record(&json!({"year": 2024, "autonomous_community": "aragon", "number_of_accidents": 10.5, "percentage_of_large_fires": 0.1})).unwrap();
        assert_eq!(input.number_of_accidents, 10.5);
        let result = validate_record(&json!({"year": 2024.5, "autonomous_community": "aragon", "number_of_accidents": 1, "percentage_of_large_fires": 0.1}));
        assert!(matches!(result, Err(ValidationError::InvalidType { field: YEAR, .. })));
    }

    #[test]
    fn test_changes_key_checks_each_field() {
        assert!(changes_key(&json!({"year": 2025}), Some(2024), "andalucia"));
        assert!(changes_key(&json!({"year": 2025, "autonomous_community": 5, "number_of_accidents": 1}), Some(2024), "andalucia"));
        assert!(changes_key(&json!({"autonomous_community": "Aragon"}), Some(2024), "andalucia"));
        assert!(changes_key(&json!({"year": 2024}), None, "andalucia"));
        assert!(!changes_key(&json!({"year": 2024, "autonomous_community": "ANDALUCIA"}), Some(2024), "Andalucia"));
        assert!(!changes_key(&json!({"year": "2025", "autonomous_community": 5}), Some(2024), "andalucia"));
        assert!(!changes_key(&json!([2025]), Some(2024), "andalucia"));
    }
}
