use std::collections::HashMap;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Database response type for a forest fire record.
 */
pub type QueryForestFireDbResp = (i64, String, f64, f64);

/**
 * Query parameters with a fixed meaning in the list operation. Every other parameter is a field filter.
 */
const FROM_PARAM: &str = "from";
const TO_PARAM: &str = "to";
const OFFSET_PARAM: &str = "offset";
const LIMIT_PARAM: &str = "limit";

/**
 * A single forest fire statistic, identified by year and autonomous community.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ForestFireDetailType {
    pub year: i64,
    pub autonomous_community: String,
    pub number_of_accidents: f64,
    pub percentage_of_large_fires: f64,
}

impl ForestFireDetailType {
    pub fn new(year: i64, autonomous_community: String, number_of_accidents: f64, percentage_of_large_fires: f64) -> Self {
        ForestFireDetailType { year, autonomous_community, number_of_accidents, percentage_of_large_fires }
    }
}

impl From<QueryForestFireDbResp> for ForestFireDetailType {
    fn from(row: QueryForestFireDbResp) -> Self {
        ForestFireDetailType::new(row.0, row.1, row.2, row.3)
    }
}

/**
 * Validated input for create and update. The community is already lowercase.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ForestFireInputType {
    pub year: i64,
    pub autonomous_community: String,
    pub number_of_accidents: f64,
    pub percentage_of_large_fires: f64,
}

impl From<ForestFireInputType> for ForestFireDetailType {
    fn from(input: ForestFireInputType) -> Self {
        ForestFireDetailType::new(input.year, input.autonomous_community, input.number_of_accidents, input.percentage_of_large_fires)
    }
}

/**
 * Composite key of a record.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ForestFireKey {
    pub year: i64,
    pub autonomous_community: String,
}

impl ForestFireKey {
    /**
     * Creates a key, normalizing the community to lowercase.
     */
    pub fn new(year: i64, autonomous_community: &str) -> Self {
        ForestFireKey { year, autonomous_community: autonomous_community.to_lowercase() }
    }
}

/**
 * A lone path parameter. Numbers are years, truncated when fractional; anything else is a community name.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum SingleKey {
    Year(i64),
    AutonomousCommunity(String),
}

impl SingleKey {
    pub fn parse(param: &str) -> Self {
        let trimmed = param.trim();
        if let Ok(year) = trimmed.parse::<i64>() {
            return SingleKey::Year(year);
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() && number.abs() < 9.0e15 => {
                #[allow(clippy::cast_possible_truncation)]
                let year = number.trunc() as i64;
                SingleKey::Year(year)
            }
            _ => SingleKey::AutonomousCommunity(param.to_lowercase()),
        }
    }
}

/**
 * Record fields that can be filtered on.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordField {
    Year,
    AutonomousCommunity,
    NumberOfAccidents,
    PercentageOfLargeFires,
}

impl RecordField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "year" => Some(RecordField::Year),
            "autonomous_community" => Some(RecordField::AutonomousCommunity),
            "number_of_accidents" => Some(RecordField::NumberOfAccidents),
            "percentage_of_large_fires" => Some(RecordField::PercentageOfLargeFires),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            RecordField::Year => "year",
            RecordField::AutonomousCommunity => "autonomous_community",
            RecordField::NumberOfAccidents => "number_of_accidents",
            RecordField::PercentageOfLargeFires => "percentage_of_large_fires",
        }
    }

    fn is_numeric(self) -> bool {
        !matches!(self, RecordField::AutonomousCommunity)
    }
}

/**
 * Filter value taken from a query string. Numeric-looking values are numbers, the rest lowercase text.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => FilterValue::Number(number),
            _ => FilterValue::Text(value.to_lowercase()),
        }
    }
}

/**
 * Equality predicate on a single record field.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: RecordField,
    pub value: FilterValue,
}

/**
 * Typed query over the record store.
 *
 * `matches_nothing` is set when a filter can never be satisfied: an unknown field, or a value
 * whose type differs from the field's type.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForestFireFilter {
    pub equals: Vec<FieldFilter>,
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub matches_nothing: bool,
}

impl ForestFireFilter {
    pub fn by_key(key: &ForestFireKey) -> Self {
        ForestFireFilter {
            equals: vec![
                FieldFilter { field: RecordField::Year, value: FilterValue::Number(key.year as f64) },
                FieldFilter { field: RecordField::AutonomousCommunity, value: FilterValue::Text(key.autonomous_community.clone()) },
            ],
            ..Default::default()
        }
    }

    pub fn by_single_key(key: &SingleKey) -> Self {
        let filter = match key {
            SingleKey::Year(year) => FieldFilter { field: RecordField::Year, value: FilterValue::Number(*year as f64) },
            SingleKey::AutonomousCommunity(name) => FieldFilter { field: RecordField::AutonomousCommunity, value: FilterValue::Text(name.clone()) },
        };
        ForestFireFilter { equals: vec![filter], ..Default::default() }
    }

    fn push_equals(&mut self, name: &str, raw_value: &str) {
        let Some(field) = RecordField::from_name(name) else {
            tracing::debug!("Unknown filter field {}", name);
            self.matches_nothing = true;
            return;
        };
        let value = FilterValue::parse(raw_value);
        let compatible = matches!((&value, field.is_numeric()), (FilterValue::Number(_), true) | (FilterValue::Text(_), false));
        if !compatible {
            self.matches_nothing = true;
        }
        self.equals.push(FieldFilter { field, value });
    }
}

/**
 * Pagination over the filtered set, in insertion order. No limit means unbounded.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaginationInput {
    pub offset: i64,
    pub limit: Option<i64>,
}

/**
 * Input for the list operation.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForestFireListInputType {
    pub filter: ForestFireFilter,
    pub pagination: PaginationInput,
}

impl ForestFireListInputType {
    /**
     * Builds the typed list query from raw query parameters.
     *
     * # Arguments
     * `params`: All query parameters of the request.
     *
     * # Returns
     * The list input, or a validation error when `from`, `to`, `offset` or `limit` is not a valid integer.
     */
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, ApplicationError> {
        let mut filter = ForestFireFilter::default();
        let mut pagination = PaginationInput::default();
        for (name, value) in params {
            match name.as_str() {
                FROM_PARAM => filter.year_from = Some(parse_integer(name, value)?),
                TO_PARAM => filter.year_to = Some(parse_integer(name, value)?),
                OFFSET_PARAM => pagination.offset = parse_non_negative(name, value)?,
                // A zero limit is no limit.
                LIMIT_PARAM => pagination.limit = Some(parse_non_negative(name, value)?).filter(|limit| *limit > 0),
                _ => filter.push_equals(name, value),
            }
        }
        Ok(ForestFireListInputType { filter, pagination })
    }
}

fn parse_integer(name: &str, value: &str) -> Result<i64, ApplicationError> {
    value.trim().parse::<i64>().map_err(|_| ApplicationError::new(ErrorType::Validation, format!("Query parameter {name} must be an integer")))
}

fn parse_non_negative(name: &str, value: &str) -> Result<i64, ApplicationError> {
    let number = parse_integer(name, value)?;
    if number < 0 {
        return Err(ApplicationError::new(ErrorType::Validation, format!("Query parameter {name} must not be negative")));
    }
    Ok(number)
}

/**
 * One entry of a date-keyed upstream series.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct DailyValueType {
    pub date: String,
    pub value: serde_json::Value,
}

/**
 * Outcome of a seed operation.
 */
#[derive(Debug, Clone)]
pub struct SeedOutputType {
    pub records: Vec<ForestFireDetailType>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_single_key_parse() {
        assert_eq!(SingleKey::parse("2024"), SingleKey::Year(2024));
        assert_eq!(SingleKey::parse("Andalucia"), SingleKey::AutonomousCommunity("andalucia".to_string()));
        assert_eq!(SingleKey::parse("castilla-la mancha"), SingleKey::AutonomousCommunity("castilla-la mancha".to_string()));
        assert_eq!(SingleKey::parse("2024.5"), SingleKey::Year(2024));
        assert_eq!(SingleKey::parse("nan"), SingleKey::AutonomousCommunity("nan".to_string()));
    }

    #[test]
    fn test_filter_value_parse() {
        assert_eq!(FilterValue::parse("0.39"), FilterValue::Number(0.39));
        assert_eq!(FilterValue::parse("2024"), FilterValue::Number(2024.0));
        assert_eq!(FilterValue::parse("Cataluña"), FilterValue::Text("cataluña".to_string()));
        assert_eq!(FilterValue::parse("inf"), FilterValue::Text("inf".to_string()));
        assert_eq!(FilterValue::parse("NaN"), FilterValue::Text("nan".to_string()));
    }

    #[test]
    fn test_list_input_reserved_params() {
        let input = ForestFireListInputType::from_query(&params(&[("from", "2010"), ("to", "2020"), ("offset", "2"), ("limit", "3")])).unwrap();
        assert_eq!(input.filter.year_from, Some(2010));
        assert_eq!(input.filter.year_to, Some(2020));
        assert_eq!(input.pagination, PaginationInput { offset: 2, limit: Some(3) });
        assert!(input.filter.equals.is_empty());
        assert!(!input.filter.matches_nothing);
    }

    #[test]
    fn test_list_input_zero_limit_is_unbounded() {
        let input = ForestFireListInputType::from_query(&params(&[("offset", "1"), ("limit", "0")])).unwrap();
        assert_eq!(input.pagination, PaginationInput { offset: 1, limit: None });
    }

    #[test]
    fn test_list_input_field_filters() {
        let input = ForestFireListInputType::from_query(&params(&[("autonomous_community", "ARAGON"), ("year", "2024")])).unwrap();
        assert_eq!(input.filter.equals.len(), 2);
        assert!(input.filter.equals.contains(&FieldFilter { field: RecordField::AutonomousCommunity, value: FilterValue::Text("aragon".to_string()) }));
        assert!(input.filter.equals.contains(&FieldFilter { field: RecordField::Year, value: FilterValue::Number(2024.0) }));
        assert!(!input.filter.matches_nothing);
    }

    #[test]
    fn test_list_input_unsatisfiable_filters() {
        assert!(ForestFireListInputType::from_query(&params(&[("color", "red")])).unwrap().filter.matches_nothing);
        assert!(ForestFireListInputType::from_query(&params(&[("year", "abc")])).unwrap().filter.matches_nothing);
        assert!(ForestFireListInputType::from_query(&params(&[("autonomous_community", "12")])).unwrap().filter.matches_nothing);
    }

    #[test]
    fn test_list_input_invalid_reserved_params() {
        assert_eq!(ForestFireListInputType::from_query(&params(&[("from", "last year")])).unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(ForestFireListInputType::from_query(&params(&[("limit", "-1")])).unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(ForestFireListInputType::from_query(&params(&[("offset", "1.5")])).unwrap_err().error_type, ErrorType::Validation);
    }
}
