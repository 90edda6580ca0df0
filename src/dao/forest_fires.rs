use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{FilterValue, ForestFireDetailType, ForestFireFilter, ForestFireInputType, ForestFireKey, PaginationInput, QueryForestFireDbResp},
};

/**
 * SQL query to select records. Filters, ordering and pagination are appended.
 */
const QUERY_FOREST_FIRES: &str = "SELECT year, autonomous_community, number_of_accidents, percentage_of_large_fires FROM forest_fires WHERE 1 = 1";

/**
 * SQL query to delete records. Filters are appended.
 */
const DELETE_FOREST_FIRES: &str = "DELETE FROM forest_fires WHERE 1 = 1";

/**
 * SQL query to count all records.
 */
const COUNT_FOREST_FIRES: &str = "SELECT COUNT(*) FROM forest_fires";

/**
 * SQL query to add a record. The unique key on (year, autonomous_community) rejects duplicates.
 */
const ADD_FOREST_FIRE: &str = "INSERT INTO forest_fires (year, autonomous_community, number_of_accidents, percentage_of_large_fires) VALUES (?, ?, ?, ?)";

/**
 * SQL query to add a record unless the key already exists.
 */
const ADD_FOREST_FIRE_IF_ABSENT: &str =
    "INSERT INTO forest_fires (year, autonomous_community, number_of_accidents, percentage_of_large_fires) VALUES (?, ?, ?, ?) ON CONFLICT (year, autonomous_community) DO NOTHING";

/**
 * SQL query to update the non-key fields of a record.
 */
const UPDATE_FOREST_FIRE: &str = "UPDATE forest_fires SET number_of_accidents = ?, percentage_of_large_fires = ? WHERE year = ? AND autonomous_community = ?";

/**
 * DAO for forest fire records.
 */
pub struct ForestFiresDao {}

impl ForestFiresDao {
    /**
     * Creates a new instance of `ForestFiresDao`.
     *
     * # Returns
     * A new instance of `ForestFiresDao`.
     */
    pub fn new() -> Self {
        ForestFiresDao {}
    }

    /**
     * Retrieves the records matching the filter, in insertion order.
     *
     * # Arguments
     * `connection`: The database connection.
     * `filter`: Typed predicates the records must satisfy.
     * `pagination_input`: Offset and optional limit applied after filtering.
     *
     * # Returns
     * A Result containing the matching records or an `ApplicationError`.
     */
    #[instrument(skip(self, connection))]
    pub async fn find(&self, connection: &mut SqliteConnection, filter: &ForestFireFilter, pagination_input: PaginationInput) -> Result<Vec<ForestFireDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(QUERY_FOREST_FIRES);
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY id LIMIT ");
        // SQLite treats a negative limit as unbounded.
        builder.push_bind(pagination_input.limit.unwrap_or(-1));
        builder.push(" OFFSET ");
        builder.push_bind(pagination_input.offset);
        let results: Vec<QueryForestFireDbResp> = builder
            .build_query_as()
            .fetch_all(&mut *connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get forest fires: {err}")))?;
        Ok(results.into_iter().map(ForestFireDetailType::from).collect())
    }

    /**
     * Counts all stored records.
     */
    #[instrument(skip(self, connection))]
    pub async fn count(&self, connection: &mut SqliteConnection) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let count: (i64,) = sqlx::query_as(COUNT_FOREST_FIRES)
            .fetch_one(&mut *connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to count forest fires: {err}")))?;
        Ok(count.0)
    }

    /**
     * Adds a new record.
     *
     * # Arguments
     * `connection`: The database connection.
     * `input`: The validated record.
     *
     * # Returns
     * `ConstraintViolation` if a record with the same year and community exists.
     */
    #[instrument(skip(self, connection))]
    pub async fn add(&self, connection: &mut SqliteConnection, input: &ForestFireInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_FOREST_FIRE)
            .bind(input.year)
            .bind(&input.autonomous_community)
            .bind(input.number_of_accidents)
            .bind(input.percentage_of_large_fires)
            .execute(&mut *connection)
            .instrument(span)
            .await
            .map_err(Self::handle_database_error)?;
        Ok(())
    }

    /**
     * Adds a record unless one with the same key exists.
     *
     * # Returns
     * `true` if the record was inserted.
     */
    #[instrument(skip(self, connection))]
    pub async fn add_if_absent(&self, connection: &mut SqliteConnection, input: &ForestFireInputType) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(ADD_FOREST_FIRE_IF_ABSENT)
            .bind(input.year)
            .bind(&input.autonomous_community)
            .bind(input.number_of_accidents)
            .bind(input.percentage_of_large_fires)
            .execute(&mut *connection)
            .instrument(span)
            .await
            .map_err(Self::handle_database_error)?;
        Ok(result.rows_affected() == 1)
    }

    /**
     * Updates the non-key fields of the record with the given key.
     *
     * # Arguments
     * `connection`: The database connection.
     * `key`: Year and community of the record to update.
     * `input`: The validated replacement. Its key fields are ignored.
     *
     * # Returns
     * `NotFound` if no record has the key.
     */
    #[instrument(skip(self, connection))]
    pub async fn update(&self, connection: &mut SqliteConnection, key: &ForestFireKey, input: &ForestFireInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_FOREST_FIRE)
            .bind(input.number_of_accidents)
            .bind(input.percentage_of_large_fires)
            .bind(key.year)
            .bind(&key.autonomous_community)
            .execute(&mut *connection)
            .instrument(span)
            .await
            .map_err(Self::handle_database_error)?;
        if result.rows_affected() == 0 {
            tracing::debug!("Forest fire {} {} not found for update", key.year, key.autonomous_community);
            return Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()));
        }
        Ok(())
    }

    /**
     * Deletes every record matching the filter.
     *
     * # Returns
     * The number of deleted records.
     */
    #[instrument(skip(self, connection))]
    pub async fn delete(&self, connection: &mut SqliteConnection, filter: &ForestFireFilter) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DELETE_FOREST_FIRES);
        Self::push_filter(&mut builder, filter);
        let result = builder
            .build()
            .execute(&mut *connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete forest fires: {err}")))?;
        Ok(result.rows_affected())
    }

    /**
     * Appends the WHERE conditions of a filter. The statement must already end in a WHERE clause.
     */
    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ForestFireFilter) {
        if filter.matches_nothing {
            builder.push(" AND 1 = 0");
        }
        for field_filter in &filter.equals {
            builder.push(" AND ").push(field_filter.field.column()).push(" = ");
            match &field_filter.value {
                FilterValue::Number(number) => builder.push_bind(*number),
                FilterValue::Text(text) => builder.push_bind(text.clone()),
            };
        }
        if let Some(year_from) = filter.year_from {
            builder.push(" AND year >= ").push_bind(year_from);
        }
        if let Some(year_to) = filter.year_to {
            builder.push(" AND year <= ").push_bind(year_to);
        }
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The database error to handle.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: sqlx::Error) -> ApplicationError {
        if let Some(db_error) = error.as_database_error() {
            tracing::debug!("Database error: {}", db_error);
            if db_error.is_unique_violation() {
                return ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string());
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
        }
        tracing::error!("Database operation failed: {}", error);
        ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dao::init_test_pool;
    use crate::model::models::{FieldFilter, RecordField, SingleKey};

    fn record(year: i64, autonomous_community: &str, number_of_accidents: f64, percentage_of_large_fires: f64) -> ForestFireInputType {
        ForestFireInputType { year, autonomous_community: autonomous_community.to_string(), number_of_accidents, percentage_of_large_fires }
    }

    async fn seeded(dao: &ForestFiresDao, connection: &mut SqliteConnection) {
        for input in [record(2006, "aragon", 1.0, 0.1), record(2010, "aragon", 2.0, 0.2), record(2015, "ceuta", 3.0, 0.3), record(2020, "aragon", 4.0, 0.4), record(2024, "ceuta", 5.0, 0.5)] {
            dao.add(connection, &input).await.unwrap();
        }
    }

    #[actix_web::test]
    async fn test_add_then_find_by_key() {
        let pool = init_test_pool().await;
        let mut connection = pool.acquire().await.unwrap();
        let dao = ForestFiresDao::new();
        dao.add(&mut connection, &record(2024, "andalucia", 10034.0, 0.39)).await.unwrap();
        let found = dao.find(&mut connection, &ForestFireFilter::by_key(&ForestFireKey::new(2024, "Andalucia")), PaginationInput::default()).await.unwrap();
        assert_eq!(found, vec![ForestFireDetailType::new(2024, "andalucia".to_string(), 10034.0, 0.39)]);
    }

    #[actix_web::test]
    async fn test_add_duplicate_key_is_constraint_violation() {
        let pool = init_test_pool().await;
        let mut connection = pool.acquire().await.unwrap();
        let dao = ForestFiresDao::new();
        dao.add(&mut connection, &record(2024, "andalucia", 10034.0, 0.39)).await.unwrap();
        let result = dao.add(&mut connection, &record(2024, "andalucia", 1.0, 0.1)).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::ConstraintViolation);
        assert!(!dao.add_if_absent(&mut connection, &record(2024, "andalucia", 1.0, 0.1)).await.unwrap());
        assert!(dao.add_if_absent(&mut connection, &record(2024, "aragon", 1.0, 0.1)).await.unwrap());
        assert_eq!(dao.count(&mut connection).await.unwrap(), 2);
    }

    #[actix_web::test]
    async fn test_find_year_range_and_pagination() {
        let pool = init_test_pool().await;
        let mut connection = pool.acquire().await.unwrap();
        let dao = ForestFiresDao::new();
        seeded(&dao, &mut connection).await;
        let filter = ForestFireFilter { year_from: Some(2010), year_to: Some(2020), ..Default::default() };
        let years: Vec<i64> = dao.find(&mut connection, &filter, PaginationInput::default()).await.unwrap().into_iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2010, 2015, 2020]);
        let page: Vec<i64> = dao.find(&mut connection, &ForestFireFilter::default(), PaginationInput { offset: 2, limit: Some(2) }).await.unwrap().into_iter().map(|r| r.year).collect();
        assert_eq!(page, vec![2015, 2020]);
    }

    #[actix_web::test]
    async fn test_find_equality_filters() {
        let pool = init_test_pool().await;
        let mut connection = pool.acquire().await.unwrap();
        let dao = ForestFiresDao::new();
        seeded(&dao, &mut connection).await;
        let filter = ForestFireFilter {
            equals: vec![
                FieldFilter { field: RecordField::AutonomousCommunity, value: FilterValue::Text("aragon".to_string()) },
                FieldFilter { field: RecordField::PercentageOfLargeFires, value: FilterValue::Number(0.2) },
            ],
            ..Default::default()
        };
        let found = dao.find(&mut connection, &filter, PaginationInput::default()).await.unwrap();
        assert_eq!(found, vec![ForestFireDetailType::new(2010, "aragon".to_string(), 2.0, 0.2)]);
        let nothing = ForestFireFilter { matches_nothing: true, ..Default::default() };
        assert!(dao.find(&mut connection, &nothing, PaginationInput::default()).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_update_changes_only_values() {
        let pool = init_test_pool().await;
        let mut connection = pool.acquire().await.unwrap();
        let dao = ForestFiresDao::new();
        dao.add(&mut connection, &record(2024, "andalucia", 10034.0, 0.39)).await.unwrap();
        let key = ForestFireKey::new(2024, "andalucia");
        dao.update(&mut connection, &key, &record(2024, "andalucia", 1.0, 0.5)).await.unwrap();
        let found = dao.find(&mut connection, &ForestFireFilter::by_key(&key), PaginationInput::default()).await.unwrap();
        assert_eq!(found, vec![ForestFireDetailType::new(2024, "andalucia".to_string(), 1.0, 0.5)]);
        let missing = dao.update(&mut connection, &ForestFireKey::new(1999, "andalucia"), &record(1999, "andalucia", 1.0, 0.5)).await;
        assert_eq!(missing.unwrap_err().error_type, ErrorType::NotFound);
    }

    #[actix_web::test]
    async fn test_delete_by_single_key_and_all() {
        let pool = init_test_pool().await;
        let mut connection = pool.acquire().await.unwrap();
        let dao = ForestFiresDao::new();
        seeded(&dao, &mut connection).await;
        assert_eq!(dao.delete(&mut connection, &ForestFireFilter::by_single_key(&SingleKey::parse("ceuta"))).await.unwrap(), 2);
        assert_eq!(dao.delete(&mut connection, &ForestFireFilter::by_single_key(&SingleKey::parse("2006"))).await.unwrap(), 1);
        assert_eq!(dao.delete(&mut connection, &ForestFireFilter::default()).await.unwrap(), 2);
        assert_eq!(dao.count(&mut connection).await.unwrap(), 0);
    }
}
