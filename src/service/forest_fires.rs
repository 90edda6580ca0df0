use serde_json::Value;
use sqlx::{Pool, Sqlite, Transaction, pool::PoolConnection};
use tracing::{Instrument, instrument};

use crate::{
    dao::forest_fires::ForestFiresDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{ForestFireDetailType, ForestFireFilter, ForestFireInputType, ForestFireKey, ForestFireListInputType, PaginationInput, SeedOutputType, SingleKey},
        seed,
        validation::{changes_key, validate_record},
    },
};

/**
 * Represents the service for managing forest fire records.
 */
pub struct ForestFiresService {
    /**
     * The DAO for forest fire operations.
     */
    forest_fires_dao: ForestFiresDao,
    /**
     * Connection pool for database operations.
     */
    connection_pool: Pool<Sqlite>,
}

impl ForestFiresService {
    /**
     * Creates a new instance of `ForestFiresService`.
     *
     * # Arguments
     * `forest_fires_dao`: The DAO for forest fire operations.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `ForestFiresService`.
     */
    pub fn new(forest_fires_dao: ForestFiresDao, connection_pool: Pool<Sqlite>) -> Self {
        ForestFiresService { forest_fires_dao, connection_pool }
    }

    /**
     * Retrieves the records matching the list filters.
     *
     * # Arguments
     * `list_input`: Field filters, year range and pagination.
     *
     * # Returns
     * The matching records, or `NotFound` when nothing matches.
     */
    #[instrument(skip(self))]
    pub async fn get_forest_fires(&self, list_input: ForestFireListInputType) -> Result<Vec<ForestFireDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let mut connection = self.acquire().await?;
        let records = self.forest_fires_dao.find(&mut connection, &list_input.filter, list_input.pagination).instrument(span).await?;
        if records.is_empty() {
            return Err(ApplicationError::new(ErrorType::NotFound, "No data found".to_string()));
        }
        Ok(records)
    }

    /**
     * Retrieves all records for a year or for an autonomous community.
     *
     * # Returns
     * `NoDataLoaded` if the store is empty, `NotFound` if nothing matches.
     */
    #[instrument(skip(self))]
    pub async fn get_forest_fires_by_single_key(&self, key: SingleKey) -> Result<Vec<ForestFireDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let mut connection = self.acquire().await?;
        if self.forest_fires_dao.count(&mut connection).instrument(span.clone()).await? == 0 {
            return Err(no_data_loaded());
        }
        let records = self.forest_fires_dao.find(&mut connection, &ForestFireFilter::by_single_key(&key), PaginationInput::default()).instrument(span).await?;
        if records.is_empty() {
            return Err(ApplicationError::new(ErrorType::NotFound, format!("No records for parameter {}", describe(&key))));
        }
        Ok(records)
    }

    /**
     * Retrieves the record with the given year and autonomous community.
     *
     * # Arguments
     * `year`: Year path parameter. A value that is not an integer matches nothing.
     * `autonomous_community`: Community path parameter, case-insensitive.
     */
    #[instrument(skip(self))]
    pub async fn get_forest_fire(&self, year: &str, autonomous_community: &str) -> Result<ForestFireDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let Some(key) = parse_path_key(year, autonomous_community) else {
            return Err(record_not_found());
        };
        let mut connection = self.acquire().await?;
        let records = self.forest_fires_dao.find(&mut connection, &ForestFireFilter::by_key(&key), PaginationInput::default()).instrument(span).await?;
        records.into_iter().next().ok_or_else(record_not_found)
    }

    /**
     * Validates and adds a new record.
     *
     * # Arguments
     * `payload`: The JSON request body.
     *
     * # Returns
     * `Validation` for an invalid payload, `ConstraintViolation` if the key is taken.
     */
    #[instrument(skip(self))]
    pub async fn add_forest_fire(&self, payload: &Value) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let input = validate_record(payload)?;
        let mut transaction = self.begin().await?;
        let result = self.forest_fires_dao.add(&mut transaction, &input).instrument(span).await;
        Self::finish(transaction, result).await
    }

    /**
     * Replaces the non-key fields of an existing record.
     *
     * A payload whose year or community differs from the path is rejected with
     * `ConstraintViolation` before the other fields are validated.
     *
     * # Arguments
     * `year`: Year path parameter.
     * `autonomous_community`: Community path parameter.
     * `payload`: The JSON request body.
     */
    #[instrument(skip(self))]
    pub async fn update_forest_fire(&self, year: &str, autonomous_community: &str, payload: &Value) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let path_year = year.trim().parse::<i64>().ok();
        if changes_key(payload, path_year, autonomous_community) {
            return Err(ApplicationError::new(ErrorType::ConstraintViolation, "The year and autonomous community of a record cannot be modified".to_string()));
        }
        let input: ForestFireInputType = validate_record(payload)?;
        let key = ForestFireKey::new(input.year, &input.autonomous_community);
        let mut transaction = self.begin().await?;
        let result = self.forest_fires_dao.update(&mut transaction, &key, &input).instrument(span).await;
        Self::finish(transaction, result).await
    }

    /**
     * Deletes every record.
     *
     * # Returns
     * The number of deleted records, or `NotFound` if the store was empty.
     */
    #[instrument(skip(self))]
    pub async fn delete_forest_fires(&self) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let mut transaction = self.begin().await?;
        let result = self.forest_fires_dao.delete(&mut transaction, &ForestFireFilter::default()).instrument(span).await;
        let deleted = Self::finish(transaction, result).await?;
        if deleted == 0 {
            return Err(ApplicationError::new(ErrorType::NotFound, "No data to delete".to_string()));
        }
        Ok(deleted)
    }

    /**
     * Deletes all records for a year or for an autonomous community.
     *
     * # Returns
     * The number of deleted records, or `NotFound` if the store is empty or nothing matches.
     */
    #[instrument(skip(self))]
    pub async fn delete_forest_fires_by_single_key(&self, key: SingleKey) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let mut transaction = self.begin().await?;
        let result = async {
            if self.forest_fires_dao.count(&mut transaction).await? == 0 {
                return Err(ApplicationError::new(ErrorType::NotFound, "No data available to delete".to_string()));
            }
            self.forest_fires_dao.delete(&mut transaction, &ForestFireFilter::by_single_key(&key)).await
        }
        .instrument(span)
        .await;
        let deleted = Self::finish(transaction, result).await?;
        if deleted == 0 {
            return Err(ApplicationError::new(ErrorType::NotFound, format!("No records to delete for parameter {}", describe(&key))));
        }
        Ok(deleted)
    }

    /**
     * Deletes the record with the given year and autonomous community.
     */
    #[instrument(skip(self))]
    pub async fn delete_forest_fire(&self, year: &str, autonomous_community: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let Some(key) = parse_path_key(year, autonomous_community) else {
            return Err(record_not_found());
        };
        let mut transaction = self.begin().await?;
        let result = self.forest_fires_dao.delete(&mut transaction, &ForestFireFilter::by_key(&key)).instrument(span).await;
        match Self::finish(transaction, result).await? {
            0 => Err(record_not_found()),
            _ => Ok(()),
        }
    }

    /**
     * Loads the initial dataset into an empty store.
     *
     * # Returns
     * The loaded records, or `ConstraintViolation` if any data is present.
     */
    #[instrument(skip(self))]
    pub async fn load_initial_data(&self) -> Result<SeedOutputType, ApplicationError> {
        let span = tracing::Span::current();
        let records = seed::initial_data();
        let mut transaction = self.begin().await?;
        let result = async {
            if self.forest_fires_dao.count(&mut transaction).await? > 0 {
                return Err(ApplicationError::new(ErrorType::ConstraintViolation, "Data is already loaded".to_string()));
            }
            for record in &records {
                self.forest_fires_dao.add(&mut transaction, record).await?;
            }
            Ok::<(), ApplicationError>(())
        }
        .instrument(span)
        .await;
        Self::finish(transaction, result).await?;
        tracing::info!("Loaded {} initial records", records.len());
        Ok(SeedOutputType { records: records.into_iter().map(ForestFireDetailType::from).collect() })
    }

    /**
     * Appends the second dataset. Records whose key already exists are skipped.
     *
     * # Returns
     * The records actually inserted.
     */
    #[instrument(skip(self))]
    pub async fn load_alvaro_data(&self) -> Result<SeedOutputType, ApplicationError> {
        let span = tracing::Span::current();
        let mut transaction = self.begin().await?;
        let result = async {
            let mut inserted = Vec::new();
            for record in seed::alvaro_data() {
                if self.forest_fires_dao.add_if_absent(&mut transaction, &record).await? {
                    inserted.push(ForestFireDetailType::from(record));
                }
            }
            Ok::<_, ApplicationError>(inserted)
        }
        .instrument(span)
        .await;
        let inserted = Self::finish(transaction, result).await?;
        tracing::info!("Loaded {} additional records", inserted.len());
        Ok(SeedOutputType { records: inserted })
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>, ApplicationError> {
        self.connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, ApplicationError> {
        self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))
    }

    /**
     * Commits on success, rolls back on failure and passes the result through.
     */
    async fn finish<T>(transaction: Transaction<'static, Sqlite>, result: Result<T, ApplicationError>) -> Result<T, ApplicationError> {
        match result {
            Ok(value) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(value)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }
}

fn parse_path_key(year: &str, autonomous_community: &str) -> Option<ForestFireKey> {
    let year = year.trim().parse::<i64>().ok()?;
    Some(ForestFireKey::new(year, autonomous_community))
}

fn describe(key: &SingleKey) -> String {
    match key {
        SingleKey::Year(year) => year.to_string(),
        SingleKey::AutonomousCommunity(name) => name.clone(),
    }
}

fn record_not_found() -> ApplicationError {
    ApplicationError::new(ErrorType::NotFound, "Record not found".to_string())
}

fn no_data_loaded() -> ApplicationError {
    ApplicationError::new(ErrorType::NoDataLoaded, "No data available. Run GET /api/v1/forest-fires/loadInitialData to load data".to_string())
}
