
use sqlx::PgConnection;
use tracing::{Instrument, instrument};
use uuid::Uuid;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    records::{ListOrder, Record},
};

/**
 * DAO for the registration tables. Every operation is generic over the record kind; the SQL comes from
 * the `Record` implementation.
 */
pub struct RegistrationDao {}

impl RegistrationDao {
    /**
     * Creates a new instance of `RegistrationDao`.
     *
     * # Returns
     * A new instance of `RegistrationDao`.
     */
    pub fn new() -> Self {
        RegistrationDao {}
    }

    /**
     * Retrieves every row of a table in the order used by the given consumer.
     *
     * # Arguments
     * `connection`: The database connection.
     * `order`: Whether the rows are fetched for the report or for an editor.
     *
     * # Returns
     * A Result containing the rows or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(table = R::TABLE.as_str(), result))]
    pub async fn select<R: Record>(&self, connection: &mut PgConnection, order: ListOrder) -> Result<Vec<R>, ApplicationError> {
        let span = tracing::Span::current();
        let query = match order {
            ListOrder::Report => R::SELECT_REPORT,
            ListOrder::Editor => R::SELECT_EDITOR,
        };
        sqlx::query_as::<_, R>(query)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to list {}: {err}", R::TABLE.as_str())))
    }

    /**
     * Inserts a new row.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `input`: The editable fields of the new row.
     *
     * # Returns
     * A Result containing the inserted row as stored or an `ApplicationError`.
     */
    #[instrument(skip(self, transaction, input), fields(table = R::TABLE.as_str(), result))]
    pub async fn insert<R: Record>(&self, transaction: &mut PgConnection, input: &R::Input) -> Result<R, ApplicationError> {
        let span = tracing::Span::current();
        R::bind_input(sqlx::query_as::<_, R>(R::INSERT), input)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))
    }

    /**
     * Replaces the editable fields of an existing row.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `id`: The ID of the row to update.
     * `input`: The new editable fields.
     *
     * # Returns
     * A Result containing the updated row or an `ApplicationError`.
     */
    #[instrument(skip(self, transaction, input), fields(table = R::TABLE.as_str(), result))]
    pub async fn update<R: Record>(&self, transaction: &mut PgConnection, id: Uuid, input: &R::Input) -> Result<R, ApplicationError> {
        let span = tracing::Span::current();
        let mut rows: Vec<R> = R::bind_input(sqlx::query_as::<_, R>(R::UPDATE), input)
            .bind(id)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        if rows.is_empty() {
            tracing::debug!("Row with id {} not found in {} for update", id, R::TABLE.as_str());
            return Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()));
        }
        if rows.len() > 1 {
            tracing::warn!("Multiple rows attempted updated in {}. Rolled back", R::TABLE.as_str());
            return Err(ApplicationError::new(ErrorType::Application, "Multiple records attempted updated. Rolled back".to_string()));
        }
        Ok(rows.remove(0))
    }

    /**
     * Deletes a row by its ID.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `id`: The ID of the row to be deleted.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(table = R::TABLE.as_str(), result))]
    pub async fn delete<R: Record>(&self, transaction: &mut PgConnection, id: Uuid) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let statement = format!("DELETE FROM {} WHERE id = $1", R::TABLE.as_str());
        let result = sqlx::query(&statement)
            .bind(id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete from {}: {err}", R::TABLE.as_str())))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Row with id {} not found in {} for deletion", id, R::TABLE.as_str());
            return Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple rows attempted deleted in {}. Rolled back", R::TABLE.as_str());
            return Err(ApplicationError::new(ErrorType::Application, "Multiple records attempted deleted. Rolled back".to_string()));
        }
        Ok(())
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
    fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
        if let Some(db_error) = error {
            tracing::debug!("Database error: {}", db_error);
            tracing::info!("Add/Update error: {:?}", db_error.code());
            if let Some(application_error) = db_error.code().as_deref().and_then(Self::error_for_code) {
                return application_error;
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
        }
        ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
    }

    /**
     * Maps the SQLSTATE codes caused by the written values. Other codes are unhandled database errors.
     */
    fn error_for_code(code: &str) -> Option<ApplicationError> {
        match code {
            // Unique violation
            "23505" => Some(ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string())),
            // Foreign key violation
            "23503" => Some(ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent value".to_string())),
            // Value too long
            "22001" => Some(ApplicationError::new(ErrorType::Validation, "Value too long".to_string())),
            // Numeric value out of range
            "22003" => Some(ApplicationError::new(ErrorType::Validation, "Value out of range".to_string())),
            _ => None,
        }
    }
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::model::records::{CountyRegistration, CountyRegistrationInput, GrowthMetric, GrowthMetricInput, MonthlyRegistration, MonthlyRegistrationInput};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_select_monthly() {
        let pool = init_db().await;
        let dao = RegistrationDao::new();
        let mut connection = pool.acquire().await.unwrap();
        let result = dao.select::<MonthlyRegistration>(&mut connection, ListOrder::Report).await;
        assert!(result.is_ok());
    }

    #[sqlx::test]
    async fn test_insert_update_then_delete_monthly() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = RegistrationDao::new();
        let input = MonthlyRegistrationInput { month: "October".to_string(), year: 2025, count: 10 };
        let inserted = dao.insert::<MonthlyRegistration>(&mut transaction, &input).await.unwrap();
        assert_eq!(inserted.count, 10);
        let updated = dao.update::<MonthlyRegistration>(&mut transaction, inserted.id, &MonthlyRegistrationInput { count: 25, ..input }).await.unwrap();
        assert_eq!(updated.count, 25);
        assert!(dao.delete::<MonthlyRegistration>(&mut transaction, inserted.id).await.is_ok());
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_insert_growth_stores_derived_figures() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = RegistrationDao::new();
        let input = GrowthMetricInput { date_range: "23/9/2025-29/9/2025".to_string(), previous_number: 100, current_number: 115 };
        let inserted = dao.insert::<GrowthMetric>(&mut transaction, &input).await.unwrap();
        assert_eq!(inserted.weekly_growth, 15);
        assert_eq!(inserted.weekly_growth_percentage.to_string(), "15.000");
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_delete_unknown_county() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = RegistrationDao::new();
        let result = dao.delete::<CountyRegistration>(&mut transaction, Uuid::new_v4()).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        let result = dao.update::<CountyRegistration>(&mut transaction, Uuid::new_v4(), &CountyRegistrationInput { county_name: "Lamu".to_string(), count: 1 }).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }

    /**
     * Initialize the database connection pool.
     */
    async fn init_db() -> PgPool {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        pool
    }
}
