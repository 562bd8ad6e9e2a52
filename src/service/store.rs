use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    dao::registrations::RegistrationDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        records::{ListOrder, Record},
    },
};

/**
 * Table-oriented access to the registration data: select, insert, update by id and delete by id.
 */
#[allow(async_fn_in_trait)]
pub trait RegistrationStore<R: Record> {
    async fn select(&self, order: ListOrder) -> Result<Vec<R>, ApplicationError>;
    async fn insert(&self, input: &R::Input) -> Result<R, ApplicationError>;
    async fn update(&self, id: Uuid, input: &R::Input) -> Result<R, ApplicationError>;
    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError>;
}

/**
 * Represents the service for reading and writing registration data in PostgreSQL.
 */
pub struct RegistrationService {
    /**
     * The DAO for registration table operations.
     */
    registration_dao: RegistrationDao,
    /**
     * Optional connection pool for database operations. Without a pool every operation fails with a database error.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl RegistrationService {
    /**
     * Creates a new instance of `RegistrationService`.
     *
     * # Arguments
     * `registration_dao`: The DAO for registration table operations.
     * `connection_pool`: Optional connection pool for database operations.
     *
     * # Returns
     * A new instance of `RegistrationService`.
     */
    pub fn new(registration_dao: RegistrationDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        RegistrationService { registration_dao, connection_pool }
    }

    fn pool(&self) -> Result<&Pool<Postgres>, ApplicationError> {
        self.connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
    }
}

impl<R: Record> RegistrationStore<R> for RegistrationService {
    /**
     * Retrieves all rows of a table.
     *
     * # Arguments
     * `order`: Whether the rows are fetched for the report or for an editor.
     *
     * # Returns
     * A Result containing the rows or an `ApplicationError`.
     */
    async fn select(&self, order: ListOrder) -> Result<Vec<R>, ApplicationError> {
        let mut connection = self.pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.registration_dao.select::<R>(&mut connection, order).await
    }

    /**
     * Inserts a row within its own transaction.
     *
     * # Arguments
     * `input`: The editable fields of the new row.
     *
     * # Returns
     * A Result containing the stored row or an `ApplicationError`.
     */
    async fn insert(&self, input: &R::Input) -> Result<R, ApplicationError> {
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.registration_dao.insert::<R>(&mut transaction, input).await {
            Ok(row) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(row)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Updates a row within its own transaction.
     *
     * # Arguments
     * `id`: The ID of the row to update.
     * `input`: The new editable fields.
     *
     * # Returns
     * A Result containing the updated row or an `ApplicationError`.
     */
    async fn update(&self, id: Uuid, input: &R::Input) -> Result<R, ApplicationError> {
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.registration_dao.update::<R>(&mut transaction, id, input).await {
            Ok(row) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(row)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Deletes a row by its ID within its own transaction.
     *
     * # Arguments
     * `id`: The ID of the row to be deleted.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.registration_dao.delete::<R>(&mut transaction, id).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }
}

