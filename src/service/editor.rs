use tracing::{error, info};
use uuid::Uuid;

use crate::{
    model::{
        apperror::{ApplicationError, ErrorType},
        records::{ListOrder, Record, Validate},
    },
    service::store::RegistrationStore,
};

/**
 * What an editor is currently doing.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum EditorMode<R> {
    Viewing,
    Adding,
    Editing(R),
}

/**
 * Result of a delete request.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /**
     * The user did not confirm; nothing was sent to the store.
     */
    Declined,
}

/**
 * Admin editor for a single table.
 *
 * Holds a copy of the table fetched when the editor was opened and refetched after every successful write.
 * Writes are never applied optimistically, so a failed write leaves both the collection and the mode as they
 * were.
 */
pub struct Editor<'a, S, R>
where
    S: RegistrationStore<R>,
    R: Record,
{
    store: &'a S,
    records: Vec<R>,
    mode: EditorMode<R>,
}

impl<'a, S, R> Editor<'a, S, R>
where
    S: RegistrationStore<R>,
    R: Record,
{
    /**
     * Opens the editor in viewing mode. A failed fetch is logged and leaves the collection empty.
     */
    pub async fn open(store: &'a S) -> Self {
        let mut editor = Editor { store, records: Vec::new(), mode: EditorMode::Viewing };
        if let Err(err) = editor.refresh().await {
            error!("Failed to fetch {}: {}", R::TABLE.as_str(), err);
        }
        editor
    }

    /**
     * Opens the editor in viewing mode, failing when the collection cannot be fetched.
     */
    pub async fn load(store: &'a S) -> Result<Self, ApplicationError> {
        let mut editor = Editor { store, records: Vec::new(), mode: EditorMode::Viewing };
        editor.refresh().await?;
        Ok(editor)
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn mode(&self) -> &EditorMode<R> {
        &self.mode
    }

    /**
     * Records whose search key contains `search`, ignoring case. Tables without a search key, and an empty
     * search, return everything.
     */
    pub fn filtered(&self, search: Option<&str>) -> Vec<&R> {
        let Some(search) = search.map(str::trim).filter(|term| !term.is_empty()) else {
            return self.records.iter().collect();
        };
        let needle = search.to_lowercase();
        self.records.iter().filter(|record| record.search_key().is_none_or(|key| key.to_lowercase().contains(&needle))).collect()
    }

    pub fn begin_add(&mut self) -> Result<(), ApplicationError> {
        self.require_viewing()?;
        self.mode = EditorMode::Adding;
        Ok(())
    }

    /**
     * Starts editing the row with the given id.
     */
    pub fn begin_edit(&mut self, id: Uuid) -> Result<(), ApplicationError> {
        self.require_viewing()?;
        let Some(record) = self.records.iter().find(|record| record.id() == id) else {
            return Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()));
        };
        self.mode = EditorMode::Editing(record.clone());
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.mode = EditorMode::Viewing;
    }

    /**
     * Validates and writes the input: an insert while adding, an update of the edited row while editing.
     *
     * On success the collection is refetched and the editor returns to viewing. On failure the error is
     * returned and nothing else changes.
     */
    pub async fn save(&mut self, input: R::Input) -> Result<R, ApplicationError> {
        let input = input.validate()?;
        let saved = match &self.mode {
            EditorMode::Viewing => return Err(ApplicationError::new(ErrorType::InvalidState, "Nothing is being added or edited".to_string())),
            EditorMode::Adding => self.store.insert(&input).await?,
            EditorMode::Editing(record) => self.store.update(record.id(), &input).await?,
        };
        info!("Saved {} in {}", saved.id(), R::TABLE.as_str());
        self.mode = EditorMode::Viewing;
        if let Err(err) = self.refresh().await {
            error!("Failed to refetch {} after save: {}", R::TABLE.as_str(), err);
        }
        Ok(saved)
    }

    /**
     * Deletes a row once the user has confirmed. Without confirmation no request is issued.
     */
    pub async fn delete(&mut self, id: Uuid, confirmed: bool) -> Result<DeleteOutcome, ApplicationError> {
        self.require_viewing()?;
        if !confirmed {
            return Ok(DeleteOutcome::Declined);
        }
        self.store.delete(id).await?;
        info!("Deleted {} from {}", id, R::TABLE.as_str());
        if let Err(err) = self.refresh().await {
            error!("Failed to refetch {} after delete: {}", R::TABLE.as_str(), err);
        }
        Ok(DeleteOutcome::Deleted)
    }

    async fn refresh(&mut self) -> Result<(), ApplicationError> {
        self.records = self.store.select(ListOrder::Editor).await?;
        Ok(())
    }

    fn require_viewing(&self) -> Result<(), ApplicationError> {
        if !matches!(self.mode, EditorMode::Viewing) {
            return Err(ApplicationError::new(ErrorType::InvalidState, "Finish or cancel the current change first".to_string()));
        }
        Ok(())
    }
}
