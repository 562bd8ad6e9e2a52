use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{
    FromRow, Postgres,
    postgres::{PgArguments, PgRow},
    query::QueryAs,
};
use uuid::Uuid;

use crate::{
    metrics::derived::{GrowthFigures, growth_figures},
    model::apperror::{ApplicationError, ErrorType},
};

/**
 * Query type produced by `sqlx::query_as` for a record.
 */
pub type RecordQuery<'q, R> = QueryAs<'q, Postgres, R, PgArguments>;

/**
 * The five tables holding registration statistics.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableName {
    MonthlyRegistrations,
    WeeklyRegistrations,
    CountyRegistrations,
    SectorRegistrations,
    GrowthMetrics,
}

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::MonthlyRegistrations => "monthly_registrations",
            TableName::WeeklyRegistrations => "weekly_registrations",
            TableName::CountyRegistrations => "county_registrations",
            TableName::SectorRegistrations => "sector_registrations",
            TableName::GrowthMetrics => "growth_metrics",
        }
    }
}

/**
 * Tabs of the admin editor suite, one per table.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    Monthly,
    Weekly,
    County,
    Sector,
    Growth,
}

impl AdminTab {
    pub const ALL: [AdminTab; 5] = [AdminTab::Monthly, AdminTab::Weekly, AdminTab::County, AdminTab::Sector, AdminTab::Growth];

    pub fn path(&self) -> &'static str {
        match self {
            AdminTab::Monthly => "monthly",
            AdminTab::Weekly => "weekly",
            AdminTab::County => "county",
            AdminTab::Sector => "sector",
            AdminTab::Growth => "growth",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminTab::Monthly => "Monthly Data",
            AdminTab::Weekly => "Weekly Data",
            AdminTab::County => "Counties",
            AdminTab::Sector => "Sectors",
            AdminTab::Growth => "Growth Metrics",
        }
    }

    pub fn table(&self) -> TableName {
        match self {
            AdminTab::Monthly => TableName::MonthlyRegistrations,
            AdminTab::Weekly => TableName::WeeklyRegistrations,
            AdminTab::County => TableName::CountyRegistrations,
            AdminTab::Sector => TableName::SectorRegistrations,
            AdminTab::Growth => TableName::GrowthMetrics,
        }
    }
}

/**
 * Which consumer a collection is fetched for. The report and the editors order rows differently.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    Report,
    Editor,
}

/**
 * Input validation performed before any write is issued.
 */
pub trait Validate: Sized {
    fn validate(self) -> Result<Self, ApplicationError>;
}

/**
 * A row kind stored in one of the registration tables.
 *
 * Ties the row type to its table, its SQL and the editable input type used for inserts and updates.
 * Insert and update statements must return the full row. Update statements take the record id as the
 * last bind parameter.
 */
pub trait Record: Clone + Serialize + Send + Sync + Unpin + for<'r> FromRow<'r, PgRow> + 'static {
    type Input: Clone + DeserializeOwned + Validate + Send + Sync + 'static;

    const TABLE: TableName;
    const TAB: AdminTab;
    const SELECT_REPORT: &'static str;
    const SELECT_EDITOR: &'static str;
    const INSERT: &'static str;
    const UPDATE: &'static str;

    fn id(&self) -> Uuid;

    /**
     * Text the editor search filters on, if the editor supports searching.
     */
    fn search_key(&self) -> Option<&str> {
        None
    }

    /**
     * Binds the editable fields in the order used by `INSERT` and `UPDATE`.
     */
    fn bind_input<'q>(query: RecordQuery<'q, Self>, input: &'q Self::Input) -> RecordQuery<'q, Self>;
}

/**
 * Largest count accepted on write. Keeps report sums and growth percentages well inside their column types.
 */
pub const MAX_COUNT: i64 = i32::MAX as i64;

fn require_count(field: &str, value: i64) -> Result<(), ApplicationError> {
    if value < 0 {
        return Err(ApplicationError::new(ErrorType::Validation, format!("{field} must be zero or greater")));
    }
    if value > MAX_COUNT {
        return Err(ApplicationError::new(ErrorType::Validation, format!("{field} must be at most {MAX_COUNT}")));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), ApplicationError> {
    if value.trim().is_empty() {
        return Err(ApplicationError::new(ErrorType::Validation, format!("{field} is required")));
    }
    Ok(())
}

/***************** Monthly registrations *********************/

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRegistration {
    pub id: Uuid,
    pub month: String,
    pub year: i32,
    pub count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRegistrationInput {
    pub month: String,
    pub year: i32,
    pub count: i64,
}

impl Validate for MonthlyRegistrationInput {
    fn validate(self) -> Result<Self, ApplicationError> {
        require_text("month", &self.month)?;
        if !(1900..=9999).contains(&self.year) {
            return Err(ApplicationError::new(ErrorType::Validation, "year must be between 1900 and 9999".to_string()));
        }
        require_count("count", self.count)?;
        Ok(self)
    }
}

impl Record for MonthlyRegistration {
    type Input = MonthlyRegistrationInput;

    const TABLE: TableName = TableName::MonthlyRegistrations;
    const TAB: AdminTab = AdminTab::Monthly;
    const SELECT_REPORT: &'static str = "SELECT id, month, year, count, created_at FROM monthly_registrations ORDER BY created_at";
    const SELECT_EDITOR: &'static str = "SELECT id, month, year, count, created_at FROM monthly_registrations ORDER BY created_at";
    const INSERT: &'static str = "INSERT INTO monthly_registrations (month, year, count) VALUES ($1, $2, $3) RETURNING id, month, year, count, created_at";
    const UPDATE: &'static str = "UPDATE monthly_registrations SET month = $1, year = $2, count = $3 WHERE id = $4 RETURNING id, month, year, count, created_at";

    fn id(&self) -> Uuid {
        self.id
    }

    fn bind_input<'q>(query: RecordQuery<'q, Self>, input: &'q Self::Input) -> RecordQuery<'q, Self> {
        query.bind(input.month.as_str()).bind(input.year).bind(input.count)
    }
}

/***************** Weekly registrations *********************/

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRegistration {
    pub id: Uuid,
    pub date_range: String,
    pub count: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRegistrationInput {
    pub date_range: String,
    pub count: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub sort_order: i32,
}

impl Validate for WeeklyRegistrationInput {
    fn validate(self) -> Result<Self, ApplicationError> {
        require_text("dateRange", &self.date_range)?;
        require_count("count", self.count)?;
        if self.start_date > self.end_date {
            return Err(ApplicationError::new(ErrorType::Validation, "startDate must not be after endDate".to_string()));
        }
        Ok(self)
    }
}

impl Record for WeeklyRegistration {
    type Input = WeeklyRegistrationInput;

    const TABLE: TableName = TableName::WeeklyRegistrations;
    const TAB: AdminTab = AdminTab::Weekly;
    const SELECT_REPORT: &'static str = "SELECT id, date_range, count, start_date, end_date, created_at, sort_order FROM weekly_registrations ORDER BY start_date";
    const SELECT_EDITOR: &'static str = "SELECT id, date_range, count, start_date, end_date, created_at, sort_order FROM weekly_registrations ORDER BY start_date";
    const INSERT: &'static str = "INSERT INTO weekly_registrations (date_range, count, start_date, end_date, sort_order) VALUES ($1, $2, $3, $4, $5) RETURNING id, date_range, count, start_date, end_date, created_at, sort_order";
    const UPDATE: &'static str = "UPDATE weekly_registrations SET date_range = $1, count = $2, start_date = $3, end_date = $4, sort_order = $5 WHERE id = $6 RETURNING id, date_range, count, start_date, end_date, created_at, sort_order";

    fn id(&self) -> Uuid {
        self.id
    }

    fn bind_input<'q>(query: RecordQuery<'q, Self>, input: &'q Self::Input) -> RecordQuery<'q, Self> {
        query.bind(input.date_range.as_str()).bind(input.count).bind(input.start_date).bind(input.end_date).bind(input.sort_order)
    }
}

/***************** County registrations *********************/

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountyRegistration {
    pub id: Uuid,
    pub county_name: String,
    pub count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountyRegistrationInput {
    pub county_name: String,
    pub count: i64,
}

impl Validate for CountyRegistrationInput {
    fn validate(self) -> Result<Self, ApplicationError> {
        require_text("countyName", &self.county_name)?;
        require_count("count", self.count)?;
        Ok(self)
    }
}

impl Record for CountyRegistration {
    type Input = CountyRegistrationInput;

    const TABLE: TableName = TableName::CountyRegistrations;
    const TAB: AdminTab = AdminTab::County;
    const SELECT_REPORT: &'static str = "SELECT id, county_name, count, created_at, updated_at FROM county_registrations ORDER BY created_at";
    const SELECT_EDITOR: &'static str = "SELECT id, county_name, count, created_at, updated_at FROM county_registrations ORDER BY county_name";
    const INSERT: &'static str = "INSERT INTO county_registrations (county_name, count) VALUES ($1, $2) RETURNING id, county_name, count, created_at, updated_at";
    const UPDATE: &'static str = "UPDATE county_registrations SET county_name = $1, count = $2, updated_at = now() WHERE id = $3 RETURNING id, county_name, count, created_at, updated_at";

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_key(&self) -> Option<&str> {
        Some(&self.county_name)
    }

    fn bind_input<'q>(query: RecordQuery<'q, Self>, input: &'q Self::Input) -> RecordQuery<'q, Self> {
        query.bind(input.county_name.as_str()).bind(input.count)
    }
}

/***************** Sector registrations *********************/

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectorRegistration {
    pub id: Uuid,
    pub sector_name: String,
    pub count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectorRegistrationInput {
    pub sector_name: String,
    pub count: i64,
}

impl Validate for SectorRegistrationInput {
    fn validate(self) -> Result<Self, ApplicationError> {
        require_text("sectorName", &self.sector_name)?;
        require_count("count", self.count)?;
        Ok(self)
    }
}

impl Record for SectorRegistration {
    type Input = SectorRegistrationInput;

    const TABLE: TableName = TableName::SectorRegistrations;
    const TAB: AdminTab = AdminTab::Sector;
    const SELECT_REPORT: &'static str = "SELECT id, sector_name, count, created_at, updated_at FROM sector_registrations ORDER BY created_at";
    const SELECT_EDITOR: &'static str = "SELECT id, sector_name, count, created_at, updated_at FROM sector_registrations ORDER BY sector_name";
    const INSERT: &'static str = "INSERT INTO sector_registrations (sector_name, count) VALUES ($1, $2) RETURNING id, sector_name, count, created_at, updated_at";
    const UPDATE: &'static str = "UPDATE sector_registrations SET sector_name = $1, count = $2, updated_at = now() WHERE id = $3 RETURNING id, sector_name, count, created_at, updated_at";

    fn id(&self) -> Uuid {
        self.id
    }

    fn bind_input<'q>(query: RecordQuery<'q, Self>, input: &'q Self::Input) -> RecordQuery<'q, Self> {
        query.bind(input.sector_name.as_str()).bind(input.count)
    }
}

/***************** Growth metrics *********************/

/**
 * Weekly growth figures. `weekly_growth` and `weekly_growth_percentage` are stored as computed when the
 * row was last written and are not recomputed on read.
 */
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrowthMetric {
    pub id: Uuid,
    pub date_range: String,
    pub previous_number: i64,
    pub current_number: i64,
    pub weekly_growth: i64,
    pub weekly_growth_percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrowthMetricInput {
    pub date_range: String,
    pub previous_number: i64,
    pub current_number: i64,
}

impl Validate for GrowthMetricInput {
    fn validate(self) -> Result<Self, ApplicationError> {
        require_text("dateRange", &self.date_range)?;
        require_count("previousNumber", self.previous_number)?;
        require_count("currentNumber", self.current_number)?;
        Ok(self)
    }
}

impl GrowthMetricInput {
    /**
     * Growth and growth percentage stored with the row.
     */
    pub fn figures(&self) -> GrowthFigures {
        growth_figures(self.previous_number, self.current_number)
    }
}

impl Record for GrowthMetric {
    type Input = GrowthMetricInput;

    const TABLE: TableName = TableName::GrowthMetrics;
    const TAB: AdminTab = AdminTab::Growth;
    const SELECT_REPORT: &'static str = "SELECT id, date_range, previous_number, current_number, weekly_growth, weekly_growth_percentage, created_at FROM growth_metrics ORDER BY created_at";
    const SELECT_EDITOR: &'static str = "SELECT id, date_range, previous_number, current_number, weekly_growth, weekly_growth_percentage, created_at FROM growth_metrics ORDER BY created_at DESC";
    const INSERT: &'static str = "INSERT INTO growth_metrics (date_range, previous_number, current_number, weekly_growth, weekly_growth_percentage) VALUES ($1, $2, $3, $4, $5) RETURNING id, date_range, previous_number, current_number, weekly_growth, weekly_growth_percentage, created_at";
    const UPDATE: &'static str = "UPDATE growth_metrics SET date_range = $1, previous_number = $2, current_number = $3, weekly_growth = $4, weekly_growth_percentage = $5 WHERE id = $6 RETURNING id, date_range, previous_number, current_number, weekly_growth, weekly_growth_percentage, created_at";

    fn id(&self) -> Uuid {
        self.id
    }

    fn bind_input<'q>(query: RecordQuery<'q, Self>, input: &'q Self::Input) -> RecordQuery<'q, Self> {
        let figures = input.figures();
        query
            .bind(input.date_range.as_str())
            .bind(input.previous_number)
            .bind(input.current_number)
            .bind(figures.weekly_growth)
            .bind(figures.weekly_growth_percentage)
    }
}
