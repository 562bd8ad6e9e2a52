//! In-memory `RegistrationStore` used by the editor and report tests.

use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    model::{
        apperror::{ApplicationError, ErrorType},
        records::{CountyRegistration, GrowthMetric, ListOrder, MonthlyRegistration, Record, SectorRegistration, WeeklyRegistration},
    },
    service::store::RegistrationStore,
};

#[derive(Default)]
pub struct Tables {
    pub monthly: Vec<MonthlyRegistration>,
    pub weekly: Vec<WeeklyRegistration>,
    pub county: Vec<CountyRegistration>,
    pub sector: Vec<SectorRegistration>,
    pub growth: Vec<GrowthMetric>,
}

/**
 * Record kinds that can be built from their input without a database.
 */
pub trait MemoryRecord: Record {
    fn build(id: Uuid, input: &Self::Input) -> Self;
    fn apply(&mut self, input: &Self::Input);
    fn rows(tables: &mut Tables) -> &mut Vec<Self>;
}

/**
 * Counts issued requests and can be told to fail reads or writes.
 */
#[derive(Default)]
pub struct MemoryStore {
    pub tables: Mutex<Tables>,
    fail_reads: bool,
    fail_writes: bool,
    selects: Mutex<usize>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_tables(tables: Tables) -> Self {
        MemoryStore { tables: Mutex::new(tables), ..MemoryStore::default() }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn select_count(&self) -> usize {
        *self.selects.lock().unwrap()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn rows<R: MemoryRecord>(&self) -> Vec<R> {
        R::rows(&mut self.tables.lock().unwrap()).clone()
    }

    fn write<R: MemoryRecord, T>(&self, operation: impl FnOnce(&mut Vec<R>) -> Result<T, ApplicationError>) -> Result<T, ApplicationError> {
        *self.writes.lock().unwrap() += 1;
        if self.fail_writes {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "write failed".to_string()));
        }
        let mut tables = self.tables.lock().unwrap();
        operation(R::rows(&mut tables))
    }
}

impl<R: MemoryRecord> RegistrationStore<R> for MemoryStore {
    async fn select(&self, _order: ListOrder) -> Result<Vec<R>, ApplicationError> {
        *self.selects.lock().unwrap() += 1;
        if self.fail_reads {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "read failed".to_string()));
        }
        Ok(self.rows::<R>())
    }

    async fn insert(&self, input: &R::Input) -> Result<R, ApplicationError> {
        self.write::<R, R>(|rows| {
            let row = R::build(Uuid::new_v4(), input);
            rows.push(row.clone());
            Ok(row)
        })
    }

    async fn update(&self, id: Uuid, input: &R::Input) -> Result<R, ApplicationError> {
        self.write::<R, R>(|rows| {
            let row = rows.iter_mut().find(|row| row.id() == id).ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()))?;
            row.apply(input);
            Ok(row.clone())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
        self.write::<R, ()>(|rows| {
            let before = rows.len();
            rows.retain(|row| row.id() != id);
            if rows.len() == before {
                return Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()));
            }
            Ok(())
        })
    }
}

impl MemoryRecord for MonthlyRegistration {
    fn build(id: Uuid, input: &Self::Input) -> Self {
        MonthlyRegistration { id, month: input.month.clone(), year: input.year, count: input.count, created_at: Utc::now() }
    }

    fn apply(&mut self, input: &Self::Input) {
        self.month = input.month.clone();
        self.year = input.year;
        self.count = input.count;
    }

    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.monthly
    }
}

impl MemoryRecord for WeeklyRegistration {
    fn build(id: Uuid, input: &Self::Input) -> Self {
        WeeklyRegistration {
            id,
            date_range: input.date_range.clone(),
            count: input.count,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: Utc::now(),
            sort_order: input.sort_order,
        }
    }

    fn apply(&mut self, input: &Self::Input) {
        self.date_range = input.date_range.clone();
        self.count = input.count;
        self.start_date = input.start_date;
        self.end_date = input.end_date;
        self.sort_order = input.sort_order;
    }

    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.weekly
    }
}

impl MemoryRecord for CountyRegistration {
    fn build(id: Uuid, input: &Self::Input) -> Self {
        CountyRegistration { id, county_name: input.county_name.clone(), count: input.count, created_at: Utc::now(), updated_at: Utc::now() }
    }

    fn apply(&mut self, input: &Self::Input) {
        self.county_name = input.county_name.clone();
        self.count = input.count;
        self.updated_at = Utc::now();
    }

    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.county
    }
}

impl MemoryRecord for SectorRegistration {
    fn build(id: Uuid, input: &Self::Input) -> Self {
        SectorRegistration { id, sector_name: input.sector_name.clone(), count: input.count, created_at: Utc::now(), updated_at: Utc::now() }
    }

    fn apply(&mut self, input: &Self::Input) {
        self.sector_name = input.sector_name.clone();
        self.count = input.count;
        self.updated_at = Utc::now();
    }

    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.sector
    }
}

impl MemoryRecord for GrowthMetric {
    fn build(id: Uuid, input: &Self::Input) -> Self {
        let figures = input.figures();
        GrowthMetric {
            id,
            date_range: input.date_range.clone(),
            previous_number: input.previous_number,
            current_number: input.current_number,
            weekly_growth: figures.weekly_growth,
            weekly_growth_percentage: figures.weekly_growth_percentage,
            created_at: Utc::now(),
        }
    }

    fn apply(&mut self, input: &Self::Input) {
        let figures = input.figures();
        self.date_range = input.date_range.clone();
        self.previous_number = input.previous_number;
        self.current_number = input.current_number;
        self.weekly_growth = figures.weekly_growth;
        self.weekly_growth_percentage = figures.weekly_growth_percentage;
    }

    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.growth
    }
}
