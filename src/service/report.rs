use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::{
    metrics::{
        charts::{BarChart, HorizontalBar, WeeklyChart, county_chart, monthly_chart, sector_chart, weekly_chart},
        derived::{GrowthSnapshot, active_counties, latest_growth, latest_weekly_count, sector_count, total_registrations},
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        config::ReportSettings,
        records::{CountyRegistration, GrowthMetric, ListOrder, MonthlyRegistration, Record, SectorRegistration, WeeklyRegistration},
    },
    service::store::RegistrationStore,
};

/**
 * A store able to serve every table the report reads.
 */
pub trait ReportStore:
    RegistrationStore<MonthlyRegistration> + RegistrationStore<WeeklyRegistration> + RegistrationStore<CountyRegistration> + RegistrationStore<SectorRegistration> + RegistrationStore<GrowthMetric>
{
}

impl<S> ReportStore for S where
    S: RegistrationStore<MonthlyRegistration> + RegistrationStore<WeeklyRegistration> + RegistrationStore<CountyRegistration> + RegistrationStore<SectorRegistration> + RegistrationStore<GrowthMetric>
{
}

/**
 * Headline figures shown above the charts.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTiles {
    /**
     * Count of the last weekly row.
     */
    pub weekly_registrations: i64,
    /**
     * Current total taken from the latest growth metric.
     */
    pub current_total: i64,
    /**
     * "<pct>% growth", only present when there is a growth metric.
     */
    pub growth_trend: Option<String>,
    pub active_counties: usize,
    pub sector_working_groups: usize,
    pub total_registrations: i64,
}

/**
 * The composed public report.
 */
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub organisation: String,
    pub tagline: String,
    pub generated_at: String,
    pub tiles: ReportTiles,
    pub monthly_chart: BarChart,
    pub weekly_chart: WeeklyChart,
    pub county_chart: Vec<HorizontalBar>,
    pub sector_chart: Vec<HorizontalBar>,
    /**
     * Latest growth metric, absent when the growth table is empty.
     */
    pub latest_growth: Option<GrowthSnapshot>,
}

/**
 * Reads one table for the report. A failed read is logged and yields an empty collection.
 */
async fn fetch<R, S>(store: &S) -> Vec<R>
where
    R: Record,
    S: RegistrationStore<R>,
{
    match store.select(ListOrder::Report).await {
        Ok(rows) => rows,
        Err(err) => {
            error!("Failed to fetch {}: {}", R::TABLE.as_str(), err);
            Vec::new()
        }
    }
}

/**
 * Builds the report from the five tables, read concurrently.
 *
 * # Arguments
 * `store`: Where the tables are read from.
 * `settings`: Titles shown on the report.
 * `generated_at`: Current value of the report clock.
 *
 * # Returns
 * The composed report. Never fails; unreadable tables are reported as empty.
 */
#[instrument(skip(store, settings), fields(result))]
pub async fn build_report<S: ReportStore>(store: &S, settings: &ReportSettings, generated_at: String) -> Report {
    let (monthly, weekly, counties, sectors, growth) = futures_util::join!(
        fetch::<MonthlyRegistration, _>(store),
        fetch::<WeeklyRegistration, _>(store),
        fetch::<CountyRegistration, _>(store),
        fetch::<SectorRegistration, _>(store),
        fetch::<GrowthMetric, _>(store),
    );
    debug!("Report input: {} monthly, {} weekly, {} counties, {} sectors, {} growth", monthly.len(), weekly.len(), counties.len(), sectors.len(), growth.len());

    let latest = latest_growth(&growth);
    let tiles = ReportTiles {
        weekly_registrations: latest_weekly_count(&weekly),
        current_total: GrowthSnapshot::from(latest).current_number,
        growth_trend: latest.map(|metric| format!("{}% growth", metric.weekly_growth_percentage)),
        active_counties: active_counties(&counties),
        sector_working_groups: sector_count(&sectors),
        total_registrations: total_registrations(&monthly),
    };

    Report {
        title: settings.title.clone(),
        organisation: settings.organisation.clone(),
        tagline: settings.tagline.clone(),
        generated_at,
        tiles,
        monthly_chart: monthly_chart(&monthly),
        weekly_chart: weekly_chart(&weekly),
        county_chart: county_chart(&counties),
        sector_chart: sector_chart(&sectors),
        latest_growth: latest.map(|metric| GrowthSnapshot::from(Some(metric))),
    }
}

/**
 * Formats a report timestamp, e.g. "October 15, 2026 • 03:04:05 PM EAT".
 */
pub fn format_clock(now: DateTime<Utc>, offset: &FixedOffset, label: &str) -> String {
    format!("{} {}", now.with_timezone(offset).format("%B %-d, %Y • %I:%M:%S %p"), label)
}

/**
 * Report date and time, refreshed once a second by a background task. Dropping the clock stops the task.
 */
pub struct ReportClock {
    current: Arc<RwLock<String>>,
    task: JoinHandle<()>,
}

impl ReportClock {
    /**
     * Starts the clock. Must be called from within a tokio runtime.
     *
     * # Arguments
     * `utc_offset_hours`: Fixed offset from UTC.
     * `label`: Timezone label appended to the time.
     *
     * # Returns
     * The running clock, or an `ApplicationError` if the offset is out of range.
     */
    pub fn start(utc_offset_hours: i32, label: &str) -> Result<Self, ApplicationError> {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ApplicationError::new(ErrorType::Initialization, format!("Invalid UTC offset: {utc_offset_hours}")))?;
        let label = label.to_string();
        let current = Arc::new(RwLock::new(format_clock(Utc::now(), &offset, &label)));
        let shared = current.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                let text = format_clock(Utc::now(), &offset, &label);
                match shared.write() {
                    Ok(mut guard) => *guard = text,
                    Err(err) => error!("Report clock lock poisoned: {err}"),
                }
            }
        });
        Ok(ReportClock { current, task })
    }

    pub fn now(&self) -> String {
        self.current.read().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl Drop for ReportClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}
