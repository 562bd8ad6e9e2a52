//! Aggregates computed from fetched collections. Everything here is pure and never fails on empty or
//! zero-valued input.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::model::records::{CountyRegistration, GrowthMetric, MonthlyRegistration, SectorRegistration, WeeklyRegistration};

/**
 * Number of counties shown in the county chart.
 */
pub const TOP_COUNTY_LIMIT: usize = 10;

/**
 * Growth figures stored alongside a growth metric when it is written.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthFigures {
    pub weekly_growth: i64,
    pub weekly_growth_percentage: Decimal,
}

/**
 * Computes growth and growth percentage from the previous and current totals.
 *
 * The percentage is `growth / previous * 100` rounded half away from zero to three decimals, and zero when
 * `previous` is zero.
 */
pub fn growth_figures(previous: i64, current: i64) -> GrowthFigures {
    let weekly_growth = current - previous;
    let mut weekly_growth_percentage = if previous > 0 {
        (Decimal::from(weekly_growth) * Decimal::ONE_HUNDRED / Decimal::from(previous)).round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };
    weekly_growth_percentage.rescale(3);
    GrowthFigures { weekly_growth, weekly_growth_percentage }
}

/**
 * Sum of the monthly counts, saturating at `i64::MAX`.
 */
pub fn total_registrations(monthly: &[MonthlyRegistration]) -> i64 {
    monthly.iter().fold(0i64, |total, row| total.saturating_add(row.count))
}

pub fn active_counties(counties: &[CountyRegistration]) -> usize {
    counties.iter().filter(|county| county.count > 0).count()
}

pub fn sector_count(sectors: &[SectorRegistration]) -> usize {
    sectors.len()
}

/**
 * The latest growth metric is the last row in fetch order, which is ascending by creation time.
 *
 * Rows sharing a creation timestamp make this ambiguous; the last one fetched wins.
 */
pub fn latest_growth(growth: &[GrowthMetric]) -> Option<&GrowthMetric> {
    growth.last()
}

/**
 * Count of the last weekly row, or 0 when there are no weekly rows.
 */
pub fn latest_weekly_count(weekly: &[WeeklyRegistration]) -> i64 {
    weekly.last().map_or(0, |row| row.count)
}

/**
 * Display values of the latest growth metric, falling back to zeros when there is none.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthSnapshot {
    pub date_range: Option<String>,
    pub previous_number: i64,
    pub current_number: i64,
    pub weekly_growth: i64,
    pub weekly_growth_percentage: Decimal,
}

impl Default for GrowthSnapshot {
    fn default() -> Self {
        let mut weekly_growth_percentage = Decimal::ZERO;
        weekly_growth_percentage.rescale(3);
        GrowthSnapshot { date_range: None, previous_number: 0, current_number: 0, weekly_growth: 0, weekly_growth_percentage }
    }
}

impl From<Option<&GrowthMetric>> for GrowthSnapshot {
    fn from(latest: Option<&GrowthMetric>) -> Self {
        match latest {
            Some(metric) => GrowthSnapshot {
                date_range: Some(metric.date_range.clone()),
                previous_number: metric.previous_number,
                current_number: metric.current_number,
                weekly_growth: metric.weekly_growth,
                weekly_growth_percentage: metric.weekly_growth_percentage,
            },
            None => GrowthSnapshot::default(),
        }
    }
}

/**
 * Scales `value` into `range` relative to `max`. A zero (or negative) `max` scales everything to zero.
 */
pub fn scale(value: f64, max: f64, range: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    value / max * range
}

/**
 * Largest value, or 0 for an empty slice.
 */
pub fn max_value(values: &[i64]) -> i64 {
    values.iter().copied().max().unwrap_or(0)
}

/**
 * Prefix average: element `i` is the mean of `values[0..=i]`.
 */
#[allow(clippy::cast_precision_loss)]
pub fn moving_average(values: &[i64]) -> Vec<f64> {
    let mut sum = 0i128;
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            sum += i128::from(*value);
            sum as f64 / (index + 1) as f64
        })
        .collect()
}

/**
 * Counties sorted descending by count, limited to the first ten. Equal counts keep fetch order.
 */
pub fn top_counties(counties: &[CountyRegistration]) -> Vec<&CountyRegistration> {
    let mut sorted: Vec<&CountyRegistration> = counties.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.truncate(TOP_COUNTY_LIMIT);
    sorted
}

/**
 * Sectors sorted descending by count. Equal counts keep fetch order.
 */
pub fn sectors_by_count(sectors: &[SectorRegistration]) -> Vec<&SectorRegistration> {
    let mut sorted: Vec<&SectorRegistration> = sectors.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn monthly(count: i64) -> MonthlyRegistration {
        MonthlyRegistration { id: Uuid::new_v4(), month: "October".to_string(), year: 2025, count, created_at: Utc::now() }
    }

    fn county(name: &str, count: i64) -> CountyRegistration {
        CountyRegistration { id: Uuid::new_v4(), county_name: name.to_string(), count, created_at: Utc::now(), updated_at: Utc::now() }
    }

    fn sector(name: &str, count: i64) -> SectorRegistration {
        SectorRegistration { id: Uuid::new_v4(), sector_name: name.to_string(), count, created_at: Utc::now(), updated_at: Utc::now() }
    }

    fn growth(date_range: &str, previous: i64, current: i64) -> GrowthMetric {
        let figures = growth_figures(previous, current);
        GrowthMetric {
            id: Uuid::new_v4(),
            date_range: date_range.to_string(),
            previous_number: previous,
            current_number: current,
            weekly_growth: figures.weekly_growth,
            weekly_growth_percentage: figures.weekly_growth_percentage,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_total_registrations() {
        assert_eq!(total_registrations(&[monthly(10), monthly(25), monthly(5)]), 40);
        assert_eq!(total_registrations(&[]), 0);
    }

    #[test]
    fn test_total_registrations_saturates() {
        assert_eq!(total_registrations(&[monthly(i64::MAX), monthly(1)]), i64::MAX);
    }

    #[test]
    fn test_active_counties() {
        assert_eq!(active_counties(&[county("Nairobi", 5), county("Lamu", 0), county("Kisumu", 2)]), 2);
        assert_eq!(active_counties(&[county("Nairobi", 0), county("Lamu", 0)]), 0);
        assert_eq!(active_counties(&[]), 0);
    }

    #[test]
    fn test_sector_count() {
        assert_eq!(sector_count(&[sector("Health", 0), sector("Agriculture", 4)]), 2);
    }

    #[test]
    fn test_growth_figures() {
        let figures = growth_figures(100, 115);
        assert_eq!(figures.weekly_growth, 15);
        assert_eq!(figures.weekly_growth_percentage.to_string(), "15.000");
    }

    #[test]
    fn test_growth_figures_rounds_to_three_decimals() {
        let figures = growth_figures(3, 4);
        assert_eq!(figures.weekly_growth, 1);
        assert_eq!(figures.weekly_growth_percentage.to_string(), "33.333");
        let figures = growth_figures(3, 5);
        assert_eq!(figures.weekly_growth_percentage.to_string(), "66.667");
    }

    #[test]
    fn test_growth_figures_negative_growth() {
        let figures = growth_figures(200, 150);
        assert_eq!(figures.weekly_growth, -50);
        assert_eq!(figures.weekly_growth_percentage.to_string(), "-25.000");
    }

    #[test]
    fn test_growth_figures_zero_previous() {
        let figures = growth_figures(0, 42);
        assert_eq!(figures.weekly_growth, 42);
        assert_eq!(figures.weekly_growth_percentage.to_string(), "0.000");
    }

    #[test]
    fn test_latest_growth_is_last_element() {
        let rows = vec![growth("1/9-7/9", 10, 20), growth("8/9-14/9", 500, 510), growth("15/9-21/9", 20, 30)];
        let latest = latest_growth(&rows).unwrap();
        assert_eq!(latest.date_range, "15/9-21/9");
    }

    #[test]
    fn test_latest_growth_empty() {
        assert!(latest_growth(&[]).is_none());
        let snapshot = GrowthSnapshot::from(latest_growth(&[]));
        assert_eq!(snapshot.current_number, 0);
        assert_eq!(snapshot.weekly_growth, 0);
        assert!(snapshot.date_range.is_none());
        assert_eq!(snapshot.weekly_growth_percentage.to_string(), "0.000");
    }

    #[test]
    fn test_growth_snapshot_copies_stored_values() {
        let mut row = growth("15/9-21/9", 100, 115);
        // Stored figures are reported as-is even when they no longer match the totals.
        row.current_number = 130;
        let snapshot = GrowthSnapshot::from(Some(&row));
        assert_eq!(snapshot.current_number, 130);
        assert_eq!(snapshot.weekly_growth, 15);
    }

    #[test]
    fn test_moving_average() {
        assert_eq!(moving_average(&[5, 10, 15]), vec![5.0, 7.5, 10.0]);
        assert_eq!(moving_average(&[7]), vec![7.0]);
        assert!(moving_average(&[]).is_empty());
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_moving_average_with_huge_counts() {
        let averages = moving_average(&[i64::MAX, i64::MAX]);
        assert_eq!(averages.len(), 2);
        assert!(averages.iter().all(|average| average.is_finite()));
        assert!((averages[1] - i64::MAX as f64).abs() <= 1.0e4);
    }

    #[test]
    fn test_scale() {
        assert!((scale(50.0, 100.0, 216.0) - 108.0).abs() < f64::EPSILON);
        assert!((scale(100.0, 100.0, 216.0) - 216.0).abs() < f64::EPSILON);
        assert!(scale(0.0, 0.0, 216.0).abs() < f64::EPSILON);
        assert!(scale(10.0, 0.0, 216.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_max_value() {
        assert_eq!(max_value(&[3, 9, 4]), 9);
        assert_eq!(max_value(&[]), 0);
    }

    #[test]
    fn test_top_counties_sorted_stable_and_limited() {
        let counties: Vec<CountyRegistration> = (0..12).map(|index| county(&format!("County {index}"), i64::from(index % 3))).collect();
        let top = top_counties(&counties);
        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|pair| pair[0].count >= pair[1].count));
        let names: Vec<&str> = top.iter().take(4).map(|c| c.county_name.as_str()).collect();
        assert_eq!(names, vec!["County 2", "County 5", "County 8", "County 11"]);
    }

    #[test]
    fn test_top_counties_short_input() {
        let counties = vec![county("Nairobi", 1), county("Kisumu", 3)];
        let top = top_counties(&counties);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].county_name, "Kisumu");
    }

    #[test]
    fn test_sectors_by_count_keeps_all() {
        let sectors = vec![sector("Health", 2), sector("Education", 7), sector("Sports", 2), sector("Arts", 9)];
        let sorted: Vec<&str> = sectors_by_count(&sectors).iter().map(|s| s.sector_name.as_str()).collect();
        assert_eq!(sorted, vec!["Arts", "Education", "Health", "Sports"]);
    }

    #[test]
    fn test_latest_weekly_count() {
        assert_eq!(latest_weekly_count(&[]), 0);
    }
}
