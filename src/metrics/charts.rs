//! Chart coordinates for the report. Vertical charts are laid out in view-box units, horizontal bars as
//! a percentage of the available width.

use serde::Serialize;

use crate::{
    metrics::derived::{max_value, moving_average, scale, sectors_by_count, top_counties},
    model::records::{CountyRegistration, MonthlyRegistration, SectorRegistration, WeeklyRegistration},
};

pub const MONTHLY_COLORS: [&str; 4] = ["#059669", "#dc2626", "#10b981", "#eab308"];
pub const SECTOR_COLORS: [&str; 8] = ["#10b981", "#eab308", "#ec4899", "#f97316", "#dc2626", "#6366f1", "#8b5cf6", "#06b6d4"];
pub const WEEKLY_BAR_COLOR: &str = "#eab308";
pub const COUNTY_BAR_COLOR: &str = "#2563eb";

/**
 * Dimensions of a vertical bar chart.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub chart_height: f64,
    pub padding: f64,
    pub bar_width: f64,
    pub gap: f64,
    /**
     * Distance between the bottom of the view box and the bar baseline, leaving room for labels.
     */
    pub baseline_offset: f64,
}

impl ChartLayout {
    pub const MONTHLY: ChartLayout = ChartLayout { chart_height: 256.0, padding: 40.0, bar_width: 80.0, gap: 60.0, baseline_offset: 20.0 };
    pub const WEEKLY: ChartLayout = ChartLayout { chart_height: 256.0, padding: 50.0, bar_width: 60.0, gap: 80.0, baseline_offset: 35.0 };

    pub fn available_height(&self) -> f64 {
        self.chart_height - self.padding
    }

    #[allow(clippy::cast_precision_loss)]
    fn bar_x(&self, index: usize) -> f64 {
        self.gap + index as f64 * (self.bar_width + self.gap)
    }

    fn top_y(&self, height: f64) -> f64 {
        self.chart_height - height - self.baseline_offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub label: String,
    pub value: i64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChart {
    pub view_box_width: f64,
    pub view_box_height: f64,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyChart {
    pub view_box_width: f64,
    pub view_box_height: f64,
    pub bars: Vec<Bar>,
    pub moving_average: Vec<ChartPoint>,
}

/**
 * A labelled horizontal bar whose width is relative to the largest value in its chart.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalBar {
    pub label: String,
    pub value: i64,
    pub width_percent: f64,
    pub color: String,
}

#[allow(clippy::cast_precision_loss)]
fn vertical_bars(layout: &ChartLayout, values: &[(String, i64, &str)]) -> Vec<Bar> {
    let counts: Vec<i64> = values.iter().map(|(_, value, _)| *value).collect();
    let max = max_value(&counts) as f64;
    values
        .iter()
        .enumerate()
        .map(|(index, (label, value, color))| {
            let height = scale(*value as f64, max, layout.available_height());
            Bar { label: label.clone(), value: *value, x: layout.bar_x(index), y: layout.top_y(height), width: layout.bar_width, height, color: (*color).to_string() }
        })
        .collect()
}

/**
 * Monthly registrations as coloured bars in fetch order.
 */
#[allow(clippy::cast_precision_loss)]
pub fn monthly_chart(monthly: &[MonthlyRegistration]) -> BarChart {
    let layout = ChartLayout::MONTHLY;
    let values: Vec<(String, i64, &str)> = monthly.iter().enumerate().map(|(index, row)| (row.month.clone(), row.count, MONTHLY_COLORS[index % MONTHLY_COLORS.len()])).collect();
    BarChart {
        view_box_width: (layout.bar_width + layout.gap) * monthly.len() as f64 + layout.gap,
        view_box_height: layout.chart_height,
        bars: vertical_bars(&layout, &values),
    }
}

/**
 * Weekly registrations as bars with the prefix moving average drawn through the bar centres.
 */
#[allow(clippy::cast_precision_loss)]
pub fn weekly_chart(weekly: &[WeeklyRegistration]) -> WeeklyChart {
    let layout = ChartLayout::WEEKLY;
    let values: Vec<(String, i64, &str)> = weekly.iter().map(|row| (week_label(&row.date_range), row.count, WEEKLY_BAR_COLOR)).collect();
    let counts: Vec<i64> = weekly.iter().map(|row| row.count).collect();
    let max = max_value(&counts) as f64;
    let moving_average = moving_average(&counts)
        .into_iter()
        .enumerate()
        .map(|(index, average)| {
            let height = scale(average, max, layout.available_height());
            ChartPoint { x: layout.bar_x(index) + layout.bar_width / 2.0, y: layout.top_y(height), value: average }
        })
        .collect();
    WeeklyChart {
        view_box_width: (layout.bar_width + layout.gap) * weekly.len() as f64 + layout.gap * 2.0,
        view_box_height: layout.chart_height,
        bars: vertical_bars(&layout, &values),
        moving_average,
    }
}

/**
 * Bar label for a week: the part of the date range before the first dash.
 */
pub fn week_label(date_range: &str) -> String {
    date_range.split('-').next().unwrap_or_default().trim().to_string()
}

#[allow(clippy::cast_precision_loss)]
fn horizontal_bars<'a>(rows: impl Iterator<Item = (&'a str, i64)>, color: impl Fn(usize) -> &'static str) -> Vec<HorizontalBar> {
    let rows: Vec<(&str, i64)> = rows.collect();
    let counts: Vec<i64> = rows.iter().map(|(_, count)| *count).collect();
    let max = max_value(&counts) as f64;
    rows.into_iter()
        .enumerate()
        .map(|(index, (label, value))| HorizontalBar { label: label.to_string(), value, width_percent: scale(value as f64, max, 100.0), color: color(index).to_string() })
        .collect()
}

/**
 * The ten counties with most registrations.
 */
pub fn county_chart(counties: &[CountyRegistration]) -> Vec<HorizontalBar> {
    horizontal_bars(top_counties(counties).into_iter().map(|county| (county.county_name.as_str(), county.count)), |_| COUNTY_BAR_COLOR)
}

/**
 * All sectors by registrations, coloured by rank.
 */
pub fn sector_chart(sectors: &[SectorRegistration]) -> Vec<HorizontalBar> {
    horizontal_bars(sectors_by_count(sectors).into_iter().map(|sector| (sector.sector_name.as_str(), sector.count)), |index| SECTOR_COLORS[index % SECTOR_COLORS.len()])
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    fn monthly(month: &str, count: i64) -> MonthlyRegistration {
        MonthlyRegistration { id: Uuid::new_v4(), month: month.to_string(), year: 2025, count, created_at: Utc::now() }
    }

    fn weekly(date_range: &str, count: i64) -> WeeklyRegistration {
        let day = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        WeeklyRegistration { id: Uuid::new_v4(), date_range: date_range.to_string(), count, start_date: day, end_date: day, created_at: Utc::now(), sort_order: 0 }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn test_monthly_chart_geometry() {
        let chart = monthly_chart(&[monthly("August", 50), monthly("September", 100), monthly("October", 25)]);
        assert_close(chart.view_box_width, 140.0 * 3.0 + 60.0);
        assert_eq!(chart.bars.len(), 3);
        let available = 256.0 - 40.0;
        assert_close(chart.bars[0].height, available / 2.0);
        assert_close(chart.bars[1].height, available);
        assert_close(chart.bars[1].y, 256.0 - available - 20.0);
        assert_close(chart.bars[2].x, 60.0 + 2.0 * 140.0);
        assert_eq!(chart.bars[2].label, "October");
        assert_eq!(chart.bars[1].color, MONTHLY_COLORS[1]);
    }

    #[test]
    fn test_monthly_chart_all_zero_counts() {
        let chart = monthly_chart(&[monthly("August", 0), monthly("September", 0)]);
        assert!(chart.bars.iter().all(|bar| bar.height == 0.0 && !bar.height.is_nan()));
        assert!(chart.bars.iter().all(|bar| (bar.y - (256.0 - 20.0)).abs() < 1e-9));
    }

    #[test]
    fn test_monthly_chart_empty() {
        let chart = monthly_chart(&[]);
        assert!(chart.bars.is_empty());
        assert_close(chart.view_box_width, 60.0);
    }

    #[test]
    fn test_monthly_colors_cycle() {
        let rows: Vec<MonthlyRegistration> = (0..5).map(|index| monthly(&format!("M{index}"), 1)).collect();
        let chart = monthly_chart(&rows);
        assert_eq!(chart.bars[4].color, MONTHLY_COLORS[0]);
    }

    #[test]
    fn test_weekly_chart_moving_average() {
        let chart = weekly_chart(&[weekly("3/11-9/11", 5), weekly("10/11-16/11", 10), weekly("17/11-23/11", 15)]);
        let averages: Vec<f64> = chart.moving_average.iter().map(|point| point.value).collect();
        assert_eq!(averages, vec![5.0, 7.5, 10.0]);
        let available = 256.0 - 50.0;
        assert_close(chart.moving_average[1].y, 256.0 - 7.5 / 15.0 * available - 35.0);
        assert_close(chart.moving_average[0].x, 80.0 + 30.0);
        assert_close(chart.view_box_width, 140.0 * 3.0 + 160.0);
        assert_eq!(chart.bars[1].label, "10/11");
    }

    #[test]
    fn test_weekly_chart_zero_max() {
        let chart = weekly_chart(&[weekly("3/11-9/11", 0)]);
        assert_close(chart.bars[0].height, 0.0);
        assert_close(chart.moving_average[0].y, 256.0 - 35.0);
    }

    #[test]
    fn test_week_label() {
        assert_eq!(week_label("23/9/2025-29/9/2025"), "23/9/2025");
        assert_eq!(week_label("Week 1"), "Week 1");
        assert_eq!(week_label(""), "");
    }

    #[test]
    fn test_county_chart_widths() {
        let counties = vec![
            CountyRegistration { id: Uuid::new_v4(), county_name: "Nairobi".to_string(), count: 40, created_at: Utc::now(), updated_at: Utc::now() },
            CountyRegistration { id: Uuid::new_v4(), county_name: "Kisumu".to_string(), count: 10, created_at: Utc::now(), updated_at: Utc::now() },
        ];
        let chart = county_chart(&counties);
        assert_eq!(chart[0].label, "Nairobi");
        assert_close(chart[0].width_percent, 100.0);
        assert_close(chart[1].width_percent, 25.0);
    }

    #[test]
    fn test_sector_chart_zero_counts_and_colors() {
        let sectors: Vec<SectorRegistration> = (0..9)
            .map(|index| SectorRegistration { id: Uuid::new_v4(), sector_name: format!("Sector {index}"), count: 0, created_at: Utc::now(), updated_at: Utc::now() })
            .collect();
        let chart = sector_chart(&sectors);
        assert_eq!(chart.len(), 9);
        assert!(chart.iter().all(|bar| bar.width_percent == 0.0));
        assert_eq!(chart[8].color, SECTOR_COLORS[0]);
        assert_eq!(chart[0].label, "Sector 0");
    }
}
