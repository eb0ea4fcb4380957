//! Per-day and per-week statistics over categorised visits.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::browsing::Visit;
use crate::browsing::category::Category;

/// Time and share of the day spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategoryShare {
    /// Seconds.
    pub time: u64,
    pub visits: u64,
    /// Rounded percent of the day's total time.
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TopCategory {
    pub name: String,
    pub time: u64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayStats {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub day_name: String,
    pub total_time: u64,
    pub total_visits: u64,
    pub unique_sites: u64,
    pub top_category: Option<TopCategory>,
    /// Keyed by category label, e.g. `"Social Media"`.
    pub categories: BTreeMap<String, CategoryShare>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategoryTotals {
    pub time: u64,
    pub visits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WeeklySummary {
    pub period: String,
    pub total_time: u64,
    pub total_visits: u64,
    pub avg_daily_time: f64,
    pub days_with_data: u32,
    pub top_category: Option<TopCategory>,
    pub categories: BTreeMap<String, CategoryTotals>,
    pub daily_breakdown: Vec<DayStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn percentage(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

impl DayStats {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            day_name: date.format("%A").to_string(),
            total_time: 0,
            total_visits: 0,
            unique_sites: 0,
            top_category: None,
            categories: BTreeMap::new(),
            error: None,
        }
    }
}

/// The calendar days `today, today-1, ..., today-(days-1)`.
pub fn last_days(days: u32, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..i64::from(days)).map(move |offset| today - Duration::days(offset))
}

/// Statistics for each of the last `days` days, today first.
pub fn daily_stats(visits: &[Visit], days: u32, today: NaiveDate) -> Vec<DayStats> {
    last_days(days, today).map(|date| day_stats(visits, date)).collect()
}

/// Zeroed entries for each day, all carrying `error`.
pub fn failed_daily_stats(days: u32, today: NaiveDate, error: &str) -> Vec<DayStats> {
    last_days(days, today)
        .map(|date| DayStats { error: Some(error.to_owned()), ..DayStats::empty(date) })
        .collect()
}

fn day_stats(visits: &[Visit], date: NaiveDate) -> DayStats {
    let mut stats = DayStats::empty(date);
    let mut sites: HashSet<&str> = HashSet::new();
    let mut by_category: BTreeMap<Category, (u64, u64)> = BTreeMap::new();

    for visit in visits.iter().filter(|v| v.visited_at.date() == date) {
        stats.total_time += visit.duration_secs;
        stats.total_visits += 1;
        sites.insert(&visit.site);
        let entry = by_category.entry(visit.category).or_default();
        entry.0 += visit.duration_secs;
        entry.1 += 1;
    }
    stats.unique_sites = sites.len() as u64;

    let total = stats.total_time;
    stats.categories = by_category
        .into_iter()
        .map(|(category, (time, visits))| {
            let share = CategoryShare { time, visits, percentage: percentage(time, total) };
            (category.label().to_owned(), share)
        })
        .collect();
    stats.top_category = top_of(stats.categories.iter().map(|(name, c)| (name, c.time)), total);
    stats
}

/// Greatest time wins; equal times go to the earlier label.
fn top_of<'a>(items: impl Iterator<Item = (&'a String, u64)>, total: u64) -> Option<TopCategory> {
    let mut best: Option<(&String, u64)> = None;
    for (name, time) in items {
        match best {
            Some((best_name, best_time)) if time < best_time || (time == best_time && name >= best_name) => {}
            _ => best = Some((name, time)),
        }
    }
    best.map(|(name, time)| TopCategory { name: name.clone(), time, percentage: percentage(time, total) })
}

/// Roll seven daily entries up into a week.
pub fn weekly_summary(daily: Vec<DayStats>) -> WeeklySummary {
    let mut categories: BTreeMap<String, CategoryTotals> = BTreeMap::new();
    let mut total_time = 0;
    let mut total_visits = 0;
    let mut days_with_data = 0;

    for day in &daily {
        total_time += day.total_time;
        total_visits += day.total_visits;
        if day.total_visits > 0 {
            days_with_data += 1;
        }
        for (name, share) in &day.categories {
            let entry = categories.entry(name.clone()).or_insert(CategoryTotals { time: 0, visits: 0 });
            entry.time += share.time;
            entry.visits += share.visits;
        }
    }

    let top_category = top_of(categories.iter().map(|(name, c)| (name, c.time)), total_time);
    let error = daily.iter().find_map(|d| d.error.clone());

    WeeklySummary {
        period: "Last 7 Days".to_owned(),
        total_time,
        total_visits,
        avg_daily_time: total_time as f64 / 7.0,
        days_with_data,
        top_category,
        categories,
        daily_breakdown: daily,
        error,
    }
}
