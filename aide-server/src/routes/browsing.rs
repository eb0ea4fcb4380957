//! Browsing-history statistics for the dashboard charts.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, NaiveDate, NaiveTime};
use tracing::warn;
use utoipa::OpenApi;

use crate::browsing::stats::{
    self, CategoryShare, CategoryTotals, DayStats, TopCategory, WeeklySummary,
};
use crate::browsing;
use crate::extract::ApiQuery;
use crate::schemas::browsing::{DailyQuery, DailyStatsResponse};
use crate::state::AppState;

const DEFAULT_DAYS: i64 = 7;
const MAX_DAYS: i64 = 30;

#[derive(OpenApi)]
#[openapi(
    paths(get_daily_stats, get_weekly_summary),
    components(schemas(
        DailyStatsResponse,
        DayStats,
        CategoryShare,
        TopCategory,
        CategoryTotals,
        WeeklySummary
    ))
)]
pub struct BrowsingApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/browsing-history/daily", get(get_daily_stats))
        .route("/browsing-history/weekly", get(get_weekly_summary))
}

fn clamp_days(days: i64) -> u32 {
    // Fits in u32 after the clamp.
    days.clamp(0, MAX_DAYS) as u32
}

/// Daily stats for the last `days` days. History failures are reported in
/// each entry's `error` rather than as an HTTP error.
async fn collect_daily(state: &AppState, days: u32, today: NaiveDate) -> Vec<DayStats> {
    if days == 0 {
        return Vec::new();
    }
    let first_day = stats::last_days(days, today).last().unwrap_or(today);
    let since = first_day.and_time(NaiveTime::MIN);

    match browsing::analyze(state.history.as_ref(), state.llm(), since).await {
        Ok(analysis) => stats::daily_stats(&analysis.visits(), days, today),
        Err(e) => {
            warn!(error = %e, days, "browsing history unavailable");
            stats::failed_daily_stats(days, today, &e.to_string())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/browsing-history/daily",
    tag = "browsing-history",
    params(DailyQuery),
    responses(
        (status = 200, description = "Per-day statistics, today first", body = DailyStatsResponse),
        (status = 400, description = "Invalid query string"),
    )
)]
pub async fn get_daily_stats(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<DailyQuery>,
) -> Json<DailyStatsResponse> {
    let days = clamp_days(query.days.unwrap_or(DEFAULT_DAYS));
    let today = Local::now().date_naive();
    Json(DailyStatsResponse { daily_stats: collect_daily(&state, days, today).await })
}

#[utoipa::path(
    get,
    path = "/api/browsing-history/weekly",
    tag = "browsing-history",
    responses(
        (status = 200, description = "Summary of the last seven days", body = WeeklySummary),
    )
)]
pub async fn get_weekly_summary(State(state): State<Arc<AppState>>) -> Json<WeeklySummary> {
    let today = Local::now().date_naive();
    Json(stats::weekly_summary(collect_daily(&state, 7, today).await))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use chrono::Local;

    use crate::browsing::RawVisit;
    use crate::browsing::testing::FixedHistory;
    use crate::routes::testing::{TestApp, send};

    fn one_visit() -> FixedHistory {
        FixedHistory::new(vec![RawVisit {
            url: "https://github.com/rust-lang/rust".into(),
            title: "rust".into(),
            visited_at: Local::now().naive_local(),
        }])
    }

    #[tokio::test]
    async fn daily_defaults_to_a_week_and_caps_at_thirty() {
        let app = TestApp::with_history(Arc::new(one_visit())).await;

        let (status, body) = send(&app.router, "GET", "/api/browsing-history/daily", None).await;
        assert_eq!(status, StatusCode::OK);
        let days = body["daily_stats"].as_array().unwrap();
        assert_eq!(days.len(), 7);
        let visits: u64 = days.iter().filter_map(|d| d["total_visits"].as_u64()).sum();
        assert_eq!(visits, 1);

        let (_, body) = send(&app.router, "GET", "/api/browsing-history/daily?days=90", None).await;
        assert_eq!(body["daily_stats"].as_array().unwrap().len(), 30);

        let (_, body) = send(&app.router, "GET", "/api/browsing-history/daily?days=0", None).await;
        assert!(body["daily_stats"].as_array().unwrap().is_empty());

        let (status, body) = send(&app.router, "GET", "/api/browsing-history/daily?days=-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["daily_stats"].as_array().unwrap().is_empty());

        let (status, _) = send(&app.router, "GET", "/api/browsing-history/daily?days=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_history_still_answers_200() {
        let app = TestApp::with_history(Arc::new(FixedHistory::missing())).await;

        let (status, body) = send(&app.router, "GET", "/api/browsing-history/daily?days=2", None).await;
        assert_eq!(status, StatusCode::OK);
        let days = body["daily_stats"].as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert!(days.iter().all(|d| d["error"].is_string() && d["total_time"] == 0));

        let (status, week) = send(&app.router, "GET", "/api/browsing-history/weekly", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(week["error"].as_str().unwrap().contains("Chrome history not found"));
    }

    #[tokio::test]
    async fn weekly_summary_shape() {
        let app = TestApp::with_history(Arc::new(one_visit())).await;
        let (status, week) = send(&app.router, "GET", "/api/browsing-history/weekly", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(week["period"], "Last 7 Days");
        assert_eq!(week["total_visits"], 1);
        assert_eq!(week["days_with_data"], 1);
        assert_eq!(week["top_category"]["name"], "Development");
        assert_eq!(week["daily_breakdown"].as_array().unwrap().len(), 7);
        assert!(week.get("error").is_none());
    }
}
