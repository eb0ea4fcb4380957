use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::browsing::stats::DayStats;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyQuery {
    /// Days to report, today included. Defaults to 7, capped at 30;
    /// zero or negative values yield an empty list.
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyStatsResponse {
    pub daily_stats: Vec<DayStats>,
}
