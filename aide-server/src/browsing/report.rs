//! Markdown rendering of a browsing [`Analysis`].
//!
//! The report opens with a fenced `chart` block holding a bar-chart
//! description the chat UI draws above the text.

use chrono::NaiveDate;
use serde_json::json;

use crate::browsing::Analysis;
use crate::browsing::category::{self, Category, CategorySummary};
use crate::browsing::visits::{DomainSummary, format_duration};

const DOMAINS_PER_CATEGORY: usize = 5;
const VIDEO_TITLES: usize = 10;

pub fn render(analysis: &Analysis, date: NaiveDate) -> String {
    let categories = category::aggregate_by_category(&analysis.domains, &analysis.categories);

    let mut parts = vec![
        format!("```chart\n{}\n```", chart_data(&categories)),
        format!("# Daily Browsing Review - {}", date.format("%B %d, %Y")),
        summary(analysis, &categories),
        category_breakdown(&categories),
    ];
    if let Some(videos) = video_section(analysis) {
        parts.push(videos);
    }
    parts.push(insights(analysis, &categories));
    parts.join("\n\n")
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn chart_data(categories: &[CategorySummary]) -> serde_json::Value {
    let data: Vec<serde_json::Value> = categories
        .iter()
        .filter(|c| c.total_duration > 0)
        .map(|c| {
            let minutes = c.total_duration as f64 / 60.0;
            json!({
                "category": c.category.label(),
                "minutes": round_to(minutes, 1),
                "hours": round_to(minutes / 60.0, 2),
                "visits": c.visit_count,
            })
        })
        .collect();

    json!({
        "type": "bar",
        "title": "Time Spent by Category",
        "data": data,
        "xAxis": "category",
        "yAxis": "minutes",
        "yAxisLabel": "Time (minutes)",
    })
}

fn summary(analysis: &Analysis, categories: &[CategorySummary]) -> String {
    let total: u64 = analysis.domains.values().map(|d| d.total_duration).sum();
    let explored = categories.iter().filter(|c| c.visit_count > 0).count();
    [
        "## Summary".to_owned(),
        format!("- **Total browsing time:** {} (estimated)", format_duration(total)),
        format!("- **Pages visited:** {}", analysis.timed.len()),
        format!("- **Unique websites:** {}", analysis.domains.len()),
        format!("- **Categories explored:** {explored}"),
    ]
    .join("\n")
}

fn plural(count: u64) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn category_breakdown(categories: &[CategorySummary]) -> String {
    if categories.is_empty() {
        return "## Time by Category\n\nNo categories found.".to_owned();
    }
    let total: u64 = categories.iter().map(|c| c.total_duration).sum();

    let mut lines = vec!["## Time by Category".to_owned()];
    for cat in categories.iter().filter(|c| c.total_duration > 0) {
        // truncated, not rounded
        let percentage = cat.total_duration * 100 / total.max(1);
        lines.push(format!(
            "\n### {} ({} - {percentage}%)",
            cat.category.label(),
            format_duration(cat.total_duration)
        ));
        for domain in cat.domains.iter().take(DOMAINS_PER_CATEGORY) {
            lines.push(format!(
                "- **{}:** {} ({} visit{})",
                domain.domain,
                format_duration(domain.total_duration),
                domain.visit_count,
                plural(domain.visit_count)
            ));
        }
    }
    lines.join("\n")
}

fn clean_video_title(title: &str) -> String {
    title.replace(" - YouTube", "").replace(" - Vimeo", "").trim().to_owned()
}

fn video_section(analysis: &Analysis) -> Option<String> {
    let video_domains: Vec<&DomainSummary> = analysis
        .categories
        .iter()
        .filter(|(_, c)| **c == Category::Video)
        .filter_map(|(domain, _)| analysis.domains.get(domain))
        .collect();
    if video_domains.is_empty() {
        return None;
    }

    let mut lines = vec!["## Videos Watched".to_owned()];
    for domain in video_domains.into_iter().filter(|d| !d.titles.is_empty()) {
        lines.push(format!("\n### {}", domain.domain));
        lines.push(format!("Time spent: {}", format_duration(domain.total_duration)));
        lines.push("\nVideos/content:".to_owned());
        lines.extend(
            domain
                .titles
                .iter()
                .take(VIDEO_TITLES)
                .map(|t| clean_video_title(t))
                .filter(|t| !t.is_empty())
                .map(|t| format!("- {t}")),
        );
    }
    Some(lines.join("\n"))
}

/// First domain with the strictly greatest `key`.
fn first_max_by<'a>(
    domains: impl Iterator<Item = &'a DomainSummary>,
    key: impl Fn(&DomainSummary) -> u64,
) -> Option<&'a DomainSummary> {
    domains.reduce(|best, d| if key(d) > key(best) { d } else { best })
}

fn insights(analysis: &Analysis, categories: &[CategorySummary]) -> String {
    let domains = &analysis.domains;
    let mut lines = vec!["## Insights".to_owned()];

    if let Some(most) = first_max_by(domains.values(), |d| d.visit_count) {
        lines.push(format!("- **Most visited:** {} ({} visits)", most.domain, most.visit_count));
    }
    if let Some(longest) = first_max_by(domains.values(), |d| d.total_duration)
        && longest.total_duration > 0
    {
        lines.push(format!(
            "- **Most time spent:** {} ({})",
            longest.domain,
            format_duration(longest.total_duration)
        ));
    }
    if let Some(dominant) = categories.first()
        && dominant.total_duration > 0
    {
        lines.push(format!(
            "- **Primary focus:** {} ({})",
            dominant.category.label(),
            format_duration(dominant.total_duration)
        ));
    }
    if !domains.is_empty() {
        let total: u64 = domains.values().map(|d| d.total_duration).sum();
        let visits: u64 = domains.values().map(|d| d.visit_count).sum();
        let average = if visits > 0 { total / visits } else { 0 };
        lines.push(format!("- **Average time per page:** {}", format_duration(average)));
    }

    lines.push(
        "\n*Note: Time estimates are calculated from visit sequences and may not reflect exact browsing time.*"
            .to_owned(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::browsing::RawVisit;
    use crate::browsing::visits::{aggregate_by_domain, estimate_durations};
    use std::collections::BTreeMap;

    fn sample() -> Analysis {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let raw = |url: &str, title: &str, h: u32, m: u32| RawVisit {
            url: url.into(),
            title: title.into(),
            visited_at: day.and_hms_opt(h, m, 0).unwrap(),
        };
        let timed = estimate_durations(vec![
            raw("https://www.youtube.com/watch?v=a", "Rust in 100 Seconds - YouTube", 9, 0),
            raw("https://github.com/tokio-rs/axum", "axum", 9, 20),
            raw("https://github.com/launchbadge/sqlx", "sqlx", 9, 30),
        ]);
        let domains = aggregate_by_domain(&timed);
        let categories: BTreeMap<String, Category> = [
            ("youtube.com".to_owned(), Category::Video),
            ("github.com".to_owned(), Category::Development),
        ]
        .into_iter()
        .collect();
        Analysis { timed, domains, categories }
    }

    #[test]
    fn report_has_chart_and_sections() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let report = render(&sample(), date);

        assert!(report.starts_with("```chart\n"));
        assert!(report.contains("# Daily Browsing Review - October 19, 2026"));
        assert!(report.contains("- **Pages visited:** 3"));
        assert!(report.contains("- **Unique websites:** 2"));
        assert!(report.contains("### Video (20m - 64%)"));
        assert!(report.contains("- **github.com:** 11m (2 visits)"));
        assert!(report.contains("- Rust in 100 Seconds\n"));
        assert!(report.contains("- **Most visited:** github.com (2 visits)"));
        assert!(report.contains("- **Primary focus:** Video (20m)"));
        assert!(report.ends_with("may not reflect exact browsing time.*"));
    }

    #[test]
    fn chart_lists_minutes_per_category() {
        let analysis = sample();
        let cats = category::aggregate_by_category(&analysis.domains, &analysis.categories);
        let chart = chart_data(&cats);
        assert_eq!(chart["type"], "bar");
        assert_eq!(chart["data"][0]["category"], "Video");
        assert_eq!(chart["data"][0]["minutes"], 20.0);
        assert_eq!(chart["data"][0]["hours"], 0.33);
        assert_eq!(chart["data"][1]["visits"], 2);
    }

    #[test]
    fn no_video_domains_means_no_video_section() {
        let mut analysis = sample();
        analysis.categories.insert("youtube.com".into(), Category::Entertainment);
        let report = render(&analysis, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(!report.contains("## Videos Watched"));
    }
}
