//! Domain categorisation: a heuristic pattern table, refined by the hosted
//! LLM for domains the table does not know.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};

use crate::assistant::{ChatModel, CompletionRequest, PromptMessage};
use crate::browsing::visits::DomainSummary;
use crate::entities::Role;

/// Unknown domains sent to the model per request.
const AI_BATCH_SIZE: usize = 20;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Category {
    Video,
    Development,
    SocialMedia,
    News,
    Productivity,
    Shopping,
    Entertainment,
    Search,
    Reference,
    Other,
}

impl Category {
    /// Title-cased display name, e.g. `"Social Media"`.
    pub fn label(self) -> &'static str {
        match self {
            Category::Video => "Video",
            Category::Development => "Development",
            Category::SocialMedia => "Social Media",
            Category::News => "News",
            Category::Productivity => "Productivity",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Search => "Search",
            Category::Reference => "Reference",
            Category::Other => "Other",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Category::Video => "Video and streaming content",
            Category::Development => "Programming, coding, technical documentation",
            Category::SocialMedia => "Social networking platforms",
            Category::News => "News websites and publications",
            Category::Productivity => "Email, task management, collaboration tools",
            Category::Shopping => "E-commerce and online shopping",
            Category::Entertainment => "Music, podcasts, gaming, general entertainment",
            Category::Search => "Search engines",
            Category::Reference => "Wikipedia, documentation, educational content",
            Category::Other => "Everything else",
        }
    }

    fn patterns(self) -> &'static [&'static str] {
        match self {
            Category::Video => &[
                "youtube.com", "vimeo.com", "twitch.tv", "netflix.com", "hulu.com",
                "disneyplus.com", "hbomax.com",
            ],
            Category::Development => &[
                "github.com", "stackoverflow.com", "gitlab.com", "dev.to", "npmjs.com",
                "pypi.org", "docs.python.org", "developer.mozilla.org", "crates.io", "docs.rs",
            ],
            Category::SocialMedia => &[
                "twitter.com", "x.com", "facebook.com", "instagram.com", "linkedin.com",
                "reddit.com", "tiktok.com", "snapchat.com",
            ],
            Category::News => &[
                "nytimes.com", "bbc.com", "cnn.com", "techcrunch.com", "theverge.com",
                "wired.com", "arstechnica.com",
            ],
            Category::Productivity => &[
                "gmail.com", "outlook.com", "mail.google.com", "notion.so", "slack.com",
                "asana.com", "trello.com", "monday.com",
            ],
            Category::Shopping => &[
                "amazon.com", "ebay.com", "etsy.com", "walmart.com", "target.com", "alibaba.com",
            ],
            Category::Entertainment => &["spotify.com", "soundcloud.com", "pandora.com"],
            Category::Search => &["google.com", "bing.com", "duckduckgo.com", "yahoo.com"],
            Category::Reference => &["wikipedia.org", "wikihow.com", "britannica.com"],
            Category::Other => &[],
        }
    }
}

const VIDEO_TITLE_KEYWORDS: [&str; 5] = ["video", "watch", "episode", "movie", "film"];

/// Pattern-table categorisation. Categories are tried in declaration order
/// and the first pattern contained in the domain wins.
pub fn heuristic_category(domain: &str, titles: &[String]) -> Category {
    let domain = domain.to_ascii_lowercase();
    for category in Category::iter() {
        if category.patterns().iter().any(|p| domain.contains(p)) {
            return category;
        }
    }

    let titles = titles.join(" ").to_lowercase();
    if VIDEO_TITLE_KEYWORDS.iter().any(|k| titles.contains(k)) {
        return Category::Video;
    }
    Category::Other
}

/// Categorise every domain: heuristics first, then the model (when present)
/// for whatever is still [`Category::Other`].
pub async fn categorize_domains(
    domains: &BTreeMap<String, DomainSummary>,
    model: Option<&dyn ChatModel>,
) -> BTreeMap<String, Category> {
    let mut result = BTreeMap::new();
    let mut unknown: Vec<&DomainSummary> = Vec::new();

    for (domain, summary) in domains {
        match heuristic_category(domain, &summary.titles) {
            Category::Other => unknown.push(summary),
            category => {
                result.insert(domain.clone(), category);
            }
        }
    }

    let Some(model) = model else {
        for summary in unknown {
            result.insert(summary.domain.clone(), Category::Other);
        }
        return result;
    };

    for batch in unknown.chunks(AI_BATCH_SIZE) {
        let answers = categorize_batch(model, batch).await;
        for summary in batch {
            let category = answers
                .get(&summary.domain)
                .copied()
                .unwrap_or_else(|| heuristic_category(&summary.domain, &summary.titles));
            result.insert(summary.domain.clone(), category);
        }
    }
    result
}

async fn categorize_batch(model: &dyn ChatModel, batch: &[&DomainSummary]) -> HashMap<String, Category> {
    let request = CompletionRequest {
        system: None,
        messages: vec![PromptMessage { role: Role::User, content: categorization_prompt(batch) }],
        max_tokens: 1024,
    };
    match model.complete(request).await {
        Ok(text) => parse_categorization(&text),
        Err(e) => {
            warn!(error = ?e, domains = batch.len(), "AI categorisation failed; using heuristics");
            HashMap::new()
        }
    }
}

fn categorization_prompt(batch: &[&DomainSummary]) -> String {
    let categories: BTreeMap<String, &str> =
        Category::iter().map(|c| (c.to_string(), c.description())).collect();
    let categories = serde_json::to_string_pretty(&categories).unwrap_or_default();

    let domain_lines: Vec<String> = batch
        .iter()
        .map(|d| {
            let titles = if d.titles.is_empty() {
                "No titles".to_owned()
            } else {
                d.titles.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
            };
            format!("- {} (pages: {titles})", d.domain)
        })
        .collect();

    format!(
        "Categorize these websites/domains into one of these categories:\n\n{categories}\n\n\
         Domains to categorize (with sample page titles for context):\n{}\n\n\
         Return ONLY a JSON object mapping each domain to its category name.\n\
         Format: {{\"domain.com\": \"category_name\"}}\n\n\
         JSON response:",
        domain_lines.join("\n")
    )
}

/// Pull the JSON object out of a model reply, tolerating code fences and
/// surrounding prose. Unknown category names are dropped.
pub fn parse_categorization(text: &str) -> HashMap<String, Category> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        debug!("model reply contained no JSON object");
        return HashMap::new();
    };
    if end < start {
        return HashMap::new();
    }
    let raw: HashMap<String, String> = match serde_json::from_str(&text[start..=end]) {
        Ok(map) => map,
        Err(e) => {
            debug!(error = %e, "model reply was not a domain→category object");
            return HashMap::new();
        }
    };
    raw.into_iter()
        .filter_map(|(domain, name)| Category::from_str(name.trim()).ok().map(|c| (domain, c)))
        .collect()
}

/// Per-category totals for a set of domains.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: Category,
    pub total_duration: u64,
    pub visit_count: u64,
    /// Member domains, longest time first.
    pub domains: Vec<DomainSummary>,
}

/// Group domain totals by category; categories are returned longest first.
pub fn aggregate_by_category(
    domains: &BTreeMap<String, DomainSummary>,
    categories: &BTreeMap<String, Category>,
) -> Vec<CategorySummary> {
    let mut grouped: BTreeMap<Category, CategorySummary> = BTreeMap::new();
    for (domain, summary) in domains {
        let category = categories.get(domain).copied().unwrap_or(Category::Other);
        let entry = grouped.entry(category).or_insert_with(|| CategorySummary {
            category,
            total_duration: 0,
            visit_count: 0,
            domains: Vec::new(),
        });
        entry.total_duration += summary.total_duration;
        entry.visit_count += summary.visit_count;
        entry.domains.push(summary.clone());
    }

    let mut out: Vec<CategorySummary> = grouped.into_values().collect();
    for cat in &mut out {
        cat.domains.sort_by(|a, b| b.total_duration.cmp(&a.total_duration));
    }
    out.sort_by(|a, b| b.total_duration.cmp(&a.total_duration).then(a.category.cmp(&b.category)));
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assistant::testing::StubModel;

    fn summary(domain: &str, secs: u64, titles: &[&str]) -> DomainSummary {
        DomainSummary {
            domain: domain.into(),
            total_duration: secs,
            visit_count: 1,
            titles: titles.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    fn domains(items: Vec<DomainSummary>) -> BTreeMap<String, DomainSummary> {
        items.into_iter().map(|d| (d.domain.clone(), d)).collect()
    }

    #[test]
    fn labels_and_names() {
        assert_eq!(Category::SocialMedia.to_string(), "social_media");
        assert_eq!(Category::SocialMedia.label(), "Social Media");
        assert_eq!(Category::from_str("Development").unwrap(), Category::Development);
    }

    #[test]
    fn heuristics_cover_known_sites_and_video_titles() {
        assert_eq!(heuristic_category("github.com", &[]), Category::Development);
        assert_eq!(heuristic_category("en.wikipedia.org", &[]), Category::Reference);
        assert_eq!(
            heuristic_category("obscure.tv", &["Watch episode 4".to_owned()]),
            Category::Video
        );
        assert_eq!(heuristic_category("example.org", &[]), Category::Other);
    }

    #[test]
    fn parses_fenced_json_and_skips_unknown_names() {
        let reply = "Sure!\n```json\n{\"a.test\": \"news\", \"b.test\": \"cooking\"}\n```";
        let parsed = parse_categorization(reply);
        assert_eq!(parsed.get("a.test"), Some(&Category::News));
        assert!(!parsed.contains_key("b.test"));
        assert!(parse_categorization("no json here").is_empty());
    }

    #[tokio::test]
    async fn model_refines_unknown_domains_only() {
        let input = domains(vec![summary("github.com", 10, &[]), summary("blog.test", 20, &[])]);
        let model = StubModel::replying("{\"blog.test\": \"news\"}");
        let result = categorize_domains(&input, Some(&model)).await;
        assert_eq!(result["github.com"], Category::Development);
        assert_eq!(result["blog.test"], Category::News);

        let request = model.last_request().unwrap();
        assert!(request.messages[0].content.contains("blog.test"));
        assert!(!request.messages[0].content.contains("- github.com"));
    }

    #[tokio::test]
    async fn failing_model_falls_back_to_heuristics() {
        let input = domains(vec![summary("blog.test", 20, &[])]);
        let model = StubModel::failing();
        let result = categorize_domains(&input, Some(&model)).await;
        assert_eq!(result["blog.test"], Category::Other);
    }

    #[test]
    fn categories_aggregate_and_sort() {
        let input = domains(vec![
            summary("github.com", 100, &[]),
            summary("gitlab.com", 50, &[]),
            summary("youtube.com", 300, &[]),
        ]);
        let cats: BTreeMap<String, Category> = [
            ("github.com".to_owned(), Category::Development),
            ("gitlab.com".to_owned(), Category::Development),
            ("youtube.com".to_owned(), Category::Video),
        ]
        .into_iter()
        .collect();
        let grouped = aggregate_by_category(&input, &cats);
        assert_eq!(grouped[0].category, Category::Video);
        assert_eq!(grouped[1].total_duration, 150);
        assert_eq!(grouped[1].visit_count, 2);
        assert_eq!(grouped[1].domains[0].domain, "github.com");
    }
}
