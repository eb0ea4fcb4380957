use utoipa::OpenApi;

use crate::routes::{browsing, conversations, data_sources, health, tasks};

#[derive(OpenApi)]
#[openapi(info(
    title = "aide-server",
    description = "Task manager and AI assistant API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(tasks::TasksApi::openapi());
    root.merge(conversations::ConversationsApi::openapi());
    root.merge(data_sources::DataSourcesApi::openapi());
    root.merge(browsing::BrowsingApi::openapi());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = get_docs();
        for path in [
            "/api/health",
            "/api/tasks/{id}",
            "/api/conversations/{id}/messages",
            "/api/data-sources/{id}/contexts",
            "/api/browsing-history/weekly",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
