//! API groups: named route bundles that can be disabled from configuration.

use axum::Router;
use serde::Serialize;
use subserver_config::ApiConfig;

use crate::state::SharedState;
use crate::{langchain, vector};

/// A bundle of routes mounted together.
pub struct ApiGroup {
    pub name: &'static str,
    pub description: &'static str,
    /// Higher priorities are listed first.
    pub priority: i32,
    /// `(method, path)` pairs, for listing.
    pub routes: &'static [(&'static str, &'static str)],
    pub router: fn() -> Router<SharedState>,
}

/// What `GET /api/list` reports for each group.
#[derive(Debug, Clone, Serialize)]
pub struct ApiGroupInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub priority: i32,
    pub enabled: bool,
    pub routes_count: usize,
    pub routes: Vec<String>,
}

impl ApiGroup {
    pub fn info(&self, enabled: bool) -> ApiGroupInfo {
        ApiGroupInfo {
            name: self.name,
            description: self.description,
            priority: self.priority,
            enabled,
            routes_count: self.routes.len(),
            routes: self
                .routes
                .iter()
                .map(|(method, path)| format!("{method} {path}"))
                .collect(),
        }
    }
}

/// Every known group, highest priority first.
pub fn all() -> Vec<ApiGroup> {
    let mut groups = vec![langchain::group(), vector::group()];
    groups.sort_by(|a, b| b.priority.cmp(&a.priority));
    groups
}

/// Groups not disabled in `api.disabled`.
pub fn enabled(config: &ApiConfig) -> Vec<ApiGroup> {
    all().into_iter().filter(|g| config.is_enabled(g.name)).collect()
}

/// Listing for the enabled groups.
pub fn registered(config: &ApiConfig) -> Vec<ApiGroupInfo> {
    enabled(config).iter().map(|g| g.info(true)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_by_priority() {
        let names: Vec<_> = all().iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["vector-service", "langchain-service"]);
    }

    #[test]
    fn disabled_groups_are_skipped() {
        let config = ApiConfig {
            disabled: vec!["vector-service".into()],
        };
        let listed = registered(&config);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "langchain-service");
        assert_eq!(listed[0].routes_count, 4);
        assert!(listed[0].routes.contains(&"POST /api/langchain/chat".to_string()));
    }
}
