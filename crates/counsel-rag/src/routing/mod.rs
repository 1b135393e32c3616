//! LLM-driven query routing across knowledge partitions

use std::sync::Arc;

use crate::providers::LlmProvider;
use crate::registry::PartitionRegistry;
use crate::retry::{with_retry, RetryPolicy};

/// Outcome of parsing the routing model's raw output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A registered partition id
    Partition(String),
    /// The raw response, which matched nothing in the registry
    Invalid(String),
}

/// Parse and validate a routing response against the registry.
///
/// Whitespace and quote characters are stripped before matching. When the
/// cleaned output is not a registered id, it is checked against each
/// partition's storage prefix and mapped back to the id; models occasionally
/// echo the wrong field.
pub fn parse_route_response(raw: &str, registry: &PartitionRegistry) -> RouteOutcome {
    let cleaned = raw
        .trim()
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .trim();

    if registry.contains(cleaned) {
        return RouteOutcome::Partition(cleaned.to_string());
    }

    if let Some(partition) = registry.find_by_storage_prefix(cleaned) {
        tracing::warn!(
            "Router returned storage prefix '{}'; mapping to partition id '{}'",
            cleaned,
            partition.id
        );
        return RouteOutcome::Partition(partition.id.clone());
    }

    RouteOutcome::Invalid(raw.to_string())
}

/// Single-label classifier mapping a free-text query to exactly one
/// partition id.
///
/// The label set is closed: there is no confidence score and no
/// none-of-the-above label. The only failure mode is an unparseable or
/// invalid response, surfaced as `None`.
pub struct QueryRouter {
    llm: Arc<dyn LlmProvider>,
    registry: Arc<PartitionRegistry>,
    retry: RetryPolicy,
}

impl QueryRouter {
    /// Create a router over the classification model
    pub fn new(llm: Arc<dyn LlmProvider>, registry: Arc<PartitionRegistry>, retry: RetryPolicy) -> Self {
        Self {
            llm,
            registry,
            retry,
        }
    }

    /// Route a query to a partition id, or `None` when no partition can be
    /// determined. Transport failures retry within the policy budget and
    /// then degrade to `None` rather than propagating.
    pub async fn route(&self, query_text: &str) -> Option<String> {
        let system = self.build_prompt();

        let raw = match with_retry(&self.retry, || self.llm.complete(&system, query_text)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Query routing failed after retries: {}", e);
                return None;
            }
        };

        match parse_route_response(&raw, &self.registry) {
            RouteOutcome::Partition(id) => {
                tracing::info!("Routing decision: '{}' for query \"{}\"", id, query_text);
                Some(id)
            }
            RouteOutcome::Invalid(raw) => {
                tracing::warn!("Router returned invalid response: \"{}\"", raw.trim());
                None
            }
        }
    }

    /// Build the classification prompt from the registry's descriptions
    fn build_prompt(&self) -> String {
        let mut descriptions = String::new();
        for (id, description) in self.registry.describe_all() {
            descriptions.push_str(&format!("- {}: {}\n", id, description));
        }

        let mut ids = self.registry.ids();
        let example_a = ids.next().unwrap_or("partition_a");
        let example_b = ids.next().unwrap_or(example_a);

        format!(
            "You are an expert query router for a study abroad knowledge base. \
             Your task is to determine the single most relevant knowledge base for a given user query. \
             Choose from the following available knowledge base IDs:\n\n\
             {descriptions}\n\
             Based on the user's query, identify the knowledge base ID from the list above that is \
             most likely to contain the answer. \
             Respond ONLY with the chosen knowledge base ID (e.g., '{example_a}', '{example_b}') and nothing else."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_partitions;
    use crate::error::Error;
    use crate::testing::ScriptedLlm;
    use std::time::Duration;

    fn registry() -> Arc<PartitionRegistry> {
        Arc::new(PartitionRegistry::new(default_partitions()).unwrap())
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn parse_accepts_exact_id() {
        let registry = registry();
        assert_eq!(
            parse_route_response("university_details", &registry),
            RouteOutcome::Partition("university_details".to_string())
        );
    }

    #[test]
    fn parse_strips_whitespace_and_quotes() {
        let registry = registry();
        assert_eq!(
            parse_route_response("  'professions_jobs' \n", &registry),
            RouteOutcome::Partition("professions_jobs".to_string())
        );
        assert_eq!(
            parse_route_response("\"course_details_source2\"", &registry),
            RouteOutcome::Partition("course_details_source2".to_string())
        );
    }

    #[test]
    fn parse_maps_storage_prefix_back_to_id() {
        let registry = registry();
        assert_eq!(
            parse_route_response("vs_professions_data_immigration", &registry),
            RouteOutcome::Partition("professions_immigration".to_string())
        );
    }

    #[test]
    fn parse_rejects_unknown_output() {
        let registry = registry();
        let outcome = parse_route_response("I think the answer is courses!", &registry);
        assert!(matches!(outcome, RouteOutcome::Invalid(_)));
    }

    #[tokio::test]
    async fn routes_visa_query_to_immigration_partition() {
        let llm = Arc::new(ScriptedLlm::always("professions_immigration"));
        let router = QueryRouter::new(llm, registry(), fast_retry());

        let chosen = router
            .route("What is the visa process after graduating in Canada?")
            .await;
        assert_eq!(chosen.as_deref(), Some("professions_immigration"));
    }

    #[tokio::test]
    async fn invalid_response_routes_to_none() {
        let llm = Arc::new(ScriptedLlm::always("no idea, sorry"));
        let router = QueryRouter::new(llm, registry(), fast_retry());
        assert_eq!(router.route("anything").await, None);
    }

    #[tokio::test]
    async fn transport_error_retries_once_then_none() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Err(Error::llm("HTTP 503")),
            Err(Error::llm("HTTP 503")),
        ]));
        let router = QueryRouter::new(Arc::clone(&llm) as Arc<dyn LlmProvider>, registry(), fast_retry());

        assert_eq!(router.route("anything").await, None);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn transient_error_then_success_recovers() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Err(Error::llm("HTTP 503")),
            Ok("university_details".to_string()),
        ]));
        let router = QueryRouter::new(Arc::clone(&llm) as Arc<dyn LlmProvider>, registry(), fast_retry());

        assert_eq!(router.route("anything").await.as_deref(), Some("university_details"));
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn repeated_queries_route_identically() {
        let llm = Arc::new(ScriptedLlm::always("course_details_source1"));
        let router = QueryRouter::new(llm, registry(), fast_retry());

        let first = router.route("What are the entry requirements?").await;
        let second = router.route("What are the entry requirements?").await;
        assert_eq!(first, second);
    }
}
