//! The org-data entity provider.
//!
//! [`GitLabOrgProvider`] ties the pipeline together: it resolves each
//! configured target against the integration registry, ingests users and
//! the group hierarchy per target, and publishes everything to the
//! connected [`EntitySink`] as one full-replacement batch. A pass is
//! all-or-nothing: any configuration or fetch error aborts it before
//! anything is published.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::client::{GitLabClient, GitLabError};
use crate::config::{
    group_by_integration, ConfigError, IntegrationRegistry, ProviderConfig,
};
use crate::entity::{DeferredEntity, Entity};
use crate::groups::{build_group_graph, GroupTransformOptions, GroupTransformer};
use crate::http::Transport;
use crate::schedule::{Schedule, ScheduledTask};
use crate::sink::{EntitySink, SinkError};
use crate::target::parse_group_path;
use crate::users::{ingest_users, UserTransformer};

/// Errors surfaced by a manually driven sync pass.
///
/// Scheduled passes never surface these; the refresh task absorbs and logs
/// them so one bad pass cannot kill the schedule.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider {0} is not connected; call connect() first")]
    NotConnected(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("upstream fetch failed: {0}")]
    Fetch(#[from] GitLabError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Everything needed to build a provider.
#[derive(Clone)]
pub struct GitLabOrgProviderOptions {
    /// Distinguishes this provider instance in names and logs.
    pub id: String,
    /// Known upstream instances.
    pub registry: IntegrationRegistry,
    /// Sync targets. Each must resolve to an integration in the registry.
    pub configs: Vec<ProviderConfig>,
    pub schedule: Schedule,
    pub transport: Arc<dyn Transport>,
    /// Overrides the default user mapping when set.
    pub user_transformer: Option<UserTransformer>,
    /// Overrides the default group mapping when set.
    pub group_transformer: Option<GroupTransformer>,
}

struct Inner {
    id: String,
    registry: IntegrationRegistry,
    configs: Vec<ProviderConfig>,
    schedule: Schedule,
    transport: Arc<dyn Transport>,
    user_transformer: Option<UserTransformer>,
    group_transformer: Option<GroupTransformer>,
    connection: RwLock<Option<Arc<dyn EntitySink>>>,
}

/// Periodic GitLab org-data synchronizer.
#[derive(Clone)]
pub struct GitLabOrgProvider {
    inner: Arc<Inner>,
}

impl GitLabOrgProvider {
    pub fn new(options: GitLabOrgProviderOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: options.id,
                registry: options.registry,
                configs: options.configs,
                schedule: options.schedule,
                transport: options.transport,
                user_transformer: options.user_transformer,
                group_transformer: options.group_transformer,
                connection: RwLock::new(None),
            }),
        }
    }

    /// Stable name, used as the scheduled-task id prefix and in logs.
    #[must_use]
    pub fn provider_name(&self) -> String {
        format!("GitLabOrgProvider:{}", self.inner.id)
    }

    /// Attach the downstream sink and arm the schedule.
    ///
    /// With [`Schedule::Task`] the refresh task registers immediately; each
    /// scheduled run gets a fresh instance id and absorbs its own errors.
    pub async fn connect(&self, sink: Arc<dyn EntitySink>) -> Result<(), ProviderError> {
        *self.inner.connection.write().await = Some(sink);

        if let Schedule::Task(runner) = &self.inner.schedule {
            let provider = self.clone();
            let task = ScheduledTask {
                id: format!("{}:refresh", self.provider_name()),
                task: Arc::new(move || {
                    let provider = provider.clone();
                    Box::pin(async move {
                        let run_id = Uuid::new_v4();
                        match provider.read().await {
                            Ok(published) => {
                                tracing::info!(
                                    provider = %provider.provider_name(),
                                    %run_id,
                                    published,
                                    "scheduled sync pass complete"
                                );
                            }
                            Err(err) => {
                                tracing::error!(
                                    provider = %provider.provider_name(),
                                    %run_id,
                                    error = %err,
                                    "scheduled sync pass failed"
                                );
                            }
                        }
                    })
                }),
            };
            runner.run(task).await;
        }

        Ok(())
    }

    /// Run one full sync pass and publish the result.
    ///
    /// Returns the number of entities published. Nothing reaches the sink
    /// unless every target resolves and every fetch succeeds.
    pub async fn read(&self) -> Result<usize, ProviderError> {
        let sink = self
            .inner
            .connection
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::NotConnected(self.provider_name()))?;

        let mut batch: Vec<DeferredEntity> = Vec::new();

        let grouped = group_by_integration(&self.inner.registry, &self.inner.configs)?;
        for (integration, configs) in grouped {
            let client = GitLabClient::new(integration, self.inner.transport.clone());

            for config in configs {
                let group_path =
                    parse_group_path(&config.target, Some(&integration.base_url))?;
                tracing::info!(
                    provider = %self.provider_name(),
                    target = %config.target,
                    group_path = group_path.as_deref().unwrap_or("<instance root>"),
                    "syncing target"
                );

                let location_key = format!("url:{}", config.target);

                if config.ingest_users {
                    let users =
                        ingest_users(&client, self.inner.user_transformer.as_ref()).await?;
                    batch.extend(users.into_iter().map(|user| DeferredEntity {
                        entity: Entity::User(user),
                        location_key: location_key.clone(),
                    }));
                }

                if config.ingest_groups {
                    let options = GroupTransformOptions {
                        path_delimiter: config.path_delimiter.clone(),
                        group_type: config.group_type.clone(),
                    };
                    let adjacency = build_group_graph(
                        &client,
                        self.inner.group_transformer.as_ref(),
                        &options,
                    )
                    .await?;
                    batch.extend(adjacency.into_values().map(|node| DeferredEntity {
                        entity: Entity::Group(node.entity),
                        location_key: location_key.clone(),
                    }));
                }
            }
        }

        let published = batch.len();
        sink.apply_full_mutation(batch).await?;
        tracing::debug!(provider = %self.provider_name(), published, "mutation applied");
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::IntegrationConfig;
    use crate::entity::EntityRef;
    use crate::http::{HttpResponse, MockTransport};
    use crate::schedule::TaskRunner;
    use crate::sink::memory::MemorySink;

    const API: &str = "https://gitlab.example.com/api/v4";

    fn registry() -> IntegrationRegistry {
        IntegrationRegistry::new(vec![IntegrationConfig {
            base_url: "https://gitlab.example.com".to_string(),
            api_base_url: None,
            token: None,
        }])
    }

    fn config(target: &str) -> ProviderConfig {
        ProviderConfig {
            target: target.to_string(),
            ingest_users: true,
            ingest_groups: true,
            path_delimiter: ".".to_string(),
            group_type: "team".to_string(),
        }
    }

    fn not_found() -> HttpResponse {
        HttpResponse {
            status: 404,
            headers: Vec::new(),
            body: b"{\"message\":\"404 Group Not Found\"}".to_vec(),
        }
    }

    /// Registers a consistent single-page instance: two groups (parent and
    /// child), one member each, two users.
    fn mock_instance() -> MockTransport {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/users?page=1&per_page=100"),
            r#"[
                {"id": 10, "username": "amy", "name": "Amy A"},
                {"id": 11, "username": "zed", "name": "Zed Z"}
            ]"#,
        );
        transport.push_json(
            format!("{API}/groups?page=1&per_page=100"),
            r#"[
                {"id": 1, "name": "Org", "path": "org", "full_path": "org"},
                {"id": 2, "name": "A", "path": "a", "full_path": "org/a", "parent_id": 1}
            ]"#,
        );
        transport.push_json(
            format!("{API}/groups/1/members?page=1&per_page=100"),
            r#"[{"id": 10, "username": "amy"}]"#,
        );
        transport.push_json(
            format!("{API}/groups/2/members?page=1&per_page=100"),
            r#"[{"id": 11, "username": "zed"}]"#,
        );
        transport.push_response(format!("{API}/groups/1"), not_found());
        transport.push_response(format!("{API}/groups/2"), not_found());
        transport
    }

    fn provider_with(
        transport: MockTransport,
        configs: Vec<ProviderConfig>,
        schedule: Schedule,
    ) -> GitLabOrgProvider {
        GitLabOrgProvider::new(GitLabOrgProviderOptions {
            id: "test".to_string(),
            registry: registry(),
            configs,
            schedule,
            transport: Arc::new(transport),
            user_transformer: None,
            group_transformer: None,
        })
    }

    #[tokio::test]
    async fn read_before_connect_is_an_error() {
        let provider = provider_with(
            MockTransport::new(),
            vec![config("https://gitlab.example.com/org")],
            Schedule::Manual,
        );

        let err = provider.read().await.expect_err("not connected");
        assert!(matches!(err, ProviderError::NotConnected(name)
            if name == "GitLabOrgProvider:test"));
    }

    #[tokio::test]
    async fn full_pass_publishes_users_and_groups_in_one_batch() {
        let provider = provider_with(
            mock_instance(),
            vec![config("https://gitlab.example.com/org")],
            Schedule::Manual,
        );
        let sink = Arc::new(MemorySink::new());
        provider.connect(sink.clone()).await.unwrap();

        let published = provider.read().await.unwrap();
        assert_eq!(published, 4);

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);

        let refs: Vec<String> = batches[0]
            .iter()
            .map(|d| d.entity.entity_ref().to_string())
            .collect();
        assert_eq!(refs, vec!["user:amy", "user:zed", "group:org", "group:org.a"]);
        assert!(batches[0]
            .iter()
            .all(|d| d.location_key == "url:https://gitlab.example.com/org"));

        let group = batches[0]
            .iter()
            .find_map(|d| match &d.entity {
                Entity::Group(g) if g.name == "org" => Some(g),
                _ => None,
            })
            .expect("parent group");
        assert_eq!(group.children, vec![EntityRef::group("org.a")]);
        assert!(group.members.contains(&EntityRef::user("amy")));
    }

    #[tokio::test]
    async fn unmatched_target_aborts_without_publishing() {
        let provider = provider_with(
            mock_instance(),
            vec![
                config("https://gitlab.example.com/org"),
                config("https://elsewhere.example.com/other"),
            ],
            Schedule::Manual,
        );
        let sink = Arc::new(MemorySink::new());
        provider.connect(sink.clone()).await.unwrap();

        let err = provider.read().await.expect_err("no integration");
        assert!(matches!(
            err,
            ProviderError::Config(ConfigError::NoIntegration { .. })
        ));
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_aborts_without_publishing() {
        // No mock routes: target resolution succeeds, the first fetch
        // fails, and the sink sees nothing.
        let provider = provider_with(
            MockTransport::new(),
            vec![config("https://gitlab.example.com/org")],
            Schedule::Manual,
        );
        let sink = Arc::new(MemorySink::new());
        provider.connect(sink.clone()).await.unwrap();

        let err = provider.read().await.expect_err("fetch failure");
        assert!(matches!(err, ProviderError::Fetch(_)));
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn ingest_flags_disable_each_half_of_the_pass() {
        let transport = mock_instance();
        let mut cfg = config("https://gitlab.example.com/org");
        cfg.ingest_users = false;

        let provider = provider_with(transport, vec![cfg], Schedule::Manual);
        let sink = Arc::new(MemorySink::new());
        provider.connect(sink.clone()).await.unwrap();

        let published = provider.read().await.unwrap();
        assert_eq!(published, 2);
        assert!(sink.batches()[0]
            .iter()
            .all(|d| matches!(d.entity, Entity::Group(_))));
    }

    #[tokio::test]
    async fn sink_failure_surfaces_from_a_manual_read() {
        let provider = provider_with(
            mock_instance(),
            vec![config("https://gitlab.example.com/org")],
            Schedule::Manual,
        );
        let sink = Arc::new(MemorySink::new());
        sink.fail_next("downstream unavailable");
        provider.connect(sink.clone()).await.unwrap();

        let err = provider.read().await.expect_err("sink failure");
        assert!(matches!(err, ProviderError::Sink(_)));
    }

    /// Runner that executes the task inline exactly once.
    struct OneShotRunner;

    #[async_trait]
    impl TaskRunner for OneShotRunner {
        async fn run(&self, task: ScheduledTask) {
            assert_eq!(task.id, "GitLabOrgProvider:test:refresh");
            (task.task)().await;
        }
    }

    #[tokio::test]
    async fn connect_arms_the_scheduled_refresh_task() {
        let provider = provider_with(
            mock_instance(),
            vec![config("https://gitlab.example.com/org")],
            Schedule::Task(Arc::new(OneShotRunner)),
        );
        let sink = Arc::new(MemorySink::new());
        provider.connect(sink.clone()).await.unwrap();

        assert_eq!(sink.batches().len(), 1);
        assert_eq!(sink.batches()[0].len(), 4);
    }

    #[tokio::test]
    async fn scheduled_run_absorbs_errors_instead_of_panicking() {
        // Empty transport: the scheduled pass fails on its first fetch, and
        // connect still returns cleanly.
        let provider = provider_with(
            MockTransport::new(),
            vec![config("https://gitlab.example.com/org")],
            Schedule::Task(Arc::new(OneShotRunner)),
        );
        let sink = Arc::new(MemorySink::new());
        provider.connect(sink.clone()).await.unwrap();

        assert!(sink.batches().is_empty());
    }
}
