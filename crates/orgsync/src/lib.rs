//! Periodic synchronization of a GitLab group hierarchy and its users into
//! normalized catalog entities.
//!
//! A [`provider::GitLabOrgProvider`] is configured with one or more target
//! URLs, resolved against an [`config::IntegrationRegistry`]. Each sync
//! pass streams the instance's users and groups over a pluggable
//! [`http::Transport`], rebuilds the group hierarchy with memberships, and
//! hands the complete entity set to an [`sink::EntitySink`] as a single
//! full-replacement mutation. Passes run manually or on a
//! [`schedule::TaskRunner`].

pub mod client;
pub mod config;
pub mod entity;
pub mod groups;
pub mod http;
pub mod provider;
pub mod schedule;
pub mod sink;
pub mod target;
pub mod users;

pub use client::{GitLabClient, GitLabError, OrgClient};
pub use config::{ConfigError, IntegrationConfig, IntegrationRegistry, ProviderConfig};
pub use entity::{DeferredEntity, Entity, EntityKind, EntityRef, GroupEntity, UserEntity};
pub use groups::{build_group_graph, GroupAdjacency, GroupTransformOptions, GroupTransformer};
pub use http::{HttpResponse, Transport, TransportError};
pub use provider::{GitLabOrgProvider, GitLabOrgProviderOptions, ProviderError};
pub use schedule::{IntervalTaskRunner, Schedule, ScheduledTask, TaskRunner};
pub use sink::{EntitySink, SinkError};
pub use target::parse_group_path;
pub use users::{ingest_users, UserTransformer};
