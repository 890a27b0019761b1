//! GitLab REST client for org data.
//!
//! [`OrgClient`] is the capability surface the sync pipeline consumes:
//! group listing, group detail, group membership, and user listing. One
//! implementation exists per upstream integration; self-hosted and SaaS
//! instances differ only in base URL and credentials, both carried by the
//! [`IntegrationConfig`](crate::config::IntegrationConfig) the client is
//! built from.

mod error;
pub mod pagination;
mod types;

pub use error::GitLabError;
pub use pagination::{paginated, Paginated, DEFAULT_PAGE_SIZE};
pub use types::{GroupDetail, GroupRecord, Page, PageOptions, SharedWithGroup, UserRecord};

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::IntegrationConfig;
use crate::http::{HttpResponse, Transport};

/// Request capabilities over the GitLab org-data surface.
///
/// Paged operations return one page at a time; use
/// [`paginated`] to stream a full listing. `list_group_members` collects
/// all pages itself since membership lists are consumed whole.
#[async_trait]
pub trait OrgClient: Send + Sync {
    /// List one page of groups visible to this integration.
    async fn list_groups(&self, options: PageOptions) -> Result<Page<GroupRecord>, GitLabError>;

    /// Fetch a single group, including its `shared_with_groups` list.
    async fn get_group_detail(&self, id: u64) -> Result<GroupDetail, GitLabError>;

    /// List all members of a group.
    ///
    /// With `inherited` false only direct members are returned. The
    /// distinction is load-bearing: inherited members are contributed
    /// transitively through the hierarchy and must not be added twice.
    async fn list_group_members(
        &self,
        id: u64,
        inherited: bool,
    ) -> Result<Vec<UserRecord>, GitLabError>;

    /// List one page of users on the instance.
    async fn list_users(&self, options: PageOptions) -> Result<Page<UserRecord>, GitLabError>;
}

/// GitLab REST client over the [`Transport`] boundary.
#[derive(Clone)]
pub struct GitLabClient {
    api_base_url: String,
    token: Option<String>,
    transport: Arc<dyn Transport>,
}

impl GitLabClient {
    /// Build a client for one upstream integration.
    pub fn new(integration: &IntegrationConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_base_url: integration.api_base(),
            token: integration.token.clone(),
            transport,
        }
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<String, GitLabError> {
        let raw = format!("{}{}", self.api_base_url.trim_end_matches('/'), path);
        let mut url =
            url::Url::parse(&raw).map_err(|e| GitLabError::Url(format!("{raw}: {e}")))?;
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url.into())
    }

    /// Issue a GET and fail on any non-2xx status.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(String, HttpResponse), GitLabError> {
        let url = self.endpoint(path, query)?;

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = &self.token {
            headers.push(("PRIVATE-TOKEN".to_string(), token.clone()));
        }

        let response = self.transport.get(&url, &headers).await?;
        if !(200..300).contains(&response.status) {
            return Err(GitLabError::status(response.status, url));
        }
        Ok((url, response))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        options: PageOptions,
    ) -> Result<Page<T>, GitLabError> {
        let (url, response) = self.get(path, &page_query(options)).await?;
        let items = decode_json(&url, &response)?;
        Ok(Page {
            items,
            next_page: next_page_of(&response),
        })
    }
}

fn page_query(options: PageOptions) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(page) = options.page {
        query.push(("page", page.to_string()));
    }
    if let Some(per_page) = options.per_page {
        query.push(("per_page", per_page.to_string()));
    }
    query
}

fn decode_json<T: DeserializeOwned>(url: &str, response: &HttpResponse) -> Result<T, GitLabError> {
    serde_json::from_slice(&response.body).map_err(|source| GitLabError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Read GitLab's pagination cursor from the `x-next-page` header.
///
/// GitLab sends the header with an empty value on the last page.
fn next_page_of(response: &HttpResponse) -> Option<u32> {
    response
        .header("x-next-page")
        .and_then(|value| value.trim().parse().ok())
}

#[async_trait]
impl OrgClient for GitLabClient {
    async fn list_groups(&self, options: PageOptions) -> Result<Page<GroupRecord>, GitLabError> {
        self.get_page("/groups", options).await
    }

    async fn get_group_detail(&self, id: u64) -> Result<GroupDetail, GitLabError> {
        let (url, response) = self.get(&format!("/groups/{id}"), &[]).await?;
        decode_json(&url, &response)
    }

    async fn list_group_members(
        &self,
        id: u64,
        inherited: bool,
    ) -> Result<Vec<UserRecord>, GitLabError> {
        let path = if inherited {
            format!("/groups/{id}/members/all")
        } else {
            format!("/groups/{id}/members")
        };

        paginated(|options| self.get_page(&path, options), DEFAULT_PAGE_SIZE)
            .try_collect()
            .await
    }

    async fn list_users(&self, options: PageOptions) -> Result<Page<UserRecord>, GitLabError> {
        self.get_page("/users", options).await
    }
}
