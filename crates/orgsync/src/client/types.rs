//! GitLab API data types.
//!
//! These mirror the REST responses we consume. Fields GitLab may omit are
//! `Option` or carry `#[serde(default)]`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Options for one page request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// 1-based page number. `None` requests the first page.
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// One page of a listing endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Next page number, taken from GitLab's `x-next-page` header.
    /// `None` means this was the last page.
    pub next_page: Option<u32>,
}

/// A GitLab group from the paged `/groups` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    /// Group ID.
    pub id: u64,
    /// Human-readable group name.
    pub name: String,
    /// Group path (slug).
    pub path: String,
    /// Full hierarchical path (e.g., "parent/child").
    pub full_path: String,
    /// Group description.
    #[serde(default)]
    pub description: Option<String>,
    /// Parent group ID, absent for top-level groups.
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// Web URL of the group.
    #[serde(default)]
    pub web_url: Option<String>,
    /// When the group was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Groups this group's resources are shared with.
    #[serde(default)]
    pub shared_with_groups: Vec<SharedWithGroup>,
}

/// A reference to a group that another group is shared with.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedWithGroup {
    pub group_id: u64,
    pub group_name: String,
    pub group_full_path: String,
    pub group_access_level: u32,
    /// When the share expires, if it does.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// The single-group detail response from `/groups/{id}`.
///
/// Only the sharing information matters here; everything else comes from
/// the listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDetail {
    pub id: u64,
    pub full_path: String,
    #[serde(default)]
    pub shared_with_groups: Vec<SharedWithGroup>,
}

/// A GitLab user, as returned by `/users` and the group member endpoints.
///
/// Member responses are user-shaped with an extra `access_level`, so one
/// type covers both listings.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    /// User ID.
    pub id: u64,
    /// Username (login).
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Account state (e.g., "active", "blocked").
    #[serde(default)]
    pub state: Option<String>,
    /// Primary email, visible depending on privacy settings.
    #[serde(default)]
    pub email: Option<String>,
    /// Publicly listed email address.
    #[serde(default)]
    pub public_email: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Web URL of the user profile.
    #[serde(default)]
    pub web_url: Option<String>,
    /// Whether this is a bot account.
    #[serde(default)]
    pub bot: Option<bool>,
    /// Membership access level, present on member endpoints only.
    #[serde(default)]
    pub access_level: Option<u32>,
}
