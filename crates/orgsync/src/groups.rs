//! Group hierarchy reconstruction and membership aggregation.
//!
//! The upstream API hands back groups as a flat paginated list; each record
//! carries a parent reference and a shared-with list. This module rebuilds
//! the hierarchy as an adjacency map keyed by group id, resolves each
//! group's direct and shared members, and projects the result into group
//! entities whose cross-references are entity refs rather than raw ids.
//!
//! The adjacency map is transient: built fresh on every sync pass and
//! dropped once entities are emitted.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::client::{paginated, GitLabError, GroupRecord, OrgClient, DEFAULT_PAGE_SIZE};
use crate::entity::{EntityRef, GroupEntity};
use crate::users::member_refs;

/// One group in the transient hierarchy, mutable only during graph build.
#[derive(Debug, Clone)]
pub struct GroupNode {
    pub entity: GroupEntity,
    /// Upstream parent id. May point at a group that was never listed; such
    /// nodes simply receive no reverse linkage.
    pub parent: Option<u64>,
    /// Ids of listed groups whose `parent` points back here, in listing
    /// order.
    pub children: Vec<u64>,
}

/// Group id to node mapping, in listing order. Keys are unique: the first
/// record seen for an id wins and later duplicates are ignored.
pub type GroupAdjacency = IndexMap<u64, GroupNode>;

/// Options for the group-to-entity mapping.
#[derive(Debug, Clone)]
pub struct GroupTransformOptions {
    /// Substituted for `/` when flattening the group path into a name.
    pub path_delimiter: String,
    /// Kind label stamped on each group entity.
    pub group_type: String,
}

/// Maps an upstream group record to an entity, or `None` to omit it.
pub type GroupTransformer =
    Arc<dyn Fn(&GroupRecord, &GroupTransformOptions) -> Option<GroupEntity> + Send + Sync>;

/// The default group mapping: entity name is the full path with the
/// delimiter substituted; display name and description carried when present.
pub fn default_group_transformer(
    group: &GroupRecord,
    options: &GroupTransformOptions,
) -> Option<GroupEntity> {
    let mut entity = GroupEntity {
        name: group.full_path.replace('/', &options.path_delimiter),
        display_name: None,
        description: None,
        group_type: options.group_type.clone(),
        members: Default::default(),
        children: Vec::new(),
    };

    if !group.name.is_empty() {
        entity.display_name = Some(group.name.clone());
    }
    if let Some(description) = &group.description {
        if !description.is_empty() {
            entity.description = Some(description.clone());
        }
    }

    Some(entity)
}

/// Build the full group graph for one target.
///
/// Streams every group, reconstructs parent/child adjacency, resolves
/// direct and shared members, and finally projects children into entity
/// references.
pub async fn build_group_graph<C: OrgClient + ?Sized>(
    client: &C,
    transformer: Option<&GroupTransformer>,
    options: &GroupTransformOptions,
) -> Result<GroupAdjacency, GitLabError> {
    let mut adjacency = GroupAdjacency::new();

    let mut records = paginated(|page| client.list_groups(page), DEFAULT_PAGE_SIZE);
    while let Some(record) = records.try_next().await? {
        let entity = match transformer {
            Some(transform) => transform(&record, options),
            None => default_group_transformer(&record, options),
        };
        let Some(entity) = entity else {
            continue;
        };

        // First occurrence wins; later duplicates are ignored, not merged.
        if !adjacency.contains_key(&record.id) {
            adjacency.insert(
                record.id,
                GroupNode {
                    entity,
                    parent: record.parent_id,
                    children: Vec::new(),
                },
            );
        }
    }

    tracing::debug!(groups = adjacency.len(), "group listing complete");

    populate_children_and_members(client, &mut adjacency).await?;
    link_children_refs(&mut adjacency);
    Ok(adjacency)
}

/// Second pass: link each node into its parent's `children` and resolve
/// membership.
///
/// Members come from the direct (non-inherited) member listing, plus the
/// direct members of every group shared with this one. Sharing grants
/// visible membership overlap in one direction only; the shared group's own
/// record is untouched.
pub async fn populate_children_and_members<C: OrgClient + ?Sized>(
    client: &C,
    adjacency: &mut GroupAdjacency,
) -> Result<(), GitLabError> {
    let ids: Vec<u64> = adjacency.keys().copied().collect();

    for id in ids {
        // Append as child of the parent, if the parent was listed. Only one
        // hop is ever taken, so parent-chain cycles cannot loop the build.
        let parent = adjacency.get(&id).and_then(|node| node.parent);
        if let Some(parent_id) = parent {
            if let Some(parent_node) = adjacency.get_mut(&parent_id) {
                parent_node.children.push(id);
            }
        }

        let direct = client.list_group_members(id, false).await?;
        if let Some(node) = adjacency.get_mut(&id) {
            node.entity.members.extend(member_refs(&direct));
        }

        for shared_id in shared_with_group_ids(client, id).await? {
            let shared_members = client.list_group_members(shared_id, false).await?;
            if let Some(node) = adjacency.get_mut(&id) {
                node.entity.members.extend(member_refs(&shared_members));
            }
        }
    }

    Ok(())
}

/// Ids of groups shared with `id`, from the group detail endpoint.
///
/// A 404 means the detail is not visible to this credential; that is "no
/// shared groups", not a failure.
async fn shared_with_group_ids<C: OrgClient + ?Sized>(
    client: &C,
    id: u64,
) -> Result<Vec<u64>, GitLabError> {
    match client.get_group_detail(id).await {
        Ok(detail) => Ok(detail
            .shared_with_groups
            .into_iter()
            .map(|shared| shared.group_id)
            .collect()),
        Err(err) if err.is_not_found() => {
            tracing::debug!(group = id, "group detail not found, assuming no shared groups");
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

/// Third pass: project child ids into entity references on each parent.
///
/// Children are referenced by the target entity's name, so this can only
/// run once the full adjacency is known.
pub fn link_children_refs(adjacency: &mut GroupAdjacency) {
    for index in 0..adjacency.len() {
        let child_ids = match adjacency.get_index(index) {
            Some((_, node)) => node.children.clone(),
            None => continue,
        };

        let mut refs = Vec::with_capacity(child_ids.len());
        for child_id in child_ids {
            if let Some(child) = adjacency.get(&child_id) {
                refs.push(EntityRef::group(child.entity.name.clone()));
            }
        }

        if let Some((_, node)) = adjacency.get_index_mut(index) {
            node.entity.children.extend(refs);
        }
    }
}
