//! User ingestion and transformation.

use std::sync::Arc;

use crate::client::{paginated, GitLabError, OrgClient, UserRecord, DEFAULT_PAGE_SIZE};
use crate::entity::{EntityRef, UserEntity};

/// Maps an upstream user record to an entity, or `None` to omit it.
///
/// `None` is a skip signal, not an error; the default transformer uses it
/// to filter bot accounts.
pub type UserTransformer = Arc<dyn Fn(&UserRecord) -> Option<UserEntity> + Send + Sync>;

/// The default user mapping: entity name is the username, profile fields
/// carried over when present. Bot accounts are skipped.
pub fn default_user_transformer(user: &UserRecord) -> Option<UserEntity> {
    if user.bot.unwrap_or(false) {
        return None;
    }

    Some(UserEntity {
        name: user.username.clone(),
        display_name: user.name.clone(),
        email: user.public_email.clone().or_else(|| user.email.clone()),
        picture: user.avatar_url.clone(),
    })
}

/// Stream every user on the instance through the transformer.
///
/// Ordering follows upstream page order; no other guarantee is made.
pub async fn ingest_users<C: OrgClient + ?Sized>(
    client: &C,
    transformer: Option<&UserTransformer>,
) -> Result<Vec<UserEntity>, GitLabError> {
    let mut records = paginated(|options| client.list_users(options), DEFAULT_PAGE_SIZE);

    let mut entities = Vec::new();
    let mut skipped = 0usize;
    while let Some(record) = records.try_next().await? {
        let entity = match transformer {
            Some(transform) => transform(&record),
            None => default_user_transformer(&record),
        };
        match entity {
            Some(entity) => entities.push(entity),
            None => skipped += 1,
        }
    }

    tracing::debug!(ingested = entities.len(), skipped, "user ingestion complete");
    Ok(entities)
}

/// Entity references for a group's member list.
///
/// Members run through the default user transformer so the reference names
/// line up with ingested user entities, and bots drop out the same way.
pub fn member_refs(members: &[UserRecord]) -> Vec<EntityRef> {
    members
        .iter()
        .filter_map(default_user_transformer)
        .map(|user| EntityRef::user(user.name))
        .collect()
}
