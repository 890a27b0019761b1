//! Normalized catalog entities emitted by a sync pass.
//!
//! Raw GitLab ids never leave this crate; published records cross-reference
//! each other through [`EntityRef`]s derived from entity names.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Group,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
        }
    }
}

/// A stable, kind-qualified pointer to another entity, rendered `kind:name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::User,
            name: name.into(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Group,
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}

impl From<EntityRef> for String {
    fn from(entity_ref: EntityRef) -> Self {
        entity_ref.to_string()
    }
}

#[derive(Debug, Error)]
#[error("invalid entity reference {0:?}, expected kind:name")]
pub struct ParseEntityRefError(String);

impl FromStr for EntityRef {
    type Err = ParseEntityRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| ParseEntityRefError(s.to_string()))?;
        let kind = match kind {
            "user" => EntityKind::User,
            "group" => EntityKind::Group,
            _ => return Err(ParseEntityRefError(s.to_string())),
        };
        if name.is_empty() {
            return Err(ParseEntityRefError(s.to_string()));
        }
        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for EntityRef {
    type Error = ParseEntityRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A user of the upstream instance, normalized for the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntity {
    /// Stable entity name, the upstream username.
    pub name: String,
    /// Display name, when the upstream profile has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// A group of the upstream hierarchy, normalized for the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntity {
    /// Stable entity name, derived from the full group path with the
    /// configured delimiter substituted for `/`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Group kind label (e.g., "team").
    pub group_type: String,
    /// Direct members plus direct members of every group shared with this
    /// one. A set: duplicate contributions collapse.
    #[serde(default)]
    pub members: BTreeSet<EntityRef>,
    /// Child groups in hierarchy discovery order.
    #[serde(default)]
    pub children: Vec<EntityRef>,
}

/// Any entity a sync pass can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    User(UserEntity),
    Group(GroupEntity),
}

impl Entity {
    /// The reference other entities use to point at this one.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Entity::User(user) => EntityRef::user(user.name.clone()),
            Entity::Group(group) => EntityRef::group(group.name.clone()),
        }
    }
}

/// An entity paired with the location key it is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredEntity {
    pub entity: Entity,
    pub location_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_renders_kind_qualified() {
        assert_eq!(EntityRef::user("jdoe").to_string(), "user:jdoe");
        assert_eq!(EntityRef::group("org.team").to_string(), "group:org.team");
    }

    #[test]
    fn entity_ref_round_trips_through_from_str() {
        let parsed: EntityRef = "group:a.b".parse().unwrap();
        assert_eq!(parsed, EntityRef::group("a.b"));

        assert!("nocolon".parse::<EntityRef>().is_err());
        assert!("robot:x".parse::<EntityRef>().is_err());
        assert!("user:".parse::<EntityRef>().is_err());
    }

    #[test]
    fn entity_ref_serializes_as_a_string() {
        let json = serde_json::to_string(&EntityRef::user("jdoe")).unwrap();
        assert_eq!(json, r#""user:jdoe""#);

        let back: EntityRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EntityRef::user("jdoe"));
    }

    #[test]
    fn entity_ref_ordering_is_stable() {
        let mut refs = BTreeSet::new();
        refs.insert(EntityRef::user("zed"));
        refs.insert(EntityRef::user("amy"));
        refs.insert(EntityRef::user("amy"));

        let ordered: Vec<String> = refs.iter().map(ToString::to_string).collect();
        assert_eq!(ordered, vec!["user:amy", "user:zed"]);
    }

    #[test]
    fn entity_ref_of_group_entity_uses_its_name() {
        let entity = Entity::Group(GroupEntity {
            name: "a.b".to_string(),
            display_name: None,
            description: None,
            group_type: "team".to_string(),
            members: BTreeSet::new(),
            children: Vec::new(),
        });
        assert_eq!(entity.entity_ref(), EntityRef::group("a.b"));
    }
}
