//! The signed-in user as the backend reports it, and author references
//! embedded in resource items.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{ResourceId, Timestamp, WireId};

/// Set of permission names granted to a user.
///
/// Deserializes from a JSON array; a missing or `null` list is an empty
/// set, which denies everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names: Option<Vec<String>> = Option::deserialize(deserializer)?;
        Ok(names.unwrap_or_default().into_iter().collect())
    }
}

/// Identity record returned by `/auth/login`, `/auth/{provider}` and
/// `/users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(flatten, with = "crate::types::wire_id")]
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub last_login: Option<Timestamp>,
}

impl Identity {
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }
}

/// Permission check against an optional viewer; anonymous viewers hold
/// nothing.
pub fn has_permission(viewer: Option<&Identity>, name: &str) -> bool {
    viewer.is_some_and(|identity| identity.has_permission(name))
}

/// Reference to a user embedded in a resource item (author, uploader,
/// creator).
///
/// The backend sends either a populated object (`{"_id", "name", "avatar"}`)
/// or a bare id string; both deserialize here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: ResourceId,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserRefRepr {
    Id(String),
    Populated {
        #[serde(flatten)]
        id: WireId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        avatar: Option<String>,
    },
}

impl<'de> Deserialize<'de> for UserRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match UserRefRepr::deserialize(deserializer)? {
            UserRefRepr::Id(id) => UserRef {
                id,
                name: None,
                avatar: None,
            },
            UserRefRepr::Populated { id, name, avatar } => UserRef {
                id: id.resolve()?,
                name,
                avatar,
            },
        })
    }
}

impl UserRef {
    /// Name to show next to an item, falling back like the boards do.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}
