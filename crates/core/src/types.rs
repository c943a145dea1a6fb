use serde::Deserialize;

/// Server-assigned identifiers are opaque strings (`_id` on the wire).
pub type ResourceId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Record id under either spelling. Some endpoints send `_id`, some a
/// virtual `id`, some both; `_id` wins when both are present.
#[derive(Deserialize)]
pub(crate) struct WireId {
    #[serde(rename = "_id")]
    underscore: Option<ResourceId>,
    id: Option<ResourceId>,
}

impl WireId {
    pub(crate) fn resolve<E: serde::de::Error>(self) -> Result<ResourceId, E> {
        self.underscore
            .or(self.id)
            .ok_or_else(|| E::missing_field("_id"))
    }
}

/// `#[serde(flatten, with = "wire_id")]` for a record's id field: reads
/// [`WireId`], writes `_id`.
pub(crate) mod wire_id {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{ResourceId, WireId};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ResourceId, D::Error> {
        WireId::deserialize(deserializer)?.resolve()
    }

    pub fn serialize<S: Serializer>(id: &ResourceId, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("_id", id)?;
        map.end()
    }
}
