//! Entities flowing through recommendation flows
//!
//! An entity is an immutable attribute map with exactly one required
//! attribute, `id`. Stages never mutate an entity in place: every update
//! produces a new entity by shallow-merging over the original.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Name of the identity attribute
pub const ID: &str = "id";

/// Entity identifier
///
/// User and song ids are numeric surrogate keys; author ids may be opaque
/// strings (URIs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

impl EntityId {
    /// Convert an attribute value into an id. Only integers and strings qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(EntityId::Int),
            Value::String(s) => Some(EntityId::Str(s.clone())),
            _ => None,
        }
    }

    /// Parse a textual id, treating all-digit strings as integer ids
    pub fn parse(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) => EntityId::Int(n),
            Err(_) => EntityId::Str(s.to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Int(n) => Value::from(*n),
            EntityId::Str(s) => Value::from(s.as_str()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            EntityId::Int(n) => Some(*n),
            EntityId::Str(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        EntityId::Int(n as i64)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Str(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Str(s)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        id.to_value()
    }
}

/// Immutable attribute record carrying an `id`
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    attrs: Map<String, Value>,
}

impl Entity {
    /// Create an entity holding only an id
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            attrs: Map::new(),
        }
    }

    /// Build an entity from a JSON object. Returns `None` without a usable `id`.
    pub fn from_map(mut map: Map<String, Value>) -> Option<Self> {
        let id = map.remove(ID).as_ref().and_then(EntityId::from_value)?;
        Some(Self { id, attrs: map })
    }

    /// Builder-style attribute assignment.
    ///
    /// Assigning `id` replaces the identity when the value is a valid id;
    /// an invalid id value leaves the entity unchanged.
    pub fn with_attr(self, key: &str, value: impl Into<Value>) -> Self {
        match self.assign(key, Some(value.into())) {
            Some(entity) => entity,
            None => self,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Value of attribute `key`, including `id`
    pub fn get(&self, key: &str) -> Option<Value> {
        if key == ID {
            Some(self.id.to_value())
        } else {
            self.attrs.get(key).cloned()
        }
    }

    /// Non-id attributes
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// New entity with the same attributes and a different identity
    pub fn with_id(&self, id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            attrs: self.attrs.clone(),
        }
    }

    /// New entity with `key` set to `value` (`None` removes the attribute).
    ///
    /// Returns `None` only when the update would leave the entity without a
    /// valid `id`.
    pub fn assign(&self, key: &str, value: Option<Value>) -> Option<Self> {
        if key == ID {
            let id = value.as_ref().and_then(EntityId::from_value)?;
            return Some(self.with_id(id));
        }

        let mut attrs = self.attrs.clone();
        match value {
            Some(value) => {
                attrs.insert(key.to_string(), value);
            }
            None => {
                attrs.remove(key);
            }
        }
        Some(Self {
            id: self.id.clone(),
            attrs,
        })
    }

    /// Shallow-merge `record` on top of this entity.
    ///
    /// Record fields overwrite identically named entity fields; fields the
    /// record does not mention are kept.
    pub fn merge(&self, record: &Entity) -> Self {
        let mut attrs = self.attrs.clone();
        for (key, value) in &record.attrs {
            attrs.insert(key.clone(), value.clone());
        }
        Self {
            id: record.id.clone(),
            attrs,
        }
    }

    /// JSON object representation, `id` included
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.attrs.len() + 1);
        map.insert(ID.to_string(), self.id.to_value());
        for (key, value) in &self.attrs {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attrs.len() + 1))?;
        map.serialize_entry(ID, &self.id)?;
        for (key, value) in &self.attrs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Entity::from_map(map).ok_or_else(|| de::Error::custom("entity requires an integer or string `id`"))
    }
}

/// Normalized stage input: a single seed or a list of seeds
///
/// Seeds may be raw ids (wrapped as `{ id }` entities) or entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageInput(Vec<Entity>);

impl StageInput {
    pub fn into_vec(self) -> Vec<Entity> {
        self.0
    }
}

/// Normalize scalar-or-list input into a list of entities
pub fn as_list(input: impl Into<StageInput>) -> Vec<Entity> {
    input.into().into_vec()
}

impl From<Entity> for StageInput {
    fn from(entity: Entity) -> Self {
        StageInput(vec![entity])
    }
}

impl From<Vec<Entity>> for StageInput {
    fn from(entities: Vec<Entity>) -> Self {
        StageInput(entities)
    }
}

impl From<EntityId> for StageInput {
    fn from(id: EntityId) -> Self {
        StageInput(vec![Entity::new(id)])
    }
}

impl From<i64> for StageInput {
    fn from(id: i64) -> Self {
        StageInput(vec![Entity::new(id)])
    }
}

impl From<&str> for StageInput {
    fn from(id: &str) -> Self {
        StageInput(vec![Entity::new(id)])
    }
}

impl From<String> for StageInput {
    fn from(id: String) -> Self {
        StageInput(vec![Entity::new(id)])
    }
}

impl From<Vec<EntityId>> for StageInput {
    fn from(ids: Vec<EntityId>) -> Self {
        StageInput(ids.into_iter().map(Entity::new).collect())
    }
}

impl From<Vec<i64>> for StageInput {
    fn from(ids: Vec<i64>) -> Self {
        StageInput(ids.into_iter().map(Entity::new).collect())
    }
}

impl From<Vec<String>> for StageInput {
    fn from(ids: Vec<String>) -> Self {
        StageInput(ids.into_iter().map(Entity::new).collect())
    }
}

impl From<Vec<&str>> for StageInput {
    fn from(ids: Vec<&str>) -> Self {
        StageInput(ids.into_iter().map(Entity::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_from_value() {
        assert_eq!(EntityId::from_value(&json!(5)), Some(EntityId::Int(5)));
        assert_eq!(
            EntityId::from_value(&json!("spotify:artist:1")),
            Some(EntityId::Str("spotify:artist:1".to_string()))
        );
        assert_eq!(EntityId::from_value(&json!(null)), None);
        assert_eq!(EntityId::from_value(&json!(1.5)), None);
    }

    #[test]
    fn test_id_parse() {
        assert_eq!(EntityId::parse("20001"), EntityId::Int(20001));
        assert_eq!(EntityId::parse("7dGJo4pcD2V6"), EntityId::Str("7dGJo4pcD2V6".to_string()));
    }

    #[test]
    fn test_assign_does_not_touch_original() {
        let original = Entity::new(1).with_attr("name", "Joe");
        let updated = original.assign("flow", Some(json!("song"))).unwrap();

        assert_eq!(original.get("flow"), None);
        assert_eq!(updated.get("flow"), Some(json!("song")));
        assert_eq!(updated.get("name"), Some(json!("Joe")));
    }

    #[test]
    fn test_assign_null_id_is_rejected() {
        let entity = Entity::new(1);
        assert!(entity.assign(ID, None).is_none());
        assert!(entity.assign(ID, Some(Value::Null)).is_none());
        assert_eq!(entity.assign(ID, Some(json!("x"))).unwrap().id(), &EntityId::from("x"));
    }

    #[test]
    fn test_merge_keeps_unmentioned_fields() {
        let entity = Entity::new(5).with_attr("recommender", 9).with_attr("name", "old");
        let record = Entity::new(5).with_attr("name", "X");

        let merged = entity.merge(&record);
        assert_eq!(merged.get("recommender"), Some(json!(9)));
        assert_eq!(merged.get("name"), Some(json!("X")));
    }

    #[test]
    fn test_serde_flat_object() {
        let entity = Entity::new(5).with_attr("recommender", 9);
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value, json!({"id": 5, "recommender": 9}));

        let back: Entity = serde_json::from_value(value).unwrap();
        assert_eq!(back, entity);

        let missing: std::result::Result<Entity, _> = serde_json::from_value(json!({"name": "X"}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_as_list_normalizes_scalars_and_lists() {
        assert_eq!(as_list(10000_i64), vec![Entity::new(10000)]);
        assert_eq!(as_list("A"), vec![Entity::new("A")]);
        assert_eq!(as_list(vec!["A", "B"]), vec![Entity::new("A"), Entity::new("B")]);
        assert_eq!(as_list(Entity::new(1)), vec![Entity::new(1)]);
        assert!(as_list(Vec::<Entity>::new()).is_empty());
    }
}
