use glam::Vec3;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type ModelMap = BTreeMap<String, ModelValue>;

/// A node in a named model tree.
///
/// Maps and lists sit behind `Arc` so an update only rebuilds the spine it
/// walks; every untouched sibling keeps pointing at the same allocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModelValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Arc<Vec<ModelValue>>),
    Map(Arc<ModelMap>),
}

impl ModelValue {
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ModelValue)>,
    {
        Self::Map(Arc::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        ))
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ModelValue>,
    {
        Self::List(Arc::new(items.into_iter().collect()))
    }

    pub fn empty_map() -> Self {
        Self::Map(Arc::new(ModelMap::new()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_map(&self) -> Option<&ModelMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ModelValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Reads a `{x, y, z}` map back into a vector.
    pub fn as_vec3(&self) -> Option<Vec3> {
        let map = self.as_map()?;
        let axis = |key: &str| map.get(key).and_then(ModelValue::as_f64).map(|v| v as f32);
        Some(Vec3::new(axis("x")?, axis("y")?, axis("z")?))
    }

    /// Follows `segments` through nested maps. Any missing key or non-map
    /// intermediate yields `None`.
    pub fn at_path(&self, segments: &[&str]) -> Option<&ModelValue> {
        segments
            .iter()
            .try_fold(self, |current, segment| current.as_map()?.get(*segment))
    }

    /// Returns a new tree with `value` stored at `segments`.
    ///
    /// Only the maps along the path are rebuilt. Missing or non-map
    /// intermediates are replaced by fresh maps.
    pub fn with_path(&self, segments: &[&str], value: ModelValue) -> ModelValue {
        let Some((head, rest)) = segments.split_first() else {
            return value;
        };
        let mut map = match self {
            Self::Map(existing) => ModelMap::clone(existing),
            _ => ModelMap::new(),
        };
        let child = if rest.is_empty() {
            value
        } else {
            map.get(*head)
                .unwrap_or(&ModelValue::Null)
                .with_path(rest, value)
        };
        map.insert((*head).to_string(), child);
        Self::Map(Arc::new(map))
    }

    /// True when both values are containers backed by the same allocation.
    pub fn shares_storage(&self, other: &ModelValue) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => Arc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }
}

impl From<bool> for ModelValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ModelValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for ModelValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for ModelValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<usize> for ModelValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for ModelValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ModelValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<ModelValue>> From<Option<T>> for ModelValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Vec3> for ModelValue {
    fn from(value: Vec3) -> Self {
        Self::map([
            ("x", Self::from(value.x)),
            ("y", Self::from(value.y)),
            ("z", Self::from(value.z)),
        ])
    }
}

impl From<&serde_json::Value> for ModelValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::list(items.iter().map(Self::from)),
            serde_json::Value::Object(entries) => {
                Self::map(entries.iter().map(|(k, v)| (k.clone(), Self::from(v))))
            }
        }
    }
}

impl From<&ModelValue> for serde_json::Value {
    fn from(value: &ModelValue) -> Self {
        match value {
            ModelValue::Null => serde_json::Value::Null,
            ModelValue::Bool(b) => serde_json::Value::Bool(*b),
            ModelValue::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            ModelValue::String(s) => serde_json::Value::String(s.clone()),
            ModelValue::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            ModelValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ModelValue;
    use glam::Vec3;

    fn sample() -> ModelValue {
        ModelValue::map([
            (
                "transform",
                ModelValue::map([
                    ("position", ModelValue::from(Vec3::ZERO)),
                    ("scale", ModelValue::from(Vec3::ONE)),
                ]),
            ),
            ("material", ModelValue::map([("metallic", ModelValue::Number(0.0))])),
        ])
    }

    #[test]
    fn with_path_rebuilds_only_the_spine() {
        let root = sample();
        let updated = root.with_path(&["transform", "position", "x"], ModelValue::Number(4.0));

        assert_eq!(
            updated.at_path(&["transform", "position", "x"]),
            Some(&ModelValue::Number(4.0))
        );
        assert_eq!(
            root.at_path(&["transform", "position", "x"]),
            Some(&ModelValue::Number(0.0))
        );

        let old_material = root.at_path(&["material"]).unwrap();
        let new_material = updated.at_path(&["material"]).unwrap();
        assert!(old_material.shares_storage(new_material));

        let old_scale = root.at_path(&["transform", "scale"]).unwrap();
        let new_scale = updated.at_path(&["transform", "scale"]).unwrap();
        assert!(old_scale.shares_storage(new_scale));

        let old_position = root.at_path(&["transform", "position"]).unwrap();
        let new_position = updated.at_path(&["transform", "position"]).unwrap();
        assert!(!old_position.shares_storage(new_position));
    }

    #[test]
    fn with_path_replaces_scalar_intermediates() {
        let root = ModelValue::map([("a", ModelValue::Number(1.0))]);
        let updated = root.with_path(&["a", "b"], "leaf".into());
        assert_eq!(updated.at_path(&["a", "b"]), Some(&ModelValue::from("leaf")));
    }

    #[test]
    fn at_path_is_absent_through_non_maps() {
        let root = sample();
        assert!(root.at_path(&["material", "metallic", "deeper"]).is_none());
        assert!(root.at_path(&["missing"]).is_none());
    }

    #[test]
    fn json_bridge_keeps_structure() {
        let json = serde_json::json!({"a": {"b": [1.0, true, "x", null]}});
        let value = ModelValue::from(&json);
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn vec3_maps_round_trip() {
        let value = ModelValue::from(Vec3::new(1.0, -2.0, 0.5));
        assert_eq!(value.as_vec3(), Some(Vec3::new(1.0, -2.0, 0.5)));
    }
}
