pub mod serialization;

use crate::viewport::ViewportMirror;
use glam::Vec3;
use indexmap::{IndexMap, IndexSet};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

const ID_PREFIX: &str = "obj_";

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),
    #[error("corrupt scene: {0}")]
    CorruptScene(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;

/// Session-unique object identifier of the form `obj_<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_sequence(n: u64) -> Self {
        Self(format!("{ID_PREFIX}{n}"))
    }

    /// Numeric suffix, if the id follows the `obj_<n>` scheme.
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix(ID_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectCategory {
    #[default]
    Model,
    Light,
    Camera,
    Texture,
}

impl ObjectCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Light => "light",
            Self::Camera => "camera",
            Self::Texture => "texture",
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" | "mesh" => Ok(Self::Model),
            "light" => Ok(Self::Light),
            "camera" => Ok(Self::Camera),
            "texture" => Ok(Self::Texture),
            other => Err(format!("unknown object category '{other}'")),
        }
    }
}

/// Rotation is stored in radians.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Material {
    pub albedo: String,
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: "#ffffff".to_string(),
            metallic: 0.0,
            roughness: 0.5,
        }
    }
}

/// Canonical editable object. Selection lives on [`SceneGraph`], not here.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub category: ObjectCategory,
    #[serde(flatten)]
    pub transform: Transform,
    #[serde(default)]
    pub material: Material,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Creation request for [`SceneGraph::add`]. Omitted fields take defaults.
#[derive(Debug, Clone, Default)]
pub struct ObjectSpec {
    pub name: Option<String>,
    pub category: ObjectCategory,
    pub position: Option<Vec3>,
    pub rotation: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub material: Option<Material>,
    pub visible: Option<bool>,
}

impl ObjectSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: ObjectCategory) -> Self {
        self.category = category;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Builds the object for an already-assigned id.
    pub fn build(self, id: ObjectId) -> SceneObject {
        let defaults = Transform::default();
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{}_{}", self.category, id));
        SceneObject {
            name,
            category: self.category,
            transform: Transform {
                position: self.position.unwrap_or(defaults.position),
                rotation: self.rotation.unwrap_or(defaults.rotation),
                scale: self.scale.unwrap_or(defaults.scale),
            },
            material: self.material.unwrap_or_default(),
            visible: self.visible.unwrap_or(true),
            id,
        }
    }
}

/// Owner of every editable object, the id counter and the selection set.
///
/// Each mutation is mirrored into the [`ViewportMirror`] before returning.
pub struct SceneGraph {
    objects: IndexMap<ObjectId, SceneObject>,
    selection: IndexSet<ObjectId>,
    next_id: u64,
    duplicate_offset: Vec3,
    mirror: ViewportMirror,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_duplicate_offset(Vec3::X)
    }

    pub fn with_duplicate_offset(duplicate_offset: Vec3) -> Self {
        Self {
            objects: IndexMap::new(),
            selection: IndexSet::new(),
            next_id: 1,
            duplicate_offset,
            mirror: ViewportMirror::new(),
        }
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId::from_sequence(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub fn add(&mut self, spec: ObjectSpec) -> SceneObject {
        let id = self.allocate_id();
        let object = spec.build(id);
        log::debug!("Added {} '{}'", object.id, object.name);
        self.insert(object.clone());
        object
    }

    /// Re-inserts an object under its existing id (paste, undo of a
    /// delete). Replaces any object with the same id.
    pub fn insert(&mut self, object: SceneObject) {
        self.bump_next_id(&object.id);
        self.mirror.upsert(&object);
        self.objects.insert(object.id.clone(), object);
        self.mirror.reproject_selection(&self.selection);
    }

    /// Re-inserts `object` at `index` in scene order. The mirror entry goes
    /// back to the same position.
    pub fn restore(&mut self, index: usize, object: SceneObject) {
        self.bump_next_id(&object.id);
        let index = index.min(self.objects.len());
        self.mirror.insert_at(index, &object);
        self.objects.shift_insert(index, object.id.clone(), object);
        self.mirror.reproject_selection(&self.selection);
    }

    /// Keeps the counter past `id`. An id at the top of the range pins the
    /// counter there instead of wrapping.
    fn bump_next_id(&mut self, id: &ObjectId) {
        if let Some(seq) = id.sequence() {
            self.next_id = self.next_id.max(seq.saturating_add(1));
        }
    }

    /// Removes `id`; unknown ids are a no-op. Returns the removed object and
    /// its former index in scene order.
    pub fn remove(&mut self, id: &ObjectId) -> Option<(usize, SceneObject)> {
        let (index, _, object) = self.objects.shift_remove_full(id)?;
        self.mirror.remove(id);
        if self.selection.shift_remove(id) {
            self.mirror.reproject_selection(&self.selection);
        }
        log::debug!("Removed {}", id);
        Some((index, object))
    }

    pub fn duplicate(&mut self, id: &ObjectId) -> Result<SceneObject> {
        let original = self
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| SceneError::NotFound(id.clone()))?;
        let mut copy = original;
        copy.id = self.allocate_id();
        copy.name = format!("{}_copy", copy.name);
        copy.transform.position += self.duplicate_offset;
        self.insert(copy.clone());
        Ok(copy)
    }

    /// Replaces the selection. Unknown ids are dropped; the new set is
    /// swapped in as a whole.
    pub fn select<I>(&mut self, ids: I) -> &IndexSet<ObjectId>
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let mut next = IndexSet::new();
        for id in ids {
            if self.objects.contains_key(&id) {
                next.insert(id);
            } else {
                log::warn!("Ignoring selection of unknown object {}", id);
            }
        }
        self.selection = next;
        self.mirror.reproject_selection(&self.selection);
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.select(std::iter::empty());
    }

    pub fn selection(&self) -> &IndexSet<ObjectId> {
        &self.selection
    }

    pub fn is_selected(&self, id: &ObjectId) -> bool {
        self.selection.contains(id)
    }

    /// The selected object when exactly one is selected.
    pub fn single_selected(&self) -> Option<&SceneObject> {
        match self.selection.len() {
            1 => self.selection.first().and_then(|id| self.objects.get(id)),
            _ => None,
        }
    }

    pub fn get(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn get_str(&self, id: &str) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn mirror(&self) -> &ViewportMirror {
        &self.mirror
    }

    pub fn set_transform(&mut self, id: &ObjectId, transform: Transform) -> Result<()> {
        self.update(id, |object| object.transform = transform)
    }

    /// Mutates one object in place and refreshes its mirror entry.
    pub fn update<F>(&mut self, id: &ObjectId, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SceneObject),
    {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| SceneError::NotFound(id.clone()))?;
        mutate(object);
        self.mirror.upsert(object);
        Ok(())
    }

    /// Drops every object and the selection. The id counter keeps running.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.selection.clear();
        self.mirror.clear();
    }

    pub fn serialize(&self) -> Result<String> {
        serialization::SceneDocument::capture(self).to_json()
    }

    /// Replaces the whole scene from a document. On any error the current
    /// scene is left untouched.
    pub fn deserialize(&mut self, document: &str) -> Result<()> {
        let parsed = serialization::SceneDocument::from_json(document)?;
        let mut objects = IndexMap::with_capacity(parsed.objects.len());
        for object in parsed.objects {
            let id = object.id.clone();
            if objects.insert(id.clone(), object).is_some() {
                return Err(SceneError::CorruptScene(format!("duplicate object id {id}")));
            }
        }

        let next_id = match objects.keys().filter_map(ObjectId::sequence).max() {
            Some(seq) => seq.checked_add(1).ok_or_else(|| {
                SceneError::CorruptScene("object id suffix out of range".to_string())
            })?,
            None => 1,
        };
        self.next_id = next_id;
        self.objects = objects;
        self.selection.clear();
        self.mirror.clear();
        for object in self.objects.values() {
            self.mirror.upsert(object);
        }
        log::info!("Scene loaded: {} objects", self.objects.len());
        Ok(())
    }
}
