//! Viewport mirror and screen projection.
//!
//! The mirror is a drawing/hit-testing copy of the scene keyed by object id.
//! It never owns selection: the `selected` flag on each entry is recomputed
//! from the scene's selection set every time that set changes.
//!
//! Projection is a flat orthographic stand-in: world X/Y map to screen pixels
//! around the viewport centre, screen Y grows downwards, Z is ignored.

pub mod timing;

use crate::scene::{ObjectCategory, ObjectId, SceneObject};
use glam::{Vec2, Vec3};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, PartialEq)]
pub struct MirrorEntry {
    pub id: ObjectId,
    pub name: String,
    pub category: ObjectCategory,
    pub position: Vec3,
    pub visible: bool,
    pub selected: bool,
}

#[derive(Debug, Default)]
pub struct ViewportMirror {
    entries: IndexMap<ObjectId, MirrorEntry>,
}

impl ViewportMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or refreshes the entry for `object`. A new entry starts
    /// unselected; an existing one keeps its projected flag.
    pub fn upsert(&mut self, object: &SceneObject) {
        match self.entries.get_mut(&object.id) {
            Some(entry) => refresh(entry, object),
            None => {
                self.entries.insert(object.id.clone(), MirrorEntry::from(object));
            }
        }
    }

    /// Like [`upsert`](Self::upsert), but a new entry lands at `index` so
    /// draw and hit-test order follow scene order.
    pub fn insert_at(&mut self, index: usize, object: &SceneObject) {
        match self.entries.get_mut(&object.id) {
            Some(entry) => refresh(entry, object),
            None => {
                let index = index.min(self.entries.len());
                self.entries
                    .shift_insert(index, object.id.clone(), MirrorEntry::from(object));
            }
        }
    }

    pub fn remove(&mut self, id: &ObjectId) {
        self.entries.shift_remove(id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Recomputes every `selected` flag from the authoritative set.
    pub fn reproject_selection(&mut self, selection: &IndexSet<ObjectId>) {
        for entry in self.entries.values_mut() {
            entry.selected = selection.contains(&entry.id);
        }
    }

    pub fn get(&self, id: &ObjectId) -> Option<&MirrorEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MirrorEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

impl From<&SceneObject> for MirrorEntry {
    fn from(object: &SceneObject) -> Self {
        Self {
            id: object.id.clone(),
            name: object.name.clone(),
            category: object.category,
            position: object.transform.position,
            visible: object.visible,
            selected: false,
        }
    }
}

fn refresh(entry: &mut MirrorEntry, object: &SceneObject) {
    entry.name.clone_from(&object.name);
    entry.category = object.category;
    entry.position = object.transform.position;
    entry.visible = object.visible;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub width: f32,
    pub height: f32,
    pub pixels_per_unit: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            pixels_per_unit: 50.0,
        }
    }
}

impl Projection {
    pub fn new(width: f32, height: f32, pixels_per_unit: f32) -> Self {
        Self {
            width,
            height,
            pixels_per_unit: pixels_per_unit.max(f32::EPSILON),
        }
    }

    fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn world_to_screen(&self, world: Vec3) -> Vec2 {
        let center = self.center();
        Vec2::new(
            center.x + world.x * self.pixels_per_unit,
            center.y - world.y * self.pixels_per_unit,
        )
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec3 {
        let center = self.center();
        Vec3::new(
            (screen.x - center.x) / self.pixels_per_unit,
            (center.y - screen.y) / self.pixels_per_unit,
            0.0,
        )
    }

    /// First visible entry whose projected position lies strictly within
    /// `radius` pixels of `point`, in mirror order.
    pub fn pick<'a>(
        &self,
        mirror: &'a ViewportMirror,
        point: Vec2,
        radius: f32,
    ) -> Option<&'a MirrorEntry> {
        mirror.iter().find(|entry| {
            entry.visible && self.world_to_screen(entry.position).distance(point) < radius
        })
    }

    /// Visible entries whose projected position falls inside the rectangle
    /// spanned by `a` and `b` (corners in any order, edges inclusive).
    pub fn objects_in_rect(&self, mirror: &ViewportMirror, a: Vec2, b: Vec2) -> Vec<ObjectId> {
        let min = a.min(b);
        let max = a.max(b);
        mirror
            .iter()
            .filter(|entry| entry.visible)
            .filter(|entry| {
                let p = self.world_to_screen(entry.position);
                p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
            })
            .map(|entry| entry.id.clone())
            .collect()
    }
}
