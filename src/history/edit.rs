use super::Reversible;
use crate::binding::PropertyBus;
use crate::scene::{ObjectId, SceneGraph, SceneObject, Transform};
use serde_json::{json, Value};

/// What a scene edit touches when it is undone or redone.
pub struct EditTarget<'a> {
    pub scene: &'a mut SceneGraph,
    pub bus: &'a mut PropertyBus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemovedObject {
    /// Position in scene order at the time of removal.
    pub index: usize,
    pub object: SceneObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformChange {
    pub id: ObjectId,
    pub before: Transform,
    pub after: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeKind {
    Brush,
    Erase,
}

impl StrokeKind {
    pub fn engine_call(self) -> &'static str {
        match self {
            Self::Brush => "ApplyBrush",
            Self::Erase => "ApplyEraser",
        }
    }
}

/// One brush or eraser application sent to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeDab {
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeRecord {
    pub kind: StrokeKind,
    pub dabs: Vec<StrokeDab>,
}

/// Recorded scene mutation with both directions available.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEdit {
    Insert(Vec<SceneObject>),
    /// Objects in removal order.
    Remove(Vec<RemovedObject>),
    Transform(Vec<TransformChange>),
    /// Whole-object replacement from a properties edit.
    Replace { before: SceneObject, after: SceneObject },
    /// Painting lives engine-side; replaying or reverting only sends calls.
    Stroke(StrokeRecord),
}

pub(crate) fn transform_payload(id: &ObjectId, transform: &Transform) -> Value {
    json!({
        "id": id.as_str(),
        "position": transform.position.to_array(),
        "rotation": transform.rotation.to_array(),
        "scale": transform.scale.to_array(),
    })
}

fn push_transforms<'c>(
    target: &mut EditTarget<'_>,
    changes: impl Iterator<Item = (&'c ObjectId, &'c Transform)>,
) {
    let mut payload = Vec::new();
    for (id, transform) in changes {
        match target.scene.set_transform(id, *transform) {
            Ok(()) => payload.push(transform_payload(id, transform)),
            Err(err) => log::warn!("Skipping transform replay: {}", err),
        }
    }
    if !payload.is_empty() {
        target
            .bus
            .call("UpdateObjectTransforms", &[Value::Array(payload)]);
    }
}

fn push_object(target: &mut EditTarget<'_>, object: &SceneObject) {
    if target.scene.get(&object.id).is_none() {
        log::warn!("Skipping replace of missing object {}", object.id);
        return;
    }
    target.scene.insert(object.clone());
    match serde_json::to_value(object) {
        Ok(payload) => target.bus.call("UpdateObject", &[payload]),
        Err(err) => log::warn!("Could not encode {}: {}", object.id, err),
    }
}

impl<'a> Reversible<EditTarget<'a>> for SceneEdit {
    fn apply(&self, target: &mut EditTarget<'a>) {
        match self {
            Self::Insert(objects) => {
                for object in objects {
                    target.scene.insert(object.clone());
                }
            }
            Self::Remove(removed) => {
                for entry in removed {
                    target.scene.remove(&entry.object.id);
                }
            }
            Self::Transform(changes) => {
                push_transforms(target, changes.iter().map(|c| (&c.id, &c.after)));
            }
            Self::Replace { after, .. } => push_object(target, after),
            Self::Stroke(stroke) => {
                for dab in &stroke.dabs {
                    target
                        .bus
                        .call(stroke.kind.engine_call(), std::slice::from_ref(&dab.payload));
                }
            }
        }
    }

    fn revert(&self, target: &mut EditTarget<'a>) {
        match self {
            Self::Insert(objects) => {
                for object in objects.iter().rev() {
                    target.scene.remove(&object.id);
                }
            }
            Self::Remove(removed) => {
                for entry in removed.iter().rev() {
                    target.scene.restore(entry.index, entry.object.clone());
                }
            }
            Self::Transform(changes) => {
                push_transforms(target, changes.iter().map(|c| (&c.id, &c.before)));
            }
            Self::Replace { before, .. } => push_object(target, before),
            Self::Stroke(stroke) => {
                let tool = match stroke.kind {
                    StrokeKind::Brush => "brush",
                    StrokeKind::Erase => "erase",
                };
                target.bus.call(
                    "UndoStroke",
                    &[json!({ "tool": tool, "dabs": stroke.dabs.len() })],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EditTarget, RemovedObject, SceneEdit, TransformChange};
    use crate::binding::{PropertyBus, RecordingChannel};
    use crate::history::Reversible;
    use crate::scene::{ObjectSpec, SceneGraph, Transform};
    use glam::Vec3;

    #[test]
    fn remove_then_revert_restores_order() {
        let mut scene = SceneGraph::new();
        let mut bus = PropertyBus::new();
        let a = scene.add(ObjectSpec::named("A"));
        let b = scene.add(ObjectSpec::named("B"));
        scene.add(ObjectSpec::named("C"));

        let mut removed = Vec::new();
        for id in [&a.id, &b.id] {
            let (index, object) = scene.remove(id).unwrap();
            removed.push(RemovedObject { index, object });
        }
        let edit = SceneEdit::Remove(removed);

        let mut target = EditTarget { scene: &mut scene, bus: &mut bus };
        edit.revert(&mut target);
        let names: Vec<_> = scene.objects().map(|o| o.name.clone()).collect();
        assert_eq!(names, ["A", "B", "C"]);

        let mut target = EditTarget { scene: &mut scene, bus: &mut bus };
        edit.apply(&mut target);
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn transform_edit_moves_both_ways_and_notifies_engine() {
        let (channel, handle) = RecordingChannel::new();
        let mut bus = PropertyBus::with_channel(Box::new(channel));
        let mut scene = SceneGraph::new();
        let cube = scene.add(ObjectSpec::named("Cube"));
        let after = Transform {
            position: Vec3::new(2.0, 0.0, 0.0),
            ..Transform::default()
        };
        let edit = SceneEdit::Transform(vec![TransformChange {
            id: cube.id.clone(),
            before: cube.transform,
            after,
        }]);

        edit.apply(&mut EditTarget { scene: &mut scene, bus: &mut bus });
        assert_eq!(scene.get(&cube.id).unwrap().transform, after);
        assert_eq!(scene.mirror().get(&cube.id).unwrap().position.x, 2.0);

        edit.revert(&mut EditTarget { scene: &mut scene, bus: &mut bus });
        assert_eq!(scene.get(&cube.id).unwrap().transform, cube.transform);
        assert_eq!(handle.calls_named("UpdateObjectTransforms").len(), 2);
    }
}
