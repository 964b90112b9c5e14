//! Events pushed by the host engine.
//!
//! Engine callbacks run inside the channel, so they only queue parsed events;
//! the context drains the queue on its own turn.

use crate::binding::{EngineChannel, ModelVersion};
use crate::scene::{ObjectId, Transform};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub const SCENE_CHANGED: &str = "sceneChanged";
pub const TRANSFORM_CHANGED: &str = "transformChanged";
pub const OBJECT_SELECTED: &str = "objectSelected";

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Full scene document produced engine-side.
    SceneChanged(String),
    TransformChanged {
        id: ObjectId,
        transform: Transform,
        /// Local model version the engine had seen. `None` means unversioned.
        version: Option<ModelVersion>,
    },
    SelectObject(Option<ObjectId>),
}

impl EngineEvent {
    /// Decodes the arguments of a named engine event.
    pub fn parse(event: &str, args: &[Value]) -> Option<Self> {
        match event {
            SCENE_CHANGED => {
                let document = match args.first()? {
                    Value::String(raw) => raw.clone(),
                    other => other.to_string(),
                };
                Some(Self::SceneChanged(document))
            }
            TRANSFORM_CHANGED => {
                let id = ObjectId::new(args.first()?.as_str()?);
                let transform = match serde_json::from_value(args.get(1)?.clone()) {
                    Ok(transform) => transform,
                    Err(err) => {
                        log::warn!("Bad transform for {}: {}", id, err);
                        return None;
                    }
                };
                let version = args.get(2).and_then(Value::as_u64).map(ModelVersion);
                Some(Self::TransformChanged {
                    id,
                    transform,
                    version,
                })
            }
            OBJECT_SELECTED => {
                let id = args.first().and_then(Value::as_str).map(ObjectId::new);
                Some(Self::SelectObject(id))
            }
            _ => None,
        }
    }
}

/// Inbox shared between the channel's callbacks and the context.
#[derive(Debug, Clone, Default)]
pub struct EngineEventQueue {
    pending: Rc<RefCell<VecDeque<EngineEvent>>>,
}

impl EngineEventQueue {
    /// Registers for every engine event the editor understands.
    pub fn attach(channel: &mut dyn EngineChannel) -> Self {
        let queue = Self::default();
        for event in [SCENE_CHANGED, TRANSFORM_CHANGED, OBJECT_SELECTED] {
            let pending = Rc::clone(&queue.pending);
            channel.on(
                event,
                Box::new(move |args: &[Value]| match EngineEvent::parse(event, args) {
                    Some(parsed) => pending.borrow_mut().push_back(parsed),
                    None => log::warn!("Ignoring malformed '{}' event", event),
                }),
            );
        }
        queue
    }

    pub fn pop(&self) -> Option<EngineEvent> {
        self.pending.borrow_mut().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineEvent, EngineEventQueue, TRANSFORM_CHANGED};
    use crate::binding::{ModelVersion, RecordingChannel};
    use crate::scene::ObjectId;
    use glam::Vec3;
    use serde_json::json;

    #[test]
    fn parses_transform_changes() {
        let event = EngineEvent::parse(
            TRANSFORM_CHANGED,
            &[
                json!("obj_2"),
                json!({ "position": [1.0, 2.0, 3.0] }),
                json!(4),
            ],
        )
        .unwrap();
        match event {
            EngineEvent::TransformChanged {
                id,
                transform,
                version,
            } => {
                assert_eq!(id, ObjectId::new("obj_2"));
                assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
                assert_eq!(transform.scale, Vec3::ONE);
                assert_eq!(version, Some(ModelVersion(4)));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn malformed_events_are_dropped() {
        assert_eq!(EngineEvent::parse(TRANSFORM_CHANGED, &[json!(3)]), None);
        assert_eq!(EngineEvent::parse("somethingElse", &[]), None);
    }

    #[test]
    fn channel_events_land_in_queue() {
        let (mut channel, handle) = RecordingChannel::new();
        let queue = EngineEventQueue::attach(&mut channel);
        handle.emit("objectSelected", &[json!("obj_1")]);
        handle.emit("objectSelected", &[json!(null)]);
        assert_eq!(
            queue.pop(),
            Some(EngineEvent::SelectObject(Some(ObjectId::new("obj_1"))))
        );
        assert_eq!(queue.pop(), Some(EngineEvent::SelectObject(None)));
        assert_eq!(queue.pop(), None);
    }
}
