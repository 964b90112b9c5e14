//! Active tool and per-gesture state.
//!
//! The tool set is closed. Each pointer gesture runs `Idle -> Dragging -> Idle`;
//! transform tools mutate the scene on every move and record a single history
//! entry when the gesture ends.

mod transform;

pub use transform::{apply_delta, TransformMode};

use crate::binding::PropertyBus;
use crate::history::{
    transform_payload, HistoryLog, SceneEdit, StrokeDab, StrokeKind, StrokeRecord,
    TransformChange,
};
use crate::scene::{ObjectId, SceneGraph, Transform};
use crate::viewport::Projection;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ToolKind {
    #[default]
    Select,
    Move,
    Rotate,
    Scale,
    Brush,
    Erase,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        Self::Select,
        Self::Move,
        Self::Rotate,
        Self::Scale,
        Self::Brush,
        Self::Erase,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Move => "move",
            Self::Rotate => "rotate",
            Self::Scale => "scale",
            Self::Brush => "brush",
            Self::Erase => "erase",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "select" => Some(Self::Select),
            "move" => Some(Self::Move),
            "rotate" => Some(Self::Rotate),
            "scale" => Some(Self::Scale),
            "brush" | "paint" => Some(Self::Brush),
            "erase" | "eraser" => Some(Self::Erase),
            _ => None,
        }
    }

    /// Bare-letter shortcut that activates the tool.
    pub fn shortcut(self) -> char {
        match self {
            Self::Select => 'q',
            Self::Move => 'w',
            Self::Rotate => 'e',
            Self::Scale => 'r',
            Self::Brush => 'b',
            Self::Erase => 'n',
        }
    }

    pub fn from_shortcut(key: char) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        Self::ALL.into_iter().find(|tool| tool.shortcut() == key)
    }

    fn transform_mode(self) -> Option<TransformMode> {
        match self {
            Self::Move => Some(TransformMode::Translate),
            Self::Rotate => Some(TransformMode::Rotate),
            Self::Scale => Some(TransformMode::Scale),
            Self::Select | Self::Brush | Self::Erase => None,
        }
    }

    fn stroke_kind(self) -> Option<StrokeKind> {
        match self {
            Self::Brush => Some(StrokeKind::Brush),
            Self::Erase => Some(StrokeKind::Erase),
            Self::Select | Self::Move | Self::Rotate | Self::Scale => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisConstraint {
    /// Move: X and Y. Rotate: Y. Scale: uniform.
    #[default]
    Free,
    X,
    Y,
    Z,
}

/// Keys a tool listens to while a gesture is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKey {
    X,
    Y,
    Z,
    Shift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// World units (or radians) per pointer pixel.
    pub sensitivity: f32,
    pub min_scale: f32,
    /// Select releases closer than this to the press are clicks, not drags.
    pub click_threshold: f32,
    pub pick_radius: f32,
    pub brush_size: f32,
    pub brush_opacity: f32,
    pub brush_color: String,
    pub eraser_size: f32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            sensitivity: 0.01,
            min_scale: 0.1,
            click_threshold: 3.0,
            pick_radius: 20.0,
            brush_size: 10.0,
            brush_opacity: 1.0,
            brush_color: "#ffffff".to_string(),
            eraser_size: 15.0,
        }
    }
}

/// Everything a gesture may read or write.
pub struct ToolContext<'a> {
    pub scene: &'a mut SceneGraph,
    pub bus: &'a mut PropertyBus,
    pub history: &'a mut HistoryLog<SceneEdit>,
    pub projection: &'a Projection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Transform {
        mode: TransformMode,
        constraint: AxisConstraint,
        /// Transforms of the gesture's objects when it started.
        before: Vec<(ObjectId, Transform)>,
    },
    Marquee,
    Stroke(StrokeRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drag {
    pub anchor: Vec2,
    pub last: Vec2,
    pub gesture: Gesture,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    #[default]
    Idle,
    Dragging(Drag),
}

/// Result of ending a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// A history entry with this label was recorded.
    Committed { label: &'static str },
    /// The select tool asks for this selection (empty clears it).
    SelectionRequested(Vec<ObjectId>),
}

pub struct ToolStateMachine {
    active: ToolKind,
    state: ToolState,
    settings: ToolSettings,
    model: String,
}

impl ToolStateMachine {
    pub fn new(settings: ToolSettings, model: impl Into<String>) -> Self {
        Self {
            active: ToolKind::Select,
            state: ToolState::Idle,
            settings,
            model: model.into(),
        }
    }

    pub fn active(&self) -> ToolKind {
        self.active
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ToolState::Dragging(_))
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Axis constraint of the running transform gesture.
    pub fn constraint(&self) -> Option<AxisConstraint> {
        match &self.state {
            ToolState::Dragging(Drag {
                gesture: Gesture::Transform { constraint, .. },
                ..
            }) => Some(*constraint),
            _ => None,
        }
    }

    /// Switches tools. A running gesture is committed first.
    pub fn set_active(
        &mut self,
        ctx: &mut ToolContext<'_>,
        tool: ToolKind,
    ) -> Option<GestureOutcome> {
        let outcome = self.cancel(ctx);
        if self.active != tool {
            log::info!("Tool: {} -> {}", self.active, tool);
        }
        self.active = tool;
        let path = format!("{}.tools.activeTool", self.model);
        if let Err(err) = ctx.bus.set(&path, tool.name()) {
            log::warn!("{}", err);
        }
        ctx.bus.call("SetActiveTool", &[json!(tool.name())]);
        outcome
    }

    pub fn set_brush_size(&mut self, bus: &mut PropertyBus, size: f32) {
        self.settings.brush_size = size.max(1.0);
        let path = format!("{}.tools.brushSize", self.model);
        if let Err(err) = bus.set(&path, self.settings.brush_size) {
            log::warn!("{}", err);
        }
    }

    pub fn set_brush_opacity(&mut self, bus: &mut PropertyBus, opacity: f32) {
        self.settings.brush_opacity = opacity.clamp(0.0, 1.0);
        let path = format!("{}.tools.brushOpacity", self.model);
        if let Err(err) = bus.set(&path, self.settings.brush_opacity) {
            log::warn!("{}", err);
        }
    }

    /// Starts a gesture. Returns whether the tool took the press.
    pub fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, at: Vec2) -> bool {
        if self.is_dragging() {
            return false;
        }
        let gesture = if let Some(mode) = self.active.transform_mode() {
            let before: Vec<(ObjectId, Transform)> = ctx
                .scene
                .selection()
                .iter()
                .filter_map(|id| ctx.scene.get(id))
                .map(|object| (object.id.clone(), object.transform))
                .collect();
            if before.is_empty() {
                return false;
            }
            Gesture::Transform {
                mode,
                constraint: AxisConstraint::Free,
                before,
            }
        } else if let Some(kind) = self.active.stroke_kind() {
            let mut stroke = StrokeRecord {
                kind,
                dabs: Vec::new(),
            };
            self.dab(ctx, &mut stroke, Vec2::ZERO);
            Gesture::Stroke(stroke)
        } else {
            Gesture::Marquee
        };
        log::debug!("{} gesture started at {:?}", self.active, at);
        self.state = ToolState::Dragging(Drag {
            anchor: at,
            last: at,
            gesture,
        });
        true
    }

    pub fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, at: Vec2) {
        let mut state = std::mem::take(&mut self.state);
        if let ToolState::Dragging(drag) = &mut state {
            let delta = at - drag.last;
            drag.last = at;
            match &mut drag.gesture {
                Gesture::Transform {
                    mode,
                    constraint,
                    before,
                } => self.transform_step(ctx, *mode, *constraint, before, delta),
                Gesture::Marquee => {}
                Gesture::Stroke(stroke) => self.dab(ctx, stroke, delta),
            }
        }
        self.state = state;
    }

    /// Ends the gesture at `at`.
    pub fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, at: Vec2) -> Option<GestureOutcome> {
        let ToolState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return None;
        };
        match drag.gesture {
            Gesture::Transform { mode, before, .. } => {
                let changes: Vec<TransformChange> = before
                    .into_iter()
                    .filter_map(|(id, before)| {
                        let after = ctx.scene.get(&id)?.transform;
                        Some(TransformChange { id, before, after })
                    })
                    .collect();
                let label = mode.history_label();
                ctx.history.record(label, SceneEdit::Transform(changes));
                Some(GestureOutcome::Committed { label })
            }
            Gesture::Stroke(stroke) => {
                let label = match stroke.kind {
                    StrokeKind::Brush => "Paint Stroke",
                    StrokeKind::Erase => "Erase Stroke",
                };
                ctx.history.record(label, SceneEdit::Stroke(stroke));
                Some(GestureOutcome::Committed { label })
            }
            Gesture::Marquee => {
                if drag.anchor.distance(at) <= self.settings.click_threshold {
                    let hit = ctx
                        .projection
                        .pick(ctx.scene.mirror(), at, self.settings.pick_radius)
                        .map(|entry| entry.id.clone());
                    Some(GestureOutcome::SelectionRequested(hit.into_iter().collect()))
                } else {
                    let ids = ctx
                        .projection
                        .objects_in_rect(ctx.scene.mirror(), drag.anchor, at);
                    (!ids.is_empty()).then_some(GestureOutcome::SelectionRequested(ids))
                }
            }
        }
    }

    /// Lost pointer capture: ends the gesture where the pointer last was.
    pub fn cancel(&mut self, ctx: &mut ToolContext<'_>) -> Option<GestureOutcome> {
        let last = match &self.state {
            ToolState::Dragging(drag) => drag.last,
            ToolState::Idle => return None,
        };
        self.pointer_up(ctx, last)
    }

    /// Feeds a modifier key to the running gesture. Returns whether it was used.
    pub fn key_down(&mut self, key: ToolKey) -> bool {
        let ToolState::Dragging(Drag {
            gesture: Gesture::Transform {
                mode, constraint, ..
            },
            ..
        }) = &mut self.state
        else {
            return false;
        };
        let next = match (key, *mode) {
            (ToolKey::X, _) => AxisConstraint::X,
            (ToolKey::Y, _) => AxisConstraint::Y,
            (ToolKey::Z, _) => AxisConstraint::Z,
            (ToolKey::Shift, TransformMode::Scale) => AxisConstraint::Free,
            (ToolKey::Shift, _) => return false,
        };
        log::debug!("Constraint {:?} -> {:?}", constraint, next);
        *constraint = next;
        true
    }

    fn transform_step(
        &self,
        ctx: &mut ToolContext<'_>,
        mode: TransformMode,
        constraint: AxisConstraint,
        objects: &[(ObjectId, Transform)],
        delta: Vec2,
    ) {
        let single = objects.len() == 1;
        let mut payload = Vec::with_capacity(objects.len());
        for (id, _) in objects {
            let mut updated = None;
            let result = ctx.scene.update(id, |object| {
                object.transform =
                    apply_delta(object.transform, mode, constraint, delta, &self.settings);
                updated = Some(object.transform);
            });
            if let Err(err) = result {
                log::debug!("Gesture target vanished: {}", err);
                continue;
            }
            let Some(transform) = updated else { continue };
            payload.push(transform_payload(id, &transform));
            if single {
                let path = format!("{}.transform.{}", self.model, mode.field());
                if let Err(err) = ctx.bus.set(&path, mode.component(&transform)) {
                    log::warn!("{}", err);
                }
            }
        }
        if !payload.is_empty() {
            ctx.bus
                .call("UpdateObjectTransforms", &[Value::Array(payload)]);
        }
    }

    fn dab(&self, ctx: &mut ToolContext<'_>, stroke: &mut StrokeRecord, delta: Vec2) {
        let payload = match stroke.kind {
            StrokeKind::Brush => json!({
                "size": self.settings.brush_size,
                "opacity": self.settings.brush_opacity,
                "color": self.settings.brush_color,
                "deltaX": delta.x,
                "deltaY": delta.y,
            }),
            StrokeKind::Erase => json!({
                "size": self.settings.eraser_size,
                "deltaX": delta.x,
                "deltaY": delta.y,
            }),
        };
        ctx.bus
            .call(stroke.kind.engine_call(), std::slice::from_ref(&payload));
        stroke.dabs.push(StrokeDab { payload });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{ModelValue, RecordingChannel};
    use crate::scene::ObjectSpec;
    use approx::assert_relative_eq;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Rig {
        scene: SceneGraph,
        bus: PropertyBus,
        history: HistoryLog<SceneEdit>,
        projection: Projection,
        tools: ToolStateMachine,
    }

    impl Rig {
        fn new(bus: PropertyBus) -> Self {
            Self {
                scene: SceneGraph::new(),
                bus,
                history: HistoryLog::new(10),
                projection: Projection::new(800.0, 600.0, 50.0),
                tools: ToolStateMachine::new(ToolSettings::default(), "editorModel"),
            }
        }

        fn with<R>(&mut self, f: impl FnOnce(&mut ToolStateMachine, &mut ToolContext<'_>) -> R) -> R {
            let mut ctx = ToolContext {
                scene: &mut self.scene,
                bus: &mut self.bus,
                history: &mut self.history,
                projection: &self.projection,
            };
            f(&mut self.tools, &mut ctx)
        }

        fn drag(&mut self, points: &[Vec2]) -> Option<GestureOutcome> {
            let first = *points.first()?;
            let last = *points.last()?;
            self.with(|tools, ctx| {
                tools.pointer_down(ctx, first);
                for point in &points[1..] {
                    tools.pointer_move(ctx, *point);
                }
                tools.pointer_up(ctx, last)
            })
        }
    }

    #[test]
    fn transform_tools_need_a_selection() {
        let mut rig = Rig::new(PropertyBus::new());
        rig.with(|tools, ctx| tools.set_active(ctx, ToolKind::Move));
        let started = rig.with(|tools, ctx| tools.pointer_down(ctx, Vec2::ZERO));
        assert!(!started);
        assert_eq!(rig.tools.state(), &ToolState::Idle);
        assert!(rig.history.is_empty());
    }

    #[test]
    fn move_gesture_records_one_entry_and_sets_binding_per_move() {
        let mut rig = Rig::new(PropertyBus::new());
        let sphere = rig.scene.add(ObjectSpec::named("Sphere"));
        rig.scene.select([sphere.id.clone()]);
        let sets = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&sets);
        rig.bus
            .subscribe("editorModel.transform.position", move |_, _| {
                *counter.borrow_mut() += 1
            })
            .unwrap();
        rig.with(|tools, ctx| tools.set_active(ctx, ToolKind::Move));

        let outcome = rig.drag(&[
            Vec2::new(100.0, 100.0),
            Vec2::new(103.0, 100.0),
            Vec2::new(103.0, 102.0),
        ]);

        assert_eq!(
            outcome,
            Some(GestureOutcome::Committed {
                label: "Move Objects"
            })
        );
        let position = rig.scene.get(&sphere.id).unwrap().transform.position;
        assert_relative_eq!(position.x, 0.03, epsilon = 1e-6);
        assert_relative_eq!(position.y, -0.02, epsilon = 1e-6);
        assert_eq!(*sets.borrow(), 2);
        assert_eq!(rig.history.labels(), ["Move Objects"]);
    }

    #[test]
    fn axis_key_narrows_move() {
        let mut rig = Rig::new(PropertyBus::new());
        let cube = rig.scene.add(ObjectSpec::named("Cube"));
        rig.scene.select([cube.id.clone()]);
        rig.with(|tools, ctx| {
            tools.set_active(ctx, ToolKind::Move);
            tools.pointer_down(ctx, Vec2::ZERO);
        });
        assert!(rig.tools.key_down(ToolKey::Z));
        assert_eq!(rig.tools.constraint(), Some(AxisConstraint::Z));
        rig.with(|tools, ctx| {
            tools.pointer_move(ctx, Vec2::new(10.0, 10.0));
            tools.pointer_up(ctx, Vec2::new(10.0, 10.0));
        });
        let position = rig.scene.get(&cube.id).unwrap().transform.position;
        assert_relative_eq!(position.z, 0.1, epsilon = 1e-6);
        assert_eq!(position.x, 0.0);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn multi_selection_moves_all_without_touching_binding() {
        let mut rig = Rig::new(PropertyBus::new());
        let a = rig.scene.add(ObjectSpec::named("A"));
        let b = rig.scene.add(ObjectSpec::named("B"));
        rig.scene.select([a.id.clone(), b.id.clone()]);
        rig.with(|tools, ctx| tools.set_active(ctx, ToolKind::Move));
        rig.drag(&[Vec2::ZERO, Vec2::new(50.0, 0.0)]);

        for id in [&a.id, &b.id] {
            assert_relative_eq!(rig.scene.get(id).unwrap().transform.position.x, 0.5, epsilon = 1e-6);
            assert_relative_eq!(rig.scene.mirror().get(id).unwrap().position.x, 0.5, epsilon = 1e-6);
        }
        assert_eq!(rig.bus.get("editorModel.transform.position").unwrap(), None);
    }

    #[test]
    fn scale_clamps_and_shift_restores_uniform() {
        let mut rig = Rig::new(PropertyBus::new());
        let cube = rig.scene.add(ObjectSpec::named("Cube"));
        rig.scene.select([cube.id.clone()]);
        rig.with(|tools, ctx| {
            tools.set_active(ctx, ToolKind::Scale);
            tools.pointer_down(ctx, Vec2::ZERO);
        });
        rig.tools.key_down(ToolKey::X);
        rig.with(|tools, ctx| tools.pointer_move(ctx, Vec2::new(-500.0, 0.0)));
        let scale = rig.scene.get(&cube.id).unwrap().transform.scale;
        assert_relative_eq!(scale.x, 0.1, epsilon = 1e-6);
        assert_eq!(scale.y, 1.0);

        assert!(rig.tools.key_down(ToolKey::Shift));
        rig.with(|tools, ctx| tools.pointer_move(ctx, Vec2::new(-450.0, 0.0)));
        let scale = rig.scene.get(&cube.id).unwrap().transform.scale;
        assert_relative_eq!(scale.x, 0.6, epsilon = 1e-5);
        assert_eq!(scale.x, scale.y);
        assert_eq!(scale.y, scale.z);
        let bound = rig.bus.get("editorModel.transform.scale").unwrap().cloned();
        assert_eq!(bound.and_then(|v| v.as_vec3()), Some(scale));
    }

    #[test]
    fn rotate_defaults_to_y_axis() {
        let mut rig = Rig::new(PropertyBus::new());
        let cube = rig.scene.add(ObjectSpec::named("Cube"));
        rig.scene.select([cube.id.clone()]);
        rig.with(|tools, ctx| tools.set_active(ctx, ToolKind::Rotate));
        rig.drag(&[Vec2::ZERO, Vec2::new(100.0, 40.0)]);
        let rotation = rig.scene.get(&cube.id).unwrap().transform.rotation;
        assert_relative_eq!(rotation.y, 1.0, epsilon = 1e-6);
        assert_eq!(rotation.x, 0.0);
        assert_eq!(rig.history.labels(), ["Rotate Objects"]);
    }

    #[test]
    fn brush_stroke_is_one_entry_with_a_call_per_dab() {
        let (channel, handle) = RecordingChannel::new();
        let mut rig = Rig::new(PropertyBus::with_channel(Box::new(channel)));
        rig.with(|tools, ctx| tools.set_active(ctx, ToolKind::Brush));
        rig.drag(&[Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)]);

        let calls = handle.calls_named("ApplyBrush");
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0][0]["deltaX"], 0.0);
        assert_eq!(calls[1][0]["deltaX"], 1.0);
        assert_eq!(rig.history.labels(), ["Paint Stroke"]);
        assert_eq!(rig.scene.object_count(), 0);
    }

    #[test]
    fn select_click_picks_and_miss_clears() {
        let mut rig = Rig::new(PropertyBus::new());
        let cube = rig.scene.add(ObjectSpec::named("Cube").at(Vec3::new(1.0, 0.0, 0.0)));
        // (1, 0) projects to (450, 300).
        let hit = rig.drag(&[Vec2::new(451.0, 301.0), Vec2::new(452.0, 301.0)]);
        assert_eq!(hit, Some(GestureOutcome::SelectionRequested(vec![cube.id.clone()])));

        let miss = rig.drag(&[Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0)]);
        assert_eq!(miss, Some(GestureOutcome::SelectionRequested(Vec::new())));
        assert!(rig.history.is_empty());
    }

    #[test]
    fn empty_marquee_requests_nothing() {
        let mut rig = Rig::new(PropertyBus::new());
        let cube = rig.scene.add(ObjectSpec::named("Cube"));
        let boxed = rig.drag(&[Vec2::new(350.0, 250.0), Vec2::new(450.0, 350.0)]);
        assert_eq!(boxed, Some(GestureOutcome::SelectionRequested(vec![cube.id.clone()])));
        let empty = rig.drag(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0)]);
        assert_eq!(empty, None);
    }

    #[test]
    fn switching_tools_commits_the_running_gesture() {
        let mut rig = Rig::new(PropertyBus::new());
        let cube = rig.scene.add(ObjectSpec::named("Cube"));
        rig.scene.select([cube.id.clone()]);
        let outcome = rig.with(|tools, ctx| {
            tools.set_active(ctx, ToolKind::Move);
            tools.pointer_down(ctx, Vec2::ZERO);
            tools.pointer_move(ctx, Vec2::new(10.0, 0.0));
            tools.set_active(ctx, ToolKind::Rotate)
        });
        assert_eq!(
            outcome,
            Some(GestureOutcome::Committed {
                label: "Move Objects"
            })
        );
        assert_eq!(rig.tools.active(), ToolKind::Rotate);
        assert_eq!(
            rig.bus.get("editorModel.tools.activeTool").unwrap(),
            Some(&ModelValue::from("rotate"))
        );
    }

    #[test]
    fn shortcuts_and_names_agree() {
        for tool in ToolKind::ALL {
            assert_eq!(ToolKind::from_shortcut(tool.shortcut()), Some(tool));
            assert_eq!(ToolKind::parse(tool.name()), Some(tool));
        }
        assert_eq!(ToolKind::parse("lasso"), None);
    }
}
