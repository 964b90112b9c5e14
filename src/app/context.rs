use super::engine_events::{EngineEvent, EngineEventQueue};
use super::EditorError;
use crate::binding::{BindingPath, EngineChannel, ModelValue, PropertyBus};
use crate::camera::{CameraRig, ViewPreset};
use crate::config::EditorConfig;
use crate::console::{ConsoleCommand, ConsoleLog, LineKind, HELP_TEXT};
use crate::history::{EditTarget, HistoryLog, RemovedObject, Reversible, SceneEdit};
use crate::input::{map_shortcut, EditorAction, InputState, KeyEvent, PointerEvent, PointerTarget};
use crate::scene::serialization::{load_scene_from_file, save_scene_to_file};
use crate::scene::{
    Material, ObjectCategory, ObjectId, ObjectSpec, SceneError, SceneGraph, SceneObject, Transform,
};
use crate::tools::{GestureOutcome, ToolContext, ToolKind, ToolStateMachine};
use crate::viewport::timing::FrameTiming;
use crate::viewport::Projection;
use glam::Vec3;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Instant;

pub type Result<T> = std::result::Result<T, EditorError>;

/// What the host should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Handled,
    /// Ctrl/Cmd+S: the host owns file dialogs.
    SaveRequested,
}

/// One editing session: the scene, its history, the bound model and the
/// interaction state that drives them.
pub struct EditorContext {
    config: EditorConfig,
    model: String,
    bus: PropertyBus,
    scene: SceneGraph,
    history: HistoryLog<SceneEdit>,
    tools: ToolStateMachine,
    camera: CameraRig,
    projection: Projection,
    input: InputState,
    clipboard: Vec<SceneObject>,
    console: ConsoleLog,
    timing: FrameTiming,
    events: Option<EngineEventQueue>,
    /// Selection last announced to the engine.
    engine_selection: Vec<ObjectId>,
}

impl EditorContext {
    /// Session without an engine; outbound calls are only logged.
    pub fn new(config: EditorConfig) -> Result<Self> {
        Self::build(config, PropertyBus::new(), None)
    }

    pub fn with_channel(config: EditorConfig, mut channel: Box<dyn EngineChannel>) -> Result<Self> {
        let events = EngineEventQueue::attach(channel.as_mut());
        Self::build(config, PropertyBus::with_channel(channel), Some(events))
    }

    fn build(
        config: EditorConfig,
        mut bus: PropertyBus,
        events: Option<EngineEventQueue>,
    ) -> Result<Self> {
        let model = config.model_name.clone();
        bus.create_model(&model, initial_model(&config))?;
        log::info!(
            "Editor session ready (model '{}', history {})",
            model,
            config.history_capacity
        );
        Ok(Self {
            scene: SceneGraph::with_duplicate_offset(config.duplicate_offset),
            history: HistoryLog::new(config.history_capacity),
            tools: ToolStateMachine::new(config.tools.clone(), model.clone()),
            camera: CameraRig::new(config.camera.clone()),
            projection: config.viewport.projection(),
            input: InputState::default(),
            clipboard: Vec::new(),
            console: ConsoleLog::default(),
            timing: FrameTiming::new(Instant::now()),
            events,
            engine_selection: Vec::new(),
            model,
            bus,
            config,
        })
    }

    /// Seeds a camera and a light. Not recorded in history.
    pub fn with_default_scene(mut self) -> Self {
        self.scene.add(
            ObjectSpec::named("Main Camera")
                .category(ObjectCategory::Camera)
                .at(Vec3::new(0.0, 2.0, 5.0)),
        );
        self.scene.add(
            ObjectSpec::named("Directional Light")
                .category(ObjectCategory::Light)
                .at(Vec3::new(5.0, 10.0, 5.0)),
        );
        self.publish_scene_state();
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn bus(&self) -> &PropertyBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut PropertyBus {
        &mut self.bus
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn history(&self) -> &HistoryLog<SceneEdit> {
        &self.history
    }

    pub fn tools(&self) -> &ToolStateMachine {
        &self.tools
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    pub fn clipboard(&self) -> &[SceneObject] {
        &self.clipboard
    }

    // ----- editing -----

    pub fn add_object(&mut self, spec: ObjectSpec) -> SceneObject {
        self.finish_gesture();
        let object = self.scene.add(spec);
        self.history
            .record("Add Object", SceneEdit::Insert(vec![object.clone()]));
        self.publish_scene_state();
        log::info!("Added {} '{}'", object.id, object.name);
        object
    }

    /// Removes every selected object as one history entry.
    pub fn delete_selected(&mut self) -> usize {
        self.finish_gesture();
        let ids: Vec<ObjectId> = self.scene.selection().iter().cloned().collect();
        let removed: Vec<RemovedObject> = ids
            .iter()
            .filter_map(|id| self.scene.remove(id))
            .map(|(index, object)| RemovedObject { index, object })
            .collect();
        if removed.is_empty() {
            return 0;
        }
        let count = removed.len();
        self.history
            .record("Delete Objects", SceneEdit::Remove(removed));
        self.publish_scene_state();
        log::info!("Deleted {} object(s)", count);
        count
    }

    /// Duplicates the selection and selects the copies.
    pub fn duplicate_selected(&mut self) -> Vec<ObjectId> {
        self.finish_gesture();
        let ids: Vec<ObjectId> = self.scene.selection().iter().cloned().collect();
        let mut copies = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.scene.duplicate(id) {
                Ok(copy) => copies.push(copy),
                Err(err) => log::warn!("Duplicate skipped: {}", err),
            }
        }
        self.commit_inserted("Duplicate Objects", copies)
    }

    pub fn copy_selected(&mut self) -> usize {
        self.clipboard = self
            .scene
            .selection()
            .iter()
            .filter_map(|id| self.scene.get(id))
            .cloned()
            .collect();
        log::info!("Copied {} object(s)", self.clipboard.len());
        self.clipboard.len()
    }

    /// Inserts fresh copies of the clipboard, offset from the copied objects.
    /// Repeated pastes keep stepping by the same offset.
    pub fn paste(&mut self) -> Vec<ObjectId> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        self.finish_gesture();
        let offset = self.config.duplicate_offset;
        let mut pasted = Vec::with_capacity(self.clipboard.len());
        for source in &mut self.clipboard {
            source.transform.position += offset;
            let spec = ObjectSpec {
                name: Some(source.name.clone()),
                category: source.category,
                position: Some(source.transform.position),
                rotation: Some(source.transform.rotation),
                scale: Some(source.transform.scale),
                material: Some(source.material.clone()),
                visible: Some(source.visible),
            };
            pasted.push(self.scene.add(spec));
        }
        self.commit_inserted("Paste Objects", pasted)
    }

    fn commit_inserted(&mut self, label: &str, objects: Vec<SceneObject>) -> Vec<ObjectId> {
        if objects.is_empty() {
            return Vec::new();
        }
        let ids: Vec<ObjectId> = objects.iter().map(|object| object.id.clone()).collect();
        self.history.record(label, SceneEdit::Insert(objects));
        self.scene.select(ids.iter().cloned());
        self.publish_scene_state();
        log::info!("{}: {}", label, ids.len());
        ids
    }

    /// Selects exactly one object. Unknown ids leave the selection alone.
    pub fn select_object(&mut self, id: &str) -> Result<()> {
        let Some(object) = self.scene.get_str(id) else {
            return Err(SceneError::NotFound(ObjectId::new(id)).into());
        };
        let id = object.id.clone();
        self.select_objects([id]);
        Ok(())
    }

    /// Replaces the selection; unknown ids are dropped.
    pub fn select_objects<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let count = self.scene.select(ids).len();
        self.publish_scene_state();
        count
    }

    pub fn clear_selection(&mut self) {
        self.scene.clear_selection();
        self.publish_scene_state();
    }

    /// Writes a value into the bound model. Edits under `transform` or
    /// `material` of the editor model are applied to the single selected
    /// object and recorded; they are checked against the object before the
    /// bus sees them.
    pub fn edit_property(&mut self, path: &str, value: impl Into<ModelValue>) -> Result<()> {
        let path = BindingPath::parse(path)?;
        let value = value.into();
        let segments = path.property_segments();
        let section = segments.first().copied();
        if path.model() != self.model || !matches!(section, Some("transform" | "material")) {
            self.bus.set_path(&path, value);
            return Ok(());
        }
        let rejected = |reason: &'static str| EditorError::InvalidEdit {
            path: path.as_str().to_string(),
            reason,
        };
        let Some(before) = self.scene.single_selected().cloned() else {
            return Err(rejected("select exactly one object"));
        };
        let candidate = self
            .bus
            .model(&self.model)
            .map_or_else(ModelValue::empty_map, |root| {
                root.with_path(&segments, value.clone())
            });
        let mut after = before.clone();
        match section {
            Some("transform") => {
                after.transform = read_transform(&candidate)
                    .ok_or_else(|| rejected("expected {x, y, z} vectors"))?;
            }
            _ => {
                after.material = read_material(&candidate)
                    .ok_or_else(|| rejected("expected albedo text and numeric factors"))?;
            }
        }

        self.bus.set_path(&path, value);
        if after != before {
            let edit = SceneEdit::Replace { before, after };
            edit.apply(&mut EditTarget {
                scene: &mut self.scene,
                bus: &mut self.bus,
            });
            self.history.record("Edit Properties", edit);
        }
        // Republish so clamped factors read back as stored.
        self.publish_scene_state();
        Ok(())
    }

    pub fn undo(&mut self) -> Option<String> {
        self.finish_gesture();
        let label = self
            .history
            .undo(&mut EditTarget {
                scene: &mut self.scene,
                bus: &mut self.bus,
            })
            .map(str::to_string);
        match &label {
            Some(label) => {
                log::info!("Undid: {}", label);
                self.publish_scene_state();
            }
            None => log::debug!("Nothing to undo"),
        }
        label
    }

    pub fn redo(&mut self) -> Option<String> {
        self.finish_gesture();
        let label = self
            .history
            .redo(&mut EditTarget {
                scene: &mut self.scene,
                bus: &mut self.bus,
            })
            .map(str::to_string);
        match &label {
            Some(label) => {
                log::info!("Redid: {}", label);
                self.publish_scene_state();
            }
            None => log::debug!("Nothing to redo"),
        }
        label
    }

    pub fn set_active_tool(&mut self, tool: ToolKind) {
        if self.input.captured() == Some(PointerTarget::Tool) {
            self.input.release();
        }
        let (tools, mut ctx) = self.tool_parts();
        let outcome = tools.set_active(&mut ctx, tool);
        self.apply_outcome(outcome);
    }

    pub fn set_brush_size(&mut self, size: f32) {
        self.tools.set_brush_size(&mut self.bus, size);
    }

    pub fn set_brush_opacity(&mut self, opacity: f32) {
        self.tools.set_brush_opacity(&mut self.bus, opacity);
    }

    // ----- input -----

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                button,
                position,
                modifiers,
            } => match self.input.press(button, modifiers) {
                Some(PointerTarget::Tool) => {
                    let (tools, mut ctx) = self.tool_parts();
                    if !tools.pointer_down(&mut ctx, position) {
                        self.input.release();
                    }
                }
                Some(PointerTarget::Camera(mode)) => self.camera.begin_drag(mode, position),
                None => {}
            },
            PointerEvent::Move { position } => match self.input.captured() {
                Some(PointerTarget::Tool) => {
                    let (tools, mut ctx) = self.tool_parts();
                    tools.pointer_move(&mut ctx, position);
                }
                Some(PointerTarget::Camera(_)) => {
                    self.camera.drag_to(position);
                }
                None => {}
            },
            PointerEvent::Up { position } => match self.input.release() {
                Some(PointerTarget::Tool) => {
                    let (tools, mut ctx) = self.tool_parts();
                    let outcome = tools.pointer_up(&mut ctx, position);
                    self.apply_outcome(outcome);
                }
                Some(PointerTarget::Camera(_)) => {
                    self.camera.end_drag();
                }
                None => {}
            },
            PointerEvent::Wheel { delta_y } => self.camera.wheel(delta_y),
            PointerEvent::CaptureLost => match self.input.release() {
                Some(PointerTarget::Tool) => {
                    let (tools, mut ctx) = self.tool_parts();
                    let outcome = tools.cancel(&mut ctx);
                    self.apply_outcome(outcome);
                }
                Some(PointerTarget::Camera(_)) => {
                    self.camera.end_drag();
                }
                None => {}
            },
        }
    }

    /// Keyboard shortcuts. Nothing is consumed while a text field has focus.
    pub fn handle_key(&mut self, event: KeyEvent, text_field_focused: bool) -> KeyOutcome {
        if text_field_focused {
            return KeyOutcome::Ignored;
        }
        let Some(action) = map_shortcut(event, self.tools.is_dragging()) else {
            return KeyOutcome::Ignored;
        };
        match action {
            EditorAction::Undo => {
                self.undo();
            }
            EditorAction::Redo => {
                self.redo();
            }
            EditorAction::Copy => {
                self.copy_selected();
            }
            EditorAction::Paste => {
                self.paste();
            }
            EditorAction::Duplicate => {
                self.duplicate_selected();
            }
            EditorAction::Save => return KeyOutcome::SaveRequested,
            EditorAction::DeleteSelection => {
                self.delete_selected();
            }
            EditorAction::FrameSelection => {
                self.frame_selection();
            }
            EditorAction::SetTool(tool) => self.set_active_tool(tool),
            EditorAction::Gesture(key) => {
                if !self.tools.key_down(key) {
                    return KeyOutcome::Ignored;
                }
            }
        }
        KeyOutcome::Handled
    }

    fn tool_parts(&mut self) -> (&mut ToolStateMachine, ToolContext<'_>) {
        (
            &mut self.tools,
            ToolContext {
                scene: &mut self.scene,
                bus: &mut self.bus,
                history: &mut self.history,
                projection: &self.projection,
            },
        )
    }

    fn apply_outcome(&mut self, outcome: Option<GestureOutcome>) {
        match outcome {
            Some(GestureOutcome::Committed { label }) => log::debug!("Committed '{}'", label),
            Some(GestureOutcome::SelectionRequested(ids)) => {
                self.select_objects(ids);
            }
            None => {}
        }
    }

    /// Commits a running tool gesture before another edit lands.
    fn finish_gesture(&mut self) {
        if !self.tools.is_dragging() {
            return;
        }
        if self.input.captured() == Some(PointerTarget::Tool) {
            self.input.release();
        }
        let (tools, mut ctx) = self.tool_parts();
        let outcome = tools.cancel(&mut ctx);
        self.apply_outcome(outcome);
    }

    // ----- camera and frames -----

    pub fn set_view_preset(&mut self, preset: ViewPreset) {
        self.camera.set_preset(preset);
        self.publish("viewport.camera", ModelValue::from(preset.name()));
    }

    /// Frames the selection, or the whole scene when nothing is selected.
    pub fn frame_selection(&mut self) -> bool {
        let framed = if self.scene.selection().is_empty() {
            self.camera.frame_objects(self.scene.objects())
        } else {
            let scene = &self.scene;
            self.camera
                .frame_objects(scene.selection().iter().filter_map(|id| scene.get(id)))
        };
        if !framed {
            log::debug!("Nothing to frame");
        }
        framed
    }

    /// Per-frame tick. Publishes FPS whenever a new figure is available.
    pub fn frame(&mut self, now: Instant) -> Option<f32> {
        let fps = self.timing.update(now)?;
        self.publish("viewport.fps", ModelValue::from(fps.round()));
        Some(fps)
    }

    // ----- persistence -----

    pub fn save_scene(&self) -> Result<String> {
        Ok(self.scene.serialize()?)
    }

    /// Replaces the scene from a document. History is cleared on success; on
    /// failure nothing changes.
    pub fn load_scene(&mut self, document: &str) -> Result<()> {
        self.finish_gesture();
        self.scene.deserialize(document)?;
        self.scene_replaced();
        Ok(())
    }

    pub fn save_scene_to(&self, path: &Path) -> Result<()> {
        save_scene_to_file(&self.scene, path)?;
        Ok(())
    }

    pub fn load_scene_from(&mut self, path: &Path) -> Result<()> {
        self.finish_gesture();
        load_scene_from_file(&mut self.scene, path)?;
        self.scene_replaced();
        Ok(())
    }

    pub fn clear_scene(&mut self) {
        self.finish_gesture();
        self.scene.clear();
        self.scene_replaced();
    }

    fn scene_replaced(&mut self) {
        self.history.clear();
        self.publish_scene_state();
        log::info!("Scene now holds {} object(s)", self.scene.object_count());
    }

    // ----- engine -----

    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::SceneChanged(document) => self.load_scene(&document)?,
            EngineEvent::TransformChanged {
                id,
                transform,
                version,
            } => {
                let local = self.bus.version(&self.model);
                let based_on = version.unwrap_or(local);
                if based_on < local {
                    log::warn!(
                        "Dropping stale transform for {} (v{} < v{})",
                        id,
                        based_on.0,
                        local.0
                    );
                    return Ok(());
                }
                self.scene.set_transform(&id, transform)?;
                if self.scene.single_selected().map(|object| &object.id) == Some(&id) {
                    let path = format!("{}.transform", self.model);
                    self.bus
                        .apply_remote(&path, transform_value(&transform), based_on)?;
                }
            }
            EngineEvent::SelectObject(id) => {
                match id {
                    Some(id) => {
                        self.scene.select([id]);
                    }
                    None => self.scene.clear_selection(),
                }
                // The engine already knows.
                self.engine_selection = self.scene.selection().iter().cloned().collect();
                self.publish_scene_state();
            }
        }
        Ok(())
    }

    /// Handles every queued engine event. Returns how many were handled.
    pub fn pump_engine_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.events.as_ref().and_then(EngineEventQueue::pop) {
            if let Err(err) = self.handle_engine_event(event) {
                log::warn!("Engine event failed: {}", err);
            }
            handled += 1;
        }
        handled
    }

    // ----- console -----

    /// Runs one console line and returns the response that was logged.
    pub fn execute_command(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.console.push(LineKind::Command, format!("> {line}"));
        let (kind, text) = match ConsoleCommand::parse(line) {
            Ok(Some(command)) => match self.run_command(command) {
                Ok(text) => (LineKind::Info, text),
                Err(err) => (LineKind::Error, format!("Error: {err}")),
            },
            Ok(None) => return None,
            Err(err) => (LineKind::Error, err.to_string()),
        };
        self.console.push(kind, text.clone());
        Some(text)
    }

    fn run_command(&mut self, command: ConsoleCommand) -> Result<String> {
        let text = match command {
            ConsoleCommand::Help => HELP_TEXT.to_string(),
            ConsoleCommand::Clear => {
                self.console.clear();
                "Console cleared".to_string()
            }
            ConsoleCommand::Select(id) => {
                self.select_object(&id)?;
                format!("Selected object: {id}")
            }
            ConsoleCommand::Delete => {
                let count = self.delete_selected();
                format!("Deleted {count} object(s)")
            }
            ConsoleCommand::Add(name) => {
                let object = self.add_object(ObjectSpec::named(name.as_str()));
                format!("Added {} to scene as {}", name, object.id)
            }
            ConsoleCommand::Undo => match self.undo() {
                Some(label) => format!("Undid: {label}"),
                None => "Nothing to undo".to_string(),
            },
            ConsoleCommand::Redo => match self.redo() {
                Some(label) => format!("Redid: {label}"),
                None => "Nothing to redo".to_string(),
            },
            ConsoleCommand::Tool(name) => {
                let tool = ToolKind::parse(&name).ok_or(EditorError::UnknownTool(name))?;
                self.set_active_tool(tool);
                format!("Active tool: {tool}")
            }
            ConsoleCommand::List => self.list_objects(),
            ConsoleCommand::Save(path) => {
                self.save_scene_to(&path)?;
                format!("Saved scene to {}", path.display())
            }
            ConsoleCommand::Load(path) => {
                self.load_scene_from(&path)?;
                format!(
                    "Loaded {} object(s) from {}",
                    self.scene.object_count(),
                    path.display()
                )
            }
            ConsoleCommand::View(name) => {
                let preset = ViewPreset::parse(&name).ok_or(EditorError::UnknownView(name))?;
                self.set_view_preset(preset);
                format!("View: {preset}")
            }
        };
        Ok(text)
    }

    fn list_objects(&self) -> String {
        if self.scene.object_count() == 0 {
            return "Scene is empty".to_string();
        }
        self.scene
            .objects()
            .map(|object| {
                let marker = if self.scene.is_selected(&object.id) { " *" } else { "" };
                format!("{} {} ({}){}", object.id, object.name, object.category, marker)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ----- model publication -----

    fn publish(&mut self, suffix: &str, value: ModelValue) {
        let path = format!("{}.{}", self.model, suffix);
        if let Err(err) = self.bus.set(&path, value) {
            log::warn!("{}", err);
        }
    }

    /// Mirrors selection, the single-selection properties and the object
    /// count into the bound model, and tells the engine about selection
    /// changes.
    fn publish_scene_state(&mut self) {
        let selection: Vec<ObjectId> = self.scene.selection().iter().cloned().collect();
        let single = self.scene.single_selected().cloned();

        self.publish(
            "selection.selectedObjects",
            ModelValue::list(selection.iter().map(|id| ModelValue::from(id.as_str()))),
        );
        self.publish(
            "selection.selectedObject",
            ModelValue::from(single.as_ref().map(|object| object.id.as_str())),
        );
        if let Some(object) = &single {
            self.publish("transform", transform_value(&object.transform));
            self.publish("material", material_value(&object.material));
        }
        self.publish(
            "viewport.objectCount",
            ModelValue::from(self.scene.object_count()),
        );

        if selection != self.engine_selection {
            match selection.as_slice() {
                [] => self.bus.call("SelectObject", &[Value::Null]),
                [id] => self.bus.call("SelectObject", &[json!(id.as_str())]),
                many => {
                    let ids: Vec<&str> = many.iter().map(ObjectId::as_str).collect();
                    self.bus.call("SelectObjects", &[json!(ids)]);
                }
            }
            self.engine_selection = selection;
        }
    }
}

/// Reads the `transform` section of an editor model. Every field must be a vector.
fn read_transform(model: &ModelValue) -> Option<Transform> {
    let field = |name: &str| model.at_path(&["transform", name])?.as_vec3();
    Some(Transform {
        position: field("position")?,
        rotation: field("rotation")?,
        scale: field("scale")?,
    })
}

fn read_material(model: &ModelValue) -> Option<Material> {
    let factor = |name: &str| {
        let value = model.at_path(&["material", name])?.as_f64()?;
        Some((value as f32).clamp(0.0, 1.0))
    };
    Some(Material {
        albedo: model.at_path(&["material", "albedo"])?.as_str()?.to_string(),
        metallic: factor("metallic")?,
        roughness: factor("roughness")?,
    })
}

fn transform_value(transform: &Transform) -> ModelValue {
    ModelValue::map([
        ("position", ModelValue::from(transform.position)),
        ("rotation", ModelValue::from(transform.rotation)),
        ("scale", ModelValue::from(transform.scale)),
    ])
}

fn material_value(material: &Material) -> ModelValue {
    ModelValue::map([
        ("albedo", ModelValue::from(material.albedo.as_str())),
        ("metallic", ModelValue::from(material.metallic)),
        ("roughness", ModelValue::from(material.roughness)),
    ])
}

/// Initial layout of the editor model.
fn initial_model(config: &EditorConfig) -> ModelValue {
    ModelValue::map([
        ("transform", transform_value(&Transform::default())),
        ("material", material_value(&Material::default())),
        (
            "selection",
            ModelValue::map([
                ("selectedObject", ModelValue::Null),
                ("selectedObjects", ModelValue::list(std::iter::empty())),
            ]),
        ),
        (
            "viewport",
            ModelValue::map([
                ("camera", ModelValue::from(ViewPreset::default().name())),
                ("showGrid", ModelValue::from(true)),
                ("fps", ModelValue::Number(0.0)),
                ("objectCount", ModelValue::from(0usize)),
            ]),
        ),
        (
            "tools",
            ModelValue::map([
                ("activeTool", ModelValue::from(ToolKind::Select.name())),
                ("brushSize", ModelValue::from(config.tools.brush_size)),
                ("brushOpacity", ModelValue::from(config.tools.brush_opacity)),
            ]),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::{EditorContext, KeyOutcome};
    use crate::app::{EditorError, EngineEvent};
    use crate::binding::{ModelValue, ModelVersion, RecordingChannel, RecordingHandle};
    use crate::config::EditorConfig;
    use crate::input::{Key, KeyEvent, Modifiers, PointerButton, PointerEvent};
    use crate::scene::{ObjectId, ObjectSpec, Transform};
    use crate::tools::ToolKind;
    use approx::assert_relative_eq;
    use glam::{Vec2, Vec3};
    use serde_json::json;

    fn recorded() -> (EditorContext, RecordingHandle) {
        let (channel, handle) = RecordingChannel::new();
        let ctx = EditorContext::with_channel(EditorConfig::default(), Box::new(channel)).unwrap();
        (ctx, handle)
    }

    fn local() -> EditorContext {
        EditorContext::new(EditorConfig::default()).unwrap()
    }

    fn bound<'a>(ctx: &'a EditorContext, path: &str) -> &'a ModelValue {
        ctx.bus().get(path).unwrap().unwrap()
    }

    #[test]
    fn seeds_editor_model_and_default_scene() {
        let ctx = local().with_default_scene();
        let names: Vec<_> = ctx.scene().objects().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Main Camera", "Directional Light"]);
        assert!(ctx.history().is_empty());
        assert_eq!(bound(&ctx, "editorModel.viewport.objectCount").as_f64(), Some(2.0));
        assert_eq!(bound(&ctx, "editorModel.tools.activeTool").as_str(), Some("select"));
        assert!(bound(&ctx, "editorModel.selection.selectedObject").is_null());
    }

    #[test]
    fn invalid_model_name_is_rejected() {
        let config = EditorConfig {
            model_name: "editor.model".to_string(),
            ..EditorConfig::default()
        };
        assert!(EditorContext::new(config).is_err());
    }

    #[test]
    fn selection_projects_properties_and_notifies_engine() {
        let (mut ctx, handle) = recorded();
        let cube = ctx.add_object(ObjectSpec::named("Cube").at(Vec3::new(1.0, 2.0, 3.0)));
        ctx.select_object(cube.id.as_str()).unwrap();

        assert_eq!(
            bound(&ctx, "editorModel.selection.selectedObject").as_str(),
            Some(cube.id.as_str())
        );
        assert_eq!(
            bound(&ctx, "editorModel.transform.position").as_vec3(),
            Some(Vec3::new(1.0, 2.0, 3.0))
        );
        assert_eq!(
            handle.calls_named("SelectObject").last(),
            Some(&vec![json!(cube.id.as_str())])
        );

        assert!(ctx.select_object("obj_999").is_err());
        assert!(ctx.scene().is_selected(&cube.id));
    }

    #[test]
    fn delete_and_undo_round_trip_selection_state() {
        let mut ctx = local();
        let a = ctx.add_object(ObjectSpec::named("A"));
        let b = ctx.add_object(ObjectSpec::named("B"));
        ctx.select_objects([a.id.clone(), b.id.clone()]);

        assert_eq!(ctx.delete_selected(), 2);
        assert_eq!(ctx.scene().object_count(), 0);
        assert!(ctx.scene().selection().is_empty());

        assert_eq!(ctx.undo().as_deref(), Some("Delete Objects"));
        let names: Vec<_> = ctx.scene().objects().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(bound(&ctx, "editorModel.viewport.objectCount").as_f64(), Some(2.0));

        assert_eq!(ctx.redo().as_deref(), Some("Delete Objects"));
        assert_eq!(ctx.scene().object_count(), 0);
    }

    #[test]
    fn duplicate_and_paste_select_new_objects() {
        let mut ctx = local();
        let cube = ctx.add_object(ObjectSpec::named("Cube"));
        ctx.select_object(cube.id.as_str()).unwrap();

        let copies = ctx.duplicate_selected();
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0], cube.id);
        assert!(ctx.scene().is_selected(&copies[0]));
        assert_eq!(ctx.scene().get(&copies[0]).unwrap().transform.position, Vec3::X);

        ctx.select_object(cube.id.as_str()).unwrap();
        assert_eq!(ctx.copy_selected(), 1);
        let first = ctx.paste();
        let second = ctx.paste();
        assert_eq!(
            ctx.scene().get(&first[0]).unwrap().transform.position,
            Vec3::X
        );
        assert_eq!(
            ctx.scene().get(&second[0]).unwrap().transform.position,
            Vec3::new(2.0, 0.0, 0.0)
        );
        assert_eq!(ctx.scene().object_count(), 4);
        assert_eq!(
            ctx.history().labels(),
            ["Add Object", "Duplicate Objects", "Paste Objects", "Paste Objects"]
        );
    }

    #[test]
    fn property_edit_updates_selected_object_and_is_undoable() {
        let mut ctx = local();
        let cube = ctx.add_object(ObjectSpec::named("Cube"));
        ctx.select_object(cube.id.as_str()).unwrap();

        ctx.edit_property("editorModel.transform.position.y", 4.0_f64)
            .unwrap();
        ctx.edit_property("editorModel.material.roughness", 0.25_f64)
            .unwrap();
        let edited = ctx.scene().get(&cube.id).unwrap();
        assert_eq!(edited.transform.position, Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(edited.material.roughness, 0.25);

        assert_eq!(ctx.undo().as_deref(), Some("Edit Properties"));
        assert_eq!(ctx.undo().as_deref(), Some("Edit Properties"));
        assert_eq!(ctx.scene().get(&cube.id).unwrap().transform, Transform::default());
    }

    #[test]
    fn unusable_property_edits_leave_the_model_alone() {
        let mut ctx = local();
        let cube = ctx.add_object(ObjectSpec::named("Cube"));
        ctx.select_object(cube.id.as_str()).unwrap();
        let version = ctx.bus().version("editorModel");

        let garbage = ctx.edit_property("editorModel.transform.position", "garbage");
        assert!(matches!(garbage, Err(EditorError::InvalidEdit { .. })));
        assert_eq!(
            bound(&ctx, "editorModel.transform.position").as_vec3(),
            Some(Vec3::ZERO)
        );
        assert_eq!(ctx.bus().version("editorModel"), version);

        ctx.edit_property("editorModel.material.metallic", 2.0_f64)
            .unwrap();
        assert_eq!(ctx.scene().get(&cube.id).unwrap().material.metallic, 1.0);
        assert_eq!(bound(&ctx, "editorModel.material.metallic").as_f64(), Some(1.0));

        ctx.clear_selection();
        let unselected = ctx.edit_property("editorModel.material.roughness", 0.9_f64);
        assert!(matches!(unselected, Err(EditorError::InvalidEdit { .. })));
        assert_eq!(bound(&ctx, "editorModel.material.roughness").as_f64(), Some(0.5));
        assert_eq!(ctx.history().labels(), ["Add Object", "Edit Properties"]);
    }

    #[test]
    fn click_on_empty_space_clears_selection() {
        let mut ctx = local();
        let cube = ctx.add_object(ObjectSpec::named("Cube"));
        ctx.select_object(cube.id.as_str()).unwrap();

        let far = Vec2::new(5.0, 5.0);
        ctx.handle_pointer(PointerEvent::Down {
            button: PointerButton::Primary,
            position: far,
            modifiers: Modifiers::NONE,
        });
        ctx.handle_pointer(PointerEvent::Up { position: far });
        assert!(ctx.scene().selection().is_empty());

        let center = ctx.projection().world_to_screen(Vec3::ZERO);
        ctx.handle_pointer(PointerEvent::Down {
            button: PointerButton::Primary,
            position: center,
            modifiers: Modifiers::NONE,
        });
        ctx.handle_pointer(PointerEvent::Up { position: center });
        assert!(ctx.scene().is_selected(&cube.id));
    }

    #[test]
    fn capture_loss_commits_the_gesture() {
        let mut ctx = local();
        let cube = ctx.add_object(ObjectSpec::named("Cube"));
        ctx.select_object(cube.id.as_str()).unwrap();
        ctx.set_active_tool(ToolKind::Move);

        ctx.handle_pointer(PointerEvent::Down {
            button: PointerButton::Primary,
            position: Vec2::ZERO,
            modifiers: Modifiers::NONE,
        });
        ctx.handle_pointer(PointerEvent::Move {
            position: Vec2::new(100.0, 0.0),
        });
        ctx.handle_pointer(PointerEvent::CaptureLost);

        assert!(!ctx.tools().is_dragging());
        assert_eq!(ctx.history().labels().last(), Some(&"Move Objects"));
        assert_relative_eq!(
            ctx.scene().get(&cube.id).unwrap().transform.position.x,
            1.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn keys_are_ignored_while_a_text_field_has_focus() {
        let mut ctx = local();
        ctx.add_object(ObjectSpec::named("Cube"));
        let undo = KeyEvent::command('z');

        assert_eq!(ctx.handle_key(undo, true), KeyOutcome::Ignored);
        assert_eq!(ctx.scene().object_count(), 1);
        assert_eq!(ctx.handle_key(undo, false), KeyOutcome::Handled);
        assert_eq!(ctx.scene().object_count(), 0);

        assert_eq!(ctx.handle_key(KeyEvent::command('s'), false), KeyOutcome::SaveRequested);
        assert_eq!(ctx.handle_key(KeyEvent::plain(Key::Char('r')), false), KeyOutcome::Handled);
        assert_eq!(ctx.tools().active(), ToolKind::Scale);
    }

    #[test]
    fn engine_events_apply_and_stale_ones_drop() {
        let (mut ctx, handle) = recorded();
        let cube = ctx.add_object(ObjectSpec::named("Cube"));
        ctx.select_object(cube.id.as_str()).unwrap();
        let current = ctx.bus().version("editorModel");

        handle.emit(
            "transformChanged",
            &[json!(cube.id.as_str()), json!({ "position": [0.0, 0.0, 9.0] }), json!(current.0)],
        );
        handle.emit(
            "transformChanged",
            &[json!(cube.id.as_str()), json!({ "position": [7.0, 0.0, 0.0] }), json!(0)],
        );
        assert_eq!(ctx.pump_engine_events(), 2);
        assert_eq!(
            ctx.scene().get(&cube.id).unwrap().transform.position,
            Vec3::new(0.0, 0.0, 9.0)
        );
        assert_eq!(
            bound(&ctx, "editorModel.transform.position").as_vec3(),
            Some(Vec3::new(0.0, 0.0, 9.0))
        );

        let selects = handle.calls_named("SelectObject").len();
        ctx.handle_engine_event(EngineEvent::SelectObject(None)).unwrap();
        assert!(ctx.scene().selection().is_empty());
        assert_eq!(handle.calls_named("SelectObject").len(), selects);
        assert!(ctx
            .handle_engine_event(EngineEvent::TransformChanged {
                id: ObjectId::new("obj_404"),
                transform: Transform::default(),
                version: Some(ModelVersion(u64::MAX)),
            })
            .is_err());
    }

    #[test]
    fn console_commands_log_typed_lines() {
        let mut ctx = local();
        assert_eq!(ctx.execute_command("add Cube").as_deref(), Some("Added Cube to scene as obj_1"));
        assert_eq!(ctx.execute_command("select obj_1").as_deref(), Some("Selected object: obj_1"));
        assert_eq!(ctx.execute_command("list").as_deref(), Some("obj_1 Cube (model) *"));
        assert_eq!(ctx.execute_command("tool rotate").as_deref(), Some("Active tool: rotate"));
        assert_eq!(ctx.execute_command("view top").as_deref(), Some("View: top"));
        assert_eq!(
            ctx.execute_command("select obj_9").as_deref(),
            Some("Error: object not found: obj_9")
        );
        assert_eq!(ctx.execute_command("   "), None);
        assert_eq!(ctx.console().lines().len(), 12);

        assert_eq!(ctx.execute_command("clear").as_deref(), Some("Console cleared"));
        assert_eq!(ctx.console().lines().len(), 1);
    }
}
