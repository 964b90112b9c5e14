//! Previz editor state core.
//!
//! The editor is split into a handful of owned components that are wired
//! together by [`app::EditorContext`]:
//! - [`binding`] - path-addressed model store that mirrors values to the UI and the host engine
//! - [`scene`] - the authoritative set of editable objects and its document format
//! - [`history`] - bounded linear undo/redo over scene edits
//! - [`tools`] - pointer gestures for the select/move/rotate/scale/brush/erase tools
//! - [`camera`] - orbit/pan/zoom rig sharing the pointer stream with the tools
//!
//! Nothing here touches a window or a GPU; hosts feed input events in and read
//! the viewport mirror and binding bus out.

pub mod app;
pub mod binding;
pub mod camera;
pub mod config;
pub mod console;
pub mod history;
pub mod input;
pub mod scene;
pub mod tools;
pub mod viewport;

pub use app::{EditorContext, EditorError, EngineEvent, KeyOutcome};
pub use binding::{BindingError, BindingPath, EngineChannel, ModelValue, PropertyBus};
pub use config::EditorConfig;
pub use history::{HistoryLog, Reversible, SceneEdit};
pub use scene::{ObjectCategory, ObjectId, ObjectSpec, SceneError, SceneGraph, SceneObject};
pub use tools::{AxisConstraint, ToolKind, ToolStateMachine};
