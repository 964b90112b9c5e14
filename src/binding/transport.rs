//! Host engine channel.
//!
//! The engine is reached through an opaque call/subscribe channel. Every
//! request is fire-and-forget: nothing here waits for a reply, and the editor
//! has to stay correct if a request is dropped or lands late.

use super::ModelVersion;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EngineCallback = Box<dyn FnMut(&[Value])>;

/// Outbound half of the host engine interface.
pub trait EngineChannel {
    /// Invoke a named engine function.
    fn call(&mut self, name: &str, args: &[Value]);

    /// Register for an engine-originated event.
    fn on(&mut self, event: &str, callback: EngineCallback);

    fn create_model(&mut self, name: &str, data: &Value);

    /// Push the whole named model. `version` increases with every local update
    /// of that model so the engine can echo it back on its own updates.
    fn update_model(&mut self, name: &str, data: &Value, version: ModelVersion);

    fn synchronize(&mut self);
}

/// One request observed by a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    Call { name: String, args: Vec<Value> },
    CreateModel { name: String, data: Value },
    UpdateModel { name: String, data: Value, version: ModelVersion },
    Synchronize,
}

#[derive(Default)]
struct RecordingState {
    messages: Vec<ChannelMessage>,
    handlers: HashMap<String, Vec<EngineCallback>>,
}

/// Channel that keeps every request in memory.
///
/// Used by hosts without an engine attached and by tests. The paired
/// [`RecordingHandle`] stays with the caller after the channel has been moved
/// into a bus, and can replay engine events into registered handlers.
#[derive(Default)]
pub struct RecordingChannel {
    state: Rc<RefCell<RecordingState>>,
}

#[derive(Clone)]
pub struct RecordingHandle {
    state: Rc<RefCell<RecordingState>>,
}

impl RecordingChannel {
    pub fn new() -> (Self, RecordingHandle) {
        let channel = Self::default();
        let handle = RecordingHandle {
            state: Rc::clone(&channel.state),
        };
        (channel, handle)
    }
}

impl EngineChannel for RecordingChannel {
    fn call(&mut self, name: &str, args: &[Value]) {
        self.state.borrow_mut().messages.push(ChannelMessage::Call {
            name: name.to_string(),
            args: args.to_vec(),
        });
    }

    fn on(&mut self, event: &str, callback: EngineCallback) {
        self.state
            .borrow_mut()
            .handlers
            .entry(event.to_string())
            .or_default()
            .push(callback);
    }

    fn create_model(&mut self, name: &str, data: &Value) {
        self.state
            .borrow_mut()
            .messages
            .push(ChannelMessage::CreateModel {
                name: name.to_string(),
                data: data.clone(),
            });
    }

    fn update_model(&mut self, name: &str, data: &Value, version: ModelVersion) {
        self.state
            .borrow_mut()
            .messages
            .push(ChannelMessage::UpdateModel {
                name: name.to_string(),
                data: data.clone(),
                version,
            });
    }

    fn synchronize(&mut self) {
        self.state
            .borrow_mut()
            .messages
            .push(ChannelMessage::Synchronize);
    }
}

impl RecordingHandle {
    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.state.borrow().messages.clone()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().messages.clear();
    }

    /// Arguments of every call made to `name`, oldest first.
    pub fn calls_named(&self, name: &str) -> Vec<Vec<Value>> {
        self.state
            .borrow()
            .messages
            .iter()
            .filter_map(|message| match message {
                ChannelMessage::Call { name: called, args } if called == name => {
                    Some(args.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn synchronize_count(&self) -> usize {
        self.state
            .borrow()
            .messages
            .iter()
            .filter(|message| matches!(message, ChannelMessage::Synchronize))
            .count()
    }

    pub fn last_update(&self, model: &str) -> Option<(Value, ModelVersion)> {
        self.state
            .borrow()
            .messages
            .iter()
            .rev()
            .find_map(|message| match message {
                ChannelMessage::UpdateModel {
                    name,
                    data,
                    version,
                } if name == model => Some((data.clone(), *version)),
                _ => None,
            })
    }

    /// Delivers an engine event to every handler registered through `on`.
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        // Handlers are taken out while running so they may touch the handle.
        let mut handlers = self
            .state
            .borrow_mut()
            .handlers
            .remove(event)
            .unwrap_or_default();
        for handler in handlers.iter_mut() {
            handler(args);
        }
        let count = handlers.len();
        let mut state = self.state.borrow_mut();
        let slot = state.handlers.entry(event.to_string()).or_default();
        handlers.append(slot);
        *slot = handlers;
        count
    }
}
