//! Property binding bus.
//!
//! Named model trees addressed by dotted paths. A `set` rebuilds the touched
//! spine, forwards the whole model to the engine channel when one is attached,
//! then notifies exact and wildcard subscribers.

mod path;
mod subscribers;
mod transport;
mod value;

pub use path::{BindingPath, PathPattern};
pub use subscribers::{Callback, SubscriberTrie, SubscriptionId};
pub use transport::{
    ChannelMessage, EngineCallback, EngineChannel, RecordingChannel, RecordingHandle,
};
pub use value::{ModelMap, ModelValue};

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("invalid binding path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("unknown model {0:?}")]
    UnknownModel(String),
}

impl BindingError {
    pub(crate) fn invalid(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, BindingError>;

/// Monotonic per-model update counter attached to outbound model pushes.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ModelVersion(pub u64);

impl ModelVersion {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Outcome of applying an engine-originated update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteApply {
    Applied,
    /// The update was based on an older local version and was dropped.
    Stale { local: ModelVersion },
}

pub struct PropertyBus {
    models: BTreeMap<String, ModelValue>,
    versions: HashMap<String, ModelVersion>,
    subscribers: SubscriberTrie,
    channel: Option<Box<dyn EngineChannel>>,
}

impl Default for PropertyBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyBus {
    /// Local-only bus: values stay in process, engine calls are dropped.
    pub fn new() -> Self {
        Self {
            models: BTreeMap::new(),
            versions: HashMap::new(),
            subscribers: SubscriberTrie::new(),
            channel: None,
        }
    }

    pub fn with_channel(channel: Box<dyn EngineChannel>) -> Self {
        let mut bus = Self::new();
        bus.channel = Some(channel);
        bus
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    pub fn channel_mut(&mut self) -> Option<&mut (dyn EngineChannel + 'static)> {
        self.channel.as_deref_mut()
    }

    /// Registers (or replaces) a named model and announces it to the engine.
    pub fn create_model(&mut self, name: &str, data: ModelValue) -> Result<()> {
        let path = BindingPath::parse(name)?;
        if path.depth() != 1 {
            return Err(BindingError::invalid(name, "model name contains a separator"));
        }
        if let Some(channel) = self.channel.as_deref_mut() {
            channel.create_model(name, &data.to_json());
            channel.synchronize();
        }
        self.models.insert(name.to_string(), data);
        self.versions.entry(name.to_string()).or_default();
        log::debug!("Model '{}' registered", name);
        Ok(())
    }

    pub fn model(&self, name: &str) -> Option<&ModelValue> {
        self.models.get(name)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn version(&self, model: &str) -> ModelVersion {
        self.versions.get(model).copied().unwrap_or_default()
    }

    /// Resolves `path`. `Ok(None)` when any segment is missing.
    pub fn get(&self, path: &str) -> Result<Option<&ModelValue>> {
        let path = BindingPath::parse(path)?;
        Ok(self.get_path(&path))
    }

    pub fn get_path(&self, path: &BindingPath) -> Option<&ModelValue> {
        self.models
            .get(path.model())?
            .at_path(&path.property_segments())
    }

    pub fn set(&mut self, path: &str, value: impl Into<ModelValue>) -> Result<ModelVersion> {
        let path = BindingPath::parse(path)?;
        Ok(self.set_path(&path, value.into()))
    }

    pub fn set_path(&mut self, path: &BindingPath, value: ModelValue) -> ModelVersion {
        self.store(path, value.clone());
        let version = self.version(path.model()).next();
        self.versions.insert(path.model().to_string(), version);

        if let Some(channel) = self.channel.as_deref_mut() {
            if let Some(model) = self.models.get(path.model()) {
                channel.update_model(path.model(), &model.to_json(), version);
                channel.synchronize();
            }
        }

        let delivered = self.subscribers.notify(path, &value);
        log::debug!("set {} (v{}, {} subscribers)", path, version.0, delivered);
        version
    }

    /// Applies a value pushed by the engine.
    ///
    /// `based_on` is the local version the engine had seen when it produced
    /// the update; anything older than the current local version is dropped.
    /// Applied values are not echoed back to the engine.
    pub fn apply_remote(
        &mut self,
        path: &str,
        value: impl Into<ModelValue>,
        based_on: ModelVersion,
    ) -> Result<RemoteApply> {
        let path = BindingPath::parse(path)?;
        if !self.models.contains_key(path.model()) {
            return Err(BindingError::UnknownModel(path.model().to_string()));
        }
        let local = self.version(path.model());
        if based_on < local {
            log::warn!(
                "Dropping stale engine update for {} (v{} < v{})",
                path,
                based_on.0,
                local.0
            );
            return Ok(RemoteApply::Stale { local });
        }
        let value = value.into();
        self.store(&path, value.clone());
        self.subscribers.notify(&path, &value);
        Ok(RemoteApply::Applied)
    }

    pub fn subscribe<F>(&mut self, pattern: &str, callback: F) -> Result<SubscriptionId>
    where
        F: FnMut(&BindingPath, &ModelValue) + 'static,
    {
        let pattern = PathPattern::parse(pattern)?;
        Ok(self.subscribers.insert(&pattern, Box::new(callback)))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Explicit synchronize request, independent of any `set`.
    pub fn synchronize_all(&mut self) {
        if let Some(channel) = self.channel.as_deref_mut() {
            channel.synchronize();
        }
    }

    /// Fire-and-forget engine call. Without a channel the call is only logged.
    pub fn call(&mut self, name: &str, args: &[serde_json::Value]) {
        match self.channel.as_deref_mut() {
            Some(channel) => channel.call(name, args),
            None => log::debug!("Local call: {}({:?})", name, args),
        }
    }

    fn store(&mut self, path: &BindingPath, value: ModelValue) {
        let root = self
            .models
            .get(path.model())
            .cloned()
            .unwrap_or_else(ModelValue::empty_map);
        let updated = root.with_path(&path.property_segments(), value);
        self.models.insert(path.model().to_string(), updated);
    }
}
