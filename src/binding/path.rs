use super::BindingError;
use std::fmt;
use std::str::FromStr;

const WILDCARD_SUFFIX: &str = ".*";

/// Dot-separated address of a value inside a named model, e.g.
/// `editorModel.transform.position`. The first segment names the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingPath {
    raw: String,
}

impl BindingPath {
    pub fn parse(raw: &str) -> Result<Self, BindingError> {
        if raw.is_empty() {
            return Err(BindingError::invalid(raw, "path is empty"));
        }
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(BindingError::invalid(raw, "empty segment"));
            }
            if segment.contains('*') {
                return Err(BindingError::invalid(raw, "wildcard outside a subscription"));
            }
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }

    /// Name of the model root this path points into.
    pub fn model(&self) -> &str {
        self.raw.split('.').next().unwrap_or_default()
    }

    /// Segments below the model root. Empty when the path names the model itself.
    pub fn property_segments(&self) -> Vec<&str> {
        self.raw.split('.').skip(1).collect()
    }

    pub fn depth(&self) -> usize {
        self.raw.split('.').count()
    }

    pub fn child(&self, segment: &str) -> Result<Self, BindingError> {
        Self::parse(&format!("{}.{}", self.raw, segment))
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for BindingPath {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// What a subscriber listens to: one exact path, or everything at and below
/// a prefix (written `prefix.*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(BindingPath),
    Prefix(BindingPath),
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, BindingError> {
        match raw.strip_suffix(WILDCARD_SUFFIX) {
            Some(prefix) => BindingPath::parse(prefix)
                .map(Self::Prefix)
                .map_err(|_| BindingError::invalid(raw, "malformed wildcard prefix")),
            None => BindingPath::parse(raw).map(Self::Exact),
        }
    }

    pub fn path(&self) -> &BindingPath {
        match self {
            Self::Exact(path) | Self::Prefix(path) => path,
        }
    }
}
