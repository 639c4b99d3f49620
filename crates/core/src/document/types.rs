//! Types for the document module.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque document identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Target format a document can be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionFormat {
    /// ISO 10303 exchange file
    Step,
    /// Stereolithography mesh
    Stl,
    /// Wavefront object
    Obj,
}

impl ConversionFormat {
    /// Every known format, in display order.
    pub const ALL: [ConversionFormat; 3] = [Self::Step, Self::Stl, Self::Obj];

    /// Number of known formats.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the file extension (without the leading dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Stl => "stl",
            Self::Obj => "obj",
        }
    }

    /// Stable tag used in caches, URLs and events.
    pub fn as_str(&self) -> &'static str {
        self.extension()
    }

    fn index(&self) -> usize {
        match self {
            Self::Step => 0,
            Self::Stl => 1,
            Self::Obj => 2,
        }
    }
}

impl fmt::Display for ConversionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a format tag is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown conversion format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for ConversionFormat {
    type Err = UnknownFormat;

    /// Accepts `obj`, `.obj` and any casing thereof.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Conversion state of a single (document, format) pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionState {
    /// Nothing started, or reset after a cancel.
    #[default]
    Idle,
    /// In flight. Progress is a fraction in `[0.0, 1.0]`.
    Converting { progress: f64 },
    /// Finished; the artifact lives at `output_path`.
    Completed { output_path: PathBuf },
    /// Failed with a human-readable message. Retried by starting again.
    Failed { message: String },
}

impl ConversionState {
    pub fn converting(progress: f64) -> Self {
        Self::Converting {
            progress: progress.clamp(0.0, 1.0),
        }
    }

    /// Returns true for `completed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn is_converting(&self) -> bool {
        matches!(self, Self::Converting { .. })
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Converting { progress } => Some(*progress),
            _ => None,
        }
    }

    /// Returns the state tag.
    pub fn state_type(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Converting { .. } => "converting",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Fixed-size map from every [`ConversionFormat`] to its state.
///
/// Serializes as a JSON object keyed by format tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionStates {
    states: [ConversionState; ConversionFormat::COUNT],
}

impl ConversionStates {
    /// All formats idle.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Builds a map from explicit entries; formats not listed start idle.
    pub fn from_entries(entries: impl IntoIterator<Item = (ConversionFormat, ConversionState)>) -> Self {
        let mut states = Self::idle();
        for (format, state) in entries {
            states.set(format, state);
        }
        states
    }

    pub fn get(&self, format: ConversionFormat) -> &ConversionState {
        &self.states[format.index()]
    }

    /// Replaces the state for `format`. Returns true if it changed.
    pub fn set(&mut self, format: ConversionFormat, state: ConversionState) -> bool {
        let slot = &mut self.states[format.index()];
        if *slot == state {
            return false;
        }
        *slot = state;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConversionFormat, &ConversionState)> + '_ {
        ConversionFormat::ALL
            .into_iter()
            .map(move |format| (format, self.get(format)))
    }

    /// Formats currently converting.
    pub fn converting_formats(&self) -> Vec<ConversionFormat> {
        self.iter()
            .filter(|(_, state)| state.is_converting())
            .map(|(format, _)| format)
            .collect()
    }
}

impl Serialize for ConversionStates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ConversionFormat::COUNT))?;
        for (format, state) in self.iter() {
            map.serialize_entry(format.as_str(), state)?;
        }
        map.end()
    }
}
