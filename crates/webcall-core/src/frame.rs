//! Outbound notification frames pushed to a callee's live connection.
//!
//! Text format: ASCII tag, a single `|`, UTF-8 JSON payload, no trailing
//! delimiter.
//!
//! ```
//! use webcall_core::frame::{Frame, FrameTag};
//! let frame = Frame::new(FrameTag::MissedCalls, "[]");
//! assert_eq!(frame.encode(), "missedCalls|[]");
//! ```

use std::fmt;

/// Separator between tag and payload.
pub const SEPARATOR: char = '|';

/// The kinds of backlog frames the core pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTag {
    WaitingCallers,
    MissedCalls,
}

impl FrameTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingCallers => "waitingCallers",
            Self::MissedCalls => "missedCalls",
        }
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for FrameTag {
    type Error = FrameError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "waitingCallers" => Ok(Self::WaitingCallers),
            "missedCalls" => Ok(Self::MissedCalls),
            other => Err(FrameError::UnknownTag(other.to_string())),
        }
    }
}

/// A tagged JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub tag: FrameTag,
    pub payload: String,
}

impl Frame {
    pub fn new(tag: FrameTag, payload: impl Into<String>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    /// Serialize `items` as a compact JSON array behind `tag`.
    pub fn from_items<T: serde::Serialize>(tag: FrameTag, items: &[T]) -> Result<Self, FrameError> {
        let payload = serde_json::to_string(items)?;
        Ok(Self { tag, payload })
    }

    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.tag.as_str().len() + 1 + self.payload.len());
        out.push_str(self.tag.as_str());
        out.push(SEPARATOR);
        out.push_str(&self.payload);
        out
    }

    /// Split a received frame at the first separator. The payload is not
    /// validated as JSON.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let (tag, payload) = text
            .split_once(SEPARATOR)
            .ok_or(FrameError::MissingSeparator)?;
        Ok(Self {
            tag: FrameTag::try_from(tag)?,
            payload: payload.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame has no '{}' separator", SEPARATOR)]
    MissingSeparator,
    #[error("unknown frame tag: {0}")]
    UnknownTag(String),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
