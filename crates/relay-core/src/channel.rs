//! Publish targets.
//!
//! A target containing [`TOPIC_SEPARATOR`] names a topic channel; anything
//! else names a client directly. The distinction is drawn once, by
//! [`Target::classify`].

use std::fmt;

/// Maximum channel name length.
pub const MAX_CHANNEL_NAME_LENGTH: usize = 256;

/// Separator that marks a target as a topic (`news/general`).
pub const TOPIC_SEPARATOR: char = '/';

/// A channel identifier: a client id or a topic name.
pub type ChannelId = String;

/// Validate a channel or target name.
///
/// # Errors
///
/// Returns an error message if the name is invalid.
pub fn validate_channel_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Channel name cannot be empty");
    }
    if name.len() > MAX_CHANNEL_NAME_LENGTH {
        return Err("Channel name too long");
    }
    if name.chars().any(char::is_control) {
        return Err("Channel name contains control characters");
    }
    Ok(())
}

/// Where a publish goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Exactly one recipient: the client with this id.
    Direct(String),
    /// Every subscriber of this topic.
    Topic(ChannelId),
}

impl Target {
    /// Classify a raw target string.
    #[must_use]
    pub fn classify(target: impl Into<String>) -> Self {
        let target = target.into();
        if target.contains(TOPIC_SEPARATOR) {
            Target::Topic(target)
        } else {
            Target::Direct(target)
        }
    }

    /// The channel string stored on the message.
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Target::Direct(id) | Target::Topic(id) => id,
        }
    }

    #[must_use]
    pub fn is_topic(&self) -> bool {
        matches!(self, Target::Topic(_))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Direct(_) => "direct",
            Target::Topic(_) => "topic",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.channel())
    }
}
