use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Plain,
    Info,
    Good,
    Bad,
}

/// A message for the adapter to render. Announcements carry a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: Option<String>,
    pub body: String,
    pub tone: Tone,
}

impl Notice {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            title: None,
            body: body.into(),
            tone: Tone::Plain,
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::titled(title, body, Tone::Info)
    }

    pub fn good(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::titled(title, body, Tone::Good)
    }

    pub fn bad(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::titled(title, body, Tone::Bad)
    }

    fn titled(title: impl Into<String>, body: impl Into<String>, tone: Tone) -> Self {
        Self {
            title: Some(title.into()),
            body: body.into(),
            tone,
        }
    }
}

/// One step of an outbox produced under the session lock and delivered
/// after it is released.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Group(Notice),
    Private(PlayerId, Notice),
    Pause(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Ephemeral,
}

/// Answer to an incoming command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub notice: Notice,
    pub visibility: Visibility,
}

impl Reply {
    pub fn public(notice: Notice) -> Self {
        Self {
            notice,
            visibility: Visibility::Public,
        }
    }

    pub fn ephemeral(notice: Notice) -> Self {
        Self {
            notice,
            visibility: Visibility::Ephemeral,
        }
    }
}
