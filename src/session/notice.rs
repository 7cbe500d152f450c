use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message for the user, delivered with the next response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
