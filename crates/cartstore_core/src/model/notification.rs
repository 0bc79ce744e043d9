//! Transient cart notification signal.
//!
//! The store only raises and lowers a flag; showing a toast, picking an
//! icon and running the hide timer belong to the presentation layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a presentation layer should keep a raised notification visible.
pub const NOTIFICATION_AUTO_HIDE: Duration = Duration::from_millis(3000);

/// Which mutation raised the notification.
///
/// Serialized as the UI-facing message type (`add` / `delete`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[default]
    #[serde(rename = "add")]
    Added,
    #[serde(rename = "delete")]
    Removed,
}

impl NotificationKind {
    /// Default user-facing text for this kind.
    pub fn message(self) -> &'static str {
        match self {
            Self::Added => "Item added to cart",
            Self::Removed => "Item removed from cart",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "add",
            Self::Removed => "delete",
        }
    }
}

/// Visibility flag plus the kind of the most recent notifying mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub visible: bool,
    pub kind: NotificationKind,
}

impl NotificationState {
    /// Visible notification of the given kind.
    pub fn raised(kind: NotificationKind) -> Self {
        Self {
            visible: true,
            kind,
        }
    }

    /// Hides the notification, keeping the last kind.
    pub fn dismiss(&mut self) {
        self.visible = false;
    }
}
