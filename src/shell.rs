/// Interfaces to the surrounding presentation shell
///
/// The edit core never renders anything itself. Outcomes are reported
/// through two collaborators injected at session start:
/// - Notifier: fire-and-forget toast-style notices
/// - Navigator: requests to move the user to another view

/// How long a notice stays on screen by default, in milliseconds
pub const DEFAULT_NOTICE_DURATION_MS: u64 = 5000;

/// Severity of a notice, controls how the shell styles it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// A fire-and-forget notification
///
/// The core never blocks on a notice or reads a response to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    /// Display duration in milliseconds
    pub duration_ms: u64,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
            duration_ms: DEFAULT_NOTICE_DURATION_MS,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            duration_ms: DEFAULT_NOTICE_DURATION_MS,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            duration_ms: DEFAULT_NOTICE_DURATION_MS,
        }
    }
}

/// Sink for notices shown to the user
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Navigation requests out of the edit view
pub trait Navigator {
    /// Ask the shell to show the activity listing
    fn to_listing(&self);
}
