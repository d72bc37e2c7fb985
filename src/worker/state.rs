use std::fmt;

/// Lifecycle state of a worker.
///
/// ```text
/// Installing --install ok--> Waiting --activate--> Active
///     |
///     +--install failed--> Redundant
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Installing,
    Waiting,
    Active,
    /// Install failed; the worker never controls pages.
    Redundant,
}

impl WorkerState {
    /// Only an active worker intercepts requests.
    pub fn controls_pages(&self) -> bool {
        matches!(self, WorkerState::Active)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub cache_name: String,
    /// Number of assets stored.
    pub cached: usize,
    /// The worker asked to take control without waiting for old clients.
    pub skip_waiting: bool,
}

/// Result of an activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOutcome {
    pub cache_name: String,
    /// Stores removed because their name differed from the current version.
    pub deleted: Vec<String>,
}
