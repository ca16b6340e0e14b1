use serde::{Deserialize, Serialize};

/// Per-install state remembered between runs.
///
/// `admin_unlocked` only decides whether the configuration panel is offered.
/// Anyone who can edit the file or pass the entry flag gets it; it is not an
/// access control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub admin_unlocked: bool,
}
