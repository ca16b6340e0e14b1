//! Unlock for the persona/document configuration panel.
//!
//! The panel is offered when the entry address carries an `admin` query flag
//! or when an earlier run stored the unlock. This only hides the panel from
//! casual users. It is not authentication: anyone who knows the flag or can
//! edit the stored session file gets in.

use shared::session::SessionState;
use url::Url;

pub const ADMIN_FLAG: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockOutcome {
    pub authorized: bool,
    /// The entry address carried the flag this time
    pub flag_consumed: bool,
    /// Entry address with the flag removed, for display
    pub visible_entry: Option<String>,
}

/// Decide whether the panel is available and record the unlock in `state`.
pub fn resolve_unlock(entry: Option<&str>, state: &mut SessionState) -> UnlockOutcome {
    let (flag_consumed, visible_entry) = match entry {
        Some(entry) => {
            let (found, cleaned) = strip_admin_flag(entry);
            (found, Some(cleaned))
        }
        None => (false, None),
    };

    let authorized = flag_consumed || state.admin_unlocked;
    if authorized && !state.admin_unlocked {
        tracing::info!("admin panel unlocked");
        state.admin_unlocked = true;
    }

    UnlockOutcome {
        authorized,
        flag_consumed,
        visible_entry,
    }
}

/// Remove the `admin` query pair from an absolute or relative address.
/// Returns whether it was present and the cleaned address.
pub fn strip_admin_flag(entry: &str) -> (bool, String) {
    let (mut url, relative) = match Url::parse(entry) {
        Ok(url) => (url, false),
        Err(_) => match Url::parse("http://localhost/").and_then(|base| base.join(entry)) {
            Ok(url) => (url, true),
            Err(_) => return (false, entry.to_string()),
        },
    };

    let has_flag = url.query_pairs().any(|(key, _)| key == ADMIN_FLAG);
    if has_flag {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != ADMIN_FLAG)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    if !relative {
        return (has_flag, url.to_string());
    }
    let mut visible = url.path().to_string();
    if let Some(query) = url.query() {
        visible.push('?');
        visible.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        visible.push('#');
        visible.push_str(fragment);
    }
    (has_flag, visible)
}

/// Open/closed state of the configuration panel
#[derive(Debug, Clone, Default)]
pub struct AdminPanel {
    authorized: bool,
    open: bool,
}

impl AdminPanel {
    pub fn new(authorized: bool) -> Self {
        Self {
            authorized,
            open: false,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn is_open(&self) -> bool {
        self.authorized && self.open
    }

    /// Flip the panel; does nothing unless authorized. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        if self.authorized {
            self.open = !self.open;
        }
        self.is_open()
    }
}
