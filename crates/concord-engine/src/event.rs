//! Change events
//!
//! The outward event surface: one [`ChangeEvent`] per distinguishable
//! change at a path, classified as added, updated or removed.

use concord_tree::{ConfigPath, ConfigValue};

/// Kind of config change at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Path absent in the stored tree, present externally
    Added,
    /// Path present in both trees with structurally different values
    Updated,
    /// Path present in the stored tree, gone externally
    Removed,
}

/// A dispatched config change
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Path the change occurred at
    pub path: ConfigPath,
    /// Value in the stored tree, if present
    pub old_value: Option<ConfigValue>,
    /// Value in the external tree, if present
    pub new_value: Option<ConfigValue>,
    /// UID segments captured by the matching pattern, in pattern order
    ///
    /// Empty unless the registration's pattern contains `{uid}` tokens.
    pub token_matches: Vec<String>,
}

impl ChangeEvent {
    /// Create an event with no captured tokens
    #[must_use]
    pub fn new(
        path: ConfigPath,
        old_value: Option<ConfigValue>,
        new_value: Option<ConfigValue>,
    ) -> Self {
        Self {
            path,
            old_value,
            new_value,
            token_matches: Vec::new(),
        }
    }

    /// Copy of this event carrying captured tokens
    #[must_use]
    pub fn with_tokens(&self, tokens: Vec<String>) -> Self {
        Self {
            path: self.path.clone(),
            old_value: self.old_value.clone(),
            new_value: self.new_value.clone(),
            token_matches: tokens,
        }
    }
}
