// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// Session behavior configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Keep the device refocusing continuously while streaming.
    ///
    /// Disable for fixed-focus hardware; there is no other focus behavior.
    pub continuous_autofocus: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            continuous_autofocus: true,
        }
    }
}
