use std::collections::HashSet;

use crate::config::AccessConfig;

/// Access level of a chat or user, from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTier {
    Admin,
    Operational,
    Restricted,
    Denied,
}

/// Static membership tests over the configured identifier lists.
///
/// Tiers nest: every admin is operational, every operational id is augmented.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    admins: HashSet<i64>,
    operational: HashSet<i64>,
    restricted: HashSet<i64>,
}

impl AccessControl {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            admins: config.admin_ids.iter().copied().collect(),
            operational: config.operational_chats.iter().copied().collect(),
            restricted: config.restricted_chats.iter().copied().collect(),
        }
    }

    pub fn is_admin(&self, id: i64) -> bool {
        self.admins.contains(&id)
    }

    pub fn is_operational(&self, id: i64) -> bool {
        self.operational.contains(&id) || self.is_admin(id)
    }

    /// Any configured tier, restricted chats included.
    pub fn is_augmented(&self, id: i64) -> bool {
        self.is_operational(id) || self.restricted.contains(&id)
    }

    pub fn tier(&self, id: i64) -> AccessTier {
        if self.is_admin(id) {
            AccessTier::Admin
        } else if self.is_operational(id) {
            AccessTier::Operational
        } else if self.is_augmented(id) {
            AccessTier::Restricted
        } else {
            AccessTier::Denied
        }
    }
}
