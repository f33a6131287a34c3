//! Per-operation timeouts for resource lifecycle calls

use std::time::Duration;

/// Default timeouts for each lifecycle operation of a resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            read: Duration::from_secs(read * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }

    /// Apply caller overrides on top of these defaults
    pub fn merge(&self, overrides: &TimeoutOverrides) -> Self {
        Self {
            create: overrides.create.unwrap_or(self.create),
            read: overrides.read.unwrap_or(self.read),
            update: overrides.update.unwrap_or(self.update),
            delete: overrides.delete.unwrap_or(self.delete),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::minutes(20, 5, 20, 20)
    }
}

/// Caller-supplied timeouts; unset fields fall back to the defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutOverrides {
    pub create: Option<Duration>,
    pub read: Option<Duration>,
    pub update: Option<Duration>,
    pub delete: Option<Duration>,
}
