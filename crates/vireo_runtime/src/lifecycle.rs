//! Lifecycle hooks
//!
//! Hook identity is a closed enum rather than a name string, so a typo
//! in a hook registration fails at compile time instead of silently
//! never firing.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
    Activated,
    Deactivated,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 10] = [
        LifecycleHook::BeforeCreate,
        LifecycleHook::Created,
        LifecycleHook::BeforeMount,
        LifecycleHook::Mounted,
        LifecycleHook::BeforeUpdate,
        LifecycleHook::Updated,
        LifecycleHook::BeforeDestroy,
        LifecycleHook::Destroyed,
        LifecycleHook::Activated,
        LifecycleHook::Deactivated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleHook::BeforeCreate => "before_create",
            LifecycleHook::Created => "created",
            LifecycleHook::BeforeMount => "before_mount",
            LifecycleHook::Mounted => "mounted",
            LifecycleHook::BeforeUpdate => "before_update",
            LifecycleHook::Updated => "updated",
            LifecycleHook::BeforeDestroy => "before_destroy",
            LifecycleHook::Destroyed => "destroyed",
            LifecycleHook::Activated => "activated",
            LifecycleHook::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
