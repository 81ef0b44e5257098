//! Boot session identity
//!
//! Ephemeral history is only valid for the machine session it was captured
//! in. The session key is the system boot time: stable from power-on to
//! shutdown, different after every reboot. Only equality is meaningful.

use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Opaque key for one machine session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BootSessionId(pub u64);

impl std::fmt::Display for BootSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the current session key. Queried once at store startup.
pub trait BootSessionOracle: Send + Sync {
    fn current(&self) -> BootSessionId;
}

/// Reads boot time (seconds since the epoch) from the OS
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBootSession;

impl BootSessionOracle for SystemBootSession {
    fn current(&self) -> BootSessionId {
        BootSessionId(System::boot_time())
    }
}

/// Fixed session key, for tests and tools that replay a known session
#[derive(Debug, Clone, Copy)]
pub struct FixedBootSession(pub BootSessionId);

impl BootSessionOracle for FixedBootSession {
    fn current(&self) -> BootSessionId {
        self.0
    }
}
