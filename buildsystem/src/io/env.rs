//! Snapshot of the process environment.

use crate::core::identity::EnvSnapshot;

/// Capture the consumed variables once; later changes are not observed.
pub fn read_env() -> EnvSnapshot {
    EnvSnapshot::from_lookup(|name| {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    })
}
