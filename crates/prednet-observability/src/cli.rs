// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-crate debug flags
//!
//! `--debug-<crate>` raises one log target to `debug`, `--debug-all` raises
//! every target in [`KNOWN_CRATES`]. `PREDNET_DEBUG` takes the same names
//! as a comma-separated list (or `all`).

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Log targets raised to `debug`
///
/// ```rust
/// use prednet_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-prednet-connectivity".to_string()]);
/// assert!(flags.is_enabled("prednet-connectivity"));
/// assert_eq!(flags.to_filter_string("info"), "prednet-connectivity=debug,info");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Collect `--debug-*` arguments; everything else is ignored
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = Self::default();
        for arg in args {
            if let Some(name) = arg.strip_prefix("--debug-") {
                flags.enable(name);
            }
        }
        flags
    }

    /// Also honor `PREDNET_DEBUG` when it is set
    pub fn with_env(mut self) -> Self {
        if let Ok(list) = env::var("PREDNET_DEBUG") {
            self.enable_list(&list);
        }
        self
    }

    /// Enable a comma-separated list of crate names, `all` included
    pub fn enable_list(&mut self, list: &str) {
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            self.enable(name);
        }
    }

    fn enable(&mut self, name: &str) {
        if name == "all" {
            self.crates.extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
        } else {
            self.crates.insert(name.to_string());
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.crates.contains(crate_name)
    }

    /// `EnvFilter` directives: one `<crate>=debug` per enabled crate, in
    /// name order, followed by `base_level`
    pub fn to_filter_string(&self, base_level: &str) -> String {
        self.crates
            .iter()
            .map(|name| format!("{}=debug", name))
            .chain(std::iter::once(base_level.to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }
}
