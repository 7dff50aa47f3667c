//! PPT invariants: build-time checks with a record of which ones fired.
//!
//! Only settings validation, registration, graph construction and binding
//! call into this module. The block path never does: the log sits behind a
//! mutex. Without the `ppt` feature the checks still panic on failure, but
//! nothing is recorded and `contract_test` accepts everything.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::BTreeSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

pub const SETTINGS_VALID: u32 = 1;
pub const REGISTRY_ORDER_STABLE: u32 = 2;
pub const GRAPH_LEGALITY: u32 = 3;
pub const GRAPH_REJECTS_INVALID: u32 = 4;
pub const BINDINGS_RESOLVED: u32 = 5;
pub const DEFAULTS_SUPPLIED: u32 = 6;
pub const BUFFERS_PREALLOCATED: u32 = 7;
pub const BUILD_REJECTS_UNBOUND: u32 = 8;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref ASSERTED: Mutex<BTreeSet<u32>> = Mutex::new(BTreeSet::new());
}

/// Human-readable name of a build-time invariant.
pub fn invariant_name(id: u32) -> &'static str {
    match id {
        SETTINGS_VALID => "SETTINGS_VALID",
        REGISTRY_ORDER_STABLE => "REGISTRY_ORDER_STABLE",
        GRAPH_LEGALITY => "GRAPH_LEGALITY",
        GRAPH_REJECTS_INVALID => "GRAPH_REJECTS_INVALID",
        BINDINGS_RESOLVED => "BINDINGS_RESOLVED",
        DEFAULTS_SUPPLIED => "DEFAULTS_SUPPLIED",
        BUFFERS_PREALLOCATED => "BUFFERS_PREALLOCATED",
        BUILD_REJECTS_UNBOUND => "BUILD_REJECTS_UNBOUND",
        _ => "UNKNOWN",
    }
}

/// Check `condition`, panicking with `message` when it does not hold, and
/// record `id` as enforced.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let name = invariant_name(id);
        match context {
            Some(ctx) => {
                tracing::error!(invariant = name, context = ctx, "{message}");
                panic!("Invariant {name} failed: {message} (context: {ctx})");
            }
            None => {
                tracing::error!(invariant = name, "{message}");
                panic!("Invariant {name} failed: {message}");
            }
        }
    }

    #[cfg(feature = "ppt")]
    {
        // A poisoned log only loses bookkeeping.
        if let Ok(mut log) = ASSERTED.lock() {
            log.insert(id);
        }
    }
    #[cfg(not(feature = "ppt"))]
    let _ = id;
}

/// Panic unless every id in `required` has been asserted at least once in
/// this process.
pub fn contract_test(test_name: &str, required: &[u32]) {
    #[cfg(feature = "ppt")]
    {
        let missing: Vec<&str> = match ASSERTED.lock() {
            Ok(log) => required
                .iter()
                .filter(|id| !log.contains(id))
                .map(|&id| invariant_name(id))
                .collect(),
            Err(_) => required.iter().map(|&id| invariant_name(id)).collect(),
        };
        if !missing.is_empty() {
            panic!("Contract test '{test_name}' failed: invariants not enforced: {missing:?}");
        }
    }
    #[cfg(not(feature = "ppt"))]
    let _ = (test_name, required);
}

/// Forget every recorded assertion.
pub fn clear_invariant_log() {
    #[cfg(feature = "ppt")]
    {
        if let Ok(mut log) = ASSERTED.lock() {
            log.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_invariant_does_not_panic() {
        assert_invariant(SETTINGS_VALID, 1 + 1 == 2, "Math works", Some("basic"));
    }

    #[test]
    #[should_panic(expected = "Invariant GRAPH_LEGALITY failed")]
    fn failing_invariant_panics_with_its_name() {
        assert_invariant(GRAPH_LEGALITY, 1 + 1 == 3, "Math broken", None);
    }

    #[test]
    fn asserted_invariant_satisfies_contract() {
        assert_invariant(BUFFERS_PREALLOCATED, true, "logged", None);
        contract_test("example", &[BUFFERS_PREALLOCATED]);
    }

    #[test]
    fn names_cover_every_id() {
        for id in SETTINGS_VALID..=BUILD_REJECTS_UNBOUND {
            assert_ne!(invariant_name(id), "UNKNOWN");
        }
        assert_eq!(invariant_name(0), "UNKNOWN");
    }

    #[cfg(feature = "ppt")]
    #[test]
    #[should_panic(expected = "invariants not enforced")]
    fn contract_reports_missing_invariants() {
        // Never asserted anywhere in the crate.
        contract_test("missing", &[9_999]);
    }
}
