//! RT-safe invariant signaling for the block path.
//!
//! Two tiers:
//! - **Tier 1 (RT-safe)**: nodes and the runtime push invariant IDs into a
//!   lock-free SPSC queue during `process_block`
//! - **Tier 2 (non-RT)**: the host drains the queue and checks contracts
//!
//! RT code **signals facts**. Non-RT code **judges correctness**.
//!
//! ```ignore
//! // inside execute
//! outputs.signal(INV_TRIGGER_HONORED);
//!
//! // on the control thread
//! let signals = drain_invariant_signals(&mut rx);
//! assert!(signals.contains(&INV_TRIGGER_HONORED));
//! ```

use rtrb::{Consumer, Producer, RingBuffer};

// ============================================================================
// RT-Safe Invariant IDs (Tier 1)
// ============================================================================

/// A full block was executed by every node.
pub const INV_BLOCK_EXECUTED: u8 = 1;

/// A phasor wrapped at least once during the block.
pub const INV_PHASE_WRAPPED: u8 = 2;

/// A trigger edge produced a new elapsed time.
pub const INV_TRIGGER_HONORED: u8 = 3;

/// A trigger edge was seen but the timer mode left it without an emission.
pub const INV_TRIGGER_IGNORED: u8 = 4;

/// A node fault was absorbed and the node's output degraded.
pub const INV_NODE_FAULT_CONTAINED: u8 = 5;

// ============================================================================
// Invariant Signal Queue
// ============================================================================

/// Capacity for invariant signal queue.
pub const INVARIANT_QUEUE_CAPACITY: usize = 256;

/// Creates a new invariant signal queue pair.
///
/// Returns (producer for RT, consumer for the control thread).
pub fn new_invariant_queue() -> (Producer<u8>, Consumer<u8>) {
    RingBuffer::new(INVARIANT_QUEUE_CAPACITY)
}

/// Signals an invariant from the RT path.
///
/// No allocation, no locking, no panics. A full queue drops the signal.
#[inline]
pub fn signal_invariant(tx: &mut Producer<u8>, id: u8) {
    let _ = tx.push(id);
}

// ============================================================================
// Non-RT Verification (Tier 2)
// ============================================================================

/// Drains all pending invariant signals from the queue.
pub fn drain_invariant_signals(rx: &mut Consumer<u8>) -> Vec<u8> {
    let mut signals = Vec::with_capacity(INVARIANT_QUEUE_CAPACITY);
    while let Ok(id) = rx.pop() {
        signals.push(id);
    }
    signals
}

/// Counts occurrences of each invariant ID in a signal list.
pub fn count_invariant_signals(signals: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &id in signals {
        counts[id as usize] += 1;
    }
    counts
}

/// Contract verification: asserts that required invariants were signaled.
///
/// # Panics
/// Panics if any required invariant was not signaled at least once.
#[cfg(any(test, feature = "ppt"))]
pub fn contract_test_rt(contract_name: &str, signals: &[u8], required: &[u8]) {
    let counts = count_invariant_signals(signals);
    let missing: Vec<&str> = required
        .iter()
        .filter(|&&id| counts[id as usize] == 0)
        .map(|&id| invariant_name(id))
        .collect();

    if !missing.is_empty() {
        let present: Vec<&str> = signals
            .iter()
            .map(|&id| invariant_name(id))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        panic!(
            "RT Contract '{}' missing invariants: {:?}. Present: {:?}",
            contract_name, missing, present
        );
    }
}

/// Maps invariant ID to human-readable name (for diagnostics only).
pub const fn invariant_name(id: u8) -> &'static str {
    match id {
        INV_BLOCK_EXECUTED => "BLOCK_EXECUTED",
        INV_PHASE_WRAPPED => "PHASE_WRAPPED",
        INV_TRIGGER_HONORED => "TRIGGER_HONORED",
        INV_TRIGGER_IGNORED => "TRIGGER_IGNORED",
        INV_NODE_FAULT_CONTAINED => "NODE_FAULT_CONTAINED",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_queue_roundtrip() {
        let (mut tx, mut rx) = new_invariant_queue();

        signal_invariant(&mut tx, INV_TRIGGER_HONORED);
        signal_invariant(&mut tx, INV_TRIGGER_IGNORED);
        signal_invariant(&mut tx, INV_TRIGGER_HONORED);

        let signals = drain_invariant_signals(&mut rx);
        assert_eq!(
            signals,
            vec![INV_TRIGGER_HONORED, INV_TRIGGER_IGNORED, INV_TRIGGER_HONORED]
        );
    }

    #[test]
    fn test_count_invariant_signals() {
        let counts = count_invariant_signals(&[
            INV_PHASE_WRAPPED,
            INV_PHASE_WRAPPED,
            INV_BLOCK_EXECUTED,
        ]);
        assert_eq!(counts[INV_PHASE_WRAPPED as usize], 2);
        assert_eq!(counts[INV_BLOCK_EXECUTED as usize], 1);
        assert_eq!(counts[INV_NODE_FAULT_CONTAINED as usize], 0);
    }

    #[test]
    #[should_panic(expected = "missing invariants")]
    fn test_contract_fails_when_invariants_missing() {
        contract_test_rt(
            "incomplete contract",
            &[INV_BLOCK_EXECUTED],
            &[INV_BLOCK_EXECUTED, INV_TRIGGER_HONORED],
        );
    }

    #[test]
    fn test_queue_handles_overflow_gracefully() {
        let (mut tx, mut rx) = new_invariant_queue();
        for _ in 0..INVARIANT_QUEUE_CAPACITY + 100 {
            signal_invariant(&mut tx, INV_BLOCK_EXECUTED);
        }
        assert_eq!(drain_invariant_signals(&mut rx).len(), INVARIANT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_invariant_names() {
        assert_eq!(invariant_name(INV_TRIGGER_IGNORED), "TRIGGER_IGNORED");
        assert_eq!(invariant_name(255), "UNKNOWN");
    }
}
