//! Sample-accurate trigger timing through the block runtime.

use auxide_utils::{
    ExternalHandle, GraphBuilder, NodeHandle, OperatorSettings, PortId, PortKind, Registry, Runtime,
};
use proptest::prelude::*;

const SR: u32 = 48_000;
const L: usize = 64;

fn timer_runtime(major: u32) -> (Runtime, ExternalHandle, NodeHandle) {
    let registry = Registry::builtin();
    let settings = OperatorSettings::new(SR, L).unwrap();
    let mut builder = GraphBuilder::new(&registry, settings);
    let trig = builder.external(PortKind::Trigger);
    let timer = builder.node_versioned("Timer", major).unwrap();
    builder.feed(trig, timer, "In").unwrap();
    (builder.build().unwrap(), trig, timer)
}

fn run_block(runtime: &mut Runtime, trig: ExternalHandle, offsets: &[usize]) {
    let triggers = runtime.external_triggers_mut(trig.0).unwrap();
    for &offset in offsets {
        triggers.trigger_frame(offset).unwrap();
    }
    runtime.process_block();
}

fn seconds(samples: usize) -> f64 {
    samples as f64 / SR as f64
}

#[test]
fn output_starts_at_zero_and_holds() {
    let (mut runtime, trig, timer) = timer_runtime(1);
    run_block(&mut runtime, trig, &[]);
    assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(0.0));
    run_block(&mut runtime, trig, &[20]);
    assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(seconds(L + 20)));
    for _ in 0..3 {
        run_block(&mut runtime, trig, &[]);
        assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(seconds(L + 20)));
    }
    run_block(&mut runtime, trig, &[20]);
    assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(seconds(4 * L)));
}

#[test]
fn first_edge_timer_keeps_counting_through_ignored_edges() {
    let (mut runtime, trig, timer) = timer_runtime(1);
    run_block(&mut runtime, trig, &[10, 40]);
    assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(seconds(10)));
    run_block(&mut runtime, trig, &[5]);
    // The edge at 40 neither emitted nor reset the count.
    assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(seconds(L - 10 + 5)));
}

#[test]
fn every_edge_timer_emits_last_interval() {
    let (mut runtime, trig, timer) = timer_runtime(2);
    run_block(&mut runtime, trig, &[10, 40]);
    assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(seconds(30)));
    run_block(&mut runtime, trig, &[5]);
    assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(seconds(L - 40 + 5)));
}

proptest! {
    #[test]
    fn first_edge_matches_absolute_positions(
        blocks in prop::collection::vec(prop::option::of(0usize..L), 1..24),
    ) {
        let (mut runtime, trig, timer) = timer_runtime(1);
        let mut last_edge = 0usize;
        let mut expected = 0.0;
        for (index, offset) in blocks.iter().enumerate() {
            match offset {
                Some(offset) => {
                    run_block(&mut runtime, trig, &[*offset]);
                    let at = index * L + offset;
                    expected = seconds(at - last_edge);
                    last_edge = at;
                }
                None => run_block(&mut runtime, trig, &[]),
            }
            prop_assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(expected));
        }
    }

    #[test]
    fn every_edge_matches_absolute_positions(
        blocks in prop::collection::vec(prop::collection::btree_set(0usize..L, 0..5), 1..16),
    ) {
        let (mut runtime, trig, timer) = timer_runtime(2);
        let mut last_edge = 0usize;
        let mut expected = 0.0;
        for (index, offsets) in blocks.iter().enumerate() {
            let offsets: Vec<usize> = offsets.iter().copied().collect();
            run_block(&mut runtime, trig, &offsets);
            for offset in &offsets {
                let at = index * L + offset;
                expected = seconds(at - last_edge);
                last_edge = at;
            }
            prop_assert_eq!(runtime.time_output(timer.0, PortId(0)), Some(expected));
        }
    }
}
