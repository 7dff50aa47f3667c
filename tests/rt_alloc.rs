use auxide_utils::invariant_rt::new_invariant_queue;
use auxide_utils::{GraphBuilder, OperatorSettings, PortKind, Registry};
use std::alloc::{GlobalAlloc, Layout};
use std::cell::RefCell;

thread_local! {
    static ALLOC_COUNT: RefCell<usize> = RefCell::new(0);
}

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_COUNT.with(|c| *c.borrow_mut() += 1);
        unsafe { std::alloc::System.alloc(layout) }
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { std::alloc::System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static A: CountingAllocator = CountingAllocator;

#[test]
fn rt_alloc_invariant() {
    let registry = Registry::builtin();
    let settings = OperatorSettings::new(48_000, 64).unwrap();
    let mut builder = GraphBuilder::new(&registry, settings);
    let freq = builder.external(PortKind::Audio);
    let trig = builder.external(PortKind::Trigger);
    let ramp = builder.node("Phasor").unwrap();
    let cmp = builder.node("Compare").unwrap();
    let fir = builder.node("OnePoleFir").unwrap();
    let timer = builder.node("Timer").unwrap();
    let every = builder.node_versioned("Timer", 2).unwrap();
    builder.feed(freq, ramp, "In").unwrap();
    builder.connect(ramp, "Out", cmp, "In").unwrap();
    builder.connect(cmp, "Out", fir, "In").unwrap();
    builder.feed(trig, timer, "In").unwrap();
    builder.feed(trig, every, "In").unwrap();
    let mut runtime = builder.build().unwrap();
    let (tx, mut rx) = new_invariant_queue();
    runtime.set_signal_channel(tx);
    runtime.external_audio_mut(freq.0).unwrap().fill(440.0);

    let after_new = ALLOC_COUNT.with(|c| *c.borrow());
    for block in 0..10_000usize {
        let triggers = runtime.external_triggers_mut(trig.0).unwrap();
        triggers.trigger_frame(block % 64).unwrap();
        if block % 3 == 0 {
            triggers.trigger_frame(63).ok();
        }
        runtime.process_block();
        // Keep the signal ring from filling up.
        while rx.pop().is_ok() {}
    }
    let final_count = ALLOC_COUNT.with(|c| *c.borrow());
    assert_eq!(
        final_count, after_new,
        "RT process_block should not allocate"
    );
}
