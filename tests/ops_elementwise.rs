use approx::assert_abs_diff_eq;
use auxide_utils::harness::NodeHarness;
use auxide_utils::nodes::ops::{compare, one_pole_fir, pow};
use auxide_utils::nodes::{Compare, Comparison, OnePoleFir, Pow, Sqrt};
use auxide_utils::{GraphBuilder, OperatorSettings, PortBuffer, PortId, PortKind, Registry};

fn settings() -> OperatorSettings {
    OperatorSettings::new(48_000, 4).unwrap()
}

#[test]
fn compare_defaults_to_equals_zero() {
    let mut harness = NodeHarness::<Compare>::new(settings());
    harness.set_input(compare::IN, PortBuffer::Audio(vec![0.0, 1.0, -1.0, 0.0]));
    harness.run_block().unwrap();
    assert_eq!(harness.audio_output(0), Some(&[1.0, 0.0, 0.0, 1.0][..]));
}

#[test]
fn compare_unknown_selector_falls_back_to_equals() {
    let mut harness = NodeHarness::<Compare>::new(settings());
    harness.set_input(compare::IN, PortBuffer::Audio(vec![0.5, 2.0, 0.5, 3.0]));
    harness.fill_audio(compare::COMPARE, 0.5);
    harness.set_input(compare::TYPE, PortBuffer::Enum(42));
    harness.run_block().unwrap();
    assert_eq!(harness.audio_output(0), Some(&[1.0, 0.0, 1.0, 0.0][..]));

    harness.set_input(compare::TYPE, PortBuffer::Enum(Comparison::GreaterThan as i32));
    harness.run_block().unwrap();
    assert_eq!(harness.audio_output(0), Some(&[0.0, 1.0, 0.0, 1.0][..]));
}

#[test]
fn pow_follows_per_sample_exponent() {
    let mut harness = NodeHarness::<Pow>::new(settings());
    harness.fill_audio(pow::IN, 2.0);
    harness.set_input(pow::POWER, PortBuffer::Audio(vec![0.0, 1.0, 2.0, -1.0]));
    harness.run_block().unwrap();
    let out = harness.audio_output(0).unwrap();
    for (&got, want) in out.iter().zip([1.0, 2.0, 4.0, 0.5]) {
        assert_abs_diff_eq!(got, want, epsilon = 1e-6);
    }
}

#[test]
fn sqrt_clamps_negative_input() {
    let mut harness = NodeHarness::<Sqrt>::new(settings());
    harness.set_input(0, PortBuffer::Audio(vec![4.0, 0.25, -9.0, 0.0]));
    harness.run_block().unwrap();
    assert_eq!(harness.audio_output(0), Some(&[2.0, 0.5, 0.0, 0.0][..]));
}

#[test]
fn fir_carries_one_sample_across_blocks() {
    let mut harness = NodeHarness::<OnePoleFir>::new(settings());
    harness.fill_audio(one_pole_fir::A, 0.5);
    harness.fill_audio(one_pole_fir::B, 0.5);
    harness.set_input(one_pole_fir::IN, PortBuffer::Audio(vec![1.0, 2.0, 3.0, 4.0]));
    harness.run_block().unwrap();
    assert_eq!(harness.audio_output(0), Some(&[0.5, 1.5, 2.5, 3.5][..]));

    harness.set_input(one_pole_fir::IN, PortBuffer::Audio(vec![0.0; 4]));
    harness.run_block().unwrap();
    assert_eq!(harness.audio_output(0), Some(&[2.0, 0.0, 0.0, 0.0][..]));
}

#[test]
fn fir_defaults_pass_input_through() {
    let mut harness = NodeHarness::<OnePoleFir>::new(settings());
    harness.set_input(one_pole_fir::IN, PortBuffer::Audio(vec![0.1, -0.2, 0.3, -0.4]));
    harness.run_block().unwrap();
    assert_eq!(harness.audio_output(0), Some(&[0.1, -0.2, 0.3, -0.4][..]));
}

#[test]
fn squared_ramp_chain() {
    // Phasor -> Pow(2) -> Sqrt recovers the ramp.
    let registry = Registry::builtin();
    let settings = OperatorSettings::new(1_024, 8).unwrap();
    let mut builder = GraphBuilder::new(&registry, settings);
    let freq = builder.external(PortKind::Audio);
    let power = builder.external(PortKind::Audio);
    let ramp = builder.node("Phasor").unwrap();
    let square = builder.node("Pow").unwrap();
    let root = builder.node("Sqrt").unwrap();
    builder.feed(freq, ramp, "In").unwrap();
    builder.connect(ramp, "Out", square, "In").unwrap();
    builder.feed(power, square, "Power").unwrap();
    builder.connect(square, "Out", root, "In").unwrap();
    let mut runtime = builder.build().unwrap();

    runtime.external_audio_mut(freq.0).unwrap().fill(64.0);
    runtime.external_audio_mut(power.0).unwrap().fill(2.0);
    runtime.process_block();
    let ramp_out = runtime.audio_output(ramp.0, PortId(0)).unwrap().to_vec();
    let root_out = runtime.audio_output(root.0, PortId(0)).unwrap();
    for (&r, &s) in ramp_out.iter().zip(root_out) {
        assert_abs_diff_eq!(r, s, epsilon = 1e-6);
    }
}
