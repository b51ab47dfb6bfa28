use std::path::PathBuf;

use ledsim::{
    effect::{factory::ScriptCompiler, host::EffectHost},
    led::Color,
    simulation,
    state::SimulationState,
    world::layout::Layout,
};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn frame_layout() -> Layout {
    Layout::parse(&std::fs::read_to_string(demo("frame.txt")).unwrap()).unwrap()
}

fn run_demo(script: &str, ticks: usize) -> (EffectHost, SimulationState) {
    let layout = frame_layout();
    let mut state = SimulationState::new(layout.led_count());
    state.set_current_color(Color::new(0xFF, 0x00, 0xFF));

    let mut host = EffectHost::new(Box::new(ScriptCompiler::default()));
    assert!(host.reload_from_path(&demo(script)), "{:?}", host.last_load_error());

    for _ in 0..ticks {
        simulation::tick(&layout, &mut host, &state);
        assert!(host.last_runtime_error().is_none(), "{:?}", host.last_runtime_error());
    }

    (host, state)
}

#[test]
fn frame_layout_has_71_leds() {
    let layout = frame_layout();
    assert_eq!(layout.led_count(), 71);
    assert_eq!(layout.height(), 15);
}

#[test]
fn gradient_darkens_bands() {
    let (_, state) = run_demo("gradient.rhai", 2);
    let colors = state.colors();

    assert_eq!(colors.get(3), Some(Color::new(51, 0, 51)));
    assert_eq!(colors.get(0), Some(Color::new(102, 0, 102)));
    assert_eq!(colors.get(10), Some(Color::new(153, 0, 153)));
    assert_eq!(colors.get(30), Some(Color::new(255, 0, 255)));
}

#[test]
fn running_brightness_walks() {
    let (host, state) = run_demo("running_brightness.rhai", 3);
    assert_eq!(host.persistent_state().get_int("running_idx"), Some(3));
    assert_eq!(state.colors().get(0), Some(Color::new(7, 7, 7)));
}

#[test]
fn rainbow_spins() {
    let (host, _) = run_demo("rainbow.rhai", 4);
    assert_eq!(host.persistent_state().get_int("start"), Some(12));
}
