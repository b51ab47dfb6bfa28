use std::fs;

use ledsim::{
    effect::{factory::ScriptCompiler, host::EffectHost, EffectSource},
    led::Color,
    simulation,
    state::SimulationState,
    world::layout::Layout,
};

fn setup(canvas: &str) -> (Layout, EffectHost, SimulationState) {
    let layout = Layout::parse(canvas).unwrap();
    let state = SimulationState::new(layout.led_count());
    let host = EffectHost::new(Box::new(ScriptCompiler::default()));
    (layout, host, state)
}

#[test]
fn default_routine_lights_every_anchor_white() {
    let (layout, mut host, state) = setup("0 1\n2 3");
    assert_eq!((layout.height(), layout.width()), (2, 3));

    for _ in 0..3 {
        let frame = simulation::tick(&layout, &mut host, &state);
        for row in 0..2 {
            for column in 0..3 {
                let expected = if column == 1 { 0 } else { 0xFFFFFF };
                assert_eq!(frame.get(row, column), Some(expected), "({row}, {column})");
            }
        }
    }
}

#[test]
fn persistent_counter_repeats_with_its_period() {
    let (layout, mut host, state) = setup("0 1 2");
    let code = r#"
        fn effect_fn(leds, current_color, state) {
            let n = state.get("n", 0);
            leds[0].r = n * 10;
            state["n"] = (n + 1) % 4;
        }
    "#;
    assert!(host.reload(&EffectSource::new("cycle.rhai", code)));

    let reds: Vec<u32> = (0..12)
        .map(|_| simulation::tick(&layout, &mut host, &state).get(0, 0).unwrap() >> 16)
        .collect();

    assert_eq!(reds, vec![0, 10, 20, 30, 0, 10, 20, 30, 0, 10, 20, 30]);
}

#[test]
fn current_color_reaches_the_routine() {
    let (layout, mut host, mut state) = setup("0 1");
    state.set_current_color(Color::new(0xFF, 0x00, 0xFF));
    assert_eq!(state.colors().snapshot(), vec![Color::new(0xFF, 0, 0xFF); 2]);

    let code = "fn effect_fn(leds, current_color) { leds[1] = current_color.fade_to_black(255); }";
    assert!(host.reload(&EffectSource::new("current.rhai", code)));

    let frame = simulation::tick(&layout, &mut host, &state);
    assert_eq!(frame.pixels(), &[0xFF00FFu32, 0, 0]);
}

#[test]
fn reload_from_disk_swaps_routine_and_resets_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("effect.rhai");
    let (layout, mut host, state) = setup("0");

    fs::write(
        &path,
        r#"
            fn effect_fn(leds, current_color, state) {
                state["ticks"] = state.get("ticks", 0) + 1;
                leds.set(Color(0, 0, 255));
            }
        "#,
    )
    .unwrap();
    assert!(host.reload_from_path(&path));
    simulation::tick(&layout, &mut host, &state);
    simulation::tick(&layout, &mut host, &state);
    assert_eq!(host.persistent_state().get_int("ticks"), Some(2));

    fs::write(&path, "fn effect_fn(leds, current_color, state) { leds.set(Color(0, 255, 0)) ").unwrap();
    assert!(!host.reload_from_path(&path));
    assert_eq!(
        simulation::tick(&layout, &mut host, &state).get(0, 0),
        Some(0x0000FF)
    );
    assert_eq!(host.persistent_state().get_int("ticks"), Some(3));

    fs::write(&path, "fn effect_fn(leds, current_color, state) { leds.set(Color(0, 255, 0)); }").unwrap();
    assert!(host.reload_from_path(&path));
    assert!(host.persistent_state().is_empty());
    assert_eq!(
        simulation::tick(&layout, &mut host, &state).get(0, 0),
        Some(0x00FF00)
    );
}

#[test]
fn failing_script_freezes_on_partial_result() {
    let (layout, mut host, state) = setup("0 1 2");
    let code = r#"
        fn effect_fn(leds, current_color, state) {
            let n = state.get("n", 0);
            state["n"] = n + 1;
            leds[0] = Color(n, 0, 0);
            leds[1].fade_to_white(300);
            leds[2] = Color(0, 0, 9);
        }
    "#;
    assert!(host.reload(&EffectSource::new("broken.rhai", code)));

    let first = simulation::tick(&layout, &mut host, &state);
    assert_eq!(first.pixels(), &[0u32, 0, 0, 0, 0]);

    let second = simulation::tick(&layout, &mut host, &state);
    assert_eq!(second.get(0, 0), Some(0x010000));
    assert_eq!(second.get(0, 4), Some(0));
    assert_eq!(host.persistent_state().get_int("n"), Some(2));
}

#[test]
fn invalid_layouts_never_start() {
    assert!(Layout::parse("0 1 3").is_err());
    assert!(Layout::parse("0 0 1").is_err());
}
