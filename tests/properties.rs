//! Property tests for the simulation core, parameter mapping and polyphony.
//!
//! ```bash
//! cargo test --test properties
//! ```

use glam::Vec2;
use proptest::prelude::*;

use hexseq::chords::{Chord, ChordTable};
use hexseq::consts::{HEX_SIDES, MAX_POLYPHONY, OUT_OF_BOUNDS};
use hexseq::normalize_angle;
use hexseq::params::{Controls, Param, SimConfig, lerp};
use hexseq::sim::{Hexagon, Scene, WALL_SPACING};
use hexseq::synth::VoicePool;

fn openness() -> impl Strategy<Value = f32> {
    1.0f32..=2.0
}

/// A coordinate pair with at least one axis past the arena bounds
fn escaped_position() -> impl Strategy<Value = Vec2> {
    let outside = prop_oneof![OUT_OF_BOUNDS + 1.0..OUT_OF_BOUNDS * 5.0, -OUT_OF_BOUNDS * 5.0..-OUT_OF_BOUNDS - 1.0];
    (outside, -50.0f32..50.0, any::<bool>()).prop_map(|(far, near, swap)| {
        if swap { Vec2::new(near, far) } else { Vec2::new(far, near) }
    })
}

// ============================================================================
// Parameter mapping
// ============================================================================

proptest! {
    #[test]
    fn lerp_is_monotonic(min in -100.0f32..100.0, span in 0.0f32..100.0, a in 0.0f32..=100.0, b in 0.0f32..=100.0) {
        let max = min + span;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(lerp(min, max, lo) <= lerp(min, max, hi) + 1e-4);
    }

    #[test]
    fn lerp_hits_both_ends(min in -100.0f32..100.0, max in -100.0f32..100.0) {
        prop_assert!((lerp(min, max, 0.0) - min).abs() < 1e-4);
        prop_assert!((lerp(min, max, 100.0) - max).abs() < 1e-4);
    }

    #[test]
    fn every_control_stays_in_range(raw in -50.0f32..150.0) {
        let mut controls = Controls::default();
        for param in Param::ALL {
            let stored = controls.set_raw(param, raw);
            prop_assert!((0.0..=100.0).contains(&stored));
            prop_assert_eq!(controls.raw(param), stored);

            let range = param.range();
            let value = controls.value(param);
            prop_assert!(value >= range.min - 1e-5 && value <= range.max + 1e-5);
        }
    }
}

// ============================================================================
// Arena
// ============================================================================

proptest! {
    #[test]
    fn walls_stay_evenly_spaced(speed in -3.0f32..3.0, dt in 0.0f32..0.1, steps in 1usize..50, openness in openness()) {
        let mut hex = Hexagon::new(openness);
        for _ in 0..steps {
            hex.update(speed, openness, dt);
        }
        let walls = hex.walls();
        for i in 0..HEX_SIDES {
            prop_assert!((walls[i].base_angle - i as f32 * WALL_SPACING).abs() < 1e-5);
            let a = walls[i].transform.position_2d();
            let b = walls[(i + 1) % HEX_SIDES].transform.position_2d();
            let step = normalize_angle(b.y.atan2(b.x) - a.y.atan2(a.x));
            prop_assert!((step - WALL_SPACING).abs() < 1e-3, "step {} at wall {}", step, i);
        }
    }

    #[test]
    fn zero_rotation_speed_keeps_walls_still(dt in 0.0f32..0.1, steps in 1usize..50, openness in openness()) {
        let mut hex = Hexagon::new(openness);
        hex.update(0.0, openness, dt);
        let before = *hex.walls();
        for _ in 0..steps {
            hex.update(0.0, openness, dt);
        }
        prop_assert_eq!(before, *hex.walls());
    }
}

// ============================================================================
// Scene lifecycle (real physics, fewer cases)
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn escaped_ball_is_removed_for_good(position in escaped_position()) {
        let config = SimConfig::default();
        let mut scene = Scene::new(&config);
        let chord = Chord::parse(&["C4", "E4", "G4"]).unwrap();
        let stays = scene.spawn(chord.clone(), &config);
        let leaves = scene.spawn(chord, &config);
        scene.place_ball(leaves, position, Vec2::ZERO);

        let report = scene.tick(&config, 1.0 / 60.0);
        prop_assert_eq!(report.despawned, vec![leaves]);
        prop_assert_eq!(scene.ball_count(), 1);
        prop_assert!(scene.ball_position(stays).is_some());

        for _ in 0..30 {
            scene.tick(&config, 1.0 / 60.0);
            prop_assert!(scene.ball_position(leaves).is_none());
            prop_assert!(scene.balls().get(leaves).is_none());
        }
    }

    #[test]
    fn table_keys_spawn_their_chord(index in 0usize..12, upper in any::<bool>()) {
        let table = ChordTable::default();
        let (key, chord) = table.entries().nth(index).unwrap();
        let key = if upper { key.to_ascii_uppercase() } else { key }.to_string();

        let config = SimConfig::default();
        let mut scene = Scene::new(&config);
        let id = scene.spawn_for_key(&table, &key, &config).unwrap();
        prop_assert_eq!(scene.ball_count(), 1);
        prop_assert_eq!(scene.balls().get(id).unwrap().chord(), chord);
    }
}

// ============================================================================
// Polyphony
// ============================================================================

proptest! {
    #[test]
    fn voice_pool_never_exceeds_cap(requests in prop::collection::vec((0.0f64..0.2, 1usize..6), 1..80)) {
        let mut pool = VoicePool::default();
        let mut now = 0.0;
        for (gap, wanted) in requests {
            now += gap;
            let granted = pool.admit(now, wanted, 1.25);
            prop_assert!(granted <= wanted);
            prop_assert!(pool.active(now) <= MAX_POLYPHONY);
        }
        // Everything has released a lifetime later
        prop_assert_eq!(pool.active(now + 1.25), 0);
    }
}
