//! Headless stress run -- a crowd of wanderers on a generated level.
//!
//! Run with:
//!   RUST_LOG=tilestep_engine=debug cargo run --example stress_run -p tilestep-engine -- 600 7
//!
//! Arguments: frame count (default 600) and RNG seed (default 7).
//!
//! Wanderers that touch a lethal tile are despawned at the end of the frame
//! and respawned at the start area; touching the goal scores a point. A
//! lift platform carries anything standing on it. The final state hash is
//! printed so two runs with the same seed can be compared.

use std::collections::BTreeSet;

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tilestep_engine::prelude::*;
use tracing::info;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const CROWD: usize = 200;

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

fn build_level(rng: &mut Pcg64) -> TileGrid {
    let mut grid = TileGrid::filled(WIDTH, HEIGHT, TileKind::Hollow);
    let (w, h) = (i64::from(WIDTH), i64::from(HEIGHT));
    grid.fill_rect(0, h - 4, w, 4, TileKind::Solid);
    grid.fill_rect(0, 0, 2, h, TileKind::Solid);
    grid.fill_rect(w - 2, 0, 2, h, TileKind::Solid);

    for _ in 0..25 {
        let x = rng.gen_range(20..w - 40);
        let y = rng.gen_range(20..h - 30);
        grid.fill_rect(x, y, rng.gen_range(10..40), 2, TileKind::Solid);
    }
    for _ in 0..8 {
        let x = rng.gen_range(20..w - 20);
        grid.fill_rect(x, h - 6, 6, 2, TileKind::Lethal);
    }
    grid.fill_rect(w - 20, h - 30, 10, 10, TileKind::Goal);
    if let Some(zone) = TileKind::area_trigger(3) {
        grid.fill_rect(w / 2, 10, 12, 12, zone);
    }
    grid
}

// ---------------------------------------------------------------------------
// World rules
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Rules {
    doomed: BTreeSet<EntityId>,
    goals: u64,
    zone_visits: u64,
}

impl TileHandler for Rules {
    fn on_tile_touch(&mut self, entity: EntityId, kind: TileKind) {
        match kind {
            TileKind::Lethal => {
                self.doomed.insert(entity);
            }
            TileKind::Goal => self.goals += 1,
            TileKind::AreaTrigger(_) => self.zone_visits += 1,
            TileKind::Hollow | TileKind::Solid => {}
        }
    }
}

fn spawn_wanderer(stage: &mut Stage<TileGrid>, rng: &mut Pcg64) -> EntityId {
    let x = rng.gen_range(4.0f32..60.0);
    let id = stage.spawn(Rect::new(x, 8.0, 6.0, 8.0));
    if let Ok(body) = stage.body_mut(id) {
        body.set_triggerable(true);
        body.set_move_speed(rng.gen_range(0.5f32..2.5));
        if rng.gen_bool(0.5) {
            body.set_hitbox(Hitbox::Circle);
        }
        let _ = body.set_double_faced(true, true);
    }
    id
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let frames: u64 = match args.next() {
        Some(raw) => raw.parse().context("frame count must be a whole number")?,
        None => 600,
    };
    let seed: u64 = match args.next() {
        Some(raw) => raw.parse().context("seed must be a whole number")?,
        None => 7,
    };

    let config = StageConfig::from_json(r#"{ "default_move_speed": 1.5 }"#)?;
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut stage = Stage::new(build_level(&mut rng), config);

    let lift = stage.spawn(Rect::new(100.0, 120.0, 30.0, 3.0));
    stage.body_mut(lift)?.set_manual_facing(true);

    let mut crowd: Vec<EntityId> = (0..CROWD).map(|_| spawn_wanderer(&mut stage, &mut rng)).collect();
    let mut rules = Rules::default();
    let mut deaths = 0u64;

    for frame in 0..frames {
        // Lift goes up and down over 120 frames.
        let lift_dy = if (frame / 60) % 2 == 0 { -1.0 } else { 1.0 };
        let (lx, ly) = stage.body(lift)?.position();
        stage.body_mut(lift)?.set_position(lx, ly + lift_dy);

        for &id in &crowd {
            // Gravity first, then a random stroll.
            stage.try_step(id, Step::Down, 2)?;
            let step = if rng.gen_bool(0.5) { Step::Left } else { Step::Right };
            stage.try_step(id, step, rng.gen_range(0..3))?;
            if rng.gen_ratio(1, 20) {
                let (x, y) = stage.body(id)?.position();
                stage.move_toward(id, x + rng.gen_range(-10.0..10.0), y - 6.0, None)?;
            }
            stage.carry(lift, id, true)?;
        }

        stage.step_frame(&mut rules);

        for id in std::mem::take(&mut rules.doomed) {
            stage.despawn(id)?;
            deaths += 1;
            let replacement = spawn_wanderer(&mut stage, &mut rng);
            if let Some(slot) = crowd.iter_mut().find(|slot| **slot == id) {
                *slot = replacement;
            }
        }

        if frame % 100 == 0 {
            let diag = stage.last_diagnostics();
            info!(
                frame = diag.frame,
                sampled = diag.bodies_sampled,
                events = diag.tile_events,
                micros = diag.total_time.as_micros() as u64,
                "frame"
            );
        }
    }

    for &id in crowd.iter().take(3) {
        let choice = stage.frame_for(id, 4, 0)?;
        info!(entity = %id, index = choice.index, flip = choice.flip_x, "render frame");
    }

    println!("frames:      {}", stage.frame_count());
    println!("bodies:      {}", stage.len());
    println!("deaths:      {deaths}");
    println!("goal hits:   {}", rules.goals);
    println!("zone visits: {}", rules.zone_visits);
    println!("state hash:  {}", stage.state_hash());
    Ok(())
}
