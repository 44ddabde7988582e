//! Blockfall headless driver
//!
//! Steps a run at the fixed tick rate without any presentation layer.
//! Usage: `blockfall [mode] [seed] [ticks]`. Daily mode ignores the seed
//! argument and derives one from the UTC date.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use blockfall::consts::TICK_RATE;
use blockfall::sim::{InputFrame, Mode, Run, RunConfig};
use blockfall::{Profile, Tuning};

/// Seed shared by everyone playing today's daily challenge.
fn daily_seed() -> u64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    secs / 86_400
}

/// A canned input script so a headless run exercises more than gravity:
/// walk back and forth, hop periodically.
fn scripted_input(tick: u64) -> InputFrame {
    let phase = tick % 240;
    InputFrame {
        left: phase >= 120,
        right: phase < 120,
        jump: tick % 90 == 0,
        jump_released: tick % 90 == 20,
        ..Default::default()
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let mode: Mode = args
        .get(1)
        .map(|s| s.parse())
        .transpose()
        .unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(2);
        })
        .unwrap_or(Mode::Classic);
    let seed = match mode {
        Mode::Daily => daily_seed(),
        _ => args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0),
    };
    let ticks: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(3600);

    let profile_path = PathBuf::from("blockfall_profile.json");
    let mut profile = Profile::load(&profile_path);
    profile.stats.runs_started += 1;

    let mut modifiers = blockfall::sim::Modifiers {
        upgrades: profile.upgrade_levels(),
        artifact: profile.equipped_artifact(),
        ..Default::default()
    };
    modifiers.directive = None;

    let config = RunConfig {
        mode,
        seed,
        character: profile.characters.selected.clone(),
        modifiers,
        directive: profile.active_directive.clone(),
        ..Default::default()
    };

    log::info!("stepping {ticks} ticks of {mode:?} (seed {seed})");
    let mut run = match Run::new(config, Tuning::default()) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("config rejected: {e}");
            std::process::exit(2);
        }
    };

    let mut last = run.snapshot();
    let mut coins = 0u64;
    for tick in 0..ticks {
        last = run.step(scripted_input(tick));
        for event in &last.events {
            if let blockfall::sim::GameEvent::CoinPicked { value } = event {
                coins += *value as u64;
            }
        }
        if last.terminal {
            break;
        }
    }

    profile.stats.play_time += last.tick as f64 / TICK_RATE as f64;
    profile.record_run(last.score, coins, mode == Mode::Daily);
    if let Err(e) = profile.save(&profile_path) {
        log::warn!("could not save profile: {e}");
    }

    println!(
        "tick {}  score {}  combo x{:.2}  tiles {}  biome {}  {}",
        last.tick,
        last.score,
        last.combo_multiplier,
        last.tiles.len(),
        last.biome_index,
        if last.dead { "dead" } else { "alive" }
    );
}
