//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::drop::DropState;
use super::fruit::find_merge_partner;
use super::physics::{PhysicsWorld, SimulationMode};
use super::state::{GameEvent, GameOverReason, GamePhase, GameState};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal pointer position in world units
    pub pointer_x: Option<f32>,
    /// Press began (mouse down / touch start)
    pub press: bool,
    /// Press ended (mouse up / touch end)
    pub release: bool,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick<W: PhysicsWorld + ?Sized>(state: &mut GameState, world: &mut W, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            GamePhase::GameOver => {}
        }
    }

    // Don't tick if paused or game over
    if state.phase != GamePhase::Playing {
        return;
    }

    let input = if input.idle_mode {
        autopilot(state, input)
    } else {
        input.clone()
    };

    state.time_ticks += 1;
    state.clock += dt as f64;

    if let Some(timer) = &mut state.timer
        && timer.advance(dt)
    {
        state.end_game(world, GameOverReason::TimeUp);
        return;
    }

    update_drop(state, world, &input);
    update_prediction(state, world);

    if world.simulation_mode() == SimulationMode::Auto {
        world.step(dt);
    }
    state.board.sync_from_world(world);

    request_contact_merges(state, world);
    request_settled_merges(state, world);
    resolve_merges(state, world);

    if state.game_over.observe(&state.board.fruits, state.clock) {
        state.end_game(world, GameOverReason::Overflow);
    }
}

fn update_drop<W: PhysicsWorld + ?Sized>(state: &mut GameState, world: &mut W, input: &TickInput) {
    if let Some(x) = input.pointer_x {
        state.session.track(world, x, &state.tuning);
    }

    if input.press {
        state.session.press();
    }

    if input.release
        && let Some(fruit) = state.session.release(world, state.clock, &state.tuning)
    {
        log::debug!("Dropped {} at x={:.2}", fruit.level.name(), fruit.pos.x);
        state.events.push(GameEvent::Dropped {
            id: fruit.id,
            level: fruit.level,
            x: fruit.pos.x,
        });
        state.board.insert(fruit);
        if let Some(predictor) = &mut state.predictor {
            predictor.hide();
        }
    }

    let respawned = state.session.update(
        world,
        &mut state.spawner,
        &mut state.ids,
        state.clock,
        &state.tuning,
    );
    if let Some(level) = respawned {
        state.events.push(GameEvent::Respawned {
            level,
            next: state.spawner.preview(),
        });
    }
}

fn update_prediction<W: PhysicsWorld + ?Sized>(state: &mut GameState, world: &mut W) {
    let Some(predictor) = &mut state.predictor else {
        return;
    };

    match (&state.session.held, state.session.state) {
        (Some(held), DropState::Aiming) => {
            let start = state.session.drop_position(&state.tuning);
            let radius = held.radius;
            // Finished jobs are re-requested so the path follows board changes
            predictor.request(start, radius);
            predictor.advance(world);
        }
        _ => {
            if predictor.is_busy() || predictor.latest().is_some() {
                predictor.hide();
            }
        }
    }
}

fn request_contact_merges<W: PhysicsWorld + ?Sized>(state: &mut GameState, world: &mut W) {
    for (body_a, body_b) in world.drain_contacts() {
        let (Some(a), Some(b)) = (state.board.by_body(body_a), state.board.by_body(body_b)) else {
            continue;
        };
        let (a, b) = (a.id, b.id);
        state
            .merges
            .request_contact(&mut state.board, a, b, state.clock, &state.tuning);
    }

    // Contacts only begin once; pairs that were still cooling wait here
    state
        .merges
        .retry_deferred(&mut state.board, state.clock, &state.tuning);
}

fn request_settled_merges<W: PhysicsWorld + ?Sized>(state: &mut GameState, world: &W) {
    state.board.schedule_merge_checks(state.clock, &state.tuning);

    for id in state.board.take_due_checks(state.clock) {
        if let Some(partner) = find_merge_partner(&state.board, world, id, state.clock, &state.tuning) {
            state
                .merges
                .request_merge(&mut state.board, id, partner, state.clock, &state.tuning);
        }
    }
}

fn resolve_merges<W: PhysicsWorld + ?Sized>(state: &mut GameState, world: &mut W) {
    let outcomes = state.merges.resolve(
        &mut state.board,
        world,
        &mut state.ids,
        state.clock,
        &state.tuning,
    );

    for outcome in outcomes {
        state.events.push(GameEvent::Merged {
            consumed: outcome.consumed,
            created: outcome.created,
            level: outcome.level,
            pos: outcome.pos,
            points: outcome.points,
        });
        state.add_score(outcome.points);
    }
}

/// Ticks the autopilot aims before letting go
const AUTOPILOT_AIM_TICKS: u64 = 30;

/// Synthesize input for idle/demo mode
///
/// Picks a column while holding (over the highest fruit matching the held
/// level, or a sweep across the container when there is none), then keeps the
/// aim still until the aim line is ready and lets go.
fn autopilot(state: &GameState, input: &TickInput) -> TickInput {
    let mut input = TickInput {
        pause: input.pause,
        ..Default::default()
    };
    let Some(level) = state.session.held_level() else {
        return input;
    };

    match state.session.state {
        DropState::Holding => {
            let target = state
                .board
                .fruits
                .iter()
                .filter(|f| f.level == level)
                .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
                .map(|f| f.pos.x)
                .unwrap_or_else(|| {
                    let (min_x, max_x) = state.tuning.drop_range();
                    let t = state.time_ticks as f32 * 0.013;
                    let sweep = t.sin() * 0.6 + (t * 0.37).sin() * 0.4;
                    (min_x + max_x) / 2.0 + sweep * (max_x - min_x) / 2.0
                });
            input.pointer_x = Some(target);
            input.press = true;
        }
        DropState::Aiming => {
            let aim_ready = state
                .predictor
                .as_ref()
                .is_none_or(|p| p.latest().is_some());
            input.release = aim_ready && state.time_ticks % AUTOPILOT_AIM_TICKS == 0;
        }
        _ => {}
    }
    input
}
