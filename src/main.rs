//! Merge to Zero entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent};

    use merge_to_zero::consts::*;
    use merge_to_zero::persistence::LocalStore;
    use merge_to_zero::lobby::Cosmetic;
    use merge_to_zero::sim::{BodyLabel, GameEvent, GamePhase, PhysicsWorld, PieceDescriptor, PieceKind, RapierWorld};
    use merge_to_zero::{Settings, session::Session};

    /// Game instance holding all state
    struct Game {
        session: Session<RapierWorld, LocalStore>,
        ctx: CanvasRenderingContext2d,
        canvas: HtmlCanvasElement,
        last_time: f64,
        /// Pointer x in field coordinates
        pointer_x: f32,
    }

    impl Game {
        fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d, seed: u64) -> Self {
            let store = LocalStore::new();
            let settings = Settings::load(&store);
            let seed = settings.seed.unwrap_or(seed);
            Self {
                session: Session::new(settings, seed, RapierWorld::with_field_walls(), store),
                ctx,
                canvas,
                last_time: 0.0,
                pointer_x: FIELD_WIDTH / 2.0,
            }
        }

        /// Convert a client x coordinate to field space
        fn client_to_field_x(&self, client_x: f32) -> f32 {
            let rect = self.canvas.get_bounding_client_rect();
            let scale = FIELD_WIDTH / rect.width().max(1.0) as f32;
            (client_x - rect.left() as f32) * scale
        }

        fn update(&mut self, dt: f32) {
            for event in self.session.update(dt) {
                match event {
                    GameEvent::GameOver { score } => log::info!("Final score: {}", score),
                    GameEvent::Victory { score, level } => {
                        log::info!("All {} levels cleared with {} points", level, score)
                    }
                    _ => {}
                }
            }
        }

        fn render(&self) {
            let ctx = &self.ctx;
            let state = &self.session.state;
            let world = &self.session.world;

            ctx.set_fill_style_str("#f5f0e8");
            ctx.fill_rect(0.0, 0.0, FIELD_WIDTH as f64, FIELD_HEIGHT as f64);

            // Danger line
            ctx.set_stroke_style_str("rgba(220, 60, 60, 0.5)");
            ctx.set_line_width(2.0);
            ctx.begin_path();
            ctx.move_to(0.0, state.settings.danger_line as f64);
            ctx.line_to(FIELD_WIDTH as f64, state.settings.danger_line as f64);
            ctx.stroke();

            for (&handle, piece) in &state.pieces {
                if let Some(pos) = world.position(handle) {
                    draw_ball(ctx, pos.x, pos.y, piece.radius, ball_color(&piece.kind), &piece.kind.label());
                }
            }

            ctx.set_fill_style_str("#ffd166");
            for handle in world.bodies_with_label(BodyLabel::Particle) {
                if let Some(pos) = world.position(handle) {
                    ctx.begin_path();
                    let _ = ctx.arc(pos.x as f64, pos.y as f64, 4.0, 0.0, TAU);
                    ctx.fill();
                }
            }

            // Aim ghost
            if state.drop_ready() {
                if let Some(desc) = &state.current {
                    let x = merge_to_zero::clamp_drop_x(self.pointer_x, desc.radius);
                    ctx.set_global_alpha(0.35);
                    draw_descriptor(ctx, x, desc.radius + 4.0, desc);
                    ctx.set_global_alpha(1.0);
                }
            }

            if let Some(combo) = &state.combo {
                ctx.set_font(if combo.highlight { "bold 22px sans-serif" } else { "16px sans-serif" });
                ctx.set_text_align("center");
                ctx.set_fill_style_str(if combo.highlight { "#e63946" } else { "#2d2d2d" });
                let _ = ctx.fill_text(&combo.text, combo.pos.x as f64, (combo.pos.y - 30.0) as f64);
            }

            if state.phase() == GamePhase::Transitioning {
                ctx.set_font("bold 28px sans-serif");
                ctx.set_text_align("center");
                ctx.set_fill_style_str("#2a9d8f");
                let _ = ctx.fill_text("LEVEL CLEAR!", FIELD_WIDTH as f64 / 2.0, FIELD_HEIGHT as f64 / 2.0);
            }
        }

        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let state = &self.session.state;
            let records = &self.session.records;

            let set_text = |id: &str, text: &str| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(text));
                }
            };
            set_text("score", &state.score.to_string());
            set_text("best", &records.best_score.max(state.score).to_string());
            if state.settings.variant.is_tiered() {
                set_text("level", &format!("Level {}", state.level.current_level));
            }

            // Preview strip: current piece then the queue
            let preview: Vec<String> = state
                .current
                .iter()
                .chain(state.queue.iter())
                .map(|d| d.kind.label())
                .collect();
            set_text("preview", &preview.join("  "));

            // Lobby wardrobe earned so far
            let wardrobe: Vec<&str> = Cosmetic::unlocked(records.time_played_ms)
                .iter()
                .filter(|c| **c != Cosmetic::None)
                .map(|c| c.name())
                .collect();
            set_text("unlocks", &wardrobe.join(", "));

            let overlay = match state.phase() {
                GamePhase::GameOver => Some("Game Over"),
                GamePhase::Victory => Some("You Win!"),
                _ => None,
            };
            if let Some(el) = document.get_element_by_id("game-over") {
                match overlay {
                    Some(title) => {
                        let _ = el.set_attribute("class", "");
                        set_text("game-over-title", title);
                        set_text("final-score", &state.score.to_string());
                    }
                    None => {
                        let _ = el.set_attribute("class", "hidden");
                    }
                }
            }
        }
    }

    fn draw_ball(ctx: &CanvasRenderingContext2d, x: f32, y: f32, r: f32, color: &str, label: &str) {
        ctx.set_fill_style_str(color);
        ctx.begin_path();
        let _ = ctx.arc(x as f64, y as f64, r as f64, 0.0, TAU);
        ctx.fill();

        ctx.set_fill_style_str("#ffffff");
        ctx.set_font(&format!("bold {}px sans-serif", (r * 0.8).round()));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        let _ = ctx.fill_text(label, x as f64, y as f64);
    }

    fn draw_descriptor(ctx: &CanvasRenderingContext2d, x: f32, y: f32, desc: &PieceDescriptor) {
        draw_ball(ctx, x, y, desc.radius, ball_color(&desc.kind), &desc.kind.label());
    }

    /// Tier colour for numbers; operators share one accent
    fn ball_color(kind: &PieceKind) -> &'static str {
        kind.style().map(|s| s.color).unwrap_or("#9b5de5")
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Merge to Zero starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document");
            return;
        };
        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No canvas element");
            return;
        };
        canvas.set_width(FIELD_WIDTH as u32);
        canvas.set_height(FIELD_HEIGHT as u32);

        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            log::error!("2D canvas unavailable");
            return;
        };

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(canvas.clone(), ctx, seed)));
        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(&canvas, game.clone());
        setup_restart_button(game.clone());
        request_animation_frame(game);
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Aim
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.pointer_x = g.client_to_field_x(event.client_x() as f32);
            });
            let _ = canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Click to drop
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                let x = g.client_to_field_x(event.client_x() as f32);
                g.pointer_x = x;
                g.session.queue_drop(x);
            });
            let _ = canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard: space drops, R restarts
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.code().as_str() {
                    "Space" => {
                        event.prevent_default();
                        let x = g.pointer_x;
                        g.session.queue_drop(x);
                    }
                    "KeyR" => g.session.queue_restart(),
                    _ => {}
                }
            });
            let _ = document.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_restart_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().session.queue_restart();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Merge to Zero (native) starting...");
    log::info!("Native mode runs a headless autoplay - serve the wasm build to play");

    let mut args = std::env::args().skip(1);
    let variant = args
        .next()
        .and_then(|s| merge_to_zero::RuleVariant::from_str(&s))
        .unwrap_or_default();
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });

    autoplay(merge_to_zero::Settings::for_variant(variant), seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Drop pieces at random spots until the run ends (or five simulated minutes pass)
#[cfg(not(target_arch = "wasm32"))]
fn autoplay(settings: merge_to_zero::Settings, seed: u64) {
    use merge_to_zero::consts::*;
    use merge_to_zero::persistence::MemoryStore;
    use merge_to_zero::session::Session;
    use merge_to_zero::sim::{GameEvent, GamePhase, RapierWorld};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    let mut aim = Pcg32::seed_from_u64(seed ^ 0x5eed);
    let mut session = Session::new(settings, seed, RapierWorld::with_field_walls(), MemoryStore::new());
    let mut merges = 0u32;
    let mut zeros = 0u32;

    for _ in 0..TICKS_PER_SECOND * 300 {
        if session.state.drop_ready() {
            session.queue_drop(aim.random_range(0.0..FIELD_WIDTH));
        }
        for event in session.step() {
            if let GameEvent::Merge(merge) = event {
                merges += 1;
                if merge.resolution.is_zero() {
                    zeros += 1;
                }
            }
        }
        if matches!(session.state.phase(), GamePhase::GameOver | GamePhase::Victory) {
            break;
        }
    }

    let state = &session.state;
    println!("\nseed {} ({} rules)", seed, state.settings.variant.as_str());
    println!("  phase:  {:?}", state.phase());
    println!("  score:  {}", state.score);
    println!("  level:  {}", state.level.current_level);
    println!("  merges: {} ({} zero)", merges, zeros);
    println!("  time:   {:.1}s", state.time_ticks as f32 * SIM_DT);
}
