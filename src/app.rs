use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_event_to_action, PlayerAction};
use crate::model::{starter_parts, BodyPart, MeterKind, Rules, Scene, SlotType};
use crate::registry::PartRegistry;
use crate::render::{draw_meter, draw_robot, draw_severity, draw_text, draw_tray, Cell, Terminal};
use crate::sim::PetSim;
use crate::stage::TermStage;
use crossterm::style::Color;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::min;
use std::time::{Duration, Instant};

const SIM_STEP: f32 = 1.0 / 60.0;

pub(crate) struct App {
    settings: Settings,
    rules: Rules,
    paths: Paths,
    parts: Vec<BodyPart>,
    registry: PartRegistry,
    stage: TermStage,
    pet: PetSim,
    rng: StdRng,
    scene: Scene,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init() -> anyhow::Result<Self> {
        let paths = project_paths()?;
        let mut settings = load_settings(&paths.settings_path);
        if settings.seed == 0 {
            settings.seed = crate::config::DEFAULT_SEED;
        }

        let rules = Rules::default();
        let parts = starter_parts();
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut registry = PartRegistry::new(&parts, &mut rng);
        let mut stage = TermStage::new(parts.len());
        let pet = PetSim::new(&rules, &mut registry, &mut stage, &mut rng);

        let term = Terminal::begin()?;

        Ok(Self {
            settings,
            rules,
            paths,
            parts,
            registry,
            stage,
            pet,
            rng,
            scene: Scene::Playing,
            term,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let sim_step = Duration::from_secs_f32(SIM_STEP);

        let mut last_frame = Instant::now();
        let mut sim_accum = Duration::ZERO;

        while !self.should_quit {
            let frame_start = Instant::now();
            let _resized = self.term.resize_if_needed()?;

            // input
            let events = collect_input_nonblocking(frame_dt)?;
            for ev in events {
                if let Some(action) = map_event_to_action(self.scene, ev) {
                    self.apply(action);
                    if self.should_quit {
                        break;
                    }
                }
            }

            // sim fixed-step
            let now = Instant::now();
            let real_dt = now.saturating_duration_since(last_frame);
            last_frame = now;
            sim_accum = sim_accum.saturating_add(real_dt);

            while sim_accum >= sim_step {
                self.pet.tick(
                    SIM_STEP,
                    &self.rules,
                    &mut self.registry,
                    &mut self.stage,
                    &mut self.rng,
                );
                self.stage.tick(SIM_STEP);
                sim_accum = sim_accum.saturating_sub(sim_step);

                if self.pet.game_over && self.scene == Scene::Playing {
                    self.scene = Scene::Over;
                }
            }

            self.render_frame()?;

            spin_sleep(frame_dt, frame_start);
        }

        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        Ok(())
    }

    fn apply(&mut self, action: PlayerAction) {
        match action {
            PlayerAction::Drop(slot) => self.drop_part(slot),
            PlayerAction::HelpToggle => {
                self.scene = match self.scene {
                    Scene::Help => {
                        if self.pet.game_over {
                            Scene::Over
                        } else {
                            Scene::Playing
                        }
                    }
                    _ => Scene::Help,
                };
            }
            PlayerAction::Back => {
                if self.scene == Scene::Help {
                    self.scene = if self.pet.game_over {
                        Scene::Over
                    } else {
                        Scene::Playing
                    };
                }
            }
            PlayerAction::NewGame => self.new_game(),
            PlayerAction::Quit => self.should_quit = true,
        }
    }

    /// Routes a tray drop: equip slots re-attach the part, Food/Oil start a
    /// queued refill. Each offer can be dropped exactly once.
    fn drop_part(&mut self, slot: SlotType) {
        let Some(part) = self.registry.take_offer(slot) else {
            return;
        };
        match slot.as_equip() {
            Some(equip) => self.pet.set_slot(part, equip, &mut self.stage),
            None => {
                let kind = if slot == SlotType::Food {
                    MeterKind::Food
                } else {
                    MeterKind::Oil
                };
                self.pet.replenish(kind);
            }
        }
    }

    fn new_game(&mut self) {
        self.registry = PartRegistry::new(&self.parts, &mut self.rng);
        self.stage = TermStage::new(self.parts.len());
        self.pet = PetSim::new(&self.rules, &mut self.registry, &mut self.stage, &mut self.rng);
        self.scene = Scene::Playing;
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let bg = Color::Black;
        self.term.cur.clear(bg);

        let cols = self.term.cols as i32;
        let rows = self.term.rows as i32;
        let color = self.settings.enable_color;

        // left panel
        draw_text(&mut self.term.cur, 2, 1, "RUSTBUCKET", Color::White, bg);
        draw_meter(&mut self.term.cur, 2, 3, "food", self.stage.food, color);
        draw_meter(&mut self.term.cur, 2, 4, "oil", self.stage.oil, color);
        draw_severity(&mut self.term.cur, 2, 5, self.stage.severity, color);
        draw_tray(
            &mut self.term.cur,
            2,
            7,
            &self.registry,
            &self.parts,
            color,
        );
        draw_text(
            &mut self.term.cur,
            2,
            rows - 2,
            "drop keys listed left | h help | q quit",
            Color::DarkGrey,
            bg,
        );

        // pet viewport on the right
        let panel_w = 34.min(cols / 2);
        let cx = panel_w + (cols - panel_w) / 2;
        let cy = rows / 2;
        draw_robot(
            &mut self.term.cur,
            cx,
            cy,
            &self.pet,
            &self.parts,
            &self.stage,
            color,
        );

        if let Some(caption) = self.stage.caption() {
            draw_text(
                &mut self.term.cur,
                cx - caption.len() as i32 / 2,
                cy + 6,
                caption,
                Color::White,
                bg,
            );
        }

        if self.scene == Scene::Help {
            self.draw_center_box(
                "How to play",
                "Your robot pet is falling apart.\n\
    Food and oil drain over time; parts snap off at random.\n\n\
    Spare parts and refills show up in the tray on the left.\n\
    Press a tray key to drop its part onto the pet:\n\
    f food   o oil   l leg   e eye   t top plate   j jaw plate\n\n\
    Food and oil refills wait their turn: the pet finishes its\n\
    current reaction before the next one plays.\n\n\
    You lose when food or oil hits zero, or when every part\n\
    is gone at once.\n\n\
    Esc or H to close help.",
            );
        }

        if self.scene == Scene::Over && self.stage.overlay {
            self.draw_center_box(
                "Your rustbucket has shut down.",
                "Press N for new game, or Q to quit.",
            );
        }

        self.term.present(true)?;
        Ok(())
    }

    fn draw_center_box(&mut self, title: &str, body: &str) {
        let w = self.term.cols;
        let h = self.term.rows;

        let bw = min(62, w.saturating_sub(4));
        let bh = min(20, h.saturating_sub(4));

        let x0 = ((w - bw) / 2) as i32;
        let y0 = ((h - bh) / 2) as i32;
        let bw = bw as i32;
        let bh = bh as i32;

        for y in y0..y0 + bh {
            for x in x0..x0 + bw {
                self.term.cur.set(x, y, Cell::default());
            }
        }
        for x in x0..x0 + bw {
            self.term.cur.set(x, y0, Cell { ch: '─', ..Cell::default() });
            self.term.cur.set(x, y0 + bh - 1, Cell { ch: '─', ..Cell::default() });
        }
        for y in y0..y0 + bh {
            self.term.cur.set(x0, y, Cell { ch: '│', ..Cell::default() });
            self.term.cur.set(x0 + bw - 1, y, Cell { ch: '│', ..Cell::default() });
        }
        self.term.cur.set(x0, y0, Cell { ch: '┌', ..Cell::default() });
        self.term.cur.set(x0 + bw - 1, y0, Cell { ch: '┐', ..Cell::default() });
        self.term.cur.set(x0, y0 + bh - 1, Cell { ch: '└', ..Cell::default() });
        self.term.cur.set(x0 + bw - 1, y0 + bh - 1, Cell { ch: '┘', ..Cell::default() });

        draw_text(&mut self.term.cur, x0 + 2, y0 + 1, title, Color::White, Color::Black);

        let mut yy = y0 + 3;
        for line in body.lines() {
            if yy >= y0 + bh - 1 {
                break;
            }
            draw_text(&mut self.term.cur, x0 + 2, yy, line, Color::White, Color::Black);
            yy += 1;
        }
    }
}

pub(crate) fn run() -> anyhow::Result<()> {
    let mut app = App::init()?;
    app.run()?;
    Ok(())
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
