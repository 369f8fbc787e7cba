//! Interactive plot of a running simulation
//!
//! Bodies are drawn inside a fixed square of world space. When a scenario file
//! is in use it is watched, and the simulation is rebuilt whenever it changes.
//! Frame pacing lives here; the simulation core never sleeps.

use crate::{resolve_config, SimulationArgs};
use eframe::egui;
use nbody_core::{build_simulation_context, step_simulation, SimulationContext, SimulationState};
use notify::{Event, RecommendedWatcher, Watcher};
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Half the side of the plotted square, in world units
const WORLD_HALF_EXTENT: f32 = 75.0;

pub struct ViewerApp {
    args: SimulationArgs,
    ctx_opt: Option<SimulationContext>,
    last_load_error: Option<String>,
    playing: bool,
    speed_multiplier: f32,
    frame_interval: Duration,
    last_frame: Instant,
    #[allow(dead_code)] // Kept alive to maintain file watching
    file_watcher: Option<RecommendedWatcher>,
    file_receiver: mpsc::Receiver<notify::Result<Event>>,
}

impl ViewerApp {
    pub fn new(args: SimulationArgs, frame_interval: Duration, _cc: &eframe::CreationContext<'_>) -> Self {
        let (tx, rx) = mpsc::channel();
        let watcher = args.config.clone().and_then(|path| watch(&path, tx));

        let mut app = Self {
            args,
            ctx_opt: None,
            last_load_error: None,
            playing: false,
            speed_multiplier: 1.0,
            frame_interval,
            last_frame: Instant::now(),
            file_watcher: watcher,
            file_receiver: rx,
        };

        app.reload_context();
        app
    }

    fn reload_context(&mut self) {
        let built = resolve_config(&self.args)
            .and_then(|(config, _)| build_simulation_context(&config).map_err(Into::into));

        match built {
            Ok(ctx) => {
                self.ctx_opt = Some(ctx);
                self.last_load_error = None;
            }
            Err(e) => {
                log::warn!("failed to build simulation: {}", e);
                self.last_load_error = Some(e.to_string());
                self.ctx_opt = None;
                self.playing = false;
            }
        }
    }

    fn check_file_changes(&mut self) {
        let Some(config_path) = self.args.config.clone() else {
            return;
        };

        let mut needs_reload = false;
        while let Ok(event) = self.file_receiver.try_recv() {
            match event {
                Ok(Event {
                    kind: notify::EventKind::Modify(_),
                    paths,
                    ..
                }) => {
                    if paths.iter().any(|p| same_file(p, &config_path)) {
                        needs_reload = true;
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("file watcher error: {}", e),
            }
        }

        if needs_reload {
            log::info!("{} changed, rebuilding simulation", config_path.display());
            self.reload_context();
        }
    }

    fn advance(&mut self) {
        if !self.playing || self.last_frame.elapsed() < self.frame_interval {
            return;
        }
        self.last_frame = Instant::now();

        if let Some(ref mut ctx) = self.ctx_opt {
            let steps_per_frame = self.speed_multiplier.max(1.0).round() as usize;
            for _ in 0..steps_per_frame {
                if step_simulation(ctx).is_none() {
                    break;
                }
            }
            if ctx.state() == SimulationState::Terminal {
                self.playing = false;
            }
        }
    }
}

fn watch(path: &Path, tx: mpsc::Sender<notify::Result<Event>>) -> Option<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res| {
        // The receiver is gone during shutdown
        let _ = tx.send(res);
    })
    .ok()?;

    match watcher.watch(path, notify::RecursiveMode::NonRecursive) {
        Ok(()) => Some(watcher),
        Err(e) => {
            log::warn!("not watching {}: {}", path.display(), e);
            None
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_file_changes();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(if self.playing { "⏸ Pause" } else { "▶ Play" }).clicked() {
                    self.playing = !self.playing;
                }

                if ui.button("⏮ Reset").clicked() {
                    self.reload_context();
                    self.playing = false;
                }

                if ui.button("⏭ Step").clicked() {
                    if let Some(ref mut sim) = self.ctx_opt {
                        step_simulation(sim);
                    }
                }

                ui.separator();

                ui.label("Steps per frame:");
                ui.add(egui::Slider::new(&mut self.speed_multiplier, 1.0..=20.0));

                ui.separator();

                if let Some(ref sim) = self.ctx_opt {
                    ui.label(format!("Step: {} / {}", sim.current_step(), sim.max_steps()));
                    if let Some(seed) = sim.seed() {
                        ui.label(format!("Seed: {}", seed));
                    }
                    if sim.diverged() {
                        ui.colored_label(egui::Color32::YELLOW, "Stopped: out of f64 range");
                    }
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let rect = ui.max_rect();
            let painter = ui.painter();

            let center = rect.center();
            let scale = (rect.width().min(rect.height()) / (2.0 * WORLD_HALF_EXTENT)) * 0.95;
            let to_screen = |x: f64, y: f64| center + egui::vec2(x as f32 * scale, -(y as f32) * scale);

            // Axes
            let axis = egui::Stroke::new(1.0, egui::Color32::DARK_GRAY);
            let e = WORLD_HALF_EXTENT as f64;
            painter.line_segment([to_screen(-e, 0.0), to_screen(e, 0.0)], axis);
            painter.line_segment([to_screen(0.0, -e), to_screen(0.0, e)], axis);

            if let Some(ref sim) = self.ctx_opt {
                for body in sim.snapshot().bodies {
                    let screen_pos = to_screen(body.position.x, body.position.y);
                    let radius = ((body.mass.sqrt() as f32) * 2.0).clamp(2.0, 12.0);

                    painter.circle_filled(screen_pos, radius, egui::Color32::LIGHT_BLUE);
                    painter.circle_stroke(screen_pos, radius, egui::Stroke::new(1.0, egui::Color32::BLUE));
                }
            }

            if let Some(ref error) = self.last_load_error {
                ui.vertical_centered(|ui| {
                    ui.add_space(rect.height() * 0.4);
                    ui.label(
                        egui::RichText::new(format!("Error: {}", error))
                            .color(egui::Color32::RED)
                            .size(16.0),
                    );
                });
            }
        });

        self.advance();

        if self.playing {
            ctx.request_repaint_after(self.frame_interval);
        } else if self.args.config.is_some() {
            // Keep polling for scenario edits while paused
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }
}
