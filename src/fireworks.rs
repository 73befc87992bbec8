use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::{debug, info};

use crate::clock::FrameDelta;
use crate::config::{Config, PhysicsConfig, RenderConfig};
use crate::fps::FpsCounter;
use crate::surface::{Rgb, Surface};

/// Frame duration the per-frame rates are tuned for (60 fps).
const FRAME_MS: f64 = 16.67;
// Random launches stay out of the bottom fifth of the sky.
const SPAWN_HEIGHT_FRACTION: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    size: f32,
    alpha: f32,
}

impl Particle {
    /// State after `ndt` normalized frames. Alpha may go negative here; such
    /// particles fail `is_alive` and are dropped before they are drawn.
    fn advance(&self, ndt: f32, physics: &PhysicsConfig) -> Particle {
        Particle {
            x: self.x + self.vx * ndt,
            y: self.y + self.vy * ndt,
            vx: self.vx,
            vy: self.vy + physics.gravity * ndt,
            size: (self.size - physics.shrink_rate * ndt).max(0.0),
            alpha: self.alpha - physics.fade_rate * ndt,
        }
    }

    fn is_alive(&self, bounds: Bounds) -> bool {
        self.alpha > 0.0
            && self.size > 0.0
            && self.y < bounds.height
            && self.x >= 0.0
            && self.x <= bounds.width
    }
}

pub struct Firework {
    x: f32,
    y: f32,
    // Launch drift. Recorded, but the burst does not move with it.
    drift: (f32, f32),
    color: Rgb,
    flash_start: f64,
    particles: Vec<Particle>,
}

impl Firework {
    /// Creates a firework and bursts it into `count` particles at once.
    fn explode(
        x: f32,
        y: f32,
        now_ms: f64,
        count: usize,
        physics: &PhysicsConfig,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let color = Rgb(rng.u8(0..255), rng.u8(0..255), rng.u8(0..255));
        let drift = (rng.f32() - 0.5, rng.f32());

        let particles = (0..count)
            .map(|_| {
                let angle = rng.f32() * std::f32::consts::TAU;
                let speed = rng.f32() * physics.max_speed;
                Particle {
                    x,
                    y,
                    vx: angle.cos() * speed,
                    vy: angle.sin() * speed,
                    size: rng.f32() * physics.particle_size + physics.min_particle_size,
                    alpha: 1.0,
                }
            })
            .collect();

        Self {
            x,
            y,
            drift,
            color,
            flash_start: now_ms,
            particles,
        }
    }

    /// Advances every particle, then keeps only the survivors.
    fn step(&mut self, ndt: f32, physics: &PhysicsConfig, bounds: Bounds) {
        for particle in &mut self.particles {
            *particle = particle.advance(ndt, physics);
        }
        self.particles.retain(|p| p.is_alive(bounds));
    }

    /// Opacity of the launch flash, `None` once the window has passed.
    fn flash_alpha(&self, now_ms: f64, duration_ms: f64) -> Option<f32> {
        let elapsed = now_ms - self.flash_start;
        (elapsed < duration_ms).then(|| (1.0 - elapsed / duration_ms) as f32)
    }

    fn is_finished(&self, now_ms: f64, duration_ms: f64) -> bool {
        self.particles.is_empty() && now_ms - self.flash_start >= duration_ms
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

/// All simulation state: the live fireworks, the clock, the RNG and the
/// runtime toggles.
pub struct FireworkShow {
    physics: PhysicsConfig,
    render: RenderConfig,
    generation_rate: f32,
    particle_count: usize,
    bounds: Bounds,
    fireworks: Vec<Firework>,
    rng: fastrand::Rng,
    // simulation clock, advanced by capped deltas
    now_ms: f64,
    // real elapsed time, for the frame rate
    wall_ms: f64,
    fps: FpsCounter,
    clicking_enabled: bool,
    show_fps: bool,
}

impl FireworkShow {
    pub fn new(config: &Config, width: usize, height: usize, rng: fastrand::Rng) -> Self {
        Self {
            physics: config.physics.clone(),
            render: config.render.clone(),
            generation_rate: config.generation_rate(),
            particle_count: config.particle_count(),
            bounds: Bounds {
                width: width as f32,
                height: height as f32,
            },
            fireworks: Vec::new(),
            rng,
            now_ms: 0.0,
            wall_ms: 0.0,
            fps: FpsCounter::new(),
            clicking_enabled: config.clicking_enabled,
            show_fps: config.show_fps,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.bounds = Bounds {
            width: width as f32,
            height: height as f32,
        };
    }

    #[cfg(test)]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[cfg(test)]
    pub fn fireworks(&self) -> &[Firework] {
        &self.fireworks
    }

    pub fn particle_count(&self) -> usize {
        self.fireworks.iter().map(Firework::particle_count).sum()
    }

    pub fn spawn_at(&mut self, x: f32, y: f32) {
        let firework = Firework::explode(
            x,
            y,
            self.now_ms,
            self.particle_count,
            &self.physics,
            &mut self.rng,
        );
        debug!(
            x,
            y,
            color = ?firework.color,
            drift = ?firework.drift,
            particles = firework.particles.len(),
            "firework spawned"
        );
        self.fireworks.push(firework);
    }

    /// Runs one frame. Physics and flashes follow `frame.sim_ms`, the frame
    /// rate follows `frame.wall_ms`.
    pub fn update(&mut self, frame: FrameDelta) {
        self.now_ms += frame.sim_ms;
        self.wall_ms += frame.wall_ms;
        self.fps.record(self.wall_ms);
        let ndt = (frame.sim_ms / FRAME_MS) as f32;

        if self.rng.f32() < self.generation_rate * ndt {
            let x = self.rng.f32() * self.bounds.width;
            let y = self.rng.f32() * self.bounds.height * SPAWN_HEIGHT_FRACTION;
            self.spawn_at(x, y);
        }

        for firework in &mut self.fireworks {
            firework.step(ndt, &self.physics, self.bounds);
        }

        let (now, flash) = (self.now_ms, self.physics.flash_duration_ms);
        self.fireworks.retain(|f| !f.is_finished(now, flash));
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        let (width, height) = surface.size();
        surface.fill_rect(
            0.0,
            0.0,
            width,
            height,
            self.render.background.with_alpha(self.render.trail_alpha),
        );

        for firework in &self.fireworks {
            if let Some(alpha) = firework.flash_alpha(self.now_ms, self.physics.flash_duration_ms) {
                surface.fill_circle(
                    firework.x,
                    firework.y,
                    self.physics.particle_size * 2.0,
                    Rgb::WHITE.with_alpha(alpha),
                );
            }

            for particle in &firework.particles {
                surface.set_glow(
                    self.render.glow_blur,
                    firework.color.with_alpha(self.render.glow_alpha),
                );
                surface.fill_circle(
                    particle.x,
                    particle.y,
                    particle.size,
                    firework.color.with_alpha(particle.alpha),
                );
                surface.clear_glow();
            }
        }

        if self.show_fps {
            let label = match self.fps.fps() {
                Some(fps) => format!("FPS: {}", fps.round()),
                None => "FPS: --".to_string(),
            };
            surface.fill_text(1.0, 0.0, &label, Rgb::WHITE.with_alpha(1.0));
        }
    }

    /// Alt+Shift+Z toggles click spawning, Alt+Shift+X the FPS counter.
    /// Mouse presses spawn at the pointer while clicking is enabled.
    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let KeyCode::Char(c) = key.code else {
                    return;
                };
                let shifted =
                    key.modifiers.contains(KeyModifiers::SHIFT) || c.is_ascii_uppercase();
                if !key.modifiers.contains(KeyModifiers::ALT) || !shifted {
                    return;
                }
                match c.to_ascii_lowercase() {
                    'z' => {
                        self.clicking_enabled = !self.clicking_enabled;
                        info!(enabled = self.clicking_enabled, "click spawning toggled");
                    }
                    'x' => {
                        self.show_fps = !self.show_fps;
                        info!(enabled = self.show_fps, "fps counter toggled");
                    }
                    _ => {}
                }
            }
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(_),
                column,
                row,
                ..
            }) if self.clicking_enabled => {
                // cell centre; each row holds two pixels
                self.spawn_at(*column as f32 + 0.5, *row as f32 * 2.0 + 0.5);
            }
            _ => {}
        }
    }
}
