use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::milestone::Celebration;

pub const WIDTH: f64 = 600.0;
pub const HEIGHT: f64 = 350.0;
pub const FRAME: Duration = Duration::from_millis(30);

const COLORS: [(u8, u8, u8); 6] = [
    (0xff, 0x52, 0x52),
    (0x4f, 0xc3, 0xf7),
    (0x69, 0xf0, 0xae),
    (0xbb, 0x86, 0xfc),
    (0xff, 0xff, 0x00),
    (0xff, 0x98, 0x00),
];

// Frame numbers for the two bursts and the confetti drop
const BURSTS: [(u32, f64, f64); 2] = [(0, 150.0, 150.0), (27, 450.0, 150.0)];
const CONFETTI_AT: u32 = 53;

const SPARKS_PER_BURST: usize = 40;
const SPARK_LIFE: u32 = 30;
const GRAVITY: f64 = 0.1;
const CONFETTI_PIECES: usize = 100;
const CONFETTI_FLOOR: f64 = 400.0;

pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone)]
struct Spark {
    x: f64,
    y: f64,
    dx: f64,
    dy: f64,
    color: Rgb,
    life: u32,
}

#[derive(Debug, Clone)]
struct Piece {
    x: f64,
    y: f64,
    speed: f64,
    color: Rgb,
}

/// Firework and confetti particles in screen coordinates (y grows downward).
pub struct Fireworks {
    pub celebration: Celebration,
    sparks: Vec<Spark>,
    confetti: Vec<Piece>,
    frame: u32,
    rng: StdRng,
}

impl Fireworks {
    pub fn new(celebration: Celebration) -> Self {
        Self::with_rng(celebration, StdRng::from_entropy())
    }

    pub fn with_rng(celebration: Celebration, rng: StdRng) -> Self {
        let mut fw = Self {
            celebration,
            sparks: Vec::new(),
            confetti: Vec::new(),
            frame: 0,
            rng,
        };
        fw.spawn_scheduled();
        fw
    }

    fn color(&mut self) -> Rgb {
        COLORS[self.rng.gen_range(0..COLORS.len())]
    }

    fn burst(&mut self, x: f64, y: f64) {
        for _ in 0..SPARKS_PER_BURST {
            let angle: f64 = self.rng.gen_range(0.0..360.0_f64).to_radians();
            let speed = self.rng.gen_range(2.0..7.0);
            let color = self.color();
            self.sparks.push(Spark {
                x,
                y,
                dx: speed * angle.cos(),
                dy: speed * angle.sin(),
                color,
                life: SPARK_LIFE,
            });
        }
    }

    fn drop_confetti(&mut self) {
        for _ in 0..CONFETTI_PIECES {
            let piece = Piece {
                x: self.rng.gen_range(0.0..WIDTH),
                y: self.rng.gen_range(-100.0..-10.0),
                speed: self.rng.gen_range(1.0..3.0),
                color: self.color(),
            };
            self.confetti.push(piece);
        }
    }

    fn spawn_scheduled(&mut self) {
        for (at, x, y) in BURSTS {
            if self.frame == at {
                self.burst(x, y);
            }
        }
        if self.frame == CONFETTI_AT {
            self.drop_confetti();
        }
    }

    /// Advances the animation by one frame.
    pub fn step(&mut self) {
        for s in &mut self.sparks {
            s.x += s.dx;
            s.y += s.dy;
            s.dy += GRAVITY;
            s.life = s.life.saturating_sub(1);
        }
        self.sparks.retain(|s| s.life > 0);

        for p in &mut self.confetti {
            p.y += p.speed;
        }
        self.confetti.retain(|p| p.y < CONFETTI_FLOOR);

        self.frame += 1;
        self.spawn_scheduled();
    }

    pub fn is_finished(&self) -> bool {
        self.frame > CONFETTI_AT && self.sparks.is_empty() && self.confetti.is_empty()
    }

    #[cfg(test)]
    pub fn particle_count(&self) -> usize {
        self.sparks.len() + self.confetti.len()
    }

    /// Visible particles grouped by colour, flipped so y grows upward for a
    /// chart-style canvas with bounds `[0, WIDTH] x [0, HEIGHT]`.
    pub fn points(&self) -> Vec<(Rgb, Vec<(f64, f64)>)> {
        let mut groups: Vec<(Rgb, Vec<(f64, f64)>)> =
            COLORS.iter().map(|c| (*c, Vec::new())).collect();
        let visible = self
            .sparks
            .iter()
            .map(|s| (s.color, s.x, s.y))
            .chain(self.confetti.iter().map(|p| (p.color, p.x, p.y)))
            .filter(|(_, x, y)| (0.0..=WIDTH).contains(x) && (0.0..=HEIGHT).contains(y));

        for (color, x, y) in visible {
            if let Some((_, pts)) = groups.iter_mut().find(|(c, _)| *c == color) {
                pts.push((x, HEIGHT - y));
            }
        }
        groups.retain(|(_, pts)| !pts.is_empty());
        groups
    }
}
