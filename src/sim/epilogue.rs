//! Scripted ending for the final stage
//!
//! No hazards and no input: the balloon drifts on a slow figure, hearts float
//! up, the couple jumps, the credits roll and the run ends as a victory.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::Balloon;
use crate::Field;

const GLIDE_TICKS: u32 = 360;
const JUMP_TICKS: u32 = 280;
const FINALE_TICKS: u32 = 180;
const HEART_EVERY: u32 = 25;
const JUMPER_HEART_EVERY: u32 = 18;
const SKY_DOTS: usize = 32;
const EASE_RATE: f32 = 0.035;

pub const ENDING_MESSAGE: &str = "💞 Kami's Happy Ending\n\nKami and his love jumped from the balloon hand in hand and were freed in the open sky.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Credit {
    pub title: &'static str,
    pub subtitle: &'static str,
    /// Ticks on screen
    pub duration: u32,
}

const fn credit(title: &'static str, subtitle: &'static str, duration: u32) -> Credit {
    Credit {
        title,
        subtitle,
        duration,
    }
}

pub const CREDITS: [Credit; 7] = [
    credit("Kami and His Love", "Together Again", 240),
    credit("Free Flight", "The Sky Belongs to Both", 240),
    credit("Game Designers", "Sepehr Kheiri", 200),
    credit("Group Leader", "Mohammad Mehdi Shirmohammadi", 200),
    credit("Executive Director", "Ali Hamzehi", 200),
    credit(
        "Computer Games Research Group",
        "Islamic Azad University, Hamedan Branch",
        220,
    ),
    credit("Thank You", "For Following This Dream", 260),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpiloguePhase {
    Glide,
    Jump,
    Credits,
    Finale,
}

/// One-shot cues raised by the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpilogueCue {
    /// The couple leaves the basket
    Jumped,
    /// The script is over; the run ends as a victory
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heart {
    pub pos: Vec2,
    pub vel: Vec2,
    pub gravity: f32,
    pub alpha: f32,
    pub scale: f32,
    /// Released by a jumper rather than the balloon
    pub from_jumper: bool,
}

impl Heart {
    fn new(pos: Vec2, from_jumper: bool, rng: &mut Pcg32) -> Self {
        let drift = if from_jumper { 1.2 } else { 0.6 };
        Self {
            pos,
            vel: Vec2::new(
                (rng.random::<f32>() - 0.5) * drift,
                -0.8 - rng.random::<f32>() * 0.3,
            ),
            gravity: 0.004,
            alpha: 0.95,
            scale: if from_jumper { 0.28 } else { 0.34 },
            from_jumper,
        }
    }

    fn update(&mut self) -> bool {
        self.pos += self.vel;
        self.vel.y += self.gravity;
        self.alpha -= 0.0055;
        self.scale += 0.0025;
        self.alpha > 0.0 && self.pos.y > -40.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jumper {
    pub pos: Vec2,
    pub vel: Vec2,
    pub gravity: f32,
    pub rotation: f32,
    pub spin: f32,
    pub t: u32,
}

impl Jumper {
    fn pair(balloon: &Balloon) -> [Jumper; 2] {
        let base = Vec2::new(
            balloon.pos.x + balloon.size.x / 2.0,
            balloon.pos.y + balloon.size.y - 6.0,
        );
        [-1.0f32, 1.0].map(|side| Jumper {
            pos: Vec2::new(base.x + 16.0 * side, base.y),
            vel: Vec2::new(0.9 * side, -2.4),
            gravity: 0.018,
            rotation: 0.25 * side,
            spin: 0.0035 * side,
            t: 0,
        })
    }
}

/// Background twinkle, render only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyDot {
    pub pos: Vec2,
    pub size: f32,
    pub warm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epilogue {
    pub timer: u32,
    pub phase: EpiloguePhase,
    pub phase_timer: u32,
    pub credit_index: usize,
    pub credit_timer: u32,
    pub hearts: Vec<Heart>,
    pub jumpers: Vec<Jumper>,
    pub sky_dots: Vec<SkyDot>,
    pub ending_triggered: bool,
}

impl Epilogue {
    pub fn new(field: Field, rng: &mut Pcg32) -> Self {
        let sky_dots = (0..SKY_DOTS)
            .map(|_| SkyDot {
                pos: Vec2::new(
                    rng.random::<f32>() * field.width,
                    rng.random::<f32>() * field.height * 0.65,
                ),
                size: 0.6 + rng.random::<f32>() * 1.8,
                warm: rng.random::<f32>() > 0.5,
            })
            .collect();

        Self {
            timer: 0,
            phase: EpiloguePhase::Glide,
            phase_timer: 0,
            credit_index: 0,
            credit_timer: 0,
            hearts: Vec::new(),
            jumpers: Vec::new(),
            sky_dots,
            ending_triggered: false,
        }
    }

    /// Credit on screen, if the credits are rolling
    pub fn current_credit(&self) -> Option<&Credit> {
        match self.phase {
            EpiloguePhase::Credits => CREDITS.get(self.credit_index),
            _ => None,
        }
    }

    /// Where the balloon drifts to at the current script time
    fn drift_target(&self, field: Field, balloon: &Balloon) -> Vec2 {
        let t = self.timer as f32;
        let swing = Vec2::new((t / 210.0).sin() * 40.0, (t / 140.0).sin() * 18.0);
        Vec2::new(field.width / 2.0 - balloon.size.x / 2.0, field.height * 0.4) + swing
    }

    /// Advance the script one tick, flying `balloon` along
    pub fn update(&mut self, balloon: &mut Balloon, field: Field, rng: &mut Pcg32) -> Option<EpilogueCue> {
        self.timer += 1;
        self.phase_timer += 1;

        let target = self.drift_target(field, balloon);
        balloon.ease_toward(target, EASE_RATE);
        balloon.hold_cinematic();

        if self.timer % HEART_EVERY == 0 {
            let pos = Vec2::new(
                balloon.pos.x + balloon.size.x / 2.0 + (self.timer as f32 / 45.0).sin() * 12.0,
                balloon.pos.y + balloon.size.y / 2.0,
            );
            self.hearts.push(Heart::new(pos, false, rng));
        }
        self.hearts.retain_mut(Heart::update);

        match self.phase {
            EpiloguePhase::Glide => {
                if self.phase_timer > GLIDE_TICKS {
                    self.enter(EpiloguePhase::Jump);
                    self.jumpers = Jumper::pair(balloon).to_vec();
                    return Some(EpilogueCue::Jumped);
                }
            }
            EpiloguePhase::Jump => {
                for jumper in &mut self.jumpers {
                    jumper.pos += jumper.vel;
                    jumper.vel.y += jumper.gravity;
                    jumper.rotation += jumper.spin;
                    jumper.t += 1;
                    if jumper.t % JUMPER_HEART_EVERY == 0 {
                        let pos = jumper.pos - Vec2::new(0.0, 12.0);
                        self.hearts.push(Heart::new(pos, true, rng));
                    }
                }
                self.jumpers.retain(|j| j.pos.y < field.height + 60.0);

                if self.phase_timer > JUMP_TICKS {
                    self.enter(EpiloguePhase::Credits);
                    self.credit_index = 0;
                    self.credit_timer = 0;
                }
            }
            EpiloguePhase::Credits => match CREDITS.get(self.credit_index) {
                Some(current) => {
                    self.credit_timer += 1;
                    if self.credit_timer >= current.duration {
                        self.credit_index += 1;
                        self.credit_timer = 0;
                    }
                }
                None => self.enter(EpiloguePhase::Finale),
            },
            EpiloguePhase::Finale => {
                if self.phase_timer > FINALE_TICKS && !self.ending_triggered {
                    self.ending_triggered = true;
                    return Some(EpilogueCue::Ended);
                }
            }
        }
        None
    }

    fn enter(&mut self, phase: EpiloguePhase) {
        log::debug!("epilogue: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.phase_timer = 0;
    }
}
