use crate::config::Behavior;
use crate::model::{EmoteKind, Facing, Position, CAT_H, CAT_W, LEFT_BOUNDARY, RIGHT_BOUNDARY};
use crate::physics::Aabb;
use crate::sprite::{MetaSprite, Sprite, SpriteError};
use crate::storage::PersistentStats;
use crate::surface::{Bank, Surface};
use rand::Rng;

// Walk cycle frame sets for the 3x2 body. The right-facing bank holds the
// mirrored tiles, so its columns are read back to front.
const LEFT_A: [u16; 6] = [0, 1, 2, 3, 4, 5];
const LEFT_B: [u16; 6] = [6, 7, 8, 9, 10, 11];
const RIGHT_A: [u16; 6] = [2, 1, 0, 5, 4, 3];
const RIGHT_B: [u16; 6] = [8, 7, 6, 11, 10, 9];

const GRID_W: usize = 3;
const GRID_H: usize = 2;
const WALK_SPEED: i32 = 1;
const FRAME_HOLD_TICKS: u32 = 5;

const HUNGRY_BELOW: i32 = 30;
const ANGRY_BELOW: i32 = 30;
const HAPPY_ABOVE: i32 = 70;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WalkFrame {
    A,
    B,
}

impl WalkFrame {
    fn toggled(self) -> Self {
        match self {
            WalkFrame::A => WalkFrame::B,
            WalkFrame::B => WalkFrame::A,
        }
    }
}

fn bank_for(facing: Facing) -> Bank {
    match facing {
        Facing::Left => Bank::LeftCat,
        Facing::Right => Bank::RightCat,
    }
}

fn frames_for(facing: Facing, frame: WalkFrame) -> &'static [u16] {
    match (facing, frame) {
        (Facing::Left, WalkFrame::A) => &LEFT_A,
        (Facing::Left, WalkFrame::B) => &LEFT_B,
        (Facing::Right, WalkFrame::A) => &RIGHT_A,
        (Facing::Right, WalkFrame::B) => &RIGHT_B,
    }
}

fn one_in<R: Rng + ?Sized>(rng: &mut R, n: u32) -> bool {
    n != 0 && rng.gen_ratio(1, n)
}

/// The pet: a walking 48x32 body, a mood bubble, and the stats it reacts to.
pub(crate) struct Cat {
    body: MetaSprite,
    facing: Facing,
    frame: WalkFrame,
    frame_counter: u32,
    emote: Sprite,
    emote_ticks: u32,
    heading: Facing,
    walk_remaining: i32,
    stats: PersistentStats,
    behavior: Behavior,
    frame_error_logged: bool,
}

impl Cat {
    pub(crate) fn new(
        x: i32,
        y: i32,
        stats: PersistentStats,
        behavior: Behavior,
    ) -> Result<Self, SpriteError> {
        let facing = Facing::Left;
        let frame = WalkFrame::A;
        let body = MetaSprite::new(
            Position::new(x, y),
            GRID_W,
            GRID_H,
            bank_for(facing),
            frames_for(facing, frame),
        )?;
        Ok(Self {
            body,
            facing,
            frame,
            frame_counter: 0,
            emote: Sprite::hidden(bank_for(facing), EmoteKind::Happy.tile()),
            emote_ticks: 0,
            heading: facing,
            walk_remaining: 0,
            stats,
            behavior,
            frame_error_logged: false,
        })
    }

    pub(crate) fn x(&self) -> i32 {
        self.body.x()
    }

    pub(crate) fn y(&self) -> i32 {
        self.body.y()
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    #[cfg(test)]
    pub(crate) fn body(&self) -> &MetaSprite {
        &self.body
    }

    #[cfg(test)]
    pub(crate) fn emote_sprite(&self) -> &Sprite {
        &self.emote
    }

    #[cfg(test)]
    pub(crate) fn emote_ticks(&self) -> u32 {
        self.emote_ticks
    }

    #[cfg(test)]
    pub(crate) fn walk_remaining(&self) -> i32 {
        self.walk_remaining
    }

    pub(crate) fn bounds(&self) -> Aabb {
        Aabb::new(self.x(), self.y(), CAT_W, CAT_H)
    }

    pub(crate) fn hunger(&self) -> i32 {
        self.stats.hunger()
    }

    pub(crate) fn joy(&self) -> i32 {
        self.stats.joy()
    }

    /// Dropped unless strictly between 0 and 100.
    pub(crate) fn set_hunger(&mut self, value: i32) {
        self.stats.set_hunger(value);
    }

    /// Dropped unless strictly between 0 and 100.
    pub(crate) fn set_joy(&mut self, value: i32) {
        self.stats.set_joy(value);
    }

    pub(crate) fn stats_mut(&mut self) -> &mut PersistentStats {
        &mut self.stats
    }

    pub(crate) fn set_position(&mut self, x: i32, y: i32) {
        self.body.set_position(x, y);
        if self.emote_ticks > 0 {
            self.emote.move_to(self.emote_anchor());
        }
    }

    fn emote_anchor(&self) -> Position {
        let dx = match self.facing {
            Facing::Left => -16,
            Facing::Right => CAT_W,
        };
        self.body.position().offset(dx, -16)
    }

    /// Turns around in place. The bubble moves to the new side.
    pub(crate) fn flip(&mut self) {
        self.facing = self.facing.flipped();
        self.body.set_bank(bank_for(self.facing));
        self.show_frame(self.frame);
        if self.emote_ticks > 0 {
            self.emote.set_bank(bank_for(self.facing));
            self.emote.move_to(self.emote_anchor());
        }
    }

    fn show_frame(&mut self, frame: WalkFrame) {
        self.frame = frame;
        if let Err(err) = self.body.swap_frames(frames_for(self.facing, frame)) {
            if !self.frame_error_logged {
                tracing::warn!(%err, "cat walk frame rejected");
                self.frame_error_logged = true;
            }
        }
    }

    /// Shows `kind` for `duration` ticks. A bubble that is already up is
    /// only replaced when `prioritize` is set.
    pub(crate) fn emote(&mut self, kind: EmoteKind, duration: u32, prioritize: bool) {
        if self.emote_ticks > 0 && !prioritize {
            return;
        }
        self.emote_ticks = duration;
        self.emote.set_bank(bank_for(self.facing));
        self.emote.set_frame(kind.tile());
        if duration == 0 {
            self.emote.hide();
        } else {
            self.emote.move_to(self.emote_anchor());
        }
    }

    /// Shows how the cat feels. Hunger beats anger beats happiness.
    pub(crate) fn react(&mut self) {
        let ticks = self.behavior.react_emote_ticks;
        if self.hunger() < HUNGRY_BELOW {
            self.emote(EmoteKind::Hungry, ticks, false);
        } else if self.joy() < ANGRY_BELOW {
            self.emote(EmoteKind::Angry, ticks, false);
        } else if self.joy() > HAPPY_ABOVE {
            self.emote(EmoteKind::Happy, ticks, false);
        }
    }

    /// Queues a walk of `distance` pixels; `update` does the moving.
    pub(crate) fn walk(&mut self, heading: Facing, distance: i32) {
        self.heading = heading;
        self.walk_remaining = distance.max(0);
    }

    /// Advances the cat by one tick.
    pub(crate) fn update<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.emote_ticks > 0 {
            self.emote_ticks -= 1;
            if self.emote_ticks == 0 {
                self.emote.hide();
            }
        }

        if self.walk_remaining > 0 {
            self.step_walk();
        }

        if self.walk_remaining == 0 && one_in(rng, self.behavior.walk_one_in) {
            let heading = if rng.gen_bool(0.5) {
                Facing::Right
            } else {
                Facing::Left
            };
            let lo = self.behavior.walk_distance_min.min(self.behavior.walk_distance_max);
            let hi = self.behavior.walk_distance_min.max(self.behavior.walk_distance_max);
            let distance = rng.gen_range(lo..=hi);
            tracing::debug!(?heading, distance, "cat wanders off");
            self.walk(heading, distance);
        }

        if one_in(rng, self.behavior.react_one_in) {
            self.react();
        }
    }

    fn step_walk(&mut self) {
        if self.facing != self.heading {
            self.flip();
        }
        self.shift_x(self.heading.step() * WALK_SPEED);

        let x = self.x();
        if x <= LEFT_BOUNDARY || x + CAT_W >= RIGHT_BOUNDARY {
            self.heading = self.heading.flipped();
            self.flip();
            self.shift_x(self.heading.step() * WALK_SPEED);
        }

        if self.frame_counter == FRAME_HOLD_TICKS {
            self.show_frame(self.frame.toggled());
            self.frame_counter = 0;
        } else {
            self.frame_counter += 1;
        }

        self.walk_remaining -= WALK_SPEED;
    }

    fn shift_x(&mut self, dx: i32) {
        self.set_position(self.x() + dx, self.y());
    }

    pub(crate) fn draw(&self, surface: &mut dyn Surface) {
        self.body.draw(surface);
        self.emote.draw(surface);
    }
}
