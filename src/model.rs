use serde::{Deserialize, Serialize};

// Virtual screen is 160x128 with 16x16 tiles.
pub(crate) const SCREEN_W: i32 = 160;
pub(crate) const SCREEN_H: i32 = 128;
pub(crate) const GRID_W: usize = 10;
pub(crate) const GRID_H: usize = 8;
pub(crate) const SPRITE_SIZE: i32 = 16;

pub(crate) const FPS: u32 = 60;
pub(crate) const FRICTION: f32 = 0.98;
pub(crate) const GRAVITY: f32 = 0.1;

// Cat geometry and walking bounds.
pub(crate) const CAT_W: i32 = 48;
pub(crate) const CAT_H: i32 = 32;
pub(crate) const LEFT_BOUNDARY: i32 = 16;
pub(crate) const RIGHT_BOUNDARY: i32 = 146;

// Food and toy spawn on the row just above the floor stripe.
pub(crate) const ITEM_ROW_Y: i32 = 4 * SPRITE_SIZE;
pub(crate) const ITEM_MIN_X: i32 = LEFT_BOUNDARY;
pub(crate) const ITEM_MAX_X: i32 = RIGHT_BOUNDARY - SPRITE_SIZE;

// Toy bounce box.
pub(crate) const TOY_CEILING: f32 = 16.0;
pub(crate) const TOY_FLOOR: f32 = 64.0;
pub(crate) const TOY_WALL_LEFT: f32 = 16.0;
pub(crate) const TOY_WALL_RIGHT: f32 = 130.0;
pub(crate) const TOY_REST_SPEED: f32 = 0.1;
pub(crate) const TOY_LIFETIME_TICKS: u32 = 1500;

pub(crate) const STAT_MAX: i32 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct Position {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl Position {
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub(crate) fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Facing {
    Left,
    Right,
}

impl Facing {
    pub(crate) fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Unit step along x for this facing.
    pub(crate) fn step(self) -> i32 {
        match self {
            Facing::Left => -1,
            Facing::Right => 1,
        }
    }
}

/// Mood icons shown above the cat. The discriminant is the icon's offset
/// from the first emote tile in the cat banks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EmoteKind {
    Happy = 0,
    Angry = 1,
    Hungry = 2,
    Love = 3,
}

impl EmoteKind {
    pub(crate) const FIRST_TILE: u16 = 12;

    pub(crate) fn tile(self) -> u16 {
        Self::FIRST_TILE + self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_steps_and_flips() {
        assert_eq!(Facing::Left.step(), -1);
        assert_eq!(Facing::Right.step(), 1);
        assert_eq!(Facing::Left.flipped(), Facing::Right);
    }

    #[test]
    fn emote_tiles_follow_cat_frames() {
        assert_eq!(EmoteKind::Happy.tile(), 12);
        assert_eq!(EmoteKind::Love.tile(), 15);
    }

    #[test]
    fn item_spawn_range_stays_inside_walls() {
        assert_eq!(ITEM_MIN_X, 16);
        assert_eq!(ITEM_MAX_X, 130);
        assert!(ITEM_MAX_X + SPRITE_SIZE <= SCREEN_W);
        assert!(ITEM_ROW_Y + SPRITE_SIZE <= SCREEN_H);
    }
}
