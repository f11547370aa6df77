use crate::model::{
    FRICTION, GRAVITY, TOY_CEILING, TOY_FLOOR, TOY_REST_SPEED, TOY_WALL_LEFT, TOY_WALL_RIGHT,
};

/// Axis-aligned box with integer screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Aabb {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
}

impl Aabb {
    pub(crate) const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap; boxes that only share an edge don't touch.
    pub(crate) fn overlaps(&self, other: &Aabb) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    /// Horizontal overlap with `other` while `other`'s top edge lies
    /// strictly inside this box's vertical span. Used for kicks, which only
    /// connect from below the cat's top edge.
    pub(crate) fn catches_top_of(&self, other: &Aabb) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y
            && self.y + self.h > other.y
    }
}

/// The bouncing toy: sub-pixel position and velocity inside the play box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct ToyBody {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) vx: f32,
    pub(crate) vy: f32,
}

impl ToyBody {
    pub(crate) fn at_rest(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub(crate) fn kick(&mut self, vx: f32, vy: f32) {
        self.vx = vx;
        self.vy = vy;
    }

    #[cfg(test)]
    pub(crate) fn is_resting(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }

    /// Screen position, truncated to whole pixels.
    pub(crate) fn pixel(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }

    /// One tick of gravity, movement, bounces and friction.
    pub(crate) fn step(&mut self) {
        self.vy += GRAVITY;
        self.x += self.vx;
        self.y += self.vy;

        if self.y < TOY_CEILING {
            self.vy = self.vy.abs() * FRICTION;
        } else if self.y > TOY_FLOOR {
            self.y = TOY_FLOOR;
            self.vy = -self.vy.abs() * FRICTION;
        }

        if self.x < TOY_WALL_LEFT {
            self.x = TOY_WALL_LEFT;
            self.vx = self.vx.abs() * FRICTION;
        } else if self.x > TOY_WALL_RIGHT {
            self.x = TOY_WALL_RIGHT;
            self.vx = -self.vx.abs() * FRICTION;
        }

        self.vx *= FRICTION;
        self.vy *= FRICTION;

        if self.vx.abs() < TOY_REST_SPEED && self.vy.abs() < TOY_REST_SPEED {
            self.vx = 0.0;
            self.vy = 0.0;
        }
    }
}
