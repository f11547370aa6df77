use crate::model::{Position, SPRITE_SIZE};
use crate::surface::{Bank, Surface};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SpriteError {
    #[error("frame set has {got} tiles, sprite grid needs {expected}")]
    ArityMismatch { expected: usize, got: usize },
}

/// A single 16x16 tile drawn from a bank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Sprite {
    bank: Bank,
    tile: u16,
    pos: Position,
    visible: bool,
}

impl Sprite {
    /// Creates a hidden sprite.
    pub(crate) fn hidden(bank: Bank, tile: u16) -> Self {
        Self {
            bank,
            tile,
            pos: Position::default(),
            visible: false,
        }
    }

    pub(crate) fn at(bank: Bank, tile: u16, pos: Position) -> Self {
        Self {
            bank,
            tile,
            pos,
            visible: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn bank(&self) -> Bank {
        self.bank
    }

    #[cfg(test)]
    pub(crate) fn tile(&self) -> u16 {
        self.tile
    }

    pub(crate) fn position(&self) -> Position {
        self.pos
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.visible
    }

    /// Moves the sprite and makes it visible.
    pub(crate) fn move_to(&mut self, pos: Position) {
        self.pos = pos;
        self.visible = true;
    }

    pub(crate) fn hide(&mut self) {
        self.visible = false;
    }

    pub(crate) fn set_frame(&mut self, tile: u16) {
        self.tile = tile;
    }

    pub(crate) fn set_bank(&mut self, bank: Bank) {
        self.bank = bank;
    }

    pub(crate) fn draw(&self, surface: &mut dyn Surface) {
        if self.visible {
            surface.draw_tile(self.bank, self.tile, self.pos.x, self.pos.y);
        }
    }
}

/// Several tiles laid out on a `width x height` grid that move as one.
///
/// Cell `i` sits at `origin + ((i % width), (i / width)) * 16`. Every
/// mutation updates the cells before returning, so the sprite is always
/// consistent when drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MetaSprite {
    origin: Position,
    width: usize,
    bank: Bank,
    cells: Vec<Sprite>,
    visible: bool,
}

impl MetaSprite {
    pub(crate) fn new(
        origin: Position,
        width: usize,
        height: usize,
        bank: Bank,
        tiles: &[u16],
    ) -> Result<Self, SpriteError> {
        let expected = width * height;
        if tiles.len() != expected {
            return Err(SpriteError::ArityMismatch {
                expected,
                got: tiles.len(),
            });
        }
        let cells = tiles
            .iter()
            .enumerate()
            .map(|(i, &tile)| Sprite::at(bank, tile, cell_position(origin, width, i)))
            .collect();
        Ok(Self {
            origin,
            width,
            bank,
            cells,
            visible: true,
        })
    }

    pub(crate) fn position(&self) -> Position {
        self.origin
    }

    pub(crate) fn x(&self) -> i32 {
        self.origin.x
    }

    pub(crate) fn y(&self) -> i32 {
        self.origin.y
    }

    #[cfg(test)]
    pub(crate) fn cells(&self) -> &[Sprite] {
        &self.cells
    }

    #[cfg(test)]
    pub(crate) fn tiles(&self) -> Vec<u16> {
        self.cells.iter().map(Sprite::tile).collect()
    }

    #[cfg(test)]
    pub(crate) fn bank(&self) -> Bank {
        self.bank
    }

    /// Moves every cell relative to the new origin and shows the sprite.
    pub(crate) fn set_position(&mut self, x: i32, y: i32) {
        self.origin = Position::new(x, y);
        self.visible = true;
        let (origin, width) = (self.origin, self.width);
        for (i, cell) in self.cells.iter_mut().enumerate() {
            cell.move_to(cell_position(origin, width, i));
        }
    }

    /// Replaces every cell's tile, in grid order.
    pub(crate) fn swap_frames(&mut self, tiles: &[u16]) -> Result<(), SpriteError> {
        if tiles.len() != self.cells.len() {
            return Err(SpriteError::ArityMismatch {
                expected: self.cells.len(),
                got: tiles.len(),
            });
        }
        for (cell, &tile) in self.cells.iter_mut().zip(tiles) {
            cell.set_frame(tile);
        }
        Ok(())
    }

    pub(crate) fn set_bank(&mut self, bank: Bank) {
        self.bank = bank;
        for cell in &mut self.cells {
            cell.set_bank(bank);
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn move_offscreen(&mut self) {
        self.visible = false;
    }

    #[cfg(test)]
    pub(crate) fn is_on_screen(&self) -> bool {
        self.visible
    }

    pub(crate) fn draw(&self, surface: &mut dyn Surface) {
        if !self.visible {
            return;
        }
        for cell in &self.cells {
            cell.draw(surface);
        }
    }
}

fn cell_position(origin: Position, width: usize, index: usize) -> Position {
    let col = (index % width) as i32;
    let row = (index / width) as i32;
    origin.offset(col * SPRITE_SIZE, row * SPRITE_SIZE)
}
