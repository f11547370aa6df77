use crate::model::{GRID_H, GRID_W};
use thiserror::Error;

/// Image banks (tile atlases) the scenes draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Bank {
    GameBackground,
    Buttons,
    Buttons2,
    LeftCat,
    RightCat,
    Extras,
    Splash,
    Splash2,
}

impl Bank {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Bank::GameBackground => "game_scene_background",
            Bank::Buttons => "buttons",
            Bank::Buttons2 => "buttons2",
            Bank::LeftCat => "left_cat",
            Bank::RightCat => "right_cat",
            Bank::Extras => "extras",
            Bank::Splash => "splash",
            Bank::Splash2 => "splash2",
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SurfaceError {
    #[error("failed to load image bank {bank}: {reason}")]
    BankLoad { bank: &'static str, reason: String },
}

/// How much of the screen the next present has to repaint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Redraw {
    /// Only moving sprites changed.
    Sprites,
    /// Text overlays appeared; repaint changed regions.
    Partial,
    /// Repaint everything, including the background.
    Full,
}

/// Background tile grid covering the whole screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TileGrid {
    pub(crate) bank: Bank,
    tiles: [[Option<u16>; GRID_W]; GRID_H],
}

impl TileGrid {
    pub(crate) fn new(bank: Bank) -> Self {
        Self {
            bank,
            tiles: [[None; GRID_W]; GRID_H],
        }
    }

    pub(crate) fn from_rows(bank: Bank, rows: &[[u16; GRID_W]; GRID_H]) -> Self {
        let mut grid = Self::new(bank);
        for (row, cols) in rows.iter().enumerate() {
            for (col, &tile) in cols.iter().enumerate() {
                grid.set(col, row, tile);
            }
        }
        grid
    }

    pub(crate) fn set(&mut self, col: usize, row: usize, tile: u16) {
        if col < GRID_W && row < GRID_H {
            self.tiles[row][col] = Some(tile);
        }
    }

    pub(crate) fn get(&self, col: usize, row: usize) -> Option<u16> {
        self.tiles.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

/// Retained tile renderer the scenes draw into once per frame.
///
/// Draw calls are ordered back to front; the last write to a cell wins.
pub(crate) trait Surface {
    fn load_bank(&mut self, bank: Bank) -> Result<(), SurfaceError>;
    fn begin_frame(&mut self);
    fn draw_background(&mut self, grid: &TileGrid);
    fn draw_tile(&mut self, bank: Bank, tile: u16, x: i32, y: i32);
    fn draw_text(&mut self, text: &str, x: i32, y: i32);
    fn present(&mut self, redraw: Redraw) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum DrawCall {
        Background(Bank),
        Tile { bank: Bank, tile: u16, x: i32, y: i32 },
        Text { text: String, x: i32, y: i32 },
    }

    /// Records the last frame's draw calls and every present request.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub(crate) loaded: Vec<Bank>,
        pub(crate) failing: Vec<Bank>,
        pub(crate) frame: Vec<DrawCall>,
        pub(crate) presents: Vec<Redraw>,
    }

    impl RecordingSurface {
        pub(crate) fn failing_on(bank: Bank) -> Self {
            Self {
                failing: vec![bank],
                ..Self::default()
            }
        }

        pub(crate) fn tiles_from(&self, bank: Bank) -> Vec<(u16, i32, i32)> {
            self.frame
                .iter()
                .filter_map(|c| match c {
                    DrawCall::Tile { bank: b, tile, x, y } if *b == bank => Some((*tile, *x, *y)),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn texts(&self) -> Vec<String> {
            self.frame
                .iter()
                .filter_map(|c| match c {
                    DrawCall::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Surface for RecordingSurface {
        fn load_bank(&mut self, bank: Bank) -> Result<(), SurfaceError> {
            if self.failing.contains(&bank) {
                return Err(SurfaceError::BankLoad {
                    bank: bank.name(),
                    reason: "missing bitmap".to_string(),
                });
            }
            self.loaded.push(bank);
            Ok(())
        }

        fn begin_frame(&mut self) {
            self.frame.clear();
        }

        fn draw_background(&mut self, grid: &TileGrid) {
            self.frame.push(DrawCall::Background(grid.bank));
        }

        fn draw_tile(&mut self, bank: Bank, tile: u16, x: i32, y: i32) {
            self.frame.push(DrawCall::Tile { bank, tile, x, y });
        }

        fn draw_text(&mut self, text: &str, x: i32, y: i32) {
            self.frame.push(DrawCall::Text {
                text: text.to_string(),
                x,
                y,
            });
        }

        fn present(&mut self, redraw: Redraw) -> anyhow::Result<()> {
            self.presents.push(redraw);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_ignores_out_of_range_cells() {
        let mut grid = TileGrid::new(Bank::GameBackground);
        grid.set(3, 2, 7);
        grid.set(GRID_W, 0, 1);
        grid.set(0, GRID_H, 1);
        assert_eq!(grid.get(3, 2), Some(7));
        assert_eq!(grid.get(0, 0), None);
        assert_eq!(grid.get(GRID_W, 0), None);
    }

    #[test]
    fn bank_load_error_names_the_bank() {
        let err = SurfaceError::BankLoad {
            bank: Bank::Extras.name(),
            reason: "nope".into(),
        };
        assert_eq!(err.to_string(), "failed to load image bank extras: nope");
    }
}
