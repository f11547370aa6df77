use crate::model::{GRID_H, GRID_W, SCREEN_H, SCREEN_W, SPRITE_SIZE};
use crate::surface::{Bank, Redraw, Surface, SurfaceError, TileGrid};
use crossterm::{
    cursor, execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::collections::BTreeMap;
use std::io::{self, Write};

// Each 16x16 tile becomes 4 columns by 2 rows of characters.
const TILE_COLS: i32 = 4;
const TILE_ROWS: i32 = 2;
const PX_PER_COL: i32 = SPRITE_SIZE / TILE_COLS;
const PX_PER_ROW: i32 = SPRITE_SIZE / TILE_ROWS;
pub(crate) const SCREEN_COLS: u16 = (SCREEN_W / PX_PER_COL) as u16;
pub(crate) const SCREEN_ROWS: u16 = (SCREEN_H / PX_PER_ROW) as u16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        if x < self.w && y < self.h {
            Some(self.cells[self.idx(x, y)])
        } else {
            None
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
            c.bold = false;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = false;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if c.bold != last_bold {
                    let attr = if c.bold {
                        Attribute::Bold
                    } else {
                        Attribute::NormalIntensity
                    };
                    queue!(self.out, SetAttribute(attr))?;
                    last_bold = c.bold;
                }
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            ResetColor,
            EndSynchronizedUpdate
        )?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Tile atlases
------------------------------ */

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Glyph {
    pub(crate) rows: [Vec<char>; 2],
    pub(crate) fg: Color,
    /// Background tiles paint spaces; sprite spaces are see-through.
    pub(crate) opaque: bool,
}

impl Glyph {
    fn new(top: &str, bottom: &str, fg: Color, opaque: bool) -> Self {
        Self {
            rows: [fit(top), fit(bottom)],
            fg,
            opaque,
        }
    }

    fn mirrored(&self) -> Self {
        let flip =
            |row: &Vec<char>| -> Vec<char> { row.iter().rev().map(|&c| mirror_char(c)).collect() };
        Self {
            rows: [flip(&self.rows[0]), flip(&self.rows[1])],
            ..self.clone()
        }
    }
}

fn fit(s: &str) -> Vec<char> {
    s.chars()
        .chain(std::iter::repeat(' '))
        .take(TILE_COLS as usize)
        .collect()
}

fn mirror_char(c: char) -> char {
    match c {
        '/' => '\\',
        '\\' => '/',
        '(' => ')',
        ')' => '(',
        '<' => '>',
        '>' => '<',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        other => other,
    }
}

/// Cuts ASCII art into tiles, row-major over a grid `tiles_wide` tiles across.
fn slice_art(art: &[&str], tiles_wide: usize, fg: Color, opaque: bool) -> Vec<Glyph> {
    let width = tiles_wide * TILE_COLS as usize;
    let lines: Vec<Vec<char>> = art
        .iter()
        .map(|l| l.chars().chain(std::iter::repeat(' ')).take(width).collect())
        .collect();
    let mut out = Vec::new();
    for pair in lines.chunks(TILE_ROWS as usize) {
        for t in 0..tiles_wide {
            let cols = t * TILE_COLS as usize..(t + 1) * TILE_COLS as usize;
            let row = |i: usize| -> Vec<char> {
                pair.get(i)
                    .map(|l| l[cols.clone()].to_vec())
                    .unwrap_or_else(|| vec![' '; TILE_COLS as usize])
            };
            out.push(Glyph {
                rows: [row(0), row(1)],
                fg,
                opaque,
            });
        }
    }
    out
}

const CAT_FRAME_A: [&str; 4] = [
    " /\\_/\\      ",
    "( o.o )____ ",
    " (        )~",
    "  /\\    /\\  ",
];

const CAT_FRAME_B: [&str; 4] = [
    " /\\_/\\      ",
    "( o.o )____ ",
    " (        )/",
    "  ||    ||  ",
];

const EMOTES: [[&str; 2]; 4] = [
    ["(^^)", "  ' "],
    ["(><)", "  ' "],
    ["(?@)", "  ' "],
    ["(<3)", "  ' "],
];

const SPLASH_ART: [&str; 8] = [
    "",
    "     /\\_/\\",
    "    ( o.o )",
    "     > ^ <",
    "",
    "   M O J",
    "      C O R P",
    "",
];

const SPLASH_CAPTION: [&str; 4] = ["    TOMOGOTCHI", "", "    a tiny cat", ""];

fn left_cat_atlas() -> Vec<Glyph> {
    let mut tiles = slice_art(&CAT_FRAME_A, 3, Color::Yellow, false);
    tiles.extend(slice_art(&CAT_FRAME_B, 3, Color::Yellow, false));
    tiles.extend(
        EMOTES
            .iter()
            .map(|[top, bottom]| Glyph::new(top, bottom, Color::Magenta, false)),
    );
    tiles
}

fn right_cat_atlas() -> Vec<Glyph> {
    left_cat_atlas()
        .into_iter()
        .enumerate()
        .map(|(i, g)| if i < 12 { g.mirrored() } else { g })
        .collect()
}

fn background_atlas() -> Vec<Glyph> {
    let wall = Color::DarkGrey;
    vec![
        Glyph::new("+---", "|   ", wall, true),
        Glyph::new("----", "", wall, true),
        Glyph::new("---+", "   |", wall, true),
        Glyph::new("|   ", "|   ", wall, true),
        Glyph::new("", "", wall, true),
        Glyph::new("   |", "   |", wall, true),
        Glyph::new(",.,'", "'.,.", Color::DarkGreen, true),
        Glyph::new("", "____", Color::DarkYellow, true),
        Glyph::new("|   ", "+---", wall, true),
        Glyph::new("", "----", wall, true),
        Glyph::new("   |", "---+", wall, true),
    ]
}

fn button_atlas() -> Vec<Glyph> {
    let mut tiles = Vec::new();
    for label in ["FEED", "PLAY", "STAT", "EXIT"] {
        let up = format!("[ {label} ]");
        let down = format!("{{ {} }}", label.to_lowercase());
        for (text, fg) in [(up, Color::White), (down, Color::Yellow)] {
            let chars: Vec<char> = text.chars().collect();
            for half in chars.chunks(TILE_COLS as usize) {
                tiles.push(Glyph {
                    rows: [half.to_vec(), vec![' '; TILE_COLS as usize]],
                    fg,
                    opaque: false,
                });
            }
        }
    }
    tiles
}

fn extras_atlas() -> Vec<Glyph> {
    vec![
        Glyph::new("", "(~~)", Color::Red, false),
        Glyph::new(" () ", "", Color::Cyan, false),
    ]
}

pub(crate) fn build_atlas(bank: Bank) -> Result<Vec<Glyph>, SurfaceError> {
    let atlas = match bank {
        Bank::GameBackground => background_atlas(),
        Bank::Buttons | Bank::Buttons2 => button_atlas(),
        Bank::LeftCat => left_cat_atlas(),
        Bank::RightCat => right_cat_atlas(),
        Bank::Extras => extras_atlas(),
        Bank::Splash => slice_art(&SPLASH_ART, 4, Color::White, true),
        Bank::Splash2 => slice_art(&SPLASH_CAPTION, 5, Color::Cyan, false),
    };
    if atlas.is_empty() {
        return Err(SurfaceError::BankLoad {
            bank: bank.name(),
            reason: "atlas has no tiles".to_string(),
        });
    }
    Ok(atlas)
}

/* -----------------------------
   Screen compositor
------------------------------ */

/// Composes tiles and text onto a cell buffer, centred in the terminal.
pub(crate) struct Compositor {
    atlases: BTreeMap<Bank, Vec<Glyph>>,
    enable_color: bool,
    origin: (i32, i32),
}

impl Compositor {
    pub(crate) fn new(enable_color: bool) -> Self {
        Self {
            atlases: BTreeMap::new(),
            enable_color,
            origin: (0, 0),
        }
    }

    pub(crate) fn load(&mut self, bank: Bank) -> Result<(), SurfaceError> {
        if !self.atlases.contains_key(&bank) {
            self.atlases.insert(bank, build_atlas(bank)?);
        }
        Ok(())
    }

    pub(crate) fn center_in(&mut self, cols: u16, rows: u16) {
        let ox = (cols as i32 - SCREEN_COLS as i32).max(0) / 2;
        let oy = (rows as i32 - SCREEN_ROWS as i32).max(0) / 2;
        self.origin = (ox, oy);
    }

    fn color(&self, c: Color) -> Color {
        if self.enable_color {
            c
        } else {
            Color::White
        }
    }

    fn put(&self, buf: &mut CellBuffer, col: i32, row: i32, ch: char, fg: Color, bold: bool) {
        // clip to the virtual screen, not just the terminal
        if col < 0 || row < 0 || col >= SCREEN_COLS as i32 || row >= SCREEN_ROWS as i32 {
            return;
        }
        let (x, y) = (col + self.origin.0, row + self.origin.1);
        if x > u16::MAX as i32 || y > u16::MAX as i32 {
            return;
        }
        buf.set(
            x as u16,
            y as u16,
            Cell {
                ch,
                fg: self.color(fg),
                bg: Color::Black,
                bold,
            },
        );
    }

    pub(crate) fn tile(&self, buf: &mut CellBuffer, bank: Bank, tile: u16, x: i32, y: i32) {
        let Some(glyph) = self.atlases.get(&bank).and_then(|a| a.get(tile as usize)) else {
            return;
        };
        let col0 = x.div_euclid(PX_PER_COL);
        let row0 = y.div_euclid(PX_PER_ROW);
        for (dy, row) in glyph.rows.iter().enumerate() {
            for (dx, &ch) in row.iter().enumerate() {
                if ch == ' ' && !glyph.opaque {
                    continue;
                }
                self.put(buf, col0 + dx as i32, row0 + dy as i32, ch, glyph.fg, false);
            }
        }
    }

    pub(crate) fn background(&self, buf: &mut CellBuffer, grid: &TileGrid) {
        for row in 0..GRID_H {
            for col in 0..GRID_W {
                if let Some(tile) = grid.get(col, row) {
                    let (x, y) = (col as i32 * SPRITE_SIZE, row as i32 * SPRITE_SIZE);
                    self.tile(buf, grid.bank, tile, x, y);
                }
            }
        }
    }

    pub(crate) fn text(&self, buf: &mut CellBuffer, s: &str, x: i32, y: i32) {
        let col0 = x.div_euclid(PX_PER_COL);
        let row = y.div_euclid(PX_PER_ROW);
        for (i, ch) in s.chars().enumerate() {
            self.put(buf, col0 + i as i32, row, ch, Color::White, true);
        }
    }
}

/// The game screen drawn into the controlling terminal.
pub(crate) struct TermSurface {
    term: Terminal,
    compositor: Compositor,
    force_full: bool,
}

impl TermSurface {
    pub(crate) fn begin(enable_color: bool) -> anyhow::Result<Self> {
        let term = Terminal::begin()?;
        let mut compositor = Compositor::new(enable_color);
        compositor.center_in(term.cols, term.rows);
        Ok(Self {
            term,
            compositor,
            force_full: true,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        self.term.end()
    }
}

impl Surface for TermSurface {
    fn load_bank(&mut self, bank: Bank) -> Result<(), SurfaceError> {
        self.compositor.load(bank)
    }

    fn begin_frame(&mut self) {
        match self.term.resize_if_needed() {
            Ok(true) => {
                self.compositor.center_in(self.term.cols, self.term.rows);
                self.force_full = true;
            }
            Ok(false) => {}
            Err(err) => tracing::debug!(%err, "terminal size query failed"),
        }
        self.term.cur.clear(Color::Black);
    }

    fn draw_background(&mut self, grid: &TileGrid) {
        self.compositor.background(&mut self.term.cur, grid);
    }

    fn draw_tile(&mut self, bank: Bank, tile: u16, x: i32, y: i32) {
        self.compositor.tile(&mut self.term.cur, bank, tile, x, y);
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.compositor.text(&mut self.term.cur, text, x, y);
    }

    fn present(&mut self, redraw: Redraw) -> anyhow::Result<()> {
        let full = redraw == Redraw::Full || self.force_full;
        self.force_full = false;
        self.term.present(!full)
    }
}
