use crate::button::{Button, ButtonStyle};
use crate::cat::Cat;
use crate::config::Behavior;
use crate::input::{ButtonState, Keys};
use crate::model::{
    EmoteKind, Position, GRID_H, GRID_W, ITEM_MAX_X, ITEM_MIN_X, ITEM_ROW_Y, SPRITE_SIZE,
    STAT_MAX, TOY_LIFETIME_TICKS,
};
use crate::physics::{Aabb, ToyBody};
use crate::sprite::{Sprite, SpriteError};
use crate::storage::{PersistentStats, StatStore};
use crate::surface::{Bank, Redraw, Surface, SurfaceError, TileGrid};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

const FEED_HUNGER: i32 = 10;
const TOY_JOY: i32 = 10;
const FED_EMOTE_TICKS: u32 = 150;

const FOOD_TILE: u16 = 0;
const TOY_TILE: u16 = 1;

const HUNGER_TEXT_AT: Position = Position::new(16, 16);
const JOY_TEXT_AT: Position = Position::new(16, 28);

const GAME_TILE_MAP: [[u16; GRID_W]; GRID_H] = [
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 2],
    [3, 4, 4, 4, 4, 4, 4, 4, 4, 5],
    [3, 4, 4, 4, 4, 4, 4, 4, 4, 5],
    [3, 4, 4, 4, 4, 4, 4, 4, 4, 5],
    [3, 7, 7, 7, 7, 7, 7, 7, 7, 5],
    [3, 6, 6, 6, 6, 6, 6, 6, 6, 5],
    [3, 4, 4, 6, 4, 4, 6, 4, 4, 5],
    [8, 9, 9, 9, 9, 9, 9, 9, 9, 10],
];

const GAME_BANKS: [Bank; 6] = [
    Bank::GameBackground,
    Bank::Buttons,
    Bank::Buttons2,
    Bank::LeftCat,
    Bank::RightCat,
    Bank::Extras,
];

#[derive(Debug, Error)]
pub(crate) enum SceneError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("could not build scene sprite: {0}")]
    Sprite(#[from] SpriteError),
}

fn item_box(x: i32, y: i32) -> Aabb {
    Aabb::new(x, y, SPRITE_SIZE, SPRITE_SIZE)
}

/// Edge state of the three mapped buttons plus the unused UP key.
#[derive(Clone, Copy, Debug, Default)]
struct Pad {
    feed: ButtonState,
    play: ButtonState,
    stat: ButtonState,
    up: ButtonState,
}

impl Pad {
    fn advance(&mut self, keys: Keys) {
        self.feed = self.feed.next(keys.contains(Keys::LEFT));
        self.play = self.play.next(keys.contains(Keys::DOWN));
        self.stat = self.stat.next(keys.contains(Keys::RIGHT));
        self.up = self.up.next(keys.contains(Keys::UP));
    }
}

/// The room: cat, food bowl, bouncing toy and the three buttons.
pub(crate) struct GameScene {
    background: TileGrid,
    cat: Cat,
    feed_button: Button,
    play_button: Button,
    stat_button: Button,
    pad: Pad,
    food: Sprite,
    toy: Sprite,
    toy_body: ToyBody,
    toy_age: u32,
    stat_lines: Option<[String; 2]>,
    rng: StdRng,
    ticks: u64,
}

impl GameScene {
    /// Loads the image banks, then the stats. Any bank failure aborts entry.
    pub(crate) fn enter(
        surface: &mut dyn Surface,
        store: Box<dyn StatStore>,
        now: DateTime<Utc>,
        behavior: Behavior,
        rng: StdRng,
    ) -> Result<Self, SceneError> {
        for bank in GAME_BANKS {
            surface.load_bank(bank)?;
        }

        let stats = PersistentStats::load(store, now);
        let cat = Cat::new(56, 3 * SPRITE_SIZE, stats, behavior)?;
        let button_y = 6 * SPRITE_SIZE;

        Ok(Self {
            background: TileGrid::from_rows(Bank::GameBackground, &GAME_TILE_MAP),
            cat,
            feed_button: Button::new(SPRITE_SIZE, button_y, ButtonStyle::Feed)?,
            play_button: Button::new(4 * SPRITE_SIZE, button_y, ButtonStyle::Play)?,
            stat_button: Button::new(7 * SPRITE_SIZE, button_y, ButtonStyle::Stat)?,
            pad: Pad::default(),
            food: Sprite::hidden(Bank::Extras, FOOD_TILE),
            toy: Sprite::hidden(Bank::Extras, TOY_TILE),
            toy_body: ToyBody::default(),
            toy_age: 0,
            stat_lines: None,
            rng,
            ticks: 0,
        })
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one frame of game logic and reports how much to repaint.
    pub(crate) fn tick(&mut self, keys: Keys) -> Redraw {
        let mut redraw = Redraw::Sprites;
        self.pad.advance(keys);

        match self.pad.feed {
            ButtonState::JustPressed => {
                self.feed_button.press();
                if let Some(x) = self.free_item_x() {
                    self.food.move_to(Position::new(x, ITEM_ROW_Y));
                    tracing::debug!(x, "food served");
                }
            }
            ButtonState::Released => self.feed_button.release(),
            _ => {}
        }

        match self.pad.play {
            ButtonState::JustPressed => {
                self.play_button.press();
                if let Some(x) = self.free_item_x() {
                    self.toy.move_to(Position::new(x, ITEM_ROW_Y));
                    self.toy_body = ToyBody::at_rest(x as f32, ITEM_ROW_Y as f32);
                    self.toy_age = 0;
                    tracing::debug!(x, "toy dropped");
                }
            }
            ButtonState::Released => self.play_button.release(),
            _ => {}
        }

        match self.pad.stat {
            ButtonState::JustPressed => {
                self.stat_button.press();
                self.stat_lines = Some([
                    format!("Hunger: {}/{STAT_MAX}", self.cat.hunger()),
                    format!("Joy: {}/{STAT_MAX}", self.cat.joy()),
                ]);
                redraw = Redraw::Partial;
            }
            ButtonState::Released => {
                self.stat_button.release();
                self.stat_lines = None;
                redraw = Redraw::Full;
            }
            _ => {}
        }

        self.eat_food();
        self.kick_toy();
        self.move_toy();

        self.cat.update(&mut self.rng);
        self.cat.stats_mut().flush();
        self.ticks += 1;
        redraw
    }

    /// Uniform pick among item columns that keep the item clear of the cat.
    fn free_item_x(&mut self) -> Option<i32> {
        let cat = self.cat.bounds();
        let free: Vec<i32> = (ITEM_MIN_X..=ITEM_MAX_X)
            .filter(|&x| !cat.overlaps(&item_box(x, ITEM_ROW_Y)))
            .collect();
        let pick = free.choose(&mut self.rng).copied();
        if pick.is_none() {
            tracing::warn!(cat_x = cat.x, "no room to place an item");
        }
        pick
    }

    fn eat_food(&mut self) {
        if !self.food.is_visible() {
            return;
        }
        let pos = self.food.position();
        if self.cat.bounds().overlaps(&item_box(pos.x, pos.y)) {
            let hunger = self.cat.hunger();
            self.cat.set_hunger(hunger + FEED_HUNGER);
            self.food.hide();
            self.cat.emote(EmoteKind::Love, FED_EMOTE_TICKS, true);
            tracing::info!(hunger = self.cat.hunger(), "cat ate");
        }
    }

    fn kick_toy(&mut self) {
        if !self.toy.is_visible() {
            return;
        }
        let pos = self.toy.position();
        if self.cat.bounds().catches_top_of(&item_box(pos.x, pos.y)) {
            let joy = self.cat.joy();
            self.cat.set_joy(joy + TOY_JOY);
            // the toy flies off the way the cat is facing
            self.toy_body.kick(self.cat.facing().step() as f32, -1.0);
        }
    }

    fn move_toy(&mut self) {
        if !self.toy.is_visible() {
            return;
        }
        self.toy_body.step();
        let (x, y) = self.toy_body.pixel();
        self.toy.move_to(Position::new(x, y));

        self.toy_age += 1;
        if self.toy_age >= TOY_LIFETIME_TICKS {
            self.toy.hide();
            self.toy_age = 0;
            tracing::debug!("toy put away");
        }
    }

    pub(crate) fn render(&self, surface: &mut dyn Surface, redraw: Redraw) -> anyhow::Result<()> {
        surface.begin_frame();
        surface.draw_background(&self.background);
        self.feed_button.draw(surface);
        self.play_button.draw(surface);
        self.stat_button.draw(surface);
        self.food.draw(surface);
        self.toy.draw(surface);
        self.cat.draw(surface);
        if let Some([hunger, joy]) = &self.stat_lines {
            surface.draw_text(hunger, HUNGER_TEXT_AT.x, HUNGER_TEXT_AT.y);
            surface.draw_text(joy, JOY_TEXT_AT.x, JOY_TEXT_AT.y);
        }
        surface.present(redraw)
    }
}

// Caption tiles from the second splash bank and the grid cells they sit in.
const CAPTION_TILES: [(u16, usize, usize); 8] = [
    (1, 3, 5),
    (2, 4, 5),
    (3, 5, 5),
    (4, 6, 5),
    (6, 3, 6),
    (7, 4, 6),
    (8, 5, 6),
    (9, 6, 6),
];

/// Logo screen shown before the game.
pub(crate) struct SplashScene {
    background: TileGrid,
    caption: Vec<Sprite>,
}

impl SplashScene {
    pub(crate) fn enter(surface: &mut dyn Surface) -> Result<Self, SceneError> {
        surface.load_bank(Bank::Splash)?;
        surface.load_bank(Bank::Splash2)?;

        let mut background = TileGrid::new(Bank::Splash);
        for row in 1..=4 {
            for col in 3..=6 {
                background.set(col, row, ((row - 1) * 4 + (col - 3)) as u16);
            }
        }

        let caption = CAPTION_TILES
            .iter()
            .map(|&(tile, col, row)| {
                let pos = Position::new(col as i32 * SPRITE_SIZE, row as i32 * SPRITE_SIZE);
                Sprite::at(Bank::Splash2, tile, pos)
            })
            .collect();

        Ok(Self {
            background,
            caption,
        })
    }

    pub(crate) fn render(&self, surface: &mut dyn Surface) -> anyhow::Result<()> {
        surface.begin_frame();
        surface.draw_background(&self.background);
        for sprite in &self.caption {
            sprite.draw(surface);
        }
        surface.present(Redraw::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Facing, CAT_W};
    use crate::storage::testing::MemoryStore;
    use crate::storage::StatRecord;
    use crate::surface::testing::{DrawCall, RecordingSurface};
    use rand::SeedableRng;

    fn scene_with(store: MemoryStore, seed: u64) -> GameScene {
        let mut surface = RecordingSurface::default();
        GameScene::enter(
            &mut surface,
            Box::new(store),
            Utc::now(),
            Behavior::still(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    fn store(hunger: i32, joy: i32) -> MemoryStore {
        MemoryStore::with_record(StatRecord {
            hunger,
            joy,
            last_checked: None,
        })
    }

    #[test]
    fn missing_bank_aborts_entry_before_touching_stats() {
        let mut surface = RecordingSurface::failing_on(Bank::Extras);
        let store = MemoryStore::default();
        let result = GameScene::enter(
            &mut surface,
            Box::new(store.clone()),
            Utc::now(),
            Behavior::still(),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(SceneError::Surface(_))));
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn entry_loads_every_bank_and_stats() {
        let mut surface = RecordingSurface::default();
        let store = store(40, 60);
        let scene = GameScene::enter(
            &mut surface,
            Box::new(store.clone()),
            Utc::now(),
            Behavior::still(),
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(surface.loaded, GAME_BANKS.to_vec());
        assert_eq!((scene.cat.hunger(), scene.cat.joy()), (40, 60));
        assert!(store.snapshot().unwrap().last_checked.is_some());
        assert_eq!((scene.cat.x(), scene.cat.y()), (56, 48));
    }

    #[test]
    fn food_is_never_placed_on_the_cat() {
        for seed in 0..40 {
            let mut scene = scene_with(store(50, 50), seed);
            let cat_x = 16 + (seed as i32 * 7) % (97 - 16);
            scene.cat.set_position(cat_x, 48);
            scene.tick(Keys::LEFT);
            assert!(scene.food.is_visible());
            let food = scene.food.position();
            assert_eq!(food.y, ITEM_ROW_Y);
            assert!((ITEM_MIN_X..=ITEM_MAX_X).contains(&food.x));
            assert!(!scene.cat.bounds().overlaps(&item_box(food.x, food.y)));
        }
    }

    #[test]
    fn feeding_round_trip() {
        let s = store(50, 50);
        let mut scene = scene_with(s.clone(), 3);
        scene.cat.set_position(16, 48);

        scene.tick(Keys::LEFT);
        assert_eq!(scene.feed_button.tiles(), vec![2, 3]);
        let food = scene.food.position();
        assert!(food.x >= 16 + CAT_W);
        assert_eq!(scene.cat.hunger(), 50);

        // walk the cat onto the bowl
        scene.cat.set_position(food.x, 48);
        scene.tick(Keys::LEFT);
        scene.tick(Keys::NONE);

        assert_eq!(scene.cat.hunger(), 60);
        assert!(!scene.food.is_visible());
        assert_eq!(scene.cat.emote_sprite().tile(), EmoteKind::Love.tile());
        assert!(scene.cat.emote_sprite().is_visible());
        assert_eq!(scene.feed_button.tiles(), vec![0, 1]);
        assert_eq!(s.snapshot().unwrap().hunger, 60);
    }

    #[test]
    fn full_cat_refuses_to_go_over_the_top() {
        let mut scene = scene_with(store(95, 50), 5);
        scene.cat.set_position(16, 48);
        scene.tick(Keys::LEFT);
        let food = scene.food.position();
        scene.cat.set_position(food.x, 48);
        scene.tick(Keys::NONE);
        assert_eq!(scene.cat.hunger(), 95);
        assert!(!scene.food.is_visible());
    }

    #[test]
    fn toy_under_the_cat_gets_kicked_away() {
        let mut scene = scene_with(store(50, 50), 11);
        scene.cat.set_position(16, 48);
        scene.tick(Keys::DOWN);
        assert!(scene.toy.is_visible());
        assert!(scene.toy_body.is_resting());
        assert_eq!(scene.play_button.tiles(), vec![6, 7]);
        scene.tick(Keys::DOWN);

        let toy = scene.toy.position();
        scene.cat.set_position(toy.x - 8, 48);
        assert_eq!(scene.cat.facing(), Facing::Left);
        scene.tick(Keys::NONE);

        assert_eq!(scene.cat.joy(), 60);
        assert!(scene.toy_body.vx < 0.0);
        assert!(scene.toy_body.vy < 0.0);
        assert!(scene.toy.position().x < toy.x);
        assert_eq!(scene.play_button.tiles(), vec![4, 5]);
    }

    #[test]
    fn right_facing_cat_kicks_right() {
        let mut scene = scene_with(store(50, 50), 12);
        scene.cat.set_position(16, 48);
        scene.tick(Keys::DOWN);
        // well clear of the right wall
        scene.toy.move_to(Position::new(80, ITEM_ROW_Y));
        scene.toy_body = ToyBody::at_rest(80.0, ITEM_ROW_Y as f32);
        let toy = scene.toy.position();
        scene.cat.flip();
        scene.cat.set_position(toy.x - 8, 48);
        scene.tick(Keys::NONE);
        assert!(scene.toy_body.vx > 0.0);
        assert!(scene.toy.position().x > toy.x);
    }

    #[test]
    fn toy_is_put_away_after_its_lifetime() {
        let mut scene = scene_with(store(50, 50), 21);
        scene.cat.set_position(16, 48);
        scene.tick(Keys::DOWN);
        for _ in 0..TOY_LIFETIME_TICKS - 2 {
            scene.tick(Keys::NONE);
        }
        assert!(scene.toy.is_visible());
        scene.tick(Keys::NONE);
        assert!(!scene.toy.is_visible());
        assert_eq!(scene.toy_age, 0);
    }

    #[test]
    fn stat_button_shows_and_hides_overlay() {
        let mut scene = scene_with(store(33, 77), 2);
        let mut surface = RecordingSurface::default();
        for bank in GAME_BANKS {
            surface.load_bank(bank).unwrap();
        }

        let redraw = scene.tick(Keys::RIGHT);
        assert_eq!(redraw, Redraw::Partial);
        scene.render(&mut surface, redraw).unwrap();
        assert_eq!(surface.texts(), vec!["Hunger: 33/100", "Joy: 77/100"]);
        assert!(matches!(surface.frame.last(), Some(DrawCall::Text { y: 28, .. })));

        assert_eq!(scene.tick(Keys::RIGHT), Redraw::Sprites);
        assert!(scene.stat_lines.is_some());

        let redraw = scene.tick(Keys::NONE);
        assert_eq!(redraw, Redraw::Full);
        scene.render(&mut surface, redraw).unwrap();
        assert!(surface.texts().is_empty());
        assert_eq!(surface.presents, vec![Redraw::Partial, Redraw::Full]);
        assert_eq!(scene.stat_button.tiles(), vec![8, 9]);
    }

    #[test]
    fn up_key_does_nothing() {
        let mut scene = scene_with(store(50, 50), 4);
        for _ in 0..5 {
            assert_eq!(scene.tick(Keys::UP), Redraw::Sprites);
        }
        assert!(!scene.food.is_visible());
        assert!(!scene.toy.is_visible());
        assert!(scene.stat_lines.is_none());
        assert_eq!(scene.ticks(), 5);
    }

    #[test]
    fn render_draws_background_first_and_cat_over_items() {
        let mut scene = scene_with(store(50, 50), 8);
        scene.tick(Keys::LEFT);
        let mut surface = RecordingSurface::default();
        scene.render(&mut surface, Redraw::Sprites).unwrap();

        assert_eq!(surface.frame.first(), Some(&DrawCall::Background(Bank::GameBackground)));
        assert_eq!(surface.tiles_from(Bank::Buttons).len(), 4);
        assert_eq!(surface.tiles_from(Bank::Buttons2).len(), 2);
        assert_eq!(surface.tiles_from(Bank::Extras).len(), 1);
        assert_eq!(surface.tiles_from(Bank::LeftCat).len(), 6);
        let food_at = surface
            .frame
            .iter()
            .position(|c| matches!(c, DrawCall::Tile { bank: Bank::Extras, .. }));
        let cat_at = surface
            .frame
            .iter()
            .position(|c| matches!(c, DrawCall::Tile { bank: Bank::LeftCat, .. }));
        assert!(food_at < cat_at);
    }

    #[test]
    fn splash_lays_out_logo_and_caption() {
        let mut surface = RecordingSurface::default();
        let splash = SplashScene::enter(&mut surface).unwrap();
        assert_eq!(splash.background.get(3, 1), Some(0));
        assert_eq!(splash.background.get(6, 4), Some(15));
        assert_eq!(splash.background.get(0, 0), None);

        splash.render(&mut surface).unwrap();
        let caption = surface.tiles_from(Bank::Splash2);
        assert_eq!(caption.len(), 8);
        assert_eq!(caption[0], (1, 48, 80));
        assert_eq!(caption[7], (9, 96, 96));
        assert_eq!(surface.presents, vec![Redraw::Full]);
    }

    #[test]
    fn splash_fails_without_its_banks() {
        let mut surface = RecordingSurface::failing_on(Bank::Splash2);
        assert!(SplashScene::enter(&mut surface).is_err());
    }
}
