use crate::model::Position;
use crate::sprite::{MetaSprite, SpriteError};
use crate::surface::{Bank, Surface};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ButtonStyle {
    Feed = 0,
    Play = 1,
    Stat = 2,
    #[cfg_attr(not(test), allow(dead_code))]
    Exit = 3,
}

impl ButtonStyle {
    fn bank(self) -> Bank {
        match self {
            ButtonStyle::Feed | ButtonStyle::Play => Bank::Buttons,
            ButtonStyle::Stat | ButtonStyle::Exit => Bank::Buttons2,
        }
    }

    fn released_tiles(self) -> [u16; 2] {
        let first = self as u16 * 4;
        [first, first + 1]
    }

    fn pressed_tiles(self) -> [u16; 2] {
        let [a, b] = self.released_tiles();
        [a + 2, b + 2]
    }
}

/// Two-tile on-screen button. Purely visual: callers pair `press` and
/// `release` themselves.
pub(crate) struct Button {
    style: ButtonStyle,
    sprite: MetaSprite,
    frame_error_logged: bool,
}

impl Button {
    pub(crate) fn new(x: i32, y: i32, style: ButtonStyle) -> Result<Self, SpriteError> {
        let sprite = MetaSprite::new(
            Position::new(x, y),
            2,
            1,
            style.bank(),
            &style.released_tiles(),
        )?;
        Ok(Self {
            style,
            sprite,
            frame_error_logged: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn style(&self) -> ButtonStyle {
        self.style
    }

    pub(crate) fn press(&mut self) {
        self.show(self.style.pressed_tiles());
    }

    pub(crate) fn release(&mut self) {
        self.show(self.style.released_tiles());
    }

    fn show(&mut self, tiles: [u16; 2]) {
        if let Err(err) = self.sprite.swap_frames(&tiles) {
            if !self.frame_error_logged {
                tracing::warn!(%err, style = ?self.style, "button frame swap failed");
                self.frame_error_logged = true;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn tiles(&self) -> Vec<u16> {
        self.sprite.tiles()
    }

    pub(crate) fn draw(&self, surface: &mut dyn Surface) {
        self.sprite.draw(surface);
    }
}
