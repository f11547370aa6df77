use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Bitmask of the keys held during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Keys(u8);

impl Keys {
    pub(crate) const NONE: Keys = Keys(0);
    pub(crate) const LEFT: Keys = Keys(1 << 0);
    pub(crate) const RIGHT: Keys = Keys(1 << 1);
    pub(crate) const UP: Keys = Keys(1 << 2);
    pub(crate) const DOWN: Keys = Keys(1 << 3);

    pub(crate) fn contains(self, other: Keys) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub(crate) fn insert(&mut self, other: Keys) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for Keys {
    type Output = Keys;

    fn bitor(self, rhs: Keys) -> Keys {
        Keys(self.0 | rhs.0)
    }
}

/// Edge-detected state of one button, advanced once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ButtonState {
    #[default]
    Up,
    JustPressed,
    StillPressed,
    Released,
}

impl ButtonState {
    pub(crate) fn next(self, held: bool) -> Self {
        match (self, held) {
            (ButtonState::Up, true) => ButtonState::JustPressed,
            (ButtonState::JustPressed, true) => ButtonState::StillPressed,
            // a key pressed again during its release tick is not seen until it goes up
            (state, true) => state,
            (ButtonState::StillPressed, false) => ButtonState::Released,
            (_, false) => ButtonState::Up,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct InputFrame {
    pub(crate) keys: Keys,
    pub(crate) quit: bool,
}

/// Anything that can report which keys are held right now.
pub(crate) trait InputSource {
    fn sample(&mut self) -> anyhow::Result<InputFrame>;
}

// Terminals rarely send key-up, and auto-repeat starts after ~500ms with
// gaps of ~30ms, so a key stays held for a while after its last event.
const FIRST_HOLD: Duration = Duration::from_millis(550);
const REPEAT_HOLD: Duration = Duration::from_millis(120);

#[derive(Clone, Copy, Debug, Default)]
struct HeldKey {
    until: Option<Instant>,
}

impl HeldKey {
    fn press(&mut self, now: Instant, repeat: bool) {
        let hold = if repeat || self.is_held(now) {
            REPEAT_HOLD
        } else {
            FIRST_HOLD
        };
        self.until = Some(now + hold);
    }

    fn release(&mut self) {
        self.until = None;
    }

    fn is_held(&self, now: Instant) -> bool {
        self.until.map_or(false, |t| now < t)
    }
}

/// Keyboard input from the controlling terminal. Arrow keys map to the
/// device buttons; WASD work too.
#[derive(Default)]
pub(crate) struct TermInput {
    left: HeldKey,
    right: HeldKey,
    up: HeldKey,
    down: HeldKey,
}

impl TermInput {
    fn slot(&mut self, code: KeyCode) -> Option<&mut HeldKey> {
        match code {
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(&mut self.left),
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(&mut self.right),
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(&mut self.up),
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(&mut self.down),
            _ => None,
        }
    }

    /// Folds one key event in; returns true when it asks to quit.
    fn handle(&mut self, key: KeyEvent, now: Instant) -> bool {
        if is_quit(&key) {
            return key.kind != KeyEventKind::Release;
        }
        if let Some(slot) = self.slot(key.code) {
            match key.kind {
                KeyEventKind::Press => slot.press(now, false),
                KeyEventKind::Repeat => slot.press(now, true),
                KeyEventKind::Release => slot.release(),
            }
        }
        false
    }

    fn held(&self, now: Instant) -> Keys {
        let mut keys = Keys::NONE;
        for (slot, key) in [
            (&self.left, Keys::LEFT),
            (&self.right, Keys::RIGHT),
            (&self.up, Keys::UP),
            (&self.down, Keys::DOWN),
        ] {
            if slot.is_held(now) {
                keys.insert(key);
            }
        }
        keys
    }
}

impl InputSource for TermInput {
    fn sample(&mut self) -> anyhow::Result<InputFrame> {
        let mut quit = false;
        let mut seen = 0;
        while event::poll(Duration::ZERO)? {
            if let Event::Key(k) = event::read()? {
                quit |= self.handle(k, Instant::now());
                seen += 1;
                if seen >= 32 {
                    break;
                }
            }
        }
        Ok(InputFrame {
            keys: self.held(Instant::now()),
            quit,
        })
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
