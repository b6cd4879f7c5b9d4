//! Input handling for keyboard and mouse.
//!
//! [`InputState`] is owned by the caller of the event pump and refilled on
//! every poll. Part of it persists across polls (key DOWN bits, the last click)
//! and part of it is transient (key PRESSED bits, `button_down`, `button_up`).

use glam::Vec2;

/// Hardware keycode as reported by the display server.
pub type Keycode = u8;

/// Number of distinct keycodes tracked.
pub const KEY_COUNT: usize = 256;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    /// Any other button, by its platform number.
    Other(u32),
}

impl From<u32> for MouseButton {
    fn from(button: u32) -> Self {
        match button {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            4 => MouseButton::ScrollUp,
            5 => MouseButton::ScrollDown,
            other => MouseButton::Other(other),
        }
    }
}

impl From<MouseButton> for u32 {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::ScrollUp => 4,
            MouseButton::ScrollDown => 5,
            MouseButton::Other(other) => other,
        }
    }
}

/// Per-key state bits.
///
/// `DOWN` follows the physical key and survives across polls. `PRESSED` means
/// "a press was seen during the last poll" and is cleared at the start of every
/// poll, whatever `DOWN` says.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState(u8);

impl KeyState {
    const DOWN: u8 = 1 << 0;
    const PRESSED: u8 = 1 << 1;

    /// The key is currently held.
    #[inline]
    pub fn is_down(self) -> bool {
        self.0 & Self::DOWN != 0
    }

    /// The key was pressed during the last poll.
    #[inline]
    pub fn is_pressed(self) -> bool {
        self.0 & Self::PRESSED != 0
    }

    /// Raw bitmask.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Keyboard and mouse state as seen by the application after a poll.
#[derive(Debug, Clone)]
pub struct InputState {
    key_state: [KeyState; KEY_COUNT],

    /// Cursor position normalized to [0,1], origin bottom-left
    cursor_pos: Vec2,
    /// Cursor position in pixels, clamped to the window, origin bottom-left
    cursor_pos_pixels: Vec2,

    /// Normalized position of the last button release
    click_pos: Vec2,
    /// Button of the last release
    click_button: Option<MouseButton>,

    /// Button pressed during the last poll
    button_down: Option<MouseButton>,
    /// Button released during the last poll
    button_up: Option<MouseButton>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            key_state: [KeyState::default(); KEY_COUNT],
            cursor_pos: Vec2::ZERO,
            cursor_pos_pixels: Vec2::ZERO,
            click_pos: Vec2::ZERO,
            click_button: None,
            button_down: None,
            button_up: None,
        }
    }
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the per-poll state. Called by the event pump before draining.
    ///
    /// Held keys and the last click survive.
    pub fn begin_frame(&mut self) {
        for key in &mut self.key_state {
            key.0 &= KeyState::DOWN;
        }
        self.button_down = None;
        self.button_up = None;
    }

    /// Handle a key press event.
    pub fn on_key_pressed(&mut self, key: Keycode) {
        self.key_state[usize::from(key)].0 |= KeyState::DOWN | KeyState::PRESSED;
    }

    /// Handle a key release event. The PRESSED bit is left alone.
    pub fn on_key_released(&mut self, key: Keycode) {
        self.key_state[usize::from(key)].0 &= !KeyState::DOWN;
    }

    /// Handle a mouse button press event.
    pub fn on_button_pressed(&mut self, button: MouseButton) {
        self.button_down = Some(button);
    }

    /// Handle a mouse button release event.
    ///
    /// `position` is the normalized release position, or `None` when it could
    /// not be computed, in which case the previous click position is kept.
    pub fn on_button_released(&mut self, button: MouseButton, position: Option<Vec2>) {
        if let Some(position) = position {
            self.click_pos = position;
        }
        self.click_button = Some(button);
        self.button_up = Some(button);
    }

    /// Record the sampled cursor position.
    pub fn on_cursor_sampled(&mut self, normalized: Vec2, pixels: Vec2) {
        self.cursor_pos = normalized;
        self.cursor_pos_pixels = pixels;
    }

    /// State bits of a key.
    #[inline]
    pub fn key_state(&self, key: Keycode) -> KeyState {
        self.key_state[usize::from(key)]
    }

    /// Check if a key is currently held.
    pub fn is_key_down(&self, key: Keycode) -> bool {
        self.key_state(key).is_down()
    }

    /// Check if a key was pressed during the last poll.
    pub fn is_key_pressed(&self, key: Keycode) -> bool {
        self.key_state(key).is_pressed()
    }

    /// Keycodes currently held, in ascending order.
    pub fn keys_down(&self) -> impl Iterator<Item = Keycode> + '_ {
        (0..=Keycode::MAX).filter(|&key| self.is_key_down(key))
    }

    /// Keycodes pressed during the last poll, in ascending order.
    pub fn keys_pressed(&self) -> impl Iterator<Item = Keycode> + '_ {
        (0..=Keycode::MAX).filter(|&key| self.is_key_pressed(key))
    }

    /// Get the normalized cursor position.
    pub fn cursor_pos(&self) -> Vec2 {
        self.cursor_pos
    }

    /// Get the cursor position in pixels.
    pub fn cursor_pos_pixels(&self) -> Vec2 {
        self.cursor_pos_pixels
    }

    /// Get the normalized position of the last click.
    pub fn click_pos(&self) -> Vec2 {
        self.click_pos
    }

    /// Get the button of the last click.
    pub fn click_button(&self) -> Option<MouseButton> {
        self.click_button
    }

    /// Get the button pressed during the last poll.
    pub fn button_down(&self) -> Option<MouseButton> {
        self.button_down
    }

    /// Get the button released during the last poll.
    pub fn button_up(&self) -> Option<MouseButton> {
        self.button_up
    }
}
