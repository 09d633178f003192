//! Keyboard and gamepad processing that does not depend on the OS.

use crate::common::{ButtonState, ControllerInput};

/// Keys the game listens to. Platform layers translate their own key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    Left,
    Right,
    Escape,
    Space,
    F4,
}

/// Decoded bits of a Win32 keystroke message `lParam`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFlags {
    pub was_down: bool,
    pub is_down: bool,
    pub alt_down: bool,
}

impl KeyFlags {
    pub fn from_lparam(l_param: isize) -> Self {
        let bits = l_param as u32;
        Self {
            was_down: bits & (1 << 30) != 0,
            is_down: bits & (1 << 31) == 0,
            alt_down: bits & (1 << 29) != 0,
        }
    }

    /// Auto-repeat messages report the same state twice.
    pub fn is_transition(&self) -> bool {
        self.was_down != self.is_down
    }
}

pub fn process_keyboard_message(new_state: &mut ButtonState, is_down: bool) {
    if new_state.ended_down != is_down {
        new_state.ended_down = is_down;
        new_state.half_transition_count += 1;
    }
}

pub fn apply_key(keyboard: &mut ControllerInput, key: Key, is_down: bool) {
    let button = match key {
        Key::W => &mut keyboard.move_up,
        Key::A => &mut keyboard.move_left,
        Key::S => &mut keyboard.move_down,
        Key::D => &mut keyboard.move_right,
        Key::Q => &mut keyboard.left_shoulder,
        Key::E => &mut keyboard.right_shoulder,
        Key::Up => &mut keyboard.action_up,
        Key::Down => &mut keyboard.action_down,
        Key::Left => &mut keyboard.action_left,
        Key::Right => &mut keyboard.action_right,
        Key::Escape => &mut keyboard.start,
        Key::Space => &mut keyboard.select,
        Key::F4 => return,
    };
    debug!("{:?} {}", key, if is_down { "down" } else { "up" });
    process_keyboard_message(button, is_down);
}

// Button bits, laid out like XINPUT_GAMEPAD.wButtons so the XInput backend
// can pass them through untouched.
pub const GAMEPAD_DPAD_UP: u16 = 0x0001;
pub const GAMEPAD_DPAD_DOWN: u16 = 0x0002;
pub const GAMEPAD_DPAD_LEFT: u16 = 0x0004;
pub const GAMEPAD_DPAD_RIGHT: u16 = 0x0008;
pub const GAMEPAD_START: u16 = 0x0010;
pub const GAMEPAD_BACK: u16 = 0x0020;
pub const GAMEPAD_LEFT_SHOULDER: u16 = 0x0100;
pub const GAMEPAD_RIGHT_SHOULDER: u16 = 0x0200;
pub const GAMEPAD_A: u16 = 0x1000;
pub const GAMEPAD_B: u16 = 0x2000;
pub const GAMEPAD_X: u16 = 0x4000;
pub const GAMEPAD_Y: u16 = 0x8000;

pub const LEFT_THUMB_DEADZONE: i16 = 7849;

/// Raw state of one pad as the backend reports it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GamepadState {
    pub buttons: u16,
    pub stick_x: i16,
    pub stick_y: i16,
}

/// A source of gamepad state. Backends that failed to load fall back to
/// `DisconnectedGamepads` so the frame loop never has to care.
pub trait Gamepads {
    /// `None` means nothing is plugged into that slot.
    fn poll(&mut self, gamepad_index: usize) -> Option<GamepadState>;
}

#[derive(Debug, Default)]
pub struct DisconnectedGamepads;

impl Gamepads for DisconnectedGamepads {
    fn poll(&mut self, _gamepad_index: usize) -> Option<GamepadState> {
        None
    }
}

pub fn process_stick_value(value: i16, dead_zone_threshold: i16) -> f32 {
    let value = i32::from(value);
    let dead_zone_threshold = i32::from(dead_zone_threshold);

    if value < -dead_zone_threshold {
        (value + dead_zone_threshold) as f32 / (32768.0 - dead_zone_threshold as f32)
    } else if value > dead_zone_threshold {
        (value - dead_zone_threshold) as f32 / (32767.0 - dead_zone_threshold as f32)
    } else {
        0.0
    }
}

pub fn process_digital_button(
    button_state: u16,
    old_state: &ButtonState,
    button_bit: u16,
    new_state: &mut ButtonState,
) {
    new_state.ended_down = (button_state & button_bit) == button_bit;
    new_state.half_transition_count = if old_state.ended_down != new_state.ended_down {
        1
    } else {
        0
    };
}

/// Turns one polled pad into game input, using last frame's state for
/// transitions.
pub fn process_gamepad(old: &ControllerInput, pad: &GamepadState, new: &mut ControllerInput) {
    new.is_connected = true;
    new.is_analog = old.is_analog;

    // TODO: square deadzone; XInput documents a round one for the thumbsticks
    new.stick_average_x = process_stick_value(pad.stick_x, LEFT_THUMB_DEADZONE);
    new.stick_average_y = process_stick_value(pad.stick_y, LEFT_THUMB_DEADZONE);
    if new.stick_average_x != 0.0 || new.stick_average_y != 0.0 {
        new.is_analog = true;
    }

    if pad.buttons & GAMEPAD_DPAD_UP != 0 {
        new.stick_average_y = 1.0;
        new.is_analog = false;
    }
    if pad.buttons & GAMEPAD_DPAD_DOWN != 0 {
        new.stick_average_y = -1.0;
        new.is_analog = false;
    }
    if pad.buttons & GAMEPAD_DPAD_LEFT != 0 {
        new.stick_average_x = -1.0;
        new.is_analog = false;
    }
    if pad.buttons & GAMEPAD_DPAD_RIGHT != 0 {
        new.stick_average_x = 1.0;
        new.is_analog = false;
    }

    let threshold = 0.5;
    let stick_bit = |pushed: bool| if pushed { 1 } else { 0 };
    process_digital_button(
        stick_bit(new.stick_average_x < -threshold),
        &old.move_left,
        1,
        &mut new.move_left,
    );
    process_digital_button(
        stick_bit(new.stick_average_x > threshold),
        &old.move_right,
        1,
        &mut new.move_right,
    );
    process_digital_button(
        stick_bit(new.stick_average_y < -threshold),
        &old.move_down,
        1,
        &mut new.move_down,
    );
    process_digital_button(
        stick_bit(new.stick_average_y > threshold),
        &old.move_up,
        1,
        &mut new.move_up,
    );

    let buttons = pad.buttons;
    process_digital_button(buttons, &old.action_down, GAMEPAD_A, &mut new.action_down);
    process_digital_button(buttons, &old.action_right, GAMEPAD_B, &mut new.action_right);
    process_digital_button(buttons, &old.action_left, GAMEPAD_X, &mut new.action_left);
    process_digital_button(buttons, &old.action_up, GAMEPAD_Y, &mut new.action_up);
    process_digital_button(
        buttons,
        &old.left_shoulder,
        GAMEPAD_LEFT_SHOULDER,
        &mut new.left_shoulder,
    );
    process_digital_button(
        buttons,
        &old.right_shoulder,
        GAMEPAD_RIGHT_SHOULDER,
        &mut new.right_shoulder,
    );
    process_digital_button(buttons, &old.start, GAMEPAD_START, &mut new.start);
    process_digital_button(buttons, &old.select, GAMEPAD_BACK, &mut new.select);
}
