//! Types shared by the platform layer and the game: what the platform hands
//! over every frame.

/// Slot 0 is the keyboard, the rest are gamepads.
pub const KEYBOARD_CONTROLLER: usize = 0;
pub const MAX_GAMEPADS: usize = 4;
pub const CONTROLLER_COUNT: usize = MAX_GAMEPADS + 1;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    pub half_transition_count: i32,
    pub ended_down: bool,
}

impl ButtonState {
    /// Went down at least once during the frame.
    pub fn was_pressed(&self) -> bool {
        self.half_transition_count > 1 || (self.half_transition_count == 1 && self.ended_down)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ControllerInput {
    pub is_connected: bool,
    pub is_analog: bool,
    pub stick_average_x: f32,
    pub stick_average_y: f32,

    pub move_up: ButtonState,
    pub move_down: ButtonState,
    pub move_left: ButtonState,
    pub move_right: ButtonState,

    pub action_up: ButtonState,
    pub action_down: ButtonState,
    pub action_left: ButtonState,
    pub action_right: ButtonState,

    pub left_shoulder: ButtonState,
    pub right_shoulder: ButtonState,

    pub select: ButtonState,
    pub start: ButtonState,
}

impl ControllerInput {
    fn buttons_mut(&mut self) -> [&mut ButtonState; 12] {
        [
            &mut self.move_up,
            &mut self.move_down,
            &mut self.move_left,
            &mut self.move_right,
            &mut self.action_up,
            &mut self.action_down,
            &mut self.action_left,
            &mut self.action_right,
            &mut self.left_shoulder,
            &mut self.right_shoulder,
            &mut self.select,
            &mut self.start,
        ]
    }

    /// Keyboard state carries over between frames (keys only report
    /// transitions) but the transition counts start again from zero.
    pub fn carry_over(&mut self, old: &ControllerInput) {
        *self = old.clone();
        for button in self.buttons_mut().iter_mut() {
            button.half_transition_count = 0;
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Input {
    pub controllers: [ControllerInput; CONTROLLER_COUNT],
}

impl Input {
    pub fn keyboard(&self) -> &ControllerInput {
        &self.controllers[KEYBOARD_CONTROLLER]
    }

    pub fn keyboard_mut(&mut self) -> &mut ControllerInput {
        &mut self.controllers[KEYBOARD_CONTROLLER]
    }

    pub fn gamepad(&self, gamepad_index: usize) -> &ControllerInput {
        debug_assert!(gamepad_index < MAX_GAMEPADS);
        &self.controllers[gamepad_index + 1]
    }

    pub fn gamepad_mut(&mut self, gamepad_index: usize) -> &mut ControllerInput {
        debug_assert!(gamepad_index < MAX_GAMEPADS);
        &mut self.controllers[gamepad_index + 1]
    }
}
