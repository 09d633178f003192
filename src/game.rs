//! The platform-independent half: steers the offsets from input, draws the
//! gradient, and produces the frame's sound.

use crate::{
    buffer::{PixelBuffer, BYTES_PER_PIXEL},
    common::Input,
    sound::{SoundOutputBuffer, ToneGenerator},
};

pub const DEFAULT_TONE_HZ: u32 = 256;
const GREEN_STEP: i32 = 20;

#[derive(Debug, Clone, Copy)]
pub struct State {
    pub blue_offset: i32,
    pub green_offset: i32,
    pub tone_hz: u32,
    tone: ToneGenerator,
}

impl Default for State {
    fn default() -> Self {
        Self::with_tone(DEFAULT_TONE_HZ)
    }
}

impl State {
    pub fn with_tone(tone_hz: u32) -> Self {
        Self {
            blue_offset: 0,
            green_offset: 0,
            tone_hz,
            tone: ToneGenerator::default(),
        }
    }
}

/// Steers the offsets from this frame's controllers.
pub fn apply_input(state: &mut State, input: &Input) {
    for controller in input.controllers.iter().filter(|c| c.is_connected) {
        if controller.is_analog {
            state.blue_offset = state
                .blue_offset
                .wrapping_add((4.0 * controller.stick_average_x) as i32);
            state.tone_hz = (256.0 + 128.0 * controller.stick_average_y) as u32;
        }

        if controller.move_up.was_pressed() || controller.action_up.was_pressed() {
            state.green_offset = state.green_offset.wrapping_add(GREEN_STEP);
            trace!("green offset up: {}", state.green_offset);
        }
        if controller.move_down.was_pressed() || controller.action_down.was_pressed() {
            state.green_offset = state.green_offset.wrapping_sub(GREEN_STEP);
            trace!("green offset down: {}", state.green_offset);
        }
    }
}

pub fn update_and_render(
    state: &mut State,
    input: &Input,
    buffer: &mut PixelBuffer,
    sound_buffer: &mut SoundOutputBuffer,
) {
    apply_input(state, input);
    render_weird_gradient(buffer, state.blue_offset, state.green_offset);
    state.tone.output(sound_buffer, state.tone_hz);

    // blue scrolls by one every frame
    state.blue_offset = state.blue_offset.wrapping_add(1);
}

/// Blue follows x, green follows y plus a counter that runs along each row
/// and restarts from `y + 2` after row `y`.
pub fn render_weird_gradient(buffer: &mut PixelBuffer, blue_offset: i32, green_offset: i32) {
    let mut changed: i32 = 2;
    for y in 0..buffer.height() {
        let row = match buffer.row_mut(y) {
            Some(row) => row,
            None => break,
        };
        let y = y as i32;
        for (x, pixel) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            changed = changed.wrapping_add(1);
            let blue = (x as i32).wrapping_add(blue_offset) as u8;
            let green = y.wrapping_add(green_offset).wrapping_add(changed) as u8;

            let value = (u32::from(green) << 8) | u32::from(blue);
            pixel.copy_from_slice(&value.to_le_bytes());
        }
        changed = y.wrapping_add(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ButtonState;

    fn channels(buffer: &PixelBuffer, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let pixel = buffer.pixel(x, y).unwrap().to_le_bytes();
        (pixel[0], pixel[1], pixel[2], pixel[3])
    }

    #[test]
    fn small_gradient_exact_values() {
        let mut buffer = PixelBuffer::with_dimensions(4, 2).unwrap();
        render_weird_gradient(&mut buffer, 0, 0);

        let row0: Vec<_> = (0..4).map(|x| channels(&buffer, x, 0)).collect();
        let row1: Vec<_> = (0..4).map(|x| channels(&buffer, x, 1)).collect();
        assert_eq!(row0, vec![(0, 3, 0, 0), (1, 4, 0, 0), (2, 5, 0, 0), (3, 6, 0, 0)]);
        assert_eq!(row1, vec![(0, 4, 0, 0), (1, 5, 0, 0), (2, 6, 0, 0), (3, 7, 0, 0)]);
    }

    #[test]
    fn counter_restarts_from_previous_row() {
        let mut buffer = PixelBuffer::with_dimensions(3, 4).unwrap();
        render_weird_gradient(&mut buffer, 0, 5);

        // after row y-1 the counter is y+1, so pixel x of row y sees y+2+x
        for y in 1..4 {
            for x in 0..3 {
                let (_, green, _, _) = channels(&buffer, x, y);
                assert_eq!(green, (y + 5 + y + 2 + x) as u8);
            }
        }
    }

    #[test]
    fn blue_depends_only_on_x() {
        let mut buffer = PixelBuffer::with_dimensions(300, 3).unwrap();
        render_weird_gradient(&mut buffer, 250, -7);

        for y in 0..3 {
            for x in 0..300 {
                let (blue, _, red, pad) = channels(&buffer, x, y);
                assert_eq!(blue, ((x + 250) % 256) as u8);
                assert_eq!((red, pad), (0, 0));
            }
        }
    }

    #[test]
    fn gradient_is_deterministic() {
        let mut first = PixelBuffer::with_dimensions(37, 11).unwrap();
        let mut second = PixelBuffer::with_dimensions(37, 11).unwrap();
        render_weird_gradient(&mut first, 91, -400);
        render_weird_gradient(&mut second, 12, 3);
        render_weird_gradient(&mut second, 91, -400);
        assert_eq!(first.memory(), second.memory());
    }

    #[test]
    fn unsized_buffer_draws_nothing() {
        let mut buffer = PixelBuffer::new();
        render_weird_gradient(&mut buffer, 1, 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn up_and_down_presses_move_green() {
        let mut state = State::default();
        let mut input = Input::default();
        let pressed = ButtonState {
            half_transition_count: 1,
            ended_down: true,
        };

        let pad = input.gamepad_mut(0);
        pad.is_connected = true;
        pad.move_up = pressed;
        apply_input(&mut state, &input);
        assert_eq!(state.green_offset, 20);

        let mut input = Input::default();
        let keyboard = input.keyboard_mut();
        keyboard.is_connected = true;
        keyboard.action_down = pressed;
        apply_input(&mut state, &input);
        assert_eq!(state.green_offset, 0);
    }

    #[test]
    fn held_button_does_not_repeat() {
        let mut state = State::default();
        let mut input = Input::default();
        let pad = input.gamepad_mut(1);
        pad.is_connected = true;
        pad.move_up = ButtonState {
            half_transition_count: 0,
            ended_down: true,
        };
        apply_input(&mut state, &input);
        assert_eq!(state.green_offset, 0);
    }

    #[test]
    fn analog_stick_steers_blue_and_tone() {
        let mut state = State::default();
        let mut input = Input::default();
        let pad = input.gamepad_mut(0);
        pad.is_connected = true;
        pad.is_analog = true;
        pad.stick_average_x = 1.0;
        pad.stick_average_y = -0.5;

        apply_input(&mut state, &input);
        assert_eq!(state.blue_offset, 4);
        assert_eq!(state.tone_hz, 192);
    }

    #[test]
    fn update_draws_then_advances() {
        let mut state = State::default();
        let mut buffer = PixelBuffer::with_dimensions(2, 1).unwrap();
        let mut sound = SoundOutputBuffer::new(48_000);
        sound.prepare(0);

        update_and_render(&mut state, &Input::default(), &mut buffer, &mut sound);
        assert_eq!(channels(&buffer, 0, 0).0, 0);
        update_and_render(&mut state, &Input::default(), &mut buffer, &mut sound);
        assert_eq!(channels(&buffer, 0, 0).0, 1);
        assert_eq!(state.blue_offset, 2);
    }

    #[test]
    fn green_press_shows_in_the_same_frame() {
        let mut state = State::default();
        let mut buffer = PixelBuffer::with_dimensions(1, 1).unwrap();
        let mut sound = SoundOutputBuffer::new(48_000);
        let mut input = Input::default();
        let keyboard = input.keyboard_mut();
        keyboard.is_connected = true;
        keyboard.move_up = ButtonState {
            half_transition_count: 1,
            ended_down: true,
        };

        update_and_render(&mut state, &input, &mut buffer, &mut sound);
        assert_eq!(channels(&buffer, 0, 0).1, 23);
    }
}
