//! The frame loop: poll events, update input, draw, hand sound and pixels to
//! the platform, repeat until something asks to stop.

use crate::{
    buffer::{Dimension, PixelBuffer},
    common::{ControllerInput, Input, MAX_GAMEPADS},
    config::Config,
    error::Result,
    game::{self, State},
    input::{process_gamepad, Gamepads},
    sound::{AudioSink, SoundOutputBuffer},
};
use std::{
    mem,
    thread,
    time::{Duration, Instant},
};

/// What happened while draining the platform's event queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pump {
    pub quit: bool,
    /// Latest client-area size, if the window was resized.
    pub resized: Option<Dimension>,
}

/// Everything the frame loop needs from an OS window.
pub trait Platform {
    /// Drains pending messages, feeding key transitions into `keyboard`.
    fn process_pending_messages(&mut self, keyboard: &mut ControllerInput) -> Pump;

    fn gamepads(&mut self) -> &mut dyn Gamepads;

    fn audio(&mut self) -> &mut dyn AudioSink;

    fn window_dimension(&self) -> Dimension;

    /// Stretches `buffer` over a `target`-sized area of the window.
    fn display_buffer(&mut self, buffer: &PixelBuffer, target: Dimension);
}

/// Sleeps out the rest of each frame.
#[derive(Debug)]
pub struct FrameClock {
    target: Duration,
    last_counter: Instant,
}

impl FrameClock {
    /// A target that is not a positive finite number disables the wait.
    pub fn new(target_seconds_per_frame: f32) -> Self {
        let target = if target_seconds_per_frame.is_finite() && target_seconds_per_frame > 0.0 {
            Duration::from_secs_f32(target_seconds_per_frame)
        } else {
            warn!("bad frame target {}s, frames run unpaced", target_seconds_per_frame);
            Duration::from_secs(0)
        };
        Self {
            target,
            last_counter: Instant::now(),
        }
    }

    /// Returns the seconds the whole frame took.
    pub fn wait(&mut self) -> f32 {
        let work = self.last_counter.elapsed();
        if work < self.target {
            thread::sleep(self.target - work);
        } else {
            trace!("missed frame rate");
        }

        let end_counter = Instant::now();
        let frame = end_counter - self.last_counter;
        self.last_counter = end_counter;

        trace!(
            "{:.2}ms/f, {:.1}f/s",
            frame.as_secs_f32() * 1000.0,
            1.0 / frame.as_secs_f32().max(f32::EPSILON)
        );
        frame.as_secs_f32()
    }
}

pub struct App {
    running: bool,
    buffer: PixelBuffer,
    state: State,
    old_input: Input,
    new_input: Input,
    sound: SoundOutputBuffer,
    resize_with_window: bool,
    frame_count: u64,
    frame_limit: Option<u64>,
}

impl App {
    /// Fails only if the back buffer cannot be allocated.
    pub fn new(config: &Config) -> Result<Self> {
        let buffer = PixelBuffer::with_dimensions(config.buffer_width, config.buffer_height)?;

        Ok(Self {
            running: true,
            buffer,
            state: State::with_tone(config.tone_hz),
            old_input: Input::default(),
            new_input: Input::default(),
            sound: SoundOutputBuffer::new(config.samples_per_second),
            resize_with_window: config.resize_with_window,
            frame_count: 0,
            frame_limit: config.frame_limit,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn on_window_resized(&mut self, dimension: Dimension) -> Result<()> {
        if dimension.is_empty() {
            // minimized
            debug!("window has no client area, keeping the back buffer");
            return Ok(());
        }

        if !self.resize_with_window {
            debug!(
                "window resized to {}x{}, back buffer stays {}x{}",
                dimension.width,
                dimension.height,
                self.buffer.width(),
                self.buffer.height()
            );
            return Ok(());
        }

        if dimension != self.buffer.dimension() {
            self.buffer.resize(dimension.width, dimension.height)?;
        }
        Ok(())
    }

    fn frame_limit_reached(&self) -> bool {
        self.frame_limit
            .map_or(false, |limit| self.frame_count >= limit)
    }

    /// One trip through the loop. A quit request or a used-up frame limit
    /// stops before drawing.
    pub fn frame<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<()> {
        if self.frame_limit_reached() {
            self.running = false;
            return Ok(());
        }

        let keyboard = self.new_input.keyboard_mut();
        keyboard.carry_over(self.old_input.keyboard());
        keyboard.is_connected = true;

        let pump = platform.process_pending_messages(keyboard);
        if pump.quit {
            info!("quit requested after {} frames", self.frame_count);
            self.running = false;
            return Ok(());
        }
        if let Some(dimension) = pump.resized {
            self.on_window_resized(dimension)?;
        }

        for gamepad_index in 0..MAX_GAMEPADS {
            let old = self.old_input.gamepad(gamepad_index);
            let new = self.new_input.gamepad_mut(gamepad_index);
            match platform.gamepads().poll(gamepad_index) {
                Some(pad) => process_gamepad(old, &pad, new),
                None => *new = ControllerInput::default(),
            }
        }

        let sample_count = platform.audio().samples_wanted();
        self.sound.prepare(sample_count);

        game::update_and_render(
            &mut self.state,
            &self.new_input,
            &mut self.buffer,
            &mut self.sound,
        );

        if sample_count > 0 {
            platform.audio().submit(self.sound.samples());
        }

        let dimension = platform.window_dimension();
        platform.display_buffer(&self.buffer, dimension);

        mem::swap(&mut self.new_input, &mut self.old_input);

        self.frame_count += 1;
        if self.frame_limit_reached() {
            info!("frame limit {} reached", self.frame_count);
            self.running = false;
        }

        Ok(())
    }

    /// Runs until quit or the frame limit. Pass a clock to pace the frames.
    pub fn run<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        mut clock: Option<&mut FrameClock>,
    ) -> Result<()> {
        while self.running {
            self.frame(platform)?;
            if let Some(clock) = clock.as_mut() {
                clock.wait();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::{DisconnectedGamepads, GamepadState, GAMEPAD_DPAD_UP},
        sound::SilentAudio,
    };

    struct FakePlatform {
        pumps: Vec<Pump>,
        pad: Option<GamepadState>,
        audio: Recorder,
        displayed: Vec<(Dimension, Dimension)>,
        window: Dimension,
    }

    #[derive(Default)]
    struct Recorder {
        submitted: usize,
    }

    impl AudioSink for Recorder {
        fn samples_wanted(&mut self) -> usize {
            800
        }

        fn submit(&mut self, samples: &[i16]) {
            self.submitted += samples.len();
        }
    }

    impl Gamepads for FakePlatform {
        fn poll(&mut self, gamepad_index: usize) -> Option<GamepadState> {
            if gamepad_index == 0 {
                self.pad
            } else {
                None
            }
        }
    }

    impl Platform for FakePlatform {
        fn process_pending_messages(&mut self, _keyboard: &mut ControllerInput) -> Pump {
            if self.pumps.is_empty() {
                Pump::default()
            } else {
                self.pumps.remove(0)
            }
        }

        fn gamepads(&mut self) -> &mut dyn Gamepads {
            self
        }

        fn audio(&mut self) -> &mut dyn AudioSink {
            &mut self.audio
        }

        fn window_dimension(&self) -> Dimension {
            self.window
        }

        fn display_buffer(&mut self, buffer: &PixelBuffer, target: Dimension) {
            self.displayed.push((buffer.dimension(), target));
        }
    }

    fn fake(pumps: Vec<Pump>) -> FakePlatform {
        FakePlatform {
            pumps,
            pad: None,
            audio: Recorder::default(),
            displayed: Vec::new(),
            window: Dimension::new(1600, 900),
        }
    }

    fn small_config() -> Config {
        Config {
            buffer_width: 64,
            buffer_height: 36,
            ..Config::default()
        }
    }

    #[test]
    fn frames_display_the_buffer_at_window_size() {
        let mut app = App::new(&small_config()).unwrap();
        let mut platform = fake(Vec::new());
        app.frame(&mut platform).unwrap();
        app.frame(&mut platform).unwrap();

        assert_eq!(app.frame_count(), 2);
        assert_eq!(
            platform.displayed,
            vec![(Dimension::new(64, 36), Dimension::new(1600, 900)); 2]
        );
        assert_eq!(platform.audio.submitted, 2 * 800 * 2);
        assert_eq!(app.state().blue_offset, 2);
    }

    #[test]
    fn quit_stops_before_drawing() {
        let mut app = App::new(&small_config()).unwrap();
        let mut platform = fake(vec![Pump {
            quit: true,
            resized: None,
        }]);
        app.run(&mut platform, None).unwrap();

        assert!(!app.is_running());
        assert_eq!(app.frame_count(), 0);
        assert!(platform.displayed.is_empty());
    }

    #[test]
    fn frame_limit_ends_the_run() {
        let config = Config {
            frame_limit: Some(3),
            ..small_config()
        };
        let mut app = App::new(&config).unwrap();
        app.run(&mut fake(Vec::new()), None).unwrap();
        assert_eq!(app.frame_count(), 3);
    }

    #[test]
    fn zero_frame_limit_draws_nothing() {
        let config = Config {
            frame_limit: Some(0),
            ..small_config()
        };
        let mut app = App::new(&config).unwrap();
        let mut platform = fake(Vec::new());
        app.run(&mut platform, None).unwrap();

        assert!(!app.is_running());
        assert_eq!(app.frame_count(), 0);
        assert!(platform.displayed.is_empty());
        assert_eq!(platform.audio.submitted, 0);
    }

    #[test]
    fn window_resize_keeps_buffer_by_default() {
        let mut app = App::new(&small_config()).unwrap();
        let mut platform = fake(vec![Pump {
            quit: false,
            resized: Some(Dimension::new(800, 600)),
        }]);
        app.frame(&mut platform).unwrap();
        assert_eq!(app.buffer().dimension(), Dimension::new(64, 36));
    }

    #[test]
    fn window_resize_reallocates_when_enabled() {
        let config = Config {
            resize_with_window: true,
            ..small_config()
        };
        let mut app = App::new(&config).unwrap();
        let mut platform = fake(vec![
            Pump {
                quit: false,
                resized: Some(Dimension::new(80, 60)),
            },
            Pump {
                quit: false,
                resized: Some(Dimension::new(0, 0)),
            },
        ]);
        app.frame(&mut platform).unwrap();
        assert_eq!(app.buffer().dimension(), Dimension::new(80, 60));
        assert_eq!(app.buffer().memory().len(), 80 * 60 * 4);

        app.frame(&mut platform).unwrap();
        assert_eq!(app.buffer().dimension(), Dimension::new(80, 60));
    }

    #[test]
    fn dpad_press_moves_green_once() {
        let mut app = App::new(&small_config()).unwrap();
        let mut platform = fake(Vec::new());
        platform.pad = Some(GamepadState {
            buttons: GAMEPAD_DPAD_UP,
            ..GamepadState::default()
        });

        app.frame(&mut platform).unwrap();
        app.frame(&mut platform).unwrap();
        assert_eq!(app.state().green_offset, 20);
    }

    #[derive(Default)]
    struct Bare {
        gamepads: DisconnectedGamepads,
        audio: SilentAudio,
    }

    impl Platform for Bare {
        fn process_pending_messages(&mut self, _keyboard: &mut ControllerInput) -> Pump {
            Pump::default()
        }

        fn gamepads(&mut self) -> &mut dyn Gamepads {
            &mut self.gamepads
        }

        fn audio(&mut self) -> &mut dyn AudioSink {
            &mut self.audio
        }

        fn window_dimension(&self) -> Dimension {
            Dimension::default()
        }

        fn display_buffer(&mut self, _buffer: &PixelBuffer, _target: Dimension) {}
    }

    #[test]
    fn missing_devices_do_not_stop_the_loop() {
        let config = Config {
            frame_limit: Some(5),
            ..small_config()
        };
        let mut app = App::new(&config).unwrap();
        app.run(&mut Bare::default(), None).unwrap();
        assert_eq!(app.frame_count(), 5);
    }

    #[test]
    fn clock_paces_frames() {
        let mut clock = FrameClock::new(0.01);
        let seconds = clock.wait();
        assert!(seconds >= 0.009);
    }

    #[test]
    fn clock_with_unusable_target_runs_unpaced() {
        for target in &[f32::INFINITY, f32::NAN, -1.0] {
            let mut clock = FrameClock::new(*target);
            assert!(clock.wait() < 1.0);
        }
    }
}
