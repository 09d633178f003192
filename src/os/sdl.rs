//! SDL2 window, streaming-texture blit, game controller and queued audio.

use game::{
    app::{App, FrameClock, Platform, Pump},
    buffer::{Dimension, PixelBuffer},
    common::ControllerInput,
    config::Config,
    error::{Error, Result},
    input::*,
    mappings::load_controller_mappings,
    sound::{AudioSink, SilentAudio},
};
use sdl2::{
    audio::{AudioQueue, AudioSpecDesired},
    controller::{Axis, Button, GameController, MappingStatus},
    event::{Event, WindowEvent},
    keyboard::{Keycode, Mod},
    pixels::PixelFormatEnum,
    rect::Rect,
    render::{Texture, TextureCreator, WindowCanvas},
    video::WindowContext,
    EventPump, GameControllerSubsystem,
};

fn platform_error<E: ToString>(error: E) -> Error {
    Error::Platform(error.to_string())
}

fn translate_key(keycode: Keycode) -> Option<Key> {
    let key = match keycode {
        Keycode::W => Key::W,
        Keycode::A => Key::A,
        Keycode::S => Key::S,
        Keycode::D => Key::D,
        Keycode::Q => Key::Q,
        Keycode::E => Key::E,
        Keycode::Up => Key::Up,
        Keycode::Down => Key::Down,
        Keycode::Left => Key::Left,
        Keycode::Right => Key::Right,
        Keycode::Escape => Key::Escape,
        Keycode::Space => Key::Space,
        Keycode::F4 => Key::F4,
        _ => return None,
    };
    Some(key)
}

const BUTTONS: [(Button, u16); 12] = [
    (Button::DPadUp, GAMEPAD_DPAD_UP),
    (Button::DPadDown, GAMEPAD_DPAD_DOWN),
    (Button::DPadLeft, GAMEPAD_DPAD_LEFT),
    (Button::DPadRight, GAMEPAD_DPAD_RIGHT),
    (Button::Start, GAMEPAD_START),
    (Button::Back, GAMEPAD_BACK),
    (Button::LeftShoulder, GAMEPAD_LEFT_SHOULDER),
    (Button::RightShoulder, GAMEPAD_RIGHT_SHOULDER),
    (Button::A, GAMEPAD_A),
    (Button::B, GAMEPAD_B),
    (Button::X, GAMEPAD_X),
    (Button::Y, GAMEPAD_Y),
];

/// The first attached game controller, reported in slot 0.
struct SdlGamepads {
    subsystem: GameControllerSubsystem,
    controller: Option<GameController>,
}

impl SdlGamepads {
    fn new(subsystem: GameControllerSubsystem, config: &Config) -> Self {
        for mapping in load_controller_mappings(&config.controller_mappings) {
            match subsystem.add_mapping(&mapping.line) {
                Ok(MappingStatus::Added) => debug!("added mapping for {}", mapping.name),
                Ok(MappingStatus::Updated) => debug!("updated mapping for {}", mapping.name),
                Err(e) => warn!("mapping for {} rejected: {}", mapping.name, e),
            }
        }

        let mut gamepads = Self {
            subsystem,
            controller: None,
        };
        gamepads.open_first();
        gamepads
    }

    fn open_first(&mut self) {
        let count = match self.subsystem.num_joysticks() {
            Ok(count) => count,
            Err(e) => {
                warn!("couldn't count joysticks: {}", e);
                return;
            }
        };
        if let Some(index) = (0..count).find(|&i| self.subsystem.is_game_controller(i)) {
            self.open(index);
        }
    }

    fn open(&mut self, joystick_index: u32) {
        if self.controller.is_some() {
            return;
        }
        match self.subsystem.open(joystick_index) {
            Ok(controller) => {
                info!("opened controller {}", controller.name());
                self.controller = Some(controller);
            }
            Err(e) => warn!("couldn't open controller {}: {}", joystick_index, e),
        }
    }

    fn close(&mut self, instance_id: u32) {
        let is_ours = self
            .controller
            .as_ref()
            .map_or(false, |controller| controller.instance_id() == instance_id);
        if is_ours {
            info!("controller removed");
            self.controller = None;
            self.open_first();
        }
    }
}

impl Gamepads for SdlGamepads {
    fn poll(&mut self, gamepad_index: usize) -> Option<GamepadState> {
        if gamepad_index != 0 {
            return None;
        }
        let controller = self.controller.as_ref()?;

        let buttons = BUTTONS
            .iter()
            .filter(|(button, _)| controller.button(*button))
            .fold(0, |buttons, (_, bit)| buttons | bit);

        Some(GamepadState {
            buttons,
            stick_x: controller.axis(Axis::LeftX),
            // SDL's y axis points down
            stick_y: controller.axis(Axis::LeftY).saturating_neg(),
        })
    }
}

/// Keeps about `target_samples` stereo samples queued ahead of the device.
struct SdlAudio {
    queue: AudioQueue<i16>,
    target_samples: u32,
}

const BYTES_PER_STEREO_SAMPLE: u32 = 4;

impl AudioSink for SdlAudio {
    fn samples_wanted(&mut self) -> usize {
        let queued = self.queue.size() / BYTES_PER_STEREO_SAMPLE;
        self.target_samples.saturating_sub(queued) as usize
    }

    fn submit(&mut self, samples: &[i16]) {
        if let Err(e) = self.queue.queue_audio(samples) {
            warn!("couldn't queue audio: {}", e);
        }
    }
}

fn open_audio(sdl_context: &sdl2::Sdl, config: &Config) -> Box<dyn AudioSink> {
    let opened = sdl_context.audio().and_then(|audio| {
        let desired = AudioSpecDesired {
            freq: Some(config.samples_per_second as i32),
            channels: Some(2),
            samples: None,
        };
        audio.open_queue::<i16, _>(None, &desired)
    });

    match opened {
        Ok(queue) => {
            queue.resume();
            Box::new(SdlAudio {
                queue,
                target_samples: config.samples_per_frame() as u32 * 2,
            })
        }
        Err(e) => {
            warn!("couldn't open audio, running without sound: {}", e);
            Box::new(SilentAudio)
        }
    }
}

struct SdlPlatform<'a> {
    canvas: WindowCanvas,
    texture_creator: &'a TextureCreator<WindowContext>,
    texture: Option<(Texture<'a>, Dimension)>,
    event_pump: EventPump,
    gamepads: SdlGamepads,
    audio: Box<dyn AudioSink>,
}

impl<'a> SdlPlatform<'a> {
    fn texture_for(&mut self, dimension: Dimension) -> Option<&mut Texture<'a>> {
        let stale = self
            .texture
            .as_ref()
            .map_or(true, |(_, size)| *size != dimension);
        if stale {
            match self.texture_creator.create_texture_streaming(
                PixelFormatEnum::RGB888,
                dimension.width,
                dimension.height,
            ) {
                Ok(texture) => self.texture = Some((texture, dimension)),
                Err(e) => {
                    error!("couldn't create {}x{} texture: {}", dimension.width, dimension.height, e);
                    self.texture = None;
                }
            }
        }
        self.texture.as_mut().map(|(texture, _)| texture)
    }
}

impl<'a> Platform for SdlPlatform<'a> {
    fn process_pending_messages(&mut self, keyboard: &mut ControllerInput) -> Pump {
        let mut pump = Pump::default();

        // collected first: handling device events needs `self` again
        let events: Vec<Event> = self.event_pump.poll_iter().collect();
        for event in events {
            match event {
                Event::Quit { .. } => pump.quit = true,
                Event::KeyDown {
                    keycode: Some(keycode),
                    keymod,
                    repeat,
                    ..
                } => {
                    if keycode == Keycode::F4 && keymod.intersects(Mod::LALTMOD | Mod::RALTMOD) {
                        info!("alt+f4");
                        pump.quit = true;
                    }
                    if !repeat {
                        if let Some(key) = translate_key(keycode) {
                            apply_key(keyboard, key, true);
                        }
                    }
                }
                Event::KeyUp {
                    keycode: Some(keycode),
                    repeat: false,
                    ..
                } => {
                    if let Some(key) = translate_key(keycode) {
                        apply_key(keyboard, key, false);
                    }
                }
                Event::Window {
                    win_event: WindowEvent::SizeChanged(width, height),
                    ..
                } => {
                    debug!("window resized to {}x{}", width, height);
                    pump.resized = Some(Dimension::new(width.max(0) as u32, height.max(0) as u32));
                }
                Event::ControllerDeviceAdded { which, .. } => self.gamepads.open(which),
                Event::ControllerDeviceRemoved { which, .. } => self.gamepads.close(which),
                _ => {}
            }
        }

        pump
    }

    fn gamepads(&mut self) -> &mut dyn Gamepads {
        &mut self.gamepads
    }

    fn audio(&mut self) -> &mut dyn AudioSink {
        self.audio.as_mut()
    }

    fn window_dimension(&self) -> Dimension {
        let (width, height) = self.canvas.window().size();
        Dimension::new(width, height)
    }

    fn display_buffer(&mut self, buffer: &PixelBuffer, target: Dimension) {
        if buffer.is_empty() || target.is_empty() {
            return;
        }

        let texture = match self.texture_for(buffer.dimension()) {
            Some(texture) => texture,
            None => return,
        };
        if let Err(e) = texture.update(None, buffer.memory(), buffer.pitch()) {
            error!("couldn't upload the back buffer: {}", e);
            return;
        }

        // `texture_for` borrowed `self` mutably; go through the field again
        if let Some((texture, _)) = &self.texture {
            let destination = Rect::new(0, 0, target.width, target.height);
            if let Err(e) = self.canvas.copy(texture, None, destination) {
                error!("couldn't copy the back buffer: {}", e);
            }
        }
        self.canvas.present();
    }
}

pub fn main(config: &Config) -> Result<()> {
    let mut app = App::new(config)?;

    let sdl_context = sdl2::init().map_err(platform_error)?;
    let video_subsystem = sdl_context.video().map_err(platform_error)?;
    let controller_subsystem = sdl_context.game_controller().map_err(platform_error)?;

    let window = video_subsystem
        .window(
            &config.window_title,
            config.buffer_width,
            config.buffer_height,
        )
        .position_centered()
        .resizable()
        .build()
        .map_err(platform_error)?;
    let canvas = window.into_canvas().build().map_err(platform_error)?;
    let texture_creator = canvas.texture_creator();

    let mut platform = SdlPlatform {
        canvas,
        texture_creator: &texture_creator,
        texture: None,
        event_pump: sdl_context.event_pump().map_err(platform_error)?,
        gamepads: SdlGamepads::new(controller_subsystem, config),
        audio: open_audio(&sdl_context, config),
    };

    let mut clock = FrameClock::new(config.target_seconds_per_frame());
    app.run(&mut platform, Some(&mut clock))
}
