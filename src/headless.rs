//! A platform with no window: runs the frame loop against an in-memory
//! surface. Used where no windowing backend is built in, and by tests.

use crate::{
    app::{App, Platform, Pump},
    buffer::{Dimension, PixelBuffer, BYTES_PER_PIXEL},
    common::ControllerInput,
    config::Config,
    error::{Error, Result},
    input::{apply_key, DisconnectedGamepads, Gamepads, Key},
    sound::{AudioSink, SilentAudio},
};
use image::{ImageBuffer, Rgba};
use std::path::Path;

/// Frames to run when nothing else says when to stop.
pub const DEFAULT_FRAMES: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessEvent {
    Key { key: Key, is_down: bool },
    Resize(Dimension),
    Quit,
}

pub struct HeadlessPlatform {
    window: Dimension,
    frame: u64,
    script: Vec<(u64, HeadlessEvent)>,
    gamepads: Box<dyn Gamepads>,
    audio: Box<dyn AudioSink>,
    surface: Vec<u8>,
    surface_dimension: Dimension,
    displayed_frames: u64,
}

impl HeadlessPlatform {
    pub fn new(window: Dimension) -> Self {
        Self {
            window,
            frame: 0,
            script: Vec::new(),
            gamepads: Box::new(DisconnectedGamepads),
            audio: Box::new(SilentAudio),
            surface: Vec::new(),
            surface_dimension: Dimension::default(),
            displayed_frames: 0,
        }
    }

    /// Queues `event` to be delivered at the start of frame `frame`.
    pub fn at_frame(mut self, frame: u64, event: HeadlessEvent) -> Self {
        self.script.push((frame, event));
        self
    }

    pub fn with_gamepads(mut self, gamepads: Box<dyn Gamepads>) -> Self {
        self.gamepads = gamepads;
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    pub fn displayed_frames(&self) -> u64 {
        self.displayed_frames
    }

    /// The last displayed frame, stretched to the window and top row first.
    pub fn surface(&self) -> (&[u8], Dimension) {
        (&self.surface, self.surface_dimension)
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let Dimension { width, height } = self.surface_dimension;
        if self.surface.is_empty() {
            return Err(Error::Platform("no frame has been displayed yet".to_string()));
        }

        let mut rgba = Vec::with_capacity(self.surface.len());
        for pixel in self.surface.chunks_exact(BYTES_PER_PIXEL) {
            rgba.extend_from_slice(&[pixel[2], pixel[1], pixel[0], 0xFF]);
        }

        let image: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, rgba)
            .ok_or_else(|| Error::Platform("captured frame does not match its size".to_string()))?;
        image.save(path)?;

        info!("saved {}x{} frame to {}", width, height, path.display());
        Ok(())
    }
}

impl Platform for HeadlessPlatform {
    fn process_pending_messages(&mut self, keyboard: &mut ControllerInput) -> Pump {
        let mut pump = Pump::default();
        let frame = self.frame;
        self.frame += 1;

        for (_, event) in self.script.iter().filter(|(at, _)| *at == frame) {
            match *event {
                HeadlessEvent::Key { key, is_down } => apply_key(keyboard, key, is_down),
                HeadlessEvent::Resize(dimension) => {
                    self.window = dimension;
                    pump.resized = Some(dimension);
                }
                HeadlessEvent::Quit => pump.quit = true,
            }
        }

        pump
    }

    fn gamepads(&mut self) -> &mut dyn Gamepads {
        self.gamepads.as_mut()
    }

    fn audio(&mut self) -> &mut dyn AudioSink {
        self.audio.as_mut()
    }

    fn window_dimension(&self) -> Dimension {
        self.window
    }

    fn display_buffer(&mut self, buffer: &PixelBuffer, target: Dimension) {
        self.displayed_frames += 1;

        // a minimized window shows nothing; keep the last visible frame
        let surface = buffer.stretch_to(target);
        if surface.is_empty() {
            trace!("nothing visible at {}x{}", target.width, target.height);
            return;
        }
        self.surface = surface;
        self.surface_dimension = target;
    }
}

pub fn main(config: &Config) -> Result<()> {
    let config = Config {
        frame_limit: Some(config.frame_limit.unwrap_or(DEFAULT_FRAMES)),
        ..config.clone()
    };

    let mut app = App::new(&config)?;
    let mut platform = HeadlessPlatform::new(app.buffer().dimension());

    info!(
        "running {} headless frames at {}x{}",
        config.frame_limit.unwrap_or_default(),
        config.buffer_width,
        config.buffer_height
    );
    app.run(&mut platform, None)?;

    if let Some(path) = &config.dump_frame {
        platform.save_png(path)?;
    }

    Ok(())
}
