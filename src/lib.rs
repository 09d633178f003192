//! Everything that does not talk to the OS directly: the back buffer, the
//! gradient, input and sound processing, and the frame loop the platform
//! layers plug into.

#[macro_use]
extern crate log;

pub mod app;
pub mod buffer;
pub mod common;
pub mod config;
pub mod error;
pub mod game;
pub mod headless;
pub mod input;
pub mod mappings;
pub mod sound;

pub use app::{App, FrameClock, Platform, Pump};
pub use buffer::{BufferError, Dimension, PixelBuffer};
pub use config::Config;
pub use error::{Error, Result};
