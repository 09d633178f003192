use game::{headless, Config, Result};

#[cfg(feature = "sdl")]
mod sdl;
#[cfg(all(windows, not(feature = "sdl")))]
mod safety;
#[cfg(all(windows, not(feature = "sdl")))]
mod win32;

pub fn main(config: &Config) -> Result<()> {
    if config.headless {
        return headless::main(config);
    }
    windowed(config)
}

#[cfg(feature = "sdl")]
fn windowed(config: &Config) -> Result<()> {
    sdl::main(config)
}

#[cfg(all(windows, not(feature = "sdl")))]
fn windowed(config: &Config) -> Result<()> {
    win32::main(config)
}

#[cfg(not(any(windows, feature = "sdl")))]
fn windowed(config: &Config) -> Result<()> {
    warn!("no window backend in this build, running headless");
    headless::main(config)
}
