//! Start-up settings. Defaults match the fixed values the window was built
//! around; `MITB_*` environment variables override them.

use crate::game::DEFAULT_TONE_HZ;
use std::{env, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is not a valid value")]
    InvalidValue { key: String, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub window_title: String,
    pub window_class_name: String,
    pub buffer_width: u32,
    pub buffer_height: u32,
    /// Reallocate the back buffer when the window's client area changes.
    /// Off by default: the buffer keeps its start-up size and is stretched.
    pub resize_with_window: bool,
    pub controller_mappings: PathBuf,
    pub samples_per_second: u32,
    pub tone_hz: u32,
    pub game_update_hz: u32,
    pub headless: bool,
    /// Stop after this many frames. `None` runs until the window closes.
    pub frame_limit: Option<u64>,
    /// Write the last displayed frame here as a PNG on exit.
    pub dump_frame: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: "Man in the boX".to_string(),
            window_class_name: "ManInTheBoxWindowClass".to_string(),
            buffer_width: 1280,
            buffer_height: 720,
            resize_with_window: false,
            controller_mappings: PathBuf::from("controller_mappings.txt"),
            samples_per_second: 48_000,
            tone_hz: DEFAULT_TONE_HZ,
            game_update_hz: 30,
            headless: false,
            frame_limit: None,
            dump_frame: None,
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_non_zero<T: FromStr + Default + PartialEq>(key: &str, value: &str) -> Result<T, ConfigError> {
    let n: T = parse(key, value)?;
    if n == T::default() {
        return Err(ConfigError::Zero {
            key: key.to_string(),
        });
    }
    Ok(n)
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup, the environment in practice.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("MITB_BUFFER_WIDTH") {
            config.buffer_width = parse_non_zero("MITB_BUFFER_WIDTH", &value)?;
        }
        if let Some(value) = lookup("MITB_BUFFER_HEIGHT") {
            config.buffer_height = parse_non_zero("MITB_BUFFER_HEIGHT", &value)?;
        }
        if let Some(value) = lookup("MITB_RESIZE_WITH_WINDOW") {
            config.resize_with_window = parse_flag("MITB_RESIZE_WITH_WINDOW", &value)?;
        }
        if let Some(value) = lookup("MITB_CONTROLLER_MAPPINGS") {
            config.controller_mappings = PathBuf::from(value);
        }
        if let Some(value) = lookup("MITB_SAMPLES_PER_SECOND") {
            config.samples_per_second = parse_non_zero("MITB_SAMPLES_PER_SECOND", &value)?;
        }
        if let Some(value) = lookup("MITB_UPDATE_HZ") {
            config.game_update_hz = parse_non_zero("MITB_UPDATE_HZ", &value)?;
        }
        if let Some(value) = lookup("MITB_HEADLESS") {
            config.headless = parse_flag("MITB_HEADLESS", &value)?;
        }
        if let Some(value) = lookup("MITB_FRAMES") {
            config.frame_limit = Some(parse_non_zero("MITB_FRAMES", &value)?);
        }
        if let Some(value) = lookup("MITB_DUMP_FRAME") {
            config.dump_frame = Some(PathBuf::from(value));
        }

        Ok(config)
    }

    /// A zero update rate counts as 1 Hz.
    pub fn target_seconds_per_frame(&self) -> f32 {
        1.0 / self.game_update_hz.max(1) as f32
    }

    /// Stereo samples produced per game update.
    pub fn samples_per_frame(&self) -> usize {
        (self.samples_per_second / self.game_update_hz.max(1)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!((config.buffer_width, config.buffer_height), (1280, 720));
        assert!(!config.resize_with_window);
        assert_eq!(config.samples_per_frame(), 1_600);
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("MITB_BUFFER_WIDTH", "320"),
            ("MITB_BUFFER_HEIGHT", " 200 "),
            ("MITB_RESIZE_WITH_WINDOW", "yes"),
            ("MITB_HEADLESS", "1"),
            ("MITB_FRAMES", "60"),
            ("MITB_DUMP_FRAME", "frame.png"),
        ]))
        .unwrap();

        assert_eq!((config.buffer_width, config.buffer_height), (320, 200));
        assert!(config.resize_with_window);
        assert!(config.headless);
        assert_eq!(config.frame_limit, Some(60));
        assert_eq!(config.dump_frame, Some(PathBuf::from("frame.png")));
    }

    #[test]
    fn bad_values_are_errors() {
        assert_eq!(
            Config::from_lookup(lookup(&[("MITB_BUFFER_WIDTH", "0")])),
            Err(ConfigError::Zero {
                key: "MITB_BUFFER_WIDTH".to_string()
            })
        );
        assert!(Config::from_lookup(lookup(&[("MITB_UPDATE_HZ", "fast")])).is_err());
        assert!(Config::from_lookup(lookup(&[("MITB_HEADLESS", "maybe")])).is_err());
    }

    #[test]
    fn zero_frames_is_rejected() {
        assert_eq!(
            Config::from_lookup(lookup(&[("MITB_FRAMES", "0")])),
            Err(ConfigError::Zero {
                key: "MITB_FRAMES".to_string()
            })
        );
    }

    #[test]
    fn zero_update_rate_is_clamped() {
        let config = Config {
            game_update_hz: 0,
            ..Config::default()
        };
        assert_eq!(config.target_seconds_per_frame(), 1.0);
        assert_eq!(config.samples_per_frame(), 48_000);
    }
}
