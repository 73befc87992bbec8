use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::surface::Rgb;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    File(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("config validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Performance profile. Faster hosts launch more often and with bigger bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    #[default]
    Standard,
    Low,
}

impl Tier {
    /// (generation rate per normalized frame, particles per firework)
    pub fn profile(self) -> (f32, usize) {
        match self {
            Tier::High => (0.05, 60),
            Tier::Standard => (0.02, 50),
            Tier::Low => (0.01, 50),
        }
    }
}

impl FromStr for Tier {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Tier::High),
            "standard" => Ok(Tier::Standard),
            "low" => Ok(Tier::Low),
            other => Err(ConfigError::Parse(format!("unknown tier: {other}"))),
        }
    }
}

// Lengths are in half-block pixels, rates are per 60 fps frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub fade_rate: f32,
    pub shrink_rate: f32,
    /// Random part of the initial particle radius.
    pub particle_size: f32,
    pub min_particle_size: f32,
    pub max_speed: f32,
    pub flash_duration_ms: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.007,
            fade_rate: 0.002,
            shrink_rate: 0.013,
            particle_size: 1.0,
            min_particle_size: 0.7,
            max_speed: 0.85,
            flash_duration_ms: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Opacity of the per-frame overlay. Lower means longer trails.
    pub trail_alpha: f32,
    pub glow_blur: f32,
    pub glow_alpha: f32,
    #[serde(deserialize_with = "de_hex_color")]
    pub background: Rgb,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            trail_alpha: 0.1,
            glow_blur: 2.0,
            glow_alpha: 0.5,
            background: Rgb::BLACK,
        }
    }
}

fn de_hex_color<'de, D>(deserializer: D) -> Result<Rgb, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let hex = String::deserialize(deserializer)?;
    Rgb::from_hex(&hex)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color: {hex}")))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tier: Tier,
    /// Overrides the tier's generation rate.
    pub generation_rate: Option<f32>,
    /// Overrides the tier's particle count.
    pub particle_count: Option<usize>,
    pub target_fps: u32,
    pub max_frame_ms: f64,
    pub seed: Option<u64>,
    pub clicking_enabled: bool,
    pub show_fps: bool,
    pub log_file: Option<PathBuf>,
    pub physics: PhysicsConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tier: Tier::default(),
            generation_rate: None,
            particle_count: None,
            target_fps: 60,
            max_frame_ms: 100.0,
            seed: None,
            clicking_enabled: false,
            show_fps: false,
            log_file: None,
            physics: PhysicsConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies `FIREWORKS_*` overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("FIREWORKS_TIER") {
            self.tier = val.parse()?;
        }
        if let Some(val) = lookup("FIREWORKS_SEED") {
            let seed = val
                .parse()
                .map_err(|_| ConfigError::Parse(format!("invalid FIREWORKS_SEED: {val}")))?;
            self.seed = Some(seed);
        }
        if let Some(val) = lookup("FIREWORKS_TARGET_FPS") {
            self.target_fps = val
                .parse()
                .map_err(|_| ConfigError::Parse(format!("invalid FIREWORKS_TARGET_FPS: {val}")))?;
        }
        Ok(())
    }

    pub fn generation_rate(&self) -> f32 {
        self.generation_rate.unwrap_or(self.tier.profile().0)
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count.unwrap_or(self.tier.profile().1)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let p = &self.physics;
        let r = &self.render;

        let non_negative = [
            ("generation_rate", self.generation_rate()),
            ("physics.gravity", p.gravity),
            ("physics.fade_rate", p.fade_rate),
            ("physics.shrink_rate", p.shrink_rate),
            ("physics.particle_size", p.particle_size),
            ("render.glow_blur", r.glow_blur),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be >= 0, got {value}"
                )));
            }
        }

        if p.min_particle_size.is_nan() || p.min_particle_size <= 0.0 {
            return Err(ConfigError::Validation(
                "physics.min_particle_size must be > 0".into(),
            ));
        }
        if p.max_speed.is_nan() || p.max_speed <= 0.0 {
            return Err(ConfigError::Validation("physics.max_speed must be > 0".into()));
        }
        if p.flash_duration_ms.is_nan() || p.flash_duration_ms < 0.0 {
            return Err(ConfigError::Validation(
                "physics.flash_duration_ms must be >= 0".into(),
            ));
        }
        let alphas = [
            ("render.trail_alpha", r.trail_alpha),
            ("render.glow_alpha", r.glow_alpha),
        ];
        for (name, value) in alphas {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.target_fps == 0 {
            return Err(ConfigError::Validation("target_fps must be > 0".into()));
        }
        if self.max_frame_ms.is_nan() || self.max_frame_ms <= 0.0 {
            return Err(ConfigError::Validation("max_frame_ms must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.generation_rate(), 0.02);
        assert_eq!(config.particle_count(), 50);
        assert!(!config.clicking_enabled);
    }

    #[test]
    fn tier_profiles() {
        assert_eq!(Tier::High.profile(), (0.05, 60));
        assert_eq!(Tier::Standard.profile(), (0.02, 50));
        assert_eq!(Tier::Low.profile(), (0.01, 50));
        assert_eq!("HIGH".parse::<Tier>().unwrap(), Tier::High);
        assert!("turbo".parse::<Tier>().is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            tier = "high"
            particle_count = 80
            show_fps = true

            [physics]
            gravity = 0.02

            [render]
            background = "1a1b26"
            "#,
        )
        .unwrap();

        assert_eq!(config.tier, Tier::High);
        assert_eq!(config.generation_rate(), 0.05);
        assert_eq!(config.particle_count(), 80);
        assert!(config.show_fps);
        assert_eq!(config.physics.gravity, 0.02);
        assert_eq!(config.physics.fade_rate, PhysicsConfig::default().fade_rate);
        assert_eq!(config.render.background, Rgb(0x1a, 0x1b, 0x26));
        assert_eq!(config.render.trail_alpha, 0.1);
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            Config::from_toml_str("tier = \"turbo\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[render]\nbackground = \"nope\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let result = Config::from_toml_file("/nonexistent/fireworks.toml");
        assert!(matches!(result, Err(ConfigError::File(_))));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FIREWORKS_TIER", "low"),
            ("FIREWORKS_SEED", "42"),
            ("FIREWORKS_TARGET_FPS", "30"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.tier, Tier::Low);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.target_fps, 30);

        let result = config.apply_env_overrides(|key| {
            (key == "FIREWORKS_SEED").then(|| "forty-two".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.physics.shrink_rate = -0.1;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.render.trail_alpha = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.physics.max_speed = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation_rate = Some(f32::NAN);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.target_fps = 0;
        assert!(config.validate().is_err());
    }
}
