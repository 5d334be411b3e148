//! # Pipeline Configuration
//!
//! Loaded once at startup from a TOML file. Every section and field has a
//! default, so a partial file (or no file at all) is valid.
//!
//! ```toml
//! [display]
//! width = 240
//! height = 240
//!
//! [sprites]
//! off_screen_margin = 64
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::sprite::CleanupMode;

/// Full configuration for both units.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Visible area.
    pub display: DisplayConfig,
    /// Pool and slot table sizes.
    pub memory: MemoryConfig,
    /// Sprite table and cleanup policy.
    pub sprites: SpriteConfig,
    /// Collision detection.
    pub collision: CollisionConfig,
    /// Channel capacities.
    pub channel: ChannelConfig,
    /// Sockets and heartbeat.
    pub network: NetworkConfig,
    /// Frame pacing.
    pub frame: FrameConfig,
    /// Particle system pool.
    pub particles: ParticleConfig,
}

/// Visible area in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Width of the visible field.
    pub width: i16,
    /// Height of the visible field.
    pub height: i16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { width: 320, height: 240 }
    }
}

/// Pool sizes in bytes and slot counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Texture pool capacity.
    pub texture_pool_bytes: usize,
    /// Animation pool capacity.
    pub animation_pool_bytes: usize,
    /// Number of texture slots.
    pub texture_slots: usize,
    /// Number of animation slots.
    pub animation_slots: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            texture_pool_bytes: 128 * 1024,
            animation_pool_bytes: 32 * 1024,
            texture_slots: 32,
            animation_slots: 32,
        }
    }
}

/// Sprite table and cleanup behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Rows in the sprite table (ids are `u8`, so at most 255).
    pub max_sprites: usize,
    /// Margin used by [`CleanupMode::OffScreen`].
    pub off_screen_margin: i16,
    /// Margin used by [`CleanupMode::FarOffScreen`].
    pub far_off_screen_margin: i16,
    /// Timeout assigned when a sprite is created without one.
    pub default_timeout_ms: u32,
    /// Cleanup mode assigned to sprites created by commands.
    pub default_cleanup: CleanupMode,
    /// Global switch for the per-frame cleanup sweeps.
    pub auto_cleanup: bool,
    /// Bounding box width of sprites created by commands without a texture.
    pub sprite_width: u8,
    /// Bounding box height of sprites created by commands without a texture.
    pub sprite_height: u8,
    /// Bullet bounding box width.
    pub bullet_width: u8,
    /// Bullet bounding box height.
    pub bullet_height: u8,
    /// Vertical bullet velocity per frame.
    pub bullet_velocity_y: i16,
    /// Bullets time out after this many milliseconds.
    pub bullet_timeout_ms: u32,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            max_sprites: 64,
            off_screen_margin: 0,
            far_off_screen_margin: 64,
            default_timeout_ms: 5000,
            default_cleanup: CleanupMode::OffScreen,
            auto_cleanup: true,
            sprite_width: 16,
            sprite_height: 16,
            bullet_width: 4,
            bullet_height: 4,
            bullet_velocity_y: -4,
            bullet_timeout_ms: 3000,
        }
    }
}

/// Collision detection settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Run the pairwise scan every frame.
    pub enabled: bool,
    /// Events kept per frame before new ones are dropped.
    pub event_capacity: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { enabled: true, event_capacity: 16 }
    }
}

/// Channel capacities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Ring size of the command channel (one entry stays empty).
    pub command_capacity: usize,
    /// Bound of the report channel back to the ingress side.
    pub report_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { command_capacity: 32, report_capacity: 64 }
    }
}

/// Socket configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Port inbound command packets arrive on.
    pub listen_port: u16,
    /// Port reports are sent to on the peer.
    pub response_port: u16,
    /// Local interface to bind.
    pub bind_address: String,
    /// Largest datagram accepted.
    pub max_packet_size: usize,
    /// Interval between heartbeat reports.
    pub heartbeat_interval_ms: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            response_port: 8081,
            bind_address: "0.0.0.0".to_string(),
            max_packet_size: 512,
            heartbeat_interval_ms: 1000,
        }
    }
}

/// Frame pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frames per second pulsed by the ingress side.
    pub frame_rate: u32,
    /// Textures untouched for longer than this are swept each frame.
    /// `0` turns the sweep off; textures are then freed only on request.
    pub texture_max_age_ms: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { frame_rate: 30, texture_max_age_ms: 0 }
    }
}

/// Particle system pool.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Number of systems (ids are `u8`).
    pub systems: usize,
    /// Particles each system can keep alive at once.
    pub particles_per_system: usize,
    /// Frames a particle lives.
    pub particle_life_frames: u16,
    /// Spawn speed spread; each axis starts in `-range..range`.
    pub velocity_range: f32,
    /// Downward acceleration per frame.
    pub gravity: f32,
    /// Seed for spawn velocities.
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            systems: 4,
            particles_per_system: 64,
            particle_life_frames: 30,
            velocity_range: 1.0,
            gravity: 0.1,
            seed: 0x5049_584C,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file exists but cannot be read,
    /// plus everything [`Self::from_toml_str`] can return.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
        }
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.display.width <= 0 || self.display.height <= 0 {
            return invalid("display size must be positive");
        }
        if self.memory.texture_pool_bytes == 0 || self.memory.animation_pool_bytes == 0 {
            return invalid("pool sizes must be non-zero");
        }
        let slots_ok = |n: usize| n > 0 && n <= usize::from(u16::MAX);
        if !slots_ok(self.memory.texture_slots) || !slots_ok(self.memory.animation_slots) {
            return invalid("slot counts must be in 1..=65535");
        }
        if self.sprites.max_sprites == 0 || self.sprites.max_sprites > usize::from(u8::MAX) {
            return invalid("max_sprites must be in 1..=255");
        }
        if self.sprites.far_off_screen_margin < self.sprites.off_screen_margin {
            return invalid("far_off_screen_margin must not be smaller than off_screen_margin");
        }
        if self.collision.event_capacity == 0 {
            return invalid("collision event_capacity must be non-zero");
        }
        if self.channel.command_capacity < 2 {
            return invalid("command_capacity must be at least 2");
        }
        if self.channel.report_capacity == 0 {
            return invalid("report_capacity must be non-zero");
        }
        if self.network.max_packet_size < 11 || self.network.max_packet_size > 512 {
            return invalid("max_packet_size must be in 11..=512");
        }
        if self.frame.frame_rate == 0 {
            return invalid("frame_rate must be non-zero");
        }
        if self.particles.systems == 0 || self.particles.systems > usize::from(u8::MAX) {
            return invalid("particle systems must be in 1..=255");
        }
        if self.particles.particles_per_system == 0 || self.particles.particle_life_frames == 0 {
            return invalid("particle capacity and lifetime must be non-zero");
        }
        let range = self.particles.velocity_range;
        let range_ok = range.is_finite() && range >= 0.0;
        if !range_ok || !self.particles.gravity.is_finite() {
            return invalid("particle velocity_range must be finite and non-negative, gravity finite");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channel.command_capacity, 32);
        assert_eq!(config.collision.event_capacity, 16);
        assert_eq!(config.network.listen_port, 8080);
    }

    #[test]
    fn test_partial_document() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [display]
            width = 240

            [sprites]
            off_screen_margin = 64
            far_off_screen_margin = 96
            default_cleanup = "timeout"
            "#,
        )
        .unwrap();

        assert_eq!(config.display.width, 240);
        assert_eq!(config.display.height, 240);
        assert_eq!(config.sprites.off_screen_margin, 64);
        assert_eq!(config.sprites.default_cleanup, CleanupMode::Timeout);
        assert_eq!(config.memory, MemoryConfig::default());
    }

    #[test]
    fn test_rejects_tiny_channel() {
        let err = PipelineConfig::from_toml_str("[channel]\ncommand_capacity = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_inverted_margins() {
        let err = PipelineConfig::from_toml_str(
            "[sprites]\noff_screen_margin = 80\nfar_off_screen_margin = 10\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = PipelineConfig::from_toml_str("[display\nwidth = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_sample_file_matches_defaults() {
        let sample = include_str!("../../../config/pixlink.toml");
        assert_eq!(PipelineConfig::from_toml_str(sample).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_rejects_undersized_packets() {
        let err = PipelineConfig::from_toml_str("[network]\nmax_packet_size = 8\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_texture_sweep_is_opt_in() {
        assert_eq!(FrameConfig::default().texture_max_age_ms, 0);
        let config = PipelineConfig::from_toml_str("[frame]\ntexture_max_age_ms = 2500\n").unwrap();
        assert_eq!(config.frame.texture_max_age_ms, 2500);
    }

    #[test]
    fn test_rejects_empty_particle_pool() {
        let err = PipelineConfig::from_toml_str("[particles]\nsystems = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("pixlink_missing_config_for_test.toml");
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
