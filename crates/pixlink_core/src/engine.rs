//! # Graphics Engine
//!
//! Everything the render side owns, behind one type: resources, sprites,
//! particles, collisions and frame statistics. Nothing in here is shared; other units
//! see only [`EngineStats`] snapshots and the drained events.
//!
//! ## Frame
//!
//! ```text
//! drain commands -> execute()   (one call per record, in order)
//! update(now)                   integrate, animate, particles, sweep, collide
//! render(raster)                clear, draw by layer, particles, present
//! ```

use std::time::Instant;

use crate::collision::{CollisionEngine, CollisionEvent};
use crate::command::{CommandRecord, Opcode};
use crate::config::{DisplayConfig, PipelineConfig, SpriteConfig};
use crate::error::{RegistryError, RegistryResult};
use crate::memory::ResourceManager;
use crate::particles::ParticlePool;
use crate::raster::{Blit, Color, Rasterizer};
use crate::sprite::{CleanupMode, Removal, SpriteRegistry, SpriteSpec};
use crate::stats::{EngineStats, FrameTimer};

/// Fill for sprites without a texture.
const PLACEHOLDER_COLOR: Color = 0xFFFF;

/// Background fill.
const BACKGROUND_COLOR: Color = 0x0000;

/// Work done by one [`GraphicsEngine::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Sprites removed by the cleanup sweeps.
    pub removed: usize,
    /// Textures freed by the age sweep (always 0 while it is disabled).
    pub textures_swept: usize,
    /// Overlapping pairs found (recorded or dropped).
    pub collisions: usize,
    /// Particles that reached the end of their life.
    pub particles_expired: usize,
}

/// Render-side engine.
pub struct GraphicsEngine {
    sprite_config: SpriteConfig,
    field: DisplayConfig,
    texture_max_age_ms: u32,
    resources: ResourceManager,
    sprites: SpriteRegistry,
    particles: ParticlePool,
    collisions: CollisionEngine,
    timer: FrameTimer,
    frame_started: Option<Instant>,
    last_update_ms: u32,
    draw_order: Vec<u8>,
    frame_count: u64,
    commands_executed: u64,
    commands_failed: u64,
}

impl GraphicsEngine {
    /// Builds every subsystem from `config`.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        let sprites = SpriteRegistry::new(&config.sprites, config.display);
        let draw_order = Vec::with_capacity(sprites.capacity());
        tracing::info!(
            "Graphics engine: {}x{}, {} sprites, pools {}B/{}B",
            config.display.width,
            config.display.height,
            sprites.capacity(),
            config.memory.texture_pool_bytes,
            config.memory.animation_pool_bytes,
        );
        Self {
            sprite_config: config.sprites,
            field: config.display,
            texture_max_age_ms: config.frame.texture_max_age_ms,
            resources: ResourceManager::new(&config.memory),
            sprites,
            particles: ParticlePool::new(&config.particles),
            collisions: CollisionEngine::new(config.collision.event_capacity, config.collision.enabled),
            timer: FrameTimer::new(config.frame.frame_rate),
            frame_started: None,
            last_update_ms: 0,
            draw_order,
            frame_count: 0,
            commands_executed: 0,
            commands_failed: 0,
        }
    }

    /// Texture and animation storage.
    #[inline]
    #[must_use]
    pub const fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// Texture and animation storage, mutably (for loading assets).
    #[inline]
    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    /// The sprite table.
    #[inline]
    #[must_use]
    pub const fn sprites(&self) -> &SpriteRegistry {
        &self.sprites
    }

    /// The sprite table, mutably.
    #[inline]
    pub fn sprites_mut(&mut self) -> &mut SpriteRegistry {
        &mut self.sprites
    }

    /// The particle system pool.
    #[inline]
    #[must_use]
    pub const fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    /// The particle system pool, mutably (for creating and emitting).
    #[inline]
    pub fn particles_mut(&mut self) -> &mut ParticlePool {
        &mut self.particles
    }

    /// The collision engine.
    #[inline]
    #[must_use]
    pub const fn collisions(&self) -> &CollisionEngine {
        &self.collisions
    }

    /// Frames rendered so far.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// [`RegistryError::TableFull`] when a sprite cannot be created and
    /// [`RegistryError::UnknownSprite`] when a command names an id that is
    /// out of range or not live.
    pub fn execute(&mut self, command: &CommandRecord, now: u32) -> RegistryResult<()> {
        let result = match command.opcode {
            Opcode::LoadSprite => self.load_sprite(command, now),
            Opcode::MoveSprite => {
                if self.sprites.set_position(command.sprite_id, command.x, command.y) {
                    Ok(())
                } else {
                    Err(RegistryError::UnknownSprite(command.sprite_id))
                }
            }
            Opcode::ClearScreen => {
                let removed = self.sprites.destroy_all();
                self.collisions.clear();
                tracing::debug!("Screen cleared, {removed} sprites destroyed");
                Ok(())
            }
            Opcode::FireBullet => self.fire_bullet(command, now),
        };

        match result {
            Ok(()) => self.commands_executed += 1,
            Err(err) => {
                self.commands_failed += 1;
                tracing::debug!("Command {:?} for sprite {} failed: {err}", command.opcode, command.sprite_id);
            }
        }
        result
    }

    fn load_sprite(&mut self, command: &CommandRecord, now: u32) -> RegistryResult<()> {
        let id = command.sprite_id;
        if self.sprites.contains(id) {
            self.sprites.set_position(id, command.x, command.y);
        } else {
            let spec = SpriteSpec::new(
                command.x,
                command.y,
                self.sprite_config.sprite_width,
                self.sprite_config.sprite_height,
            )
            .with_cleanup(self.sprite_config.default_cleanup, self.sprite_config.default_timeout_ms);
            self.sprites.create_at(id, spec, now)?;
        }

        let slot = u16::from(command.frame);
        if let Some(texture) = self.resources.texture_at(slot) {
            self.sprites.set_texture(id, texture, &self.resources);
        }
        if let Some(animation) = self.resources.animation_at(slot) {
            self.sprites.set_animation(id, animation, &self.resources, now);
        }
        Ok(())
    }

    fn fire_bullet(&mut self, command: &CommandRecord, now: u32) -> RegistryResult<()> {
        let config = &self.sprite_config;
        let spec = SpriteSpec::new(command.x, command.y, config.bullet_width, config.bullet_height)
            .with_cleanup(CleanupMode::Timeout, config.bullet_timeout_ms);
        let velocity = config.bullet_velocity_y;

        let id = self.sprites.create(spec, now)?;
        self.sprites.set_velocity(id, 0, velocity);
        self.sprites.set_collision(id, true);
        tracing::trace!("Bullet {id} fired from ({}, {})", command.x, command.y);
        Ok(())
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Advances the simulation one frame. Events from the previous frame are
    /// discarded first, so drain them before calling this.
    pub fn update(&mut self, now: u32) -> FrameSummary {
        self.frame_started = Some(self.timer.begin());
        self.last_update_ms = now;
        self.collisions.clear();

        self.sprites.integrate();
        self.sprites.advance_animations(now, &self.resources);
        for handle in self.sprites.iter().filter_map(|s| s.texture) {
            self.resources.texture_touch(handle, now);
        }

        let particles_expired = self.particles.update(now);

        let removed = self.sprites.run_auto_cleanup(now);
        let textures_swept = match self.texture_max_age_ms {
            0 => 0,
            max_age => self.resources.texture_cleanup_unused(max_age, now),
        };
        let collisions = self.collisions.scan(&self.sprites, now);

        FrameSummary { removed, textures_swept, collisions, particles_expired }
    }

    /// Draws every renderable sprite, lowest layer first, then the particles
    /// on top, then presents.
    pub fn render(&mut self, raster: &mut dyn Rasterizer) {
        raster.clear(BACKGROUND_COLOR);

        self.draw_order.clear();
        self.draw_order.extend(self.sprites.renderable(&self.resources).map(|s| s.id));
        let sprites = &self.sprites;
        self.draw_order.sort_by_key(|&id| sprites.get(id).map_or(0, |s| s.layer));

        let camera = sprites.camera();
        for &id in &self.draw_order {
            let Some(sprite) = sprites.get(id) else {
                continue;
            };
            let x = sprite.x.saturating_sub(camera.x);
            let y = sprite.y.saturating_sub(camera.y);

            match sprite.texture {
                None => raster.draw_rect(x, y, sprite.width, sprite.height, PLACEHOLDER_COLOR),
                Some(handle) => match self.resources.texture_frame(handle, sprite.frame) {
                    Ok(pixels) => raster.blit(&Blit {
                        x,
                        y,
                        width: sprite.width,
                        height: sprite.height,
                        pixels,
                        blend: sprite.blend,
                        alpha: sprite.alpha,
                    }),
                    Err(err) => tracing::trace!("Sprite {id} skipped: {err}"),
                },
            }
        }

        self.particles.render(raster, camera, self.field);
        raster.present();
        self.frame_count += 1;
        if let Some(start) = self.frame_started.take() {
            self.timer.end(start, self.last_update_ms);
        }
    }

    /// Collision events recorded by the last update.
    pub fn drain_collisions(&mut self) -> std::vec::Drain<'_, CollisionEvent> {
        self.collisions.drain_events()
    }

    /// Sprites swept since the last call.
    pub fn drain_removals(&mut self) -> std::vec::Drain<'_, Removal> {
        self.sprites.drain_removals()
    }

    /// Snapshot of every counter.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let textures = self.resources.texture_pool();
        let animations = self.resources.animation_pool();
        EngineStats {
            active_sprites: self.sprites.active_count(),
            destroyed_total: self.sprites.destroyed_total(),
            cleaned_up_total: self.sprites.cleaned_up_total(),
            textures_live: self.resources.texture_count(),
            animations_live: self.resources.animation_count(),
            texture_pool_used: textures.used(),
            texture_pool_free: textures.free(),
            animation_pool_used: animations.used(),
            animation_pool_free: animations.free(),
            allocations: self.resources.allocations(),
            allocation_failures: self.resources.allocation_failures(),
            particle_systems: self.particles.active_systems(),
            particles_live: self.particles.live_particles(),
            collision_events_dropped: self.collisions.dropped(),
            commands_executed: self.commands_executed,
            commands_failed: self.commands_failed,
            frame_count: self.frame_count,
            fps: self.timer.fps(),
            avg_frame_us: self.timer.avg_frame_us(),
            max_frame_us: self.timer.max_frame_us(),
            late_frames: self.timer.late_frames(),
        }
    }
}
