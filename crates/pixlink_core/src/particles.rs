//! # Particle Systems
//!
//! A fixed pool of emitters, each with its own fixed block of particle
//! slots. Nothing here allocates after startup.
//!
//! ## Per frame
//!
//! ```text
//! timed spawn   one particle every `spawn_rate_ms` (0 = bursts only)
//! integrate     vy += gravity; x += vx; y += vy
//! age           expire at `particle_life_frames`, fade linearly before that
//! ```
//!
//! Spawn velocities come from a seeded [`StdRng`], so a run is repeatable
//! for a given configuration.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{DisplayConfig, ParticleConfig};
use crate::error::{ParticleError, ParticleResult};
use crate::raster::{Color, Rasterizer};
use crate::sprite::Camera;

/// One live particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// World X.
    pub x: f32,
    /// World Y.
    pub y: f32,
    /// Horizontal velocity per frame.
    pub vx: f32,
    /// Vertical velocity per frame.
    pub vy: f32,
    /// Frames lived so far.
    pub age: u16,
    /// Frame at which the particle expires.
    pub max_life: u16,
}

impl Particle {
    /// Opacity: 255 at birth, falling linearly towards 0 at expiry.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        let left = u32::from(self.max_life.saturating_sub(self.age));
        (255 * left / u32::from(self.max_life.max(1))) as u8
    }
}

/// One emitter and its particle slots.
pub struct ParticleSystem {
    particles: Box<[Option<Particle>]>,
    origin_x: f32,
    origin_y: f32,
    color: Color,
    spawn_rate_ms: u16,
    last_spawn: u32,
}

impl ParticleSystem {
    /// Live particles.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_some()).count()
    }

    /// Live particles in slot order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().flatten()
    }

    /// Spawn point.
    #[must_use]
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_y)
    }

    /// Base color of every particle.
    #[inline]
    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Fills the first free slot. False when every slot is live.
    fn spawn(&mut self, rng: &mut StdRng, velocity_range: f32, life: u16) -> bool {
        let Some(slot) = self.particles.iter_mut().find(|p| p.is_none()) else {
            return false;
        };
        let mut spread = || (rng.gen::<f32>() * 2.0 - 1.0) * velocity_range;
        *slot = Some(Particle {
            x: self.origin_x,
            y: self.origin_y,
            vx: spread(),
            vy: spread(),
            age: 0,
            max_life: life,
        });
        true
    }

    /// Moves and ages every particle. Returns how many expired.
    fn step(&mut self, gravity: f32) -> usize {
        let mut expired = 0;
        for slot in self.particles.iter_mut() {
            let Some(particle) = slot.as_mut() else {
                continue;
            };
            particle.vy += gravity;
            particle.x += particle.vx;
            particle.y += particle.vy;
            particle.age = particle.age.saturating_add(1);
            if particle.age >= particle.max_life {
                *slot = None;
                expired += 1;
            }
        }
        expired
    }
}

/// Fixed-capacity pool of particle systems.
pub struct ParticlePool {
    systems: Box<[Option<ParticleSystem>]>,
    particles_per_system: usize,
    life_frames: u16,
    velocity_range: f32,
    gravity: f32,
    rng: StdRng,
    spawned_total: u64,
    expired_total: u64,
}

impl ParticlePool {
    /// Empty pool sized by `config`. Ids are `u8`, so at most 256 systems.
    #[must_use]
    pub fn new(config: &ParticleConfig) -> Self {
        let capacity = config.systems.min(usize::from(u8::MAX) + 1);
        Self {
            systems: (0..capacity).map(|_| None).collect(),
            particles_per_system: config.particles_per_system,
            life_frames: config.particle_life_frames.max(1),
            velocity_range: config.velocity_range,
            gravity: config.gravity,
            rng: StdRng::seed_from_u64(config.seed),
            spawned_total: 0,
            expired_total: 0,
        }
    }

    /// Number of system slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.systems.len()
    }

    /// Systems in use.
    #[must_use]
    pub fn active_systems(&self) -> usize {
        self.systems.iter().filter(|s| s.is_some()).count()
    }

    /// Live particles across every system.
    #[must_use]
    pub fn live_particles(&self) -> usize {
        self.systems.iter().flatten().map(ParticleSystem::live_count).sum()
    }

    /// Particles spawned so far.
    #[inline]
    #[must_use]
    pub const fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    /// Particles that reached the end of their life.
    #[inline]
    #[must_use]
    pub const fn expired_total(&self) -> u64 {
        self.expired_total
    }

    /// A system in use.
    #[must_use]
    pub fn get(&self, id: u8) -> Option<&ParticleSystem> {
        self.systems.get(usize::from(id)).and_then(Option::as_ref)
    }

    /// Claims the first free system. A `spawn_rate_ms` of 0 disables timed
    /// spawning; the system then only produces particles through
    /// [`Self::emit`].
    ///
    /// # Errors
    ///
    /// [`ParticleError::PoolFull`] when every system is in use.
    pub fn create(
        &mut self,
        x: i16,
        y: i16,
        color: Color,
        spawn_rate_ms: u16,
        now: u32,
    ) -> ParticleResult<u8> {
        let capacity = self.capacity();
        let index = self
            .systems
            .iter()
            .position(Option::is_none)
            .ok_or(ParticleError::PoolFull(capacity))?;
        self.systems[index] = Some(ParticleSystem {
            particles: (0..self.particles_per_system).map(|_| None).collect(),
            origin_x: f32::from(x),
            origin_y: f32::from(y),
            color,
            spawn_rate_ms,
            last_spawn: now,
        });
        tracing::trace!("Particle system {index} created at ({x}, {y})");
        Ok(index as u8)
    }

    /// Releases a system and drops its live particles.
    ///
    /// # Errors
    ///
    /// [`ParticleError::UnknownSystem`] if `id` is not in use.
    pub fn destroy(&mut self, id: u8) -> ParticleResult<()> {
        self.systems
            .get_mut(usize::from(id))
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(ParticleError::UnknownSystem(id))
    }

    /// Spawns up to `count` particles at once. Returns how many fit.
    ///
    /// # Errors
    ///
    /// [`ParticleError::UnknownSystem`] if `id` is not in use.
    pub fn emit(&mut self, id: u8, count: u8) -> ParticleResult<usize> {
        let system = self
            .systems
            .get_mut(usize::from(id))
            .and_then(Option::as_mut)
            .ok_or(ParticleError::UnknownSystem(id))?;

        let mut spawned = 0;
        while spawned < usize::from(count)
            && system.spawn(&mut self.rng, self.velocity_range, self.life_frames)
        {
            spawned += 1;
        }
        self.spawned_total += spawned as u64;
        Ok(spawned)
    }

    /// Moves the spawn point. Live particles keep their course. Returns
    /// false for unknown ids.
    pub fn set_position(&mut self, id: u8, x: i16, y: i16) -> bool {
        match self.systems.get_mut(usize::from(id)).and_then(Option::as_mut) {
            Some(system) => {
                system.origin_x = f32::from(x);
                system.origin_y = f32::from(y);
                true
            }
            None => false,
        }
    }

    /// Runs one frame for every system. Returns the particles that expired.
    pub fn update(&mut self, now: u32) -> usize {
        let mut expired = 0;
        for system in self.systems.iter_mut().flatten() {
            let rate = u32::from(system.spawn_rate_ms);
            if rate > 0 && now.wrapping_sub(system.last_spawn) >= rate {
                if system.spawn(&mut self.rng, self.velocity_range, self.life_frames) {
                    self.spawned_total += 1;
                }
                system.last_spawn = now;
            }
            expired += system.step(self.gravity);
        }
        self.expired_total += expired as u64;
        expired
    }

    /// Draws each on-screen particle as one faded pixel.
    pub fn render(&self, raster: &mut dyn Rasterizer, camera: Camera, field: DisplayConfig) {
        let (cx, cy) = (f32::from(camera.x), f32::from(camera.y));
        let (width, height) = (i32::from(field.width), i32::from(field.height));

        for system in self.systems.iter().flatten() {
            for particle in system.particles() {
                let sx = (particle.x - cx).floor() as i32;
                let sy = (particle.y - cy).floor() as i32;
                if sx < 0 || sx >= width || sy < 0 || sy >= height {
                    continue;
                }
                let color = fade(system.color, particle.alpha());
                raster.draw_rect(sx as i16, sy as i16, 1, 1, color);
            }
        }
    }
}

/// Scales an RGB565 color towards black by `alpha / 255`.
#[must_use]
pub fn fade(color: Color, alpha: u8) -> Color {
    if alpha == u8::MAX {
        return color;
    }
    let scale = |channel: u16| (u32::from(channel) * u32::from(alpha) / 255) as u16;
    let r = scale((color >> 11) & 0x1F);
    let g = scale((color >> 5) & 0x3F);
    let b = scale(color & 0x1F);
    (r << 11) | (g << 5) | b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{DrawCall, RecordingRasterizer};

    fn pool(configure: impl FnOnce(&mut ParticleConfig)) -> ParticlePool {
        let mut config = ParticleConfig { systems: 2, particles_per_system: 8, ..ParticleConfig::default() };
        configure(&mut config);
        ParticlePool::new(&config)
    }

    #[test]
    fn test_create_until_full_and_reuse() {
        let mut pool = pool(|_| {});
        assert_eq!(pool.create(0, 0, 0xFFFF, 0, 0), Ok(0));
        assert_eq!(pool.create(0, 0, 0xFFFF, 0, 0), Ok(1));
        assert_eq!(pool.create(0, 0, 0xFFFF, 0, 0), Err(ParticleError::PoolFull(2)));

        assert_eq!(pool.destroy(0), Ok(()));
        assert_eq!(pool.destroy(0), Err(ParticleError::UnknownSystem(0)));
        assert_eq!(pool.create(0, 0, 0xFFFF, 0, 0), Ok(0));
        assert_eq!(pool.emit(5, 1), Err(ParticleError::UnknownSystem(5)));
        assert!(!pool.set_position(9, 1, 1));
    }

    #[test]
    fn test_emit_caps_at_slot_count() {
        let mut pool = pool(|_| {});
        let id = pool.create(10, 10, 0xFFFF, 0, 0).unwrap();
        assert_eq!(pool.emit(id, 20), Ok(8));
        assert_eq!(pool.emit(id, 1), Ok(0));
        assert_eq!(pool.live_particles(), 8);
        assert_eq!(pool.spawned_total(), 8);

        pool.destroy(id).unwrap();
        assert_eq!(pool.live_particles(), 0);
    }

    #[test]
    fn test_timed_spawn_follows_rate() {
        let mut pool = pool(|_| {});
        let timed = pool.create(0, 0, 0xFFFF, 100, 0).unwrap();
        let manual = pool.create(0, 0, 0xFFFF, 0, 0).unwrap();

        pool.update(50);
        assert_eq!(pool.get(timed).unwrap().live_count(), 0);
        pool.update(100);
        assert_eq!(pool.get(timed).unwrap().live_count(), 1);
        pool.update(150);
        assert_eq!(pool.get(timed).unwrap().live_count(), 1);
        pool.update(200);
        assert_eq!(pool.get(timed).unwrap().live_count(), 2);
        assert_eq!(pool.get(manual).unwrap().live_count(), 0);
    }

    #[test]
    fn test_gravity_fade_and_expiry() {
        let mut pool = pool(|c| {
            c.velocity_range = 0.0;
            c.gravity = 1.0;
            c.particle_life_frames = 3;
        });
        let id = pool.create(10, 10, 0xFFFF, 0, 0).unwrap();
        pool.emit(id, 1).unwrap();

        assert_eq!(pool.update(0), 0);
        assert_eq!(pool.update(0), 0);
        let particle = *pool.get(id).unwrap().particles().next().unwrap();
        assert_eq!((particle.x, particle.y), (10.0, 13.0));
        assert_eq!(particle.alpha(), 85);

        assert_eq!(pool.update(0), 1);
        assert_eq!(pool.live_particles(), 0);
        assert_eq!(pool.expired_total(), 1);
    }

    #[test]
    fn test_set_position_moves_spawn_point() {
        let mut pool = pool(|c| c.velocity_range = 0.0);
        let id = pool.create(0, 0, 0xFFFF, 0, 0).unwrap();
        assert!(pool.set_position(id, 50, -60));
        pool.emit(id, 1).unwrap();

        let particle = pool.get(id).unwrap().particles().next().unwrap();
        assert_eq!((particle.x, particle.y), (50.0, -60.0));
        assert_eq!(pool.get(id).unwrap().origin(), (50.0, -60.0));
    }

    #[test]
    fn test_seeded_spawns_repeat_and_stay_in_range() {
        let burst = || {
            let mut pool = pool(|c| c.velocity_range = 2.0);
            let id = pool.create(0, 0, 0xFFFF, 0, 0).unwrap();
            pool.emit(id, 8).unwrap();
            pool.get(id).unwrap().particles().copied().collect::<Vec<_>>()
        };
        let first = burst();
        assert_eq!(first, burst());
        for particle in &first {
            assert!((-2.0..2.0).contains(&particle.vx));
            assert!((-2.0..2.0).contains(&particle.vy));
        }
    }

    #[test]
    fn test_render_culls_off_screen_particles() {
        let mut pool = pool(|c| {
            c.velocity_range = 0.0;
            c.gravity = 0.0;
        });
        let visible = pool.create(5, 6, 0x07E0, 0, 0).unwrap();
        let hidden = pool.create(-20, 6, 0x07E0, 0, 0).unwrap();
        pool.emit(visible, 1).unwrap();
        pool.emit(hidden, 1).unwrap();

        let mut raster = RecordingRasterizer::default();
        pool.render(&mut raster, Camera::default(), DisplayConfig::default());
        assert_eq!(raster.calls, vec![DrawCall::Rect { x: 5, y: 6, width: 1, height: 1, color: 0x07E0 }]);

        let mut raster = RecordingRasterizer::default();
        pool.render(&mut raster, Camera { x: -30, y: 0 }, DisplayConfig::default());
        assert_eq!(raster.calls.len(), 2);
    }

    #[test]
    fn test_fade_scales_each_channel() {
        assert_eq!(fade(0xFFFF, 255), 0xFFFF);
        assert_eq!(fade(0xFFFF, 0), 0);
        assert_eq!(fade(0xF800, 128), 15 << 11);
        assert_eq!(fade(0x07E0, 128), 31 << 5);
    }
}
