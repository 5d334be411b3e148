//! # Sprite Registry
//!
//! A fixed table of sprite rows indexed by id. The registry owns position,
//! visual state and the cleanup descriptor of every sprite; it never frees
//! texture or animation slots itself.
//!
//! ## Cleanup sweeps
//!
//! | Mode             | Removed when                                   |
//! |------------------|------------------------------------------------|
//! | `off_screen`     | box leaves the field by `off_screen_margin`    |
//! | `far_off_screen` | box leaves the field by `far_off_screen_margin`|
//! | `timeout`        | `now - created_at >= timeout_ms`               |
//! | `inactive`       | `active == false`                              |
//!
//! Each swept sprite is logged as a [`Removal`] until the owner drains it.

use crate::config::{DisplayConfig, SpriteConfig};
use crate::error::{RegistryError, RegistryResult};
use crate::memory::{ResourceManager, SlotHandle};
use crate::sprite::{BlendMode, CleanupMode, Playback, Removal, Sprite, SpriteKind, SpriteSpec};

/// Viewport origin in world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Camera {
    /// Left edge of the view.
    pub x: i16,
    /// Top edge of the view.
    pub y: i16,
}

/// Fixed-capacity sprite table.
pub struct SpriteRegistry {
    rows: Box<[Option<Sprite>]>,
    field: DisplayConfig,
    camera: Camera,
    off_screen_margin: i16,
    far_off_screen_margin: i16,
    auto_cleanup: bool,
    removals: Vec<Removal>,
    destroyed_total: u64,
    cleaned_up_total: u64,
}

impl SpriteRegistry {
    /// Creates an empty table sized by `config`. Ids are `u8`, so the table
    /// never exceeds 256 rows.
    #[must_use]
    pub fn new(config: &SpriteConfig, field: DisplayConfig) -> Self {
        let capacity = config.max_sprites.min(usize::from(u8::MAX) + 1);
        Self {
            rows: vec![None; capacity].into_boxed_slice(),
            field,
            camera: Camera::default(),
            off_screen_margin: config.off_screen_margin,
            far_off_screen_margin: config.far_off_screen_margin,
            auto_cleanup: config.auto_cleanup,
            removals: Vec::with_capacity(capacity),
            destroyed_total: 0,
            cleaned_up_total: 0,
        }
    }

    /// Rows in the table.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.rows.len()
    }

    /// Live sprites.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_some()).count()
    }

    /// Sprites destroyed by any path.
    #[inline]
    #[must_use]
    pub const fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }

    /// Sprites removed by a cleanup sweep.
    #[inline]
    #[must_use]
    pub const fn cleaned_up_total(&self) -> u64 {
        self.cleaned_up_total
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Claims the first free row.
    ///
    /// # Errors
    ///
    /// [`RegistryError::TableFull`] when every row is taken.
    pub fn create(&mut self, spec: SpriteSpec, now: u32) -> RegistryResult<u8> {
        let capacity = self.capacity();
        let index = self
            .rows
            .iter()
            .position(Option::is_none)
            .ok_or(RegistryError::TableFull(capacity))?;
        let id = index as u8;
        self.rows[index] = Some(spec.build(id, now));
        tracing::trace!("Sprite {id} created at ({}, {})", spec.x, spec.y);
        Ok(id)
    }

    /// Claims a specific row.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownSprite`] if `id` is out of range,
    /// [`RegistryError::AlreadyExists`] if the row is taken.
    pub fn create_at(&mut self, id: u8, spec: SpriteSpec, now: u32) -> RegistryResult<u8> {
        let row = self.rows.get_mut(usize::from(id)).ok_or(RegistryError::UnknownSprite(id))?;
        if row.is_some() {
            return Err(RegistryError::AlreadyExists(id));
        }
        *row = Some(spec.build(id, now));
        tracing::trace!("Sprite {id} created at ({}, {})", spec.x, spec.y);
        Ok(id)
    }

    /// Removes a sprite and returns its last state, so the caller can release
    /// any slots it referenced.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownSprite`] if no such sprite is live.
    pub fn destroy(&mut self, id: u8) -> RegistryResult<Sprite> {
        let sprite = self
            .rows
            .get_mut(usize::from(id))
            .and_then(Option::take)
            .ok_or(RegistryError::UnknownSprite(id))?;
        self.destroyed_total += 1;
        Ok(sprite)
    }

    /// Destroys every sprite. Returns the number removed.
    pub fn destroy_all(&mut self) -> usize {
        let mut removed = 0;
        for row in self.rows.iter_mut() {
            if row.take().is_some() {
                removed += 1;
            }
        }
        self.destroyed_total += removed as u64;
        removed
    }

    /// A live sprite.
    #[inline]
    #[must_use]
    pub fn get(&self, id: u8) -> Option<&Sprite> {
        self.rows.get(usize::from(id)).and_then(Option::as_ref)
    }

    /// A live sprite, mutably.
    #[inline]
    pub fn get_mut(&mut self, id: u8) -> Option<&mut Sprite> {
        self.rows.get_mut(usize::from(id)).and_then(Option::as_mut)
    }

    /// True if `id` names a live sprite.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: u8) -> bool {
        self.get(id).is_some()
    }

    /// Live sprites in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Sprite> {
        self.rows.iter().filter_map(Option::as_ref)
    }

    /// Live sprites that may be drawn: active, visible, and either
    /// untextured or holding a live texture handle.
    pub fn renderable<'a>(
        &'a self,
        resources: &'a ResourceManager,
    ) -> impl Iterator<Item = &'a Sprite> + 'a {
        self.iter().filter(move |sprite| {
            let texture_ok = match sprite.texture {
                Some(handle) => resources.texture_is_live(handle),
                None => true,
            };
            sprite.active && sprite.visible && texture_ok
        })
    }

    // =========================================================================
    // Setters (no-ops on unknown ids)
    // =========================================================================

    #[inline]
    fn with(&mut self, id: u8, apply: impl FnOnce(&mut Sprite)) -> bool {
        match self.get_mut(id) {
            Some(sprite) => {
                apply(sprite);
                true
            }
            None => false,
        }
    }

    /// Moves a sprite. Returns false for unknown ids.
    pub fn set_position(&mut self, id: u8, x: i16, y: i16) -> bool {
        self.with(id, |s| {
            s.x = x;
            s.y = y;
        })
    }

    /// Sets per-frame velocity. A moving static sprite becomes a physics sprite.
    pub fn set_velocity(&mut self, id: u8, vx: i16, vy: i16) -> bool {
        self.with(id, |s| {
            s.vx = vx;
            s.vy = vy;
            if s.kind == SpriteKind::Static && (vx != 0 || vy != 0) {
                s.kind = SpriteKind::Physics;
            }
        })
    }

    /// Attaches a texture and resizes the bounding box to one frame of it.
    /// Returns false for unknown ids or stale handles.
    pub fn set_texture(&mut self, id: u8, handle: SlotHandle, resources: &ResourceManager) -> bool {
        let Ok(meta) = resources.texture_meta(handle) else {
            return false;
        };
        self.with(id, |s| {
            s.texture = Some(handle);
            s.frame = 0;
            s.width = u8::try_from(meta.width).unwrap_or(u8::MAX);
            s.height = u8::try_from(meta.height).unwrap_or(u8::MAX);
        })
    }

    /// Attaches an animation and starts it from its first step.
    /// Returns false for unknown ids or stale handles.
    pub fn set_animation(
        &mut self,
        id: u8,
        handle: SlotHandle,
        resources: &ResourceManager,
        now: u32,
    ) -> bool {
        let Ok(view) = resources.animation(handle) else {
            return false;
        };
        let first = view.frame_at(0).unwrap_or(0);
        self.with(id, |s| {
            s.kind = SpriteKind::Animated;
            s.frame = first;
            s.playback = Some(Playback { animation: handle, step: 0, step_started: now, playing: true });
        })
    }

    /// Sets the draw layer.
    pub fn set_layer(&mut self, id: u8, layer: u8) -> bool {
        self.with(id, |s| s.layer = layer)
    }

    /// Sets the blend mode.
    pub fn set_blend_mode(&mut self, id: u8, blend: BlendMode) -> bool {
        self.with(id, |s| s.blend = blend)
    }

    /// Sets opacity.
    pub fn set_alpha(&mut self, id: u8, alpha: u8) -> bool {
        self.with(id, |s| s.alpha = alpha)
    }

    /// Shows or hides a sprite.
    pub fn set_visible(&mut self, id: u8, visible: bool) -> bool {
        self.with(id, |s| s.visible = visible)
    }

    /// Includes or excludes a sprite from the collision scan.
    pub fn set_collision(&mut self, id: u8, enabled: bool) -> bool {
        self.with(id, |s| s.collision_enabled = enabled)
    }

    /// Sets the active flag.
    pub fn set_active(&mut self, id: u8, active: bool) -> bool {
        self.with(id, |s| s.active = active)
    }

    /// Replaces the cleanup rule. The creation timestamp is kept.
    pub fn set_cleanup(&mut self, id: u8, mode: CleanupMode, timeout_ms: u32) -> bool {
        self.with(id, |s| {
            s.cleanup.mode = mode;
            s.cleanup.timeout_ms = timeout_ms;
        })
    }

    /// Opts one sprite in or out of the automatic sweeps.
    pub fn set_auto_cleanup(&mut self, id: u8, enabled: bool) -> bool {
        self.with(id, |s| s.cleanup.auto = enabled)
    }

    /// Global switch for [`Self::run_auto_cleanup`].
    pub fn set_global_auto_cleanup(&mut self, enabled: bool) {
        self.auto_cleanup = enabled;
    }

    // =========================================================================
    // Animation playback
    // =========================================================================

    /// Restarts the attached animation from its first step.
    pub fn start_animation(&mut self, id: u8, resources: &ResourceManager, now: u32) -> bool {
        self.set_animation_frame(id, 0, resources, now)
            && self.with(id, |s| {
                if let Some(playback) = s.playback.as_mut() {
                    playback.playing = true;
                }
            })
    }

    /// Stops playback and rewinds to the first step.
    pub fn stop_animation(&mut self, id: u8, resources: &ResourceManager, now: u32) -> bool {
        self.set_animation_frame(id, 0, resources, now)
            && self.with(id, |s| {
                if let Some(playback) = s.playback.as_mut() {
                    playback.playing = false;
                }
            })
    }

    /// Stops playback on the current step.
    pub fn pause_animation(&mut self, id: u8) -> bool {
        let Some(playback) = self.get_mut(id).and_then(|s| s.playback.as_mut()) else {
            return false;
        };
        playback.playing = false;
        true
    }

    /// Jumps to `step`. Returns false if the sprite has no live animation or
    /// the step is out of range.
    pub fn set_animation_frame(
        &mut self,
        id: u8,
        step: u8,
        resources: &ResourceManager,
        now: u32,
    ) -> bool {
        let Some(sprite) = self.get_mut(id) else {
            return false;
        };
        let Some(playback) = sprite.playback.as_mut() else {
            return false;
        };
        let Some(frame) = resources.animation(playback.animation).ok().and_then(|v| v.frame_at(step))
        else {
            return false;
        };
        playback.step = step;
        playback.step_started = now;
        sprite.frame = frame;
        true
    }

    /// Steps every playing animation whose current step has run its
    /// duration. Playback on a stale animation handle is detached.
    pub fn advance_animations(&mut self, now: u32, resources: &ResourceManager) {
        for sprite in self.rows.iter_mut().flatten() {
            let Some(playback) = sprite.playback.as_mut() else {
                continue;
            };
            if !playback.playing || !sprite.active {
                continue;
            }
            let Ok(view) = resources.animation(playback.animation) else {
                tracing::debug!("Sprite {} lost its animation slot", sprite.id);
                sprite.playback = None;
                continue;
            };
            let duration = u32::from(view.duration_at(playback.step).unwrap_or(0));
            if now.wrapping_sub(playback.step_started) < duration {
                continue;
            }

            let mut next = playback.step.saturating_add(1);
            if next >= view.frame_count() {
                if !view.is_looping() {
                    playback.playing = false;
                    continue;
                }
                next = 0;
            }
            playback.step = next;
            playback.step_started = now;
            sprite.frame = view.frame_at(next).unwrap_or(sprite.frame);
        }
    }

    /// Adds velocity to position on every active sprite, saturating at the
    /// coordinate range.
    pub fn integrate(&mut self) {
        for sprite in self.rows.iter_mut().flatten().filter(|s| s.active) {
            sprite.x = sprite.x.saturating_add(sprite.vx);
            sprite.y = sprite.y.saturating_add(sprite.vy);
        }
    }

    // =========================================================================
    // Camera
    // =========================================================================

    /// Current viewport origin.
    #[inline]
    #[must_use]
    pub const fn camera(&self) -> Camera {
        self.camera
    }

    /// Places the viewport.
    pub fn set_camera(&mut self, x: i16, y: i16) {
        self.camera = Camera { x, y };
    }

    /// Shifts the viewport.
    pub fn move_camera(&mut self, dx: i16, dy: i16) {
        self.camera.x = self.camera.x.saturating_add(dx);
        self.camera.y = self.camera.y.saturating_add(dy);
    }

    /// Centers the viewport on a sprite. Returns false for unknown ids.
    pub fn follow_sprite(&mut self, id: u8) -> bool {
        let Some(sprite) = self.get(id) else {
            return false;
        };
        let cx = i32::from(sprite.x) + i32::from(sprite.width) / 2 - i32::from(self.field.width) / 2;
        let cy = i32::from(sprite.y) + i32::from(sprite.height) / 2 - i32::from(self.field.height) / 2;
        self.camera = Camera { x: clamp_i16(cx), y: clamp_i16(cy) };
        true
    }

    /// True if the sprite's box lies entirely more than `margin` pixels
    /// outside the visible field.
    #[must_use]
    pub fn is_outside(&self, sprite: &Sprite, margin: i16) -> bool {
        let sx = i32::from(sprite.x) - i32::from(self.camera.x);
        let sy = i32::from(sprite.y) - i32::from(self.camera.y);
        let (w, h) = (i32::from(sprite.width), i32::from(sprite.height));
        let m = i32::from(margin);

        sx > i32::from(self.field.width) + m
            || sx + w < -m
            || sy > i32::from(self.field.height) + m
            || sy + h < -m
    }

    // =========================================================================
    // Sweeps
    // =========================================================================

    fn sweep(&mut self, mut doomed: impl FnMut(&Self, &Sprite) -> bool) -> usize {
        let mut removed = 0;
        for index in 0..self.rows.len() {
            let Some(sprite) = self.rows[index] else {
                continue;
            };
            if !sprite.cleanup.auto || !doomed(self, &sprite) {
                continue;
            }
            self.rows[index] = None;
            self.removals.push(Removal {
                id: sprite.id,
                x: sprite.x,
                y: sprite.y,
                reason: sprite.cleanup.mode,
            });
            removed += 1;
        }
        self.destroyed_total += removed as u64;
        self.cleaned_up_total += removed as u64;
        removed
    }

    /// Removes `off_screen` and `far_off_screen` sprites beyond their margin.
    pub fn cleanup_off_screen(&mut self) -> usize {
        let (near, far) = (self.off_screen_margin, self.far_off_screen_margin);
        let removed = self.sweep(|registry, sprite| match sprite.cleanup.mode {
            CleanupMode::OffScreen => registry.is_outside(sprite, near),
            CleanupMode::FarOffScreen => registry.is_outside(sprite, far),
            _ => false,
        });
        if removed > 0 {
            tracing::debug!("Off-screen sweep removed {removed} sprites");
        }
        removed
    }

    /// Removes `timeout` sprites whose lifetime has elapsed.
    pub fn cleanup_timed_out(&mut self, now: u32) -> usize {
        let removed = self.sweep(|_, sprite| {
            sprite.cleanup.mode == CleanupMode::Timeout
                && now.wrapping_sub(sprite.cleanup.created_at) >= sprite.cleanup.timeout_ms
        });
        if removed > 0 {
            tracing::debug!("Timeout sweep removed {removed} sprites");
        }
        removed
    }

    /// Removes `inactive` sprites whose active flag is cleared.
    pub fn cleanup_all_inactive(&mut self) -> usize {
        let removed =
            self.sweep(|_, sprite| sprite.cleanup.mode == CleanupMode::Inactive && !sprite.active);
        if removed > 0 {
            tracing::debug!("Inactive sweep removed {removed} sprites");
        }
        removed
    }

    /// Runs all three sweeps if the global switch is on.
    pub fn run_auto_cleanup(&mut self, now: u32) -> usize {
        if !self.auto_cleanup {
            return 0;
        }
        self.cleanup_off_screen() + self.cleanup_timed_out(now) + self.cleanup_all_inactive()
    }

    /// Takes the removals logged by the sweeps since the last call.
    pub fn drain_removals(&mut self) -> std::vec::Drain<'_, Removal> {
        self.removals.drain(..)
    }
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;

    fn registry(margin: i16) -> SpriteRegistry {
        let config = SpriteConfig {
            max_sprites: 8,
            off_screen_margin: margin,
            far_off_screen_margin: margin * 4,
            ..SpriteConfig::default()
        };
        SpriteRegistry::new(&config, DisplayConfig { width: 240, height: 240 })
    }

    #[test]
    fn test_off_screen_sweep_scenario() {
        let mut reg = registry(64);
        let spec = SpriteSpec::new(10, 10, 5, 5).with_cleanup(CleanupMode::OffScreen, 0);
        assert_eq!(reg.create_at(0, spec, 0), Ok(0));

        assert_eq!(reg.cleanup_off_screen(), 0);
        assert!(reg.set_position(0, -100, 10));
        assert_eq!(reg.cleanup_off_screen(), 1);

        assert!(!reg.contains(0));
        assert_eq!(reg.active_count(), 0);
        assert_eq!(reg.cleaned_up_total(), 1);

        let removals: Vec<_> = reg.drain_removals().collect();
        assert_eq!(
            removals,
            vec![Removal { id: 0, x: -100, y: 10, reason: CleanupMode::OffScreen }]
        );
    }

    #[test]
    fn test_margin_boundary() {
        let mut reg = registry(64);
        let spec = SpriteSpec::new(0, 0, 5, 5).with_cleanup(CleanupMode::OffScreen, 0);
        let id = reg.create(spec, 0).unwrap();

        // Right edge exactly at -64 is still inside the margin.
        reg.set_position(id, -69, 0);
        assert_eq!(reg.cleanup_off_screen(), 0);
        reg.set_position(id, -70, 0);
        assert_eq!(reg.cleanup_off_screen(), 1);
    }

    #[test]
    fn test_far_margin_keeps_near_offenders() {
        let mut reg = registry(10);
        let near = reg.create(SpriteSpec::new(260, 0, 4, 4).with_cleanup(CleanupMode::OffScreen, 0), 0).unwrap();
        let far = reg.create(SpriteSpec::new(260, 0, 4, 4).with_cleanup(CleanupMode::FarOffScreen, 0), 0).unwrap();

        assert_eq!(reg.cleanup_off_screen(), 1);
        assert!(!reg.contains(near));
        assert!(reg.contains(far));
    }

    #[test]
    fn test_camera_shifts_off_screen_test() {
        let mut reg = registry(0);
        let id = reg.create(SpriteSpec::new(1000, 0, 4, 4).with_cleanup(CleanupMode::OffScreen, 0), 0).unwrap();

        reg.set_camera(900, 0);
        assert_eq!(reg.cleanup_off_screen(), 0);
        reg.move_camera(-900, 0);
        assert_eq!(reg.cleanup_off_screen(), 1);
        assert!(!reg.contains(id));
    }

    #[test]
    fn test_follow_sprite_centers() {
        let mut reg = registry(0);
        let id = reg.create(SpriteSpec::new(500, 300, 10, 10), 0).unwrap();
        assert!(reg.follow_sprite(id));
        assert_eq!(reg.camera(), Camera { x: 505 - 120, y: 305 - 120 });
        assert!(!reg.follow_sprite(7));
    }

    #[test]
    fn test_timeout_is_inclusive() {
        let mut reg = registry(64);
        let id = reg.create(SpriteSpec::new(0, 0, 1, 1).with_cleanup(CleanupMode::Timeout, 100), 1_000).unwrap();

        assert_eq!(reg.cleanup_timed_out(1_099), 0);
        assert_eq!(reg.cleanup_timed_out(1_100), 1);
        assert!(!reg.contains(id));
    }

    #[test]
    fn test_inactive_sweep_uses_active_flag() {
        let mut reg = registry(64);
        let a = reg.create(SpriteSpec::new(0, 0, 1, 1).with_cleanup(CleanupMode::Inactive, 0), 0).unwrap();
        let b = reg.create(SpriteSpec::new(0, 0, 1, 1).with_cleanup(CleanupMode::Inactive, 0), 0).unwrap();

        assert_eq!(reg.cleanup_all_inactive(), 0);
        reg.set_active(a, false);
        assert_eq!(reg.cleanup_all_inactive(), 1);
        assert!(!reg.contains(a));
        assert!(reg.contains(b));
    }

    #[test]
    fn test_per_sprite_and_global_opt_out() {
        let mut reg = registry(0);
        let kept = reg.create(SpriteSpec::new(-500, 0, 1, 1).with_cleanup(CleanupMode::OffScreen, 0), 0).unwrap();
        reg.set_auto_cleanup(kept, false);
        assert_eq!(reg.run_auto_cleanup(0), 0);

        let other = reg.create(SpriteSpec::new(-500, 0, 1, 1).with_cleanup(CleanupMode::OffScreen, 0), 0).unwrap();
        reg.set_global_auto_cleanup(false);
        assert_eq!(reg.run_auto_cleanup(0), 0);
        reg.set_global_auto_cleanup(true);
        assert_eq!(reg.run_auto_cleanup(0), 1);
        assert!(reg.contains(kept));
        assert!(!reg.contains(other));
    }

    #[test]
    fn test_table_full_and_create_at_conflicts() {
        let mut reg = registry(0);
        for _ in 0..8 {
            reg.create(SpriteSpec::new(0, 0, 1, 1), 0).unwrap();
        }
        assert_eq!(reg.create(SpriteSpec::new(0, 0, 1, 1), 0), Err(RegistryError::TableFull(8)));
        assert_eq!(reg.create_at(3, SpriteSpec::new(0, 0, 1, 1), 0), Err(RegistryError::AlreadyExists(3)));
        assert_eq!(reg.create_at(8, SpriteSpec::new(0, 0, 1, 1), 0), Err(RegistryError::UnknownSprite(8)));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut reg = registry(0);
        assert!(!reg.set_position(5, 1, 1));
        assert!(!reg.set_alpha(200, 1));
        assert!(!reg.pause_animation(5));
        assert_eq!(reg.destroy(5), Err(RegistryError::UnknownSprite(5)));
        assert_eq!(reg.destroyed_total(), 0);
    }

    #[test]
    fn test_destroy_counts_but_does_not_clean() {
        let mut reg = registry(0);
        let id = reg.create(SpriteSpec::new(0, 0, 1, 1), 0).unwrap();
        reg.create(SpriteSpec::new(0, 0, 1, 1), 0).unwrap();

        assert!(reg.destroy(id).is_ok());
        assert_eq!(reg.destroy_all(), 1);
        assert_eq!(reg.destroyed_total(), 2);
        assert_eq!(reg.cleaned_up_total(), 0);
        // Freed row is reused first.
        assert_eq!(reg.create(SpriteSpec::new(0, 0, 1, 1), 0), Ok(0));
    }

    #[test]
    fn test_integrate_saturates() {
        let mut reg = registry(0);
        let id = reg.create(SpriteSpec::new(i16::MAX - 1, 0, 1, 1), 0).unwrap();
        reg.set_velocity(id, 5, -3);
        reg.integrate();

        let sprite = reg.get(id).unwrap();
        assert_eq!((sprite.x, sprite.y), (i16::MAX, -3));
        assert_eq!(sprite.kind, SpriteKind::Physics);
    }

    #[test]
    fn test_animation_playback() {
        let mut resources = ResourceManager::new(&MemoryConfig::default());
        let anim = resources.animation_create(&[4, 5, 6], &[100, 100, 100], false, 0).unwrap();
        let mut reg = registry(0);
        let id = reg.create(SpriteSpec::new(0, 0, 1, 1), 0).unwrap();

        assert!(reg.set_animation(id, anim, &resources, 0));
        assert_eq!(reg.get(id).unwrap().kind, SpriteKind::Animated);
        assert_eq!(reg.get(id).unwrap().frame, 4);

        reg.advance_animations(99, &resources);
        assert_eq!(reg.get(id).unwrap().frame, 4);
        reg.advance_animations(100, &resources);
        assert_eq!(reg.get(id).unwrap().frame, 5);
        reg.advance_animations(200, &resources);
        reg.advance_animations(300, &resources);
        let sprite = reg.get(id).unwrap();
        assert_eq!(sprite.frame, 6);
        assert!(!sprite.playback.unwrap().playing);

        assert!(reg.start_animation(id, &resources, 400));
        assert_eq!(reg.get(id).unwrap().frame, 4);
        assert!(reg.set_animation_frame(id, 2, &resources, 400));
        assert!(!reg.set_animation_frame(id, 3, &resources, 400));
        assert!(reg.pause_animation(id));
        reg.advance_animations(10_000, &resources);
        assert_eq!(reg.get(id).unwrap().frame, 6);
    }

    #[test]
    fn test_looping_animation_wraps() {
        let mut resources = ResourceManager::new(&MemoryConfig::default());
        let anim = resources.animation_create(&[1, 2], &[10, 10], true, 0).unwrap();
        let mut reg = registry(0);
        let id = reg.create(SpriteSpec::new(0, 0, 1, 1), 0).unwrap();
        reg.set_animation(id, anim, &resources, 0);

        reg.advance_animations(10, &resources);
        reg.advance_animations(20, &resources);
        assert_eq!(reg.get(id).unwrap().frame, 1);
        assert!(reg.get(id).unwrap().playback.unwrap().playing);
    }

    #[test]
    fn test_stale_texture_not_renderable() {
        let mut resources = ResourceManager::new(&MemoryConfig::default());
        let tex = resources.texture_load(&[0u16; 16], 4, 4, 1, 0).unwrap();
        let mut reg = registry(0);
        let textured = reg.create(SpriteSpec::new(0, 0, 1, 1), 0).unwrap();
        let plain = reg.create(SpriteSpec::new(0, 0, 1, 1), 0).unwrap();
        assert!(reg.set_texture(textured, tex, &resources));
        assert_eq!(reg.get(textured).unwrap().width, 4);

        assert_eq!(reg.renderable(&resources).count(), 2);
        resources.texture_destroy(tex).unwrap();
        let ids: Vec<u8> = reg.renderable(&resources).map(|s| s.id).collect();
        assert_eq!(ids, vec![plain]);
        // The slot release did not touch the sprite row.
        assert!(reg.contains(textured));
    }
}
