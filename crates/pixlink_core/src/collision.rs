//! # Collision Engine
//!
//! Axis-aligned box overlap between sprites, collected into a bounded
//! per-frame event buffer.
//!
//! Boxes that share an edge overlap. When the buffer is full, new events are
//! rejected and counted; events already recorded are never overwritten.

use crate::sprite::{Sprite, SpriteRegistry};

/// Axis-aligned bounding box in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aabb {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Aabb {
    /// Box at `(x, y)` of the given size.
    #[inline]
    #[must_use]
    pub fn new(x: i16, y: i16, width: u8, height: u8) -> Self {
        Self { x: i32::from(x), y: i32::from(y), width: i32::from(width), height: i32::from(height) }
    }

    /// Inclusive overlap test.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.x <= other.x + other.width
            && other.x <= self.x + self.width
            && self.y <= other.y + other.height
            && other.y <= self.y + self.height
    }
}

/// True iff two distinct sprites' boxes overlap. Symmetric; a sprite never
/// collides with itself.
#[inline]
#[must_use]
pub fn check(a: &Sprite, b: &Sprite) -> bool {
    a.id != b.id && a.bounds().overlaps(&b.bounds())
}

/// An unordered pair of colliding sprites. Stored with `a < b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionEvent {
    /// Lower id.
    pub a: u8,
    /// Higher id.
    pub b: u8,
    /// When the overlap was seen (ms).
    pub timestamp: u32,
}

impl CollisionEvent {
    /// Normalizes the pair order.
    #[must_use]
    pub fn new(first: u8, second: u8, timestamp: u32) -> Self {
        Self { a: first.min(second), b: first.max(second), timestamp }
    }
}

/// Bounded event buffer plus the pairwise scan.
pub struct CollisionEngine {
    events: Vec<CollisionEvent>,
    capacity: usize,
    enabled: bool,
    dropped: u64,
}

impl CollisionEngine {
    /// Buffer holding at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize, enabled: bool) -> Self {
        Self { events: Vec::with_capacity(capacity), capacity, enabled, dropped: 0 }
    }

    /// Maximum buffered events.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether [`Self::scan`] does anything.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turns the per-frame scan on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Events rejected because the buffer was full.
    #[inline]
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Buffered events, oldest first.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Appends an event. Returns false for self-pairs or when the buffer is
    /// full; the latter is counted.
    pub fn record_event(&mut self, first: u8, second: u8, now: u32) -> bool {
        if first == second {
            return false;
        }
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            tracing::trace!("Collision buffer full, dropped ({first}, {second})");
            return false;
        }
        self.events.push(CollisionEvent::new(first, second, now));
        true
    }

    /// Returns and clears the buffered events.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, CollisionEvent> {
        self.events.drain(..)
    }

    /// Discards the buffered events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// On-demand test of two registry ids. False if either is missing.
    #[must_use]
    pub fn check_ids(registry: &SpriteRegistry, first: u8, second: u8) -> bool {
        match (registry.get(first), registry.get(second)) {
            (Some(a), Some(b)) => check(a, b),
            _ => false,
        }
    }

    /// Pairwise sweep over active, collision-enabled sprites. Returns the
    /// number of overlapping pairs found, recorded or not.
    pub fn scan(&mut self, registry: &SpriteRegistry, now: u32) -> usize {
        if !self.enabled {
            return 0;
        }
        let candidates: Vec<&Sprite> =
            registry.iter().filter(|s| s.active && s.collision_enabled).collect();

        let mut found = 0;
        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                if check(a, b) {
                    found += 1;
                    self.record_event(a.id, b.id, now);
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayConfig, SpriteConfig};
    use crate::sprite::SpriteSpec;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn registry() -> SpriteRegistry {
        SpriteRegistry::new(&SpriteConfig::default(), DisplayConfig::default())
    }

    fn spawn(reg: &mut SpriteRegistry, x: i16, y: i16, w: u8, h: u8) -> u8 {
        let id = reg.create(SpriteSpec::new(x, y, w, h), 0).unwrap();
        reg.set_collision(id, true);
        id
    }

    #[test]
    fn test_touching_edges_overlap() {
        let a = Aabb::new(0, 0, 10, 10);
        assert!(a.overlaps(&Aabb::new(10, 0, 5, 5)));
        assert!(a.overlaps(&Aabb::new(0, 10, 5, 5)));
        assert!(!a.overlaps(&Aabb::new(11, 0, 5, 5)));
        assert!(!a.overlaps(&Aabb::new(-6, 0, 5, 5)));
    }

    #[test]
    fn test_check_symmetric_and_irreflexive() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut reg = registry();
        for _ in 0..40 {
            let x = rng.gen_range(-50..50);
            let y = rng.gen_range(-50..50);
            spawn(&mut reg, x, y, rng.gen_range(0..20), rng.gen_range(0..20));
        }

        let sprites: Vec<&Sprite> = reg.iter().collect();
        for a in &sprites {
            assert!(!check(a, a));
            for b in &sprites {
                assert_eq!(check(a, b), check(b, a), "asymmetric for {} / {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_scan_records_pairs_once() {
        let mut reg = registry();
        let a = spawn(&mut reg, 0, 0, 10, 10);
        let b = spawn(&mut reg, 5, 5, 10, 10);
        let _far = spawn(&mut reg, 100, 100, 4, 4);
        let ghost = reg.create(SpriteSpec::new(0, 0, 10, 10), 0).unwrap();

        let mut engine = CollisionEngine::new(16, true);
        assert_eq!(engine.scan(&reg, 42), 1);
        assert_eq!(engine.events(), &[CollisionEvent { a, b, timestamp: 42 }]);
        assert!(!CollisionEngine::check_ids(&reg, a, 200));
        assert!(CollisionEngine::check_ids(&reg, a, ghost));

        let drained: Vec<_> = engine.drain_events().collect();
        assert_eq!(drained.len(), 1);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_inactive_sprites_skipped() {
        let mut reg = registry();
        let a = spawn(&mut reg, 0, 0, 10, 10);
        spawn(&mut reg, 0, 0, 10, 10);
        reg.set_active(a, false);

        let mut engine = CollisionEngine::new(16, true);
        assert_eq!(engine.scan(&reg, 0), 0);
    }

    #[test]
    fn test_overflow_drops_newest() {
        let mut engine = CollisionEngine::new(2, true);
        assert!(engine.record_event(1, 0, 10));
        assert!(engine.record_event(2, 3, 11));
        assert!(!engine.record_event(4, 5, 12));
        assert!(!engine.record_event(6, 6, 13));

        assert_eq!(engine.dropped(), 1);
        assert_eq!(
            engine.events(),
            &[CollisionEvent { a: 0, b: 1, timestamp: 10 }, CollisionEvent { a: 2, b: 3, timestamp: 11 }]
        );
    }

    #[test]
    fn test_disabled_scan() {
        let mut reg = registry();
        spawn(&mut reg, 0, 0, 10, 10);
        spawn(&mut reg, 0, 0, 10, 10);

        let mut engine = CollisionEngine::new(4, false);
        assert_eq!(engine.scan(&reg, 0), 0);
        engine.set_enabled(true);
        assert_eq!(engine.scan(&reg, 0), 1);
    }
}
