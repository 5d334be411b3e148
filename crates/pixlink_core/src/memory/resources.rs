//! # Resource Manager
//!
//! Textures and animations live in two pre-sized pools. Each load claims a
//! slot and bump-allocates its bytes; destroying a slot only invalidates the
//! handle. Bytes come back through [`ResourceManager::defragment_textures`].

use crate::config::MemoryConfig;
use crate::error::{ResourceError, ResourceResult};
use crate::memory::{align_up, MemoryPool, PoolRegion, SlotEntry, SlotHandle, SlotTable};

/// Pixel data is RGB565, two bytes per pixel.
const TEXTURE_ALIGN: usize = 2;

/// Texture dimensions stored alongside the pixel bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureMeta {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Number of frames laid out back to back.
    pub frames: u8,
}

impl TextureMeta {
    /// Bytes in one frame.
    #[inline]
    #[must_use]
    pub const fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * TEXTURE_ALIGN
    }
}

/// Animation layout inside its pool region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationMeta {
    /// Entries in the frame sequence.
    pub frame_count: u8,
    /// Restart from the first frame after the last one.
    pub looping: bool,
    /// Offset of the duration table inside the region.
    durations_at: usize,
}

/// Borrowed view of an animation read back from the pool.
#[derive(Clone, Copy, Debug)]
pub struct AnimationView<'a> {
    sequence: &'a [u8],
    durations: &'a [u8],
    looping: bool,
}

impl AnimationView<'_> {
    /// Number of steps.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u8 {
        self.sequence.len() as u8
    }

    /// Texture frame shown at `step`.
    #[inline]
    #[must_use]
    pub fn frame_at(&self, step: u8) -> Option<u8> {
        self.sequence.get(usize::from(step)).copied()
    }

    /// Duration of `step` in milliseconds.
    #[must_use]
    pub fn duration_at(&self, step: u8) -> Option<u16> {
        let at = usize::from(step) * 2;
        self.durations.get(at..at + 2).map(bytemuck::pod_read_unaligned)
    }

    /// True if playback wraps around.
    #[inline]
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }
}

/// Owner of both pools and both slot tables.
pub struct ResourceManager {
    texture_pool: MemoryPool,
    animation_pool: MemoryPool,
    textures: SlotTable<TextureMeta>,
    animations: SlotTable<AnimationMeta>,
}

impl ResourceManager {
    /// Allocates the pools and tables described by `config`.
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            texture_pool: MemoryPool::new(config.texture_pool_bytes),
            animation_pool: MemoryPool::new(config.animation_pool_bytes),
            textures: SlotTable::new(config.texture_slots),
            animations: SlotTable::new(config.animation_slots),
        }
    }

    /// The texture pool.
    #[inline]
    #[must_use]
    pub const fn texture_pool(&self) -> &MemoryPool {
        &self.texture_pool
    }

    /// The animation pool.
    #[inline]
    #[must_use]
    pub const fn animation_pool(&self) -> &MemoryPool {
        &self.animation_pool
    }

    /// Live texture slots.
    #[inline]
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.allocated_count()
    }

    /// Live animation slots.
    #[inline]
    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.animations.allocated_count()
    }

    /// Successful allocations across both pools.
    #[must_use]
    pub const fn allocations(&self) -> u64 {
        self.texture_pool.allocations() + self.animation_pool.allocations()
    }

    /// Failed allocations across both pools.
    #[must_use]
    pub const fn allocation_failures(&self) -> u64 {
        self.texture_pool.failures() + self.animation_pool.failures()
    }

    // =========================================================================
    // Textures
    // =========================================================================

    /// Copies `pixels` (`width * height * frames` RGB565 values) into the
    /// texture pool and claims a slot stamped with `now`.
    ///
    /// The slot is checked before any pool bytes are spent.
    ///
    /// # Errors
    ///
    /// [`ResourceError::LengthMismatch`], [`ResourceError::SlotTableFull`]
    /// or a wrapped [`crate::PoolError`].
    pub fn texture_load(
        &mut self,
        pixels: &[u16],
        width: u16,
        height: u16,
        frames: u8,
        now: u32,
    ) -> ResourceResult<SlotHandle> {
        let meta = TextureMeta { width, height, frames };
        let expected = usize::from(width) * usize::from(height) * usize::from(frames);
        if pixels.len() != expected {
            return Err(ResourceError::LengthMismatch { expected, actual: pixels.len() });
        }
        if self.textures.allocated_count() == self.textures.capacity() {
            return Err(ResourceError::SlotTableFull(self.textures.capacity()));
        }

        let region = self.texture_pool.alloc(expected * TEXTURE_ALIGN, TEXTURE_ALIGN)?;
        self.texture_pool
            .bytes_mut(region)
            .copy_from_slice(bytemuck::cast_slice(pixels));
        self.textures.insert(region, meta, now)
    }

    /// Frees a texture slot. Pool bytes stay where they are.
    ///
    /// # Errors
    ///
    /// [`ResourceError::StaleHandle`] if the handle is not live.
    pub fn texture_destroy(&mut self, handle: SlotHandle) -> ResourceResult<()> {
        self.textures.remove(handle).map(|_| ())
    }

    /// True if the handle still names a live texture.
    #[inline]
    #[must_use]
    pub fn texture_is_live(&self, handle: SlotHandle) -> bool {
        self.textures.is_live(handle)
    }

    /// Live texture in slot `index`. Network commands address slots by index.
    #[must_use]
    pub fn texture_at(&self, index: u16) -> Option<SlotHandle> {
        self.textures.handle_at(index)
    }

    /// Handles of every live texture.
    pub fn texture_handles(&self) -> impl Iterator<Item = SlotHandle> + '_ {
        self.textures.iter().map(|(handle, _)| handle)
    }

    /// Dimensions of a live texture.
    ///
    /// # Errors
    ///
    /// [`ResourceError::StaleHandle`] if the handle is not live.
    pub fn texture_meta(&self, handle: SlotHandle) -> ResourceResult<TextureMeta> {
        self.textures.get(handle).map(|entry| entry.meta)
    }

    /// Last-use timestamp of a live texture.
    ///
    /// # Errors
    ///
    /// [`ResourceError::StaleHandle`] if the handle is not live.
    pub fn texture_last_used(&self, handle: SlotHandle) -> ResourceResult<u32> {
        self.textures.get(handle).map(|entry| entry.last_used)
    }

    /// Raw bytes of one frame.
    ///
    /// # Errors
    ///
    /// [`ResourceError::StaleHandle`] or [`ResourceError::FrameOutOfRange`].
    pub fn texture_frame(&self, handle: SlotHandle, frame: u8) -> ResourceResult<&[u8]> {
        let entry = self.textures.get(handle)?;
        let meta = entry.meta;
        if frame >= meta.frames {
            return Err(ResourceError::FrameOutOfRange { frame, count: meta.frames });
        }
        let frame_bytes = meta.frame_bytes();
        let region = PoolRegion {
            offset: entry.region.offset + usize::from(frame) * frame_bytes,
            len: frame_bytes,
        };
        Ok(self.texture_pool.bytes(region))
    }

    /// Samples one pixel. `None` for stale handles or out-of-range coordinates.
    #[must_use]
    pub fn texture_pixel(&self, handle: SlotHandle, frame: u8, x: u16, y: u16) -> Option<u16> {
        let meta = self.texture_meta(handle).ok()?;
        if x >= meta.width || y >= meta.height {
            return None;
        }
        let bytes = self.texture_frame(handle, frame).ok()?;
        let at = (usize::from(y) * usize::from(meta.width) + usize::from(x)) * TEXTURE_ALIGN;
        bytes.get(at..at + TEXTURE_ALIGN).map(bytemuck::pod_read_unaligned)
    }

    /// Stamps a texture as used at `now`. Stale handles are ignored.
    pub fn texture_touch(&mut self, handle: SlotHandle, now: u32) {
        if let Ok(entry) = self.textures.get_mut(handle) {
            entry.last_used = now;
        }
    }

    /// Frees every texture whose last use is more than `max_age` ms before
    /// `now`. Returns the number freed.
    pub fn texture_cleanup_unused(&mut self, max_age: u32, now: u32) -> usize {
        let freed = self
            .textures
            .retain(|entry: &SlotEntry<TextureMeta>| now.wrapping_sub(entry.last_used) <= max_age);
        if freed > 0 {
            tracing::debug!("Texture sweep freed {freed} slots (max age {max_age}ms)");
        }
        freed
    }

    /// Slides live textures to the front of the pool and lowers `used`.
    ///
    /// Handles stay valid; only their regions move. Returns the bytes
    /// reclaimed.
    pub fn defragment_textures(&mut self) -> usize {
        let mut live: Vec<(usize, SlotHandle)> = self
            .textures
            .iter()
            .map(|(handle, entry)| (entry.region.offset, handle))
            .collect();
        live.sort_unstable_by_key(|(offset, _)| *offset);

        let pool = &mut self.texture_pool;
        let mut cursor = 0;
        for (_, handle) in live {
            if let Ok(entry) = self.textures.get_mut(handle) {
                entry.region = pool.relocate(entry.region, align_up(cursor, TEXTURE_ALIGN));
                cursor = entry.region.end();
            }
        }

        let before = pool.used();
        pool.truncate(cursor);
        let reclaimed = before - pool.used();
        tracing::debug!("Texture pool defragmented: {} bytes used, {reclaimed} reclaimed", pool.used());
        reclaimed
    }

    // =========================================================================
    // Animations
    // =========================================================================

    /// Stores a frame sequence and per-step durations in the animation pool.
    ///
    /// # Errors
    ///
    /// [`ResourceError::LengthMismatch`] when the two tables differ in length
    /// or exceed 255 steps, [`ResourceError::SlotTableFull`], or a wrapped
    /// [`crate::PoolError`] (an empty sequence is a zero-size request).
    pub fn animation_create(
        &mut self,
        sequence: &[u8],
        durations: &[u16],
        looping: bool,
        now: u32,
    ) -> ResourceResult<SlotHandle> {
        if sequence.len() != durations.len() || sequence.len() > usize::from(u8::MAX) {
            return Err(ResourceError::LengthMismatch {
                expected: sequence.len().min(usize::from(u8::MAX)),
                actual: durations.len(),
            });
        }
        if self.animations.allocated_count() == self.animations.capacity() {
            return Err(ResourceError::SlotTableFull(self.animations.capacity()));
        }

        let durations_at = align_up(sequence.len(), 2);
        let total = if sequence.is_empty() { 0 } else { durations_at + durations.len() * 2 };
        let region = self.animation_pool.alloc(total, 2)?;

        let bytes = self.animation_pool.bytes_mut(region);
        bytes[..sequence.len()].copy_from_slice(sequence);
        bytes[durations_at..].copy_from_slice(bytemuck::cast_slice(durations));

        let meta = AnimationMeta { frame_count: sequence.len() as u8, looping, durations_at };
        self.animations.insert(region, meta, now)
    }

    /// Frees an animation slot.
    ///
    /// # Errors
    ///
    /// [`ResourceError::StaleHandle`] if the handle is not live.
    pub fn animation_destroy(&mut self, handle: SlotHandle) -> ResourceResult<()> {
        self.animations.remove(handle).map(|_| ())
    }

    /// True if the handle still names a live animation.
    #[inline]
    #[must_use]
    pub fn animation_is_live(&self, handle: SlotHandle) -> bool {
        self.animations.is_live(handle)
    }

    /// Live animation in slot `index`.
    #[must_use]
    pub fn animation_at(&self, index: u16) -> Option<SlotHandle> {
        self.animations.handle_at(index)
    }

    /// Reads an animation back from the pool.
    ///
    /// # Errors
    ///
    /// [`ResourceError::StaleHandle`] if the handle is not live.
    pub fn animation(&self, handle: SlotHandle) -> ResourceResult<AnimationView<'_>> {
        let entry = self.animations.get(handle)?;
        let bytes = self.animation_pool.bytes(entry.region);
        let count = usize::from(entry.meta.frame_count);
        Ok(AnimationView {
            sequence: &bytes[..count],
            durations: &bytes[entry.meta.durations_at..],
            looping: entry.meta.looping,
        })
    }
}
