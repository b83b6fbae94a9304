use std::collections::HashMap;

use crate::device::Device;
use crate::resource_desc::TextureKey;

/// Hit and miss counters of the transient resource cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Transient resource cache to cache resources created by the render graph.
///
/// # Note
///
/// Textures whose lifetime ended are stored back here, later passes of the same frame (aliasing)
/// and passes of the next frames pick them up again when they ask for the same [`TextureKey`].
/// A texture sits either in the cache or in exactly one live lifetime, never both.
pub struct TransientResourceCache<Tex> {
    textures: HashMap<TextureKey, Vec<Tex>>,
    stats: CacheStats,
}

impl<Tex> Default for TransientResourceCache<Tex> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tex> TransientResourceCache<Tex> {
    pub fn new() -> Self {
        Self {
            textures: Default::default(),
            stats: Default::default(),
        }
    }

    pub fn get_texture(&mut self, key: &TextureKey) -> Option<Tex> {
        let texture = self.textures.get_mut(key).and_then(|vec| vec.pop());

        if texture.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        texture
    }

    pub fn store_texture(&mut self, key: TextureKey, texture: Tex) {
        self.textures.entry(key).or_default().push(texture);
    }

    /// Number of textures waiting to be reused.
    pub fn len(&self) -> usize {
        self.textures.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Destroy every cached texture.
    pub fn clean<D: Device<Texture = Tex>>(&mut self, device: &mut D) {
        for (_, textures) in self.textures.drain() {
            for texture in textures {
                device.destroy_texture(texture);
            }
        }
    }
}
