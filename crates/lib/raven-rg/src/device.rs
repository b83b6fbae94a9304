use crate::compiled_graph::QueueSync;
use crate::resource_desc::{ResolvedTextureDesc, RendererListDesc};

/// The physical side of the render graph.
///
/// The render graph never creates GPU objects on its own, it asks the device when a transient
/// resource is not available in the cache. Textures created here must match the resolved description exactly,
/// they are pooled by [`TextureKey`](crate::TextureKey) and handed to later passes with the same key.
pub trait Device: Sized + 'static {
    type Texture;
    type RendererList;

    fn create_texture(&mut self, desc: &ResolvedTextureDesc) -> anyhow::Result<Self::Texture>;

    fn create_renderer_list(&mut self, desc: &RendererListDesc) -> anyhow::Result<Self::RendererList>;

    /// Called when a texture flagged with `clear_buffer` is acquired for the first time in a frame.
    fn clear_texture(&mut self, _texture: &Self::Texture, _color: [f32; 4]) -> anyhow::Result<()> {
        Ok(())
    }

    /// The consumer pass is about to run, it must wait for the producer on the other queue.
    fn queue_sync(&mut self, _sync: &QueueSync) {}

    /// Called when the transient resource cache is cleaned.
    fn destroy_texture(&mut self, _texture: Self::Texture) {}
}
