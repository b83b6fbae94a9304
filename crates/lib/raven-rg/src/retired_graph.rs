use crate::compiled_graph::GraphPreparedResource;
use crate::device::Device;
use crate::pass::Pass;
use crate::payload_pool::PassPayloadPool;
use crate::transient_resource_cache::TransientResourceCache;

pub(crate) struct RetiredRenderGraph<D: Device> {
    pub(crate) registered_resources: Vec<GraphPreparedResource<D>>,
    pub(crate) passes: Vec<Pass<D>>,
    pub(crate) payload_pool: PassPayloadPool,
}

impl<D: Device> RetiredRenderGraph<D> {
    /// Release all the resources that is created by the render graph and hand back the payload pool.
    /// These resources might be used in next frame, use cache to avoid frequently create and destroy resources.
    pub fn release_owned_resources(
        self,
        cache: &mut TransientResourceCache<D::Texture>,
    ) -> PassPayloadPool {
        let mut payload_pool = self.payload_pool;

        for res in self.registered_resources.into_iter() {
            match res {
                GraphPreparedResource::CreatedTexture { texture, key } => {
                    cache.store_texture(key, texture);
                }
                GraphPreparedResource::ImportedTexture(_) |
                GraphPreparedResource::RendererList(_) |
                GraphPreparedResource::Pending |
                GraphPreparedResource::Released => {}
            }
        }

        // payloads of culled passes, or of passes after a failing one
        for payload in self.passes.into_iter().filter_map(|pass| pass.payload) {
            payload_pool.recycle(payload);
        }

        payload_pool
    }
}
