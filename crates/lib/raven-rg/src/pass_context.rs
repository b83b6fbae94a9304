use crate::compiled_graph::{GraphPreparedResource, QueueType};
use crate::device::Device;
use crate::error::RgError;
use crate::graph_resource::{GraphResourceHandle, ReadHandle};
use crate::pass::{Pass, PassId, DepthAccess};
use crate::resource::{Texture, RendererList};

/// Physical resources visible to the pass being executed.
pub struct PassResources<'a, D: Device> {
    pub(crate) pass: &'a Pass<D>,
    pub(crate) queue: QueueType,
    pub(crate) registered_resources: &'a [GraphPreparedResource<D>],
}

impl<'a, D: Device> PassResources<'a, D> {
    fn check_declared(&self, handle: GraphResourceHandle) -> Result<&'a GraphPreparedResource<D>, RgError> {
        if !self.pass.declares(handle) {
            return Err(RgError::UndeclaredAccess {
                pass: self.pass.name.clone(),
                handle,
            });
        }

        self.registered_resources.get(handle.id as usize)
            .ok_or(RgError::UnresolvedHandle { handle })
    }

    /// Resolve a texture declared by this pass into its physical texture.
    pub fn texture(&self, handle: impl Into<ReadHandle<Texture>>) -> Result<&'a D::Texture, RgError> {
        let handle = handle.into().handle;

        self.check_declared(handle)?
            .texture()
            .ok_or(RgError::UnresolvedHandle { handle })
    }

    /// Resolve a renderer list used by this pass.
    pub fn renderer_list(&self, handle: ReadHandle<RendererList>) -> Result<&'a D::RendererList, RgError> {
        let handle = handle.handle;

        self.check_declared(handle)?
            .renderer_list()
            .ok_or(RgError::UnresolvedHandle { handle })
    }

    /// Bound color outputs as (slot, written version).
    pub fn color_outputs(&self) -> impl Iterator<Item = (usize, ReadHandle<Texture>)> + 'a {
        let pass = self.pass;
        pass.color_outputs.iter()
            .map(|(slot, handle)| (*slot, ReadHandle::new(*handle)))
    }

    pub fn depth_output(&self) -> Option<(ReadHandle<Texture>, DepthAccess)> {
        self.pass.depth_output
            .map(|(handle, access)| (ReadHandle::new(handle), access))
    }

    /// Renderer lists used by this pass, in declaration order.
    pub fn renderer_lists(&self) -> impl Iterator<Item = ReadHandle<RendererList>> + 'a {
        let pass = self.pass;
        pass.renderer_lists.iter()
            .map(|handle| ReadHandle::new(*handle))
    }
}

/// Render pass context given to the render function of a pass.
///
/// Resolved resources borrow the context for `'a`, not for the duration of the call,
/// so the device can still be used mutably to record work with them.
pub struct PassContext<'a, D: Device> {
    /// Device to record the work of this pass to.
    pub device: &'a mut D,
    pub resources: PassResources<'a, D>,
}

impl<'a, D: Device> PassContext<'a, D> {
    #[inline]
    pub fn pass_id(&self) -> PassId {
        self.resources.pass.id
    }

    #[inline]
    pub fn pass_name(&self) -> &'a str {
        let pass = self.resources.pass;
        &pass.name
    }

    /// Queue this pass had been scheduled on.
    #[inline]
    pub fn queue(&self) -> QueueType {
        self.resources.queue
    }

    #[inline]
    pub fn texture(&self, handle: impl Into<ReadHandle<Texture>>) -> Result<&'a D::Texture, RgError> {
        self.resources.texture(handle)
    }

    #[inline]
    pub fn renderer_list(&self, handle: ReadHandle<RendererList>) -> Result<&'a D::RendererList, RgError> {
        self.resources.renderer_list(handle)
    }
}
