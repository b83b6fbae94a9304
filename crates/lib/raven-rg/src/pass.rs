use std::any::Any;

use arrayvec::ArrayVec;

use crate::device::Device;
use crate::error::RgError;
use crate::graph::RenderGraph;
use crate::graph_resource::{GraphResourceHandle, Handle, ReadHandle};
use crate::pass_context::PassContext;
use crate::resource::{ResourceKind, Texture, RendererList};
use crate::resource_desc::{TextureDesc, RendererListDesc};

/// Multiple render targets limit of a single pass.
pub const MAX_COLOR_OUTPUTS: usize = 8;

pub type RenderFunc<D> = dyn FnOnce(&mut dyn Any, &mut PassContext<'_, D>) -> anyhow::Result<()>;

/// Index of a pass in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a pass uses its depth buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthAccess {
    /// Depth test only.
    Read,
    /// Overwrite without testing against the previous content.
    Write,
    ReadWrite,
}

/// One declared write, from the version the pass saw to the version it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PassWrite {
    pub(crate) from: GraphResourceHandle,
    pub(crate) to: GraphResourceHandle,
}

/// Render Pass in the render graph.
/// Each Pass instructs how GPU should do rendering at a given region of time.
/// Passes only hold handles, the render graph owns the resources.
pub(crate) struct Pass<D: Device> {
    pub(crate) id: PassId,
    pub(crate) name: String,
    /// Every version this pass reads, renderer lists included.
    pub(crate) reads: Vec<GraphResourceHandle>,
    pub(crate) writes: Vec<PassWrite>,
    /// (slot, written version)
    pub(crate) color_outputs: ArrayVec<(usize, GraphResourceHandle), MAX_COLOR_OUTPUTS>,
    pub(crate) depth_output: Option<(GraphResourceHandle, DepthAccess)>,
    pub(crate) renderer_lists: Vec<GraphResourceHandle>,
    pub(crate) async_compute: bool,
    pub(crate) never_cull: bool,
    pub(crate) payload: Option<Box<dyn Any>>,
    /// Render callback function.
    pub(crate) render_func: Option<Box<RenderFunc<D>>>,
}

impl<D: Device> Pass<D> {
    /// Create a new empty pass.
    pub(crate) fn new_empty(id: PassId, name: String) -> Self {
        Self {
            id,
            name,
            reads: Vec::new(),
            writes: Vec::new(),
            color_outputs: ArrayVec::new(),
            depth_output: None,
            renderer_lists: Vec::new(),
            async_compute: false,
            never_cull: false,
            payload: None,
            render_func: None,
        }
    }

    /// A pass touching no resource at all only exists for its side effects.
    #[inline]
    pub(crate) fn has_resource_access(&self) -> bool {
        !self.reads.is_empty() || !self.writes.is_empty()
    }

    /// Why this pass can not leave the graphics queue, if it can't.
    pub(crate) fn graphics_only_reason(&self) -> Option<&'static str> {
        if !self.color_outputs.is_empty() {
            Some("it binds color outputs")
        } else if self.depth_output.is_some() {
            Some("it binds a depth output")
        } else if !self.renderer_lists.is_empty() {
            Some("it draws renderer lists")
        } else if !self.has_resource_access() {
            Some("it does not access any resource")
        } else {
            None
        }
    }

    /// Every resource version this pass declared, either as input or as output.
    pub(crate) fn declares(&self, handle: GraphResourceHandle) -> bool {
        self.reads.contains(&handle) ||
        self.writes.iter().any(|write| write.from == handle || write.to == handle)
    }

    /// Ids of every resource this pass touches, may contain duplicates.
    pub(crate) fn touched_resources(&self) -> impl Iterator<Item = u32> + '_ {
        self.reads.iter()
            .map(|handle| handle.id)
            .chain(self.writes.iter().map(|write| write.to.id))
    }
}

/// Helper struct to build a Pass.
///
/// The pass is added to the render graph when the builder is dropped, usually right after
/// [`PassBuilder::render`] consumed it.
pub struct PassBuilder<'rg, D: Device> {
    pub(crate) rg: &'rg mut RenderGraph<D>,
    pub(crate) pass: Pass<D>,
}

impl<'rg, D: Device> Drop for PassBuilder<'rg, D> {
    /// When dropping, add the built pass back into the render graph to finish adding.
    fn drop(&mut self) {
        let id = self.pass.id;
        let pass = std::mem::replace(&mut self.pass, Pass::new_empty(id, String::new()));

        if pass.render_func.is_none() && !std::thread::panicking() {
            let err = RgError::MissingCallback { pass: pass.name.clone() };
            glog::error!("{}", err);
            self.rg.record_declaration_error(err);
        }

        glog::trace!("Finish declaring pass {:?}", pass.name);
        self.rg.finish_add_pass(pass);
    }
}

impl<'rg, D: Device> PassBuilder<'rg, D> {
    #[inline]
    pub fn id(&self) -> PassId {
        self.pass.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.pass.name
    }

    /// Description of a texture of this render graph.
    pub fn texture_desc(&self, handle: impl Into<ReadHandle<Texture>>) -> Option<&TextureDesc> {
        self.rg.registry.texture_desc(handle.into().handle)
    }

    /// Create a texture of the render graph. No physical texture is allocated now.
    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<Handle<Texture>, RgError> {
        self.rg.registry.create_texture(desc)
            .map_err(|err| self.report(err))
    }

    /// Read-In texture to be used in this pass.
    ///
    /// The pass will observe exactly the version of the handle, even if the texture is written later.
    pub fn read_texture(&mut self, handle: impl Into<ReadHandle<Texture>>) -> Result<ReadHandle<Texture>, RgError> {
        let handle = handle.into();
        self.read_raw(handle.handle, ResourceKind::Texture)?;

        Ok(handle)
    }

    /// Write-Out texture in this pass.
    ///
    /// `handle` is stepped to the written version, which is also returned.
    pub fn write_texture(&mut self, handle: &mut Handle<Texture>) -> Result<Handle<Texture>, RgError> {
        let written = self.write_raw(handle.handle)?;
        *handle = Handle::new(written);

        Ok(*handle)
    }

    /// Bind a texture as the color render target at `slot`. This is a write.
    pub fn use_color_output(&mut self, handle: &mut Handle<Texture>, slot: usize) -> Result<Handle<Texture>, RgError> {
        let raw = handle.handle;

        if slot >= MAX_COLOR_OUTPUTS {
            return Err(self.invalid_use(raw, "color output slot out of range"));
        }
        if self.pass.color_outputs.iter().any(|(bound, _)| *bound == slot) {
            return Err(self.invalid_use(raw, "color output slot is already bound"));
        }
        if self.bound_format_is_depth(raw)? {
            return Err(self.invalid_use(raw, "depth format bound as color output"));
        }

        let written = self.write_texture(handle)?;
        self.pass.color_outputs.push((slot, written.handle));

        Ok(written)
    }

    /// Bind a texture as the depth buffer. Only [`DepthAccess::Read`] leaves the texture at its current version.
    pub fn use_depth_output(&mut self, handle: &mut Handle<Texture>, access: DepthAccess) -> Result<Handle<Texture>, RgError> {
        let raw = handle.handle;

        if self.pass.depth_output.is_some() {
            return Err(self.invalid_use(raw, "depth output is already bound"));
        }
        if !self.bound_format_is_depth(raw)? {
            return Err(self.invalid_use(raw, "color format bound as depth output"));
        }

        let bound = match access {
            DepthAccess::Read => {
                self.read_raw(raw, ResourceKind::Texture)?;
                *handle
            }
            DepthAccess::Write => self.write_texture(handle)?,
            DepthAccess::ReadWrite => {
                self.read_raw(raw, ResourceKind::Texture)?;
                self.write_texture(handle)?
            }
        };
        self.pass.depth_output = Some((bound.handle, access));

        Ok(bound)
    }

    /// Create a renderer list. It still has to be used by a pass to be drawn.
    pub fn create_renderer_list(&mut self, desc: RendererListDesc) -> Result<ReadHandle<RendererList>, RgError> {
        self.rg.registry.create_renderer_list(desc)
            .map_err(|err| self.report(err))
    }

    pub fn use_renderer_list(&mut self, handle: ReadHandle<RendererList>) -> Result<ReadHandle<RendererList>, RgError> {
        self.read_raw(handle.handle, ResourceKind::RendererList)?;

        if !self.pass.renderer_lists.contains(&handle.handle) {
            self.pass.renderer_lists.push(handle.handle);
        }
        Ok(handle)
    }

    pub fn create_and_use_renderer_list(&mut self, desc: RendererListDesc) -> Result<ReadHandle<RendererList>, RgError> {
        let handle = self.create_renderer_list(desc)?;
        self.use_renderer_list(handle)
    }

    /// Hint the scheduler to run this pass on the async compute queue.
    /// It is ignored when the pass needs the graphics queue.
    pub fn enable_async_compute(&mut self, enable: bool) {
        self.pass.async_compute = enable;
    }

    /// Keep this pass even if nothing consumes its outputs.
    pub fn never_cull(&mut self) {
        self.pass.never_cull = true;
    }

    /// Get a default payload for this pass, recycled from previous frames when possible.
    pub fn payload<T: Default + Any>(&mut self) -> Box<T> {
        self.rg.payload_pool.take::<T>()
    }

    /// Add render function with its payload to this pass and close the declaration.
    pub fn render<T, F>(mut self, payload: Box<T>, func: F)
    where
        T: Any,
        F: FnOnce(&mut T, &mut PassContext<'_, D>) -> anyhow::Result<()> + 'static,
    {
        self.pass.payload = Some(payload as Box<dyn Any>);
        self.pass.render_func = Some(box_render_func(func));
    }

    /// Add render function without payload to this pass and close the declaration.
    pub fn render_fn<F>(self, func: F)
    where
        F: FnOnce(&mut PassContext<'_, D>) -> anyhow::Result<()> + 'static,
    {
        self.render(Box::new(()), move |_: &mut (), ctx: &mut PassContext<'_, D>| func(ctx));
    }

    fn bound_format_is_depth(&mut self, raw: GraphResourceHandle) -> Result<bool, RgError> {
        let is_depth = self.rg.registry.check(raw, ResourceKind::Texture)
            .map(|entry| entry.resource.texture_desc().map_or(false, |desc| desc.format().is_depth()));

        is_depth.map_err(|reason| self.invalid_use(raw, reason))
    }

    fn read_raw(&mut self, raw: GraphResourceHandle, kind: ResourceKind) -> Result<(), RgError> {
        if let Err(reason) = self.rg.registry.record_read(self.pass.id, raw, kind) {
            return Err(self.invalid_use(raw, reason));
        }

        if !self.pass.reads.contains(&raw) {
            self.pass.reads.push(raw);
        }
        Ok(())
    }

    fn write_raw(&mut self, raw: GraphResourceHandle) -> Result<GraphResourceHandle, RgError> {
        match self.rg.registry.record_write(self.pass.id, raw) {
            Ok(to) => {
                self.pass.writes.push(PassWrite { from: raw, to });
                Ok(to)
            }
            Err(reason) => Err(self.invalid_use(raw, reason)),
        }
    }

    fn invalid_use(&mut self, handle: GraphResourceHandle, reason: &'static str) -> RgError {
        self.report(RgError::InvalidHandleUse {
            pass: self.pass.name.clone(),
            handle,
            reason,
        })
    }

    fn report(&mut self, err: RgError) -> RgError {
        glog::error!("{}", err);
        self.rg.record_declaration_error(err.clone());
        err
    }
}

fn box_render_func<D, T, F>(func: F) -> Box<RenderFunc<D>>
where
    D: Device,
    T: Any,
    F: FnOnce(&mut T, &mut PassContext<'_, D>) -> anyhow::Result<()> + 'static,
{
    Box::new(move |payload: &mut dyn Any, ctx: &mut PassContext<'_, D>| {
        let payload = payload.downcast_mut::<T>()
            .ok_or_else(|| anyhow::anyhow!("Pass payload is not a {}", std::any::type_name::<T>()))?;

        func(payload, ctx)
    })
}
