use super::graph_resource::GraphResourceDesc;
use super::resource_desc::{TextureDesc, RendererListDesc};

/// Logical resource kind tag carried by every raw handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    RendererList,
}

/// Any logical resource the render graph can track.
///
/// The types implementing this are only markers, the physical objects are provided by the [`Device`](crate::Device).
pub trait Resource: 'static {
    const KIND: ResourceKind;

    type Desc: ResourceDesc;
}

/// Marker of texture resources (render targets, storage images, depth buffers).
#[derive(Debug)]
pub struct Texture;

/// Marker of renderer lists (filtered and sorted sets of draw calls).
#[derive(Debug)]
pub struct RendererList;

impl Resource for Texture {
    const KIND: ResourceKind = ResourceKind::Texture;

    type Desc = TextureDesc;
}

impl Resource for RendererList {
    const KIND: ResourceKind = ResourceKind::RendererList;

    type Desc = RendererListDesc;
}

/// Any outer resource description.
pub trait ResourceDesc: Clone + Into<GraphResourceDesc> + std::fmt::Debug {
    type Resource: Resource;
}

impl ResourceDesc for TextureDesc {
    type Resource = Texture;
}

impl ResourceDesc for RendererListDesc {
    type Resource = RendererList;
}

impl From<TextureDesc> for GraphResourceDesc {
    fn from(desc: TextureDesc) -> Self {
        GraphResourceDesc::Texture(desc)
    }
}

impl From<RendererListDesc> for GraphResourceDesc {
    fn from(desc: RendererListDesc) -> Self {
        GraphResourceDesc::RendererList(desc)
    }
}
