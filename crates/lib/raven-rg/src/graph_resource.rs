use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::device::Device;
use crate::resource::{Resource, ResourceKind};
use crate::resource_desc::{TextureDesc, RendererListDesc};

static NEXT_GRAPH_SERIAL: AtomicU32 = AtomicU32::new(1);

/// Every render graph gets an unique serial, handles remember which graph created them.
pub(crate) fn next_graph_serial() -> u32 {
    NEXT_GRAPH_SERIAL.fetch_add(1, Ordering::Relaxed)
}

/// Because GraphResource can NOT have any generic type parameters,
/// we have to create a ResourceDesc for render graph to hold the data.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphResourceDesc {
    Texture(TextureDesc),
    RendererList(RendererListDesc),
}

impl GraphResourceDesc {
    pub fn kind(&self) -> ResourceKind {
        match self {
            GraphResourceDesc::Texture(_) => ResourceKind::Texture,
            GraphResourceDesc::RendererList(_) => ResourceKind::RendererList,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GraphResourceDesc::Texture(desc) => &desc.name,
            GraphResourceDesc::RendererList(desc) => &desc.name,
        }
    }
}

pub(crate) enum GraphResource<D: Device> {
    Created(GraphResourceDesc),
    /// Externally owned texture, never returned to the transient cache.
    Imported {
        desc: TextureDesc,
        raw: Arc<D::Texture>,
    },
}

impl<D: Device> GraphResource<D> {
    pub(crate) fn kind(&self) -> ResourceKind {
        match self {
            GraphResource::Created(desc) => desc.kind(),
            GraphResource::Imported { .. } => ResourceKind::Texture,
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            GraphResource::Created(desc) => desc.name(),
            GraphResource::Imported { desc, .. } => &desc.name,
        }
    }

    pub(crate) fn texture_desc(&self) -> Option<&TextureDesc> {
        match self {
            GraphResource::Created(GraphResourceDesc::Texture(desc)) => Some(desc),
            GraphResource::Imported { desc, .. } => Some(desc),
            GraphResource::Created(GraphResourceDesc::RendererList(_)) => None,
        }
    }

    #[inline]
    pub(crate) fn is_imported(&self) -> bool {
        matches!(self, GraphResource::Imported { .. })
    }
}

/// Untyped render graph resource handle to the inner resources of the render graph.
///
/// Two handles are equal when they point to the same version of the same resource.
#[derive(Clone, Copy, Debug)]
pub struct GraphResourceHandle {
    /// Slot id of the resources in the render graph.
    pub(crate) id: u32,
    /// Version of the resource, bumped on every declared write.
    pub(crate) version: u32,
    pub(crate) kind: ResourceKind,
    /// Serial of the graph this handle belongs to.
    pub(crate) graph: u32,
}

impl GraphResourceHandle {
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// This version had been written, step to the next version.
    #[inline]
    pub(crate) fn next_version(self) -> Self {
        Self {
            version: self.version + 1,
            ..self
        }
    }
}

impl PartialEq for GraphResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version
    }
}

impl Eq for GraphResourceHandle {}

impl Hash for GraphResourceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.version.hash(state);
    }
}

/// Mutable handle of a render graph resource, it can be read and written by passes.
#[derive(Debug)]
pub struct Handle<ResourceType: Resource> {
    pub(crate) handle: GraphResourceHandle,
    pub(crate) _marker: PhantomData<ResourceType>,
}

/// Read only handle of a render graph resource.
#[derive(Debug)]
pub struct ReadHandle<ResourceType: Resource> {
    pub(crate) handle: GraphResourceHandle,
    pub(crate) _marker: PhantomData<ResourceType>,
}

macro_rules! impl_handle_traits {
    ($handle:ident) => {
        impl<ResourceType: Resource> $handle<ResourceType> {
            pub(crate) fn new(handle: GraphResourceHandle) -> Self {
                debug_assert_eq!(handle.kind, ResourceType::KIND);

                Self {
                    handle,
                    _marker: PhantomData,
                }
            }

            #[inline]
            pub fn raw(&self) -> GraphResourceHandle {
                self.handle
            }

            #[inline]
            pub fn version(&self) -> u32 {
                self.handle.version
            }
        }

        // derive() would require ResourceType to be Clone too.
        impl<ResourceType: Resource> Clone for $handle<ResourceType> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<ResourceType: Resource> Copy for $handle<ResourceType> {}

        impl<ResourceType: Resource> PartialEq for $handle<ResourceType> {
            fn eq(&self, other: &Self) -> bool {
                self.handle == other.handle
            }
        }

        impl<ResourceType: Resource> Eq for $handle<ResourceType> {}

        impl<ResourceType: Resource> Hash for $handle<ResourceType> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.handle.hash(state);
            }
        }
    };
}

impl_handle_traits!(Handle);
impl_handle_traits!(ReadHandle);

impl<ResourceType: Resource> Handle<ResourceType> {
    #[inline]
    pub fn read_only(&self) -> ReadHandle<ResourceType> {
        ReadHandle::new(self.handle)
    }
}

impl<ResourceType: Resource> From<Handle<ResourceType>> for ReadHandle<ResourceType> {
    fn from(handle: Handle<ResourceType>) -> Self {
        handle.read_only()
    }
}

impl<ResourceType: Resource> From<&Handle<ResourceType>> for ReadHandle<ResourceType> {
    fn from(handle: &Handle<ResourceType>) -> Self {
        handle.read_only()
    }
}

impl<ResourceType: Resource> From<&ReadHandle<ResourceType>> for ReadHandle<ResourceType> {
    fn from(handle: &ReadHandle<ResourceType>) -> Self {
        *handle
    }
}

impl<ResourceType: Resource> From<Handle<ResourceType>> for GraphResourceHandle {
    fn from(handle: Handle<ResourceType>) -> Self {
        handle.handle
    }
}

impl<ResourceType: Resource> From<ReadHandle<ResourceType>> for GraphResourceHandle {
    fn from(handle: ReadHandle<ResourceType>) -> Self {
        handle.handle
    }
}
