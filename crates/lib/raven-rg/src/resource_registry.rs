use std::sync::Arc;

use crate::device::Device;
use crate::error::RgError;
use crate::graph_resource::{GraphResource, GraphResourceDesc, GraphResourceHandle, Handle, ReadHandle};
use crate::pass::PassId;
use crate::resource::{ResourceKind, Texture, RendererList};
use crate::resource_desc::{TextureDesc, RendererListDesc};

/// Who wrote and who read one version of a resource.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResourceVersion {
    /// `None` for the initial version of a resource.
    pub(crate) writer: Option<PassId>,
    pub(crate) readers: Vec<PassId>,
}

pub(crate) struct RegistryEntry<D: Device> {
    pub(crate) resource: GraphResource<D>,
    /// Indexed by version.
    pub(crate) versions: Vec<ResourceVersion>,
}

impl<D: Device> RegistryEntry<D> {
    #[inline]
    pub(crate) fn current_version(&self) -> u32 {
        (self.versions.len() - 1) as u32
    }
}

/// Logical resources of one frame.
///
/// Maps handles to their descriptions and tracks the writer and the readers of every version.
/// Only physical resources outlive the registry, through the transient resource cache.
pub struct ResourceRegistry<D: Device> {
    graph: u32,
    pub(crate) entries: Vec<RegistryEntry<D>>,
}

impl<D: Device> ResourceRegistry<D> {
    pub(crate) fn new(graph: u32) -> Self {
        Self {
            graph,
            entries: Vec::new(),
        }
    }

    fn push_entry(&mut self, resource: GraphResource<D>) -> GraphResourceHandle {
        let handle = GraphResourceHandle {
            id: self.entries.len() as u32,
            version: 0,
            kind: resource.kind(),
            graph: self.graph,
        };

        self.entries.push(RegistryEntry {
            resource,
            versions: vec![ResourceVersion::default()],
        });
        handle
    }

    pub(crate) fn create_texture(&mut self, desc: TextureDesc) -> Result<Handle<Texture>, RgError> {
        desc.validate()?;
        Ok(Handle::new(self.push_entry(GraphResource::Created(GraphResourceDesc::Texture(desc)))))
    }

    pub(crate) fn create_renderer_list(&mut self, desc: RendererListDesc) -> Result<ReadHandle<RendererList>, RgError> {
        desc.validate()?;
        Ok(ReadHandle::new(self.push_entry(GraphResource::Created(GraphResourceDesc::RendererList(desc)))))
    }

    pub(crate) fn import_texture(&mut self, desc: TextureDesc, raw: Arc<D::Texture>) -> Result<Handle<Texture>, RgError> {
        desc.validate()?;
        Ok(Handle::new(self.push_entry(GraphResource::Imported { desc, raw })))
    }

    /// Check that the handle points to an existing version of a resource of this graph.
    pub(crate) fn check(&self, handle: GraphResourceHandle, kind: ResourceKind) -> Result<&RegistryEntry<D>, &'static str> {
        if handle.graph != self.graph {
            return Err("handle belongs to another render graph");
        }
        if handle.kind != kind {
            return Err("handle refers to a resource of another kind");
        }

        let entry = self.entries.get(handle.id as usize)
            .ok_or("handle index out of range")?;

        if entry.resource.kind() != kind {
            return Err("handle refers to a resource of another kind");
        }
        if handle.version > entry.current_version() {
            return Err("handle version does not exist");
        }

        Ok(entry)
    }

    /// Record `pass` as the writer of the next version of the resource and return the handle to that version.
    pub(crate) fn record_write(&mut self, pass: PassId, handle: GraphResourceHandle) -> Result<GraphResourceHandle, &'static str> {
        let entry = self.check(handle, ResourceKind::Texture)?;
        if handle.version != entry.current_version() {
            return Err("write through a stale handle, the resource has been written since");
        }

        self.entries[handle.id as usize].versions.push(ResourceVersion {
            writer: Some(pass),
            readers: Vec::new(),
        });

        Ok(handle.next_version())
    }

    /// Record `pass` as a reader of exactly this version of the resource.
    pub(crate) fn record_read(&mut self, pass: PassId, handle: GraphResourceHandle, kind: ResourceKind) -> Result<(), &'static str> {
        self.check(handle, kind)?;

        let readers = &mut self.entries[handle.id as usize].versions[handle.version as usize].readers;
        if !readers.contains(&pass) {
            readers.push(pass);
        }

        Ok(())
    }

    #[inline]
    pub(crate) fn version(&self, handle: GraphResourceHandle) -> &ResourceVersion {
        &self.entries[handle.id as usize].versions[handle.version as usize]
    }

    /// Handle to the latest version of the resource `id`.
    pub(crate) fn latest(&self, id: u32) -> GraphResourceHandle {
        let entry = &self.entries[id as usize];

        GraphResourceHandle {
            id,
            version: entry.current_version(),
            kind: entry.resource.kind(),
            graph: self.graph,
        }
    }

    pub fn texture_desc(&self, handle: GraphResourceHandle) -> Option<&TextureDesc> {
        self.entries.get(handle.id as usize)
            .and_then(|entry| entry.resource.texture_desc())
    }

    pub fn name(&self, handle: GraphResourceHandle) -> Option<&str> {
        self.entries.get(handle.id as usize)
            .map(|entry| entry.resource.name())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
