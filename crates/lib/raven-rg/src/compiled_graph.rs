use std::sync::Arc;

use crate::device::Device;
use crate::executing_graph::ExecutingRenderGraph;
use crate::executor::ExecuteParams;
use crate::graph::RenderGraph;
use crate::graph_resource::{GraphResource, GraphResourceHandle};
use crate::pass::PassId;
use crate::resource_desc::TextureKey;
use crate::transient_resource_cache::TransientResourceCache;

/// Queue a pass is submitted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    AsyncCompute,
}

/// Cross queue synchronization: `consumer` must not start before `producer` completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueueSync {
    pub producer: PassId,
    pub producer_queue: QueueType,
    pub consumer: PassId,
    pub consumer_queue: QueueType,
}

/// Positions in the final pass order between which a resource must stay physically alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first: usize,
    pub last: usize,
}

impl ResourceLifetime {
    #[inline]
    pub fn overlaps(&self, other: &ResourceLifetime) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

pub(crate) struct ScheduledPass {
    pub(crate) pass: PassId,
    pub(crate) queue: QueueType,
    /// Resource ids to realize before the pass runs.
    pub(crate) acquire: Vec<u32>,
    /// Resource ids to give back to the cache once the pass ran.
    pub(crate) release: Vec<u32>,
    pub(crate) waits: Vec<QueueSync>,
}

/// Culled and ordered render graph, ready to be executed once.
pub struct CompiledRenderGraph<D: Device> {
    pub(crate) render_graph: RenderGraph<D>,
    pub(crate) schedule: Vec<ScheduledPass>,
    pub(crate) culled: Vec<PassId>,
    pub(crate) lifetimes: Vec<Option<ResourceLifetime>>,
    /// Position of every pass in the final order, `None` for culled ones.
    pub(crate) positions: Vec<Option<usize>>,
}

impl<D: Device> CompiledRenderGraph<D> {
    /// Final submission order of the live passes.
    pub fn pass_order(&self) -> Vec<PassId> {
        self.schedule.iter().map(|scheduled| scheduled.pass).collect()
    }

    /// Names of the live passes, in submission order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.schedule.iter()
            .map(|scheduled| self.pass_name(scheduled.pass))
            .collect()
    }

    /// Submission order of the passes running on one queue.
    pub fn queue_order(&self, queue: QueueType) -> Vec<PassId> {
        self.schedule.iter()
            .filter(|scheduled| scheduled.queue == queue)
            .map(|scheduled| scheduled.pass)
            .collect()
    }

    pub fn culled_passes(&self) -> &[PassId] {
        &self.culled
    }

    #[inline]
    pub fn is_culled(&self, pass: PassId) -> bool {
        self.position(pass).is_none()
    }

    pub fn position(&self, pass: PassId) -> Option<usize> {
        self.positions.get(pass.index()).copied().flatten()
    }

    pub fn queue_of(&self, pass: PassId) -> Option<QueueType> {
        self.position(pass).map(|position| self.schedule[position].queue)
    }

    /// Synchronizations the pass waits on before it starts.
    pub fn waits_of(&self, pass: PassId) -> &[QueueSync] {
        match self.position(pass) {
            Some(position) => &self.schedule[position].waits,
            None => &[],
        }
    }

    pub fn queue_syncs(&self) -> impl Iterator<Item = &QueueSync> + '_ {
        self.schedule.iter().flat_map(|scheduled| scheduled.waits.iter())
    }

    /// Lifetime of the resource behind `handle` (any version), `None` if it is never used by a live pass.
    pub fn lifetime(&self, handle: impl Into<GraphResourceHandle>) -> Option<ResourceLifetime> {
        self.lifetimes.get(handle.into().id as usize).copied().flatten()
    }

    pub fn pass_name(&self, pass: PassId) -> &str {
        &self.render_graph.passes[pass.index()].name
    }

    pub fn pass_id(&self, name: &str) -> Option<PassId> {
        self.render_graph.passes.iter()
            .find(|pass| pass.name == name)
            .map(|pass| pass.id)
    }

    /// Gather imported resources and get ready to realize the transient ones.
    #[must_use]
    pub(crate) fn prepare_execute<'exec>(
        self,
        params: &'exec ExecuteParams,
        device: &'exec mut D,
        cache: &'exec mut TransientResourceCache<D::Texture>,
    ) -> ExecutingRenderGraph<'exec, D> {
        let RenderGraph { passes, registry, payload_pool, .. } = self.render_graph;

        let native_resources: Vec<GraphResource<D>> = registry.entries.into_iter()
            .map(|entry| entry.resource)
            .collect();

        let registered_resources = native_resources.iter()
            .map(|resource| match resource {
                GraphResource::Imported { raw, .. } => GraphPreparedResource::ImportedTexture(raw.clone()),
                GraphResource::Created(_) => GraphPreparedResource::Pending,
            })
            .collect();

        ExecutingRenderGraph {
            params,
            device,
            cache,
            passes,
            schedule: self.schedule,
            native_resources,
            registered_resources,
            payload_pool,
        }
    }
}

/// Physical state of a graph resource during execution.
pub(crate) enum GraphPreparedResource<D: Device> {
    /// Not realized yet, its lifetime has not begun.
    Pending,
    CreatedTexture {
        texture: D::Texture,
        key: TextureKey,
    },
    ImportedTexture(Arc<D::Texture>),
    RendererList(D::RendererList),
    /// Its lifetime is over, the physical resource went back to the cache.
    Released,
}

impl<D: Device> GraphPreparedResource<D> {
    pub(crate) fn texture(&self) -> Option<&D::Texture> {
        match self {
            GraphPreparedResource::CreatedTexture { texture, .. } => Some(texture),
            GraphPreparedResource::ImportedTexture(texture) => Some(&**texture),
            _ => None,
        }
    }

    pub(crate) fn renderer_list(&self) -> Option<&D::RendererList> {
        match self {
            GraphPreparedResource::RendererList(list) => Some(list),
            _ => None,
        }
    }
}
