use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::compiled_graph::{CompiledRenderGraph, QueueSync, QueueType, ResourceLifetime, ScheduledPass};
use crate::device::Device;
use crate::error::RgError;
use crate::executor::RenderGraphConfig;
use crate::graph_resource::{next_graph_serial, GraphResourceHandle, Handle, ReadHandle};
use crate::pass::{Pass, PassBuilder, PassId};
use crate::payload_pool::PassPayloadPool;
use crate::resource::{ResourceKind, Texture};
use crate::resource_desc::TextureDesc;
use crate::resource_registry::ResourceRegistry;

struct FrameSchedule {
    schedule: Vec<ScheduledPass>,
    culled: Vec<PassId>,
    lifetimes: Vec<Option<ResourceLifetime>>,
    positions: Vec<Option<usize>>,
}

/// Render graph of one frame.
///
/// Passes are declared through [`RenderGraph::add_pass`], then the graph is compiled once and executed once.
pub struct RenderGraph<D: Device> {
    pub(crate) passes: Vec<Pass<D>>,
    pub(crate) registry: ResourceRegistry<D>,
    pub(crate) exported_resources: Vec<GraphResourceHandle>,
    pub(crate) payload_pool: PassPayloadPool,
    pub(crate) config: RenderGraphConfig,
    declaration_errors: Vec<RgError>,
}

impl<D: Device> Default for RenderGraph<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> RenderGraph<D> {
    pub fn new() -> Self {
        Self::with_config(RenderGraphConfig::default())
    }

    pub fn with_config(config: RenderGraphConfig) -> Self {
        Self::from_parts(config, PassPayloadPool::new())
    }

    pub(crate) fn from_parts(config: RenderGraphConfig, payload_pool: PassPayloadPool) -> Self {
        Self {
            passes: Vec::new(),
            registry: ResourceRegistry::new(next_graph_serial()),
            exported_resources: Vec::new(),
            payload_pool,
            config,
            declaration_errors: Vec::new(),
        }
    }

    /// Add a new render pass to the render graph.
    pub fn add_pass<'rg>(&'rg mut self, name: &str) -> PassBuilder<'rg, D> {
        let curr_pass_idx = PassId(self.passes.len() as u32);

        PassBuilder {
            rg: self,
            pass: Pass::new_empty(curr_pass_idx, name.to_string()),
        }
    }

    /// Actully add the new pass to the render graph.
    pub(crate) fn finish_add_pass(&mut self, pass: Pass<D>) {
        self.passes.push(pass);
    }

    pub(crate) fn record_declaration_error(&mut self, err: RgError) {
        self.declaration_errors.push(err);
    }

    /// Create a texture outside of any pass, e.g. a resource shared by several features.
    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<Handle<Texture>, RgError> {
        self.registry.create_texture(desc)
            .map_err(|err| self.report(err))
    }

    /// Bring an externally owned texture (back buffer, history buffer) into this frame.
    ///
    /// Imported textures are never pooled, and their last written version is a terminal output of the frame.
    pub fn import_texture(&mut self, desc: TextureDesc, raw: Arc<D::Texture>) -> Result<Handle<Texture>, RgError> {
        self.registry.import_texture(desc, raw)
            .map_err(|err| self.report(err))
    }

    /// Mark this version of the texture as a terminal output of the frame.
    /// Its producers are never culled and it stays alive until the end of the frame.
    pub fn export(&mut self, handle: impl Into<ReadHandle<Texture>>) -> Result<(), RgError> {
        let handle = handle.into().handle;

        if let Err(reason) = self.registry.check(handle, ResourceKind::Texture) {
            return Err(self.report(RgError::InvalidHandleUse {
                pass: String::from("<export>"),
                handle,
                reason,
            }));
        }

        if !self.exported_resources.contains(&handle) {
            self.exported_resources.push(handle);
        }
        Ok(())
    }

    #[inline]
    pub fn registry(&self) -> &ResourceRegistry<D> {
        &self.registry
    }

    pub fn texture_desc(&self, handle: impl Into<ReadHandle<Texture>>) -> Option<&TextureDesc> {
        self.registry.texture_desc(handle.into().handle)
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn config(&self) -> &RenderGraphConfig {
        &self.config
    }

    fn report(&mut self, err: RgError) -> RgError {
        glog::error!("{}", err);
        self.record_declaration_error(err.clone());
        err
    }
}

/// Dependencies of every pass, as indices of the passes it must run after.
struct PassDependencies {
    /// Passes producing data this pass consumes (read-after-write and write-after-write).
    producers: Vec<Vec<usize>>,
    /// Producers plus the readers of every version this pass overwrites (write-after-read).
    all: Vec<Vec<usize>>,
}

/// Compile Render Graph relative functions.
impl<D: Device> RenderGraph<D> {
    fn analyze_dependencies(&self) -> Result<PassDependencies, RgError> {
        let mut producers = Vec::with_capacity(self.passes.len());
        let mut all = Vec::with_capacity(self.passes.len());

        for (pass_idx, pass) in self.passes.iter().enumerate() {
            let mut pass_producers = Vec::new();
            let mut pass_all = Vec::new();

            for read in &pass.reads {
                if let Some(writer) = self.registry.version(*read).writer {
                    // reading a version the pass writes itself can never be satisfied
                    if writer.index() == pass_idx {
                        return Err(RgError::CyclicDependency { passes: vec![pass.name.clone()] });
                    }
                    pass_producers.push(writer.index());
                }
            }

            for write in &pass.writes {
                let prev = self.registry.version(write.from);

                if let Some(writer) = prev.writer.filter(|writer| writer.index() != pass_idx) {
                    pass_producers.push(writer.index());
                }
                pass_all.extend(prev.readers.iter()
                    .map(|reader| reader.index())
                    .filter(|reader| *reader != pass_idx));
            }

            pass_producers.sort_unstable();
            pass_producers.dedup();

            pass_all.extend_from_slice(&pass_producers);
            pass_all.sort_unstable();
            pass_all.dedup();

            producers.push(pass_producers);
            all.push(pass_all);
        }

        Ok(PassDependencies { producers, all })
    }

    /// Passes that must survive culling, whatever consumes their outputs.
    fn collect_root_passes(&self) -> Result<Vec<usize>, RgError> {
        let mut roots = Vec::new();

        for handle in &self.exported_resources {
            match self.registry.version(*handle).writer {
                Some(writer) => roots.push(writer.index()),
                None if self.registry.entries[handle.id as usize].resource.is_imported() => {}
                None => return Err(RgError::UnresolvableOutput { handle: *handle }),
            }
        }

        // whatever is written into an imported resource is observed outside of the frame
        for (id, entry) in self.registry.entries.iter().enumerate() {
            if entry.resource.is_imported() {
                if let Some(writer) = self.registry.version(self.registry.latest(id as u32)).writer {
                    roots.push(writer.index());
                }
            }
        }

        roots.extend(self.passes.iter()
            .filter(|pass| pass.never_cull || !pass.has_resource_access())
            .map(|pass| pass.id.index()));

        Ok(roots)
    }

    fn find_live_passes(&self, roots: Vec<usize>, deps: &PassDependencies) -> Vec<bool> {
        let mut live = vec![false; self.passes.len()];
        let mut stack = roots;

        while let Some(pass_idx) = stack.pop() {
            if live[pass_idx] {
                continue;
            }
            live[pass_idx] = true;

            stack.extend(deps.producers[pass_idx].iter()
                .copied()
                .filter(|producer| !live[*producer]));
        }

        live
    }

    fn cyclic_dependency_error(&self, blocked: Vec<usize>, deps: &PassDependencies) -> RgError {
        let passes = passes_on_cycles(blocked, &deps.all).into_iter()
            .map(|pass_idx| self.passes[pass_idx].name.clone())
            .collect();

        RgError::CyclicDependency { passes }
    }

    fn assign_queue(&self, pass: &Pass<D>) -> QueueType {
        if !pass.async_compute {
            return QueueType::Graphics;
        }

        if !self.config.async_compute {
            glog::trace!("Async compute is disabled, pass {:?} runs on the graphics queue", pass.name);
            return QueueType::Graphics;
        }

        match pass.graphics_only_reason() {
            Some(reason) => {
                glog::warn!("Pass {:?} asks for async compute but {}, it runs on the graphics queue", pass.name, reason);
                QueueType::Graphics
            }
            None => QueueType::AsyncCompute,
        }
    }

    /// Cull, order and schedule all the passes.
    ///
    /// Any declaration error recorded while building the graph fails the compilation, nothing is executed.
    pub fn compile(self) -> Result<CompiledRenderGraph<D>, RgError> {
        self.compile_or_recover().map_err(|(err, _)| err)
    }

    /// Same as [`RenderGraph::compile`], but a failure hands the payload pool back.
    pub(crate) fn compile_or_recover(mut self) -> Result<CompiledRenderGraph<D>, (RgError, PassPayloadPool)> {
        match self.build_schedule() {
            Ok(FrameSchedule { schedule, culled, lifetimes, positions }) => Ok(CompiledRenderGraph {
                render_graph: self,
                schedule,
                culled,
                lifetimes,
                positions,
            }),
            Err(err) => Err((err, self.into_payload_pool())),
        }
    }

    /// Drop the graph without executing it, the payloads of its passes go back to the pool.
    pub(crate) fn into_payload_pool(self) -> PassPayloadPool {
        let mut payload_pool = self.payload_pool;

        for payload in self.passes.into_iter().filter_map(|pass| pass.payload) {
            payload_pool.recycle(payload);
        }
        payload_pool
    }

    fn build_schedule(&mut self) -> Result<FrameSchedule, RgError> {
        if !self.declaration_errors.is_empty() {
            glog::error!("Render graph has {} declaration error(s), the frame is dropped", self.declaration_errors.len());
            return Err(self.declaration_errors.swap_remove(0));
        }

        let deps = self.analyze_dependencies()?;

        // detect cycles on the whole graph, even between passes that are culled afterwards
        let all_passes = vec![true; self.passes.len()];
        stable_topological_order(&deps.all, &all_passes)
            .map_err(|blocked| self.cyclic_dependency_error(blocked, &deps))?;

        let roots = self.collect_root_passes()?;
        let live = if self.config.culling {
            self.find_live_passes(roots, &deps)
        } else {
            all_passes
        };

        let order = stable_topological_order(&deps.all, &live)
            .map_err(|blocked| self.cyclic_dependency_error(blocked, &deps))?;

        let culled: Vec<PassId> = self.passes.iter()
            .filter(|pass| !live[pass.id.index()])
            .map(|pass| pass.id)
            .collect();
        for pass_id in &culled {
            glog::trace!("Cull pass {:?}", self.passes[pass_id.index()].name);
        }

        let mut positions = vec![None; self.passes.len()];
        for (position, pass_idx) in order.iter().enumerate() {
            positions[*pass_idx] = Some(position);
        }

        let queues: Vec<QueueType> = order.iter()
            .map(|pass_idx| self.assign_queue(&self.passes[*pass_idx]))
            .collect();

        // every consumer waits for the latest of its producers on the other queue
        let mut waits = vec![Vec::new(); order.len()];
        for (position, pass_idx) in order.iter().enumerate() {
            let consumer_queue = queues[position];

            let latest_producer = deps.all[*pass_idx].iter()
                .filter_map(|dep| positions[*dep])
                .filter(|dep_position| queues[*dep_position] != consumer_queue)
                .max();

            if let Some(producer_position) = latest_producer {
                waits[position].push(QueueSync {
                    producer: PassId(order[producer_position] as u32),
                    producer_queue: queues[producer_position],
                    consumer: PassId(*pass_idx as u32),
                    consumer_queue,
                });
            }
        }

        let lifetimes = self.analyze_lifetimes(&order, &queues);

        let mut schedule: Vec<ScheduledPass> = order.iter()
            .zip(queues.iter())
            .zip(waits.into_iter())
            .map(|((pass_idx, queue), waits)| ScheduledPass {
                pass: PassId(*pass_idx as u32),
                queue: *queue,
                acquire: Vec::new(),
                release: Vec::new(),
                waits,
            })
            .collect();

        // imported resources are bound for the whole frame, they never go through acquire and release
        for (id, lifetime) in lifetimes.iter().enumerate() {
            if let Some(lifetime) = lifetime {
                if !self.registry.entries[id].resource.is_imported() {
                    // a resource first used on the compute queue is realized before any release of this frame,
                    // it can not alias a texture the graphics queue may still be using
                    let acquire_position = match queues[lifetime.first] {
                        QueueType::AsyncCompute => 0,
                        QueueType::Graphics => lifetime.first,
                    };
                    schedule[acquire_position].acquire.push(id as u32);
                    schedule[lifetime.last].release.push(id as u32);
                }
            }
        }

        glog::debug!("Compiled render graph: {} live passes ({} on async compute), {} culled",
            order.len(),
            queues.iter().filter(|queue| **queue == QueueType::AsyncCompute).count(),
            culled.len(),
        );

        if self.config.log_schedule {
            for (position, scheduled) in schedule.iter().enumerate() {
                glog::info!("[{}] {:?} on {:?}, acquire {:?}, release {:?}, wait {:?}",
                    position,
                    self.passes[scheduled.pass.index()].name,
                    scheduled.queue,
                    scheduled.acquire,
                    scheduled.release,
                    scheduled.waits.iter().map(|sync| sync.producer).collect::<Vec<_>>(),
                );
            }
        }

        Ok(FrameSchedule {
            schedule,
            culled,
            lifetimes,
            positions,
        })
    }

    /// Lifetime of every resource over the final order, `None` if no live pass touches it.
    fn analyze_lifetimes(&self, order: &[usize], queues: &[QueueType]) -> Vec<Option<ResourceLifetime>> {
        let mut lifetimes: Vec<Option<ResourceLifetime>> = vec![None; self.registry.len()];
        let last_position = order.len().saturating_sub(1);

        for (position, pass_idx) in order.iter().enumerate() {
            for id in self.passes[*pass_idx].touched_resources() {
                let lifetime = lifetimes[id as usize].get_or_insert(ResourceLifetime {
                    first: position,
                    last: position,
                });
                lifetime.last = lifetime.last.max(position);

                // the compute queue runs concurrently, nothing it touches may be aliased before the frame ends
                if queues[position] == QueueType::AsyncCompute {
                    lifetime.last = last_position;
                }
            }
        }

        // for those exported resources, expand their lifetimes
        for handle in &self.exported_resources {
            if let Some(lifetime) = lifetimes[handle.id as usize].as_mut() {
                lifetime.last = last_position;
            }
        }

        lifetimes
    }
}

/// Kahn's algorithm over the `included` passes, always picking the smallest ready declaration index.
///
/// Returns the passes that could not be ordered on failure.
fn stable_topological_order(deps: &[Vec<usize>], included: &[bool]) -> Result<Vec<usize>, Vec<usize>> {
    let mut in_degree = vec![0_usize; deps.len()];
    let mut dependents = vec![Vec::new(); deps.len()];

    for (pass_idx, pass_deps) in deps.iter().enumerate() {
        if !included[pass_idx] {
            continue;
        }

        for dep in pass_deps.iter().filter(|dep| included[**dep]) {
            in_degree[pass_idx] += 1;
            dependents[*dep].push(pass_idx);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..deps.len())
        .filter(|pass_idx| included[*pass_idx] && in_degree[*pass_idx] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(deps.len());
    while let Some(Reverse(pass_idx)) = ready.pop() {
        order.push(pass_idx);

        for dependent in &dependents[pass_idx] {
            in_degree[*dependent] -= 1;
            if in_degree[*dependent] == 0 {
                ready.push(Reverse(*dependent));
            }
        }
    }

    let included_count = included.iter().filter(|included| **included).count();
    if order.len() == included_count {
        Ok(order)
    } else {
        Err((0..deps.len())
            .filter(|pass_idx| included[*pass_idx] && in_degree[*pass_idx] > 0)
            .collect())
    }
}

/// Drop the blocked passes that are only waiting behind a cycle, keeping the ones on it.
fn passes_on_cycles(mut blocked: Vec<usize>, deps: &[Vec<usize>]) -> Vec<usize> {
    loop {
        let before = blocked.len();

        let has_blocked_dependent: Vec<bool> = blocked.iter()
            .map(|pass_idx| blocked.iter().any(|other| deps[*other].contains(pass_idx)))
            .collect();
        let mut flags = has_blocked_dependent.into_iter();
        blocked.retain(|_| flags.next().unwrap_or(false));

        if blocked.len() == before {
            return blocked;
        }
    }
}
