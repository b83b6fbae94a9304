use std::any::Any;

use anyhow::Context;

use crate::compiled_graph::{GraphPreparedResource, ScheduledPass};
use crate::device::Device;
use crate::executor::ExecuteParams;
use crate::graph_resource::{GraphResource, GraphResourceDesc};
use crate::pass::Pass;
use crate::pass_context::{PassContext, PassResources};
use crate::payload_pool::PassPayloadPool;
use crate::retired_graph::RetiredRenderGraph;
use crate::transient_resource_cache::TransientResourceCache;

pub(crate) struct ExecutingRenderGraph<'exec, D: Device> {
    pub(crate) params: &'exec ExecuteParams,
    pub(crate) device: &'exec mut D,
    pub(crate) cache: &'exec mut TransientResourceCache<D::Texture>,

    pub(crate) passes: Vec<Pass<D>>,
    pub(crate) schedule: Vec<ScheduledPass>,
    pub(crate) native_resources: Vec<GraphResource<D>>,
    pub(crate) registered_resources: Vec<GraphPreparedResource<D>>,
    pub(crate) payload_pool: PassPayloadPool,
}

impl<'exec, D: Device> ExecutingRenderGraph<'exec, D> {
    /// Run all the scheduled passes in order, stop at the first failing one.
    pub(crate) fn execute_passes(&mut self) -> anyhow::Result<()> {
        let schedule = std::mem::take(&mut self.schedule);

        for scheduled in &schedule {
            self.execute_pass(scheduled)?;
        }
        Ok(())
    }

    fn execute_pass(&mut self, scheduled: &ScheduledPass) -> anyhow::Result<()> {
        let pass_idx = scheduled.pass.index();

        for sync in &scheduled.waits {
            glog::trace!("{:?} waits for {:?} on {:?}", scheduled.pass, sync.producer, sync.producer_queue);
            self.device.queue_sync(sync);
        }

        for id in &scheduled.acquire {
            self.acquire_resource(*id as usize)
                .with_context(|| format!("Failed to acquire resources of pass {:?}", self.passes[pass_idx].name))?;
        }

        let pass = &mut self.passes[pass_idx];
        let render_func = pass.render_func.take()
            .with_context(|| format!("Pass {:?} has no render function", pass.name))?;
        let mut payload = pass.payload.take().unwrap_or_else(|| Box::new(()) as Box<dyn Any>);

        glog::trace!("Execute pass {:?} on {:?}", pass.name, scheduled.queue);

        let result = {
            let mut ctx = PassContext {
                device: &mut *self.device,
                resources: PassResources {
                    pass: &self.passes[pass_idx],
                    queue: scheduled.queue,
                    registered_resources: &self.registered_resources,
                },
            };

            render_func(&mut *payload, &mut ctx)
        };

        self.payload_pool.recycle(payload);
        result.with_context(|| format!("Failed to execute pass {:?}", self.passes[pass_idx].name))?;

        for id in &scheduled.release {
            self.release_resource(*id as usize);
        }
        Ok(())
    }

    /// Realize the physical resource of a created resource whose lifetime begins.
    fn acquire_resource(&mut self, id: usize) -> anyhow::Result<()> {
        match &self.native_resources[id] {
            GraphResource::Created(GraphResourceDesc::Texture(desc)) => {
                let resolved = desc.resolve(self.params);

                let texture = match self.cache.get_texture(&resolved.key) {
                    Some(texture) => texture,
                    None => {
                        glog::trace!("Create texture {:?} {:?}", resolved.name, resolved.key);
                        self.device.create_texture(&resolved)
                            .with_context(|| format!("Failed to create texture {:?}", resolved.name))?
                    }
                };

                // register first, a failed clear still gives the texture back to the cache
                self.registered_resources[id] = GraphPreparedResource::CreatedTexture {
                    texture,
                    key: resolved.key,
                };

                if let (Some(color), Some(texture)) = (resolved.clear_color, self.registered_resources[id].texture()) {
                    self.device.clear_texture(texture, color)
                        .with_context(|| format!("Failed to clear texture {:?}", resolved.name))?;
                }
            }
            GraphResource::Created(GraphResourceDesc::RendererList(desc)) => {
                let list = self.device.create_renderer_list(desc)
                    .with_context(|| format!("Failed to create renderer list {:?}", desc.name))?;

                self.registered_resources[id] = GraphPreparedResource::RendererList(list);
            }
            GraphResource::Imported { .. } => {}
        }

        Ok(())
    }

    /// The lifetime of the resource is over, later passes may alias its physical resource.
    fn release_resource(&mut self, id: usize) {
        match std::mem::replace(&mut self.registered_resources[id], GraphPreparedResource::Released) {
            GraphPreparedResource::CreatedTexture { texture, key } => {
                self.cache.store_texture(key, texture);
            }
            GraphPreparedResource::ImportedTexture(texture) => {
                self.registered_resources[id] = GraphPreparedResource::ImportedTexture(texture);
            }
            GraphPreparedResource::RendererList(_) |
            GraphPreparedResource::Pending |
            GraphPreparedResource::Released => {}
        }
    }

    pub(crate) fn retire(self) -> RetiredRenderGraph<D> {
        RetiredRenderGraph {
            registered_resources: self.registered_resources,
            passes: self.passes,
            payload_pool: self.payload_pool,
        }
    }
}
