use anyhow::Context;

use crate::compiled_graph::CompiledRenderGraph;
use crate::device::Device;
use crate::graph::RenderGraph;
use crate::payload_pool::PassPayloadPool;
use crate::resource_desc::MsaaSamples;
use crate::transient_resource_cache::{CacheStats, TransientResourceCache};

/// Parameters of the frame being executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecuteParams {
    pub rendering_width: u32,
    pub rendering_height: u32,
    /// Sample count of the textures created with `msaa`.
    pub msaa_samples: MsaaSamples,
}

impl ExecuteParams {
    pub fn new(rendering_width: u32, rendering_height: u32) -> Self {
        Self {
            rendering_width,
            rendering_height,
            msaa_samples: MsaaSamples::None,
        }
    }
}

/// Render graph behavior switches, applied to every graph the executor hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderGraphConfig {
    /// Drop passes whose outputs never reach a terminal output.
    pub culling: bool,
    /// Allow passes to leave the graphics queue.
    pub async_compute: bool,
    /// Log the final schedule of every frame at info level.
    pub log_schedule: bool,
}

impl Default for RenderGraphConfig {
    fn default() -> Self {
        Self {
            culling: true,
            async_compute: true,
            log_schedule: false,
        }
    }
}

/// Render graph executor to build and run a render graph every frame.
///
/// Owns the device and everything that outlives a single frame: the transient resource cache and the payload pool.
pub struct Executor<D: Device> {
    device: D,
    transient_resource_cache: TransientResourceCache<D::Texture>,
    payload_pool: PassPayloadPool,
    config: RenderGraphConfig,
    frame_index: u64,
}

impl<D: Device> Executor<D> {
    pub fn new(device: D, config: RenderGraphConfig) -> Self {
        Self {
            device,
            transient_resource_cache: TransientResourceCache::new(),
            payload_pool: PassPayloadPool::new(),
            config,
            frame_index: 0,
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn config(&self) -> &RenderGraphConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderGraphConfig) {
        self.config = config;
    }

    /// Number of frames executed so far, failed ones included.
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn cache_stats(&self) -> CacheStats {
        self.transient_resource_cache.stats()
    }

    /// Number of physical textures waiting in the cache.
    #[inline]
    pub fn cached_texture_count(&self) -> usize {
        self.transient_resource_cache.len()
    }

    /// Number of payloads waiting to be reused.
    #[inline]
    pub fn pooled_payload_count(&self) -> usize {
        self.payload_pool.len()
    }

    /// Start a new frame with a fresh render graph.
    ///
    /// Payloads recycled by the previous frames are lent to the new graph.
    /// Hand the graph back through [`Executor::compile`] or [`Executor::abandon_frame`] to keep them.
    pub fn begin_frame(&mut self) -> RenderGraph<D> {
        RenderGraph::from_parts(self.config, std::mem::take(&mut self.payload_pool))
    }

    /// Compile a graph given by [`Executor::begin_frame`].
    ///
    /// A failing graph counts as a dropped frame, its payloads are kept for the next one.
    pub fn compile(&mut self, rg: RenderGraph<D>) -> anyhow::Result<CompiledRenderGraph<D>> {
        match rg.compile_or_recover() {
            Ok(compiled) => Ok(compiled),
            Err((err, payload_pool)) => {
                glog::error!("Frame {} dropped: {}", self.frame_index, err);
                self.payload_pool = payload_pool;
                self.frame_index += 1;
                Err(err).context("Failed to compile render graph")
            }
        }
    }

    /// Drop a frame without executing it.
    pub fn abandon_frame(&mut self, rg: RenderGraph<D>) {
        glog::warn!("Frame {} abandoned before execution", self.frame_index);
        self.payload_pool = rg.into_payload_pool();
        self.frame_index += 1;
    }

    /// Execute a compiled render graph.
    ///
    /// Whatever happens, every physical texture realized by this frame is given back to the cache.
    pub fn execute(&mut self, compiled: CompiledRenderGraph<D>, params: &ExecuteParams) -> anyhow::Result<()> {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let mut executing = compiled.prepare_execute(params, &mut self.device, &mut self.transient_resource_cache);
        let result = executing.execute_passes();

        let retired = executing.retire();
        self.payload_pool = retired.release_owned_resources(&mut self.transient_resource_cache);

        match &result {
            Ok(()) => {
                let stats = self.transient_resource_cache.stats();
                glog::debug!("Frame {} done, transient cache hits {} misses {}, {} textures cached",
                    frame_index, stats.hits, stats.misses, self.transient_resource_cache.len());
            }
            Err(err) => glog::error!("Frame {} dropped: {:?}", frame_index, err),
        }

        result.with_context(|| format!("Failed to execute frame {}", frame_index))
    }

    /// Declare, compile and execute a frame in one go.
    pub fn run_frame<PrepareFunc>(
        &mut self,
        params: &ExecuteParams,
        prepare_func: PrepareFunc,
    ) -> anyhow::Result<()>
    where
        PrepareFunc: FnOnce(&mut RenderGraph<D>) -> anyhow::Result<()>,
    {
        let mut rg = self.begin_frame();

        // user-side callback
        if let Err(err) = prepare_func(&mut rg) {
            self.abandon_frame(rg);
            return Err(err).context("Failed to declare render graph");
        }

        let compiled = self.compile(rg)?;
        self.execute(compiled, params)
    }

    /// Destroy every cached texture and give the device back.
    pub fn shutdown(mut self) -> D {
        self.transient_resource_cache.clean(&mut self.device);
        self.device
    }
}
