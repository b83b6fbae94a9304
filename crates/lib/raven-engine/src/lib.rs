extern crate log as glog;

// Raven Engine APIs
use raven_core::log;
use raven_core::console;

use raven_rg::{Device, ExecuteParams, Executor, MsaaSamples, RenderGraphConfig};

mod user;
pub mod prelude;

pub use user::App;

/// Global engine context to have control on engine on user side.
pub struct EngineContext<D: Device> {
    app: Box<dyn App<D>>,
    executor: Executor<D>,
    params: ExecuteParams,
    frames: u32,
}

impl<D: Device> EngineContext<D> {
    #[inline]
    pub fn executor(&self) -> &Executor<D> {
        &self.executor
    }

    #[inline]
    pub fn params(&self) -> &ExecuteParams {
        &self.params
    }
}

/// Initialize raven engine.
pub fn init<D: Device>(mut app: Box<dyn App<D>>, device: D) -> anyhow::Result<EngineContext<D>> {
    let console_var = console::from_args()?;

    log::init_log(log::LogConfig {
        level: console_var.level,
        log_file: console_var.log_file.clone(),
    })?;

    let config = RenderGraphConfig {
        culling: console_var.culling,
        async_compute: console_var.async_compute,
        log_schedule: console_var.level >= log::LevelFilter::Trace,
    };

    let params = ExecuteParams {
        rendering_width: console_var.width,
        rendering_height: console_var.height,
        // validated by the console
        msaa_samples: MsaaSamples::from_count(console_var.msaa).unwrap_or_default(),
    };

    app.init(&params)?;

    glog::trace!("Raven Engine initialized with {:?}", config);
    Ok(EngineContext {
        app,
        executor: Executor::new(device, config),
        params,
        frames: console_var.frames,
    })
}

/// Render the requested number of frames.
///
/// A dropped frame is logged and the next one starts from a fresh render graph.
pub fn main_loop<D: Device>(engine_context: &mut EngineContext<D>) {
    glog::trace!("Begin main loop.");
    let EngineContext {
        app,
        executor,
        params,
        frames,
    } = engine_context;
    let params: &ExecuteParams = params;

    let mut dropped = 0;
    for _ in 0..*frames {
        let frame_index = executor.frame_index();

        if let Err(err) = executor.run_frame(params, |rg| app.prepare_frame(rg, params)) {
            glog::error!("Frame {} is not rendered: {:?}", frame_index, err);
            dropped += 1;
        }
    }

    let stats = executor.cache_stats();
    glog::info!("Rendered {} frames ({} dropped), transient cache hits {} misses {}",
        frames, dropped, stats.hits, stats.misses);
    glog::trace!("Exit main loop successfully!");
}

/// Shutdown raven engine.
pub fn shutdown<D: Device>(engine_context: EngineContext<D>) -> D {
    let EngineContext { mut app, executor, .. } = engine_context;

    app.shutdown();
    let device = executor.shutdown();

    glog::trace!("Raven Engine shutdown.");
    device
}
