// use log macros.
#[macro_use]
extern crate log as _log;

use std::sync::Arc;

use raven_engine::prelude::*;
use raven_engine::prelude::rg::*;

/// Device without any GPU behind, it only keeps track of what it is asked for.
#[derive(Default)]
struct NullDevice {
    next_texture_id: u32,
    submitted_passes: u64,
    queue_syncs: u64,
}

#[derive(Debug)]
struct NullTexture {
    id: u32,
    desc: ResolvedTextureDesc,
}

struct NullRendererList {
    draw_count: u32,
}

impl Device for NullDevice {
    type Texture = NullTexture;
    type RendererList = NullRendererList;

    fn create_texture(&mut self, desc: &ResolvedTextureDesc) -> anyhow::Result<NullTexture> {
        let id = self.next_texture_id;
        self.next_texture_id += 1;

        debug!("Create texture #{} {:?} {}x{} {:?} x{}",
            id, desc.name, desc.key.width, desc.key.height, desc.key.format, desc.key.samples);
        Ok(NullTexture { id, desc: desc.clone() })
    }

    fn create_renderer_list(&mut self, desc: &RendererListDesc) -> anyhow::Result<NullRendererList> {
        // pretend every shader pass tag matches a few objects
        Ok(NullRendererList { draw_count: desc.pass_names.len() as u32 * 16 })
    }

    fn queue_sync(&mut self, _sync: &QueueSync) {
        self.queue_syncs += 1;
    }

    fn destroy_texture(&mut self, texture: NullTexture) {
        trace!("Destroy texture #{} {:?}", texture.id, texture.desc.name);
    }
}

impl NullDevice {
    fn submit(&mut self, pass: &str, draws: u32) {
        self.submitted_passes += 1;
        trace!("Submit {:?} with {} draws", pass, draws);
    }
}

#[derive(Default)]
struct LightingPayload {
    light_count: u32,
    exposure: f32,
}

#[derive(Default)]
struct SandboxApp {
    back_buffer: Option<Arc<NullTexture>>,
    show_debug_view: bool,
}

impl SandboxApp {
    fn back_buffer_desc(params: &ExecuteParams) -> TextureDesc {
        TextureDesc::new_2d(params.rendering_width, params.rendering_height, TextureFormat::Bgra8Unorm)
            .with_name("back buffer")
    }

    fn draw_pass(ctx: &mut PassContext<'_, NullDevice>) -> anyhow::Result<()> {
        let mut draws = 0;
        for list in ctx.resources.renderer_lists() {
            draws += ctx.renderer_list(list)?.draw_count;
        }

        let name = ctx.pass_name();
        ctx.device.submit(name, draws);
        Ok(())
    }
}

impl App<NullDevice> for SandboxApp {
    fn init(&mut self, params: &ExecuteParams) -> anyhow::Result<()> {
        let desc = Self::back_buffer_desc(params);

        // the swapchain image would come from the window system
        self.back_buffer = Some(Arc::new(NullTexture {
            id: u32::MAX,
            desc: desc.resolve(params),
        }));
        info!("Sandbox initialized at {}x{}, {:?}", params.rendering_width, params.rendering_height, params.msaa_samples);
        Ok(())
    }

    fn prepare_frame(&mut self, rg: &mut RenderGraph<NullDevice>, params: &ExecuteParams) -> anyhow::Result<()> {
        let back_buffer = self.back_buffer.clone()
            .ok_or_else(|| anyhow::anyhow!("Sandbox is not initialized"))?;
        let mut back_buffer = rg.import_texture(Self::back_buffer_desc(params), back_buffer)?;

        let mut depth = rg.create_texture(TextureDesc::full_screen(TextureFormat::Depth32Float)
            .with_clear([1.0, 0.0, 0.0, 0.0])
            .with_name("depth"))?;

        // depth prepass
        {
            let mut pass = rg.add_pass("depth prepass");
            pass.create_and_use_renderer_list(RendererListDesc::new(&["DepthOnly"], RenderQueueRange::Opaque)
                .with_sorting(SortingCriteria::FrontToBack)
                .with_name("opaque depth"))?;
            pass.use_depth_output(&mut depth, DepthAccess::Write)?;
            pass.render_fn(Self::draw_pass);
        }

        // gbuffer
        let mut albedo = rg.create_texture(TextureDesc::full_screen(TextureFormat::Rgba8Srgb).with_name("gbuffer albedo"))?;
        let mut normal = rg.create_texture(TextureDesc::full_screen(TextureFormat::Rgba16Float).with_name("gbuffer normal"))?;
        {
            let mut pass = rg.add_pass("gbuffer");
            pass.create_and_use_renderer_list(RendererListDesc::new(&["GBuffer"], RenderQueueRange::Opaque)
                .with_sorting(SortingCriteria::CommonOpaque)
                .with_name("opaque"))?;
            pass.use_color_output(&mut albedo, 0)?;
            pass.use_color_output(&mut normal, 1)?;
            pass.use_depth_output(&mut depth, DepthAccess::Read)?;
            pass.render_fn(Self::draw_pass);
        }

        // tiled light list, free to overlap with the shadows on the compute queue
        let mut light_list = rg.create_texture(TextureDesc::screen_scaled(1.0 / 16.0, 1.0 / 16.0, TextureFormat::R32Uint)
            .with_random_write()
            .with_name("light list"))?;
        {
            let mut pass = rg.add_pass("build light list");
            pass.read_texture(depth)?;
            pass.write_texture(&mut light_list)?;
            pass.enable_async_compute(true);
            pass.render_fn(Self::draw_pass);
        }

        let mut shadow_map = rg.create_texture(TextureDesc::new_2d(2048, 2048, TextureFormat::Depth32Float)
            .with_clear([1.0, 0.0, 0.0, 0.0])
            .with_name("shadow map"))?;
        {
            let mut pass = rg.add_pass("shadows");
            pass.create_and_use_renderer_list(RendererListDesc::new(&["ShadowCaster"], RenderQueueRange::Opaque)
                .with_name("shadow casters"))?;
            pass.use_depth_output(&mut shadow_map, DepthAccess::ReadWrite)?;
            pass.render_fn(Self::draw_pass);
        }

        // nothing consumes it unless the debug view is shown, the graph drops it otherwise
        let mut debug_view = rg.create_texture(TextureDesc::full_screen(TextureFormat::Rgba8Unorm).with_name("debug view"))?;
        {
            let mut pass = rg.add_pass("debug normals");
            pass.read_texture(normal)?;
            pass.use_color_output(&mut debug_view, 0)?;
            pass.render_fn(Self::draw_pass);
        }

        let mut hdr = rg.create_texture(TextureDesc::full_screen(TextureFormat::Rgba16Float).with_name("hdr"))?;
        {
            let mut pass = rg.add_pass("deferred lighting");
            for input in [albedo, normal, depth, light_list, shadow_map] {
                pass.read_texture(input)?;
            }
            pass.use_color_output(&mut hdr, 0)?;

            let mut payload = pass.payload::<LightingPayload>();
            payload.light_count = 128;
            payload.exposure = 1.0;
            pass.render(payload, |payload, ctx| {
                trace!("Shade {} lights, exposure {}", payload.light_count, payload.exposure);
                Self::draw_pass(ctx)
            });
        }

        let mut transparent = rg.create_texture(TextureDesc::full_screen(TextureFormat::Rgba16Float)
            .with_msaa(false)
            .with_clear([0.0; 4])
            .with_name("transparent"))?;
        {
            let mut pass = rg.add_pass("forward transparent");
            pass.create_and_use_renderer_list(RendererListDesc::new(&["Forward"], RenderQueueRange::Transparent)
                .with_sorting(SortingCriteria::CommonTransparent)
                .with_name("transparent"))?;
            pass.use_color_output(&mut transparent, 0)?;
            pass.render_fn(Self::draw_pass);
        }

        {
            let mut pass = rg.add_pass("msaa resolve");
            pass.read_texture(transparent)?;
            pass.write_texture(&mut hdr)?;
            pass.render_fn(Self::draw_pass);
        }

        {
            let mut pass = rg.add_pass("final blit");
            pass.read_texture(hdr)?;
            if self.show_debug_view {
                pass.read_texture(debug_view)?;
            }
            pass.use_color_output(&mut back_buffer, 0)?;
            pass.render_fn(Self::draw_pass);
        }

        Ok(())
    }

    fn shutdown(&mut self) {
        self.back_buffer = None;
    }
}

fn main() {
    let mut engine_context = raven_engine::init(Box::new(SandboxApp::default()), NullDevice::default())
        .unwrap_or_else(|err| {
            eprintln!("Raven Engine failed to initialize with: {:?}", err); // use eprintln here, because log module may not be initialized successfully.
            std::process::exit(1);
        });

    raven_engine::main_loop(&mut engine_context);

    let device = raven_engine::shutdown(engine_context);
    info!("{} passes submitted, {} cross queue syncs, {} textures created",
        device.submitted_passes, device.queue_syncs, device.next_texture_id);
}
