#![allow(dead_code)]

use std::collections::HashMap;

use raven_rg::{
    Device, Executor, ExecuteParams, PassContext, QueueSync, QueueType, ReadHandle,
    RenderGraphConfig, RendererListDesc, ResolvedTextureDesc, Texture, TextureDesc, TextureFormat, TextureKey,
};

#[derive(Clone, Debug, PartialEq)]
pub struct MockTexture {
    pub id: u32,
    pub key: TextureKey,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MockRendererList {
    pub name: String,
    pub pass_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    CreateTexture {
        id: u32,
        name: String,
    },
    CreateRendererList {
        name: String,
    },
    ClearTexture {
        id: u32,
        color: [f32; 4],
    },
    QueueSync(QueueSync),
    DestroyTexture {
        id: u32,
    },
    /// Recorded by the render functions of the tests.
    Execute {
        pass: String,
        queue: QueueType,
        /// (physical texture, name of the pass that wrote it last) of every read.
        seen: Vec<(u32, String)>,
        written: Vec<u32>,
    },
}

/// Device recording everything the render graph asks for.
#[derive(Default)]
pub struct MockDevice {
    next_texture_id: u32,
    pub events: Vec<DeviceEvent>,
    /// Name of the last pass that wrote every physical texture.
    pub contents: HashMap<u32, String>,
    /// Texture name whose creation fails.
    pub fail_texture: Option<String>,
}

impl Device for MockDevice {
    type Texture = MockTexture;
    type RendererList = MockRendererList;

    fn create_texture(&mut self, desc: &ResolvedTextureDesc) -> anyhow::Result<MockTexture> {
        if self.fail_texture.as_deref() == Some(desc.name.as_str()) {
            anyhow::bail!("out of device memory");
        }

        let id = self.next_texture_id;
        self.next_texture_id += 1;

        self.events.push(DeviceEvent::CreateTexture { id, name: desc.name.clone() });
        Ok(MockTexture {
            id,
            key: desc.key,
            name: desc.name.clone(),
        })
    }

    fn create_renderer_list(&mut self, desc: &RendererListDesc) -> anyhow::Result<MockRendererList> {
        self.events.push(DeviceEvent::CreateRendererList { name: desc.name.clone() });
        Ok(MockRendererList {
            name: desc.name.clone(),
            pass_names: desc.pass_names.clone(),
        })
    }

    fn clear_texture(&mut self, texture: &MockTexture, color: [f32; 4]) -> anyhow::Result<()> {
        self.events.push(DeviceEvent::ClearTexture { id: texture.id, color });
        self.contents.insert(texture.id, String::from("<clear>"));
        Ok(())
    }

    fn queue_sync(&mut self, sync: &QueueSync) {
        self.events.push(DeviceEvent::QueueSync(*sync));
    }

    fn destroy_texture(&mut self, texture: MockTexture) {
        self.events.push(DeviceEvent::DestroyTexture { id: texture.id });
    }
}

impl MockDevice {
    /// Names of the executed passes, in execution order.
    pub fn executed(&self) -> Vec<String> {
        self.events.iter()
            .filter_map(|event| match event {
                DeviceEvent::Execute { pass, .. } => Some(pass.clone()),
                _ => None,
            })
            .collect()
    }

    /// What the pass saw and wrote when it ran.
    pub fn execution(&self, name: &str) -> Option<(Vec<(u32, String)>, Vec<u32>)> {
        self.events.iter().find_map(|event| match event {
            DeviceEvent::Execute { pass, seen, written, .. } if pass == name => Some((seen.clone(), written.clone())),
            _ => None,
        })
    }

    pub fn created_textures(&self) -> Vec<String> {
        self.events.iter()
            .filter_map(|event| match event {
                DeviceEvent::CreateTexture { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

/// Render function reading and writing the given textures.
///
/// Reads record the physical texture and its content, writes stamp the pass name into the texture.
pub fn record_pass(
    reads: &[ReadHandle<Texture>],
    writes: &[ReadHandle<Texture>],
) -> impl FnOnce(&mut PassContext<'_, MockDevice>) -> anyhow::Result<()> + 'static {
    let reads = reads.to_vec();
    let writes = writes.to_vec();

    move |ctx: &mut PassContext<'_, MockDevice>| {
        let pass = ctx.pass_name().to_owned();

        let mut seen = Vec::new();
        for read in &reads {
            let texture = ctx.texture(*read)?;
            let content = ctx.device.contents.get(&texture.id).cloned().unwrap_or_default();
            seen.push((texture.id, content));
        }

        let mut written = Vec::new();
        for write in &writes {
            let texture = ctx.texture(*write)?;
            ctx.device.contents.insert(texture.id, pass.clone());
            written.push(texture.id);
        }

        let queue = ctx.queue();
        ctx.device.events.push(DeviceEvent::Execute { pass, queue, seen, written });
        Ok(())
    }
}

pub fn executor() -> Executor<MockDevice> {
    Executor::new(MockDevice::default(), RenderGraphConfig::default())
}

pub fn params() -> ExecuteParams {
    ExecuteParams::new(800, 600)
}

/// 400x300 color texture.
pub fn color_desc(name: &str) -> TextureDesc {
    TextureDesc::new_2d(400, 300, TextureFormat::Rgba8Unorm).with_name(name)
}

pub fn depth_desc(name: &str) -> TextureDesc {
    TextureDesc::full_screen(TextureFormat::Depth32Float).with_name(name)
}
