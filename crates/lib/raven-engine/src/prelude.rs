// Raven Engine exposed APIs
pub use super::user::App;

// render graph module
pub mod rg {
    pub use raven_rg::{
        Device, DepthAccess, ExecuteParams, PassContext, QueueSync,
        RenderGraph, RenderQueueRange, RendererListDesc, ResolvedTextureDesc, SortingCriteria,
        Handle, ReadHandle, Texture, RendererList,
        TextureDesc, TextureFormat, MsaaSamples,
    };
}
