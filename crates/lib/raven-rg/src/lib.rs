mod graph;
mod compiled_graph;
mod executing_graph;
mod retired_graph;

mod resource;
mod resource_desc;
mod resource_registry;
mod graph_resource;

mod pass;
mod pass_context;
mod payload_pool;

mod device;
mod error;
mod executor;
mod transient_resource_cache;

pub use graph::RenderGraph;
pub use compiled_graph::{CompiledRenderGraph, QueueType, QueueSync, ResourceLifetime};
pub use resource::{Resource, ResourceDesc, ResourceKind, Texture, RendererList};
pub use resource_desc::{
    TextureDesc, TextureFormat, TextureSize, TextureKey, ResolvedTextureDesc, MsaaSamples,
    RendererListDesc, RenderQueueRange, SortingCriteria, PerObjectData, MAX_SCREEN_SCALE,
};
pub use resource_registry::ResourceRegistry;
pub use graph_resource::{GraphResourceDesc, GraphResourceHandle, Handle, ReadHandle};
pub use pass::{PassBuilder, PassId, DepthAccess, RenderFunc, MAX_COLOR_OUTPUTS};
pub use pass_context::{PassContext, PassResources};
pub use payload_pool::PassPayloadPool;
pub use device::Device;
pub use error::RgError;
pub use executor::{Executor, ExecuteParams, RenderGraphConfig};
pub use transient_resource_cache::{TransientResourceCache, CacheStats};

extern crate log as glog;
