use raven_rg::{Device, ExecuteParams, RenderGraph};

pub trait App<D: Device> {
    fn init(&mut self, params: &ExecuteParams) -> anyhow::Result<()>;
    /// Declare every pass of the frame. Called once per frame on a fresh render graph.
    fn prepare_frame(&mut self, rg: &mut RenderGraph<D>, params: &ExecuteParams) -> anyhow::Result<()>;
    fn shutdown(&mut self);
}
