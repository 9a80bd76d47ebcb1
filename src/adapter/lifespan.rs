use async_trait::async_trait;

/// Whether application startup hooks run inside the function.
///
/// The serverless runtime owns process lifetime, so the API function binds
/// its application with `Lifespan::Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifespan {
    #[default]
    Off,
    /// Run every registered hook once, before the first dispatch.
    On,
}

#[async_trait]
pub trait StartupHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_startup(&self) -> anyhow::Result<()>;
}
