use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use todo_backend::adapter::Adapter;
use todo_backend::core::config::AppConfig;
use todo_backend::proxy::{self, BackendProxy};
use tracing::{error, info};

async fn function_handler(adapter: &Adapter, event: LambdaEvent<Value>) -> Result<Value, Error> {
    Ok(adapter.handle(&event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    todo_backend::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;
    info!(backend_url = %config.backend_url, "Proxy function starting");

    let backend = BackendProxy::new(&config.backend_url).map_err(Error::from)?;
    let adapter = Adapter::new(proxy::router(backend));
    let adapter = &adapter;

    lambda_runtime::run(lambda_runtime::service_fn(move |event| async move {
        function_handler(adapter, event).await
    }))
    .await
}
