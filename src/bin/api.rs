use todo_backend::bootstrap;
use todo_backend::handler::Handler;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    todo_backend::setup_logging();

    // Cold start: binds the primary app, or the diagnostic app if it fails.
    let handler = Handler::initialize(bootstrap::primary_from_env);
    let handler = &handler;

    lambda_runtime::run(lambda_runtime::service_fn(move |event| async move {
        handler.handle(event).await
    }))
    .await
}
