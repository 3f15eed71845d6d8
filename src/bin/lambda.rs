//! AWS Lambda entry point for the comments API
//!
//! Deploy with `cargo lambda build --release --features lambda`.

use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zhihu_comments::lambda::{self, HttpEvent};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Zhihu comments Lambda starting...");
    let router = lambda::build_router().await?;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<HttpEvent>| {
        let router = router.clone();
        async move { lambda::handler(router, event).await }
    }))
    .await
}
