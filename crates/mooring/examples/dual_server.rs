//! HTTP and gRPC servers in one process, stopped together.
//!
//! ```text
//! cargo run -p mooring --example dual_server
//! curl -X POST localhost:8080/users -d '{"name":"","age":"x"}'
//! ```
//!
//! Settings come from `mooring.toml` when present and `MOORING__*`
//! environment variables.

use mooring::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
struct NewUser {
    #[serde(default)]
    name: String,
    #[serde(default)]
    age: String,
}

async fn api(request: Request) -> HandlerResult {
    match (request.method().as_str(), request.uri().path()) {
        ("POST", "/users") => {
            let user: NewUser = bind_json(&request).await?;

            let mut errors = ApiError::form_validation();
            if user.name.is_empty() {
                errors.push("name", "required");
            }
            if user.age.parse::<u8>().is_err() {
                errors.push("age", "not_numeric");
            }
            errors.into_result()?;

            tracing::info!(name = %user.name, "User created");
            let body = serde_json::json!({ "name": user.name }).to_string();
            Ok(Response::json(http::StatusCode::CREATED, body))
        }
        ("GET", "/me") => {
            let token = auth_token(&request).ok_or(ApiError::plain("unauthorized"))?;
            let body = serde_json::json!({ "token_length": token.len() }).to_string();
            Ok(Response::json(http::StatusCode::OK, body))
        }
        _ => Err(ApiError::plain("route_not_found").into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_dotenv()?
        .with_optional_file("mooring.toml")?
        .with_env_prefix("MOORING")
        .load()?;
    init_logging(&config.logging.to_log_config())?;

    let pipeline = Pipeline::builder()
        .stage(CorsMiddleware::permissive())
        .stage(RequestIdMiddleware::new())
        .build();
    let http_transport = HttpTransport::new(PipelineService::new(pipeline, api))
        .with_config(config.http.to_http_config());
    let http = ServerHandle::new(config.http.address.clone(), http_transport);

    let grpc_config = config.grpc.to_grpc_config();
    let (_reporter, health) = tonic_health::server::health_reporter();
    let router = grpc_config.server_builder().add_service(health);
    let grpc = ServerHandle::new(
        config.grpc.address.clone(),
        GrpcTransport::with_config(router, &grpc_config),
    );

    http.start().await?;
    if let Err(e) = grpc.start().await {
        http.shutdown(Some(config.http.shutdown_timeout())).await?;
        return Err(e.into());
    }

    let (mut http_failures, mut grpc_failures) = (http.wait(), grpc.wait());
    let os_signal = ShutdownSignal::with_os_signals();
    tokio::select! {
        Some(err) = http_failures.recv() => tracing::error!(error = %err, "Stopping after HTTP failure"),
        Some(err) = grpc_failures.recv() => tracing::error!(error = %err, "Stopping after gRPC failure"),
        () = os_signal.recv() => {}
    }

    let (http_result, grpc_result) = tokio::join!(
        http.shutdown(Some(config.http.shutdown_timeout())),
        grpc.shutdown(Some(config.grpc.shutdown_timeout())),
    );
    http_result?;
    grpc_result?;
    Ok(())
}
