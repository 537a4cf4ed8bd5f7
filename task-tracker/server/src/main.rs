#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = task_tracker_server::config::Config::from_env()?;
    task_tracker_server::web::start_web_server(config).await
}
