use anyhow::Context;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.redacted_url(),
        port = settings.server.port,
        "bookshelf-app starting"
    );

    bookshelf_app::serve(settings, bookshelf_http::shutdown_signal()).await?;

    tracing::info!("bookshelf-app stopped");
    Ok(())
}
