use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalogue service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen port, overriding configuration
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending store migrations and exit
    Migrate,
    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookshelf serve");
            bookshelf_app::serve(settings, bookshelf_http::shutdown_signal()).await
        }
        Command::Migrate => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let applied = bookshelf_app::migrate(&settings).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render configuration")?;
            println!("{rendered}");
            Ok(())
        }
    }
}
