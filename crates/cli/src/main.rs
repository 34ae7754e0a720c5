use anyhow::Context;
use bookshelf::app;
use bookshelf_http::router::RouterBuilder;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Book catalogue service
#[derive(Debug, Parser)]
#[command(name = "bookshelf-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Create the database schema and exit
    InitDb,
    /// Print the API paths the service exposes
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app::serve(settings).await,
        Command::InitDb => {
            let applied = app::init_db(&settings).await?;
            println!("schema ready ({applied} migrations applied)");
            Ok(())
        }
        Command::Routes => print_routes(&settings),
    }
}

fn print_routes(settings: &Settings) -> anyhow::Result<()> {
    let registry = app::build_registry(app::Storage::in_memory().repository)?;
    let spec = RouterBuilder::new(settings.server.api_prefix()).merged_openapi(&registry);

    let paths = spec["paths"]
        .as_object()
        .context("OpenAPI document has no paths")?;
    for (path, item) in paths {
        let methods: Vec<String> = item
            .as_object()
            .map(|ops| ops.keys().map(|m| m.to_uppercase()).collect())
            .unwrap_or_default();
        println!("{:<8} {}", methods.join(","), path);
    }
    Ok(())
}
