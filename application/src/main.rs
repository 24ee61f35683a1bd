use std::{io, process::ExitCode, sync::OnceLock};

use application::{api, Args, Config};
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() -> ExitCode {
    // Standard output is reserved for the command outcome.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || LOG_LEVEL.get().copied().unwrap_or(log::Level::WARN)
                            >= *meta.level()
                })),
        )
        .init();

    start().await.unwrap_or_else(|code| code)
}

async fn start() -> Result<ExitCode, ExitCode> {
    let Args { config, command } = Args::parse();

    let Config { postgres, service, log } =
        Config::new(config).map_err(|e| {
            log::error!("failed to load `Config`: {e}");
            ExitCode::from(78)
        })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let postgres_config = postgres.into();
    let mut postgres = Postgres::new(&postgres_config).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
        ExitCode::FAILURE
    })?;

    migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
            ExitCode::FAILURE
        })?;

    let service = Service::new(service.into(), postgres);

    let outcome = api::execute(&service, command).await.map_err(|e| {
        log::error!("{e}");
        e.exit_code()
    })?;

    let json = serde_json::to_string_pretty(&outcome).map_err(|e| {
        log::error!("failed to render outcome: {e}");
        ExitCode::FAILURE
    })?;
    println!("{json}");

    Ok(ExitCode::SUCCESS)
}
