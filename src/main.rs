use std::{future::IntoFuture, process, sync::Arc};

use postline::{
    application::{error::AppError, identity::IdentityService, repos::UsersRepo},
    cache::CacheConfig,
    config::{self, StorageBackend},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        memory::MemoryRepositories,
        telemetry,
        uploads::MediaStorage,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const DEMO_USERNAME: &str = "demo";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateUser(args) => run_create_user(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let media = Arc::new(MediaStorage::from_settings(&settings.uploads).map_err(InfraError::from)?);
    let cache = CacheConfig::from(&settings.cache);
    let upload_limit = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| AppError::validation("uploads.max_request_bytes exceeds platform limits"))?;

    let state = match settings.database.backend {
        StorageBackend::Postgres => {
            let repositories = init_postgres(&settings).await?;
            ApiState::assemble(repositories, media, cache, upload_limit)
        }
        StorageBackend::Memory => {
            let repositories = Arc::new(MemoryRepositories::new());
            seed_demo_user(repositories.clone()).await?;
            ApiState::assemble(repositories, media, cache, upload_limit)
        }
    };

    serve_http(&settings, state).await
}

async fn run_create_user(
    settings: config::Settings,
    args: config::CreateUserArgs,
) -> Result<(), AppError> {
    let repo: Arc<dyn UsersRepo> = match settings.database.backend {
        StorageBackend::Postgres => {
            let repositories: Arc<dyn UsersRepo> = init_postgres(&settings).await?;
            repositories
        }
        StorageBackend::Memory => {
            warn!(
                target: "postline::create_user",
                "memory backend selected; the user only lives for this process"
            );
            Arc::new(MemoryRepositories::new())
        }
    };

    let issued = IdentityService::new(repo).issue(&args.username).await?;
    info!(
        target: "postline::create_user",
        user_id = issued.user.id,
        username = %issued.user.username,
        "User created"
    );
    println!("{}", issued.token);
    Ok(())
}

async fn init_postgres(settings: &config::Settings) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

/// The memory backend starts empty; give it one account so the
/// authenticated endpoints are usable.
async fn seed_demo_user(repositories: Arc<MemoryRepositories>) -> Result<(), AppError> {
    let issued = IdentityService::new(repositories)
        .issue(DEMO_USERNAME)
        .await?;
    info!(
        target: "postline::serve",
        user_id = issued.user.id,
        username = DEMO_USERNAME,
        token = %issued.token,
        "Memory backend seeded with demo user"
    );
    Ok(())
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target: "postline::serve",
        addr = %settings.server.addr,
        backend = %settings.database.backend,
        "Listening"
    );

    let (signal_tx, mut signal_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signal_tx.send(true);
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        if signal_rx.wait_for(|fired| *fired).await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(
                target: "postline::serve",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target: "postline::serve", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(target: "postline::serve", "Shutdown signal received");
}
