use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};
use sqlx::postgres::PgPoolOptions;
use warden::{
    adapters::{
        AppState, PgAttackLogStore, PgHardBlocklist, PgRuleStore, RedisSoftBlocklist,
        ReqwestUpstream, admin, build_router,
    },
    config::{self, SettingsValidator},
    core::{LogFanout, LogRecorder, RequestPipeline, seed},
    metrics,
    ports::{AttackLogStore, HardBlocklist, RuleStore, SoftBlocklist, UpstreamClient},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the WAF (default)
    Serve,
    /// Check the environment configuration and exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    match args.command {
        Some(Commands::Validate) => validate_command(),
        Some(Commands::Serve) | None => serve().await,
    }
}

/// Load and validate settings, print a summary, exit non-zero on failure.
fn validate_command() -> Result<()> {
    let settings = match config::load_settings() {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("configuration error: {error:#}");
            std::process::exit(1);
        }
    };

    if let Err(error) = SettingsValidator::validate(&settings) {
        eprintln!("configuration invalid: {error}");
        std::process::exit(1);
    }

    println!("configuration OK");
    println!("  listen address:  {}", settings.listen_addr());
    println!("  origin:          {}", settings.backend_url);
    println!("  block threshold: {}", settings.threat_score_threshold);
    println!(
        "  cors origins:    {}",
        settings.cors_origins.as_deref().unwrap_or("(none)")
    );
    Ok(())
}

async fn serve() -> Result<()> {
    tracing_setup::init_tracing()?;
    metrics::init_metrics();

    let settings = Arc::new(config::load_settings()?);
    SettingsValidator::validate(&settings).map_err(|e| eyre!("invalid configuration: {e}"))?;

    // Persistent store: pool, migrations, seed.
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&settings.database_url)
        .await
        .wrap_err("failed to connect to the database")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .wrap_err("failed to run database migrations")?;

    let rules: Arc<dyn RuleStore> = Arc::new(PgRuleStore::new(pool.clone()));
    let seeded = rules
        .seed_if_empty(seed::DEFAULT_RULES)
        .await
        .wrap_err("failed to seed default rules")?;
    if seeded > 0 {
        tracing::info!(count = seeded, "seeded default rule set");
    }

    let hard_blocks: Arc<dyn HardBlocklist> = Arc::new(PgHardBlocklist::new(pool.clone()));
    let logs: Arc<dyn AttackLogStore> = Arc::new(PgAttackLogStore::new(pool.clone()));

    // Ephemeral store: connection is established lazily so a dead Redis at
    // boot only degrades the soft tier (fail-open) instead of aborting.
    let soft_blocks: Arc<dyn SoftBlocklist> = Arc::new(
        RedisSoftBlocklist::new(&settings.redis_url)
            .map_err(|e| eyre!("invalid REDIS_URL: {e}"))?,
    );

    let fanout = Arc::new(LogFanout::new());
    let recorder = LogRecorder::new(logs.clone(), fanout.clone());
    let pipeline = Arc::new(RequestPipeline::new(
        rules.clone(),
        soft_blocks.clone(),
        hard_blocks.clone(),
        recorder,
        settings.threat_score_threshold,
    ));
    let upstream: Arc<dyn UpstreamClient> =
        Arc::new(ReqwestUpstream::new().wrap_err("failed to build upstream client")?);

    let cors = settings
        .cors_origins
        .as_deref()
        .map(admin::cors_layer)
        .transpose()
        .wrap_err("invalid CORS_ORIGINS")?;

    let state = AppState {
        pipeline,
        upstream,
        rules,
        hard_blocks,
        soft_blocks,
        logs,
        fanout,
        db: pool.clone(),
        settings: settings.clone(),
    };
    let app = build_router(state, cors);

    let addr: SocketAddr = settings
        .listen_addr()
        .parse()
        .wrap_err("failed to parse listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(error) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!(%error, "signal handler error");
        }
    });

    tracing::info!(
        listen = %addr,
        origin = %settings.backend_url,
        threshold = settings.threat_score_threshold,
        "warden started"
    );

    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result.wrap_err("server error")?;
        }
        reason = graceful_shutdown.wait_for_shutdown_signal() => {
            tracing::info!(?reason, "shutting down");
        }
    }

    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}
