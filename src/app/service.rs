use crate::bot::{Router, menu};
use crate::config::Config;
use crate::llm::{Inference, OpenRouterProvider};
use crate::media::{MediaFetcher, TelegramMediaFetcher};
use crate::observability::persist_error_logs;
use crate::prompt::ContextAssembler;
use crate::session::{LimitsValidator, SessionManager};
use crate::stats::{ErrorLogEntry, Statistics};
use crate::storage::{self, Stores};
use crate::transport::{Messenger, TelegramChannel};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Inbound events buffered between the poller and the lanes.
const EVENT_QUEUE_CAPACITY: usize = 100;

/// How long queued per-user work may run after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// The assembled bot: one transport feeding the router.
pub struct Service {
    messenger: Arc<dyn Messenger>,
    inference: Arc<dyn Inference>,
    router: Router,
    locale: String,
}

impl Service {
    pub fn new(
        config: &Config,
        messenger: Arc<dyn Messenger>,
        inference: Arc<dyn Inference>,
        media: Arc<dyn MediaFetcher>,
        stores: &Stores,
    ) -> Result<Self> {
        let locale = config.effective_locale();
        let assembler = ContextAssembler::new(
            Arc::clone(&inference),
            media,
            &config.llm,
            &config.media,
            &config.prompt,
            locale.clone(),
        )?;
        let sessions = SessionManager::new(
            stores.sessions.clone(),
            LimitsValidator::new(config.limits.clone(), locale.clone()),
        );
        let stats = Statistics::new(stores.stats.clone());
        let router = Router::new(
            Arc::clone(&messenger),
            sessions,
            assembler,
            stats,
            &config.prompt,
            locale.clone(),
        );

        Ok(Self {
            messenger,
            inference,
            router,
            locale,
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register the command menu and warm the model connection, then feed
    /// every inbound event to the router until the transport stops. Returns after queued work has drained or
    /// the grace period ran out.
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<()> {
        if !self.messenger.health_check().await {
            tracing::warn!(
                transport = self.messenger.name(),
                "health check failed, polling anyway"
            );
        }
        if let Err(e) = self.messenger.set_commands(&menu(&self.locale)).await {
            tracing::warn!("failed to register the command menu: {e:#}");
        }
        if let Err(e) = self.inference.warmup().await {
            tracing::warn!(provider = self.inference.name(), "warmup failed: {e:#}");
        }

        let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let listener = self.messenger.listen(tx, shutdown);
        let dispatcher = async {
            while let Some(event) = rx.recv().await {
                drop(self.router.dispatch(event));
            }
        };
        let (listened, ()) = tokio::join!(listener, dispatcher);
        if let Err(e) = &listened {
            tracing::error!(transport = self.messenger.name(), "listener stopped: {e:#}");
        }

        let lanes = self.router.lanes();
        if !lanes.wait_idle(SHUTDOWN_GRACE).await {
            tracing::warn!(
                active_lanes = lanes.active_lanes(),
                "shutdown grace period elapsed with work still queued"
            );
        }
        listened
    }
}

/// `run` subcommand: serve Telegram until Ctrl-C or SIGTERM.
pub(super) async fn run(config: &Config, error_logs: mpsc::Receiver<ErrorLogEntry>) -> Result<()> {
    config.validate_credentials()?;
    config.apply_locale();

    let pool = storage::open_pool(&config.storage.resolved_url()).await?;
    let stores = storage::migrate(&pool).await?;
    let error_writer = tokio::spawn(persist_error_logs(error_logs, stores.stats.clone()));

    let telegram = Arc::new(TelegramChannel::from_config(&config.telegram));
    let inference = Arc::new(OpenRouterProvider::from_config(&config.llm));
    let media = Arc::new(TelegramMediaFetcher::new(Arc::clone(&telegram), &config.media));
    let service = Service::new(config, telegram, inference, media, &stores)?;

    let shutdown = CancellationToken::new();
    let signal = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("shutdown requested");
            shutdown.cancel();
        })
    };

    println!("{}", t!("cli.started"));
    println!("   {}", t!("cli.stop_hint"));
    tracing::info!(
        provider = service.inference.name(),
        model = %config.llm.model,
        locale = %service.locale,
        "serving"
    );

    let served = service.serve(shutdown).await;

    signal.abort();
    drop(service);
    error_writer.abort();
    pool.close().await;
    println!("{}", t!("cli.stopped"));
    served
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {e}");
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
}
