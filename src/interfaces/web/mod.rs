mod handlers;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::core::lifecycle::LifecycleComponent;
use crate::core::service::QuestionnaireService;
use crate::core::store::TaskRepository;
use crate::core::task::TaskRunner;

#[derive(Clone)]
pub struct AppState {
    pub(crate) questionnaires: Arc<QuestionnaireService>,
    pub(crate) tasks: Arc<dyn TaskRepository>,
    pub(crate) runner: TaskRunner,
    pub(crate) log_tx: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(
        questionnaires: Arc<QuestionnaireService>,
        tasks: Arc<dyn TaskRepository>,
        runner: TaskRunner,
        log_tx: broadcast::Sender<String>,
    ) -> Self {
        Self {
            questionnaires,
            tasks,
            runner,
            log_tx,
        }
    }
}

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct ApiServer {
    state: AppState,
    api_host: String,
    api_port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(state: AppState, api_host: String, api_port: u16) -> Self {
        Self {
            state,
            api_host,
            api_port,
            shutdown_tx: None,
            handle: None,
        }
    }
}

// --- SSE Logs (used by router) ---

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(log) => Ok(Event::default().data(log)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream)
}

// --- Lifecycle ---

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("API Server Interface initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.api_host, self.api_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding API server to {}", addr))?;
        let local: SocketAddr = listener.local_addr()?;
        let app = router::build_api_router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        self.handle = Some(tokio::spawn(async move {
            info!("API Server running at http://{local}");
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!("API Server crashed: {}", e);
            }
        }));
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server Interface shutting down...");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Open /api/logs streams never finish on their own.
        if let Some(mut handle) = self.handle.take()
            && tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err()
        {
            tracing::warn!("API Server did not drain in time, aborting");
            handle.abort();
        }
        Ok(())
    }
}
