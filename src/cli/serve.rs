use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::config::QuestflowConfig;
use crate::core::deploy::{BrainbaseClient, DeploymentOrchestrator};
use crate::core::flow::{FlowPublisher, SystemClock};
use crate::core::lifecycle::LifecycleManager;
use crate::core::service::QuestionnaireService;
use crate::core::store::Store;
use crate::core::task::{SimulatedProcessor, TaskRunner};
use crate::core::terminal;
use crate::interfaces::web::{ApiServer, AppState};
use crate::logging;
use crate::platform::{self, NativePlatform, Platform};

pub struct ServeOverrides {
    pub api_host: Option<String>,
    pub api_port: Option<u16>,
}

pub async fn run_server(overrides: ServeOverrides) -> Result<()> {
    let env = |key: &str| std::env::var(key).ok();
    let data_dir = platform::resolve_data_dir(env)?;
    platform::ensure_data_dir(&data_dir)?;
    let config = QuestflowConfig::load(&data_dir, env)?;

    let log_tx = logging::init(config.log_level()?);
    terminal::print_banner();
    info!("Starting questflow API server (data dir {})", data_dir.display());

    let db_path = config.database_path(&data_dir);
    let store = Arc::new(Store::open(&db_path)?);
    if db_path.exists() {
        NativePlatform::restrict_file_permissions(&db_path);
    }

    let flows_dir = config.flows_dir(&data_dir);
    let publisher = FlowPublisher::new(
        &flows_dir,
        config.flows.extension.clone(),
        Arc::new(SystemClock),
    );

    let orchestrator = if config.deploy.enabled {
        let client = BrainbaseClient::new(
            config.deploy.base_url.clone(),
            config.deploy.api_key.clone(),
        );
        info!("Voice deployment enabled via {}", config.deploy.base_url);
        Some(DeploymentOrchestrator::new(
            Arc::new(client),
            config.deploy.phone_number.clone(),
        ))
    } else {
        terminal::print_warn("Voice deployment is disabled; start requests only generate flows.");
        None
    };

    let service = Arc::new(
        QuestionnaireService::new(store.clone(), publisher, orchestrator)
            .reject_running_starts(config.flows.reject_running_starts),
    );
    let runner = TaskRunner::new(store.clone(), Arc::new(SimulatedProcessor));
    let state = AppState::new(service, store, runner.clone(), log_tx);

    let api_host = overrides.api_host.unwrap_or(config.server.host.clone());
    let api_port = overrides.api_port.unwrap_or(config.server.port);

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(runner)));
    lifecycle.attach(Arc::new(Mutex::new(ApiServer::new(
        state,
        api_host.clone(),
        api_port,
    ))));
    lifecycle.start().await?;

    terminal::print_step("questflow is ready");
    terminal::print_status("Data", &data_dir.display().to_string());
    terminal::print_status("Flows", &flows_dir.display().to_string());
    terminal::print_link("API", &format!("http://{}:{}/api", api_host, api_port));
    terminal::print_info("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    lifecycle.shutdown().await?;
    terminal::print_goodbye();
    Ok(())
}
