use std::sync::Arc;

use anyhow::Context;
use ddig_notify::{mailer_from_settings, Dispatcher};
use ddig_server::AppState;
use ddig_settings::{DdigSettings, StoreBackend};
use ddig_store::{JsonlStore, RecordStore, SqliteStore};
use ddig_telemetry::{init_telemetry, TelemetryConfig};

fn open_store(settings: &DdigSettings) -> anyhow::Result<Arc<dyn RecordStore>> {
    let dir = &settings.store.data_dir;
    Ok(match settings.store.backend {
        StoreBackend::Jsonl => Arc::new(
            JsonlStore::open(dir).with_context(|| format!("opening {}", dir.display()))?,
        ),
        StoreBackend::Sqlite => {
            let path = dir.join("ddig.db");
            Arc::new(SqliteStore::open(&path).with_context(|| format!("opening {}", path.display()))?)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ddig_settings::load_settings().context("loading settings")?;

    init_telemetry(&TelemetryConfig {
        log_level: settings.telemetry.level.clone(),
        module_levels: settings
            .telemetry
            .modules
            .iter()
            .map(|(module, level)| (module.clone(), level.clone()))
            .collect(),
        json: settings.telemetry.json,
    })?;

    tracing::info!(
        path = %ddig_settings::settings_path().display(),
        backend = ?settings.store.backend,
        "starting DDIG backend"
    );

    let store = open_store(&settings)?;
    let mailer = mailer_from_settings(&settings.mail).context("building mail transport")?;
    let dispatcher = Arc::new(Dispatcher::from_settings(&settings, mailer)?);

    let state = AppState::new(Arc::new(settings), store, dispatcher)?;
    let handle = ddig_server::start(state).await?;
    tracing::info!(port = handle.port(), "DDIG backend ready");

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl-c")?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
