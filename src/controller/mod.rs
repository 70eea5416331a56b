//! Controller module - Application logic and event handling
//!
//! This module contains the application controller that handles user input
//! and coordinates between the model, the catalog and the player task.
//! It is organized into submodules by responsibility:
//!
//! - `input`: Key event handling
//! - `playback`: Playback intents forwarded to the player task
//! - `player_events`: Display updates from the player applied to the model

mod input;
mod playback;
mod player_events;

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use fractal_player::catalog::CatalogClient;
use fractal_player::model::AppModel;
use fractal_player::player::PlayerHandle;

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<AppModel>,
    pub(crate) player: PlayerHandle,
    pub(crate) catalog: CatalogClient,
    catalog_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppController {
    pub fn new(model: Arc<AppModel>, player: PlayerHandle, catalog: CatalogClient) -> Self {
        Self {
            model,
            player,
            catalog,
            catalog_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a catalog load in the background, aborting any load in flight.
    pub async fn load_catalog(&self) {
        let generation = self.model.begin_catalog_load().await;
        tracing::info!(generation, origin = %self.catalog.origin(), "Loading catalog");

        let model = self.model.clone();
        let catalog = self.catalog.clone();
        let task = tokio::spawn(async move {
            let result = catalog.fetch_catalog().await.map_err(|e| {
                tracing::error!(error = %e, "Catalog load failed");
                e.to_string()
            });
            model.finish_catalog_load(generation, result).await;
        });

        if let Some(previous) = self.catalog_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    pub async fn shutdown(&self) {
        if let Some(task) = self.catalog_task.lock().await.take() {
            task.abort();
        }
        self.player.shutdown();
    }
}
