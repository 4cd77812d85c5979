use std::sync::Arc;

use core_types::{DocumentApi, ModelFallback, ModelInfo};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::LoadOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelsStatus {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Default)]
struct ModelsState {
    models: Vec<ModelInfo>,
    selected: Option<String>,
    status: ModelsStatus,
}

impl ModelsState {
    fn apply_default(&mut self, fallback: ModelFallback) {
        if self.selected.is_some() || self.models.is_empty() {
            return;
        }
        let chosen = self
            .models
            .iter()
            .find(|model| model.is_default)
            .or_else(|| match fallback {
                ModelFallback::FirstListed => self.models.first(),
                ModelFallback::None => None,
            });
        match chosen {
            Some(model) => {
                info!(model_id = %model.id, "default model selected");
                self.selected = Some(model.id.clone());
            }
            None => warn!("model list has no default; waiting for an explicit choice"),
        }
    }
}

#[derive(Clone)]
pub struct ModelSelector {
    api: Arc<dyn DocumentApi>,
    fallback: ModelFallback,
    state: Arc<Mutex<ModelsState>>,
}

impl ModelSelector {
    pub fn new(api: Arc<dyn DocumentApi>, fallback: ModelFallback) -> Self {
        Self {
            api,
            fallback,
            state: Arc::new(Mutex::new(ModelsState::default())),
        }
    }

    pub fn models(&self) -> Vec<ModelInfo> {
        self.state.lock().models.clone()
    }

    pub fn status(&self) -> ModelsStatus {
        self.state.lock().status.clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.state.lock().selected.clone()
    }

    /// Fetches the list once per session. Later calls are served from memory.
    pub async fn load(&self) -> LoadOutcome {
        {
            let mut state = self.state.lock();
            if matches!(state.status, ModelsStatus::Loaded | ModelsStatus::Loading) {
                return LoadOutcome::Skipped;
            }
            state.status = ModelsStatus::Loading;
        }
        self.fetch().await
    }

    /// Fetches again even if a list is cached. Never replaces an existing selection.
    pub async fn reload(&self) -> LoadOutcome {
        self.state.lock().status = ModelsStatus::Loading;
        self.fetch().await
    }

    /// User override. Returns false for ids not in the loaded list.
    pub fn select(&self, model_id: &str) -> bool {
        let mut state = self.state.lock();
        if !state.models.iter().any(|model| model.id == model_id) {
            return false;
        }
        info!(model_id, "model selected");
        state.selected = Some(model_id.to_owned());
        true
    }

    async fn fetch(&self) -> LoadOutcome {
        let result = self.api.list_models().await;
        let mut state = self.state.lock();
        match result {
            Ok(models) => {
                state.models = models;
                state.status = ModelsStatus::Loaded;
                state.apply_default(self.fallback);
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "failed to load models");
                state.status = ModelsStatus::Failed(err.to_string());
                LoadOutcome::Failed(err.to_string())
            }
        }
    }
}
