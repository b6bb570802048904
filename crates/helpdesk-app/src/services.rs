//! Composition root: every long-lived service, built once at startup.

use std::sync::Arc;

use tracing::info;

use helpdesk_agent::{default_registry, OrchestrationLoop, SupportAgent};
use helpdesk_core::config::{EmbeddingConfig, HelpdeskConfig};
use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_knowledge::{KnowledgeBase, RetrievalAnswerer, SyncReport};
use helpdesk_llm::{ChatModel, DynEmbeddingService, HashEmbedding, OpenAiChatModel, OpenAiEmbedding};
use helpdesk_storage::{Database, SqliteSupportStore};

/// Shared handles passed to the REPL and the HTTP server.
pub struct Services {
    pub config: HelpdeskConfig,
    pub store: Arc<SqliteSupportStore>,
    pub knowledge: Arc<KnowledgeBase>,
    pub agent: Arc<SupportAgent>,
}

impl Services {
    /// Open storage and the knowledge index and wire up the agent with the
    /// configured model provider.
    pub fn build(config: HelpdeskConfig) -> Result<Self> {
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::from_config(&config.model)?);
        Self::with_model(config, model)
    }

    /// Like [`build`](Self::build) with an explicit chat model.
    pub fn with_model(config: HelpdeskConfig, model: Arc<dyn ChatModel>) -> Result<Self> {
        let store = Arc::new(open_store(&config)?);

        let embedder = embedding_service(&config.embedding)?;
        let knowledge = Arc::new(KnowledgeBase::open(
            &config.knowledge,
            config.documents_dir(),
            config.index_dir(),
            embedder,
        )?);
        info!(
            chunks = knowledge.count(),
            documents = %config.documents_dir().display(),
            "Knowledge base opened"
        );

        let answerer = Arc::new(RetrievalAnswerer::new(
            knowledge.clone(),
            model.clone(),
            config.knowledge.top_k,
        ));
        let registry = default_registry(store.clone(), answerer, model.clone());
        let orchestrator =
            OrchestrationLoop::from_config(model.clone(), Arc::new(registry), &config.agent);
        let agent = Arc::new(SupportAgent::new(orchestrator, &config.agent));
        info!(model = model.name(), "Support agent ready");

        Ok(Self {
            config,
            store,
            knowledge,
            agent,
        })
    }

    pub async fn sync_knowledge(&self) -> Result<SyncReport> {
        self.knowledge.sync().await
    }

    /// Drop every handle. The index and tracker are already persisted by
    /// `sync`, so nothing is written here.
    pub fn shutdown(self) {
        let chunks = self.knowledge.count();
        drop(self.agent);
        drop(self.knowledge);
        drop(self.store);
        info!(chunks, "Services shut down");
    }
}

/// Open the ticket database under the data directory.
pub fn open_store(config: &HelpdeskConfig) -> Result<SqliteSupportStore> {
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let db_path = config.database_path();
    let db = Database::new(&db_path)?;
    info!(path = %db_path.display(), "SQLite database opened");
    Ok(SqliteSupportStore::new(Arc::new(db)))
}

fn embedding_service(config: &EmbeddingConfig) -> Result<Arc<dyn DynEmbeddingService>> {
    match config.provider.trim().to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedding::from_config(config)?)),
        "hash" => {
            info!(dimensions = config.dimensions, "Using offline hash embeddings");
            Ok(Arc::new(HashEmbedding::new(config.dimensions)))
        }
        other => Err(HelpdeskError::Config(format!(
            "Unknown embedding provider '{other}' (expected 'openai' or 'hash')"
        ))),
    }
}
