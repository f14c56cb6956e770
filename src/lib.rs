use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(feature = "mcp-server")]
pub mod interfaces;
pub mod settings;

use application::services::{AnswerGenerator, CorpusAccessor, DocumentStore};
use application::{LibraryService, QueryService};
use infrastructure::http_client::{DEFAULT_HOST, DEFAULT_PORT};
use infrastructure::{
    check_service_availability, NoOpGenerator, OfflineGenerator, OpenAiCompatibleGenerator,
    RemoteDocumentStore, SledDocumentStore,
};
use settings::{ConfigManager, GeneratorBackend};

const ENV_DATA_DIR: &str = "TANYA_DATA_DIR";
const ENV_SERVICE_HOST: &str = "TANYA_SERVICE_HOST";
const ENV_SERVICE_PORT: &str = "TANYA_SERVICE_PORT";
const ENV_LOG: &str = "TANYA_LOG";

/// Everything a front end needs: the query orchestrator, the document
/// library, the raw store behind it and the active configuration.
#[derive(Clone)]
pub struct AppHandles {
    pub query: Arc<QueryService>,
    pub library: Arc<LibraryService>,
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<ConfigManager>,
    pub data_dir: PathBuf,
}

/// Host and port of tanya-service, from the environment or defaults.
pub fn service_endpoint() -> (String, u16) {
    let host = std::env::var(ENV_SERVICE_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = std::env::var(ENV_SERVICE_PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    (host, port)
}

/// Build the environment, proxying storage to tanya-service when one is
/// running so the sled lock stays with the service.
pub fn build_environment() -> Result<AppHandles> {
    let (host, port) = service_endpoint();

    if check_service_availability(&host, port) {
        info!(target: "tanya", %host, port, "using remote document store");
        return build_environment_remote(&host, port);
    }

    info!(target: "tanya", "no tanya-service detected, opening local store");
    build_environment_local(&resolve_data_dir()?)
}

/// Build environment using the local sled database under `data_dir`.
pub fn build_environment_local(data_dir: &Path) -> Result<AppHandles> {
    let config = Arc::new(ConfigManager::load(data_dir).context("failed to load config file")?);

    let store_path = data_dir.join("store");
    std::fs::create_dir_all(&store_path).context("failed to create store directory")?;
    let store = Arc::new(
        SledDocumentStore::open(&store_path)
            .map_err(|err| anyhow!(err.to_string()))
            .context("failed to open embedded store")?,
    );

    Ok(assemble(store, config, data_dir.to_path_buf()))
}

/// Build environment using remote tanya-service
fn build_environment_remote(host: &str, port: u16) -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;
    let config = Arc::new(ConfigManager::load(&data_dir).context("failed to load config file")?);
    let store = Arc::new(RemoteDocumentStore::new(host, port));

    Ok(assemble(store, config, data_dir))
}

fn assemble<S>(store: Arc<S>, config: Arc<ConfigManager>, data_dir: PathBuf) -> AppHandles
where
    S: DocumentStore + 'static,
{
    let active = config.current();
    let generator = init_generator(&active.generator);
    let corpus: Arc<dyn CorpusAccessor> = store.clone();
    let documents: Arc<dyn DocumentStore> = store;

    AppHandles {
        query: Arc::new(QueryService::new(
            generator,
            corpus,
            active.query_config(),
        )),
        library: Arc::new(LibraryService::new(Arc::clone(&documents))),
        store: documents,
        config,
        data_dir,
    }
}

/// Instantiate the configured generator.
///
/// A hosted backend without an API key falls back to a generator that
/// reports the problem on first use.
pub fn init_generator(backend: &GeneratorBackend) -> Arc<dyn AnswerGenerator> {
    match backend {
        GeneratorBackend::Offline => Arc::new(OfflineGenerator::new(backend.model_name())),
        GeneratorBackend::OpenAi {
            base_url,
            model,
            api_key_env,
            timeout_secs,
        } => {
            let api_key = std::env::var(api_key_env)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty());
            if api_key.is_none() {
                warn!(target: "tanya", env = %api_key_env, "API key not set");
                return Arc::new(NoOpGenerator::new(format!("{api_key_env} is not set")));
            }
            match OpenAiCompatibleGenerator::try_new(
                base_url.clone(),
                model.clone(),
                api_key,
                Duration::from_secs(*timeout_secs),
            ) {
                Ok(generator) => Arc::new(generator),
                Err(err) => {
                    warn!(target: "tanya", error = %err, "generator misconfigured");
                    Arc::new(NoOpGenerator::new(err.to_string()))
                }
            }
        }
    }
}

/// Install the stderr log subscriber once per process. `TANYA_LOG` takes
/// an `EnvFilter` directive; stdout stays free for command and MCP output.
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(ENV_LOG)
            .unwrap_or_else(|_| EnvFilter::new("warn,tanya=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

/// Bootstrap the environment and serve MCP over stdin/stdout.
#[cfg(feature = "mcp-server")]
pub async fn run_mcp_stdio() -> Result<()> {
    init_tracing();

    let handles = tokio::task::spawn_blocking(build_environment)
        .await
        .context("environment task panicked")?
        .context("failed to bootstrap Tanya environment")?;

    info!(target: "tanya::mcp", "Starting MCP stdio server (stdin/stdout transport)...");

    interfaces::mcp::run_mcp_stdio_server(handles)
        .await
        .context("MCP stdio server failed")?;

    Ok(())
}

pub fn resolve_data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(ENV_DATA_DIR) {
        Some(dir) => PathBuf::from(dir),
        None => directories::ProjectDirs::from("dev", "tanya", "Tanya")
            .ok_or_else(|| anyhow!("unable to determine OS data dir"))?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir).context("failed to create data directory")?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::application::UploadDocumentRequest;
    use crate::domain::Visibility;

    fn local_offline() -> (tempfile::TempDir, AppHandles) {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigManager::load(dir.path()).unwrap();
        config.set_generator(GeneratorBackend::Offline).unwrap();
        let handles = build_environment_local(dir.path()).unwrap();
        (dir, handles)
    }

    #[tokio::test]
    async fn local_environment_answers_end_to_end() {
        let (_dir, handles) = local_offline();
        handles
            .library
            .upload(UploadDocumentRequest {
                name: "Budget.txt".into(),
                content: "Total budget is $5000 for Q1".into(),
                file_type: Some("txt".into()),
                project_id: "finance".into(),
                uploaded_by: "alice".into(),
                visibility: Visibility::Private,
            })
            .unwrap();

        let result = handles
            .query
            .ask("alice", "What is the budget?", None, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert!(result.answer.contains("Budget.txt"));
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].confidence, 0.8);
        assert_eq!(handles.query.generator_name(), "tanya/offline");
    }

    #[tokio::test]
    async fn user_without_documents_gets_no_result() {
        let (_dir, handles) = local_offline();

        let result = handles
            .query
            .ask("nobody", "anything", None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(handles.query.latest().is_none());
    }

    #[test]
    fn hosted_backend_without_key_reports_on_use() {
        let backend = GeneratorBackend::OpenAi {
            base_url: "http://127.0.0.1:9".into(),
            model: "m".into(),
            api_key_env: "TANYA_TEST_KEY_THAT_IS_NEVER_SET".into(),
            timeout_secs: 1,
        };

        let generator = init_generator(&backend);

        assert_eq!(generator.name(), "unavailable");
        assert!(generator.generate("p", 1).is_err());
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        std::env::set_var("TANYA_TEST_BLANK_API_KEY", "   ");
        let backend = GeneratorBackend::OpenAi {
            base_url: "http://127.0.0.1:9".into(),
            model: "m".into(),
            api_key_env: "TANYA_TEST_BLANK_API_KEY".into(),
            timeout_secs: 1,
        };

        let generator = init_generator(&backend);

        assert_eq!(generator.name(), "unavailable");
        let err = generator.generate("p", 1).unwrap_err();
        assert!(err.to_string().contains("TANYA_TEST_BLANK_API_KEY is not set"));
    }
}
