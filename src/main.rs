//! Tanya CLI - ask questions about your documents

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tanya::application::UploadDocumentRequest;
use tanya::domain::{SearchResult, Visibility};
use tanya::settings::{available_generators, GeneratorBackend};
use tanya::AppHandles;

#[derive(Parser)]
#[command(name = "tanya")]
#[command(about = "Ask questions about your documents")]
#[command(after_help = "\
QUICK START:
  tanya add --user alice --project finance budget.txt
  tanya ask --user alice \"What is the budget?\"

COMMON WORKFLOWS:
  tanya list --user alice         # Documents alice can see
  tanya backend offline           # Answer without a hosted model
  tanya health                    # Check storage status")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the text of a file
    Add {
        /// File to read (UTF-8 text)
        path: PathBuf,
        /// Uploading user
        #[arg(short, long)]
        user: String,
        /// Project the document belongs to
        #[arg(short, long)]
        project: String,
        /// Display name (default: file name)
        #[arg(short, long)]
        name: Option<String>,
        /// Share with every user instead of keeping private
        #[arg(long)]
        team: bool,
    },
    /// List documents visible to a user
    List {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        project: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a document you uploaded
    Remove {
        id: Uuid,
        #[arg(short, long)]
        user: String,
    },
    /// Ask a question about the documents visible to a user
    Ask {
        query: String,
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        project: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List projects with documents visible to a user
    Projects {
        #[arg(short, long)]
        user: String,
    },
    /// Check storage health
    Health,
    /// Show or switch the answer generator
    Backend {
        /// Generator id (openai, offline); omit to show the current one
        id: Option<String>,
        /// Model name for hosted generators
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tanya::init_tracing();

    let handles = tokio::task::spawn_blocking(tanya::build_environment)
        .await
        .context("environment task panicked")?
        .context("failed to bootstrap Tanya environment")?;

    match cli.command {
        Commands::Add {
            path,
            user,
            project,
            name,
            team,
        } => cmd_add(&handles, path, user, project, name, team).await,
        Commands::List {
            user,
            project,
            json,
        } => cmd_list(&handles, user, project, json).await,
        Commands::Remove { id, user } => cmd_remove(&handles, id, user).await,
        Commands::Ask {
            query,
            user,
            project,
            json,
        } => cmd_ask(&handles, &query, &user, project.as_deref(), json).await,
        Commands::Projects { user } => cmd_projects(&handles, user).await,
        Commands::Health => cmd_health(&handles).await,
        Commands::Backend { id, model } => cmd_backend(&handles, id, model),
    }
}

/// Build an upload request from a UTF-8 text file.
async fn read_upload(
    path: &Path,
    user: String,
    project: String,
    name: Option<String>,
    team: bool,
) -> Result<UploadDocumentRequest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {} as UTF-8 text", path.display()))?;

    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("{} has no file name", path.display()))?,
    };
    let file_type = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());

    Ok(UploadDocumentRequest {
        name,
        content,
        file_type,
        project_id: project,
        uploaded_by: user,
        visibility: if team {
            Visibility::Team
        } else {
            Visibility::Private
        },
    })
}

async fn cmd_add(
    handles: &AppHandles,
    path: PathBuf,
    user: String,
    project: String,
    name: Option<String>,
    team: bool,
) -> Result<()> {
    let request = read_upload(&path, user, project, name, team).await?;

    let library = std::sync::Arc::clone(&handles.library);
    let summary = tokio::task::spawn_blocking(move || library.upload(request))
        .await
        .context("upload task panicked")??;

    println!(
        "Added {} ({} bytes) as {}",
        summary.name, summary.file_size, summary.id
    );
    Ok(())
}

async fn cmd_list(
    handles: &AppHandles,
    user: String,
    project: Option<String>,
    json_output: bool,
) -> Result<()> {
    let library = std::sync::Arc::clone(&handles.library);
    let response = tokio::task::spawn_blocking(move || library.list(&user, project.as_deref()))
        .await
        .context("list task panicked")??;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.items.is_empty() {
        println!("No documents found");
        return Ok(());
    }

    for doc in &response.items {
        println!(
            "{}  {:<8} {:<12} {}  {}",
            doc.id,
            format!("{:?}", doc.visibility).to_lowercase(),
            doc.project_id,
            doc.created_at.format("%Y-%m-%d %H:%M"),
            doc.name
        );
    }
    Ok(())
}

async fn cmd_remove(handles: &AppHandles, id: Uuid, user: String) -> Result<()> {
    let library = std::sync::Arc::clone(&handles.library);
    tokio::task::spawn_blocking(move || library.remove(&user, id))
        .await
        .context("remove task panicked")??;
    println!("Removed {id}");
    Ok(())
}

async fn cmd_ask(
    handles: &AppHandles,
    query: &str,
    user: &str,
    project: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let outcome = handles.query.ask(user, query, project, &cancel).await;
    interrupt.abort();
    let result = outcome?;

    let Some(result) = result else {
        if json_output {
            println!("null");
        } else {
            println!("Nothing to answer: the question is empty or no documents are visible.");
        }
        return Ok(());
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(result.as_ref())?);
        return Ok(());
    }

    print_result(&result);
    Ok(())
}

fn print_result(result: &SearchResult) {
    println!("{}\n", result.answer);
    if result.sources.is_empty() {
        println!("No matching sources.");
        return;
    }
    println!("Sources:");
    for (rank, source) in result.sources.iter().enumerate() {
        println!(
            "  {}. {} (confidence {:.2})",
            rank + 1,
            source.document_name,
            source.confidence
        );
        println!("     {}", source.relevant_text.replace('\n', " "));
    }
}

async fn cmd_projects(handles: &AppHandles, user: String) -> Result<()> {
    let library = std::sync::Arc::clone(&handles.library);
    let projects = tokio::task::spawn_blocking(move || library.projects(&user))
        .await
        .context("projects task panicked")??;

    if projects.is_empty() {
        println!("No projects found");
    }
    for project in projects {
        println!("{project}");
    }
    Ok(())
}

async fn cmd_health(handles: &AppHandles) -> Result<()> {
    let library = std::sync::Arc::clone(&handles.library);
    let status = tokio::task::spawn_blocking(move || library.health())
        .await
        .context("health task panicked")??;

    println!("Storage: {}", status.message);
    if let Some(details) = status.details {
        println!("  {details}");
    }
    println!("Generator: {}", handles.query.generator_name());
    println!("Data directory: {}", handles.data_dir.display());

    if !status.ok {
        bail!("storage unhealthy");
    }
    Ok(())
}

fn cmd_backend(handles: &AppHandles, id: Option<String>, model: Option<String>) -> Result<()> {
    let Some(id) = id else {
        let current = handles.config.current().generator;
        println!("Active: {} ({})", current.id(), current.model_name());
        println!("Available:");
        for backend in available_generators() {
            println!("  {:<8} {}", backend.id(), backend.label());
        }
        return Ok(());
    };

    let backend = GeneratorBackend::with_default_model(&id)
        .ok_or_else(|| anyhow!("unknown generator '{id}'"))?
        .with_model(model);
    let updated = handles
        .config
        .set_generator(backend)
        .context("failed to save config")?;

    println!(
        "Generator set to {} ({}); takes effect on the next run",
        updated.generator.id(),
        updated.generator.model_name()
    );
    Ok(())
}
