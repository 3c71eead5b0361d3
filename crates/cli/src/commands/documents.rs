//! Documents command handler.
//!
//! Document management against the configured store.

use super::{open_store, print_json};
use askstore_core::{config::AppConfig, AppError, AppResult};
use askstore_knowledge::{
    list_all_documents, DocumentAdmin, DocumentIndex, DocumentRef, Operation, PageRequest,
    UploadRequest,
};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Manage documents in the store
#[derive(Args, Debug)]
pub struct DocumentsCommand {
    #[command(subcommand)]
    pub action: DocumentsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocumentsAction {
    /// List documents
    List(ListCommand),
    /// Upload a file
    Upload(UploadCommand),
    /// Show the status of an upload operation
    Status(StatusCommand),
    /// Delete a document and its chunks
    Delete(DeleteCommand),
}

impl DocumentsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            DocumentsAction::List(cmd) => cmd.execute(config).await,
            DocumentsAction::Upload(cmd) => cmd.execute(config).await,
            DocumentsAction::Status(cmd) => cmd.execute(config).await,
            DocumentsAction::Delete(cmd) => cmd.execute(config).await,
        }
    }
}

/// List documents
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Page size (at most 20)
    #[arg(long, default_value = "20")]
    pub page_size: u32,

    /// Token from a previous page
    #[arg(long)]
    pub page_token: Option<String>,

    /// Follow page tokens and list every document
    #[arg(short, long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing documents list command");

        let store = open_store(config)?;

        let (documents, next_page_token) = if self.all {
            (list_all_documents(store.as_ref()).await?, None)
        } else {
            let page = store
                .list_documents(PageRequest::new(self.page_size, self.page_token.clone()))
                .await?;
            (page.documents, page.next_page_token)
        };

        if self.json {
            return print_json(&serde_json::json!({
                "documents": documents,
                "next_page_token": next_page_token,
            }));
        }

        if documents.is_empty() {
            println!("No documents in {}", store.store_name());
            return Ok(());
        }

        for document in &documents {
            println!("{}", describe(document));
        }

        if let Some(token) = next_page_token {
            println!();
            println!("More documents available: --page-token {}", token);
        }

        Ok(())
    }
}

fn describe(document: &DocumentRef) -> String {
    let size = document
        .size_bytes
        .as_deref()
        .map(|s| format!(", {} bytes", s))
        .unwrap_or_default();
    format!(
        "{}  [{:?}{}]\n    {}",
        document.label(),
        document.state,
        size,
        document.name
    )
}

/// Upload a file
#[derive(Args, Debug)]
pub struct UploadCommand {
    /// File to upload
    pub path: PathBuf,

    /// Display name (default: file name, truncated to 512 characters)
    #[arg(long)]
    pub display_name: Option<String>,

    /// MIME type (default: guessed from the file name)
    #[arg(long)]
    pub mime_type: Option<String>,

    /// Custom metadata as key=value (repeatable)
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,

    /// Wait until the store has finished processing the file
    #[arg(long)]
    pub wait: bool,

    /// Seconds between status checks when waiting
    #[arg(long, default_value = "2")]
    pub poll_secs: u64,

    /// Give up waiting after this many seconds
    #[arg(long, default_value = "300")]
    pub timeout_secs: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl UploadCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing documents upload command for {:?}", self.path);

        let bytes = std::fs::read(&self.path)?;
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| AppError::InvalidInput(format!("Not a file: {:?}", self.path)))?;

        let mut upload = UploadRequest::new(file_name, bytes);
        upload.display_name = self.display_name.clone();
        upload.mime_type = self.mime_type.clone();
        upload.custom_metadata = self.metadata.clone();

        let store = open_store(config)?;
        let mut operation = store.upload_document(upload).await?;

        if self.wait && !operation.done {
            operation = wait_for(
                store.as_ref(),
                &operation.name,
                Duration::from_secs(self.poll_secs.max(1)),
                Duration::from_secs(self.timeout_secs),
            )
            .await?;
        }

        if self.json {
            return print_json(&serde_json::to_value(&operation)?);
        }

        print_operation(&operation);
        Ok(())
    }
}

/// Poll an operation until it is done or `timeout` elapses.
async fn wait_for(
    store: &dyn DocumentAdmin,
    name: &str,
    interval: Duration,
    timeout: Duration,
) -> AppResult<Operation> {
    let started = tokio::time::Instant::now();

    loop {
        let operation = store.get_operation(name).await?;
        if operation.done {
            return Ok(operation);
        }

        if started.elapsed() >= timeout {
            return Err(AppError::Other(format!(
                "Operation {} still running after {:?}",
                name, timeout
            )));
        }

        tracing::debug!("Operation {} still running", name);
        tokio::time::sleep(interval).await;
    }
}

fn print_operation(operation: &Operation) {
    println!("Operation: {}", operation.name);
    if operation.failed() {
        println!("Status: failed");
        if let Some(ref error) = operation.error {
            println!("Error: {}", error);
        }
    } else if operation.done {
        println!("Status: done");
        if let Some(name) = operation
            .response
            .as_ref()
            .and_then(|response| response.get("name"))
            .and_then(|name| name.as_str())
        {
            println!("Document: {}", name);
        }
    } else {
        println!("Status: processing");
    }
}

/// Show the status of an upload operation
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Operation name (fileSearchStores/.../upload/operations/...)
    pub operation: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let operation = store.get_operation(&self.operation).await?;

        if self.json {
            return print_json(&serde_json::to_value(&operation)?);
        }

        print_operation(&operation);
        Ok(())
    }
}

/// Delete a document and its chunks
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Document name (fileSearchStores/.../documents/...)
    pub name: String,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing documents delete command for {}", self.name);

        let store = open_store(config)?;
        store.delete_document(&self.name).await?;

        println!("Deleted {}", self.name);
        Ok(())
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}
