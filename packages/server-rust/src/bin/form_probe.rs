//! `form-probe`: runs a query string or a request body through the form
//! parsing pipeline and prints the result as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use axum::body::Body;
use clap::{ArgGroup, Parser};
use http::Request;
use tracing::info;

use formcast_core::{JsonSchemaAdapter, ParseOptions, Schema};
use formcast_server::telemetry::init_tracing;
use formcast_server::{parse_request, validate_form, FormConfig, FormSource, RequestEvent};

/// Parse submitted form data against a JSON schema.
#[derive(Parser, Debug)]
#[command(name = "form-probe", version)]
#[command(group(ArgGroup::new("input").required(true).args(["query", "body"])))]
struct Cli {
    /// JSON schema describing the form object
    #[arg(long, env = "FORMCAST_SCHEMA")]
    schema: PathBuf,

    /// query string to parse (never counts as a submission)
    #[arg(long, env = "FORMCAST_QUERY")]
    query: Option<String>,

    /// file holding a request body to parse
    #[arg(long, env = "FORMCAST_BODY", requires = "content_type")]
    body: Option<PathBuf>,

    /// content type of the body, including any multipart boundary
    #[arg(long, env = "FORMCAST_CONTENT_TYPE")]
    content_type: Option<String>,

    /// fields passed through without coercion
    #[arg(long, env = "FORMCAST_PREPROCESSED", value_delimiter = ',')]
    preprocessed: Vec<String>,

    /// keep uploaded files in the output
    #[arg(long, env = "FORMCAST_ALLOW_FILES")]
    allow_files: bool,

    /// maximum body size in bytes
    #[arg(long, env = "FORMCAST_BODY_LIMIT", default_value_t = formcast_server::config::DEFAULT_BODY_LIMIT)]
    body_limit: usize,

    /// also validate the parsed data against the schema
    #[arg(long, env = "FORMCAST_VALIDATE")]
    validate: bool,

    /// emit logs as JSON
    #[arg(long, env = "FORMCAST_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn config(&self) -> FormConfig {
        FormConfig::default()
            .with_body_limit(self.body_limit)
            .with_parse(
                ParseOptions::default()
                    .with_preprocessed(self.preprocessed.iter().cloned())
                    .with_allow_files(self.allow_files),
            )
    }

    async fn request(&self) -> Result<Option<RequestEvent>> {
        let Some(path) = &self.body else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading body from {}", path.display()))?;
        let content_type = self.content_type.as_deref().unwrap_or_default();
        let request = Request::post("/")
            .header(http::header::CONTENT_TYPE, content_type)
            .body(Body::from(bytes))
            .context("building request")?;
        Ok(Some(RequestEvent::new(request)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let text = tokio::fs::read_to_string(&cli.schema)
        .await
        .with_context(|| format!("reading schema from {}", cli.schema.display()))?;
    let schema: Schema = serde_json::from_str(&text).context("parsing schema")?;
    let config = cli.config();

    let mut event = cli.request().await?;
    let source = match (&mut event, &cli.query) {
        (Some(event), _) => FormSource::Request(event),
        (None, Some(query)) => FormSource::query(query.clone()),
        (None, None) => bail!("either --query or --body is required"),
    };
    info!(kind = ?source.kind(), "parsing form");

    let output = if cli.validate {
        let adapter = JsonSchemaAdapter::new(schema);
        serde_json::to_string_pretty(&validate_form(source, &adapter, &config).await?)?
    } else {
        serde_json::to_string_pretty(&parse_request(source, &schema, &config).await?)?
    };
    println!("{output}");
    Ok(())
}
