//! Handle Service CLI - Command-line interface for the Handle Service

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use handle_service_sdk::{
    CallerConfig, Credentials, FetchHandlesParams, Handle, HandleId, HandleServiceClient,
    DEFAULT_AUTH_URL,
};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_SERVICE_URL: &str = "https://kbase.us/services/handle_service";

#[derive(Parser)]
#[command(name = "handle-service")]
#[command(about = "Handle Service CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Handle service URL
    #[arg(long, env = "HANDLE_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    url: String,

    /// Auth token (ignored when --user is given)
    #[arg(long, env = "KB_AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// User name (log in with --password; takes precedence over --token)
    #[arg(long, env = "HANDLE_SERVICE_USER", requires = "password")]
    user: Option<String>,

    /// Password for --user
    #[arg(long, env = "HANDLE_SERVICE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Auth service URL
    #[arg(long, env = "HANDLE_SERVICE_AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    auth_url: String,

    /// Read timeout in milliseconds (0 = wait forever)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Allow the token to be sent over plain http
    #[arg(long)]
    insecure_http: bool,

    /// Trust all TLS certificates, self-signed included
    #[arg(long)]
    trust_all_certs: bool,

    /// Stream request bodies in chunks
    #[arg(long)]
    streaming: bool,

    /// Pin calls to a deployed service version
    #[arg(long)]
    service_version: Option<String>,

    /// Write the raw response to this file before decoding it
    #[arg(long)]
    response_file: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Persist a handle read from a JSON file ("-" for stdin)
    Persist {
        /// Path to the handle JSON
        file: String,
    },

    /// Look handles up by handle id
    HidsToHandles {
        #[arg(required = true)]
        hids: Vec<HandleId>,
    },

    /// Look handles up by store node id
    IdsToHandles {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Fetch handles whose FIELD is one of ELEMENTS
    FetchBy {
        /// Field to match (hid, id, file_name, ...)
        #[arg(short, long)]
        field: String,

        #[arg(required = true)]
        elements: Vec<String>,
    },

    /// Check that you own the data behind every handle
    IsOwner {
        #[arg(required = true)]
        hids: Vec<HandleId>,
    },

    /// Delete handles by handle id
    Delete {
        #[arg(required = true)]
        hids: Vec<HandleId>,
    },

    /// Check that the data behind every handle is readable
    AreReadable {
        #[arg(required = true)]
        hids: Vec<HandleId>,
    },

    /// Check that the data behind one handle is readable
    IsReadable { hid: HandleId },

    /// Grant a user read access to the data behind the handles
    AddReadAcl {
        /// User to grant read access to
        #[arg(short, long = "user")]
        username: String,

        #[arg(required = true)]
        hids: Vec<HandleId>,
    },

    /// Make the data behind the handles world-readable
    SetPublicRead {
        #[arg(required = true)]
        hids: Vec<HandleId>,
    },

    /// Show service status
    Status,
}

#[derive(Tabled)]
struct HandleRow {
    hid: String,
    file_name: String,
    id: String,
    #[tabled(rename = "type")]
    store_type: String,
    url: String,
    remote_md5: String,
}

impl From<&Handle> for HandleRow {
    fn from(handle: &Handle) -> Self {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        Self {
            hid: field(&handle.hid),
            file_name: field(&handle.file_name),
            id: field(&handle.id),
            store_type: field(&handle.store_type),
            url: field(&handle.url),
            remote_md5: field(&handle.remote_md5),
        }
    }
}

fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("HANDLE_SERVICE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("handle_service=info"))
        .context("Failed to create env filter")?;

    // stdout is for results, logs go to stderr
    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

/// User and password win over a token, which may come from the environment
fn credentials(cli: &Cli) -> Credentials {
    match (&cli.user, &cli.password, &cli.token) {
        (Some(user), Some(password), _) => Credentials::Password {
            user: user.clone(),
            password: password.clone(),
        },
        (_, _, Some(token)) => Credentials::Token(token.clone()),
        _ => Credentials::Anonymous,
    }
}

async fn build_client(cli: &Cli) -> Result<HandleServiceClient> {
    let config = CallerConfig {
        read_timeout: cli.timeout_ms.map(Duration::from_millis),
        insecure_http_allowed: cli.insecure_http,
        trust_all_certificates: cli.trust_all_certs,
        streaming: cli.streaming,
        auth_url: cli.auth_url.clone(),
    };

    let credentials = credentials(cli);
    tracing::debug!(url = %cli.url, auth_url = %cli.auth_url, "Connecting to handle service");

    let mut client = HandleServiceClient::connect(&cli.url, credentials, config)
        .await
        .context("Failed to create handle service client")?;
    client.set_service_version(cli.service_version.clone());

    if let Some(path) = &cli.response_file {
        let path = PathBuf::from(shellexpand::tilde(path).into_owned());
        client.set_file_for_next_rpc_response(Some(path));
    }

    Ok(client)
}

fn read_handle(file: &str) -> Result<Handle> {
    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read handle from stdin")?;
        buf
    } else {
        let path = shellexpand::tilde(file).into_owned();
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?
    };

    serde_json::from_str(&raw).context("Invalid handle JSON")
}

fn print_handles(handles: &[Handle], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(handles)?);
        return Ok(());
    }

    if handles.is_empty() {
        println!("{}", "No handles found".yellow());
        return Ok(());
    }

    let rows: Vec<HandleRow> = handles.iter().map(HandleRow::from).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

/// Print a boolean-as-long answer
fn print_flag(label: &str, value: i64, json: bool) {
    println!("{}", flag_line(label, value, json));
}

fn flag_line(label: &str, value: i64, json: bool) -> String {
    if json {
        value.to_string()
    } else if value != 0 {
        format!("{} {}", "✓".green(), label)
    } else {
        format!("{} not {}", "✗".red(), label)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let client = build_client(&cli).await?;

    match &cli.command {
        Commands::Persist { file } => {
            let handle = read_handle(file)?;
            let hid = client.persist_handle(&handle, None).await?;

            if cli.json {
                println!("{}", serde_json::to_string(&hid)?);
            } else {
                println!("{}", format!("✓ Handle persisted: {}", hid).green().bold());
            }
        }

        Commands::HidsToHandles { hids } => {
            let handles = client.hids_to_handles(hids, None).await?;
            print_handles(&handles, cli.json)?;
        }

        Commands::IdsToHandles { ids } => {
            let handles = client.ids_to_handles(ids, None).await?;
            print_handles(&handles, cli.json)?;
        }

        Commands::FetchBy { field, elements } => {
            let params = FetchHandlesParams::new(field.as_str(), elements.iter().map(String::as_str));
            let handles = client.fetch_handles_by(&params, None).await?;
            print_handles(&handles, cli.json)?;
        }

        Commands::IsOwner { hids } => {
            let owned = client.is_owner(hids, None).await?;
            print_flag("owner of all handles", owned, cli.json);
        }

        Commands::Delete { hids } => {
            let handles = client.hids_to_handles(hids, None).await?;
            if handles.is_empty() {
                bail!("None of the given handle ids exist");
            }

            let deleted = client.delete_handles(&handles, None).await?;
            if cli.json {
                println!("{}", deleted);
            } else {
                println!("{}", format!("✓ {} handle(s) deleted", deleted).green().bold());
            }
        }

        Commands::AreReadable { hids } => {
            let readable = client.are_readable(hids, None).await?;
            print_flag("all readable", readable, cli.json);
        }

        Commands::IsReadable { hid } => {
            let readable = client.is_readable(hid, None).await?;
            print_flag("readable", readable, cli.json);
        }

        Commands::AddReadAcl { username, hids } => {
            let granted = client.add_read_acl(hids, username, None).await?;
            print_flag(
                &format!("read access granted to {} on {} handle(s)", username, hids.len()),
                granted,
                cli.json,
            );
        }

        Commands::SetPublicRead { hids } => {
            let public = client.set_public_read(hids, None).await?;
            print_flag(
                &format!("public read set on {} handle(s)", hids.len()),
                public,
                cli.json,
            );
        }

        Commands::Status => {
            let status = client.status(None).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", "Handle Service Status".cyan().bold());
                println!();
                println!("  {} {}", "URL:".bold(), cli.url);
                for (key, value) in &status {
                    let shown = value
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| value.to_string());
                    println!("  {} {}", format!("{}:", key).bold(), shown);
                }
            }
        }
    }

    Ok(())
}
