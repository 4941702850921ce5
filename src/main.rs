use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use glclusters::config::Config;
use glclusters::gitlab::{
    format_api_error, AddGroupClusterOptions, ApiError, AuthorizationType, Credentials,
    EditGroupClusterOptions, GitlabClient, GroupCluster, GroupClusters, GroupId, ListOptions,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Manage Kubernetes clusters attached to GitLab groups
#[derive(Parser, Debug)]
#[command(name = "glclusters", version, about, long_about = None)]
struct Args {
    /// GitLab instance URL (defaults to GITLAB_URL, then the saved config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Access token (defaults to GITLAB_TOKEN / GITLAB_PRIVATE_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Send the token as an OAuth bearer token
    #[arg(long, global = true)]
    oauth: bool,

    /// Group ID or full path (defaults to GITLAB_GROUP, then the saved config)
    #[arg(short, long, global = true)]
    group: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List clusters of the group
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
        /// Follow pagination until every cluster is listed
        #[arg(long, conflicts_with = "page")]
        all: bool,
    },
    /// Show one or more clusters
    Get {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Attach an existing Kubernetes cluster to the group
    Add(AddArgs),
    /// Update a cluster
    Edit(EditArgs),
    /// Detach a cluster from the group
    Delete { id: u64 },
    /// Save defaults to the config file
    Config {
        #[arg(long = "set-base-url")]
        set_base_url: Option<String>,
        #[arg(long = "set-group")]
        set_group: Option<String>,
    },
}

#[derive(ClapArgs, Debug)]
struct AddArgs {
    #[arg(long)]
    name: String,
    /// Kubernetes API URL
    #[arg(long)]
    api_url: String,
    /// Kubernetes service account token
    #[arg(long)]
    k8s_token: String,
    /// PEM file with the cluster CA certificate
    #[arg(long)]
    ca_cert_file: Option<PathBuf>,
    #[arg(long, value_parser = parse_authorization_type)]
    authorization_type: Option<AuthorizationType>,
    #[arg(long)]
    domain: Option<String>,
    #[arg(long)]
    environment_scope: Option<String>,
    #[arg(long)]
    managed: Option<bool>,
    #[arg(long)]
    enabled: Option<bool>,
}

#[derive(ClapArgs, Debug)]
struct EditArgs {
    id: u64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    domain: Option<String>,
    #[arg(long)]
    environment_scope: Option<String>,
    #[arg(long)]
    api_url: Option<String>,
    /// PEM file with the new CA certificate
    #[arg(long, conflicts_with = "clear_ca_cert")]
    ca_cert_file: Option<PathBuf>,
    /// Remove the configured CA certificate
    #[arg(long)]
    clear_ca_cert: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

fn parse_authorization_type(s: &str) -> std::result::Result<AuthorizationType, String> {
    s.parse()
}

/// A valid `RUST_LOG` wins over `--log-level`. `None` means logging stays off.
fn log_filter(level: LogLevel, rust_log: Option<&str>) -> Option<EnvFilter> {
    if let Some(directives) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return Some(filter),
            Err(err) => eprintln!("Warning: ignoring RUST_LOG ({err})"),
        }
    }
    level.directive().map(EnvFilter::new)
}

fn setup_logging(level: LogLevel) -> Result<Option<WorkerGuard>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let Some(filter) = log_filter(level, rust_log.as_deref()) else {
        return Ok(None);
    };

    let log_path = Config::log_path();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {:?}", dir))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_line_number(true)
        .init();

    tracing::debug!(path = %log_path.display(), "glclusters {}", env!("CARGO_PKG_VERSION"));
    Ok(Some(guard))
}

fn print_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read certificate {:?}", path))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {err:#}");
            None
        }
    };

    if let Err(err) = run(args).await {
        // API errors get a short, user facing message; details go to the log
        match err.downcast_ref::<ApiError>() {
            Some(api_err) => {
                tracing::error!("{}", api_err);
                eprintln!("Error: {}", format_api_error(api_err));
            }
            None => eprintln!("Error: {err:#}"),
        }
        // Flush buffered log lines before exiting
        drop(log_guard);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    if let Command::Config {
        set_base_url,
        set_group,
    } = &args.command
    {
        if let Some(url) = set_base_url {
            config.set_base_url(url)?;
        }
        if let Some(group) = set_group {
            config.set_group(group)?;
        }
        return print_output(&config, args.output);
    }

    let base_url = config.effective_base_url(args.base_url.as_deref());
    let Some(group) = config.effective_group(args.group.as_deref()) else {
        bail!("No group configured. Set GITLAB_GROUP or use --group");
    };
    let group: GroupId = group.parse()?;

    tracing::info!("Using {} group {}", base_url, group);

    let credentials = Credentials::resolve(args.token.as_deref(), args.oauth);
    let client = GitlabClient::with_timeout(&base_url, credentials, config.timeout())?;
    let clusters = client.group_clusters();

    match args.command {
        Command::List {
            page,
            per_page,
            all,
        } => {
            if all {
                let list = clusters.list_all_clusters(&group).await?;
                print_output(&list, args.output)
            } else {
                let options = ListOptions {
                    page,
                    per_page: None,
                };
                let options = match per_page {
                    Some(n) => options.per_page(n),
                    None => options,
                };
                let (list, response) = clusters.list_clusters(&group, &options).await?;
                if let Some(next) = response.next_page() {
                    eprintln!("More clusters available, use --page {}", next);
                }
                print_output(&list, args.output)
            }
        }
        Command::Get { ids } => get_many(&clusters, &group, &ids, args.output).await,
        Command::Add(add) => {
            let mut options = AddGroupClusterOptions::new(add.name, add.api_url, add.k8s_token);
            if let Some(path) = &add.ca_cert_file {
                options = options.ca_cert(read_pem(path)?);
            }
            if let Some(authorization) = add.authorization_type {
                options = options.authorization_type(authorization);
            }
            options.domain = add.domain;
            options.environment_scope = add.environment_scope;
            options.managed = add.managed;
            options.enabled = add.enabled;

            let (cluster, _) = clusters.add_cluster(&group, &options).await?;
            tracing::info!("Attached cluster {} to group {}", cluster.id, group);
            print_output(&cluster, args.output)
        }
        Command::Edit(edit) => {
            let mut options = EditGroupClusterOptions {
                name: edit.name,
                domain: edit.domain,
                environment_scope: edit.environment_scope,
                platform_kubernetes_attributes: None,
            };
            if let Some(api_url) = edit.api_url {
                options = options.api_url(api_url);
            }
            if let Some(path) = &edit.ca_cert_file {
                options = options.ca_cert(read_pem(path)?);
            }
            if edit.clear_ca_cert {
                options = options.clear_ca_cert();
            }
            if options.is_empty() {
                bail!("Nothing to change, pass at least one field to edit");
            }

            let (cluster, _) = clusters.edit_cluster(&group, edit.id, &options).await?;
            print_output(&cluster, args.output)
        }
        Command::Delete { id } => {
            let response = clusters.delete_cluster(&group, id).await?;
            tracing::info!("Deleted cluster {} from group {} ({})", id, group, response.status);
            eprintln!("Cluster {} removed from group {}", id, group);
            Ok(())
        }
        Command::Config { .. } => Ok(()),
    }
}

/// Fetch several clusters concurrently, keeping the requested order.
/// Failures come back alongside the clusters that were found.
async fn fetch_many(
    clusters: &GroupClusters,
    group: &GroupId,
    ids: &[u64],
) -> (Vec<GroupCluster>, Vec<(u64, ApiError)>) {
    let results = join_all(ids.iter().map(|id| clusters.get_cluster(group, *id))).await;

    let mut found = Vec::with_capacity(ids.len());
    let mut failed = Vec::new();
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok((cluster, _)) => found.push(cluster),
            Err(err) => failed.push((*id, err)),
        }
    }
    (found, failed)
}

async fn get_many(
    clusters: &GroupClusters,
    group: &GroupId,
    ids: &[u64],
    output: OutputFormat,
) -> Result<()> {
    let (found, mut failed) = fetch_many(clusters, group, ids).await;

    if let [id] = ids {
        return match (found.into_iter().next(), failed.pop()) {
            (Some(cluster), _) => print_output(&cluster, output),
            (None, Some((_, err))) => Err(err.into()),
            (None, None) => bail!("Cluster {} was not returned", id),
        };
    }

    for (id, err) in &failed {
        tracing::warn!("Failed to get cluster {}: {}", id, err);
        eprintln!("Cluster {}: {}", id, format_api_error(err));
    }
    if !found.is_empty() {
        print_output(&found, output)?;
    }
    if !failed.is_empty() {
        bail!("{} of {} clusters could not be fetched", failed.len(), ids.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cluster(id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("cluster-{id}"),
            "provider_type": "user",
            "platform_type": "kubernetes",
            "environment_scope": "*",
            "cluster_type": "group_type"
        })
    }

    async fn server_with_clusters(present: &[u64]) -> MockServer {
        let server = MockServer::start().await;
        for id in present {
            Mock::given(method("GET"))
                .and(path(format!("/api/v4/groups/26/clusters/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(cluster(*id)))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "404 Cluster Not Found"})),
            )
            .mount(&server)
            .await;
        server
    }

    fn clusters(server: &MockServer) -> GroupClusters {
        GitlabClient::new(&server.uri(), Credentials::Anonymous)
            .unwrap()
            .group_clusters()
    }

    #[tokio::test]
    async fn test_fetch_many_splits_found_and_failed() {
        let server = server_with_clusters(&[1, 3]).await;

        let (found, failed) = fetch_many(&clusters(&server), &GroupId::Numeric(26), &[3, 2, 1]).await;

        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, 2);
        assert!(matches!(failed[0].1, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_many_fails_when_any_cluster_is_missing() {
        let server = server_with_clusters(&[1]).await;

        let err = get_many(&clusters(&server), &GroupId::Numeric(26), &[1, 2], OutputFormat::Json)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "1 of 2 clusters could not be fetched");
    }

    #[tokio::test]
    async fn test_get_many_single_missing_cluster_keeps_api_error() {
        let server = server_with_clusters(&[]).await;

        let err = get_many(&clusters(&server), &GroupId::Numeric(26), &[9], OutputFormat::Json)
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_many_all_found_succeeds() {
        let server = server_with_clusters(&[1, 2]).await;

        get_many(&clusters(&server), &GroupId::Numeric(26), &[1, 2], OutputFormat::Yaml)
            .await
            .unwrap();
    }

    #[test]
    fn test_rust_log_wins_over_flag() {
        assert!(log_filter(LogLevel::Off, Some("glclusters=trace")).is_some());
    }

    #[test]
    fn test_flag_used_without_rust_log() {
        assert!(log_filter(LogLevel::Off, None).is_none());
        assert!(log_filter(LogLevel::Off, Some("  ")).is_none());
        assert!(log_filter(LogLevel::Debug, None).is_some());
        assert_eq!(LogLevel::Debug.directive(), Some("debug"));
    }

    #[test]
    fn test_invalid_rust_log_is_ignored() {
        assert!(log_filter(LogLevel::Off, Some("glclusters=[")).is_none());
        assert!(log_filter(LogLevel::Warn, Some("glclusters=[")).is_some());
    }
}
