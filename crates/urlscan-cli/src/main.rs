//! urlscan - command line client for the urlscan.io API

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use urlscan_client::pro::HostnameQuery;
use urlscan_client::{Client, Pro, ScanOptions, SearchQuery, WaitOptions};
use urlscan_core::{ClientConfig, FileConfig, SearchDataSource, Visibility};

/// Command line client for urlscan.io
#[derive(Parser)]
#[command(name = "urlscan", version, about, long_about = None)]
struct Cli {
    /// API key
    #[arg(long, env = "URLSCAN_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Base URL of the API
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Retry rate-limited requests
    #[arg(long, global = true, overrides_with = "no_retry")]
    retry: bool,

    /// Never retry rate-limited requests, even if URLSCAN_RETRY is set
    #[arg(long, global = true, overrides_with = "retry")]
    no_retry: bool,

    /// Proxy URL all requests are routed through
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a URL for scanning
    Scan {
        /// URL to scan
        url: String,

        /// Visibility (public, unlisted, private)
        #[arg(long, default_value = "public")]
        visibility: Visibility,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Two-letter country to scan from
        #[arg(long)]
        country: Option<String>,

        /// Wait for the result and print it
        #[arg(long)]
        wait: bool,

        /// Seconds to wait for the result
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Print a scan result
    Result {
        /// Scan UUID
        uuid: String,
    },

    /// Wait for a scan result
    Wait {
        /// Scan UUID
        uuid: String,

        /// Seconds to wait
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Seconds between polls
        #[arg(long, default_value_t = 1)]
        interval: u64,
    },

    /// Search scans, printing one JSON hit per line
    Search {
        /// Search query
        query: String,

        /// Hits per page
        #[arg(long, default_value_t = 100)]
        size: u32,

        /// Maximum number of hits
        #[arg(long)]
        limit: Option<usize>,

        /// Data source (scans, hostnames, incidents, notifications, certificates)
        #[arg(long)]
        datasource: Option<SearchDataSource>,
    },

    /// Save the screenshot of a scan
    Screenshot {
        /// Scan UUID
        uuid: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the rendered DOM of a scan
    Dom {
        /// Scan UUID
        uuid: String,
    },

    /// Print the quotas of the API key
    Quotas,

    /// Print the history of a hostname (Pro), one JSON record per line
    Hostname {
        /// Hostname
        hostname: String,

        /// Maximum number of records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Data dumps (Pro)
    Datadump {
        #[command(subcommand)]
        command: DatadumpCommands,
    },
}

#[derive(Subcommand)]
enum DatadumpCommands {
    /// List files of a dump, e.g. days/api/20260101
    List {
        /// Dump path
        path: String,
    },

    /// Download a dump file
    Download {
        /// File path, e.g. days/api/20260101/20260101.gz
        path: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Unpack the downloaded file into this directory
        #[arg(long)]
        extract: Option<PathBuf>,
    },
}

impl Cli {
    /// Retry setting from the flags, if any was given.
    fn retry_override(&self) -> Option<bool> {
        if self.retry {
            Some(true)
        } else if self.no_retry {
            Some(false)
        } else {
            None
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let file = FileConfig::load().context("failed to load config file")?;
    let mut builder = ClientConfig::builder().file(file);
    if let Some(key) = &cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(url) = &cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(retry) = cli.retry_override() {
        builder = builder.retry(retry);
    }
    if let Some(proxy) = &cli.proxy {
        builder = builder.proxy(proxy.clone());
    }
    if cli.insecure {
        builder = builder.verify(false);
    }
    builder.build().context("invalid configuration")
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands, config: ClientConfig) -> Result<()> {
    let client = Client::from_config(config)?;

    match command {
        Commands::Scan {
            url,
            visibility,
            tags,
            country,
            wait,
            timeout,
        } => {
            let mut options = ScanOptions::new(visibility);
            options.tags = tags;
            if let Some(country) = country {
                options = options.with_country(country)?;
            }

            let handle = client.scan(&url, &options).await?;
            if wait {
                let wait_options = WaitOptions::default().with_timeout(Duration::from_secs(timeout));
                info!("Waiting for scan {}", handle.uuid);
                let record = client.wait_for_handle(&handle, &wait_options).await?;
                print_json(&record)?;
            } else {
                print_json(&handle.raw)?;
            }
        }
        Commands::Result { uuid } => print_json(&client.get_result(&uuid).await?)?,
        Commands::Wait {
            uuid,
            timeout,
            interval,
        } => {
            let options = WaitOptions::default()
                .with_timeout(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            print_json(&client.wait_for_result(&uuid, &options).await?)?;
        }
        Commands::Search {
            query,
            size,
            limit,
            datasource,
        } => {
            let mut query = SearchQuery::new(query).with_size(size);
            query.limit = limit;
            query.datasource = datasource;

            let mut results = client.search(query);
            while let Some(record) = results.try_next().await? {
                println!("{}", serde_json::to_string(&record)?);
            }
            debug!("Printed {} hit(s)", results.yielded());
        }
        Commands::Screenshot { uuid, output } => {
            let png = client.get_screenshot(&uuid).await?;
            std::fs::write(&output, &png)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!("Saved screenshot to {}", output.display());
        }
        Commands::Dom { uuid } => println!("{}", client.get_dom(&uuid).await?),
        Commands::Quotas => print_json(&client.get_quotas().await?)?,
        Commands::Hostname { hostname, limit } => {
            let pro = Pro::from_client(client);
            let query = HostnameQuery {
                limit,
                ..HostnameQuery::default()
            };
            let mut history = pro.hostname(&hostname, query)?;
            while let Some(record) = history.try_next().await? {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        Commands::Datadump { command } => {
            let pro = Pro::from_client(client);
            match command {
                DatadumpCommands::List { path } => {
                    print_json(&pro.datadump().get_list(&path).await?)?;
                }
                DatadumpCommands::Download {
                    path,
                    output,
                    extract,
                } => {
                    let written = pro.datadump().download_file(&path, &output).await?;
                    info!("Wrote {written} bytes to {}", output.display());
                    if let Some(outdir) = extract {
                        tokio::task::spawn_blocking(move || {
                            urlscan_client::extract(&output, &outdir)
                        })
                        .await??;
                    }
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    run(cli.command, config).await
}
