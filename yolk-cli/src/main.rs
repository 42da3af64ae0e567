//! yolk - query installed Python packages and the Python Package Index
//!
//! Exactly one action flag per invocation. Results go to stdout, logs and
//! errors to stderr; every failure exits with status 2.

use anyhow::Result;
use clap::{ArgGroup, CommandFactory, Parser, ValueEnum};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use yolk_core::config::YolkConfig;
use yolk_core::local::{LocalResolver, Scope, SitePackagesProvider};
use yolk_core::registry::{PackageListCache, PypiClient, RegistryResolver, SearchSpec};
use yolk_core::YolkError;

mod local_cli;
mod pypi_cli;

use local_cli::Show;

/// Exit status for usage and runtime errors alike
const FAILURE: u8 = 2;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "yolk",
    about = "Query installed Python packages and the Python Package Index",
    disable_version_flag = true,
    group(
        ArgGroup::new("action")
            .required(true)
            .multiple(false)
            .args([
                "version",
                "list",
                "activated",
                "non_activated",
                "depends",
                "download_links",
                "fetch_package_list",
                "browse_homepage",
                "latest",
                "query_metadata",
                "search",
                "versions_available",
            ])
    ),
    group(ArgGroup::new("listing").args(["list", "activated", "non_activated"]))
)]
struct Cli {
    /// Show yolk's version
    #[clap(short = 'v', long)]
    version: bool,

    /// List all installed packages
    #[clap(short = 'l', long)]
    list: bool,

    /// List activated packages
    #[clap(short = 'a', long)]
    activated: bool,

    /// List non-activated packages
    #[clap(short = 'n', long)]
    non_activated: bool,

    /// Show all metadata for listed packages
    #[clap(short = 'm', long, requires = "listing")]
    metadata: bool,

    /// Show only these comma-separated metadata fields for listed packages
    #[clap(
        short = 'f',
        long,
        value_delimiter = ',',
        requires = "listing",
        conflicts_with = "metadata"
    )]
    fields: Vec<String>,

    /// Show dependencies of an installed package (NAME [VERSION] or NAME=VERSION)
    #[clap(short = 'd', long)]
    depends: bool,

    /// Use the cached PyPI package list
    #[clap(short = 'C', long = "use-cached-pkglist")]
    use_cached_pkglist: bool,

    /// Show download URLs for a package (NAME [VERSION])
    #[clap(short = 'D', long)]
    download_links: bool,

    /// Fetch the PyPI package list and refresh the cache
    #[clap(short = 'F', long)]
    fetch_package_list: bool,

    /// Open a package's home page in the default browser
    #[clap(short = 'H', long)]
    browse_homepage: bool,

    /// Show the latest updates on PyPI
    #[clap(short = 'L', long)]
    latest: bool,

    /// Show PyPI metadata for a package (NAME [VERSION])
    #[clap(short = 'M', long)]
    query_metadata: bool,

    /// Search PyPI (FIELD TERMS...)
    #[clap(short = 'S', long)]
    search: bool,

    /// Show the versions available on PyPI for a package
    #[clap(short = 'V', long)]
    versions_available: bool,

    /// Package name and version, or search field and terms
    args: Vec<String>,

    /// Set log level
    #[clap(long, default_value = "warn")]
    log_level: LogLevel,

    /// Read configuration from this file instead of the default location
    #[clap(long)]
    config: Option<PathBuf>,
}

/// One resolved invocation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Version,
    List {
        scope: Scope,
        name: Option<String>,
        version: Option<String>,
        show: Show,
    },
    Depends {
        name: String,
        version: Option<String>,
    },
    DownloadLinks {
        name: String,
        version: Option<String>,
    },
    FetchPackageList,
    BrowseHomepage {
        name: String,
    },
    Latest,
    QueryMetadata {
        name: String,
        version: Option<String>,
    },
    Search(SearchSpec),
    VersionsAvailable {
        name: String,
    },
}

/// Flag combination clap cannot reject on its own
#[derive(Debug)]
struct UsageError(String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

impl Cli {
    fn action(&self) -> Result<Action, UsageError> {
        if self.search {
            return SearchSpec::from_args(&self.args)
                .filter(|spec| !spec.terms.is_empty())
                .map(Action::Search)
                .ok_or_else(|| UsageError("-S needs a field and at least one term".to_string()));
        }

        if self.args.len() > 2 {
            return Err(UsageError(format!(
                "expected at most a name and a version, got {} arguments",
                self.args.len()
            )));
        }
        let name = self.args.first().cloned();
        let version = self.args.get(1).cloned();

        if self.version {
            return no_args(&self.args, "-v").map(|_| Action::Version);
        }
        if self.fetch_package_list {
            return no_args(&self.args, "-F").map(|_| Action::FetchPackageList);
        }
        if self.latest {
            return no_args(&self.args, "-L").map(|_| Action::Latest);
        }

        if self.list || self.activated || self.non_activated {
            let scope = if self.activated {
                Scope::Active
            } else if self.non_activated {
                Scope::NonActive
            } else {
                Scope::All
            };
            let show = if self.metadata {
                Show::AllFields
            } else if !self.fields.is_empty() {
                Show::Fields(self.fields.clone())
            } else {
                Show::Summary
            };
            return Ok(Action::List {
                scope,
                name,
                version,
                show,
            });
        }

        if self.depends {
            let name = required(name, "-d")?;
            if version.is_none() {
                if let Some((name, pinned)) = name.split_once('=') {
                    return Ok(Action::Depends {
                        name: name.to_string(),
                        version: Some(pinned.to_string()),
                    });
                }
            }
            return Ok(Action::Depends { name, version });
        }
        if self.download_links {
            let name = required(name, "-D")?;
            return Ok(Action::DownloadLinks { name, version });
        }
        if self.query_metadata {
            let name = required(name, "-M")?;
            return Ok(Action::QueryMetadata { name, version });
        }

        let single = |flag: &str| -> Result<String, UsageError> {
            if version.is_some() {
                return Err(UsageError(format!("{flag} takes only a package name")));
            }
            required(name.clone(), flag)
        };
        if self.browse_homepage {
            return single("-H").map(|name| Action::BrowseHomepage { name });
        }
        if self.versions_available {
            return single("-V").map(|name| Action::VersionsAvailable { name });
        }

        Err(UsageError("no action given".to_string()))
    }
}

fn required(name: Option<String>, flag: &str) -> Result<String, UsageError> {
    name.ok_or_else(|| UsageError(format!("{flag} needs a package name")))
}

fn no_args(args: &[String], flag: &str) -> Result<(), UsageError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(UsageError(format!("{flag} takes no arguments")))
    }
}

/// Initialize tracing from --log-level
///
/// `RUST_LOG`, when set, takes precedence over --log-level. Logs go to
/// stderr so stdout carries only results.
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn usage_failure(message: &dyn fmt::Display) -> ExitCode {
    eprintln!("{message}");
    let _ = Cli::command().write_help(&mut io::stderr());
    ExitCode::from(FAILURE)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => return usage_failure(&e.render()),
    };

    initialize_tracing(&cli.log_level);

    let action = match cli.action() {
        Ok(action) => action,
        Err(e) => return usage_failure(&e),
    };
    debug!("action: {:?}", action);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(action, cli.config.as_deref(), cli.use_cached_pkglist, &mut out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = out.flush();
            match e.downcast_ref::<YolkError>() {
                Some(err) => eprintln!("{err}"),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::from(FAILURE)
        }
    }
}

fn local_resolver(config: &YolkConfig) -> LocalResolver {
    LocalResolver::new(Box::new(SitePackagesProvider::from_config(&config.local)))
}

fn registry_resolver(config: &YolkConfig) -> Result<RegistryResolver> {
    let client = PypiClient::new(&config.registry)?;
    let cache = config.package_list_path().map(PackageListCache::new);
    Ok(RegistryResolver::new(Box::new(client), cache))
}

async fn run(
    action: Action,
    config_path: Option<&Path>,
    use_cache: bool,
    out: &mut impl Write,
) -> Result<()> {
    if action == Action::Version {
        writeln!(out, "yolk {}", env!("CARGO_PKG_VERSION"))?;
        return Ok(());
    }

    let config = YolkConfig::load(config_path)?;

    match action {
        Action::Version => Ok(()),
        Action::List {
            scope,
            name,
            version,
            show,
        } => {
            local_cli::list(
                &local_resolver(&config),
                scope,
                name.as_deref(),
                version.as_deref(),
                &show,
                out,
            )
            .await
        }
        Action::Depends { name, version } => {
            local_cli::depends(&local_resolver(&config), &name, version.as_deref(), out).await
        }
        Action::DownloadLinks { name, version } => {
            let resolver = registry_resolver(&config)?;
            pypi_cli::download_links(&resolver, &name, version.as_deref(), use_cache, out).await
        }
        Action::FetchPackageList => {
            pypi_cli::fetch_package_list(&registry_resolver(&config)?, out).await
        }
        Action::BrowseHomepage { name } => {
            let resolver = registry_resolver(&config)?;
            pypi_cli::browse_homepage(&resolver, &name, use_cache, |url| open::that(url), out)
                .await
        }
        Action::Latest => pypi_cli::latest(&registry_resolver(&config)?, out).await,
        Action::QueryMetadata { name, version } => {
            let resolver = registry_resolver(&config)?;
            pypi_cli::metadata(&resolver, &name, version.as_deref(), use_cache, out).await
        }
        Action::Search(spec) => pypi_cli::search(&registry_resolver(&config)?, &spec, out).await,
        Action::VersionsAvailable { name } => {
            let resolver = registry_resolver(&config)?;
            pypi_cli::versions(&resolver, &name, use_cache, out).await
        }
    }
}
