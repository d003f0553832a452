use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use copilot_ia::api::{self, AppState};
use copilot_ia::copilots::DocstringStyle;
use copilot_ia::tools::{analyzer_for, detect_language};
use copilot_ia::{
    AgentResponse, CoordinatorRequest, CoordinatorResponse, CopilotFactory, CopilotKind,
    DiskCache, FileReader, GitTool, ProjectConfig, TokenCounter, create_provider,
};

#[derive(Parser)]
#[command(name = "copilot-ia")]
#[command(version, about = "Development copilots for review, docs, tests, debugging, refactoring, architecture and security", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// LLM provider to use (openai, anthropic, groq)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use (provider-specific)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Bypass the response cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review a file, or the staged git diff
    Review {
        #[arg(required_unless_present = "staged")]
        file: Option<PathBuf>,

        /// Only list the most important problems
        #[arg(long)]
        quick: bool,

        /// Review `git diff --cached` instead of a file
        #[arg(long, conflicts_with = "file")]
        staged: bool,
    },
    /// Generate docstrings for a file
    Docs {
        file: PathBuf,

        /// Docstring style (google, numpy, sphinx)
        #[arg(long, default_value = "google")]
        style: DocstringStyle,
    },
    /// Generate a test file
    Test {
        file: PathBuf,

        /// Test framework, defaults to the language's usual one
        #[arg(long)]
        framework: Option<String>,
    },
    /// Scan a file for vulnerabilities
    Security { file: PathBuf },
    /// Analyze an error message
    Debug {
        /// The error message
        #[arg(long)]
        error: String,

        /// File holding the stack trace
        #[arg(long)]
        trace_file: Option<PathBuf>,

        /// Source file related to the error
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Suggest refactorings for a file
    Refactor {
        file: PathBuf,

        /// Areas to focus on, comma separated
        #[arg(long, value_delimiter = ',')]
        focus: Vec<String>,
    },
    /// Analyze a project's architecture
    Architecture {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Write a changelog entry from recent commits
    Changelog {
        #[arg(long, default_value = "Unreleased")]
        version: String,

        /// Number of commits to include
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Route a free-form request to the right copilots
    Ask {
        message: String,

        /// Files to include (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,

        /// Copilots to use instead of keyword detection (repeatable)
        #[arg(long = "copilot")]
        copilots: Vec<CopilotKind>,

        /// Run the copilots concurrently
        #[arg(long)]
        parallel: bool,
    },
    /// Start the REST API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
    /// Inspect or clear the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Count the tokens in a file
    Tokens {
        file: PathBuf,

        /// Model used for pricing
        #[arg(long)]
        model: Option<String>,
    },
    /// Show code metrics for a file
    Metrics { file: PathBuf },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts and size
    Stats,
    /// Remove every entry
    Clear,
    /// Remove expired entries only
    ClearExpired,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ProjectConfig> {
    let mut config = ProjectConfig::load().context("failed to load configuration")?;
    if let Some(provider) = &cli.provider {
        config.model.provider = Some(provider.clone());
    }
    if let Some(model) = &cli.model {
        config.model.name = Some(model.clone());
    }
    Ok(config)
}

fn open_cache(config: &ProjectConfig) -> DiskCache {
    DiskCache::new(config.cache.dir(), config.cache.default_ttl(), true)
}

fn create_factory(config: ProjectConfig, no_cache: bool) -> Result<CopilotFactory> {
    let provider =
        create_provider(config.provider_name()).context("failed to create LLM provider")?;
    info!(provider = %provider.name(), "provider ready");

    let use_cache = config.cache.is_enabled() && !no_cache;
    let cache = use_cache.then(|| Arc::new(open_cache(&config)));
    let factory = CopilotFactory::new(provider, config);
    Ok(match cache {
        Some(cache) => factory.with_cache(cache),
        None => factory,
    })
}

fn file_reader(config: &ProjectConfig) -> FileReader {
    FileReader::current_dir()
        .with_extra_extensions(&config.files.extra_extensions)
        .with_max_file_size(config.files.max_file_size())
}

/// Print a copilot answer; a failed answer ends the process with status 1.
fn finish(response: AgentResponse) {
    if response.success {
        println!("{}", response.content);
        if response.is_cached() {
            info!("served from cache");
        }
    } else {
        error!(content = %response.content, "copilot failed");
        eprintln!("{}", response.content);
        std::process::exit(1);
    }
}

fn print_coordinated(response: &CoordinatorResponse) {
    println!("{}\n", response.summary);
    for (name, result) in &response.details {
        println!("## {}\n\n{}\n", name, result.content);
    }
    for recommendation in &response.recommendations {
        println!("> {}", recommendation);
    }
}

fn read_source(config: &ProjectConfig, path: &Path) -> Result<String> {
    file_reader(config)
        .read_file(path, None)
        .with_context(|| format!("failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let no_cache = cli.no_cache;

    match cli.command {
        Commands::Review {
            file,
            quick,
            staged,
        } => {
            let reviewer = create_factory(config, no_cache)?.code_reviewer();
            let response = if staged {
                let diff = GitTool::new(".").staged_diff().await?;
                if diff.trim().is_empty() {
                    anyhow::bail!("no staged changes to review");
                }
                reviewer.analyze_diff(&diff, None).await
            } else {
                let file = file.context("a file is required unless --staged is given")?;
                if quick {
                    reviewer.quick_review_file(&file).await
                } else {
                    reviewer.analyze_file(&file).await
                }
            };
            finish(response);
        }
        Commands::Docs { file, style } => {
            let docs = create_factory(config, no_cache)?.documentation();
            finish(docs.document_file(&file, Some(style)).await);
        }
        Commands::Test { file, framework } => {
            let testing = create_factory(config, no_cache)?.testing();
            finish(testing.generate_test_file(&file, framework.as_deref()).await);
        }
        Commands::Security { file } => {
            let security = create_factory(config, no_cache)?.security();
            finish(security.scan_file(&file).await);
        }
        Commands::Debug {
            error,
            trace_file,
            file,
        } => {
            let trace = trace_file
                .map(|path| {
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))
                })
                .transpose()?;
            let code = file
                .as_deref()
                .map(|path| read_source(&config, path))
                .transpose()?;
            let language = file
                .as_deref()
                .map(detect_language)
                .filter(|lang| *lang != "text")
                .unwrap_or("python");

            let debug = create_factory(config, no_cache)?.debug();
            let response = debug
                .analyze_error(&error, trace.as_deref(), code.as_deref(), language)
                .await;
            finish(response);
        }
        Commands::Refactor { file, focus } => {
            let refactoring = create_factory(config, no_cache)?.refactoring();
            finish(refactoring.refactor_file(&file, &focus).await);
        }
        Commands::Architecture { dir } => {
            let architecture = create_factory(config, no_cache)?.architecture();
            finish(architecture.analyze_project(&dir).await);
        }
        Commands::Changelog { version, limit } => {
            let commits = GitTool::new(".")
                .recent_commits(limit)
                .await
                .context("failed to read git history")?;
            if commits.is_empty() {
                anyhow::bail!("no commits found");
            }
            let docs = create_factory(config, no_cache)?.documentation();
            finish(docs.generate_changelog(&commits, &version).await);
        }
        Commands::Ask {
            message,
            files,
            copilots,
            parallel,
        } => {
            let coordinator = create_factory(config, no_cache)?.suite().coordinator();
            let mut request = CoordinatorRequest::new(message).with_files(files);
            if !copilots.is_empty() {
                request = request.with_preferred(copilots);
            }

            let response = if parallel {
                coordinator.process_concurrent(&request).await
            } else {
                coordinator.process(&request).await
            };
            print_coordinated(&response);
            if !response.success {
                std::process::exit(1);
            }
        }
        Commands::Serve { host, port } => {
            let mut config = config;
            if host.is_some() {
                config.server.host = host;
            }
            if port.is_some() {
                config.server.port = port;
            }
            let addr = config.server.bind_addr();
            let suite = create_factory(config, no_cache)?.suite();
            api::serve(AppState::new(suite), &addr).await?;
        }
        Commands::Cache { action } => {
            let cache = open_cache(&config);
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats();
                    println!("Cache directory: {}", stats.cache_dir);
                    println!("Entries: {}", stats.total_entries);
                    println!("Valid: {}", stats.valid_entries);
                    println!("Expired: {}", stats.expired_entries);
                    println!("Size: {}", stats.total_size_human);
                }
                CacheAction::Clear => {
                    println!("Removed {} entries", cache.clear());
                }
                CacheAction::ClearExpired => {
                    println!("Removed {} expired entries", cache.clear_expired());
                }
            }
        }
        Commands::Tokens { file, model } => {
            let text = read_source(&config, &file)?;
            let model = model.unwrap_or_else(|| config.model_for(CopilotKind::CodeReviewer).name);
            let counter = TokenCounter::new(model.clone());
            let tokens = counter.count(&text);
            let cost = counter.estimate_cost(tokens, 0, None);
            let info = counter.model_info(&model);

            println!("File: {}", file.display());
            println!("Model: {} ({})", model, info.encoding);
            println!("Tokens: {}", tokens);
            match cost.warning {
                Some(warning) => println!("Input cost: n/a ({})", warning),
                None => println!("Input cost: ${:.6}", cost.input_cost),
            }
        }
        Commands::Metrics { file } => {
            let code = read_source(&config, &file)?;
            let language = detect_language(&file);
            let metrics = analyzer_for(language).get_metrics(&code, language);

            println!("File: {}", file.display());
            println!("Language: {}", language);
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
    }

    Ok(())
}
