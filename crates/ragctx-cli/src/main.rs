use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ragctx_local::sanitize::sanitize_query;
use ragctx_local::{ContextPipeline, PipelineConfig, PipelineMode};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "ragctx")]
#[command(about = "Search, fetch and condense web results into retrieval contexts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one query through the pipeline and print the contexts as JSON.
    Search(SearchCmd),
    /// Print the sanitized form of a query.
    Sanitize(SanitizeCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Build contexts from search snippets only.
    Snippet,
    /// Fetch pages and align snippets against them.
    Direct,
    /// Fetch through the render service and summarize with the LLM.
    Render,
}

impl From<ModeArg> for PipelineMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Snippet => PipelineMode::SnippetOnly,
            ModeArg::Direct => PipelineMode::Direct,
            ModeArg::Render => PipelineMode::Render,
        }
    }
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    /// Query text.
    query: String,
    #[arg(long, value_enum, default_value = "direct")]
    mode: ModeArg,
    /// Result count requested from the gateway.
    #[arg(long, default_value_t = 5)]
    top_k: usize,
    /// Gateway request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout_s: u64,
    /// Proxy for the gateway call (overrides RAGCTX_PROXY).
    #[arg(long)]
    proxy: Option<String>,
    /// Max in-flight fetches (overrides RAGCTX_CONCURRENCY).
    #[arg(long)]
    concurrency: Option<usize>,
    /// Sanitize the query before sending it.
    #[arg(long, default_value_t = false)]
    sanitize: bool,
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(clap::Args, Debug)]
struct SanitizeCmd {
    text: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// KEY=VALUE lines from `RAGCTX_ENV_FILE`; never overrides the process env.
fn load_env_file() {
    let Ok(p) = std::env::var("RAGCTX_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

async fn run_search(args: SearchCmd) -> Result<()> {
    let mut cfg = PipelineConfig::from_env();
    if let Some(p) = args.proxy {
        cfg.gateway.proxy = Some(p);
    }
    if let Some(n) = args.concurrency {
        cfg.concurrency = n.max(1);
    }

    tracing::debug!(
        mode = ?args.mode,
        top_k = args.top_k,
        concurrency = cfg.concurrency,
        gateway = %cfg.gateway.endpoint,
        "running search"
    );
    let pipeline = ContextPipeline::from_config(&cfg, args.mode.into())?
        .with_top_k(args.top_k)
        .with_timeout(Duration::from_secs(args.timeout_s))
        .with_sanitize_query(args.sanitize);
    let docs = pipeline.run(Some(args.query.as_str())).await?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&docs)?
    } else {
        serde_json::to_string(&docs)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();

    // stdout carries the JSON result; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Search(args) => run_search(args).await?,
        Commands::Sanitize(args) => println!("{}", sanitize_query(&args.text)),
        Commands::Version(args) => match args.output.to_ascii_lowercase().as_str() {
            "text" => println!("ragctx {}", env!("CARGO_PKG_VERSION")),
            _ => println!(
                "{}",
                serde_json::json!({
                    "name": "ragctx",
                    "version": env!("CARGO_PKG_VERSION"),
                })
            ),
        },
    }
    Ok(())
}
