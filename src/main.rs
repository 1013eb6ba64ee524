use clap::{Parser, Subcommand};
use shelfwise::{config, Engine, EngineConfig, Error, MemoryStore, Product};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// Product recommendations over a JSON catalog + purchase history.
#[derive(Parser)]
#[command(name = "shelfwise", version, about)]
struct Cli {
    /// Dataset file (default: $SHELFWISE_DATA, then ~/.shelfwise/dataset.json)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Engine config (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = 10)]
    limit: usize,

    /// Print JSON instead of tab-separated lines
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Products with similar text to PRODUCT
    Similar { product: i64 },
    /// Co-purchase recommendations for BUYER
    Recommend { buyer: i64 },
    /// Blended recommendations for BUYER
    Hybrid {
        buyer: i64,
        /// Weight of the co-purchase signal, 0..=1
        #[arg(short, long)]
        alpha: Option<f64>,
    },
    /// Most purchased products
    Popular,
    /// Homepage feed for BUYER
    Homepage { buyer: i64 },
    /// Product page feed for PRODUCT as seen by BUYER
    ProductPage { product: i64, buyer: i64 },
    /// Dataset and cache counters
    Stats,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();

    match run(cli) {
        Ok(out) => { if !out.is_empty() { println!("{out}"); } }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<String, Error> {
    let mut cfg = EngineConfig::load(cli.config.as_deref())?;
    // one-shot process: nothing to sweep
    cfg.sweep_interval_secs = 0;
    let path = config::resolve_data_path(cli.data);
    let store = Arc::new(MemoryStore::open(&path)?);
    let (n_products, n_purchases) = store.counts();
    let alpha_default = cfg.default_alpha;
    let engine = Engine::new(store, cfg);
    let limit = cli.limit;

    let products = match cli.command {
        Command::Similar { product } => engine.content_based(product, limit),
        Command::Recommend { buyer } => engine.collaborative(buyer, limit),
        Command::Hybrid { buyer, alpha } => engine.hybrid(buyer, limit, alpha.unwrap_or(alpha_default)),
        Command::Popular => engine.popular(limit),
        Command::Homepage { buyer } => {
            let feed = engine.homepage(buyer);
            if cli.json { return Ok(to_json(&*feed)); }
            return Ok(sections(&[
                ("recommended", &feed.recommended),
                ("popular", &feed.popular),
                ("restock", &feed.restock),
            ]));
        }
        Command::ProductPage { product, buyer } => {
            let feed = engine.product_page(product, buyer);
            if cli.json { return Ok(to_json(&*feed)); }
            return Ok(sections(&[
                ("similar", &feed.similar),
                ("bought together", &feed.bought_together),
                ("new in category", &feed.new_in_category),
            ]));
        }
        Command::Stats => {
            return Ok(format!("{}: {n_products} products, {n_purchases} purchases\n{}",
                              path.display(), engine.cache_stats()));
        }
    };
    if cli.json { Ok(to_json(&products)) } else { Ok(lines(&products)) }
}

fn to_json<T: serde::Serialize + ?Sized>(v: &T) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn lines(products: &[Product]) -> String {
    products.iter()
        .map(|p| format!("{}\t{}\t{}\t{:.2}", p.id, p.name, p.category, p.price))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sections(parts: &[(&str, &Vec<Product>)]) -> String {
    parts.iter()
        .map(|(title, items)| {
            if items.is_empty() { format!("## {title}\n  (none)") } else { format!("## {title}\n{}", lines(items)) }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
