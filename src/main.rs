use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use order_resolver::catalog::{self, Catalog};
use order_resolver::config::{LlmSettings, ResolverConfig};
use order_resolver::fallback::FallbackChain;
use order_resolver::llm::yandex::YandexGptProvider;
use order_resolver::logging::configure_logging;
use order_resolver::parser::NameParser;
use order_resolver::reference::ReferenceTables;
use order_resolver::resolve::{OrderResolver, ResolutionReport};
use order_resolver::types::LineItem;

const USAGE: &str = "usage: order-resolver [--items ITEMS.json] [TEXT_FILE | -]";

/// Where the order comes from.
struct Input {
    /// Line items already extracted upstream.
    items: Option<PathBuf>,
    /// Raw e-mail text; stdin when absent or `-`.
    text: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Input> {
    let mut input = Input {
        items: None,
        text: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--items" => {
                let path = args.next().context(USAGE)?;
                input.items = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                eprintln!("{USAGE}");
                std::process::exit(0);
            }
            "-" => input.text = None,
            other => input.text = Some(PathBuf::from(other)),
        }
    }
    Ok(input)
}

fn read_text(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let input = parse_args()?;
    let config = ResolverConfig::from_env()?;
    let llm_settings = LlmSettings::from_env()?;
    let _log_guard = configure_logging(&config.log_dir);

    eprintln!("📦 Order Resolver v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Catalog: {}", config.catalog_path.display());
    eprintln!("   Fallback: {:?}", config.fallback_order);
    eprintln!("   Materials: {:?}", config.material_policy);
    match &llm_settings {
        Some(s) => eprintln!("   AI extraction: {}", s.model_uri),
        None => eprintln!("   AI extraction: disabled (YANDEX_GPT_API_KEY not set)"),
    }
    eprintln!("   Logs: {}\n", config.log_dir.display());

    // Reference tables: a broken document degrades, an inconsistent set stops.
    let tables = ReferenceTables::load_or_degrade(&config.tables);
    if let Err(e) = tables.validate() {
        if config.skip_validation {
            error!(error = %e, "Reference tables are inconsistent, continuing");
        } else {
            return Err(e).context("reference table validation failed (set RESOLVER_SKIP_VALIDATION=1 to override)");
        }
    }
    let parser = NameParser::with_material_policy(Arc::new(tables), config.material_policy);

    let entries = catalog::load_tsv(&config.catalog_path, &config.catalog_columns)
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to load catalog, every line will be unmatched");
            Vec::new()
        });
    let catalog = Catalog::new(entries, &parser);

    let mut fallback = FallbackChain::new(config.fallback_order);
    if let Some(settings) = llm_settings {
        fallback = fallback.with_llm(Arc::new(YandexGptProvider::new(
            settings.endpoint,
            settings.model_uri,
            settings.api_key,
            settings.timeout,
        )?));
    }

    let resolver = OrderResolver::new(parser, catalog, fallback);

    let items: Vec<LineItem> = match &input.items {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("{} is not a JSON array of line items", path.display()))?
        }
        None => Vec::new(),
    };
    let text = if items.is_empty() {
        read_text(input.text.as_ref())?
    } else {
        String::new()
    };

    let report = ResolutionReport::new(resolver.resolve_order(items, &text).await);
    info!(total = report.total, matched = report.matched, "Done");

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
