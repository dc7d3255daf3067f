use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workbox_helper::cache::PathCache;
use workbox_helper::cli::{
    AdvanceArgs, CacheAction, CacheArgs, Command, EnrichArgs, RootArgs, SealArgs,
};
use workbox_helper::config::{config_stub, default_config, load_config, HelperConfig};
use workbox_helper::credentials::{resolve_api_key, EnvironmentSettings, KeyCipher};
use workbox_helper::page::{workbox_present, Page, PageSpec};
use workbox_helper::remote::HttpTransport;
use workbox_helper::selection::{checked_item_ids, clear_selection};
use workbox_helper::session::Session;
use workbox_helper::store::FileStore;
use workbox_helper::util::normalize_domain;
use workbox_helper::workflow::{WorkflowCatalog, WorkflowEngine, WorkflowRunReport};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let args = RootArgs::parse();
    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}

fn run(args: RootArgs) -> Result<i32> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config(),
    };
    match args.command {
        Command::Enrich(cmd) => run_enrich(&config, cmd),
        Command::Advance(cmd) => run_advance(&config, cmd),
        Command::Cache(cmd) => run_cache(&config, cmd),
        Command::States => run_states(&config),
        Command::Seal(cmd) => run_seal(&config, cmd),
        Command::ConfigStub => {
            println!("{}", config_stub());
            Ok(0)
        }
    }
}

fn run_enrich(config: &HelperConfig, args: EnrichArgs) -> Result<i32> {
    let mut page = read_page(&args.page)?;
    let cache = PathCache::new(
        FileStore::new(cache_path(args.cache_file)),
        config.cache_ttl_ms,
    );

    if !workbox_present(&page, &config.wrapper_class) {
        tracing::info!("workbox not present in fixture; nothing to enrich");
        println!("{}", serde_json::json!({ "annotated": 0 }));
        return Ok(0);
    }

    let transport = resolve_transport(config, &args.settings, &args.origin, &config.query_endpoint)?;
    if transport.is_none() {
        tracing::warn!("no API key for this host; enrichment disabled");
    }

    let (_session, summary) = Session::start(config.clone(), cache, transport, &mut page);

    let out = args.out.unwrap_or(args.page);
    write_page(&out, &page)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}

fn run_advance(config: &HelperConfig, args: AdvanceArgs) -> Result<i32> {
    let mut page = args.page.as_deref().map(read_page).transpose()?;

    let ids: Vec<String> = if let Some(raw) = &args.ids {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    } else if let Some(page) = &page {
        let doc = page.frame.as_ref().unwrap_or(&page.document);
        checked_item_ids(doc, &config.checkbox_class, &config.node_id_attr)
    } else {
        return Err(anyhow!("either --page or --ids is required"));
    };

    let transport =
        resolve_transport(config, &args.settings, &args.origin, &config.authoring_endpoint)?;
    let report = match transport {
        Some(transport) if !ids.is_empty() => {
            let catalog = WorkflowCatalog::new(config.states.clone())?;
            WorkflowEngine::new(
                &catalog,
                &transport,
                config.query_batch,
                config.update_batch,
            )
            .advance(&ids)
        }
        Some(_) => empty_report(0, true),
        None => {
            tracing::warn!("no API key for this host; workflow run disabled");
            empty_report(ids.len(), false)
        }
    };

    if let Some(page) = page.as_mut() {
        let doc = page.frame.as_mut().unwrap_or(&mut page.document);
        let cleared = clear_selection(doc, &config.checkbox_class);
        tracing::info!(cleared, "selection cleared");
        if let Some(out) = args.out.as_deref().or(args.page.as_deref()) {
            write_page(out, page)?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.success { 0 } else { 1 })
}

fn run_cache(config: &HelperConfig, args: CacheArgs) -> Result<i32> {
    let store = FileStore::new(cache_path(args.cache_file));
    let cache = PathCache::new(store, config.cache_ttl_ms);
    match args.action {
        CacheAction::Show => {
            let snapshot = cache.load();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        CacheAction::Clear => {
            cache.clear()?;
            println!("cache cleared");
        }
    }
    Ok(0)
}

fn run_states(config: &HelperConfig) -> Result<i32> {
    let catalog = WorkflowCatalog::new(config.states.clone())?;
    for state in catalog.states() {
        println!("{}  {}  {}", state.order, state.display_name, state.id);
    }
    Ok(0)
}

fn run_seal(config: &HelperConfig, args: SealArgs) -> Result<i32> {
    let cipher = KeyCipher::new(&config.passphrase);
    println!("{}", cipher.seal(&args.key));
    Ok(0)
}

fn resolve_transport(
    config: &HelperConfig,
    settings_path: &Path,
    origin: &str,
    endpoint: &str,
) -> Result<Option<HttpTransport>> {
    let bytes = fs::read(settings_path)
        .with_context(|| format!("read settings {}", settings_path.display()))?;
    let settings: EnvironmentSettings =
        serde_json::from_slice(&bytes).context("parse settings JSON")?;
    let cipher = KeyCipher::new(&config.passphrase);
    let hostname = normalize_domain(origin);
    Ok(resolve_api_key(&settings, &hostname, &cipher)
        .map(|key| HttpTransport::new(origin, endpoint, &key)))
}

fn empty_report(requested: usize, success: bool) -> WorkflowRunReport {
    WorkflowRunReport {
        success,
        requested,
        succeeded: 0,
        failed: 0,
        skipped: 0,
        outcomes: Vec::new(),
    }
}

fn cache_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(FileStore::default_path)
}

fn read_page(path: &Path) -> Result<Page> {
    let bytes = fs::read(path).with_context(|| format!("read page {}", path.display()))?;
    let spec: PageSpec = serde_json::from_slice(&bytes).context("parse page fixture JSON")?;
    Ok(Page::from_spec(&spec))
}

fn write_page(path: &Path, page: &Page) -> Result<()> {
    let text = serde_json::to_string_pretty(&page.to_spec()).context("serialize page")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
