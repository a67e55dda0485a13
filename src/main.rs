use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use tokio::task::LocalSet;
use tracing::info;

use gallery_pager::api::HttpGalleryApi;
use gallery_pager::layout::JustifiedLayout;
use gallery_pager::navigation::{LocationQuery, MemoryLocation};
use gallery_pager::pagination::LoadOutcome;
use gallery_pager::ui::VirtualListView;
use gallery_pager::{Config, GalleryApp};

const USAGE: &str = "usage: gallery-pager [QUERY] [--pages N] [--config PATH]

  QUERY          location query, e.g. 'path=pets&sort=asc&page=3'
  --pages N      scroll down through N more pages after the first
  --config PATH  read configuration from PATH";

struct Args {
    query: String,
    extra_pages: u32,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        query: String::new(),
        extra_pages: 0,
        config: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--pages" => {
                let value = iter.next().context("--pages needs a value")?;
                args.extra_pages = value
                    .parse()
                    .with_context(|| format!("invalid page count {:?}", value))?;
            }
            "--config" => {
                args.config = Some(iter.next().context("--config needs a path")?.into());
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if arg.starts_with("--") => bail!("unknown option {}\n\n{}", arg, USAGE),
            _ => args.query = arg.trim_start_matches('?').to_string(),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gallery_pager=info".parse()?),
        )
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load().context("failed to load configuration")?,
    };
    info!(api = %config.api_base_url, page_size = config.page_size, "Configuration loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    LocalSet::new().block_on(&runtime, browse(config, args))
}

async fn browse(config: Config, args: Args) -> Result<()> {
    let api = Rc::new(HttpGalleryApi::from_config(&config).context("failed to create API client")?);
    let backend = Rc::new(MemoryLocation::new(LocationQuery::parse(&args.query)));
    let viewport = Rc::new(VirtualListView::new(
        JustifiedLayout::new(config.tile_size_px, 0.0, 0.0),
        config.viewport_width_px,
        f64::from(config.viewport_height_px),
    ));
    let app = GalleryApp::new(&config, api, backend.clone(), backend.subscribe(), viewport.clone());

    if !app.start().await.succeeded() {
        let message = app.error_message().unwrap_or_default();
        bail!("{} ({})", message, config.api_base_url);
    }

    for _ in 0..args.extra_pages {
        viewport.scroll_to_bottom();
        match app.on_scroll().await {
            Some(LoadOutcome::Absorbed { .. }) => {}
            Some(LoadOutcome::Failed) => {
                bail!("{}", app.error_message().unwrap_or_default())
            }
            _ => break,
        }
    }
    app.pump().await;

    let crumbs: Vec<String> = app.breadcrumbs().into_iter().map(|c| c.name).collect();
    let window = app.window();
    println!(
        "/{}  sort={}  pages {}-{} of {}  ({} items, {} rows)",
        crumbs.join("/"),
        app.navigation().sort_order(),
        window.first_loaded(),
        window.last_loaded(),
        window.total_pages(),
        window.item_count(),
        viewport.row_count(),
    );
    for dir in window.directories() {
        println!("  [dir] {:<24} {}", dir.name, dir.path);
    }
    for page in window.pages() {
        println!("page {}", page.page_number());
        for item in page.items() {
            println!("  {:>8}  {}", item.id, item.path);
        }
    }
    Ok(())
}
