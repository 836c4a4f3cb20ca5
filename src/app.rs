use std::io::Write;
use std::path::PathBuf;

use clap::{error::ErrorKind, CommandFactory, Parser};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::binder::{SortEvent, SortState, ViewBinder, ViewOptions};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::listing::{ClientOptions, HttpListingClient, ListingFailure, ListingTransport};
use crate::output::{self, OutputFormat};
use crate::pages::{PageSize, PageSizeOptions};
use crate::preferences::{FilePreferencesStore, PreferencesStore};

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Clone, Debug)]
struct RunConfig {
    url: String,
    params: Vec<(String, String)>,
    name: String,
    default_page_size: PageSize,
    page_sizes: PageSizeOptions,
    page_size: Option<PageSize>,
    page: Option<String>,
    sort_default: SortState,
    sort: Option<String>,
    clear_sort: bool,
    refresh: bool,
    timeout: u64,
    proxy: Option<String>,
    header: Option<String>,
    preferences_dir: PathBuf,
    current_url: Option<String>,
    delete_url: Option<String>,
    delete_param: String,
    delete_ids: Vec<String>,
    format: OutputFormat,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let url = args
        .url
        .or(cfg.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "no listing URL provided (use -u or set url in config)".to_string())?;

    let mut params: Vec<(String, String)> = cfg.params.unwrap_or_default().into_iter().collect();
    for raw in args.params.iter() {
        let (key, value) = validation::parse_param(raw)?;
        params.retain(|(k, _)| k != &key);
        params.push((key, value));
    }

    let default_page_size = match cfg.page_size {
        Some(count) => PageSize::from_count(count)
            .ok_or_else(|| format!("invalid page_size {count} in config"))?,
        None => crate::pages::DEFAULT_PAGE_SIZE,
    };
    let page_sizes = PageSizeOptions {
        sizes: cfg
            .page_sizes
            .unwrap_or_else(|| PageSizeOptions::default().sizes),
        unlimited: cfg.allow_unlimited.unwrap_or(false),
    };
    let page_size = args
        .page_size
        .as_deref()
        .map(str::parse::<PageSize>)
        .transpose()?;

    let sort_column = cfg.sort.filter(|s| !s.trim().is_empty());
    let sort_default = SortState {
        descending: sort_column
            .as_ref()
            .map(|_| args.sort_desc || cfg.sort_desc.unwrap_or(false)),
        column: sort_column,
    };

    let preferences_dir = cfg
        .preferences_dir
        .as_deref()
        .map(config::expand_tilde)
        .unwrap_or_else(config::default_preferences_dir);

    let format_raw = args
        .format
        .or(cfg.output_format)
        .unwrap_or_else(|| "text".to_string());
    let format = OutputFormat::parse(&format_raw)
        .ok_or_else(|| format!("invalid output format '{format_raw}'"))?;

    let delete_url = args.delete_url.or(cfg.delete_url);
    if !args.delete_ids.is_empty() && delete_url.is_none() {
        return Err("--delete-id requires a delete URL".to_string());
    }

    Ok(RunConfig {
        url,
        params,
        name: args
            .name
            .or(cfg.name)
            .unwrap_or_else(|| "default".to_string()),
        default_page_size,
        page_sizes,
        page_size,
        page: args.page,
        sort_default,
        sort: args.sort,
        clear_sort: args.clear_sort,
        refresh: args.refresh,
        timeout: args.timeout.or(cfg.timeout).unwrap_or(10),
        proxy: args.proxy.or(cfg.proxy),
        header: args.header.or(cfg.header),
        preferences_dir,
        current_url: args.current_url.or(cfg.current_url),
        delete_url,
        delete_param: args
            .delete_param
            .or(cfg.delete_param)
            .unwrap_or_else(|| "id".to_string()),
        delete_ids: args.delete_ids,
        format,
        no_color: args.no_color || cfg.no_color.unwrap_or(false),
    })
}

fn view_options(run: &RunConfig) -> ViewOptions {
    ViewOptions {
        page_size: run.default_page_size,
        sort_default: run.sort_default.clone(),
        current_url: run.current_url.clone(),
        delete_url: run.delete_url.clone(),
        delete_param: run.delete_param.clone(),
        page_sizes: run.page_sizes.clone(),
    }
}

fn check<T: ListingTransport, P: PreferencesStore>(
    view: &ViewBinder<T, P>,
    result: Result<(), ListingFailure>,
) -> Result<(), String> {
    result.map_err(|failure| {
        debug!(view = view.name(), "operation failed: {failure}");
        output::render_failure(view.phase(), view.state())
    })
}

/// Applies the requested view operations in a fixed order: page size, page,
/// sort, refresh.
async fn drive_view<T: ListingTransport, P: PreferencesStore>(
    view: &mut ViewBinder<T, P>,
    run: &RunConfig,
) -> Result<(), String> {
    if view.options().sort_default.is_active() {
        view.apply_sort(None, SortEvent::default());
    }
    let result = view.init().await;
    check(view, result)?;

    if let Some(size) = run.page_size.filter(|s| *s != view.page_size()) {
        info!(view = view.name(), %size, "changing page size");
        let result = view.update_page_size(size).await;
        check(view, result)?;
    }
    if let Some(page) = run.page.as_deref() {
        let result = view.set_page(page, false).await;
        check(view, result)?;
    }
    if run.clear_sort {
        let column = view.sort().column.clone();
        let result = view.set_sort(column.as_deref(), SortEvent::shift()).await;
        check(view, result)?;
    }
    if let Some(column) = run.sort.as_deref() {
        let result = view.set_sort(Some(column), SortEvent::default()).await;
        check(view, result)?;
    }
    if run.refresh {
        let result = view.refresh().await;
        check(view, result)?;
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let client = HttpListingClient::new(
        &run.url,
        ClientOptions {
            timeout_seconds: run.timeout,
            proxy: run.proxy.clone(),
            header: run.header.clone(),
            params: run.params.clone(),
        },
    )
    .map_err(|e| e.to_string())?;
    let store = FilePreferencesStore::new(run.preferences_dir.clone());
    debug!(
        url = %client.url(),
        preferences = %store.dir().display(),
        view = %run.name,
        "listing client ready"
    );
    let mut view = ViewBinder::new(run.name.clone(), client, store, view_options(&run));

    drive_view(&mut view, &run).await?;

    let sort = view.sort();
    let record = output::build_record(
        view.name(),
        view.state(),
        view.page_size(),
        sort.column.as_deref(),
        sort.descending,
    );
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&output::render(&record, run.format))
        .map_err(|e| format!("failed to write output: {e}"))?;

    if let Some(url) = view.delete_url(&run.delete_ids) {
        writeln!(stdout, ":: delete {url}").map_err(|e| format!("failed to write output: {e}"))?;
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                let mut cmd = CliArgs::command();
                print!("{}", cmd.render_long_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    if args.write_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "cannot determine config path".to_string())?;
        config::ensure_default_config_file(&path)?;
        println!("{}", path.display());
        return Ok(());
    }
    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
