use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;

use firmscope::api::{
    CachedDirectory, DirectoryApi, DirectoryBackend, HttpAuthProvider, ListScope, SessionManager,
};
use firmscope::cache::{CacheConfig, QueryCache};
use firmscope::companies::CompanyDetail;
use firmscope::config::AppConfig;
use firmscope::controller::CompanyListController;
use firmscope::errors::DirectoryError;
use firmscope::events::EventBus;
use firmscope::export::ExportFormat;
use firmscope::filters::{FilterSet, FilterUpdate, SortOrder};
use firmscope::logger::{self, LogLevel, LogTag};
use firmscope::persistence::LocalStore;
use firmscope::query::ResultsSnapshot;
use firmscope::subscription::PlanTier;

#[derive(Parser)]
#[command(name = "firmscope", about = "Company directory client", version)]
struct Cli {
    /// Path to the config file (created with defaults when missing)
    #[arg(long, default_value = "firmscope.json")]
    config: PathBuf,

    /// Enable debug logging for every module
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the registry with filters
    Search {
        /// Free-text search term
        #[arg(long)]
        query: Option<String>,
        /// County filter, e.g. "Cluj"
        #[arg(long)]
        judet: Option<String>,
        /// City filter (requires --judet)
        #[arg(long)]
        city: Option<String>,
        /// Single CAEN code, e.g. "6201"
        #[arg(long)]
        caen: Option<String>,
        /// Comma-separated CAEN codes; clears --caen
        #[arg(long, value_delimiter = ',')]
        caen_codes: Vec<String>,
        /// Sort order: newest_first, oldest_first, name_asc, name_desc,
        /// revenue_desc, employees_desc
        #[arg(long, default_value = "newest_first")]
        sort: String,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Query the latest-companies view instead of the full registry
        #[arg(long)]
        latest: bool,
    },
    /// Show one company by CUI
    Show { cui: String },
    /// Registry statistics for the persisted filters
    Stats,
    /// Export the persisted filter set
    Export {
        /// csv or xlsx
        #[arg(long, default_value = "csv")]
        format: String,
    },
    /// Show the subscription plan and usage
    Plan,
    /// Switch to another subscription plan
    ChangePlan {
        /// free, basic or pro
        plan: String,
    },
    /// Clear persisted filters back to defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    logger::init(LogLevel::from_str(&config.logging.level));
    if cli.debug {
        logger::enable_debug_all();
    }

    let events = EventBus::new();
    let store = Arc::new(LocalStore::load(PathBuf::from(&config.storage.state_path)).await?);
    let provider = Arc::new(HttpAuthProvider::new(&config.api)?);
    let session = Arc::new(SessionManager::new(
        provider,
        Arc::clone(&store),
        events.clone(),
    ));
    let api = Arc::new(DirectoryApi::new(&config.api, session)?);
    let cache = Arc::new(QueryCache::new(CacheConfig::from_settings(&config.cache)));
    let backend: Arc<dyn DirectoryBackend> = Arc::new(CachedDirectory::new(api, cache));

    match cli.command {
        Command::Search {
            query,
            judet,
            city,
            caen,
            caen_codes,
            sort,
            pages,
            latest,
        } => {
            let scope = if latest { ListScope::Latest } else { ListScope::All };
            let controller =
                CompanyListController::new(scope, backend, Arc::clone(&store), events, &config);

            if let Some(judet) = judet {
                controller.set_filter(FilterUpdate::County(Some(judet)));
            }
            if let Some(city) = city {
                controller.set_filter(FilterUpdate::City(Some(city)));
            }
            if let Some(caen) = caen {
                controller.set_filter(FilterUpdate::SingleCategoryCode(Some(caen)));
            }
            if !caen_codes.is_empty() {
                controller.set_filter(FilterUpdate::MultiCategoryCodes(Some(caen_codes)));
            }
            if let Some(query) = query {
                controller.set_filter(FilterUpdate::Search(Some(query)));
            }
            controller.set_filter(FilterUpdate::SortBy(SortOrder::from_str(&sort)));

            // The CLI wants the answer now, not after the UI quiet period.
            controller.refresh().await;
            for _ in 1..pages {
                controller.load_next_page().await;
            }

            let results = controller.results();
            if let Some(err) = &results.last_error {
                report_error(err);
                std::process::exit(1);
            }
            print_companies(&results);

            let filters = controller.filters();
            store
                .update(move |state| state.filters = Some(filters))
                .await?;
        }
        Command::Show { cui } => {
            let controller = CompanyListController::new(
                ListScope::All,
                backend,
                Arc::clone(&store),
                events,
                &config,
            );
            match controller.company(&cui).await {
                Ok(detail) => print_company(&detail),
                Err(err) => {
                    report_error(&err);
                    std::process::exit(1);
                }
            }
        }
        Command::Stats => {
            let controller = CompanyListController::new(
                ListScope::All,
                backend,
                Arc::clone(&store),
                events,
                &config,
            );
            match controller.load_overview().await {
                Ok(stats) => {
                    let results = controller.results();
                    println!("Total companies:   {}", stats.total_companies);
                    println!("Active companies:  {}", stats.active_companies);
                    println!("New this month:    {}", stats.new_this_month);
                    println!("Matching filters:  {}", results.total_count);
                    if !stats.top_counties.is_empty() {
                        let mut table = Table::new();
                        table.set_header(vec!["County", "Companies"]);
                        for county in &stats.top_counties {
                            table.add_row(vec![county.county.clone(), county.count.to_string()]);
                        }
                        println!("{table}");
                    }
                }
                Err(err) => {
                    report_error(&err);
                    std::process::exit(1);
                }
            }
        }
        Command::Export { format } => {
            let format = ExportFormat::from_str(&format)
                .with_context(|| format!("unknown export format: {}", format))?;
            let controller = CompanyListController::new(
                ListScope::All,
                backend,
                Arc::clone(&store),
                events,
                &config,
            );

            // Refresh the plan mirror so the gate reflects server truth.
            if let Err(err) = controller.sync_subscription().await {
                logger::warning(
                    LogTag::Cli,
                    &format!("could not refresh subscription, using persisted state: {}", err),
                );
            }

            match controller.export(format).await {
                Ok(file) => {
                    println!("Exported to {}", file.path.display());
                    if let Some(rows) = file.rows {
                        println!("{} rows, {} bytes", rows, file.bytes);
                    } else {
                        println!("{} bytes", file.bytes);
                    }
                }
                Err(err) => {
                    report_error(&err);
                    std::process::exit(1);
                }
            }
        }
        Command::Plan => {
            let controller = CompanyListController::new(
                ListScope::All,
                backend,
                Arc::clone(&store),
                events,
                &config,
            );
            match controller.sync_subscription().await {
                Ok(subscription) => {
                    println!("Plan: {}", subscription.plan.as_str());
                    if let Some(renews) = subscription.renews_on {
                        println!("Renews on: {}", renews);
                    }
                    println!(
                        "Exports used: {}/{}",
                        subscription.exports_used, subscription.monthly_export_quota
                    );
                }
                Err(err) => {
                    report_error(&err);
                    std::process::exit(1);
                }
            }
        }
        Command::ChangePlan { plan } => {
            let controller = CompanyListController::new(
                ListScope::All,
                backend,
                Arc::clone(&store),
                events,
                &config,
            );
            match controller.change_plan(PlanTier::from_str(&plan)).await {
                Ok(subscription) => {
                    println!("Now on the {} plan", subscription.plan.as_str());
                    println!(
                        "Monthly export quota: {}",
                        subscription.monthly_export_quota
                    );
                }
                Err(err) => {
                    report_error(&err);
                    std::process::exit(1);
                }
            }
        }
        Command::Reset => {
            store
                .update(|state| state.filters = Some(FilterSet::default()))
                .await?;
            println!("Filters reset to defaults");
        }
    }

    Ok(())
}

fn print_companies(results: &ResultsSnapshot) {
    let mut table = Table::new();
    table.set_header(vec!["CUI", "Name", "County", "City", "CAEN", "Employees"]);
    for company in &results.items {
        table.add_row(vec![
            company.cui.clone(),
            company.name.clone(),
            company.county.clone(),
            company.city.clone(),
            company.category_code.clone(),
            company
                .employees
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".into()),
        ]);
    }
    println!("{table}");
    println!(
        "{} of {} companies loaded{}",
        results.items.len(),
        results.total_count,
        if results.has_next_page {
            " (more available)"
        } else {
            ""
        }
    );
}

fn print_company(detail: &CompanyDetail) {
    println!("{} ({})", detail.name, detail.cui);
    println!("Status:   {}", detail.status.as_str());
    println!("Location: {}, {}", detail.city, detail.county);
    match &detail.category_label {
        Some(label) => println!("CAEN:     {} - {}", detail.category_code, label),
        None => println!("CAEN:     {}", detail.category_code),
    }
    if let Some(address) = &detail.address {
        println!("Address:  {}", address);
    }
    if let Some(website) = &detail.website {
        println!("Website:  {}", website);
    }
    if let Some(registered) = detail.registered_on {
        println!("Registered: {}", registered);
    }
    if let Some(balance) = detail.latest_balance() {
        println!(
            "Latest balance ({}): revenue {}, profit {}, employees {}",
            balance.year,
            balance
                .revenue
                .map(|v| format!("{:.0}", v))
                .unwrap_or_else(|| "-".into()),
            balance
                .profit
                .map(|v| format!("{:.0}", v))
                .unwrap_or_else(|| "-".into()),
            balance
                .employees
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".into()),
        );
    }
}

fn report_error(err: &DirectoryError) {
    logger::error(LogTag::Cli, &err.to_string());
    if err.is_recoverable() {
        eprintln!("This looks transient; try again.");
    }
}
