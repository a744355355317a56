//! CLI for ingesting and inspecting vacancy listings

use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use hh_client::{HhClient, OrderBy, SearchQuery, MAX_PER_PAGE};
use ingest::{Config, Pipeline, PipelineOptions, RunSummary};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vacancy_store::{ListingFilter, ListingOrder, SqliteStore, StoredListing};

#[derive(Parser)]
#[command(name = "vacancy-ingest")]
#[command(about = "Collect HH.ru vacancies into a local SQLite database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,

    /// Fetch vacancies and store them
    Ingest(IngestArgs),

    /// Show database statistics
    Stats {
        /// Number of most frequent skills to list
        #[arg(long, default_value_t = 10)]
        top: u32,
    },

    /// Print one listing and its skills as JSON
    Show { id: i64 },

    /// List stored vacancies matching filters
    Search(SearchArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Professional role code, repeatable
    #[arg(long = "role")]
    roles: Vec<String>,

    /// Area code, repeatable
    #[arg(long = "area")]
    areas: Vec<String>,

    /// Industry code, e.g. 7 or 7.540
    #[arg(long)]
    industry: Option<String>,

    /// Free-text search
    #[arg(long)]
    text: Option<String>,

    /// Only vacancies published on or after this date
    #[arg(long, conflicts_with = "days_back")]
    date_from: Option<NaiveDate>,

    /// Only vacancies published in the last N days
    #[arg(long)]
    days_back: Option<u32>,

    #[arg(long, value_enum, default_value_t = OrderArg::PublicationTime)]
    order_by: OrderArg,

    #[arg(long, default_value_t = MAX_PER_PAGE)]
    per_page: u32,

    /// Page budget per role/area combination
    #[arg(long)]
    max_pages: Option<u32>,

    /// Fetch each vacancy's key skills from the detail endpoint
    #[arg(long)]
    fetch_skills: bool,

    /// Drop vacancies whose name contains this word, repeatable
    #[arg(long = "exclude-keyword")]
    exclude_keywords: Vec<String>,

    /// Keep an excluded vacancy when its name or requirements contain this
    /// word, repeatable
    #[arg(long = "include-keyword")]
    include_keywords: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    PublicationTime,
    SalaryDesc,
    SalaryAsc,
    Relevance,
}

impl From<OrderArg> for OrderBy {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::PublicationTime => OrderBy::PublicationTime,
            OrderArg::SalaryDesc => OrderBy::SalaryDesc,
            OrderArg::SalaryAsc => OrderBy::SalaryAsc,
            OrderArg::Relevance => OrderBy::Relevance,
        }
    }
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long)]
    area: Option<String>,

    #[arg(long)]
    experience: Option<String>,

    /// Either salary bound at least this much
    #[arg(long)]
    min_salary: Option<i64>,

    /// Published on or after this date
    #[arg(long)]
    since: Option<NaiveDate>,

    #[arg(long, value_enum, default_value_t = SearchOrder::Newest)]
    order: SearchOrder,

    #[arg(long, default_value_t = 20)]
    limit: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchOrder {
    Newest,
    Salary,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ingest=debug,hh_client=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Init => init(&config).await,
        Commands::Ingest(args) => ingest(&config, args).await,
        Commands::Stats { top } => stats(&config, top).await,
        Commands::Show { id } => show(&config, id).await,
        Commands::Search(args) => search(&config, args).await,
    }
}

async fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))
}

async fn init(config: &Config) -> Result<()> {
    open_store(config).await?;
    println!("{} Schema ready in {}", "✓".green(), config.database_url);
    Ok(())
}

async fn ingest(config: &Config, args: IngestArgs) -> Result<()> {
    let queries = build_queries(&args)?;
    let client = HhClient::new(config.client_config()?).context("Failed to build HTTP client")?;
    let store = open_store(config).await?;

    let options = PipelineOptions {
        retry: config.retry.clone(),
        fetch_skills: args.fetch_skills,
        exclude_keywords: args.exclude_keywords,
        include_keywords: args.include_keywords,
        max_pages: args.max_pages,
        ..Default::default()
    };

    tracing::info!(queries = queries.len(), "Starting ingestion");
    let mut pipeline = Pipeline::new(client, store, options);
    let result = pipeline.run(&queries).await;

    print_summary(pipeline.summary());
    result.context("Ingestion stopped")?;
    Ok(())
}

/// One query per role/area combination.
fn build_queries(args: &IngestArgs) -> Result<Vec<SearchQuery>> {
    if args.per_page == 0 || args.per_page > MAX_PER_PAGE {
        bail!("--per-page must be between 1 and {}", MAX_PER_PAGE);
    }

    let date_from = match (args.date_from, args.days_back) {
        (Some(date), _) => Some(date),
        (None, Some(days)) => Some(days_before(Utc::now().date_naive(), days)?),
        (None, None) => None,
    };

    let roles: Vec<Option<&String>> = if args.roles.is_empty() {
        vec![None]
    } else {
        args.roles.iter().map(Some).collect()
    };
    let areas: Vec<Option<&String>> = if args.areas.is_empty() {
        vec![None]
    } else {
        args.areas.iter().map(Some).collect()
    };

    let mut queries = Vec::with_capacity(roles.len() * areas.len());
    for role in &roles {
        for area in &areas {
            let mut builder = SearchQuery::builder()
                .order_by(args.order_by.into())
                .per_page(args.per_page);
            if let Some(role) = role {
                builder = builder.professional_role(role.as_str());
            }
            if let Some(area) = area {
                builder = builder.area(area.as_str());
            }
            if let Some(industry) = &args.industry {
                builder = builder.industry(industry.as_str());
            }
            if let Some(text) = &args.text {
                builder = builder.text(text.as_str());
            }
            if let Some(date) = date_from {
                builder = builder.date_from(date);
            }
            queries.push(builder.build().context("Invalid search parameters")?);
        }
    }
    Ok(queries)
}

fn days_before(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    match today.checked_sub_signed(ChronoDuration::days(i64::from(days))) {
        Some(date) => Ok(date),
        None => bail!("--days-back {} reaches before the earliest supported date", days),
    }
}

fn print_summary(summary: &RunSummary) {
    let header = if summary.aborted {
        "Ingestion aborted".red().bold()
    } else {
        "Ingestion complete".green().bold()
    };
    println!("{}", header);
    print!("{}", summary);
}

async fn stats(config: &Config, top: u32) -> Result<()> {
    let store = open_store(config).await?;
    let stats = store.stats(top).await.context("Failed to read statistics")?;

    println!("{}", "Database statistics".bold());
    println!("  listings:          {}", stats.total_listings);
    println!("  with salary:       {}", stats.with_salary);
    println!("  unique employers:  {}", stats.unique_employers);
    println!("  regions:           {}", stats.unique_areas);
    println!("  unique skills:     {}", stats.unique_skills);
    if !stats.top_skills.is_empty() {
        println!("{}", "Top skills".bold());
        for skill in &stats.top_skills {
            println!("  {:<30}{}", skill.name, skill.count);
        }
    }
    Ok(())
}

async fn show(config: &Config, id: i64) -> Result<()> {
    let store = open_store(config).await?;
    let Some(stored) = store.get_listing(id).await.context("Failed to read listing")? else {
        bail!("No listing with id {}", id);
    };
    let skills: Vec<String> = store
        .skills_for(id)
        .await
        .context("Failed to read skills")?
        .into_iter()
        .map(|tag| tag.skill_name)
        .collect();

    let document = serde_json::json!({
        "listing": stored,
        "skills": skills,
    });
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn search(config: &Config, args: SearchArgs) -> Result<()> {
    let store = open_store(config).await?;

    let mut filter = ListingFilter::new().with_limit(args.limit).order_by(match args.order {
        SearchOrder::Newest => ListingOrder::Newest,
        SearchOrder::Salary => ListingOrder::SalaryDesc,
    });
    if let Some(area) = args.area {
        filter = filter.with_area(area);
    }
    if let Some(experience) = args.experience {
        filter = filter.with_experience(experience);
    }
    if let Some(min_salary) = args.min_salary {
        filter = filter.with_min_salary(min_salary);
    }
    if let Some(since) = args.since {
        filter = filter.published_after(since.and_time(NaiveTime::MIN).and_utc());
    }

    let listings = store.find_listings(&filter).await.context("Search failed")?;
    if listings.is_empty() {
        println!("{}", "No matching listings".yellow());
        return Ok(());
    }
    for stored in &listings {
        println!("{}", format_row(stored));
    }
    Ok(())
}

fn format_row(stored: &StoredListing) -> String {
    let listing = &stored.listing;
    let salary = match (listing.salary_from, listing.salary_to) {
        (Some(from), Some(to)) => format!("{}-{}", from, to),
        (Some(from), None) => format!("from {}", from),
        (None, Some(to)) => format!("up to {}", to),
        (None, None) => "-".to_string(),
    };
    let published = listing
        .published_at
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:<10} {}  {}  {} {}  {}",
        listing.id.to_string().cyan(),
        published,
        listing.name.bold(),
        salary,
        listing.salary_currency.as_deref().unwrap_or(""),
        listing.area.as_deref().unwrap_or("-"),
    )
}
