use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rdmkit_core::models::ModernRecord;
use rdmkit_core::storage::{JsonDirStore, LegacyDb};
use rdmkit_core::{Config, ExitCode};
use rdmkit_metadata::crosswalk::{
    crossref_to_modern, datacite_to_modern, funder_ror_keys, legacy_to_citation, legacy_to_modern,
    modern_to_legacy,
};
use rdmkit_metadata::harvest::{harvest, read_ids_file, HarvestSummary, RecordSource};
use rdmkit_metadata::sources::{CrossRefClient, DataCiteClient, OaiClient, RdmClient, RorClient};
use rdmkit_metadata::sources::rdm::DEFAULT_SORT;
use rdmkit_metadata::{CrosswalkContext, Crosswalked, MetadataError, RorCache};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "rdmkit",
    about = "Harvest, crosswalk and replicate records between a legacy EPrints repository and an RDM repository",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file. Defaults to $RDMKIT_CONFIG or ~/.config/rdmkit/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Prefix applied to environment variable names (e.g. `AUTHORS_` for AUTHORS_RDM_URL).
    #[arg(long, global = true, default_value = "")]
    env_prefix: String,

    /// Compact JSON output instead of pretty-printed.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
#[command(rename_all = "snake_case")]
enum Commands {
    /// Write a configuration template, or show the current one with secrets hidden.
    Setup,

    /// List every record id over OAI-PMH.
    GetAllIds,

    /// List record ids modified in an inclusive YYYY-MM-DD range.
    GetModifiedIds { start: String, end: String },

    /// Run a search query against the RDM repository.
    Query {
        text: String,
        #[arg(default_value = DEFAULT_SORT)]
        sort: String,
        #[arg(long, default_value = "25")]
        size: usize,
    },

    /// Fetch one record from the RDM repository.
    GetRecord { id: String },

    /// Fetch records into the local store.
    Harvest(HarvestArgs),

    /// Fetch a CrossRef work and crosswalk it to an RDM record.
    Crossref { doi: String },

    /// Fetch a DataCite object (DOI or arXiv id) and crosswalk it to an RDM record.
    Datacite { doi: String },

    /// List legacy record ids, optionally those modified in a date range.
    LegacyIds {
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        modified: Option<Vec<String>>,
        /// Only records with this eprint_status.
        #[arg(long)]
        status: Option<String>,
    },

    /// Reconstruct a legacy record from the SQL tables.
    LegacyRecord { id: i64 },

    /// Reconstruct a legacy record and crosswalk it to an RDM record.
    LegacyToRdm { id: i64 },

    /// Reconstruct a legacy record and render its citation.
    LegacyCitation { id: i64 },

    /// Write an RDM record (JSON file) into the legacy SQL tables as a new record.
    LegacyCreate { file: PathBuf },

    /// Reconstruct legacy records into the local store.
    LegacyHarvest(HarvestArgs),

    /// Serve the read-only legacy REST replica.
    Serve,

    /// A bare DOI: try CrossRef first, then DataCite.
    #[command(external_subcommand)]
    Doi(Vec<String>),
}

#[derive(clap::Args)]
struct HarvestArgs {
    /// Every record id.
    #[arg(long, conflicts_with_all = ["modified", "ids_file"])]
    all: bool,

    /// Records modified since START (through END, default today).
    #[arg(long, num_args = 1..=2, value_names = ["START", "END"], conflicts_with = "ids_file")]
    modified: Option<Vec<String>>,

    /// File holding a JSON array of ids or one id per line.
    ids_file: Option<PathBuf>,
}

/// How the ids of a harvest run are chosen.
enum Selection {
    All,
    Modified(String, String),
    File(PathBuf),
}

impl HarvestArgs {
    fn selection(self) -> Result<Selection> {
        if self.all {
            return Ok(Selection::All);
        }
        if let Some(range) = self.modified {
            let start = range.first().cloned().unwrap_or_default();
            let end = match range.get(1) {
                Some(end) => end.clone(),
                None => chrono::Utc::now().format("%Y-%m-%d").to_string(),
            };
            return Ok(Selection::Modified(start, end));
        }
        match self.ids_file {
            Some(path) => Ok(Selection::File(path)),
            None => bail!("expected --all, --modified START [END] or an ids file"),
        }
    }
}

impl Commands {
    fn verb(&self) -> &'static str {
        match self {
            Commands::Setup => "setup",
            Commands::GetAllIds => "get_all_ids",
            Commands::GetModifiedIds { .. } => "get_modified_ids",
            Commands::Query { .. } => "query",
            Commands::GetRecord { .. } => "get_record",
            Commands::Harvest(_) => "harvest",
            Commands::Crossref { .. } => "crossref",
            Commands::Datacite { .. } => "datacite",
            Commands::LegacyIds { .. } => "legacy_ids",
            Commands::LegacyRecord { .. } => "legacy_record",
            Commands::LegacyToRdm { .. } => "legacy_to_rdm",
            Commands::LegacyCitation { .. } => "legacy_citation",
            Commands::LegacyCreate { .. } => "legacy_create",
            Commands::LegacyHarvest(_) => "legacy_harvest",
            Commands::Serve => "serve",
            Commands::Doi(_) => "doi",
        }
    }
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "rdmkit=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let verb = cli.command.verb();
    if let Err(e) = run(cli).await {
        eprintln!("rdmkit {verb}: {e:#}");
        std::process::exit(ExitCode::Failure.into());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let out = Output { compact: cli.json };
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    if let Commands::Setup = cli.command {
        return setup(&config_path, &out);
    }

    let file = cli.config.as_deref().or_else(|| config_path.exists().then_some(config_path.as_path()));
    let cfg = Config::load(file, &cli.env_prefix).context("loading configuration")?;

    match cli.command {
        Commands::Setup => Ok(()),

        Commands::GetAllIds => {
            let ids = OaiClient::new(&cfg)?.get_all_ids().await?;
            out.print(&ids)
        }

        Commands::GetModifiedIds { start, end } => {
            let ids = OaiClient::new(&cfg)?.get_modified_ids(&start, &end).await?;
            out.print(&ids)
        }

        Commands::Query { text, sort, size } => {
            let records = RdmClient::new(&cfg)?.query(&text, &sort, size).await?;
            out.print(&records)
        }

        Commands::GetRecord { id } => {
            let record = RdmClient::new(&cfg)?.get_record(&id).await?;
            out.print(&record)
        }

        Commands::Harvest(args) => {
            let client = RdmClient::new(&cfg)?;
            let ids = match args.selection()? {
                Selection::All => OaiClient::new(&cfg)?.get_all_ids().await?,
                Selection::Modified(start, end) => OaiClient::new(&cfg)?.get_modified_ids(&start, &end).await?,
                Selection::File(path) => read_ids_file(&path).with_context(|| format!("reading {}", path.display()))?,
            };
            let summary = run_harvest(&client, &cfg, &ids).await?;
            println!("{summary}");
            Ok(())
        }

        Commands::Crossref { doi } => {
            let ctx = CrosswalkContext::from_config(&cfg);
            let record = crossref_record(&cfg, &ctx, &doi).await?;
            out.print(&record)
        }

        Commands::Datacite { doi } => {
            let ctx = CrosswalkContext::from_config(&cfg);
            let record = datacite_record(&ctx, &doi).await?;
            out.print(&record)
        }

        Commands::Doi(args) => {
            let Some(doi) = args.first() else {
                bail!("expected a DOI");
            };
            let ctx = CrosswalkContext::from_config(&cfg);
            let record = match crossref_record(&cfg, &ctx, doi).await {
                Ok(record) => record,
                Err(e) => {
                    info!(doi = %doi, error = %e, "CrossRef lookup failed, trying DataCite");
                    datacite_record(&ctx, doi).await?
                }
            };
            out.print(&record)
        }

        Commands::LegacyIds { modified, status } => {
            let db = open_legacy(&cfg)?;
            let ids = match (modified, status) {
                (Some(range), _) => db.modified_ids(&range[0], &range[1])?,
                (None, Some(status)) => db.ids_with_status(&status)?,
                (None, None) => db.get_all_ids()?,
            };
            out.print(&ids)
        }

        Commands::LegacyRecord { id } => {
            let record = open_legacy(&cfg)?.read_record(id)?;
            out.print(&record)
        }

        Commands::LegacyToRdm { id } => {
            let record = open_legacy(&cfg)?.read_record(id)?;
            let ctx = CrosswalkContext::from_config(&cfg);
            let modern = log_warnings(legacy_to_modern(&record, &ctx)?);
            out.print(&modern)
        }

        Commands::LegacyCitation { id } => {
            let record = open_legacy(&cfg)?.read_record(id)?;
            let ctx = CrosswalkContext::from_config(&cfg);
            let citation = log_warnings(legacy_to_citation(&record, &ctx)?);
            out.print(&citation)
        }

        Commands::LegacyCreate { file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let modern: ModernRecord =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
            let ctx = CrosswalkContext::from_config(&cfg);
            let mut legacy = log_warnings(modern_to_legacy(&modern, &ctx)?);
            let db = open_legacy(&cfg)?;
            let eprintid = db.create_record(&mut legacy)?;
            info!(eprintid, "created legacy record");
            out.print(&serde_json::json!({ "eprintid": eprintid }))
        }

        Commands::LegacyHarvest(args) => {
            let db = open_legacy(&cfg)?;
            let ids: Vec<String> = match args.selection()? {
                Selection::All => db.get_all_ids()?.iter().map(i64::to_string).collect(),
                Selection::Modified(start, end) => db.modified_ids(&start, &end)?.iter().map(i64::to_string).collect(),
                Selection::File(path) => read_ids_file(&path).with_context(|| format!("reading {}", path.display()))?,
            };
            let summary = run_harvest(&db, &cfg, &ids).await?;
            println!("{summary}");
            Ok(())
        }

        Commands::Serve => rdmkit_server::serve(&cfg).await,
    }
}

// ─── Verbs ───────────────────────────────────────────────────────────────────

/// Print the stored configuration with secrets hidden, or write a template
/// when none exists yet.
fn setup(path: &Path, out: &Output) -> Result<()> {
    if path.exists() {
        let cfg = Config::load_from(path)?;
        return out.print(&cfg.redacted());
    }
    let sample = Config::sample();
    sample
        .save_to(path)
        .with_context(|| format!("writing {}", path.display()))?;
    eprintln!("wrote {}; edit it before running other verbs", path.display());
    out.print(&sample)
}

async fn run_harvest(source: &dyn RecordSource, cfg: &Config, ids: &[String]) -> Result<HarvestSummary> {
    let dir = cfg.store_dir()?;
    let store = JsonDirStore::open(&dir).with_context(|| format!("opening {}", dir.display()))?;
    info!(store = %dir.display(), ids = ids.len(), "harvest starting");
    let summary = harvest(source, &store, ids, &cfg.c_name).await?;
    Ok(summary)
}

async fn crossref_record(cfg: &Config, ctx: &CrosswalkContext, doi: &str) -> Result<ModernRecord> {
    let work = CrossRefClient::new(&cfg.mailto)?.get_work(doi).await?;

    let keys = funder_ror_keys(&work);
    let mut ror = RorCache::new();
    if !keys.is_empty() {
        let client = RorClient::new()?;
        for key in keys {
            if ror.contains_key(&key) {
                continue;
            }
            let id = client.lookup(&key, true).await;
            ror.insert(key, id);
        }
    }

    Ok(log_warnings(crossref_to_modern(&work, ctx, &ror)?))
}

async fn datacite_record(ctx: &CrosswalkContext, doi: &str) -> Result<ModernRecord> {
    let object = DataCiteClient::new()?.get_object(doi).await?;
    Ok(log_warnings(datacite_to_modern(&object, ctx)?))
}

fn open_legacy(cfg: &Config) -> Result<LegacyDb> {
    let path = cfg.legacy_db_path()?;
    if !path.exists() {
        return Err(MetadataError::Config(format!("legacy database {} does not exist", path.display())).into());
    }
    LegacyDb::open(&path, &cfg.eprint_base_url()).with_context(|| format!("opening {}", path.display()))
}

fn log_warnings<T>(out: Crosswalked<T>) -> T {
    for w in &out.warnings {
        warn!("{w}");
    }
    out.record
}

// ─── Output ──────────────────────────────────────────────────────────────────

struct Output {
    compact: bool,
}

impl Output {
    fn print<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let text = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbs_are_snake_case() {
        let cli = Cli::try_parse_from(["rdmkit", "get_modified_ids", "2024-01-01", "2024-01-31"]).unwrap();
        assert_eq!(cli.command.verb(), "get_modified_ids");
        let cli = Cli::try_parse_from(["rdmkit", "legacy_to_rdm", "42"]).unwrap();
        assert!(matches!(cli.command, Commands::LegacyToRdm { id: 42 }));
    }

    #[test]
    fn bare_doi_is_its_own_verb() {
        let cli = Cli::try_parse_from(["rdmkit", "10.1000/xyz"]).unwrap();
        match cli.command {
            Commands::Doi(args) => assert_eq!(args, ["10.1000/xyz"]),
            _ => panic!("expected a DOI verb"),
        }
    }

    #[test]
    fn harvest_selection() {
        let Commands::Harvest(args) = Cli::try_parse_from(["rdmkit", "harvest", "--all"]).unwrap().command else {
            panic!("expected harvest");
        };
        assert!(matches!(args.selection().unwrap(), Selection::All));

        let Commands::Harvest(args) = Cli::try_parse_from(["rdmkit", "harvest", "--modified", "2024-01-01", "2024-02-01"])
            .unwrap()
            .command
        else {
            panic!("expected harvest");
        };
        match args.selection().unwrap() {
            Selection::Modified(start, end) => assert_eq!((start.as_str(), end.as_str()), ("2024-01-01", "2024-02-01")),
            _ => panic!("expected a date range"),
        }

        let Commands::Harvest(args) = Cli::try_parse_from(["rdmkit", "harvest"]).unwrap().command else {
            panic!("expected harvest");
        };
        assert!(args.selection().is_err());
    }

    #[test]
    fn global_flags_after_verb() {
        let cli = Cli::try_parse_from(["rdmkit", "get_record", "abc12-3def4", "--json", "--env-prefix", "AUTHORS_"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.env_prefix, "AUTHORS_");
    }
}
