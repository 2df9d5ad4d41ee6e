use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jrc_common::config::{ConfigClient, Settings};
use jrc_common::logging::setup_logging;
use jrc_common::sources::{
    ArxivSource, BiorxivSource, ConvertTarget, CrossrefSource, DataciteSource, ElsevierSource,
    FigshareSource, NcbiSource, OaSource, OrcidSource, PeopleSource, ProtocolsIoSource,
    ZenodoSource,
};
use jrc_common::token::check_token;
use jrc_common::utils::{convert_diacritics, wall_timer, HttpClient};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// jrc - query the services behind the shared library from the command line
#[derive(Parser, Debug)]
#[command(name = "jrc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query scholarly-metadata services, configuration and tokens", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Enable informational logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Request timeout in seconds (overrides each service's default)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Identifier to convert a PMID into
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Pmcid,
    Doi,
}

impl From<Target> for ConvertTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Pmcid => ConvertTarget::Pmcid,
            Target::Doi => ConvertTarget::Doi,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a DOI to a PubMed ID
    Pmid {
        doi: String,
    },

    /// Convert a PubMed ID to a PMCID or DOI
    ConvertPmid {
        pmid: String,

        #[arg(long, value_enum, default_value_t = Target::Pmcid)]
        to: Target,
    },

    /// Query arXiv, e.g. `id:2301.00001`
    Arxiv {
        query: String,
    },

    /// bioRxiv details for a DOI
    Biorxiv {
        doi: String,
    },

    /// Crossref work for a DOI
    Crossref {
        doi: String,
    },

    /// DataCite record for a DOI
    Datacite {
        doi: String,
    },

    /// Elsevier content API query, e.g. `abstract/doi/10.1016/...`
    Elsevier {
        query: String,
    },

    /// Figshare articles for a DOI
    Figshare {
        doi: String,
    },

    /// OA.Works report for a DOI, or the institutional report
    Oa {
        /// DOI to look up; omit for the institutional report
        doi: Option<String>,

        /// Extra parameters appended to the institutional report query
        #[arg(long, default_value = "")]
        suffix: String,
    },

    /// ORCID record
    Orcid {
        orcid: String,
    },

    /// People directory record by employee ID
    PeopleId {
        id: String,
    },

    /// People directory search by name
    PeopleName {
        name: String,
    },

    /// People directory members of a supervisory organization
    PeopleOrg {
        code: String,

        #[arg(long, default_value_t = 0)]
        page: u32,
    },

    /// protocols.io query, e.g. `protocols?key=janelia`
    Protocols {
        query: String,
    },

    /// Zenodo query, e.g. `records/10050311`
    Zenodo {
        query: String,
    },

    /// Named configuration from the configuration service
    Config {
        name: String,
    },

    /// Check the JSON Web Token held in an environment variable
    Token {
        /// Environment variable holding the token
        #[arg(long, default_value = "JACS_JWT")]
        env: String,
    },

    /// ASCII-fold accented characters
    Diacritics {
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.debug, cli.verbose).context("Failed to initialize logging")?;

    let settings = Settings::from_env().context("Failed to read settings from environment")?;
    let client = Arc::new(HttpClient::new()?);
    let timeout = cli.timeout.map(Duration::from_secs);

    let label = format!("{:?}", cli.command);
    let output = wall_timer(&label, run(cli.command, &settings, client, timeout)).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

macro_rules! timed {
    ($source:expr, $timeout:expr) => {
        match $timeout {
            Some(timeout) => $source.with_timeout(timeout),
            None => $source,
        }
    };
}

async fn run(
    command: Commands,
    settings: &Settings,
    client: Arc<HttpClient>,
    timeout: Option<Duration>,
) -> Result<Value> {
    let value = match command {
        Commands::Pmid { doi } => {
            let ncbi = timed!(ncbi(settings, client), timeout);
            json!({ "doi": doi, "pmid": ncbi.get_pmid(&doi).await? })
        }
        Commands::ConvertPmid { pmid, to } => {
            let ncbi = timed!(ncbi(settings, client), timeout);
            json!({ "pmid": pmid, "result": ncbi.convert_pmid(&pmid, to.into()).await? })
        }
        Commands::Arxiv { query } => {
            timed!(ArxivSource::with_client(client), timeout)
                .query(&query)
                .await?
        }
        Commands::Biorxiv { doi } => {
            timed!(BiorxivSource::with_client(client), timeout)
                .details(&doi)
                .await?
        }
        Commands::Crossref { doi } => {
            let crossref = CrossrefSource::with_client(client)
                .with_mailto(settings.contact_email().map(str::to_string));
            timed!(crossref, timeout).work(&doi).await?
        }
        Commands::Datacite { doi } => {
            timed!(DataciteSource::with_client(client), timeout)
                .doi(&doi)
                .await?
        }
        Commands::Elsevier { query } => {
            let elsevier = ElsevierSource::with_client(client, settings.elsevier_api_key()?);
            timed!(elsevier, timeout).content(&query).await?
        }
        Commands::Figshare { doi } => {
            timed!(FigshareSource::with_client(client), timeout)
                .articles_by_doi(&doi)
                .await?
        }
        Commands::Oa { doi, suffix } => {
            let oa = timed!(OaSource::with_client(client), timeout);
            match doi {
                Some(doi) => oa.work(&doi).await?,
                None => oa.institution_report(&suffix).await?,
            }
        }
        Commands::Orcid { orcid } => {
            timed!(OrcidSource::with_client(client), timeout)
                .record(&orcid)
                .await?
        }
        Commands::PeopleId { id } => {
            let people = PeopleSource::with_client(client, settings.people_api_key()?);
            timed!(people, timeout)
                .by_id(&id)
                .await?
                .unwrap_or(Value::Null)
        }
        Commands::PeopleName { name } => {
            let people = PeopleSource::with_client(client, settings.people_api_key()?);
            timed!(people, timeout)
                .by_name(&name)
                .await?
        }
        Commands::PeopleOrg { code, page } => {
            let people = PeopleSource::with_client(client, settings.people_api_key()?);
            timed!(people, timeout)
                .by_org(&code, page)
                .await?
        }
        Commands::Protocols { query } => {
            let protocols = ProtocolsIoSource::with_client(client, settings.protocols_api_token()?);
            timed!(protocols, timeout).query(&query).await?
        }
        Commands::Zenodo { query } => {
            let zenodo = ZenodoSource::with_client(client, settings.zenodo_api_key()?);
            timed!(zenodo, timeout).query(&query).await?
        }
        Commands::Config { name } => {
            ConfigClient::new(client, settings.config_server_url()?)
                .get_config_value(&name)
                .await?
        }
        Commands::Token { env } => {
            let token = check_token(Some(&env))?;
            json!({
                "header": token.header,
                "payload": token.claims,
                "expires": token.expires_at().map(|at| at.to_rfc3339()),
            })
        }
        Commands::Diacritics { text } => {
            json!({ "input": text, "converted": convert_diacritics(&text) })
        }
    };
    Ok(value)
}

fn ncbi(settings: &Settings, client: Arc<HttpClient>) -> NcbiSource {
    NcbiSource::with_client(client)
        .with_api_key(settings.ncbi_api_key().map(str::to_string))
        .with_email(settings.contact_email().map(str::to_string))
}
