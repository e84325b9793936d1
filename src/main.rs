use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use census::{AgeRange, JoinPolicy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use popmap::population::{CsvPopulation, DEFAULT_PERIOD};
use popmap::regions::{self, Region, REGIONS};
use popmap::render::{render_choropleth, render_outline, write_map};
use popmap::sgis::{Credentials, SgisClient, DEFAULT_BASE_URL, DEFAULT_YEAR};
use popmap::{run_pipeline, BoundarySource};

/// Population share maps of Korean 행정동 from SGIS boundaries.
#[derive(Parser, Debug)]
#[command(name = "popmap", version, about)]
struct Cli {
    /// More logging; RUST_LOG overrides it.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the 시/도 names and codes.
    Regions,
    /// Map the 행정동 boundaries of a region.
    Outline {
        #[command(flatten)]
        sgis: SgisArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Map the share of an age group per 행정동.
    Choropleth {
        #[command(flatten)]
        sgis: SgisArgs,
        #[command(flatten)]
        output: OutputArgs,

        /// Population CSV exported from the resident registration statistics.
        #[arg(long, default_value = "age.csv")]
        csv: PathBuf,

        /// Reporting month as it appears in the column names.
        #[arg(long, default_value = DEFAULT_PERIOD)]
        period: String,

        /// Inclusive age range, e.g. 10-19.
        #[arg(long, default_value_t = AgeRange::YOUTH)]
        ages: AgeRange,

        /// How population rows are matched to boundaries.
        #[arg(long, value_enum, default_value_t = Policy::Short)]
        policy: Policy,

        /// Legend and tooltip label for the share.
        #[arg(long, default_value = "청소년 비율 (%)")]
        label: String,
    },
}

#[derive(Args, Debug)]
struct SgisArgs {
    /// 시/도 name or code, e.g. 서울특별시 or 11.
    #[arg(long, default_value = "11")]
    region: String,

    #[arg(long, env = "SGIS_KEY", hide_env_values = true)]
    sgis_key: String,

    #[arg(long, env = "SGIS_SECRET", hide_env_values = true)]
    sgis_secret: String,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    sgis_url: String,

    /// Boundary vintage.
    #[arg(long, default_value = DEFAULT_YEAR)]
    year: String,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Directory for the .geojson and .html output.
    #[arg(long, default_value = "out")]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// 행정동 name only; same-named 동 in different 구 collide.
    Short,
    /// 구 and 행정동 name together.
    Qualified,
}

impl From<Policy> for JoinPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Short => JoinPolicy::ShortName,
            Policy::Qualified => JoinPolicy::Qualified,
        }
    }
}

impl SgisArgs {
    fn region(&self) -> Result<&'static Region> {
        regions::lookup(&self.region).ok_or_else(|| {
            anyhow!(
                "unknown region {:?}, see `popmap regions`",
                self.region
            )
        })
    }

    fn client(&self) -> SgisClient {
        SgisClient::new(Credentials::new(&self.sgis_key, &self.sgis_secret))
            .with_base_url(&self.sgis_url)
            .year(&self.year)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "popmap=debug,census=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Regions => {
            for region in REGIONS.iter() {
                println!("{}\t{}", region.code, region.name);
            }
        }
        Command::Outline { sgis, output } => {
            let region = sgis.region()?;
            let features = sgis.client().boundaries(region.code).await?;
            let title = format!("{} 하위 행정동 경계", region.name);
            let (collection, html) = render_outline(&title, &features);
            let (geojson, page) =
                write_map(&output.out, &format!("{}_outline", region.code), collection, &html)?;
            tracing::info!(features = features.len(), "wrote outline map");
            println!("{}\n{}", geojson.display(), page.display());
        }
        Command::Choropleth {
            sgis,
            output,
            csv,
            period,
            ages,
            policy,
            label,
        } => {
            let region = sgis.region()?;
            let client = sgis.client();
            let population = CsvPopulation::new(&csv, period);
            let result = run_pipeline(&client, &population, region.code, ages, policy.into())
                .await
                .with_context(|| format!("building the {} map", region.name))?;

            let title = format!("{} 행정동별 {ages}세 인구 비율", region.name);
            let (collection, html) =
                render_choropleth(&title, &result.joined, &label, &label);
            let (geojson, page) = write_map(
                &output.out,
                &format!("{}_{ages}", region.code),
                collection,
                &html,
            )?;
            tracing::info!(
                matched = result.summary.matched,
                total = result.summary.total(),
                collisions = result.collisions.len(),
                "wrote choropleth"
            );
            println!("{}\n{}", geojson.display(), page.display());
        }
    }

    Ok(())
}
