//! dirodm command-line tool
//!
//! Builds typed filters from a declared schema and runs searches against a
//! JSON directory fixture.

mod executor;
mod formatter;

use clap::{Args as ClapArgs, Parser, Subcommand};
use dirodm_core::config::EngineConfig;
use dirodm_proto::{Dn, SearchScope};
use executor::{CliError, SearchTarget};
use formatter::OutputFormat;
use std::path::PathBuf;

/// dirodm command-line tool
#[derive(Parser, Debug)]
#[command(name = "dirodm")]
#[command(version, about = "Object-to-directory mapping tool")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the filter built for a type and conditions
    Encode(TypeArgs),
    /// Search a fixture and print the matching records
    Search(SearchArgs),
    /// Count matching entries
    Count(SearchArgs),
    /// Run a paged search and print each page
    Pages {
        #[command(flatten)]
        search: SearchArgs,

        /// Entries per page (0 uses the configured page size)
        #[arg(long, default_value_t = 0)]
        page_size: u32,
    },
}

#[derive(ClapArgs, Debug)]
pub struct TypeArgs {
    /// Schema declaration (JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Type to filter on
    #[arg(short = 't', long = "type")]
    pub type_name: String,

    /// Condition on a property: prop=value, prop>=value, prop<=value or prop~=value
    #[arg(short = 'w', long = "where", value_name = "CONDITION")]
    pub conditions: Vec<String>,
}

#[derive(ClapArgs, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub typed: TypeArgs,

    /// Directory fixture (JSON array of entries)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Search base (defaults to the configured base)
    #[arg(short, long)]
    pub base: Option<Dn>,

    /// Search scope: base, onelevel or subtree
    #[arg(long)]
    pub scope: Option<SearchScope>,

    /// Client size limit (0 for none)
    #[arg(long)]
    pub size_limit: Option<u32>,
}

impl SearchArgs {
    fn config(&self) -> Result<EngineConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(base) = &self.base {
            config = config.with_base(base.clone());
        }
        if let Some(scope) = self.scope {
            config = config.with_scope(scope);
        }
        if let Some(limit) = self.size_limit {
            config = config.with_size_limit(limit);
        }
        Ok(config)
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dirodm_cli=info".parse().expect("valid directive")),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String, CliError> {
    let formatter = formatter::create_formatter(args.format);

    match &args.command {
        Command::Encode(typed) => {
            let factory = executor::open_factory(&typed.schema, None, EngineConfig::default())?;
            executor::encode(&factory, &typed.type_name, &typed.conditions, &*formatter)
        }
        Command::Search(search) => {
            let config = search.config()?;
            let factory =
                executor::open_factory(&search.typed.schema, Some(&search.data), config)?;
            let target = target(search, factory.config());
            executor::search(&factory, &target, &*formatter)
        }
        Command::Count(search) => {
            let config = search.config()?;
            let factory =
                executor::open_factory(&search.typed.schema, Some(&search.data), config)?;
            let target = target(search, factory.config());
            executor::count(&factory, &target, &*formatter)
        }
        Command::Pages { search, page_size } => {
            let config = search.config()?;
            let factory =
                executor::open_factory(&search.typed.schema, Some(&search.data), config)?;
            let target = target(search, factory.config());
            executor::pages(&factory, &target, *page_size, &*formatter)
        }
    }
}

fn target<'a>(search: &'a SearchArgs, config: &EngineConfig) -> SearchTarget<'a> {
    SearchTarget {
        type_name: &search.typed.type_name,
        conditions: &search.typed.conditions,
        base: config.base(),
        scope: config.scope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_search_args() {
        let args = Args::try_parse_from([
            "dirodm",
            "search",
            "--schema",
            "schema.json",
            "--type",
            "Person",
            "--data",
            "data.json",
            "--where",
            "surname=Mathieu",
            "-w",
            "age>=30",
            "--base",
            "ou=people,dc=example",
            "--scope",
            "onelevel",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.format, OutputFormat::Json);
        let Command::Search(search) = args.command else {
            panic!("expected search");
        };
        assert_eq!(search.typed.conditions, vec!["surname=Mathieu", "age>=30"]);
        let config = search.config().unwrap();
        assert_eq!(config.scope, SearchScope::OneLevel);
        assert_eq!(config.base(), Dn::parse("ou=people,dc=example").unwrap());
    }

    #[test]
    fn test_parse_pages_args() {
        let args = Args::try_parse_from([
            "dirodm", "pages", "-s", "schema.json", "-t", "Person", "-d", "data.json",
            "--page-size", "25",
        ])
        .unwrap();
        match args.command {
            Command::Pages { page_size, search } => {
                assert_eq!(page_size, 25);
                assert_eq!(search.config().unwrap(), EngineConfig::default());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
