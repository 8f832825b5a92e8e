mod breed;
mod config;
mod logging;
mod search;
mod source;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use breed::BreedRecord;
use config::Config;
use logging::LogTarget;
use source::{BreedSource, HttpSource};
use state::{Displayed, SearchState};

#[derive(Parser, Debug)]
#[command(name = "breedsearch", about = "Search dog breeds from the terminal")]
struct Cli {
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Breed list to load instead of the configured endpoint: an http(s) URL or a JSON file
    #[arg(long, global = true, value_name = "URL|PATH")]
    source: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search and print the breed card that would be shown
    Query(QueryArgs),
    /// Print autocomplete suggestions, one per line
    Suggest(SuggestArgs),
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Search text (case-insensitive substring of the breed name)
    query: String,
}

#[derive(Args, Debug)]
struct SuggestArgs {
    /// Partial breed name
    query: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = if cli.command.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    let log_path = logging::init(target)?;

    let config = config::load(cli.config.as_deref())?;
    if let Some(path) = &config.config_path {
        info!(path = %path.display(), "loaded configuration");
    }

    let source = breed_source(cli.source.as_deref(), &config);

    match cli.command {
        Some(Command::Query(args)) => handle_query(args, source.as_ref()),
        Some(Command::Suggest(args)) => handle_suggest(args, source.as_ref()),
        None => {
            if let Some(path) = log_path {
                info!(path = %path.display(), "starting terminal UI");
            }
            let breeds_rx = source::spawn_load(source);
            let picker = ui::app::create_image_picker();
            let mut app = ui::app::App::new(&config, breeds_rx, picker);
            app.run()
        }
    }
}

fn breed_source(location: Option<&str>, config: &Config) -> Box<dyn BreedSource> {
    match location {
        Some(location) => source::source_for(location),
        None => Box::new(HttpSource::new(config.endpoint.clone())),
    }
}

fn loaded_state(source: &dyn BreedSource) -> SearchState {
    let mut state = SearchState::new();
    state.finish_load(source::load_breeds(source));
    state
}

fn handle_query(args: QueryArgs, source: &dyn BreedSource) -> Result<()> {
    let mut state = loaded_state(source);
    state.set_query(args.query.as_str());
    state.execute_search();

    match state.displayed() {
        Displayed::Popular(record) => {
            println!("No search performed, showing the popular breed");
            print_card(record);
        }
        Displayed::Match(record) => {
            println!("Best match for \"{}\"", args.query);
            print_card(record);
        }
        Displayed::Empty => println!("No matches for \"{}\"", args.query),
    }
    Ok(())
}

fn handle_suggest(args: SuggestArgs, source: &dyn BreedSource) -> Result<()> {
    let mut state = loaded_state(source);
    state.set_query(args.query.as_str());
    for name in state.suggestions() {
        println!("{}", name);
    }
    Ok(())
}

fn print_card(record: &BreedRecord) {
    println!();
    println!("{}", record.name);
    println!("{}", record.temperament);
    for (label, value) in record.card_fields() {
        println!("{}: {}", label, value);
    }
    println!("Image: {}", record.image);
    println!();
    println!("{}", record.description);
}
