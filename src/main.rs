//! newsitem - Inspect NewsML-G2 news items

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use newsitem::{
    Config, LanguageParts, Link, LocationFilter, MetadataObject, NewsItem, NullSink, PubStatus,
    PubWindow, Service, XmlDom,
};

const TAG_TYPES: [&str; 3] = ["x-im/person", "x-im/organisation", "x-im/topic"];

#[derive(Parser)]
#[command(name = "newsitem")]
#[command(version, about = "Inspect NewsML-G2 news items", long_about = None)]
#[command(after_help = "EXAMPLES:
    newsitem article.xml                  Print a JSON summary
    newsitem -v article.xml               Same, with debug logging
    newsitem -c newsitem.json article.xml Use custom qcode prefixes")]
struct Cli {
    /// NewsML-G2 news item
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    guid: Option<String>,
    language: LanguageParts,
    text_direction: String,
    pub_status: Option<PubStatus>,
    pub_window: PubWindow,
    ed_note: String,
    channels: Vec<Service>,
    main_channel: Option<Service>,
    section: Option<Service>,
    authors: Vec<Link>,
    tags: Vec<Link>,
    stories: Vec<Link>,
    categories: Vec<Link>,
    locations: Vec<Link>,
    news_priority: Option<MetadataObject>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match show_summary(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "newsitem=debug" } else { "newsitem=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn show_summary(cli: &Cli) -> newsitem::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let bytes = std::fs::read(&cli.input)?;
    let mut dom = XmlDom::parse_bytes(&bytes)?;
    debug!(path = %cli.input.display(), nodes = dom.len(), "parsed news item");

    let mut sink = NullSink;
    let item = NewsItem::new(&mut dom, &mut sink).with_config(config);

    let summary = Summary {
        guid: item.guid(),
        language: item.language_parts(),
        text_direction: item.text_direction(),
        pub_status: item.pub_status(),
        pub_window: item.pub_window(),
        ed_note: item.ed_note(),
        channels: item.channels(),
        main_channel: item.main_channel(),
        section: item.section()?,
        authors: item.authors(),
        tags: item.tags(&TAG_TYPES),
        stories: item.stories(),
        categories: item.categories(),
        locations: item.locations(LocationFilter::All),
        news_priority: item.news_priority(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
