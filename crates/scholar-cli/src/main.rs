mod files;
mod session;

use anyhow::{bail, Result};
use clap::Parser;
use cliclack::input;
use console::style;
use scholar::models::message::Message;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use session::Theme;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Research topic; prompted for when omitted
    topic: Vec<String>,

    /// Document to analyze alongside the web research (repeatable)
    #[arg(short, long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,

    /// Base url of the research server
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Color theme for the rendered report
    #[arg(long, value_enum, default_value = "dark")]
    theme: Theme,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let topic: String = if cli.topic.is_empty() {
        input("What would you like to research?")
            .placeholder("AI for climate modeling")
            .interact()?
    } else {
        cli.topic.join(" ")
    };
    if topic.trim().is_empty() && cli.files.is_empty() {
        bail!("Nothing to research: give a topic or at least one --file");
    }

    let mut message = Message::user().with_text(topic.trim());
    for path in &cli.files {
        message = message.with_file(files::load_file(path)?);
    }

    println!(
        "{} {}",
        style("Research Assistant").bold(),
        style(format!("- {} file(s) attached", cli.files.len())).dim()
    );

    session::run(&cli.server, message, cli.theme).await
}
