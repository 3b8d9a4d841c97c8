use anyhow::Result;
use clap::Parser;

use dashpipe::cli::{run_dashboard, run_graph, Args, Command};

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let (doc, pretty) = match &args.command {
        Command::Run(run) => (run_dashboard(run)?, run.pretty),
        Command::Graph(graph) => (run_graph(graph)?, graph.pretty),
    };

    let text = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    println!("{text}");
    Ok(())
}
