mod args;
mod prompt;
mod run;
mod terminal;

use args::CommandLine;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let args = CommandLine::parse();
    run::run(args)
}
