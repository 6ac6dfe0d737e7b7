use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgGroup, Parser};

/// One comparison pair, parsed from `name1:name2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPair {
    pub left: String,
    pub right: String,
}

impl FromStr for PartitionPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((left, right)) = s.split_once(':') else {
            return Err(format!("expected name1:name2, got '{s}'"));
        };
        let (left, right) = (left.trim(), right.trim());
        if left.is_empty() || right.is_empty() {
            return Err(format!("expected name1:name2, got '{s}'"));
        }
        Ok(Self {
            left: left.to_string(),
            right: right.to_string(),
        })
    }
}

#[derive(Parser, Debug)]
#[command(name = "lpardiff")]
#[command(about = "Compares the HMC profiles of two LPARs and highlights any differences.")]
#[command(group(ArgGroup::new("input").required(true).args(["lpars", "file"])))]
#[command(after_help = "\
Format for the input file when using --file:
    prod01:dr01
    prod02:dr02

Output colours:
    green : values match
      red : values don't match or value missing")]
pub struct CommandLine {
    /// Pair(s) of LPARs to compare separated by a space. LPAR names are
    /// case sensitive (e.g. --lpars prod01:dr01 prod02:dr02)
    #[arg(long, num_args = 1..)]
    pub lpars: Vec<PartitionPair>,

    /// File listing LPAR pairs to compare, one name1:name2 per line
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Override the HMCs listed in the configuration file (colon separated)
    #[arg(long)]
    pub hmcs: Option<String>,

    /// Only show the differences between LPARs
    #[arg(long)]
    pub diffonly: bool,

    /// Report a failed pair and continue instead of aborting the run
    #[arg(long)]
    pub keep_going: bool,

    /// Location of the configuration file
    #[arg(long, default_value = "config/config.yaml")]
    pub config: PathBuf,
}
