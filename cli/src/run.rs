use std::fs;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::debug;

use lpardiff_common::config::Config;
use lpardiff_core::diff;
use lpardiff_core::failover::{self, HmcSource};
use lpardiff_core::fetch::{DebugCapture, GroupToggles, LookupOutcome, ProfileFetcher};
use lpardiff_core::session::SessionSettings;

use crate::args::{CommandLine, PartitionPair};
use crate::prompt;
use crate::terminal::{logging, print, spinner};

pub fn run(args: CommandLine) -> anyhow::Result<()> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;
    if let Some(override_spec) = &args.hmcs {
        config.override_hmcs(override_spec);
    }
    config.ensure_hosts()?;

    logging::init(config.debug);

    let pairs = collect_pairs(&args)?;
    if pairs.is_empty() {
        bail!("no LPAR pairs to compare");
    }
    debug!(
        config = %args.config.display(),
        pairs = pairs.len(),
        hmcs = config.hmcs.len(),
        "starting comparison run"
    );

    let credentials = prompt::credentials()?;

    let mut fetcher = ProfileFetcher::new(toggles(&config));
    if config.debug {
        fetcher = fetcher.with_capture(DebugCapture::new("debug"));
    }
    let source = HmcSource::new(
        SessionSettings {
            verify_tls: config.ssl_verify,
            timeout: Duration::from_secs(config.timeout_secs),
        },
        fetcher,
    );

    let mut failed_pairs = 0usize;
    for pair in &pairs {
        let spinner = (!config.debug).then(spinner::scanning);
        let located = failover::locate(
            &source,
            &config.hmcs,
            &credentials,
            (pair.left.as_str(), pair.right.as_str()),
        );
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        // Session-contract failures (auth rejection, misuse) are fatal
        // for the whole run; per-pair lookup problems are not.
        let (left_outcome, right_outcome) = located?;

        match (left_outcome, right_outcome) {
            (LookupOutcome::Found(left), LookupOutcome::Found(right)) => {
                let result = diff::compare(&left, &right, args.diffonly);
                print::pair_header(&pair.left, &pair.right);
                print::comparison_table(&pair.left, &pair.right, &result);
            }
            (left_outcome, right_outcome) => {
                report_failures(pair, &left_outcome, &right_outcome);
                failed_pairs += 1;
                if !args.keep_going {
                    bail!("lookup failed for pair {}:{}", pair.left, pair.right);
                }
            }
        }
    }

    if failed_pairs > 0 {
        bail!("{failed_pairs} pair(s) could not be compared");
    }
    Ok(())
}

fn toggles(config: &Config) -> GroupToggles {
    GroupToggles {
        general: config.compare_general,
        processors: config.compare_processors,
        memory: config.compare_memory,
        networking: config.compare_networking,
        virtual_fc: config.compare_virtual_fc,
        virtual_scsi: config.compare_virtual_scsi,
    }
}

fn report_failures(pair: &PartitionPair, left: &LookupOutcome, right: &LookupOutcome) {
    for (name, outcome) in [(&pair.left, left), (&pair.right, right)] {
        if let Some(message) = failure_message(name, outcome) {
            print::failure(&message);
        }
    }
}

fn failure_message(name: &str, outcome: &LookupOutcome) -> Option<String> {
    match outcome {
        LookupOutcome::Found(_) => None,
        LookupOutcome::NotFound => Some(format!("LPAR not found: {name}")),
        LookupOutcome::ProfileMissing => Some(format!("No default profile found: {name}")),
        LookupOutcome::QueryError(failure) => Some(format!(
            "Error encountered obtaining data: {name} ({failure})"
        )),
    }
}

fn collect_pairs(args: &CommandLine) -> anyhow::Result<Vec<PartitionPair>> {
    if !args.lpars.is_empty() {
        return Ok(args.lpars.clone());
    }
    let Some(path) = &args.file else {
        // clap's input group guarantees one of the two is present.
        bail!("either --lpars or --file is required");
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading LPAR pairs from {}", path.display()))?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.parse::<PartitionPair>()
                .map_err(|error| anyhow::anyhow!("{}: {error}", path.display()))
        })
        .collect()
}
