use crate::CLAP_STYLING;
use clap::{Arg, ArgAction, ArgGroup, arg, command};
use url::Url;

const REPORT_FORMATS: [&str; 5] = ["text", "json", "csv", "markdown", "md"];

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("surfrank")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("surfrank")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(
            arg!(-v --"verbose" "Log more; repeat for debug output")
                .required(false)
                .action(ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Politely crawl outward from one or more seed URLs, then rank the pages by \
                the link graph they form.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A seed URL to start from (repeatable)")
                        .value_parser(clap::value_parser!(Url))
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .group(
                    ArgGroup::new("seeds")
                        .args(["url", "hosts-file"])
                        .required(true),
                )
                .arg(
                    arg!(--"blacklist" <HOST>)
                        .required(false)
                        .help("A host that must never be contacted (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(--"blacklist-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of blacklisted hosts")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"interval" <SECONDS>)
                        .required(false)
                        .help("Minimum time between two requests to the same host")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("1"),
                )
                .arg(
                    arg!(--"visit-cap" <NUM_PAGES>)
                        .required(false)
                        .help("Stop after this many pages have been visited")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async workers in the crawl pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-attempts" <NUM>)
                        .required(false)
                        .help("Give up on a page after this many failed fetches")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"seed" <NUM>)
                        .required(false)
                        .help("Seed the frontier selection for a reproducible crawl order")
                        .value_parser(clap::value_parser!(u64)),
                )
                .args(rank_args())
                .args(output_args()),
        )
        .subcommand(
            command!("rank")
                .about("Rank the nodes of a link graph read from an edge list file")
                .arg(
                    arg!(-e --"edges-file" <PATH>)
                        .required(true)
                        .help(
                            "Whitespace-separated `source target` pairs, one per line. Blank \
                        lines and # comments are ignored.",
                        )
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .args(rank_args())
                .args(output_args()),
        )
}

fn rank_args() -> [Arg; 4] {
    [
        arg!(--"damping" <FACTOR>)
            .required(false)
            .help("Probability of following a link at each step, within [0, 1]")
            .value_parser(clap::value_parser!(f64))
            .default_value("0.85"),
        arg!(--"max-iterations" <NUM>)
            .required(false)
            .help("Give up ranking after this many power iterations")
            .value_parser(clap::value_parser!(usize))
            .default_value("100"),
        arg!(--"tolerance" <EPSILON>)
            .required(false)
            .help("Per-node convergence tolerance")
            .value_parser(clap::value_parser!(f64))
            .default_value("0.000001"),
        arg!(--"top" <NUM>)
            .required(false)
            .help("How many ranked pages to list in the report")
            .value_parser(clap::value_parser!(usize))
            .default_value("20"),
    ]
}

fn output_args() -> [Arg; 2] {
    [
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Save report to file (default: display to screen)"),
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format: text, json, csv, markdown")
            .value_parser(REPORT_FORMATS)
            .default_value("text"),
    ]
}
