use clap::Parser;

/// Re-aggregates precinct election results onto ZIP codes and cities.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON configuration of the run: geography feeds, election years and their
    /// candidate columns. Relative paths in the configuration are resolved against its directory.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path or 'stdout') Where to write the election document. Setting this option overrides
    /// the output path that may be specified in the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference election document. If provided, zipvote will check that the
    /// elections it computed match the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path or 'stdout') If specified, the coverage diagnostics (skipped rows, unresolved
    /// tracts, excluded years) are written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub diagnostics: Option<String>,

    /// (number) Overrides the minimum number of votes for a city or a ZIP code to be reported.
    #[clap(long, value_parser)]
    pub min_scope_votes: Option<f64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
