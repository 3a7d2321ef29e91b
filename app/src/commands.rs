use clap::{App, Arg};

/// Avaliable command line arguments
pub enum CliArg {
    Config,
    Quiet,
    Verbose,
}

impl CliArg {
    pub fn as_str(&self) -> &str {
        match self {
            &CliArg::Config => "config",
            &CliArg::Quiet => "quiet",
            &CliArg::Verbose => "verbose",
        }
    }
}

/// Construct a new clap root command
pub fn new_root_command<'a>() -> clap::App<'a, 'static> {
    App::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about("Simulated network lab")
        .args(&[
            Arg::with_name(CliArg::Config.as_str())
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Lab topology and options")
                .takes_value(true)
                .required(true),
            Arg::with_name(CliArg::Quiet.as_str())
                .short("q")
                .long("quiet")
                .help("Turn off info level logging")
                .conflicts_with(CliArg::Verbose.as_str()),
            Arg::with_name(CliArg::Verbose.as_str())
                .short("v")
                .long("verbose")
                .help("Turn on all debugging"),
        ])
}
