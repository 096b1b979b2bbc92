// FILE: src/cli/mod.rs

mod config;
mod handlers;

pub use config::ConfigFile;

use crate::context_builder::BuildOptions;
use crate::error::Result;
use crate::types::Locale;
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

pub struct SlotCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl SlotCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        let result = match matches.subcommand() {
            Some(("render", sub_matches)) => handlers::handle_render_command(self, sub_matches),
            Some(("context", sub_matches)) => handlers::handle_context_command(self, sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(self, sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        };
        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        result
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.toml or .json)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("render")
                    .about("Render a slot template against a page bundle")
                    .arg(Arg::new("template").help("Template file").required(true).index(1))
                    .arg(Arg::new("data").short('d').long("data").value_name("FILE").help("Page bundle JSON").required(true))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Write rendered output to a file"))
                    .arg(Arg::new("locale").short('l').long("locale").value_name("TAG").help("Locale, overrides the bundle and config"))
                    .arg(Arg::new("currency").long("currency").value_name("CODE").help("Currency code, overrides settings and store"))
                    .arg(Arg::new("stats").long("stats").help("Show render statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch the template and bundle and re-render on change").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("context")
                    .about("Print the variable context built for a page bundle")
                    .arg(Arg::new("data").help("Page bundle JSON").required(true).index(1))
                    .arg(Arg::new("locale").short('l').long("locale").value_name("TAG").help("Locale, overrides the bundle and config"))
                    .arg(Arg::new("currency").long("currency").value_name("CODE").help("Currency code, overrides settings and store"))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("pretty").help("Output format")),
            )
            .subcommand(
                Command::new("check")
                    .about("Report unmatched directives in templates")
                    .arg(Arg::new("input").help("Template file or directory").required(true).index(1))
                    .arg(Arg::new("recursive").short('r').long("recursive").help("Check all templates in the directory recursively").action(ArgAction::SetTrue)),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Config file settings, then command-line overrides
    pub fn build_options(&self, matches: &clap::ArgMatches) -> BuildOptions {
        let mut options = self.config.build_options();
        if let Some(locale) = matches.get_one::<String>("locale") {
            options.locale = Locale::new(locale.as_str());
        }
        if let Some(currency) = matches.get_one::<String>("currency") {
            options.currency = Some(currency.clone());
        }
        options
    }
}

impl Default for SlotCli {
    fn default() -> Self {
        Self::new()
    }
}
