// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use logging::{LogTarget, setup_logging};
use maildelay_app::{AppState, parse_fragment};
use maildelay_tui::MailBackend;
use runtime::{DemoRuntime, HttpRuntime, build_client};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `maildelay --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let refresh_interval = config.refresh_interval()?;

    let client = if options.demo {
        None
    } else {
        Some(build_client(&config).with_context(|| {
            format!("check [server] in {}", options.config_path.display())
        })?)
    };
    if options.check_only {
        return Ok(());
    }

    if options.dump {
        setup_logging(config.log_level(), &LogTarget::Stderr)?;
        return match client {
            Some(client) => dump_rows(&mut HttpRuntime::new(client)),
            None => dump_rows(&mut DemoRuntime::new()),
        };
    }

    let log_file = config.log_file()?;
    setup_logging(config.log_level(), &LogTarget::File(log_file.clone()))
        .with_context(|| format!("set up logging to {}", log_file.display()))?;
    tracing::info!(
        base_url = config.base_url(),
        demo = options.demo,
        "starting maildelay"
    );

    let mut state = AppState::default();
    match client {
        Some(client) => {
            maildelay_tui::run_app(&mut state, HttpRuntime::new(client), refresh_interval)
        }
        None => maildelay_tui::run_app(&mut state, DemoRuntime::new(), refresh_interval),
    }
}

fn dump_rows(backend: &mut dyn MailBackend) -> Result<()> {
    let markup = backend.fetch_table().context("fetch mail table")?;
    let rows = parse_fragment(&markup).context("parse mail table")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&rows).context("encode rows")?
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    dump: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        dump: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--dump" => {
                options.dump = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("maildelay: live list of delayed mails");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Run against generated mails (in-memory, no server)");
    println!("  --check                  Validate config and HTTP client setup");
    println!("  --dump                   Fetch the mail table once and print rows as JSON");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, dump_rows, parse_cli_args};
    use crate::runtime::DemoRuntime;
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/maildelay-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                demo: false,
                check_only: false,
                dump: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.demo);
        assert!(!options.dump);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_demo_and_dump_flags() -> Result<()> {
        let options = parse_cli_args(vec!["--demo", "--dump"], default_options_path())?;
        assert!(options.demo);
        assert!(options.dump);
        assert!(!options.print_config_path);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn dump_rows_succeeds_against_demo_backend() -> Result<()> {
        dump_rows(&mut DemoRuntime::new())
    }
}
