use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Command, arg, command, crate_name};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(Command::new(cli::SERVER_SUBCOMMAND).about(cli::SERVER_DESCRIPTION))
        .subcommand(
            Command::new(cli::UPLOAD_SUBCOMMAND)
                .about(cli::UPLOAD_DESCRIPTION)
                .arg(uri_arg())
                .arg(
                    arg!(<FILES> ...)
                        .required(true)
                        .help("Images to upload, sent as one batch in this order"),
                ),
        )
        .subcommand(
            Command::new(cli::LIST_SUBCOMMAND)
                .about(cli::LIST_DESCRIPTION)
                .arg(uri_arg()),
        )
        .subcommand(
            Command::new(cli::DOWNLOAD_SUBCOMMAND)
                .about(cli::DOWNLOAD_DESCRIPTION)
                .arg(uri_arg())
                .arg(
                    arg!(-o --output <OUTPUT>)
                        .required(false)
                        .default_value(cli::ARCHIVE_NAME)
                        .help("Where to save the archive"),
                ),
        )
        .subcommand(
            Command::new(cli::DELETE_SUBCOMMAND)
                .about(cli::DELETE_DESCRIPTION)
                .arg(uri_arg()),
        )
        .subcommand(
            Command::new(cli::ADMIN_SUBCOMMAND)
                .about(cli::ADMIN_DESCRIPTION)
                .arg(uri_arg())
                .arg(
                    arg!(-k --key <KEY>)
                        .required(true)
                        .help("Shared admin secret"),
                ),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
        .get_matches();

    let result = match cli.subcommand() {
        Some((cli::VERSION_SUBCOMMAND, _)) => {
            cli::version::run();
            Ok(())
        }
        Some((cli::BUGREPORT_SUBCOMMAND, _)) => {
            cli::bugreport::run();
            Ok(())
        }
        Some((cli::SERVER_SUBCOMMAND, _)) => cli::server::run().await,
        Some((cli::UPLOAD_SUBCOMMAND, m)) => {
            let files: Vec<PathBuf> = m
                .get_many::<String>("FILES")
                .unwrap_or_default()
                .map(PathBuf::from)
                .collect();
            cli::client::upload(uri(m), &files).await
        }
        Some((cli::LIST_SUBCOMMAND, m)) => cli::client::list(uri(m)).await,
        Some((cli::DOWNLOAD_SUBCOMMAND, m)) => {
            let output = m
                .get_one::<String>("output")
                .map_or_else(|| PathBuf::from(cli::ARCHIVE_NAME), PathBuf::from);
            cli::client::download(uri(m), &output).await
        }
        Some((cli::DELETE_SUBCOMMAND, m)) => cli::client::delete(uri(m)).await,
        Some((cli::ADMIN_SUBCOMMAND, m)) => {
            let key = m.get_one::<String>("key").map_or("", String::as_str);
            cli::client::admin(uri(m), key).await
        }
        _ => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn uri_arg() -> clap::Arg {
    arg!(-u --uri <URI>)
        .required(false)
        .default_value(cli::DEFAULT_URI)
        .help("picdrop server URI")
}

fn uri(matches: &clap::ArgMatches) -> &str {
    matches
        .get_one::<String>("uri")
        .map_or(cli::DEFAULT_URI, String::as_str)
}
