#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Chat,
    Serve,
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_serve() -> Command {
    return Command::new("serve")
        .about("Serves the upload-authentication endpoint used for signed ImageKit uploads.");
}

fn arg_config(key: ConfigKey, env: &'static str, help: &'static str) -> Arg {
    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env)
        .num_args(1)
        .help(help)
        .global(true);
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("levy")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(false)
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_serve())
        .arg(
            arg_config(
                ConfigKey::BackendHealthCheckTimeout,
                "LEVY_BACKEND_HEALTH_CHECK_TIMEOUT",
                "Time to wait in milliseconds before timing out when checking Gemini is reachable.",
            ),
        )
        .arg(
            arg_config(
                ConfigKey::ConfigFile,
                "LEVY_CONFIG_FILE",
                "Path to configuration file.",
            )
            .short('c'),
        )
        .arg(arg_config(
            ConfigKey::CorsOrigin,
            "LEVY_CORS_ORIGIN",
            "Origin allowed to call the upload-authentication endpoint.",
        ))
        .arg(arg_config(
            ConfigKey::GeminiToken,
            "LEVY_GEMINI_TOKEN",
            "Gemini API key.",
        ))
        .arg(arg_config(
            ConfigKey::GeminiURL,
            "LEVY_GEMINI_URL",
            "Gemini API URL.",
        ))
        .arg(arg_config(
            ConfigKey::ImagekitEndpoint,
            "IMAGE_KIT_ENDPOINT",
            "ImageKit URL endpoint uploaded images are served from.",
        ))
        .arg(arg_config(
            ConfigKey::ImagekitPrivateKey,
            "IMAGE_KIT_PRIVATE_KEY",
            "ImageKit private key. Only needed by the serve command.",
        ))
        .arg(arg_config(
            ConfigKey::ImagekitPublicKey,
            "IMAGE_KIT_PUBLIC_KEY",
            "ImageKit public key.",
        ))
        .arg(arg_config(
            ConfigKey::ImagekitUploadURL,
            "LEVY_IMAGEKIT_UPLOAD_URL",
            "ImageKit upload API URL.",
        ))
        .arg(
            arg_config(
                ConfigKey::Model,
                "LEVY_MODEL",
                "Gemini model used for chat completions.",
            )
            .short('m'),
        )
        .arg(arg_config(
            ConfigKey::Port,
            "PORT",
            "Port the upload-authentication server listens on.",
        ))
        .arg(arg_config(
            ConfigKey::UploadAuthURL,
            "LEVY_UPLOAD_AUTH_URL",
            "URL of the upload-authentication endpoint used before each image upload.",
        ));
}

async fn handle_config(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("create", _)) => {
            create_config_file().await?;
        }
        Some(("default", _)) => {
            println!("{}", Config::serialize_default(build()));
        }
        Some(("path", _)) => {
            println!("{}", Config::default(ConfigKey::ConfigFile));
        }
        _ => {
            subcommand_config().print_long_help()?;
        }
    }

    return Ok(());
}

/// Parses arguments and loads configuration. Returns the mode to run, or
/// `None` when a subcommand already did all the work.
pub async fn parse() -> Result<Option<Mode>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            handle_config(subcmd_matches).await?;
            return Ok(None);
        }
        Some(("serve", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            return Ok(Some(Mode::Serve));
        }
        _ => {
            Config::load(vec![&matches]).await?;
            return Ok(Some(Mode::Chat));
        }
    }
}
