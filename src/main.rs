#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::path;
use std::process;

use anyhow::Error;
use owo_colors::OwoColorize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::application::chat;
use crate::application::cli;
use crate::application::cli::Mode;
use crate::application::server;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        format!(
            "Oh no! Levy has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        )
        .red()
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

/// The server logs to stdout. The chat owns the terminal, so it only logs to
/// a JSON file, and only when RUST_LOG asks for it.
fn init_logging(mode: Mode) -> Option<WorkerGuard> {
    if mode == Mode::Serve {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| return EnvFilter::new("levy=info,tower_http=info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    if !env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("levy")
    {
        return None;
    }

    let debug_log_dir = env::var("LEVY_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("levy")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(writer)
        .init();

    return Some(guard);
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let mode = match cli::parse().await {
        Ok(Some(mode)) => mode,
        Ok(None) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    let _guard = init_logging(mode);

    let res = match mode {
        Mode::Chat => chat::start().await,
        Mode::Serve => server::start().await,
    };

    if let Err(err) = res {
        handle_error(err);
    }

    process::exit(0);
}
