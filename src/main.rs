mod app;
mod config;
mod error;
mod gallery;
mod image_loader;
mod models;
mod scanner;
mod source;
mod thumbnails;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use app::FolioApp;
use config::{Command, GalleryConfig, USAGE};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info")),
        )
        .init();

    let command = match Command::from_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("folio: {err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Help => {
            println!("{USAGE}");
            ExitCode::SUCCESS
        }
        Command::Generate { root, output } => {
            let root = root.unwrap_or_else(|| PathBuf::from("."));
            match scanner::generate(&root, output.as_deref()) {
                Ok(summary) => {
                    println!(
                        "✓ gallery.json generated with {} categories ({} images) at {}",
                        summary.categories,
                        summary.images,
                        summary.output.display()
                    );
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("folio: {err:#}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Browse(args) => {
            let mut config = GalleryConfig::load();
            config.apply_browse_args(args);
            let app = FolioApp::new(config);
            ExitCode::from(u8::try_from(app.run()).unwrap_or(1))
        }
    }
}
