use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use eframe::egui;

use image_labeler::{AppConfig, AppState, LabelerApp, Profile};

const USAGE: &str = "Usage: image-labeler [--annotator|--labeler] [--config PATH] [--write-config] [IMAGE...]";

struct Args {
    profile: Option<Profile>,
    config: Option<PathBuf>,
    write_config: bool,
    images: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        profile: None,
        config: None,
        write_config: false,
        images: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--annotator" => args.profile = Some(Profile::Annotator),
            "--labeler" => args.profile = Some(Profile::Labeler),
            "--write-config" => args.write_config = true,
            "--config" => {
                let path = it.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            path => args.images.push(PathBuf::from(path)),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config_path = args.config.clone().or_else(AppConfig::default_path);
    let mut config = match &config_path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(profile) = args.profile {
        config.profile = profile;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_filter()),
    )
    .init();

    if args.write_config {
        let path = config_path.context("No config directory on this platform")?;
        config.save(&path)?;
        log::info!("Wrote config to {}", path.display());
    }

    let state = AppState::with_labels(config.profile, config.initial_labels())
        .with_surface_size(config.surface_size());
    let title = config.profile.title();
    log::info!("Starting in {} mode", config.profile.name());

    let mut app = LabelerApp::new(state, config);
    if !args.images.is_empty() {
        app.load_paths(&args.images);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow!("Failed to run eframe: {e}"))
}
