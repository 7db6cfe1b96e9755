//! Headless project inspector.
//!
//! Opens a project settings file, builds its layers and prints what is on
//! disk: layer sizes, shape counts, calibration. `--save` re-saves every
//! layer, which migrates sidecars written by older versions.

use std::path::PathBuf;
use std::process::ExitCode;

use cropmap::project::{Project, ProjectSettings, LAYERS};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: cropmap <project.agf> [--save]");
        return ExitCode::FAILURE;
    };
    let resave = args.any(|arg| arg == "--save");

    let settings = match ProjectSettings::load(&path) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("could not load project {:?}: {}", path, err);
            return ExitCode::FAILURE;
        }
    };

    println!("project: {}", settings.project_name);
    println!("path:    {:?}", settings.project_path);

    let project = Project::open(settings);
    for name in LAYERS {
        let Some(layer) = project.layer(name) else {
            continue;
        };
        if layer.is_empty() {
            println!("  {name:<20} (empty)");
            continue;
        }
        let size = layer.image_size().unwrap_or_default();
        let shapes: usize = layer.shapes.values().map(Vec::len).sum();
        let geo = if layer.transform.is_some() {
            "georeferenced"
        } else {
            "uncalibrated"
        };
        println!(
            "  {name:<20} {}x{}  {shapes} shapes  {geo}",
            size.width as u32, size.height as u32
        );
    }

    if resave {
        if let Err(err) = project.save() {
            log::error!("save failed: {err}");
            return ExitCode::FAILURE;
        }
        println!("saved.");
    }
    ExitCode::SUCCESS
}
