use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use polartrace::{to_legacy, Scene, SceneError};

#[derive(Parser)]
#[command(name = "polartrace", version, about = "Jones-vector tracer for polarized light scenes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trace one scene file and print the result as JSON
    Trace {
        scene: PathBuf,
        #[command(flatten)]
        opts: TraceOpts,
    },
    /// Trace several scene files in parallel, one JSON line per scene
    Batch {
        #[arg(required = true)]
        scenes: Vec<PathBuf>,
        #[command(flatten)]
        opts: TraceOpts,
    },
}

#[derive(Args, Clone)]
struct TraceOpts {
    /// Print only beams and sensor activation
    #[arg(long)]
    legacy: bool,
    #[arg(long)]
    pretty: bool,
    #[arg(long)]
    max_depth: Option<usize>,
    #[arg(long)]
    min_intensity: Option<f64>,
    /// Add every arrival as intensity
    #[arg(long)]
    no_interference: bool,
    #[arg(long)]
    coherence_length: Option<f64>,
}

/// Файл сцены, затем окружение POLARTRACE_*, затем флаги командной строки
fn load_scene(path: &Path, opts: &TraceOpts) -> Result<Scene, SceneError> {
    let mut scene = Scene::load(path)?;
    scene.config.apply_env()?;
    if let Some(depth) = opts.max_depth {
        scene.config.max_depth = depth;
    }
    if let Some(min) = opts.min_intensity {
        scene.config.min_intensity = min;
    }
    if opts.no_interference {
        scene.config.enable_interference = false;
    }
    if let Some(length) = opts.coherence_length {
        scene.config.coherence_length = Some(length);
    }
    scene.config.validate()?;
    Ok(scene)
}

fn render<T: Serialize>(value: &T, pretty: bool) -> Result<String, SceneError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(out)
}

fn run_scene(path: &Path, opts: &TraceOpts) -> Result<String, SceneError> {
    let scene = load_scene(path, opts)?;
    let result = scene.trace();
    info!(
        "{}: {} beams, {}/{} detectors active",
        path.display(),
        result.beams.len(),
        result.activated_count(),
        result.sensor_states.len()
    );
    if opts.legacy {
        render(&to_legacy(&result), opts.pretty)
    } else {
        render(&result, opts.pretty)
    }
}

fn main() {
    // Инициализация логирования
    let env = Env::default().filter_or("RUST_LOG", "info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Command::Trace { scene, opts } => match run_scene(&scene, &opts) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("{}: {}", scene.display(), e);
                process::exit(1);
            }
        },
        Command::Batch { scenes, opts } => {
            let outputs: Vec<(PathBuf, Result<String, SceneError>)> = scenes
                .par_iter()
                .map(|path| (path.clone(), run_scene(path, &opts)))
                .collect();

            let mut failed = 0;
            for (path, output) in outputs {
                match output {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("{}: {}", path.display(), e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                warn!("{} of {} scenes failed", failed, scenes.len());
                process::exit(1);
            }
        }
    }
}
