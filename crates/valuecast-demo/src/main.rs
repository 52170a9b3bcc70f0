#![forbid(unsafe_code)]

//! Scene demo binary entry point.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use valuecast::DispatcherConfig;
use valuecast_demo::cli;
use valuecast_demo::{Overlay, Pacing, Scene, VideoClip};

fn main() {
    let opts = cli::Opts::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match DispatcherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let clip = VideoClip::new(opts.clip.clone(), opts.clip_length, &config);
    let overlay = Overlay::attach(&clip);
    let _state_log = clip
        .on_state_changed()
        .subscribe(|state| info!(%state, "playback state"));

    let pacing = if opts.instant {
        Pacing::Instant
    } else {
        Pacing::Realtime
    };
    let scene = Scene::new(clip, opts.step()).with_pacing(pacing);

    match scene.play_for(opts.duration()) {
        Ok(report) => {
            for line in overlay.lines() {
                println!("{line}");
            }
            println!(
                "{} steps, {:.2}s of {:.2}s, {}",
                report.steps,
                report.position,
                scene.clip().length(),
                report.state
            );
        }
        Err(e) => {
            warn!(error = %e, "scene aborted");
            eprintln!("Scene failed: {e}");
            std::process::exit(1);
        }
    }
}
