//! pendulum-demo: Headless polyrhythm session

mod config;
mod script;

use std::process::ExitCode;
use std::thread;

use pendulum_services::{ChannelSoundTrigger, HostError, SequencerHost};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SOUND_QUEUE: usize = 128;

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "pendulum=debug".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    info!("Starting pendulum");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pendulum: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), HostError> {
    let config = config::load_config();
    let (sound, sound_rx) = ChannelSoundTrigger::channel(SOUND_QUEUE);
    let (host, handle) = SequencerHost::new(config, Box::new(sound.clone()))?;

    // Stand-in for a synth: ends once the host drops its sender
    let audio = thread::spawn(move || {
        let mut played = 0u64;
        for request in sound_rx.iter() {
            info!(
                track = request.track.0,
                sample = request.sample.name(),
                volume = request.volume,
                pitch = request.pitch,
                "Sound"
            );
            played += 1;
        }
        played
    });

    let script = thread::spawn(move || script::perform(&handle));

    let summary = host.run()?;
    let dropped = sound.dropped();
    drop(sound);

    match script.join() {
        Ok(result) => result?,
        Err(_) => error!("Script thread panicked"),
    }
    let played = audio.join().unwrap_or(0);
    info!(played, dropped, triggers = summary.triggers, "Session finished");

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Failed to encode summary: {}", e),
    }
    Ok(())
}
