use std::path::PathBuf;
use std::time::Duration;

use sparkvoice_appcore::service::AppService;
use sparkvoice_core::error::CaptureError;
use sparkvoice_core::intent::Intent;
use sparkvoice_engine::events::ControllerEvent;
use sparkvoice_platform::sim::SimulatedAircraft;
use sparkvoice_platform::speech::ScriptedSpeech;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Type what you would say to the drone, e.g. \"take off\", \"take a photo\", \"selfie mode\", \"land\".
Commands:
  /takeoff /land     press the on-screen buttons
  /connect           connect the simulated aircraft
  /disconnect        disconnect it
  /status            show connection and aircraft state
  /quit              exit";

fn print_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::IntentDetected { text, intent } => {
            println!("[heard] \"{text}\" -> {intent}");
        }
        ControllerEvent::CommandStarted { intent, .. } => println!("[command] {intent}..."),
        ControllerEvent::CommandCompleted { intent, error, .. } => match error {
            None => println!("[command] {intent}: done"),
            Some(e) => println!("[command] {intent}: failed ({e})"),
        },
        ControllerEvent::PhotoSaved { media_id, error } => match error {
            None => println!("[photo] {media_id} saved"),
            Some(e) => println!("[photo] {media_id} not saved ({e})"),
        },
    }
}

/// Runs one capture session that "hears" `text`. Returns `Ok(false)` if a session is already
/// running.
async fn speak(svc: &AppService, speech: &ScriptedSpeech, text: &str) -> Result<bool, CaptureError> {
    if !svc.start_listening().await? {
        return Ok(false);
    }
    // Queued only once a session exists, so a refused start leaves nothing behind.
    speech.queue_utterance(text);
    speech.feed_frame();
    svc.stop_listening();
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Simulator mode: typed lines stand in for utterances, a simulated aircraft for the drone.
    let config_path = std::env::var("SPARKVOICE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("sparkvoice.json"));
    let photo_dir = std::env::var("SPARKVOICE_PHOTO_DIR").ok().map(PathBuf::from);
    log::info!("simulator mode, config {}", config_path.display());

    let speech = ScriptedSpeech::new();
    let (svc, mut events) = AppService::open(config_path, photo_dir, speech.clone(), speech.clone())?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    let sim = SimulatedAircraft::new("Spark (Simulated)");
    {
        let svc = svc.clone();
        let sim = sim.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            svc.product_connected(sim.handle());
            println!("Connected: Spark (Simulated)");
        });
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/help" => println!("{HELP}"),
            "/takeoff" => {
                svc.dispatch(Intent::TakeOff);
            }
            "/land" => {
                svc.dispatch(Intent::Land);
            }
            "/connect" => {
                svc.product_connected(sim.handle());
                println!("Connected: Spark (Simulated)");
            }
            "/disconnect" => {
                svc.product_disconnected();
                println!("Disconnected");
            }
            "/status" => {
                println!(
                    "connected={:?} flying={} altitude={:.1}m camera={:?} capture={:?}",
                    svc.connected_model(),
                    sim.is_flying(),
                    sim.altitude(),
                    sim.camera_mode(),
                    svc.capture_state()
                );
            }
            text if text.starts_with('/') => println!("unknown command: {text}"),
            text => match speak(&svc, &speech, text).await {
                Ok(true) => {}
                Ok(false) => println!("still listening; try again in a moment"),
                Err(e) => println!("cannot listen: {e}"),
            },
        }
    }

    svc.shutdown();
    Ok(())
}
