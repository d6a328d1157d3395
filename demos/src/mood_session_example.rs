use async_trait::async_trait;
use dotenv::dotenv;
use log::info;
use moodtune::auth::extract_code;
use moodtune::prelude::*;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Serves the same JPEG from disk on every capture
struct FileFrames {
    path: PathBuf,
}

#[async_trait]
impl FrameSource for FileFrames {
    async fn capture(&self) -> Option<Vec<u8>> {
        tokio::fs::read(&self.path).await.ok()
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();
    pretty_env_logger::init();

    let frame_path = env::args()
        .nth(1)
        .or_else(|| env::var("MOODTUNE_FRAME").ok())
        .ok_or("usage: mood_session_example <frame.jpg>")?;

    let moodtune = MoodTune::from_env()?;

    println!("Open this URL and sign in:\n\n{}\n", moodtune.authorize_url(None));
    print!("Paste the URL you were redirected to: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let callback = Url::parse(line.trim())?;
    let (code, scrubbed) = extract_code(&callback).ok_or("redirect URL carries no code")?;
    info!("Signed in via {}", scrubbed);

    moodtune.session.exchange(&code).await?;

    let mut events = moodtune.session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event == SessionEvent::ReauthenticationRequired {
                eprintln!("Session lost, sign in again");
            }
        }
    });

    let monitor = moodtune.monitor(Arc::new(FileFrames {
        path: PathBuf::from(frame_path),
    }));
    monitor.start();

    println!("Sampling for ten seconds...");
    tokio::time::sleep(Duration::from_secs(10)).await;

    let status = monitor.status();
    match (&status.latest, &status.message) {
        (Some(sample), _) => println!(
            "Latest: {} ({:.0}%)",
            sample.emotion,
            sample.confidence * 100.0
        ),
        (None, Some(message)) => println!("Latest: {}", message),
        (None, None) => println!("Latest: nothing yet"),
    }

    let recommendation = monitor.recommend().await?;
    println!(
        "Mood: {} at {:.2} -> {} (valence {:.2}, energy {:.2})",
        recommendation
            .summary
            .dominant_emotion
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        recommendation.summary.average_confidence,
        recommendation.target.genre_seed,
        recommendation.target.valence,
        recommendation.target.energy,
    );

    for track in &recommendation.tracks {
        println!("  {} - {}", track.name, track.artists.join(", "));
    }

    monitor.shutdown();
    Ok(())
}
