//! Split playback example
//!
//! Drives three simulated embeds with different start offsets as one player
//! and prints the shared timeline while it plays.
//!
//! Run with: cargo run -p split-player-core --example split_playback

use split_player_core::{
    format_time, BackendRegistry, PlayerConfig, SimulatedBackend, SplitPlayer, Timeline,
    TimelineFrame, TimelineModule, VideoDescriptor,
};

struct PrintProgress;

impl TimelineModule for PrintProgress {
    fn on_frame(&mut self, frame: &TimelineFrame) {
        println!(
            "  [{:>5.1}%] {} / {}",
            frame.progress_percent,
            format_time(frame.played_time),
            format_time(frame.duration)
        );
    }
}

#[tokio::main]
async fn main() -> split_player_core::Result<()> {
    println!("Split Player - Playback Example");
    println!("===================================\n");

    let backend = SimulatedBackend::new()
        .with_duration("intro", 40.0)
        .with_duration("stage", 95.0)
        .with_duration("crowd", 70.0);
    let mut registry = BackendRegistry::new();
    registry.register(backend.clone());

    let config = PlayerConfig::new(
        "simulated",
        vec![
            VideoDescriptor::new("intro", 10.0),
            VideoDescriptor::new("stage", 5.0),
            VideoDescriptor::new("crowd", 0.0),
        ],
    )
    .with_area("#stage");

    let mut player = SplitPlayer::new(config, &registry)?;
    let (mut timeline, _frames) = Timeline::new();
    timeline.extend(PrintProgress);
    player.add_plugin(timeline);

    player.load_dependencies().await?;
    player.process_pending();

    println!("Videos:");
    for video in player.videos() {
        println!("  {}", video);
    }
    println!(
        "Timeline: {} ({} of {} ready)\n",
        format_time(player.duration()),
        player.ready_count(),
        player.video_count()
    );

    println!("Playing:");
    player.play();
    for _ in 0..5 {
        backend.advance(15.0);
        player.update();
        player.process_pending();
    }

    println!("\nSeeking to 1:20:");
    player.time_to(80.0);
    backend.advance(15.0);
    player.process_pending();

    println!("\nFinal state: {}", player.state());
    Ok(())
}
