//! Logs in to KGS and prints what the session sees.
//!
//! ```text
//! KGS_USER=me KGS_PASSWORD=secret cargo run -p kibitz-watch
//! KGS_ARCHIVE=someone ...   # also fetch one player's archive
//! RUST_LOG=kibitz=debug ... # more log output
//! ```

use std::process::ExitCode;
use std::time::Duration;

use kibitz::prelude::*;

const PRINT_EVERY: Duration = Duration::from_secs(5);
const ARCHIVE_WAIT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (Ok(user), Ok(password)) =
        (std::env::var("KGS_USER"), std::env::var("KGS_PASSWORD"))
    else {
        eprintln!("set KGS_USER and KGS_PASSWORD");
        return ExitCode::FAILURE;
    };

    match watch(Credentials::new(user, password)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "watch failed");
            ExitCode::FAILURE
        }
    }
}

async fn watch(credentials: Credentials) -> Result<(), KibitzError> {
    let client = KibitzClient::builder(credentials).connect_http().await?;

    if let Ok(player) = std::env::var("KGS_ARCHIVE") {
        let games = client.request_archive_timeout(&player, ARCHIVE_WAIT).await?;
        println!("{player}: {} archived games", games.len());
        for game in games.iter().take(10) {
            println!("  {}  {} vs {}  {}", game.timestamp, game.black, game.white, game.result);
        }
    }

    let mut joined: Option<ChannelId> = None;
    let mut ticker = tokio::time::interval(PRINT_EVERY);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            status = client.wait_for_exit() => {
                tracing::warn!(%status, "session ended");
                break;
            }
            _ = ticker.tick() => {
                let games = client.list_active_games();
                print_games(&games);
                print_comments(&client.drain_comments());

                // Follow the longest game so comments start arriving.
                if joined.is_none() {
                    if let Some(game) = games.iter().max_by_key(|g| g.move_count) {
                        client.enqueue_join_channel(game.id)?;
                        joined = Some(game.id);
                        println!("following {} ({} vs {})", game.id, game.black, game.white);
                    }
                }
            }
        }
    }

    client.shutdown().await
}

fn print_games(games: &[GameSummary]) {
    println!("{} active games", games.len());
    let mut games = games.to_vec();
    games.sort_by_key(|g| std::cmp::Reverse(g.move_count));
    for game in games.iter().take(10) {
        println!(
            "  {:>10}  {:<12} vs {:<12} move {:>3}  {}",
            game.id.to_string(),
            game.black,
            game.white,
            game.move_count,
            game.result,
        );
    }
}

fn print_comments(comments: &[CommentEntry]) {
    for c in comments {
        println!("[{}] {} [{}]: {}", c.channel_id, c.author, c.rank_label(), c.text);
    }
}
