use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use flashdeck_lib::flashcards::PoolMode;
use flashdeck_lib::review::{EngineError, PoolCache, ReviewEngine, SessionSnapshot, SessionState};

use crate::app::App;
use crate::render::terminal::{self, Color};

const HELP: &str = "[f]lip  [y]es  [n]o  [p]revious  [r]estart  [m]ode  [x] mark reviewed  [q]uit";

fn mode_label(mode: PoolMode) -> &'static str {
    match mode {
        PoolMode::All => "All cards",
        PoolMode::ErrorsOnly => "Smart review",
    }
}

fn show(snapshot: &SessionSnapshot, use_color: bool) {
    println!();
    println!(
        "{}",
        terminal::paint(mode_label(snapshot.mode), Color::DIM, use_color)
    );
    println!("{}", terminal::snapshot(snapshot, use_color));
    if matches!(snapshot.state, SessionState::Active { .. }) {
        println!("{}", terminal::paint(HELP, Color::DIM, use_color));
    } else {
        println!("{}", terminal::paint("[r]estart  [m]ode  [q]uit", Color::DIM, use_color));
    }
}

/// Print a rejected keypress without ending the session
fn report(result: Result<SessionSnapshot, EngineError>, use_color: bool) -> Result<()> {
    match result {
        Ok(snapshot) => show(&snapshot, use_color),
        Err(EngineError::Transition(e)) => {
            println!("{}", terminal::paint(&e.to_string(), Color::YELLOW, use_color));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn run(app: &App, errors_only: bool, use_color: bool) -> Result<()> {
    let store = app.store()?;
    let cache = Arc::new(Mutex::new(PoolCache::new()));
    let mut mode = if errors_only {
        PoolMode::ErrorsOnly
    } else {
        PoolMode::All
    };

    let mut engine = ReviewEngine::with_cache(Arc::clone(&store), app.user_id, mode, Arc::clone(&cache));
    show(&engine.start().await?, use_color);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "f" => report(engine.flip(), use_color)?,
            "y" => report(engine.judge(true).await, use_color)?,
            "n" => report(engine.judge(false).await, use_color)?,
            "p" => report(engine.previous(), use_color)?,
            "r" => report(engine.restart().await, use_color)?,
            "m" => {
                engine.flush().await;
                engine.close();
                mode = match mode {
                    PoolMode::All => PoolMode::ErrorsOnly,
                    PoolMode::ErrorsOnly => PoolMode::All,
                };
                engine = ReviewEngine::with_cache(
                    Arc::clone(&store),
                    app.user_id,
                    mode,
                    Arc::clone(&cache),
                );
                show(&engine.start().await?, use_color);
            }
            "x" => {
                let current = engine.snapshot()?.card.map(|c| c.id);
                match current {
                    Some(card_id) => match engine.mark_reviewed(card_id).await {
                        Ok(card) => println!("Card {} marked reviewed", card.id),
                        Err(e) => println!(
                            "{}",
                            terminal::paint(&e.to_string(), Color::RED, use_color)
                        ),
                    },
                    None => println!("No card to mark."),
                }
            }
            "q" => break,
            "" => {}
            other => println!("Unknown key {:?}. {}", other, HELP),
        }
    }

    engine.flush().await;
    engine.close();
    Ok(())
}
