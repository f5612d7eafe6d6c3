use anyhow::Result;

use flashdeck_lib::flashcards::PoolMode;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub async fn run(
    app: &App,
    errors_only: bool,
    tag: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mode = if errors_only {
        PoolMode::ErrorsOnly
    } else {
        PoolMode::All
    };

    let mut cards = app.store()?.fetch_pool(app.user_id, mode).await?;
    if let Some(tag) = tag {
        cards.retain(|c| c.has_tag(tag));
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                if errors_only {
                    println!("No missed cards. Nothing to review.");
                } else {
                    println!("No cards yet. Add one with `flashdeck add`.");
                }
                return Ok(());
            }

            for card in &cards {
                println!("{}", terminal::card_row(card, use_color));
            }
            println!("\n{} cards", cards.len());
        }
    }

    Ok(())
}
