use anyhow::{Context, Result};

use flashdeck_lib::flashcards::CardId;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, card_id: CardId, format: &OutputFormat) -> Result<()> {
    let card = app
        .store()?
        .mark_reviewed(card_id)
        .await
        .with_context(|| format!("Failed to mark card {} reviewed", card_id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => println!("Card {} marked reviewed; error count cleared", card.id),
    }
    Ok(())
}
