use anyhow::{Context, Result};

use flashdeck_lib::flashcards::{CardId, CardPatch, NewCard};

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run_add(
    app: &App,
    title: String,
    description: String,
    image_url: Option<String>,
    back_image_url: Option<String>,
    tags: Vec<String>,
    format: &OutputFormat,
) -> Result<()> {
    let card = app
        .storage()?
        .create_card(
            app.user_id,
            NewCard {
                title,
                description,
                image_url,
                back_image_url,
                tags,
            },
        )
        .context("Failed to create card")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => println!("Created card {}", card.id),
    }
    Ok(())
}

pub fn run_show(app: &App, card_id: CardId, format: &OutputFormat, use_color: bool) -> Result<()> {
    let card = app.find_card(card_id)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => println!("{}", terminal::card_detail(&card, use_color)),
    }
    Ok(())
}

/// An empty string on the command line clears an image URL
fn url_update(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}

#[allow(clippy::too_many_arguments)]
pub fn run_edit(
    app: &App,
    card_id: CardId,
    title: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    back_image_url: Option<String>,
    tags: Option<Vec<String>>,
    format: &OutputFormat,
) -> Result<()> {
    app.find_card(card_id)?;

    let patch = CardPatch {
        title,
        description,
        image_url: url_update(image_url),
        back_image_url: url_update(back_image_url),
        tags,
    };
    let card = app
        .storage()?
        .update_card(card_id, patch)
        .context("Failed to update card")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => println!("Updated card {}", card.id),
    }
    Ok(())
}

pub fn run_delete(app: &App, card_id: CardId) -> Result<()> {
    app.find_card(card_id)?;
    app.storage()?
        .delete_card(card_id)
        .context("Failed to delete card")?;
    println!("Deleted card {}", card_id);
    Ok(())
}
