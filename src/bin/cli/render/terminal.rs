use flashdeck_lib::flashcards::Card;
use flashdeck_lib::review::{CardView, SessionSnapshot, SessionState, StoreError, Summary};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

fn tag_line(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per card for listings
pub fn card_row(card: &Card, use_color: bool) -> String {
    let mut line = format!("{:>5}  {}", card.id, card.title);
    if card.error_count > 0 {
        line.push_str(&format!(
            "  {}",
            paint(&format!("[{} missed]", card.error_count), Color::RED, use_color)
        ));
    }
    if !card.tags.is_empty() {
        line.push_str(&format!(
            "  {}",
            paint(&tag_line(&card.tags), Color::DIM, use_color)
        ));
    }
    line
}

/// Both faces of a card
pub fn card_detail(card: &Card, use_color: bool) -> String {
    let mut lines = vec![paint(&card.title, Color::BOLD, use_color)];
    if let Some(url) = &card.image_url {
        lines.push(paint(&format!("[image: {}]", url), Color::GRAY, use_color));
    }
    lines.push(String::new());
    lines.push(card.description.clone());
    if let Some(url) = &card.back_image_url {
        lines.push(paint(&format!("[image: {}]", url), Color::GRAY, use_color));
    }
    lines.push(String::new());
    if !card.tags.is_empty() {
        lines.push(paint(&tag_line(&card.tags), Color::DIM, use_color));
    }

    let reviewed = match card.last_reviewed_at {
        Some(at) => format!("reviewed {}", at.format("%Y-%m-%d %H:%M")),
        None => "never reviewed".to_string(),
    };
    lines.push(paint(
        &format!("id {} \u{00b7} {} missed \u{00b7} {}", card.id, card.error_count, reviewed),
        Color::GRAY,
        use_color,
    ));
    lines.join("\n")
}

fn study_card(card: &CardView, position: usize, pool_size: usize, use_color: bool) -> String {
    let mut lines = vec![paint(
        &format!("Card {}/{}", position, pool_size),
        Color::GRAY,
        use_color,
    )];
    lines.push(paint(&card.title, Color::BOLD, use_color));
    if let Some(url) = &card.image_url {
        lines.push(paint(&format!("[image: {}]", url), Color::GRAY, use_color));
    }

    match &card.description {
        Some(back) => {
            lines.push(paint("\u{2500}".repeat(20).as_str(), Color::GRAY, use_color));
            lines.push(paint(back, Color::CYAN, use_color));
            if let Some(url) = &card.back_image_url {
                lines.push(paint(&format!("[image: {}]", url), Color::GRAY, use_color));
            }
        }
        None => lines.push(paint("(f to flip)", Color::DIM, use_color)),
    }
    lines.join("\n")
}

pub fn summary(summary: &Summary, use_color: bool) -> String {
    format!(
        "Session complete: {} correct, {} incorrect of {}",
        paint(&summary.correct_count.to_string(), Color::GREEN, use_color),
        paint(&summary.incorrect_count.to_string(), Color::RED, use_color),
        summary.total
    )
}

fn store_error(reason: &StoreError) -> String {
    match reason {
        StoreError::NotAuthenticated => {
            "Could not load cards: not signed in. Check your token.".to_string()
        }
        StoreError::Forbidden => "Could not load cards: not allowed for this user.".to_string(),
        other => format!("Could not load cards: {}", other),
    }
}

/// Render whatever the session is currently showing
pub fn snapshot(snapshot: &SessionSnapshot, use_color: bool) -> String {
    match &snapshot.state {
        SessionState::Loading => paint("Loading cards...", Color::DIM, use_color),
        SessionState::Active { .. } => match &snapshot.card {
            Some(card) => study_card(card, snapshot.position, snapshot.pool_size, use_color),
            None => String::new(),
        },
        SessionState::Empty => paint("Nothing to review.", Color::YELLOW, use_color),
        SessionState::Complete { summary: s } => summary(s, use_color),
        SessionState::Error { reason } => paint(&store_error(reason), Color::RED, use_color),
    }
}
