//! Card search used by the board's filter box.

use crate::models::KanbanCard;

/// Cards whose title, description or assignees contain `term`.
///
/// Matching is a case-insensitive substring test on the trimmed term; an empty
/// term keeps every card.
pub fn search_cards<'a>(cards: &'a [KanbanCard], term: &str) -> Vec<&'a KanbanCard> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return cards.iter().collect();
    }

    cards
        .iter()
        .filter(|card| searchable_text(card).contains(&term))
        .collect()
}

fn searchable_text(card: &KanbanCard) -> String {
    let assignees = card.assignees.join(" ");
    [
        card.title.as_str(),
        card.description.as_deref().unwrap_or(""),
        assignees.as_str(),
    ]
    .join(" ")
    .to_lowercase()
}
