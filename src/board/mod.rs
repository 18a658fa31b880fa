//! Pure board logic: drag reconciliation and card lookup helpers.
//!
//! Nothing in here performs I/O. The backend and the client store both run
//! the same reconciler so their ranks agree.

mod reconcile;
mod search;

pub use reconcile::*;
pub use search::*;

use crate::models::{KanbanBoard, KanbanCard, KanbanList};

/// Cards of one list, ordered by position.
pub fn cards_in_list<'a>(board: &'a KanbanBoard, list_id: &str) -> Vec<&'a KanbanCard> {
    let mut cards: Vec<&KanbanCard> = board
        .cards
        .iter()
        .filter(|c| c.list_id == list_id)
        .collect();
    cards.sort_by_key(|c| c.position);
    cards
}

/// Lists in left-to-right display order.
pub fn ordered_lists(board: &KanbanBoard) -> Vec<&KanbanList> {
    let mut lists: Vec<&KanbanList> = board.lists.iter().collect();
    lists.sort_by_key(|l| l.order);
    lists
}

/// Cards whose list or position differ between two snapshots of the same board.
pub fn changed_cards<'a>(before: &KanbanBoard, after: &'a KanbanBoard) -> Vec<&'a KanbanCard> {
    after
        .cards
        .iter()
        .filter(|card| match before.card(&card.id) {
            Some(old) => old.list_id != card.list_id || old.position != card.position,
            None => true,
        })
        .collect()
}
