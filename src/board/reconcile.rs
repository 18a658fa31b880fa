//! Drag-and-drop reconciliation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{KanbanBoard, KanbanCard};

/// One end of a drag: a list and an index inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    pub droppable_id: String,
    pub index: usize,
}

impl DragLocation {
    pub fn new(droppable_id: impl Into<String>, index: usize) -> Self {
        Self {
            droppable_id: droppable_id.into(),
            index,
        }
    }
}

/// The result of a finished drag, as reported by the board UI.
///
/// `destination` is `None` when the card was dropped outside any list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragResult {
    pub draggable_id: String,
    pub source: DragLocation,
    #[serde(default)]
    pub destination: Option<DragLocation>,
}

impl DragResult {
    pub fn new(
        draggable_id: impl Into<String>,
        source: DragLocation,
        destination: Option<DragLocation>,
    ) -> Self {
        Self {
            draggable_id: draggable_id.into(),
            source,
            destination,
        }
    }

    /// Drag that moves `card_id` to `position` in `list_id`, starting from the
    /// card's current place on `board`. `None` when the card is unknown.
    pub fn relocate(
        board: &KanbanBoard,
        card_id: &str,
        list_id: &str,
        position: i64,
    ) -> Option<Self> {
        let card = board.card(card_id)?;
        let from_index = ranked_ids(board, &card.list_id, "")
            .iter()
            .position(|id| *id == card_id)
            .unwrap_or(0);

        Some(Self::new(
            card_id,
            DragLocation::new(card.list_id.clone(), from_index),
            Some(DragLocation::new(list_id, position.max(0) as usize)),
        ))
    }

    /// The `(listId, position)` pair persisted after this drag.
    pub fn target(&self) -> Option<(&str, i64)> {
        self.destination
            .as_ref()
            .map(|d| (d.droppable_id.as_str(), d.index as i64))
    }
}

/// Apply a drag to a board snapshot.
///
/// Returns `None` when nothing changes: the drag was cancelled or the card is
/// not on the board. Otherwise every card in the source and destination lists
/// is re-ranked `0..n-1` in its new order and the moving card takes the
/// destination list. An index past the end of the destination appends.
pub fn reconcile(board: &KanbanBoard, drag: &DragResult) -> Option<KanbanBoard> {
    let destination = drag.destination.as_ref()?;
    let moving = board.card(&drag.draggable_id)?;

    // The card's own list is authoritative for where it is removed from.
    let from = moving.list_id.as_str();
    let to = destination.droppable_id.as_str();

    if from != drag.source.droppable_id {
        tracing::debug!(
            card = %moving.id,
            reported = %drag.source.droppable_id,
            actual = %from,
            "Drag source disagrees with card list"
        );
    }

    let mut placed: HashMap<&str, (&str, i64)> = HashMap::new();

    if from != to {
        for (rank, id) in ranked_ids(board, from, &moving.id).into_iter().enumerate() {
            placed.insert(id, (from, rank as i64));
        }
    }

    let mut sequence = ranked_ids(board, to, &moving.id);
    let index = destination.index.min(sequence.len());
    sequence.insert(index, moving.id.as_str());
    for (rank, id) in sequence.into_iter().enumerate() {
        placed.insert(id, (to, rank as i64));
    }

    let cards = board
        .cards
        .iter()
        .map(|card| match placed.get(card.id.as_str()) {
            Some(&(list_id, position)) => KanbanCard {
                list_id: list_id.to_string(),
                position,
                ..card.clone()
            },
            None => card.clone(),
        })
        .collect();

    Some(KanbanBoard {
        lists: board.lists.clone(),
        cards,
    })
}

/// Ids of the cards in `list_id` ordered by position, without `excluding`.
/// Equal positions keep their board order.
fn ranked_ids<'a>(board: &'a KanbanBoard, list_id: &str, excluding: &str) -> Vec<&'a str> {
    let mut cards: Vec<&KanbanCard> = board
        .cards
        .iter()
        .filter(|c| c.list_id == list_id && c.id != excluding)
        .collect();
    cards.sort_by_key(|c| c.position);
    cards.into_iter().map(|c| c.id.as_str()).collect()
}
