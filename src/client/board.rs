//! Board store: the page's in-memory board, kept in sync with the backend.

use tokio::sync::watch;

use super::{ApiClient, ClientError};
use crate::board::{cards_in_list, reconcile, search_cards, DragResult};
use crate::events::Notifier;
use crate::models::{CreateCardRequest, KanbanBoard, KanbanCard, KanbanList, UpdateCardRequest};

/// What happened to a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Cancelled drag or unknown card; nothing was sent.
    Ignored,
    /// The backend accepted the move; the optimistic board stands.
    Confirmed,
    /// The backend rejected the move; the board was reloaded.
    Reverted(ClientError),
}

/// Holds the current board and publishes every snapshot, optimistic or
/// authoritative, to subscribers.
///
/// Moves are not serialized against each other: two drags in flight both
/// apply to the latest snapshot and race at the backend.
pub struct BoardStore {
    api: ApiClient,
    notifier: Notifier,
    state: watch::Sender<KanbanBoard>,
}

impl BoardStore {
    pub fn new(api: ApiClient, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(KanbanBoard::default());
        Self {
            api,
            notifier,
            state,
        }
    }

    /// Receive every published board.
    pub fn subscribe(&self) -> watch::Receiver<KanbanBoard> {
        self.state.subscribe()
    }

    /// Current snapshot.
    pub fn board(&self) -> KanbanBoard {
        self.state.borrow().clone()
    }

    /// Cards shown in one column: filtered by `search`, ordered by position.
    pub fn column(&self, list_id: &str, search: &str) -> Vec<KanbanCard> {
        let board = self.state.borrow();
        let visible: Vec<&KanbanCard> = search_cards(&board.cards, search);
        cards_in_list(&board, list_id)
            .into_iter()
            .filter(|card| visible.iter().any(|v| v.id == card.id))
            .cloned()
            .collect()
    }

    /// Replace the snapshot with the backend's board.
    pub async fn load(&self) -> Result<(), ClientError> {
        match self.api.fetch_board().await {
            Ok(board) => {
                tracing::debug!(
                    lists = board.lists.len(),
                    cards = board.cards.len(),
                    "Board loaded"
                );
                self.state.send_replace(board);
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Failed to load board."));
                Err(e)
            }
        }
    }

    /// Apply a finished drag.
    ///
    /// The reconciled board is published before the move is sent. If the
    /// backend rejects it, the optimistic board is discarded by a full reload.
    pub async fn apply_drag(&self, drag: &DragResult) -> MoveOutcome {
        let current = self.board();
        let (Some(next), Some((list_id, position))) = (reconcile(&current, drag), drag.target())
        else {
            return MoveOutcome::Ignored;
        };

        self.state.send_replace(next);

        match self.api.move_card(&drag.draggable_id, list_id, position).await {
            Ok(_) => {
                tracing::debug!(card = %drag.draggable_id, list = %list_id, position, "Move confirmed");
                MoveOutcome::Confirmed
            }
            Err(e) => {
                self.notifier.error(e.user_message("Failed to move card."));
                if let Err(reload) = self.load().await {
                    tracing::warn!("Reload after failed move also failed: {}", reload);
                }
                MoveOutcome::Reverted(e)
            }
        }
    }

    pub async fn create_list(&self, title: &str) -> Result<KanbanList, ClientError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(self.reject("List title is required."));
        }

        let list = self
            .finish(self.api.create_list(title).await, "List created!", "Failed to create list.")
            .await?;
        Ok(list)
    }

    pub async fn delete_list(&self, list_id: &str) -> Result<(), ClientError> {
        self.finish(
            self.api.delete_list(list_id).await,
            "List deleted!",
            "Failed to delete list.",
        )
        .await
    }

    pub async fn create_card(&self, request: &CreateCardRequest) -> Result<KanbanCard, ClientError> {
        if request.title.trim().is_empty() {
            return Err(self.reject("Card title is required."));
        }

        self.finish(
            self.api.create_card(request).await,
            "Card created!",
            "Failed to create card.",
        )
        .await
    }

    pub async fn update_card(
        &self,
        card_id: &str,
        request: &UpdateCardRequest,
    ) -> Result<KanbanCard, ClientError> {
        self.finish(
            self.api.update_card(card_id, request).await,
            "Card updated!",
            "Failed to update card.",
        )
        .await
    }

    pub async fn delete_card(&self, card_id: &str) -> Result<(), ClientError> {
        self.finish(
            self.api.delete_card(card_id).await,
            "Card deleted!",
            "Failed to delete card.",
        )
        .await
    }

    /// Notify about a mutation result and reload after a success.
    async fn finish<T>(
        &self,
        result: Result<T, ClientError>,
        success: &str,
        failure: &str,
    ) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.notifier.success(success);
                // A failed reload is reported by `load` itself.
                let _ = self.load().await;
                Ok(value)
            }
            Err(e) => {
                self.notifier.error(e.user_message(failure));
                Err(e)
            }
        }
    }

    fn reject(&self, message: &str) -> ClientError {
        self.notifier.error(message);
        ClientError::Invalid(message.to_string())
    }
}
