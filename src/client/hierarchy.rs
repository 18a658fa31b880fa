//! Hierarchy store: a read-mostly snapshot of the location tree.

use tokio::sync::watch;

use super::{ApiClient, ClientError};
use crate::events::Notifier;
use crate::models::{
    HierarchySnapshot, LocationNode, NodeRequest, Responsible, UpdateNodeRequest,
};
use crate::tree::{NodeFilter, NodeIndex};

/// A loaded hierarchy: the wire snapshot plus its flat index.
#[derive(Debug, Clone, Default)]
pub struct HierarchyView {
    pub snapshot: HierarchySnapshot,
    pub index: NodeIndex,
}

impl From<HierarchySnapshot> for HierarchyView {
    fn from(snapshot: HierarchySnapshot) -> Self {
        let index = NodeIndex::build(&snapshot.nodes);
        Self { snapshot, index }
    }
}

/// Holds the hierarchy and rebuilds it after every successful mutation.
pub struct HierarchyStore {
    api: ApiClient,
    notifier: Notifier,
    state: watch::Sender<HierarchyView>,
}

impl HierarchyStore {
    pub fn new(api: ApiClient, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(HierarchyView::default());
        Self {
            api,
            notifier,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HierarchyView> {
        self.state.subscribe()
    }

    pub fn view(&self) -> HierarchyView {
        self.state.borrow().clone()
    }

    pub fn categories(&self) -> Vec<String> {
        self.state.borrow().snapshot.categories.clone()
    }

    /// Replace the snapshot with the backend's hierarchy.
    pub async fn load(&self) -> Result<(), ClientError> {
        match self.api.fetch_hierarchy().await {
            Ok(snapshot) => {
                let view = HierarchyView::from(snapshot);
                tracing::debug!(nodes = view.index.len(), "Hierarchy loaded");
                self.state.send_replace(view);
                Ok(())
            }
            Err(e) => {
                self.notifier
                    .error(e.user_message("Failed to load hierarchy."));
                Err(e)
            }
        }
    }

    /// Responsibles a new child of `parent_id` inherits.
    pub fn inherited_for_child(&self, parent_id: &str) -> Vec<Responsible> {
        self.state.borrow().index.inherited(Some(parent_id))
    }

    /// A node's display chain: own primary, own others, then inherited.
    pub fn effective_for(&self, node_id: &str) -> Vec<Responsible> {
        self.state.borrow().index.effective(node_id)
    }

    /// Ids of the nodes matching the page filters, in snapshot order.
    pub fn matching(&self, filter: &NodeFilter) -> Vec<String> {
        self.state
            .borrow()
            .index
            .iter()
            .filter(|node| filter.matches(node))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Form for a new child of `parent_id`, pre-filled with the inherited
    /// responsibles; the first one is preselected as primary.
    pub fn new_child_form(&self, parent_id: &str) -> NodeRequest {
        let mut responsibles = self.inherited_for_child(parent_id);
        if let Some(first) = responsibles.first_mut() {
            first.is_primary = true;
        }
        NodeRequest {
            responsibles,
            ..Default::default()
        }
    }

    pub async fn create_root(&self, request: NodeRequest) -> Result<LocationNode, ClientError> {
        let request = self.prepare(request)?;
        self.finish(
            self.api.create_root(&request).await,
            "Root location added!",
            "Failed to save root location.",
        )
        .await
    }

    pub async fn create_child(
        &self,
        parent_id: &str,
        request: NodeRequest,
    ) -> Result<LocationNode, ClientError> {
        let request = self.prepare(request)?;
        self.finish(
            self.api.create_child(parent_id, &request).await,
            "Child location added!",
            "Failed to save child location.",
        )
        .await
    }

    pub async fn update_node(
        &self,
        node_id: &str,
        request: &UpdateNodeRequest,
    ) -> Result<LocationNode, ClientError> {
        self.finish(
            self.api.update_node(node_id, request).await,
            "Location updated!",
            "Failed to update location.",
        )
        .await
    }

    pub async fn delete_node(&self, node_id: &str) -> Result<(), ClientError> {
        self.finish(
            self.api.delete_node(node_id).await,
            "Location deleted!",
            "Failed to delete location.",
        )
        .await
    }

    /// Validate a node form and make sure exactly one responsible is primary.
    fn prepare(&self, mut request: NodeRequest) -> Result<NodeRequest, ClientError> {
        request.name = request.name.trim().to_string();
        if request.name.is_empty() {
            return Err(self.reject("Location name is required."));
        }
        if request.responsibles.is_empty() {
            return Err(self.reject("At least one responsible is required."));
        }

        let primary = request
            .responsibles
            .iter()
            .position(|r| r.is_primary)
            .unwrap_or(0);
        for (i, r) in request.responsibles.iter_mut().enumerate() {
            r.is_primary = i == primary;
        }
        Ok(request)
    }

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
