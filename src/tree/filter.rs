//! Hierarchy page filters.

use crate::models::LocationNode;

/// Search box, category select and responsible filter of the hierarchy page.
/// Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub search: String,
    pub category: String,
    pub responsible: String,
}

impl NodeFilter {
    pub fn matches(&self, node: &LocationNode) -> bool {
        let term = self.search.trim().to_lowercase();
        let category = self.category.trim().to_lowercase();
        let responsible = self.responsible.trim().to_lowercase();

        let ok_search = term.is_empty() || searchable_text(node).contains(&term);
        let ok_category = category.is_empty()
            || node.category.as_deref().unwrap_or("").to_lowercase() == category;
        let ok_responsible = responsible.is_empty()
            || node
                .responsibles
                .iter()
                .any(|r| r.name.to_lowercase().contains(&responsible));

        ok_search && ok_category && ok_responsible
    }
}

fn searchable_text(node: &LocationNode) -> String {
    let names: Vec<&str> = node.responsibles.iter().map(|r| r.name.as_str()).collect();
    let names = names.join(" ");
    [
        node.name.as_str(),
        node.description.as_deref().unwrap_or(""),
        node.category.as_deref().unwrap_or(""),
        names.as_str(),
    ]
    .join(" ")
    .to_lowercase()
}
