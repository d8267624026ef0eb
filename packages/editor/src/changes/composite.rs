use crate::commit::{CommitRequest, CommitResponse};
use crate::view::SitemapView;
use sitemap_model::SitemapState;

use super::{Change, ChangeError};

/// Ordered group of changes committed and applied as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeChange {
    changes: Vec<Change>,
}

impl CompositeChange {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn is_noop(&self) -> bool {
        self.changes.iter().all(Change::is_noop)
    }

    pub(crate) fn is_changing_detail_pages(&self) -> bool {
        self.changes.iter().any(Change::is_changing_detail_pages)
    }

    /// Commit requests of all parts, concatenated in order
    pub(crate) fn commit_request(&self) -> Result<Option<CommitRequest>, ChangeError> {
        let mut combined: Option<CommitRequest> = None;
        for change in &self.changes {
            if let Some(request) = change.to_commit_request()? {
                combined = Some(match combined.take() {
                    Some(mut acc) => {
                        acc.append(request);
                        acc
                    }
                    None => request,
                });
            }
        }
        Ok(combined)
    }

    pub(crate) fn fold_response(&mut self, response: &CommitResponse) {
        for change in &mut self.changes {
            change.fold_response(response);
        }
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        for change in &self.changes {
            change.apply_to_tree(state)?;
        }
        Ok(())
    }

    pub(crate) fn apply_to_view(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        for change in &self.changes {
            change.notify_entries(view, state);
        }
    }

    /// Undo the last part first
    pub fn invert(&self) -> Result<CompositeChange, ChangeError> {
        let changes = self
            .changes
            .iter()
            .rev()
            .map(Change::invert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompositeChange::new(changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{EditChange, EntryEdit, MoveChange, MoveTarget};
    use sitemap_model::{Entry, SitemapTree};

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::page("a.html"),
            Entry::folder("news"),
        ])))
    }

    fn edit_then_move(state: &SitemapState) -> CompositeChange {
        let a = state.tree.lookup("/a.html").unwrap().id;
        let edit = EditChange::new(state, a, &EntryEdit::title("Renamed")).unwrap();
        let mv = MoveChange::new(state, a, MoveTarget::new("/news/", 0).renamed("renamed.html")).unwrap();
        CompositeChange::new(vec![Change::Edit(edit), Change::Move(mv)])
    }

    #[test]
    fn test_commit_requests_are_concatenated_in_order() {
        let state = state();
        let composite = edit_then_move(&state);
        let request = composite.commit_request().unwrap().unwrap();
        let kinds: Vec<_> = request.operations.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![crate::commit::CommitKind::Edit, crate::commit::CommitKind::Move]
        );
    }

    #[test]
    fn test_invert_reverses_order() {
        let state = state();
        let composite = edit_then_move(&state);
        let inverse = composite.invert().unwrap();
        let names: Vec<_> = inverse.changes().iter().map(Change::name).collect();
        assert_eq!(names, vec!["move", "edit"]);
    }

    #[test]
    fn test_apply_then_inverse_restores_tree() {
        let mut state = state();
        let before = state.tree.clone();
        let composite = edit_then_move(&state);
        composite.apply(&mut state).unwrap();
        let moved = state.tree.lookup("/news/renamed.html").unwrap();
        assert_eq!(moved.title, "Renamed");
        composite.invert().unwrap().apply(&mut state).unwrap();
        assert_eq!(state.tree, before);
    }

    #[test]
    fn test_all_noop_parts_commit_nothing() {
        let state = state();
        let a = state.tree.lookup("/a.html").unwrap().id;
        let edit = EditChange::new(&state, a, &EntryEdit::default()).unwrap();
        let composite = CompositeChange::new(vec![Change::Edit(edit)]);
        assert!(composite.is_noop());
        assert!(composite.commit_request().unwrap().is_none());
    }
}
