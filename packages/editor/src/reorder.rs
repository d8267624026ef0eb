//! # Reorder / Drag Adapter
//!
//! Translates drag-and-drop gestures from the rendered tree into controller
//! operations. Drop positions arrive as indices into the sibling list *as
//! rendered*, which still contains the dragged entry; when the entry moves
//! down within its own parent the index is shifted by one.

use crate::controller::{BusyFlag, NewEntryRequest, SitemapController};
use crate::changes::MoveTarget;
use crate::errors::EditorError;
use crate::remote::RemoteAuthority;
use crate::view::SitemapView;
use sitemap_model::{path, EntryId, SitemapState};
use tracing::{debug, warn};

/// What is being dragged
#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    /// A live entry of the tree
    Entry {
        entry_id: EntryId,
        site_path: String,
        position: usize,
    },
    /// An entry of the clipboard's deleted list
    Deleted { entry_id: EntryId },
    /// A template for a brand-new entry
    Template(NewEntryRequest),
}

/// Where it is dropped: a parent and a rendered sibling index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub parent_path: String,
    pub position: usize,
}

impl DropTarget {
    pub fn new(parent_path: impl Into<String>, position: usize) -> Self {
        Self {
            parent_path: parent_path.into(),
            position,
        }
    }
}

/// Controller operation a drop resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum DropAction {
    Move {
        entry_id: EntryId,
        target: MoveTarget,
    },
    Restore {
        entry_id: EntryId,
        target: DropTarget,
    },
    Create {
        parent_id: EntryId,
        request: NewEntryRequest,
    },
}

#[derive(Debug, Default)]
pub struct ReorderAdapter {
    source: Option<DragSource>,
    busy: BusyFlag,
}

impl ReorderAdapter {
    /// Adapter that refuses to start drags while `busy` is set
    pub fn new(busy: BusyFlag) -> Self {
        Self { source: None, busy }
    }

    pub fn start_drag(&mut self, source: DragSource) -> bool {
        if self.busy.is_busy() {
            debug!("drag refused while an operation is in flight");
            return false;
        }
        self.source = Some(source);
        true
    }

    pub fn cancel(&mut self) {
        self.source = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&DragSource> {
        self.source.as_ref()
    }

    pub fn can_drop(&self, state: &SitemapState, target: &DropTarget) -> bool {
        self.resolve_drop(state, target).is_some()
    }

    /// Map the current drag onto `target`. `None` if the drop is invalid or
    /// would change nothing.
    pub fn resolve_drop(&self, state: &SitemapState, target: &DropTarget) -> Option<DropAction> {
        let source = self.source.as_ref()?;
        let parent = state.tree.lookup(&target.parent_path)?;
        if !parent.is_container() {
            return None;
        }

        match source {
            DragSource::Entry {
                entry_id,
                site_path,
                position,
            } => {
                let entry = state.tree.entry_by_id(*entry_id)?;
                if entry.site_path != *site_path {
                    return None;
                }
                if entry.is_container() && path::is_same_or_below(site_path, &parent.site_path) {
                    return None;
                }
                let same_parent =
                    path::parent_path(site_path).as_deref() == Some(parent.site_path.as_str());
                let mut index = target.position;
                if same_parent && index > *position {
                    index -= 1;
                }
                if same_parent && index == *position {
                    return None;
                }
                Some(DropAction::Move {
                    entry_id: *entry_id,
                    target: MoveTarget::new(parent.site_path.clone(), index),
                })
            }
            DragSource::Deleted { entry_id } => {
                state.clipboard.find_deleted(*entry_id)?;
                Some(DropAction::Restore {
                    entry_id: *entry_id,
                    target: target.clone(),
                })
            }
            DragSource::Template(request) => Some(DropAction::Create {
                parent_id: parent.id,
                request: request.clone().at(target.position),
            }),
        }
    }

    /// Finish the drag on `target`. The drag ends whatever the outcome.
    pub async fn drop_on<R: RemoteAuthority, V: SitemapView>(
        &mut self,
        controller: &mut SitemapController<R, V>,
        target: DropTarget,
    ) -> Result<bool, EditorError> {
        let action = self.resolve_drop(controller.state(), &target);
        self.source = None;
        let Some(action) = action else {
            debug!(parent = %target.parent_path, position = target.position, "drop ignored");
            return Ok(false);
        };

        match action {
            DropAction::Move { entry_id, target } => controller.move_entry(entry_id, target).await,
            DropAction::Create { parent_id, request } => Ok(controller
                .create_sub_entry(parent_id, request)
                .await?
                .is_some()),
            DropAction::Restore { entry_id, target } => {
                if !controller.undelete(entry_id).await? {
                    return Ok(false);
                }
                let Some(restored) = controller.entry(entry_id) else {
                    return Ok(true);
                };
                let restored_parent = path::parent_path(&restored.site_path);
                if restored_parent.as_deref() == Some(target.parent_path.as_str())
                    && restored.position == target.position
                {
                    return Ok(true);
                }
                controller
                    .move_entry(entry_id, MoveTarget::new(target.parent_path, target.position))
                    .await
            }
        }
    }

    /// One-shot reorder from a rendered tree: the entry at `source_path`,
    /// shown at `source_position`, was dropped at `target`.
    pub async fn submit_reorder<R: RemoteAuthority, V: SitemapView>(
        &mut self,
        controller: &mut SitemapController<R, V>,
        source_path: &str,
        source_position: usize,
        target: DropTarget,
    ) -> Result<bool, EditorError> {
        let Some(entry) = controller.lookup(source_path) else {
            warn!(path = source_path, "dragged entry not found");
            return Ok(false);
        };
        if entry.position != source_position {
            warn!(
                path = source_path,
                rendered = source_position,
                actual = entry.position,
                "rendered position is stale"
            );
            return Ok(false);
        }
        let source = DragSource::Entry {
            entry_id: entry.id,
            site_path: entry.site_path.clone(),
            position: entry.position,
        };
        if !self.start_drag(source) {
            return Ok(false);
        }
        self.drop_on(controller, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemap_model::{Entry, SitemapTree};

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::page("a.html"),
            Entry::page("b.html"),
            Entry::page("c.html"),
            Entry::folder("news").with_children(vec![Entry::page("x.html")]),
        ])))
    }

    fn drag(state: &SitemapState, path: &str) -> DragSource {
        let entry = state.tree.lookup(path).unwrap();
        DragSource::Entry {
            entry_id: entry.id,
            site_path: entry.site_path.clone(),
            position: entry.position,
        }
    }

    #[test]
    fn test_moving_down_in_same_parent_shifts_index() {
        let state = state();
        let mut adapter = ReorderAdapter::default();
        adapter.start_drag(drag(&state, "/a.html"));
        match adapter.resolve_drop(&state, &DropTarget::new("/", 3)) {
            Some(DropAction::Move { target, .. }) => assert_eq!(target.position, 2),
            other => panic!("unexpected drop action: {:?}", other),
        }
    }

    #[test]
    fn test_moving_up_keeps_index() {
        let state = state();
        let mut adapter = ReorderAdapter::default();
        adapter.start_drag(drag(&state, "/c.html"));
        match adapter.resolve_drop(&state, &DropTarget::new("/", 0)) {
            Some(DropAction::Move { target, .. }) => assert_eq!(target.position, 0),
            other => panic!("unexpected drop action: {:?}", other),
        }
    }

    #[test]
    fn test_drop_in_place_or_into_own_subtree_is_refused() {
        let state = state();
        let mut adapter = ReorderAdapter::default();
        adapter.start_drag(drag(&state, "/b.html"));
        assert!(!adapter.can_drop(&state, &DropTarget::new("/", 1)));
        assert!(!adapter.can_drop(&state, &DropTarget::new("/", 2)));
        assert!(!adapter.can_drop(&state, &DropTarget::new("/a.html", 0)));

        adapter.start_drag(drag(&state, "/news/"));
        assert!(!adapter.can_drop(&state, &DropTarget::new("/news/", 0)));
        assert!(adapter.can_drop(&state, &DropTarget::new("/", 0)));
    }

    #[test]
    fn test_template_drop_creates() {
        let state = state();
        let mut adapter = ReorderAdapter::default();
        adapter.start_drag(DragSource::Template(NewEntryRequest::page("new.html")));
        match adapter.resolve_drop(&state, &DropTarget::new("/news/", 1)) {
            Some(DropAction::Create { parent_id, request }) => {
                assert_eq!(parent_id, state.tree.lookup("/news/").unwrap().id);
                assert_eq!(request.position, Some(1));
            }
            other => panic!("unexpected drop action: {:?}", other),
        }
    }

    #[test]
    fn test_busy_flag_blocks_drag() {
        let busy = BusyFlag::default();
        let mut adapter = ReorderAdapter::new(busy.clone());
        let _guard = busy.try_acquire().unwrap();
        assert!(!adapter.start_drag(DragSource::Deleted {
            entry_id: EntryId::new()
        }));
        assert!(!adapter.is_dragging());
    }
}
