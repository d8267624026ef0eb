//! Drag-and-drop through the reorder adapter into a live controller

use sitemap_editor::sitemap_model::{EditStatus, Entry, SitemapTree};
use sitemap_editor::{
    DragSource, DropTarget, EditorConfig, InMemoryAuthority, NewEntryRequest, RecordingView,
    ReorderAdapter, SitemapController,
};

type Controller = SitemapController<InMemoryAuthority, RecordingView>;

fn controller() -> (Controller, InMemoryAuthority) {
    let tree = SitemapTree::new(Entry::root("/").with_children(vec![
        Entry::page("a.html"),
        Entry::page("b.html"),
        Entry::page("c.html"),
        Entry::folder("news").with_children(vec![Entry::page("x.html")]),
    ]));
    let authority = InMemoryAuthority::new(tree.clone(), "alice");
    let controller = SitemapController::new(
        authority.clone(),
        RecordingView::new(),
        tree,
        EditorConfig::default(),
    );
    (controller, authority)
}

fn names(controller: &Controller, path: &str) -> Vec<String> {
    controller
        .lookup(path)
        .unwrap()
        .children()
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

#[tokio::test]
async fn test_submit_reorder_within_parent() {
    let (mut controller, authority) = controller();
    let mut adapter = ReorderAdapter::new(controller.busy_flag());

    // Rendered index 3 sits between c.html and news/
    let moved = adapter
        .submit_reorder(&mut controller, "/a.html", 0, DropTarget::new("/", 3))
        .await
        .unwrap();
    assert!(moved);
    assert_eq!(names(&controller, "/"), vec!["b.html", "c.html", "a.html", "news"]);
    assert_eq!(authority.tree().await.lookup("/a.html").unwrap().position, 2);
    assert!(!adapter.is_dragging());
}

#[tokio::test]
async fn test_submit_reorder_with_stale_position_is_ignored() {
    let (mut controller, authority) = controller();
    let mut adapter = ReorderAdapter::new(controller.busy_flag());

    let moved = adapter
        .submit_reorder(&mut controller, "/b.html", 2, DropTarget::new("/", 0))
        .await
        .unwrap();
    assert!(!moved);
    assert_eq!(names(&controller, "/"), vec!["a.html", "b.html", "c.html", "news"]);
    assert!(authority.requests().await.is_empty());
}

#[tokio::test]
async fn test_template_drop_creates_entry() {
    let (mut controller, _authority) = controller();
    let mut adapter = ReorderAdapter::new(controller.busy_flag());

    assert!(adapter.start_drag(DragSource::Template(
        NewEntryRequest::page("Fresh.html").with_title("Fresh")
    )));
    assert!(adapter
        .drop_on(&mut controller, DropTarget::new("/news/", 0))
        .await
        .unwrap());

    assert_eq!(names(&controller, "/news/"), vec!["fresh.html", "x.html"]);
    let created = controller.lookup("/news/fresh.html").unwrap();
    assert_eq!(created.title, "Fresh");
    assert_eq!(created.edit_status, EditStatus::New);
}

#[tokio::test]
async fn test_deleted_entry_drop_restores_and_moves() {
    let (mut controller, authority) = controller();
    let mut adapter = ReorderAdapter::new(controller.busy_flag());
    let b = controller.lookup("/b.html").unwrap().id;
    assert!(controller.delete(b).await.unwrap());

    assert!(adapter.start_drag(DragSource::Deleted { entry_id: b }));
    assert!(adapter
        .drop_on(&mut controller, DropTarget::new("/news/", 1))
        .await
        .unwrap());

    assert_eq!(names(&controller, "/news/"), vec!["x.html", "b.html"]);
    assert!(!controller.clipboard().is_deleted(b));
    assert!(!authority.is_deleted(b).await);
    assert_eq!(controller.history().undo_levels(), 3);
}

#[tokio::test]
async fn test_deleted_entry_drop_at_restore_slot_only_undeletes() {
    let (mut controller, _authority) = controller();
    let mut adapter = ReorderAdapter::new(controller.busy_flag());
    let b = controller.lookup("/b.html").unwrap().id;
    assert!(controller.delete(b).await.unwrap());

    adapter.start_drag(DragSource::Deleted { entry_id: b });
    assert!(adapter
        .drop_on(&mut controller, DropTarget::new("/", 3))
        .await
        .unwrap());

    assert_eq!(names(&controller, "/"), vec!["a.html", "c.html", "news", "b.html"]);
    assert_eq!(controller.history().undo_levels(), 2);
}

#[tokio::test]
async fn test_drag_refused_while_controller_busy() {
    let (controller, _authority) = controller();
    let busy = controller.busy_flag();
    let mut adapter = ReorderAdapter::new(busy.clone());

    let guard = busy.try_acquire().unwrap();
    assert!(!adapter.start_drag(DragSource::Template(NewEntryRequest::page("n.html"))));
    drop(guard);
    assert!(adapter.start_drag(DragSource::Template(NewEntryRequest::page("n.html"))));
}
