//! Tests for the model aggregate and its wire shape

use sitemap_model::{
    collect_detail_pages, EditStatus, Entry, EntryKind, InheritedProperty, PropertyLayer,
    PropertyResolver, SitemapState, SitemapTree,
};

fn tree() -> SitemapTree {
    SitemapTree::new(Entry::root("/").with_children(vec![
        Entry::folder("news").with_children(vec![
            Entry::folder("article").with_detail_page_type("article"),
            Entry::page("feed.html"),
        ]),
        Entry::folder("shop").with_children(vec![
            Entry::folder("item").with_detail_page_type("product"),
            Entry::folder("alt").with_detail_page_type("article"),
        ]),
    ]))
}

#[test]
fn test_detail_pages_are_collected_in_tree_order() {
    let state = SitemapState::new(tree());
    let paths: Vec<&str> = state
        .detail_pages
        .pages()
        .iter()
        .map(|p| p.site_path.as_str())
        .collect();
    assert_eq!(paths, vec!["/news/article/", "/shop/item/", "/shop/alt/"]);

    let article = state.tree.lookup("/news/article/").unwrap().id;
    assert!(state.detail_pages.is_default(article));
    assert_eq!(
        state.detail_pages.default_for_type("product").unwrap().site_path,
        "/shop/item/"
    );
}

#[test]
fn test_subtree_collection_only_sees_the_subtree() {
    let tree = tree();
    let shop = tree.lookup("/shop/").unwrap();
    let table = collect_detail_pages(shop);
    assert_eq!(table.len(), 2);
    assert!(table.by_type("article").all(|p| p.site_path == "/shop/alt/"));
}

#[test]
fn test_entry_wire_shape_is_camel_case() {
    let tree = tree();
    let feed = tree.lookup("/news/feed.html").unwrap();
    let json = serde_json::to_value(feed).unwrap();

    assert_eq!(json["sitePath"], "/news/feed.html");
    assert_eq!(json["kind"], "page");
    assert_eq!(json["editStatus"], "unmodified");
    assert_eq!(json["inNavigation"], true);
    assert!(json.get("vfsPath").is_none());
}

#[test]
fn test_state_survives_serialization() {
    let mut tree = tree().with_site_root("/sites/main/");
    tree.set_parent_property(
        "template",
        InheritedProperty {
            value: "main".to_string(),
            origin: "/sites/main/".to_string(),
        },
    );
    let mut state = SitemapState::new(tree);
    let feed = state.tree.lookup("/news/feed.html").unwrap().clone();
    state.clipboard.add_modified(&feed);

    let json = serde_json::to_string(&state).unwrap();
    let restored: SitemapState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);
    assert_eq!(restored.tree.find_inconsistency(), None);

    let resolved = PropertyResolver::new(&restored.tree)
        .resolve("/news/feed.html", "template")
        .unwrap();
    assert_eq!(resolved.layer, PropertyLayer::ParentSitemap);
    assert_eq!(resolved.origin, "/");
}

#[test]
fn test_unloaded_entry_deserializes_with_defaults() {
    let json = r#"{
        "id": "7d444840-9dc0-11d1-b245-5ffdce74fad2",
        "sitePath": "/archive/",
        "name": "archive",
        "kind": "folder"
    }"#;
    let entry: Entry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.kind, EntryKind::Folder);
    assert!(!entry.children_loaded);
    assert_eq!(entry.edit_status, EditStatus::Unmodified);
    assert!(entry.lock.editable);
}
