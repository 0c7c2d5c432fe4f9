use buletin_post_core::PluginRegistry;
use serde_json::json;

#[test]
fn catalog_lists_every_command_in_id_order() {
    let catalog = PluginRegistry::post().command_catalog();
    let ids: Vec<&str> = catalog.iter().map(|c| c.id.as_str()).collect();

    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    for id in [
        "text.insert",
        "block.set_type",
        "blockquote.wrap",
        "checklist.toggle_checked",
        "paywall.insert_marker",
        "paywall.remove_marker",
    ] {
        assert!(ids.contains(&id), "missing {id}");
    }
    assert!(catalog.iter().all(|c| !c.label.is_empty()));
}

#[test]
fn catalog_carries_descriptions_and_examples() {
    let catalog = PluginRegistry::post().command_catalog();
    let set_type = catalog.iter().find(|c| c.id == "block.set_type").unwrap();

    assert_eq!(set_type.label, "Set block type");
    assert_eq!(set_type.args_example, Some(json!({ "type": "h2" })));
    assert!(set_type.keywords.iter().any(|k| k == "heading"));

    let marker = catalog
        .iter()
        .find(|c| c.id == "paywall.insert_marker")
        .unwrap();
    assert!(marker.description.is_some());
    let value = serde_json::to_value(marker).unwrap();
    assert_eq!(value["label"], json!("Insert paid-content line"));
    assert!(value.get("args_example").is_none());
}
