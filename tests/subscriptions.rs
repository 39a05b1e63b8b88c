//! Tests for the observation surface: valueChanged/statusChanged delivery
//! and unsubscription.

use std::sync::{Arc, Mutex};

use formtree::{FormTree, Schema, Status, validation::rules};
use serde_json::{Value, json};

fn value_recorder(
    handle: &formtree::NodeHandle,
) -> (Arc<Mutex<Vec<Value>>>, formtree::SubscriptionId) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = handle.subscribe_value(move |value| sink.lock().unwrap().push(value.clone()));
    (seen, id)
}

fn status_recorder(
    handle: &formtree::NodeHandle,
) -> (Arc<Mutex<Vec<Status>>>, formtree::SubscriptionId) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = handle.subscribe_status(move |status| sink.lock().unwrap().push(status));
    (seen, id)
}

fn schema() -> Schema {
    Schema::group([
        ("name", Schema::leaf("").validator(rules::required)),
        ("note", Schema::leaf("")),
    ])
}

#[test]
fn test_leaf_value_events() {
    let tree = FormTree::build(schema());
    let (seen, _) = value_recorder(&tree.get("name").unwrap());

    tree.set_value("name", "one").unwrap();
    tree.set_value("name", "two").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![json!("one"), json!("two")]);
}

#[test]
fn test_root_observes_derived_value_of_leaf_changes() {
    let tree = FormTree::build(schema());
    let (seen, _) = value_recorder(&tree.root());

    tree.set_value("name", "ada").unwrap();
    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], json!({"name": "ada", "note": ""}));
}

#[test]
fn test_status_events_fire_only_on_change() {
    let tree = FormTree::build(schema());
    let name = tree.get("name").unwrap();
    assert_eq!(name.status(), Status::Invalid);
    let (statuses, _) = status_recorder(&name);
    let (values, _) = value_recorder(&name);

    // Still failing `required`: value changed, status did not.
    tree.set_value("name", "  ").unwrap();
    assert_eq!(statuses.lock().unwrap().len(), 0);
    assert_eq!(values.lock().unwrap().len(), 1);

    tree.set_value("name", "ada").unwrap();
    assert_eq!(*statuses.lock().unwrap(), vec![Status::Valid]);
}

#[test]
fn test_root_status_follows_leaf() {
    let tree = FormTree::build(schema());
    let (statuses, _) = status_recorder(&tree.root());

    tree.set_value("name", "ada").unwrap();
    tree.set_value("name", "").unwrap();
    assert_eq!(
        *statuses.lock().unwrap(),
        vec![Status::Valid, Status::Invalid]
    );
}

#[test]
fn test_no_replay_on_subscribe() {
    let tree = FormTree::build(schema());
    tree.set_value("name", "before").unwrap();

    let (seen, _) = value_recorder(&tree.get("name").unwrap());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let tree = FormTree::build(schema());
    let name = tree.get("name").unwrap();
    let (seen, id) = value_recorder(&name);

    tree.set_value("name", "one").unwrap();
    assert!(name.unsubscribe(id));
    tree.set_value("name", "two").unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![json!("one")]);
    // A released id cannot be released twice.
    assert!(!name.unsubscribe(id));
}

#[test]
fn test_unsubscribe_is_per_node() {
    let tree = FormTree::build(schema());
    let (_, id) = value_recorder(&tree.get("name").unwrap());
    // The registration lives on `name`, not on the root.
    assert!(!tree.root().unsubscribe(id));
}

#[test]
fn test_sibling_subscription_not_triggered() {
    let tree = FormTree::build(schema());
    let (seen, _) = value_recorder(&tree.get("note").unwrap());
    tree.set_value("name", "ada").unwrap();
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_collection_events_on_append_and_remove() {
    let tree = FormTree::build(Schema::collection([Schema::leaf("a")]));
    let (seen, _) = value_recorder(&tree.root());

    tree.append("", Schema::leaf("b")).unwrap();
    tree.remove("", 0).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!(["a", "b"]), json!(["b"])]
    );
}
