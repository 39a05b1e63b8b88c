//! End-to-end signup form: the username/email/gender tree driven through
//! the full mutation and observation surface.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use formtree::{Failure, FormTree, NodeHandle, Schema, Status, validation::rules};
use serde_json::{Value, json};

fn signup_schema() -> Schema {
    Schema::group([
        (
            "username",
            Schema::leaf(Value::Null)
                .validator(rules::required)
                .validator(rules::forbidden(["Chris", "Anna"], "nameIsForbidden")),
        ),
        (
            "email",
            Schema::leaf(Value::Null)
                .validator(rules::required)
                .validator(rules::email_format)
                .async_validator(|value| async move {
                    (value == json!("test@test.com")).then(|| Failure::new("emailIsForbidden"))
                })
                .debounce(Duration::from_millis(1500)),
        ),
        ("gender", Schema::leaf("male")),
    ])
}

async fn settle(handle: &NodeHandle) -> Status {
    for _ in 0..400 {
        let status = handle.status();
        if status != Status::Pending {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("node did not settle");
}

#[test]
fn test_initial_shape_and_status() {
    let tree = FormTree::build(signup_schema());
    assert_eq!(
        tree.value(),
        json!({"username": null, "email": null, "gender": "male"})
    );
    // Both required fields start empty.
    assert_eq!(tree.status(), Status::Invalid);
    assert_eq!(tree.get("gender").unwrap().status(), Status::Valid);
}

#[test]
fn test_forbidden_username_then_allowed() {
    let tree = FormTree::build(signup_schema());

    tree.set_value("username", "Chris").unwrap();
    let username = tree.get("username").unwrap();
    assert_eq!(username.status(), Status::Invalid);
    assert_eq!(username.failures(), vec![Failure::new("nameIsForbidden")]);

    tree.set_value("username", "bob").unwrap();
    assert_eq!(username.status(), Status::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_email_transitions() {
    let tree = FormTree::build(signup_schema());
    let email = tree.get("email").unwrap();

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statuses);
    email.subscribe_status(move |status| sink.lock().unwrap().push(status));

    // Synchronous rules pass, so the field goes straight to Pending and
    // flips to Invalid once the debounced check resolves.
    tree.set_value("email", "test@test.com").unwrap();
    assert_eq!(email.status(), Status::Pending);
    assert_eq!(settle(&email).await, Status::Invalid);
    assert_eq!(email.failures(), vec![Failure::new("emailIsForbidden")]);
    assert_eq!(
        *statuses.lock().unwrap(),
        vec![Status::Pending, Status::Invalid]
    );

    tree.set_value("email", "a@b.com").unwrap();
    assert_eq!(settle(&email).await, Status::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_root_gates_submission() {
    let tree = FormTree::build(signup_schema());

    tree.set_value("username", "bob").unwrap();
    tree.set_value("email", "bob@example.com").unwrap();
    assert_eq!(tree.status(), Status::Pending, "email check in flight");

    assert_eq!(settle(&tree.root()).await, Status::Valid);
    assert_eq!(
        tree.value(),
        json!({"username": "bob", "email": "bob@example.com", "gender": "male"})
    );
}

#[test]
fn test_patch_keeps_other_fields() {
    let tree = FormTree::build(signup_schema());
    tree.patch_value("", json!({"username": "max"})).unwrap();

    assert_eq!(tree.get("username").unwrap().value(), json!("max"));
    assert_eq!(tree.get("email").unwrap().value(), Value::Null);
    assert_eq!(tree.get("email").unwrap().status(), Status::Invalid);
    assert_eq!(tree.get("gender").unwrap().value(), json!("male"));
}

#[test]
fn test_sync_rules_gate_the_async_check() {
    let tree = FormTree::build(signup_schema());

    // A malformed address fails synchronously; no Pending appears.
    tree.set_value("email", "not-an-email").unwrap();
    let email = tree.get("email").unwrap();
    assert_eq!(email.status(), Status::Invalid);
    assert_eq!(email.failures(), vec![Failure::new("emailFormat")]);
}
