//! Available children
//!
//! Lists every child profile with its presence status and current room, and
//! points out the ones free to host or join a new room.

use serde_json::Value;

use super::{expect_success, ProbeContext, Suite};
use crate::actions::FriendsAction;
use crate::client::RemoteFunction;
use crate::envelope::value_str;
use crate::report::{CheckResult, ExitPolicy, SuiteReport};

pub(super) async fn run(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::Children;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::Informational);

    let mut check = CheckResult::new("list_all_children");
    let listed = expect_success(
        ctx,
        &mut check,
        "List all children",
        RemoteFunction::ManageFriends,
        // any id will do, the listing is not scoped to the caller
        &FriendsAction::ListAllChildren {
            child_id: ctx.fixtures.host.clone(),
        },
    )
    .await;

    let mut available = Vec::new();
    if let Some(env) = listed {
        let children = env.data_items();
        check.note(format!("Found {} children", children.len()));
        for child in children {
            check.note(describe(child));
            if room_of(child).is_none() {
                available.push(child.clone());
            }
        }
    }
    report.push(check);

    if report.is_passed("list_all_children") {
        report.finding(format!(
            "Available children (not in rooms): {}",
            available.len()
        ));
        for child in available.iter().take(3) {
            report.finding(format!(
                "  - {}: {}",
                field(child, "name"),
                field(child, "id")
            ));
        }
    }

    report
}

fn field(child: &Value, key: &str) -> String {
    child
        .get(key)
        .and_then(value_str)
        .unwrap_or_else(|| "None".to_string())
}

fn room_of(child: &Value) -> Option<String> {
    child.get("room_id").and_then(value_str).filter(|id| !id.is_empty())
}

fn describe(child: &Value) -> String {
    let status = child
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("offline");
    let room = match room_of(child) {
        Some(id) => format!("Room: {}", id),
        None => "No Room".to_string(),
    };
    format!(
        "{} (ID: {}) - Status: {}, {}",
        field(child, "name"),
        field(child, "id"),
        status,
        room
    )
}
