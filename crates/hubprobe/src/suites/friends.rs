//! Friends management

use super::{call, expect_success, ProbeContext, Suite};
use crate::actions::FriendsAction;
use crate::client::RemoteFunction;
use crate::report::{CheckResult, ExitPolicy, SuiteReport};

const FRIENDS: RemoteFunction = RemoteFunction::ManageFriends;

pub(super) async fn run(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::Friends;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::AllMustPass);
    let fx = &ctx.fixtures;

    // host -> guest
    let mut send = CheckResult::new("send_friend_request");
    expect_success(
        ctx,
        &mut send,
        "Send friend request",
        FRIENDS,
        &FriendsAction::SendFriendRequest {
            child_id: fx.host.clone(),
            friend_child_id: fx.guest.clone(),
        },
    )
    .await;
    report.push(send);

    let mut get = CheckResult::new("get_friend_requests");
    let request_id = expect_success(
        ctx,
        &mut get,
        "Get friend requests",
        FRIENDS,
        &FriendsAction::GetFriendRequests {
            child_id: fx.guest.clone(),
        },
    )
    .await
    .and_then(|env| env.first_item_str("id"));
    if let Some(id) = &request_id {
        get.note(format!("Found friend request ID: {}", id));
    }
    report.push(get);

    let accept = match request_id {
        Some(friend_request_id) => {
            let mut accept = CheckResult::new("accept_friend_request");
            expect_success(
                ctx,
                &mut accept,
                "Accept friend request",
                FRIENDS,
                &FriendsAction::AcceptFriendRequest { friend_request_id },
            )
            .await;
            accept
        }
        None => CheckResult::skipped("accept_friend_request", "No pending friend request to accept"),
    };
    report.push(accept);

    let mut list = CheckResult::new("list_friends");
    if let Some(env) = expect_success(
        ctx,
        &mut list,
        "List friends",
        FRIENDS,
        &FriendsAction::ListFriends {
            child_id: fx.host.clone(),
        },
    )
    .await
    {
        list.note(format!("Friends found: {}", env.data_items().len()));
    }
    report.push(list);

    let mut search = CheckResult::new("search_children");
    if let Some(env) = expect_success(
        ctx,
        &mut search,
        "Search children",
        FRIENDS,
        &FriendsAction::SearchChildren {
            child_id: fx.host.clone(),
            search_query: "test".to_string(),
        },
    )
    .await
    {
        search.note(format!("Children found: {}", env.data_items().len()));
    }
    report.push(search);

    report.push(decline_flow(ctx).await);

    report
}

/// invitee -> host, then decline whatever the host has pending
async fn decline_flow(ctx: &ProbeContext) -> CheckResult {
    let fx = &ctx.fixtures;
    let mut check = CheckResult::new("decline_friend_request");

    let sent = call(
        ctx,
        FRIENDS,
        &FriendsAction::SendFriendRequest {
            child_id: fx.invitee.clone(),
            friend_child_id: fx.host.clone(),
        },
    )
    .await;
    if sent.envelope().is_none() {
        check.fail("Decline friend request: could not send the request to decline");
        return check;
    }

    let pending = call(
        ctx,
        FRIENDS,
        &FriendsAction::GetFriendRequests {
            child_id: fx.host.clone(),
        },
    )
    .await;
    let Some(request_id) = pending
        .envelope()
        .filter(|env| env.succeeded())
        .and_then(|env| env.first_item_str("id"))
    else {
        check.fail("Decline friend request: no pending request found for host");
        return check;
    };

    expect_success(
        ctx,
        &mut check,
        "Decline friend request",
        FRIENDS,
        &FriendsAction::DeclineFriendRequest {
            friend_request_id: request_id,
        },
    )
    .await;
    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Fixtures;
    use crate::report::Verdict;
    use crate::testing::{MockBackend, Reply};
    use serde_json::json;

    #[tokio::test]
    async fn test_full_friends_flow() {
        let backend = MockBackend::start(|req| match req.action() {
            Some("get_friend_requests") => {
                let id = if req.str_field("child_id") == Some(Fixtures::default().guest.as_str()) {
                    "req-guest"
                } else {
                    "req-host"
                };
                Reply::ok(json!({"success": true, "data": [{"id": id}]}))
            }
            Some("list_friends") => Reply::ok(json!({"success": true, "data": [{"id": "f1"}, {"id": "f2"}]})),
            Some("search_children") => Reply::ok(json!({"success": true, "data": []})),
            _ => Reply::ok(json!({"success": true})),
        })
        .await;

        let report = run(&backend.context()).await;
        assert_eq!(report.passed(), 6, "errors: {:?}", report.errors());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            report.check("list_friends").unwrap().notes,
            vec!["Friends found: 2"]
        );

        let requests = backend.requests();
        let accept = requests
            .iter()
            .find(|r| r.action() == Some("accept_friend_request"))
            .unwrap();
        assert_eq!(accept.str_field("friend_request_id"), Some("req-guest"));
        let decline = requests
            .iter()
            .find(|r| r.action() == Some("decline_friend_request"))
            .unwrap();
        assert_eq!(decline.str_field("friend_request_id"), Some("req-host"));
    }

    #[tokio::test]
    async fn test_accept_skipped_without_pending_request() {
        let backend = MockBackend::start(|req| match req.action() {
            Some("get_friend_requests") => Reply::ok(json!({"success": true, "data": []})),
            Some("send_friend_request") => Reply::ok(json!({
                "success": false,
                "error": "insert or update on table \"friend_requests\" violates foreign key constraint"
            })),
            _ => Reply::ok(json!({"success": true, "data": []})),
        })
        .await;

        let report = run(&backend.context()).await;
        let accept = report.check("accept_friend_request").unwrap();
        assert_eq!(accept.verdict, Verdict::Skipped);
        assert!(!backend.actions().contains(&"accept_friend_request".to_string()));
        assert!(report.errors()[0].starts_with("Send friend request failed: insert or update"));
        assert_eq!(report.exit_code(), 1);
    }
}
