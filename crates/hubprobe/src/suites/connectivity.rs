//! Function connectivity
//!
//! A function counts as reachable when it answers 200 with a `success` key,
//! whatever its value. Random child ids are used so no real data is touched.

use serde::Serialize;

use super::{call, random_child_id, Outcome, ProbeContext, Suite};
use crate::actions::{FriendsAction, RoomsAction};
use crate::client::RemoteFunction;
use crate::report::{CheckResult, ExitPolicy, SuiteReport};

pub(super) async fn run(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::Connectivity;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::AllMustPass);

    report.push(
        reachable(
            ctx,
            "friends_function_accessible",
            "Friends function",
            RemoteFunction::ManageFriends,
            &FriendsAction::ListFriends {
                child_id: random_child_id(),
            },
        )
        .await,
    );

    report.push(
        reachable(
            ctx,
            "rooms_function_accessible",
            "Rooms function",
            RemoteFunction::ManageGameRooms,
            &RoomsAction::pending_invitations(random_child_id()),
        )
        .await,
    );

    report
}

async fn reachable<T: Serialize>(
    ctx: &ProbeContext,
    name: &str,
    label: &str,
    function: RemoteFunction,
    payload: &T,
) -> CheckResult {
    let mut check = CheckResult::new(name);

    match call(ctx, function, payload).await {
        Outcome::Success(env) | Outcome::Rejected(env) if env.has_success_flag() => {
            check.pass();
            check.note(format!("{}: ACCESSIBLE", label));
        }
        Outcome::Success(_) | Outcome::Rejected(_) | Outcome::Malformed(_) => {
            check.fail(format!("{} returned malformed response", label));
        }
        Outcome::HttpError(resp) => {
            check.fail(format!("{} HTTP error: {}", label, resp.status));
        }
        Outcome::Transport(e) => {
            check.fail(format!("Connectivity test exception: {}", e));
        }
    }

    check
}
