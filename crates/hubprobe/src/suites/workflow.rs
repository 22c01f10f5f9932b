//! Core room workflow
//!
//! Uses the two idle fixture children so neither trips over "already in a
//! room". The friend is invited, then joins by code, and the participant
//! count is taken again to confirm the join landed.

use super::rooms::describe_participants;
use super::{expect_success, ProbeContext, Suite};
use crate::actions::RoomsAction;
use crate::client::RemoteFunction;
use crate::report::{CheckResult, ExitPolicy, SuiteReport};

const ROOMS: RemoteFunction = RemoteFunction::ManageGameRooms;

pub(crate) const PARTICIPANTS_AFTER_JOIN: &str = "participants_after_join";

pub(super) async fn run(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::Core;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::AllMustPass);
    let fx = &ctx.fixtures;

    let mut create = CheckResult::new("create_room");
    let room = expect_success(
        ctx,
        &mut create,
        "Create room",
        ROOMS,
        &RoomsAction::create_room(fx.idle_host.clone(), "Core Test Room"),
    )
    .await
    .and_then(|env| Some((env.data_str("id")?, env.data_str("room_code")?)));
    if let Some((id, code)) = &room {
        create.note(format!("Room created - ID: {}, Code: {}", id, code));
    } else if create.passed() {
        create.fail("Create room: response carried no room id or code");
    }
    report.push(create);

    let Some((room_id, room_code)) = room else {
        for (name, action) in [
            ("get_room_participants", "list"),
            ("invite_friends", "invite into"),
            ("join_room", "join"),
            (PARTICIPANTS_AFTER_JOIN, "recount"),
        ] {
            report.push(CheckResult::skipped(name, format!("No room to {}", action)));
        }
        report.push(pending_invitations(ctx).await);
        return report;
    };

    let (participants, before) = count_participants(ctx, "get_room_participants", &room_id).await;
    report.push(participants);

    let mut invite = CheckResult::new("invite_friends");
    if let Some(env) = expect_success(
        ctx,
        &mut invite,
        "Invite friends",
        ROOMS,
        &RoomsAction::InviteFriends {
            child_id: fx.idle_host.clone(),
            room_id: room_id.clone(),
            friend_ids: vec![fx.idle_friend.clone()],
        },
    )
    .await
    {
        invite.note(format!("Invitations sent: {}", env.invitations_sent()));
    }
    report.push(invite);

    report.push(pending_invitations(ctx).await);

    let mut join = CheckResult::new("join_room");
    let joined = expect_success(
        ctx,
        &mut join,
        "Manual join",
        ROOMS,
        &RoomsAction::JoinRoom {
            child_id: fx.idle_friend.clone(),
            room_code,
        },
    )
    .await
    .is_some();
    report.push(join);

    if !joined {
        report.push(CheckResult::skipped(
            PARTICIPANTS_AFTER_JOIN,
            "Friend did not join, nothing to recount",
        ));
        return report;
    }

    let (mut recount, after) = count_participants(ctx, PARTICIPANTS_AFTER_JOIN, &room_id).await;
    if let (Some(before), Some(after)) = (before, after) {
        if after > before {
            recount.note(format!("Now {} participants in room", after));
        } else {
            recount.fail(format!(
                "Participant count did not grow after join ({} before, {} after)",
                before, after
            ));
        }
    }
    report.push(recount);

    report
}

async fn count_participants(
    ctx: &ProbeContext,
    name: &str,
    room_id: &str,
) -> (CheckResult, Option<usize>) {
    let mut check = CheckResult::new(name);
    let count = expect_success(
        ctx,
        &mut check,
        "Get room participants",
        ROOMS,
        &RoomsAction::GetRoomParticipants {
            room_id: room_id.to_string(),
        },
    )
    .await
    .map(|env| {
        describe_participants(&mut check, &env);
        env.data_items().len()
    });
    (check, count)
}

async fn pending_invitations(ctx: &ProbeContext) -> CheckResult {
    let mut check = CheckResult::new("get_pending_invitations");
    if let Some(env) = expect_success(
        ctx,
        &mut check,
        "Get pending invitations",
        ROOMS,
        &RoomsAction::pending_invitations(ctx.fixtures.idle_friend.clone()),
    )
    .await
    {
        check.note(format!("Pending invitations: {}", env.data_items().len()));
    }
    check
}
