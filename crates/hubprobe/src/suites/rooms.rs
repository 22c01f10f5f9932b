//! Game rooms management
//!
//! Walks a room through its life: create, join, invite, list participants,
//! pending invitations, accept, join-request approval, the guest leaving and
//! finally close.

use super::{expect_success, random_child_id, ProbeContext, Suite};
use crate::actions::RoomsAction;
use crate::client::RemoteFunction;
use crate::envelope::Envelope;
use crate::report::{CheckResult, ExitPolicy, SuiteReport};

const ROOMS: RemoteFunction = RemoteFunction::ManageGameRooms;

pub(super) async fn run(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::Rooms;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::AllMustPass);
    let fx = &ctx.fixtures;

    let mut create = CheckResult::new("create_room");
    let room = expect_success(
        ctx,
        &mut create,
        "Create room",
        ROOMS,
        &RoomsAction::create_room(fx.host.clone(), "Test Room"),
    )
    .await;
    let room_code = room.as_ref().and_then(|env| env.data_str("room_code"));
    let room_id = room.as_ref().and_then(|env| env.data_str("id"));
    if room.is_some() {
        create.note(format!(
            "Room code: {}",
            room_code.as_deref().unwrap_or("None")
        ));
    }
    report.push(create);

    report.push(match &room_code {
        Some(code) => {
            let mut join = CheckResult::new("join_room");
            expect_success(
                ctx,
                &mut join,
                "Join room",
                ROOMS,
                &RoomsAction::JoinRoom {
                    child_id: fx.guest.clone(),
                    room_code: code.clone(),
                },
            )
            .await;
            join
        }
        None => CheckResult::skipped("join_room", "No room code to join"),
    });

    report.push(match &room_id {
        Some(id) => {
            let mut invite = CheckResult::new("invite_friends");
            if let Some(env) = expect_success(
                ctx,
                &mut invite,
                "Invite friends",
                ROOMS,
                &RoomsAction::InviteFriends {
                    child_id: fx.host.clone(),
                    room_id: id.clone(),
                    friend_ids: vec![fx.invitee.clone()],
                },
            )
            .await
            {
                invite.note(format!("Invitations sent: {}", env.invitations_sent()));
            }
            invite
        }
        None => CheckResult::skipped("invite_friends", "No room to invite friends to"),
    });

    report.push(match &room_id {
        Some(id) => participants(ctx, id).await,
        None => CheckResult::skipped("get_room_participants", "No room to inspect"),
    });

    let mut pending = CheckResult::new("get_pending_invitations");
    let invitation_id = expect_success(
        ctx,
        &mut pending,
        "Get pending invitations",
        ROOMS,
        &RoomsAction::pending_invitations(fx.invitee.clone()),
    )
    .await
    .and_then(|env| env.first_item_str("id"));
    if let Some(id) = &invitation_id {
        pending.note(format!("Found invitation ID: {}", id));
    }
    report.push(pending);

    report.push(match invitation_id {
        Some(invitation_id) => {
            let mut accept = CheckResult::new("accept_invitation");
            expect_success(
                ctx,
                &mut accept,
                "Accept invitation",
                ROOMS,
                &RoomsAction::AcceptInvitation {
                    child_id: fx.invitee.clone(),
                    invitation_id,
                },
            )
            .await;
            accept
        }
        None => CheckResult::skipped("accept_invitation", "No pending invitation to accept"),
    });

    let (request, handle) = match &room_code {
        Some(code) => join_request_flow(ctx, code).await,
        None => (
            CheckResult::skipped("request_to_join", "No room code to request"),
            CheckResult::skipped("handle_join_request", "No join request to handle"),
        ),
    };
    report.push(request);
    report.push(handle);

    report.push(match &room_id {
        Some(id) => {
            let mut leave = CheckResult::new("leave_room");
            expect_success(
                ctx,
                &mut leave,
                "Leave room",
                ROOMS,
                &RoomsAction::LeaveRoom {
                    child_id: fx.guest.clone(),
                    room_id: id.clone(),
                },
            )
            .await;
            leave
        }
        None => CheckResult::skipped("leave_room", "No room to leave"),
    });

    report.push(match &room_id {
        Some(id) => {
            let mut close = CheckResult::new("close_room");
            expect_success(
                ctx,
                &mut close,
                "Close room",
                ROOMS,
                &RoomsAction::CloseRoom {
                    child_id: fx.host.clone(),
                    room_id: id.clone(),
                },
            )
            .await;
            close
        }
        None => CheckResult::skipped("close_room", "No room to close"),
    });

    report
}

async fn participants(ctx: &ProbeContext, room_id: &str) -> CheckResult {
    let mut check = CheckResult::new("get_room_participants");
    if let Some(env) = expect_success(
        ctx,
        &mut check,
        "Get room participants",
        ROOMS,
        &RoomsAction::GetRoomParticipants {
            room_id: room_id.to_string(),
        },
    )
    .await
    {
        describe_participants(&mut check, &env);
    }
    check
}

pub(super) fn describe_participants(check: &mut CheckResult, env: &Envelope) {
    let items = env.data_items();
    check.note(format!("Found {} participants", items.len()));
    for p in items {
        let name = p
            .get("player_name")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        let kind = if p.get("is_ai").and_then(|v| v.as_bool()).unwrap_or(false) {
            "AI"
        } else {
            "Human"
        };
        check.note(format!("  - {} ({})", name, kind));
    }
}

/// A stranger asks to join, then the host approves
async fn join_request_flow(ctx: &ProbeContext, room_code: &str) -> (CheckResult, CheckResult) {
    let mut request = CheckResult::new("request_to_join");
    let request_id = expect_success(
        ctx,
        &mut request,
        "Request to join",
        ROOMS,
        &RoomsAction::RequestToJoin {
            child_id: random_child_id(),
            room_code: room_code.to_string(),
        },
    )
    .await
    .and_then(|env| env.data_str("id"));

    let handle = match request_id {
        Some(request_id) => {
            let mut handle = CheckResult::new("handle_join_request");
            expect_success(
                ctx,
                &mut handle,
                "Handle join request",
                ROOMS,
                &RoomsAction::HandleJoinRequest {
                    child_id: ctx.fixtures.host.clone(),
                    request_id,
                    approve: true,
                },
            )
            .await;
            handle
        }
        None => CheckResult::skipped("handle_join_request", "No join request to handle"),
    };

    (request, handle)
}
