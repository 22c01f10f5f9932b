//! Request payloads
//!
//! Every remote function dispatches on a top-level `action` field, so the
//! payloads are internally tagged enums.

use serde::Serialize;

pub const DEFAULT_GAME_ID: &str = "word-wonder";
pub const DEFAULT_DIFFICULTY: &str = "medium";

/// Actions understood by `manage-friends`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FriendsAction {
    ListFriends {
        child_id: String,
    },
    ListAllChildren {
        child_id: String,
    },
    SendFriendRequest {
        child_id: String,
        friend_child_id: String,
    },
    GetFriendRequests {
        child_id: String,
    },
    AcceptFriendRequest {
        friend_request_id: String,
    },
    DeclineFriendRequest {
        friend_request_id: String,
    },
    SearchChildren {
        child_id: String,
        search_query: String,
    },
}

/// Actions understood by `manage-game-rooms` (and its clean variant)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoomsAction {
    CreateRoom {
        child_id: String,
        game_id: String,
        difficulty: String,
        room_name: String,
        friend_ids: Vec<String>,
    },
    JoinRoom {
        child_id: String,
        room_code: String,
    },
    LeaveRoom {
        child_id: String,
        room_id: String,
    },
    InviteFriends {
        child_id: String,
        room_id: String,
        friend_ids: Vec<String>,
    },
    GetRoomParticipants {
        room_id: String,
    },
    RequestToJoin {
        child_id: String,
        room_code: String,
    },
    HandleJoinRequest {
        child_id: String,
        request_id: String,
        approve: bool,
    },
    CloseRoom {
        child_id: String,
        room_id: String,
    },
    GetPendingInvitations {
        child_id: String,
    },
    AcceptInvitation {
        child_id: String,
        invitation_id: String,
    },
    ReloadSchemaCache,
    DebugSchema,
}

impl RoomsAction {
    /// `create_room` with the game and difficulty every probe uses
    pub fn create_room(child_id: impl Into<String>, room_name: impl Into<String>) -> Self {
        Self::CreateRoom {
            child_id: child_id.into(),
            game_id: DEFAULT_GAME_ID.to_string(),
            difficulty: DEFAULT_DIFFICULTY.to_string(),
            room_name: room_name.into(),
            friend_ids: Vec::new(),
        }
    }

    pub fn pending_invitations(child_id: impl Into<String>) -> Self {
        Self::GetPendingInvitations {
            child_id: child_id.into(),
        }
    }
}

/// Actions for the one-off maintenance functions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MaintenanceAction {
    FixSchema,
    TestDirectQuery { child_id: String },
}
