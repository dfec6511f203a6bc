//! Integration tests for the room registry.

use chrono::Utc;
use roomchat_protocol::{ClientId, ResourceId, RoomId};
use roomchat_room::{RoomError, RoomRegistry};

fn cid(id: u64) -> ClientId {
    ClientId(id)
}

// =========================================================================
// create_room / invite
// =========================================================================

#[test]
fn test_create_room_host_is_only_member() {
    let mut rooms = RoomRegistry::new();
    let room = rooms.create_room("Lobby", cid(3));

    assert_eq!(room.room_id(), RoomId(0));
    assert_eq!(room.title(), "Lobby");
    assert_eq!(room.host(), Some(cid(3)));
    assert!(!room.is_direct());
    assert_eq!(room.members().collect::<Vec<_>>(), vec![cid(3)]);
}

#[test]
fn test_room_ids_are_monotonic() {
    let mut rooms = RoomRegistry::new();
    let a = rooms.create_room("a", cid(0)).room_id();
    let b = rooms.create_room("b", cid(0)).room_id();
    assert_eq!((a, b), (RoomId(0), RoomId(1)));
}

#[test]
fn test_invite_by_host_adds_member() {
    let mut rooms = RoomRegistry::new();
    let id = rooms.create_room("Lobby", cid(0)).room_id();

    let room = rooms.invite(id, cid(0), cid(1)).unwrap();

    assert!(room.is_member(cid(1)));
    assert_eq!(room.member_count(), 2);
}

#[test]
fn test_invite_by_non_host_is_not_authorized() {
    let mut rooms = RoomRegistry::new();
    let id = rooms.create_room("Lobby", cid(0)).room_id();
    rooms.invite(id, cid(0), cid(1)).unwrap();

    // A member who is not the host still cannot invite.
    let result = rooms.invite(id, cid(1), cid(2));

    assert_eq!(result.unwrap_err(), RoomError::NotAuthorized(cid(1), id));
    assert!(!rooms.get(id).unwrap().is_member(cid(2)));
}

#[test]
fn test_invite_into_missing_room_is_not_found() {
    let mut rooms = RoomRegistry::new();
    assert_eq!(
        rooms.invite(RoomId(42), cid(0), cid(1)).unwrap_err(),
        RoomError::NotFound(RoomId(42))
    );
}

#[test]
fn test_invite_twice_keeps_single_membership() {
    let mut rooms = RoomRegistry::new();
    let id = rooms.create_room("Lobby", cid(0)).room_id();
    rooms.invite(id, cid(0), cid(1)).unwrap();
    let room = rooms.invite(id, cid(0), cid(1)).unwrap();
    assert_eq!(room.member_count(), 2);
}

// =========================================================================
// Direct chats
// =========================================================================

#[test]
fn test_direct_chat_is_idempotent_in_either_order() {
    let mut rooms = RoomRegistry::new();

    let first = rooms.get_or_create_direct_chat(cid(0), cid(1)).unwrap();
    let again = rooms.get_or_create_direct_chat(cid(0), cid(1)).unwrap();
    let reversed = rooms.get_or_create_direct_chat(cid(1), cid(0)).unwrap();

    assert_eq!(first, again);
    assert_eq!(first, reversed);
    assert_eq!(rooms.len(), 1);

    let room = rooms.get(first).unwrap();
    assert!(room.is_direct());
    assert_eq!(room.members().collect::<Vec<_>>(), vec![cid(0), cid(1)]);
}

#[test]
fn test_direct_chats_are_per_pair() {
    let mut rooms = RoomRegistry::new();
    let ab = rooms.get_or_create_direct_chat(cid(0), cid(1)).unwrap();
    let ac = rooms.get_or_create_direct_chat(cid(0), cid(2)).unwrap();
    assert_ne!(ab, ac);
    assert_eq!(rooms.direct_chat_between(cid(2), cid(0)), Some(ac));
    assert_eq!(rooms.direct_chat_between(cid(1), cid(2)), None);
}

#[test]
fn test_direct_chat_with_self_is_rejected() {
    let mut rooms = RoomRegistry::new();
    assert_eq!(
        rooms.get_or_create_direct_chat(cid(4), cid(4)).unwrap_err(),
        RoomError::SelfChat(cid(4))
    );
    assert!(rooms.is_empty());
}

#[test]
fn test_nobody_can_invite_into_direct_chat() {
    let mut rooms = RoomRegistry::new();
    let id = rooms.get_or_create_direct_chat(cid(0), cid(1)).unwrap();

    for requester in [cid(0), cid(1)] {
        assert_eq!(
            rooms.invite(id, requester, cid(2)).unwrap_err(),
            RoomError::NotAuthorized(requester, id)
        );
    }
    assert_eq!(rooms.get(id).unwrap().member_count(), 2);
}

#[test]
fn test_group_and_direct_rooms_share_id_sequence() {
    let mut rooms = RoomRegistry::new();
    let dm = rooms.get_or_create_direct_chat(cid(0), cid(1)).unwrap();
    let group = rooms.create_room("g", cid(0)).room_id();
    assert_eq!((dm, group), (RoomId(0), RoomId(1)));
}

// =========================================================================
// post_message
// =========================================================================

#[test]
fn test_post_message_appends_and_targets_exactly_members() {
    let mut rooms = RoomRegistry::new();
    let id = rooms.create_room("Lobby", cid(0)).room_id();
    rooms.invite(id, cid(0), cid(2)).unwrap();
    let now = Utc::now();

    let delivery = rooms
        .post_message(id, cid(2), "hi".into(), now, Some(ResourceId(5)))
        .unwrap();

    assert_eq!(delivery.recipients, vec![cid(0), cid(2)]);
    assert_eq!(delivery.entry.author, cid(2));
    assert_eq!(delivery.entry.resource_id, Some(ResourceId(5)));

    let history = rooms.get(id).unwrap().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], delivery.entry);
}

#[test]
fn test_post_message_by_non_member_is_not_authorized() {
    let mut rooms = RoomRegistry::new();
    let id = rooms.create_room("Lobby", cid(0)).room_id();

    let result = rooms.post_message(id, cid(1), "sneaky".into(), Utc::now(), None);

    assert_eq!(result.unwrap_err(), RoomError::NotAuthorized(cid(1), id));
    assert!(rooms.get(id).unwrap().history().is_empty());
}

#[test]
fn test_post_message_preserves_order() {
    let mut rooms = RoomRegistry::new();
    let id = rooms.get_or_create_direct_chat(cid(0), cid(1)).unwrap();
    for (i, text) in ["one", "two", "three"].into_iter().enumerate() {
        rooms
            .post_message(id, cid((i % 2) as u64), text.into(), Utc::now(), None)
            .unwrap();
    }
    let texts: Vec<&str> = rooms
        .get(id)
        .unwrap()
        .history()
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(texts, ["one", "two", "three"]);
}

// =========================================================================
// list_visible_rooms
// =========================================================================

#[test]
fn test_list_visible_rooms_filters_membership_and_direct_chats() {
    let mut rooms = RoomRegistry::new();
    let mine = rooms.create_room("mine", cid(0)).room_id();
    let theirs = rooms.create_room("theirs", cid(1)).room_id();
    let invited = rooms.create_room("invited", cid(1)).room_id();
    rooms.invite(invited, cid(1), cid(0)).unwrap();
    rooms.get_or_create_direct_chat(cid(0), cid(1)).unwrap();

    let visible: Vec<RoomId> =
        rooms.list_visible_rooms(cid(0)).map(|r| r.room_id()).collect();

    assert_eq!(visible, vec![mine, invited]);
    assert!(!visible.contains(&theirs));
}
