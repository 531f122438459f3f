use super::*;

fn entry(id: &str, name: &str) -> RemoteUser {
    RemoteUser::online(SocketId::from(id), name, "room-1")
}

#[test]
fn init_dedupes_by_username_last_wins() {
    let mut presence = Presence::default();
    presence.init(vec![entry("s-1", "alice"), entry("s-2", "bob"), entry("s-3", "alice")]);

    assert_eq!(presence.len(), 2);
    assert_eq!(presence.get("alice").unwrap().id.as_str(), "s-3");
}

#[test]
fn init_replaces_previous_roster() {
    let mut presence = Presence::default();
    presence.init(vec![entry("s-1", "alice")]);
    presence.init(vec![entry("s-2", "bob")]);
    assert!(presence.get("alice").is_none());
    assert_eq!(presence.len(), 1);
}

#[test]
fn upsert_updates_typing_in_place() {
    let mut presence = Presence::default();
    presence.init(vec![entry("s-1", "alice"), entry("s-2", "bob")]);

    let mut typing = entry("s-2", "bob");
    typing.typing = true;
    typing.cursor_position = 42;
    presence.upsert(typing);

    assert_eq!(presence.len(), 2);
    assert_eq!(presence.users()[1].cursor_position, 42);
    assert_eq!(presence.typing("alice").collect::<Vec<_>>(), vec!["bob"]);
    assert_eq!(presence.typing("bob").count(), 0);
}

#[test]
fn remove_by_username() {
    let mut presence = Presence::default();
    presence.init(vec![entry("s-1", "alice"), entry("s-2", "bob")]);

    assert_eq!(presence.remove_by_username("bob").map(|u| u.username), Some("bob".to_owned()));
    assert!(presence.remove_by_username("bob").is_none());
    assert_eq!(presence.len(), 1);
}

#[test]
fn set_status_by_socket_id() {
    let mut presence = Presence::default();
    presence.init(vec![entry("s-1", "alice")]);

    assert!(presence.set_status(&SocketId::from("s-1"), UserStatus::Offline));
    assert_eq!(presence.get("alice").unwrap().status, UserStatus::Offline);
    assert!(!presence.set_status(&SocketId::from("s-9"), UserStatus::Online));
}
