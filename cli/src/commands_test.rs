use super::*;
use frames::model::{ChatMessage, RemoteUser, SocketId};
use serde_json::json;

#[test]
fn plain_text_is_chat() {
    assert_eq!(parse_input("  hello there ").unwrap(), Input::Chat("hello there".into()));
    assert_eq!(parse_input("   ").unwrap(), Input::Empty);
}

#[test]
fn path_commands_require_an_argument() {
    assert_eq!(parse_input("/touch src/main.js").unwrap(), Input::Touch("src/main.js".into()));
    assert_eq!(parse_input("/mkdir   lib ").unwrap(), Input::Mkdir("lib".into()));
    assert_eq!(
        parse_input("/open").unwrap_err(),
        ParseError::MissingArgument { command: "open", argument: "a path" }
    );
    assert_eq!(parse_input("/rm").unwrap_err().to_string(), "/rm needs a path");
}

#[test]
fn move_takes_path_and_name() {
    assert_eq!(
        parse_input("/mv src/a.js b.js").unwrap(),
        Input::Move { path: "src/a.js".into(), name: "b.js".into() }
    );
    assert!(matches!(parse_input("/mv src/a.js"), Err(ParseError::MissingArgument { command: "mv", .. })));
}

#[test]
fn write_and_run_unescape_newlines() {
    assert_eq!(parse_input("/write a\\nb").unwrap(), Input::Write("a\nb".into()));
    assert_eq!(parse_input("/write").unwrap(), Input::Write(String::new()));
    assert_eq!(parse_input("/run 1\\n2").unwrap(), Input::Run { stdin: "1\n2".into() });
}

#[test]
fn draw_parses_json() {
    assert_eq!(parse_input(r#"/draw {"shapes":[]}"#).unwrap(), Input::Draw(json!({"shapes": []})));
    assert!(matches!(parse_input("/draw {oops"), Err(ParseError::InvalidDrawing(_))));
}

#[test]
fn unknown_command_is_rejected() {
    assert_eq!(parse_input("/frobnicate x").unwrap_err(), ParseError::UnknownCommand("frobnicate".into()));
    assert_eq!(parse_input("/quit").unwrap(), Input::Leave);
}

#[test]
fn http_url_follows_relay_url() {
    assert_eq!(http_url("ws://127.0.0.1:3001/ws", "/healthz"), "http://127.0.0.1:3001/healthz");
    assert_eq!(
        http_url("wss://relay.example.com/ws/", "/rooms/r-1/users"),
        "https://relay.example.com/rooms/r-1/users"
    );
}

#[test]
fn lang_takes_an_optional_name() {
    assert_eq!(parse_input("/lang python").unwrap(), Input::Lang(Some("python".into())));
    assert_eq!(parse_input("/lang").unwrap(), Input::Lang(None));
}

#[test]
fn split_path_separates_parent() {
    assert_eq!(split_path("src/lib/a.js"), ("src/lib", "a.js"));
    assert_eq!(split_path("/a.js"), ("", "a.js"));
}

#[test]
fn tree_renders_directories_first_and_resolves_paths() {
    let mut tree = FileTree::default();
    let root = tree.root_id().clone();
    tree.create_file(&root, "b.js").unwrap();
    let src = tree.create_directory(&root, "src").unwrap().new_directory.id;
    let main = tree.create_file(&src, "main.js").unwrap().new_file.id;
    tree.open_file(&main);

    assert_eq!(render_tree(&tree), "src/\n  main.js *\nb.js\n");
    assert_eq!(resolve(&tree, "src/main.js"), Some(main));
    assert_eq!(resolve(&tree, ""), Some(root));
    assert_eq!(resolve(&tree, "nope.js"), None);
    assert_eq!(render_tree(&FileTree::default()), "(empty)\n");
}

#[test]
fn users_render_with_status() {
    let mut presence = Presence::default();
    let mut bob = RemoteUser::online(SocketId::from("s-b"), "bob", "room-1");
    bob.typing = true;
    presence.init(vec![RemoteUser::online(SocketId::from("s-a"), "alice", "room-1"), bob]);
    presence.set_status(&SocketId::from("s-a"), UserStatus::Offline);

    assert_eq!(render_users(&presence, "alice"), "alice (you) [away]\nbob [online, typing]\n");
}

#[test]
fn notices_render_for_the_terminal() {
    let message = ChatMessage {
        id: "m-1".into(),
        username: "bob".into(),
        message: "hi".into(),
        timestamp: "09:05 AM".into(),
    };
    assert_eq!(render_notice(&Notice::Message(message)).unwrap(), "[09:05 AM] bob: hi");
    assert_eq!(
        render_notice(&Notice::UsernameTaken).unwrap(),
        "The username already exists. Please choose another."
    );
    assert!(render_notice(&Notice::DrawingSynced).is_none());
}
