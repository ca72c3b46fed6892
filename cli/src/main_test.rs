use super::*;

#[test]
fn plain_lines_are_messages() {
    assert_eq!(parse_input("안녕하세요"), Input::Say("안녕하세요".into()));
    assert_eq!(parse_input("  spaced  "), Input::Say("  spaced  ".into()));
}

#[test]
fn slash_commands_are_parsed() {
    assert_eq!(parse_input("/open"), Input::Open);
    assert_eq!(parse_input("/close"), Input::Close);
    assert_eq!(parse_input(" /agree "), Input::Agree);
    assert_eq!(parse_input("/latest"), Input::Latest);
    assert_eq!(parse_input("/retry"), Input::Retry);
    assert_eq!(parse_input("/logout"), Input::Logout);
    assert_eq!(parse_input("/quit"), Input::Quit);
}

#[test]
fn login_takes_id_and_optional_nick() {
    assert_eq!(parse_input("/login 7"), Input::Login(Identity::new(7)));
    assert_eq!(parse_input("/login 7 베이퍼"), Input::Login(Identity::new(7).with_nick_name("베이퍼")));
}

#[test]
fn bad_commands_are_unknown() {
    assert_eq!(parse_input("/login abc"), Input::Unknown("/login abc".into()));
    assert_eq!(parse_input("/dance"), Input::Unknown("/dance".into()));
}

#[test]
fn cli_parses_chat_flags() {
    let cli = Cli::try_parse_from(["vapechat-cli", "--base-url", "http://chat.test", "chat", "--user-id", "3", "--agree"])
        .expect("valid args");
    assert_eq!(cli.base_url, "http://chat.test");
    let Command::Chat(args) = cli.command else {
        panic!("expected chat command");
    };
    assert_eq!(args.user_id, Some(3));
    assert!(args.agree);
    assert!(!args.closed);
}

#[tokio::test]
async fn dispatch_forwards_until_quit() {
    // Nothing listens on port 9, so the session just keeps retrying.
    let config = ClientConfig::new("http://127.0.0.1:9");
    let deps = SessionDeps {
        connector: Arc::new(WsConnector::new(config.clone())),
        history: Arc::new(HttpHistory::new(&config).expect("valid base url")),
    };
    let (handle, mut views) = spawn_session(ChatSession::new(), deps);

    assert!(dispatch(&handle, Input::Open).await);
    assert!(dispatch(&handle, Input::Unknown("/dance".into())).await);
    assert!(!dispatch(&handle, Input::Quit).await);

    let opened = tokio::time::timeout(std::time::Duration::from_secs(2), async {
        loop {
            match views.recv().await {
                Some(chat_client::ViewCommand::Render(view)) if view.is_open => return true,
                Some(_) => {}
                None => return false,
            }
        }
    })
    .await
    .expect("render timed out");
    assert!(opened);
    handle.unmount().await;
}
