use super::SlashCommand;

#[test]
fn it_parse_empty_string() {
    let text = "";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_space_only() {
    let text = " ";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_single_slash() {
    let text = "/";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_invalid_prefix() {
    let text = "!q";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_plain_prompts() {
    assert!(SlashCommand::parse("tell me a story").is_none());
}

#[test]
fn it_parse_valid_prefix() {
    let text = "/q";
    let cmd = SlashCommand::parse(text);
    assert!(cmd.is_some());
    assert_eq!(cmd.unwrap().command, "/q");
}

#[test]
fn it_is_short_quit() {
    let cmd = SlashCommand::parse("/q").unwrap();
    assert!(cmd.is_quit());
}

#[test]
fn it_is_quit() {
    let cmd = SlashCommand::parse("/quit").unwrap();
    assert!(cmd.is_quit());
}

#[test]
fn it_is_exit() {
    let cmd = SlashCommand::parse("/exit").unwrap();
    assert!(cmd.is_quit());
}

#[test]
fn it_is_not_is_quit() {
    let cmd = SlashCommand::parse("/help").unwrap();
    assert!(!cmd.is_quit());
}

#[test]
fn it_is_short_help() {
    let cmd = SlashCommand::parse("/h").unwrap();
    assert!(cmd.is_help());
}

#[test]
fn it_is_upload() {
    let cmd = SlashCommand::parse("/upload ./cat.png").unwrap();
    assert!(cmd.is_upload());
    assert_eq!(cmd.upload_path(), Some("./cat.png".to_string()));
}

#[test]
fn it_joins_upload_path_words() {
    let cmd = SlashCommand::parse("/u  ./my  cat.png ").unwrap();
    assert_eq!(cmd.upload_path(), Some("./my cat.png".to_string()));
}

#[test]
fn it_needs_an_upload_path() {
    let cmd = SlashCommand::parse("/upload").unwrap();
    assert!(cmd.is_upload());
    assert_eq!(cmd.upload_path(), None);
}
