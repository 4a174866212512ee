use crate::services::accounts::ProfileUpdate;
use crate::services::settings::ThemeMode;

/// A conversation as the user names it: its position in the list or its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Index(usize),
    Id(String),
}

impl ChatRef {
    fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(n) => ChatRef::Index(n),
            Err(_) => ChatRef::Id(arg.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum InputAreaOutput {
    Send(String),
    NewChat,
    ListChats,
    Open(ChatRef),
    /// Delete the named conversation, or the active one.
    Delete(Option<ChatRef>),
    Search(String),
    /// Set a theme, or toggle when none is given.
    Theme(Option<ThemeMode>),
    SignUp {
        username: String,
        email: String,
        password: String,
    },
    LogIn {
        username: String,
        password: String,
    },
    LogOut,
    Profile(ProfileUpdate),
    DeleteAllChats,
    DeleteAccount,
    Help,
    Quit,
    Usage(&'static str),
}

pub const HELP: &str = "\
Type a message and press Enter to send it.

  /new                          start a new conversation
  /chats                        list conversations
  /open <n|id>                  switch conversation
  /delete [n|id]                delete a conversation (default: current)
  /search [text]                filter messages; no text clears the filter
  /theme [light|dark|system]    set or toggle the theme
  /signup <user> <email> <password>
  /login <user> <password>
  /logout
  /profile name=.. email=.. phone=.. image=..
  /delete-all                   delete every conversation
  /delete-account               delete the account and all conversations
  /help
  /quit";

/// Interpret one line typed at the prompt.
///
/// Lines that do not start with `/` are messages; a leading `//` sends a
/// literal slash.
pub fn parse_line(line: &str) -> InputAreaOutput {
    let trimmed = line.trim();
    if let Some(literal) = trimmed.strip_prefix("//") {
        return InputAreaOutput::Send(format!("/{literal}"));
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return InputAreaOutput::Send(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((command, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();

    match (name, args.as_slice()) {
        ("new", []) => InputAreaOutput::NewChat,
        ("chats", []) => InputAreaOutput::ListChats,
        ("open", [target]) => InputAreaOutput::Open(ChatRef::parse(target)),
        ("open", _) => InputAreaOutput::Usage("/open <n|id>"),
        ("delete", []) => InputAreaOutput::Delete(None),
        ("delete", [target]) => InputAreaOutput::Delete(Some(ChatRef::parse(target))),
        ("delete", _) => InputAreaOutput::Usage("/delete [n|id]"),
        ("search", _) => InputAreaOutput::Search(rest.to_string()),
        ("theme", []) => InputAreaOutput::Theme(None),
        ("theme", [mode]) => match ThemeMode::parse(mode) {
            Some(mode) => InputAreaOutput::Theme(Some(mode)),
            None => InputAreaOutput::Usage("/theme [light|dark|system]"),
        },
        ("signup", [username, email, password]) => InputAreaOutput::SignUp {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        },
        ("signup", _) => InputAreaOutput::Usage("/signup <user> <email> <password>"),
        ("login", [username, password]) => InputAreaOutput::LogIn {
            username: username.to_string(),
            password: password.to_string(),
        },
        ("login", _) => InputAreaOutput::Usage("/login <user> <password>"),
        ("logout", []) => InputAreaOutput::LogOut,
        ("profile", fields) if !fields.is_empty() => match parse_profile(fields) {
            Some(update) => InputAreaOutput::Profile(update),
            None => InputAreaOutput::Usage("/profile name=.. email=.. phone=.. image=.."),
        },
        ("profile", _) => InputAreaOutput::Usage("/profile name=.. email=.. phone=.. image=.."),
        ("delete-all", []) => InputAreaOutput::DeleteAllChats,
        ("delete-account", []) => InputAreaOutput::DeleteAccount,
        ("help", _) => InputAreaOutput::Help,
        ("quit" | "exit", _) => InputAreaOutput::Quit,
        _ => InputAreaOutput::Usage("unknown command, try /help"),
    }
}

fn parse_profile(fields: &[&str]) -> Option<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    for field in fields {
        let (key, value) = field.split_once('=')?;
        let value = Some(value.to_string());
        match key {
            "name" => update.name = value,
            "email" => update.email = value,
            "phone" => update.phone_number = value,
            "image" => update.profile_image = value,
            _ => return None,
        }
    }
    Some(update)
}
