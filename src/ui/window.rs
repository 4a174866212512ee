use anyhow::Result;
use chrono::Local;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::app::{App, AppMsg};
use crate::config::APP_NAME;
use crate::ui::input_area::{self, ChatRef, InputAreaOutput};
use crate::ui::{chat_view, sidebar};

/// Best-effort guess at a dark terminal background from `COLORFGBG`.
fn system_prefers_dark() -> bool {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|v| v.rsplit(';').next().and_then(|bg| bg.parse::<u8>().ok()))
        .is_some_and(|bg| bg < 7 || bg == 8)
}

fn resolve_chat(app: &App, target: &ChatRef) -> Option<String> {
    match target {
        ChatRef::Index(n) => n
            .checked_sub(1)
            .and_then(|idx| app.conversations().get(idx))
            .map(|c| c.id.clone()),
        ChatRef::Id(id) => Some(id.clone()),
    }
}

fn header(app: &App) -> String {
    let title = app
        .active_conversation()
        .map(|c| c.title.as_str())
        .unwrap_or("No conversation");
    let who = app
        .current_user()
        .map(|u| u.username.as_str())
        .unwrap_or("signed out");
    let mode = app.settings().theme_mode;
    let palette = if mode.is_dark(system_prefers_dark()) {
        "dark"
    } else {
        "light"
    };
    format!(
        "== {APP_NAME} | {title} | {who} | {palette} theme ({}) ==",
        mode.as_str()
    )
}

fn render_chat(app: &App) -> String {
    format!(
        "{}\n{}",
        header(app),
        chat_view::render(&app.visible_messages(), app.current_user(), app.search_query())
    )
}

enum Action {
    Dispatch(AppMsg),
    Print(String),
    Quit,
}

/// Translate a parsed input line into an app message, or handle it locally.
fn action_for(app: &App, input: InputAreaOutput) -> Action {
    match input {
        InputAreaOutput::Send(text) => Action::Dispatch(AppMsg::SendMessage(text)),
        InputAreaOutput::NewChat => Action::Dispatch(AppMsg::NewChat),
        InputAreaOutput::ListChats => Action::Print(sidebar::render(
            app.conversations(),
            app.active_conversation().map(|c| c.id.as_str()),
            &Local::now(),
        )),
        InputAreaOutput::Open(target) => match resolve_chat(app, &target) {
            Some(id) => Action::Dispatch(AppMsg::ConversationSelected(id)),
            None => Action::Print("No such conversation.".to_string()),
        },
        InputAreaOutput::Delete(None) => Action::Dispatch(AppMsg::ClearChat),
        InputAreaOutput::Delete(Some(target)) => match resolve_chat(app, &target) {
            Some(id) => Action::Dispatch(AppMsg::DeleteConversation(id)),
            None => Action::Print("No such conversation.".to_string()),
        },
        InputAreaOutput::Search(query) => Action::Dispatch(AppMsg::Search(query)),
        InputAreaOutput::Theme(Some(mode)) => Action::Dispatch(AppMsg::SetTheme(mode)),
        InputAreaOutput::Theme(None) => Action::Dispatch(AppMsg::ToggleTheme {
            system_prefers_dark: system_prefers_dark(),
        }),
        InputAreaOutput::SignUp {
            username,
            email,
            password,
        } => Action::Dispatch(AppMsg::SignUp {
            username,
            email,
            password,
        }),
        InputAreaOutput::LogIn { username, password } => {
            Action::Dispatch(AppMsg::LogIn { username, password })
        }
        InputAreaOutput::LogOut => Action::Dispatch(AppMsg::LogOut),
        InputAreaOutput::Profile(update) => Action::Dispatch(AppMsg::UpdateProfile(update)),
        InputAreaOutput::DeleteAllChats => Action::Dispatch(AppMsg::DeleteAllChats),
        InputAreaOutput::DeleteAccount => Action::Dispatch(AppMsg::DeleteAccount),
        InputAreaOutput::Help => Action::Print(input_area::HELP.to_string()),
        InputAreaOutput::Quit => Action::Quit,
        InputAreaOutput::Usage(usage) => Action::Print(format!("Usage: {usage}")),
    }
}

/// Drive the app from stdin until EOF or `/quit`.
pub async fn run(mut app: App) -> Result<()> {
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    stdout
        .write_all(format!("{}\nType /help for commands.\n> ", render_chat(&app)).as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let output = match action_for(&app, input_area::parse_line(&line)) {
            Action::Quit => break,
            Action::Print(text) => text,
            Action::Dispatch(msg) => {
                if matches!(msg, AppMsg::SendMessage(ref text) if !text.trim().is_empty()) {
                    stdout.write_all(format!("{}\n", chat_view::THINKING).as_bytes()).await?;
                    stdout.flush().await?;
                }
                app.update(msg).await;
                match app.take_toast() {
                    Some(toast) => format!("{}\n! {toast}", render_chat(&app)),
                    None => render_chat(&app),
                }
            }
        };

        stdout.write_all(format!("{output}\n> ").as_bytes()).await?;
        stdout.flush().await?;
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
