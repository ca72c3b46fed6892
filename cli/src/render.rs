//! Turns view commands into terminal lines.
//!
//! A terminal cannot scroll back, so "open panel" means messages are
//! printed as they arrive and "closed panel" means only the unread badge
//! changes. Opening the panel prints whatever was held back.

use chat_client::{ConnectionState, SendRejection, SessionView, ViewCommand};
use frames::ChatMessage;
use time::macros::format_description;

#[derive(Debug, Default)]
pub struct TerminalView {
    printed: usize,
    generation: u64,
    connection: Option<ConnectionState>,
    unread: u32,
    indicator: bool,
}

impl TerminalView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for one command.
    pub fn apply(&mut self, command: &ViewCommand) -> Vec<String> {
        match command {
            ViewCommand::Render(view) => self.render(view),
            ViewCommand::ScrollToBottom => Vec::new(),
            ViewCommand::Notice(rejection) => vec![notice(rejection)],
        }
    }

    fn render(&mut self, view: &SessionView) -> Vec<String> {
        let mut lines = Vec::new();

        if self.connection != Some(view.connection) {
            self.connection = Some(view.connection);
            lines.push(
                match view.connection {
                    ConnectionState::Connecting => "[connecting]",
                    ConnectionState::Connected => "[connected]",
                    ConnectionState::Disconnected => "[disconnected, retrying]",
                }
                .to_owned(),
            );
        }

        if view.log_generation != self.generation {
            self.generation = view.log_generation;
            if self.printed > 0 && view.is_open {
                lines.push("[history reloaded]".to_owned());
            }
            self.printed = 0;
        }

        if view.is_open {
            let fresh = view.messages.get(self.printed..).unwrap_or_default();
            lines.extend(fresh.iter().map(format_message));
            self.printed = view.messages.len();
        } else if view.unread_count != self.unread && view.unread_count > 0 {
            lines.push(format!("[{} unread, /open to read]", view.unread_count));
        }
        self.unread = view.unread_count;

        if view.new_message_indicator && !self.indicator {
            lines.push("[new message, /latest to jump]".to_owned());
        }
        self.indicator = view.new_message_indicator;

        lines
    }
}

#[must_use]
pub fn format_message(message: &ChatMessage) -> String {
    let clock = message
        .created_at
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_default();
    format!("{clock} {}: {}", message.nick_name, message.message)
}

fn notice(rejection: &SendRejection) -> String {
    match rejection {
        SendRejection::Disconnected => "[not sent: offline, /retry once reconnected]".to_owned(),
        SendRejection::PanelClosed => "[not sent: chat is closed, /open first]".to_owned(),
        SendRejection::TermsNotAgreed => "[not sent: /agree to the chat rules first]".to_owned(),
        SendRejection::Server { code, message } => format!("[rejected {code}: {message}]"),
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
