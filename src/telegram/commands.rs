//! Command parsing
//!
//! Maps the first token of a text message to a [`Command`] with its
//! arguments already parsed. Unknown slash commands are not an error; they
//! fall through to the echo path of the dispatcher.

use thiserror::Error;

pub const HELP_TEXT: &str = "\
tgdrop downloads the files you forward to it.

Send or forward any photo, document, audio or video and it is queued.
Files are sorted by extension:
  .mp3 .flac -> mp3/
  .pdf .cbr -> pdf/
  .jpg -> jpg/
  .torrent -> torrent watch folder
  anything else -> completed/

/folder NAME or #NAME - put the next batch into completed/NAME
/sendfiles - send back everything in sendFiles/
/id - show this chat's id
/version - show the bot version
/autostatus - auto scan state
/autoadd GROUP_ID - monitor a group
/autoremove GROUP_ID - stop monitoring a group";

pub const LICENSE_TEXT: &str = "\
tgdrop is free software: you can redistribute it and/or modify it under the \
terms of the MIT license. It is distributed in the hope that it will be \
useful, but WITHOUT ANY WARRANTY.

Send /help to see what the bot can do.";

/// Commands served synchronously by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Start,
    Version,
    Id,
    AutoStatus,
    AutoAdd(i64),
    AutoRemove(i64),
}

/// Argument problems, reported back to the user as text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Missing argument. Usage: {usage}")]
    MissingArgument { usage: &'static str },

    #[error("Invalid argument {value:?}. Usage: {usage}")]
    InvalidArgument { value: String, usage: &'static str },
}

/// Platform command list: (command, description)
pub const COMMAND_LIST: &[(&str, &str)] = &[
    ("help", "how to use the bot"),
    ("start", "license and welcome"),
    ("folder", "download the next batch into a named folder"),
    ("sendfiles", "send back the files in the outbox"),
    ("id", "show the chat id"),
    ("version", "show the bot version"),
    ("autostatus", "auto scan state"),
    ("autoadd", "monitor a group for large files"),
    ("autoremove", "stop monitoring a group"),
];

impl Command {
    /// Parses a message text.
    ///
    /// `Ok(None)` means the text is not one of these commands.
    pub fn parse(text: &str) -> Result<Option<Self>, CommandError> {
        let mut tokens = text.split_whitespace();
        let Some(head) = tokens.next() else {
            return Ok(None);
        };
        if !head.starts_with('/') {
            return Ok(None);
        }

        // "/cmd@botname" in groups
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let args: Vec<&str> = tokens.collect();

        let command = match name.as_str() {
            "/help" | "/ayuda" => Command::Help,
            "/start" => Command::Start,
            "/version" => Command::Version,
            "/id" => Command::Id,
            "/autostatus" => Command::AutoStatus,
            "/autoadd" => Command::AutoAdd(group_id(&args, "/autoadd GROUP_ID")?),
            "/autoremove" => Command::AutoRemove(group_id(&args, "/autoremove GROUP_ID")?),
            _ => return Ok(None),
        };

        Ok(Some(command))
    }
}

fn group_id(args: &[&str], usage: &'static str) -> Result<i64, CommandError> {
    let raw = args.first().ok_or(CommandError::MissingArgument { usage })?;
    raw.parse().map_err(|_| CommandError::InvalidArgument {
        value: raw.to_string(),
        usage,
    })
}

pub fn version_text() -> String {
    format!("tgdrop {}", env!("CARGO_PKG_VERSION"))
}
