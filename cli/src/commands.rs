//! Slash commands for the interactive front end.

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub usage: &'static str,
    pub description: &'static str,
}

const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        usage: "/provider <gemini|openai>",
        description: "Switch provider (keeps the current key)",
    },
    CommandSpec {
        usage: "/key [value]",
        description: "Set the API key, or remove it when no value is given",
    },
    CommandSpec {
        usage: "/settings <provider> <key> [light|dark]",
        description: "Save provider, key and theme together",
    },
    CommandSpec {
        usage: "/theme [light|dark]",
        description: "Set or toggle the theme",
    },
    CommandSpec {
        usage: "/attach [path]",
        description: "Attach an image to the next message, or drop the pending one",
    },
    CommandSpec {
        usage: "/expand <block>",
        description: "Show or collapse the hidden lines of a code block",
    },
    CommandSpec {
        usage: "/copy <block>",
        description: "Print the full source of a code block",
    },
    CommandSpec {
        usage: "/status",
        description: "Show provider and key status",
    },
    CommandSpec {
        usage: "/clear",
        description: "Clear the conversation",
    },
    CommandSpec {
        usage: "/quit",
        description: "Exit",
    },
];

#[must_use]
pub fn command_help() -> String {
    let width = COMMAND_SPECS
        .iter()
        .map(|spec| spec.usage.len())
        .max()
        .unwrap_or(0);
    COMMAND_SPECS
        .iter()
        .map(|spec| format!("  {:<width$}  {}", spec.usage, spec.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parsed command with borrowed arguments. `raw` excludes the leading `/`.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Quit,
    Clear,
    Help,
    Status,
    Provider(Option<&'a str>),
    Key(Option<&'a str>),
    Settings {
        provider: Option<&'a str>,
        key: Option<&'a str>,
        theme: Option<&'a str>,
    },
    Theme(Option<&'a str>),
    /// Path is the rest of the line, so it may contain spaces.
    Attach(Option<&'a str>),
    Expand(Option<&'a str>),
    Copy(Option<&'a str>),
    Unknown(&'a str),
    Empty,
}

impl<'a> Command<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        let (name, rest) = match raw.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (raw, ""),
        };
        let rest_arg = (!rest.is_empty()).then_some(rest);
        let mut args = rest.split_whitespace();

        match name {
            "" => Command::Empty,
            "q" | "quit" | "exit" => Command::Quit,
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "status" => Command::Status,
            "provider" | "p" => Command::Provider(args.next()),
            "key" => Command::Key(args.next()),
            "settings" => Command::Settings {
                provider: args.next(),
                key: args.next(),
                theme: args.next(),
            },
            "theme" => Command::Theme(args.next()),
            "attach" => Command::Attach(rest_arg),
            "expand" => Command::Expand(args.next()),
            "copy" => Command::Copy(args.next()),
            other => Command::Unknown(other),
        }
    }
}
