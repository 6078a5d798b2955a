// command.rs - commands
//
// simple-irc-server - simple IRC server
// Copyright (C) 2022  Mateusz Szpakowski
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use std::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MessageError {
    Empty,
    WrongSource,
    NoCommand,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Empty => write!(f, "Message is empty"),
            MessageError::WrongSource => write!(f, "Wrong source syntax"),
            MessageError::NoCommand => write!(f, "No command in message"),
        }
    }
}

impl Error for MessageError {}

/// Single IRC line split into source, command name and parameters.
/// Parameters borrow from the received line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Message<'a> {
    pub(crate) source: Option<&'a str>,
    pub(crate) command: &'a str,
    pub(crate) params: Vec<&'a str>,
}

impl<'a> Message<'a> {
    pub(crate) fn from_shared_str(input: &'a str) -> Result<Self, MessageError> {
        let trimmed = input.trim_start_matches(' ');
        if trimmed.is_empty() {
            return Err(MessageError::Empty);
        }

        let (source, rest) = if let Some(src_rest) = trimmed.strip_prefix(':') {
            match src_rest.split_once(' ') {
                Some(("", _)) => return Err(MessageError::WrongSource),
                Some((src, rest)) => (Some(src), rest),
                None if src_rest.is_empty() => return Err(MessageError::WrongSource),
                None => return Err(MessageError::NoCommand),
            }
        } else {
            (None, trimmed)
        };

        let rest = rest.trim_start_matches(' ');
        let (command, mut rest) = match rest.split_once(' ') {
            Some((cmd, r)) => (cmd, r),
            None => (rest, ""),
        };
        if command.is_empty() {
            return Err(MessageError::NoCommand);
        }

        let mut params = vec![];
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing);
                break;
            }
            match rest.split_once(' ') {
                Some((param, r)) => {
                    params.push(param);
                    rest = r;
                }
                None => {
                    params.push(rest);
                    break;
                }
            }
        }

        Ok(Message {
            source,
            command,
            params,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CommandError {
    UnknownCommand(String),
    NeedMoreParams(&'static str),
    NoNicknameGiven,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::UnknownCommand(s) => write!(f, "Unknown command '{}'", s),
            CommandError::NeedMoreParams(s) => {
                write!(f, "Command '{}' needs more parameters", s)
            }
            CommandError::NoNicknameGiven => write!(f, "No nickname given"),
        }
    }
}

impl Error for CommandError {}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command<'a> {
    PASS {
        password: &'a str,
    },
    NICK {
        nickname: &'a str,
    },
    USER {
        username: &'a str,
        hostname: &'a str,
        servername: &'a str,
        realname: &'a str,
    },
    QUIT {
        reason: Option<&'a str>,
    },
    PING {
        token: &'a str,
    },
    PONG {
        token: &'a str,
    },
    LUSERS {},
    MOTD {
        target: Option<&'a str>,
    },
}

use Command::*;

// commands that can be issued by a connection that is not registered.
const REGISTRATION_COMMANDS: [&str; 4] = ["PASS", "NICK", "USER", "QUIT"];

pub(crate) fn is_registration_command(name: &str) -> bool {
    REGISTRATION_COMMANDS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(name))
}

impl<'a> Command<'a> {
    pub(crate) fn from_message(message: &Message<'a>) -> Result<Self, CommandError> {
        let params = &message.params;
        match message.command.to_ascii_uppercase().as_str() {
            "PASS" => match params.first().copied() {
                Some(password) => Ok(PASS { password }),
                None => Err(CommandError::NeedMoreParams("PASS")),
            },
            "NICK" => match params.first().copied() {
                Some(nickname) => Ok(NICK { nickname }),
                None => Err(CommandError::NoNicknameGiven),
            },
            "USER" => {
                if params.len() >= 4 {
                    Ok(USER {
                        username: params[0],
                        hostname: params[1],
                        servername: params[2],
                        realname: params[3],
                    })
                } else {
                    Err(CommandError::NeedMoreParams("USER"))
                }
            }
            "QUIT" => Ok(QUIT {
                reason: params.first().copied(),
            }),
            "PING" => match params.first().copied() {
                Some(token) => Ok(PING { token }),
                None => Err(CommandError::NeedMoreParams("PING")),
            },
            "PONG" => Ok(PONG {
                token: params.first().copied().unwrap_or_default(),
            }),
            "LUSERS" => Ok(LUSERS {}),
            "MOTD" => Ok(MOTD {
                target: params.first().copied(),
            }),
            _ => Err(CommandError::UnknownCommand(message.command.to_string())),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            PASS { .. } => "PASS",
            NICK { .. } => "NICK",
            USER { .. } => "USER",
            QUIT { .. } => "QUIT",
            PING { .. } => "PING",
            PONG { .. } => "PONG",
            LUSERS {} => "LUSERS",
            MOTD { .. } => "MOTD",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_message_from_shared_str() {
        assert_eq!(
            Ok(Message {
                source: None,
                command: "NICK",
                params: vec!["alice"]
            }),
            Message::from_shared_str("NICK alice")
        );
        assert_eq!(
            Ok(Message {
                source: None,
                command: "USER",
                params: vec!["alice", "0", "*", "Alice A."]
            }),
            Message::from_shared_str("USER alice 0 *  :Alice A.")
        );
        assert_eq!(
            Ok(Message {
                source: Some("alice!~alice@host"),
                command: "QUIT",
                params: vec![""]
            }),
            Message::from_shared_str(":alice!~alice@host QUIT :")
        );
        assert_eq!(
            Ok(Message {
                source: None,
                command: "LUSERS",
                params: vec![]
            }),
            Message::from_shared_str("  LUSERS   ")
        );
        assert_eq!(
            Ok(Message {
                source: None,
                command: "PRIVMSG",
                params: vec!["#chan", "hello : world"]
            }),
            Message::from_shared_str("PRIVMSG #chan :hello : world")
        );
    }

    #[test]
    fn test_message_from_shared_str_errors() {
        assert_eq!(Err(MessageError::Empty), Message::from_shared_str(""));
        assert_eq!(Err(MessageError::Empty), Message::from_shared_str("   "));
        assert_eq!(Err(MessageError::WrongSource), Message::from_shared_str(":"));
        assert_eq!(
            Err(MessageError::WrongSource),
            Message::from_shared_str(": NICK alice")
        );
        assert_eq!(
            Err(MessageError::NoCommand),
            Message::from_shared_str(":source")
        );
        assert_eq!(
            Err(MessageError::NoCommand),
            Message::from_shared_str(":source   ")
        );
    }

    #[test]
    fn test_command_from_message() {
        let msg = Message::from_shared_str("PASS secret").unwrap();
        assert_eq!(Ok(PASS { password: "secret" }), Command::from_message(&msg));
        let msg = Message::from_shared_str("nick alice").unwrap();
        assert_eq!(Ok(NICK { nickname: "alice" }), Command::from_message(&msg));
        let msg = Message::from_shared_str("USER alice 0 * :Alice A.").unwrap();
        assert_eq!(
            Ok(USER {
                username: "alice",
                hostname: "0",
                servername: "*",
                realname: "Alice A."
            }),
            Command::from_message(&msg)
        );
        let msg = Message::from_shared_str("QUIT :bye").unwrap();
        assert_eq!(Ok(QUIT { reason: Some("bye") }), Command::from_message(&msg));
        let msg = Message::from_shared_str("QUIT").unwrap();
        assert_eq!(Ok(QUIT { reason: None }), Command::from_message(&msg));
        let msg = Message::from_shared_str("PING :tok").unwrap();
        assert_eq!(Ok(PING { token: "tok" }), Command::from_message(&msg));
        let msg = Message::from_shared_str("MOTD").unwrap();
        assert_eq!(Ok(MOTD { target: None }), Command::from_message(&msg));
    }

    #[test]
    fn test_command_from_message_errors() {
        let msg = Message::from_shared_str("PASS").unwrap();
        assert_eq!(
            Err(CommandError::NeedMoreParams("PASS")),
            Command::from_message(&msg)
        );
        let msg = Message::from_shared_str("NICK").unwrap();
        assert_eq!(
            Err(CommandError::NoNicknameGiven),
            Command::from_message(&msg)
        );
        let msg = Message::from_shared_str("USER alice 0 *").unwrap();
        assert_eq!(
            Err(CommandError::NeedMoreParams("USER")),
            Command::from_message(&msg)
        );
        let msg = Message::from_shared_str("JOIN #rust").unwrap();
        assert_eq!(
            Err(CommandError::UnknownCommand("JOIN".to_string())),
            Command::from_message(&msg)
        );
    }

    #[test]
    fn test_is_registration_command() {
        assert!(is_registration_command("PASS"));
        assert!(is_registration_command("nick"));
        assert!(is_registration_command("User"));
        assert!(is_registration_command("QUIT"));
        assert!(!is_registration_command("PING"));
        assert!(!is_registration_command("JOIN"));
    }
}
