// reply.rs - replies
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

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Reply<'a> {
    RplWelcome001 {
        client: &'a str,
    },
    RplYourHost002 {
        client: &'a str,
        servername: &'a str,
        version: &'a str,
    },
    RplCreated003 {
        client: &'a str,
        datetime: &'a str,
    },
    RplMyInfo004 {
        client: &'a str,
        servername: &'a str,
        version: &'a str,
        avail_user_modes: &'a str,
        avail_chmodes: &'a str,
    },
    RplLUserClient251 {
        client: &'a str,
        users_num: usize,
        invisible_num: usize,
        servers_num: usize,
    },
    RplLUserUnknown253 {
        client: &'a str,
        connections_num: usize,
    },
    RplLUserChannels254 {
        client: &'a str,
        channels_num: usize,
    },
    RplLUserMe255 {
        client: &'a str,
        clients_num: usize,
        servers_num: usize,
    },
    RplMotd372 {
        client: &'a str,
        motd: &'a str,
    },
    RplMotdStart375 {
        client: &'a str,
        server: &'a str,
    },
    RplEndOfMotd376 {
        client: &'a str,
    },
    ErrInputTooLong417 {
        client: &'a str,
    },
    ErrUnknownCommand421 {
        client: &'a str,
        command: &'a str,
    },
    ErrNoMotd422 {
        client: &'a str,
    },
    ErrNoNicknameGiven431 {},
    ErrErroneusNickname432 {
        client: &'a str,
        nick: &'a str,
    },
    ErrNicknameInUse433 {
        client: &'a str,
        nick: &'a str,
    },
    ErrNotRegistered451 {
        client: &'a str,
    },
    ErrNeedMoreParams461 {
        client: &'a str,
        command: &'a str,
    },
    ErrAlreadyRegistered462 {
        client: &'a str,
    },
    ErrPasswdMismatch464 {},
}

use Reply::*;

impl<'a> fmt::Display for Reply<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RplWelcome001 { client } => write!(f, "001 {} :Hi, welcome to IRC", client),
            RplYourHost002 {
                client,
                servername,
                version,
            } => write!(
                f,
                "002 {} :Your host is {}, running version {}",
                client, servername, version
            ),
            RplCreated003 { client, datetime } => {
                write!(f, "003 {} :This server was created {}", client, datetime)
            }
            RplMyInfo004 {
                client,
                servername,
                version,
                avail_user_modes,
                avail_chmodes,
            } => write!(
                f,
                "004 {} {} {} {} {}",
                client, servername, version, avail_user_modes, avail_chmodes
            ),
            RplLUserClient251 {
                client,
                users_num,
                invisible_num,
                servers_num,
            } => write!(
                f,
                "251 {} :There are {} users and {} invisible on {} servers",
                client, users_num, invisible_num, servers_num
            ),
            RplLUserUnknown253 {
                client,
                connections_num,
            } => write!(
                f,
                "253 {} {} :unknown connection(s)",
                client, connections_num
            ),
            RplLUserChannels254 {
                client,
                channels_num,
            } => write!(f, "254 {} {} :channels formed", client, channels_num),
            RplLUserMe255 {
                client,
                clients_num,
                servers_num,
            } => write!(
                f,
                "255 {} :I have {} clients and {} servers",
                client, clients_num, servers_num
            ),
            RplMotd372 { client, motd } => write!(f, "372 {} :- {}", client, motd),
            RplMotdStart375 { client, server } => {
                write!(f, "375 {} :- {} Message of the day -", client, server)
            }
            RplEndOfMotd376 { client } => write!(f, "376 {} :End of /MOTD command", client),
            ErrInputTooLong417 { client } => write!(f, "417 {} :Input line was too long", client),
            ErrUnknownCommand421 { client, command } => {
                write!(f, "421 {} {} :Unknown command", client, command)
            }
            ErrNoMotd422 { client } => write!(f, "422 {} :MOTD File is missing", client),
            ErrNoNicknameGiven431 {} => write!(f, "431 :No nickname given"),
            ErrErroneusNickname432 { client, nick } => {
                write!(f, "432 {} {} :Erroneous nickname", client, nick)
            }
            ErrNicknameInUse433 { client, nick } => {
                write!(f, "433 {} {} :Nickname is already in use", client, nick)
            }
            ErrNotRegistered451 { client } => write!(f, "451 {} :You have not registered", client),
            ErrNeedMoreParams461 { client, command } => {
                write!(f, "461 {} {} :Not enough parameters", client, command)
            }
            ErrAlreadyRegistered462 { client } => {
                write!(f, "462 {} :You may not reregister", client)
            }
            ErrPasswdMismatch464 {} => write!(f, "464 :Password incorrect"),
        }
    }
}
