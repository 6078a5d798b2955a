// structs.rs - main state structures
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

use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::RwLock;
use unicase::Ascii;
use uuid::Uuid;

use crate::utils::*;

/// Selects the command table used for a connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RegistrationState {
    Unregistered,
    Registered,
}

#[derive(Debug)]
pub(crate) struct UserState {
    pub(crate) ip_addr: IpAddr,
    pub(crate) hostname: String,
    pub(crate) source: String,
    pub(crate) nick: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) realname: Option<String>,
    // password from PASS, kept until registration.
    pub(crate) password: Option<String>,
    pub(crate) account: Option<String>,
    pub(crate) quit_reason: String,
}

impl UserState {
    pub(crate) fn new(ip_addr: IpAddr) -> UserState {
        UserState {
            ip_addr,
            hostname: ip_addr.to_string(),
            source: format!("@{}", ip_addr),
            nick: None,
            name: None,
            realname: None,
            password: None,
            account: None,
            quit_reason: String::new(),
        }
    }

    pub(crate) fn client_name(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    fn update_source(&mut self) {
        let mut s = String::new();
        if let Some(ref nick) = self.nick {
            s.push_str(nick);
        }
        if let Some(ref name) = self.name {
            s.push_str("!~");
            s.push_str(name);
        }
        s.push('@');
        s.push_str(&self.hostname);
        self.source = s;
    }

    pub(crate) fn set_nick(&mut self, nick: String) {
        self.nick = Some(nick);
        self.update_source();
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
        self.update_source();
    }

    // registration can finish when nick and username are known.
    pub(crate) fn can_register(&self) -> bool {
        self.nick.is_some() && self.name.is_some()
    }
}

pub(crate) struct ConnState {
    pub(crate) id: Uuid,
    pub(crate) stream: BufferedLineStream,
    pub(crate) user_state: UserState,
    pub(crate) registration: RegistrationState,
    pub(crate) quit: bool,
}

impl ConnState {
    pub(crate) fn new(ip_addr: IpAddr, stream: BufferedLineStream) -> ConnState {
        ConnState {
            id: Uuid::new_v4(),
            stream,
            user_state: UserState::new(ip_addr),
            registration: RegistrationState::Unregistered,
            quit: false,
        }
    }

    pub(crate) fn is_quit(&self) -> bool {
        self.quit
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.registration == RegistrationState::Registered
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NickOwner {
    pub(crate) conn_id: Uuid,
    pub(crate) registered: bool,
}

/// Live nicknames of the server. Nicknames compare with ASCII casemapping.
/// `claim` is an atomic check-and-set.
#[derive(Debug, Default)]
pub(crate) struct NickRegistry {
    nicks: RwLock<HashMap<Ascii<String>, NickOwner>>,
}

impl NickRegistry {
    pub(crate) async fn lookup(&self, nick: &str) -> Option<NickOwner> {
        self.nicks
            .read()
            .await
            .get(&Ascii::new(nick.to_string()))
            .copied()
    }

    // returns false if nick is held by other connection.
    pub(crate) async fn claim(&self, nick: &str, conn_id: Uuid) -> bool {
        let mut nicks = self.nicks.write().await;
        let key = Ascii::new(nick.to_string());
        match nicks.get(&key) {
            Some(owner) => owner.conn_id == conn_id,
            None => {
                nicks.insert(
                    key,
                    NickOwner {
                        conn_id,
                        registered: false,
                    },
                );
                true
            }
        }
    }

    // release nick only if it is held by given connection.
    pub(crate) async fn release(&self, nick: &str, conn_id: Uuid) -> bool {
        let mut nicks = self.nicks.write().await;
        let key = Ascii::new(nick.to_string());
        if nicks.get(&key).is_some_and(|o| o.conn_id == conn_id) {
            nicks.remove(&key);
            true
        } else {
            false
        }
    }

    pub(crate) async fn mark_registered(&self, nick: &str, conn_id: Uuid) {
        let mut nicks = self.nicks.write().await;
        if let Some(owner) = nicks.get_mut(&Ascii::new(nick.to_string())) {
            if owner.conn_id == conn_id {
                owner.registered = true;
            }
        }
    }

    pub(crate) async fn registered_count(&self) -> usize {
        self.nicks
            .read()
            .await
            .values()
            .filter(|o| o.registered)
            .count()
    }
}
