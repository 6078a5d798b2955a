// conn_cmds.rs - connection commands
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

use super::*;

const SERVER_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

impl super::MainState {
    pub(super) async fn process_pass<'a>(
        &self,
        conn_state: &mut ConnState,
        pass: &'a str,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        conn_state.user_state.password = Some(pass.to_string());
        Ok(())
    }

    pub(super) async fn process_nick<'a>(
        &self,
        conn_state: &mut ConnState,
        nick: &'a str,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        if let Some(owner) = self.registry.lookup(nick).await {
            if owner.conn_id != conn_state.id {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNicknameInUse433 { client: "*", nick },
                )
                .await?;
                return Ok(());
            }
        }
        if !validate_nickname(nick) {
            self.feed_msg(
                &mut conn_state.stream,
                ErrErroneusNickname432 { client: "*", nick },
            )
            .await?;
            return Ok(());
        }

        // registry is not locked while waiting for provider.
        let principal = match self
            .auth
            .authenticate(nick, conn_state.user_state.password.as_deref())
            .await
        {
            Some(principal) => principal,
            None => {
                info!(
                    "Authentication failed for {} from {}",
                    nick, conn_state.user_state.ip_addr
                );
                self.feed_msg(&mut conn_state.stream, ErrPasswdMismatch464 {})
                    .await?;
                return Ok(());
            }
        };

        if !self.registry.claim(nick, conn_state.id).await {
            // other connection took nick during authentication.
            self.feed_msg(
                &mut conn_state.stream,
                ErrNicknameInUse433 { client: "*", nick },
            )
            .await?;
            return Ok(());
        }
        if let Some(old_nick) = conn_state.user_state.nick.take() {
            if !old_nick.eq_ignore_ascii_case(nick) {
                self.registry.release(&old_nick, conn_state.id).await;
            }
        }
        info!(
            "User {} authenticated as account {}",
            nick, principal.account
        );
        conn_state.user_state.set_nick(nick.to_string());
        conn_state.user_state.account = Some(principal.account);
        self.try_complete_registration(conn_state).await
    }

    pub(super) async fn process_user<'a>(
        &self,
        conn_state: &mut ConnState,
        username: &'a str,
        _: &'a str,
        _: &'a str,
        realname: &'a str,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        conn_state.user_state.set_name(username.to_string());
        conn_state.user_state.realname = Some(realname.to_string());
        self.try_complete_registration(conn_state).await
    }

    // finish registration if nick and username are set.
    async fn try_complete_registration(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        if conn_state.is_registered() || !conn_state.user_state.can_register() {
            return Ok(());
        }
        let nick = match conn_state.user_state.nick.clone() {
            Some(nick) => nick,
            None => return Ok(()),
        };
        self.registry.mark_registered(&nick, conn_state.id).await;
        conn_state.registration = RegistrationState::Registered;
        conn_state.user_state.password = None;
        info!(
            "User {} ({}) registered (account {})",
            conn_state.user_state.source,
            conn_state.user_state.realname.as_deref().unwrap_or_default(),
            conn_state.user_state.account.as_deref().unwrap_or("*")
        );

        let client = nick.as_str();
        self.feed_msg(&mut conn_state.stream, RplWelcome001 { client })
            .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplYourHost002 {
                client,
                servername: &self.config.name,
                version: SERVER_VERSION,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplCreated003 {
                client,
                datetime: &self.created,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplMyInfo004 {
                client,
                servername: &self.config.name,
                version: SERVER_VERSION,
                avail_user_modes: &self.config.user_modes,
                avail_chmodes: &self.config.channel_modes,
            },
        )
        .await?;

        self.process_lusers(conn_state).await?;
        self.process_motd(conn_state, None).await
    }

    pub(super) async fn process_ping<'a>(
        &self,
        conn_state: &mut ConnState,
        token: &'a str,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        self.feed_msg(
            &mut conn_state.stream,
            format!("PONG {} :{}", self.config.name, token),
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_quit<'a>(
        &self,
        conn_state: &mut ConnState,
        reason: Option<&'a str>,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        let reason = match reason {
            Some(r) if !r.is_empty() => r,
            _ => "Client quit",
        };
        conn_state.user_state.quit_reason = reason.to_string();
        conn_state.quit = true;
        info!("User {} quit: {}", conn_state.user_state.source, reason);
        conn_state
            .stream
            .feed(format!("ERROR :{}", reason))
            .await?;
        Ok(())
    }
}
