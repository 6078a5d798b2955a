// srv_query_cmds.rs - server query commands
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

impl super::MainState {
    pub(super) async fn process_lusers(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        let client = conn_state.user_state.client_name();
        let users_num = self.registry.registered_count().await;
        let connections_num = self
            .conns_count
            .load(Ordering::SeqCst)
            .saturating_sub(users_num);
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserClient251 {
                client,
                users_num,
                invisible_num: 0,
                servers_num: 1,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserUnknown253 {
                client,
                connections_num,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserChannels254 {
                client,
                channels_num: 0,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserMe255 {
                client,
                clients_num: users_num,
                servers_num: 0,
            },
        )
        .await?;
        Ok(())
    }

    // MOTD is read from file on every request.
    pub(super) async fn process_motd<'a>(
        &self,
        conn_state: &mut ConnState,
        target: Option<&'a str>,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        if let Some(target) = target {
            debug!("MOTD target {} ignored", target);
        }
        let client = conn_state.user_state.client_name();
        let motd = match self.config.motd_file {
            Some(ref path) => match tokio::fs::read_to_string(path).await {
                Ok(motd) => Some(motd),
                Err(e) => {
                    warn!("Can't read MOTD file {}: {}", path, e);
                    None
                }
            },
            None => None,
        };

        if let Some(motd) = motd {
            self.feed_msg(
                &mut conn_state.stream,
                RplMotdStart375 {
                    client,
                    server: &self.config.name,
                },
            )
            .await?;
            for line in motd.lines() {
                self.feed_msg(&mut conn_state.stream, RplMotd372 { client, motd: line })
                    .await?;
            }
            self.feed_msg(&mut conn_state.stream, RplEndOfMotd376 { client })
                .await?;
        } else {
            self.feed_msg(&mut conn_state.stream, ErrNoMotd422 { client })
                .await?;
        }
        Ok(())
    }
}
