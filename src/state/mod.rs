// mod.rs - main state
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

use chrono::prelude::*;
use futures::SinkExt;
use std::error::Error as StdError;
use std::fmt;
use std::fs::File;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::codec::{Framed, LinesCodecError};
use tracing::*;

use crate::auth::{AuthGate, IdentityProvider};
use crate::command::*;
use crate::config::*;
use crate::reply::*;
use crate::utils::*;

use Reply::*;

mod structs;
pub(crate) use structs::*;

pub(crate) struct MainState {
    config: MainConfig,
    auth: AuthGate,
    registry: NickRegistry,
    // all live connections, registered or not.
    conns_count: AtomicUsize,
    created: String,
    quit_senders: Mutex<Vec<oneshot::Sender<String>>>,
}

impl MainState {
    pub(crate) fn new_from_config(
        config: MainConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> MainState {
        let auth = AuthGate::new(
            provider,
            Duration::from_millis(config.auth_timeout_ms),
            config.auth_max_pending,
        );
        MainState {
            config,
            auth,
            registry: NickRegistry::default(),
            conns_count: AtomicUsize::new(0),
            created: Local::now().to_rfc2822(),
            quit_senders: Mutex::new(vec![]),
        }
    }

    fn register_conn_state(&self, ip_addr: IpAddr, stream: TcpStream) -> ConnState {
        let current = self.conns_count.fetch_add(1, Ordering::SeqCst);
        info!("New connection from {} (total: {})", ip_addr, current + 1);
        ConnState::new(
            ip_addr,
            Framed::new(stream, IRCLinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
        )
    }

    async fn remove_conn_state(&self, conn_state: &ConnState) {
        if let Some(ref nick) = conn_state.user_state.nick {
            self.registry.release(nick, conn_state.id).await;
        }
        self.conns_count.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) async fn process(&self, conn_state: &mut ConnState) -> Result<(), String> {
        // use conversion error to string to avoid problems with thread safety
        let res = self
            .process_internal(conn_state)
            .await
            .map_err(|e| e.to_string());
        SinkExt::<String>::flush(&mut conn_state.stream)
            .await
            .map_err(|e| e.to_string())?;
        res
    }

    async fn register_quit_receiver(&self) -> oneshot::Receiver<String> {
        let (sender, receiver) = oneshot::channel();
        self.quit_senders.lock().await.push(sender);
        receiver
    }

    // stop all listeners.
    pub(crate) async fn quit(&self, msg: &str) {
        for sender in self.quit_senders.lock().await.drain(..) {
            let _ = sender.send(msg.to_string());
        }
    }

    async fn process_internal(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        let msg_str = match conn_state.stream.next().await {
            Some(Ok(msg_str)) => msg_str,
            Some(Err(e)) => {
                conn_state.user_state.quit_reason = e.to_string();
                return Err(Box::new(e));
            }
            None => {
                conn_state.user_state.quit_reason = "Unexpected eof".to_string();
                conn_state.quit = true;
                return Err(Box::new(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "unexpected eof",
                )));
            }
        };

        // overlong line is dropped, connection stays.
        if conn_state.stream.codec_mut().take_line_too_long() {
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, ErrInputTooLong417 { client })
                .await?;
            return Ok(());
        }

        // try parse message from this line.
        let msg = match Message::from_shared_str(&msg_str) {
            Ok(msg) => msg,
            Err(MessageError::Empty) => return Ok(()), // ignore empties
            Err(e) => {
                let reason = match e {
                    MessageError::WrongSource => "Wrong source",
                    _ => "No command supplied",
                };
                conn_state.user_state.quit_reason = reason.to_string();
                conn_state
                    .stream
                    .feed(format!("ERROR :{}", reason))
                    .await?;
                return Err(Box::new(e));
            }
        };

        if !conn_state.is_registered() && !is_registration_command(msg.command) {
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, ErrNotRegistered451 { client })
                .await?;
            return Ok(());
        }

        let cmd = match Command::from_message(&msg) {
            Ok(cmd) => cmd,
            // handle errors while parsing command.
            Err(e) => {
                let client = conn_state.user_state.client_name();
                match e {
                    CommandError::UnknownCommand(ref command) => {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrUnknownCommand421 { client, command },
                        )
                        .await?
                    }
                    // registered client gets 462 for PASS/USER whatever the params.
                    CommandError::NeedMoreParams("PASS" | "USER")
                        if conn_state.is_registered() =>
                    {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrAlreadyRegistered462 { client },
                        )
                        .await?
                    }
                    CommandError::NeedMoreParams(command) => {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrNeedMoreParams461 { client, command },
                        )
                        .await?
                    }
                    CommandError::NoNicknameGiven => {
                        self.feed_msg(&mut conn_state.stream, ErrNoNicknameGiven431 {})
                            .await?
                    }
                }
                return Ok(());
            }
        };
        debug!("Command from {}: {:?}", conn_state.user_state.source, cmd);

        match conn_state.registration {
            RegistrationState::Unregistered => self.process_unregistered(conn_state, cmd).await,
            RegistrationState::Registered => self.process_registered(conn_state, cmd).await,
        }
    }

    // command table before registration.
    async fn process_unregistered<'a>(
        &self,
        conn_state: &mut ConnState,
        cmd: Command<'a>,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        use Command::*;
        match cmd {
            PASS { password } => self.process_pass(conn_state, password).await,
            NICK { nickname } => self.process_nick(conn_state, nickname).await,
            USER {
                username,
                hostname,
                servername,
                realname,
            } => {
                self.process_user(conn_state, username, hostname, servername, realname)
                    .await
            }
            QUIT { reason } => self.process_quit(conn_state, reason).await,
            _ => {
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, ErrNotRegistered451 { client })
                    .await?;
                Ok(())
            }
        }
    }

    // command table after registration.
    async fn process_registered<'a>(
        &self,
        conn_state: &mut ConnState,
        cmd: Command<'a>,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        use Command::*;
        match cmd {
            PING { token } => self.process_ping(conn_state, token).await,
            PONG { .. } => Ok(()),
            LUSERS {} => self.process_lusers(conn_state).await,
            MOTD { target } => self.process_motd(conn_state, target).await,
            QUIT { reason } => self.process_quit(conn_state, reason).await,
            PASS { .. } | USER { .. } => {
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, ErrAlreadyRegistered462 { client })
                    .await?;
                Ok(())
            }
            NICK { .. } => {
                let client = conn_state.user_state.client_name();
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrUnknownCommand421 {
                        client,
                        command: cmd.name(),
                    },
                )
                .await?;
                Ok(())
            }
        }
    }

    // helper to feed messages
    async fn feed_msg<T: fmt::Display>(
        &self,
        stream: &mut BufferedLineStream,
        t: T,
    ) -> Result<(), LinesCodecError> {
        let message = format!(":{} {}", self.config.name, t);
        stream.feed(message).await
    }
}

// main process to handle commands from client.
async fn user_state_process(main_state: Arc<MainState>, stream: TcpStream, addr: SocketAddr) {
    let mut conn_state = main_state.register_conn_state(addr.ip(), stream);
    while !conn_state.is_quit() {
        if let Err(e) = main_state.process(&mut conn_state).await {
            if e.contains("unexpected eof") {
                info!("Connection closed by client: {}", conn_state.user_state.source);
            } else {
                error!("Error for {}: {}", conn_state.user_state.source, e);
            }
            break;
        }
    }
    main_state.remove_conn_state(&conn_state).await;
    info!(
        "User {} gone from server: {}",
        conn_state.user_state.source, conn_state.user_state.quit_reason
    );
}

pub(crate) fn initialize_logging(config: &MainConfig) {
    use tracing_subscriber::EnvFilter;
    let s = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_level.into()))
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        // disable ansi color for files
        .with_ansi(config.log_file.is_none());
    if let Some(ref log_file) = config.log_file {
        if let Ok(f) = File::create(log_file) {
            s.with_writer(f).init();
        } else {
            error!("No log file {}", log_file);
            s.init()
        }
    } else {
        s.init();
    }
}

// main routine to run server
pub(crate) async fn run_server(
    config: MainConfig,
    provider: Arc<dyn IdentityProvider>,
) -> Result<(Arc<MainState>, Vec<JoinHandle<()>>), Box<dyn StdError>> {
    info!("Starting {} for network {}", config.name, config.network);
    let main_state = Arc::new(MainState::new_from_config(config.clone(), provider));

    let mut handles = Vec::new();
    for listener_config in config.listeners {
        let main_state = main_state.clone();
        let listener = TcpListener::bind((listener_config.listen, listener_config.port)).await?;
        let mut quit_receiver = main_state.register_quit_receiver().await;
        handles.push(tokio::spawn(async move {
            info!(
                "Listen {} on port: {}",
                listener_config.listen, listener_config.port
            );
            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, addr)) => {
                                tokio::spawn(user_state_process(main_state.clone(),
                                        stream, addr));
                            }
                            Err(e) => { error!("Accept connection error: {}", e); }
                        };
                    }
                    Ok(msg) = &mut quit_receiver => {
                        info!("Server quit: {}", msg);
                        break;
                    }
                };
            }
        }));
    }

    Ok((main_state, handles))
}


mod conn_cmds;
mod srv_query_cmds;
