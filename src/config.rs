// config.rs - configuration
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

use serde::Deserializer;
use serde_derive::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use std::str::FromStr;
use validator::Validate;

use crate::utils::validate_nickname_config;
use crate::utils::validate_password_hash;

#[derive(clap::Parser, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[clap(short, long, help = "Generate password hash")]
    pub(crate) gen_password_hash: bool,
    #[clap(short = 'P', long, help = "Password for generated password hash")]
    pub(crate) password: Option<String>,
    #[clap(short, long, help = "Configuration file path")]
    config: Option<String>,
    #[clap(short, long, help = "Listen bind address")]
    listen: Option<IpAddr>,
    #[clap(short, long, help = "Listen port")]
    port: Option<u16>,
    #[clap(short = 'n', long, help = "Server name")]
    name: Option<String>,
    #[clap(short = 'N', long, help = "Network")]
    network: Option<String>,
    #[clap(short = 'M', long, help = "Message of the day file path")]
    motd_file: Option<String>,
    #[clap(short = 'L', long, help = "Log file path")]
    log_file: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Validate)]
pub(crate) struct ListenerConfig {
    pub(crate) listen: IpAddr,
    pub(crate) port: u16,
}

// identity known to the configuration identity provider.
#[derive(PartialEq, Eq, Deserialize, Debug, Validate, Clone)]
pub(crate) struct UserConfig {
    #[validate(custom(function = "validate_nickname_config"))]
    pub(crate) nick: String,
    #[validate(custom(function = "validate_password_hash"))]
    pub(crate) password: String,
    // account name reported for the principal; nick if not given.
    pub(crate) account: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Deserialize, Debug, Validate)]
pub(crate) struct DB {
    pub database: String, // "sqlite"
    pub url: String,
}

/// Main configuration structure.
#[derive(Clone, PartialEq, Eq, Deserialize, Debug, Validate)]
pub(crate) struct MainConfig {
    #[validate(contains(pattern = "."))]
    pub(crate) name: String,
    pub(crate) network: String,
    pub(crate) motd_file: Option<String>,
    #[validate(length(min = 1))]
    pub(crate) listeners: Vec<ListenerConfig>,
    // timeout for single authentication call in milliseconds.
    #[serde(default = "default_auth_timeout_ms")]
    pub(crate) auth_timeout_ms: u64,
    // maximal number of unfinished identity provider calls.
    #[validate(range(min = 1))]
    #[serde(default = "default_auth_max_pending")]
    pub(crate) auth_max_pending: usize,
    pub(crate) user_modes: String,
    pub(crate) channel_modes: String,
    pub(crate) log_file: Option<String>,
    #[serde(deserialize_with = "tracing_log_level_deserialize")]
    pub(crate) log_level: tracing::Level,
    #[validate(nested)]
    pub(crate) database: Option<DB>,
    #[validate(nested)]
    pub(crate) users: Option<Vec<UserConfig>>,
}

fn default_auth_timeout_ms() -> u64 {
    10000
}

fn default_auth_max_pending() -> usize {
    64
}

struct TracingLevelVisitor;

impl<'de> serde::de::Visitor<'de> for TracingLevelVisitor {
    type Value = tracing::Level;
    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("TracingLevel")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        tracing::Level::from_str(v).map_err(|e| serde::de::Error::custom(e))
    }
}

fn tracing_log_level_deserialize<'de, D: Deserializer<'de>>(
    ds: D,
) -> Result<tracing::Level, D::Error> {
    ds.deserialize_str(TracingLevelVisitor)
}

impl MainConfig {
    // create new main config from command line.
    pub(crate) fn new(cli: Cli) -> Result<MainConfig, Box<dyn Error>> {
        // get config path.
        let config_path = cli.config.as_deref().unwrap_or("authircd.toml");
        let mut config_file = File::open(config_path)?;
        let mut config_str = String::new();
        config_file.read_to_string(&mut config_str)?;
        // modify configuration by CLI options
        let mut config: MainConfig = toml::from_str(&config_str)?;
        if let Some(addr) = cli.listen {
            config.listeners.iter_mut().for_each(|l| l.listen = addr);
        }
        if let Some(port) = cli.port {
            config.listeners.iter_mut().for_each(|l| l.port = port);
        }
        if let Some(name) = cli.name {
            config.name = name;
        }
        if let Some(network) = cli.network {
            config.network = network;
        }
        if let Some(motd_file) = cli.motd_file {
            config.motd_file = Some(motd_file);
        }
        if let Some(log_file) = cli.log_file {
            config.log_file = Some(log_file)
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for MainConfig {
    fn default() -> Self {
        MainConfig {
            name: "irc.irc".to_string(),
            network: "IRCnetwork".to_string(),
            motd_file: None,
            listeners: vec![ListenerConfig {
                listen: IpAddr::from([127, 0, 0, 1]),
                port: 6667,
            }],
            auth_timeout_ms: default_auth_timeout_ms(),
            auth_max_pending: default_auth_max_pending(),
            user_modes: "o".to_string(),
            channel_modes: "o".to_string(),
            log_file: None,
            log_level: tracing::Level::INFO,
            database: None,
            users: None,
        }
    }
}
