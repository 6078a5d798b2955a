// mod.rs - authentication gate
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

#[cfg(feature = "sqlite")]
pub(crate) mod sqlite;

use anyhow::anyhow;
use argon2::password_hash;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::*;

use crate::config::{MainConfig, UserConfig};
use crate::utils::{argon2_hash_password, argon2_verify_password};

// Argon2 hash of a password nobody knows, made with the same parameters as
// real hashes. Verified against for unknown identifiers, so they cost as
// much time as known ones.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| match argon2_hash_password("no such identity") {
            Ok(hash) => Some(hash),
            Err(e) => {
                error!("Can't make dummy password hash: {}", e);
                None
            }
        })
        .as_deref()
}

/// Identity admitted by a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Principal {
    pub(crate) account: String,
}

/// External identity backend. `verify` may block; it is always run on
/// the blocking pool. `Ok(None)` means "no match", errors mean the
/// backend itself failed.
pub(crate) trait IdentityProvider: Send + Sync {
    fn verify(&self, identifier: &str, secret: Option<&str>) -> anyhow::Result<Option<Principal>>;
}

// verify secret against stored hash. Absent secret is verified as empty.
pub(crate) fn verify_secret(
    hash: &str,
    secret: Option<&str>,
    account: &str,
) -> anyhow::Result<Option<Principal>> {
    match argon2_verify_password(secret.unwrap_or_default(), hash) {
        Ok(()) => Ok(Some(Principal {
            account: account.to_string(),
        })),
        Err(password_hash::Error::Password) => Ok(None),
        Err(e) => Err(anyhow!("bad password hash for {}: {}", account, e)),
    }
}

pub(crate) fn dummy_verify(secret: Option<&str>) {
    if let Some(hash) = dummy_hash() {
        let _ = argon2_verify_password(secret.unwrap_or_default(), hash);
    }
}

/// Identities listed in the configuration file.
pub(crate) struct ConfigIdentityProvider {
    // key is nick, value is (password hash, account)
    users: HashMap<String, (String, String)>,
}

impl ConfigIdentityProvider {
    pub(crate) fn new(users: &[UserConfig]) -> Self {
        ConfigIdentityProvider {
            users: users
                .iter()
                .map(|u| {
                    let account = u.account.clone().unwrap_or_else(|| u.nick.clone());
                    (u.nick.clone(), (u.password.clone(), account))
                })
                .collect(),
        }
    }
}

impl IdentityProvider for ConfigIdentityProvider {
    fn verify(&self, identifier: &str, secret: Option<&str>) -> anyhow::Result<Option<Principal>> {
        if let Some((hash, account)) = self.users.get(identifier) {
            verify_secret(hash, secret, account)
        } else {
            dummy_verify(secret);
            Ok(None)
        }
    }
}

/// Bounded call-out to an identity provider. Every failure, including
/// timeouts and backend errors, ends as `None`.
///
/// A timed-out call keeps running on the blocking pool until the provider
/// returns. At most `max_pending` calls may be unfinished at once; calls
/// over that limit are rejected without reaching the provider.
pub(crate) struct AuthGate {
    provider: Arc<dyn IdentityProvider>,
    timeout: Duration,
    pending: Arc<Semaphore>,
    max_pending: usize,
}

impl AuthGate {
    pub(crate) fn new(
        provider: Arc<dyn IdentityProvider>,
        timeout: Duration,
        max_pending: usize,
    ) -> Self {
        AuthGate {
            provider,
            timeout,
            pending: Arc::new(Semaphore::new(max_pending)),
            max_pending,
        }
    }

    // number of provider calls that have not returned yet.
    pub(crate) fn outstanding(&self) -> usize {
        self.max_pending.saturating_sub(self.pending.available_permits())
    }

    pub(crate) async fn authenticate(
        &self,
        identifier: &str,
        secret: Option<&str>,
    ) -> Option<Principal> {
        let permit = match self.pending.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    "Authentication for {} rejected: {} calls outstanding",
                    identifier, self.max_pending
                );
                return None;
            }
        };
        let provider = self.provider.clone();
        let id = identifier.to_string();
        let secret = secret.map(str::to_string);
        let task = tokio::task::spawn_blocking(move || {
            // held until provider returns, even after timeout.
            let _permit = permit;
            provider.verify(&id, secret.as_deref())
        });
        match timeout(self.timeout, task).await {
            Ok(Ok(Ok(principal))) => principal,
            Ok(Ok(Err(e))) => {
                warn!("Identity provider failed for {}: {}", identifier, e);
                None
            }
            Ok(Err(e)) => {
                error!("Authentication task for {} failed: {}", identifier, e);
                None
            }
            Err(_) => {
                warn!(
                    "Authentication for {} timed out after {:?}, {} calls outstanding",
                    identifier,
                    self.timeout,
                    self.outstanding()
                );
                None
            }
        }
    }
}

// choose identity provider from configuration: database if given,
// otherwise users from configuration.
pub(crate) fn provider_from_config(
    config: &MainConfig,
) -> Result<Arc<dyn IdentityProvider>, String> {
    if let Some(ref db) = config.database {
        match db.database.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(Arc::new(
                sqlite::SQLiteIdentityProvider::open(&db.url).map_err(|e| e.to_string())?,
            )),
            db_type => Err(format!("Unsupported database type: {}", db_type)),
        }
    } else {
        let _ = dummy_hash();
        Ok(Arc::new(ConfigIdentityProvider::new(
            config.users.as_deref().unwrap_or_default(),
        )))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use argon2::password_hash::PasswordHash;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // provider that accepts fixed (nick, password) pairs. None as password
    // accepts an absent secret.
    pub(crate) struct StaticIdentityProvider {
        pub(crate) accepted: Vec<(&'static str, Option<&'static str>)>,
        pub(crate) calls: AtomicUsize,
    }

    impl StaticIdentityProvider {
        pub(crate) fn new(accepted: Vec<(&'static str, Option<&'static str>)>) -> Self {
            StaticIdentityProvider {
                accepted,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl IdentityProvider for StaticIdentityProvider {
        fn verify(
            &self,
            identifier: &str,
            secret: Option<&str>,
        ) -> anyhow::Result<Option<Principal>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .accepted
                .iter()
                .any(|(n, p)| *n == identifier && *p == secret)
            {
                Ok(Some(Principal {
                    account: identifier.to_string(),
                }))
            } else {
                Ok(None)
            }
        }
    }

    pub(crate) struct SlowIdentityProvider(pub(crate) Duration);

    impl IdentityProvider for SlowIdentityProvider {
        fn verify(
            &self,
            identifier: &str,
            _: Option<&str>,
        ) -> anyhow::Result<Option<Principal>> {
            std::thread::sleep(self.0);
            Ok(Some(Principal {
                account: identifier.to_string(),
            }))
        }
    }

    struct FailingIdentityProvider;

    impl IdentityProvider for FailingIdentityProvider {
        fn verify(&self, _: &str, _: Option<&str>) -> anyhow::Result<Option<Principal>> {
            Err(anyhow!("backend unavailable"))
        }
    }

    struct PanickingIdentityProvider;

    impl IdentityProvider for PanickingIdentityProvider {
        fn verify(&self, _: &str, _: Option<&str>) -> anyhow::Result<Option<Principal>> {
            panic!("backend crashed")
        }
    }

    #[test]
    fn test_config_identity_provider() {
        let provider = ConfigIdentityProvider::new(&[
            UserConfig {
                nick: "alice".to_string(),
                password: argon2_hash_password("secret").unwrap(),
                account: None,
            },
            UserConfig {
                nick: "bob".to_string(),
                password: argon2_hash_password("").unwrap(),
                account: Some("robert".to_string()),
            },
        ]);
        assert_eq!(
            Some(Principal {
                account: "alice".to_string()
            }),
            provider.verify("alice", Some("secret")).unwrap()
        );
        assert_eq!(None, provider.verify("alice", Some("secreT")).unwrap());
        assert_eq!(None, provider.verify("alice", None).unwrap());
        assert_eq!(None, provider.verify("carol", Some("secret")).unwrap());
        assert_eq!(None, provider.verify("Alice", Some("secret")).unwrap());
        // empty password stored: absent secret matches it.
        assert_eq!(
            Some(Principal {
                account: "robert".to_string()
            }),
            provider.verify("bob", None).unwrap()
        );
    }

    #[test]
    fn test_config_identity_provider_bad_hash() {
        let provider = ConfigIdentityProvider::new(&[UserConfig {
            nick: "alice".to_string(),
            password: "not a hash".to_string(),
            account: None,
        }]);
        assert!(provider.verify("alice", Some("secret")).is_err());
    }

    #[tokio::test]
    async fn test_auth_gate() {
        let provider = Arc::new(StaticIdentityProvider::new(vec![("alice", Some("secret"))]));
        let gate = AuthGate::new(provider.clone(), Duration::from_secs(5), 4);
        assert_eq!(
            Some(Principal {
                account: "alice".to_string()
            }),
            gate.authenticate("alice", Some("secret")).await
        );
        assert_eq!(None, gate.authenticate("alice", None).await);
        assert_eq!(None, gate.authenticate("bob", Some("secret")).await);
        assert_eq!(3, provider.calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_auth_gate_normalizes_failures() {
        let gate = AuthGate::new(
            Arc::new(SlowIdentityProvider(Duration::from_millis(1500))),
            Duration::from_millis(100),
            4,
        );
        assert_eq!(None, gate.authenticate("alice", Some("secret")).await);

        let gate = AuthGate::new(Arc::new(FailingIdentityProvider), Duration::from_secs(5), 4);
        assert_eq!(None, gate.authenticate("alice", Some("secret")).await);

        let gate = AuthGate::new(Arc::new(PanickingIdentityProvider), Duration::from_secs(5), 4);
        assert_eq!(None, gate.authenticate("alice", Some("secret")).await);
    }

    #[tokio::test]
    async fn test_auth_gate_limits_outstanding_calls() {
        let gate = AuthGate::new(
            Arc::new(SlowIdentityProvider(Duration::from_millis(1000))),
            Duration::from_millis(300),
            1,
        );
        assert_eq!(0, gate.outstanding());
        assert_eq!(None, gate.authenticate("alice", Some("secret")).await);
        // timed-out call still holds its slot.
        assert_eq!(1, gate.outstanding());

        let start = std::time::Instant::now();
        assert_eq!(None, gate.authenticate("bob", Some("secret")).await);
        assert!(start.elapsed() < Duration::from_millis(300));

        for _ in 0..200 {
            if gate.outstanding() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(0, gate.outstanding());
    }

    #[test]
    fn test_dummy_hash_params() {
        let dummy = PasswordHash::new(dummy_hash().unwrap()).unwrap();
        let real_str = argon2_hash_password("secret").unwrap();
        let real = PasswordHash::new(&real_str).unwrap();
        assert_eq!(real.algorithm.to_string(), dummy.algorithm.to_string());
        assert_eq!(real.version, dummy.version);
        assert_eq!(real.params.to_string(), dummy.params.to_string());
        assert!(argon2_verify_password("no such identity", dummy_hash().unwrap()).is_ok());
        dummy_verify(Some("secret"));
    }

    #[test]
    fn test_provider_from_config() {
        let mut config = MainConfig::default();
        config.users = Some(vec![UserConfig {
            nick: "alice".to_string(),
            password: argon2_hash_password("secret").unwrap(),
            account: None,
        }]);
        let provider = provider_from_config(&config).unwrap();
        assert!(provider.verify("alice", Some("secret")).unwrap().is_some());

        config.database = Some(crate::config::DB {
            database: "oracle".to_string(),
            url: "x".to_string(),
        });
        assert!(provider_from_config(&config).is_err());
    }
}
