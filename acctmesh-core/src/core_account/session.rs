//! Session attachment
//!
//! Tracks which connected user is logged in to which account. This state is
//! local to the server the user is connected to and is never written to the
//! account store; every change is announced as an [`AccountEvent::Login`].

use super::name::AccountName;
use super::notify::{AccountEvent, ChangeNotifier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::{debug, info};

/// Opaque handle of a connected user, as assigned by the host daemon
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserHandle(String);

impl UserHandle {
    pub fn new(id: impl Into<String>) -> Self {
        UserHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Login state queries and updates for connected users
pub trait AccountProvider: Send + Sync {
    /// Is the user logged in to an account?
    fn is_registered(&self, user: &UserHandle) -> bool;

    /// Account the user is logged in to, if any
    fn account_name(&self, user: &UserHandle) -> Option<AccountName>;

    /// Log `user` in to `name`, or out when `name` is `None`. `tag` is a
    /// hidden marker recording freshness or login method.
    fn do_login(&self, user: &UserHandle, name: Option<&AccountName>, tag: &str);
}

#[derive(Debug, Clone)]
struct Session {
    account: AccountName,
    tag: String,
}

/// In-memory [`AccountProvider`]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<UserHandle, Session>>,
    notifier: ChangeNotifier,
}

impl SessionRegistry {
    pub fn new(notifier: ChangeNotifier) -> Self {
        SessionRegistry { sessions: RwLock::new(HashMap::new()), notifier }
    }

    /// Hidden tag recorded at login
    pub fn tag(&self, user: &UserHandle) -> Option<String> {
        self.read().get(user).map(|s| s.tag.clone())
    }

    /// Users currently logged in to `account`
    pub fn users_of(&self, account: &AccountName) -> Vec<UserHandle> {
        let mut users: Vec<UserHandle> = self
            .read()
            .iter()
            .filter(|(_, s)| s.account == *account)
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        users
    }

    /// Log out every user attached to `account`, e.g. after it was removed.
    /// Returns how many users were logged out.
    pub fn logout_account(&self, account: &AccountName) -> usize {
        let users = self.users_of(account);
        for user in &users {
            self.do_login(user, None, "");
        }
        users.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<UserHandle, Session>> {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AccountProvider for SessionRegistry {
    fn is_registered(&self, user: &UserHandle) -> bool {
        self.read().contains_key(user)
    }

    fn account_name(&self, user: &UserHandle) -> Option<AccountName> {
        self.read().get(user).map(|s| s.account.clone())
    }

    fn do_login(&self, user: &UserHandle, name: Option<&AccountName>, tag: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner());

        // An empty name is a logout, the same as `None`
        let name = name.filter(|n| !n.is_empty());
        match name {
            Some(account) => {
                info!(%user, %account, "user logged in");
                sessions.insert(
                    user.clone(),
                    Session { account: account.clone(), tag: tag.to_string() },
                );
            }
            None => {
                if sessions.remove(user).is_none() {
                    debug!(%user, "logout for user without a session");
                    return;
                }
                info!(%user, "user logged out");
            }
        }

        self.notifier.emit(AccountEvent::Login { user: user.clone(), account: name.cloned() });
    }
}
