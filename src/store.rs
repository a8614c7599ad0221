//! Mail store: user accounts, mailbox contents, delivery

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// External mailbox and user store used by both protocol servers.
///
/// Implementations are shared across sessions and synchronize
/// internally; the sessions themselves never share mutable state.
pub trait MailStore: Send + Sync {
    /// True when `name` is a known mailbox.
    fn user_exists(&self, name: &str) -> bool;

    /// True when `name` exists and `password` matches.
    fn verify_credentials(&self, name: &str, password: &str) -> bool;

    /// Load the ordered mail list for `name`, created fresh per login.
    fn load_mail_list(&self, name: &str) -> MailList;

    /// Deliver one message to every recipient mailbox. Recipients have
    /// already been verified; unknown names are skipped.
    fn deliver(&self, message: &str, recipients: &[String]);

    /// Remove the messages marked deleted in `list` from the mailbox.
    /// Returns the number of messages that could not be removed.
    fn purge_deleted(&self, list: &MailList) -> usize;
}

/// One message in a loaded mail list.
#[derive(Debug, Clone)]
pub struct MailItem {
    id: u64,
    content: String,
    deleted: bool,
}

impl MailItem {
    /// Size of the message in octets.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// The ordered mailbox snapshot owned by one POP3 session.
///
/// Positions are stable for the life of the list: deleting a message
/// hides it from counts and lookups but never renumbers the others.
#[derive(Debug)]
pub struct MailList {
    user: String,
    items: Vec<MailItem>,
}

impl MailList {
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Number of messages, optionally counting those marked deleted.
    pub fn count(&self, include_deleted: bool) -> usize {
        if include_deleted {
            self.items.len()
        } else {
            self.items.iter().filter(|item| !item.deleted).count()
        }
    }

    /// Total octets over messages not marked deleted.
    pub fn octets(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !item.deleted)
            .map(MailItem::size)
            .sum()
    }

    /// Message at `index` (0-based), or `None` when the index is out of
    /// range or the message is marked deleted.
    pub fn item(&self, index: usize) -> Option<&MailItem> {
        self.items.get(index).filter(|item| !item.deleted)
    }

    /// Mark the message at `index` deleted. Returns false when the index
    /// is out of range or the message is already deleted.
    pub fn mark_deleted(&mut self, index: usize) -> bool {
        match self.items.get_mut(index) {
            Some(item) if !item.deleted => {
                item.deleted = true;
                true
            }
            _ => false,
        }
    }

    /// Clear every deleted flag. Returns how many messages were restored.
    pub fn reset_deleted(&mut self) -> usize {
        let mut restored = 0;
        for item in &mut self.items {
            if item.deleted {
                item.deleted = false;
                restored += 1;
            }
        }
        restored
    }

    fn deleted_items(&self) -> impl Iterator<Item = &MailItem> {
        self.items.iter().filter(|item| item.deleted)
    }
}

/// In-memory [`MailStore`] backing both servers in one process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    next_id: u64,
}

#[derive(Debug)]
struct Account {
    password: String,
    messages: Vec<StoredMessage>,
}

#[derive(Debug)]
struct StoredMessage {
    id: u64,
    data: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mailbox. Replaces the password of an existing user.
    pub fn add_user(&self, name: &str, password: &str) {
        let mut inner = self.lock();
        inner
            .accounts
            .entry(name.to_owned())
            .and_modify(|account| account.password = password.to_owned())
            .or_insert_with(|| Account {
                password: password.to_owned(),
                messages: Vec::new(),
            });
    }

    /// Load accounts from a file of whitespace-separated `user password`
    /// lines. Blank lines and `#` comments are skipped.
    pub fn from_users_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let store = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            if let (Some(user), Some(password)) = (fields.next(), fields.next()) {
                store.add_user(user, password);
            }
        }
        Ok(store)
    }

    /// Number of messages currently stored for `user`.
    pub fn message_count(&self, user: &str) -> usize {
        self.lock()
            .accounts
            .get(user)
            .map_or(0, |account| account.messages.len())
    }

    /// Raw message contents for `user`, oldest first.
    pub fn messages(&self, user: &str) -> Vec<String> {
        self.lock().accounts.get(user).map_or_else(Vec::new, |account| {
            account.messages.iter().map(|m| m.data.clone()).collect()
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MailStore for MemoryStore {
    fn user_exists(&self, name: &str) -> bool {
        self.lock().accounts.contains_key(name)
    }

    fn verify_credentials(&self, name: &str, password: &str) -> bool {
        self.lock()
            .accounts
            .get(name)
            .is_some_and(|account| account.password == password)
    }

    fn load_mail_list(&self, name: &str) -> MailList {
        let inner = self.lock();
        let items = inner.accounts.get(name).map_or_else(Vec::new, |account| {
            account
                .messages
                .iter()
                .map(|m| MailItem {
                    id: m.id,
                    content: m.data.clone(),
                    deleted: false,
                })
                .collect()
        });
        MailList {
            user: name.to_owned(),
            items,
        }
    }

    fn deliver(&self, message: &str, recipients: &[String]) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        for recipient in recipients {
            if let Some(account) = inner.accounts.get_mut(recipient) {
                account.messages.push(StoredMessage {
                    id: inner.next_id,
                    data: message.to_owned(),
                });
                inner.next_id += 1;
            }
        }
    }

    fn purge_deleted(&self, list: &MailList) -> usize {
        let mut inner = self.lock();
        let Some(account) = inner.accounts.get_mut(list.user()) else {
            return list.count(true) - list.count(false);
        };

        let mut failed = 0;
        for item in list.deleted_items() {
            let before = account.messages.len();
            account.messages.retain(|m| m.id != item.id);
            if account.messages.len() == before {
                failed += 1;
            }
        }
        failed
    }
}
