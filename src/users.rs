//! User directory over the users slot.
//!
//! Registration appends, admin deletion removes. There is no edit operation.

use crate::error::{StoreError, UserError};
use crate::models::{Role, User};
use crate::store::{keys, Change, CollectionStore, KeyValueBackend};
use std::sync::Arc;
use tracing::info;

pub struct UserDirectory<B: KeyValueBackend> {
    store: Arc<CollectionStore<B>>,
}

impl<B: KeyValueBackend> UserDirectory<B> {
    pub fn new(store: Arc<CollectionStore<B>>) -> Self {
        UserDirectory { store }
    }

    /// Register a new account. Emails are unique, compared case-insensitively.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        role: Role,
        specialty: Option<&str>,
        image: Option<&str>,
    ) -> Result<User, UserError> {
        let user = User::new(
            name.to_string(),
            email.to_string(),
            role,
            specialty.map(str::to_string),
            image.map(str::to_string),
        )?;

        let user = self.store.update(keys::USERS, |users: &mut Vec<User>| {
            if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(UserError::DuplicateEmail(user.email.clone()));
            }
            users.push(user.clone());
            Ok(Change::Commit(user))
        })?;

        info!(id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    pub fn list_all(&self) -> Result<Vec<User>, StoreError> {
        self.store.load(keys::USERS)
    }

    /// Everyone except `current_user_id`, as shown on the management screen.
    pub fn list_except(&self, current_user_id: &str) -> Result<Vec<User>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|u| u.id != current_user_id)
            .collect())
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim();
        Ok(self
            .list_all()?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    /// Remove a user. Returns whether anything was removed.
    pub fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        let removed = self.store.update(keys::USERS, |users: &mut Vec<User>| {
            let before = users.len();
            users.retain(|u| u.id != user_id);
            Ok::<_, StoreError>(if users.len() < before {
                Change::Commit(true)
            } else {
                Change::Discard(false)
            })
        })?;

        if removed {
            info!(id = user_id, "user deleted");
        }
        Ok(removed)
    }
}
