//! The signed-in user and the login prompt.
//!
//! Authentication itself happens elsewhere. This type only records who is
//! signed in and whether a login prompt has been requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::models::User;

#[derive(Debug, Default)]
pub struct Session {
    user: Mutex<Option<User>>,
    login_prompt: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that starts signed in.
    pub fn signed_in(user: User) -> Self {
        Self {
            user: Mutex::new(Some(user)),
            login_prompt: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<User>> {
        self.user
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn user(&self) -> Option<User> {
        self.lock().clone()
    }

    pub fn email(&self) -> Option<String> {
        self.user().map(|u| u.email)
    }

    /// Record a successful sign-in and close any open login prompt.
    pub fn set_user(&self, user: User) {
        *self.lock() = Some(user);
        self.login_prompt.store(false, Ordering::SeqCst);
    }

    pub fn sign_out(&self) {
        *self.lock() = None;
    }

    /// Ask the UI to show its login prompt.
    pub fn request_login(&self) {
        self.login_prompt.store(true, Ordering::SeqCst);
    }

    pub fn is_login_prompt_open(&self) -> bool {
        self.login_prompt.load(Ordering::SeqCst)
    }

    pub fn dismiss_login_prompt(&self) {
        self.login_prompt.store(false, Ordering::SeqCst);
    }
}
