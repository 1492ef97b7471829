use crate::progress::ProgressLog;
use crate::rules::should_show;
use crate::store::{
    read_json, user_list_key, write_json, KeyValueStore, KEY_CURRENT_USER, KEY_USERS,
};
use crate::task::{AppData, Task, UserDef};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("wrong username or password")]
    BadCredentials,
    #[error("that username is already taken")]
    UsernameTaken,
    #[error("username and password are required")]
    MissingFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub now_completed: bool,
    /// Set when this toggle checked off the last remaining task of the day.
    pub all_done: bool,
}

/// One signed-in (or signed-out) run of the app: the loaded definitions, the
/// persistent store, today's date key and the current user all live here
/// instead of in globals, so the whole flow can be driven from tests.
pub struct Session {
    data: AppData,
    store: Box<dyn KeyValueStore>,
    progress: ProgressLog,
    today: NaiveDate,
    current_user: Option<String>,
}

impl Session {
    pub fn new(data: AppData, store: Box<dyn KeyValueStore>, today: NaiveDate) -> Self {
        let progress = ProgressLog::load(store.as_ref());
        Self {
            data,
            store,
            progress,
            today,
            current_user: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn theme(&self) -> Option<String> {
        let user = self.current_user.as_deref()?;
        if let Some(def) = self.data.user(user) {
            return def.theme.clone();
        }
        self.registered_users()
            .into_iter()
            .find(|u| u.username == user)
            .and_then(|u| u.theme)
    }

    fn registered_users(&self) -> Vec<UserDef> {
        read_json(self.store.as_ref(), KEY_USERS)
    }

    fn user_exists(&self, username: &str) -> bool {
        self.data.user(username).is_some()
            || self.registered_users().iter().any(|u| u.username == username)
    }

    /// Restores the persisted current-user pointer, dropping it when it no
    /// longer names a known user.
    pub fn check_auth(&mut self) {
        if let Some(saved) = self.store.get(KEY_CURRENT_USER) {
            if self.user_exists(&saved) {
                info!(user = %saved, "restored session");
                self.current_user = Some(saved);
                return;
            }
            warn!(user = %saved, "stored user no longer exists, signing out");
            self.store.remove(KEY_CURRENT_USER);
        }
        self.current_user = None;
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.trim().to_lowercase();
        let password = password.trim();

        let matched = self
            .data
            .users
            .iter()
            .any(|u| u.username == username && u.password == password)
            || self
                .registered_users()
                .iter()
                .any(|u| u.username == username && u.password == password);

        if !matched {
            return Err(AuthError::BadCredentials);
        }
        info!(user = %username, "logged in");
        self.store.set(KEY_CURRENT_USER, &username);
        self.current_user = Some(username);
        Ok(())
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.trim().to_lowercase();
        let password = password.trim().to_string();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if self.user_exists(&username) {
            return Err(AuthError::UsernameTaken);
        }

        let mut registered = self.registered_users();
        registered.push(UserDef {
            username: username.clone(),
            password,
            theme: None,
            tasks: Vec::new(),
        });
        write_json(self.store.as_mut(), KEY_USERS, &registered);

        info!(user = %username, "registered");
        self.store.set(KEY_CURRENT_USER, &username);
        self.current_user = Some(username);
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.current_user.take() {
            info!(%user, "logged out");
        }
        self.store.remove(KEY_CURRENT_USER);
    }

    fn stored_tasks(&self, username: &str) -> Vec<Task> {
        read_json(self.store.as_ref(), &user_list_key(username))
    }

    /// Today's checklist for the signed-in user: shared tasks that pass the
    /// visibility rules, then the user's own definitions-file tasks, then the
    /// tasks they manage themselves. Empty when signed out.
    pub fn visible_tasks(&self) -> Vec<Task> {
        let Some(user) = self.current_user.as_deref() else {
            return Vec::new();
        };

        let mut tasks: Vec<Task> = self
            .data
            .tasks
            .iter()
            .filter(|t| should_show(t, user, self.today, self.data.rotation.as_ref()))
            .cloned()
            .collect();
        if let Some(def) = self.data.user(user) {
            tasks.extend(def.tasks.iter().cloned());
        }
        tasks.extend(self.stored_tasks(user));
        tasks
    }

    /// Adds a managed task for the signed-in user; its id sits above every id
    /// already in the user's scope so ids stay unique per list.
    pub fn add_task(&mut self, title: &str) -> Option<Task> {
        let user = self.current_user.clone()?;
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let mut next_id = 1;
        for task in self.data.tasks.iter().chain(
            self.data
                .user(&user)
                .map(|d| d.tasks.as_slice())
                .unwrap_or_default(),
        ) {
            next_id = next_id.max(task.id + 1);
        }
        let mut stored = self.stored_tasks(&user);
        for task in &stored {
            next_id = next_id.max(task.id + 1);
        }

        let task = Task::new(next_id, title);
        stored.push(task.clone());
        write_json(self.store.as_mut(), &user_list_key(&user), &stored);
        info!(%user, id = task.id, "added task");
        Some(task)
    }

    /// Removes a managed task. Definitions-file tasks are read-only, so an id
    /// outside the stored list is a no-op.
    pub fn delete_task(&mut self, id: u32) -> bool {
        let Some(user) = self.current_user.clone() else {
            return false;
        };
        let mut stored = self.stored_tasks(&user);
        let before = stored.len();
        stored.retain(|t| t.id != id);
        if stored.len() == before {
            return false;
        }
        write_json(self.store.as_mut(), &user_list_key(&user), &stored);
        info!(%user, id, "deleted task");
        true
    }

    pub fn is_completed(&self, id: u32) -> bool {
        self.current_user
            .as_deref()
            .is_some_and(|user| self.progress.is_completed(self.today, user, id))
    }

    /// Toggles today's completion for `id` and persists the change. The
    /// returned outcome tells the UI whether to celebrate.
    pub fn toggle_task(&mut self, id: u32) -> Option<ToggleOutcome> {
        let user = self.current_user.clone()?;
        let now_completed = self.progress.toggle(self.today, &user, id);
        self.progress.save(self.store.as_mut());

        let all_done =
            now_completed && self.progress.all_completed(self.today, &user, &self.visible_tasks());
        Some(ToggleOutcome {
            now_completed,
            all_done,
        })
    }

    pub fn percentage(&self) -> f64 {
        match self.current_user.as_deref() {
            Some(user) => self
                .progress
                .percentage(self.today, user, &self.visible_tasks()),
            None => 0.0,
        }
    }

    /// (completed, total) over today's visible list.
    pub fn counts(&self) -> (usize, usize) {
        let Some(user) = self.current_user.as_deref() else {
            return (0, 0);
        };
        let tasks = self.visible_tasks();
        (
            self.progress.completed_count(self.today, user, &tasks),
            tasks.len(),
        )
    }
}
