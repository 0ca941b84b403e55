//! In-memory record store for unit tests, with failure injection.

use chrono::{DateTime, TimeZone, Utc};

use crate::access::Role;
use crate::model::{
    Client, ClientPatch, NewClient, NewUser, Task, TaskDraft, TaskPatch, TimeEntry,
    TimeEntryChanges, TimeEntryDraft, User,
};
use crate::store::{
    ClientStore, Collection, StoreError, StoreOperation, TaskFilter, TaskStore, TimeEntryFilter,
    TimeEntryStore, UserStore,
};
use crate::types::{ClientId, TaskId, TaskStatus, TimeEntryId, UserId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: i64,
    pub entries: Vec<TimeEntry>,
    pub tasks: Vec<Task>,
    pub clients: Vec<Client>,
    pub users: Vec<User>,
    failures: Vec<(Collection, StoreOperation, Option<i64>)>,
}

/// Timestamp on 2025-03-10 at the given time.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

/// Timestamp on 2025-03-`day` at the given hour.
pub fn on(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every matching call fail. `id` narrows update/delete failures to one record.
    pub fn fail_on(&mut self, collection: Collection, operation: StoreOperation, id: Option<i64>) {
        self.failures.push((collection, operation, id));
    }

    fn check(
        &self,
        collection: Collection,
        operation: StoreOperation,
        id: Option<i64>,
    ) -> Result<(), StoreError> {
        let hit = self.failures.iter().any(|(c, o, target)| {
            *c == collection && *o == operation && (target.is_none() || *target == id)
        });
        if hit {
            return Err(StoreError::new(collection, operation, "injected failure"));
        }
        Ok(())
    }

    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_user(&mut self, username: &str, role: Role) -> UserId {
        self.insert_user(&NewUser {
            username: username.to_string(),
            role,
        })
        .unwrap()
        .id
    }

    pub fn add_client(&mut self, name: &str) -> ClientId {
        self.insert_client(&NewClient {
            name: name.to_string(),
            color: "#336699".to_string(),
        })
        .unwrap()
        .id
    }

    pub fn add_task(&mut self, client_id: ClientId, title: &str) -> TaskId {
        let id = TaskId::new(self.allocate()).unwrap();
        self.tasks.push(Task {
            id,
            client_id,
            title: title.to_string(),
            description: None,
            assigned_to_id: UserId::new(1).unwrap(),
            status: TaskStatus::Pending,
            due_date: None,
            assignment_date: at(8, 0),
        });
        id
    }

    /// Stores an entry directly, bypassing validation (orphans allowed).
    pub fn add_entry(
        &mut self,
        task_id: TaskId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TimeEntryId {
        let id = TimeEntryId::new(self.allocate()).unwrap();
        self.entries.push(TimeEntry {
            id,
            task_id,
            user_id: UserId::new(1).unwrap(),
            start_time: start,
            end_time: end,
            duration_hours: crate::interval::duration_hours(start, end),
        });
        id
    }
}

impl TimeEntryStore for MemoryStore {
    fn insert_time_entry(&mut self, draft: &TimeEntryDraft) -> Result<TimeEntry, StoreError> {
        self.check(Collection::TimeEntries, StoreOperation::Insert, None)?;
        let entry = TimeEntry {
            id: TimeEntryId::new(self.allocate()).unwrap(),
            task_id: draft.task_id(),
            user_id: draft.user_id(),
            start_time: draft.start_time(),
            end_time: draft.end_time(),
            duration_hours: draft.duration_hours(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn select_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        self.check(Collection::TimeEntries, StoreOperation::Select, None)?;
        let mut entries: Vec<TimeEntry> = self
            .entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    fn find_time_entry(&self, id: TimeEntryId) -> Result<Option<TimeEntry>, StoreError> {
        self.check(Collection::TimeEntries, StoreOperation::Select, None)?;
        Ok(self.entries.iter().find(|entry| entry.id == id).cloned())
    }

    fn update_time_entry(
        &mut self,
        id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>, StoreError> {
        self.check(Collection::TimeEntries, StoreOperation::Update, Some(id.get()))?;
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return Ok(None);
        };
        if let Some(task_id) = changes.task_id() {
            entry.task_id = task_id;
        }
        if let Some((start, end, hours)) = changes.bounds() {
            entry.start_time = start;
            entry.end_time = end;
            entry.duration_hours = hours;
        }
        Ok(Some(entry.clone()))
    }

    fn delete_time_entry(&mut self, id: TimeEntryId) -> Result<bool, StoreError> {
        self.check(Collection::TimeEntries, StoreOperation::Delete, Some(id.get()))?;
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        Ok(self.entries.len() != before)
    }
}

impl TaskStore for MemoryStore {
    fn insert_task(&mut self, draft: &TaskDraft) -> Result<Task, StoreError> {
        self.check(Collection::Tasks, StoreOperation::Insert, None)?;
        let task = Task {
            id: TaskId::new(self.allocate()).unwrap(),
            client_id: draft.client_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            assigned_to_id: draft.assigned_to_id,
            status: draft.status,
            due_date: draft.due_date,
            assignment_date: draft.assignment_date,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn select_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.check(Collection::Tasks, StoreOperation::Select, None)?;
        Ok(self
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect())
    }

    fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.check(Collection::Tasks, StoreOperation::Select, None)?;
        Ok(self.tasks.iter().find(|task| task.id == id).cloned())
    }

    fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>, StoreError> {
        self.check(Collection::Tasks, StoreOperation::Update, Some(id.get()))?;
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        if let Some(description) = &patch.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = Some(due_date);
        }
        Ok(Some(task.clone()))
    }

    fn delete_task(&mut self, id: TaskId) -> Result<bool, StoreError> {
        self.check(Collection::Tasks, StoreOperation::Delete, Some(id.get()))?;
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        Ok(self.tasks.len() != before)
    }
}

impl ClientStore for MemoryStore {
    fn insert_client(&mut self, client: &NewClient) -> Result<Client, StoreError> {
        self.check(Collection::Clients, StoreOperation::Insert, None)?;
        let client = Client {
            id: ClientId::new(self.allocate()).unwrap(),
            name: client.name.clone(),
            color: client.color.clone(),
        };
        self.clients.push(client.clone());
        Ok(client)
    }

    fn select_clients(&self) -> Result<Vec<Client>, StoreError> {
        self.check(Collection::Clients, StoreOperation::Select, None)?;
        Ok(self.clients.clone())
    }

    fn find_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        self.check(Collection::Clients, StoreOperation::Select, None)?;
        Ok(self.clients.iter().find(|client| client.id == id).cloned())
    }

    fn update_client(
        &mut self,
        id: ClientId,
        patch: &ClientPatch,
    ) -> Result<Option<Client>, StoreError> {
        self.check(Collection::Clients, StoreOperation::Update, Some(id.get()))?;
        let Some(client) = self.clients.iter_mut().find(|client| client.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            client.name.clone_from(name);
        }
        if let Some(color) = &patch.color {
            client.color.clone_from(color);
        }
        Ok(Some(client.clone()))
    }

    fn delete_client(&mut self, id: ClientId) -> Result<bool, StoreError> {
        self.check(Collection::Clients, StoreOperation::Delete, Some(id.get()))?;
        let before = self.clients.len();
        self.clients.retain(|client| client.id != id);
        Ok(self.clients.len() != before)
    }
}

impl UserStore for MemoryStore {
    fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        self.check(Collection::Users, StoreOperation::Insert, None)?;
        let user = User {
            id: UserId::new(self.allocate()).unwrap(),
            username: user.username.clone(),
            role: user.role,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn select_users(&self) -> Result<Vec<User>, StoreError> {
        self.check(Collection::Users, StoreOperation::Select, None)?;
        Ok(self.users.clone())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check(Collection::Users, StoreOperation::Select, None)?;
        Ok(self
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}
