//! Change notifications fanned out to subscribers.
//!
//! # Responsibility
//! - Define every notification the core emits upward.
//! - Deliver each emitted event to all live subscribers, in emit order.
//!
//! # Invariants
//! - State-change events are emitted only after the mutation committed.
//! - A dropped receiver is pruned on the next emit; emitting never fails.

use crate::model::role::ItemRole;
use crate::model::schema::TagField;
use crate::model::{ItemId, ProjectId, TagId};
use log::warn;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Notification emitted by the registry and the hubs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoreEvent {
    ProjectLoaded {
        project_id: ProjectId,
    },
    ProjectSaved {
        project_id: ProjectId,
    },
    ProjectToBeClosed {
        project_id: ProjectId,
    },
    ProjectClosed {
        project_id: ProjectId,
    },
    AllProjectsClosed,
    ProjectCountChanged {
        count: usize,
    },
    ProjectPathChanged {
        project_id: ProjectId,
        path: Option<PathBuf>,
    },
    ProjectIsBackupChanged {
        project_id: ProjectId,
        is_backup: bool,
    },
    /// `None` when no project is open.
    ActiveProjectChanged {
        project_id: Option<ProjectId>,
    },
    ProjectNameChanged {
        project_id: ProjectId,
        name: String,
    },
    LangCodeChanged {
        project_id: ProjectId,
        lang_code: String,
    },
    ProjectNotSavedAnymore {
        project_id: ProjectId,
    },
    /// Coarse dirty signal fired after every successful mutation.
    ProjectModified {
        project_id: ProjectId,
    },
    TagAdded {
        project_id: ProjectId,
        tag_id: TagId,
    },
    TagRemoved {
        project_id: ProjectId,
        tag_id: TagId,
    },
    TagFieldChanged {
        project_id: ProjectId,
        tag_id: TagId,
        field: TagField,
    },
    RelationshipAdded {
        project_id: ProjectId,
        item_id: ItemId,
        tag_id: TagId,
    },
    RelationshipRemoved {
        project_id: ProjectId,
        item_id: ItemId,
        tag_id: TagId,
    },
    ItemAdded {
        project_id: ProjectId,
        item_id: ItemId,
    },
    /// `role` is `None` when the written field has no cached role.
    ItemFieldChanged {
        project_id: ProjectId,
        item_id: ItemId,
        role: Option<ItemRole>,
    },
    Error {
        code: String,
        project_id: Option<ProjectId>,
        message: String,
    },
}

/// Cloneable multi-subscriber event sink.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<CoreEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber receiving every later event.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        let (sender, receiver) = channel();
        self.lock().push(sender);
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Delivers `event` to every live subscriber.
    pub fn emit(&self, event: CoreEvent) {
        let mut subscribers = self.lock();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<CoreEvent>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("event=event_bus_lock module=event status=recovered reason=poisoned");
                poisoned.into_inner()
            }
        }
    }
}
