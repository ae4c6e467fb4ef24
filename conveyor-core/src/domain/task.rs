//! Task decoding
//!
//! The queue has shipped three generations of task wire schemas:
//!
//! - 1.x: an envelope holding a single kind-tagged child object, with
//!   camelCase field names (`{"lifecycleEvent": {"groupId": …}}`)
//! - 2.x: the same envelope shape with snake_case names
//!   (`{"schema": "2.0", "data_event": {"group_id": …}}`)
//! - 3.x: flat, with an explicit `type` field
//!   (`{"schema": "3.0", "type": "data_event", "group_id": …}`)
//!
//! [`Task::decode`] folds all three into one canonical, immutable record so
//! the rest of the system never sees a raw payload.

use semver::Version;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::topic::Topic;

/// Errors produced while decoding a raw task payload
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload was not a JSON object
    #[error("task payload is not a JSON object")]
    NotAnObject,

    /// The schema version is not one this client understands
    ///
    /// Never coerced or retried; the task is left unacknowledged for
    /// server-side investigation.
    #[error("task schema not supported: {0}")]
    UnsupportedSchema(String),

    /// A 1.x/2.x envelope contained none of the known kind tags
    #[error("task has no recognizable kind tag")]
    MissingKind,

    /// A required field was absent from the active payload
    #[error("task is missing required field `{0}`")]
    MissingField(&'static str),

    /// A field was present but carried an unusable value
    #[error("task field `{0}` has invalid value `{1}`")]
    InvalidField(&'static str, String),
}

/// What kind of work a task represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Tenant lifecycle notification (installed, activated, uninstalled)
    LifecycleEvent,
    /// Sync boundary marker (start/end of a task group)
    SyncEvent,
    /// A change to a business entity
    DataEvent,
}

impl TaskKind {
    /// Fixed priority order used when probing 1.x/2.x envelopes; the first
    /// structural match wins.
    const ALL: [TaskKind; 3] = [
        TaskKind::LifecycleEvent,
        TaskKind::SyncEvent,
        TaskKind::DataEvent,
    ];

    /// The envelope key carrying this kind's payload in the given schema
    /// generation
    fn tag(self, major: u64) -> &'static str {
        match (self, major) {
            (TaskKind::LifecycleEvent, 1) => "lifecycleEvent",
            (TaskKind::LifecycleEvent, _) => "lifecycle_event",
            (TaskKind::SyncEvent, 1) => "syncEvent",
            (TaskKind::SyncEvent, _) => "sync_event",
            (TaskKind::DataEvent, 1) => "dataEvent",
            (TaskKind::DataEvent, _) => "data_event",
        }
    }

    /// Parses the 3.x `type` field value
    fn from_wire(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| text.eq_ignore_ascii_case(kind.tag(2)))
    }
}

/// The action a task asks the consumer to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    NotApplicable,
    // Lifecycle actions
    TenantInstalled,
    TenantActivated,
    TenantUninstalled,
    // Sync boundary actions
    SyncStart,
    SyncEnd,
    // Data actions
    Add,
    Change,
    Delete,
    Set,
}

impl TaskAction {
    fn from_wire(text: &str) -> Option<Self> {
        let action = match text.to_ascii_lowercase().as_str() {
            "not_applicable" => Self::NotApplicable,
            "tenant_installed" => Self::TenantInstalled,
            "tenant_activated" => Self::TenantActivated,
            "tenant_uninstalled" => Self::TenantUninstalled,
            "sync_start" => Self::SyncStart,
            "sync_end" => Self::SyncEnd,
            "add" => Self::Add,
            "change" => Self::Change,
            "delete" => Self::Delete,
            "set" => Self::Set,
            _ => return None,
        };
        Some(action)
    }
}

/// Where a task originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrigin {
    /// Initial load of data
    Initial,
    /// Resend of all data
    Resend,
    /// Ingestion
    Ingestion,
}

impl TaskOrigin {
    fn from_wire(text: &str) -> Option<Self> {
        let origin = match text.to_ascii_lowercase().as_str() {
            "initial" => Self::Initial,
            "resend" => Self::Resend,
            "ingestion" => Self::Ingestion,
            _ => return None,
        };
        Some(origin)
    }
}

/// Field name table for one schema generation
///
/// 1.x used camelCase names; 2.x and later use snake_case. Resolving every
/// access through this table keeps a single extraction path for both.
struct FieldNames {
    object_type: &'static str,
    action: &'static str,
    kind: &'static str,
    data: &'static str,
    changes: &'static str,
    group_id: &'static str,
    sequence: &'static str,
    id: &'static str,
}

const CAMEL_NAMES: FieldNames = FieldNames {
    object_type: "objectType",
    action: "action",
    kind: "type",
    data: "data",
    changes: "changes",
    group_id: "groupId",
    sequence: "sequence",
    id: "id",
};

const SNAKE_NAMES: FieldNames = FieldNames {
    object_type: "object_type",
    action: "action",
    kind: "type",
    data: "data",
    changes: "changes",
    group_id: "group_id",
    sequence: "sequence",
    id: "id",
};

fn names_for(major: u64) -> &'static FieldNames {
    if major == 1 { &CAMEL_NAMES } else { &SNAKE_NAMES }
}

/// One unit of work delivered by the remote queue
///
/// An immutable value object; identity is the UUID. The sequence number
/// orders tasks within one topic only; there is no global ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: Uuid,
    schema: String,
    kind: TaskKind,
    action: TaskAction,
    topic: Option<Topic>,
    group_id: Option<String>,
    sequence: Option<i64>,
    origin: Option<TaskOrigin>,
    attributes: Option<Value>,
    changes: Option<Value>,
}

impl Task {
    /// Decodes a raw wire payload into a canonical task
    ///
    /// Determines the schema generation, locates the active payload (the
    /// kind-tagged child for 1.x/2.x, the payload itself for 3.x), and
    /// extracts every canonical field through the per-generation name table.
    pub fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let envelope = raw.as_object().ok_or(DecodeError::NotAnObject)?;

        let schema = schema_version_of(envelope);
        let major =
            parse_major(&schema).ok_or_else(|| DecodeError::UnsupportedSchema(schema.clone()))?;

        let (kind, payload) = match major {
            1 | 2 => TaskKind::ALL
                .into_iter()
                .find_map(|kind| {
                    envelope
                        .get(kind.tag(major))
                        .and_then(Value::as_object)
                        .map(|payload| (kind, payload))
                })
                .ok_or(DecodeError::MissingKind)?,
            3 => {
                let text = str_field(envelope, SNAKE_NAMES.kind)
                    .ok_or(DecodeError::MissingField("type"))?;
                let kind = TaskKind::from_wire(text)
                    .ok_or_else(|| DecodeError::InvalidField("type", text.to_string()))?;
                (kind, envelope)
            }
            _ => return Err(DecodeError::UnsupportedSchema(schema)),
        };

        let names = names_for(major);

        let id_text = str_field(payload, names.id).ok_or(DecodeError::MissingField("id"))?;
        let id = Uuid::parse_str(id_text)
            .map_err(|_| DecodeError::InvalidField("id", id_text.to_string()))?;

        let action_text =
            str_field(payload, names.action).ok_or(DecodeError::MissingField("action"))?;
        let action = TaskAction::from_wire(action_text)
            .ok_or_else(|| DecodeError::InvalidField("action", action_text.to_string()))?;

        // Lifecycle and sync tasks carry no topic; absent means none.
        let topic = str_field(payload, names.object_type).map(Topic::parse);

        let origin = match str_field(payload, "origin") {
            Some(text) => Some(
                TaskOrigin::from_wire(text)
                    .ok_or_else(|| DecodeError::InvalidField("origin", text.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            id,
            schema,
            kind,
            action,
            topic,
            group_id: str_field(payload, names.group_id).map(String::from),
            sequence: payload.get(names.sequence).and_then(Value::as_i64),
            origin,
            attributes: payload.get(names.data).cloned(),
            changes: payload.get(names.changes).cloned(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The raw schema version string (`"1"` when the payload carried none)
    pub fn schema_version(&self) -> &str {
        &self.schema
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn action(&self) -> TaskAction {
        self.action
    }

    /// The affected entity, or `None` for lifecycle and sync tasks
    pub fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    /// The sync group this task belongs to
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Per-topic delivery sequence; ordering is meaningful within one topic
    /// only
    pub fn sequence(&self) -> Option<i64> {
        self.sequence
    }

    pub fn origin(&self) -> Option<TaskOrigin> {
        self.origin
    }

    /// The entity attribute payload
    pub fn attributes(&self) -> Option<&Value> {
        self.attributes.as_ref()
    }

    /// Partial-update payload, present on `Change` tasks
    pub fn changes(&self) -> Option<&Value> {
        self.changes.as_ref()
    }
}

/// Determines the schema version string of an envelope
///
/// Absent means 1.x, except for a short-lived production bug that nested the
/// schema inside the task's only child (`{"lifecycle_event": {"schema": …}}`);
/// payloads of that era use the nested version.
fn schema_version_of(envelope: &Map<String, Value>) -> String {
    if let Some(schema) = str_field(envelope, "schema") {
        return schema.to_string();
    }

    if envelope.len() == 1 {
        if let Some(schema) = envelope
            .values()
            .next()
            .and_then(Value::as_object)
            .and_then(|inner| str_field(inner, "schema"))
        {
            return schema.to_string();
        }
    }

    "1".to_string()
}

/// Extracts the major version from a possibly partial semver string
/// (`"2"`, `"2.0"`, and `"2.0.1"` all yield 2)
fn parse_major(text: &str) -> Option<u64> {
    let core = text
        .trim()
        .split_once(['-', '+'])
        .map_or(text.trim(), |(core, _)| core);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0"),
        2 => format!("{core}.0"),
        _ => core.to_string(),
    };
    Version::parse(&padded).ok().map(|version| version.major)
}

fn str_field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    object.get(name).and_then(Value::as_str)
}
