use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Gerrit label for code review votes
pub const CODE_REVIEW: &str = "Code-Review";
/// Gerrit label for CI verification results
pub const VERIFIED: &str = "Verified";
/// Gerrit label controlling whether a change is ready to merge
pub const WORKFLOW: &str = "Workflow";
/// Legacy Gerrit approval label
pub const APPROVED: &str = "Approved";

/// Change status Gerrit reports for changes marked work in progress
pub const STATUS_WORK_IN_PROGRESS: &str = "WORKINPROGRESS";

/// Structural problems in a record returned by Gerrit
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("change {id} has no patch sets")]
    NoPatchSets { id: String },

    #[error("expected an integer, got {0:?}")]
    NotAnInteger(String),

    #[error("malformed change record")]
    Malformed(#[from] serde_json::Error),
}

/// A vote or check result attached to a patch set
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    /// The label, like `Code-Review` or `Verified`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Negative values reject or fail; zero and above are neutral or approving.
    #[serde(deserialize_with = "integer")]
    pub value: i32,
    /// Epoch seconds.
    pub granted_on: i64,
}

impl Approval {
    pub fn is_negative(&self) -> bool {
        self.value < 0
    }
}

/// One revision of a change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet {
    #[serde(deserialize_with = "integer")]
    pub number: u32,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub created_on: Option<i64>,
    #[serde(default)]
    pub approvals: Vec<Approval>,
}

impl PatchSet {
    /// A patch set counts as approved once it has a legacy `Approved` vote
    /// or a positive `Workflow` vote.
    pub fn is_approved(&self) -> bool {
        self.approvals.iter().any(|approval| {
            approval.kind == APPROVED || (approval.kind == WORKFLOW && approval.value > 0)
        })
    }
}

/// A single review submission as returned by a Gerrit query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub id: String,
    pub url: String,
    pub commit_message: String,
    /// Epoch seconds.
    pub last_updated: i64,
    pub status: String,
    #[serde(default)]
    pub wip: bool,
    pub patch_sets: Vec<PatchSet>,
}

impl Change {
    /// Parse and validate a change row from Gerrit's JSON output
    pub fn from_json(value: serde_json::Value) -> Result<Self, RecordError> {
        let change: Change = serde_json::from_value(value)?;
        if change.patch_sets.is_empty() {
            return Err(RecordError::NoPatchSets { id: change.id });
        }
        Ok(change)
    }

    /// First line of the commit message
    pub fn subject(&self) -> &str {
        self.commit_message.lines().next().unwrap_or_default()
    }

    /// Sort patch sets by number and return the newest one
    pub fn current_patch_set(&mut self) -> Option<&mut PatchSet> {
        self.patch_sets.sort_by_key(|patch_set| patch_set.number);
        self.patch_sets.last_mut()
    }

    /// Whether the owner has marked this change as not ready for review
    pub fn is_work_in_progress(&self) -> bool {
        if self.wip || self.status == STATUS_WORK_IN_PROGRESS {
            return true;
        }

        self.patch_sets
            .iter()
            .max_by_key(|patch_set| patch_set.number)
            .map(|latest| {
                latest
                    .approvals
                    .iter()
                    .any(|approval| approval.kind == WORKFLOW && approval.is_negative())
            })
            .unwrap_or(false)
    }
}

/// Gerrit sends some integers as strings (`"value": "-1"`), newer versions as numbers.
fn integer<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + TryFrom<i64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    let raw = Raw::deserialize(deserializer)?;
    let parsed = match &raw {
        Raw::Number(n) => T::try_from(*n).ok(),
        Raw::Text(s) => s.trim().parse::<T>().ok(),
    };

    parsed.ok_or_else(|| {
        let shown = match raw {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        serde::de::Error::custom(RecordError::NotAnInteger(shown))
    })
}
