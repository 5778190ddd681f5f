//! Dataset lifecycle: state log and transition rules.
//!
//! The log is append-only and ordered oldest-first; the last entry is the
//! current state. Transitions never touch earlier entries.
//!
//! | Command       | From                      | To       | expires_on            |
//! |---------------|---------------------------|----------|-----------------------|
//! | create        | -                         | NORMAL   | start + retention     |
//! | renew         | NORMAL, EXPIRED, RENEWED  | RENEWED  | previous + days       |
//! | drop          | all but DROPPED, DELETED  | DROPPED  | carried over          |
//! | delete        | DROPPED                   | DELETED  | none                  |
//! | check-expiry  | NORMAL, RENEWED (expired) | EXPIRED  | carried over          |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::expiry::{compute_expiry, ExpiryOverride};
use crate::limits::AUTO_USER_NAME;

/// Lifecycle state type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateType {
    Normal,
    Expired,
    Renewed,
    Dropped,
    Deleted,
}

impl StateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Expired => "EXPIRED",
            Self::Renewed => "RENEWED",
            Self::Dropped => "DROPPED",
            Self::Deleted => "DELETED",
        }
    }

    pub fn is_renewable(&self) -> bool {
        matches!(self, Self::Normal | Self::Expired | Self::Renewed)
    }

    /// States the expiry check may move to EXPIRED.
    pub fn can_expire(&self) -> bool {
        matches!(self, Self::Normal | Self::Renewed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command names used in transition errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Create,
    Renew,
    Drop,
    Delete,
    CheckExpiry,
}

impl LifecycleCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Renew => "renew",
            Self::Drop => "drop",
            Self::Delete => "delete",
            Self::CheckExpiry => "check-expiry",
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a dataset's lifecycle log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    #[serde(rename = "type")]
    pub state: StateType,
    pub created_at: DateTime<Utc>,
    pub expires_on: Option<DateTime<Utc>>,
    /// None for system-generated entries
    pub user_id: Option<String>,
    pub user_name: String,
    pub notes: String,
}

impl LifecycleState {
    /// A system-generated entry.
    pub fn auto(
        state: StateType,
        created_at: DateTime<Utc>,
        expires_on: Option<DateTime<Utc>>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            state,
            created_at,
            expires_on,
            user_id: None,
            user_name: AUTO_USER_NAME.to_string(),
            notes: notes.into(),
        }
    }

    /// A user-initiated entry.
    pub fn by_user(
        state: StateType,
        created_at: DateTime<Utc>,
        expires_on: Option<DateTime<Utc>>,
        actor: &Actor,
    ) -> Self {
        Self {
            state,
            created_at,
            expires_on,
            user_id: Some(actor.user_id.clone()),
            user_name: actor.user_name.clone(),
            notes: actor.notes.clone(),
        }
    }

    pub fn is_system_generated(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Non-empty, append-only lifecycle log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LifecycleState>", into = "Vec<LifecycleState>")]
pub struct LifecycleLog {
    entries: Vec<LifecycleState>,
}

impl LifecycleLog {
    pub fn new(first: LifecycleState) -> Self {
        Self {
            entries: vec![first],
        }
    }

    /// The current state (last appended entry).
    pub fn current(&self) -> &LifecycleState {
        // Non-empty by construction and by `TryFrom`.
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LifecycleState] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub(crate) fn append(&mut self, state: LifecycleState) {
        self.entries.push(state);
    }
}

impl TryFrom<Vec<LifecycleState>> for LifecycleLog {
    type Error = String;

    fn try_from(entries: Vec<LifecycleState>) -> Result<Self, Self::Error> {
        if entries.is_empty() {
            return Err("lifecycle history is empty".to_string());
        }
        Ok(Self { entries })
    }
}

impl From<LifecycleLog> for Vec<LifecycleState> {
    fn from(log: LifecycleLog) -> Self {
        log.entries
    }
}

/// Who requested a user-initiated transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub user_name: String,
    pub notes: String,
}

impl Actor {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            notes: notes.into(),
        }
    }
}

/// A transition request against an existing log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Renew {
        actor: Actor,
        overrides: ExpiryOverride,
    },
    Drop {
        actor: Actor,
    },
    /// Mark a dropped dataset as deleted.
    Delete {
        actor: Actor,
    },
    /// System expiry check.
    Expire,
}

impl Transition {
    pub fn command(&self) -> LifecycleCommand {
        match self {
            Self::Renew { .. } => LifecycleCommand::Renew,
            Self::Drop { .. } => LifecycleCommand::Drop,
            Self::Delete { .. } => LifecycleCommand::Delete,
            Self::Expire => LifecycleCommand::CheckExpiry,
        }
    }
}

/// Inputs a transition is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    /// Whether the dataset is exempt from expiry
    pub excluded: bool,
    /// Retention of the dataset's policy, in days
    pub retention_days: u32,
    pub now: DateTime<Utc>,
}

/// Result of evaluating a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new entry to append.
    Applied(LifecycleState),
    /// Nothing to do (only produced by the expiry check).
    Unchanged,
}

/// A guard that was not satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    pub command: LifecycleCommand,
    pub current: StateType,
}

const EXPIRY_NOTES: &str = "auto generated during expiry date update";

/// Evaluates `transition` against the current entry of a log.
pub fn evaluate(
    current: &LifecycleState,
    transition: &Transition,
    ctx: &TransitionContext,
) -> Result<Outcome, Rejected> {
    let reject = || Rejected {
        command: transition.command(),
        current: current.state,
    };

    match transition {
        Transition::Renew { actor, overrides } => {
            if ctx.excluded || !current.state.is_renewable() {
                return Err(reject());
            }
            let reference = current.expires_on.unwrap_or(ctx.now);
            let expires_on = compute_expiry(reference, ctx.retention_days, *overrides);
            Ok(Outcome::Applied(LifecycleState::by_user(
                StateType::Renewed,
                ctx.now,
                Some(expires_on),
                actor,
            )))
        }
        Transition::Drop { actor } => {
            if current.state == StateType::Dropped || current.state.is_terminal() {
                return Err(reject());
            }
            Ok(Outcome::Applied(LifecycleState::by_user(
                StateType::Dropped,
                ctx.now,
                current.expires_on,
                actor,
            )))
        }
        Transition::Delete { actor } => {
            if current.state != StateType::Dropped {
                return Err(reject());
            }
            Ok(Outcome::Applied(LifecycleState::by_user(
                StateType::Deleted,
                ctx.now,
                None,
                actor,
            )))
        }
        Transition::Expire => {
            if ctx.excluded || !current.state.can_expire() {
                return Ok(Outcome::Unchanged);
            }
            match current.expires_on {
                Some(expires_on) if ctx.now > expires_on => Ok(Outcome::Applied(
                    LifecycleState::auto(StateType::Expired, ctx.now, Some(expires_on), EXPIRY_NOTES),
                )),
                _ => Ok(Outcome::Unchanged),
            }
        }
    }
}
