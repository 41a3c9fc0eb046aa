//! Provisioning request vocabulary, pricing, and validation rules.
//!
//! Wire values for every enum are lowercase strings, shared between the
//! database `CHECK` constraints, the JSON API, and the demo client.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits and defaults
// ---------------------------------------------------------------------------

/// Width of `provisioned_databases.db_name`.
pub const MAX_DB_NAME_LENGTH: usize = 100;

/// Longest `_{environment}_{db_type}_{suffix}` tail appended by
/// [`generate_db_name`] ("_staging_postgres_" plus the suffix).
pub const MAX_DB_NAME_TAIL_LENGTH: usize = "_staging_postgres_".len() + DB_NAME_SUFFIX_LENGTH;

/// Maximum length of a team name. Bounded so every generated database
/// name fits its column.
pub const MAX_TEAM_NAME_LENGTH: usize = MAX_DB_NAME_LENGTH - MAX_DB_NAME_TAIL_LENGTH;

/// Maximum length of a free-text purpose.
pub const MAX_PURPOSE_LENGTH: usize = 2000;

/// Maximum length of an approver identity.
pub const MAX_APPROVER_LENGTH: usize = 100;

/// Number of hex characters appended to generated database names.
pub const DB_NAME_SUFFIX_LENGTH: usize = 8;

/// Unfiltered request listings return at most this many rows.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Host reported for provisioned databases when none is configured.
pub const DEFAULT_PROVISION_HOST: &str = "db-cluster.example.com";

// ---------------------------------------------------------------------------
// Wire enums
// ---------------------------------------------------------------------------

macro_rules! define_wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The lowercase wire string for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }

            /// Parse a wire string, rejecting anything outside [`Self::ALL`].
            pub fn parse(value: &str) -> Result<Self, CoreError> {
                match value {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        $label,
                        [$($wire),+].join(", ")
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_wire_enum! {
    /// Database engine requested by a team.
    DbType ("db_type") {
        Postgres = "postgres",
        Mysql = "mysql",
        Redis = "redis",
    }
}

define_wire_enum! {
    /// Deployment environment the database is provisioned into.
    Environment ("environment") {
        Dev = "dev",
        Staging = "staging",
        Prod = "prod",
    }
}

define_wire_enum! {
    /// Instance size tier; drives the monthly cost estimate.
    DbSize ("size") {
        Small = "small",
        Medium = "medium",
        Large = "large",
    }
}

define_wire_enum! {
    /// Lifecycle status of a provisioning request.
    RequestStatus ("status") {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
        Provisioned = "provisioned",
    }
}

define_wire_enum! {
    /// Decision taken by an approver on a pending request.
    ApprovalAction ("action") {
        Approve = "approve",
        Reject = "reject",
    }
}

impl DbType {
    /// Default listening port of the engine.
    pub fn default_port(self) -> u16 {
        match self {
            DbType::Postgres => 5432,
            DbType::Mysql => 3306,
            DbType::Redis => 6379,
        }
    }
}

impl DbSize {
    /// Estimated monthly cost in dollars.
    pub fn monthly_cost(self) -> f64 {
        match self {
            DbSize::Small => 50.00,
            DbSize::Medium => 150.00,
            DbSize::Large => 500.00,
        }
    }
}

impl ApprovalAction {
    /// Status a pending request moves to when this action is applied.
    ///
    /// An approval is immediately followed by provisioning, which moves the
    /// request on to [`RequestStatus::Provisioned`].
    pub fn resulting_status(self) -> RequestStatus {
        match self {
            ApprovalAction::Approve => RequestStatus::Approved,
            ApprovalAction::Reject => RequestStatus::Rejected,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Team names become part of generated database names, so only
/// alphanumerics, `-` and `_` are accepted.
pub fn validate_team_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("team_name must not be empty".into()));
    }
    if name.len() > MAX_TEAM_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "team_name must be at most {MAX_TEAM_NAME_LENGTH} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "team_name '{name}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

/// Validate the free-text justification attached to a request.
pub fn validate_purpose(purpose: &str) -> Result<(), CoreError> {
    if purpose.trim().is_empty() {
        return Err(CoreError::Validation("purpose must not be empty".into()));
    }
    if purpose.len() > MAX_PURPOSE_LENGTH {
        return Err(CoreError::Validation(format!(
            "purpose must be at most {MAX_PURPOSE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate the identity recorded against an approval decision.
pub fn validate_approver(approver: &str) -> Result<(), CoreError> {
    if approver.trim().is_empty() {
        return Err(CoreError::Validation("approver must not be empty".into()));
    }
    if approver.len() > MAX_APPROVER_LENGTH {
        return Err(CoreError::Validation(format!(
            "approver must be at most {MAX_APPROVER_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Only pending requests can be approved or rejected.
pub fn ensure_pending(status: RequestStatus) -> Result<(), CoreError> {
    if status == RequestStatus::Pending {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!("Request already {status}")))
    }
}

// ---------------------------------------------------------------------------
// Naming and pricing
// ---------------------------------------------------------------------------

/// Build the name of a newly provisioned database.
///
/// Format: `{team}_{env}_{db_type}_{suffix}` with the team lower-cased and
/// dashes folded to underscores so the result is a valid identifier in all
/// three engines.
pub fn generate_db_name(team: &str, env: Environment, db_type: DbType, suffix: &str) -> String {
    let team = team.to_ascii_lowercase().replace('-', "_");
    format!("{team}_{env}_{db_type}_{suffix}")
}

/// Random suffix for [`generate_db_name`]: the first eight hex digits of a v4 UUID.
pub fn random_name_suffix() -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(DB_NAME_SUFFIX_LENGTH);
    hex
}

/// Round a dollar amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
