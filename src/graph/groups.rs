//! Top-level pointer classification
//!
//! Maps pointers of reusable resources onto a [`GroupKind`]. The walker
//! uses the kind for grouping and for the default priority; hooks on the
//! context may override both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::IrError;
use crate::ir::HttpMethod;

/// Priority for pointers nothing claims
pub const NEUTRAL_PRIORITY: u64 = 10;

/// Kinds of top-level resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupKind {
    Operation,
    Parameter,
    RequestBody,
    Schema,
    Server,
    Webhook,
}

/// Servers, then schemas, then parameters, request bodies, operations, webhooks
pub const DEFAULT_PREFER_GROUPS: [GroupKind; 6] = [
    GroupKind::Server,
    GroupKind::Schema,
    GroupKind::Parameter,
    GroupKind::RequestBody,
    GroupKind::Operation,
    GroupKind::Webhook,
];

impl GroupKind {
    pub const ALL: [GroupKind; 6] = [
        GroupKind::Operation,
        GroupKind::Parameter,
        GroupKind::RequestBody,
        GroupKind::Schema,
        GroupKind::Server,
        GroupKind::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operation => "operation",
            Self::Parameter => "parameter",
            Self::RequestBody => "requestBody",
            Self::Schema => "schema",
            Self::Server => "server",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKind {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| IrError::InvalidFormat(format!("unknown group kind '{}'", s)))
    }
}

static GROUP_PATTERNS: LazyLock<Vec<(GroupKind, Regex)>> = LazyLock::new(|| {
    let methods = HttpMethod::ALL.map(|m| m.as_str()).join("|");
    [
        (GroupKind::Operation, format!(r"^#/paths/[^/]+/(?:{})$", methods)),
        (GroupKind::Parameter, r"^#/components/parameters/[^/]+$".to_string()),
        (
            GroupKind::RequestBody,
            r"^#/components/requestBodies/[^/]+$".to_string(),
        ),
        (
            GroupKind::Schema,
            r"^#/(?:components/schemas|definitions)/[^/]+$".to_string(),
        ),
        (GroupKind::Server, r"^#/servers/[^/]+$".to_string()),
        (GroupKind::Webhook, format!(r"^#/webhooks/[^/]+/(?:{})$", methods)),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(&pattern).expect("static pattern")))
    .collect()
});

/// Classify `pointer`, optionally restricted to one `kind`.
pub fn match_top_level_pointer(pointer: &str, kind: Option<GroupKind>) -> Option<GroupKind> {
    GROUP_PATTERNS
        .iter()
        .filter(|(k, _)| kind.map_or(true, |wanted| wanted == *k))
        .find(|(_, re)| re.is_match(pointer))
        .map(|(k, _)| *k)
}

/// Classify `pointer` against every kind.
pub fn match_pointer_to_group(pointer: &str) -> Option<GroupKind> {
    match_top_level_pointer(pointer, None)
}

/// Position of the pointer's kind in [`DEFAULT_PREFER_GROUPS`], or
/// [`NEUTRAL_PRIORITY`] for unclassified pointers.
pub fn default_pointer_priority(pointer: &str) -> u64 {
    match_pointer_to_group(pointer)
        .and_then(|kind| DEFAULT_PREFER_GROUPS.iter().position(|k| *k == kind))
        .map_or(NEUTRAL_PRIORITY, |index| index as u64)
}
