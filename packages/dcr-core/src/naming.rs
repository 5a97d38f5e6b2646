//! Platform-legal DCR name resolution.
//!
//! A name is `prefix + table + suffix`. When that is too long the table part
//! is replaced by a known short code or, failing that, truncated. The result
//! never starts or ends with a separator and always fits the constraint.

use serde::{Deserialize, Serialize};

use crate::error::{DcrError, Result};
use crate::schema::CUSTOM_TABLE_SUFFIX;
use crate::warning::TableWarning;

/// Characters treated as separators for trimming.
const SEPARATORS: &[char] = &['-', '_', '.'];

/// Short codes for long, well-known table names (keys compared
/// case-insensitively, without the `_CL` suffix).
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("CommonSecurityLog", "CSL"),
    ("SecurityEvent", "SecEvt"),
    ("WindowsEvent", "WinEvt"),
    ("DeviceProcessEvents", "DevProc"),
    ("DeviceNetworkEvents", "DevNet"),
    ("DeviceFileEvents", "DevFile"),
    ("DeviceRegistryEvents", "DevReg"),
    ("DeviceLogonEvents", "DevLogon"),
    ("AzureDiagnostics", "AzDiag"),
    ("SigninLogs", "Signin"),
    ("AADNonInteractiveUserSignInLogs", "AADNonIntSignin"),
    ("AuditLogs", "Audit"),
    ("Syslog", "Syslog"),
    ("ASimNetworkSessionLogs", "ASimNetSess"),
    ("ASimDnsActivityLogs", "ASimDns"),
    ("ASimWebSessionLogs", "ASimWebSess"),
    ("ASimAuditEventLogs", "ASimAudit"),
    ("ASimProcessEventLogs", "ASimProc"),
    ("ThreatIntelligenceIndicator", "TIIndicator"),
    ("OfficeActivity", "OfficeAct"),
];

/// Length and affix rules for a resource name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameConstraint {
    /// Maximum name length
    pub max_length: usize,
    /// Minimum name length after trimming
    pub min_length: usize,
    /// Prepended to the table name
    pub prefix: String,
    /// Appended to the table name
    pub suffix: String,
}

impl Default for NameConstraint {
    fn default() -> Self {
        Self {
            max_length: 64,
            min_length: 3,
            prefix: "dcr-".to_string(),
            suffix: String::new(),
        }
    }
}

/// Looks up the short code for a table name.
pub fn abbreviation(table: &str) -> Option<&'static str> {
    let stem = strip_suffix_ci(table.trim(), CUSTOM_TABLE_SUFFIX);
    ABBREVIATIONS
        .iter()
        .find(|(long, _)| long.eq_ignore_ascii_case(stem))
        .map(|(_, short)| *short)
}

/// What the override hook is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameProposal<'a> {
    /// Name computed from the constraint
    pub computed: &'a str,
    /// 1-based attempt number
    pub attempt: u32,
    /// Why the previous replacement was refused
    pub last_error: Option<String>,
}

/// Answer of the override hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideDecision {
    Accept,
    Reject,
    Replace(String),
}

/// Hook that may accept, reject or replace a computed name.
pub trait NameOverride {
    fn review(&mut self, proposal: &NameProposal<'_>) -> OverrideDecision;
}

impl<F> NameOverride for F
where
    F: FnMut(&NameProposal<'_>) -> OverrideDecision,
{
    fn review(&mut self, proposal: &NameProposal<'_>) -> OverrideDecision {
        self(proposal)
    }
}

/// A resolved name with the warnings raised while shortening it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub warnings: Vec<TableWarning>,
    /// True when the override hook supplied the name
    pub overridden: bool,
}

/// Computes names under a [`NameConstraint`].
#[derive(Debug, Clone)]
pub struct NameResolver {
    constraint: NameConstraint,
    max_override_attempts: u32,
}

impl NameResolver {
    /// Creates a resolver allowing three invalid override replacements.
    pub fn new(constraint: NameConstraint) -> Self {
        Self {
            constraint,
            max_override_attempts: 3,
        }
    }

    /// Sets how many invalid replacements are tolerated before the hook is
    /// abandoned.
    pub fn with_max_override_attempts(mut self, attempts: u32) -> Self {
        self.max_override_attempts = attempts.max(1);
        self
    }

    /// Constraint in use.
    pub fn constraint(&self) -> &NameConstraint {
        &self.constraint
    }

    /// Resolves `raw` into a legal name, consulting `hook` when given.
    ///
    /// # Errors
    /// `NameUnresolvable` when the constraint cannot be met or the hook
    /// rejects the computed name.
    pub fn resolve(&self, raw: &str, hook: Option<&mut dyn NameOverride>) -> Result<ResolvedName> {
        let mut computed = self.compute(raw)?;
        let Some(hook) = hook else {
            return Ok(computed);
        };

        let mut invalid = 0u32;
        let mut last_error = None;
        loop {
            let proposal = NameProposal {
                computed: &computed.name,
                attempt: invalid + 1,
                last_error: last_error.take(),
            };
            match hook.review(&proposal) {
                OverrideDecision::Accept => return Ok(computed),
                OverrideDecision::Reject => {
                    return Err(DcrError::NameUnresolvable {
                        raw: raw.to_string(),
                        reason: "computed name rejected by override".to_string(),
                    })
                }
                OverrideDecision::Replace(candidate) => match self.validate(&candidate) {
                    Ok(name) => {
                        tracing::info!(raw, name = %name, "Using override name");
                        return Ok(ResolvedName {
                            name,
                            warnings: Vec::new(),
                            overridden: true,
                        });
                    }
                    Err(reason) => {
                        invalid += 1;
                        tracing::warn!(raw, candidate = %candidate, attempt = invalid, "{}", reason);
                        if invalid >= self.max_override_attempts {
                            computed
                                .warnings
                                .push(TableWarning::OverrideAbandoned { attempts: invalid });
                            return Ok(computed);
                        }
                        last_error = Some(reason);
                    }
                },
            }
        }
    }

    /// Computes a name without any override.
    pub fn compute(&self, raw: &str) -> Result<ResolvedName> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(self.unresolvable(raw, "empty table name"));
        }

        let prefix = sanitize(&self.constraint.prefix);
        let suffix = sanitize(&self.constraint.suffix);
        let body = sanitize(raw);
        let mut warnings = Vec::new();

        let budget = self
            .constraint
            .max_length
            .saturating_sub(prefix.len() + suffix.len());

        let body = if prefix.len() + body.len() + suffix.len() <= self.constraint.max_length {
            body
        } else if let Some(short) = abbreviation(raw) {
            let short = truncate(&sanitize(short), budget);
            warnings.push(TableWarning::NameAbbreviated {
                from: raw.to_string(),
                to: short.clone(),
            });
            short
        } else {
            let cut = truncate(&body, budget);
            warnings.push(TableWarning::NameTruncated {
                from: raw.to_string(),
                to: cut.clone(),
            });
            cut
        };

        let composed = format!("{}{}{}", prefix, body, suffix);
        let name = composed.trim_matches(SEPARATORS).to_string();
        self.check_length(raw, &name)?;

        Ok(ResolvedName {
            name,
            warnings,
            overridden: false,
        })
    }

    /// Validates a free-text replacement, returning the trimmed name.
    pub fn validate(&self, candidate: &str) -> std::result::Result<String, String> {
        let name = candidate.trim().trim_matches(SEPARATORS);
        if let Some(bad) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(format!("name '{}' contains invalid character '{}'", name, bad));
        }
        if name.len() < self.constraint.min_length {
            return Err(format!(
                "name '{}' is shorter than {} characters",
                name, self.constraint.min_length
            ));
        }
        if name.len() > self.constraint.max_length {
            return Err(format!(
                "name '{}' is longer than {} characters",
                name, self.constraint.max_length
            ));
        }
        Ok(name.to_string())
    }

    fn check_length(&self, raw: &str, name: &str) -> Result<()> {
        if name.len() < self.constraint.min_length {
            return Err(self.unresolvable(
                raw,
                &format!(
                    "'{}' is shorter than {} characters",
                    name, self.constraint.min_length
                ),
            ));
        }
        if name.len() > self.constraint.max_length {
            return Err(self.unresolvable(
                raw,
                &format!(
                    "prefix and suffix alone exceed {} characters",
                    self.constraint.max_length
                ),
            ));
        }
        Ok(())
    }

    fn unresolvable(&self, raw: &str, reason: &str) -> DcrError {
        DcrError::NameUnresolvable {
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || SEPARATORS.contains(&c)
}

/// Replaces characters outside `[A-Za-z0-9-_.]` with `-`.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_name_char(c) { c } else { '-' })
        .collect()
}

/// Truncates an ASCII string to `max` characters.
fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn strip_suffix_ci<'a>(value: &'a str, suffix: &str) -> &'a str {
    let split = value.len().saturating_sub(suffix.len());
    if value.len() > suffix.len()
        && value.is_char_boundary(split)
        && value[split..].eq_ignore_ascii_case(suffix)
    {
        &value[..split]
    } else {
        value
    }
}
