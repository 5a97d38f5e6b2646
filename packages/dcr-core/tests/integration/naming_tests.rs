//! Name resolution against realistic constraints.

use dcr_core::error::DcrError;
use dcr_core::naming::{NameConstraint, NameProposal, NameResolver, OverrideDecision};
use dcr_core::warning::TableWarning;

fn cribl_constraint() -> NameConstraint {
    NameConstraint {
        max_length: 30,
        min_length: 3,
        prefix: "dcr-cribl-".into(),
        suffix: "-westeurope".into(),
    }
}

#[test]
fn test_abbreviation_fits_tight_budget() {
    let resolver = NameResolver::new(cribl_constraint());
    let resolved = resolver.resolve("CommonSecurityLog", None).unwrap();
    assert_eq!(resolved.name, "dcr-cribl-CSL-westeurope");
    assert!(resolved.name.len() <= 30);
    assert!(resolved
        .warnings
        .iter()
        .any(|w| matches!(w, TableWarning::NameAbbreviated { .. })));
}

#[test]
fn test_override_retries_then_accepts_valid_replacement() {
    let resolver = NameResolver::new(cribl_constraint());
    let mut seen = Vec::new();
    let mut hook = |proposal: &NameProposal<'_>| {
        seen.push(proposal.last_error.clone());
        if proposal.attempt == 1 {
            OverrideDecision::Replace("x".repeat(80))
        } else {
            OverrideDecision::Replace("dcr-cribl-cef".into())
        }
    };
    let resolved = resolver.resolve("CommonSecurityLog", Some(&mut hook)).unwrap();
    assert_eq!(resolved.name, "dcr-cribl-cef");
    assert!(resolved.overridden);
    assert_eq!(seen.len(), 2);
    assert!(seen[0].is_none());
    assert!(seen[1].is_some());
}

#[test]
fn test_override_abandoned_after_invalid_attempts() {
    let resolver = NameResolver::new(cribl_constraint()).with_max_override_attempts(2);
    let mut hook = |_: &NameProposal<'_>| OverrideDecision::Replace(String::new());
    let resolved = resolver.resolve("CommonSecurityLog", Some(&mut hook)).unwrap();
    assert_eq!(resolved.name, "dcr-cribl-CSL-westeurope");
    assert!(resolved
        .warnings
        .contains(&TableWarning::OverrideAbandoned { attempts: 2 }));
}

#[test]
fn test_override_reject_is_unresolvable() {
    let resolver = NameResolver::new(NameConstraint::default());
    let mut hook = |_: &NameProposal<'_>| OverrideDecision::Reject;
    let err = resolver.resolve("Syslog", Some(&mut hook)).unwrap_err();
    assert!(matches!(err, DcrError::NameUnresolvable { .. }));
}

#[test]
fn test_impossible_constraint_is_unresolvable() {
    let resolver = NameResolver::new(NameConstraint {
        max_length: 8,
        min_length: 3,
        prefix: "dcr-cribl-".into(),
        suffix: String::new(),
    });
    let err = resolver.resolve("Syslog", None).unwrap_err();
    assert!(matches!(err, DcrError::NameUnresolvable { .. }));
}
