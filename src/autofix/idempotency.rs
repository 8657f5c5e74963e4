//! Commit-message markers recording which autofixes a push already carries

use std::sync::Arc;

use crate::domain::Push;
use crate::registry::TransformRegistration;

/// Tag added to every commit produced by the autofix executor
pub const GENERATED_MARKER: &str = "[shipwright:generated]";

/// Subject line of autofix commits
pub const AUTOFIX_SUBJECT: &str = "Autofixes";

/// Lower-case the name and replace whitespace with `_`
pub fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

/// The marker embedded in a commit message once `name` has been applied
pub fn marker_for(name: &str) -> String {
    format!("[shipwright:autofix={}]", slug(name))
}

/// True if any commit in the push carries the marker for `name`
pub fn already_applied(name: &str, push: &Push) -> bool {
    let marker = marker_for(name);
    push.messages().any(|message| message.contains(&marker))
}

/// Registrations whose marker appears in none of the push's commit messages.
///
/// Order is preserved. An empty push filters nothing.
pub fn filter_applied(registrations: &[Arc<TransformRegistration>], push: &Push) -> Vec<Arc<TransformRegistration>> {
    registrations
        .iter()
        .filter(|registration| {
            let applied = already_applied(registration.name(), push);
            if applied {
                log::debug!("Skipping {}: already applied on this push", registration.name());
            }
            !applied
        })
        .cloned()
        .collect()
}

/// Commit message for a batch that applied `names`, one marker line each
pub fn commit_message(names: &[String]) -> String {
    let mut message = format!("{}\n\n", AUTOFIX_SUBJECT);
    for name in names {
        message.push_str(&format!("{} applied {}\n", marker_for(name), name));
    }
    message.push('\n');
    message.push_str(GENERATED_MARKER);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pushtest::Always;
    use crate::registry::{Transform, TransformInvocation, TransformResult};
    use crate::workspace::WorkingCopy;
    use async_trait::async_trait;

    struct AddThing;

    #[async_trait]
    impl Transform for AddThing {
        async fn transform(
            &self,
            wc: &mut dyn WorkingCopy,
            _invocation: &TransformInvocation<'_>,
        ) -> crate::error::Result<TransformResult> {
            wc.write_file("thing", "1").await?;
            Ok(TransformResult::edited())
        }
    }

    fn reg(name: &str) -> Arc<TransformRegistration> {
        Arc::new(TransformRegistration::new(name, Arc::new(Always), Arc::new(AddThing)))
    }

    fn push(messages: &[&str]) -> Push {
        messages
            .iter()
            .enumerate()
            .fold(Push::new("acme", "widget", "main", "head"), |push, (i, m)| {
                push.with_commit(format!("c{}", i), *m)
            })
    }

    fn names(regs: &[Arc<TransformRegistration>]) -> Vec<&str> {
        regs.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_marker_format() {
        assert_eq!(marker_for("AddThing"), "[shipwright:autofix=addthing]");
        assert_eq!(marker_for("Add License Header"), "[shipwright:autofix=add_license_header]");
    }

    #[test]
    fn test_excludes_applied_autofix() {
        let applied = format!("{} applied AddThing", marker_for("AddThing"));
        let push = push(&["foo", &applied, "bar"]);
        assert!(filter_applied(&[reg("AddThing")], &push).is_empty());
    }

    #[test]
    fn test_keeps_only_unapplied_of_two() {
        let applied = format!("{} applied AddThing1", marker_for("AddThing1"));
        let push = push(&["foo", &applied, "bar"]);
        let filtered = filter_applied(&[reg("AddThing1"), reg("AddThing2")], &push);
        assert_eq!(names(&filtered), vec!["AddThing2"]);
    }

    #[test]
    fn test_empty_push_filters_nothing() {
        let push = push(&[]);
        let filtered = filter_applied(&[reg("AddThing1"), reg("AddThing2")], &push);
        assert_eq!(names(&filtered), vec!["AddThing1", "AddThing2"]);
    }

    #[test]
    fn test_marker_is_not_a_prefix_match() {
        let applied = format!("{} applied AddThing1", marker_for("AddThing1"));
        assert!(!already_applied("AddThing", &push(&[&applied])));
    }

    #[test]
    fn test_commit_message_carries_every_marker() {
        let message = commit_message(&["AddThing".to_string(), "AddOther".to_string()]);
        assert!(message.starts_with("Autofixes\n\n"));
        assert!(message.contains(&marker_for("AddThing")));
        assert!(message.contains(&marker_for("AddOther")));
        assert!(message.ends_with(GENERATED_MARKER));

        let push = push(&[&message]);
        assert!(filter_applied(&[reg("AddThing"), reg("AddOther")], &push).is_empty());
    }
}
