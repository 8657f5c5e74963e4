//! Dispatch integration tests
//!
//! Builds a delivery machine from YAML configuration and feeds it inbound
//! events over a channel, the way `shipwright run` does.

use std::sync::Arc;

use tokio::sync::mpsc;

use shipwright::autofix::marker_for;
use shipwright::config::Config;
use shipwright::domain::{Credentials, InboundEvent, Push, RepoRef, Status, StatusEvent, StatusState};
use shipwright::sdm::DeliveryMachine;
use shipwright::status::RecordingStatusReporter;
use shipwright::workspace::{InMemoryProvider, InMemoryWorkingCopy};

const SHA: &str = "abc1234def";

const CONFIG: &str = r#"
build:
  team: T7
goals:
  - context: autofix
    description: Autofix
    kind: autofix
  - context: code-reaction
    description: Code reactions
    idle_policy: report_success
    kind: code_reaction
  - context: deploy
    description: Deploy
    kind:
      command:
        command: ./deploy.sh
phases:
  - name: typescript
    push_test:
      has_file: "**/*.ts"
    goals: [autofix, code-reaction]
autofixes:
  - name: License header
    header:
      text: "/* (c) Acme */"
      glob: "**/*.ts"
"#;

struct Harness {
    provider: InMemoryProvider,
    statuses: RecordingStatusReporter,
    machine: DeliveryMachine,
}

fn harness(files: &[(&str, &str)]) -> Harness {
    harness_with(files, RecordingStatusReporter::new())
}

fn harness_with(files: &[(&str, &str)], statuses: RecordingStatusReporter) -> Harness {
    let config = Config::from_yaml(CONFIG).unwrap();
    let repo = RepoRef::new("acme", "widget", SHA).with_branch("main");
    let provider = InMemoryProvider::new(InMemoryWorkingCopy::new(repo, files));
    let machine = DeliveryMachine::from_config(
        &config,
        Arc::new(provider.clone()),
        Arc::new(statuses.clone()),
        Credentials::token(""),
    )
    .unwrap();
    Harness {
        provider,
        statuses,
        machine,
    }
}

fn push() -> Push {
    Push::new("acme", "widget", "main", SHA).with_commit(SHA, "Add index")
}

async fn run(machine: DeliveryMachine, events: Vec<InboundEvent>) -> shipwright::dispatch::DispatchSummary {
    let (tx, rx) = mpsc::channel(8);
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);
    machine.run(rx).await
}

#[tokio::test]
async fn test_push_plans_and_completes_goals() {
    let Harness {
        provider,
        statuses,
        machine,
    } = harness(&[("src/index.ts", "export {}\n")]);

    let summary = run(machine, vec![InboundEvent::Push(push())]).await;

    assert_eq!(summary.received, 1);
    assert_eq!(summary.follow_ups, 2);
    assert_eq!(summary.succeeded, 2);
    // Each pending event is also offered to the two other goals
    assert_eq!(summary.ignored, 4);
    assert!(summary.is_clean(), "{:?}", summary);

    let autofix = statuses.for_context("autofix");
    assert_eq!(autofix.len(), 2);
    assert_eq!(autofix[0].state, StatusState::Pending);
    assert_eq!(autofix[0].description, "Planned: Autofix");
    assert_eq!(autofix[1].state, StatusState::Success);
    assert_eq!(
        statuses.latest(SHA, "code-reaction").unwrap().state,
        StatusState::Success
    );
    assert!(statuses.for_context("deploy").is_empty());

    let committed: Vec<_> = provider
        .clones()
        .into_iter()
        .flat_map(|wc| wc.commits())
        .collect();
    assert_eq!(committed.len(), 1);
    assert!(committed[0].message.contains(&marker_for("License header")));
}

#[tokio::test]
async fn test_push_without_matching_phase_plans_nothing() {
    let Harness { statuses, machine, .. } = harness(&[("README.md", "# Widget")]);

    let summary = run(machine, vec![InboundEvent::Push(push())]).await;

    assert_eq!(summary.follow_ups, 0);
    assert!(summary.is_clean());
    assert!(statuses.is_empty());
}

#[tokio::test]
async fn test_goal_error_is_summarised_and_reported() {
    let Harness { statuses, machine, .. } = harness(&[]);

    // The command goal needs a clone on disk, which the in-memory provider
    // cannot give it.
    let event = InboundEvent::StatusChanged(StatusEvent::new(Status::pending(SHA, "deploy"), push()));
    let summary = run(machine, vec![event]).await;

    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("deploy:"));
    assert!(!summary.is_clean());
    assert_eq!(statuses.latest(SHA, "deploy").unwrap().state, StatusState::Error);
}

#[tokio::test]
async fn test_events_parse_from_json_lines() {
    let Harness { statuses, machine, .. } = harness(&[("src/index.ts", "/* (c) Acme */\n\nexport {}\n")]);
    let lines = [
        r#"{"type":"status_changed","status":{"commit_sha":"abc1234def","context":"code-reaction","state":"pending"},"push":{"owner":"acme","repo":"widget","branch":"main","after":"abc1234def","commits":[]}}"#,
        r#"{"type":"status_changed","status":{"commit_sha":"abc1234def","context":"autofix","state":"success"},"push":{"owner":"acme","repo":"widget","branch":"main","after":"abc1234def","commits":[]}}"#,
    ];
    let events = lines
        .iter()
        .map(|l| serde_json::from_str::<InboundEvent>(l).unwrap())
        .collect();

    let summary = run(machine, events).await;

    assert_eq!(summary.succeeded, 1);
    // code-reaction's event is ignored by autofix and deploy; autofix's
    // already-terminal event is ignored by all three goals
    assert_eq!(summary.ignored, 5);
    assert_eq!(statuses.len(), 1);
}

#[tokio::test]
async fn test_failed_planning_write_still_runs_planned_goals() {
    // The second write is code-reaction's pending status
    let Harness { statuses, machine, .. } =
        harness_with(&[("src/index.ts", "export {}\n")], RecordingStatusReporter::new().failing_on_attempt(2));

    let summary = run(machine, vec![InboundEvent::Push(push())]).await;

    assert_eq!(summary.follow_ups, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("phase-setter: code-reaction:"), "{:?}", summary.errors);
    assert_eq!(statuses.latest(SHA, "autofix").unwrap().state, StatusState::Success);
    assert!(statuses.for_context("code-reaction").is_empty());
}

#[tokio::test]
async fn test_code_reaction_goal_without_reactions_writes_no_status() {
    let config = Config::from_yaml(
        r#"
goals:
  - context: code-reaction
    description: Code reactions
    kind: code_reaction
"#,
    )
    .unwrap();
    let repo = RepoRef::new("acme", "widget", SHA).with_branch("main");
    let provider = InMemoryProvider::new(InMemoryWorkingCopy::new(repo, &[("src/index.ts", "")]));
    let statuses = RecordingStatusReporter::new();
    let machine = DeliveryMachine::from_config(
        &config,
        Arc::new(provider.clone()),
        Arc::new(statuses.clone()),
        Credentials::token(""),
    )
    .unwrap();

    let event = InboundEvent::StatusChanged(StatusEvent::new(Status::pending(SHA, "code-reaction"), push()));
    let summary = run(machine, vec![event]).await;

    assert_eq!(summary.unreported, 1);
    assert_eq!(summary.succeeded, 0);
    assert!(summary.is_clean());
    assert!(statuses.is_empty());
    assert_eq!(provider.clone_count(), 0);
}
