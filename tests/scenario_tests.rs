// Session-level behavior of the execution gate: which steps run, skip or
// stay blocked across repeated passes over the same test.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use runbook::{AssertSpec, HookRegistry, Status, StepSpec, Test, TestSpec};

fn step(name: &str, perform: &str) -> StepSpec {
    StepSpec {
        name: name.to_string(),
        perform: perform.to_string(),
        ..StepSpec::default()
    }
}

fn script(steps: Vec<StepSpec>) -> TestSpec {
    TestSpec {
        name: "session".to_string(),
        steps,
        ..TestSpec::default()
    }
}

/// A registry with one switchable hook and one that always succeeds. The
/// counter tracks real invocations of the switchable one.
fn service_registry() -> (HookRegistry, Arc<AtomicBool>, Arc<AtomicUsize>) {
    let mut registry = HookRegistry::new();
    let healthy = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let up = Arc::clone(&healthy);
    let seen = Arc::clone(&calls);
    registry.register("service.ping", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        if up.load(Ordering::SeqCst) {
            Ok(json!("pong"))
        } else {
            Err("service down".into())
        }
    });
    registry.register("report.send", |_| Ok(json!("sent")));
    (registry, healthy, calls)
}

#[test]
fn a_blocking_failure_halts_the_pass_until_fixed() {
    let (registry, healthy, _) = service_registry();
    let spec = script(vec![
        step("reach the service", "service.ping"),
        step("send the report", "report.send"),
    ]);
    let mut test = Test::from_spec(spec, &registry).unwrap();

    test.execute(&registry).unwrap();
    assert_eq!(test.steps()[0].status(), Status::Pending);
    assert_eq!(test.steps()[1].status(), Status::Unknown);
    assert!(test.steps()[1].runs().is_empty());
    assert_eq!(test.status(), Status::Pending);

    // the service comes back; the next pass retries and carries on
    healthy.store(true, Ordering::SeqCst);
    test.execute(&registry).unwrap();
    assert_eq!(test.status(), Status::Success);
    assert_eq!(test.steps()[0].runs().len(), 2);
    assert_eq!(test.steps()[1].runs().len(), 1);
}

#[test]
fn continue_lets_later_steps_run_past_a_failure() {
    let (registry, _, _) = service_registry();
    let first = StepSpec {
        proceed: true,
        ..step("reach the service", "service.ping")
    };
    let spec = script(vec![first, step("send the report", "report.send")]);
    let mut test = Test::from_spec(spec, &registry).unwrap();

    test.execute(&registry).unwrap();
    assert_eq!(test.steps()[0].status(), Status::Pending);
    assert_eq!(test.steps()[1].status(), Status::Success);
    assert_eq!(test.status(), Status::Pending);
}

#[test]
fn ignored_failures_settle_and_stop_retrying() {
    let (registry, _, calls) = service_registry();
    let first = StepSpec {
        ignore: true,
        proceed: true,
        ..step("reach the service", "service.ping")
    };
    let spec = script(vec![first, step("send the report", "report.send")]);
    let mut test = Test::from_spec(spec, &registry).unwrap();

    test.execute(&registry).unwrap();
    assert_eq!(test.steps()[0].status(), Status::Ignored);
    assert_eq!(test.status(), Status::Ignored);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    test.execute(&registry).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let last = test.steps()[0].last().unwrap();
    assert!(last.skipped);
    assert_eq!(last.status, Status::Failed);
    assert_eq!(test.steps()[0].status(), Status::Ignored);
}

#[test]
fn ignore_alone_does_not_unblock_the_following_steps() {
    let (registry, _, _) = service_registry();
    let first = StepSpec {
        ignore: true,
        ..step("reach the service", "service.ping")
    };
    let spec = script(vec![first, step("send the report", "report.send")]);
    let mut test = Test::from_spec(spec, &registry).unwrap();

    test.execute(&registry).unwrap();
    assert_eq!(test.steps()[0].status(), Status::Ignored);
    assert!(test.steps()[1].runs().is_empty());

    // the replayed failure halts the pass the same way a live one would
    test.execute(&registry).unwrap();
    assert!(test.steps()[0].last().unwrap().skipped);
    assert!(test.steps()[1].runs().is_empty());
}

#[test]
fn noretry_failures_block_permanently() {
    let (registry, healthy, calls) = service_registry();
    let first = StepSpec {
        noretry: true,
        ..step("reach the service", "service.ping")
    };
    let spec = script(vec![first, step("send the report", "report.send")]);
    let mut test = Test::from_spec(spec, &registry).unwrap();

    test.execute(&registry).unwrap();
    assert_eq!(test.status(), Status::Failed);

    // even a healthy service is not consulted again
    healthy.store(true, Ordering::SeqCst);
    test.execute(&registry).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(test.status(), Status::Failed);
    assert!(test.steps()[1].runs().is_empty());
}

#[test]
fn green_sessions_replay_without_invoking_hooks() {
    let (registry, healthy, calls) = service_registry();
    healthy.store(true, Ordering::SeqCst);
    let spec = script(vec![
        step("reach the service", "service.ping"),
        step("send the report", "report.send"),
    ]);
    let mut test = Test::from_spec(spec, &registry).unwrap();

    test.execute(&registry).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    test.execute(&registry).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for step in test.steps() {
        assert_eq!(step.runs().len(), 2);
        assert!(step.last().unwrap().skipped);
        assert_eq!(step.status(), Status::Success);
    }
}

#[test]
fn sessions_resume_across_a_serialization_boundary() {
    let (registry, healthy, calls) = service_registry();
    let spec = script(vec![
        step("reach the service", "service.ping"),
        step("send the report", "report.send"),
    ]);

    let mut first_session = Test::from_spec(spec.clone(), &registry).unwrap();
    first_session.execute(&registry).unwrap();
    let persisted = first_session.to_spec();

    // a later session loads the script fresh and seeds it from stored state
    healthy.store(true, Ordering::SeqCst);
    let stored = Test::from_spec(persisted, &registry).unwrap();
    let mut second_session = Test::from_spec(spec, &registry).unwrap();
    second_session.given(&stored);
    second_session.execute(&registry).unwrap();

    assert_eq!(second_session.status(), Status::Success);
    assert_eq!(second_session.steps()[0].runs().len(), 2);
    assert_eq!(second_session.steps()[1].runs().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn assertion_failures_retry_until_the_output_satisfies() {
    let mut registry = HookRegistry::new();
    let count = Arc::new(AtomicUsize::new(0));
    let ticks = Arc::clone(&count);
    registry.register("tick", move |_| {
        Ok(json!(ticks.fetch_add(1, Ordering::SeqCst) + 1))
    });
    let first = StepSpec {
        asserts: Some(AssertSpec::One("result >= 3".to_string())),
        ..step("wait for three", "tick")
    };
    let mut test = Test::from_spec(script(vec![first]), &registry).unwrap();

    test.execute(&registry).unwrap();
    assert_eq!(test.status(), Status::Pending);
    test.execute(&registry).unwrap();
    assert_eq!(test.status(), Status::Pending);
    test.execute(&registry).unwrap();
    assert_eq!(test.status(), Status::Success);

    let runs = test.steps()[0].runs();
    assert_eq!(runs.len(), 3);
    assert_eq!(
        runs[0].info.as_deref(),
        Some("'result >= 3' failed for result=1")
    );
    assert_eq!(
        runs[1].info.as_deref(),
        Some("'result >= 3' failed for result=2")
    );
    assert_eq!(runs[2].output, Some(json!(3)));
}
