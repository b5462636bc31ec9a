// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn setup() -> (Context, FakeExecutor) {
    let fake = FakeExecutor::new();
    let ctx = Context::in_memory().with_executor(Arc::new(fake.clone()));
    (ctx, fake)
}

#[tokio::test]
async fn names_count_up_per_context() {
    let (ctx, _) = setup();
    let a = ctx.process("work", &()).unwrap();
    let b = ctx.process("work", &()).unwrap();
    assert_eq!(a.name(), "Process-1");
    assert_eq!(b.name(), "Process-2");
    assert_eq!(b.with_name("renamed").name(), "renamed");
}

#[tokio::test]
async fn lifecycle_to_success() {
    let (ctx, fake) = setup();
    let mut process = ctx.process("work", &json!({"n": 3})).unwrap();
    assert_eq!(process.state(), ProcessState::Initial);
    assert!(!process.is_alive().await.unwrap());
    assert_eq!(process.exitcode().await.unwrap(), None);

    process.start().await.unwrap();
    assert_eq!(process.state(), ProcessState::Started);
    assert!(process.is_alive().await.unwrap());
    assert_eq!(
        fake.calls()[0],
        ExecutorCall::Invoke {
            target: "work".to_string(),
            args: json!({"n": 3}),
        }
    );

    let handle = process.exec_handle().unwrap().clone();
    fake.succeed(&handle);
    assert_eq!(process.join(None).await.unwrap(), Some(0));
    assert_eq!(process.state(), ProcessState::Finished);
    assert!(!process.is_alive().await.unwrap());
}

#[tokio::test]
async fn failure_reports_exitcode_one() {
    let (ctx, fake) = setup();
    let mut process = ctx.process("work", &()).unwrap();
    process.start().await.unwrap();
    fake.fail(process.exec_handle().unwrap(), "boom");

    assert_eq!(process.join(None).await.unwrap(), Some(1));
    assert_eq!(process.state(), ProcessState::Errored);
}

#[tokio::test]
async fn join_times_out_while_running() {
    let (ctx, _) = setup();
    let mut process = ctx.process("work", &()).unwrap();
    process.start().await.unwrap();

    let code = process.join(Some(Duration::from_millis(20))).await.unwrap();
    assert_eq!(code, None);
    assert_eq!(process.state(), ProcessState::Started);
}

#[tokio::test]
async fn start_is_valid_once() {
    let (ctx, fake) = setup();
    let mut process = ctx.process("work", &()).unwrap();
    process.start().await.unwrap();
    assert!(matches!(
        process.start().await,
        Err(ProcessError::AlreadyStarted)
    ));
    assert_eq!(fake.last_handle(), Some(ExecHandle("fake-1".to_string())));
}

#[tokio::test]
async fn join_and_terminate_require_start() {
    let (ctx, _) = setup();
    let mut process = ctx.process("work", &()).unwrap();
    assert!(matches!(process.join(None).await, Err(ProcessError::NotStarted)));
    assert!(matches!(process.terminate().await, Err(ProcessError::NotStarted)));
}

#[tokio::test]
async fn terminate_cancels_running_work() {
    let (ctx, _) = setup();
    let mut process = ctx.process("work", &()).unwrap();
    process.start().await.unwrap();

    process.terminate().await.unwrap();
    assert_eq!(process.join(None).await.unwrap(), Some(CANCELLED_EXITCODE));
    assert_eq!(process.state(), ProcessState::Errored);
}

#[tokio::test]
async fn terminate_without_cancel_support() {
    let (ctx, fake) = setup();
    fake.set_cancel_unsupported(true);
    let mut process = ctx.process("work", &()).unwrap();
    process.start().await.unwrap();

    assert!(matches!(
        process.terminate().await,
        Err(ProcessError::NotSupported(_))
    ));
    assert!(process.is_alive().await.unwrap());
}

#[tokio::test]
async fn start_without_executor_fails() {
    let ctx = Context::in_memory();
    let mut process = ctx.process("work", &()).unwrap();
    assert!(matches!(process.start().await, Err(ProcessError::Executor(_))));
    assert_eq!(process.state(), ProcessState::Initial);
}

#[tokio::test]
async fn failed_invoke_leaves_process_initial() {
    let (ctx, fake) = setup();
    fake.set_invoke_fails(true);
    let mut process = ctx.process("work", &()).unwrap();
    assert!(process.start().await.is_err());
    assert_eq!(process.state(), ProcessState::Initial);
    assert!(ctx.children().names().is_empty());
}

#[tokio::test]
async fn active_children_drops_finished_ones() {
    let (ctx, fake) = setup();
    let mut first = ctx.process("work", &()).unwrap();
    let mut second = ctx.process("work", &()).unwrap();
    first.start().await.unwrap();
    second.start().await.unwrap();
    assert_eq!(
        ctx.active_children().await.unwrap(),
        vec!["Process-1".to_string(), "Process-2".to_string()]
    );

    fake.succeed(first.exec_handle().unwrap());
    assert_eq!(
        ctx.active_children().await.unwrap(),
        vec!["Process-2".to_string()]
    );
    assert_eq!(ctx.children().names(), vec!["Process-2".to_string()]);
}

#[tokio::test]
async fn descriptor_serializes_state() {
    let (ctx, _) = setup();
    let mut process = ctx.process("work", &[1, 2]).unwrap();
    process.start().await.unwrap();

    let value = serde_json::to_value(process.descriptor()).unwrap();
    assert_eq!(value["name"], "Process-1");
    assert_eq!(value["args"], json!([1, 2]));
    assert_eq!(value["exec"], "fake-1");
    assert_eq!(value["state"], "started");
}

#[test]
fn empty_target_is_rejected() {
    let ctx = Context::in_memory();
    assert!(matches!(
        Process::new(&ctx, "", serde_json::Value::Null),
        Err(ProcessError::UnknownTarget(_))
    ));
}

#[tokio::test]
async fn collected_exit_code_releases_the_handle() {
    let (ctx, fake) = setup();
    let mut process = ctx.process("work", &()).unwrap();
    process.start().await.unwrap();
    let handle = process.exec_handle().unwrap().clone();

    assert_eq!(process.poll().await.unwrap(), None);
    assert!(!fake.calls().contains(&ExecutorCall::Forget(handle.clone())));

    fake.succeed(&handle);
    assert_eq!(process.poll().await.unwrap(), Some(0));
    assert_eq!(process.poll().await.unwrap(), Some(0));
    let forgets = fake
        .calls()
        .iter()
        .filter(|call| **call == ExecutorCall::Forget(handle.clone()))
        .count();
    assert_eq!(forgets, 1);
}

#[tokio::test]
async fn dropped_process_leaves_active_children() {
    let (ctx, fake) = setup();
    let mut process = ctx.process("work", &()).unwrap();
    process.start().await.unwrap();
    let handle = process.exec_handle().unwrap().clone();
    drop(process);

    assert!(ctx.active_children().await.unwrap().is_empty());
    assert_eq!(fake.calls().last(), Some(&ExecutorCall::Forget(handle)));
}
