//! Concurrent dispatch through one shared Dispatcher.

use super::*;
use std::{
    sync::atomic::AtomicBool,
    thread,
    time::Duration,
};

const THREADS: usize = 16;

#[test]
fn test_first_hooks_run_exactly_once_under_contention() {
    let runs = Arc::new(AtomicUsize::new(0));
    let warmed = Arc::new(AtomicBool::new(false));
    let observed_cold = Arc::new(AtomicUsize::new(0));

    let first = {
        let runs = runs.clone();
        let warmed = warmed.clone();
        Hook::new(move |_: &Arguments| {
            runs.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            warmed.store(true, Ordering::SeqCst);
            Ok(())
        })
    };
    let pre = {
        let warmed = warmed.clone();
        let observed_cold = observed_cold.clone();
        Hook::new(move |_: &Arguments| {
            if !warmed.load(Ordering::SeqCst) {
                observed_cold.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
    };

    let app = Composer::new()
        .before_first_request(first)
        .before_request(pre)
        .route("/a", text("a"))
        .route("/b", text("b"));
    let dispatcher = compile(&app);

    thread::scope(|s| {
        for i in 0..THREADS {
            let dispatcher = &dispatcher;
            s.spawn(move || {
                let path = if i % 2 == 0 { "/a" } else { "/b" };
                let reply = dispatcher.handle(TestRequest::get(path)).unwrap();
                assert!(matches!(reply, Reply::Success(_)));
            });
        }
    });

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(observed_cold.load(Ordering::SeqCst), 0);
}

#[test]
fn test_each_table_runs_its_own_first_hooks_once() {
    let log = new_log();
    let a = Composer::new()
        .before_first_request(recording_hook(&log, "a-first"))
        .route("/", text("a"));
    let b = Composer::new()
        .before_first_request(recording_hook(&log, "b-first"))
        .route("/", text("b"));
    let dispatcher = compile(&Composer::crew([("/a", a), ("/b", b)]));

    thread::scope(|s| {
        for i in 0..THREADS {
            let dispatcher = &dispatcher;
            s.spawn(move || {
                let path = if i % 2 == 0 { "/a/" } else { "/b/" };
                dispatcher.handle(TestRequest::get(path)).unwrap();
            });
        }
    });

    let mut seen = entries(&log);
    seen.sort();
    assert_eq!(seen, vec!["a-first", "b-first"]);
}

#[test]
fn test_concurrent_requests_keep_their_own_arguments() {
    let app = Composer::new().route("/users/{id}", echo_param("id"));
    let dispatcher = compile(&app);

    thread::scope(|s| {
        for i in 0..THREADS {
            let dispatcher = &dispatcher;
            s.spawn(move || {
                for round in 0..20 {
                    let id = format!("{i}-{round}");
                    let reply = dispatcher
                        .handle(TestRequest::get(&format!("/users/{id}")))
                        .unwrap();
                    assert!(matches!(reply, Reply::Success(body) if body == id));
                }
            });
        }
    });
}

#[test]
fn test_scopes_balanced_under_concurrency() {
    let mut table = RouteTable::new();
    table.add_get_route("/ok", text("ok"));
    let resolver = CountingResolver::default();
    let created = resolver.created.clone();
    let dropped = resolver.dropped.clone();
    let dispatcher = Dispatcher::compile(vec![table], RecordingHost::default(), resolver).unwrap();

    thread::scope(|s| {
        for _ in 0..THREADS {
            let dispatcher = &dispatcher;
            s.spawn(move || {
                dispatcher.handle(TestRequest::get("/ok")).unwrap();
                dispatcher.handle(TestRequest::get("/nope")).unwrap();
            });
        }
    });

    assert_eq!(created.load(Ordering::SeqCst), THREADS * 2);
    assert_eq!(dropped.load(Ordering::SeqCst), THREADS * 2);
}
