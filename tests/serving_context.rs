//! Concurrent isolation of per-task serving contexts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wirecore::context::{ContextError, ServingContext, Slot};
use wirecore::http::request::RequestLine;
use wirecore::{HeaderMap, Request, Response, StatusCode};

// Shows the context's load/clear events with `RUST_LOG=wirecore=debug`.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wirecore=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn request(path: &str) -> Request {
    Request::new(RequestLine::parse(&format!("GET {path} HTTP/1.1")).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_see_only_their_own_bindings() {
    init_tracing();
    let serving: ServingContext = ServingContext::new();
    let tasks = 32;
    let barrier = Arc::new(Barrier::new(tasks));

    let mut handles = Vec::with_capacity(tasks);
    for i in 0..tasks {
        let serving = serving.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            let task = serving.task();
            task.load(request(&format!("/item/{i}")), Response::new(StatusCode::Ok));
            task.set(Slot::Response, "x-task", i.to_string()).unwrap();

            // Every task is loaded before any of them reads back.
            barrier.wait().await;
            tokio::task::yield_now().await;

            let path = task.with_request(|r| r.path().to_owned()).unwrap();
            let marker = task.get(Slot::Response, "X-Task").unwrap();
            task.clear();
            assert!(task.current().is_err());
            (path, marker)
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let (path, marker) = handle.await.unwrap();
        assert_eq!(path, format!("/item/{i}"));
        assert_eq!(marker, Some(i.to_string()));
    }
    assert_eq!(serving.active_tasks(), 0);
}

#[tokio::test]
async fn task_that_never_loaded_is_not_bound() {
    init_tracing();
    let serving: ServingContext = ServingContext::new();
    let loaded = serving.task();
    loaded.load(request("/"), Response::default());

    let other = serving.clone();
    let err = tokio::spawn(async move { other.task().current().map(|_| ()) })
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err, ContextError::NotBound { slot: Slot::Request });
    assert!(loaded.current().is_ok());
}

#[test]
fn panicking_task_releases_its_bindings() {
    init_tracing();
    let serving: ServingContext<HeaderMap, HeaderMap> = ServingContext::new();
    let worker = serving.clone();
    let joined = std::thread::spawn(move || {
        let task = worker.task();
        task.load(HeaderMap::new(), HeaderMap::new());
        panic!("handler failed");
    })
    .join();

    assert!(joined.is_err());
    assert!(serving.servings().is_empty());
    assert_eq!(serving.active_tasks(), 0);
}

#[test]
fn monitor_sees_pairs_from_every_thread() {
    init_tracing();
    let serving: ServingContext = ServingContext::new();
    let (loaded_tx, loaded_rx) = std::sync::mpsc::channel();
    let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
    let done_rx = Arc::new(std::sync::Mutex::new(done_rx));

    let workers: Vec<_> = (0..3)
        .map(|i| {
            let serving = serving.clone();
            let loaded_tx = loaded_tx.clone();
            let done_rx = Arc::clone(&done_rx);
            std::thread::spawn(move || {
                let task = serving.task();
                let response = Response::default().timeout(if i == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_secs(3600)
                });
                task.load(request("/slow"), response);
                loaded_tx.send(()).unwrap();
                let _ = done_rx.lock().unwrap().recv();
            })
        })
        .collect();

    for _ in 0..3 {
        loaded_rx.recv().unwrap();
    }
    std::thread::sleep(Duration::from_millis(2));
    assert_eq!(serving.servings().len(), 3);
    assert_eq!(serving.check_timeouts(), 1);

    drop(done_tx);
    for worker in workers {
        worker.join().unwrap();
    }
    assert!(serving.servings().is_empty());
}
