//! Tests for workers and signals used together across threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use strata_core::{Error, Signal, ThreadAffinity, WorkerBuilder};

#[test]
fn test_worker_emits_signal_in_job_order() {
    let worker = WorkerBuilder::new().name("emitter").build().unwrap();
    let signal = Arc::new(Signal::<usize>::new());
    let received = Arc::new(Mutex::new(Vec::new()));

    let received_clone = received.clone();
    let _guard = signal.connect_scoped(move |n| received_clone.lock().push(*n));

    for n in 0..50 {
        let signal = signal.clone();
        worker.send(move || {
            signal.emit(n);
        })
        .unwrap();
    }
    worker.stop_and_join();

    assert_eq!(*received.lock(), (0..50).collect::<Vec<_>>());
}

#[test]
fn test_slots_run_on_emitting_thread() {
    let worker = WorkerBuilder::new().name("affinity-check").build().unwrap();
    let ui = ThreadAffinity::current();
    let signal = Arc::new(Signal::<()>::new());
    let off_thread = Arc::new(AtomicUsize::new(0));

    let off_thread_clone = off_thread.clone();
    signal.connect(move |_| {
        if !ui.is_current() {
            off_thread_clone.fetch_add(1, Ordering::SeqCst);
        }
    });

    signal.emit(());
    let worker_signal = signal.clone();
    worker.send(move || {
        worker_signal.emit(());
    })
    .unwrap();
    worker.stop_and_join();

    assert_eq!(off_thread.load(Ordering::SeqCst), 1);
}

#[test]
fn test_guard_dropped_on_other_thread_disconnects() {
    let signal = Signal::<i32>::new();
    let guard = signal.connect_scoped(|_| {});
    assert_eq!(signal.connection_count(), 1);

    thread::spawn(move || drop(guard)).join().unwrap();
    assert_eq!(signal.connection_count(), 0);
}

#[test]
fn test_stopped_worker_rejects_and_drains() {
    let worker = WorkerBuilder::new()
        .name("drain")
        .queue_capacity(16)
        .build()
        .unwrap();
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let count = count.clone();
        worker.send(move || {
            thread::sleep(Duration::from_millis(1));
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    worker.stop();

    assert!(matches!(worker.send(|| {}), Err(Error::WorkerStopped)));
    assert!(worker.wait_timeout(Duration::from_secs(2)));
    assert_eq!(count.load(Ordering::SeqCst), 10);
    assert_eq!(worker.pending_jobs(), 0);
}
