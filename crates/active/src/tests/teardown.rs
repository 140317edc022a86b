use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::{ActiveConfig, ActiveError, ActiveObject, ActiveState, SendError};

#[test]
fn drop_waits_for_slow_callbacks() {
    let done = Arc::new(AtomicUsize::new(0));
    let active = ActiveObject::create().unwrap();

    for _ in 0..5 {
        let done = Arc::clone(&done);
        active.send(move || {
            thread::sleep(Duration::from_millis(10));
            done.fetch_add(1, Ordering::SeqCst);
        });
    }
    drop(active);

    assert_eq!(done.load(Ordering::SeqCst), 5);
}

#[test]
fn rejects_capacity_without_room() {
    let err = ActiveObject::with_config(ActiveConfig::builder().queue_capacity(1).build())
        .unwrap_err();
    assert!(matches!(err, ActiveError::Queue(_)));
}

#[test]
fn panicking_callback_faults_the_worker() {
    let active = ActiveObject::with_config(
        ActiveConfig::builder()
            .name("faulty")
            .queue_capacity(16)
            .build(),
    )
    .unwrap();

    active.send(|| panic!("callback failure"));
    while active.state() != ActiveState::Faulted {
        thread::yield_now();
    }
    assert!(!active.is_running());
    assert_eq!(active.try_send(|| {}), Err(SendError::Stopped));

    let ran = Arc::new(AtomicUsize::new(0));
    {
        let ran = Arc::clone(&ran);
        active.send(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }

    let err = active.shutdown().unwrap_err();
    assert!(matches!(err, ActiveError::WorkerPanicked { ref name } if name == "faulty"));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn teardown_gives_up_when_worker_faults_on_a_full_queue() {
    let active = ActiveObject::with_config(ActiveConfig::builder().queue_capacity(3).build())
        .unwrap();

    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let (entered_tx, entered_rx) = std::sync::mpsc::channel();
    active.send(move || {
        entered_tx.send(()).unwrap();
        let _ = release_rx.recv();
        panic!("boom");
    });
    entered_rx.recv().unwrap();

    assert!(active.try_send(|| {}).is_ok());
    assert!(active.try_send(|| {}).is_ok());
    assert_eq!(active.try_send(|| {}), Err(SendError::Full));

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
    });

    // Blocks on the full queue until the worker faults, then returns.
    drop(active);
    releaser.join().unwrap();
}

#[test]
fn dropped_from_its_own_callback() {
    let slot: Arc<Mutex<Option<ActiveObject>>> = Arc::new(Mutex::new(None));
    let ran = Arc::new(AtomicUsize::new(0));

    let active = ActiveObject::with_config(ActiveConfig::builder().queue_capacity(8).build())
        .unwrap();
    *slot.lock().unwrap() = Some(active);

    {
        let guard = slot.lock().unwrap();
        let own_slot = Arc::clone(&slot);
        let ran = Arc::clone(&ran);
        guard.as_ref().unwrap().send(move || {
            let own = own_slot.lock().unwrap().take();
            drop(own);
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }

    while ran.load(Ordering::SeqCst) == 0 {
        thread::yield_now();
    }
    assert!(slot.lock().unwrap().is_none());
}

/// Reports the end of the thread it was stored on.
struct ExitNotice(mpsc::Sender<()>);

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

thread_local! {
    static EXIT_NOTICE: RefCell<Option<ExitNotice>> = RefCell::new(None);
}

#[test]
fn worker_exits_after_self_drop_on_a_full_queue() {
    let slot: Arc<Mutex<Option<ActiveObject>>> = Arc::new(Mutex::new(None));
    let active = ActiveObject::with_config(ActiveConfig::builder().queue_capacity(2).build())
        .unwrap();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (exit_tx, exit_rx) = mpsc::channel();

    {
        let own_slot = Arc::clone(&slot);
        active.send(move || {
            entered_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
            let own = own_slot.lock().unwrap().take();
            drop(own);
        });
    }
    entered_rx.recv().unwrap();

    // Fills the only usable slot, so the self-drop cannot queue its stop.
    active.send(move || {
        EXIT_NOTICE.with(|notice| *notice.borrow_mut() = Some(ExitNotice(exit_tx)));
    });
    assert_eq!(active.try_send(|| {}), Err(SendError::Full));

    *slot.lock().unwrap() = Some(active);
    gate_tx.send(()).unwrap();

    assert!(exit_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    assert!(slot.lock().unwrap().is_none());
}
