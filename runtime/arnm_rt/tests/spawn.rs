//! Spawn/join stress: many processes, one shared counter.

use arnm_rt::{arnm_init, arnm_run, arnm_shutdown, arnm_spawn};
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn incr(_arg: *mut c_void) {
    COUNTER.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn spawn_1000_processes_all_run() {
    assert_eq!(arnm_init(4), 0);

    for _ in 0..1000 {
        let proc = arnm_spawn(incr, ptr::null_mut(), 0);
        assert!(!proc.is_null(), "spawn failed");
    }

    arnm_run();
    arnm_shutdown();

    assert_eq!(COUNTER.load(Ordering::SeqCst), 1000);
}
