//! Message flood: one sender, five receivers, 100 messages each.

use arnm_rt::process::Process;
use arnm_rt::{
    arnm_init, arnm_message_free, arnm_message_tag, arnm_receive, arnm_run, arnm_send,
    arnm_shutdown, arnm_spawn,
};
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

const RECEIVERS: usize = 5;
const PER_RECEIVER: u64 = 100;

static HANDLES: [AtomicPtr<Process>; RECEIVERS] = [
    AtomicPtr::new(ptr::null_mut()),
    AtomicPtr::new(ptr::null_mut()),
    AtomicPtr::new(ptr::null_mut()),
    AtomicPtr::new(ptr::null_mut()),
    AtomicPtr::new(ptr::null_mut()),
];
static RECEIVED: AtomicUsize = AtomicUsize::new(0);
static TAG_SUM: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn receiver(_arg: *mut c_void) {
    for _ in 0..PER_RECEIVER {
        let msg = arnm_receive(ptr::null_mut());
        assert!(!msg.is_null());
        TAG_SUM.fetch_add(arnm_message_tag(msg) as usize, Ordering::SeqCst);
        arnm_message_free(msg);
        RECEIVED.fetch_add(1, Ordering::SeqCst);
    }
}

unsafe extern "C" fn sender(_arg: *mut c_void) {
    for handle in &HANDLES {
        let target = handle.load(Ordering::SeqCst);
        for tag in 1..=PER_RECEIVER {
            assert_eq!(arnm_send(target, tag, ptr::null_mut(), 0), 0);
        }
    }
}

#[test]
fn message_flood_delivers_everything() {
    assert_eq!(arnm_init(4), 0);

    for handle in &HANDLES {
        let proc = arnm_spawn(receiver, ptr::null_mut(), 0);
        assert!(!proc.is_null());
        handle.store(proc, Ordering::SeqCst);
    }
    assert!(!arnm_spawn(sender, ptr::null_mut(), 0).is_null());

    arnm_run();
    arnm_shutdown();

    assert_eq!(RECEIVED.load(Ordering::SeqCst), RECEIVERS * PER_RECEIVER as usize);
    // Each receiver saw tags 1..=100.
    let per_receiver_sum = (1..=PER_RECEIVER as usize).sum::<usize>();
    assert_eq!(TAG_SUM.load(Ordering::SeqCst), RECEIVERS * per_receiver_sum);
}
