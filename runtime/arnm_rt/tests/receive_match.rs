//! Receive matching: the tag selects exactly one branch, the way a
//! compiled `receive { 42 => ... 99 => ... }` block dispatches.

use arnm_rt::process::Process;
use arnm_rt::{
    arnm_init, arnm_message_free, arnm_message_tag, arnm_receive, arnm_run, arnm_send,
    arnm_shutdown, arnm_spawn, arnm_try_receive,
};
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

static RECEIVER: AtomicPtr<Process> = AtomicPtr::new(ptr::null_mut());
static BRANCH_A: AtomicUsize = AtomicUsize::new(0);
static BRANCH_B: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn receiver(_arg: *mut c_void) {
    let msg = arnm_receive(ptr::null_mut());
    assert!(!msg.is_null());
    match arnm_message_tag(msg) {
        42 => {
            BRANCH_A.fetch_add(1, Ordering::SeqCst);
        }
        99 => {
            BRANCH_B.fetch_add(1, Ordering::SeqCst);
        }
        other => panic!("unexpected tag {other}"),
    }
    arnm_message_free(msg);
}

unsafe extern "C" fn sender(_arg: *mut c_void) {
    let target = RECEIVER.load(Ordering::SeqCst);
    assert_eq!(arnm_send(target, 99, ptr::null_mut(), 0), 0);
}

#[test]
fn tag_99_selects_branch_b_exactly_once() {
    assert_eq!(arnm_init(2), 0);

    let recv = arnm_spawn(receiver, ptr::null_mut(), 0);
    assert!(!recv.is_null());
    RECEIVER.store(recv, Ordering::SeqCst);
    assert!(!arnm_spawn(sender, ptr::null_mut(), 0).is_null());

    arnm_run();
    arnm_shutdown();

    assert_eq!(BRANCH_A.load(Ordering::SeqCst), 0);
    assert_eq!(BRANCH_B.load(Ordering::SeqCst), 1);
}

#[test]
fn try_receive_outside_process_is_null() {
    // No current process on the test thread.
    assert!(arnm_try_receive().is_null());
}
