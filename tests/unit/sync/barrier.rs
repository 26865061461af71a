use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const SHORT: Duration = Duration::from_millis(1);

fn barrier(n: usize) -> CaptureBarrier {
    CaptureBarrier::new(n, CameraImage::blank(2, 2))
}

#[test]
fn initial_state_requests_and_has_nothing_arrived() {
    let b = barrier(2);
    for i in 0..2 {
        assert!(b.handle(i).unwrap().wait_request(SHORT));
    }
    assert!(b.wait_arrived(SHORT).is_none());
    assert!(b.handle(2).is_none());
}

#[test]
fn lease_is_granted_once_every_slot_arrives() {
    let b = barrier(2);
    let h0 = b.handle(0).unwrap();
    let h1 = b.handle(1).unwrap();

    assert!(h0.deposit(CameraImage::solid(2, 2, [1, 2, 3])));
    assert!(b.wait_arrived(SHORT).is_none(), "slot 1 has not arrived");

    assert!(h1.deposit(CameraImage::solid(2, 2, [4, 5, 6])));
    let lease = b.wait_arrived(SHORT).expect("both slots arrived");
    let images = lease.images();
    assert_eq!(images[0].pixel(0, 0), [1, 2, 3]);
    assert_eq!(images[1].pixel(1, 1), [4, 5, 6]);

    // While the lease is held, capture may not overwrite the buffers.
    assert!(!h0.wait_request(SHORT));
    assert!(!h0.deposit(CameraImage::solid(2, 2, [9, 9, 9])));
    assert_eq!(lease.images()[0].pixel(0, 0), [1, 2, 3]);

    drop(lease);
    assert!(h0.wait_request(SHORT));
    assert!(h1.wait_request(SHORT));
    assert!(b.wait_arrived(SHORT).is_none(), "arrived flags were cleared");
}

#[test]
fn unsynced_lease_rearms_on_drop() {
    let b = barrier(1);
    let h = b.handle(0).unwrap();
    assert!(h.deposit(CameraImage::solid(2, 2, [7, 7, 7])));
    assert!(!h.wait_request(SHORT));

    let lease = b.lease_unsynced();
    assert_eq!(lease.images()[0].pixel(0, 0), [7, 7, 7]);
    drop(lease);
    assert!(h.wait_request(SHORT));
}

#[test]
fn threaded_rendezvous_delivers_fresh_frames() {
    let b = barrier(2);
    let stop = Arc::new(AtomicBool::new(false));
    let deposits = Arc::new(AtomicUsize::new(0));

    std::thread::scope(|scope| {
        for slot in 0..2 {
            let h = b.handle(slot).unwrap();
            let stop = Arc::clone(&stop);
            let deposits = Arc::clone(&deposits);
            scope.spawn(move || {
                let mut n = 0u8;
                while !stop.load(Ordering::Relaxed) {
                    if h.wait_request(Duration::from_millis(5)) {
                        n = n.wrapping_add(1);
                        if h.deposit(CameraImage::solid(2, 2, [n, slot as u8, 0])) {
                            deposits.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }

        let mut leases = 0;
        let mut last = [0u8; 2];
        for _ in 0..2000 {
            if let Some(lease) = b.wait_arrived(Duration::from_millis(5)) {
                let images = lease.images();
                for (slot, img) in images.iter().enumerate() {
                    let px = img.pixel(0, 0);
                    assert_eq!(px[1], slot as u8);
                    assert_ne!(px[0], last[slot], "every lease sees a fresh frame");
                    last[slot] = px[0];
                }
                leases += 1;
                if leases == 20 {
                    break;
                }
            }
        }
        stop.store(true, Ordering::Relaxed);
        assert_eq!(leases, 20);
    });
    assert!(deposits.load(Ordering::Relaxed) >= 40);
}
