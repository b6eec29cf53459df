//! Deferred deformation requests
//!
//! Sphere contacts are raised on the physics side and applied on the render
//! side. The queue is the only thing shared between the two: an unbounded
//! SPSC channel of plain footprint values, drained in strict arrival order.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;

/// One pending sphere deformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootPrint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
}

/// Cloneable producer handle. Never blocks and never touches the geometry
/// buffers, so it is safe to call from the physics thread.
#[derive(Clone)]
pub struct FootprintSender {
    tx: Sender<FootPrint>,
}

impl FootprintSender {
    /// Queues a sphere contact for the next render tick.
    pub fn collide_sphere(&self, x: f64, y: f64, z: f64, radius: f64) {
        if self.tx.send(FootPrint { x, y, z, radius }).is_err() {
            trace!("terrain engine dropped; discarding footprint");
        }
    }
}

pub(crate) struct FootprintQueue {
    tx: Sender<FootPrint>,
    rx: Receiver<FootPrint>,
}

impl FootprintQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> FootprintSender {
        FootprintSender {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, footprint: FootPrint) {
        // cannot fail: the queue owns its receiver
        let _ = self.tx.send(footprint);
    }

    pub fn try_pop(&self) -> Option<FootPrint> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = FootprintQueue::new();
        for i in 0..4 {
            queue.push(FootPrint {
                x: i as f64,
                y: 0.0,
                z: 0.0,
                radius: 1.0,
            });
        }
        for i in 0..4 {
            assert_eq!(queue.try_pop().unwrap().x, i as f64);
        }
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_cross_thread_producer() {
        let queue = FootprintQueue::new();
        let sender = queue.sender();
        let handle = std::thread::spawn(move || {
            for i in 0..16 {
                sender.collide_sphere(i as f64, 0.0, -1.0, 0.5);
            }
        });
        handle.join().unwrap();
        assert_eq!(queue.len(), 16);
        let first = queue.try_pop().unwrap();
        assert_eq!(first.x, 0.0);
        assert_eq!(first.radius, 0.5);
    }
}
