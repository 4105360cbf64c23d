use std::{
    mem::ManuallyDrop,
    ptr,
    sync::atomic::{AtomicUsize, Ordering},
};

use crossbeam_epoch::{pin, unprotected, Atomic, Guard, Owned};
use crossbeam_utils::Backoff;

use super::ConcurrentStack;

pub struct TreiberStack<V> {
    head: Atomic<Node<V>>,
    count: AtomicUsize,
}

struct Node<V> {
    value: ManuallyDrop<V>,
    next: Atomic<Node<V>>,
}

impl<V> Node<V> {
    fn new(value: V) -> Self {
        Self {
            value: ManuallyDrop::new(value),
            next: Atomic::null(),
        }
    }
}

unsafe impl<V: Send> Send for TreiberStack<V> {}
unsafe impl<V: Send> Sync for TreiberStack<V> {}

impl<V> TreiberStack<V> {
    pub fn is_empty(&self, guard: &Guard) -> bool {
        self.head.load(Ordering::Relaxed, guard).is_null()
    }

    pub fn top(&self, guard: &Guard) -> Option<V>
    where
        V: Clone,
    {
        unsafe { self.head.load(Ordering::Acquire, guard).as_ref() }
            .map(|node| ManuallyDrop::into_inner(node.value.clone()))
    }

    pub fn try_push(&self, value: V, guard: &Guard) {
        let mut node = Owned::new(Node::new(value));
        let backoff = Backoff::new();

        // counted before it is linked, so a racing pop never sees the count go below zero
        self.count.fetch_add(1, Ordering::Relaxed);

        loop {
            let head = self.head.load(Ordering::Relaxed, guard);
            node.next.store(head, Ordering::Relaxed);

            match self.head.compare_exchange(
                head,
                node,
                Ordering::Release,
                Ordering::Relaxed,
                guard,
            ) {
                Ok(_) => break,
                Err(e) => node = e.new,
            }

            backoff.spin();
        }
    }

    pub fn try_pop(&self, guard: &Guard) -> Option<V> {
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let h = unsafe { head.as_ref() }?;
            let next = h.next.load(Ordering::Relaxed, guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::Relaxed, Ordering::Relaxed, guard)
                .is_ok()
            {
                self.count.fetch_sub(1, Ordering::Relaxed);

                unsafe {
                    let value = ManuallyDrop::into_inner(ptr::read(&h.value));
                    guard.defer_destroy(head);
                    return Some(value);
                }
            }

            backoff.spin();
        }
    }
}

impl<V> ConcurrentStack<V> for TreiberStack<V> {
    fn new() -> Self {
        Self {
            head: Atomic::null(),
            count: AtomicUsize::new(0),
        }
    }

    fn push(&self, value: V) {
        self.try_push(value, &pin());
    }

    fn pop(&self) -> Option<V> {
        self.try_pop(&pin())
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl<V> Drop for TreiberStack<V> {
    fn drop(&mut self) {
        unsafe {
            let guard = unprotected();

            while self.try_pop(guard).is_some() {}
        }
    }
}
