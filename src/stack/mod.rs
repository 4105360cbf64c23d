mod lock;
mod lockfree;

pub use lock::{LockStack, MutexStack, SpinLockStack};
pub use lockfree::TreiberStack;

use std::mem;

pub trait ConcurrentStack<V> {
    fn new() -> Self;
    fn push(&self, value: V);
    // non-blocking pop that returns `None` when the stack is observed as empty.
    fn pop(&self) -> Option<V>;
    // number of elements, readable without taking the stack's lock.
    fn count(&self) -> usize;
}

// simple sequential stack
pub struct Stack<V> {
    head: Option<Box<Node<V>>>,
    count: usize,
}

struct Node<V> {
    value: V,
    next: Option<Box<Node<V>>>,
}

impl<V> Node<V> {
    fn new(value: V) -> Node<V> {
        Node { value, next: None }
    }
}

impl<V> Stack<V> {
    pub fn new() -> Stack<V> {
        Stack {
            head: None,
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn top(&self) -> Option<&V> {
        self.head.as_ref().map(|node| &node.value)
    }

    pub fn push(&mut self, value: V) {
        let mut node = Box::new(Node::new(value));

        node.next = self.head.take();
        self.head = Some(node);
        self.count += 1;
    }

    pub fn pop(&mut self) -> Option<V> {
        let mut top = self.head.take()?;

        self.head = mem::replace(&mut top.next, None);
        self.count -= 1;

        Some(top.value)
    }
}

impl<V> Default for Stack<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for Stack<V> {
    fn drop(&mut self) {
        // unlink iteratively, a long chain of boxes would overflow the stack
        while self.pop().is_some() {}
    }
}
