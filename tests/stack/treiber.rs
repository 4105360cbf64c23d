use crossbeam_epoch::pin;
use mtutils::stack::{ConcurrentStack, TreiberStack};

use super::*;

#[test]
fn test_treiber_stack() {
    let stack = TreiberStack::new();
    let pin = pin();

    assert_eq!(stack.is_empty(&pin), true);

    stack.try_push(1, &pin);
    stack.try_push(2, &pin);
    stack.try_push(3, &pin);

    assert_eq!(stack.is_empty(&pin), false);
    assert_eq!(stack.top(&pin), Some(3));
    assert_eq!(stack.count(), 3);

    assert_eq!(stack.try_pop(&pin), Some(3));
    assert_eq!(stack.try_pop(&pin), Some(2));
    assert_eq!(stack.try_pop(&pin), Some(1));

    assert_eq!(stack.is_empty(&pin), true);
    assert_eq!(stack.try_pop(&pin), None);
}

#[test]
fn test_treiber_stack_lifo() {
    test_lifo_concurrent_stack::<TreiberStack<_>>();
}

#[test]
fn test_treiber_stack_simple() {
    test_simple_concurrent_stack::<TreiberStack<_>>();
}

#[test]
fn test_treiber_stack_producer_consumer() {
    test_producer_consumer_stack::<TreiberStack<_>>();
}

#[test]
fn test_treiber_stack_drops_leftovers() {
    let stack = TreiberStack::new();

    for i in 0..1_000 {
        stack.push(i.to_string());
    }

    drop(stack);
}

#[test]
fn test_treiber_stack_count_bounded() {
    test_count_stays_bounded::<TreiberStack<_>>();
}
