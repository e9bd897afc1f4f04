//! Bounded collection utilities

use std::collections::VecDeque;

/// Helper trait for bounded VecDeque operations
pub trait BoundedPush<T> {
    /// Push a value, evicting from the front while at capacity; returns how many were evicted
    fn push_bounded(&mut self, value: T, max_size: usize) -> usize;
}

impl<T> BoundedPush<T> for VecDeque<T> {
    #[inline]
    fn push_bounded(&mut self, value: T, max_size: usize) -> usize {
        let mut evicted = 0;
        while !self.is_empty() && self.len() >= max_size {
            self.pop_front();
            evicted += 1;
        }
        if max_size > 0 {
            self.push_back(value);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_bounded_evicts_oldest() {
        let mut deque = VecDeque::new();
        for i in 0..5 {
            deque.push_bounded(i, 3);
        }
        assert_eq!(deque, VecDeque::from(vec![2, 3, 4]));
    }

    #[test]
    fn test_push_bounded_shrinks_oversized_deque() {
        let mut deque: VecDeque<u32> = (0..10).collect();
        let evicted = deque.push_bounded(10, 4);
        assert_eq!(evicted, 7);
        assert_eq!(deque.len(), 4);
        assert_eq!(deque.back(), Some(&10));
    }

    #[test]
    fn test_push_bounded_zero_capacity() {
        let mut deque = VecDeque::from(vec![1]);
        deque.push_bounded(2, 0);
        assert!(deque.is_empty());
    }
}
