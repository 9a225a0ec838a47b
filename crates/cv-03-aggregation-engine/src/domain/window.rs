//! Count-bounded sliding window.

use std::collections::VecDeque;

/// Samples kept per metrics window.
pub const WINDOW_CAPACITY: usize = 100;

/// FIFO buffer that evicts its oldest sample once full.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> SlidingWindow<T> {
    /// A window of at most `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted one if the window was full.
    pub fn push(&mut self, sample: T) -> Option<T> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.samples.iter()
    }

    /// The newest `n` samples, oldest first.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        self.samples.iter().skip(self.samples.len().saturating_sub(n))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.samples.iter().copied().collect()
    }
}

impl<T: Copy> Default for SlidingWindow<T> {
    fn default() -> Self {
        Self::new(WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut window = SlidingWindow::new(3);
        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert_eq!(window.push(4), Some(1));
        assert_eq!(window.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn test_last_n() {
        let mut window = SlidingWindow::new(5);
        for i in 0..5u64 {
            window.push(i);
        }
        assert_eq!(window.last_n(2).copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(window.last_n(10).count(), 5);
    }

    #[test]
    fn test_default_capacity() {
        let window: SlidingWindow<u64> = SlidingWindow::default();
        assert_eq!(window.capacity(), WINDOW_CAPACITY);
        assert!(window.is_empty());
    }
}
