//! FIFO queue used by the breadth-first scans (resize, value search).

use std::collections::VecDeque;

pub trait WorkQueue<T> {
    fn push(&mut self, item: T);
    fn pop(&mut self) -> Option<T>;
    fn is_empty(&self) -> bool;
}

impl<T> WorkQueue<T> for VecDeque<T> {
    #[inline]
    fn push(&mut self, item: T) {
        self.push_back(item);
    }

    #[inline]
    fn pop(&mut self) -> Option<T> {
        self.pop_front()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        VecDeque::is_empty(self)
    }
}
