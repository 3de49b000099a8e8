/// Two copies of a parameter block: `curr` is read by the rest of
/// the model while `next` accumulates the statistics of the running
/// iteration.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<M> {
    curr: M,
    next: M,
}

impl<M: Clone> DoubleBuffer<M> {
    pub fn from_elem(init: M) -> Self {
        Self {
            curr: init.clone(),
            next: init,
        }
    }
}

impl<M> DoubleBuffer<M> {
    pub fn curr(&self) -> &M {
        &self.curr
    }

    pub fn next(&self) -> &M {
        &self.next
    }

    pub fn curr_mut(&mut self) -> &mut M {
        &mut self.curr
    }

    pub fn next_mut(&mut self) -> &mut M {
        &mut self.next
    }

    /// Exchange `curr` and `next` without copying their contents
    pub fn flip(&mut self) {
        std::mem::swap(&mut self.curr, &mut self.next);
    }
}
