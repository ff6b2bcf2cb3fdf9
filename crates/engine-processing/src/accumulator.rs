use model::records::{batch::Batch, tuple::DestinationTuple};

/// Buffers mapped tuples until a batch of `capacity` is ready.
///
/// The buffer never exceeds `capacity`: callers drain as soon as [`add`]
/// reports the accumulator full.
///
/// [`add`]: BatchAccumulator::add
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    buffer: Vec<DestinationTuple>,
    next_seq: u64,
}

impl BatchAccumulator {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buffer: Vec::with_capacity(capacity),
            next_seq: 1,
        }
    }

    /// Appends a tuple. Returns true once the buffer holds `capacity` tuples.
    pub fn add(&mut self, tuple: DestinationTuple) -> bool {
        debug_assert!(!self.is_full(), "accumulator must be drained when full");
        self.buffer.push(tuple);
        self.is_full()
    }

    /// Hands over the buffered tuples as the next batch and starts over.
    pub fn drain(&mut self) -> Batch {
        let tuples = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity));
        let batch = Batch::new(self.next_seq, tuples);
        self.next_seq += 1;
        batch
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Batches handed out so far.
    pub fn batches_formed(&self) -> u64 {
        self.next_seq - 1
    }
}
