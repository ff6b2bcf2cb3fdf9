use crate::records::tuple::DestinationTuple;

#[derive(Debug, Clone)]
pub struct Batch {
    pub id: String,
    /// Position of the batch in formation order, starting at 1.
    pub seq: u64,
    pub tuples: Vec<DestinationTuple>,
}

impl Batch {
    pub fn new(seq: u64, tuples: Vec<DestinationTuple>) -> Self {
        Batch {
            id: uuid::Uuid::new_v4().to_string(),
            seq,
            tuples,
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}
