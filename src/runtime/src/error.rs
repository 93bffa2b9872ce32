use derive_more::Display;

/// More writes were queued than the writer was sized for.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display(fmt = "capacity of {} entries exceeded", capacity)]
pub struct WriterOverflow {
    pub capacity: usize,
}

impl std::error::Error for WriterOverflow {}
