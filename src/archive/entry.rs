/// One committed index entry: a name and its payload's location in the
/// archive's payload region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub position: u64,
    pub size: u64,
}

/// An edit not yet folded into the committed entry table.
#[derive(Debug)]
pub(crate) enum PendingEdit {
    Add(Vec<u8>),
    Edit(Vec<u8>),
    Remove,
}
