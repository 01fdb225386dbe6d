/// The four logical axes of a chunk or image, fastest varying first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Row,
    Column,
    Slice,
    Time,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Row,
        Dimension::Column,
        Dimension::Slice,
        Dimension::Time,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}
