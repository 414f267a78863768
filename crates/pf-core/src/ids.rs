use core::fmt;
use core::num::NonZeroU32;

/// Dense index of a topology node or edge.
///
/// Held as `index + 1` in a `NonZeroU32` so `Option<Id>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

pub type NodeId = Id;
pub type EdgeId = Id;

impl Id {
    /// Largest representable index.
    pub const MAX_INDEX: u32 = u32::MAX - 1;

    /// Id for `index`; indices past [`Id::MAX_INDEX`] saturate to it.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index.min(Self::MAX_INDEX)))
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Position in the owning graph's node or edge vector.
    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_insertion_index() {
        let ids: Vec<Id> = (0..4).map(Id::from_index).collect();
        assert_eq!(ids.iter().map(|id| id.slot()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(ids[1] < ids[2]);
        assert_eq!(format!("{:?}", ids[3]), "#3");
        assert_eq!(ids[3].to_string(), "3");
    }

    #[test]
    fn indices_saturate_at_the_cap() {
        assert_eq!(Id::from_index(Id::MAX_INDEX).index(), Id::MAX_INDEX);
        assert_eq!(Id::from_index(u32::MAX).index(), Id::MAX_INDEX);
    }

    #[test]
    fn optional_id_has_no_overhead() {
        assert_eq!(core::mem::size_of::<Id>(), core::mem::size_of::<Option<Id>>());
    }
}
