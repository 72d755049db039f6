//! Routing identifiers shared across the scheduling kernel
//!
//! These are the fields of a [`Target`](crate::Target): which process, which
//! thread on that process, which connection model, and which local
//! connection slot. None of them carry semantics of their own beyond
//! identity and ordering; the connection/synapse model library interprets
//! `SynId`/`LocalCid`, the kernel only routes by them.

use core::fmt;

/// MPI-style process rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RankId(pub u32);

impl RankId {
    /// Create a new rank id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw rank index.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank{}", self.0)
    }
}

/// Thread (virtual process) id local to a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ThreadId(pub u32);

impl ThreadId {
    /// Create a new thread id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw thread index.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread{}", self.0)
    }
}

/// Index of a registered connection (synapse) model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SynId(pub u16);

impl SynId {
    /// Create a new synapse-model id.
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Raw synapse-model index.
    pub const fn raw(&self) -> u16 {
        self.0
    }
}

/// Index of a connection within the connections of one synapse model on one
/// thread ("local connection id").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LocalCid(pub u32);

impl LocalCid {
    /// Create a new local connection id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw local connection index.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Global node (neuron) identifier, opaque to the kernel beyond equality and
/// ordering; interpretation belongs to the node-model library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new node id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw node id value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{Deserialize, Serialize};

    macro_rules! impl_serde_newtype {
        ($ty:ty, $inner:ty) => {
            impl Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    self.0.serialize(serializer)
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    <$inner>::deserialize(deserializer).map(Self)
                }
            }
        };
    }

    impl_serde_newtype!(RankId, u32);
    impl_serde_newtype!(ThreadId, u32);
    impl_serde_newtype!(SynId, u16);
    impl_serde_newtype!(LocalCid, u32);
    impl_serde_newtype!(NodeId, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_and_thread_ids_order_by_value() {
        assert!(RankId::new(1) < RankId::new(2));
        assert!(ThreadId::new(0) < ThreadId::new(1));
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", RankId::new(3)), "rank3");
        assert_eq!(format!("{}", ThreadId::new(2)), "thread2");
        assert_eq!(format!("{}", NodeId::new(7)), "n7");
    }
}
