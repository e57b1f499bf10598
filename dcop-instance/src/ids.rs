//! Agent, variable and constraint identifiers.
use std::fmt;

/// The backing type used to represent identifiers.
pub type IdIdx = u32;

macro_rules! define_id {
    ($(#[$attr:meta])* $name:ident, $prefix:expr) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name {
            index: IdIdx,
        }

        impl $name {
            /// Creates an identifier from a 0-based index.
            #[inline]
            pub fn from_index(index: usize) -> $name {
                debug_assert!(index <= IdIdx::max_value() as usize);
                $name {
                    index: index as IdIdx,
                }
            }

            /// The 0-based index of this identifier.
            #[inline]
            pub const fn index(self) -> usize {
                self.index as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.index)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

define_id!(
    /// A decision variable.
    ///
    /// Variables are numbered in the order they were added to an instance. This numbering is also
    /// used when a problem is exported for the graph reduction.
    VarId,
    "x"
);

define_id!(
    /// A constraint over a tuple of variables.
    ConstraintId,
    "c"
);

define_id!(
    /// An agent owning variables.
    ///
    /// Agents are numbered in ascending order of their names. Iterating over agent ids in order is
    /// the processing order used whenever agents have to be visited deterministically.
    AgentId,
    "a"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip() {
        assert_eq!(VarId::from_index(17).index(), 17);
        assert_eq!(format!("{}", AgentId::from_index(3)), "a3");
        assert!(ConstraintId::from_index(1) < ConstraintId::from_index(2));
    }
}
