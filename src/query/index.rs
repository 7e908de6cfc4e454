use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Position in the solid's flat array.
            #[must_use]
            pub fn get(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

index_type!(
    /// Stable position of a face in the facade's ordered face list.
    FaceIndex
);
index_type!(
    /// Stable position of an edge in the facade's edge list.
    EdgeIndex
);
index_type!(
    /// Stable position of a vertex in the facade's vertex list.
    VertexIndex
);
