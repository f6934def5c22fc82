//! Goods cubes moved across the map

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of goods colors. City colors come from the same set: by the
/// standard delivery policy a city accepts exactly the goods of its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Good {
    Red,
    Blue,
    Yellow,
    Purple,
    Black,
}

impl Good {
    pub const ALL: [Good; 5] = [Good::Red, Good::Blue, Good::Yellow, Good::Purple, Good::Black];

    pub fn as_str(&self) -> &'static str {
        match self {
            Good::Red => "red",
            Good::Blue => "blue",
            Good::Yellow => "yellow",
            Good::Purple => "purple",
            Good::Black => "black",
        }
    }
}

impl fmt::Display for Good {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
