//! HTTP method as a typed enum.
//!
//! Covers the RFC 9110 standard methods. Unknown method strings are rejected
//! at the server level with `405 Method Not Allowed` before they ever reach
//! the routing tree, so the tree only stores and matches this closed set.

use std::fmt;
use std::str::FromStr;

/// A known HTTP method.
///
/// `Ord` follows declaration order so method sets (the `Allow` header)
/// render deterministically.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            _         => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
