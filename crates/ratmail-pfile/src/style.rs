use std::collections::HashMap;

use serde::Serialize;

/// Opaque colour id handed out by the colour registry.
///
/// The pager never interprets these beyond the reserved ids below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct StyleId(pub i32);

impl StyleId {
    /// Plain text, no colour.
    pub const NONE: StyleId = StyleId(0);
    pub const HEADER: StyleId = StyleId(13);
    pub const INDICATOR: StyleId = StyleId(19);
    pub const MARKERS: StyleId = StyleId(22);
    pub const QUOTED: StyleId = StyleId(30);
    /// Reserved for search matches.
    pub const SEARCH: StyleId = StyleId(40);
    pub const SIGNATURE: StyleId = StyleId(42);

    pub fn is_none(self) -> bool {
        self == StyleId::NONE
    }
}

/// Handle to a resolved colour owned by the colour subsystem.
///
/// Lines only carry the handle; resolving it is up to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StyleHandle(pub u32);

/// Read-only view of the colour registry, injected wherever names are needed.
pub trait StyleLookup {
    fn name(&self, id: StyleId) -> Option<&str>;
}

/// Names for the ids this crate knows about.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinStyles;

impl StyleLookup for BuiltinStyles {
    fn name(&self, id: StyleId) -> Option<&str> {
        match id {
            StyleId::HEADER => Some("header"),
            StyleId::INDICATOR => Some("indicator"),
            StyleId::MARKERS => Some("markers"),
            StyleId::QUOTED => Some("quoted"),
            StyleId::SEARCH => Some("search"),
            StyleId::SIGNATURE => Some("signature"),
            _ => None,
        }
    }
}

impl StyleLookup for HashMap<StyleId, String> {
    fn name(&self, id: StyleId) -> Option<&str> {
        self.get(&id).map(String::as_str)
    }
}
