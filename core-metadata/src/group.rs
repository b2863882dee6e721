//! Capability groups
//!
//! Providers are tagged with a bitmask of capability groups so that whole
//! families can be toggled at once (`-unsafe`, `+fast`, ...).

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Group membership of a provider descriptor
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GroupMask: u32 {
        /// Well-behaved public APIs
        const SAFE = 1 << 0;
        /// Scrapers that may break or return junk
        const UNSAFE = 1 << 1;
        /// Providers with unusual output (e.g. non-English sources)
        const SPECIAL = 1 << 2;
        /// Usually answers quickly
        const FAST = 1 << 3;
        /// Usually answers slowly
        const SLOW = 1 << 4;
        /// Sentinel: "every keyed descriptor", never stored on a descriptor
        const ALL = 1 << 31;
    }
}

/// Named capability group accepted by the selector language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    All,
    Safe,
    Unsafe,
    Special,
    Fast,
    Slow,
}

impl Group {
    pub const ALL_GROUPS: [Group; 6] = [
        Group::All,
        Group::Safe,
        Group::Unsafe,
        Group::Special,
        Group::Fast,
        Group::Slow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
            Self::Special => "special",
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }

    /// Case-insensitive lookup of a reserved group name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL_GROUPS
            .iter()
            .copied()
            .find(|group| group.name().eq_ignore_ascii_case(name))
    }

    pub fn mask(&self) -> GroupMask {
        match self {
            Self::All => GroupMask::ALL,
            Self::Safe => GroupMask::SAFE,
            Self::Unsafe => GroupMask::UNSAFE,
            Self::Special => GroupMask::SPECIAL,
            Self::Fast => GroupMask::FAST,
            Self::Slow => GroupMask::SLOW,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
