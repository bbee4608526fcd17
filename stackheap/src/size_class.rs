//! Size classes measured by the pairs.

use stackheap_core::DEFAULT_UNIT_STACK_SIZE;
use std::fmt;
use std::str::FromStr;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

/// Byte width of a measured value.
///
/// Each class sits in a different regime: a register-sized value, one that
/// fits comfortably in a frame, a page-sized value whose frame touches fresh
/// stack pages, and one far beyond any default stack budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SizeClass {
    /// 8 B
    Small,
    /// 1 KiB
    Medium,
    /// 4 KiB
    Large,
    /// 1 MiB
    Huge,
}

impl SizeClass {
    /// Every class, narrowest first
    pub const ALL: [SizeClass; 4] = [
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::Huge,
    ];

    /// Width of the value in bytes
    pub const fn width(self) -> usize {
        match self {
            SizeClass::Small => 8,
            SizeClass::Medium => KIB,
            SizeClass::Large => 4 * KIB,
            SizeClass::Huge => MIB,
        }
    }

    /// Group name used in sub-benchmark ids
    pub const fn label(self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
            SizeClass::Huge => "huge",
        }
    }

    /// What this width exercises
    pub const fn regime(self) -> &'static str {
        match self {
            SizeClass::Small => "fits in a register; the stack arm never touches memory it didn't already own",
            SizeClass::Medium => "fits in one frame well inside the first stack page",
            SizeClass::Large => "spans a full page; a fresh stack faults pages in on first use",
            SizeClass::Huge => "exceeds a default thread stack; the unit stack is sized to hold it",
        }
    }

    /// Stack size of the execution unit that measures this class.
    ///
    /// Eight times the width leaves room for the by-value temporary and any
    /// copies an unoptimised build makes, never below the default unit size.
    pub const fn unit_stack_size(self) -> usize {
        let needed = 8 * self.width();
        if needed > DEFAULT_UNIT_STACK_SIZE {
            needed
        } else {
            DEFAULT_UNIT_STACK_SIZE
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SizeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(SizeClass::Small),
            "medium" | "med" => Ok(SizeClass::Medium),
            "large" => Ok(SizeClass::Large),
            "huge" => Ok(SizeClass::Huge),
            other => Err(format!("Unknown size class: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_strictly_increase() {
        let widths: Vec<_> = SizeClass::ALL.iter().map(|c| c.width()).collect();
        assert_eq!(widths, vec![8, 1024, 4096, 1_048_576]);
        assert!(widths.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_ordering_matches_width() {
        let mut shuffled = [
            SizeClass::Huge,
            SizeClass::Small,
            SizeClass::Large,
            SizeClass::Medium,
        ];
        shuffled.sort();
        assert_eq!(shuffled, SizeClass::ALL);
    }

    #[test]
    fn test_unit_stack_size() {
        assert_eq!(SizeClass::Small.unit_stack_size(), DEFAULT_UNIT_STACK_SIZE);
        assert_eq!(SizeClass::Large.unit_stack_size(), DEFAULT_UNIT_STACK_SIZE);
        assert_eq!(SizeClass::Huge.unit_stack_size(), 8 * MIB);
        for class in SizeClass::ALL {
            assert!(class.unit_stack_size() >= 2 * class.width());
        }
    }

    #[test]
    fn test_label_roundtrip() {
        for class in SizeClass::ALL {
            assert_eq!(class.label().parse::<SizeClass>(), Ok(class));
            assert_eq!(class.to_string(), class.label());
        }
        assert_eq!("MED".parse::<SizeClass>(), Ok(SizeClass::Medium));
        assert!("tiny".parse::<SizeClass>().is_err());
    }
}
