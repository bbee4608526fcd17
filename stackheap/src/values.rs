//! Value types and their two construction strategies.
//!
//! One fixed-width struct per size class. Byte 0 is a wrapping counter; the
//! rest of the array is payload that only exists to give the value its width.
//!
//! - `create_*` returns the value by value, so it lives in the caller's frame.
//! - `new_*` returns a `Box`, allocated already zeroed on the heap. The value
//!   never exists on the stack first, which keeps `new_huge` from needing a
//!   megabyte of frame.

use crate::size_class::SizeClass;
use std::fmt;

/// Counter wraps back to 0 after this many increments
pub const COUNTER_MODULUS: u8 = 254;

/// Common surface of the four value types.
pub trait Value: Sized + Send + 'static {
    /// Size class this type measures
    const SIZE_CLASS: SizeClass;
    /// Width in bytes (equal to `size_of::<Self>()`)
    const WIDTH: usize = Self::SIZE_CLASS.width();

    /// Zeroed value, returned by value
    fn create() -> Self;

    /// Zeroed value behind an owning heap handle
    fn boxed() -> Box<Self>;

    /// Advance the counter in byte 0, modulo [`COUNTER_MODULUS`]
    fn increment(&mut self);

    /// Current counter value
    fn counter(&self) -> u8;

    /// The value's full byte representation
    fn as_bytes(&self) -> &[u8];
}

macro_rules! value_type {
    ($(#[$doc:meta])* $name:ident, $class:expr, $create:ident, $new:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq)]
        #[repr(transparent)]
        pub struct $name {
            bytes: [u8; $class.width()],
        }

        #[doc = concat!("Zeroed [`", stringify!($name), "`] returned by value.")]
        #[inline]
        pub fn $create() -> $name {
            $name {
                bytes: [0; $class.width()],
            }
        }

        #[doc = concat!("Zeroed [`", stringify!($name), "`] allocated directly on the heap.")]
        #[inline]
        pub fn $new() -> Box<$name> {
            let boxed = Box::<$name>::new_zeroed();
            // SAFETY: the struct is a transparent byte array, every bit
            // pattern (including all zeroes) is a valid value.
            unsafe { boxed.assume_init() }
        }

        impl Value for $name {
            const SIZE_CLASS: SizeClass = $class;

            #[inline]
            fn create() -> Self {
                $create()
            }

            #[inline]
            fn boxed() -> Box<Self> {
                $new()
            }

            #[inline]
            fn increment(&mut self) {
                // Stays below the modulus, so the add cannot overflow
                self.bytes[0] = (self.bytes[0] + 1) % COUNTER_MODULUS;
            }

            #[inline]
            fn counter(&self) -> u8 {
                self.bytes[0]
            }

            fn as_bytes(&self) -> &[u8] {
                &self.bytes
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("width", &self.bytes.len())
                    .field("counter", &self.bytes[0])
                    .finish()
            }
        }
    };
}

value_type!(
    /// 8-byte value
    Small,
    SizeClass::Small,
    create_small,
    new_small
);

value_type!(
    /// 1 KiB value
    Medium,
    SizeClass::Medium,
    create_medium,
    new_medium
);

value_type!(
    /// 4 KiB value
    Large,
    SizeClass::Large,
    create_large,
    new_large
);

value_type!(
    /// 1 MiB value. Only ever build it by value on a thread whose stack was
    /// sized with [`SizeClass::unit_stack_size`].
    Huge,
    SizeClass::Huge,
    create_huge,
    new_huge
);

#[cfg(test)]
mod tests {
    use super::*;

    fn width_matches<V: Value>() {
        assert_eq!(std::mem::size_of::<V>(), V::WIDTH);
        assert_eq!(V::WIDTH, V::SIZE_CLASS.width());
    }

    #[test]
    fn test_sizes_match_classes() {
        width_matches::<Small>();
        width_matches::<Medium>();
        width_matches::<Large>();
        width_matches::<Huge>();
    }

    #[test]
    fn test_both_strategies_start_zeroed() {
        assert!(create_small().as_bytes().iter().all(|&b| b == 0));
        assert!(new_small().as_bytes().iter().all(|&b| b == 0));
        assert!(create_large().as_bytes().iter().all(|&b| b == 0));
        assert_eq!(create_medium(), *new_medium());
        assert!(new_huge().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_increment_touches_only_counter() {
        let mut v = create_medium();
        v.increment();
        assert_eq!(v.counter(), 1);
        assert!(v.as_bytes()[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_counter_wraps_at_modulus() {
        let mut v = new_small();
        for _ in 0..COUNTER_MODULUS - 1 {
            v.increment();
        }
        assert_eq!(v.counter(), 253);
        v.increment();
        assert_eq!(v.counter(), 0);
        v.increment();
        assert_eq!(v.counter(), 1);
    }

    #[test]
    fn test_debug_does_not_dump_payload() {
        let dbg = format!("{:?}", new_huge());
        assert_eq!(dbg, "Huge { width: 1048576, counter: 0 }");
    }
}
