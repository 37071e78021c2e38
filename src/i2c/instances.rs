// Licensed under the Apache-2.0 license

//! Base addresses of the I2C peripheral instances.

use crate::i2c::registers::Mmio;

macro_rules! i2c_instances {
    ($($n:literal => $base:literal),+ $(,)?) => {
        paste::paste! {
            $(
                #[doc = "Base address of I2C" $n "."]
                pub const [<I2C $n _BASE>]: usize = $base;

                #[doc = "Register view of I2C" $n "."]
                ///
                /// # Safety
                ///
                /// The caller must hold the only register view of this instance.
                #[must_use]
                pub unsafe fn [<i2c $n>]() -> Mmio {
                    // SAFETY: the address is a valid I2C register block and the
                    // caller guarantees exclusivity.
                    unsafe { Mmio::new([<I2C $n _BASE>]) }
                }
            )+

            /// Base addresses indexed by instance number minus one.
            pub const BASES: &[usize] = &[$([<I2C $n _BASE>]),+];
        }
    };
}

i2c_instances! {
    1 => 0x4000_5400,
    2 => 0x4000_5800,
    3 => 0x4000_5C00,
}
