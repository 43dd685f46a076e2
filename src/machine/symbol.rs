//! The transition alphabet seam.
//!
//! A machine is built over a [`Symbol`] alphabet but runs over that
//! alphabet's `Unit` type. For most alphabets the two coincide; `char`
//! machines are built from code points and run over raw UTF-8 bytes, each
//! code point expanding into 1-4 byte transitions.

use std::fmt;
use std::hash::Hash;

use smallvec::SmallVec;

use super::utf8::{Utf8Error, Utf8Validator};

/// Validates the raw input stream during matching.
///
/// One validator is created per scan and fed every unit in order, then
/// given a final end-of-input check.
pub trait InputValidator<U>: Default {
    fn step(&mut self, unit: U) -> Result<(), Utf8Error>;
    fn finish(&self) -> Result<(), Utf8Error>;
}

/// Validator for alphabets whose input needs no checking.
#[derive(Clone, Copy, Default)]
pub struct NullValidator;

impl<U> InputValidator<U> for NullValidator {
    #[inline]
    fn step(&mut self, _unit: U) -> Result<(), Utf8Error> {
        Ok(())
    }

    #[inline]
    fn finish(&self) -> Result<(), Utf8Error> {
        Ok(())
    }
}

/// A build-time transition symbol.
pub trait Symbol: Copy + Eq + Ord + Hash + fmt::Debug {
    /// The runtime alphabet the machine actually transitions on.
    type Unit: Copy + Eq + Ord + Hash + fmt::Debug;

    /// Input-stream validation applied while matching.
    type Validator: InputValidator<Self::Unit>;

    /// Decompose this symbol into its runtime units, in transition order.
    fn units(self, out: &mut SmallVec<[Self::Unit; 4]>);
}

impl Symbol for char {
    type Unit = u8;
    type Validator = Utf8Validator;

    fn units(self, out: &mut SmallVec<[u8; 4]>) {
        let mut buf = [0u8; 4];
        out.extend_from_slice(self.encode_utf8(&mut buf).as_bytes());
    }
}

macro_rules! raw_symbol {
    ($($ty:ty),*) => {
        $(
            impl Symbol for $ty {
                type Unit = $ty;
                type Validator = NullValidator;

                #[inline]
                fn units(self, out: &mut SmallVec<[$ty; 4]>) {
                    out.push(self);
                }
            }
        )*
    };
}

raw_symbol!(u8, u16, u32, u64, usize);
