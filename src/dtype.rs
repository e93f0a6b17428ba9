use std::fmt::Debug;

use num_traits::{Num, NumCast, ToPrimitive};

/// A trait for primitive numeric types that may appear in an input table.
///
/// This trait is sealed and cannot be implemented for external types. The
/// ingestion path dispatches on [`Element::DTYPE`] at runtime to reject
/// tables whose element type the index cannot hold, and an out-of-crate
/// implementation could misreport its tag.
pub trait Element:
    private::Sealed + Num + NumCast + ToPrimitive + PartialOrd + Debug + Send + Sync + Copy
{
    /// The runtime tag identifying this element type.
    const DTYPE: DType;
}

impl Element for i8 {
    const DTYPE: DType = DType::Int8;
}

impl Element for u8 {
    const DTYPE: DType = DType::UInt8;
}

impl Element for i16 {
    const DTYPE: DType = DType::Int16;
}

impl Element for u16 {
    const DTYPE: DType = DType::UInt16;
}

impl Element for i32 {
    const DTYPE: DType = DType::Int32;
}

impl Element for u32 {
    const DTYPE: DType = DType::UInt32;
}

impl Element for i64 {
    const DTYPE: DType = DType::Int64;
}

impl Element for u64 {
    const DTYPE: DType = DType::UInt64;
}

impl Element for f32 {
    const DTYPE: DType = DType::Float32;
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;
}

/// An enum over the element types an input table may carry.
///
/// Only [`DType::Float64`] tables can back an index; the other tags exist so
/// validation can name what it rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for i8 {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for u16 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for i64 {}
    impl Sealed for u64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
