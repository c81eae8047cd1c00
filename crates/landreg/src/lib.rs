#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use landreg_estimate as estimate;

#[doc(inline)]
pub use landreg_session as session;
