mod review;

pub use review::*;
