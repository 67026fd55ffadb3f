//! Test classes, the registry and single test runs

mod class;
pub mod registry;
mod test;

pub use class::{ClassBuilder, TestCase, TestClass, TestFn, TestMethod, TEST_PREFIX};
pub use registry::{Registry, Selector};
pub use test::{Sink, Test};

#[cfg(test)]
pub(crate) use test::sample;
