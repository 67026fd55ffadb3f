//! Single work item execution
//!
//! Runs one test method and always hands back a reporter, even when the
//! class is unknown or the test panics, so a worker never leaves the
//! controller waiting.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use super::WorkItem;
use crate::case::Registry;
use crate::config::Options;
use crate::error::LoupeError;
use crate::models::{Failure, Reporter};

/// Run `item` against `registry`
pub fn execute(registry: &Registry, item: &WorkItem, options: &Options) -> Reporter {
    debug!("Running {}", item);

    let Some(class) = registry.class(&item.class) else {
        let err = LoupeError::UnknownClass(item.class.clone());
        error!("{}", err);
        return crashed(registry, item, options, err.to_string());
    };

    match panic::catch_unwind(AssertUnwindSafe(|| class.run(&item.method, options))) {
        Ok(Ok(reporter)) => reporter,
        Ok(Err(err)) => {
            error!("{}", err);
            crashed(registry, item, options, err.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("{} panicked: {}", item, message);
            crashed(registry, item, options, format!("panicked: {message}"))
        }
    }
}

/// A reporter holding one failed test for `item`
pub(super) fn crashed(registry: &Registry, item: &WorkItem, options: &Options, message: String) -> Reporter {
    let class = registry.class(&item.class);
    let file = class.map(|class| class.file().to_string()).unwrap_or_default();
    let line = class
        .and_then(|class| class.method(&item.method))
        .map(|method| method.line())
        .unwrap_or(0);

    let mut reporter = Reporter::new();
    if options.progress() {
        reporter = reporter.with_progress(options.color());
    }
    reporter.increment_test_count();
    reporter.increment_failure_count(Failure {
        file,
        test_name: item.method.clone(),
        line,
        message,
        class_name: item.class.clone(),
        color: options.color(),
    });
    reporter
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Test, TestCase, TestClass};
    use crate::error::Outcome;

    #[derive(Default)]
    struct Fixture;

    impl TestCase for Fixture {}

    impl Fixture {
        fn test_passes(&mut self, t: &mut Test) -> Outcome {
            t.expect(2 + 2).to_be_equal_to(4)?;
            Ok(())
        }

        fn test_panics(&mut self, _t: &mut Test) -> Outcome {
            panic!("index out of bounds");
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(
            TestClass::builder::<Fixture>("FixtureTest")
                .in_file("tests/fixture.rs")
                .test_at("test_passes", 5, Fixture::test_passes)
                .test_at("test_panics", 9, Fixture::test_panics)
                .build(),
        );
        registry
    }

    #[test]
    fn test_execute_passing_item() {
        let reporter = execute(
            &registry(),
            &WorkItem::new("FixtureTest", "test_passes"),
            &Options::quiet(),
        );
        assert_eq!(reporter.test_count(), 1);
        assert_eq!(reporter.success_count(), 1);
        assert_eq!(reporter.expectation_count(), 1);
    }

    #[test]
    fn test_panic_becomes_failure() {
        let reporter = execute(
            &registry(),
            &WorkItem::new("FixtureTest", "test_panics"),
            &Options::quiet(),
        );
        assert_eq!(reporter.test_count(), 1);
        assert_eq!(reporter.failure_count(), 1);

        let failure = &reporter.failures()[0];
        assert_eq!(failure.message, "panicked: index out of bounds");
        assert_eq!(failure.file, "tests/fixture.rs");
        assert_eq!(failure.line, 9);
        assert_eq!(failure.class_name, "FixtureTest");
    }

    #[test]
    fn test_unknown_items_are_failures() {
        let registry = registry();
        let options = Options::quiet();

        let reporter = execute(&registry, &WorkItem::new("Missing", "test_a"), &options);
        assert_eq!(reporter.failure_count(), 1);
        assert!(reporter.failures()[0].message.contains("unknown test class"));

        let reporter = execute(&registry, &WorkItem::new("FixtureTest", "test_nope"), &options);
        assert_eq!(reporter.failures()[0].line, 0);
        assert!(reporter.failures()[0].message.contains("unknown test method"));
    }
}
