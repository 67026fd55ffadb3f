//! Test classes
//!
//! A test class is a fixture type plus the test methods declared for it.
//! Methods are registered as plain function pointers, so the engine never
//! looks anything up by reflection: a name maps straight to an invocable.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use super::Test;
use crate::config::Options;
use crate::error::{LoupeError, Outcome};
use crate::models::Reporter;
use crate::utils::source;

/// Prefix every runnable test method name carries
pub const TEST_PREFIX: &str = "test";

/// Fixture state shared by the methods of one class.
///
/// A fresh value is built for every test run. `before` runs ahead of the
/// method and `after` only once the method has passed.
pub trait TestCase: Default + Send + 'static {
    fn before(&mut self, _test: &mut Test) -> Outcome {
        Ok(())
    }

    fn after(&mut self, _test: &mut Test) -> Outcome {
        Ok(())
    }
}

/// Signature of a test method on fixture `F`
pub type TestFn<F> = fn(&mut F, &mut Test) -> Outcome;

type Invoke = Arc<dyn Fn(&mut Test) -> Outcome + Send + Sync>;

/// One method of a test class
#[derive(Clone)]
pub struct TestMethod {
    name: String,
    line: u32,
    invoke: Invoke,
}

impl TestMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source line of the method definition
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_runnable(&self) -> bool {
        self.name.starts_with(TEST_PREFIX)
    }
}

impl fmt::Debug for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMethod")
            .field("name", &self.name)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

/// A registered test class
#[derive(Clone, Debug)]
pub struct TestClass {
    name: String,
    file: String,
    methods: Vec<TestMethod>,
}

impl TestClass {
    /// Start declaring class `name` backed by fixture `F`.
    ///
    /// The declaring file is taken from the caller.
    #[track_caller]
    pub fn builder<F: TestCase>(name: impl Into<String>) -> ClassBuilder<F> {
        ClassBuilder {
            name: name.into(),
            file: Location::caller().file().to_string(),
            methods: Vec::new(),
            _fixture: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Runnable methods: the ones following the `test` naming convention
    pub fn test_list(&self) -> impl Iterator<Item = &TestMethod> {
        self.methods.iter().filter(|method| method.is_runnable())
    }

    pub fn method(&self, name: &str) -> Option<&TestMethod> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Run one method in isolation and hand back its reporter.
    ///
    /// A failed check ends the run early but is never an error here: it is
    /// already recorded in the returned reporter.
    pub fn run(&self, method_name: &str, options: &Options) -> Result<Reporter, LoupeError> {
        let method = self
            .method(method_name)
            .ok_or_else(|| LoupeError::UnknownMethod {
                class: self.name.clone(),
                method: method_name.to_string(),
            })?;

        let mut reporter = Reporter::new();
        if options.progress() {
            reporter = reporter.with_progress(options.color());
        }

        let mut test = Test::new(
            self.name.as_str(),
            method.name.as_str(),
            self.file.as_str(),
            method.line,
            options.color(),
            reporter,
        );
        let _ = test.run(|t| (method.invoke)(t));

        Ok(test.into_reporter())
    }
}

/// Builder returned by [`TestClass::builder`]
pub struct ClassBuilder<F> {
    name: String,
    file: String,
    methods: Vec<TestMethod>,
    _fixture: std::marker::PhantomData<fn() -> F>,
}

impl<F: TestCase> ClassBuilder<F> {
    /// Override the declaring file, for classes registered away from
    /// their methods. Call before declaring methods.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Declare method `name`.
    ///
    /// The recorded line is the `fn name` definition inside an `impl` block
    /// of `F` when the source is readable, otherwise the line of this call.
    #[track_caller]
    pub fn test(self, name: impl Into<String>, method: TestFn<F>) -> Self {
        let name = name.into();
        let fixture = source::short_type_name(std::any::type_name::<F>());
        let line = source::locate_fn(&self.file, fixture, &name)
            .unwrap_or_else(|| Location::caller().line());
        self.test_at(name, line, method)
    }

    /// Declare a method at an explicit source line
    pub fn test_at(mut self, name: impl Into<String>, line: u32, method: TestFn<F>) -> Self {
        let invoke: Invoke = Arc::new(move |test: &mut Test| {
            let mut fixture = F::default();
            fixture.before(test)?;
            method(&mut fixture, test)?;
            fixture.after(test)
        });

        self.methods.push(TestMethod {
            name: name.into(),
            line,
            invoke,
        });
        self
    }

    pub fn build(self) -> TestClass {
        TestClass {
            name: self.name,
            file: self.file,
            methods: self.methods,
        }
    }

    /// Build and add to the process-wide registry
    pub fn register(self) {
        super::registry::register(self.build());
    }
}
