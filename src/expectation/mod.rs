//! Expectation engine
//!
//! `test.expect(target)` wraps a value; every check records one expectation
//! on the test's reporter and either hands the wrapper back for chaining or
//! records a failure and returns [`ExpectationFailed`], which `?` turns into
//! an early exit from the test body.
//!
//! Failures are located at the check call site through `#[track_caller]`.

mod capture;
mod traits;

pub use capture::StreamMatcher;
pub use traits::{Includes, IntoPattern, IsEmpty, Operator, Truthy};

use regex::Regex;
use std::any::{type_name, TypeId};
use std::fmt::Debug;
use std::panic::Location;
use std::path::Path;

use crate::case::Test;
use crate::error::ExpectationFailed;
use crate::models::Failure;
use crate::output::{Color, ColorName};

/// Delta used by the closeness checks when the caller has no better bound
pub const DEFAULT_DELTA: f64 = 0.001;

/// A target value waiting for its checks
pub struct Expectation<'t, T> {
    target: T,
    test: &'t mut Test,
    message: Option<String>,
}

impl<'t, T> Expectation<'t, T> {
    pub fn new(target: T, test: &'t mut Test) -> Self {
        Self {
            target,
            test,
            message: None,
        }
    }

    /// Replace the generated failure message for the checks that follow
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Expectation<'t, U> {
        Expectation {
            target: f(self.target),
            test: self.test,
            message: self.message,
        }
    }

    /// Count one expectation and record a failure unless `passed`
    #[track_caller]
    fn assert(
        mut self,
        passed: bool,
        describe: impl FnOnce(&T, Color) -> String,
    ) -> Result<Self, ExpectationFailed> {
        self.test.reporter_mut().increment_expectation_count();
        if passed {
            return Ok(self);
        }

        let message = match self.message.take() {
            Some(message) => message,
            None => describe(&self.target, self.test.color()),
        };
        let failure = Failure::new(&*self.test, message, Location::caller());
        self.test.reporter_mut().increment_failure_count(failure);
        Err(ExpectationFailed::new())
    }
}

impl<T: Truthy + Debug> Expectation<'_, T> {
    /// `false`, `None` and `Err` are falsey; everything else is truthy
    #[track_caller]
    pub fn to_be_truthy(self) -> Result<Self, ExpectationFailed> {
        let passed = self.target.is_truthy();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint("truthy", ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_be_falsey(self) -> Result<Self, ExpectationFailed> {
        let passed = !self.target.is_truthy();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint("falsey", ColorName::Green)
            )
        })
    }
}

impl<T: Debug> Expectation<'_, T> {
    /// Value equality. For identity see [`Expectation::to_be_the_same_as`].
    #[track_caller]
    pub fn to_be_equal_to<U: Debug>(self, value: U) -> Result<Self, ExpectationFailed>
    where
        T: PartialEq<U>,
    {
        let passed = self.target == value;
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be equal to {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{value:?}"), ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_not_be_equal_to<U: Debug>(self, value: U) -> Result<Self, ExpectationFailed>
    where
        T: PartialEq<U>,
    {
        let passed = self.target != value;
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to not be equal to {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{value:?}"), ColorName::Green)
            )
        })
    }

    /// Exact type check: `K` must be the target's own type
    #[track_caller]
    pub fn to_be_an_instance_of<K: ?Sized + 'static>(self) -> Result<Self, ExpectationFailed>
    where
        T: 'static,
    {
        let passed = TypeId::of::<T>() == TypeId::of::<K>();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be an instance of {}, not {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(type_name::<K>(), ColorName::Green),
                c.paint(type_name::<T>(), ColorName::Red)
            )
        })
    }

    #[track_caller]
    pub fn to_not_be_an_instance_of<K: ?Sized + 'static>(self) -> Result<Self, ExpectationFailed>
    where
        T: 'static,
    {
        let passed = TypeId::of::<T>() != TypeId::of::<K>();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to not be an instance of {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(type_name::<K>(), ColorName::Green)
            )
        })
    }

    /// Passes when `predicate` holds; `description` names it in the message,
    /// e.g. `expect(7).to_satisfy(|n| n % 2 == 1, "odd")`
    #[track_caller]
    pub fn to_satisfy(
        self,
        predicate: impl FnOnce(&T) -> bool,
        description: &str,
    ) -> Result<Self, ExpectationFailed> {
        let passed = predicate(&self.target);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(description, ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_not_satisfy(
        self,
        predicate: impl FnOnce(&T) -> bool,
        description: &str,
    ) -> Result<Self, ExpectationFailed> {
        let passed = !predicate(&self.target);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to not be {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(description, ColorName::Green)
            )
        })
    }

    /// `expect(5.0).to_satisfy_operator(Operator::Gt, 4.9)`
    #[track_caller]
    pub fn to_satisfy_operator<U: Debug>(
        self,
        operator: Operator,
        other: U,
    ) -> Result<Self, ExpectationFailed>
    where
        T: PartialOrd<U>,
    {
        let passed = operator.apply(&self.target, &other);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be {operator} {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{other:?}"), ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_not_satisfy_operator<U: Debug>(
        self,
        operator: Operator,
        other: U,
    ) -> Result<Self, ExpectationFailed>
    where
        T: PartialOrd<U>,
    {
        let passed = !operator.apply(&self.target, &other);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to not be {operator} {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{other:?}"), ColorName::Green)
            )
        })
    }

    /// Membership: substrings and chars for strings, elements for
    /// sequences and sets, keys for maps
    #[track_caller]
    pub fn to_include<I: ?Sized + Debug>(self, item: &I) -> Result<Self, ExpectationFailed>
    where
        T: Includes<I>,
    {
        let passed = self.target.includes(item);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to include {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{item:?}"), ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_not_include<I: ?Sized + Debug>(self, item: &I) -> Result<Self, ExpectationFailed>
    where
        T: Includes<I>,
    {
        let passed = !self.target.includes(item);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to not include {}.",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{item:?}"), ColorName::Green)
            )
        })
    }
}

impl<T: IsEmpty + Debug> Expectation<'_, T> {
    #[track_caller]
    pub fn to_be_empty(self) -> Result<Self, ExpectationFailed> {
        let passed = self.target.is_empty_value();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be empty.",
                c.paint(format!("{target:?}"), ColorName::Red)
            )
        })
    }

    #[track_caller]
    pub fn to_not_be_empty(self) -> Result<Self, ExpectationFailed> {
        let passed = !self.target.is_empty_value();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to not be empty.",
                c.paint(format!("{target:?}"), ColorName::Red)
            )
        })
    }
}

impl<U: Debug> Expectation<'_, Option<U>> {
    #[track_caller]
    pub fn to_be_nil(self) -> Result<Self, ExpectationFailed> {
        let passed = self.target.is_none();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to be nil.",
                c.paint(format!("{target:?}"), ColorName::Red)
            )
        })
    }

    #[track_caller]
    pub fn to_not_be_nil(self) -> Result<Self, ExpectationFailed> {
        let passed = self.target.is_some();
        self.assert(passed, |target, c| {
            format!(
                "Expected {} to not be nil.",
                c.paint(format!("{target:?}"), ColorName::Red)
            )
        })
    }
}

impl<'a, U: ?Sized + Debug> Expectation<'_, &'a U> {
    /// Identity: both references point at the same value
    #[track_caller]
    pub fn to_be_the_same_as(self, other: &U) -> Result<Self, ExpectationFailed> {
        let passed = std::ptr::eq(self.target, other);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} ({}) to be the same as {} ({}).",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{:p}", *target), ColorName::Red),
                c.paint(format!("{other:?}"), ColorName::Green),
                c.paint(format!("{other:p}"), ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_not_be_the_same_as(self, other: &U) -> Result<Self, ExpectationFailed> {
        let passed = !std::ptr::eq(self.target, other);
        self.assert(passed, |target, c| {
            format!(
                "Expected {} ({}) to not be the same as {} ({}).",
                c.paint(format!("{target:?}"), ColorName::Red),
                c.paint(format!("{:p}", *target), ColorName::Red),
                c.paint(format!("{other:?}"), ColorName::Green),
                c.paint(format!("{other:p}"), ColorName::Green)
            )
        })
    }
}

impl<T: AsRef<Path> + Debug> Expectation<'_, T> {
    #[track_caller]
    pub fn to_be_an_existing_path(self) -> Result<Self, ExpectationFailed> {
        let passed = self.target.as_ref().exists();
        self.assert(passed, |target, c| {
            format!(
                "Expected path '{}' to exist.",
                c.paint(format!("{target:?}"), ColorName::Red)
            )
        })
    }

    #[track_caller]
    pub fn to_not_be_an_existing_path(self) -> Result<Self, ExpectationFailed> {
        let passed = !self.target.as_ref().exists();
        self.assert(passed, |target, c| {
            format!(
                "Expected path '{}' to not exist.",
                c.paint(format!("{target:?}"), ColorName::Red)
            )
        })
    }
}

impl<'t, T: IntoPattern> Expectation<'t, T> {
    /// The target is the matcher: a regex, or text matched literally.
    ///
    /// The returned expectation holds the compiled pattern.
    #[track_caller]
    pub fn to_match(self, subject: &str) -> Result<Expectation<'t, Regex>, ExpectationFailed> {
        let expectation = self.map(IntoPattern::into_pattern);
        let passed = expectation.target.is_match(subject);
        expectation.assert(passed, |pattern, c| {
            format!(
                "Expected {} to match {}.",
                c.paint(format!("/{pattern}/"), ColorName::Red),
                c.paint(subject, ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_not_match(self, subject: &str) -> Result<Expectation<'t, Regex>, ExpectationFailed> {
        let expectation = self.map(IntoPattern::into_pattern);
        let passed = !expectation.target.is_match(subject);
        expectation.assert(passed, |pattern, c| {
            format!(
                "Expected {} to not match {}.",
                c.paint(format!("/{pattern}/"), ColorName::Red),
                c.paint(subject, ColorName::Green)
            )
        })
    }
}

impl<T: Into<f64> + Copy> Expectation<'_, T> {
    /// Passes when `|target - value| <= delta`
    #[track_caller]
    pub fn to_be_in_delta_of(
        self,
        value: impl Into<f64>,
        delta: f64,
    ) -> Result<Self, ExpectationFailed> {
        let (target, value) = (self.target.into(), value.into());
        let difference = (target - value).abs();
        self.assert(delta >= difference, |_, c| {
            format!(
                "Expected |{target} - {value}| ({}) to be <= {}.",
                c.paint(difference, ColorName::Red),
                c.paint(delta, ColorName::Green)
            )
        })
    }

    #[track_caller]
    pub fn to_not_be_in_delta_of(
        self,
        value: impl Into<f64>,
        delta: f64,
    ) -> Result<Self, ExpectationFailed> {
        let (target, value) = (self.target.into(), value.into());
        let difference = (target - value).abs();
        self.assert(delta <= difference, |_, c| {
            format!(
                "Expected |{target} - {value}| ({}) to not be <= {}.",
                c.paint(difference, ColorName::Red),
                c.paint(delta, ColorName::Green)
            )
        })
    }

    /// Relative closeness: the allowed delta is `epsilon` times the smaller
    /// magnitude of the two values
    #[track_caller]
    pub fn to_be_in_epsilon_of(
        self,
        value: impl Into<f64>,
        epsilon: f64,
    ) -> Result<Self, ExpectationFailed> {
        let value = value.into();
        let delta = self.target.into().abs().min(value.abs()) * epsilon;
        self.to_be_in_delta_of(value, delta)
    }

    #[track_caller]
    pub fn to_not_be_in_epsilon_of(
        self,
        value: impl Into<f64>,
        epsilon: f64,
    ) -> Result<Self, ExpectationFailed> {
        let value = value.into();
        let delta = self.target.into().abs().min(value.abs()) * epsilon;
        self.to_not_be_in_delta_of(value, delta)
    }
}
