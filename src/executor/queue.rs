//! Work queue
//!
//! One entry per test method to run, shuffled so that tests depending on
//! each other's side effects show up as flaky rather than passing by luck.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::case::Registry;
use crate::error::LoupeError;

/// A `(class, method)` pair
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub class: String,
    pub method: String,
}

impl WorkItem {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.method)
    }
}

impl FromStr for WorkItem {
    type Err = LoupeError;

    /// Parses `Class::method`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("::") {
            Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                Ok(WorkItem::new(class, method))
            }
            _ => Err(LoupeError::InvalidSelector(s.to_string())),
        }
    }
}

/// Pending work items
#[derive(Clone, Debug, Default)]
pub struct WorkQueue {
    items: Vec<WorkItem>,
}

impl WorkQueue {
    /// Queue every runnable method of the selected classes.
    ///
    /// A class with line filters only contributes the methods defined on
    /// one of those lines. The order is random, or fixed by `seed`.
    pub fn populate(registry: &Registry, seed: Option<u64>) -> Self {
        let mut items: Vec<WorkItem> = registry
            .classes()
            .flat_map(|(class, lines)| {
                class
                    .test_list()
                    .filter(move |method| lines.is_empty() || lines.contains(&method.line()))
                    .map(move |method| WorkItem::new(class.name(), method.name()))
            })
            .collect();

        match seed {
            Some(seed) => items.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => items.shuffle(&mut rand::rng()),
        }

        Self { items }
    }

    /// Next item, or `None` once the queue is drained
    pub fn pop(&mut self) -> Option<WorkItem> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<WorkItem>> for WorkQueue {
    fn from(items: Vec<WorkItem>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Test, TestCase, TestClass};
    use crate::error::Outcome;

    #[derive(Default)]
    struct Empty;

    impl TestCase for Empty {}

    fn pass(_: &mut Empty, _: &mut Test) -> Outcome {
        Ok(())
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(
            TestClass::builder::<Empty>("ATest")
                .in_file("tests/a.rs")
                .test_at("test_ten", 10, pass)
                .test_at("test_twenty", 20, pass)
                .test_at("helper", 30, pass)
                .build(),
        );
        registry.register(
            TestClass::builder::<Empty>("BTest")
                .in_file("tests/b.rs")
                .test_at("test_fifteen", 15, pass)
                .build(),
        );
        registry
    }

    fn sorted(mut queue: WorkQueue) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(item) = queue.pop() {
            names.push(item.to_string());
        }
        names.sort();
        names
    }

    #[test]
    fn test_populate_all_runnable_methods() {
        let queue = WorkQueue::populate(&registry(), None);
        assert_eq!(queue.len(), 3);
        assert_eq!(
            sorted(queue),
            vec!["ATest::test_ten", "ATest::test_twenty", "BTest::test_fifteen"]
        );
    }

    #[test]
    fn test_populate_with_line_filter() {
        let mut registry = registry();
        registry.select(&["tests/a.rs:10".parse().unwrap()]);

        let queue = WorkQueue::populate(&registry, None);
        assert_eq!(sorted(queue), vec!["ATest::test_ten"]);
    }

    #[test]
    fn test_seeded_order_is_reproducible() {
        let first = WorkQueue::populate(&registry(), Some(7));
        let second = WorkQueue::populate(&registry(), Some(7));
        assert_eq!(first.items, second.items);
    }

    #[test]
    fn test_pop_on_empty_queue() {
        let mut queue = WorkQueue::default();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_work_item_parsing() {
        let item: WorkItem = "SmokeTest::test_one".parse().unwrap();
        assert_eq!(item, WorkItem::new("SmokeTest", "test_one"));
        assert!("SmokeTest".parse::<WorkItem>().is_err());
        assert!("::test_one".parse::<WorkItem>().is_err());
    }
}
