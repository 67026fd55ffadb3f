//! Capabilities a target needs for the corresponding checks

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

/// Values with a truthiness: `false`, `None` and `Err` are falsey
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> Truthy for Result<T, E> {
    fn is_truthy(&self) -> bool {
        self.is_ok()
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

/// Collections and strings
pub trait IsEmpty {
    fn is_empty_value(&self) -> bool;
}

macro_rules! impl_is_empty {
    ($($ty:ty => [$($generics:tt)*]),* $(,)?) => {
        $(
            impl<$($generics)*> IsEmpty for $ty {
                fn is_empty_value(&self) -> bool {
                    self.is_empty()
                }
            }
        )*
    };
}

impl_is_empty! {
    str => [],
    String => [],
    [T] => [T],
    Vec<T> => [T],
    VecDeque<T> => [T],
    HashMap<K, V> => [K, V],
    HashSet<T> => [T],
    BTreeMap<K, V> => [K, V],
    BTreeSet<T> => [T],
}

impl<T: IsEmpty + ?Sized> IsEmpty for &T {
    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

/// Containers that can be asked whether they hold `Item`
pub trait Includes<Item: ?Sized> {
    fn includes(&self, item: &Item) -> bool;
}

impl Includes<str> for str {
    fn includes(&self, item: &str) -> bool {
        self.contains(item)
    }
}

impl Includes<str> for String {
    fn includes(&self, item: &str) -> bool {
        self.contains(item)
    }
}

impl Includes<char> for str {
    fn includes(&self, item: &char) -> bool {
        self.contains(*item)
    }
}

impl Includes<char> for String {
    fn includes(&self, item: &char) -> bool {
        self.contains(*item)
    }
}

impl<T: PartialEq> Includes<T> for [T] {
    fn includes(&self, item: &T) -> bool {
        self.contains(item)
    }
}

impl<T: PartialEq> Includes<T> for Vec<T> {
    fn includes(&self, item: &T) -> bool {
        self.contains(item)
    }
}

impl<K: Eq + Hash, V> Includes<K> for HashMap<K, V> {
    fn includes(&self, item: &K) -> bool {
        self.contains_key(item)
    }
}

impl<T: Eq + Hash> Includes<T> for HashSet<T> {
    fn includes(&self, item: &T) -> bool {
        self.contains(item)
    }
}

impl<Item: ?Sized, T: Includes<Item> + ?Sized> Includes<Item> for &T {
    fn includes(&self, item: &Item) -> bool {
        (**self).includes(item)
    }
}

/// Matchers: a regex is used as is, text matches literally
pub trait IntoPattern {
    fn into_pattern(self) -> Regex;
}

impl IntoPattern for Regex {
    fn into_pattern(self) -> Regex {
        self
    }
}

impl IntoPattern for &Regex {
    fn into_pattern(self) -> Regex {
        self.clone()
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> Regex {
        literal(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> Regex {
        literal(&self)
    }
}

fn literal(text: &str) -> Regex {
    // An escaped pattern always compiles
    Regex::new(&regex::escape(text)).expect("escaped literal is a valid regex")
}

/// Comparison operators for `to_satisfy_operator`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }

    pub fn apply<T: PartialOrd<U> + ?Sized, U: ?Sized>(self, left: &T, right: &U) -> bool {
        match self {
            Operator::Lt => left < right,
            Operator::Le => left <= right,
            Operator::Gt => left > right,
            Operator::Ge => left >= right,
            Operator::Eq => left == right,
            Operator::Ne => left != right,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
