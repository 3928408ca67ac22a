use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use crate::error::EtlResult;
use crate::record::{FieldDescriptor, FieldSet, Shape};

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    pub struct Person {
        pub name: scalar String,
        pub age: scalar i32,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    pub struct Contact {
        pub name: scalar String,
        pub email: scalar String,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    pub struct TextAge {
        pub age: scalar String,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Simple {
        pub first: scalar i64,
        pub second: scalar String,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Outer {
        pub first: scalar i64,
        pub second: scalar String,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct OuterFirst {
        pub first: scalar i64,
    }
}

crate::shape! {
    /// A top-level field next to a nested object.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Nested {
        pub top: scalar String,
        pub outer: object Outer,
    }
}

crate::shape! {
    /// Knows only one field of the nested object of [`Nested`].
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct NestedFirst {
        pub outer: object OuterFirst,
    }
}

crate::shape! {
    /// A string-keyed map of integers.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Labels {
        pub labels: map i64,
    }
}

crate::shape! {
    /// The same map read as text values.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct TextLabels {
        pub labels: map String,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct UtcEvent {
        pub at: scalar DateTime<Utc>,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct OffsetEvent {
        pub at: scalar DateTime<FixedOffset>,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct TextEvent {
        pub at: scalar String,
    }
}

crate::shape! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct MillisEvent {
        pub at: scalar i64,
    }
}

crate::shape! {
    /// Only finite values can be stored.
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    pub struct Ratio {
        pub r: scalar f64,
    }
}

/// Declares `count` as an integer but always writes text into it, so every merge fails after
/// `label` has already been planned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Misdeclared;

impl Shape for Misdeclared {
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::scalar::<String>("label"),
        FieldDescriptor::scalar::<i64>("count"),
    ];

    fn from_view(_view: &FieldSet) -> EtlResult<Self> {
        Ok(Misdeclared)
    }

    fn to_view(&self) -> EtlResult<FieldSet> {
        let mut view = FieldSet::new();
        view.put_scalar("label", Some(&"after".to_string()))?;
        view.put_scalar("count", Some(&"lots".to_string()))?;
        Ok(view)
    }
}
