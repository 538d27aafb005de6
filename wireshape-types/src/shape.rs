/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shape schemas: the member tables that drive marshalling and
//! unmarshalling.
//!
//! A `Shape` is created once, at service-definition time, and never mutated
//! afterwards. Nested shapes are shared through `Arc` so a service's schema
//! graph is cheap to hand to concurrent invocations.

use crate::instant::Format;
use std::sync::Arc;

/// Where a member travels in the HTTP request or response.
///
/// Each member maps to exactly one location; this is enforced structurally
/// (the location is a single field of [`Member`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireLocation {
    /// Substituted into a `{name}` placeholder in the URI template.
    UriPath,
    /// Appended to the query string in declaration order.
    QueryParam,
    /// Set (not appended) as an HTTP header.
    Header,
    /// Serialized into the body by the protocol's walker.
    BodyField,
}

#[derive(Debug, Clone)]
pub enum ShapeKind {
    Boolean,
    Integer,
    Float,
    String,
    Blob,
    Timestamp(Format),
    List(Box<ShapeKind>),
    Structure(Arc<Shape>),
}

#[derive(Debug, Clone)]
pub struct Member {
    name: String,
    location_name: String,
    location: WireLocation,
    kind: ShapeKind,
    required: bool,
}

impl Member {
    pub fn new(name: impl Into<String>, location: WireLocation, kind: ShapeKind) -> Self {
        let name = name.into();
        Member {
            location_name: name.clone(),
            name,
            location,
            kind,
            required: false,
        }
    }

    /// Overrides the name used on the wire. The model-side name (the field
    /// key in a `Structure`) is unchanged.
    pub fn renamed(mut self, location_name: impl Into<String>) -> Self {
        self.location_name = location_name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location_name(&self) -> &str {
        &self.location_name
    }

    pub fn location(&self) -> WireLocation {
        self.location
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// An ordered, immutable member table describing one request or result type.
#[derive(Debug)]
pub struct Shape {
    name: String,
    members: Vec<Member>,
}

impl Shape {
    pub fn builder(name: impl Into<String>) -> ShapeBuilder {
        ShapeBuilder {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// An empty shape: no members in any location. Requests with this input
    /// shape still produce an explicit empty body.
    pub fn empty(name: impl Into<String>) -> Arc<Shape> {
        Shape::builder(name).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn members_at(&self, location: WireLocation) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(move |m| m.location == location)
    }

    pub fn has_body_members(&self) -> bool {
        self.members_at(WireLocation::BodyField).next().is_some()
    }

    /// Looks up a body member by its wire name. Wire fields arrive in any
    /// order; unmarshallers match by name at each depth, never by position.
    pub fn body_member_named(&self, location_name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.location == WireLocation::BodyField && m.location_name == location_name)
    }
}

#[derive(Debug)]
pub struct ShapeBuilder {
    name: String,
    members: Vec<Member>,
}

impl ShapeBuilder {
    /// Adds a member. Panics on a duplicate member name: shapes are
    /// assembled once at service-definition time, so a duplicate is a
    /// definition bug, not a runtime condition.
    pub fn add(mut self, member: Member) -> Self {
        assert!(
            self.members.iter().all(|m| m.name != member.name),
            "duplicate member `{}` in shape `{}`",
            member.name,
            self.name
        );
        self.members.push(member);
        self
    }

    pub fn build(self) -> Arc<Shape> {
        Arc::new(Shape {
            name: self.name,
            members: self.members,
        })
    }
}
