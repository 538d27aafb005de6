/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The shape-driven protocol layer: one interpreter instead of generated
//! per-shape marshallers.
//!
//! A [`factory::ProtocolFactory`] binds a wire protocol flavour, API version,
//! and error registry for one service. Given an [`operation::OperationShape`]
//! and a request [`Structure`](wireshape_types::Structure), [`marshal`]
//! produces the HTTP request; the factory's
//! [`ResponseHandler`](factory::ResponseHandler) drives the matching
//! unmarshaller or the error dispatcher over the response.

pub mod error;
pub mod factory;
pub mod marshal;
pub mod operation;
pub mod unmarshal;
mod uri;

pub use crate::error::{ErrorRegistry, ResponseError, ServiceError};
pub use crate::factory::{Protocol, ProtocolFactory, ResponseHandler};
pub use crate::marshal::MarshalError;
pub use crate::operation::OperationShape;
pub use crate::unmarshal::UnmarshalError;
