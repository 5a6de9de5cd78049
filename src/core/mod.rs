// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ambient components of the SDK

pub mod configuration;
pub(crate) mod sources;

mod error;
pub use error::{Error, Result};

pub mod log;
