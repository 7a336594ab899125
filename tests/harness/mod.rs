// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the lead intake pipeline.
//!
//! Fixtures wire an [`lead_intake::IntakeService`] against in-process
//! stores and mail transports; generators produce submissions and client
//! addresses for flood simulation.

#![allow(dead_code)]

pub mod fixtures;
pub mod generators;
pub mod metrics;
