// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Test utilities for sqlgraph integration tests
//!
//! - TopologyFixture: a topology over an in-memory database
//! - RecordingListener / RecordingPublisher: capture catalog events and diffs

#![allow(dead_code)]

pub mod test_fixture;
