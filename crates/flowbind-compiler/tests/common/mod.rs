// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared helpers for compiler integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use flowbind_compiler::Package;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn load_fixture(name: &str) -> Package {
    let path = fixtures_dir().join(name);
    Package::load(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}
