// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Any destination the resolver accepts stays under the root

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::ffi::OsStr;
use std::path::{Component, Path};

use inbox_triage::resolve_destination;

#[derive(Arbitrary, Debug)]
struct Input {
    category: String,
    subfolder: Option<String>,
    name: String,
}

fuzz_target!(|input: Input| {
    let root = Path::new("/srv/triage");
    let Ok(dest) = resolve_destination(root, &input.category, input.subfolder.as_deref(), &input.name) else {
        return;
    };

    let rest = dest.path.strip_prefix(root).expect("destination escaped the root");
    assert!(rest.components().all(|c| matches!(c, Component::Normal(_))), "{:?}", dest.path);
    assert_eq!(rest.components().next().map(|c| c.as_os_str()), Some(OsStr::new(dest.category.as_str())));
    assert_eq!(dest.path.file_name().and_then(|n| n.to_str()), Some(dest.name.as_str()));
});
