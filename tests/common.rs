// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

#![allow(dead_code)]

use dockerfile_analyzer::{DockerfileError, ErrorCode};

pub fn strings(strs: &[&str]) -> Vec<String> {
  strs.iter().map(|s| String::from(*s)).collect()
}

/// Returns the codes of the given errors, in order.
pub fn codes(errors: &[DockerfileError]) -> Vec<ErrorCode> {
  errors.iter().map(|e| e.code).collect()
}
