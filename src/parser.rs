// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use pest;

/// The internal Pest parser for literals embedded in instruction arguments.
#[derive(Parser)]
#[grammar = "literal.pest"]
pub(crate) struct LiteralParser;

/// A Pest Pair for literal rules.
pub(crate) type Pair<'a> = pest::iterators::Pair<'a, Rule>;
