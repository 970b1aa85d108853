// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error types for flowsketch operations

use std::fmt;

/// ErrorKind is all kinds of Error of flowsketch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The config for a sketch is invalid.
    ConfigInvalid,
    /// A key's length disagrees with the sketch's configured key width.
    KeyMismatch,
    /// The widest layer of a counter hierarchy saturated.
    CounterOverflow,
    /// A FlowRadar decode recovered only part of the inserted flow set.
    DecodeIncomplete,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::KeyMismatch => "KeyMismatch",
            ErrorKind::CounterOverflow => "CounterOverflow",
            ErrorKind::DecodeIncomplete => "DecodeIncomplete",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by all flowsketch functions.
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::default(),
            source: None,
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    ///
    /// # Panics
    ///
    /// Panics if the source has been set.
    pub fn set_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(src.into());
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// A construction parameter is out of its admissible range.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::ConfigInvalid, message)
    }

    /// A key was offered to a sketch configured for another key width.
    pub fn key_mismatch(expected: usize, got: usize) -> Self {
        Error::new(ErrorKind::KeyMismatch, "flow key width disagrees")
            .with_context("expected", expected)
            .with_context("got", got)
    }

    /// The widest hierarchy layer saturated on the given logical counter.
    pub fn counter_overflow(index: usize) -> Self {
        Error::new(
            ErrorKind::CounterOverflow,
            "widest layer saturated; counter reads back as a lower bound",
        )
        .with_context("index", index)
    }

    /// A decode pass terminated before recovering every inserted flow.
    pub fn decode_incomplete(decoded: usize, remaining_cells: usize) -> Self {
        Error::new(
            ErrorKind::DecodeIncomplete,
            "load factor too high for full recovery",
        )
        .with_context("decoded_flows", decoded)
        .with_context("remaining_cells", remaining_cells)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // If alternate has been specified, we will print like Debug.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            de.field("source", &self.source);
            return de.finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source:")?;
            writeln!(f, "   {source:#}")?;
        }

        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_preserved() {
        let err = Error::key_mismatch(13, 4);
        assert_eq!(err.kind(), ErrorKind::KeyMismatch);
        let rendered = format!("{err}");
        assert!(rendered.contains("KeyMismatch"));
        assert!(rendered.contains("expected: 13"));
        assert!(rendered.contains("got: 4"));
    }

    #[test]
    fn source_is_chained() {
        use std::error::Error as _;

        let err = Error::config_invalid("width must be positive")
            .set_source(std::io::Error::other("inner"));
        assert!(err.source().is_some());
    }
}
