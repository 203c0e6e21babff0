// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stack frame capture and mapping to the intake frame schema.

use std::path::Path;

use serde::Serialize;

/// Function name used when a frame has no resolvable symbol.
pub const UNKNOWN_FUNCTION: &str = "(closure)";

/// File name used when a frame has no source location.
pub const UNKNOWN_FILENAME: &str = "(anonymous)";

/// Module of the capture machinery, hidden from captured frames.
const BACKTRACE_MODULE: &str = "backtrace";
const CAPTURE_MODULE: &str = "apm_agent::events::stacktrace";

/// One entry of a stacktrace as sent to the intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub function: String,
    pub lineno: u32,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abs_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
}

impl Frame {
    pub fn new(function: impl Into<String>) -> Self {
        Frame {
            function: function.into(),
            lineno: 0,
            filename: UNKNOWN_FILENAME.to_string(),
            abs_path: None,
            module: None,
            call_type: None,
        }
    }

    /// Sets the source location; `filename` becomes the base name of `path`.
    #[must_use]
    pub fn with_location(mut self, path: impl AsRef<Path>, line: u32) -> Self {
        let path = path.as_ref();
        self.filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNKNOWN_FILENAME.to_string());
        self.abs_path = Some(path.to_string_lossy().into_owned());
        self.lineno = line;
        self
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn with_call_type(mut self, call_type: impl Into<String>) -> Self {
        self.call_type = Some(call_type.into());
        self
    }

    /// Splits a demangled `path::to::function` into module and function.
    fn from_symbol_name(name: &str) -> Self {
        match name.rsplit_once("::") {
            Some((module, function)) => Frame::new(function).with_module(module),
            None => Frame::new(name),
        }
    }
}

/// Captures the current call stack, innermost frame first.
///
/// At most `limit` frames are kept; 0 keeps all of them.
#[inline(never)]
pub fn capture(limit: usize) -> Vec<Frame> {
    let backtrace = backtrace::Backtrace::new();
    let frames = backtrace
        .frames()
        .iter()
        .flat_map(|frame| {
            let symbols = frame.symbols();
            if symbols.is_empty() {
                return vec![Frame::new(UNKNOWN_FUNCTION)];
            }
            symbols.iter().map(map_symbol).collect()
        })
        .filter(|frame| !is_capture_frame(frame));

    if limit == 0 {
        frames.collect()
    } else {
        frames.take(limit).collect()
    }
}

fn map_symbol(symbol: &backtrace::BacktraceSymbol) -> Frame {
    let mut frame = match symbol.name() {
        // alternate formatting drops the trailing symbol hash
        Some(name) => Frame::from_symbol_name(&format!("{name:#}")),
        None => Frame::new(UNKNOWN_FUNCTION),
    };
    if let Some(path) = symbol.filename() {
        frame = frame.with_location(path, symbol.lineno().unwrap_or(0));
    }
    frame
}

fn is_capture_frame(frame: &Frame) -> bool {
    match frame.module.as_deref() {
        Some(module) if module == CAPTURE_MODULE => frame.function == "capture",
        Some(module) => {
            // impl paths render as `<backtrace::capture::Backtrace>`
            let module = module.trim_start_matches('<');
            module == BACKTRACE_MODULE || module.starts_with(&format!("{BACKTRACE_MODULE}::"))
        }
        None => false,
    }
}
