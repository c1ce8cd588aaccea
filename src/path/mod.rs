// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Destination directory templates.
//!
//! A template such as `{{.Name}}/{{.Version}}` or `{{ Name }}/{{ BuildID }}`
//! is rendered with Tera over a combined view of the device and the firmware.
//! The view contains every device field, then every firmware field, with
//! firmware fields winning on name collisions. `Identifier` always names the
//! device, even though firmware records carry one too.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error as _;
use std::path::PathBuf;
use tera::{Context, Tera};
use thiserror::Error;

use crate::filter::Record;
use crate::types::{Device, Firmware};

const TEMPLATE_NAME: &str = "directory";

/// `{{.Field}}` placeholders are rewritten to Tera's `{{ Field }}`.
static DOT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex")
});

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid directory template '{template}': {reason}")]
    Parse { template: String, reason: String },

    #[error("failed to render directory template '{template}': {reason}")]
    Render { template: String, reason: String },

    #[error("directory template '{template}' rendered an empty path")]
    Empty { template: String },
}

/// Collapse a Tera error and its sources into one line.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// A parsed directory template, reusable across work items.
#[derive(Debug)]
pub struct DirectoryTemplate {
    source: String,
    tera: Tera,
}

impl DirectoryTemplate {
    pub fn parse(source: &str) -> Result<Self, ResolveError> {
        let normalised = DOT_FIELD.replace_all(source, "{{ $1 }}");

        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, &normalised)
            .map_err(|e| ResolveError::Parse {
                template: source.to_string(),
                reason: describe(&e),
            })?;

        Ok(Self {
            source: source.to_string(),
            tera,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the destination directory for one firmware.
    pub fn render(&self, device: &Device, firmware: &Firmware) -> Result<PathBuf, ResolveError> {
        let context = combined_context(device, firmware);

        let rendered = self
            .tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| ResolveError::Render {
                template: self.source.clone(),
                reason: describe(&e),
            })?;

        if rendered.is_empty() {
            return Err(ResolveError::Empty {
                template: self.source.clone(),
            });
        }

        Ok(PathBuf::from(rendered))
    }
}

fn combined_context(device: &Device, firmware: &Firmware) -> Context {
    let mut context = Context::new();
    for (name, value) in device.fields() {
        context.insert(name, &value.to_json());
    }
    for (name, value) in firmware.fields() {
        context.insert(name, &value.to_json());
    }
    context.insert("Identifier", &device.identifier);
    context
}

/// Parse `template` and render it for one device/firmware pair.
pub fn resolve(template: &str, device: &Device, firmware: &Firmware) -> Result<PathBuf, ResolveError> {
    DirectoryTemplate::parse(template)?.render(device, firmware)
}
