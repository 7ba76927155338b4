//! Notification letters for newly registered libraries.
//!
//! Each letter is rendered to HTML from an embedded Handlebars template, then
//! converted to a Letter-size PDF with `wkhtmltopdf`. Files are named
//! `<fscs_id>-<address without punctuation or spaces>.{html,pdf}`.

use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{LetterError, LetterResult};
use crate::logs::Diagnostics;
use crate::models::{RecordRef, API_KEY, FSCS_ID};

const TEMPLATE: &str = include_str!("../../templates/letter.html");

/// Converter binary, looked up on `PATH`.
pub const WKHTMLTOPDF: &str = "wkhtmltopdf";

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\W+").expect("Invalid embedded file name pattern"));

/// The fields a letter shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LetterFields {
    pub fscs_id: String,
    pub name: String,
    pub address: String,
    pub api_key: String,
}

impl LetterFields {
    pub fn from_record(record: &RecordRef<'_>) -> LetterResult<Self> {
        let field = |name: &'static str| {
            record
                .get(name)
                .filter(|v| !v.is_null())
                .map(|v| v.as_cell())
                .ok_or(LetterError::MissingField(name))
        };
        Ok(Self {
            fscs_id: field(FSCS_ID)?,
            name: field("name")?,
            address: field("address")?,
            api_key: field(API_KEY)?,
        })
    }

    /// From a record returned by the store.
    pub fn from_json(record: &JsonValue) -> LetterResult<Self> {
        let field = |name: &'static str| match record.get(name) {
            Some(JsonValue::String(s)) => Ok(s.clone()),
            Some(JsonValue::Number(n)) => Ok(n.to_string()),
            _ => Err(LetterError::MissingField(name)),
        };
        Ok(Self {
            fscs_id: field(FSCS_ID)?,
            name: field("name")?,
            address: field("address")?,
            api_key: field(API_KEY)?,
        })
    }

    /// File name without extension.
    pub fn base_name(&self) -> String {
        format!("{}-{}", self.fscs_id, NON_WORD.replace_all(&self.address, ""))
    }
}

/// HTML text of the letter.
pub fn render_html(fields: &LetterFields) -> LetterResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
        .render_template(TEMPLATE, fields)
        .map_err(|e| LetterError::Template(e.to_string()))
}

/// Convert an HTML file to a Letter-size PDF.
pub fn html_to_pdf(html: &Path, pdf: &Path) -> LetterResult<()> {
    let output = Command::new(WKHTMLTOPDF)
        .args(["--page-size", "Letter"])
        .args(["--margin-top", "0.35in"])
        .args(["--margin-right", "0.75in"])
        .args(["--margin-bottom", "0.75in"])
        .args(["--margin-left", "0.75in"])
        .args(["--encoding", "UTF-8"])
        .arg("--no-outline")
        .arg("--enable-local-file-access")
        .arg(html)
        .arg(pdf)
        .output()
        .map_err(|e| LetterError::PdfConversion(format!("cannot run {}: {}", WKHTMLTOPDF, e)))?;

    if !output.status.success() {
        return Err(LetterError::PdfConversion(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

/// Files produced for one letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterFiles {
    pub html: PathBuf,
    pub pdf: Option<PathBuf>,
}

/// Writes letters into one directory.
#[derive(Debug, Clone)]
pub struct LetterWriter {
    dir: PathBuf,
    pdf: bool,
}

impl LetterWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pdf: true,
        }
    }

    /// Stop after the HTML step.
    pub fn html_only(mut self) -> Self {
        self.pdf = false;
        self
    }

    pub fn write(&self, fields: &LetterFields, diag: &Diagnostics) -> LetterResult<LetterFiles> {
        fs::create_dir_all(&self.dir)?;
        let base = self.dir.join(fields.base_name());
        let html = base.with_extension("html");
        fs::write(&html, render_html(fields)?)?;
        diag.info(format!("Letter written to {}", html.display()));

        let pdf = if self.pdf {
            let pdf = base.with_extension("pdf");
            html_to_pdf(&html, &pdf)?;
            diag.info(format!("PDF written to {}", pdf.display()));
            Some(pdf)
        } else {
            None
        };

        Ok(LetterFiles { html, pdf })
    }
}
