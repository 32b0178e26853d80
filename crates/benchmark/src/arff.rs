//! Minimal ARFF reader for ASlib scenario tables.
//!
//! Supports `@relation`, `@attribute` (quoted names allowed), `@data` and
//! dense comma-separated rows. `?` marks a missing value, `%` starts a
//! comment line. Sparse rows are rejected.

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading an ARFF file.
#[derive(Debug, Error)]
pub enum ArffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("row {row}, column '{column}': '{value}' is not a number")]
    NotANumber {
        row: usize,
        column: String,
        value: String,
    },
}

/// A declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArffAttribute {
    pub name: String,
    /// Raw type declaration, e.g. `NUMERIC` or `{ok,timeout}`.
    pub kind: String,
}

/// Parsed ARFF content. Cells are `None` where the file has `?`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArffFile {
    pub relation: String,
    pub attributes: Vec<ArffAttribute>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ArffFile {
    /// Reads and parses a file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ArffError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses ARFF text.
    pub fn parse(text: &str) -> Result<Self, ArffError> {
        let mut arff = ArffFile::default();
        let mut in_data = false;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }

            if in_data {
                if line.starts_with('{') {
                    return Err(syntax(line_no, "sparse rows are not supported"));
                }
                let cells = split_row(line, line_no)?;
                if cells.len() != arff.attributes.len() {
                    return Err(syntax(
                        line_no,
                        format!(
                            "expected {} values, found {}",
                            arff.attributes.len(),
                            cells.len()
                        ),
                    ));
                }
                arff.rows.push(cells);
                continue;
            }

            let lower = line.to_ascii_lowercase();
            if lower.starts_with("@relation") {
                arff.relation = unquote(line["@relation".len()..].trim()).to_string();
            } else if lower.starts_with("@attribute") {
                arff.attributes
                    .push(parse_attribute(line["@attribute".len()..].trim(), line_no)?);
            } else if lower.starts_with("@data") {
                in_data = true;
            } else {
                return Err(syntax(line_no, format!("unexpected header line '{}'", line)));
            }
        }

        if !in_data {
            return Err(syntax(text.lines().count(), "no @data section"));
        }
        Ok(arff)
    }

    /// Index of a column by name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Index of a column, failing with [`ArffError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<usize, ArffError> {
        self.column(name)
            .ok_or_else(|| ArffError::MissingColumn(name.to_string()))
    }

    /// Raw cell value.
    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// Numeric cell value; `Ok(None)` for a missing value.
    pub fn number(&self, row: usize, col: usize) -> Result<Option<f64>, ArffError> {
        match self.value(row, col) {
            None => Ok(None),
            Some(v) => v.parse::<f64>().map(Some).map_err(|_| ArffError::NotANumber {
                row,
                column: self.attributes[col].name.clone(),
                value: v.to_string(),
            }),
        }
    }
}

fn syntax(line: usize, message: impl Into<String>) -> ArffError {
    ArffError::Syntax {
        line,
        message: message.into(),
    }
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' || first == b'"') && first == last {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn parse_attribute(rest: &str, line: usize) -> Result<ArffAttribute, ArffError> {
    let (name, kind) = match rest.chars().next() {
        Some(q @ ('\'' | '"')) => {
            let end = rest[1..]
                .find(q)
                .ok_or_else(|| syntax(line, "unterminated attribute name"))?;
            (&rest[1..=end], rest[end + 2..].trim())
        }
        Some(_) => match rest.find(char::is_whitespace) {
            Some(pos) => (&rest[..pos], rest[pos..].trim()),
            None => return Err(syntax(line, "attribute without type")),
        },
        None => return Err(syntax(line, "empty attribute declaration")),
    };
    if kind.is_empty() {
        return Err(syntax(line, format!("attribute '{}' has no type", name)));
    }
    Ok(ArffAttribute {
        name: name.to_string(),
        kind: kind.to_string(),
    })
}

fn split_row(line: &str, line_no: usize) -> Result<Vec<Option<String>>, ArffError> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut was_quoted = false;

    let mut push = |current: &mut String, was_quoted: &mut bool| {
        let cell = if *was_quoted {
            Some(current.clone())
        } else {
            let v = current.trim();
            (v != "?").then(|| v.to_string())
        };
        cells.push(cell);
        current.clear();
        *was_quoted = false;
    };

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                was_quoted = true;
                current.clear();
            }
            None if c == ',' => push(&mut current, &mut was_quoted),
            None if was_quoted && !c.is_whitespace() => {
                return Err(syntax(line_no, "text after closing quote"))
            }
            None if was_quoted => {}
            None => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(syntax(line_no, "unterminated quoted value"));
    }
    push(&mut current, &mut was_quoted);
    Ok(cells)
}
