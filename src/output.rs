use std::fmt::Write as _;
use std::io::{self, Write};

use crate::encode::{DEFAULT_ATTRIBUTE, ShapeDescriptor};

/// Writes `<map>` blocks of `<area>` elements to a byte stream.
///
/// Each area is formatted into its own buffer first and only reaches the
/// stream through [`ImageMapWriter::commit`], so a shape that fails to format
/// leaves no partial output behind.
#[derive(Debug)]
pub struct ImageMapWriter<W: Write> {
    inner: W,
}

impl<W: Write> ImageMapWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn begin_layer(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.inner, "<map name=\"{}\">", escape_attribute(name))
    }

    pub fn end_layer(&mut self) -> io::Result<()> {
        writeln!(self.inner, "</map>")?;
        self.inner.flush()
    }

    pub fn commit(&mut self, buffer: &str) -> io::Result<()> {
        self.inner.write_all(buffer.as_bytes())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Format one `<area>` element, newline terminated.
pub fn format_area(shape: &ShapeDescriptor) -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    write!(
        buffer,
        "  <area shape=\"{}\" id=\"{}\" coords=\"{}\"",
        shape.kind.as_str(),
        escape_attribute(&shape.id),
        shape.coords
    )?;
    for (key, value) in &shape.attributes {
        write!(buffer, " {}=\"{}\"", attribute_name(key), escape_attribute(value))?;
    }
    buffer.push_str("/>\n");
    Ok(buffer)
}

/// Attribute name derived from a rule name. Characters outside the XML name
/// set become `_`; an empty name falls back to `title`.
pub fn attribute_name(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    match out.chars().next() {
        None => out.push_str(DEFAULT_ATTRIBUTE),
        Some(first) if !(first.is_alphabetic() || first == '_' || first == ':') => {
            out.insert(0, '_')
        }
        Some(_) => {}
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
