//! Line-oriented XML emission with tag balance tracking

use std::fmt::Display;

use quick_xml::escape::escape;

use crate::error::{ReportError, Result};

/// An attribute name and its unescaped value
pub type Attr<'a> = (&'a str, &'a dyn Display);

/// Collects report lines, indenting one tab per open element
#[derive(Debug, Default)]
pub struct XmlEmitter {
    lines: Vec<String>,
    open: Vec<&'static str>,
}

impl XmlEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a line verbatim (declarations, doctype)
    pub fn raw(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// Emit `<tag ...>` and nest following elements inside it
    pub fn open(&mut self, tag: &'static str, attrs: &[Attr]) {
        let line = format!("{}<{}{}>", self.indent(), tag, format_attrs(attrs));
        self.lines.push(line);
        self.open.push(tag);
    }

    /// Emit a self-closing `<tag .../>`
    pub fn empty(&mut self, tag: &str, attrs: &[Attr]) {
        let line = format!("{}<{}{}/>", self.indent(), tag, format_attrs(attrs));
        self.lines.push(line);
    }

    /// Close the innermost open element, which must be `tag`
    pub fn close(&mut self, tag: &str) -> Result<()> {
        match self.open.pop() {
            Some(open) if open == tag => {
                let line = format!("{}</{}>", self.indent(), tag);
                self.lines.push(line);
                Ok(())
            }
            Some(open) => Err(ReportError::UnbalancedXml(format!(
                "closing </{}> while <{}> is open",
                tag, open
            ))),
            None => Err(ReportError::UnbalancedXml(format!(
                "closing </{}> with no open element",
                tag
            ))),
        }
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Return the emitted lines, failing if any element is still open
    pub fn finish(self) -> Result<Vec<String>> {
        if let Some(open) = self.open.last() {
            return Err(ReportError::UnbalancedXml(format!("<{}> was never closed", open)));
        }
        Ok(self.lines)
    }

    fn indent(&self) -> String {
        "\t".repeat(self.open.len())
    }
}

fn format_attrs(attrs: &[Attr]) -> String {
    attrs
        .iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, escape(&value.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_output() {
        let mut xml = XmlEmitter::new();
        xml.raw("<?xml version=\"1.0\" ?>");
        xml.open("report", &[("name", &"demo")]);
        xml.empty("counter", &[("type", &"LINE"), ("missed", &1), ("covered", &2)]);
        xml.close("report").unwrap();

        let lines = xml.finish().unwrap();
        assert_eq!(
            lines,
            vec![
                "<?xml version=\"1.0\" ?>",
                "<report name=\"demo\">",
                "\t<counter type=\"LINE\" missed=\"1\" covered=\"2\"/>",
                "</report>",
            ]
        );
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let mut xml = XmlEmitter::new();
        xml.empty("method", &[("name", &"<anonymous> & \"quoted\"")]);
        let lines = xml.finish().unwrap();
        assert_eq!(
            lines[0],
            "<method name=\"&lt;anonymous&gt; &amp; &quot;quoted&quot;\"/>"
        );
    }

    #[test]
    fn test_mismatched_close_is_rejected() {
        let mut xml = XmlEmitter::new();
        xml.open("package", &[]);
        assert!(matches!(xml.close("class"), Err(ReportError::UnbalancedXml(_))));

        let mut xml = XmlEmitter::new();
        assert!(xml.close("report").is_err());
    }

    #[test]
    fn test_unclosed_element_fails_finish() {
        let mut xml = XmlEmitter::new();
        xml.open("report", &[]);
        assert_eq!(xml.depth(), 1);
        assert!(xml.finish().is_err());
    }
}
