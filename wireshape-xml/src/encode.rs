/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::escape::escape;

/// Writes an XML document into a `String` buffer.
///
/// ```
/// use wireshape_xml::encode::XmlWriter;
///
/// let mut out = String::new();
/// let mut writer = XmlWriter::new(&mut out);
/// let mut root = writer.start_el("Widget").finish();
/// let mut name = root.start_el("Name").finish();
/// name.data("example");
/// name.finish();
/// root.finish();
/// assert_eq!(out, "<Widget><Name>example</Name></Widget>");
/// ```
pub struct XmlWriter<'a> {
    doc: &'a mut String,
}

impl<'a> XmlWriter<'a> {
    pub fn new(doc: &'a mut String) -> Self {
        XmlWriter { doc }
    }

    pub fn start_el(&mut self, tag: &str) -> ElWriter<'_> {
        ElWriter::new(&mut *self.doc, tag)
    }
}

/// Writes an element's opening tag. Attributes may be added until
/// [`finish`](ElWriter::finish) closes the tag and opens the content scope.
pub struct ElWriter<'a> {
    doc: &'a mut String,
    tag: String,
}

impl<'a> ElWriter<'a> {
    fn new(doc: &'a mut String, tag: &str) -> Self {
        doc.push('<');
        doc.push_str(tag);
        ElWriter {
            doc,
            tag: tag.to_string(),
        }
    }

    pub fn write_attribute(&mut self, key: &str, value: &str) -> &mut Self {
        self.doc.push(' ');
        self.doc.push_str(key);
        self.doc.push_str("=\"");
        self.doc.push_str(&escape(value));
        self.doc.push('"');
        self
    }

    pub fn finish(self) -> ScopeWriter<'a> {
        self.doc.push('>');
        ScopeWriter {
            doc: self.doc,
            tag: self.tag,
        }
    }
}

/// Writes an element's content. Dropping without `finish` leaves the
/// document unterminated, so `finish` must always be called.
pub struct ScopeWriter<'a> {
    doc: &'a mut String,
    tag: String,
}

impl<'a> ScopeWriter<'a> {
    pub fn data(&mut self, value: &str) -> &mut Self {
        self.doc.push_str(&escape(value));
        self
    }

    pub fn start_el(&mut self, tag: &str) -> ElWriter<'_> {
        ElWriter::new(&mut *self.doc, tag)
    }

    pub fn finish(self) {
        self.doc.push_str("</");
        self.doc.push_str(&self.tag);
        self.doc.push('>');
    }
}
