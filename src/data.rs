//! Data model: [`Data`], [`Composite`], [`RowInfo`]/[`Row`], and the array-literal codec.
use bytes::Bytes;

use crate::protocol::backend::FieldDescription;

/// Wire format tag (SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Binary,
}

impl Format {
    pub(crate) fn code(self) -> i16 {
        match self {
            Format::Text => 0,
            Format::Binary => 1,
        }
    }

    pub(crate) fn from_code(code: i16) -> Self {
        if code == 1 { Format::Binary } else { Format::Text }
    }
}

/// An owned or borrowed byte container tagged with its wire [`Format`]. `None`
/// represents SQL `NULL`.
#[derive(Debug, Clone)]
pub enum Data {
    Owned { bytes: Bytes, format: Format },
    Borrowed { bytes: Bytes, format: Format },
}

impl Data {
    pub fn owned(bytes: impl Into<Bytes>, format: Format) -> Self {
        Data::Owned { bytes: bytes.into(), format }
    }

    pub(crate) fn borrowed(bytes: Bytes, format: Format) -> Self {
        Data::Borrowed { bytes, format }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Data::Owned { bytes, .. } | Data::Borrowed { bytes, .. } => bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes().len()
    }

    pub fn format(&self) -> Format {
        match self {
            Data::Owned { format, .. } | Data::Borrowed { format, .. } => *format,
        }
    }

    /// Interpret as text. Panics (in debug) if this `Data` is binary-formatted; callers
    /// should check [`Data::format`] first for binary columns.
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.bytes())
    }

    /// Explicitly clone into an owned, independent `Data`.
    pub fn to_owned_data(&self) -> Data {
        Data::Owned { bytes: Bytes::copy_from_slice(self.bytes()), format: self.format() }
    }

    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.size() * 2);
        for byte in self.bytes() {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    pub fn from_hex(hex: &str) -> Result<Data, ArrayError> {
        if hex.len() % 2 != 0 {
            return Err(ArrayError::Malformed("odd-length hex string".into()));
        }
        let mut bytes = Vec::with_capacity(hex.len() / 2);
        let chars = hex.as_bytes();
        for pair in chars.chunks(2) {
            let s = std::str::from_utf8(pair).map_err(|_| ArrayError::Malformed("non-ASCII hex".into()))?;
            let byte = u8::from_str_radix(s, 16).map_err(|_| ArrayError::Malformed("invalid hex digit".into()))?;
            bytes.push(byte);
        }
        Ok(Data::owned(bytes, Format::Binary))
    }
}

/// An ordered sequence of `(name, Data?)` pairs (SPEC_FULL.md §3). Duplicate names are
/// permitted; [`Composite::find`] returns the first match at or after `offset`.
#[derive(Debug, Clone, Default)]
pub struct Composite {
    fields: Vec<(String, Option<Data>)>,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<Data>) {
        assert!(self.fields.len() < u16::MAX as usize, "Composite exceeds 16-bit field limit");
        self.fields.push((name.into(), value));
    }

    pub fn size(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(&str, Option<&Data>)> {
        self.fields.get(index).map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// First index at or after `offset` whose name equals `name`, if any.
    pub fn find(&self, name: &str, offset: usize) -> Option<usize> {
        self.fields.iter().enumerate().skip(offset).find(|(_, (n, _))| n == name).map(|(i, _)| i)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Data> {
        self.find(name, 0).and_then(|i| self.fields[i].1.as_ref())
    }

    /// Remove the field at `index`, preserving relative order of the rest.
    pub fn erase(&mut self, index: usize) -> Option<(String, Option<Data>)> {
        (index < self.fields.len()).then(|| self.fields.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Data>)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}

/// Per-query field metadata (SPEC_FULL.md §3).
#[derive(Debug, Clone)]
pub struct RowInfo {
    pub fields: Vec<FieldDescription>,
}

impl RowInfo {
    pub(crate) fn from_description(fields: Vec<FieldDescription>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A decoded row: a [`RowInfo`] paired with the values from one `DataRow` message.
#[derive(Debug, Clone)]
pub struct Row {
    info: std::sync::Arc<RowInfo>,
    values: Vec<Option<Bytes>>,
}

impl Row {
    pub(crate) fn new(info: std::sync::Arc<RowInfo>, values: Vec<Option<Bytes>>) -> Self {
        debug_assert_eq!(info.len(), values.len());
        Self { info, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn info(&self) -> &RowInfo {
        &self.info
    }

    pub fn get(&self, index: usize) -> Option<Data> {
        let field = self.info.fields.get(index)?;
        let format = Format::from_code(field.format);
        match self.values.get(index)? {
            Some(bytes) => Some(Data::borrowed(bytes.clone(), format)),
            None => None,
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<Data> {
        self.info.index_of(name).and_then(|i| self.get(i))
    }
}

/// Errors from the data model (array codec, hex decoding).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ArrayError {
    #[error("malformed array literal: {0}")]
    Malformed(String),
    #[error("insufficient array dimensionality")]
    InsufficientDimensionality,
    #[error("excessive array dimensionality")]
    ExcessiveDimensionality,
}

/// Parse a one-dimensional PostgreSQL array literal (`{a,b,{c,d}}`) into its element
/// texts. Nested braces are returned as a single opaque element text (including the
/// braces), matching the shallow-parse scope of SPEC_FULL.md §6; a NULL element
/// (bare, unquoted `NULL`) decodes to `None`.
pub fn parse_array(input: &str) -> Result<Vec<Option<String>>, ArrayError> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'{') {
        return Err(ArrayError::InsufficientDimensionality);
    }
    if bytes.last() != Some(&b'}') {
        return Err(ArrayError::Malformed("missing closing brace".into()));
    }
    let inner = &input[1..input.len() - 1];

    let mut elements = Vec::new();
    let mut chars = inner.char_indices().peekable();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut saw_any = inner.is_empty();

    while let Some((_, c)) = chars.next() {
        saw_any = true;
        match c {
            '"' if !in_quotes => in_quotes = true,
            '"' if in_quotes => in_quotes = false,
            '\\' if in_quotes => {
                if let Some((_, escaped)) = chars.next() {
                    current.push(escaped);
                } else {
                    return Err(ArrayError::Malformed("dangling escape".into()));
                }
            }
            '{' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            '}' if !in_quotes => {
                if depth == 0 {
                    return Err(ArrayError::ExcessiveDimensionality);
                }
                depth -= 1;
                current.push(c);
            }
            ',' if !in_quotes && depth == 0 => {
                elements.push(take_element(&mut current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(ArrayError::Malformed("unterminated quoted element".into()));
    }
    if depth != 0 {
        return Err(ArrayError::Malformed("unbalanced nested braces".into()));
    }
    if saw_any {
        elements.push(take_element(&mut current));
    }

    Ok(elements)
}

fn take_element(raw: &mut String) -> Option<String> {
    if raw == "NULL" {
        None
    } else {
        Some(std::mem::take(raw))
    }
}

/// Render element texts back into a one-dimensional array literal.
pub fn render_array(elements: &[Option<String>]) -> String {
    let mut out = String::from("{");
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match element {
            None => out.push_str("NULL"),
            Some(text) if needs_quoting(text) => {
                out.push('"');
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            }
            Some(text) => out.push_str(text),
        }
    }
    out.push('}');
    out
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text.contains(['{', '}', ',', '"', '\\', ' '])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_find_is_monotonic_and_erase_preserves_order() {
        let mut c = Composite::new();
        c.push("id", Some(Data::owned(b"1".to_vec(), Format::Text)));
        c.push("name", Some(Data::owned(b"a".to_vec(), Format::Text)));
        c.push("id", Some(Data::owned(b"2".to_vec(), Format::Text)));

        let first = c.find("id", 0).unwrap();
        let second = c.find("id", first + 1).unwrap();
        assert!(first <= second);
        assert_eq!(second, 2);

        let size_before = c.size();
        c.erase(1);
        assert_eq!(c.size(), size_before - 1);
        assert_eq!(c.get(1).unwrap().0, "id");
    }

    #[test]
    fn array_round_trip_simple() {
        let parsed = parse_array("{1,NULL,3}").unwrap();
        assert_eq!(parsed, vec![Some("1".into()), None, Some("3".into())]);
        assert_eq!(render_array(&parsed), "{1,NULL,3}");
    }

    #[test]
    fn array_round_trip_nested_and_quoted() {
        let parsed = parse_array(r#"{a,b,{c,d}}"#).unwrap();
        assert_eq!(parsed, vec![Some("a".into()), Some("b".into()), Some("{c,d}".into())]);

        let parsed = parse_array(r#"{"has,comma","has\"quote"}"#).unwrap();
        assert_eq!(parsed, vec![Some("has,comma".into()), Some(r#"has"quote"#.into())]);
    }

    #[test]
    fn array_requires_braces() {
        assert!(matches!(parse_array("1,2,3"), Err(ArrayError::InsufficientDimensionality)));
        assert!(matches!(parse_array("{1,2,3"), Err(ArrayError::Malformed(_))));
    }

    #[test]
    fn hex_roundtrip() {
        let data = Data::owned(b"\x01\x02\xff".to_vec(), Format::Binary);
        let hex = data.to_hex();
        assert_eq!(hex, "0102ff");
        let back = Data::from_hex(&hex).unwrap();
        assert_eq!(back.bytes(), data.bytes());
    }
}
