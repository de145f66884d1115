use bytes::Bytes;

/// An immutable, cheaply cloneable string backed by [`Bytes`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ByteStr {
    bytes: Bytes,
}

impl ByteStr {
    /// Copy `string` into a new owned `ByteStr`.
    pub fn copy_from(string: &str) -> Self {
        Self { bytes: Bytes::copy_from_slice(string.as_bytes()) }
    }

    /// Wrap an already-validated UTF-8 byte buffer without copying.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not valid UTF-8.
    pub fn from_utf8(bytes: Bytes) -> Self {
        if let Err(e) = std::str::from_utf8(&bytes) {
            panic!("ByteStr::from_utf8: invalid utf-8: {e}");
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl std::ops::Deref for ByteStr {
    type Target = str;

    fn deref(&self) -> &str {
        // SAFETY: constructors only ever store valid UTF-8.
        unsafe { std::str::from_utf8_unchecked(&self.bytes) }
    }
}

impl AsRef<str> for ByteStr {
    fn as_ref(&self) -> &str {
        self
    }
}

impl From<&str> for ByteStr {
    fn from(value: &str) -> Self {
        Self::copy_from(value)
    }
}

impl From<String> for ByteStr {
    fn from(value: String) -> Self {
        Self { bytes: Bytes::from(value.into_bytes()) }
    }
}

impl std::fmt::Display for ByteStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self)
    }
}

impl std::fmt::Debug for ByteStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}", self = &**self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_deref() {
        let s = ByteStr::copy_from("hello");
        assert_eq!(&*s, "hello");
        assert_eq!(s.as_bytes(), b"hello");
    }

    #[test]
    fn clone_is_cheap_and_equal() {
        let a = ByteStr::copy_from("postgres");
        let b = a.clone();
        assert_eq!(a, b);
    }
}
