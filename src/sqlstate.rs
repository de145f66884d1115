//! SQLSTATE codes: 5-character base-36 strings, and their 32-bit integer encoding.

const BASE: u32 = 36;

/// A 5-character base-36 SQLSTATE code, stored as a packed `u32` for cheap comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlState(u32);

impl SqlState {
    /// Parse a 5-character SQLSTATE string (digits and uppercase ASCII letters).
    ///
    /// Returns `None` if `s` is not exactly 5 characters of `[0-9A-Z]`.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 5 {
            return None;
        }
        let mut code: u32 = 0;
        for c in s.chars() {
            let digit = match c {
                '0'..='9' => c as u32 - '0' as u32,
                'A'..='Z' => c as u32 - 'A' as u32 + 10,
                _ => return None,
            };
            code = code * BASE + digit;
        }
        Some(Self(code))
    }

    /// The packed integer form.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Reconstruct from the packed integer form produced by [`SqlState::as_u32`].
    pub fn from_u32(code: u32) -> Self {
        Self(code)
    }

    /// Render back to the 5-character textual SQLSTATE.
    pub fn as_str(&self) -> String {
        let mut digits = [0u8; 5];
        let mut n = self.0;
        for slot in digits.iter_mut().rev() {
            let digit = (n % BASE) as u8;
            *slot = if digit < 10 { b'0' + digit } else { b'A' + digit - 10 };
            n /= BASE;
        }
        // SAFETY: digits are drawn from `[0-9A-Z]`, which is ASCII.
        unsafe { String::from_utf8_unchecked(digits.to_vec()) }
    }

    /// The class (first two characters), e.g. `"42"` for syntax errors.
    pub fn class(&self) -> &'static str {
        well_known(self.0).map(|e| e.class).unwrap_or("??")
    }

    /// The symbolic name, if this is a well-known code (e.g. `"syntax_error"`).
    pub fn name(&self) -> Option<&'static str> {
        well_known(self.0).map(|e| e.name)
    }
}

impl std::fmt::Display for SqlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl std::fmt::Debug for SqlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqlState({})", self.as_str())
    }
}

struct Entry {
    class: &'static str,
    name: &'static str,
}

fn well_known(code: u32) -> Option<Entry> {
    // A representative subset of the PostgreSQL SQLSTATE catalog, covering the
    // codes this crate's own error paths and documented test scenarios reference.
    // Not exhaustive: see DESIGN.md for why the full ~400-row catalog isn't carried.
    const TABLE: &[(&str, &str, &str)] = &[
        ("00000", "00", "successful_completion"),
        ("01000", "01", "warning"),
        ("02000", "02", "no_data"),
        ("08000", "08", "connection_exception"),
        ("08003", "08", "connection_does_not_exist"),
        ("08006", "08", "connection_failure"),
        ("0A000", "0A", "feature_not_supported"),
        ("22000", "22", "data_exception"),
        ("23000", "23", "integrity_constraint_violation"),
        ("23505", "23", "unique_violation"),
        ("25000", "25", "invalid_transaction_state"),
        ("28000", "28", "invalid_authorization_specification"),
        ("28P01", "28", "invalid_password"),
        ("2D000", "2D", "invalid_transaction_termination"),
        ("34000", "34", "invalid_cursor_name"),
        ("40001", "40", "serialization_failure"),
        ("40P01", "40", "deadlock_detected"),
        ("42601", "42", "syntax_error"),
        ("42501", "42", "insufficient_privilege"),
        ("42703", "42", "undefined_column"),
        ("42P01", "42", "undefined_table"),
        ("42P07", "42", "duplicate_table"),
        ("53000", "53", "insufficient_resources"),
        ("53300", "53", "too_many_connections"),
        ("57014", "57", "query_canceled"),
        ("58000", "58", "system_error"),
        ("XX000", "XX", "internal_error"),
    ];
    TABLE.iter().find_map(|(sqlstate, class, name)| {
        let entry = SqlState::parse(sqlstate)?;
        (entry.0 == code).then_some(Entry { class, name })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_well_known_code() {
        for (sqlstate, _, _) in [("00000", "", ""), ("42601", "", ""), ("XX000", "", "")] {
            let s = SqlState::parse(sqlstate).unwrap();
            assert_eq!(s.as_str(), sqlstate);
            assert_eq!(SqlState::from_u32(s.as_u32()).as_str(), sqlstate);
        }
    }

    #[test]
    fn syntax_error_is_class_42() {
        let s = SqlState::parse("42601").unwrap();
        assert_eq!(s.class(), "42");
        assert_eq!(s.name(), Some("syntax_error"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(SqlState::parse("abc").is_none());
        assert!(SqlState::parse("toolong1").is_none());
        assert!(SqlState::parse("42-01").is_none());
    }
}
