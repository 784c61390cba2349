//! Login input primitives: mobile numbers and one-time codes.
//!
//! Keep raw text handling here so the stages only ever talk to the remote
//! port with values that already satisfy their length and digit rules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a mobile number.
pub const PHONE_DIGITS: usize = 10;
/// Number of digits in a one-time code.
pub const OTP_DIGITS: usize = 4;

/// Validation errors raised for malformed local input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialValidationError {
    /// The mobile number was not exactly ten digits.
    InvalidPhone,
    /// The one-time code was not exactly four digits.
    InvalidOtp,
}

impl fmt::Display for CredentialValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPhone => write!(f, "enter a valid 10-digit mobile number"),
            Self::InvalidOtp => write!(f, "enter a valid 4-digit OTP"),
        }
    }
}

impl std::error::Error for CredentialValidationError {}

/// Strip everything but ASCII digits and cap the result at ten characters.
///
/// # Examples
/// ```
/// use client::domain::clean_phone_input;
///
/// assert_eq!(clean_phone_input("+91 98765-43210"), "9198765432");
/// assert_eq!(clean_phone_input("98a76"), "9876");
/// ```
pub fn clean_phone_input(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(PHONE_DIGITS)
        .collect()
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Validated ten-digit mobile number.
///
/// # Examples
/// ```
/// use client::domain::PhoneNumber;
///
/// let phone = PhoneNumber::parse("9876543210").unwrap();
/// assert_eq!(phone.as_str(), "9876543210");
/// assert!(PhoneNumber::parse("98765").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Validate an already-cleaned number.
    pub fn parse(raw: &str) -> Result<Self, CredentialValidationError> {
        if !is_digits(raw, PHONE_DIGITS) {
            return Err(CredentialValidationError::InvalidPhone);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the digits.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = CredentialValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Validated four-digit one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Validate a code string.
    pub fn parse(raw: &str) -> Result<Self, CredentialValidationError> {
        if !is_digits(raw, OTP_DIGITS) {
            return Err(CredentialValidationError::InvalidOtp);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the digits.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four single-digit entry cells with the focus rules of the OTP screen.
///
/// ## Invariants
/// - Every filled cell holds exactly one ASCII digit.
/// - `focus` is always a valid cell index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpEntry {
    cells: [Option<char>; OTP_DIGITS],
    focus: usize,
}

impl OtpEntry {
    /// Empty entry with focus on the first cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a change event to the cell at `index`.
    ///
    /// The last character of `value` is kept when it is a digit and focus
    /// moves to the next cell. An empty `value` clears the cell. Anything
    /// else is ignored.
    pub fn input(&mut self, index: usize, value: &str) {
        let Some(cell) = self.cells.get_mut(index) else {
            return;
        };
        match value.chars().last() {
            None => *cell = None,
            Some(digit) if digit.is_ascii_digit() => {
                *cell = Some(digit);
                if index + 1 < OTP_DIGITS {
                    self.focus = index + 1;
                }
            }
            Some(_) => {}
        }
    }

    /// Handle backspace on the cell at `index`.
    ///
    /// A filled cell is cleared in place; backspace in an empty cell moves
    /// focus to the previous one.
    pub fn backspace(&mut self, index: usize) {
        let Some(cell) = self.cells.get_mut(index) else {
            return;
        };
        if cell.take().is_none() && index > 0 {
            self.focus = index - 1;
        }
    }

    /// Fill cells from the start with the digits of `code`.
    pub fn paste(&mut self, code: &str) {
        self.clear();
        for (index, digit) in code
            .chars()
            .filter(char::is_ascii_digit)
            .take(OTP_DIGITS)
            .enumerate()
        {
            self.input(index, &digit.to_string());
        }
    }

    /// Reset every cell and move focus back to the first one.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Index of the focused cell.
    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Cell contents.
    pub fn cells(&self) -> &[Option<char>; OTP_DIGITS] {
        &self.cells
    }

    /// Whether every cell holds a digit.
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Assemble the code, failing unless all cells are filled.
    pub fn code(&self) -> Result<OtpCode, CredentialValidationError> {
        let code: Option<String> = self.cells.iter().copied().collect();
        code.ok_or(CredentialValidationError::InvalidOtp)
            .and_then(|digits| OtpCode::parse(&digits))
    }
}
