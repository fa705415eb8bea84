//! Deterministic PII detectors.
//!
//! A fixed registry of named scanners, each a pure function from text to
//! match spans.  Three detectors are plain regexes (`email`, `phone_intl`);
//! the other three pair a candidate regex with a checksum or structural
//! validation (`hk_id`, `credit_card`, `ssn`) so that look-alike strings do
//! not trigger.
//!
//! Detection is composable: `scan_all` runs a selected set of detectors and
//! returns findings sorted by `(start, detector name)` for determinism.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
        .expect("built-in email pattern must compile")
});

static PHONE_INTL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+\d{1,3}[\s\-]?\d{4,14}").expect("built-in phone pattern must compile")
});

static HK_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z]{1,2})(\d{6})\(?([0-9A])\)?").expect("built-in HKID pattern must compile")
});

static CREDIT_CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    // 13 to 19 digits with optional single space/dash separators; the word
    // boundaries keep long digit runs (>19) from producing partial matches.
    Regex::new(r"\b\d(?:[ \-]?\d){12,18}\b").expect("built-in card pattern must compile")
});

static SSN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("built-in SSN pattern must compile")
});

/// One detector hit inside a scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiSpan {
    /// Byte offset of the first matched character.
    pub start: usize,
    /// Byte offset one past the last matched character.
    pub end: usize,
    pub detector: PiiDetector,
}

/// The fixed registry of PII detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiDetector {
    Email,
    PhoneIntl,
    HkId,
    CreditCard,
    Ssn,
}

impl PiiDetector {
    /// Every registered detector, in registry order.
    pub const ALL: [PiiDetector; 5] = [
        PiiDetector::Email,
        PiiDetector::PhoneIntl,
        PiiDetector::HkId,
        PiiDetector::CreditCard,
        PiiDetector::Ssn,
    ];

    /// The registry name used in policy documents and redaction labels.
    pub fn name(self) -> &'static str {
        match self {
            PiiDetector::Email => "email",
            PiiDetector::PhoneIntl => "phone_intl",
            PiiDetector::HkId => "hk_id",
            PiiDetector::CreditCard => "credit_card",
            PiiDetector::Ssn => "ssn",
        }
    }

    /// Look up a detector by registry name.  Unknown names are lint error
    /// E002 at the caller's level.
    pub fn from_name(name: &str) -> Option<Self> {
        PiiDetector::ALL.iter().copied().find(|d| d.name() == name)
    }

    /// Scan `text`, returning spans in match order.
    pub fn scan(self, text: &str) -> Vec<PiiSpan> {
        match self {
            PiiDetector::Email => regex_spans(&EMAIL_RE, text, self),
            PiiDetector::PhoneIntl => regex_spans(&PHONE_INTL_RE, text, self),
            PiiDetector::HkId => scan_hk_id(text),
            PiiDetector::CreditCard => scan_credit_card(text),
            PiiDetector::Ssn => scan_ssn(text),
        }
    }
}

impl std::fmt::Display for PiiDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `detectors` over `text` and merge the findings, sorted by
/// `(start, detector name)`.
pub fn scan_all(text: &str, detectors: &[PiiDetector]) -> Vec<PiiSpan> {
    let mut findings: Vec<PiiSpan> = detectors.iter().flat_map(|d| d.scan(text)).collect();
    findings.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.detector.name().cmp(b.detector.name()))
    });
    findings
}

// ── Detector internals ────────────────────────────────────────────────────────

fn regex_spans(re: &Regex, text: &str, detector: PiiDetector) -> Vec<PiiSpan> {
    re.find_iter(text)
        .map(|m| PiiSpan {
            start: m.start(),
            end: m.end(),
            detector,
        })
        .collect()
}

fn scan_hk_id(text: &str) -> Vec<PiiSpan> {
    HK_ID_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let letters = caps.get(1)?.as_str();
            let digits = caps.get(2)?.as_str();
            let check = caps.get(3)?.as_str().chars().next()?;
            hk_id_checksum_valid(letters, digits, check).then_some(PiiSpan {
                start: whole.start(),
                end: whole.end(),
                detector: PiiDetector::HkId,
            })
        })
        .collect()
}

/// HKID modulo-11 checksum.
///
/// Weights run 9,8 over a two-letter prefix (8 alone for a single letter),
/// then 7..2 over the six digits.  Letters are valued A=10..Z=35; the check
/// character is a digit or `A` standing for 10.  Valid when the weighted
/// sum plus the check value is divisible by 11.
fn hk_id_checksum_valid(letters: &str, digits: &str, check: char) -> bool {
    let letter_value = |c: char| (c as u32) - ('A' as u32) + 10;

    let mut sum: u32 = 0;
    let letter_chars: Vec<char> = letters.chars().collect();
    match letter_chars.as_slice() {
        [single] => sum += letter_value(*single) * 8,
        [first, second] => {
            sum += letter_value(*first) * 9;
            sum += letter_value(*second) * 8;
        }
        _ => return false,
    }

    for (i, d) in digits.chars().enumerate() {
        let Some(value) = d.to_digit(10) else {
            return false;
        };
        // Digit weights 7 down to 2.
        sum += value * (7 - i as u32);
    }

    let check_value = match check {
        'A' => 10,
        c => match c.to_digit(10) {
            Some(v) => v,
            None => return false,
        },
    };

    (sum + check_value) % 11 == 0
}

fn scan_credit_card(text: &str) -> Vec<PiiSpan> {
    CREDIT_CARD_RE
        .find_iter(text)
        .filter_map(|m| {
            let digits: Vec<u32> = m.as_str().chars().filter_map(|c| c.to_digit(10)).collect();
            ((13..=19).contains(&digits.len()) && luhn_valid(&digits)).then_some(PiiSpan {
                start: m.start(),
                end: m.end(),
                detector: PiiDetector::CreditCard,
            })
        })
        .collect()
}

/// Standard Luhn check over a digit sequence, most significant first.
fn luhn_valid(digits: &[u32]) -> bool {
    let mut sum = 0;
    for (i, d) in digits.iter().rev().enumerate() {
        let mut v = *d;
        if i % 2 == 1 {
            v *= 2;
            if v > 9 {
                v -= 9;
            }
        }
        sum += v;
    }
    sum % 10 == 0
}

fn scan_ssn(text: &str) -> Vec<PiiSpan> {
    SSN_RE
        .find_iter(text)
        .filter_map(|m| {
            ssn_valid(m.as_str()).then_some(PiiSpan {
                start: m.start(),
                end: m.end(),
                detector: PiiDetector::Ssn,
            })
        })
        .collect()
}

/// Structural SSN validity: area not 000/666/900-999, group not 00,
/// serial not 0000.
fn ssn_valid(candidate: &str) -> bool {
    let mut parts = candidate.split('-');
    let (Some(area), Some(group), Some(serial)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(area), Ok(group), Ok(serial)) = (
        area.parse::<u32>(),
        group.parse::<u32>(),
        serial.parse::<u32>(),
    ) else {
        return false;
    };

    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}
