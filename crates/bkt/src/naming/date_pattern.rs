// ai
//! 📅 DatePatternEngine — turns `events-%{yyyy-MM-dd}` into `events-2026-10-18`.
//!
//! 🎬 *[a template walks into a bar. it has one date token. the bartender checks its ID.]*
//! *["two tokens?" the bartender says. "not in this establishment."]*
//!
//! 🧠 Knowledge graph:
//! - A **token** is `%{` + a date-time pattern + the first `}` after it.
//! - A template may hold zero tokens (pure literal) or exactly one.
//! - Rejected at validation time, never at render time:
//!   - two or more tokens,
//!   - a `{` inside a token (nested `%{%{...}}` or stray braces like `%{yyy{MM}dd}`),
//!   - a `%{` with no closing `}`,
//!   - a pattern with unsupported symbols (`AA`), too many repeats (`MMMMM`), or no
//!     date-time fields at all.
//! - Pattern letters follow the familiar `yyyy-MM-dd'T'HH:mm:ss` dialect; quoted text is literal.
//! - Rendering is always against UTC. Literal text on either side of the token passes through.
//!
//! ⚠️ Two renders against two `Utc::now()` captures are allowed to differ. Time is like that.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::SinkError;

/// 🚪 Opens a date-time token.
pub const TOKEN_OPEN: &str = "%{";
/// 🚪 Closes it.
pub const TOKEN_CLOSE: char = '}';

/// 🚫 Characters that may not appear unquoted inside a pattern.
/// `/` is on the list because a rendered token must never invent a new path segment.
const FORBIDDEN_PATTERN_CHARS: &[char] = &['%', '{', '}', '#', '[', ']', '\\', '/', '?', '*'];

/// 🧩 One piece of a parsed date-time pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternItem {
    /// `y`, `yyy`, `yyyy`: full year, zero-padded to `width`.
    Year { width: usize },
    /// `yy`: the last two digits.
    YearOfCentury,
    /// `M` / `MM`
    Month { padded: bool },
    /// `MMM`: Jan, Feb...
    MonthShort,
    /// `MMMM`: January, February...
    MonthLong,
    /// `d` / `dd`
    Day { padded: bool },
    /// `D` / `DD` / `DDD`: day of year.
    DayOfYear { width: usize },
    /// `H` / `HH`: 0-23
    Hour24 { padded: bool },
    /// `h` / `hh`: 1-12
    Hour12 { padded: bool },
    /// `m` / `mm`
    Minute { padded: bool },
    /// `s` / `ss`
    Second { padded: bool },
    /// `E` / `EE` / `EEE`: Mon, Tue...
    WeekdayShort,
    /// `EEEE`: Monday, Tuesday...
    WeekdayLong,
    /// `a`: AM / PM
    AmPm,
    /// Anything else, verbatim.
    Literal(String),
}

/// 📐 A validated date-time pattern, ready to format instants.
///
/// Two parses of the same pattern string compare equal. Determinism: check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    items: Vec<PatternItem>,
}

impl DatePattern {
    /// 🔍 Parse a pattern body (the bit between `%{` and `}`). Returns a human reason on failure.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let mut items: Vec<PatternItem> = Vec::new();
        let mut chars = pattern.chars().peekable();
        let mut has_field = false;

        while let Some(c) = chars.next() {
            if c == '\'' {
                // -- 📜 quoted literal. '' inside quotes (or on its own) is a single quote.
                let mut text = String::new();
                let mut closed = false;
                while let Some(q) = chars.next() {
                    if q == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            text.push('\'');
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    text.push(q);
                }
                if !closed {
                    return Err("unterminated quoted literal in date-time pattern".to_string());
                }
                if text.is_empty() {
                    text.push('\'');
                }
                if text.contains(FORBIDDEN_PATTERN_CHARS) {
                    return Err(format!("quoted literal '{text}' contains a reserved character"));
                }
                push_literal(&mut items, &text);
                continue;
            }

            if c.is_ascii_alphabetic() {
                let mut run = 1usize;
                while chars.peek() == Some(&c) {
                    chars.next();
                    run += 1;
                }
                items.push(field_for(c, run)?);
                has_field = true;
                continue;
            }

            if FORBIDDEN_PATTERN_CHARS.contains(&c) || c.is_control() || !c.is_ascii() {
                return Err(format!("character '{c}' is not allowed in a date-time pattern"));
            }
            push_literal(&mut items, c.encode_utf8(&mut [0u8; 4]));
        }

        if !has_field {
            return Err("date-time pattern has no date or time fields".to_string());
        }

        Ok(Self {
            source: pattern.to_string(),
            items,
        })
    }

    /// 🏷️ The pattern exactly as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 🕰️ Format `instant` (UTC) per this pattern.
    pub fn format(&self, instant: &DateTime<Utc>) -> String {
        let mut out = String::with_capacity(self.source.len() + 8);
        for item in &self.items {
            // -- ✍️ writing into a String cannot fail; the Result is the fmt trait's paperwork
            let _ = match item {
                PatternItem::Year { width } => write!(out, "{:0width$}", instant.year(), width = *width),
                PatternItem::YearOfCentury => write!(out, "{:02}", instant.year().rem_euclid(100)),
                PatternItem::Month { padded } => write_number(&mut out, instant.month(), *padded),
                PatternItem::MonthShort => write!(out, "{}", instant.format("%b")),
                PatternItem::MonthLong => write!(out, "{}", instant.format("%B")),
                PatternItem::Day { padded } => write_number(&mut out, instant.day(), *padded),
                PatternItem::DayOfYear { width } => {
                    write!(out, "{:0width$}", instant.ordinal(), width = *width)
                }
                PatternItem::Hour24 { padded } => write_number(&mut out, instant.hour(), *padded),
                PatternItem::Hour12 { padded } => write_number(&mut out, instant.hour12().1, *padded),
                PatternItem::Minute { padded } => write_number(&mut out, instant.minute(), *padded),
                PatternItem::Second { padded } => write_number(&mut out, instant.second(), *padded),
                PatternItem::WeekdayShort => write!(out, "{}", instant.format("%a")),
                PatternItem::WeekdayLong => write!(out, "{}", instant.format("%A")),
                PatternItem::AmPm => write!(out, "{}", instant.format("%p")),
                PatternItem::Literal(text) => write!(out, "{text}"),
            };
        }
        out
    }
}

fn write_number(out: &mut String, value: u32, padded: bool) -> std::fmt::Result {
    if padded {
        write!(out, "{value:02}")
    } else {
        write!(out, "{value}")
    }
}

fn push_literal(items: &mut Vec<PatternItem>, text: &str) {
    // -- 🧵 glue adjacent literals together so equal patterns stay structurally equal
    if let Some(PatternItem::Literal(previous)) = items.last_mut() {
        previous.push_str(text);
    } else {
        items.push(PatternItem::Literal(text.to_string()));
    }
}

/// 🔤 Map a run of one pattern letter to its field, or explain why not.
fn field_for(letter: char, run: usize) -> Result<PatternItem, String> {
    let item = match (letter, run) {
        ('y', 2) => PatternItem::YearOfCentury,
        ('y', 1 | 3 | 4) => PatternItem::Year { width: run },
        ('M', 1 | 2) => PatternItem::Month { padded: run == 2 },
        ('M', 3) => PatternItem::MonthShort,
        ('M', 4) => PatternItem::MonthLong,
        ('d', 1 | 2) => PatternItem::Day { padded: run == 2 },
        ('D', 1..=3) => PatternItem::DayOfYear { width: run },
        ('H', 1 | 2) => PatternItem::Hour24 { padded: run == 2 },
        ('h', 1 | 2) => PatternItem::Hour12 { padded: run == 2 },
        ('m', 1 | 2) => PatternItem::Minute { padded: run == 2 },
        ('s', 1 | 2) => PatternItem::Second { padded: run == 2 },
        ('E', 1..=3) => PatternItem::WeekdayShort,
        ('E', 4) => PatternItem::WeekdayLong,
        ('a', 1) => PatternItem::AmPm,
        ('y' | 'M' | 'd' | 'D' | 'H' | 'h' | 'm' | 's' | 'E' | 'a', _) => {
            return Err(format!(
                "'{}' repeated {run} times is not a supported width",
                letter.to_string().repeat(run)
            ));
        }
        _ => {
            return Err(format!(
                "unsupported date-time symbol '{}'",
                letter.to_string().repeat(run)
            ));
        }
    };
    Ok(item)
}

/// 📍 Where the single token sits inside its template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    /// byte offset of `%{`
    start: usize,
    /// byte offset just past `}`
    end: usize,
    pattern: DatePattern,
}

/// 📝 A validated naming template: literal text plus at most one date-time token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    raw: String,
    token: Option<Token>,
}

impl NamingTemplate {
    /// 🔍 Validate `template`. See the module docs for the rules.
    pub fn parse(template: &str) -> Result<Self, SinkError> {
        let mut token: Option<Token> = None;
        let mut cursor = 0usize;

        while let Some(offset) = template[cursor..].find(TOKEN_OPEN) {
            let start = cursor + offset;
            let body_start = start + TOKEN_OPEN.len();
            let Some(close_offset) = template[body_start..].find(TOKEN_CLOSE) else {
                return Err(SinkError::invalid_pattern(
                    template,
                    "date-time token is never closed with '}'",
                ));
            };
            let body = &template[body_start..body_start + close_offset];

            if body.contains(TOKEN_OPEN) {
                return Err(SinkError::invalid_pattern(
                    template,
                    "nested date-time tokens are not allowed",
                ));
            }
            if body.contains('{') {
                return Err(SinkError::invalid_pattern(
                    template,
                    "'{' is not allowed inside a date-time token",
                ));
            }
            if token.is_some() {
                return Err(SinkError::invalid_pattern(
                    template,
                    "only one date-time token is allowed",
                ));
            }

            let pattern =
                DatePattern::parse(body).map_err(|reason| SinkError::invalid_pattern(template, reason))?;
            let end = body_start + close_offset + TOKEN_CLOSE.len_utf8();
            token = Some(Token {
                start,
                end,
                pattern,
            });
            cursor = end;
        }

        Ok(Self {
            raw: template.to_string(),
            token,
        })
    }

    /// 🏷️ The template as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// ❓ Does this template carry a date-time token?
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// 📐 The parsed pattern, when there is one.
    pub fn pattern(&self) -> Option<&DatePattern> {
        self.token.as_ref().map(|token| &token.pattern)
    }

    /// 🖨️ Substitute the token (if any) with `instant` formatted in UTC.
    pub fn render(&self, instant: &DateTime<Utc>) -> String {
        match &self.token {
            None => self.raw.clone(),
            Some(token) => {
                let mut rendered = String::with_capacity(self.raw.len() + 8);
                rendered.push_str(&self.raw[..token.start]);
                rendered.push_str(&token.pattern.format(instant));
                rendered.push_str(&self.raw[token.end..]);
                rendered
            }
        }
    }
}

/// 📅 The engine's public face: validate templates and render them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatePatternEngine;

impl DatePatternEngine {
    /// ✅ Validate a template, handing back its parsed form for reuse.
    pub fn validate(template: &str) -> Result<NamingTemplate, SinkError> {
        NamingTemplate::parse(template)
    }

    /// 🖨️ Validate and render in one go. Prefer keeping the [`NamingTemplate`] around
    /// when rendering the same template repeatedly.
    pub fn render(template: &str, instant: &DateTime<Utc>) -> Result<String, SinkError> {
        Ok(NamingTemplate::parse(template)?.render(instant))
    }

    /// 🕰️ The reference clock. UTC, always.
    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }
}
