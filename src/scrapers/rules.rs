use crate::error::Result;
use crate::models::Field;
use regex::Regex;

/// Flattened view of a rendered property page that rules match against
#[derive(Debug, Clone, Default)]
pub struct PageText {
    /// First `h1` on the page
    pub headline: Option<String>,
    /// One line per non-empty text node
    pub body: String,
}

type Custom = Box<dyn Fn(&PageText) -> Result<Option<String>> + Send + Sync>;

/// How a single field is recognised in page text
pub enum Matcher {
    /// Fixed value when `needle` occurs in the body
    Keyword {
        needle: &'static str,
        value: &'static str,
        ignore_case: bool,
    },
    /// First regex match; `group` 0 is the whole match
    Pattern {
        regex: Regex,
        group: usize,
        format: fn(&str) -> String,
    },
    /// The page headline
    Headline,
    /// First sub-matcher that matches, in order
    FirstOf(Vec<Matcher>),
    Custom(Custom),
}

impl Matcher {
    pub fn keyword(needle: &'static str, value: &'static str) -> Self {
        Matcher::Keyword {
            needle,
            value,
            ignore_case: false,
        }
    }

    pub fn keyword_any_case(needle: &'static str, value: &'static str) -> Self {
        Matcher::Keyword {
            needle,
            value,
            ignore_case: true,
        }
    }

    pub fn pattern(pattern: &str, group: usize) -> Result<Self> {
        Self::pattern_with(pattern, group, collapse_whitespace)
    }

    pub fn pattern_with(pattern: &str, group: usize, format: fn(&str) -> String) -> Result<Self> {
        Ok(Matcher::Pattern {
            regex: Regex::new(pattern)?,
            group,
            format,
        })
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&PageText) -> Result<Option<String>> + Send + Sync + 'static,
    {
        Matcher::Custom(Box::new(f))
    }

    pub fn evaluate(&self, page: &PageText) -> Result<Option<String>> {
        match self {
            Matcher::Keyword {
                needle,
                value,
                ignore_case,
            } => {
                let found = if *ignore_case {
                    page.body.to_lowercase().contains(&needle.to_lowercase())
                } else {
                    page.body.contains(needle)
                };
                Ok(found.then(|| value.to_string()))
            }
            Matcher::Pattern {
                regex,
                group,
                format,
            } => Ok(regex
                .captures(&page.body)
                .and_then(|caps| caps.get(*group))
                .map(|m| format(m.as_str()))
                .filter(|value| !value.is_empty())),
            Matcher::Headline => Ok(page
                .headline
                .as_deref()
                .map(collapse_whitespace)
                .filter(|value| !value.is_empty())),
            Matcher::FirstOf(matchers) => {
                for matcher in matchers {
                    if let Some(value) = matcher.evaluate(page)? {
                        return Ok(Some(value));
                    }
                }
                Ok(None)
            }
            Matcher::Custom(f) => f(page),
        }
    }
}

/// One entry of the extraction table
pub struct FieldRule {
    pub field: Field,
    pub matcher: Matcher,
}

impl FieldRule {
    pub fn new(field: Field, matcher: Matcher) -> Self {
        Self { field, matcher }
    }
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.trim().chars().take(max_chars).collect::<String>().trim_end().to_string()
}

fn location_line(s: &str) -> String {
    truncate(s, 80)
}

fn address_line(s: &str) -> String {
    truncate(s, 100)
}

fn square_feet(s: &str) -> String {
    format!("{} sq.ft", s)
}

fn rupees(s: &str) -> String {
    format!("₹{}", s)
}

const MONTHS: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

const TENANTS: &str = "All|Family|Bachelors?|Company|Girls|Boys|Students";

pub const LOCATION_KEYWORDS: [&str; 6] = ["Paschim Vihar", "West Delhi", "Delhi", "Nagar", "Sector", "Phase"];

/// The default extraction table for property detail pages
pub fn standard_rules() -> Result<Vec<FieldRule>> {
    let location = LOCATION_KEYWORDS
        .iter()
        .map(|keyword| {
            Matcher::pattern_with(
                &format!("(?i){}[^\\n]*", regex::escape(keyword)),
                0,
                location_line,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(vec![
        FieldRule::new(Field::Title, Matcher::Headline),
        FieldRule::new(
            Field::Price,
            Matcher::pattern(
                r"₹\s*\d[\d,.]*(?:\s*(?:Lacs?|Lakhs?|Crores?|Cr)\b)?(?:\s*(?:/\s*month|per month|/\s*yr|annual|Month))?",
                0,
            )?,
        ),
        FieldRule::new(
            Field::Bedrooms,
            Matcher::pattern(r"(?i)(\d+)\s*(?:BHK|Bedroom|bed)", 1)?,
        ),
        FieldRule::new(
            Field::Bathrooms,
            Matcher::pattern(r"(?i)(\d+)\s*(?:Bathroom|bath)", 1)?,
        ),
        FieldRule::new(Field::Balconies, Matcher::pattern(r"(?i)(\d+)\s*Balcon", 1)?),
        FieldRule::new(
            Field::CarpetArea,
            Matcher::pattern_with(r"(?i)(\d[\d,]*)\s*(?:sq\.?\s*ft|sqft|Carpet Area)", 1, square_feet)?,
        ),
        FieldRule::new(
            Field::RatePerSqft,
            Matcher::pattern_with(r"(?i)₹\s*(\d[\d,]*)\s*(?:per|/)\s*sq\.?\s*ft", 1, rupees)?,
        ),
        FieldRule::new(
            Field::Deposit,
            Matcher::pattern(r"(?i)(?:Deposit|Advance)[:\s]*(₹\s*\d[\d,]*)", 1)?,
        ),
        FieldRule::new(
            Field::Furnishing,
            Matcher::FirstOf(vec![
                Matcher::keyword("Semi-Furnished", "Semi-Furnished"),
                Matcher::keyword("Unfurnished", "Unfurnished"),
                Matcher::keyword("Furnished", "Furnished"),
            ]),
        ),
        FieldRule::new(Field::Location, Matcher::FirstOf(location)),
        FieldRule::new(
            Field::Address,
            Matcher::pattern_with(
                r"(?:RWA|Block|Sector|Flat|House|Society|Building|Phase)[^\n]{5,100}",
                0,
                address_line,
            )?,
        ),
        FieldRule::new(
            Field::PostedBy,
            Matcher::FirstOf(vec![
                Matcher::keyword("Dealer", "Dealer"),
                Matcher::keyword("Owner", "Owner"),
            ]),
        ),
        FieldRule::new(
            Field::PostedDate,
            Matcher::pattern(
                &format!(r"(?i)(?:Posted|Listed)\s*(?:on)?\s*(\d{{1,2}}\s*(?:{})[^\n]{{0,20}})", MONTHS),
                1,
            )?,
        ),
        FieldRule::new(
            Field::AvailableFrom,
            Matcher::FirstOf(vec![
                Matcher::keyword_any_case("Immediate", "Immediate"),
                Matcher::pattern(
                    &format!(r"(?i)Available\s*(?:from)?[:\s]*(\d{{1,2}}\s*(?:{}))", MONTHS),
                    1,
                )?,
            ]),
        ),
        FieldRule::new(
            Field::AvailableFor,
            Matcher::pattern(
                &format!(
                    r"(?i)Available\s+For[:\s]*((?:{t})(?:\s*,\s*(?:{t}))*)",
                    t = TENANTS
                ),
                1,
            )?,
        ),
        FieldRule::new(
            Field::PropertyType,
            Matcher::FirstOf(vec![
                Matcher::keyword("Independent", "Independent"),
                Matcher::keyword("Apartment", "Apartment/Flat"),
                Matcher::keyword("Flat", "Apartment/Flat"),
                Matcher::keyword("Villa", "Villa"),
            ]),
        ),
        FieldRule::new(
            Field::Rating,
            Matcher::pattern(r"(?i)\b(\d(?:\.\d)?)\s*(?:/\s*5|out of 5)(?:[^\d/.]|$)", 1)?,
        ),
    ])
}
