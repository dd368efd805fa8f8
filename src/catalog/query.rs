//! Catalog queries and their refinements
//!
//! A [`Query`] is a base catalog URL plus optional year bounds and a transmission
//! filter. Refinements are written into the URL as the catalog's own search
//! parameters; refinements already present in a base URL are parsed back out so that
//! further refinement always intersects with them.

use std::fmt;
use thiserror::Error;
use url::Url;

/// Lower year bound search parameter
pub const YEAR_FROM_PARAM: &str = "search[filter_float_year:from]";

/// Upper year bound search parameter
pub const YEAR_TO_PARAM: &str = "search[filter_float_year:to]";

/// Transmission search parameter
pub const GEARBOX_PARAM: &str = "search[filter_enum_gearbox]";

/// Page index parameter
pub const PAGE_PARAM: &str = "page";

/// Errors raised while building a query from a URL
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to parse query URL '{url}': {source}")]
    Parse { url: String, source: url::ParseError },

    #[error("Unsupported URL scheme '{0}', expected http or https")]
    Scheme(String),

    #[error("Unsupported value '{value}' for filter {param}")]
    Filter { param: &'static str, value: String },
}

/// Transmission type, the secondary partitioning axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transmission {
    Manual,
    Automatic,
}

impl Transmission {
    /// Fixed split order used by the partition planner
    pub const ALL: [Transmission; 2] = [Self::Manual, Self::Automatic];

    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::Manual),
            "automatic" => Some(Self::Automatic),
            _ => None,
        }
    }
}

impl fmt::Display for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Inclusive manufacture-year bounds; `None` leaves that side open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct YearRange {
    pub from: Option<u16>,
    pub to: Option<u16>,
}

impl YearRange {
    pub fn new(from: Option<u16>, to: Option<u16>) -> Self {
        Self { from, to }
    }

    /// Returns the overlap of two ranges, or `None` when they are disjoint
    pub fn intersect(&self, other: &YearRange) -> Option<YearRange> {
        let from = match (self.from, other.from) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let to = match (self.to, other.to) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        match (from, to) {
            (Some(f), Some(t)) if f > t => None,
            _ => Some(YearRange { from, to }),
        }
    }

    pub fn contains(&self, year: u16) -> bool {
        self.from.map_or(true, |f| year >= f) && self.to.map_or(true, |t| year <= t)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (Some(a), Some(b)) => write!(f, "{}-{}", a, b),
            (Some(a), None) => write!(f, "{}-", a),
            (None, Some(b)) => write!(f, "-{}", b),
            (None, None) => f.write_str("any"),
        }
    }
}

/// An immutable catalog filter expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    /// Base URL with refinement and page parameters stripped
    base: Url,
    years: YearRange,
    transmission: Option<Transmission>,
}

impl Query {
    /// Parses a catalog URL, lifting any year, transmission and page parameters out of it
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let url = Url::parse(input.trim()).map_err(|source| QueryError::Parse {
            url: input.to_string(),
            source,
        })?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> Result<Self, QueryError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(QueryError::Scheme(url.scheme().to_string()));
        }

        let mut years = YearRange::default();
        let mut transmission = None;
        let mut retained = Vec::new();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                YEAR_FROM_PARAM => years.from = Some(parse_year(YEAR_FROM_PARAM, &value)?),
                YEAR_TO_PARAM => years.to = Some(parse_year(YEAR_TO_PARAM, &value)?),
                GEARBOX_PARAM => {
                    transmission = Some(Transmission::from_param(&value).ok_or_else(|| {
                        QueryError::Filter {
                            param: GEARBOX_PARAM,
                            value: value.to_string(),
                        }
                    })?)
                }
                PAGE_PARAM => {}
                _ => retained.push((key.into_owned(), value.into_owned())),
            }
        }

        let mut base = url;
        set_pairs(&mut base, &retained);

        Ok(Self {
            base,
            years,
            transmission,
        })
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    pub fn transmission(&self) -> Option<Transmission> {
        self.transmission
    }

    /// Narrows the query to a year window, or `None` if the window lies outside it
    pub fn with_years(&self, window: YearRange) -> Option<Query> {
        let years = self.years.intersect(&window)?;
        Some(Self {
            years,
            ..self.clone()
        })
    }

    /// Narrows the query to one transmission type, or `None` if it already
    /// filters on a different one
    pub fn with_transmission(&self, transmission: Transmission) -> Option<Query> {
        match self.transmission {
            Some(existing) if existing != transmission => None,
            _ => Some(Self {
                transmission: Some(transmission),
                ..self.clone()
            }),
        }
    }

    /// The full catalog URL of this query
    pub fn url(&self) -> Url {
        let mut pairs: Vec<(String, String)> = self
            .base
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if let Some(from) = self.years.from {
            pairs.push((YEAR_FROM_PARAM.to_string(), from.to_string()));
        }
        if let Some(to) = self.years.to {
            pairs.push((YEAR_TO_PARAM.to_string(), to.to_string()));
        }
        if let Some(transmission) = self.transmission {
            pairs.push((GEARBOX_PARAM.to_string(), transmission.as_param().to_string()));
        }

        let mut url = self.base.clone();
        set_pairs(&mut url, &pairs);
        url
    }

    /// The URL of one page of this query's results (pages start at 1)
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.url();
        url.query_pairs_mut()
            .append_pair(PAGE_PARAM, &page.to_string());
        url
    }

    /// Short human-readable description of the refinements
    pub fn label(&self) -> String {
        let mut label = format!("years={}", self.years);
        if let Some(transmission) = self.transmission {
            label.push_str(&format!(" gearbox={}", transmission));
        }
        label
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

fn parse_year(param: &'static str, value: &str) -> Result<u16, QueryError> {
    value.trim().parse().map_err(|_| QueryError::Filter {
        param,
        value: value.to_string(),
    })
}

fn set_pairs(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
}
