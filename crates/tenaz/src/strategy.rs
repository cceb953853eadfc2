//! Locator strategies and driver query translation.
//!
//! A locator is a `(strategy, value)` pair. Validation and translation are two
//! separate steps: [`Strategy::parse`] decides whether a strategy *name* is
//! recognized, [`translate`] decides whether a recognized strategy can be
//! turned into a [`DriverQuery`]. Some strategies pass the first step and fail
//! the second with [`TenazError::CaseNotImplemented`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::result::{TenazError, TenazResult};

/// Supported addressing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Element `id` attribute
    Id,
    /// Element `name` attribute
    Name,
    /// XPath expression
    XPath,
    /// Exact anchor text
    LinkText,
    /// Partial anchor text
    PartialLinkText,
    /// Tag name
    TagName,
    /// Single class name
    ClassName,
    /// CSS selector
    CssSelector,
    /// Android UI-automator query
    UiAutomator,
    /// Native mobile resource id
    MobileId,
    /// Accessibility identifier
    AccessibilityId,
}

impl Strategy {
    /// All recognized strategies
    pub const ALL: [Self; 11] = [
        Self::Id,
        Self::Name,
        Self::XPath,
        Self::LinkText,
        Self::PartialLinkText,
        Self::TagName,
        Self::ClassName,
        Self::CssSelector,
        Self::UiAutomator,
        Self::MobileId,
        Self::AccessibilityId,
    ];

    /// Validate a strategy name.
    ///
    /// Matching is case-sensitive. Each strategy has a canonical name plus a
    /// small set of human aliases (`class`, `className` and `class name` all
    /// mean [`Strategy::ClassName`]).
    pub fn parse(name: &str) -> TenazResult<Self> {
        let strategy = match name {
            "id" => Self::Id,
            "name" => Self::Name,
            "xpath" => Self::XPath,
            "linkText" | "link text" => Self::LinkText,
            "partialLinkText" | "partial link text" => Self::PartialLinkText,
            "tagName" | "tag name" => Self::TagName,
            "className" | "class" | "class name" => Self::ClassName,
            "cssSelector" | "css selector" | "css" => Self::CssSelector,
            "UIAutomator" | "uiAutomator" | "uiautomator" => Self::UiAutomator,
            "mobileid" | "mobile id" => Self::MobileId,
            "accessibility id" | "accessibilityId" | "accessibillity" => Self::AccessibilityId,
            other => {
                return Err(TenazError::UnsupportedStrategy {
                    strategy: other.to_string(),
                })
            }
        };
        Ok(strategy)
    }

    /// Canonical name, as used in handle descriptions
    #[must_use]
    pub const fn canonical_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::XPath => "xpath",
            Self::LinkText => "link text",
            Self::PartialLinkText => "partial link text",
            Self::TagName => "tag name",
            Self::ClassName => "class name",
            Self::CssSelector => "css selector",
            Self::UiAutomator => "uiautomator",
            Self::MobileId => "mobile id",
            Self::AccessibilityId => "accessibility id",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for Strategy {
    type Err = TenazError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.canonical_name())
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::parse(&name).map_err(serde::de::Error::custom)
    }
}

/// A validated `(strategy, value)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorSpec {
    /// Addressing strategy
    pub strategy: Strategy,
    /// Selector value interpreted by the strategy
    pub value: String,
}

impl LocatorSpec {
    /// Build a spec from a strategy name, failing on unrecognized names
    pub fn new(strategy: &str, value: impl Into<String>) -> TenazResult<Self> {
        Ok(Self {
            strategy: Strategy::parse(strategy)?,
            value: value.into(),
        })
    }

    /// Build a spec from an already validated strategy
    #[must_use]
    pub fn of(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Translate into a driver query
    pub fn to_query(&self) -> TenazResult<DriverQuery> {
        translate(self)
    }
}

impl fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.value)
    }
}

/// Driver-native query, ready to be executed by a [`crate::Session`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriverQuery {
    /// Match by `id`
    Id(String),
    /// Match by `name`
    Name(String),
    /// Match by XPath
    XPath(String),
    /// Match by tag name
    TagName(String),
    /// Match by class name
    ClassName(String),
    /// Match by CSS selector
    Css(String),
    /// Match by UI-automator query
    UiAutomator(String),
    /// Match by native mobile id
    MobileId(String),
    /// Match by accessibility id
    AccessibilityId(String),
}

impl DriverQuery {
    /// Create an XPath query
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a CSS query
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an id query
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Query selecting the parent of the scope node
    #[must_use]
    pub fn parent() -> Self {
        Self::XPath("..".to_string())
    }

    /// Strategy this query was translated from
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        match self {
            Self::Id(_) => Strategy::Id,
            Self::Name(_) => Strategy::Name,
            Self::XPath(_) => Strategy::XPath,
            Self::TagName(_) => Strategy::TagName,
            Self::ClassName(_) => Strategy::ClassName,
            Self::Css(_) => Strategy::CssSelector,
            Self::UiAutomator(_) => Strategy::UiAutomator,
            Self::MobileId(_) => Strategy::MobileId,
            Self::AccessibilityId(_) => Strategy::AccessibilityId,
        }
    }

    /// W3C / Appium `using` value for the find-elements command
    #[must_use]
    pub const fn using(&self) -> &'static str {
        match self {
            Self::Id(_) | Self::MobileId(_) => "id",
            Self::Name(_) => "name",
            Self::XPath(_) => "xpath",
            Self::TagName(_) => "tag name",
            Self::ClassName(_) => "class name",
            Self::Css(_) => "css selector",
            Self::UiAutomator(_) => "-android uiautomator",
            Self::AccessibilityId(_) => "accessibility id",
        }
    }

    /// Selector value
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Id(v)
            | Self::Name(v)
            | Self::XPath(v)
            | Self::TagName(v)
            | Self::ClassName(v)
            | Self::Css(v)
            | Self::UiAutomator(v)
            | Self::MobileId(v)
            | Self::AccessibilityId(v) => v,
        }
    }

    /// The `(strategy, value)` pair this query executes
    #[must_use]
    pub fn to_spec(&self) -> LocatorSpec {
        LocatorSpec::of(self.strategy(), self.value())
    }
}

impl fmt::Display for DriverQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy(), self.value())
    }
}

/// Translate a validated spec into a driver query.
///
/// Link-text strategies are recognized by [`Strategy::parse`] but have no
/// translation and fail with [`TenazError::CaseNotImplemented`].
pub fn translate(spec: &LocatorSpec) -> TenazResult<DriverQuery> {
    let value = spec.value.clone();
    let query = match spec.strategy {
        Strategy::Id => DriverQuery::Id(value),
        Strategy::Name => DriverQuery::Name(value),
        Strategy::XPath => DriverQuery::XPath(value),
        Strategy::TagName => DriverQuery::TagName(value),
        Strategy::ClassName => DriverQuery::ClassName(value),
        Strategy::CssSelector => DriverQuery::Css(value),
        Strategy::UiAutomator => DriverQuery::UiAutomator(value),
        Strategy::MobileId => DriverQuery::MobileId(value),
        Strategy::AccessibilityId => DriverQuery::AccessibilityId(value),
        Strategy::LinkText | Strategy::PartialLinkText => {
            return Err(TenazError::CaseNotImplemented {
                strategy: spec.strategy.canonical_name().to_string(),
            })
        }
    };
    Ok(query)
}
