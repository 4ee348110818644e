//! Component tree of a parsed feed.

use std::fmt;

use super::{Property, names};

/// Components the feed reader distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Calendar,
    Event,
    Alarm,
    Timezone,
    /// `STANDARD` block inside a VTIMEZONE.
    Standard,
    /// `DAYLIGHT` block inside a VTIMEZONE.
    Daylight,
    Other,
}

impl ComponentKind {
    /// Kind for a `BEGIN:` name. Expects the name in uppercase.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VALARM" => Self::Alarm,
            "VTIMEZONE" => Self::Timezone,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Alarm => "VALARM",
            Self::Timezone => "VTIMEZONE",
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
            Self::Other => "X-COMPONENT",
        };
        f.write_str(name)
    }
}

/// One `BEGIN`/`END` block with its properties and nested blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub kind: ComponentKind,
    /// Name from the `BEGIN:` line, uppercased. Kept for unrecognized blocks.
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<Component>,
}

impl Component {
    /// Empty component for a `BEGIN:` name.
    #[must_use]
    pub fn begin(name: &str) -> Self {
        let name = name.trim().to_ascii_uppercase();
        Self {
            kind: ComponentKind::from_name(&name),
            name,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// First property called `name`, compared case-insensitively.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }

    /// Every property called `name`, in document order.
    #[must_use]
    pub fn get_properties(&self, name: &str) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|property| property.name.eq_ignore_ascii_case(name))
            .collect()
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.get_property(name)?.as_text()
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.text(names::UID)
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.text(names::SUMMARY)
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.text(names::DESCRIPTION)
    }

    /// Whether this VEVENT replaces one instance of a series.
    #[must_use]
    pub fn is_recurrence_exception(&self) -> bool {
        self.get_property(names::RECURRENCE_ID).is_some()
    }

    #[must_use]
    pub fn children_of_kind(&self, kind: ComponentKind) -> Vec<&Self> {
        self.children.iter().filter(|child| child.kind == kind).collect()
    }
}

/// A parsed feed: the VCALENDAR root.
#[derive(Debug, Clone, PartialEq)]
pub struct ICalendar {
    pub root: Component,
}

impl ICalendar {
    /// Display name from `X-WR-CALNAME`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.root.text("X-WR-CALNAME")
    }

    #[must_use]
    pub fn events(&self) -> Vec<&Component> {
        self.root.children_of_kind(ComponentKind::Event)
    }

    /// VTIMEZONE definitions carried by the feed.
    #[must_use]
    pub fn timezones(&self) -> Vec<&Component> {
        self.root.children_of_kind(ComponentKind::Timezone)
    }
}
