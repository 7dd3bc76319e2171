use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" | "buy" => Some(Direction::Long),
            "short" | "sell" => Some(Direction::Short),
            _ => None,
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moving-average ordering. Ties land on `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    pub fn score(&self) -> f64 {
        match self {
            Trend::Up => 1.0,
            Trend::Down => -1.0,
            Trend::Neutral => 0.0,
        }
    }

    /// Learning-store key; neutral trends are never recorded.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Trend::Up => Some("up"),
            Trend::Down => Some("down"),
            Trend::Neutral => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Trend::Up),
            "down" => Some(Trend::Down),
            "neutral" | "sideways" => Some(Trend::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartPattern {
    #[serde(rename = "W-Pattern")]
    WPattern,
    #[serde(rename = "M-Pattern")]
    MPattern,
}

impl ChartPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartPattern::WPattern => "W-Pattern",
            ChartPattern::MPattern => "M-Pattern",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "W-Pattern" => Some(ChartPattern::WPattern),
            "M-Pattern" => Some(ChartPattern::MPattern),
            _ => None,
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, ChartPattern::WPattern)
    }
}

impl fmt::Display for ChartPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleClass {
    Sharp,
    Mild,
    Flat,
}

impl AngleClass {
    pub fn from_degrees(degrees: f64) -> Self {
        if degrees >= 60.0 {
            AngleClass::Sharp
        } else if degrees >= 30.0 {
            AngleClass::Mild
        } else {
            AngleClass::Flat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AngleClass::Sharp => "sharp",
            AngleClass::Mild => "mild",
            AngleClass::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Momentum,
    Trend,
    Pattern,
    VolumeFactor,
    Angle,
    Inflection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    Number(f64),
    Label(String),
}

/// Ephemeral extractor output, rebuilt on every scoring call.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    pub value: SignalValue,
}

impl Signal {
    pub fn number(kind: SignalKind, value: f64) -> Self {
        Self {
            kind,
            value: SignalValue::Number(value),
        }
    }

    pub fn label(kind: SignalKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: SignalValue::Label(value.into()),
        }
    }
}
