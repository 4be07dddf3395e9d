//! Card - color/value pair for the 108-card shedding deck

use std::fmt;

use serde::{Deserialize, Serialize};

/// Card color. `Black` is reserved for wild cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Black,
}

impl Color {
    /// The four colors a wild can be declared as
    pub const BASE: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Black => "black",
        }
    }

    #[inline]
    pub fn is_base(&self) -> bool {
        *self != Color::Black
    }
}

const NUMBER_NAMES: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Card face value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CardValue {
    Number(u8),
    Skip,
    Reverse,
    Draw2,
    Wild,
    WildDraw4,
}

impl CardValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardValue::Number(n) => NUMBER_NAMES.get(*n as usize).copied().unwrap_or("?"),
            CardValue::Skip => "skip",
            CardValue::Reverse => "reverse",
            CardValue::Draw2 => "draw2",
            CardValue::Wild => "wild",
            CardValue::WildDraw4 => "wild_draw4",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "skip" => Some(CardValue::Skip),
            "reverse" => Some(CardValue::Reverse),
            "draw2" => Some(CardValue::Draw2),
            "wild" => Some(CardValue::Wild),
            "wild_draw4" => Some(CardValue::WildDraw4),
            _ => match s.parse::<u8>() {
                Ok(n) if n <= 9 => Some(CardValue::Number(n)),
                _ => None,
            },
        }
    }

    #[inline]
    pub fn is_wild(&self) -> bool {
        matches!(self, CardValue::Wild | CardValue::WildDraw4)
    }
}

impl TryFrom<String> for CardValue {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CardValue::from_str(&value).ok_or_else(|| format!("unknown card value '{}'", value))
    }
}

impl From<CardValue> for String {
    fn from(value: CardValue) -> Self {
        value.as_str().to_string()
    }
}

/// A single card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub color: Color,
    pub value: CardValue,
}

impl Card {
    pub const fn new(color: Color, value: CardValue) -> Self {
        Self { color, value }
    }

    pub const fn number(color: Color, n: u8) -> Self {
        Self::new(color, CardValue::Number(n))
    }

    pub const fn wild() -> Self {
        Self::new(Color::Black, CardValue::Wild)
    }

    pub const fn wild_draw4() -> Self {
        Self::new(Color::Black, CardValue::WildDraw4)
    }

    #[inline]
    pub fn is_wild(&self) -> bool {
        self.value.is_wild()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color.as_str(), self.value.as_str())
    }
}
