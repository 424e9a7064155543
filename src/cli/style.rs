//! CLI styling utilities
//!
//! Semantic styling via the [`Stylize`] trait, with terminal color support
//! detection delegated to `owo-colors` (respects `NO_COLOR`, `CLICOLOR`,
//! `CLICOLOR_FORCE`, and TTY detection).

use std::fmt::{self, Display};

pub use owo_colors::Stream;
use owo_colors::{OwoColorize, Style};

const ACCENT: Style = Style::new().cyan();
const SUCCESS: Style = Style::new().green();
const ERROR: Style = Style::new().red();

/// A value with semantic styling applied
#[derive(Clone, Debug)]
pub struct Styled<T> {
    value: T,
    style: Style,
    stream: Stream,
}

impl<T: Display> Display for Styled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.value
                .if_supports_color(self.stream, |v| v.style(self.style))
        )
    }
}

/// Extension trait for semantic terminal styling
///
/// Implemented for all [`Display`] types; methods take `&self` so borrowed
/// data can be styled in place.
pub trait Stylize: Display {
    /// Accent color (cyan) for branch names, issue ids, commands
    fn accent(&self) -> Styled<&Self> {
        Styled {
            value: self,
            style: ACCENT,
            stream: Stream::Stdout,
        }
    }

    /// Error color (red) for failed operations
    fn error(&self) -> Styled<&Self> {
        Styled {
            value: self,
            style: ERROR,
            stream: Stream::Stdout,
        }
    }
}

impl<T: Display + ?Sized> Stylize for T {}

/// Green checkmark for success lines
pub const fn check() -> Styled<&'static str> {
    Styled {
        value: "✓",
        style: SUCCESS,
        stream: Stream::Stdout,
    }
}

/// Red cross for failure lines
pub const fn cross() -> Styled<&'static str> {
    Styled {
        value: "✗",
        style: ERROR,
        stream: Stream::Stdout,
    }
}
