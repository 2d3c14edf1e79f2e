use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const SEVERITY_CRITICAL: Color = Color::BrightRed;
pub const SEVERITY_HIGH: Color = Color::Red;
pub const ERROR: Color = Color::Red;
