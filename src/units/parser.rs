/*
Copyright 2021, 2022 Jakub Lewandowski

This file is part of Gridded Data Mathematics (GridMath).

Gridded Data Mathematics (GridMath) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Gridded Data Mathematics (GridMath) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Gridded Data Mathematics (GridMath). If not, see https://www.gnu.org/licenses/.
*/

//! Parser of UDUNITS-like unit strings such as `kg m-2 s-1`, `m/s^2` or `hPa`.

use super::{Dimensions, Unit, DIMENSIONLESS};
use crate::errors::UnitError;
use crate::Float;

const PREFIXES: [(&str, Float); 14] = [
    ("da", 1e1),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
];

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(Float),
    Symbol(String, i32),
    Times,
    Divide,
    Power,
    Open,
    Close,
}

/// Parses a unit string.
///
/// Empty string, `"1"` and `"%"` give dimensionless units.
/// The returned unit keeps the trimmed input as its symbol.
pub fn parse_unit(input: &str) -> Result<Unit, UnitError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Ok(Unit::dimensionless());
    }

    let tokens = tokenize(trimmed)?;
    let mut parser = Parser {
        tokens,
        position: 0,
        input: trimmed,
    };

    let unit = parser.product()?;

    if parser.position != parser.tokens.len() {
        return Err(parser.error("unexpected trailing characters"));
    }

    Ok(unit.with_symbol(trimmed))
}

fn tokenize(input: &str) -> Result<Vec<Token>, UnitError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = vec![];
    let mut i = 0;

    let error = |reason| UnitError::Parse(input.to_string(), reason);

    while i < chars.len() {
        let c = chars[i];

        match c {
            ' ' | '\t' => i += 1,
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Power);
                i += 2;
            }
            '*' | '.' | '·' => {
                tokens.push(Token::Times);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Divide);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Power);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Symbol("%".to_string(), 1));
                i += 1;
            }
            '0'..='9' | '-' | '+' => {
                let signed_allowed = !matches!(
                    tokens.last(),
                    Some(Token::Number(_)) | Some(Token::Symbol(..)) | Some(Token::Close)
                );

                if (c == '-' || c == '+') && !signed_allowed {
                    return Err(error("misplaced sign"));
                }

                let (number, next) = read_number(&chars, i).ok_or_else(|| error("malformed number"))?;
                tokens.push(Token::Number(number));
                i = next;
            }
            c if c.is_alphabetic() || c == '_' || c == '°' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphabetic() || chars[i] == '_' || chars[i] == '°') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();

                let mut exponent = 1;
                let exponent_follows = match chars.get(i) {
                    Some(d) if d.is_ascii_digit() => true,
                    Some('-') | Some('+') => chars.get(i + 1).map_or(false, |d| d.is_ascii_digit()),
                    _ => false,
                };

                if exponent_follows {
                    let start = i;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let digits: String = chars[start..i].iter().collect();
                    exponent = digits.parse().map_err(|_| error("malformed exponent"))?;
                }

                tokens.push(Token::Symbol(name, exponent));
            }
            _ => return Err(error("unexpected character")),
        }
    }

    Ok(tokens)
}

/// Reads number with optional sign, fraction and decimal exponent.
/// Returns the value and position of first character after it.
fn read_number(chars: &[char], start: usize) -> Option<(Float, usize)> {
    let mut i = start;

    if matches!(chars.get(i), Some('-') | Some('+')) {
        i += 1;
    }

    let digits_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }

    if chars.get(i) == Some(&'.') && chars.get(i + 1).map_or(false, |d| d.is_ascii_digit()) {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    if matches!(chars.get(i), Some('e') | Some('E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('-') | Some('+')) {
            j += 1;
        }
        if chars.get(j).map_or(false, |d| d.is_ascii_digit()) {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }

    let text: String = chars[start..i].iter().collect();
    text.parse().ok().map(|n| (n, i))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &'static str) -> UnitError {
        UnitError::Parse(self.input.to_string(), reason)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    /// Products and quotients are evaluated left to right,
    /// so `kg/m2/s` means `(kg/m2)/s`.
    fn product(&mut self) -> Result<Unit, UnitError> {
        let mut unit = self.power()?;

        loop {
            match self.peek() {
                Some(Token::Times) => {
                    self.position += 1;
                    unit = unit.mul(&self.power()?);
                }
                Some(Token::Divide) => {
                    self.position += 1;
                    unit = unit.div(&self.power()?);
                }
                Some(Token::Number(_)) | Some(Token::Symbol(..)) | Some(Token::Open) => {
                    unit = unit.mul(&self.power()?);
                }
                _ => break,
            }
        }

        Ok(unit)
    }

    fn power(&mut self) -> Result<Unit, UnitError> {
        let base = self.primary()?;

        if self.peek() != Some(&Token::Power) {
            return Ok(base);
        }
        self.position += 1;

        match self.next() {
            Some(Token::Number(n)) if n.fract() == 0.0 => base.powi(n as i32),
            Some(Token::Number(_)) => Err(self.error("exponent must be an integer")),
            _ => Err(self.error("missing exponent")),
        }
    }

    fn primary(&mut self) -> Result<Unit, UnitError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Unit::new(&n.to_string(), DIMENSIONLESS, n, 0.0)),
            Some(Token::Symbol(name, exponent)) => {
                let (scale, offset, dimensions) =
                    lookup(&name).ok_or_else(|| self.error("unknown unit symbol"))?;
                let unit = Unit::new(&name, dimensions, scale, offset);
                unit.powi(exponent)
            }
            Some(Token::Open) => {
                let unit = self.product()?;
                match self.next() {
                    Some(Token::Close) => Ok(unit),
                    _ => Err(self.error("unbalanced parentheses")),
                }
            }
            Some(_) => Err(self.error("expected unit symbol or number")),
            None => Err(self.error("unexpected end of unit")),
        }
    }
}

/// Finds the symbol first as-is, then as a prefixed symbol.
fn lookup(name: &str) -> Option<(Float, Float, Dimensions)> {
    if let Some((scale, offset, dimensions, _)) = known_symbol(name) {
        return Some((scale, offset, dimensions));
    }

    PREFIXES.iter().find_map(|(prefix, factor)| {
        let base = name.strip_prefix(*prefix)?;
        match known_symbol(base)? {
            (scale, offset, dimensions, true) => Some((scale * factor, offset, dimensions)),
            _ => None,
        }
    })
}

/// Returns scale, offset, dimensions and whether SI prefixes apply.
fn known_symbol(name: &str) -> Option<(Float, Float, Dimensions, bool)> {
    const LENGTH: Dimensions = [1, 0, 0, 0, 0, 0, 0];
    const MASS: Dimensions = [0, 1, 0, 0, 0, 0, 0];
    const TIME: Dimensions = [0, 0, 1, 0, 0, 0, 0];
    const TEMPERATURE: Dimensions = [0, 0, 0, 1, 0, 0, 0];
    const CURRENT: Dimensions = [0, 0, 0, 0, 1, 0, 0];
    const AMOUNT: Dimensions = [0, 0, 0, 0, 0, 1, 0];
    const LUMINOSITY: Dimensions = [0, 0, 0, 0, 0, 0, 1];
    const PRESSURE: Dimensions = [-1, 1, -2, 0, 0, 0, 0];
    const FORCE: Dimensions = [1, 1, -2, 0, 0, 0, 0];
    const ENERGY: Dimensions = [2, 1, -2, 0, 0, 0, 0];
    const POWER: Dimensions = [2, 1, -3, 0, 0, 0, 0];
    const SPEED: Dimensions = [1, 0, -1, 0, 0, 0, 0];

    let degree = std::f64::consts::PI / 180.0;

    let definition = match name {
        "m" | "meter" | "meters" | "metre" | "metres" => (1.0, 0.0, LENGTH, true),
        "g" | "gram" | "grams" => (1e-3, 0.0, MASS, true),
        "s" | "sec" | "second" | "seconds" => (1.0, 0.0, TIME, true),
        "min" | "minute" | "minutes" => (60.0, 0.0, TIME, false),
        "h" | "hr" | "hour" | "hours" => (3_600.0, 0.0, TIME, false),
        "d" | "day" | "days" => (86_400.0, 0.0, TIME, false),
        "month" | "months" => (2_592_000.0, 0.0, TIME, false),
        "yr" | "year" | "years" => (31_536_000.0, 0.0, TIME, false),
        "K" | "kelvin" => (1.0, 0.0, TEMPERATURE, true),
        "degC" | "°C" | "celsius" | "Celsius" => (1.0, 273.15, TEMPERATURE, false),
        "degF" | "°F" | "fahrenheit" | "Fahrenheit" => {
            (5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0, TEMPERATURE, false)
        }
        "A" | "ampere" => (1.0, 0.0, CURRENT, true),
        "mol" | "mole" => (1.0, 0.0, AMOUNT, true),
        "cd" | "candela" => (1.0, 0.0, LUMINOSITY, true),
        "Pa" | "pascal" => (1.0, 0.0, PRESSURE, true),
        "bar" => (1e5, 0.0, PRESSURE, true),
        "mb" | "millibar" | "millibars" => (100.0, 0.0, PRESSURE, false),
        "N" | "newton" => (1.0, 0.0, FORCE, true),
        "J" | "joule" => (1.0, 0.0, ENERGY, true),
        "W" | "watt" => (1.0, 0.0, POWER, true),
        "kt" | "knot" | "knots" => (1_852.0 / 3_600.0, 0.0, SPEED, false),
        "rad" | "radian" | "radians" => (1.0, 0.0, DIMENSIONLESS, false),
        "deg" | "degree" | "degrees" | "°" | "degree_north" | "degrees_north" | "degree_east"
        | "degrees_east" | "degrees_N" | "degrees_E" => (degree, 0.0, DIMENSIONLESS, false),
        "%" | "percent" => (0.01, 0.0, DIMENSIONLESS, false),
        _ => return None,
    };

    Some(definition)
}
