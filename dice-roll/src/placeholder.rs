/*
Copyright 2021 Robin Marchart

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Named values spliced into an expression before it is parsed.
//!
//! Substitution is purely textual and runs once: a value may be a whole
//! sub-expression (`1d4+1`) but placeholders inside a value are left alone.

use std::{borrow::Cow, collections::BTreeMap};
use thiserror::Error;

#[cfg(feature = "logging")]
use log::debug;

/// The bonus damage stat of a character sheet.
pub const BONUS_DAMAGE: &str = "DB";

#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("invalid placeholder name `{0}`, expected two or more uppercase letters")]
pub struct InvalidPlaceholderName(pub String);

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

pub fn is_valid_name(name: &str) -> bool {
    name.len() >= 2
        && name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
        && !matches!(name, "KH" | "KL")
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

impl Placeholders {
    pub fn new() -> Placeholders {
        Placeholders::default()
    }

    pub fn with_bonus_damage<S: ToString>(value: Option<S>) -> Placeholders {
        let mut placeholders = Placeholders::new();
        if let Some(value) = value {
            placeholders
                .values
                .insert(BONUS_DAMAGE.to_string(), value.to_string());
        }
        placeholders
    }

    pub fn insert<N: ToString, V: ToString>(
        &mut self,
        name: N,
        value: V,
    ) -> Result<Option<String>, InvalidPlaceholderName> {
        let name = name.to_string();
        if is_valid_name(&name) {
            Ok(self.values.insert(name, value.to_string()))
        } else {
            Err(InvalidPlaceholderName(name))
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    /// Copies every value of `other` over this set, keeping entries only
    /// present here.
    pub fn merge(&mut self, other: &Placeholders) {
        for (name, value) in other.values.iter() {
            self.values.insert(name.clone(), value.clone());
        }
    }

    fn is_blank(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(value) => value.trim().is_empty(),
            None => name == BONUS_DAMAGE,
        }
    }

    /// True when every word of `expression` is a placeholder without a
    /// value, so there is nothing to roll once it is substituted.
    pub fn expands_to_nothing(&self, expression: &str) -> bool {
        expression.split_whitespace().all(|word| self.is_blank(word))
    }

    fn replacement(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(value) if value.trim().is_empty() => Some("0"),
            Some(value) => Some(value.as_str()),
            None if name == BONUS_DAMAGE => Some("0"),
            None => None,
        }
    }

    /// Replaces every standalone placeholder name in `expression`. A name
    /// glued to a digit (`2DB`) is not a placeholder and is kept as is.
    pub fn substitute<'e>(&self, expression: &'e str) -> Cow<'e, str> {
        let mut output: Option<String> = None;
        let mut copied = 0;
        let mut chars = expression.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if !is_name_char(c) {
                continue;
            }
            let mut end = start + c.len_utf8();
            while let Some(&(index, next)) = chars.peek() {
                if !is_name_char(next) {
                    break;
                }
                end = index + next.len_utf8();
                chars.next();
            }
            let glued = expression[..start]
                .chars()
                .next_back()
                .map_or(false, |p| p.is_ascii_digit())
                || expression[end..]
                    .chars()
                    .next()
                    .map_or(false, |n| n.is_ascii_digit());
            if glued {
                continue;
            }
            if let Some(value) = self.replacement(&expression[start..end]) {
                let out = output.get_or_insert_with(|| String::with_capacity(expression.len()));
                out.push_str(&expression[copied..start]);
                out.push_str(value);
                copied = end;
            }
        }
        match output {
            Some(mut out) => {
                out.push_str(&expression[copied..]);
                #[cfg(feature = "logging")]
                {
                    debug!("substituted placeholders: {:?} => {:?}", expression, &out)
                }
                Cow::Owned(out)
            }
            None => Cow::Borrowed(expression),
        }
    }
}
