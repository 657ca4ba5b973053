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

use crate::limits::{MAX_CONSTANT, MAX_DICE, MAX_FACES, MAX_TERMS};
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum ParseErrorKind {
    #[error("unable to parse term")]
    Syntax,
    #[error("dice count must be between 1 and {max}", max = MAX_DICE)]
    InvalidCount,
    #[error("dice faces must be between 1 and {max}", max = MAX_FACES)]
    InvalidFaces,
    #[error("modifier argument missing or out of range")]
    InvalidModifier,
    #[error("unknown modifier")]
    UnknownModifier,
    #[error("modifier given twice")]
    DuplicateModifier,
    #[error("constant must be at most {max}", max = MAX_CONSTANT)]
    InvalidConstant,
    #[error("expression has more than {max} terms", max = MAX_TERMS)]
    TooManyTerms,
}

/// Rejection of a whole expression. `fragment` is the text that could not
/// be accepted, `offset` its byte position in the substituted expression.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("{kind} at `{fragment}` (position {offset})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub fragment: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new<S: ToString>(kind: ParseErrorKind, fragment: S, offset: usize) -> ParseError {
        ParseError {
            kind,
            fragment: fragment.to_string(),
            offset,
        }
    }
}
