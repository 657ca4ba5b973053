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

use crate::{
    dice_types::{DiceToken, DiceType, Modifiers, Selector, Sign},
    error::{ParseError, ParseErrorKind},
    limits::{MAX_CONSTANT, MAX_DICE, MAX_FACES, MAX_TERMS},
    placeholder::Placeholders,
};

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char, digit1, multispace0},
    combinator::{consumed, cut, map, opt, value},
    error::ErrorKind,
    sequence::{pair, preceded},
    IResult,
};

#[cfg(feature = "logging")]
use log::debug;

/// Error produced by the term parsers. `input` is the remaining text at the
/// point of failure.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TermError<'a> {
    pub input: &'a str,
    pub kind: ParseErrorKind,
}

impl<'a> TermError<'a> {
    pub fn new(input: &'a str, kind: ParseErrorKind) -> TermError<'a> {
        TermError { input, kind }
    }
}

impl<'a> nom::error::ParseError<&'a str> for TermError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        TermError::new(input, ParseErrorKind::Syntax)
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

pub type PResult<'a, T> = IResult<&'a str, T, TermError<'a>>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ModifierTerm {
    Keep(Selector, u32),
    ReRoll(u32),
}

fn failure<'a, T>(input: &'a str, kind: ParseErrorKind) -> PResult<'a, T> {
    Err(nom::Err::Failure(TermError::new(input, kind)))
}

/// Unsigned integer in `min..=max`. Missing digits are a recoverable error,
/// digits outside the range are a failure pointing at the digits.
pub fn number<'a>(
    min: u32,
    max: u32,
    kind: ParseErrorKind,
) -> impl Fn(&'a str) -> PResult<'a, u32> {
    move |input: &'a str| {
        let (rest, digits) = digit1(input)
            .map_err(|_: nom::Err<TermError<'a>>| nom::Err::Error(TermError::new(input, kind)))?;
        match digits.parse::<u32>() {
            Ok(n) if n >= min && n <= max => Ok((rest, n)),
            _ => failure(digits, kind),
        }
    }
}

pub fn parse_dice_digit(input: &str) -> PResult<&str> {
    tag_no_case("d")(input)
}

pub fn parse_faces(input: &str) -> PResult<u32> {
    alt((
        value(100, tag("%")),
        number(1, MAX_FACES, ParseErrorKind::InvalidFaces),
    ))(input)
}

pub fn parse_selector(input: &str) -> PResult<Selector> {
    alt((
        map(alt((tag_no_case("kl"), tag_no_case("l"))), |_| {
            Selector::Lower
        }),
        map(
            alt((tag_no_case("kh"), tag_no_case("k"), tag_no_case("h"))),
            |_| Selector::Higher,
        ),
    ))(input)
}

pub fn parse_modifier(input: &str) -> PResult<ModifierTerm> {
    alt((
        map(
            pair(
                parse_selector,
                cut(number(1, MAX_DICE, ParseErrorKind::InvalidModifier)),
            ),
            |(selector, amount)| ModifierTerm::Keep(selector, amount),
        ),
        map(
            preceded(
                tag_no_case("r"),
                opt(number(1, MAX_FACES, ParseErrorKind::InvalidModifier)),
            ),
            |threshold| ModifierTerm::ReRoll(threshold.unwrap_or(1)),
        ),
    ))(input)
}

/// Zero or more modifiers in any order, each kind at most once.
pub fn parse_modifiers(mut input: &str) -> PResult<Modifiers> {
    let mut modifiers = Modifiers::none();
    loop {
        match consumed(parse_modifier)(input) {
            Ok((rest, (text, modifier))) => {
                let duplicate = match modifier {
                    ModifierTerm::Keep(selector, amount) => {
                        modifiers.keep.replace((selector, amount)).is_some()
                    }
                    ModifierTerm::ReRoll(threshold) => {
                        modifiers.reroll.replace(threshold).is_some()
                    }
                };
                if duplicate {
                    return failure(text, ParseErrorKind::DuplicateModifier);
                }
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, modifiers)),
            Err(e) => return Err(e),
        }
    }
}

pub fn parse_dice(input: &str) -> PResult<DiceToken> {
    let (rest, (count, _)) = pair(opt(digit1), parse_dice_digit)(input)?;
    let count = match count {
        Some(digits) => match digits.parse::<u32>() {
            Ok(n) if n >= 1 && n <= MAX_DICE => n,
            _ => return failure(digits, ParseErrorKind::InvalidCount),
        },
        None => 1,
    };
    let (rest, faces) = cut(parse_faces)(rest)?;
    let (rest, modifiers) = parse_modifiers(rest)?;
    Ok((
        rest,
        DiceToken {
            count,
            dice: DiceType::Number(faces),
            modifiers,
            sign: Sign::Plus,
        },
    ))
}

pub fn parse_constant(input: &str) -> PResult<DiceToken> {
    map(
        number(0, MAX_CONSTANT, ParseErrorKind::InvalidConstant),
        DiceToken::constant,
    )(input)
    .map_err(|e| match e {
        nom::Err::Error(err) => nom::Err::Error(TermError::new(err.input, ParseErrorKind::Syntax)),
        other => other,
    })
}

pub fn parse_term(input: &str) -> PResult<DiceToken> {
    alt((parse_dice, parse_constant))(input)
}

pub fn parse_sign(input: &str) -> PResult<Sign> {
    alt((value(Sign::Plus, char('+')), value(Sign::Minus, char('-'))))(input)
}

fn skip_space(input: &str) -> &str {
    match multispace0::<_, TermError>(input) {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

/// Byte position of `part`, which must be a slice of `expression`.
fn offset(expression: &str, part: &str) -> usize {
    part.as_ptr() as usize - expression.as_ptr() as usize
}

fn leading_fragment(input: &str) -> &str {
    let end = input
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_whitespace() || *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .unwrap_or_else(|| input.len());
    &input[..end]
}

fn to_parse_error(expression: &str, term_start: &str, err: TermError<'_>) -> ParseError {
    let at = if err.input.is_empty() { term_start } else { err.input };
    let fragment = leading_fragment(at.trim_end());
    ParseError::new(err.kind, fragment, offset(expression, at))
}

/// Splits an expression with placeholders already substituted into its
/// terms. Blank input yields no tokens.
pub fn parse_tokens(expression: &str) -> Result<Vec<DiceToken>, ParseError> {
    let mut tokens: Vec<DiceToken> = Vec::new();
    let mut input = skip_space(expression);
    while !input.is_empty() {
        let term_start = input;
        let sign = if tokens.is_empty() {
            match opt(parse_sign)(input) {
                Ok((rest, sign)) => {
                    input = rest;
                    sign.unwrap_or(Sign::Plus)
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    return Err(to_parse_error(expression, term_start, e))
                }
                Err(nom::Err::Incomplete(_)) => {
                    return Err(ParseError::new(ParseErrorKind::Syntax, input, offset(expression, input)))
                }
            }
        } else {
            match parse_sign(input) {
                Ok((rest, sign)) => {
                    input = rest;
                    sign
                }
                Err(_) => {
                    let previous_is_dice = tokens.last().map_or(false, |t| !t.is_constant());
                    let glued = !expression[..offset(expression, input)]
                        .ends_with(char::is_whitespace);
                    let kind = if previous_is_dice
                        && glued
                        && input.starts_with(|c: char| c.is_ascii_alphabetic())
                    {
                        ParseErrorKind::UnknownModifier
                    } else {
                        ParseErrorKind::Syntax
                    };
                    return Err(to_parse_error(
                        expression,
                        input,
                        TermError::new(input, kind),
                    ));
                }
            }
        };
        input = skip_space(input);
        let (rest, mut token) = match parse_term(input) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(to_parse_error(expression, term_start, e))
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(ParseError::new(ParseErrorKind::Syntax, input, offset(expression, input)))
            }
        };
        if tokens.len() == MAX_TERMS {
            return Err(to_parse_error(
                expression,
                term_start,
                TermError::new(term_start, ParseErrorKind::TooManyTerms),
            ));
        }
        token.sign = sign;
        tokens.push(token);
        input = skip_space(rest);
    }
    Ok(tokens)
}

/// Substitutes `placeholders` into `expression` and parses the result.
pub fn parse_expression(
    expression: &str,
    placeholders: &Placeholders,
) -> Result<Vec<DiceToken>, ParseError> {
    if placeholders.expands_to_nothing(expression) {
        #[cfg(feature = "logging")]
        {
            debug!("nothing to roll in {:?}", expression)
        }
        return Ok(Vec::new());
    }
    let substituted = placeholders.substitute(expression);
    let result = parse_tokens(&substituted);
    #[cfg(feature = "logging")]
    {
        debug!("parsed {:?} to {:?}", &substituted, &result)
    }
    result
}
