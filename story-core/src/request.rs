//! Story request model and boundary validation.
//!
//! Raw JSON arrives as a [`StoryRequestBody`]; the only way to obtain a
//! [`StoryRequest`] is through [`TryFrom`], which checks every field and
//! reports all failures at once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Smallest accepted word count.
pub const MIN_WORD_COUNT: u32 = 50;
/// Largest accepted word count.
pub const MAX_WORD_COUNT: u32 = 2000;

macro_rules! id_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $id:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire and template identifier.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $id,)+
                }
            }

            /// Identifiers of every accepted value.
            pub fn ids() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($id => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

id_enum! {
    /// How adventurous the model should be.
    CreativityLevel {
        Conservative => "conservative",
        Creative => "creative",
        Insane => "insane",
    }
}

id_enum! {
    /// Literary genre of the story.
    Genre {
        Fantasy => "fantasy",
        ScienceFiction => "science_fiction",
        Mystery => "mystery",
        Romance => "romance",
        Adventure => "adventure",
        Horror => "horror",
        Comedy => "comedy",
        Drama => "drama",
    }
}

id_enum! {
    /// Target audience.
    Category {
        All => "all",
        Teen => "teen",
        Children => "children",
    }
}

/// The unvalidated request body as it arrives over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRequestBody {
    pub word_count: i64,
    pub creativity_level: String,
    pub genre: String,
    pub category: String,
    #[serde(default)]
    pub suggestions: Option<String>,
}

/// A validated story request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryRequest {
    word_count: u32,
    creativity_level: CreativityLevel,
    genre: Genre,
    category: Category,
    suggestions: Option<String>,
}

impl StoryRequest {
    /// Build a request from already-typed parts, checking the word count range.
    pub fn new(
        word_count: u32,
        creativity_level: CreativityLevel,
        genre: Genre,
        category: Category,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_word_count(i64::from(word_count), &mut errors);
        errors.into_result()?;
        Ok(Self {
            word_count,
            creativity_level,
            genre,
            category,
            suggestions: None,
        })
    }

    /// Attach free-text suggestions. Blank text counts as none.
    pub fn with_suggestions(mut self, suggestions: impl Into<String>) -> Self {
        let suggestions = suggestions.into();
        self.suggestions = (!suggestions.trim().is_empty()).then_some(suggestions);
        self
    }

    pub fn word_count(&self) -> u32 {
        self.word_count
    }

    pub fn creativity_level(&self) -> CreativityLevel {
        self.creativity_level
    }

    pub fn genre(&self) -> Genre {
        self.genre
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn suggestions(&self) -> Option<&str> {
        self.suggestions.as_deref()
    }
}

impl TryFrom<StoryRequestBody> for StoryRequest {
    type Error = ValidationErrors;

    fn try_from(body: StoryRequestBody) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::default();

        check_word_count(body.word_count, &mut errors);
        let creativity_level = parse_field::<CreativityLevel>(
            "creativity_level",
            &body.creativity_level,
            &CreativityLevel::ids(),
            &mut errors,
        );
        let genre = parse_field::<Genre>("genre", &body.genre, &Genre::ids(), &mut errors);
        let category =
            parse_field::<Category>("category", &body.category, &Category::ids(), &mut errors);

        match (creativity_level, genre, category) {
            (Some(creativity_level), Some(genre), Some(category)) if errors.is_empty() => {
                let request = StoryRequest {
                    // Range checked above.
                    word_count: body.word_count as u32,
                    creativity_level,
                    genre,
                    category,
                    suggestions: None,
                };
                Ok(match body.suggestions {
                    Some(text) => request.with_suggestions(text),
                    None => request,
                })
            }
            _ => Err(errors),
        }
    }
}

fn check_word_count(word_count: i64, errors: &mut ValidationErrors) {
    let range = i64::from(MIN_WORD_COUNT)..=i64::from(MAX_WORD_COUNT);
    if !range.contains(&word_count) {
        errors.push(
            "word_count",
            format!(
                "must be between {MIN_WORD_COUNT} and {MAX_WORD_COUNT} inclusive, got {word_count}"
            ),
        );
    }
}

fn parse_field<T: FromStr>(
    field: &'static str,
    value: &str,
    accepted: &[&str],
    errors: &mut ValidationErrors,
) -> Option<T> {
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(
                field,
                format!("'{value}' is not one of: {}", accepted.join(", ")),
            );
            None
        }
    }
}

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid story request: {}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: String) {
        self.errors.push(FieldError { field, message });
    }

    fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether `field` is among the failures.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}
